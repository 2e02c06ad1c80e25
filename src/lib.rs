//! Bookshelf application library
//!
//! Project modules hosted by the bookshelf kernel.

pub mod modules;

/// Re-export commonly used types
pub use modules::*;
