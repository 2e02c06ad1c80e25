//! Read-only book collection shared by every request.

use std::collections::BTreeMap;

use super::models::Book;

/// Books keyed by id, fixed once constructed.
///
/// There is no mutating API; share it behind an `Arc` without locking.
#[derive(Debug, Clone, Default)]
pub struct BookCatalog {
    books: BTreeMap<i64, Book>,
}

impl BookCatalog {
    /// Build a catalog from `books`. A later entry replaces an earlier one
    /// with the same id.
    pub fn new(books: impl IntoIterator<Item = Book>) -> Self {
        Self {
            books: books.into_iter().map(|book| (book.id, book)).collect(),
        }
    }

    /// The three fixture records served in every environment.
    pub fn seeded() -> Self {
        Self::new([
            Book::new(1, "The Great Gatsby", "F. Scott Fitzgerald"),
            Book::new(2, "To Kill a Mockingbird", "Harper Lee"),
            Book::new(3, "1984", "George Orwell"),
        ])
    }

    /// Every book, ordered by id.
    pub fn all(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    pub fn get(&self, id: i64) -> Option<&Book> {
        self.books.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.books.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_catalog_holds_three_books_in_id_order() {
        let catalog = BookCatalog::seeded();
        let ids: Vec<i64> = catalog.all().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(catalog.get(3).map(|b| b.title.as_str()), Some("1984"));
    }

    #[test]
    fn lookups_outside_the_seed_miss() {
        let catalog = BookCatalog::seeded();
        for id in [0, 4, -1, i64::MAX] {
            assert!(!catalog.contains(id));
            assert!(catalog.get(id).is_none());
        }
    }

    #[test]
    fn duplicate_ids_keep_the_last_entry() {
        let catalog = BookCatalog::new([Book::new(7, "Draft", "A"), Book::new(7, "Final", "B")]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(7).map(|b| b.title.as_str()), Some("Final"));
    }
}
