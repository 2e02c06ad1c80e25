use std::sync::Arc;

use anyhow::Context;
use bookshelf_app::modules::{self, books::catalog::BookCatalog};
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        addr = %settings.server.bind_addr(),
        "bookshelf-app bootstrap starting"
    );

    let catalog = Arc::new(BookCatalog::seeded());
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, catalog);

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    tracing::info!("bookshelf-app bootstrap complete");

    let served = bookshelf_http::start_server(&registry, &settings).await;
    registry.stop_all().await?;
    served
}
