use std::{net::SocketAddr, time::Duration};

use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "hsa={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.database).await?;

    let engine = engine::Engine::builder()
        .database(db)
        .storage_root(&settings.storage.root)
        .household(&settings.household)
        .max_candidates(settings.selection.max_candidates)
        .build()
        .await?;

    let ocr = server::OcrClient::new(
        &settings.ocr.url,
        Duration::from_secs(settings.ocr.timeout_secs),
    )?;
    tracing::info!("using OCR service at {}", ocr.base_url());

    let addr = SocketAddr::new(settings.server.bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(engine, ocr, listener).await?;

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };
    match config {
        Database::Memory => tracing::warn!("using an in-memory database, receipts will not persist"),
        Database::Sqlite(path) => tracing::info!("using sqlite database at {path}"),
    }

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
