//! `hydra seed`: Load the demo catalog and sample orders into SQLite.

use hydra_config::AppConfig;
use hydra_store::{SqliteStore, seed_demo_data};

pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if config.store.backend != "sqlite" {
        println!("  Store backend is `{}`; the demo data loads on start.", config.store.backend);
        return Ok(());
    }

    let path = config.store.database_path();
    let store = SqliteStore::open(&path).await?;
    let report = seed_demo_data(&store, force).await?;

    if report.skipped {
        println!("  Catalog already has products; nothing inserted (use --force to reseed).");
    } else {
        println!("  Seeded {} products and {} orders into {}", report.products, report.orders, path.display());
    }
    Ok(())
}
