pub mod challenge;
pub mod config;
pub mod mood;
pub mod xp;

use std::path::Path;
use std::sync::Arc;

use stretchzone_core::{ChallengeCatalog, Config, Engine, SqliteStore, StaticCatalog};

const DEFAULT_CATALOG: &str = include_str!("../../catalog/default.json");

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub fn load_catalog(path: Option<&Path>) -> Result<StaticCatalog, Box<dyn std::error::Error>> {
    let catalog = match path {
        Some(path) => StaticCatalog::from_path(path)?,
        None => StaticCatalog::from_json_str(DEFAULT_CATALOG)?,
    };
    Ok(catalog)
}

/// Open the on-disk store and load the engine against it.
pub async fn open_engine(catalog: Option<&Path>) -> Result<Engine, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let store = Arc::new(SqliteStore::open()?);
    let catalog: Arc<dyn ChallengeCatalog> = Arc::new(load_catalog(catalog)?);
    Ok(Engine::builder(store, catalog).config(&config).init().await)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn reset(yes: bool, catalog: Option<&Path>) -> CliResult {
    if !yes {
        return Err("refusing to reset without --yes".into());
    }
    let mut engine = open_engine(catalog).await?;
    engine.reset();
    for event in engine.take_events() {
        print_json(&event)?;
    }
    engine.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalog_loads() {
        let catalog = load_catalog(None).unwrap();
        assert!(catalog.len() >= 3);
        let untitled = catalog
            .list_challenges()
            .into_iter()
            .find(|c| c.id == "public-opinion")
            .unwrap();
        assert_eq!(untitled.category_label(), "General");
    }
}
