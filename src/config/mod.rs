// src/config/mod.rs
pub mod aggregator;

pub use aggregator::AggregatorConfig;

pub const ENV_SITES_DB_PATH: &str = "SITES_DB_PATH";
pub const DEFAULT_SITES_DB_PATH: &str = "data/db.json";

/// Path of the provider registry db file: `$SITES_DB_PATH` or `data/db.json`.
pub fn sites_db_path() -> std::path::PathBuf {
    std::env::var(ENV_SITES_DB_PATH)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from(DEFAULT_SITES_DB_PATH))
}
