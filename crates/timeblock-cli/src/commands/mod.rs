pub mod config;
pub mod event;
pub mod run;
pub mod task;

use timeblock_core::{Config, JsonFileStore};

/// Configuration plus the store file it points at.
pub(crate) fn open_store() -> Result<(Config, JsonFileStore), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = JsonFileStore::open(config.store_path()?)?;
    Ok((config, store))
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
