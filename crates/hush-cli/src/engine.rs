use crate::sink::JsonLinesSink;
use anyhow::Context;
use hush_core::collab::YamlInventory;
use hush_core::config::{Config, WarnLevel};
use hush_core::filter::{FilterOptions, FilterService};
use hush_core::paths;
use hush_core::store::Stores;
use hush_core::HushError;
use std::path::Path;
use std::sync::Arc;

/// Everything a command needs, opened from one root directory.
pub struct Engine {
    pub config: Config,
    pub filter: Arc<FilterService>,
}

/// Load and check the config. Validation errors abort; warnings are logged.
pub fn load_config(root: &Path) -> anyhow::Result<Config> {
    let config = Config::load(root).context("failed to load config")?;
    for w in config.validate() {
        match w.level {
            WarnLevel::Error => anyhow::bail!("invalid config: {}", w.message),
            WarnLevel::Warning => tracing::warn!("{}", w.message),
        }
    }
    Ok(config)
}

pub fn open_stores(root: &Path) -> anyhow::Result<Stores> {
    if !paths::hush_dir(root).is_dir() {
        return Err(HushError::NotInitialized.into());
    }
    let path = paths::db_path(root);
    Stores::open(&path).with_context(|| format!("failed to open {}", path.display()))
}

pub fn load_inventory(root: &Path, config: &Config) -> anyhow::Result<YamlInventory> {
    let path = paths::apps_path(root);
    let inventory = YamlInventory::load(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(inventory.hiding(config.self_app_id.clone()))
}

pub fn open(root: &Path) -> anyhow::Result<Engine> {
    let config = load_config(root)?;
    let stores = open_stores(root)?;
    let inventory = load_inventory(root, &config)?;
    let filter = Arc::new(FilterService::new(
        stores.rules,
        stores.deferred,
        Arc::new(inventory),
        Arc::new(JsonLinesSink::stdout()),
        FilterOptions::from(&config),
    ));
    Ok(Engine { config, filter })
}
