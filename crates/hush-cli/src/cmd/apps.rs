use crate::engine;
use crate::output::{print_json, print_table};
use hush_core::collab::AppInventory;
use hush_core::store::{DeferredStore, RuleStore};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct AppRow {
    app_id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
    queued: usize,
}

/// List installed apps with their policy mode and queue length.
pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = engine::load_config(root)?;
    let inventory = engine::load_inventory(root, &config)?;
    let stores = engine::open_stores(root)?;

    let mut rows = Vec::new();
    for app in inventory.installed() {
        let mode = stores.rules.get(&app.app_id)?.map(|p| p.mode.to_string());
        let queued = stores.deferred.list_for(&app.app_id)?.len();
        rows.push(AppRow {
            app_id: app.app_id,
            name: app.name,
            mode,
            queued,
        });
    }

    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No apps listed in {}.", hush_core::paths::APPS_FILE);
        return Ok(());
    }
    let table = rows
        .into_iter()
        .map(|r| {
            vec![
                r.name,
                r.app_id,
                r.mode.unwrap_or_else(|| "-".to_string()),
                r.queued.to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "APP", "POLICY", "QUEUED"], table);
    Ok(())
}
