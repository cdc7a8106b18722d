use crate::engine;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use hush_core::store::DeferredStore;
use std::path::Path;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum DeferredSubcommand {
    /// List queued notifications, oldest first per app
    List {
        /// Only show this app's queue
        #[arg(long)]
        app: Option<String>,
    },
    /// Drop one queued notification without delivering it
    Remove { app_id: String, id: String },
    /// Drop an app's whole queue without delivering it
    Clear { app_id: String },
}

pub fn run(root: &Path, subcmd: DeferredSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        DeferredSubcommand::List { app } => list(root, app.as_deref(), json),
        DeferredSubcommand::Remove { app_id, id } => remove(root, &app_id, &id, json),
        DeferredSubcommand::Clear { app_id } => clear(root, &app_id, json),
    }
}

fn list(root: &Path, app: Option<&str>, json: bool) -> anyhow::Result<()> {
    let stores = engine::open_stores(root)?;
    let entries = match app {
        Some(app_id) => stores.deferred.list_for(app_id)?,
        None => stores.deferred.get_all()?,
    };

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No deferred notifications.");
        return Ok(());
    }
    let rows = entries
        .iter()
        .map(|e| {
            vec![
                e.id.to_string(),
                e.app_name.clone(),
                e.created_at.format("%Y-%m-%d %H:%M").to_string(),
                e.title.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "APP", "RECEIVED", "TITLE"], rows);
    Ok(())
}

fn remove(root: &Path, app_id: &str, id: &str, json: bool) -> anyhow::Result<()> {
    let id: Uuid = id
        .parse()
        .with_context(|| format!("invalid deferred id '{id}'"))?;
    let engine = engine::open(root)?;
    let removed = engine.filter.clear(app_id, id)?;

    if json {
        print_json(&serde_json::json!({ "app_id": app_id, "id": id, "removed": removed }))?;
    } else if removed {
        println!("Removed {id} from {app_id}");
    } else {
        println!("No deferred notification {id} for {app_id}");
    }
    Ok(())
}

fn clear(root: &Path, app_id: &str, json: bool) -> anyhow::Result<()> {
    let engine = engine::open(root)?;
    let count = engine.filter.clear_all(app_id)?;

    if json {
        print_json(&serde_json::json!({ "app_id": app_id, "removed": count }))?;
    } else {
        println!("Cleared {count} deferred notification(s) for {app_id}");
    }
    Ok(())
}
