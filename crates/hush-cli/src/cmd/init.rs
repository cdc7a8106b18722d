use anyhow::Context;
use hush_core::{config::Config, io, paths};
use std::path::Path;

const APPS_TEMPLATE: &str = "\
# Installed apps known to hush: app_id -> display name and icon reference.
# Re-delivered notifications are titled \"[name] original title\".
#
# com.example.chat:
#   name: Chat
#   icon: res://chat
";

pub fn run(root: &Path, self_app_id: Option<&str>) -> anyhow::Result<()> {
    println!("Initializing hush in: {}", root.display());

    let dir = paths::hush_dir(root);
    std::fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    if paths::config_path(root).exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
    } else {
        let mut cfg = Config::default();
        cfg.self_app_id = self_app_id.map(str::to_string);
        cfg.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    }

    let written = io::write_if_missing(&paths::apps_path(root), APPS_TEMPLATE.as_bytes())
        .context("failed to write apps.yaml")?;
    println!(
        "  {} {}",
        if written { "created:" } else { "exists: " },
        paths::APPS_FILE
    );

    let db_existed = paths::db_path(root).exists();
    crate::engine::open_stores(root)?;
    println!(
        "  {} {}",
        if db_existed { "exists: " } else { "created:" },
        paths::DB_FILE
    );

    Ok(())
}
