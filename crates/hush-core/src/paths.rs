use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const HUSH_DIR: &str = ".hush";

pub const CONFIG_FILE: &str = ".hush/config.yaml";
pub const DB_FILE: &str = ".hush/hush.db";
pub const APPS_FILE: &str = ".hush/apps.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn hush_dir(root: &Path) -> PathBuf {
    root.join(HUSH_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn db_path(root: &Path) -> PathBuf {
    root.join(DB_FILE)
}

/// App inventory consulted for display names and icons.
pub fn apps_path(root: &Path) -> PathBuf {
    root.join(APPS_FILE)
}
