//! Seams to the host device: app inventory and notification sink.

use crate::error::{HushError, Result};
use crate::notification::{DeliveryHandle, NotificationKey, Outgoing};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub app_id: String,
    pub name: String,
    /// Reference to the app's icon (resource id, path, ...). Never the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Installed-application lookup.
pub trait AppInventory: Send + Sync {
    fn resolve(&self, app_id: &str) -> Option<AppInfo>;

    /// Every user-visible installed app, sorted by display name.
    fn installed(&self) -> Vec<AppInfo> {
        Vec::new()
    }
}

/// The OS notification API.
pub trait NotificationSink: Send + Sync {
    /// Surface `notification` as a live notification.
    fn deliver(&self, notification: &Outgoing) -> Result<DeliveryHandle>;

    /// Cancel the live notification identified by `key`.
    fn cancel(&self, key: &NotificationKey) -> Result<()>;
}

// ---------------------------------------------------------------------------
// YamlInventory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct InventoryEntry {
    name: String,
    #[serde(default)]
    icon: Option<String>,
}

/// Inventory read from a YAML map of `app_id -> {name, icon}`.
///
/// ```yaml
/// com.example.chat:
///   name: Chat
///   icon: res://chat
/// ```
#[derive(Debug, Clone, Default)]
pub struct YamlInventory {
    apps: BTreeMap<String, InventoryEntry>,
    hidden: Option<String>,
}

impl YamlInventory {
    /// Load from `path`; a missing file yields an empty inventory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let blank = content.lines().all(|l| {
            let l = l.trim();
            l.is_empty() || l.starts_with('#')
        });
        if blank {
            return Ok(Self::default());
        }
        let apps: BTreeMap<String, InventoryEntry> = serde_yaml::from_str(content)?;
        if let Some(bad) = apps.keys().find(|k| k.trim().is_empty()) {
            return Err(HushError::InvalidAppId(bad.clone()));
        }
        Ok(Self { apps, hidden: None })
    }

    /// Exclude `app_id` (the engine's own app) from `installed()`.
    pub fn hiding(mut self, app_id: Option<String>) -> Self {
        self.hidden = app_id;
        self
    }
}

impl AppInventory for YamlInventory {
    fn resolve(&self, app_id: &str) -> Option<AppInfo> {
        self.apps.get(app_id).map(|e| AppInfo {
            app_id: app_id.to_string(),
            name: e.name.clone(),
            icon: e.icon.clone(),
        })
    }

    fn installed(&self) -> Vec<AppInfo> {
        let mut apps: Vec<AppInfo> = self
            .apps
            .iter()
            .filter(|(id, _)| self.hidden.as_deref() != Some(id.as_str()))
            .map(|(id, e)| AppInfo {
                app_id: id.clone(),
                name: e.name.clone(),
                icon: e.icon.clone(),
            })
            .collect();
        apps.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        apps
    }
}
