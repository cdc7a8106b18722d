use crate::error::{HushError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// SchedulerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Minutes between release ticks; bounds re-delivery latency.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

fn default_interval_minutes() -> u64 {
    30
}

/// Longest accepted release interval: one week.
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
        }
    }
}

impl SchedulerConfig {
    /// The interval as a duration, clamped to `1..=MAX_INTERVAL_MINUTES`.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.clamp(1, MAX_INTERVAL_MINUTES) * 60)
    }
}

// ---------------------------------------------------------------------------
// DeliveryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Channel re-delivered notifications are posted to.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Prefix re-delivered titles with `[App Name]`.
    #[serde(default = "default_prefix_app_name")]
    pub prefix_app_name: bool,
}

fn default_channel() -> String {
    "deferred".to_string()
}

fn default_prefix_app_name() -> bool {
    true
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            prefix_app_name: default_prefix_app_name(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// App id of the engine itself. Its own notifications are never filtered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_app_id: Option<String>,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            scheduler: SchedulerConfig::default(),
            delivery: DeliveryConfig::default(),
            self_app_id: None,
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(HushError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.scheduler.interval_minutes == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "scheduler.interval_minutes must be at least 1".to_string(),
            });
        } else if self.scheduler.interval_minutes > MAX_INTERVAL_MINUTES {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "scheduler.interval_minutes={} exceeds the maximum of {MAX_INTERVAL_MINUTES} (one week)",
                    self.scheduler.interval_minutes
                ),
            });
        } else if self.scheduler.interval_minutes > 24 * 60 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "scheduler.interval_minutes={} is over a day; deferred notifications may wait that long",
                    self.scheduler.interval_minutes
                ),
            });
        }

        if self.delivery.channel.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "delivery.channel must not be empty".to_string(),
            });
        }

        if let Some(id) = &self.self_app_id {
            if id.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: "self_app_id is blank and will be ignored".to_string(),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
