//! Notification shapes flowing through the engine.
//!
//! `IncomingNotification` is what the device reports, `DeferredNotification`
//! is what gets queued when a policy denies it, and `Outgoing` is what the
//! sink is asked to show when the queue drains.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque handle the OS uses to identify a live notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationKey(pub String);

impl std::fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A live notification as posted on the device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingNotification {
    pub key: NotificationKey,
    pub app_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default = "Utc::now")]
    pub posted_at: DateTime<Utc>,
}

impl IncomingNotification {
    pub fn new(
        key: impl Into<String>,
        app_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        posted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: NotificationKey(key.into()),
            app_id: app_id.into(),
            title: title.into(),
            body: body.into(),
            posted_at,
        }
    }
}

/// A suppressed notification waiting for its app's window to reopen.
///
/// Only the display name is captured at suppression time. Icons are never
/// stored; the inventory is asked again when the entry is re-delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredNotification {
    pub id: Uuid,
    pub app_id: String,
    pub app_name: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl DeferredNotification {
    pub fn from_incoming(event: &IncomingNotification, app_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            app_id: event.app_id.clone(),
            app_name: app_name.into(),
            title: event.title.clone(),
            body: event.body.clone(),
            created_at: event.posted_at,
        }
    }
}

/// A notification the engine asks the sink to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outgoing {
    /// Deferred entry this delivery re-surfaces.
    pub source_id: Uuid,
    pub app_id: String,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Routing target on the device side (notification channel).
    pub channel: String,
}

/// Handle returned by the sink for a delivered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryHandle(pub String);
