//! Test doubles shared by the filter and scheduler tests.

use crate::collab::{NotificationSink, YamlInventory};
use crate::error::{HushError, Result};
use crate::notification::{DeferredNotification, DeliveryHandle, NotificationKey, Outgoing};
use crate::policy::Policy;
use crate::store::{DeferredStore, RuleStore, Stores};
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use uuid::Uuid;

/// Ordered record of side effects across fakes.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn temp_stores() -> (TempDir, Stores) {
    let dir = TempDir::new().unwrap();
    let stores = Stores::open(&dir.path().join("hush.db")).unwrap();
    (dir, stores)
}

pub fn inventory() -> YamlInventory {
    YamlInventory::from_yaml(
        "\
com.example.chat:
  name: Chat
  icon: res://chat
com.example.mail:
  name: Mail
",
    )
    .unwrap()
}

/// 2024-01-01 was a Monday.
pub fn monday_at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub fn tuesday_at(hour: u32, minute: u32) -> NaiveDateTime {
    monday_at(hour, minute) + chrono::Duration::days(1)
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<Outgoing>>,
    cancelled: Mutex<Vec<NotificationKey>>,
    fail_titles: Mutex<Vec<String>>,
    journal: Option<Journal>,
}

impl RecordingSink {
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    /// Make `deliver` fail for any title containing `needle`.
    pub fn fail_titles_containing(&self, needle: &str) {
        self.fail_titles.lock().unwrap().push(needle.to_string());
    }

    pub fn heal(&self) {
        self.fail_titles.lock().unwrap().clear();
    }

    pub fn delivered(&self) -> Vec<Outgoing> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<NotificationKey> {
        self.cancelled.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, notification: &Outgoing) -> Result<DeliveryHandle> {
        let fail = self
            .fail_titles
            .lock()
            .unwrap()
            .iter()
            .any(|n| notification.title.contains(n.as_str()));
        if fail {
            return Err(HushError::Sink("device refused notification".into()));
        }
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(DeliveryHandle(notification.source_id.to_string()))
    }

    fn cancel(&self, key: &NotificationKey) -> Result<()> {
        if let Some(j) = &self.journal {
            j.lock().unwrap().push(format!("cancel {key}"));
        }
        self.cancelled.lock().unwrap().push(key.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FlakyDeferredStore
// ---------------------------------------------------------------------------

/// Wraps a real deferred store; writes can be switched to fail.
pub struct FlakyDeferredStore {
    inner: Arc<dyn DeferredStore>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    journal: Option<Journal>,
}

impl FlakyDeferredStore {
    pub fn new(inner: Arc<dyn DeferredStore>, journal: Option<Journal>) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            journal,
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check(&self, flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(HushError::Store("disk full".into()));
        }
        Ok(())
    }
}

impl DeferredStore for FlakyDeferredStore {
    fn put(&self, entry: &DeferredNotification) -> Result<()> {
        self.check(&self.fail_writes)?;
        self.inner.put(entry)?;
        if let Some(j) = &self.journal {
            j.lock().unwrap().push(format!("put {}", entry.title));
        }
        Ok(())
    }

    fn get(&self, app_id: &str, id: Uuid) -> Result<Option<DeferredNotification>> {
        self.check(&self.fail_reads)?;
        self.inner.get(app_id, id)
    }

    fn list_for(&self, app_id: &str) -> Result<Vec<DeferredNotification>> {
        self.check(&self.fail_reads)?;
        self.inner.list_for(app_id)
    }

    fn get_all(&self) -> Result<Vec<DeferredNotification>> {
        self.check(&self.fail_reads)?;
        self.inner.get_all()
    }

    fn remove(&self, app_id: &str, id: Uuid) -> Result<bool> {
        self.check(&self.fail_writes)?;
        self.inner.remove(app_id, id)
    }

    fn remove_all(&self, app_id: &str) -> Result<usize> {
        self.check(&self.fail_writes)?;
        self.inner.remove_all(app_id)
    }
}

// ---------------------------------------------------------------------------
// FlakyRuleStore
// ---------------------------------------------------------------------------

/// Wraps a real rule store; enumeration can be switched to fail.
pub struct FlakyRuleStore {
    inner: Arc<dyn RuleStore>,
    fail_reads: AtomicBool,
}

impl FlakyRuleStore {
    pub fn new(inner: Arc<dyn RuleStore>) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(HushError::Store("database locked".into()));
        }
        Ok(())
    }
}

impl RuleStore for FlakyRuleStore {
    fn put(&self, policy: &Policy) -> Result<()> {
        self.inner.put(policy)
    }

    fn get(&self, app_id: &str) -> Result<Option<Policy>> {
        self.check()?;
        self.inner.get(app_id)
    }

    fn get_all(&self) -> Result<Vec<Policy>> {
        self.check()?;
        self.inner.get_all()
    }

    fn remove(&self, app_id: &str) -> Result<bool> {
        self.inner.remove(app_id)
    }
}
