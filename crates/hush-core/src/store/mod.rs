//! Durable stores for policies and deferred notifications.
//!
//! The filter service and the release scheduler only see the `RuleStore`
//! and `DeferredStore` traits. `Stores::open` wires both to a single redb
//! file; every trait method opens the file and runs one transaction, so each
//! call is atomic for its own key and last-writer-wins across callers and
//! across processes.

mod db;
pub mod record;

pub use db::{RedbDeferredStore, RedbRuleStore};

use crate::error::Result;
use crate::notification::DeferredNotification;
use crate::policy::Policy;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Mapping from app id to its policy.
pub trait RuleStore: Send + Sync {
    /// Insert or replace the policy for `policy.app_id`.
    fn put(&self, policy: &Policy) -> Result<()>;

    fn get(&self, app_id: &str) -> Result<Option<Policy>>;

    /// Every readable policy. Order is unspecified.
    fn get_all(&self) -> Result<Vec<Policy>>;

    /// Remove the policy for `app_id`. Returns whether one existed; removing
    /// an absent policy is not an error.
    fn remove(&self, app_id: &str) -> Result<bool>;
}

/// Queue of suppressed notifications, keyed by `(app_id, id)`.
pub trait DeferredStore: Send + Sync {
    /// Append `entry` to its app's queue, or replace it in place when an
    /// entry with the same id is already queued.
    fn put(&self, entry: &DeferredNotification) -> Result<()>;

    fn get(&self, app_id: &str, id: Uuid) -> Result<Option<DeferredNotification>>;

    /// One app's queue, oldest first.
    fn list_for(&self, app_id: &str) -> Result<Vec<DeferredNotification>>;

    /// Every queue, grouped by app and oldest first within each app.
    fn get_all(&self) -> Result<Vec<DeferredNotification>>;

    /// Idempotent; returns whether the entry existed.
    fn remove(&self, app_id: &str, id: Uuid) -> Result<bool>;

    /// Clear one app's queue, returning how many entries were removed.
    fn remove_all(&self, app_id: &str) -> Result<usize>;
}

/// Both stores, backed by one database file.
#[derive(Clone)]
pub struct Stores {
    pub rules: Arc<RedbRuleStore>,
    pub deferred: Arc<RedbDeferredStore>,
}

impl Stores {
    /// Create the database at `path` if needed. The file is only locked
    /// while a store call is running.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Arc::new(db::DbFile::create(path)?);
        Ok(Self {
            rules: Arc::new(RedbRuleStore::new(db.clone())),
            deferred: Arc::new(RedbDeferredStore::new(db)),
        })
    }
}
