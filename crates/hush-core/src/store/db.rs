//! redb-backed implementations of the rule and deferred stores.
//!
//! # Table design
//!
//! `RULES` maps the app id straight to its encoded policy.
//!
//! `DEFERRED` uses a composite byte key:
//! ```text
//! [ app_id bytes | 0x00 | seq: u64 big-endian (8 bytes) ]
//! ```
//! App ids never contain NUL, so the separator keeps each app's entries in
//! one contiguous key range, and the big-endian sequence number makes byte
//! order equal insertion order inside that range. `seq` is allocated from
//! `META` in the same write transaction as the insert.
//!
//! # Locking
//!
//! redb takes an exclusive lock on the file for as long as a `Database` is
//! open. The stores therefore hold only the path and open the file for each
//! call, so a long-running daemon and one-shot commands can share it. An
//! open that finds the file locked is retried with backoff until
//! `OPEN_WAIT` has passed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use redb::{Database, DatabaseError, ReadableTable, Table, TableDefinition};
use uuid::Uuid;

use crate::error::{HushError, Result};
use crate::notification::DeferredNotification;
use crate::policy::{validate_app_id, Policy};

use super::record::{decode_deferred, decode_policy, encode_deferred, encode_policy};
use super::{DeferredStore, RuleStore};

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

const RULES: TableDefinition<&str, &[u8]> = TableDefinition::new("rules");
const DEFERRED: TableDefinition<&[u8], &[u8]> = TableDefinition::new("deferred");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const DEFERRED_SEQ: &str = "deferred_seq";

fn db_err(e: impl std::fmt::Display) -> HushError {
    HushError::Store(e.to_string())
}

const OPEN_WAIT: Duration = Duration::from_secs(10);
const OPEN_BACKOFF_MAX: Duration = Duration::from_millis(100);

/// Location of the database file. Each `open` returns a fresh handle that
/// holds the file lock until dropped.
#[derive(Debug)]
pub(super) struct DbFile {
    path: PathBuf,
    wait: Duration,
}

impl DbFile {
    /// Create the file if needed along with every table, so read
    /// transactions never hit a missing table.
    pub(super) fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = Self {
            path: path.to_path_buf(),
            wait: OPEN_WAIT,
        };
        let db = file.open()?;
        let wt = db.begin_write().map_err(db_err)?;
        wt.open_table(RULES).map_err(db_err)?;
        wt.open_table(DEFERRED).map_err(db_err)?;
        wt.open_table(META).map_err(db_err)?;
        wt.commit().map_err(db_err)?;
        Ok(file)
    }

    fn open(&self) -> Result<Database> {
        let deadline = Instant::now() + self.wait;
        let mut backoff = Duration::from_millis(5);
        loop {
            match Database::create(&self.path) {
                Ok(db) => return Ok(db),
                Err(DatabaseError::DatabaseAlreadyOpen) if Instant::now() < deadline => {
                    tracing::trace!(path = %self.path.display(), "database locked; retrying");
                    std::thread::sleep(backoff);
                    backoff = (backoff * 2).min(OPEN_BACKOFF_MAX);
                }
                Err(e) => return Err(db_err(e)),
            }
        }
    }
}

fn skip_corrupt(table: &str, key: &str, err: &HushError) {
    tracing::warn!(kind = "record_corrupt", table, key, error = %err, "skipping unreadable record");
}

// ---------------------------------------------------------------------------
// Key helpers
// ---------------------------------------------------------------------------

fn deferred_key(app_id: &str, seq: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(app_id.len() + 9);
    key.extend_from_slice(app_id.as_bytes());
    key.push(0);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

/// Inclusive key bounds covering every entry queued for `app_id`.
fn app_bounds(app_id: &str) -> (Vec<u8>, Vec<u8>) {
    (deferred_key(app_id, 0), deferred_key(app_id, u64::MAX))
}

/// `app_id#seq`, for log lines.
fn describe_key(key: &[u8]) -> String {
    match key.iter().position(|b| *b == 0) {
        Some(split) if key.len() == split + 9 => {
            let mut seq = [0u8; 8];
            seq.copy_from_slice(&key[split + 1..]);
            format!(
                "{}#{}",
                String::from_utf8_lossy(&key[..split]),
                u64::from_be_bytes(seq)
            )
        }
        _ => String::from_utf8_lossy(key).into_owned(),
    }
}

fn next_seq(meta: &mut Table<'_, &'static str, u64>) -> Result<u64> {
    let current = meta
        .get(DEFERRED_SEQ)
        .map_err(db_err)?
        .map(|g| g.value())
        .unwrap_or(0);
    let next = current + 1;
    meta.insert(DEFERRED_SEQ, next).map_err(db_err)?;
    Ok(next)
}

/// Find the key under which entry `id` of `app_id` is stored.
fn find_key<T>(table: &T, app_id: &str, id: Uuid) -> Result<Option<Vec<u8>>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let (lo, hi) = app_bounds(app_id);
    for entry in table.range(lo.as_slice()..=hi.as_slice()).map_err(db_err)? {
        let (k, v) = entry.map_err(db_err)?;
        if let Ok(found) = decode_deferred(v.value()) {
            if found.id == id {
                return Ok(Some(k.value().to_vec()));
            }
        }
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// RedbRuleStore
// ---------------------------------------------------------------------------

pub struct RedbRuleStore {
    db: Arc<DbFile>,
}

impl RedbRuleStore {
    pub(super) fn new(db: Arc<DbFile>) -> Self {
        Self { db }
    }
}

impl RuleStore for RedbRuleStore {
    fn put(&self, policy: &Policy) -> Result<()> {
        validate_app_id(&policy.app_id)?;
        let value = encode_policy(policy)?;
        let db = self.db.open()?;
        let wt = db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(RULES).map_err(db_err)?;
            table
                .insert(policy.app_id.as_str(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    fn get(&self, app_id: &str) -> Result<Option<Policy>> {
        let db = self.db.open()?;
        let rt = db.begin_read().map_err(db_err)?;
        let table = rt.open_table(RULES).map_err(db_err)?;
        let Some(guard) = table.get(app_id).map_err(db_err)? else {
            return Ok(None);
        };
        match decode_policy(app_id, guard.value()) {
            Ok(policy) => Ok(Some(policy)),
            Err(e) => {
                skip_corrupt("rules", app_id, &e);
                Ok(None)
            }
        }
    }

    fn get_all(&self) -> Result<Vec<Policy>> {
        let db = self.db.open()?;
        let rt = db.begin_read().map_err(db_err)?;
        let table = rt.open_table(RULES).map_err(db_err)?;

        let mut result = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (k, v) = entry.map_err(db_err)?;
            match decode_policy(k.value(), v.value()) {
                Ok(policy) => result.push(policy),
                Err(e) => skip_corrupt("rules", k.value(), &e),
            }
        }
        Ok(result)
    }

    fn remove(&self, app_id: &str) -> Result<bool> {
        let db = self.db.open()?;
        let wt = db.begin_write().map_err(db_err)?;
        let existed = {
            let mut table = wt.open_table(RULES).map_err(db_err)?;
            let removed = table.remove(app_id).map_err(db_err)?;
            removed.is_some()
        };
        wt.commit().map_err(db_err)?;
        Ok(existed)
    }
}

// ---------------------------------------------------------------------------
// RedbDeferredStore
// ---------------------------------------------------------------------------

pub struct RedbDeferredStore {
    db: Arc<DbFile>,
}

impl RedbDeferredStore {
    pub(super) fn new(db: Arc<DbFile>) -> Self {
        Self { db }
    }
}

impl DeferredStore for RedbDeferredStore {
    fn put(&self, entry: &DeferredNotification) -> Result<()> {
        validate_app_id(&entry.app_id)?;
        let value = encode_deferred(entry)?;
        let db = self.db.open()?;
        let wt = db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(DEFERRED).map_err(db_err)?;
            let key = match find_key(&table, &entry.app_id, entry.id)? {
                Some(existing) => existing,
                None => {
                    let mut meta = wt.open_table(META).map_err(db_err)?;
                    deferred_key(&entry.app_id, next_seq(&mut meta)?)
                }
            };
            table
                .insert(key.as_slice(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    fn get(&self, app_id: &str, id: Uuid) -> Result<Option<DeferredNotification>> {
        Ok(self.list_for(app_id)?.into_iter().find(|n| n.id == id))
    }

    fn list_for(&self, app_id: &str) -> Result<Vec<DeferredNotification>> {
        let db = self.db.open()?;
        let rt = db.begin_read().map_err(db_err)?;
        let table = rt.open_table(DEFERRED).map_err(db_err)?;
        let (lo, hi) = app_bounds(app_id);

        let mut result = Vec::new();
        for entry in table.range(lo.as_slice()..=hi.as_slice()).map_err(db_err)? {
            let (k, v) = entry.map_err(db_err)?;
            match decode_deferred(v.value()) {
                Ok(n) => result.push(n),
                Err(e) => skip_corrupt("deferred", &describe_key(k.value()), &e),
            }
        }
        Ok(result)
    }

    fn get_all(&self) -> Result<Vec<DeferredNotification>> {
        let db = self.db.open()?;
        let rt = db.begin_read().map_err(db_err)?;
        let table = rt.open_table(DEFERRED).map_err(db_err)?;

        let mut result = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (k, v) = entry.map_err(db_err)?;
            match decode_deferred(v.value()) {
                Ok(n) => result.push(n),
                Err(e) => skip_corrupt("deferred", &describe_key(k.value()), &e),
            }
        }
        Ok(result)
    }

    fn remove(&self, app_id: &str, id: Uuid) -> Result<bool> {
        let db = self.db.open()?;
        let wt = db.begin_write().map_err(db_err)?;
        let existed = {
            let mut table = wt.open_table(DEFERRED).map_err(db_err)?;
            match find_key(&table, app_id, id)? {
                Some(key) => {
                    table.remove(key.as_slice()).map_err(db_err)?;
                    true
                }
                None => false,
            }
        };
        wt.commit().map_err(db_err)?;
        Ok(existed)
    }

    fn remove_all(&self, app_id: &str) -> Result<usize> {
        let (lo, hi) = app_bounds(app_id);
        let db = self.db.open()?;
        let wt = db.begin_write().map_err(db_err)?;
        let count = {
            let mut table = wt.open_table(DEFERRED).map_err(db_err)?;
            let mut keys = Vec::new();
            for entry in table.range(lo.as_slice()..=hi.as_slice()).map_err(db_err)? {
                let (k, _) = entry.map_err(db_err)?;
                keys.push(k.value().to_vec());
            }
            for key in &keys {
                table.remove(key.as_slice()).map_err(db_err)?;
            }
            keys.len()
        };
        wt.commit().map_err(db_err)?;
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
