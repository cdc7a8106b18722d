//! On-disk record encoding.
//!
//! Each entity has its own encode/decode pair. Records are JSON objects with
//! a `v` field so the layout can evolve without guessing at old bytes.

use crate::error::{HushError, Result};
use crate::notification::DeferredNotification;
use crate::policy::Policy;
use serde::{Deserialize, Serialize};

const POLICY_VERSION: u32 = 1;
const DEFERRED_VERSION: u32 = 1;

#[derive(Serialize)]
struct PolicyOut<'a> {
    v: u32,
    #[serde(flatten)]
    policy: &'a Policy,
}

#[derive(Deserialize)]
struct PolicyIn {
    v: u32,
    #[serde(flatten)]
    policy: Policy,
}

#[derive(Serialize)]
struct DeferredOut<'a> {
    v: u32,
    #[serde(flatten)]
    entry: &'a DeferredNotification,
}

#[derive(Deserialize)]
struct DeferredIn {
    v: u32,
    #[serde(flatten)]
    entry: DeferredNotification,
}

fn corrupt(table: &'static str, reason: impl std::fmt::Display) -> HushError {
    HushError::RecordCorrupt {
        table,
        reason: reason.to_string(),
    }
}

pub fn encode_policy(policy: &Policy) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&PolicyOut {
        v: POLICY_VERSION,
        policy,
    })?)
}

/// Decode a rule record stored under `key`.
///
/// A record whose `app_id` disagrees with its key is treated as corrupt.
pub fn decode_policy(key: &str, bytes: &[u8]) -> Result<Policy> {
    let rec: PolicyIn = serde_json::from_slice(bytes).map_err(|e| corrupt("rules", e))?;
    if rec.v != POLICY_VERSION {
        return Err(corrupt("rules", format!("unknown record version {}", rec.v)));
    }
    if rec.policy.app_id != key {
        return Err(corrupt(
            "rules",
            format!("key '{key}' holds policy for '{}'", rec.policy.app_id),
        ));
    }
    Ok(rec.policy)
}

pub fn encode_deferred(entry: &DeferredNotification) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&DeferredOut {
        v: DEFERRED_VERSION,
        entry,
    })?)
}

pub fn decode_deferred(bytes: &[u8]) -> Result<DeferredNotification> {
    let rec: DeferredIn = serde_json::from_slice(bytes).map_err(|e| corrupt("deferred", e))?;
    if rec.v != DEFERRED_VERSION {
        return Err(corrupt(
            "deferred",
            format!("unknown record version {}", rec.v),
        ));
    }
    Ok(rec.entry)
}
