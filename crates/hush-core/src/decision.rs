//! Allow/deny classification of a single instant against a policy.
//!
//! Everything here is pure: the filter service and the release scheduler
//! both call into it and must agree on the verdict for the same instant.

use crate::policy::{Day, ListMode, Policy};
use chrono::{Datelike, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Allow,
    Deny,
}

impl Verdict {
    pub fn is_allow(self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// `day` is an active day and `time` lies strictly between the window bounds.
///
/// Both bounds are exclusive: an instant equal to `window_start` or
/// `window_end` is outside the window.
pub fn in_window(policy: &Policy, day: Day, time: NaiveTime) -> bool {
    policy.active_days.contains(&day) && time > policy.window_start && time < policy.window_end
}

pub fn is_allowed(policy: &Policy, day: Day, time: NaiveTime) -> bool {
    let inside = in_window(policy, day, time);
    match policy.mode {
        ListMode::Allowlist => inside,
        ListMode::Denylist => !inside,
    }
}

/// Classify a local wall-clock instant.
pub fn classify(policy: &Policy, at: NaiveDateTime) -> Verdict {
    if is_allowed(policy, at.weekday().into(), at.time()) {
        Verdict::Allow
    } else {
        Verdict::Deny
    }
}
