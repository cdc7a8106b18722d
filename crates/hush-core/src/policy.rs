//! Per-app time-window policy.
//!
//! A `Policy` pairs a set of weekdays with a wall-clock window. Under an
//! allowlist the app may notify only inside the window; under a denylist it
//! may notify only outside it. Whether an instant is inside the window is
//! decided by [`crate::decision`].

use crate::error::{HushError, Result};
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// ListMode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListMode {
    /// The window lists the times the app MAY notify.
    Allowlist,
    /// The window lists the times the app may NOT notify.
    Denylist,
}

impl std::fmt::Display for ListMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListMode::Allowlist => f.write_str("allowlist"),
            ListMode::Denylist => f.write_str("denylist"),
        }
    }
}

impl std::str::FromStr for ListMode {
    type Err = HushError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "allowlist" | "allow" | "whitelist" => Ok(ListMode::Allowlist),
            "denylist" | "deny" | "blacklist" => Ok(ListMode::Denylist),
            _ => Err(HushError::InvalidMode(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Day
// ---------------------------------------------------------------------------

/// Day of the week, ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub fn all() -> [Day; 7] {
        [
            Day::Monday,
            Day::Tuesday,
            Day::Wednesday,
            Day::Thursday,
            Day::Friday,
            Day::Saturday,
            Day::Sunday,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
            Day::Saturday => "saturday",
            Day::Sunday => "sunday",
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            Day::Monday => "mon",
            Day::Tuesday => "tue",
            Day::Wednesday => "wed",
            Day::Thursday => "thu",
            Day::Friday => "fri",
            Day::Saturday => "sat",
            Day::Sunday => "sun",
        }
    }
}

impl From<Weekday> for Day {
    fn from(w: Weekday) -> Self {
        match w {
            Weekday::Mon => Day::Monday,
            Weekday::Tue => Day::Tuesday,
            Weekday::Wed => Day::Wednesday,
            Weekday::Thu => Day::Thursday,
            Weekday::Fri => Day::Friday,
            Weekday::Sat => Day::Saturday,
            Weekday::Sun => Day::Sunday,
        }
    }
}

impl std::fmt::Display for Day {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short())
    }
}

impl std::str::FromStr for Day {
    type Err = HushError;
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        Day::all()
            .into_iter()
            .find(|d| d.short() == lower || d.name() == lower)
            .ok_or_else(|| HushError::InvalidDay(s.to_string()))
    }
}

/// Parse a comma-separated day list such as `mon,tue,fri`.
///
/// The shorthands `weekdays`, `weekend` and `all` are accepted; an empty
/// string yields the empty set.
pub fn parse_days(s: &str) -> Result<BTreeSet<Day>> {
    let mut days = BTreeSet::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.to_ascii_lowercase().as_str() {
            "all" => days.extend(Day::all()),
            "weekdays" => days.extend(&Day::all()[..5]),
            "weekend" => days.extend(&Day::all()[5..]),
            _ => {
                days.insert(part.parse::<Day>()?);
            }
        }
    }
    Ok(days)
}

/// Parse a wall-clock time given as `HH:MM` or `HH:MM:SS`.
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S"))
        .map_err(|_| HushError::InvalidTime(s.to_string()))
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub app_id: String,
    pub mode: ListMode,
    #[serde(default)]
    pub active_days: BTreeSet<Day>,
    #[serde(default = "default_window_start")]
    pub window_start: NaiveTime,
    #[serde(default = "default_window_end")]
    pub window_end: NaiveTime,
}

fn default_window_start() -> NaiveTime {
    NaiveTime::MIN
}

fn default_window_end() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN)
}

impl Policy {
    /// A policy with no active days and the full-day window `00:00`–`23:59`.
    pub fn new(app_id: impl Into<String>, mode: ListMode) -> Result<Self> {
        let app_id = app_id.into();
        validate_app_id(&app_id)?;
        Ok(Self {
            app_id,
            mode,
            active_days: BTreeSet::new(),
            window_start: default_window_start(),
            window_end: default_window_end(),
        })
    }

    pub fn with_days(mut self, days: impl IntoIterator<Item = Day>) -> Self {
        self.active_days = days.into_iter().collect();
        self
    }

    pub fn with_window(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.window_start = start;
        self.window_end = end;
        self
    }

    /// Human-readable day list, e.g. `mon,wed,fri` or `-` when empty.
    pub fn days_label(&self) -> String {
        if self.active_days.is_empty() {
            return "-".to_string();
        }
        self.active_days
            .iter()
            .map(|d| d.short())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Report shapes that leave the window permanently closed.
    ///
    /// These are legal policies: an allowlist with no active days is how an
    /// app gets muted completely.
    pub fn validate(&self) -> Vec<PolicyWarning> {
        let mut warnings = Vec::new();
        if self.active_days.is_empty() {
            warnings.push(PolicyWarning {
                message: match self.mode {
                    ListMode::Allowlist => {
                        "no active days: every notification will be deferred".to_string()
                    }
                    ListMode::Denylist => {
                        "no active days: the window never opens, so nothing is muted".to_string()
                    }
                },
            });
        }
        if self.window_start >= self.window_end {
            warnings.push(PolicyWarning {
                message: format!(
                    "window {}-{} is empty (start must be before end; windows do not wrap midnight)",
                    self.window_start.format("%H:%M"),
                    self.window_end.format("%H:%M")
                ),
            });
        }
        warnings
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyWarning {
    pub message: String,
}

pub(crate) fn validate_app_id(app_id: &str) -> Result<()> {
    if app_id.trim().is_empty() || app_id.contains('\0') {
        return Err(HushError::InvalidAppId(app_id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
