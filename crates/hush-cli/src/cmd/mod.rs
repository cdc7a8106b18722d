pub mod apps;
pub mod config;
pub mod daemon;
pub mod deferred;
pub mod init;
pub mod policy;
pub mod post;
pub mod release;

use chrono::NaiveDateTime;

/// Parse an `--at` local wall-clock instant, defaulting to now.
///
/// Accepts `YYYY-MM-DDTHH:MM[:SS]` and `YYYY-MM-DD HH:MM[:SS]`.
pub fn parse_at(at: Option<&str>) -> anyhow::Result<NaiveDateTime> {
    let Some(s) = at else {
        return Ok(chrono::Local::now().naive_local());
    };
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s.trim(), f).ok())
        .ok_or_else(|| anyhow::anyhow!("invalid --at '{s}': expected YYYY-MM-DDTHH:MM"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike, Weekday};

    #[test]
    fn parse_at_accepts_both_separators() {
        let a = parse_at(Some("2024-01-01T10:00")).unwrap();
        let b = parse_at(Some("2024-01-01 10:00:00")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.weekday(), Weekday::Mon);
        assert_eq!(a.hour(), 10);
    }

    #[test]
    fn parse_at_rejects_garbage() {
        assert!(parse_at(Some("monday morning")).is_err());
    }
}
