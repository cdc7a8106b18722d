use crate::engine;
use crate::output::print_json;
use chrono::{Local, TimeZone, Utc};
use hush_core::filter::FilterOutcome;
use hush_core::notification::IncomingNotification;
use std::path::Path;

pub struct PostArgs {
    pub app_id: String,
    pub title: String,
    pub body: String,
    pub key: Option<String>,
    pub at: Option<String>,
}

/// Push one notification through the filter as if the device had posted it.
pub fn run(root: &Path, args: PostArgs, json: bool) -> anyhow::Result<()> {
    let now = super::parse_at(args.at.as_deref())?;
    let posted_at = Local
        .from_local_datetime(&now)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let key = args
        .key
        .unwrap_or_else(|| format!("{}|{}", args.app_id, uuid::Uuid::new_v4()));
    let event = IncomingNotification::new(key, args.app_id, args.title, args.body, posted_at);

    let engine = engine::open(root)?;
    let outcome = engine.filter.on_notification(&event, now);

    if json {
        let value = match &outcome {
            FilterOutcome::PassThrough => serde_json::json!({ "outcome": "pass_through" }),
            FilterOutcome::Deferred(entry) => {
                serde_json::json!({ "outcome": "deferred", "entry": entry })
            }
            FilterOutcome::Dropped => serde_json::json!({ "outcome": "dropped" }),
        };
        print_json(&value)?;
    } else {
        match &outcome {
            FilterOutcome::PassThrough => println!("passed through: {}", event.app_id),
            FilterOutcome::Deferred(entry) => {
                println!("deferred: {} ({})", entry.app_id, entry.id)
            }
            FilterOutcome::Dropped => println!("dropped: {}", event.app_id),
        }
    }

    if outcome == FilterOutcome::Dropped {
        anyhow::bail!("notification for '{}' could not be queued", event.app_id);
    }
    Ok(())
}
