use crate::engine;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use hush_core::decision::{classify, Verdict};
use hush_core::policy::{parse_days, parse_time, ListMode, Policy};
use hush_core::store::RuleStore;
use hush_core::HushError;
use std::path::Path;

#[derive(Subcommand)]
pub enum PolicySubcommand {
    /// Create or replace the policy for an app
    Set {
        app_id: String,
        /// allowlist (notify only inside the window) or denylist (mute inside it)
        #[arg(long, default_value = "allowlist")]
        mode: String,
        /// Active days, comma-separated (mon,tue,... or all, weekdays, weekend)
        #[arg(long, default_value = "")]
        days: String,
        /// Window start, HH:MM
        #[arg(long, default_value = "00:00")]
        start: String,
        /// Window end, HH:MM (exclusive, never wraps midnight)
        #[arg(long, default_value = "23:59")]
        end: String,
    },
    /// Show one app's policy
    Show { app_id: String },
    /// List all policies
    List,
    /// Remove an app's policy (its deferred queue is kept)
    Remove { app_id: String },
    /// Evaluate an app's policy at a local time
    Check {
        app_id: String,
        /// Local time to evaluate, YYYY-MM-DDTHH:MM (default: now)
        #[arg(long)]
        at: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: PolicySubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        PolicySubcommand::Set {
            app_id,
            mode,
            days,
            start,
            end,
        } => set(root, &app_id, &mode, &days, &start, &end, json),
        PolicySubcommand::Show { app_id } => show(root, &app_id, json),
        PolicySubcommand::List => list(root, json),
        PolicySubcommand::Remove { app_id } => remove(root, &app_id, json),
        PolicySubcommand::Check { app_id, at } => check(root, &app_id, at.as_deref(), json),
    }
}

fn set(
    root: &Path,
    app_id: &str,
    mode: &str,
    days: &str,
    start: &str,
    end: &str,
    json: bool,
) -> anyhow::Result<()> {
    let mode: ListMode = mode.parse()?;
    let policy = Policy::new(app_id, mode)?
        .with_days(parse_days(days)?)
        .with_window(parse_time(start)?, parse_time(end)?);
    let warnings = policy.validate();

    let stores = engine::open_stores(root)?;
    stores
        .rules
        .put(&policy)
        .with_context(|| format!("failed to save policy for '{app_id}'"))?;
    tracing::info!(app_id, mode = %policy.mode, "policy saved");

    if json {
        print_json(&serde_json::json!({ "policy": policy, "warnings": warnings }))?;
    } else {
        println!(
            "Set {} for {}: {} {}-{}",
            policy.mode,
            policy.app_id,
            policy.days_label(),
            policy.window_start.format("%H:%M"),
            policy.window_end.format("%H:%M"),
        );
        for w in &warnings {
            eprintln!("warning: {}", w.message);
        }
    }
    Ok(())
}

fn show(root: &Path, app_id: &str, json: bool) -> anyhow::Result<()> {
    let stores = engine::open_stores(root)?;
    let policy = stores
        .rules
        .get(app_id)?
        .ok_or_else(|| HushError::PolicyNotFound(app_id.to_string()))?;

    if json {
        print_json(&policy)?;
    } else {
        println!("App:    {}", policy.app_id);
        println!("Mode:   {}", policy.mode);
        println!("Days:   {}", policy.days_label());
        println!(
            "Window: {} - {}",
            policy.window_start.format("%H:%M"),
            policy.window_end.format("%H:%M")
        );
        for w in policy.validate() {
            println!("Note:   {}", w.message);
        }
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let stores = engine::open_stores(root)?;
    let mut policies = stores.rules.get_all()?;
    policies.sort_by(|a, b| a.app_id.cmp(&b.app_id));

    if json {
        return print_json(&policies);
    }
    if policies.is_empty() {
        println!("No policies.");
        return Ok(());
    }
    let rows = policies
        .iter()
        .map(|p| {
            vec![
                p.app_id.clone(),
                p.mode.to_string(),
                p.days_label(),
                format!(
                    "{}-{}",
                    p.window_start.format("%H:%M"),
                    p.window_end.format("%H:%M")
                ),
            ]
        })
        .collect();
    print_table(&["APP", "MODE", "DAYS", "WINDOW"], rows);
    Ok(())
}

fn remove(root: &Path, app_id: &str, json: bool) -> anyhow::Result<()> {
    let stores = engine::open_stores(root)?;
    let removed = stores.rules.remove(app_id)?;

    if json {
        print_json(&serde_json::json!({ "app_id": app_id, "removed": removed }))?;
    } else if removed {
        println!("Removed policy for {app_id}");
    } else {
        println!("No policy for {app_id}");
    }
    Ok(())
}

fn check(root: &Path, app_id: &str, at: Option<&str>, json: bool) -> anyhow::Result<()> {
    let now = super::parse_at(at)?;
    let stores = engine::open_stores(root)?;
    let verdict = stores.rules.get(app_id)?.map(|p| classify(&p, now));
    let label = match verdict {
        Some(Verdict::Allow) => "allow",
        Some(Verdict::Deny) => "defer",
        None => "allow (unmanaged)",
    };

    if json {
        print_json(&serde_json::json!({
            "app_id": app_id,
            "at": now.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "managed": verdict.is_some(),
            "allowed": verdict.map_or(true, |v| v.is_allow()),
        }))?;
    } else {
        println!("{app_id} at {}: {label}", now.format("%a %Y-%m-%d %H:%M"));
    }
    Ok(())
}
