use crate::engine;
use crate::output::print_json;
use hush_core::scheduler::ReleaseScheduler;
use std::path::Path;

/// Run a single release tick, as the daemon does every interval.
pub fn run(root: &Path, at: Option<&str>, json: bool) -> anyhow::Result<()> {
    let now = super::parse_at(at)?;
    let engine = engine::open(root)?;
    let scheduler = ReleaseScheduler::new(engine.filter, engine.config.scheduler.interval());
    let report = scheduler.tick(now);

    if json {
        print_json(&report)?;
    } else {
        println!(
            "Checked {} app(s), {} open: delivered {}, retained {}",
            report.apps_checked, report.apps_open, report.delivered, report.retained
        );
    }
    if report.failed {
        anyhow::bail!("release tick failed; see log for details");
    }
    Ok(())
}
