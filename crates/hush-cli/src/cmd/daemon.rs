use crate::engine;
use anyhow::Context;
use hush_core::filter::FilterService;
use hush_core::notification::IncomingNotification;
use hush_core::scheduler::ReleaseScheduler;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Run the live filter and the release scheduler together.
///
/// Posted notifications arrive on stdin as one JSON object per line.
/// Deliveries and cancellations go to stdout as JSON lines. Stops on Ctrl-C,
/// or when stdin closes if `exit_on_eof` is set.
pub fn run(root: &Path, exit_on_eof: bool) -> anyhow::Result<()> {
    let engine = engine::open(root)?;
    let interval = engine.config.scheduler.interval();
    let filter = engine.filter;

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async move {
        let scheduler = ReleaseScheduler::new(filter.clone(), interval);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let scheduler_task = tokio::spawn(async move {
            scheduler
                .run(async move {
                    let _ = stop_rx.await;
                })
                .await;
        });

        tracing::info!("hush daemon running");
        let result = tokio::select! {
            res = read_events(filter, exit_on_eof) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        };

        let _ = stop_tx.send(());
        scheduler_task.await.context("release scheduler task failed")?;
        tracing::info!("hush daemon stopped");
        result
    });
    // A pending stdin read would otherwise hold up runtime shutdown.
    rt.shutdown_background();
    result
}

async fn read_events(filter: Arc<FilterService>, exit_on_eof: bool) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let event: IncomingNotification = match serde_json::from_str(&line) {
            Ok(ev) => ev,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed event");
                continue;
            }
        };

        // One event at a time; the filter does blocking store I/O.
        let f = filter.clone();
        tokio::task::spawn_blocking(move || {
            let now = chrono::Local::now().naive_local();
            f.on_notification(&event, now)
        })
        .await
        .context("filter task panicked")?;
    }

    if exit_on_eof {
        return Ok(());
    }
    tracing::info!("stdin closed; release scheduler keeps running until Ctrl-C");
    std::future::pending::<()>().await;
    Ok(())
}
