//! Release scheduler: on a fixed interval, drain the queue of every app whose
//! policy allows notifications right now.

use crate::config::MAX_INTERVAL_MINUTES;
use crate::filter::FilterService;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Source of the local wall-clock time a tick is evaluated at.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

fn local_clock() -> Clock {
    Arc::new(|| chrono::Local::now().naive_local())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Policies evaluated.
    pub apps_checked: usize,
    /// Policies whose window was open at tick time.
    pub apps_open: usize,
    pub delivered: usize,
    pub retained: usize,
    /// The tick could not enumerate policies and did nothing.
    pub failed: bool,
}

pub struct ReleaseScheduler {
    filter: Arc<FilterService>,
    interval: Duration,
    clock: Clock,
}

const MIN_INTERVAL: Duration = Duration::from_secs(1);
const MAX_INTERVAL: Duration = Duration::from_secs(MAX_INTERVAL_MINUTES * 60);

impl ReleaseScheduler {
    /// `interval` is clamped to between one second and one week.
    pub fn new(filter: Arc<FilterService>, interval: Duration) -> Self {
        Self {
            filter,
            interval: interval.clamp(MIN_INTERVAL, MAX_INTERVAL),
            clock: local_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run one release pass as of `now`.
    ///
    /// Failures never propagate: a policy enumeration failure ends the tick
    /// with `failed` set, and a failure on one app's queue is logged and
    /// skipped so the other apps still drain.
    pub fn tick(&self, now: NaiveDateTime) -> TickReport {
        release_tick(&self.filter, now)
    }

    /// Tick every interval until `shutdown` resolves.
    ///
    /// The first tick fires one full interval after start. Each tick runs on
    /// the blocking pool and is awaited before shutdown is checked again, so
    /// a tick in progress always completes.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(interval_secs = self.interval.as_secs(), "release scheduler started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let filter = self.filter.clone();
                    let now = (self.clock)();
                    match tokio::task::spawn_blocking(move || release_tick(&filter, now)).await {
                        Ok(report) if report.delivered > 0 || report.retained > 0 => {
                            tracing::info!(
                                delivered = report.delivered,
                                retained = report.retained,
                                "release tick"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "release tick did not complete"),
                    }
                }
            }
        }
        tracing::info!("release scheduler stopped");
    }
}

fn release_tick(filter: &FilterService, now: NaiveDateTime) -> TickReport {
    let mut report = TickReport::default();

    let policies = match filter.rules().get_all() {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "release tick could not list policies; waiting for next tick");
            report.failed = true;
            return report;
        }
    };

    for policy in &policies {
        report.apps_checked += 1;
        match filter.release_if_allowed(policy, now) {
            Ok(None) => {}
            Ok(Some(drained)) => {
                report.apps_open += 1;
                report.delivered += drained.delivered;
                report.retained += drained.retained;
            }
            Err(e) => {
                report.apps_open += 1;
                tracing::warn!(app_id = %policy.app_id, error = %e, "could not drain deferred queue");
            }
        }
    }

    tracing::debug!(
        %now,
        checked = report.apps_checked,
        open = report.apps_open,
        delivered = report.delivered,
        retained = report.retained,
        "release tick finished"
    );
    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
