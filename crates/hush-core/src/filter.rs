//! Filter service: the live gate every posted notification passes through,
//! and the release path the scheduler drains queues with.
//!
//! Live path: look up the app's policy, classify the instant, and either let
//! the notification through or queue it and cancel the live copy. The queue
//! write always completes before the cancel is issued.
//!
//! Release path: re-deliver an app's queue oldest first, removing each entry
//! only after the sink accepted it. Failed deliveries stay queued.

use crate::collab::{AppInventory, NotificationSink};
use crate::config::Config;
use crate::decision::{classify, Verdict};
use crate::error::{HushError, Result};
use crate::notification::{DeferredNotification, IncomingNotification, NotificationKey, Outgoing};
use crate::policy::Policy;
use crate::store::{DeferredStore, RuleStore};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Options / results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FilterOptions {
    /// Notifications from this app are never filtered.
    pub self_app_id: Option<String>,
    pub channel: String,
    pub prefix_app_name: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for FilterOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            self_app_id: cfg
                .self_app_id
                .clone()
                .filter(|id| !id.trim().is_empty()),
            channel: cfg.delivery.channel.clone(),
            prefix_app_name: cfg.delivery.prefix_app_name,
        }
    }
}

/// What happened to one live notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Not managed, or inside its allowed time: shown unchanged.
    PassThrough,
    /// Queued for later and cancelled on the device.
    Deferred(DeferredNotification),
    /// Denied but could not be queued; the content is gone.
    Dropped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub delivered: usize,
    pub retained: usize,
}

// ---------------------------------------------------------------------------
// FilterService
// ---------------------------------------------------------------------------

pub struct FilterService {
    rules: Arc<dyn RuleStore>,
    deferred: Arc<dyn DeferredStore>,
    inventory: Arc<dyn AppInventory>,
    sink: Arc<dyn NotificationSink>,
    options: FilterOptions,
}

impl FilterService {
    pub fn new(
        rules: Arc<dyn RuleStore>,
        deferred: Arc<dyn DeferredStore>,
        inventory: Arc<dyn AppInventory>,
        sink: Arc<dyn NotificationSink>,
        options: FilterOptions,
    ) -> Self {
        Self {
            rules,
            deferred,
            inventory,
            sink,
            options,
        }
    }

    pub fn rules(&self) -> &dyn RuleStore {
        self.rules.as_ref()
    }

    pub fn deferred(&self) -> &dyn DeferredStore {
        self.deferred.as_ref()
    }

    fn is_self(&self, app_id: &str) -> bool {
        self.options.self_app_id.as_deref() == Some(app_id)
    }

    /// Whether a notification from `app_id` posted at local time `now`
    /// should be held back. Unmanaged apps are never held back, and a rule
    /// lookup that fails lets the notification through.
    pub fn should_suppress(&self, app_id: &str, now: NaiveDateTime) -> bool {
        if self.is_self(app_id) {
            return false;
        }
        match self.rules.get(app_id) {
            Ok(Some(policy)) => classify(&policy, now) == Verdict::Deny,
            Ok(None) => false,
            Err(e) => {
                tracing::error!(app_id, error = %e, "policy lookup failed, letting notification through");
                false
            }
        }
    }

    /// Queue `event` and cancel its live copy.
    ///
    /// The queue write finishes before the cancel is sent. If the write
    /// fails the live copy is still cancelled, the content is lost, and the
    /// failure comes back as `PersistenceFailure`.
    pub fn record_suppressed(&self, event: &IncomingNotification) -> Result<DeferredNotification> {
        let app_name = self
            .inventory
            .resolve(&event.app_id)
            .map(|info| info.name)
            .unwrap_or_else(|| event.app_id.clone());
        let entry = DeferredNotification::from_incoming(event, app_name);

        let persisted = self.deferred.put(&entry);
        self.cancel_live(&event.key, &event.app_id);

        match persisted {
            Ok(()) => {
                tracing::info!(app_id = %entry.app_id, id = %entry.id, "notification deferred");
                Ok(entry)
            }
            Err(e) => {
                tracing::error!(
                    kind = "persistence_failure",
                    app_id = %event.app_id,
                    key = %event.key,
                    error = %e,
                    "could not queue suppressed notification; it is lost"
                );
                Err(HushError::PersistenceFailure {
                    app_id: event.app_id.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn cancel_live(&self, key: &NotificationKey, app_id: &str) {
        if let Err(e) = self.sink.cancel(key) {
            tracing::warn!(app_id, key = %key, error = %e, "cancel of live notification failed");
        }
    }

    /// Entry point for each posted notification. Never fails: every error
    /// is logged and folded into the outcome.
    pub fn on_notification(&self, event: &IncomingNotification, now: NaiveDateTime) -> FilterOutcome {
        if !self.should_suppress(&event.app_id, now) {
            tracing::debug!(app_id = %event.app_id, "notification passes");
            return FilterOutcome::PassThrough;
        }
        match self.record_suppressed(event) {
            Ok(entry) => FilterOutcome::Deferred(entry),
            Err(_) => FilterOutcome::Dropped,
        }
    }

    fn outgoing(&self, entry: &DeferredNotification) -> Outgoing {
        let title = if self.options.prefix_app_name {
            format!("[{}] {}", entry.app_name, entry.title)
        } else {
            entry.title.clone()
        };
        Outgoing {
            source_id: entry.id,
            app_id: entry.app_id.clone(),
            title,
            body: entry.body.clone(),
            icon: self.inventory.resolve(&entry.app_id).and_then(|i| i.icon),
            channel: self.options.channel.clone(),
        }
    }

    /// Re-deliver and remove every queued entry for `app_id`, oldest first.
    ///
    /// One failed delivery does not stop the rest; it stays queued for the
    /// next attempt. An entry that was delivered but could not be removed
    /// will be delivered again next time.
    pub fn release(&self, app_id: &str) -> Result<DrainReport> {
        let entries = self.deferred.list_for(app_id)?;
        let mut report = DrainReport::default();

        for entry in &entries {
            match self.sink.deliver(&self.outgoing(entry)) {
                Ok(_) => {
                    report.delivered += 1;
                    if let Err(e) = self.deferred.remove(&entry.app_id, entry.id) {
                        tracing::warn!(
                            app_id,
                            id = %entry.id,
                            error = %e,
                            "delivered entry could not be removed; it will be delivered again"
                        );
                    }
                }
                Err(e) => {
                    report.retained += 1;
                    let retry = HushError::DeliveryRetry {
                        app_id: entry.app_id.clone(),
                        id: entry.id.to_string(),
                        reason: e.to_string(),
                    };
                    tracing::warn!(kind = "delivery_retry", app_id, id = %entry.id, "{retry}");
                }
            }
        }

        if report.delivered > 0 || report.retained > 0 {
            tracing::info!(
                app_id,
                delivered = report.delivered,
                retained = report.retained,
                "released deferred notifications"
            );
        }
        Ok(report)
    }

    /// Release `policy`'s queue if its app may notify at `now`.
    /// Returns `None` when the window is closed.
    pub fn release_if_allowed(&self, policy: &Policy, now: NaiveDateTime) -> Result<Option<DrainReport>> {
        if classify(policy, now) == Verdict::Deny {
            return Ok(None);
        }
        self.release(&policy.app_id).map(Some)
    }

    /// Drop one queued entry without delivering it.
    pub fn clear(&self, app_id: &str, id: Uuid) -> Result<bool> {
        self.deferred.remove(app_id, id)
    }

    /// Drop an app's whole queue without delivering it.
    pub fn clear_all(&self, app_id: &str) -> Result<usize> {
        self.deferred.remove_all(app_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::YamlInventory;
    use crate::policy::{Day, ListMode};
    use crate::testing::{
        inventory, monday_at, temp_stores, tuesday_at, FlakyDeferredStore, FlakyRuleStore,
        Journal, RecordingSink,
    };
    use chrono::{NaiveTime, TimeZone, Utc};
    use std::sync::Mutex;
    use tempfile::TempDir;

    const CHAT: &str = "com.example.chat";

    struct Harness {
        _dir: TempDir,
        service: FilterService,
        sink: Arc<RecordingSink>,
        deferred: Arc<FlakyDeferredStore>,
        rules: Arc<FlakyRuleStore>,
        journal: Journal,
    }

    fn harness_with(options: FilterOptions) -> Harness {
        let (dir, stores) = temp_stores();
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::new(RecordingSink::with_journal(journal.clone()));
        let deferred = Arc::new(FlakyDeferredStore::new(
            stores.deferred.clone(),
            Some(journal.clone()),
        ));
        let rules = Arc::new(FlakyRuleStore::new(stores.rules.clone()));
        let service = FilterService::new(
            rules.clone(),
            deferred.clone(),
            Arc::new(inventory()),
            sink.clone(),
            options,
        );
        Harness {
            _dir: dir,
            service,
            sink,
            deferred,
            rules,
            journal,
        }
    }

    fn harness() -> Harness {
        harness_with(FilterOptions::default())
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn monday_nine_to_five(app_id: &str) -> Policy {
        Policy::new(app_id, ListMode::Allowlist)
            .unwrap()
            .with_days([Day::Monday])
            .with_window(t(9, 0), t(17, 0))
    }

    fn event(key: &str, app_id: &str, title: &str, minute: u32) -> IncomingNotification {
        IncomingNotification::new(
            key,
            app_id,
            title,
            format!("body of {title}"),
            Utc.with_ymd_and_hms(2024, 1, 2, 10, minute, 0).unwrap(),
        )
    }

    #[test]
    fn unmanaged_app_is_never_suppressed() {
        let h = harness();
        h.rules
            .put(&Policy::new("com.example.mail", ListMode::Allowlist).unwrap())
            .unwrap();
        for now in [monday_at(3, 0), monday_at(12, 0), tuesday_at(23, 0)] {
            assert!(!h.service.should_suppress(CHAT, now));
        }
        let outcome = h.service.on_notification(&event("k", CHAT, "hi", 0), monday_at(3, 0));
        assert_eq!(outcome, FilterOutcome::PassThrough);
        assert!(h.sink.cancelled().is_empty());
    }

    #[test]
    fn denylist_without_days_never_suppresses() {
        let h = harness();
        h.rules
            .put(
                &Policy::new(CHAT, ListMode::Denylist)
                    .unwrap()
                    .with_window(t(0, 0), t(23, 59)),
            )
            .unwrap();
        for now in [monday_at(0, 30), tuesday_at(12, 0), tuesday_at(23, 58)] {
            assert!(!h.service.should_suppress(CHAT, now));
        }
    }

    #[test]
    fn allowlist_without_days_suppresses_everything() {
        let h = harness();
        h.rules
            .put(&Policy::new(CHAT, ListMode::Allowlist).unwrap())
            .unwrap();
        for now in [monday_at(0, 30), tuesday_at(12, 0), tuesday_at(23, 58)] {
            assert!(h.service.should_suppress(CHAT, now));
        }
    }

    #[test]
    fn allowed_event_passes_and_is_not_stored() {
        let h = harness();
        h.rules.put(&monday_nine_to_five(CHAT)).unwrap();

        let outcome = h.service.on_notification(&event("k1", CHAT, "hello", 0), monday_at(10, 0));

        assert_eq!(outcome, FilterOutcome::PassThrough);
        assert!(h.deferred.list_for(CHAT).unwrap().is_empty());
        assert!(h.sink.cancelled().is_empty());
    }

    #[test]
    fn denied_event_is_stored_then_cancelled() {
        let h = harness();
        h.rules.put(&monday_nine_to_five(CHAT)).unwrap();

        let outcome = h.service.on_notification(&event("k1", CHAT, "hello", 0), tuesday_at(10, 0));

        let entry = match outcome {
            FilterOutcome::Deferred(entry) => entry,
            other => panic!("expected Deferred, got {other:?}"),
        };
        assert_eq!(entry.app_name, "Chat");
        assert_eq!(entry.body, "body of hello");
        assert_eq!(h.deferred.list_for(CHAT).unwrap(), vec![entry]);
        assert_eq!(h.sink.cancelled(), vec![NotificationKey("k1".into())]);
        assert_eq!(
            h.journal.lock().unwrap().clone(),
            vec!["put hello".to_string(), "cancel k1".to_string()]
        );
    }

    #[test]
    fn unknown_app_name_falls_back_to_app_id() {
        let h = harness();
        h.rules
            .put(&Policy::new("org.unknown", ListMode::Allowlist).unwrap())
            .unwrap();
        let entry = h
            .service
            .record_suppressed(&event("k", "org.unknown", "x", 0))
            .unwrap();
        assert_eq!(entry.app_name, "org.unknown");
    }

    #[test]
    fn persistence_failure_drops_and_reports() {
        let h = harness();
        h.rules.put(&monday_nine_to_five(CHAT)).unwrap();
        h.deferred.fail_writes(true);

        let err = h
            .service
            .record_suppressed(&event("k1", CHAT, "lost", 0))
            .unwrap_err();
        assert!(matches!(err, HushError::PersistenceFailure { .. }));
        assert_eq!(h.sink.cancelled().len(), 1);

        // The next event is filtered normally once the store recovers.
        h.deferred.fail_writes(false);
        let outcome = h.service.on_notification(&event("k2", CHAT, "kept", 1), tuesday_at(10, 0));
        assert!(matches!(outcome, FilterOutcome::Deferred(_)));
    }

    #[test]
    fn on_notification_reports_dropped_on_persistence_failure() {
        let h = harness();
        h.rules.put(&monday_nine_to_five(CHAT)).unwrap();
        h.deferred.fail_writes(true);
        let outcome = h.service.on_notification(&event("k1", CHAT, "lost", 0), tuesday_at(10, 0));
        assert_eq!(outcome, FilterOutcome::Dropped);
    }

    #[test]
    fn rule_lookup_failure_lets_notification_through() {
        let h = harness();
        h.rules.put(&monday_nine_to_five(CHAT)).unwrap();
        h.rules.fail_reads(true);
        assert!(!h.service.should_suppress(CHAT, tuesday_at(10, 0)));
    }

    #[test]
    fn own_app_is_never_suppressed() {
        let h = harness_with(FilterOptions {
            self_app_id: Some("me.hush".into()),
            ..FilterOptions::default()
        });
        h.rules
            .put(&Policy::new("me.hush", ListMode::Allowlist).unwrap())
            .unwrap();
        assert!(!h.service.should_suppress("me.hush", tuesday_at(10, 0)));
    }

    #[test]
    fn release_drains_oldest_first_with_prefixed_titles() {
        let h = harness();
        h.rules.put(&monday_nine_to_five(CHAT)).unwrap();
        for (i, title) in ["t1", "t2", "t3"].iter().enumerate() {
            h.service
                .on_notification(&event(&format!("k{i}"), CHAT, title, i as u32), tuesday_at(10, 0));
        }

        let report = h.service.release(CHAT).unwrap();

        assert_eq!(report, DrainReport { delivered: 3, retained: 0 });
        let delivered = h.sink.delivered();
        let titles: Vec<_> = delivered.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(titles, vec!["[Chat] t1", "[Chat] t2", "[Chat] t3"]);
        assert_eq!(delivered[0].icon.as_deref(), Some("res://chat"));
        assert_eq!(delivered[0].channel, "deferred");
        assert!(h.deferred.list_for(CHAT).unwrap().is_empty());
    }

    #[test]
    fn release_without_prefix_keeps_title() {
        let h = harness_with(FilterOptions {
            prefix_app_name: false,
            channel: "quiet".into(),
            ..FilterOptions::default()
        });
        h.rules.put(&monday_nine_to_five(CHAT)).unwrap();
        h.service.record_suppressed(&event("k", CHAT, "plain", 0)).unwrap();
        h.service.release(CHAT).unwrap();
        let delivered = h.sink.delivered();
        assert_eq!(delivered[0].title, "plain");
        assert_eq!(delivered[0].channel, "quiet");
    }

    #[test]
    fn failed_delivery_is_retained_and_retried() {
        let h = harness();
        h.rules.put(&monday_nine_to_five(CHAT)).unwrap();
        for (i, title) in ["ok-1", "flaky", "ok-2"].iter().enumerate() {
            h.service
                .record_suppressed(&event(&format!("k{i}"), CHAT, title, i as u32))
                .unwrap();
        }
        h.sink.fail_titles_containing("flaky");

        let report = h.service.release(CHAT).unwrap();
        assert_eq!(report, DrainReport { delivered: 2, retained: 1 });
        let left = h.deferred.list_for(CHAT).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].title, "flaky");

        h.sink.heal();
        let report = h.service.release(CHAT).unwrap();
        assert_eq!(report, DrainReport { delivered: 1, retained: 0 });
        assert!(h.deferred.list_for(CHAT).unwrap().is_empty());
    }

    #[test]
    fn release_reports_unreadable_queue() {
        let h = harness();
        h.service.record_suppressed(&event("k", CHAT, "stuck", 0)).unwrap();
        h.deferred.fail_reads(true);

        assert!(matches!(h.service.release(CHAT), Err(HushError::Store(_))));
        assert!(h.sink.delivered().is_empty());

        h.deferred.fail_reads(false);
        assert_eq!(h.service.release(CHAT).unwrap().delivered, 1);
    }

    #[test]
    fn release_if_allowed_respects_window() {
        let h = harness();
        let policy = monday_nine_to_five(CHAT);
        h.rules.put(&policy).unwrap();
        h.service.record_suppressed(&event("k", CHAT, "wait", 0)).unwrap();

        assert_eq!(h.service.release_if_allowed(&policy, tuesday_at(10, 0)).unwrap(), None);
        assert_eq!(h.deferred.list_for(CHAT).unwrap().len(), 1);

        let report = h.service.release_if_allowed(&policy, monday_at(10, 0)).unwrap();
        assert_eq!(report, Some(DrainReport { delivered: 1, retained: 0 }));
    }

    #[test]
    fn clear_and_clear_all() {
        let h = harness();
        let a = h.service.record_suppressed(&event("k1", CHAT, "a", 0)).unwrap();
        h.service.record_suppressed(&event("k2", CHAT, "b", 1)).unwrap();
        h.service.record_suppressed(&event("k3", CHAT, "c", 2)).unwrap();

        assert!(h.service.clear(CHAT, a.id).unwrap());
        assert!(!h.service.clear(CHAT, a.id).unwrap());
        assert_eq!(h.service.clear_all(CHAT).unwrap(), 2);
        assert!(h.sink.delivered().is_empty());
    }

    #[test]
    fn removing_policy_keeps_queue() {
        let h = harness();
        h.rules.put(&monday_nine_to_five(CHAT)).unwrap();
        h.service.record_suppressed(&event("k", CHAT, "kept", 0)).unwrap();

        h.rules.remove(CHAT).unwrap();

        assert_eq!(h.deferred.list_for(CHAT).unwrap().len(), 1);
        assert!(!h.service.should_suppress(CHAT, tuesday_at(10, 0)));
    }

    #[test]
    fn icon_is_resolved_at_delivery_time() {
        let (_dir, stores) = temp_stores();
        let sink = Arc::new(RecordingSink::default());
        let before = FilterService::new(
            stores.rules.clone(),
            stores.deferred.clone(),
            Arc::new(YamlInventory::default()),
            sink.clone(),
            FilterOptions::default(),
        );
        before.record_suppressed(&event("k", CHAT, "x", 0)).unwrap();

        // Same stores, inventory now knows the app.
        let after = FilterService::new(
            stores.rules.clone(),
            stores.deferred.clone(),
            Arc::new(inventory()),
            sink.clone(),
            FilterOptions::default(),
        );
        after.release(CHAT).unwrap();
        assert_eq!(sink.delivered()[0].icon.as_deref(), Some("res://chat"));
    }
}
