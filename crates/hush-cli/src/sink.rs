//! Notification sink that writes each delivery and cancellation as one JSON
//! object per line. Stands in for the device notification API.

use hush_core::collab::NotificationSink;
use hush_core::notification::{DeliveryHandle, NotificationKey, Outgoing};
use hush_core::{HushError, Result};
use serde::Serialize;
use std::io::Write;
use std::sync::Mutex;

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum SinkLine<'a> {
    Deliver {
        #[serde(flatten)]
        notification: &'a Outgoing,
    },
    Cancel {
        key: &'a NotificationKey,
    },
}

pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, line: &SinkLine<'_>) -> Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| HushError::Sink("output lock poisoned".into()))?;
        serde_json::to_writer(&mut *out, line)?;
        writeln!(out).map_err(|e| HushError::Sink(e.to_string()))?;
        out.flush().map_err(|e| HushError::Sink(e.to_string()))
    }
}

impl<W: Write + Send> NotificationSink for JsonLinesSink<W> {
    fn deliver(&self, notification: &Outgoing) -> Result<DeliveryHandle> {
        self.emit(&SinkLine::Deliver { notification })?;
        Ok(DeliveryHandle(notification.source_id.to_string()))
    }

    fn cancel(&self, key: &NotificationKey) -> Result<()> {
        self.emit(&SinkLine::Cancel { key })
    }
}
