//! Notification sinks.
//!
//! The engine calls [`Notifier::notify`] once per detected change and
//! [`Notifier::report_error`] once per failed resource. Delivery is up to the
//! implementation; a sink never fails the engine, so errors while delivering
//! are logged and swallowed.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::WatchError;
use crate::types::{ChangeEvent, ResourceId};

/// Consumer of change events and per-resource failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &ChangeEvent);

    async fn report_error(&self, id: &ResourceId, cause: &WatchError);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &ChangeEvent) {
        info!(
            url = %event.id,
            previous_len = event.previous_len,
            current_len = event.current_len,
            "There is new activity on {}",
            event.id
        );
    }

    async fn report_error(&self, id: &ResourceId, cause: &WatchError) {
        warn!(url = %id, "Could not access {}: {}", id, cause);
    }
}

/// Event forwarded by [`ChannelNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Changed(ChangeEvent),
    Failed { id: ResourceId, message: String },
}

/// Forwards events over an unbounded channel, for embedding front-ends.
///
/// ```
/// use sitewatch::notify::{ChannelNotifier, Notifier, WatchEvent};
/// use sitewatch::{ChangeEvent, ResourceId};
///
/// # tokio_test::block_on(async {
/// let (notifier, mut rx) = ChannelNotifier::new();
/// let id = ResourceId::new("https://example.com").unwrap();
/// notifier.notify(&ChangeEvent::new(id, 5, 12)).await;
/// assert!(matches!(rx.recv().await, Some(WatchEvent::Changed(_))));
/// # })
/// ```
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<WatchEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, event: &ChangeEvent) {
        if self.tx.send(WatchEvent::Changed(event.clone())).is_err() {
            warn!("Change event for {} dropped: receiver closed", event.id);
        }
    }

    async fn report_error(&self, id: &ResourceId, cause: &WatchError) {
        let event = WatchEvent::Failed {
            id: id.clone(),
            message: cause.to_string(),
        };
        if self.tx.send(event).is_err() {
            warn!("Error report for {} dropped: receiver closed", id);
        }
    }
}

/// Desktop alerts: a notification banner through `osascript` on macOS,
/// a plain line on stdout elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    fn change_message(id: &ResourceId) -> String {
        format!("There is new activity on {}", id)
    }

    #[cfg(target_os = "macos")]
    async fn banner(message: &str) {
        let script = format!(
            "display notification \"{}\" with title \"Website Change\"",
            message.replace('\\', "\\\\").replace('"', "\\\"")
        );
        match tokio::process::Command::new("osascript")
            .arg("-e")
            .arg(&script)
            .status()
            .await
        {
            Ok(status) if status.success() => {}
            Ok(status) => tracing::error!("osascript exited with {}", status),
            Err(e) => tracing::error!("Failed to run osascript: {}", e),
        }
    }

    #[cfg(not(target_os = "macos"))]
    async fn banner(message: &str) {
        println!(
            "[{}] Website Change: {}",
            chrono::Local::now().format("%H:%M"),
            message
        );
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, event: &ChangeEvent) {
        Self::banner(&Self::change_message(&event.id)).await;
    }

    async fn report_error(&self, id: &ResourceId, cause: &WatchError) {
        eprintln!(
            "[{}] Could not access {}: {}",
            chrono::Local::now().format("%H:%M"),
            id,
            cause
        );
    }
}

/// Delivers every event to each inner notifier in order.
#[derive(Clone, Default)]
pub struct CompositeNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl CompositeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn Notifier>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl Notifier for CompositeNotifier {
    async fn notify(&self, event: &ChangeEvent) {
        for sink in &self.sinks {
            sink.notify(event).await;
        }
    }

    async fn report_error(&self, id: &ResourceId, cause: &WatchError) {
        for sink in &self.sinks {
            sink.report_error(id, cause).await;
        }
    }
}
