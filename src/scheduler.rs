//! Periodic re-check loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::engine::Engine;
use crate::types::TickReport;

/// Scheduler state as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick (or not started).
    Idle,
    /// A run over the watch list is in progress.
    Running,
}

/// Background service that runs the engine over the watch list on a fixed
/// interval.
///
/// The first run starts immediately. The next one is armed only after the
/// previous one finished, so a slow run delays the schedule instead of
/// piling up runs. At most one loop exists per scheduler: [`Scheduler::stop`]
/// waits for the loop to exit before a later `start` can spawn another.
pub struct Scheduler {
    engine: Arc<Engine>,
    interval: Duration,
    running: Arc<RwLock<bool>>,
    /// Handle and wake-up signal of the live loop.
    task: Mutex<Option<(JoinHandle<()>, Arc<Notify>)>>,
}

impl Scheduler {
    pub fn new(engine: Arc<Engine>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            running: Arc::new(RwLock::new(false)),
            task: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the loop in the background. Calling it twice is a no-op.
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            warn!("Scheduler already running");
            return;
        }
        *self.running.write().await = true;

        let engine = Arc::clone(&self.engine);
        let running = Arc::clone(&self.running);
        let wake = Arc::new(Notify::new());
        let loop_wake = Arc::clone(&wake);
        let interval = self.interval;

        info!("Scheduler started (interval={:?})", interval);

        let handle = tokio::spawn(async move {
            loop {
                if !*running.read().await {
                    break;
                }

                engine.run_once().await;

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = loop_wake.notified() => {}
                }
            }
            info!("Scheduler stopped");
        });
        *task = Some((handle, wake));
    }

    /// Stop the loop and wait for it to exit. An in-progress run finishes
    /// first.
    pub async fn stop(&self) {
        let mut task = self.task.lock().await;
        *self.running.write().await = false;

        let Some((handle, wake)) = task.take() else {
            return;
        };
        wake.notify_one();
        if let Err(e) = handle.await {
            warn!("Scheduler loop ended abnormally: {}", e);
        }
    }

    /// Run immediately, waiting for an active run to finish first.
    pub async fn trigger_now(&self) -> TickReport {
        self.engine.run_once().await
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub fn state(&self) -> SchedulerState {
        if self.engine.is_busy() {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }
}
