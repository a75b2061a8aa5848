//! Change-detection engine.
//!
//! Owns the watch list and drives the per-resource pipeline:
//!
//! ```text
//! run_once ──► list copy ──► [fetch ─► normalize ─► evaluate ─► notify] × N
//!                              (bounded worker pool, one snapshot key each)
//! ```
//!
//! List mutations go through [`Engine::add_resource`] and
//! [`Engine::remove_resource`], which serialize on the list mutex. Only one
//! run is active at a time; removal also waits for an active run so a
//! snapshot is never rewritten after it was deleted.
//!
//! The list file may also be edited by another process (the CLI while the
//! daemon runs). Every mutation and every run re-reads it first, and each
//! run ends by deleting snapshots of ids that were dropped from the file
//! while it was in flight.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{Config, DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
use crate::diff::DiffEngine;
use crate::error::{Result, WatchError};
use crate::fetch::Fetcher;
use crate::normalize::normalize;
use crate::notify::Notifier;
use crate::snapshot::SnapshotStore;
use crate::types::{Outcome, ResourceId, ResourceReport, TickReport};
use crate::watchlist::WatchList;

pub struct Engine {
    list: Mutex<WatchList>,
    diff: DiffEngine,
    fetcher: Arc<dyn Fetcher>,
    notifier: Arc<dyn Notifier>,
    concurrency: usize,
    run_lock: Mutex<()>,
    /// Ids checked by the last run, for the orphan sweep.
    last_run: Mutex<Vec<ResourceId>>,
}

impl Engine {
    pub fn new(
        list: WatchList,
        store: SnapshotStore,
        fetcher: Arc<dyn Fetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            list: Mutex::new(list),
            diff: DiffEngine::new(store),
            fetcher,
            notifier,
            concurrency: DEFAULT_CONCURRENCY,
            run_lock: Mutex::new(()),
            last_run: Mutex::new(Vec::new()),
        }
    }

    /// Load the watch list and open the snapshot store under the configured
    /// data directory.
    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn Fetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let list =
            WatchList::load(config.watch_list_path())?.with_duplicates(config.allow_duplicates);
        let store = SnapshotStore::open(config.snapshot_dir())?;
        Ok(Self::new(list, store, fetcher, notifier).with_concurrency(config.concurrency))
    }

    /// Number of resources fetched concurrently within one run.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        self.diff.store()
    }

    /// Start watching `id`. Returns `false` if it was already watched and
    /// duplicates are disallowed.
    pub async fn add_resource(&self, id: ResourceId) -> Result<bool> {
        let mut list = self.list.lock().await;
        list.reload()?;
        list.add(id)
    }

    /// Stop watching `id` and delete its snapshot. Returns whether `id` was
    /// in the list.
    ///
    /// With duplicates allowed only the first occurrence is removed, and the
    /// snapshot is kept while another occurrence remains.
    ///
    /// The snapshot goes first: if deleting it fails the list is untouched,
    /// so the id is never dropped while its snapshot lingers.
    pub async fn remove_resource(&self, id: &ResourceId) -> Result<bool> {
        let _run = self.run_lock.lock().await;
        let mut list = self.list.lock().await;
        list.reload()?;

        let occurrences = list.list().iter().filter(|e| *e == id).count();
        if occurrences == 0 {
            return Ok(false);
        }
        if occurrences == 1 {
            self.diff.store().delete(id)?;
        }
        list.remove(id)
    }

    /// Ordered copy of the watch list.
    pub async fn current_list(&self) -> Vec<ResourceId> {
        self.list.lock().await.list()
    }

    /// Whether a run is in progress.
    pub fn is_busy(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Fetch, normalize and evaluate one resource, notifying on change and
    /// reporting failures. The snapshot is untouched when the fetch fails.
    pub async fn check_resource(&self, id: &ResourceId) -> Result<Outcome> {
        let result = self.pipeline(id).await;
        match &result {
            Ok(outcome) => {
                if let Some(event) = outcome.change() {
                    self.notifier.notify(event).await;
                }
            }
            Err(e) => self.notifier.report_error(id, e).await,
        }
        result
    }

    async fn pipeline(&self, id: &ResourceId) -> Result<Outcome> {
        let raw = self.fetcher.fetch(id).await?;

        // Normalizing and the snapshot read/write are blocking work.
        let diff = self.diff.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || diff.evaluate(&id, &normalize(&raw)))
            .await
            .map_err(|e| WatchError::Storage(format!("Evaluation task failed: {}", e)))?
    }

    /// One full pass over the watch list, waiting for any active run first.
    ///
    /// The list is re-read from disk and copied when the run starts;
    /// additions and removals made meanwhile apply from the next run on.
    pub async fn run_once(&self) -> TickReport {
        let _run = self.run_lock.lock().await;
        self.run_locked().await
    }

    /// Like [`Engine::run_once`] but returns `None` instead of waiting when a
    /// run is already active.
    pub async fn try_run_once(&self) -> Option<TickReport> {
        let Ok(_run) = self.run_lock.try_lock() else {
            debug!("Run already in progress, skipping");
            return None;
        };
        Some(self.run_locked().await)
    }

    async fn run_locked(&self) -> TickReport {
        let ids = {
            let mut list = self.list.lock().await;
            if let Err(e) = list.reload() {
                warn!("Could not re-read watch list, using last known: {}", e);
            }
            list.list()
        };
        let previous = std::mem::replace(&mut *self.last_run.lock().await, ids.clone());
        self.sweep_orphans(&previous).await;

        debug!(
            "Checking {} resource(s), concurrency={}",
            ids.len(),
            self.concurrency
        );

        let resources: Vec<ResourceReport> = stream::iter(ids.clone())
            .map(|id| async move {
                let result = self.check_resource(&id).await;
                ResourceReport { id, result }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        self.sweep_orphans(&ids).await;

        let report = TickReport { resources };
        if report.failed() > 0 {
            warn!(
                "Run finished with {} failure(s): {} changed, {} unchanged, {} new",
                report.failed(),
                report.changed(),
                report.unchanged(),
                report.baseline()
            );
        } else {
            info!(
                "Run finished: {} changed, {} unchanged, {} new",
                report.changed(),
                report.unchanged(),
                report.baseline()
            );
        }
        report
    }

    /// Delete snapshots of `checked` ids that are no longer in the list file.
    async fn sweep_orphans(&self, checked: &[ResourceId]) {
        if checked.is_empty() {
            return;
        }
        let mut list = self.list.lock().await;
        if let Err(e) = list.reload() {
            warn!("Could not re-read watch list, skipping snapshot cleanup: {}", e);
            return;
        }
        for id in checked.iter().filter(|id| !list.contains(id)) {
            match self.diff.store().delete(id) {
                Ok(()) => debug!("Dropped snapshot of unwatched {}", id),
                Err(e) => warn!("Failed to drop snapshot of unwatched {}: {}", id, e),
            }
        }
    }
}
