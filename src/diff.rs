//! Change detection against the stored snapshot.

use tracing::{debug, info};

use crate::error::Result;
use crate::snapshot::SnapshotStore;
use crate::types::{ChangeEvent, Outcome, ResourceId};

/// Compares freshly normalized text with the last snapshot and records the
/// new text.
///
/// The snapshot is rewritten after every evaluation, changed or not, so each
/// comparison is against the immediately preceding successful fetch. A first
/// observation only records a baseline and never reports a change.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    store: SnapshotStore,
}

impl DiffEngine {
    pub fn new(store: SnapshotStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Evaluate `text` for `id`.
    ///
    /// A storage failure is returned as an error and no change is reported;
    /// the old snapshot is still in place, so the change is picked up again
    /// on the next successful evaluation.
    pub fn evaluate(&self, id: &ResourceId, text: &str) -> Result<Outcome> {
        let previous = self.store.get(id)?;

        let outcome = match previous {
            None => Outcome::Baseline,
            Some(prev) if prev == text => Outcome::Unchanged,
            Some(prev) => Outcome::Changed(ChangeEvent::new(id.clone(), prev.len(), text.len())),
        };

        self.store.put(id, text)?;

        match &outcome {
            Outcome::Baseline => info!("Baseline saved for {} ({} bytes)", id, text.len()),
            Outcome::Unchanged => debug!("No change for {}", id),
            Outcome::Changed(event) => info!(
                "Change detected for {} (was {} bytes, now {} bytes)",
                id, event.previous_len, event.current_len
            ),
        }

        Ok(outcome)
    }
}
