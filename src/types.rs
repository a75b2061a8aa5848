//! Core value types shared by the engine components.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchError};

/// Identifies a watched web resource (its URL).
///
/// Equality is exact string equality. Surrounding whitespace is trimmed on
/// construction and the result must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl AsRef<str>) -> Result<Self> {
        let trimmed = id.as_ref().trim();
        if trimmed.is_empty() {
            return Err(WatchError::Precondition(
                "resource id must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceId {
    type Error = WatchError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

/// A detected content change for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub id: ResourceId,
    /// Length in bytes of the previous snapshot.
    pub previous_len: usize,
    /// Length in bytes of the new snapshot.
    pub current_len: usize,
    pub detected_at: DateTime<Local>,
}

impl ChangeEvent {
    pub fn new(id: ResourceId, previous_len: usize, current_len: usize) -> Self {
        Self {
            id,
            previous_len,
            current_len,
            detected_at: Local::now(),
        }
    }
}

/// Result of evaluating one freshly normalized document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No prior snapshot existed; the baseline was recorded.
    Baseline,
    /// Content matches the prior snapshot.
    Unchanged,
    /// Content differs from the prior snapshot.
    Changed(ChangeEvent),
}

impl Outcome {
    pub fn change(&self) -> Option<&ChangeEvent> {
        match self {
            Outcome::Changed(event) => Some(event),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Baseline => "baseline",
            Outcome::Unchanged => "unchanged",
            Outcome::Changed(_) => "changed",
        }
    }
}

/// Per-resource record of one scheduler run.
#[derive(Debug)]
pub struct ResourceReport {
    pub id: ResourceId,
    pub result: Result<Outcome>,
}

/// Summary of one scheduler run.
#[derive(Debug, Default)]
pub struct TickReport {
    pub resources: Vec<ResourceReport>,
}

impl TickReport {
    pub fn baseline(&self) -> usize {
        self.count(|r| matches!(r.result, Ok(Outcome::Baseline)))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|r| matches!(r.result, Ok(Outcome::Unchanged)))
    }

    pub fn changed(&self) -> usize {
        self.count(|r| matches!(r.result, Ok(Outcome::Changed(_))))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| r.result.is_err())
    }

    /// Change events in the order their resources finished.
    pub fn changes(&self) -> Vec<&ChangeEvent> {
        self.resources
            .iter()
            .filter_map(|r| r.result.as_ref().ok().and_then(Outcome::change))
            .collect()
    }

    fn count<F: Fn(&ResourceReport) -> bool>(&self, pred: F) -> usize {
        self.resources.iter().filter(|r| pred(r)).count()
    }
}
