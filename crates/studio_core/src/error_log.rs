use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::request::JobFailure;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorLogEntry {
    pub timestamp: DateTime<Utc>,
    pub context: String,
    pub message: String,
    pub detail: Option<String>,
}

/// Append-only record of every caught failure for the operator panel.
///
/// Entries live for the application session and leave only through [`ErrorLog::clear`].
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    entries: Vec<ErrorLogEntry>,
    clock: Clock,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            entries: Vec::new(),
            clock,
        }
    }

    pub fn record(&mut self, context: impl Into<String>, failure: &JobFailure) {
        self.entries.push(ErrorLogEntry {
            timestamp: self.clock.now(),
            context: context.into(),
            message: failure.message.clone(),
            detail: failure.detail.clone(),
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Snapshot of the log, newest entry first.
    pub fn list(&self) -> Vec<ErrorLogEntry> {
        self.entries.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
