use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::request::{JobFailure, Payload};

pub type JobId = u64;

/// Fixed interval between status checks of a long-running video operation.
pub const VIDEO_POLL_INTERVAL_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Text,
    Image,
    StreamingText,
    Edit,
    Video,
}

impl JobKind {
    pub fn poll_interval_ms(self) -> u64 {
        match self {
            JobKind::Video => VIDEO_POLL_INTERVAL_MS,
            JobKind::Text | JobKind::Image | JobKind::StreamingText | JobKind::Edit => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Streaming,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

/// One outstanding request to the remote generative service.
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncJob {
    pub kind: JobKind,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub poll_interval_ms: u64,
    pub result: Option<Payload>,
    pub error: Option<JobFailure>,
}

impl AsyncJob {
    pub fn new(kind: JobKind, submitted_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            status: JobStatus::Pending,
            submitted_at,
            poll_interval_ms: kind.poll_interval_ms(),
            result: None,
            error: None,
        }
    }

    /// Marks the job as receiving increments. Only streamed text may stream.
    pub fn mark_streaming(&mut self) -> bool {
        if self.kind != JobKind::StreamingText || self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Streaming;
        true
    }

    pub fn complete(&mut self, payload: Payload) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Done;
        self.result = Some(payload);
        true
    }

    pub fn fail(&mut self, failure: JobFailure) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error = Some(failure);
        true
    }
}
