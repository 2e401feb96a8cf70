use std::fmt;

use studio_core::{FailureClass, JobFailure, JobId, Payload};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    StreamDelta {
        job_id: JobId,
        text: String,
    },
    PollAttempt {
        job_id: JobId,
        attempt: u32,
    },
    JobCompleted {
        job_id: JobId,
        result: Result<Payload, GenerationError>,
    },
}

/// Name of a long-running remote operation, as returned on submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    InProgress,
    /// The operation finished; the artifact must still be fetched from this URI.
    Done { result_uri: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct GenerationError {
    pub kind: FailureKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "job was cancelled")
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    /// Sentence shown to users in place of the technical message.
    pub fn user_message(&self) -> String {
        match &self.kind {
            FailureKind::RemoteCall | FailureKind::HttpStatus(_) | FailureKind::Network => {
                "The AI service could not complete the request. Please try again.".to_string()
            }
            FailureKind::TooLarge { .. } => {
                "The generated file was too large to download.".to_string()
            }
            FailureKind::Validation => {
                "The AI service returned a response in an unexpected format. Please try again."
                    .to_string()
            }
            FailureKind::Timeout => "The AI service took too long to respond.".to_string(),
            FailureKind::PollLimitExceeded { attempts } => format!(
                "Video generation did not finish after {attempts} status checks. Please try again later."
            ),
            FailureKind::Configuration => {
                "AI features are unavailable: the service is not configured.".to_string()
            }
            FailureKind::Cancelled => "The request was cancelled.".to_string(),
        }
    }

    pub fn to_failure(&self) -> JobFailure {
        let class = match self.kind {
            FailureKind::RemoteCall
            | FailureKind::HttpStatus(_)
            | FailureKind::TooLarge { .. }
            | FailureKind::Network => FailureClass::RemoteCall,
            FailureKind::Validation => FailureClass::Validation,
            FailureKind::Timeout | FailureKind::PollLimitExceeded { .. } => FailureClass::Timeout,
            FailureKind::Configuration => FailureClass::Configuration,
            FailureKind::Cancelled => FailureClass::Cancelled,
        };
        JobFailure::new(class, self.user_message()).with_detail(self.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The service answered but reported an error or an unusable response.
    RemoteCall,
    HttpStatus(u16),
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Validation,
    Timeout,
    PollLimitExceeded { attempts: u32 },
    Cancelled,
    Network,
    Configuration,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::RemoteCall => write!(f, "remote call failed"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Validation => write!(f, "invalid structured output"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::PollLimitExceeded { attempts } => {
                write!(f, "operation still running after {attempts} polls")
            }
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Configuration => write!(f, "configuration error"),
        }
    }
}
