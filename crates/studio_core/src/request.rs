use serde::{Deserialize, Serialize};

use crate::allocation::AllocationSlice;
use crate::job::JobKind;

/// Base64 encoded media together with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaData {
    pub mime_type: String,
    pub data: String,
}

impl MediaData {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// `data:` URI suitable for an `<img>`/`<video>` source.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

/// Declared shape a single-shot text response must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputSchema {
    Allocations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// One request to the remote generative service, as decided by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    /// Streamed chat reply.
    Chat {
        system: String,
        history: Vec<ChatTurn>,
        prompt: String,
    },
    /// One-shot text, optionally constrained to a schema.
    Text {
        system: Option<String>,
        prompt: String,
        schema: Option<OutputSchema>,
    },
    Image {
        prompt: String,
        aspect_ratio: AspectRatio,
    },
    Edit {
        image: MediaData,
        instruction: String,
    },
    Video {
        prompt: String,
        image: Option<MediaData>,
    },
}

impl GenerationRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            GenerationRequest::Chat { .. } => JobKind::StreamingText,
            GenerationRequest::Text { .. } => JobKind::Text,
            GenerationRequest::Image { .. } => JobKind::Image,
            GenerationRequest::Edit { .. } => JobKind::Edit,
            GenerationRequest::Video { .. } => JobKind::Video,
        }
    }
}

/// Materialized result of a finished job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    Text(String),
    Image(MediaData),
    Video(MediaData),
    Allocation(Vec<AllocationSlice>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    RemoteCall,
    Validation,
    Timeout,
    Configuration,
    Cancelled,
}

/// Failure of a job as seen by the state machine.
///
/// `message` is safe to show to users; `detail` carries the technical cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    pub class: FailureClass,
    pub message: String,
    pub detail: Option<String>,
}

impl JobFailure {
    pub fn new(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.class == FailureClass::Cancelled
    }
}
