//! Studio engine: generative service client, job orchestration and the background runner.
mod config;
mod engine;
mod fetch;
mod orchestrator;
mod service;
mod sse;
mod structured;
mod types;

pub use config::{
    ConfigError, EngineConfig, ModelNames, PollSettings, DEFAULT_BASE_URL, DEFAULT_EDIT_MODEL,
    DEFAULT_IMAGE_MODEL, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_TEXT_MODEL, DEFAULT_VIDEO_MODEL,
};
pub use engine::EngineHandle;
pub use fetch::{download_media, with_access_key, ChannelProgressSink, ProgressSink};
pub use orchestrator::Orchestrator;
pub use service::{GeminiService, GenerativeService, TextPrompt, TextStream};
pub use sse::SseDecoder;
pub use structured::{parse_structured, response_schema};
pub use types::{EngineEvent, FailureKind, GenerationError, OperationHandle, PollOutcome};
