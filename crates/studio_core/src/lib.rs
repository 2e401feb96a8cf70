//! Studio core: pure dashboard state machine, view reconciliation, and error log.
mod allocation;
mod clock;
mod effect;
mod error_log;
mod job;
mod msg;
pub mod prompts;
mod region;
mod request;
mod state;
mod update;
mod view_model;
mod widget;

pub use allocation::{
    validate_allocations, AllocationError, AllocationSlice, ALLOCATION_SUM_TOLERANCE,
    MAX_ALLOCATION_CATEGORIES, MIN_ALLOCATION_CATEGORIES,
};
pub use clock::Clock;
pub use effect::Effect;
pub use error_log::{ErrorLog, ErrorLogEntry};
pub use job::{AsyncJob, JobId, JobKind, JobStatus, VIDEO_POLL_INTERVAL_MS};
pub use msg::Msg;
pub use region::{Reconciler, RegionId, RenderState, RenderToken};
pub use request::{
    AspectRatio, ChatRole, ChatTurn, FailureClass, GenerationRequest, JobFailure, MediaData,
    OutputSchema, Payload,
};
pub use state::{AppState, BLANK_PROMPT_MESSAGE, EDIT_WITHOUT_IMAGE_MESSAGE};
pub use update::update;
pub use view_model::{AppViewModel, InputErrorView, JobRowView, RegionView};
pub use widget::Widget;
