use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{ChatTurn, ErrorLogEntry, JobId, JobKind, JobStatus, RegionId, RenderState, Widget};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AppViewModel {
    pub regions: Vec<RegionView>,
    pub busy_widgets: Vec<Widget>,
    pub input_errors: Vec<InputErrorView>,
    pub jobs: Vec<JobRowView>,
    pub edit_enabled: bool,
    pub has_uploaded_image: bool,
    pub ai_unavailable: Option<String>,
    pub chat_history: Vec<ChatTurn>,
    pub error_log: Vec<ErrorLogEntry>,
    pub dirty: bool,
}

impl AppViewModel {
    pub fn region(&self, region: RegionId) -> Option<&RenderState> {
        self.regions
            .iter()
            .find(|view| view.region == region)
            .map(|view| &view.state)
    }

    pub fn is_busy(&self, widget: Widget) -> bool {
        self.busy_widgets.contains(&widget)
    }

    pub fn input_error(&self, widget: Widget) -> Option<&str> {
        self.input_errors
            .iter()
            .find(|view| view.widget == widget)
            .map(|view| view.message.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionView {
    pub region: RegionId,
    pub state: RenderState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputErrorView {
    pub widget: Widget,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRowView {
    pub job_id: JobId,
    pub widget: Widget,
    pub kind: JobKind,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub poll_interval_ms: u64,
    pub progress: Option<String>,
    pub error: Option<String>,
}
