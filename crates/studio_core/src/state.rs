use std::collections::BTreeMap;

use crate::view_model::{AppViewModel, InputErrorView, JobRowView, RegionView};
use crate::{
    AsyncJob, ChatTurn, Clock, ErrorLog, GenerationRequest, JobId, MediaData, Reconciler,
    RegionId, RenderToken, Widget,
};

pub const BLANK_PROMPT_MESSAGE: &str = "Please enter a prompt.";
pub const EDIT_WITHOUT_IMAGE_MESSAGE: &str = "Generate an image before requesting an edit.";

/// A job the state machine is still waiting on.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LiveJob {
    pub(crate) widget: Widget,
    pub(crate) token: RenderToken,
    pub(crate) prompt: String,
    pub(crate) job: AsyncJob,
    pub(crate) progress: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub(crate) reconciler: Reconciler,
    pub(crate) live: BTreeMap<JobId, LiveJob>,
    /// Last settled job per widget, kept for display until superseded or reset.
    pub(crate) settled: BTreeMap<Widget, (JobId, AsyncJob)>,
    pub(crate) input_errors: BTreeMap<Widget, String>,
    pub(crate) current_image: Option<MediaData>,
    pub(crate) uploaded_image: Option<MediaData>,
    pub(crate) chat_history: Vec<ChatTurn>,
    pub(crate) error_log: ErrorLog,
    pub(crate) clock: Clock,
    pub(crate) ai_unavailable: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State whose job timestamps and error log entries come from `clock`.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            error_log: ErrorLog::with_clock(clock.clone()),
            clock,
            ..Self::default()
        }
    }

    /// Turns every generative feature off, e.g. when no access credential is configured.
    pub fn disable_ai(&mut self, reason: impl Into<String>) {
        self.ai_unavailable = Some(reason.into());
        self.dirty = true;
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    pub fn current_image(&self) -> Option<&MediaData> {
        self.current_image.as_ref()
    }

    pub fn is_busy(&self, widget: Widget) -> bool {
        self.live.values().any(|live| live.widget == widget)
    }

    pub fn view(&self) -> AppViewModel {
        let regions = RegionId::ALL
            .into_iter()
            .map(|region| RegionView {
                region,
                state: self.reconciler.state(region).clone(),
            })
            .collect();

        let mut busy_widgets: Vec<Widget> = self.live.values().map(|live| live.widget).collect();
        busy_widgets.sort();
        busy_widgets.dedup();

        let input_errors = self
            .input_errors
            .iter()
            .map(|(widget, message)| InputErrorView {
                widget: *widget,
                message: message.clone(),
            })
            .collect();

        let mut jobs: Vec<JobRowView> = self
            .settled
            .iter()
            .map(|(widget, (job_id, job))| job_row(*job_id, *widget, job, None))
            .collect();
        jobs.extend(
            self.live
                .iter()
                .map(|(job_id, live)| job_row(*job_id, live.widget, &live.job, live.progress.clone())),
        );
        jobs.sort_by_key(|row| row.job_id);

        AppViewModel {
            regions,
            busy_widgets,
            input_errors,
            jobs,
            edit_enabled: self.current_image.is_some(),
            has_uploaded_image: self.uploaded_image.is_some(),
            ai_unavailable: self.ai_unavailable.clone(),
            chat_history: self.chat_history.clone(),
            error_log: self.error_log.list(),
            dirty: self.dirty,
        }
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Starts a job for `widget`, superseding whatever was live on the same region.
    ///
    /// Returns the new job id and the id of the superseded job, if any.
    pub(crate) fn start_job(
        &mut self,
        widget: Widget,
        prompt: String,
        request: &GenerationRequest,
    ) -> (JobId, Option<JobId>) {
        let region = widget.region();
        let superseded = self
            .live
            .iter()
            .find(|(_, live)| live.widget.region() == region)
            .map(|(job_id, _)| *job_id);
        if let Some(old) = superseded {
            self.live.remove(&old);
        }

        let token = self.reconciler.begin(region);
        let job_id = token.job_id();
        self.settled.retain(|settled_widget, _| settled_widget.region() != region);
        self.live.insert(
            job_id,
            LiveJob {
                widget,
                token,
                prompt,
                job: AsyncJob::new(request.kind(), self.clock.now()),
                progress: None,
            },
        );
        self.input_errors.remove(&widget);
        self.mark_dirty();
        (job_id, superseded)
    }

    /// Drops every live job rendering into `region`, returning their ids.
    pub(crate) fn drop_region_jobs(&mut self, region: RegionId) -> Vec<JobId> {
        let ids: Vec<JobId> = self
            .live
            .iter()
            .filter(|(_, live)| live.widget.region() == region)
            .map(|(job_id, _)| *job_id)
            .collect();
        for job_id in &ids {
            self.live.remove(job_id);
        }
        self.settled.retain(|widget, _| widget.region() != region);
        ids
    }

    pub(crate) fn settle(&mut self, job_id: JobId, live: LiveJob) {
        self.settled.insert(live.widget, (job_id, live.job));
    }

    pub(crate) fn set_input_error(&mut self, widget: Widget, message: impl Into<String>) {
        self.input_errors.insert(widget, message.into());
        self.mark_dirty();
    }
}

fn job_row(job_id: JobId, widget: Widget, job: &AsyncJob, progress: Option<String>) -> JobRowView {
    JobRowView {
        job_id,
        widget,
        kind: job.kind,
        status: job.status,
        submitted_at: job.submitted_at,
        poll_interval_ms: job.poll_interval_ms,
        progress,
        error: job.error.as_ref().map(|failure| failure.message.clone()),
    }
}
