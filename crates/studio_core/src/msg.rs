#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User submitted a prompt from a widget's form.
    PromptSubmitted {
        widget: crate::Widget,
        prompt: String,
    },
    /// User picked a starting frame for the next video job.
    ImageUploaded(crate::MediaData),
    /// User cleared a widget.
    WidgetReset { widget: crate::Widget },
    /// Operator cleared the error log.
    ClearErrorLog,
    /// Engine delivered a streamed text increment.
    StreamDelta { job_id: crate::JobId, text: String },
    /// Engine checked the status of a long-running job.
    PollAttempt { job_id: crate::JobId, attempt: u32 },
    /// Engine finished a job.
    JobDone {
        job_id: crate::JobId,
        result: Result<crate::Payload, crate::JobFailure>,
    },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
