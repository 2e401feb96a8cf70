use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use studio_core::{
    update, AllocationSlice, AppState, ChatTurn, Clock, Effect, FailureClass, GenerationRequest,
    JobFailure, JobId, JobKind, JobStatus, MediaData, Msg, Payload, RegionId, RenderState, Widget,
    VIDEO_POLL_INTERVAL_MS,
};

fn submit(state: AppState, widget: Widget, prompt: &str) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::PromptSubmitted {
            widget,
            prompt: prompt.to_string(),
        },
    )
}

fn submitted_job(effects: &[Effect]) -> JobId {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Submit { job_id, .. } => Some(*job_id),
            _ => None,
        })
        .expect("submit effect")
}

fn done(state: AppState, job_id: JobId, result: Result<Payload, JobFailure>) -> AppState {
    update(state, Msg::JobDone { job_id, result }).0
}

fn image(tag: &str) -> MediaData {
    MediaData::new("image/png", tag)
}

#[test]
fn image_success_commits_and_reveals_edit_controls() {
    let (state, effects) = submit(AppState::new(), Widget::StudioImage, "Show growth trend");
    let job_id = submitted_job(&effects);
    assert!(!state.view().edit_enabled);

    let mut state = done(state, job_id, Ok(Payload::Image(image("AAA"))));
    let view = state.view();

    assert_eq!(
        view.region(RegionId::StudioOutput),
        Some(&RenderState::Content(Payload::Image(image("AAA"))))
    );
    assert!(view.edit_enabled);
    assert!(!view.is_busy(Widget::StudioImage));
    assert_eq!(view.jobs[0].status, JobStatus::Done);
    assert!(state.consume_dirty());
}

#[test]
fn image_failure_renders_error_and_logs_under_ai_studio() {
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let (state, effects) = submit(
        AppState::with_clock(Clock::fixed(at)),
        Widget::StudioImage,
        "Show growth trend",
    );
    let job_id = submitted_job(&effects);

    let failure = JobFailure::new(FailureClass::RemoteCall, "The image could not be generated.")
        .with_detail("http status 500");
    let state = done(state, job_id, Err(failure));
    let view = state.view();

    assert_eq!(
        view.region(RegionId::StudioOutput),
        Some(&RenderState::Error("The image could not be generated.".to_string()))
    );
    assert!(!view.edit_enabled);
    assert_eq!(view.error_log.len(), 1);
    assert_eq!(view.error_log[0].context, "AI Studio");
    assert_eq!(view.error_log[0].timestamp, at);
    assert_eq!(view.error_log[0].detail.as_deref(), Some("http status 500"));
    assert_eq!(view.jobs[0].status, JobStatus::Failed);
}

#[test]
fn cancelled_jobs_are_not_logged() {
    let (state, effects) = submit(AppState::new(), Widget::Insights, "gold");
    let job_id = submitted_job(&effects);

    let state = done(
        state,
        job_id,
        Err(JobFailure::new(FailureClass::Cancelled, "cancelled")),
    );
    assert!(state.error_log().is_empty());
}

#[test]
fn streamed_increments_render_as_growing_prefixes() {
    let (mut state, effects) = submit(AppState::new(), Widget::CoPilot, "Should I rebalance?");
    let job_id = submitted_job(&effects);
    assert!(state.consume_dirty());

    let mut rendered = Vec::new();
    for delta in ["Rebalancing ", "once a year ", "is common."] {
        let (mut next, _) = update(
            state,
            Msg::StreamDelta {
                job_id,
                text: delta.to_string(),
            },
        );
        assert!(next.consume_dirty());
        match next.view().region(RegionId::CoPilotMessages) {
            Some(RenderState::Content(Payload::Text(text))) => rendered.push(text.clone()),
            other => panic!("unexpected region state: {other:?}"),
        }
        assert_eq!(next.view().jobs[0].status, JobStatus::Streaming);
        state = next;
    }

    let full = "Rebalancing once a year is common.";
    for partial in &rendered {
        assert!(full.starts_with(partial.as_str()));
    }

    let state = done(state, job_id, Ok(Payload::Text(full.to_string())));
    let view = state.view();
    assert_eq!(
        view.region(RegionId::CoPilotMessages),
        Some(&RenderState::Content(Payload::Text(full.to_string())))
    );
    assert_eq!(
        view.chat_history,
        vec![ChatTurn::user("Should I rebalance?"), ChatTurn::model(full)]
    );
}

#[test]
fn follow_up_chat_carries_history() {
    let (state, effects) = submit(AppState::new(), Widget::CoPilot, "What is an ETF?");
    let state = done(
        state,
        submitted_job(&effects),
        Ok(Payload::Text("A basket of securities.".into())),
    );

    let (_state, effects) = submit(state, Widget::CoPilot, "Are they cheap?");
    match effects.as_slice() {
        [Effect::Submit {
            request: GenerationRequest::Chat { history, prompt, .. },
            ..
        }] => {
            assert_eq!(history.len(), 2);
            assert_eq!(prompt, "Are they cheap?");
        }
        other => panic!("unexpected effects: {other:?}"),
    }
}

#[test]
fn late_result_of_superseded_job_is_discarded() {
    let (state, effects) = submit(AppState::new(), Widget::StudioVideo, "slow video");
    let slow = submitted_job(&effects);
    let (state, effects) = submit(state, Widget::StudioImage, "fast image");
    let fast = submitted_job(&effects);

    let state = done(state, fast, Ok(Payload::Image(image("FAST"))));
    let state = done(state, slow, Ok(Payload::Video(MediaData::new("video/mp4", "SLOW"))));
    let state = done(
        state,
        slow,
        Err(JobFailure::new(FailureClass::RemoteCall, "late failure")),
    );

    let view = state.view();
    assert_eq!(
        view.region(RegionId::StudioOutput),
        Some(&RenderState::Content(Payload::Image(image("FAST"))))
    );
    assert!(view.error_log.is_empty());
}

#[test]
fn edits_compose_on_latest_image() {
    let (state, effects) = submit(AppState::new(), Widget::StudioImage, "a chart");
    let state = done(state, submitted_job(&effects), Ok(Payload::Image(image("V1"))));

    let (state, effects) = submit(state, Widget::StudioEdit, "add a trend line");
    match &effects[..] {
        [Effect::Submit {
            request: GenerationRequest::Edit { image: source, .. },
            ..
        }] => assert_eq!(source, &image("V1")),
        other => panic!("unexpected effects: {other:?}"),
    }
    let state = done(state, submitted_job(&effects), Ok(Payload::Image(image("V2"))));

    let (state, effects) = submit(state, Widget::StudioEdit, "make it green");
    match &effects[..] {
        [Effect::Submit {
            request: GenerationRequest::Edit { image: source, .. },
            ..
        }] => assert_eq!(source, &image("V2")),
        other => panic!("unexpected effects: {other:?}"),
    }
    assert_eq!(state.current_image(), Some(&image("V2")));
}

#[test]
fn video_job_reports_poll_progress() {
    let (state, effects) = submit(AppState::new(), Widget::StudioVideo, "a city skyline");
    let job_id = submitted_job(&effects);

    let view = state.view();
    assert_eq!(view.jobs[0].kind, JobKind::Video);
    assert_eq!(view.jobs[0].poll_interval_ms, VIDEO_POLL_INTERVAL_MS);

    let (state, _) = update(state, Msg::PollAttempt { job_id, attempt: 3 });
    assert_eq!(
        state.view().jobs[0].progress.as_deref(),
        Some("Checking video status (attempt 3)...")
    );

    let state = done(state, job_id, Ok(Payload::Video(MediaData::new("video/mp4", "AAAA"))));
    assert_eq!(state.view().jobs[0].progress, None);
}

#[test]
fn allocation_result_is_rendered() {
    let (state, effects) = submit(AppState::new(), Widget::Allocation, "balanced");
    let slices: Vec<AllocationSlice> = ["Stocks", "Bonds", "Cash", "Gold", "REITs"]
        .into_iter()
        .map(|category| AllocationSlice {
            category: category.to_string(),
            percentage: 20.0,
        })
        .collect();

    let state = done(
        state,
        submitted_job(&effects),
        Ok(Payload::Allocation(slices.clone())),
    );
    assert_eq!(
        state.view().region(RegionId::AllocationPanel),
        Some(&RenderState::Content(Payload::Allocation(slices)))
    );
}

#[test]
fn error_log_is_newest_first_and_clears_on_request() {
    let (state, effects) = submit(AppState::new(), Widget::Insights, "oil");
    let state = done(
        state,
        submitted_job(&effects),
        Err(JobFailure::new(FailureClass::RemoteCall, "first")),
    );
    let (state, effects) = submit(state, Widget::PlatformGuide, "alerts");
    let state = done(
        state,
        submitted_job(&effects),
        Err(JobFailure::new(FailureClass::Validation, "second")),
    );

    let contexts: Vec<_> = state
        .view()
        .error_log
        .into_iter()
        .map(|entry| entry.context)
        .collect();
    assert_eq!(contexts, vec!["Platform Guide", "Strategic Insights"]);

    let (state, effects) = update(state, Msg::ClearErrorLog);
    assert!(effects.is_empty());
    assert!(state.view().error_log.is_empty());
}

#[test]
fn unknown_job_results_are_ignored() {
    let state = AppState::new();
    let before = state.view();
    let state = done(state, 42, Ok(Payload::Text("orphan".into())));
    assert_eq!(state.view().regions, before.regions);
    assert!(state.view().jobs.is_empty());
}
