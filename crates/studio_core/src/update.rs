use crate::state::{BLANK_PROMPT_MESSAGE, EDIT_WITHOUT_IMAGE_MESSAGE};
use crate::{
    prompts, AppState, AspectRatio, ChatTurn, Effect, GenerationRequest, JobFailure, JobId, Msg,
    OutputSchema, Payload, RegionId, Widget,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::PromptSubmitted { widget, prompt } => submit(&mut state, widget, prompt),
        Msg::ImageUploaded(image) => {
            state.uploaded_image = Some(image);
            state.mark_dirty();
            Vec::new()
        }
        Msg::WidgetReset { widget } => {
            let region = widget.region();
            let cancelled = state.drop_region_jobs(region);
            state.reconciler.reset(region);
            state.input_errors.remove(&widget);
            match region {
                RegionId::StudioOutput => {
                    state.current_image = None;
                    state.uploaded_image = None;
                }
                RegionId::CoPilotMessages => state.chat_history.clear(),
                _ => {}
            }
            state.mark_dirty();
            cancelled
                .into_iter()
                .map(|job_id| Effect::Cancel { job_id })
                .collect()
        }
        Msg::ClearErrorLog => {
            state.error_log.clear();
            state.mark_dirty();
            Vec::new()
        }
        Msg::StreamDelta { job_id, text } => {
            if let Some(live) = state.live.get_mut(&job_id) {
                live.job.mark_streaming();
                let region = live.widget.region();
                let token = live.token;
                if state.reconciler.append(region, token, &text) {
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::PollAttempt { job_id, attempt } => {
            if let Some(live) = state.live.get_mut(&job_id) {
                live.progress = Some(format!("Checking video status (attempt {attempt})..."));
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::JobDone { job_id, result } => {
            match result {
                Ok(payload) => apply_success(&mut state, job_id, payload),
                Err(failure) => apply_failure(&mut state, job_id, failure),
            }
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn submit(state: &mut AppState, widget: Widget, prompt: String) -> Vec<Effect> {
    if let Some(reason) = state.ai_unavailable.clone() {
        state.set_input_error(widget, reason);
        return Vec::new();
    }
    // The triggering control is disabled while its job is in flight.
    if state.is_busy(widget) {
        return Vec::new();
    }

    let prompt = prompt.trim().to_string();
    if prompt.is_empty() {
        state.set_input_error(widget, BLANK_PROMPT_MESSAGE);
        return Vec::new();
    }

    let Some(request) = build_request(state, widget, &prompt) else {
        state.set_input_error(widget, EDIT_WITHOUT_IMAGE_MESSAGE);
        return Vec::new();
    };
    if widget == Widget::StudioVideo {
        state.uploaded_image = None;
    }

    let (job_id, superseded) = state.start_job(widget, prompt, &request);
    let mut effects = Vec::with_capacity(2);
    if let Some(old) = superseded {
        effects.push(Effect::Cancel { job_id: old });
    }
    effects.push(Effect::Submit { job_id, request });
    effects
}

fn build_request(state: &AppState, widget: Widget, prompt: &str) -> Option<GenerationRequest> {
    let request = match widget {
        Widget::CoPilot => GenerationRequest::Chat {
            system: prompts::copilot_system_instruction(),
            history: state.chat_history.clone(),
            prompt: prompt.to_string(),
        },
        Widget::Insights => GenerationRequest::Text {
            system: None,
            prompt: prompts::insights_prompt(prompt),
            schema: None,
        },
        Widget::PlatformGuide => GenerationRequest::Text {
            system: None,
            prompt: prompts::guide_prompt(prompt),
            schema: None,
        },
        Widget::Allocation => GenerationRequest::Text {
            system: None,
            prompt: prompts::allocation_prompt(prompt),
            schema: Some(OutputSchema::Allocations),
        },
        Widget::TraderAnalysis => GenerationRequest::Text {
            system: None,
            prompt: prompts::trader_analysis_prompt(prompt),
            schema: None,
        },
        Widget::StudioImage => GenerationRequest::Image {
            prompt: prompt.to_string(),
            aspect_ratio: AspectRatio::Square,
        },
        Widget::StudioVideo => GenerationRequest::Video {
            prompt: prompt.to_string(),
            image: state.uploaded_image.clone(),
        },
        Widget::StudioEdit => GenerationRequest::Edit {
            image: state.current_image.clone()?,
            instruction: prompt.to_string(),
        },
    };
    Some(request)
}

fn apply_success(state: &mut AppState, job_id: JobId, payload: Payload) {
    let Some(mut live) = state.live.remove(&job_id) else {
        return;
    };
    let region = live.widget.region();
    if state.reconciler.commit(region, live.token, payload.clone()) {
        match &payload {
            Payload::Image(image) => state.current_image = Some(image.clone()),
            Payload::Text(reply) if live.widget == Widget::CoPilot => {
                state.chat_history.push(ChatTurn::user(live.prompt.clone()));
                state.chat_history.push(ChatTurn::model(reply.clone()));
            }
            _ => {}
        }
    }
    live.job.complete(payload);
    live.progress = None;
    state.settle(job_id, live);
    state.mark_dirty();
}

fn apply_failure(state: &mut AppState, job_id: JobId, failure: JobFailure) {
    let Some(mut live) = state.live.remove(&job_id) else {
        return;
    };
    if !failure.is_cancelled() {
        state.error_log.record(live.widget.context_label(), &failure);
    }
    let region = live.widget.region();
    state.reconciler.fail(region, live.token, failure.message.clone());
    live.job.fail(failure);
    live.progress = None;
    state.settle(job_id, live);
    state.mark_dirty();
}
