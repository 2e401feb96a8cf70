use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use studio_core::{update, AppState, AppViewModel, Effect, ErrorLogEntry, Msg};
use studio_engine::{EngineConfig, EngineEvent, EngineHandle};
use studio_logging::{studio_debug, studio_error, studio_info, studio_warn};

const EVENT_PUMP_IDLE: Duration = Duration::from_millis(20);

/// Shared dashboard state driven by user actions and engine events.
///
/// Every message goes through [`update`]; the effects it returns are handed
/// to the engine before the state lock is released so submissions and
/// cancellations reach the engine in the order they were decided.
#[derive(Clone)]
pub struct Dashboard {
    state: Arc<Mutex<AppState>>,
    engine: Option<EngineHandle>,
}

impl Dashboard {
    /// Starts the engine and its event pump; without a usable configuration the
    /// dashboard still serves, with generative features disabled.
    pub fn start(config: &EngineConfig) -> Self {
        match EngineHandle::new(config) {
            Ok(engine) => {
                studio_info!("generative engine started against {}", config.base_url);
                let dashboard = Self::new(AppState::new(), Some(engine));
                dashboard.spawn_event_pump();
                dashboard
            }
            Err(err) => {
                studio_warn!("AI features disabled: {}", err);
                let mut state = AppState::new();
                state.disable_ai(err.to_failure().message);
                Self::new(state, None)
            }
        }
    }

    pub fn new(state: AppState, engine: Option<EngineHandle>) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            engine,
        }
    }

    /// Applies `msg` and returns the resulting view.
    pub fn dispatch(&self, msg: Msg) -> AppViewModel {
        let mut guard = self.lock_state();
        self.apply(&mut guard, msg);
        guard.view()
    }

    /// Applies `msg` without building a view; engine events take this path.
    pub fn dispatch_quiet(&self, msg: Msg) {
        let mut guard = self.lock_state();
        self.apply(&mut guard, msg);
    }

    fn apply(&self, guard: &mut MutexGuard<'_, AppState>, msg: Msg) {
        let state = std::mem::take(&mut **guard);
        let (mut state, effects) = update(state, msg);
        state.consume_dirty();
        **guard = state;
        self.run_effects(effects);
    }

    pub fn view(&self) -> AppViewModel {
        self.lock_state().view()
    }

    pub fn error_log(&self) -> Vec<ErrorLogEntry> {
        self.lock_state().error_log().list()
    }

    fn lock_state(&self) -> MutexGuard<'_, AppState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn run_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            let Some(engine) = &self.engine else {
                studio_warn!("no engine available; dropping {:?}", effect);
                continue;
            };
            match effect {
                Effect::Submit { job_id, request } => {
                    studio_debug!("submit job_id={} kind={:?}", job_id, request.kind());
                    engine.submit(job_id, request);
                }
                Effect::Cancel { job_id } => {
                    studio_debug!("cancel job_id={}", job_id);
                    engine.cancel(job_id);
                }
            }
        }
    }

    fn spawn_event_pump(&self) {
        let Some(engine) = self.engine.clone() else {
            return;
        };
        let dashboard = self.clone();
        let spawned = thread::Builder::new()
            .name("studio-event-pump".to_string())
            .spawn(move || loop {
                match engine.try_recv() {
                    Some(event) => dashboard.dispatch_quiet(event_to_msg(event)),
                    None => thread::sleep(EVENT_PUMP_IDLE),
                }
            });
        if let Err(err) = spawned {
            studio_error!("failed to start engine event pump: {}", err);
        }
    }
}

/// Translates an engine event into the message the state machine understands.
pub fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::StreamDelta { job_id, text } => Msg::StreamDelta { job_id, text },
        EngineEvent::PollAttempt { job_id, attempt } => Msg::PollAttempt { job_id, attempt },
        EngineEvent::JobCompleted { job_id, result } => Msg::JobDone {
            job_id,
            result: result.map_err(|err| err.to_failure()),
        },
    }
}
