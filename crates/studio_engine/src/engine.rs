use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use studio_core::{GenerationRequest, JobId};
use studio_logging::{studio_debug, studio_info, studio_warn};
use tokio_util::sync::CancellationToken;

use crate::config::{EngineConfig, PollSettings};
use crate::fetch::ChannelProgressSink;
use crate::orchestrator::Orchestrator;
use crate::service::{GeminiService, GenerativeService};
use crate::{EngineEvent, GenerationError};

enum EngineCommand {
    Submit {
        job_id: JobId,
        request: GenerationRequest,
    },
    Cancel {
        job_id: JobId,
    },
}

type CancelRegistry = Arc<Mutex<HashMap<JobId, CancellationToken>>>;

/// Handle to the background thread that runs generative jobs.
///
/// Commands go in through [`EngineHandle::submit`]/[`EngineHandle::cancel`];
/// progress and results come back through [`EngineHandle::try_recv`].
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    /// Engine talking to the configured remote service. Fails when no access key is set.
    pub fn new(config: &EngineConfig) -> Result<Self, GenerationError> {
        let service = GeminiService::new(config)?;
        Self::with_service(Arc::new(service), config.poll)
            .map_err(|err| GenerationError::new(crate::FailureKind::Configuration, err.to_string()))
    }

    pub fn with_service(
        service: Arc<dyn GenerativeService>,
        poll: PollSettings,
    ) -> std::io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let orchestrator = Arc::new(Orchestrator::new(service, poll));
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("studio-engine")
            .enable_all()
            .build()?;

        thread::Builder::new()
            .name("studio-engine-commands".to_string())
            .spawn(move || {
                let registry: CancelRegistry = Arc::new(Mutex::new(HashMap::new()));
                while let Ok(command) = cmd_rx.recv() {
                    handle_command(&runtime, &orchestrator, &registry, command, &event_tx);
                }
                studio_debug!("engine command channel closed");
            })?;

        Ok(Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        })
    }

    pub fn submit(&self, job_id: JobId, request: GenerationRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Submit { job_id, request });
    }

    pub fn cancel(&self, job_id: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { job_id });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        let rx = self.event_rx.lock().ok()?;
        rx.try_recv().ok()
    }
}

fn handle_command(
    runtime: &tokio::runtime::Runtime,
    orchestrator: &Arc<Orchestrator>,
    registry: &CancelRegistry,
    command: EngineCommand,
    event_tx: &mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::Submit { job_id, request } => {
            studio_info!("job {} submitted ({:?})", job_id, request.kind());
            let cancel = CancellationToken::new();
            if let Ok(mut tokens) = registry.lock() {
                tokens.insert(job_id, cancel.clone());
            }

            let orchestrator = orchestrator.clone();
            let registry = registry.clone();
            let event_tx = event_tx.clone();
            runtime.spawn(async move {
                let sink = ChannelProgressSink::new(event_tx.clone());
                let result = orchestrator.execute(job_id, &request, &sink, &cancel).await;
                if let Ok(mut tokens) = registry.lock() {
                    tokens.remove(&job_id);
                }
                if let Err(err) = &result {
                    studio_warn!("job {} failed: {}", job_id, err);
                }
                let _ = event_tx.send(EngineEvent::JobCompleted { job_id, result });
            });
        }
        EngineCommand::Cancel { job_id } => {
            let token = registry.lock().ok().and_then(|mut tokens| tokens.remove(&job_id));
            match token {
                Some(token) => {
                    studio_info!("job {} cancellation requested", job_id);
                    token.cancel();
                }
                None => studio_debug!("job {} already finished; nothing to cancel", job_id),
            }
        }
    }
}
