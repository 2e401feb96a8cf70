use std::future::Future;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures_util::StreamExt;
use studio_core::{AspectRatio, GenerationRequest, JobId, MediaData, Payload};
use studio_logging::{studio_debug, studio_info, studio_warn};
use tokio_util::sync::CancellationToken;

use crate::config::PollSettings;
use crate::fetch::ProgressSink;
use crate::service::{GenerativeService, TextPrompt};
use crate::structured::parse_structured;
use crate::{EngineEvent, FailureKind, GenerationError, OperationHandle, PollOutcome};

const VIDEO_MIME_TYPE: &str = "video/mp4";

/// Drives one generative request at a time from submission to a terminal result.
///
/// Every remote call races the caller's cancellation token, and every failure
/// comes back as a [`GenerationError`]; nothing here panics on bad responses.
pub struct Orchestrator {
    service: Arc<dyn GenerativeService>,
    poll: PollSettings,
}

impl Orchestrator {
    pub fn new(service: Arc<dyn GenerativeService>, poll: PollSettings) -> Self {
        Self { service, poll }
    }

    /// Streams a reply, emitting each increment in receipt order; the full text is the terminal value.
    pub async fn submit_streaming(
        &self,
        job_id: JobId,
        request: &TextPrompt,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError> {
        let mut stream = cancellable(cancel, self.service.stream_text(request)).await?;
        let mut full = String::new();
        let mut increments = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GenerationError::cancelled()),
                next = stream.next() => next,
            };
            match next {
                Some(Ok(delta)) => {
                    if delta.is_empty() {
                        continue;
                    }
                    increments += 1;
                    full.push_str(&delta);
                    sink.emit(EngineEvent::StreamDelta {
                        job_id,
                        text: delta,
                    });
                }
                Some(Err(err)) => return Err(err),
                None => break,
            }
        }

        studio_debug!("job {} streamed {} increments, {} bytes", job_id, increments, full.len());
        if full.is_empty() {
            return Err(GenerationError::new(
                FailureKind::RemoteCall,
                "stream ended without any text",
            ));
        }
        Ok(full)
    }

    /// One-shot text; with a schema the response must parse and validate.
    pub async fn submit_single_shot(
        &self,
        request: &TextPrompt,
        cancel: &CancellationToken,
    ) -> Result<Payload, GenerationError> {
        let text = cancellable(cancel, self.service.generate_text(request)).await?;
        match request.schema {
            Some(schema) => parse_structured(schema, &text),
            None => Ok(Payload::Text(text)),
        }
    }

    pub async fn submit_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        cancel: &CancellationToken,
    ) -> Result<MediaData, GenerationError> {
        cancellable(cancel, self.service.generate_image(prompt, aspect_ratio)).await
    }

    /// Applies an edit instruction to `image`, which is the dashboard's current
    /// image; the caller adopts the result as the new current image.
    pub async fn submit_editable(
        &self,
        image: &MediaData,
        instruction: &str,
        cancel: &CancellationToken,
    ) -> Result<MediaData, GenerationError> {
        cancellable(cancel, self.service.edit_image(image, instruction)).await
    }

    pub async fn submit_pollable(
        &self,
        prompt: &str,
        image: Option<&MediaData>,
        cancel: &CancellationToken,
    ) -> Result<OperationHandle, GenerationError> {
        cancellable(cancel, self.service.start_video(prompt, image)).await
    }

    pub async fn poll(
        &self,
        handle: &OperationHandle,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome, GenerationError> {
        cancellable(cancel, self.service.poll_video(handle)).await
    }

    /// Submits a video job, polls it on a fixed interval up to the ceiling, then
    /// downloads the finished artifact.
    pub async fn run_video(
        &self,
        job_id: JobId,
        prompt: &str,
        image: Option<&MediaData>,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<MediaData, GenerationError> {
        let handle = self.submit_pollable(prompt, image, cancel).await?;
        studio_info!("job {} submitted video operation {}", job_id, handle.name);

        // At least one status check, even with a hand-built zero ceiling.
        let max_attempts = self.poll.max_attempts.max(1);
        let mut attempt = 0u32;
        let result_uri = loop {
            if attempt >= max_attempts {
                studio_warn!(
                    "job {} gave up on {} after {} polls",
                    job_id,
                    handle.name,
                    attempt
                );
                return Err(GenerationError::new(
                    FailureKind::PollLimitExceeded { attempts: attempt },
                    format!("operation {} still running", handle.name),
                ));
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GenerationError::cancelled()),
                _ = tokio::time::sleep(self.poll.interval) => {}
            }
            attempt += 1;
            sink.emit(EngineEvent::PollAttempt { job_id, attempt });

            match self.poll(&handle, cancel).await? {
                PollOutcome::InProgress => {
                    studio_debug!("job {} poll {}: still running", job_id, attempt);
                }
                PollOutcome::Done { result_uri } => break result_uri,
            }
        };

        let bytes = cancellable(cancel, self.service.fetch_media(&result_uri)).await?;
        studio_info!("job {} downloaded {} video bytes", job_id, bytes.len());
        Ok(MediaData::new(VIDEO_MIME_TYPE, STANDARD.encode(bytes)))
    }

    /// Runs any request the state machine can issue and returns its payload.
    pub async fn execute(
        &self,
        job_id: JobId,
        request: &GenerationRequest,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Payload, GenerationError> {
        match request {
            GenerationRequest::Chat {
                system,
                history,
                prompt,
            } => {
                let prompt = TextPrompt {
                    system: Some(system.clone()),
                    history: history.clone(),
                    prompt: prompt.clone(),
                    schema: None,
                };
                self.submit_streaming(job_id, &prompt, sink, cancel)
                    .await
                    .map(Payload::Text)
            }
            GenerationRequest::Text {
                system,
                prompt,
                schema,
            } => {
                let prompt = TextPrompt {
                    system: system.clone(),
                    history: Vec::new(),
                    prompt: prompt.clone(),
                    schema: *schema,
                };
                self.submit_single_shot(&prompt, cancel).await
            }
            GenerationRequest::Image {
                prompt,
                aspect_ratio,
            } => self
                .submit_image(prompt, *aspect_ratio, cancel)
                .await
                .map(Payload::Image),
            GenerationRequest::Edit { image, instruction } => self
                .submit_editable(image, instruction, cancel)
                .await
                .map(Payload::Image),
            GenerationRequest::Video { prompt, image } => self
                .run_video(job_id, prompt, image.as_ref(), sink, cancel)
                .await
                .map(Payload::Video),
        }
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    call: impl Future<Output = Result<T, GenerationError>>,
) -> Result<T, GenerationError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GenerationError::cancelled()),
        result = call => result,
    }
}
