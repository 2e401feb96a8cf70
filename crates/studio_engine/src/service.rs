use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::{future, StreamExt, TryStreamExt};
use serde_json::{json, Value};
use studio_core::{AspectRatio, ChatRole, ChatTurn, MediaData, OutputSchema};

use crate::config::{EngineConfig, ModelNames};
use crate::fetch::{download_media, map_reqwest_error, with_access_key};
use crate::sse::SseDecoder;
use crate::structured::response_schema;
use crate::{FailureKind, GenerationError, OperationHandle, PollOutcome};

const API_KEY_HEADER: &str = "x-goog-api-key";
const VIDEO_ASPECT_RATIO: &str = "16:9";

/// Ordered text increments of one streamed response.
pub type TextStream = BoxStream<'static, Result<String, GenerationError>>;

/// A text generation request as understood by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextPrompt {
    pub system: Option<String>,
    pub history: Vec<ChatTurn>,
    pub prompt: String,
    pub schema: Option<OutputSchema>,
}

impl TextPrompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// The remote generative service: single-shot, streaming, and long-running calls.
#[async_trait::async_trait]
pub trait GenerativeService: Send + Sync {
    async fn generate_text(&self, request: &TextPrompt) -> Result<String, GenerationError>;

    async fn stream_text(&self, request: &TextPrompt) -> Result<TextStream, GenerationError>;

    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<MediaData, GenerationError>;

    async fn edit_image(
        &self,
        image: &MediaData,
        instruction: &str,
    ) -> Result<MediaData, GenerationError>;

    async fn start_video(
        &self,
        prompt: &str,
        image: Option<&MediaData>,
    ) -> Result<OperationHandle, GenerationError>;

    async fn poll_video(&self, handle: &OperationHandle) -> Result<PollOutcome, GenerationError>;

    async fn fetch_media(&self, uri: &str) -> Result<Vec<u8>, GenerationError>;
}

/// [`GenerativeService`] backed by the Generative Language REST API.
#[derive(Debug, Clone)]
pub struct GeminiService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    models: ModelNames,
    request_timeout: Duration,
    max_media_bytes: u64,
}

impl GeminiService {
    pub fn new(config: &EngineConfig) -> Result<Self, GenerationError> {
        let api_key = config
            .api_key()
            .map_err(|err| GenerationError::new(FailureKind::Configuration, err.to_string()))?
            .to_string();
        // Streams and downloads may run long overall; only a stalled read fails them.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.request_timeout)
            .build()
            .map_err(|err| GenerationError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            models: config.models.clone(),
            request_timeout: config.request_timeout,
            max_media_bytes: config.max_media_bytes,
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, GenerationError> {
        let response = request
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GenerationError::new(
            FailureKind::HttpStatus(status.as_u16()),
            api_error_message(&body).unwrap_or_else(|| status.to_string()),
        ))
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, GenerationError> {
        let request = self.client.post(url).timeout(self.request_timeout).json(body);
        let response = self.send(request).await?;
        read_json(response).await
    }
}

#[async_trait::async_trait]
impl GenerativeService for GeminiService {
    async fn generate_text(&self, request: &TextPrompt) -> Result<String, GenerationError> {
        let url = self.model_url(&self.models.text, "generateContent");
        let response = self.post_json(&url, &content_body(request)).await?;
        match candidate_text(&response) {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(empty_response_error(&response, "response contained no text")),
        }
    }

    async fn stream_text(&self, request: &TextPrompt) -> Result<TextStream, GenerationError> {
        let url = format!(
            "{}?alt=sse",
            self.model_url(&self.models.text, "streamGenerateContent")
        );
        let response = self
            .send(self.client.post(url).json(&content_body(request)))
            .await?;
        Ok(text_events(response.bytes_stream().boxed()))
    }

    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<MediaData, GenerationError> {
        let url = self.model_url(&self.models.image, "predict");
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "sampleCount": 1, "aspectRatio": aspect_ratio.as_str() }
        });
        let response = self.post_json(&url, &body).await?;
        let prediction = &response["predictions"][0];
        match prediction["bytesBase64Encoded"].as_str() {
            Some(data) if !data.is_empty() => Ok(MediaData::new(
                prediction["mimeType"].as_str().unwrap_or("image/png"),
                data,
            )),
            _ => Err(empty_response_error(&response, "no image returned")),
        }
    }

    async fn edit_image(
        &self,
        image: &MediaData,
        instruction: &str,
    ) -> Result<MediaData, GenerationError> {
        let url = self.model_url(&self.models.edit, "generateContent");
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "inlineData": { "mimeType": image.mime_type, "data": image.data } },
                    { "text": instruction }
                ]
            }],
            "generationConfig": { "responseModalities": ["IMAGE", "TEXT"] }
        });
        let response = self.post_json(&url, &body).await?;
        candidate_image(&response)
            .ok_or_else(|| empty_response_error(&response, "edit returned no image"))
    }

    async fn start_video(
        &self,
        prompt: &str,
        image: Option<&MediaData>,
    ) -> Result<OperationHandle, GenerationError> {
        let url = self.model_url(&self.models.video, "predictLongRunning");
        let mut instance = json!({ "prompt": prompt });
        if let Some(image) = image {
            instance["image"] = json!({
                "bytesBase64Encoded": image.data,
                "mimeType": image.mime_type
            });
        }
        let body = json!({
            "instances": [instance],
            "parameters": { "aspectRatio": VIDEO_ASPECT_RATIO }
        });
        let response = self.post_json(&url, &body).await?;
        match response["name"].as_str() {
            Some(name) if !name.is_empty() => Ok(OperationHandle {
                name: name.to_string(),
            }),
            _ => Err(GenerationError::new(
                FailureKind::RemoteCall,
                "video submission returned no operation name",
            )),
        }
    }

    async fn poll_video(&self, handle: &OperationHandle) -> Result<PollOutcome, GenerationError> {
        let url = format!("{}/v1beta/{}", self.base_url, handle.name);
        let response = self
            .send(self.client.get(url).timeout(self.request_timeout))
            .await?;
        let operation = read_json(response).await?;
        operation_outcome(&operation)
    }

    async fn fetch_media(&self, uri: &str) -> Result<Vec<u8>, GenerationError> {
        let url = with_access_key(uri, &self.api_key)?;
        download_media(&self.client, url, self.max_media_bytes).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, GenerationError> {
    response.json::<Value>().await.map_err(|err| {
        GenerationError::new(FailureKind::RemoteCall, format!("unreadable response body: {err}"))
    })
}

fn content_body(request: &TextPrompt) -> Value {
    let mut contents: Vec<Value> = request
        .history
        .iter()
        .map(|turn| {
            let role = match turn.role {
                ChatRole::User => "user",
                ChatRole::Model => "model",
            };
            json!({ "role": role, "parts": [{ "text": turn.text }] })
        })
        .collect();
    contents.push(json!({ "role": "user", "parts": [{ "text": request.prompt }] }));

    let mut body = json!({ "contents": contents });
    if let Some(system) = &request.system {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }
    if let Some(schema) = request.schema {
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": response_schema(schema)
        });
    }
    body
}

/// Concatenated text parts of the first candidate.
fn candidate_text(response: &Value) -> Option<String> {
    let parts = response["candidates"][0]["content"]["parts"].as_array()?;
    Some(
        parts
            .iter()
            .filter_map(|part| part["text"].as_str())
            .collect::<String>(),
    )
}

fn candidate_image(response: &Value) -> Option<MediaData> {
    let parts = response["candidates"][0]["content"]["parts"].as_array()?;
    parts.iter().find_map(|part| {
        let inline = &part["inlineData"];
        let data = inline["data"].as_str().filter(|data| !data.is_empty())?;
        Some(MediaData::new(
            inline["mimeType"].as_str().unwrap_or("image/png"),
            data,
        ))
    })
}

fn operation_outcome(operation: &Value) -> Result<PollOutcome, GenerationError> {
    if let Some(error) = operation.get("error").filter(|error| !error.is_null()) {
        let message = error["message"].as_str().unwrap_or("video operation failed");
        return Err(GenerationError::new(FailureKind::RemoteCall, message));
    }
    if !operation["done"].as_bool().unwrap_or(false) {
        return Ok(PollOutcome::InProgress);
    }
    let uri = operation["response"]["generateVideoResponse"]["generatedSamples"][0]["video"]["uri"]
        .as_str()
        .filter(|uri| !uri.is_empty());
    match uri {
        Some(uri) => Ok(PollOutcome::Done {
            result_uri: uri.to_string(),
        }),
        None => Err(GenerationError::new(
            FailureKind::RemoteCall,
            "video operation finished without a video",
        )),
    }
}

fn api_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}

/// Explains an empty answer, preferring the service's own block reason.
fn empty_response_error(response: &Value, fallback: &str) -> GenerationError {
    let message = response["promptFeedback"]["blockReason"]
        .as_str()
        .map(|reason| format!("request blocked: {reason}"))
        .unwrap_or_else(|| fallback.to_string());
    GenerationError::new(FailureKind::RemoteCall, message)
}

struct EventStreamState {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

/// Turns a server-sent-event body into ordered, non-empty text increments.
fn text_events(body: BoxStream<'static, reqwest::Result<Bytes>>) -> TextStream {
    let state = EventStreamState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((event_text(&event), state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(&chunk);
                    state.pending.extend(events);
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(map_reqwest_error(err)), state));
                }
                None => {
                    state.finished = true;
                    let tail = state.decoder.finish();
                    state.pending.extend(tail);
                }
            }
        }
    })
    .try_filter(|text| future::ready(!text.is_empty()))
    .boxed()
}

fn event_text(event: &str) -> Result<String, GenerationError> {
    let value: Value = serde_json::from_str(event).map_err(|err| {
        GenerationError::new(FailureKind::RemoteCall, format!("malformed stream event: {err}"))
    })?;
    if let Some(message) = value["error"]["message"].as_str() {
        return Err(GenerationError::new(FailureKind::RemoteCall, message));
    }
    Ok(candidate_text(&value).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_body_includes_history_system_and_schema() {
        let request = TextPrompt {
            system: Some("be brief".into()),
            history: vec![ChatTurn::user("hi"), ChatTurn::model("hello")],
            prompt: "allocate".into(),
            schema: Some(OutputSchema::Allocations),
        };
        let body = content_body(&request);

        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "allocate");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn operation_outcome_reads_done_flag_and_uri() {
        assert_eq!(
            operation_outcome(&json!({ "name": "operations/1" })).unwrap(),
            PollOutcome::InProgress
        );
        let done = json!({
            "done": true,
            "response": { "generateVideoResponse": { "generatedSamples": [
                { "video": { "uri": "https://files.example.com/v1" } }
            ] } }
        });
        assert_eq!(
            operation_outcome(&done).unwrap(),
            PollOutcome::Done {
                result_uri: "https://files.example.com/v1".into()
            }
        );
    }

    #[test]
    fn operation_error_is_a_remote_failure() {
        let err = operation_outcome(&json!({ "done": true, "error": { "code": 3, "message": "unsafe prompt" } }))
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::RemoteCall);
        assert_eq!(err.message, "unsafe prompt");
    }

    #[test]
    fn blocked_prompt_is_explained() {
        let err = empty_response_error(
            &json!({ "promptFeedback": { "blockReason": "SAFETY" } }),
            "response contained no text",
        );
        assert_eq!(err.message, "request blocked: SAFETY");
    }

    #[tokio::test]
    async fn text_events_skip_empty_chunks_and_keep_order() {
        let chunks: Vec<reqwest::Result<Bytes>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\r\n\r\n",
            )),
            Ok(Bytes::from_static(
                b"data: {\"candidates\":[{\"content\":{\"parts\":[]}}]}\n\ndata: {\"candidates\":[{\"content\":",
            )),
            Ok(Bytes::from_static(b"{\"parts\":[{\"text\":\"lo\"}]}}]}\n\n")),
        ];
        let texts: Vec<String> = text_events(stream::iter(chunks).boxed())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(texts, vec!["Hel", "lo"]);
    }
}
