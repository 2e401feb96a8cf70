use futures_util::StreamExt;

use crate::{EngineEvent, FailureKind, GenerationError};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Adds the access credential to a result URI as the `key` query parameter.
pub fn with_access_key(uri: &str, api_key: &str) -> Result<reqwest::Url, GenerationError> {
    let mut url = reqwest::Url::parse(uri).map_err(|err| {
        GenerationError::new(FailureKind::RemoteCall, format!("invalid result uri: {err}"))
    })?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}

/// Downloads a generated artifact, refusing anything that is not a 2xx or exceeds `max_bytes`.
pub async fn download_media(
    client: &reqwest::Client,
    url: reqwest::Url,
    max_bytes: u64,
) -> Result<Vec<u8>, GenerationError> {
    let response = client.get(url).send().await.map_err(map_reqwest_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(GenerationError::new(
            FailureKind::HttpStatus(status.as_u16()),
            format!("media download failed: {status}"),
        ));
    }

    if let Some(content_len) = response.content_length() {
        if content_len > max_bytes {
            return Err(GenerationError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: Some(content_len),
                },
                "media too large",
            ));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        let next_len = bytes.len() as u64 + chunk.len() as u64;
        if next_len > max_bytes {
            return Err(GenerationError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: Some(next_len),
                },
                "media too large",
            ));
        }
        bytes.extend_from_slice(&chunk);
    }
    if bytes.is_empty() {
        return Err(GenerationError::new(
            FailureKind::RemoteCall,
            "media download returned an empty body",
        ));
    }
    Ok(bytes)
}

/// Converts a transport error, dropping the request URL: result URIs carry the access key.
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> GenerationError {
    let err = err.without_url();
    if err.is_timeout() {
        return GenerationError::new(FailureKind::Timeout, err.to_string());
    }
    GenerationError::new(FailureKind::Network, err.to_string())
}
