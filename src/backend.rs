use crate::io_struct::{BackendChatRequest, ChatMessage};
use bytes::Bytes;
use futures::Stream;
use reqwest::StatusCode;
use serde::Deserialize;
use std::pin::Pin;

pub type BackendByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Failed to connect to backend {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Backend {url} returned status {status}")]
    Status { url: String, status: StatusCode },
    #[error("Failed to read backend response: {0}")]
    Body(#[source] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

/// Thin client for the local inference server's chat API.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    host: String,
}

impl BackendClient {
    pub fn new(client: reqwest::Client, host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            client,
            host: host.trim_end_matches('/').to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn api_path(&self, api_path: &str) -> String {
        if api_path.starts_with('/') {
            format!("{}{}", self.host, api_path)
        } else {
            format!("{}/{}", self.host, api_path)
        }
    }

    async fn post_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        stream: bool,
    ) -> Result<reqwest::Response, BackendError> {
        let url = self.api_path("/api/chat");
        let body = BackendChatRequest {
            model,
            messages,
            stream,
        };
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|source| BackendError::Connect {
                url: url.clone(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Status { url, status });
        }
        Ok(resp)
    }

    /// Starts a streaming chat and hands back the raw body as it arrives.
    ///
    /// Only connection establishment and the status line are awaited here;
    /// the body is consumed lazily by the caller. Dropping the returned
    /// stream aborts the backend request.
    pub async fn open_chat_stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<BackendByteStream, BackendError> {
        let resp = self.post_chat(model, messages, true).await?;
        Ok(Box::pin(resp.bytes_stream()))
    }

    /// Non-streaming chat: the whole JSON body or an error, nothing partial.
    pub async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<serde_json::Value, BackendError> {
        let resp = self.post_chat(model, messages, false).await?;
        resp.json::<serde_json::Value>()
            .await
            .map_err(BackendError::Body)
    }

    /// Names of the models installed on the backend.
    pub async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let url = self.api_path("/api/tags");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| BackendError::Connect {
                url: url.clone(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Status { url, status });
        }
        let tags = resp
            .json::<TagsResponse>()
            .await
            .map_err(BackendError::Body)?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}
