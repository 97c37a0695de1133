//! HTTP implementation of [`CompletionClient`] on top of reqwest

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use std::time::{Duration, Instant};

use super::{CompletionClient, CompletionRequest, CompletionResult, RawCompletionResult};
use crate::config::{ApiKey, UpstreamConfig};
use crate::conversation::Message;
use crate::error::{AppError, AppResult, CompletionError};

/// Placeholder used when an error response body cannot be read
const UNREADABLE_BODY: &str = "<unreadable response body>";

/// Completion client that POSTs JSON to a fixed endpoint
///
/// Holds a pooled `reqwest::Client`, so one instance should be shared by all
/// requests.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: ApiKey,
    timeout: Duration,
}

impl HttpCompletionClient {
    /// Create a client for `endpoint` with a total per-call timeout
    pub fn new(endpoint: impl Into<String>, api_key: ApiKey, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            timeout,
        })
    }

    /// Create a client from the `[upstream]` configuration section
    pub fn from_config(upstream: &UpstreamConfig) -> AppResult<Self> {
        Self::new(
            upstream.endpoint.clone(),
            upstream.api_key().clone(),
            upstream.timeout(),
        )
    }

    /// Get the endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, e: reqwest::Error) -> CompletionError {
        let reason = if e.is_timeout() {
            format!("request timed out after {:?}", self.timeout)
        } else if e.is_connect() {
            format!("connection failed: {}", e)
        } else {
            e.to_string()
        };

        CompletionError::Transport {
            endpoint: self.endpoint.clone(),
            reason,
        }
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        max_tokens: u32,
    ) -> Result<CompletionResult, CompletionError> {
        let payload = serde_json::to_vec(&CompletionRequest {
            model,
            messages,
            max_tokens,
        })
        .map_err(CompletionError::Serialization)?;

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %model,
            message_count = messages.len(),
            max_tokens = max_tokens,
            payload_bytes = payload.len(),
            "Sending completion request"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .bearer_auth(self.api_key.expose())
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                let err = self.transport_error(e);
                tracing::warn!(
                    endpoint = %self.endpoint,
                    error = %err,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Completion request failed before a response was received"
                );
                err
            })?;

        let status = response.status();

        // Every branch below reads the body to completion before the
        // response is dropped, so the connection goes back to the pool.
        if status != StatusCode::OK {
            let body = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(
                        endpoint = %self.endpoint,
                        status = %status,
                        error = %e,
                        "Failed to read error response body"
                    );
                    UNREADABLE_BODY.to_string()
                }
            };

            tracing::warn!(
                endpoint = %self.endpoint,
                status = status.as_u16(),
                body_length = body.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Completion API returned non-200 status"
            );

            return Err(CompletionError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        let raw: RawCompletionResult = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(
                endpoint = %self.endpoint,
                error = %e,
                body_length = bytes.len(),
                "Completion API response did not match expected shape"
            );
            CompletionError::Deserialization(e.to_string())
        })?;

        let result = raw.validate()?;

        tracing::info!(
            endpoint = %self.endpoint,
            model = %model,
            choices = result.choices().len(),
            response_length = result.reply().len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Completion request succeeded"
        );

        Ok(result)
    }
}
