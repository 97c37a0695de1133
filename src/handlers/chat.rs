//! Chat endpoint handler
//!
//! Handles POST /api/chat: appends the caller's message to the supplied
//! history, forwards the conversation to the completion API, and returns the
//! reply together with the extended history.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Instant;

use crate::conversation::{self, History, Role};
use crate::error::AppError;
use crate::handlers::AppState;
use crate::metrics::Outcome;
use crate::middleware::RequestId;

/// Chat request from client
///
/// Any string `message` is accepted, including the empty string.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    message: String,
    // Absent and `null` both normalize to an empty history
    #[serde(default, deserialize_with = "null_as_empty")]
    history: History,
}

impl ChatRequest {
    /// Get the message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the prior conversation (empty when the caller sent none)
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Split into message and history
    pub fn into_parts(self) -> (String, History) {
        (self.message, self.history)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<History, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<History>::deserialize(deserializer)?.unwrap_or_default())
}

/// Chat response to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The assistant's reply
    pub response: String,
    /// Full conversation including the new user and assistant turns
    pub history: History,
}

/// POST /api/chat handler
///
/// The single suspension point is the completion call, bounded by the
/// upstream timeout. Failures are returned as `{"error": ...}` and never
/// append an assistant turn.
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(
            request_id = %request_id,
            status = %rejection.status(),
            error = %rejection.body_text(),
            "Rejected malformed chat request"
        );
        record_outcome(&state, request_id, Outcome::InvalidRequest);
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(rejection.body_text())
        } else {
            AppError::Validation(rejection.body_text())
        }
    })?;

    tracing::debug!(
        request_id = %request_id,
        message_length = request.message().len(),
        history_length = request.history().len(),
        "Received chat request"
    );

    let (message, history) = request.into_parts();
    let history = conversation::append(history, Role::User, message);

    let upstream = &state.config().upstream;
    let start = Instant::now();
    let result = state
        .client()
        .complete(&upstream.model, &history, upstream.max_tokens)
        .await;
    let elapsed = start.elapsed().as_secs_f64();

    if let Err(e) = state.metrics().record_completion_duration(elapsed) {
        tracing::error!(
            request_id = %request_id,
            error = %e,
            duration_seconds = elapsed,
            "Metrics recording failed (non-fatal)"
        );
    }

    let completion = match result {
        Ok(completion) => completion,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                error = %e,
                error_kind = e.kind(),
                model = %upstream.model,
                history_length = history.len(),
                duration_seconds = elapsed,
                "Completion request failed"
            );
            record_outcome(&state, request_id, Outcome::from(&e));
            return Err(e.into());
        }
    };

    let reply = completion.reply().to_string();
    let history = conversation::append(history, Role::Assistant, reply.clone());

    tracing::info!(
        request_id = %request_id,
        response_length = reply.len(),
        history_length = history.len(),
        duration_seconds = elapsed,
        "Chat request completed"
    );
    record_outcome(&state, request_id, Outcome::Success);

    Ok(Json(ChatResponse {
        response: reply,
        history,
    }))
}

// Metrics are non-critical: failures are logged and the request continues.
fn record_outcome(state: &AppState, request_id: RequestId, outcome: Outcome) {
    if let Err(e) = state.metrics().record_chat_request(outcome) {
        tracing::error!(
            request_id = %request_id,
            error = %e,
            outcome = outcome.as_str(),
            "Metrics recording failed (non-fatal)"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Message;

    #[test]
    fn test_chat_request_deserializes() {
        let json = r#"{"message": "Hello!"}"#;
        let req: ChatRequest = serde_json::from_str(json).expect("should deserialize");

        assert_eq!(req.message(), "Hello!");
        assert!(req.history().is_empty());
    }

    #[test]
    fn test_chat_request_null_history_is_empty() {
        let json = r#"{"message": "Hello!", "history": null}"#;
        let req: ChatRequest = serde_json::from_str(json).expect("should deserialize");
        assert!(req.history().is_empty());
    }

    #[test]
    fn test_chat_request_keeps_history_order() {
        let json = r#"{
            "message": "and then?",
            "history": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"}
            ]
        }"#;
        let req: ChatRequest = serde_json::from_str(json).expect("should deserialize");

        assert_eq!(
            req.history(),
            &vec![
                Message::system("be brief"),
                Message::user("hi"),
                Message::assistant("hello"),
            ]
        );
    }

    #[test]
    fn test_chat_request_rejects_missing_message() {
        let result: Result<ChatRequest, _> = serde_json::from_str(r#"{"history": []}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_chat_request_accepts_empty_message() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"message": "", "history": []}"#).expect("should deserialize");
        assert_eq!(req.message(), "");
    }

    #[test]
    fn test_chat_request_keeps_whitespace_message_verbatim() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"message": "  \n\t "}"#).expect("should deserialize");
        assert_eq!(req.message(), "  \n\t ");
    }

    #[test]
    fn test_chat_request_accepts_long_message() {
        let long = "é".repeat(200_000);
        let json = serde_json::json!({ "message": long }).to_string();
        let req: ChatRequest = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(req.message().chars().count(), 200_000);
    }

    #[test]
    fn test_chat_request_rejects_non_string_message() {
        assert!(serde_json::from_str::<ChatRequest>(r#"{"message": 42}"#).is_err());
        assert!(serde_json::from_str::<ChatRequest>(r#"{"message": null}"#).is_err());
    }

    #[test]
    fn test_chat_request_rejects_unknown_role_in_history() {
        let json = r#"{"message": "hi", "history": [{"role": "robot", "content": "beep"}]}"#;
        assert!(serde_json::from_str::<ChatRequest>(json).is_err());
    }

    #[test]
    fn test_chat_response_serializes_to_wire_shape() {
        let response = ChatResponse {
            response: "hello".to_string(),
            history: vec![Message::user("hi"), Message::assistant("hello")],
        };

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({
                "response": "hello",
                "history": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"}
                ]
            })
        );
    }
}
