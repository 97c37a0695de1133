//! Remote completion API client
//!
//! [`CompletionClient`] is the seam between the chat handler and the remote
//! service. [`HttpCompletionClient`] is the production implementation; tests
//! substitute their own.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::conversation::Message;
use crate::error::CompletionError;

pub mod http;

pub use http::HttpCompletionClient;

/// Client for a chat-completions style API
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Request a completion for `messages`
    ///
    /// Performs exactly one remote call. Errors are never retried.
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        max_tokens: u32,
    ) -> Result<CompletionResult, CompletionError>;
}

/// Outbound request body
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub max_tokens: u32,
}

/// Successful completion with at least one choice
///
/// Every constructor rejects an empty choice list, so [`CompletionResult::reply`]
/// always has a first choice to read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionResult {
    choices: Vec<Choice>,
}

impl CompletionResult {
    /// Build a result from candidate replies, rejecting an empty list
    pub fn from_choices(choices: Vec<Choice>) -> Result<Self, CompletionError> {
        if choices.is_empty() {
            return Err(CompletionError::EmptyResult);
        }
        Ok(Self { choices })
    }

    /// Build a single-choice result
    pub fn from_reply(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice::new(content)],
        }
    }

    /// All candidate replies, in the order returned by the remote service
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    /// Content of the first choice
    pub fn reply(&self) -> &str {
        // from_choices/from_reply guarantee at least one element
        self.choices[0].content()
    }
}

/// Wire shape of the response body, before the non-empty check
#[derive(Debug, Deserialize)]
pub(crate) struct RawCompletionResult {
    // Missing and `null` both mean no choices
    #[serde(default)]
    choices: Option<Vec<Choice>>,
}

impl RawCompletionResult {
    pub(crate) fn validate(self) -> Result<CompletionResult, CompletionError> {
        CompletionResult::from_choices(self.choices.unwrap_or_default())
    }
}

/// One candidate reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    message: ChoiceMessage,
}

impl Choice {
    /// Build a choice holding `content` as the assistant's text
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            message: ChoiceMessage {
                content: content.into(),
            },
        }
    }

    /// Assistant text of this choice (empty when the remote sent `null`)
    pub fn content(&self) -> &str {
        &self.message.content
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ChoiceMessage {
    #[serde(default, deserialize_with = "null_as_empty")]
    content: String,
}

// Some providers send `"content": null` for non-text replies
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
