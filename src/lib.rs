//! chatrelay - stateless chat relay for a remote completion API
//!
//! Accepts a user message plus the conversation so far, forwards the whole
//! conversation to a chat-completions endpoint, and returns the reply along
//! with the extended history. Nothing is stored between requests.

pub mod cli;
pub mod completion;
pub mod config;
pub mod conversation;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod telemetry;
