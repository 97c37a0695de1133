//! Command-line interface for chatrelay
//!
//! Provides argument parsing and subcommand handling for the chatrelay binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stateless chat relay for a remote completion API
#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(version)]
#[command(about = "Stateless chat relay for a remote completion API")]
#[command(
    long_about = "chatrelay serves a static chat UI and forwards each POST /api/chat \
    conversation to a remote completion API, returning the reply with the updated history. \
    The API key is read from MCP_API_KEY (a local .env file is honoured)."
)]
pub struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# chatrelay Configuration
# ========================
#
# Every setting is optional; the values below are the built-in defaults.
#
# Secrets are NOT read from this file. Set the API key in the environment:
#
#   MCP_API_KEY=sk-...     (required)
#   PORT=8080              (optional, overrides server.port)
#
# Both may also be placed in a .env file in the working directory.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on
port = 8080

# Directory served at / (the chat UI)
static_dir = "public"

# Largest accepted request body in bytes (64 MiB). Clients resend the whole
# conversation on every turn, so long chats need headroom here.
max_request_bytes = 67108864

# ─────────────────────────────────────────────────────────────────────────────
# COMPLETION API
# ─────────────────────────────────────────────────────────────────────────────

[upstream]
# Chat-completions endpoint that receives every conversation
endpoint = "https://api.mcp.ai/chat/completions"

# Model identifier sent with each request
model = "gpt-4"

# Upper bound on reply length, in tokens
max_tokens = 1000

# Total time allowed for one completion call, in seconds (1-300)
timeout_seconds = 30

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error" (RUST_LOG takes precedence)
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
"#
}
