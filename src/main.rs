//! chatrelay HTTP server
//!
//! Starts an Axum web server that relays chat conversations to a remote
//! completion API and serves the static chat UI.

use chatrelay::{
    cli::{Cli, Command, generate_config_template},
    config::{self, Config, DotenvStatus},
    handlers::{self, AppState},
    telemetry,
};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        let template = generate_config_template();
        match output {
            Some(path) => {
                std::fs::write(&path, template)?;
                eprintln!("Wrote configuration template to {}", path.display());
            }
            None => print!("{}", template),
        }
        return Ok(());
    }

    // .env must be applied before the environment is read
    let dotenv = config::load_dotenv()?;
    let config = Config::load(cli.config.as_deref(), |key| std::env::var(key).ok())?;

    telemetry::init(&config.observability.log_level);

    match dotenv {
        DotenvStatus::Loaded(path) => {
            tracing::info!(path = %path.display(), "Loaded environment from .env file")
        }
        DotenvStatus::NotFound => tracing::warn!(".env file not found, using process environment"),
    }

    tracing::info!(
        endpoint = %config.upstream.endpoint,
        model = %config.upstream.model,
        max_tokens = config.upstream.max_tokens,
        timeout_seconds = config.upstream.timeout_seconds,
        static_dir = %config.server.static_dir.display(),
        "Starting chatrelay server on {}:{}",
        config.server.host,
        config.server.port
    );

    let host = config.server.host.parse::<IpAddr>().unwrap_or_else(|_| {
        tracing::warn!(
            host = %config.server.host,
            "Invalid server.host, binding to 0.0.0.0 instead"
        );
        IpAddr::from([0, 0, 0, 0])
    });
    let addr = SocketAddr::from((host, config.server.port));

    let state = AppState::new(config)?;
    let app = handlers::app(state);

    tracing::info!("Listening on {}", addr);
    tracing::info!("Chat API available at http://{}/api/chat", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
