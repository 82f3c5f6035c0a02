//! # Fraglink Viewer
//!
//! Headless viewer peer for the Fraglink bridge. Connects to the controller
//! over one duplex WebSocket channel, holds the loaded models in memory and
//! answers query, info, measurement and discovery commands.
//!
//! ## Usage
//!
//! ```bash
//! # Connect to a local bridge
//! fraglink-viewer --url ws://127.0.0.1:3001
//!
//! # Preload model fixtures before connecting
//! fraglink-viewer --model office=models/office.json
//! ```

mod agent;

use agent::ViewerAgent;
use clap::Parser;
use fraglink_core::protocol::WireFrame;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI
// =============================================================================

#[derive(Debug, Parser)]
#[command(name = "fraglink-viewer", about = "Headless Fraglink viewer peer")]
struct Cli {
    /// Bridge WebSocket URL.
    #[arg(long, default_value = "ws://127.0.0.1:3001")]
    url: String,

    /// Preload a model as `name=path.json` (repeatable).
    #[arg(long = "model", value_name = "NAME=PATH")]
    models: Vec<String>,
}

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // FRAGLINK_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("FRAGLINK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fraglink_viewer=info,fraglink_core=info".into());
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = Cli::parse();

    let mut agent = ViewerAgent::new();
    for spec in &cli.models {
        let (name, path) = spec
            .split_once('=')
            .ok_or_else(|| format!("bad --model '{spec}', expected NAME=PATH"))?;
        let payload = tokio::fs::read(path).await?;
        let count = agent.preload_model(name, &payload)?;
        tracing::info!(model = %name, elements = count, "model preloaded");
    }

    tracing::info!(url = %cli.url, "connecting to bridge");
    let (ws, _) = tokio_tungstenite::connect_async(&cli.url).await?;
    let (mut sink, mut source) = ws.split();
    tracing::info!("connected");

    while let Some(message) = source.next().await {
        let frame = match message? {
            Message::Text(text) => WireFrame::Text(text),
            Message::Binary(bytes) => WireFrame::Binary(bytes),
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };
        for reply in agent.handle_frame(frame) {
            let message = match reply {
                WireFrame::Text(text) => Message::Text(text),
                WireFrame::Binary(bytes) => Message::Binary(bytes),
            };
            sink.send(message).await?;
        }
    }

    tracing::info!("bridge closed the channel");
    Ok(())
}
