//! # Fraglink MCP Server
//!
//! Entry point for the MCP (Model Context Protocol) bridge to a Fraglink
//! viewer.
//!
//! Reads configuration from environment variables:
//! - `FRAGLINK_WS_ADDR` — WebSocket bind address for the viewer
//!   (default: `127.0.0.1:3001`)
//! - `FRAGLINK_EXPORT_DIR` — Directory for CSV exports (default: `exports`)
//!
//! Communicates with AI clients via MCP over stdio, and with the viewer
//! over one duplex WebSocket channel.

mod bridge;
mod export;
mod server;

use bridge::ViewerBridge;
use export::ExportDir;
use rmcp::{ServiceExt, transport::stdio};
use server::FraglinkMcp;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging to stderr only — stdout is reserved for MCP stdio transport.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let ws_addr =
        std::env::var("FRAGLINK_WS_ADDR").unwrap_or_else(|_| "127.0.0.1:3001".into());
    let export_dir = std::env::var("FRAGLINK_EXPORT_DIR").unwrap_or_else(|_| "exports".into());

    tracing::info!("Fraglink MCP server starting, viewer endpoint: {}", ws_addr);

    let viewer_bridge = ViewerBridge::new();
    viewer_bridge.listen(&ws_addr).await?;

    let mcp = FraglinkMcp::new(viewer_bridge, ExportDir::new(export_dir));

    let service = mcp.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("MCP serve error: {:?}", e);
    })?;

    service.waiting().await?;
    Ok(())
}
