//! WhatsApp MCP server binary.
//!
//! ## Usage
//!
//! ```bash
//! WHATSAPP_PHONE_ID=123456 WHATSAPP_TOKEN=EAAG... whatsapp-mcp
//! ```
//!
//! ## Environment Variables
//!
//! - `WHATSAPP_PHONE_ID` (required): sender phone number id
//! - `WHATSAPP_TOKEN` (required): Cloud API access token
//! - `WHATSAPP_BUSINESS_ACCOUNT_ID` (optional): enables the `get_templates` tool
//! - `WHATSAPP_API_VERSION` (optional): Graph API version, default v21.0

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use whatsapp_mcp::config::Config;
use whatsapp_mcp::mcp::McpServer;
use whatsapp_mcp::registry::ToolRegistry;
use whatsapp_mcp::tools;
use whatsapp_mcp::whatsapp::{CloudClient, WhatsAppApi};

#[tokio::main]
async fn main() -> Result<()> {
    // Log to stderr only; stdout belongs to the MCP transport.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env().context("configuration error, refusing to start")?;
    tracing::info!(
        phone_id = %config.phone_id,
        api_version = %config.api_version,
        templates_enabled = config.business_account_id.is_some(),
        "configuration loaded"
    );

    let client: Arc<dyn WhatsAppApi> =
        Arc::new(CloudClient::new(config).context("failed to build WhatsApp client")?);

    let mut registry = ToolRegistry::new();
    tools::register_all(&mut registry, client);

    McpServer::new(registry).run().await
}
