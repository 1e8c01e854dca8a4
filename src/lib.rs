//! WhatsApp Cloud API MCP server.
//!
//! Exposes WhatsApp Business Cloud API messaging as MCP tools over stdio.
//!
//! ## Architecture
//!
//! ```text
//! MCP client (JSON-RPC over stdio)
//!        │
//!        ▼
//! McpServer ── tools/list, tools/call
//!        │
//!        ▼
//! ToolRegistry ── 18 tools in three groups:
//!   ├── messaging    text, media, location, contacts, reactions, status
//!   ├── interactive  reply buttons, selection lists
//!   └── templates    template send, template listing
//!        │
//!        ▼
//! WhatsAppApi (CloudClient) ── Graph API /{phone_id}/messages etc.
//! ```
//!
//! Every tool call returns a uniform envelope: `{success, data?, error?}`.
//! Failures from the Cloud API are normalized into the envelope and never
//! surface as protocol-level errors.

pub mod config;
pub mod mcp;
pub mod registry;
pub mod tools;
pub mod whatsapp;

pub use config::Config;
pub use mcp::server::McpServer;
pub use registry::{Envelope, ToolRegistry};
