//! Tool registry and result envelope.
//!
//! The registry is an explicit object built once at startup and handed to the
//! MCP server; there is no global state. Handler failures are normalized into
//! the envelope in exactly one place, [`ToolRegistry::invoke`], so no handler
//! error can escape to the protocol layer.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

/// Boxed future returned by tool handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>;

/// A tool handler: named arguments in, structured payload (or error) out.
pub type Handler = Box<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

/// Registry errors. Unknown tool names are the only failure mode; handler
/// failures never surface here.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown tool: {0}")]
    NotFound(String),
}

/// Immutable description of one tool, created at startup.
///
/// Serializes directly into the MCP `tools/list` wire shape.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// Uniform result envelope returned by every tool invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.is_empty() {
            "tool call failed".to_string()
        } else {
            message
        };
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

struct ToolEntry {
    descriptor: ToolDescriptor,
    handler: Handler,
}

/// Process-wide collection of tools, keyed by name.
///
/// Built once at startup by the registration functions in [`crate::tools`];
/// immutable afterwards. Invocations are independent and stateless, so `&self`
/// access from concurrent tasks is safe without locking.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one tool. Registering a duplicate name replaces the previous
    /// entry but keeps its position in the listing.
    pub fn register(&mut self, descriptor: ToolDescriptor, handler: Handler) {
        let name = descriptor.name.clone();
        let entry = ToolEntry {
            descriptor,
            handler,
        };
        match self.index.get(&name) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
        info!(tool = %name, "registered tool");
    }

    /// Descriptors in registration order. Stable across repeated calls.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invoke a tool by name.
    ///
    /// This is the single place handler results become envelopes: `Ok` data
    /// becomes `{success:true, data}`, any error becomes
    /// `{success:false, error}`. Only an unknown name is an `Err`.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<Envelope, RegistryError> {
        let entry = self
            .index
            .get(name)
            .map(|&pos| &self.entries[pos])
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        debug!(tool = %name, "invoking tool");
        Ok(match (entry.handler)(args).await {
            Ok(data) => Envelope::ok(data),
            Err(e) => {
                debug!(tool = %name, error = %e, "tool call failed");
                Envelope::fail(e.to_string())
            }
        })
    }
}
