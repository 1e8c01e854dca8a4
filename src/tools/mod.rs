//! Tool registration.
//!
//! Three fixed groups, 18 tools total: messaging, interactive, templates.
//! Each tool is registered explicitly with its name, description and JSON
//! schema, and delegates to exactly one [`WhatsAppApi`] operation.

use std::sync::Arc;

use anyhow::anyhow;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::registry::{Handler, HandlerFuture, ToolRegistry};
use crate::whatsapp::WhatsAppApi;

pub mod interactive;
pub mod messaging;
pub mod templates;

/// Register every tool group on the given registry.
pub fn register_all(registry: &mut ToolRegistry, api: Arc<dyn WhatsAppApi>) {
    messaging::register(registry, api.clone());
    interactive::register(registry, api.clone());
    templates::register(registry, api);
}

/// Build a [`Handler`] from a typed argument struct and an async body.
///
/// Argument decoding failures are ordinary handler errors, so they end up in
/// the result envelope like any external failure.
pub(crate) fn handler<A, F, Fut>(api: Arc<dyn WhatsAppApi>, run: F) -> Handler
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(Arc<dyn WhatsAppApi>, A) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Box::new(move |args: Value| {
        let args = if args.is_null() {
            Value::Object(Default::default())
        } else {
            args
        };
        let fut: HandlerFuture = match serde_json::from_value::<A>(args) {
            Ok(parsed) => Box::pin(run(api.clone(), parsed)),
            Err(e) => Box::pin(async move { Err(anyhow!("invalid arguments: {e}")) }),
        };
        fut
    })
}
