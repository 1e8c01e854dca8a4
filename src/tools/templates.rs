//! Template tools: sending template messages and listing approved templates.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::registry::{ToolDescriptor, ToolRegistry};
use crate::whatsapp::WhatsAppApi;

use super::handler;

fn default_language() -> String {
    "en".to_string()
}

fn default_limit() -> u32 {
    100
}

#[derive(Deserialize)]
struct SendTemplateArgs {
    to: String,
    template: String,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default)]
    components: Option<Value>,
    #[serde(default)]
    reply_to_message_id: Option<String>,
}

#[derive(Deserialize)]
struct GetTemplatesArgs {
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    name: Option<String>,
}

/// Register the two template tools.
pub fn register(registry: &mut ToolRegistry, api: Arc<dyn WhatsAppApi>) {
    registry.register(
        ToolDescriptor::new(
            "send_template",
            "Send a pre-approved WhatsApp template message.",
            json!({
                "type": "object",
                "properties": {
                    "to": { "type": "string", "description": "Phone number or WhatsApp ID" },
                    "template": { "type": "string", "description": "Template name" },
                    "language": {
                        "type": "string",
                        "default": "en",
                        "description": "Template language code"
                    },
                    "components": {
                        "type": "array",
                        "description": "Optional template components (header, body, button parameters)"
                    },
                    "reply_to_message_id": { "type": "string", "description": "Message ID to reply to" }
                },
                "required": ["to", "template"]
            }),
        ),
        handler(api.clone(), |api, args: SendTemplateArgs| async move {
            let resp = api
                .send_template(
                    &args.to,
                    &args.template,
                    &args.language,
                    args.components.as_ref(),
                    args.reply_to_message_id.as_deref(),
                )
                .await?;
            Ok(json!({
                "message_id": resp.message_id(),
                "template": args.template,
                "to": args.to,
            }))
        }),
    );

    registry.register(
        ToolDescriptor::new(
            "get_templates",
            "List the message templates of the business account.",
            json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "default": 100,
                        "description": "Maximum number of templates to return"
                    },
                    "name": { "type": "string", "description": "Optional template name filter" }
                }
            }),
        ),
        handler(api, |api, args: GetTemplatesArgs| async move {
            let raw = api.list_templates(args.limit, args.name.as_deref()).await?;

            let templates: Vec<Value> = raw["data"]
                .as_array()
                .map(|entries| {
                    entries
                        .iter()
                        .map(|t| {
                            json!({
                                "id": t["id"].as_str().unwrap_or_default(),
                                "name": t["name"].as_str().unwrap_or_default(),
                                "language": t["language"].as_str().unwrap_or_default(),
                                "status": t["status"].as_str().unwrap_or_default(),
                                "category": t["category"].as_str().unwrap_or_default(),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            Ok(json!({
                "count": templates.len(),
                "templates": templates,
            }))
        }),
    );
}
