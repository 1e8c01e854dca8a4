//! Interactive tools: reply buttons and selection lists.
//!
//! The Cloud API enforces hard limits on these payloads; they are checked
//! here before the call goes out so the caller gets a precise message instead
//! of a generic Graph API rejection.

use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Deserialize;
use serde_json::json;

use crate::registry::{ToolDescriptor, ToolRegistry};
use crate::whatsapp::{Button, Section, WhatsAppApi};

use super::handler;

const MAX_BUTTONS: usize = 3;
const MAX_BUTTON_TITLE: usize = 20;
const MAX_BUTTON_ID: usize = 256;
const MAX_SECTIONS: usize = 10;
const MAX_TOTAL_ROWS: usize = 10;
const MAX_SECTION_TITLE: usize = 24;
const MAX_ROW_TITLE: usize = 24;
const MAX_ROW_DESCRIPTION: usize = 72;
const MAX_ROW_ID: usize = 200;
const MAX_HEADER: usize = 60;
const MAX_FOOTER: usize = 60;

#[derive(Deserialize)]
struct SendButtonsArgs {
    to: String,
    text: String,
    buttons: Vec<Button>,
    #[serde(default)]
    header: Option<String>,
    #[serde(default)]
    footer: Option<String>,
    #[serde(default)]
    reply_to_message_id: Option<String>,
}

#[derive(Deserialize)]
struct SendListArgs {
    to: String,
    text: String,
    button_text: String,
    sections: Vec<Section>,
    #[serde(default)]
    header: Option<String>,
    #[serde(default)]
    footer: Option<String>,
    #[serde(default)]
    reply_to_message_id: Option<String>,
}

fn chars(s: &str) -> usize {
    s.chars().count()
}

fn check_header_footer(header: Option<&str>, footer: Option<&str>) -> Result<()> {
    if let Some(header) = header {
        if chars(header) > MAX_HEADER {
            bail!("Header text must be max {MAX_HEADER} characters");
        }
    }
    if let Some(footer) = footer {
        if chars(footer) > MAX_FOOTER {
            bail!("Footer text must be max {MAX_FOOTER} characters");
        }
    }
    Ok(())
}

fn check_buttons(buttons: &[Button]) -> Result<()> {
    if buttons.len() > MAX_BUTTONS {
        bail!("Maximum {MAX_BUTTONS} buttons allowed");
    }
    for button in buttons {
        if chars(&button.title) > MAX_BUTTON_TITLE {
            bail!(
                "Button title '{}' exceeds {MAX_BUTTON_TITLE} characters",
                button.title
            );
        }
        if chars(&button.id) > MAX_BUTTON_ID {
            bail!("Button ID '{}' exceeds {MAX_BUTTON_ID} characters", button.id);
        }
    }
    Ok(())
}

fn check_sections(button_text: &str, sections: &[Section]) -> Result<()> {
    if sections.len() > MAX_SECTIONS {
        bail!("Maximum {MAX_SECTIONS} sections allowed");
    }
    if chars(button_text) > MAX_BUTTON_TITLE {
        bail!("Button text must be max {MAX_BUTTON_TITLE} characters");
    }
    let total_rows: usize = sections.iter().map(|s| s.rows.len()).sum();
    if total_rows > MAX_TOTAL_ROWS {
        bail!("Maximum {MAX_TOTAL_ROWS} rows total across all sections");
    }
    for section in sections {
        if chars(&section.title) > MAX_SECTION_TITLE {
            bail!(
                "Section title '{}' exceeds {MAX_SECTION_TITLE} characters",
                section.title
            );
        }
        for row in &section.rows {
            if chars(&row.id) > MAX_ROW_ID {
                bail!("Row ID '{}' exceeds {MAX_ROW_ID} characters", row.id);
            }
            if chars(&row.title) > MAX_ROW_TITLE {
                bail!("Row title '{}' exceeds {MAX_ROW_TITLE} characters", row.title);
            }
            if let Some(description) = &row.description {
                if chars(description) > MAX_ROW_DESCRIPTION {
                    bail!(
                        "Row description '{}' exceeds {MAX_ROW_DESCRIPTION} characters",
                        description
                    );
                }
            }
        }
    }
    Ok(())
}

/// Register the two interactive tools.
pub fn register(registry: &mut ToolRegistry, api: Arc<dyn WhatsAppApi>) {
    registry.register(
        ToolDescriptor::new(
            "send_message_with_buttons",
            "Send a message with up to 3 reply buttons. \
             Button titles are limited to 20 characters, button IDs to 256, \
             header and footer to 60.",
            json!({
                "type": "object",
                "properties": {
                    "to": { "type": "string", "description": "Phone number or WhatsApp ID" },
                    "text": { "type": "string", "description": "Message body text" },
                    "buttons": {
                        "type": "array",
                        "maxItems": MAX_BUTTONS,
                        "description": "Reply buttons, each with 'id' and 'title'",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": { "type": "string" },
                                "title": { "type": "string" }
                            },
                            "required": ["id", "title"]
                        }
                    },
                    "header": { "type": "string", "description": "Optional header text" },
                    "footer": { "type": "string", "description": "Optional footer text" },
                    "reply_to_message_id": { "type": "string", "description": "Message ID to reply to" }
                },
                "required": ["to", "text", "buttons"]
            }),
        ),
        handler(api.clone(), |api, args: SendButtonsArgs| async move {
            check_buttons(&args.buttons)?;
            check_header_footer(args.header.as_deref(), args.footer.as_deref())?;

            let resp = api
                .send_buttons(
                    &args.to,
                    &args.text,
                    &args.buttons,
                    args.header.as_deref(),
                    args.footer.as_deref(),
                    args.reply_to_message_id.as_deref(),
                )
                .await?;
            Ok(json!({ "message_id": resp.message_id() }))
        }),
    );

    registry.register(
        ToolDescriptor::new(
            "send_message_with_list",
            "Send a message with a selection list. \
             At most 10 sections and 10 rows total; row titles are limited to \
             24 characters, row descriptions to 72, row IDs to 200.",
            json!({
                "type": "object",
                "properties": {
                    "to": { "type": "string", "description": "Phone number or WhatsApp ID" },
                    "text": { "type": "string", "description": "Message body text" },
                    "button_text": {
                        "type": "string",
                        "description": "Label of the button that opens the list (max 20 chars)"
                    },
                    "sections": {
                        "type": "array",
                        "maxItems": MAX_SECTIONS,
                        "description": "List sections, each with 'title' and 'rows'",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "rows": {
                                    "type": "array",
                                    "items": {
                                        "type": "object",
                                        "properties": {
                                            "id": { "type": "string" },
                                            "title": { "type": "string" },
                                            "description": { "type": "string" }
                                        },
                                        "required": ["id", "title"]
                                    }
                                }
                            },
                            "required": ["rows"]
                        }
                    },
                    "header": { "type": "string", "description": "Optional header text" },
                    "footer": { "type": "string", "description": "Optional footer text" },
                    "reply_to_message_id": { "type": "string", "description": "Message ID to reply to" }
                },
                "required": ["to", "text", "button_text", "sections"]
            }),
        ),
        handler(api, |api, args: SendListArgs| async move {
            check_sections(&args.button_text, &args.sections)?;
            check_header_footer(args.header.as_deref(), args.footer.as_deref())?;

            let resp = api
                .send_list(
                    &args.to,
                    &args.text,
                    &args.button_text,
                    &args.sections,
                    args.header.as_deref(),
                    args.footer.as_deref(),
                    args.reply_to_message_id.as_deref(),
                )
                .await?;
            Ok(json!({ "message_id": resp.message_id() }))
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::super::testing::{MockApi, MOCK_MESSAGE_ID};
    use super::*;
    use crate::registry::ToolRegistry;

    fn registry_with(api: Arc<MockApi>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        register(&mut registry, api);
        registry
    }

    fn three_buttons() -> serde_json::Value {
        json!([
            { "id": "option_1", "title": "Yes" },
            { "id": "option_2", "title": "No" },
            { "id": "option_3", "title": "Maybe" }
        ])
    }

    #[tokio::test]
    async fn buttons_happy_path() {
        let api = Arc::new(MockApi::ok());
        let registry = registry_with(api.clone());

        let envelope = registry
            .invoke(
                "send_message_with_buttons",
                json!({
                    "to": "+1234567890",
                    "text": "Choose an option:",
                    "buttons": three_buttons(),
                    "header": "Quick Question",
                    "footer": "Select one option"
                }),
            )
            .await
            .unwrap();

        assert!(envelope.success);
        assert_eq!(envelope.data.unwrap()["message_id"], MOCK_MESSAGE_ID);
        let calls = api.recorded();
        assert_eq!(calls[0]["op"], "send_buttons");
        assert_eq!(calls[0]["buttons"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn four_buttons_are_rejected_locally() {
        let api = Arc::new(MockApi::ok());
        let registry = registry_with(api.clone());

        let envelope = registry
            .invoke(
                "send_message_with_buttons",
                json!({
                    "to": "+1",
                    "text": "pick",
                    "buttons": [
                        { "id": "a", "title": "A" },
                        { "id": "b", "title": "B" },
                        { "id": "c", "title": "C" },
                        { "id": "d", "title": "D" }
                    ]
                }),
            )
            .await
            .unwrap();

        assert!(!envelope.success);
        assert!(envelope.error.unwrap().contains("Maximum 3 buttons"));
        assert!(api.recorded().is_empty());
    }

    #[tokio::test]
    async fn long_button_title_is_rejected() {
        let api = Arc::new(MockApi::ok());
        let registry = registry_with(api);

        let envelope = registry
            .invoke(
                "send_message_with_buttons",
                json!({
                    "to": "+1",
                    "text": "pick",
                    "buttons": [{ "id": "a", "title": "this title is way over twenty characters" }]
                }),
            )
            .await
            .unwrap();

        assert!(!envelope.success);
        assert!(envelope.error.unwrap().contains("exceeds 20 characters"));
    }

    #[tokio::test]
    async fn long_header_is_rejected() {
        let api = Arc::new(MockApi::ok());
        let registry = registry_with(api);

        let envelope = registry
            .invoke(
                "send_message_with_buttons",
                json!({
                    "to": "+1",
                    "text": "pick",
                    "buttons": three_buttons(),
                    "header": "h".repeat(61)
                }),
            )
            .await
            .unwrap();

        assert!(!envelope.success);
        assert!(envelope.error.unwrap().contains("Header text"));
    }

    #[tokio::test]
    async fn list_happy_path() {
        let api = Arc::new(MockApi::ok());
        let registry = registry_with(api.clone());

        let envelope = registry
            .invoke(
                "send_message_with_list",
                json!({
                    "to": "+1234567890",
                    "text": "Choose from our menu:",
                    "button_text": "View Menu",
                    "sections": [
                        {
                            "title": "Main Courses",
                            "rows": [
                                { "id": "burger", "title": "Burger", "description": "Beef burger with fries" },
                                { "id": "pizza", "title": "Pizza" }
                            ]
                        },
                        {
                            "title": "Beverages",
                            "rows": [
                                { "id": "water", "title": "Water" }
                            ]
                        }
                    ]
                }),
            )
            .await
            .unwrap();

        assert!(envelope.success);
        let calls = api.recorded();
        assert_eq!(calls[0]["op"], "send_list");
        assert_eq!(calls[0]["button_text"], "View Menu");
    }

    #[tokio::test]
    async fn too_many_rows_are_rejected() {
        let api = Arc::new(MockApi::ok());
        let registry = registry_with(api.clone());

        let rows: Vec<serde_json::Value> = (0..11)
            .map(|i| json!({ "id": format!("row{i}"), "title": format!("Row {i}") }))
            .collect();

        let envelope = registry
            .invoke(
                "send_message_with_list",
                json!({
                    "to": "+1",
                    "text": "menu",
                    "button_text": "Open",
                    "sections": [{ "title": "All", "rows": rows }]
                }),
            )
            .await
            .unwrap();

        assert!(!envelope.success);
        assert!(envelope.error.unwrap().contains("Maximum 10 rows"));
        assert!(api.recorded().is_empty());
    }

    #[tokio::test]
    async fn long_row_description_is_rejected() {
        let api = Arc::new(MockApi::ok());
        let registry = registry_with(api);

        let envelope = registry
            .invoke(
                "send_message_with_list",
                json!({
                    "to": "+1",
                    "text": "menu",
                    "button_text": "Open",
                    "sections": [{
                        "title": "All",
                        "rows": [{
                            "id": "r1",
                            "title": "Row",
                            "description": "d".repeat(73)
                        }]
                    }]
                }),
            )
            .await
            .unwrap();

        assert!(!envelope.success);
        assert!(envelope.error.unwrap().contains("Row description"));
    }

    #[tokio::test]
    async fn list_api_failure_is_enveloped() {
        let api = Arc::new(MockApi::failing("recipient not on whatsapp"));
        let registry = registry_with(api);

        let envelope = registry
            .invoke(
                "send_message_with_list",
                json!({
                    "to": "+1",
                    "text": "menu",
                    "button_text": "Open",
                    "sections": [{ "rows": [{ "id": "r1", "title": "Row" }] }]
                }),
            )
            .await
            .unwrap();

        assert!(!envelope.success);
        assert!(envelope.error.unwrap().contains("recipient not on whatsapp"));
    }
}
