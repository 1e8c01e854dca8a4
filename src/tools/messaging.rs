//! Messaging tools: text, media, location, contacts, reactions, status.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::registry::{ToolDescriptor, ToolRegistry};
use crate::whatsapp::{MediaKind, WhatsAppApi};

use super::handler;

#[derive(Deserialize)]
struct SendMessageArgs {
    to: String,
    text: String,
    #[serde(default)]
    preview_url: bool,
    #[serde(default)]
    reply_to_message_id: Option<String>,
}

#[derive(Deserialize)]
struct SendImageArgs {
    to: String,
    image: String,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    reply_to_message_id: Option<String>,
}

#[derive(Deserialize)]
struct SendVideoArgs {
    to: String,
    video: String,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    reply_to_message_id: Option<String>,
}

#[derive(Deserialize)]
struct SendDocumentArgs {
    to: String,
    document: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    reply_to_message_id: Option<String>,
}

#[derive(Deserialize)]
struct SendAudioArgs {
    to: String,
    audio: String,
    #[serde(default)]
    reply_to_message_id: Option<String>,
}

#[derive(Deserialize)]
struct SendStickerArgs {
    to: String,
    sticker: String,
    #[serde(default)]
    reply_to_message_id: Option<String>,
}

#[derive(Deserialize)]
struct SendLocationArgs {
    to: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    reply_to_message_id: Option<String>,
}

#[derive(Deserialize)]
struct RequestLocationArgs {
    to: String,
    text: String,
    #[serde(default)]
    reply_to_message_id: Option<String>,
}

#[derive(Deserialize)]
struct SendContactArgs {
    to: String,
    contact_name: String,
    contact_phone: String,
    #[serde(default)]
    reply_to_message_id: Option<String>,
}

#[derive(Deserialize)]
struct SendReactionArgs {
    to: String,
    emoji: String,
    message_id: String,
}

#[derive(Deserialize)]
struct RemoveReactionArgs {
    to: String,
    message_id: String,
}

#[derive(Deserialize)]
struct MessageIdArgs {
    message_id: String,
}

#[derive(Deserialize)]
struct UploadMediaArgs {
    media_path: String,
    #[serde(default)]
    mime_type: Option<String>,
}

fn recipient_schema(extra: serde_json::Value, required: &[&str]) -> serde_json::Value {
    let mut properties = json!({
        "to": {
            "type": "string",
            "description": "Phone number (with country code) or WhatsApp ID"
        },
        "reply_to_message_id": {
            "type": "string",
            "description": "Message ID to reply to"
        }
    });
    if let Some(map) = extra.as_object() {
        for (key, value) in map {
            properties[key] = value.clone();
        }
    }
    json!({ "type": "object", "properties": properties, "required": required })
}

/// Register the fourteen messaging tools.
pub fn register(registry: &mut ToolRegistry, api: Arc<dyn WhatsAppApi>) {
    registry.register(
        ToolDescriptor::new(
            "send_message",
            "Send a text message to a WhatsApp user.",
            recipient_schema(
                json!({
                    "text": { "type": "string", "description": "The text message content" },
                    "preview_url": {
                        "type": "boolean",
                        "default": false,
                        "description": "Whether to show URL previews"
                    }
                }),
                &["to", "text"],
            ),
        ),
        handler(api.clone(), |api, args: SendMessageArgs| async move {
            let resp = api
                .send_text(
                    &args.to,
                    &args.text,
                    args.preview_url,
                    args.reply_to_message_id.as_deref(),
                )
                .await?;
            Ok(json!({ "message_id": resp.message_id(), "to": args.to }))
        }),
    );

    registry.register(
        ToolDescriptor::new(
            "send_image",
            "Send an image message. The image is a URL or an uploaded media ID.",
            recipient_schema(
                json!({
                    "image": { "type": "string", "description": "Image URL or media ID" },
                    "caption": { "type": "string", "description": "Optional image caption" }
                }),
                &["to", "image"],
            ),
        ),
        handler(api.clone(), |api, args: SendImageArgs| async move {
            let resp = api
                .send_media(
                    &args.to,
                    MediaKind::Image,
                    &args.image,
                    args.caption.as_deref(),
                    None,
                    args.reply_to_message_id.as_deref(),
                )
                .await?;
            Ok(json!({ "message_id": resp.message_id() }))
        }),
    );

    registry.register(
        ToolDescriptor::new(
            "send_video",
            "Send a video message. The video is a URL or an uploaded media ID.",
            recipient_schema(
                json!({
                    "video": { "type": "string", "description": "Video URL or media ID" },
                    "caption": { "type": "string", "description": "Optional video caption" }
                }),
                &["to", "video"],
            ),
        ),
        handler(api.clone(), |api, args: SendVideoArgs| async move {
            let resp = api
                .send_media(
                    &args.to,
                    MediaKind::Video,
                    &args.video,
                    args.caption.as_deref(),
                    None,
                    args.reply_to_message_id.as_deref(),
                )
                .await?;
            Ok(json!({ "message_id": resp.message_id() }))
        }),
    );

    registry.register(
        ToolDescriptor::new(
            "send_document",
            "Send a document message with an optional filename and caption.",
            recipient_schema(
                json!({
                    "document": { "type": "string", "description": "Document URL or media ID" },
                    "filename": { "type": "string", "description": "Filename shown to the recipient" },
                    "caption": { "type": "string", "description": "Optional document caption" }
                }),
                &["to", "document"],
            ),
        ),
        handler(api.clone(), |api, args: SendDocumentArgs| async move {
            let resp = api
                .send_media(
                    &args.to,
                    MediaKind::Document,
                    &args.document,
                    args.caption.as_deref(),
                    args.filename.as_deref(),
                    args.reply_to_message_id.as_deref(),
                )
                .await?;
            Ok(json!({ "message_id": resp.message_id() }))
        }),
    );

    registry.register(
        ToolDescriptor::new(
            "send_audio",
            "Send an audio message.",
            recipient_schema(
                json!({
                    "audio": { "type": "string", "description": "Audio URL or media ID" }
                }),
                &["to", "audio"],
            ),
        ),
        handler(api.clone(), |api, args: SendAudioArgs| async move {
            let resp = api
                .send_media(
                    &args.to,
                    MediaKind::Audio,
                    &args.audio,
                    None,
                    None,
                    args.reply_to_message_id.as_deref(),
                )
                .await?;
            Ok(json!({ "message_id": resp.message_id() }))
        }),
    );

    registry.register(
        ToolDescriptor::new(
            "send_sticker",
            "Send a sticker message (webp format).",
            recipient_schema(
                json!({
                    "sticker": { "type": "string", "description": "Sticker URL or media ID (webp)" }
                }),
                &["to", "sticker"],
            ),
        ),
        handler(api.clone(), |api, args: SendStickerArgs| async move {
            let resp = api
                .send_media(
                    &args.to,
                    MediaKind::Sticker,
                    &args.sticker,
                    None,
                    None,
                    args.reply_to_message_id.as_deref(),
                )
                .await?;
            Ok(json!({ "message_id": resp.message_id() }))
        }),
    );

    registry.register(
        ToolDescriptor::new(
            "send_location",
            "Send a location message.",
            recipient_schema(
                json!({
                    "latitude": { "type": "number", "description": "Latitude of the location" },
                    "longitude": { "type": "number", "description": "Longitude of the location" },
                    "name": { "type": "string", "description": "Optional location name" },
                    "address": { "type": "string", "description": "Optional location address" }
                }),
                &["to", "latitude", "longitude"],
            ),
        ),
        handler(api.clone(), |api, args: SendLocationArgs| async move {
            let resp = api
                .send_location(
                    &args.to,
                    args.latitude,
                    args.longitude,
                    args.name.as_deref(),
                    args.address.as_deref(),
                    args.reply_to_message_id.as_deref(),
                )
                .await?;
            Ok(json!({ "message_id": resp.message_id() }))
        }),
    );

    registry.register(
        ToolDescriptor::new(
            "request_location",
            "Ask the user to share their location.",
            recipient_schema(
                json!({
                    "text": { "type": "string", "description": "Message text asking for the location" }
                }),
                &["to", "text"],
            ),
        ),
        handler(api.clone(), |api, args: RequestLocationArgs| async move {
            let resp = api
                .request_location(&args.to, &args.text, args.reply_to_message_id.as_deref())
                .await?;
            Ok(json!({ "message_id": resp.message_id() }))
        }),
    );

    registry.register(
        ToolDescriptor::new(
            "send_contact",
            "Send a contact card.",
            recipient_schema(
                json!({
                    "contact_name": { "type": "string", "description": "Name of the contact" },
                    "contact_phone": { "type": "string", "description": "Phone number of the contact" }
                }),
                &["to", "contact_name", "contact_phone"],
            ),
        ),
        handler(api.clone(), |api, args: SendContactArgs| async move {
            let resp = api
                .send_contact(
                    &args.to,
                    &args.contact_name,
                    &args.contact_phone,
                    args.reply_to_message_id.as_deref(),
                )
                .await?;
            Ok(json!({ "message_id": resp.message_id() }))
        }),
    );

    registry.register(
        ToolDescriptor::new(
            "send_reaction",
            "React to a message with an emoji.",
            json!({
                "type": "object",
                "properties": {
                    "to": { "type": "string", "description": "Phone number or WhatsApp ID" },
                    "emoji": { "type": "string", "description": "Reaction emoji" },
                    "message_id": { "type": "string", "description": "ID of the message to react to" }
                },
                "required": ["to", "emoji", "message_id"]
            }),
        ),
        handler(api.clone(), |api, args: SendReactionArgs| async move {
            let resp = api
                .send_reaction(&args.to, &args.message_id, &args.emoji)
                .await?;
            Ok(json!({ "message_id": resp.message_id() }))
        }),
    );

    registry.register(
        ToolDescriptor::new(
            "remove_reaction",
            "Remove a previously sent reaction from a message.",
            json!({
                "type": "object",
                "properties": {
                    "to": { "type": "string", "description": "Phone number or WhatsApp ID" },
                    "message_id": { "type": "string", "description": "ID of the reacted message" }
                },
                "required": ["to", "message_id"]
            }),
        ),
        handler(api.clone(), |api, args: RemoveReactionArgs| async move {
            // The Cloud API removes a reaction by sending an empty emoji.
            let resp = api.send_reaction(&args.to, &args.message_id, "").await?;
            Ok(json!({ "message_id": resp.message_id() }))
        }),
    );

    registry.register(
        ToolDescriptor::new(
            "mark_message_as_read",
            "Mark a received message as read.",
            json!({
                "type": "object",
                "properties": {
                    "message_id": {
                        "type": "string",
                        "description": "The WhatsApp message ID to mark as read"
                    }
                },
                "required": ["message_id"]
            }),
        ),
        handler(api.clone(), |api, args: MessageIdArgs| async move {
            let resp = api.mark_as_read(&args.message_id).await?;
            Ok(json!({ "acknowledged": resp.success }))
        }),
    );

    registry.register(
        ToolDescriptor::new(
            "indicate_typing",
            "Mark a received message as read and show a typing indicator. \
             The indicator lasts up to 25 seconds or until the next message is sent. \
             The message_id must come from a message actually received inbound; \
             synthetic IDs are rejected by the API.",
            json!({
                "type": "object",
                "properties": {
                    "message_id": {
                        "type": "string",
                        "description": "The WhatsApp message ID to respond to (from an incoming message)"
                    }
                },
                "required": ["message_id"]
            }),
        ),
        handler(api.clone(), |api, args: MessageIdArgs| async move {
            let resp = api.indicate_typing(&args.message_id).await?;
            Ok(json!({
                "typing_indicated": resp.success,
                "message_id": args.message_id,
            }))
        }),
    );

    registry.register(
        ToolDescriptor::new(
            "upload_media",
            "Upload a local media file to WhatsApp servers, returning a media ID.",
            json!({
                "type": "object",
                "properties": {
                    "media_path": { "type": "string", "description": "Path to the media file" },
                    "mime_type": { "type": "string", "description": "Optional MIME type override" }
                },
                "required": ["media_path"]
            }),
        ),
        handler(api, |api, args: UploadMediaArgs| async move {
            let resp = api
                .upload_media(&args.media_path, args.mime_type.as_deref())
                .await?;
            Ok(json!({ "media_id": resp.id }))
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::super::testing::{MockApi, MOCK_MEDIA_ID, MOCK_MESSAGE_ID};
    use super::*;
    use crate::registry::ToolRegistry;
    use serde_json::json;

    fn registry_with(api: Arc<MockApi>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        register(&mut registry, api);
        registry
    }

    #[tokio::test]
    async fn send_message_success_returns_message_id() {
        let api = Arc::new(MockApi::ok());
        let registry = registry_with(api.clone());

        let envelope = registry
            .invoke("send_message", json!({ "to": "+1234567890", "text": "hi" }))
            .await
            .unwrap();

        assert!(envelope.success);
        let data = envelope.data.unwrap();
        assert_eq!(data["message_id"], MOCK_MESSAGE_ID);
        assert_eq!(data["to"], "+1234567890");

        let calls = api.recorded();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["op"], "send_text");
        assert_eq!(calls[0]["preview_url"], false);
    }

    #[tokio::test]
    async fn send_message_failure_is_enveloped() {
        let api = Arc::new(MockApi::failing("Invalid recipient"));
        let registry = registry_with(api);

        let envelope = registry
            .invoke("send_message", json!({ "to": "+invalid", "text": "hi" }))
            .await
            .unwrap();

        assert!(!envelope.success);
        let error = envelope.error.unwrap();
        assert!(error.contains("Invalid recipient"));
        assert!(envelope.data.is_none());
    }

    #[tokio::test]
    async fn missing_required_argument_is_enveloped() {
        let api = Arc::new(MockApi::ok());
        let registry = registry_with(api.clone());

        let envelope = registry
            .invoke("send_message", json!({ "to": "+1234567890" }))
            .await
            .unwrap();

        assert!(!envelope.success);
        assert!(envelope.error.unwrap().contains("invalid arguments"));
        // Nothing was delegated.
        assert!(api.recorded().is_empty());
    }

    #[tokio::test]
    async fn document_forwards_filename_and_caption() {
        let api = Arc::new(MockApi::ok());
        let registry = registry_with(api.clone());

        let envelope = registry
            .invoke(
                "send_document",
                json!({
                    "to": "+1",
                    "document": "https://example.com/invoice.pdf",
                    "filename": "invoice.pdf",
                    "caption": "March invoice"
                }),
            )
            .await
            .unwrap();

        assert!(envelope.success);
        let calls = api.recorded();
        assert_eq!(calls[0]["kind"], "document");
        assert_eq!(calls[0]["filename"], "invoice.pdf");
        assert_eq!(calls[0]["caption"], "March invoice");
    }

    #[tokio::test]
    async fn remove_reaction_sends_empty_emoji() {
        let api = Arc::new(MockApi::ok());
        let registry = registry_with(api.clone());

        let envelope = registry
            .invoke(
                "remove_reaction",
                json!({ "to": "+1", "message_id": "wamid.X" }),
            )
            .await
            .unwrap();

        assert!(envelope.success);
        let calls = api.recorded();
        assert_eq!(calls[0]["op"], "send_reaction");
        assert_eq!(calls[0]["emoji"], "");
    }

    #[tokio::test]
    async fn indicate_typing_failure_is_normalized() {
        // A synthetic wamid is rejected by the real API; the handler must
        // hand back an envelope, not propagate the failure.
        let api = Arc::new(MockApi::failing("message not found"));
        let registry = registry_with(api);

        let envelope = registry
            .invoke("indicate_typing", json!({ "message_id": "wamid.notreal" }))
            .await
            .unwrap();

        assert!(!envelope.success);
        assert!(envelope.error.unwrap().contains("message not found"));
    }

    #[tokio::test]
    async fn indicate_typing_success_echoes_message_id() {
        let api = Arc::new(MockApi::ok());
        let registry = registry_with(api);

        let envelope = registry
            .invoke("indicate_typing", json!({ "message_id": "wamid.IN" }))
            .await
            .unwrap();

        assert!(envelope.success);
        let data = envelope.data.unwrap();
        assert_eq!(data["typing_indicated"], true);
        assert_eq!(data["message_id"], "wamid.IN");
    }

    #[tokio::test]
    async fn upload_media_returns_media_id() {
        let api = Arc::new(MockApi::ok());
        let registry = registry_with(api);

        let envelope = registry
            .invoke("upload_media", json!({ "media_path": "/tmp/cat.jpg" }))
            .await
            .unwrap();

        assert!(envelope.success);
        assert_eq!(envelope.data.unwrap()["media_id"], MOCK_MEDIA_ID);
    }

    #[tokio::test]
    async fn every_messaging_tool_normalizes_failures() {
        let api = Arc::new(MockApi::failing("upstream down"));
        let registry = registry_with(api);

        let calls: Vec<(&str, serde_json::Value)> = vec![
            ("send_message", json!({ "to": "+1", "text": "x" })),
            ("send_image", json!({ "to": "+1", "image": "id" })),
            ("send_video", json!({ "to": "+1", "video": "id" })),
            ("send_document", json!({ "to": "+1", "document": "id" })),
            ("send_audio", json!({ "to": "+1", "audio": "id" })),
            ("send_sticker", json!({ "to": "+1", "sticker": "id" })),
            (
                "send_location",
                json!({ "to": "+1", "latitude": 1.0, "longitude": 2.0 }),
            ),
            ("request_location", json!({ "to": "+1", "text": "where?" })),
            (
                "send_contact",
                json!({ "to": "+1", "contact_name": "A", "contact_phone": "+2" }),
            ),
            (
                "send_reaction",
                json!({ "to": "+1", "emoji": "👍", "message_id": "wamid.X" }),
            ),
            ("remove_reaction", json!({ "to": "+1", "message_id": "wamid.X" })),
            ("mark_message_as_read", json!({ "message_id": "wamid.X" })),
            ("indicate_typing", json!({ "message_id": "wamid.X" })),
            ("upload_media", json!({ "media_path": "/tmp/f.png" })),
        ];

        for (name, args) in calls {
            let envelope = registry.invoke(name, args).await.unwrap();
            assert!(!envelope.success, "{name} should fail");
            let error = envelope.error.expect(name);
            assert!(!error.is_empty(), "{name} error should be non-empty");
        }
    }
}
