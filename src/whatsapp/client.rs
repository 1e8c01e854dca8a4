//! HTTP client for the WhatsApp Cloud API.
//!
//! Each operation is a single request against the Graph API. Failures come
//! back as [`ApiError`]; callers decide what to do with them (the tool layer
//! normalizes them into result envelopes).

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::Config;

use super::types::*;

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Errors surfaced by Cloud API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("whatsapp api error (status {status}): {message}")]
    Graph { status: u16, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Unsupported(String),
}

/// The WhatsApp operations the tool layer delegates to.
///
/// One method per external operation. Implemented by [`CloudClient`] for the
/// real Graph API and by mocks in tests.
#[async_trait]
pub trait WhatsAppApi: Send + Sync {
    async fn send_text(
        &self,
        to: &str,
        text: &str,
        preview_url: bool,
        reply_to: Option<&str>,
    ) -> Result<SendResponse, ApiError>;

    async fn send_media(
        &self,
        to: &str,
        kind: MediaKind,
        media: &str,
        caption: Option<&str>,
        filename: Option<&str>,
        reply_to: Option<&str>,
    ) -> Result<SendResponse, ApiError>;

    async fn send_location(
        &self,
        to: &str,
        latitude: f64,
        longitude: f64,
        name: Option<&str>,
        address: Option<&str>,
        reply_to: Option<&str>,
    ) -> Result<SendResponse, ApiError>;

    async fn request_location(
        &self,
        to: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<SendResponse, ApiError>;

    async fn send_contact(
        &self,
        to: &str,
        formatted_name: &str,
        phone: &str,
        reply_to: Option<&str>,
    ) -> Result<SendResponse, ApiError>;

    /// An empty `emoji` removes a previously sent reaction.
    async fn send_reaction(
        &self,
        to: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<SendResponse, ApiError>;

    async fn mark_as_read(&self, message_id: &str) -> Result<StatusResponse, ApiError>;

    /// Marks the message as read and shows a typing indicator. The id must
    /// belong to a message actually received inbound; the Graph API rejects
    /// synthetic ids.
    async fn indicate_typing(&self, message_id: &str) -> Result<StatusResponse, ApiError>;

    async fn upload_media(
        &self,
        path: &str,
        mime_type: Option<&str>,
    ) -> Result<MediaUploadResponse, ApiError>;

    async fn send_buttons(
        &self,
        to: &str,
        text: &str,
        buttons: &[Button],
        header: Option<&str>,
        footer: Option<&str>,
        reply_to: Option<&str>,
    ) -> Result<SendResponse, ApiError>;

    async fn send_list(
        &self,
        to: &str,
        text: &str,
        button_text: &str,
        sections: &[Section],
        header: Option<&str>,
        footer: Option<&str>,
        reply_to: Option<&str>,
    ) -> Result<SendResponse, ApiError>;

    async fn send_template(
        &self,
        to: &str,
        name: &str,
        language: &str,
        components: Option<&Value>,
        reply_to: Option<&str>,
    ) -> Result<SendResponse, ApiError>;

    async fn list_templates(
        &self,
        limit: u32,
        name: Option<&str>,
    ) -> Result<Value, ApiError>;
}

/// Graph API client holding the shared HTTP connection pool and credentials.
pub struct CloudClient {
    http: reqwest::Client,
    config: Config,
}

impl CloudClient {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.config.graph_base_url, self.config.api_version, self.config.phone_id
        )
    }

    fn media_url(&self) -> String {
        format!(
            "{}/{}/{}/media",
            self.config.graph_base_url, self.config.api_version, self.config.phone_id
        )
    }

    async fn post_message<T: DeserializeOwned>(&self, payload: Value) -> Result<T, ApiError> {
        let response = self
            .http
            .post(self.messages_url())
            .bearer_auth(&self.config.token)
            .json(&payload)
            .send()
            .await?;
        decode(response).await
    }
}

/// Decode a Graph API response, turning non-2xx statuses into [`ApiError::Graph`]
/// with the error message from the body when one is present.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let status = status.as_u16();
    let message = match response.json::<GraphErrorEnvelope>().await {
        Ok(body) => body.error.message,
        Err(_) => format!("request failed with status {status}"),
    };
    Err(ApiError::Graph { status, message })
}

/// Attach a `context.message_id` to a message payload when replying.
fn with_context(mut payload: Value, reply_to: Option<&str>) -> Value {
    if let Some(id) = reply_to {
        payload["context"] = json!({ "message_id": id });
    }
    payload
}

fn base_payload(to: &str, message_type: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": message_type,
    })
}

pub(crate) fn text_payload(to: &str, text: &str, preview_url: bool, reply_to: Option<&str>) -> Value {
    let mut payload = base_payload(to, "text");
    payload["text"] = json!({ "body": text, "preview_url": preview_url });
    with_context(payload, reply_to)
}

pub(crate) fn media_payload(
    to: &str,
    kind: MediaKind,
    media: &str,
    caption: Option<&str>,
    filename: Option<&str>,
    reply_to: Option<&str>,
) -> Value {
    let mut object = if media.starts_with("http://") || media.starts_with("https://") {
        json!({ "link": media })
    } else {
        json!({ "id": media })
    };
    if let Some(caption) = caption.filter(|_| kind.supports_caption()) {
        object["caption"] = json!(caption);
    }
    if let Some(filename) = filename.filter(|_| kind == MediaKind::Document) {
        object["filename"] = json!(filename);
    }
    let mut payload = base_payload(to, kind.as_str());
    payload[kind.as_str()] = object;
    with_context(payload, reply_to)
}

pub(crate) fn buttons_payload(
    to: &str,
    text: &str,
    buttons: &[Button],
    header: Option<&str>,
    footer: Option<&str>,
    reply_to: Option<&str>,
) -> Value {
    let wire_buttons: Vec<Value> = buttons
        .iter()
        .map(|b| json!({ "type": "reply", "reply": { "id": b.id, "title": b.title } }))
        .collect();
    let mut interactive = json!({
        "type": "button",
        "body": { "text": text },
        "action": { "buttons": wire_buttons },
    });
    if let Some(header) = header {
        interactive["header"] = json!({ "type": "text", "text": header });
    }
    if let Some(footer) = footer {
        interactive["footer"] = json!({ "text": footer });
    }
    let mut payload = base_payload(to, "interactive");
    payload["interactive"] = interactive;
    with_context(payload, reply_to)
}

pub(crate) fn list_payload(
    to: &str,
    text: &str,
    button_text: &str,
    sections: &[Section],
    header: Option<&str>,
    footer: Option<&str>,
    reply_to: Option<&str>,
) -> Value {
    let mut interactive = json!({
        "type": "list",
        "body": { "text": text },
        "action": { "button": button_text, "sections": sections },
    });
    if let Some(header) = header {
        interactive["header"] = json!({ "type": "text", "text": header });
    }
    if let Some(footer) = footer {
        interactive["footer"] = json!({ "text": footer });
    }
    let mut payload = base_payload(to, "interactive");
    payload["interactive"] = interactive;
    with_context(payload, reply_to)
}

pub(crate) fn template_payload(
    to: &str,
    name: &str,
    language: &str,
    components: Option<&Value>,
    reply_to: Option<&str>,
) -> Value {
    let mut template = json!({ "name": name, "language": { "code": language } });
    if let Some(components) = components {
        template["components"] = components.clone();
    }
    let mut payload = base_payload(to, "template");
    payload["template"] = template;
    with_context(payload, reply_to)
}

/// Best-effort MIME type from a file extension when the caller gives none.
fn guess_mime(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "3gp" => "video/3gpp",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "aac" => "audio/aac",
        "amr" => "audio/amr",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl WhatsAppApi for CloudClient {
    async fn send_text(
        &self,
        to: &str,
        text: &str,
        preview_url: bool,
        reply_to: Option<&str>,
    ) -> Result<SendResponse, ApiError> {
        self.post_message(text_payload(to, text, preview_url, reply_to))
            .await
    }

    async fn send_media(
        &self,
        to: &str,
        kind: MediaKind,
        media: &str,
        caption: Option<&str>,
        filename: Option<&str>,
        reply_to: Option<&str>,
    ) -> Result<SendResponse, ApiError> {
        self.post_message(media_payload(to, kind, media, caption, filename, reply_to))
            .await
    }

    async fn send_location(
        &self,
        to: &str,
        latitude: f64,
        longitude: f64,
        name: Option<&str>,
        address: Option<&str>,
        reply_to: Option<&str>,
    ) -> Result<SendResponse, ApiError> {
        let mut location = json!({ "latitude": latitude, "longitude": longitude });
        if let Some(name) = name {
            location["name"] = json!(name);
        }
        if let Some(address) = address {
            location["address"] = json!(address);
        }
        let mut payload = base_payload(to, "location");
        payload["location"] = location;
        self.post_message(with_context(payload, reply_to)).await
    }

    async fn request_location(
        &self,
        to: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<SendResponse, ApiError> {
        let mut payload = base_payload(to, "interactive");
        payload["interactive"] = json!({
            "type": "location_request_message",
            "body": { "text": text },
            "action": { "name": "send_location" },
        });
        self.post_message(with_context(payload, reply_to)).await
    }

    async fn send_contact(
        &self,
        to: &str,
        formatted_name: &str,
        phone: &str,
        reply_to: Option<&str>,
    ) -> Result<SendResponse, ApiError> {
        let mut payload = base_payload(to, "contacts");
        payload["contacts"] = json!([{
            "name": { "formatted_name": formatted_name },
            "phones": [{ "phone": phone }],
        }]);
        self.post_message(with_context(payload, reply_to)).await
    }

    async fn send_reaction(
        &self,
        to: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<SendResponse, ApiError> {
        let mut payload = base_payload(to, "reaction");
        payload["reaction"] = json!({ "message_id": message_id, "emoji": emoji });
        self.post_message(payload).await
    }

    async fn mark_as_read(&self, message_id: &str) -> Result<StatusResponse, ApiError> {
        self.post_message(json!({
            "messaging_product": "whatsapp",
            "status": "read",
            "message_id": message_id,
        }))
        .await
    }

    async fn indicate_typing(&self, message_id: &str) -> Result<StatusResponse, ApiError> {
        self.post_message(json!({
            "messaging_product": "whatsapp",
            "status": "read",
            "message_id": message_id,
            "typing_indicator": { "type": "text" },
        }))
        .await
    }

    async fn upload_media(
        &self,
        path: &str,
        mime_type: Option<&str>,
    ) -> Result<MediaUploadResponse, ApiError> {
        let bytes = tokio::fs::read(path).await?;
        let mime = mime_type.unwrap_or_else(|| guess_mime(path)).to_string();
        let filename = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let part = multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str(&mime)?;
        let form = multipart::Form::new()
            .text("messaging_product", "whatsapp")
            .text("type", mime)
            .part("file", part);

        let response = self
            .http
            .post(self.media_url())
            .bearer_auth(&self.config.token)
            .multipart(form)
            .send()
            .await?;
        decode(response).await
    }

    async fn send_buttons(
        &self,
        to: &str,
        text: &str,
        buttons: &[Button],
        header: Option<&str>,
        footer: Option<&str>,
        reply_to: Option<&str>,
    ) -> Result<SendResponse, ApiError> {
        self.post_message(buttons_payload(to, text, buttons, header, footer, reply_to))
            .await
    }

    async fn send_list(
        &self,
        to: &str,
        text: &str,
        button_text: &str,
        sections: &[Section],
        header: Option<&str>,
        footer: Option<&str>,
        reply_to: Option<&str>,
    ) -> Result<SendResponse, ApiError> {
        self.post_message(list_payload(
            to,
            text,
            button_text,
            sections,
            header,
            footer,
            reply_to,
        ))
        .await
    }

    async fn send_template(
        &self,
        to: &str,
        name: &str,
        language: &str,
        components: Option<&Value>,
        reply_to: Option<&str>,
    ) -> Result<SendResponse, ApiError> {
        self.post_message(template_payload(to, name, language, components, reply_to))
            .await
    }

    async fn list_templates(
        &self,
        limit: u32,
        name: Option<&str>,
    ) -> Result<Value, ApiError> {
        let waba_id = self.config.business_account_id.as_deref().ok_or_else(|| {
            ApiError::Unsupported(
                "template listing requires WHATSAPP_BUSINESS_ACCOUNT_ID to be configured"
                    .to_string(),
            )
        })?;

        let url = format!(
            "{}/{}/{}/message_templates",
            self.config.graph_base_url, self.config.api_version, waba_id
        );
        let mut request = self
            .http
            .get(url)
            .bearer_auth(&self.config.token)
            .query(&[("limit", limit.to_string())]);
        if let Some(name) = name {
            request = request.query(&[("name", name)]);
        }
        decode(request.send().await?).await
    }
}
