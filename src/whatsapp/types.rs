//! WhatsApp Cloud API payload and response types.
//!
//! Reference: https://developers.facebook.com/docs/whatsapp/cloud-api/reference/messages

use serde::{Deserialize, Serialize};

/// A reply button on an interactive message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Button {
    /// Callback id returned when the user taps the button. Max 256 chars.
    pub id: String,
    /// Button label. Max 20 chars.
    pub title: String,
}

/// One row of an interactive selection list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionRow {
    /// Callback id returned on selection. Max 200 chars.
    pub id: String,
    /// Row label. Max 24 chars.
    pub title: String,
    /// Optional secondary text. Max 72 chars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A titled group of rows in a selection list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Section heading. Max 24 chars.
    #[serde(default)]
    pub title: String,
    pub rows: Vec<SectionRow>,
}

/// Media message kinds supported by the `/messages` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Document,
    Audio,
    Sticker,
}

impl MediaKind {
    /// Wire name of the media object, also used as the message `type`.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
            MediaKind::Audio => "audio",
            MediaKind::Sticker => "sticker",
        }
    }

    /// Captions are accepted for image, video and document messages only.
    pub fn supports_caption(self) -> bool {
        matches!(self, MediaKind::Image | MediaKind::Video | MediaKind::Document)
    }
}

/// Response of a successful message send.
///
/// ```json
/// {"messaging_product":"whatsapp",
///  "contacts":[{"input":"+123","wa_id":"123"}],
///  "messages":[{"id":"wamid.XXX"}]}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub messages: Vec<SentMessage>,
    #[serde(default)]
    pub contacts: Vec<SentContact>,
}

impl SendResponse {
    /// Id of the message that was created, if the API returned one.
    pub fn message_id(&self) -> Option<&str> {
        self.messages.first().map(|m| m.id.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentContact {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub wa_id: String,
}

/// Response of a media upload: `{"id":"<media id>"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaUploadResponse {
    pub id: String,
}

/// Response of status operations (mark-as-read, typing indicator).
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub success: bool,
}

/// Error body returned by the Graph API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct GraphErrorEnvelope {
    pub error: GraphError,
}

#[derive(Debug, Deserialize)]
pub struct GraphError {
    pub message: String,
    #[serde(default)]
    pub code: i64,
    #[serde(rename = "type", default)]
    pub error_type: String,
}
