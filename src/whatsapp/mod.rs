//! WhatsApp Business Cloud API client.
//!
//! Thin delegate layer: one HTTP call per operation, no retries, no rate
//! limiting, no caching. Payload and response shapes follow the Graph API
//! `/{phone_id}/messages` contract.

pub mod client;
pub mod types;

pub use client::{ApiError, CloudClient, WhatsAppApi};
pub use types::{
    Button, MediaKind, MediaUploadResponse, Section, SectionRow, SendResponse, StatusResponse,
};
