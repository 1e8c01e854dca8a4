//! Server configuration.
//!
//! Credentials are read once at startup. A missing phone number id or access
//! token is fatal: the server refuses to start rather than serving tools that
//! can only fail.

use thiserror::Error;

/// Default Graph API version used when `WHATSAPP_API_VERSION` is not set.
pub const DEFAULT_API_VERSION: &str = "v21.0";

/// Base URL of the Meta Graph API.
pub const GRAPH_BASE_URL: &str = "https://graph.facebook.com";

/// Configuration errors. All of them prevent startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "missing required environment variable {0} \
         (set WHATSAPP_PHONE_ID and WHATSAPP_TOKEN to run the server)"
    )]
    MissingVar(&'static str),

    #[error("environment variable {0} is set but empty")]
    EmptyVar(&'static str),
}

/// Runtime configuration for the WhatsApp Cloud API client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Sender phone number id (`WHATSAPP_PHONE_ID`).
    pub phone_id: String,
    /// Cloud API access token (`WHATSAPP_TOKEN`).
    pub token: String,
    /// WhatsApp Business Account id (`WHATSAPP_BUSINESS_ACCOUNT_ID`).
    /// Only needed by the `get_templates` tool.
    pub business_account_id: Option<String>,
    /// Graph API version, e.g. `v21.0`.
    pub api_version: String,
    /// Graph API base URL. Overridable for tests.
    pub graph_base_url: String,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an injectable lookup. Tests pass a closure
    /// over a map instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let phone_id = required(&lookup, "WHATSAPP_PHONE_ID")?;
        let token = required(&lookup, "WHATSAPP_TOKEN")?;

        let business_account_id =
            lookup("WHATSAPP_BUSINESS_ACCOUNT_ID").filter(|v| !v.trim().is_empty());
        let api_version = lookup("WHATSAPP_API_VERSION")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        Ok(Self {
            phone_id,
            token,
            business_account_id,
            api_version,
            graph_base_url: GRAPH_BASE_URL.to_string(),
        })
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Err(ConfigError::MissingVar(key)),
        Some(v) if v.trim().is_empty() => Err(ConfigError::EmptyVar(key)),
        Some(v) => Ok(v),
    }
}
