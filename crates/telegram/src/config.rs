use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Public Bot API host.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Per-request timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum attachments accepted by `sendMediaGroup`.
pub const MEDIA_GROUP_LIMIT: usize = 10;

/// How each image is uploaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendAs {
    /// Compressed by Telegram and shown inline.
    #[default]
    Photo,
    /// Delivered byte-for-byte as a file.
    Document,
}

impl SendAs {
    /// Bot API method for a single upload.
    pub fn method(self) -> &'static str {
        match self {
            Self::Photo => "sendPhoto",
            Self::Document => "sendDocument",
        }
    }

    /// Multipart field of a single upload, also the `type` of a media group
    /// entry.
    pub fn media_type(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Document => "document",
        }
    }
}

/// Whether a run sends one request per image or batches them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    #[default]
    Individual,
    Grouped,
}

/// Destination and transport settings for one delivery run.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramDeliveryConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Target chat: numeric id or `@channelusername`.
    pub chat_id: String,

    pub send_as: SendAs,

    pub grouping: Grouping,

    /// Timeout for each HTTP request, retries included individually.
    pub timeout_secs: u64,

    /// Bot API base URL; override for a self-hosted Bot API server.
    pub api_url: String,
}

impl TelegramDeliveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for TelegramDeliveryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramDeliveryConfig")
            .field("token", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .field("send_as", &self.send_as)
            .field("grouping", &self.grouping)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_url", &self.api_url)
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for TelegramDeliveryConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            chat_id: String::new(),
            send_as: SendAs::default(),
            grouping: Grouping::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_url: DEFAULT_API_URL.into(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = TelegramDeliveryConfig::default();
        assert_eq!(cfg.send_as, SendAs::Photo);
        assert_eq!(cfg.grouping, Grouping::Individual);
        assert_eq!(cfg.timeout(), Duration::from_secs(60));
        assert_eq!(cfg.api_url, "https://api.telegram.org");
    }

    #[test]
    fn deserialize_from_json() {
        let json = r#"{
            "token": "123:ABC",
            "chat_id": "-100200300",
            "send_as": "document",
            "grouping": "grouped"
        }"#;
        let cfg: TelegramDeliveryConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.token.expose_secret(), "123:ABC");
        assert_eq!(cfg.chat_id, "-100200300");
        assert_eq!(cfg.send_as, SendAs::Document);
        assert_eq!(cfg.grouping, Grouping::Grouped);
        assert_eq!(cfg.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = TelegramDeliveryConfig {
            token: Secret::new("999:super-secret".into()),
            ..Default::default()
        };
        let debug = format!("{cfg:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn send_as_maps_to_bot_api_names() {
        assert_eq!(SendAs::Photo.method(), "sendPhoto");
        assert_eq!(SendAs::Document.method(), "sendDocument");
        assert_eq!(SendAs::Photo.media_type(), "photo");
        assert_eq!(SendAs::Document.media_type(), "document");
    }
}
