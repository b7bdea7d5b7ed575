use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Where processed images are posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub callback_url: String,
    /// Echoed back in every payload so the receiver can match the job.
    pub id: String,
    pub timeout_secs: u64,
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            callback_url: String::new(),
            id: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: WebhookConfig =
            serde_json::from_str(r#"{"callback_url":"https://example.com/done"}"#).unwrap();
        assert_eq!(cfg.callback_url, "https://example.com/done");
        assert_eq!(cfg.id, "");
        assert_eq!(cfg.timeout(), Duration::from_secs(60));
    }
}
