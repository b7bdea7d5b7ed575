//! Config schema: output location plus one section per delivery target.

use {
    pixelpost_telegram::TelegramDeliveryConfig,
    pixelpost_webhook::WebhookConfig,
    serde::{Deserialize, Serialize},
};

/// Filename prefix used when a run does not name one.
pub const DEFAULT_FILENAME_PREFIX: &str = "ComfyUITG";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelpostConfig {
    pub output: OutputConfig,
    /// Absent section means Telegram delivery needs everything on the
    /// command line.
    pub telegram: Option<TelegramDeliveryConfig>,
    pub webhook: Option<WebhookConfig>,
}

/// Where saved copies of delivered images go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: String,
    pub filename_prefix: String,
    /// Write the workflow prompt into saved PNGs as text chunks.
    pub embed_metadata: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "output".into(),
            filename_prefix: DEFAULT_FILENAME_PREFIX.into(),
            embed_metadata: true,
        }
    }
}
