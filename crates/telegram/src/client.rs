//! Multipart upload requests against the Bot API.

use std::time::Duration;

use {
    async_trait::async_trait,
    reqwest::{
        Client,
        multipart::{Form, Part},
    },
    secrecy::{ExposeSecret, Secret},
    serde::Serialize,
    tracing::debug,
};

use pixelpost_media::EncodedImage;

use crate::{
    api::ApiResponse,
    config::{SendAs, TelegramDeliveryConfig},
    error::{Error, Result},
};

/// Uploads encoded images to a chat.
///
/// `Err` means the request produced no readable reply (connect, TLS, timeout,
/// broken body). A reply that refuses the upload is `Ok` with `ok == false`.
#[async_trait]
pub trait MediaDelivery: Send + Sync {
    async fn send_single(&self, image: &EncodedImage, send_as: SendAs) -> Result<ApiResponse>;

    /// Callers keep groups within [`crate::MEDIA_GROUP_LIMIT`]; this is not
    /// checked here.
    async fn send_group(&self, images: &[EncodedImage], send_as: SendAs) -> Result<ApiResponse>;
}

/// Bot API client.
///
/// Every call builds its own connection pool and skips certificate
/// verification. The target is a single fixed host and local trust stores in
/// pipeline containers are frequently incomplete; this is an accepted
/// weakening of transport security for this client only.
#[derive(Clone)]
pub struct TelegramClient {
    api_url: String,
    token: Secret<String>,
    chat_id: String,
    timeout: Duration,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_url", &self.api_url)
            .field("token", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TelegramClient {
    #[must_use]
    pub fn new(config: &TelegramDeliveryConfig) -> Self {
        Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            chat_id: config.chat_id.clone(),
            timeout: config.timeout(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_url, self.token.expose_secret())
    }

    fn http_client(&self) -> Result<Client> {
        Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Transport(e.without_url()))
    }

    async fn post(&self, method: &'static str, form: Form) -> Result<ApiResponse> {
        let client = self.http_client()?;
        // Errors carry the request URL, which contains the bot token.
        let response = client
            .post(self.endpoint(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Transport(e.without_url()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.without_url()))?;

        let parsed = ApiResponse::parse(&body);
        debug!(
            method,
            chat_id = %self.chat_id,
            status = status.as_u16(),
            ok = parsed.ok,
            retry_after_secs = parsed.retry_after.map(|d| d.as_secs_f64()),
            "telegram api replied"
        );
        Ok(parsed)
    }
}

#[async_trait]
impl MediaDelivery for TelegramClient {
    async fn send_single(&self, image: &EncodedImage, send_as: SendAs) -> Result<ApiResponse> {
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .part(send_as.media_type(), file_part(image)?);
        debug!(
            chat_id = %self.chat_id,
            filename = image.filename(),
            bytes = image.payload().len(),
            method = send_as.method(),
            "telegram upload start"
        );
        self.post(send_as.method(), form).await
    }

    async fn send_group(&self, images: &[EncodedImage], send_as: SendAs) -> Result<ApiResponse> {
        let mut form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("media", media_group_descriptor(images, send_as)?);
        for image in images {
            form = form.part(image.filename().to_string(), file_part(image)?);
        }
        debug!(
            chat_id = %self.chat_id,
            count = images.len(),
            bytes = images.iter().map(|i| i.payload().len()).sum::<usize>(),
            "telegram media group upload start"
        );
        self.post("sendMediaGroup", form).await
    }
}

/// Entry of the `media` array of `sendMediaGroup`.
#[derive(Debug, Serialize)]
struct InputMediaRef {
    #[serde(rename = "type")]
    kind: &'static str,
    media: String,
}

/// JSON `media` field referencing each attachment by file name.
fn media_group_descriptor(images: &[EncodedImage], send_as: SendAs) -> Result<String> {
    let entries: Vec<InputMediaRef> = images
        .iter()
        .map(|image| InputMediaRef {
            kind: send_as.media_type(),
            media: format!("attach://{}", image.filename()),
        })
        .collect();
    serde_json::to_string(&entries).map_err(|e| Error::external("failed to encode media group", e))
}

fn file_part(image: &EncodedImage) -> Result<Part> {
    Part::bytes(image.payload().to_vec())
        .file_name(image.filename().to_string())
        .mime_str(image.mime_type())
        .map_err(|e| Error::external(format!("invalid mime type for {}", image.filename()), e))
}
