use std::time::Duration;

use {
    base64::Engine,
    reqwest::Client,
    serde::Serialize,
    tracing::{debug, info, warn},
};

use {
    pixelpost_common::{FailureReason, SendOutcome},
    pixelpost_media::{EncodedImage, PixelBuffer, encode_png},
};

use crate::{
    config::WebhookConfig,
    error::{Error, Result},
};

/// JSON body of a callback.
#[derive(Debug, Serialize)]
struct CallbackPayload<'a> {
    id: &'a str,
    processed_image: String,
}

/// Posts encoded images to a callback URL, one request per image.
#[derive(Debug, Clone)]
pub struct WebhookSender {
    callback_url: String,
    id: String,
    timeout: Duration,
}

impl WebhookSender {
    #[must_use]
    pub fn new(config: &WebhookConfig) -> Self {
        Self {
            callback_url: config.callback_url.clone(),
            id: config.id.clone(),
            timeout: config.timeout(),
        }
    }

    /// Post one image. Non-2xx replies are errors.
    pub async fn post_image(&self, image: &EncodedImage) -> Result<()> {
        let payload = CallbackPayload {
            id: &self.id,
            processed_image: base64::engine::general_purpose::STANDARD.encode(image.payload()),
        };

        let client = Client::builder().timeout(self.timeout).build()?;
        let response = client
            .post(&self.callback_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(
            filename = image.filename(),
            bytes = image.payload().len(),
            status = status.as_u16(),
            "callback delivered"
        );
        Ok(())
    }

    /// Encode and post every buffer in order.
    ///
    /// A buffer that cannot be encoded aborts the run; a failed post is
    /// logged and recorded, and the next image is still sent.
    pub async fn send_images(&self, buffers: &[PixelBuffer]) -> Result<Vec<SendOutcome>> {
        info!(images = buffers.len(), id = %self.id, "callback send start");

        let mut outcomes = Vec::with_capacity(buffers.len());
        for (index, buffer) in buffers.iter().enumerate() {
            let image = encode_png(buffer, None, format!("callback_{:05}.png", index + 1))?;
            let outcome = match self.post_image(&image).await {
                Ok(()) => SendOutcome::Delivered,
                Err(err) => {
                    warn!(index, error = %err, "callback post failed, continuing");
                    SendOutcome::failed(failure_reason(err))
                },
            };
            outcomes.push(outcome);
        }

        info!(
            images = outcomes.len(),
            delivered = outcomes.iter().filter(|o| o.is_delivered()).count(),
            "callback send finished"
        );
        Ok(outcomes)
    }
}

fn failure_reason(err: Error) -> FailureReason {
    match err {
        Error::Status { status, body } => FailureReason::Rejected {
            status: Some(status),
            description: (!body.is_empty()).then_some(body),
        },
        other => FailureReason::transport(other.to_string()),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        wiremock::{
            Mock, MockServer, ResponseTemplate,
            matchers::{header, method, path},
        },
    };

    fn sender(url: String) -> WebhookSender {
        WebhookSender::new(&WebhookConfig {
            callback_url: url,
            id: "job-17".into(),
            timeout_secs: 5,
        })
    }

    fn buffers(count: usize) -> Vec<PixelBuffer> {
        (0..count)
            .map(|_| PixelBuffer::new(2, 2, 3, vec![0.5; 12]).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn posts_base64_png_with_job_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/done"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let outcomes = sender(format!("{}/done", server.uri()))
            .send_images(&buffers(2))
            .await
            .unwrap();
        assert_eq!(outcomes, vec![SendOutcome::Delivered, SendOutcome::Delivered]);

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["id"], "job-17");
        let png = base64::engine::general_purpose::STANDARD
            .decode(body["processed_image"].as_str().unwrap())
            .unwrap();
        assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
    }

    #[tokio::test]
    async fn rejected_post_is_recorded_and_run_continues() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let outcomes = sender(server.uri()).send_images(&buffers(2)).await.unwrap();
        assert_eq!(outcomes[0], SendOutcome::failed(FailureReason::Rejected {
            status: Some(500),
            description: Some("boom".into()),
        }));
        assert_eq!(outcomes[1], SendOutcome::Delivered);
    }

    #[tokio::test]
    async fn unreachable_callback_is_a_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcomes = sender(format!("http://{addr}/done"))
            .send_images(&buffers(1))
            .await
            .unwrap();
        assert!(matches!(
            &outcomes[0],
            SendOutcome::Failed { reason } if reason.is_transport()
        ));
    }

    #[tokio::test]
    async fn empty_input_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let outcomes = sender(server.uri()).send_images(&[]).await.unwrap();
        assert!(outcomes.is_empty());
    }
}
