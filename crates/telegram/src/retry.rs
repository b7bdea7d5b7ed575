//! Rate-limit aware execution of a single Bot API call.

use std::future::Future;

use tracing::{info, warn};

use pixelpost_common::{FailureReason, SendOutcome};

use crate::{api::ApiResponse, error::Result};

/// Run `request` until Telegram accepts it or refuses it for good.
///
/// A refusal carrying `retry_after` suspends the caller for exactly that long
/// and then issues the same request again, with no upper bound on the number
/// of attempts. Nothing else is sent while waiting. Refusals without a hint
/// and transport errors end the loop as `Failed`.
pub async fn deliver_with_retry<F, Fut>(operation: &'static str, mut request: F) -> SendOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ApiResponse>>,
{
    let mut retries = 0usize;

    loop {
        match request().await {
            Ok(response) if response.ok => {
                if retries > 0 {
                    info!(operation, retries, "telegram request delivered after retries");
                }
                return SendOutcome::Delivered;
            },
            Ok(response) => {
                let Some(wait) = response.retry_after else {
                    warn!(
                        operation,
                        retries,
                        error_code = ?response.error_code,
                        description = ?response.description,
                        "telegram rejected request"
                    );
                    return SendOutcome::failed(FailureReason::Rejected {
                        status: response.error_code,
                        description: response.description,
                    });
                };

                retries += 1;
                warn!(
                    operation,
                    retries,
                    retry_after_secs = wait.as_secs_f64(),
                    "telegram rate limited, waiting before retry"
                );
                tokio::time::sleep(wait).await;
            },
            Err(err) => {
                warn!(operation, retries, error = %err, "telegram request failed");
                return SendOutcome::failed(FailureReason::transport(err.to_string()));
            },
        }
    }
}
