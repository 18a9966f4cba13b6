use std::time::Duration;

use cas_types::ObjectMetadata;
use reqwest::StatusCode;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ServerError, ServerResult};

/// Errors from delivering a callback. Never surfaced to the uploader.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("callback request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("callback status: {0}")]
    Status(StatusCode),
}

/// Posts upload metadata to client-supplied callback URLs.
///
/// Delivery is best-effort: one attempt, no retries. Failures are only logged.
#[derive(Clone, Debug)]
pub struct CallbackNotifier {
    client: reqwest::Client,
}

impl CallbackNotifier {
    pub fn new(timeout: Duration) -> ServerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServerError::Internal(format!("failed to build callback client: {e}")))?;
        Ok(Self { client })
    }

    /// POST `metadata` as JSON to `url`. Anything but `200 OK` is an error.
    pub async fn notify(&self, url: &Url, metadata: &ObjectMetadata) -> Result<(), NotifyError> {
        let response = self.client.post(url.clone()).json(metadata).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(NotifyError::Status(status));
        }
        Ok(())
    }

    /// Deliver in the background, detached from the request that triggered it.
    pub fn spawn(&self, url: Url, metadata: ObjectMetadata) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            match notifier.notify(&url, &metadata).await {
                Ok(()) => debug!(url = %url, address = %metadata.address, "callback delivered"),
                Err(e) => warn!(
                    url = %url,
                    address = %metadata.address,
                    error = %e,
                    "failed to post callback"
                ),
            }
        })
    }
}
