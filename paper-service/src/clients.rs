//! reqwest-backed implementations of the library's collaborator traits.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use paper_flow::{
    Coordinator, CoordinatorReply, CoordinatorRequest, FileReference, Result, SessionError,
    UploadOutcome, UploadTransport,
};

fn transport_error(e: reqwest::Error) -> SessionError {
    SessionError::TransportError(e.to_string())
}

/// HTTP client for the remote coordinator's converse contract.
pub struct HttpCoordinator {
    client: reqwest::Client,
    url: String,
}

impl HttpCoordinator {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("failed to build HTTP client"),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Coordinator for HttpCoordinator {
    async fn converse(&self, request: CoordinatorRequest) -> Result<CoordinatorReply> {
        debug!(url = %self.url, assets = request.assets.len(), "coordinator call");
        let reply = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?
            .error_for_status()
            .map_err(transport_error)?
            .json::<CoordinatorReply>()
            .await
            .map_err(transport_error)?;
        Ok(reply)
    }
}

/// HTTP client for the upload transport: multipart file in, asset ids out.
pub struct HttpUploadTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpUploadTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("failed to build HTTP client"),
            url: url.into(),
        }
    }
}

#[async_trait]
impl UploadTransport for HttpUploadTransport {
    async fn upload(&self, file: &FileReference) -> Result<UploadOutcome> {
        debug!(url = %self.url, file = %file.name, "upload call");
        let part = reqwest::multipart::Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        let form = reqwest::multipart::Form::new().part("file", part);

        let outcome = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?
            .error_for_status()
            .map_err(transport_error)?
            .json::<UploadOutcome>()
            .await
            .map_err(transport_error)?;
        Ok(outcome)
    }
}
