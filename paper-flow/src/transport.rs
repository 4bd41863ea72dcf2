use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::intake::FileReference;

/// Opaque identifier for an uploaded binary, used in place of re-sending the
/// file on every coordinator call.
pub type AssetId = String;

/// Outcome of handing a binary to the external upload transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub success: bool,
    #[serde(default)]
    pub asset_ids: Vec<AssetId>,
    #[serde(default)]
    pub error: Option<String>,
}

/// External transport that converts a binary into asset references.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// An `Err` is a hard transport failure; `UploadOutcome.success == false`
    /// is the transport reporting its own failure.
    async fn upload(&self, file: &FileReference) -> Result<UploadOutcome>;
}

/// One turn's request to the remote coordinator. `assets` always carries the
/// full accumulated set for the session, not just newly acquired ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorRequest {
    pub utterance: String,
    pub agent_identifier: String,
    pub assets: Vec<AssetId>,
}

/// The structured payload inside a coordinator reply. Every field is
/// optional and untrusted; `aggregated_results` stays raw JSON until the
/// boundary classification in `results`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplyPayload {
    #[serde(default)]
    pub user_message: Option<String>,
    #[serde(default)]
    pub next_action: Option<String>,
    #[serde(default)]
    pub aggregated_results: Option<serde_json::Value>,
}

pub const STATUS_SUCCESS: &str = "success";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub result: Option<ReplyPayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorReply {
    pub success: bool,
    #[serde(default)]
    pub response: Option<ReplyEnvelope>,
}

impl CoordinatorReply {
    /// A reply counts as successful only when the transport-level flag is set
    /// and the envelope reports success status. A missing envelope is a soft
    /// failure.
    pub fn is_success(&self) -> bool {
        self.success
            && self
                .response
                .as_ref()
                .is_some_and(|envelope| envelope.status == STATUS_SUCCESS)
    }

    pub fn into_payload(self) -> Option<ReplyPayload> {
        self.response.and_then(|envelope| envelope.result)
    }
}

/// The remote service conducting the multi-turn conversation and delivering
/// aggregated analysis results.
#[async_trait]
pub trait Coordinator: Send + Sync {
    async fn converse(&self, request: CoordinatorRequest) -> Result<CoordinatorReply>;
}
