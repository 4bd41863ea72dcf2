use serde::{Deserialize, Serialize};

use paper_flow::{ConversationTurn, ResultSet, SectionKey, SessionState, Stage, StageBadge};

/// Intake submission. The binary travels base64-encoded; DOI and arXiv are
/// passed through untouched (syntax is the coordinator's concern).
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub doi: String,
    #[serde(default)]
    pub arxiv_url: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_base64: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub session_id: String,
    pub response: Option<String>,
    pub stage: Stage,
    pub results_updated: bool,
}

#[derive(Debug, Serialize)]
pub struct StageView {
    pub stage: Stage,
    pub badge: StageBadge,
}

/// Everything a client needs to render the session.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub stage: Stage,
    pub stages: Vec<StageView>,
    pub conversation: Vec<ConversationTurn>,
    pub results: ResultSet,
    pub expanded_sections: Vec<SectionKey>,
    pub in_flight: bool,
}

impl SessionView {
    pub fn from_session(session: &SessionState) -> Self {
        Self {
            session_id: session.id.clone(),
            stage: session.stages.current(),
            stages: Stage::ALL
                .iter()
                .map(|&stage| StageView {
                    stage,
                    badge: session.stages.badge(stage),
                })
                .collect(),
            conversation: session.conversation.turns().to_vec(),
            results: session.results.clone(),
            expanded_sections: session.expanded.iter().copied().collect(),
            in_flight: session.in_flight,
        }
    }
}
