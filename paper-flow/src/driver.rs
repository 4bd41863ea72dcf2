//! ConversationDriver – loads a session, performs exactly one orchestration
//! step (upload, or one conversation turn), and persists the updated session
//! back to storage. The load → step → save cycle is the unit of atomicity:
//! nothing observes a half-applied turn.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::{Result, SessionError};
use crate::intake::IntakeReference;
use crate::results::PayloadOutcome;
use crate::session::{SectionKey, SessionState, SessionStorage};
use crate::stage::Stage;
use crate::transport::{Coordinator, CoordinatorRequest, ReplyPayload, UploadTransport};

/// Identifier the coordinator uses to route requests to the paper-analysis
/// agent team.
pub const AGENT_IDENTIFIER: &str = "paper_analysis_coordinator";

/// Assistant prompt used when a successful reply carries no user message.
pub const PLACEHOLDER_PROMPT: &str = "What would you like to focus on?";

/// Assistant message for soft and hard coordinator failures. Raw transport
/// detail goes to the diagnostic log, never to the user.
pub const TURN_FAILURE_TEXT: &str =
    "Sorry, I ran into a problem processing that request. Please try again.";

/// What one driver step produced, for the caller to render.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub session_id: String,
    pub assistant_text: Option<String>,
    pub stage: Stage,
    pub results_updated: bool,
}

/// The turn-taking engine: owns the collaborator handles and the storage the
/// session state lives in.
#[derive(Clone)]
pub struct ConversationDriver {
    coordinator: Arc<dyn Coordinator>,
    uploader: Arc<dyn UploadTransport>,
    storage: Arc<dyn SessionStorage>,
}

impl ConversationDriver {
    pub fn new(
        coordinator: Arc<dyn Coordinator>,
        uploader: Arc<dyn UploadTransport>,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        Self {
            coordinator,
            uploader,
            storage,
        }
    }

    /// Start a new analysis session from the collected intake.
    ///
    /// Uploads the held binary (at most once per session) when present, then
    /// sends the synthesized opening turn. An upload failure stops before any
    /// coordinator call: the session is saved at `Idle` with an assistant
    /// turn naming the failure, and the user can retry with a fresh submit.
    pub async fn start(&self, intake: IntakeReference) -> Result<TurnOutcome> {
        if !intake.is_ready() {
            return Err(SessionError::IntakeIncomplete);
        }

        let mut session = SessionState::new(intake);
        let session_id = session.id.clone();
        info!(%session_id, "starting analysis session");

        if let Some(file) = session.intake.file.clone() {
            session.stages.advance_to(Stage::Uploading);
            let failure = match self.uploader.upload(&file).await {
                Ok(outcome) if outcome.success => {
                    info!(
                        %session_id,
                        assets = outcome.asset_ids.len(),
                        "upload succeeded"
                    );
                    session.assets = outcome.asset_ids;
                    None
                }
                Ok(outcome) => {
                    let reason = outcome.error.unwrap_or_else(|| "unknown error".to_string());
                    warn!(%session_id, %reason, "upload transport reported failure");
                    Some(reason)
                }
                Err(e) => {
                    error!(%session_id, error = %e, "upload call failed");
                    Some(e.to_string())
                }
            };

            if let Some(reason) = failure {
                let text = format!("The file upload failed ({reason}). Please try again.");
                session.conversation.push_assistant(text.clone());
                session.stages.reset();
                let stage = session.stages.current();
                self.storage.save(session).await?;
                return Ok(TurnOutcome {
                    session_id,
                    assistant_text: Some(text),
                    stage,
                    results_updated: false,
                });
            }
        }

        let opening = session.intake.opening_message();
        self.storage.save(session).await?;
        self.send(&session_id, &opening).await
    }

    /// Send one user utterance and process the coordinator's reply.
    ///
    /// Exactly one turn may be in flight per session; the `in_flight` flag is
    /// set before the call and cleared on every exit path.
    pub async fn send(&self, session_id: &str, utterance: &str) -> Result<TurnOutcome> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Err(SessionError::EmptyUtterance);
        }

        let mut session = self.load(session_id).await?;
        if session.in_flight {
            return Err(SessionError::TurnInFlight(session_id.to_string()));
        }

        // Optimistic append: the user's turn shows up before the reply does.
        session.conversation.push_user(utterance);
        session.in_flight = true;
        let epoch = session.epoch;
        let request = CoordinatorRequest {
            utterance: utterance.to_string(),
            agent_identifier: AGENT_IDENTIFIER.to_string(),
            assets: session.assets.clone(),
        };
        self.storage.save(session).await?;

        let reply = self.coordinator.converse(request).await;

        // The remote call ran without the session held; reload before touching
        // state and drop the reply if a reset raced it.
        let mut session = self.load(session_id).await?;
        if session.epoch != epoch {
            debug!(session_id, "discarding reply from a previous session epoch");
            return Ok(TurnOutcome {
                session_id: session_id.to_string(),
                assistant_text: None,
                stage: session.stages.current(),
                results_updated: false,
            });
        }
        session.in_flight = false;

        let (assistant_text, results_updated) = match reply {
            Ok(reply) if reply.is_success() => {
                Self::apply_success_reply(&mut session, reply.into_payload())
            }
            Ok(reply) => {
                warn!(
                    session_id,
                    status = reply.response.as_ref().map(|r| r.status.as_str()),
                    "coordinator returned non-success"
                );
                session.conversation.push_assistant(TURN_FAILURE_TEXT);
                (TURN_FAILURE_TEXT.to_string(), false)
            }
            Err(e) => {
                error!(session_id, error = %e, "coordinator call failed");
                session.conversation.push_assistant(TURN_FAILURE_TEXT);
                (TURN_FAILURE_TEXT.to_string(), false)
            }
        };

        let stage = session.stages.current();
        self.storage.save(session).await?;

        Ok(TurnOutcome {
            session_id: session_id.to_string(),
            assistant_text: Some(assistant_text),
            stage,
            results_updated,
        })
    }

    /// Apply a successful reply: conversational message plus, when present, a
    /// usable aggregated-results object. A malformed results object degrades
    /// the whole turn to a soft failure so a half-broken payload never lands.
    fn apply_success_reply(
        session: &mut SessionState,
        payload: Option<ReplyPayload>,
    ) -> (String, bool) {
        let Some(payload) = payload else {
            session.conversation.push_assistant(PLACEHOLDER_PROMPT);
            session.stages.advance_to(Stage::Conversation);
            return (PLACEHOLDER_PROMPT.to_string(), false);
        };

        match PayloadOutcome::classify(&payload) {
            PayloadOutcome::MessageOnly => {
                let text = payload
                    .user_message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| PLACEHOLDER_PROMPT.to_string());
                session.conversation.push_assistant(text.clone());
                session.stages.advance_to(Stage::Conversation);
                (text, false)
            }
            PayloadOutcome::Results(aggregated) => {
                let text = payload
                    .user_message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| PLACEHOLDER_PROMPT.to_string());
                session.conversation.push_assistant(text.clone());
                session.stages.advance_to(Stage::Conversation);
                session.stages.advance_to(Stage::Analyzing);
                session.results.apply(aggregated);
                session.stages.advance_to(Stage::Complete);
                info!(session_id = %session.id, "aggregated results applied");
                (text, true)
            }
            PayloadOutcome::Malformed => {
                session.conversation.push_assistant(TURN_FAILURE_TEXT);
                (TURN_FAILURE_TEXT.to_string(), false)
            }
        }
    }

    /// Full session reset, the only operation that touches every state
    /// category at once.
    pub async fn reset(&self, session_id: &str) -> Result<()> {
        let mut session = self.load(session_id).await?;
        session.reset();
        info!(session_id, epoch = session.epoch, "session reset");
        self.storage.save(session).await
    }

    pub async fn toggle_section(&self, session_id: &str, key: SectionKey) -> Result<()> {
        let mut session = self.load(session_id).await?;
        session.toggle_section(key);
        self.storage.save(session).await
    }

    pub async fn session(&self, session_id: &str) -> Result<SessionState> {
        self.load(session_id).await
    }

    async fn load(&self, session_id: &str) -> Result<SessionState> {
        self.storage
            .get(session_id)
            .await?
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))
    }
}
