use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::ConversationLog;
use crate::error::Result;
use crate::intake::IntakeReference;
use crate::results::ResultSet;
use crate::stage::StageTracker;
use crate::transport::AssetId;

/// Disclosure sections of the result view. Expanded state is independent of
/// pipeline progress and survives everything except a full reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    Document,
    Understanding,
    Takeaways,
    Recommendations,
    Quality,
}

/// The single explicit session-state value owned by the orchestration core.
///
/// Every piece of held state lives here rather than in scattered cells, so
/// reset is one operation and the invariants are checkable in one place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub id: String,
    pub intake: IntakeReference,
    /// Empty until the upload broker succeeds, immutable afterwards
    pub assets: Vec<AssetId>,
    pub conversation: ConversationLog,
    pub stages: StageTracker,
    pub results: ResultSet,
    pub expanded: BTreeSet<SectionKey>,
    /// True while the single outstanding remote call is running; the UI's
    /// source of truth for disabling the send control
    pub in_flight: bool,
    /// Bumped on every reset; a reply captured under an older epoch is stale
    /// and must be discarded
    pub epoch: u64,
}

impl SessionState {
    pub fn new(intake: IntakeReference) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            intake,
            assets: Vec::new(),
            conversation: ConversationLog::new(),
            stages: StageTracker::new(),
            results: ResultSet::default(),
            expanded: BTreeSet::new(),
            in_flight: false,
            epoch: 0,
        }
    }

    /// Full session reset: every state category at once, atomically from the
    /// caller's perspective. The epoch bump invalidates any reply still in
    /// flight from before the reset.
    pub fn reset(&mut self) {
        self.intake.clear();
        self.assets.clear();
        self.conversation = ConversationLog::new();
        self.stages.reset();
        self.results = ResultSet::default();
        self.expanded.clear();
        self.in_flight = false;
        self.epoch += 1;
    }

    pub fn toggle_section(&mut self, key: SectionKey) {
        if !self.expanded.remove(&key) {
            self.expanded.insert(key);
        }
    }
}

/// Trait for storing and retrieving sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: SessionState) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<SessionState>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory implementation of SessionStorage
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, SessionState>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemorySessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: SessionState) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<SessionState>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;

    #[test]
    fn reset_clears_every_state_category_and_bumps_epoch() {
        let mut session = SessionState::new(IntakeReference {
            file: None,
            doi: "10.1/abc".to_string(),
            arxiv_url: String::new(),
        });
        session.assets.push("a1".to_string());
        session.conversation.push_user("hello");
        session.stages.advance_to(Stage::Complete);
        session.toggle_section(SectionKey::Recommendations);
        session.in_flight = true;

        session.reset();

        assert!(!session.intake.is_ready());
        assert!(session.assets.is_empty());
        assert!(session.conversation.is_empty());
        assert_eq!(session.stages.current(), Stage::Idle);
        assert!(session.expanded.is_empty());
        assert!(!session.in_flight);
        assert_eq!(session.epoch, 1);
    }

    #[test]
    fn section_toggle_is_independent_of_stage() {
        let mut session = SessionState::new(IntakeReference::default());
        session.toggle_section(SectionKey::Document);
        assert!(session.expanded.contains(&SectionKey::Document));
        session.toggle_section(SectionKey::Document);
        assert!(!session.expanded.contains(&SectionKey::Document));
    }

    #[tokio::test]
    async fn storage_round_trip() {
        let storage = InMemorySessionStorage::new();
        let session = SessionState::new(IntakeReference::default());
        let id = session.id.clone();

        storage.save(session).await.unwrap();
        assert!(storage.get(&id).await.unwrap().is_some());

        storage.delete(&id).await.unwrap();
        assert!(storage.get(&id).await.unwrap().is_none());
    }
}
