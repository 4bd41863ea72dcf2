pub mod conversation;
pub mod driver;
pub mod error;
pub mod export;
pub mod intake;
pub mod results;
pub mod session;
pub mod stage;
pub mod transport;

// Re-export commonly used types
pub use conversation::{ConversationLog, ConversationTurn, TurnRole};
pub use driver::{ConversationDriver, TurnOutcome, PLACEHOLDER_PROMPT, TURN_FAILURE_TEXT};
pub use error::{Result, SessionError};
pub use export::{render, ExportDocument};
pub use intake::{FileReference, IntakeReference};
pub use results::{
    AggregatedResults, DocumentInfo, KeyTakeaway, PayloadOutcome, Recommendation, ResultSet,
    UnderstandingResult,
};
pub use session::{InMemorySessionStorage, SectionKey, SessionState, SessionStorage};
pub use stage::{Stage, StageBadge, StageTracker};
pub use transport::{
    AssetId, Coordinator, CoordinatorReply, CoordinatorRequest, ReplyEnvelope, ReplyPayload,
    UploadOutcome, UploadTransport,
};
