use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Named points of the guided processing sequence shown to the user.
///
/// Declaration order is progression order: the current stage pointer only
/// moves forward through this sequence; `StageTracker::reset` is the single
/// way back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Uploading,
    Conversation,
    Analyzing,
    Complete,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Idle,
        Stage::Uploading,
        Stage::Conversation,
        Stage::Analyzing,
        Stage::Complete,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Uploading => "uploading",
            Stage::Conversation => "conversation",
            Stage::Analyzing => "analyzing",
            Stage::Complete => "complete",
        }
    }
}

/// UI marker for a stage, derived purely from tracker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageBadge {
    /// Checkmark: the pointer has passed this stage
    Done,
    /// Spinner: this is the current stage
    Active,
    /// Pending marker: not reached yet
    Pending,
}

/// Tracks the current stage and the monotonic set of completed stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTracker {
    current: Stage,
    completed: BTreeSet<Stage>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            current: Stage::Idle,
            completed: BTreeSet::new(),
        }
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    /// Move the stage pointer forward to `target`.
    ///
    /// Requests to move backward (or stay put) are ignored, which keeps the
    /// forward-only invariant without making callers track ordering. Every
    /// stage the pointer passes over is recorded as completed; the terminal
    /// stage also marks itself completed on arrival.
    pub fn advance_to(&mut self, target: Stage) {
        if target <= self.current {
            debug!(from = ?self.current, to = ?target, "ignoring non-forward stage transition");
            return;
        }
        for stage in Stage::ALL {
            if stage < target {
                self.completed.insert(stage);
            }
        }
        if target == Stage::Complete {
            self.completed.insert(Stage::Complete);
        }
        self.current = target;
    }

    /// Back to `Idle` with no completed stages. The only backward path.
    pub fn reset(&mut self) {
        self.current = Stage::Idle;
        self.completed.clear();
    }

    pub fn is_completed(&self, stage: Stage) -> bool {
        self.completed.contains(&stage)
    }

    pub fn badge(&self, stage: Stage) -> StageBadge {
        if self.completed.contains(&stage) {
            StageBadge::Done
        } else if stage == self.current {
            StageBadge::Active
        } else {
            StageBadge::Pending
        }
    }

    pub fn completed(&self) -> impl Iterator<Item = Stage> + '_ {
        self.completed.iter().copied()
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}
