//! Event types broadcast to the presentation layer.
//!
//! ## Channels
//!
//! | Event | Subscription |
//! |-------|--------------|
//! | `ProgressEvent` | `RecitationSession::subscribe_progress` |
//! | `SessionStatusEvent` | `RecitationSession::subscribe_status` |
//!
//! All types serialize camelCase so a web or mobile front end can mirror them.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Progress events
// ---------------------------------------------------------------------------

/// Emitted whenever the alignment cursor moves (forward, or back to the start
/// on an explicit restart).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    #[serde(flatten)]
    pub progress: Progress,
}

/// Snapshot of how much of the reference has been recited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Index of the last matched reference word; `None` before the first match.
    pub last_matched_index: Option<usize>,
    pub matched_words: usize,
    pub total_words: usize,
    /// Reference words `0..=last_matched_index`, original spelling, space-joined.
    pub recognized_prefix: String,
}

// ---------------------------------------------------------------------------
// Session status
// ---------------------------------------------------------------------------

/// Emitted when the session status or listening flag changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusEvent {
    pub status: SessionStatus,
    /// User-facing status text.
    pub message: String,
    pub is_listening: bool,
}

/// Current state of a recitation session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum SessionStatus {
    /// Nothing recited yet, not listening.
    #[default]
    Idle,
    /// Recognizer reported it is ready for speech.
    ReadyToListen,
    /// Listening requested or speech in progress.
    Listening,
    /// At least one new word matched; more remain.
    Matched,
    /// The last reference word matched. Terminal for the current pass.
    Completed,
    /// User turned listening off.
    Stopped,
    /// Recognizer or host failure, with a human-readable message.
    Error(String),
}

impl SessionStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, SessionStatus::Completed)
    }
}
