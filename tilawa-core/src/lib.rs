//! # tilawa-core
//!
//! Reusable recitation tracking engine.
//!
//! ## Architecture
//!
//! ```text
//! SpeechRecognizer ──callbacks──► EventSink ──crossbeam──► dispatcher thread
//!                                                                │
//!                                                 RecitationSession::handle_event
//!                                                                │
//!                                                  Aligner::feed (normalize)
//!                                                                │
//!                                 broadcast::Sender<ProgressEvent / SessionStatusEvent>
//! ```
//!
//! Matching is exact after [`text::normalize`]; the aligner only ever moves
//! forward through the reference, skipping words the recognizer dropped.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod align;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod recognizer;
pub mod text;

// Convenience re-exports for downstream crates
pub use align::{AlignmentResult, Aligner};
pub use engine::{Followup, RecitationSession, RestartPolicy, SessionConfig, StatusMessages};
pub use error::TilawaError;
pub use ipc::events::{Progress, ProgressEvent, SessionStatus, SessionStatusEvent};
pub use recognizer::{
    event_channel, EventSink, EventStream, RecognitionErrorKind, RecognitionEvent,
    RecognitionListener, RecognizerHandle, SpeechRecognizer,
};
pub use text::{normalize, ReferenceText};
