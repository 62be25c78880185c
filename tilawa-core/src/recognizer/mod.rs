//! Speech recognizer boundary.
//!
//! The platform recognizer is external. It reaches the core through two
//! seams:
//!
//! - [`SpeechRecognizer`]: commands the session sends out (`start`/`stop`).
//! - [`RecognitionListener`]: callbacks the recognizer delivers. The only
//!   implementation, [`EventSink`], turns each callback into a
//!   [`RecognitionEvent`] on a channel so the session consumes them one at a
//!   time from a single thread.

pub mod stub;

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Everything a recognizer can report, as one tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum RecognitionEvent {
    /// Tentative hypothesis; later partials may repeat or extend it.
    PartialResult(String),
    /// Best completed hypothesis for an utterance.
    FinalResult(String),
    Error(RecognitionErrorKind),
    Lifecycle(LifecycleEvent),
}

/// Informational recognizer lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleEvent {
    ReadyForSpeech,
    BeginningOfSpeech,
    EndOfSpeech,
}

/// Recognizer failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecognitionErrorKind {
    PermissionDenied,
    /// The recognizer heard audio but produced no hypothesis.
    NoSpeechDetected,
    /// No audio input before the recognizer timed out.
    SpeechTimeout,
    Network,
    NetworkTimeout,
    Audio,
    /// Any other engine-specific code.
    Generic(i32),
}

impl RecognitionErrorKind {
    /// Map an Android `SpeechRecognizer.ERROR_*` code.
    pub fn from_platform_code(code: i32) -> Self {
        match code {
            1 => Self::NetworkTimeout,
            2 => Self::Network,
            3 => Self::Audio,
            6 => Self::SpeechTimeout,
            7 => Self::NoSpeechDetected,
            9 => Self::PermissionDenied,
            other => Self::Generic(other),
        }
    }

    /// Whether the host should silently restart the recognizer while the
    /// user still wants to listen.
    pub fn auto_retry(self) -> bool {
        matches!(self, Self::NoSpeechDetected | Self::SpeechTimeout)
    }
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// Callback entry points a recognizer adapter drives.
pub trait RecognitionListener: Send + Sync {
    fn on_partial_hypothesis(&self, text: &str);
    fn on_final_hypothesis(&self, text: &str);
    fn on_recognition_error(&self, kind: RecognitionErrorKind);
    fn on_ready_for_speech(&self);
    fn on_beginning_of_speech(&self);
    fn on_end_of_speech(&self);
}

/// Create the queue between recognizer callbacks and the session.
pub fn event_channel() -> (EventSink, EventStream) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (EventSink(tx), EventStream(rx))
}

/// Producer half: forwards listener callbacks onto the event queue.
///
/// Cheap to clone; sending never blocks.
#[derive(Debug, Clone)]
pub struct EventSink(Sender<RecognitionEvent>);

impl EventSink {
    pub fn send(&self, event: RecognitionEvent) {
        if self.0.send(event).is_err() {
            warn!("recognition event dropped: session is gone");
        }
    }
}

impl RecognitionListener for EventSink {
    fn on_partial_hypothesis(&self, text: &str) {
        self.send(RecognitionEvent::PartialResult(text.to_string()));
    }

    fn on_final_hypothesis(&self, text: &str) {
        self.send(RecognitionEvent::FinalResult(text.to_string()));
    }

    fn on_recognition_error(&self, kind: RecognitionErrorKind) {
        self.send(RecognitionEvent::Error(kind));
    }

    fn on_ready_for_speech(&self) {
        self.send(RecognitionEvent::Lifecycle(LifecycleEvent::ReadyForSpeech));
    }

    fn on_beginning_of_speech(&self) {
        self.send(RecognitionEvent::Lifecycle(LifecycleEvent::BeginningOfSpeech));
    }

    fn on_end_of_speech(&self) {
        self.send(RecognitionEvent::Lifecycle(LifecycleEvent::EndOfSpeech));
    }
}

/// Consumer half, owned by whoever serializes event handling.
#[derive(Debug)]
pub struct EventStream(Receiver<RecognitionEvent>);

impl EventStream {
    pub fn try_recv(&self) -> std::result::Result<RecognitionEvent, TryRecvError> {
        self.0.try_recv()
    }

    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<RecognitionEvent, RecvTimeoutError> {
        self.0.recv_timeout(timeout)
    }
}

// ---------------------------------------------------------------------------
// Recognizer
// ---------------------------------------------------------------------------

/// Parameters handed to the recognizer on every start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionRequest {
    /// BCP-47 language tag. Default: `"ar"`.
    pub language: String,
    pub partial_results: bool,
    pub max_results: u32,
    pub min_speech_ms: u32,
    pub complete_silence_ms: u32,
    pub possibly_complete_silence_ms: u32,
}

impl Default for RecognitionRequest {
    fn default() -> Self {
        Self {
            language: "ar".into(),
            partial_results: true,
            max_results: 1,
            min_speech_ms: 100,
            complete_silence_ms: 1_500,
            possibly_complete_silence_ms: 1_500,
        }
    }
}

/// Contract for speech recognition adapters.
///
/// Adapters report results through the [`RecognitionListener`] they were
/// built with, never by return value.
pub trait SpeechRecognizer: Send + 'static {
    /// Begin recognizing one utterance.
    ///
    /// # Errors
    /// `TilawaError::PermissionDenied` when microphone access is missing;
    /// `TilawaError::RecognizerStart` for any other start failure.
    fn start(&mut self, request: &RecognitionRequest) -> Result<()>;

    /// Stop listening. Pending results may still be delivered.
    fn stop(&mut self);
}

/// Shared handle to any [`SpeechRecognizer`].
#[derive(Clone)]
pub struct RecognizerHandle(pub Arc<Mutex<dyn SpeechRecognizer>>);

impl RecognizerHandle {
    pub fn new<R: SpeechRecognizer>(recognizer: R) -> Self {
        Self(Arc::new(Mutex::new(recognizer)))
    }
}

impl std::fmt::Debug for RecognizerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognizerHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_codes_map_to_kinds() {
        assert_eq!(
            RecognitionErrorKind::from_platform_code(7),
            RecognitionErrorKind::NoSpeechDetected
        );
        assert_eq!(
            RecognitionErrorKind::from_platform_code(2),
            RecognitionErrorKind::Network
        );
        assert_eq!(
            RecognitionErrorKind::from_platform_code(9),
            RecognitionErrorKind::PermissionDenied
        );
        assert_eq!(
            RecognitionErrorKind::from_platform_code(5),
            RecognitionErrorKind::Generic(5)
        );
    }

    #[test]
    fn only_silence_errors_auto_retry() {
        assert!(RecognitionErrorKind::NoSpeechDetected.auto_retry());
        assert!(RecognitionErrorKind::SpeechTimeout.auto_retry());
        assert!(!RecognitionErrorKind::Network.auto_retry());
        assert!(!RecognitionErrorKind::PermissionDenied.auto_retry());
        assert!(!RecognitionErrorKind::Generic(4).auto_retry());
    }

    #[test]
    fn sink_forwards_callbacks_in_order() {
        let (sink, stream) = event_channel();
        sink.on_ready_for_speech();
        sink.on_partial_hypothesis("الحمد");
        sink.on_final_hypothesis("الحمد لله");
        sink.on_recognition_error(RecognitionErrorKind::SpeechTimeout);

        assert_eq!(
            stream.try_recv().expect("ready"),
            RecognitionEvent::Lifecycle(LifecycleEvent::ReadyForSpeech)
        );
        assert_eq!(
            stream.try_recv().expect("partial"),
            RecognitionEvent::PartialResult("الحمد".into())
        );
        assert_eq!(
            stream.try_recv().expect("final"),
            RecognitionEvent::FinalResult("الحمد لله".into())
        );
        assert_eq!(
            stream.try_recv().expect("error"),
            RecognitionEvent::Error(RecognitionErrorKind::SpeechTimeout)
        );
        assert!(stream.try_recv().is_err());
    }

    #[test]
    fn events_serialize_with_type_and_data() {
        let json = serde_json::to_value(RecognitionEvent::PartialResult("رب".into()))
            .expect("serialize partial");
        assert_eq!(json["type"], "partialResult");
        assert_eq!(json["data"], "رب");

        let parsed: RecognitionEvent =
            serde_json::from_str(r#"{"type":"error","data":{"generic":4}}"#).expect("parse error");
        assert_eq!(parsed, RecognitionEvent::Error(RecognitionErrorKind::Generic(4)));

        let parsed: RecognitionEvent =
            serde_json::from_str(r#"{"type":"lifecycle","data":"endOfSpeech"}"#)
                .expect("parse lifecycle");
        assert_eq!(
            parsed,
            RecognitionEvent::Lifecycle(LifecycleEvent::EndOfSpeech)
        );
    }

    #[test]
    fn default_request_targets_arabic_with_partials() {
        let request = RecognitionRequest::default();
        assert_eq!(request.language, "ar");
        assert!(request.partial_results);
        assert_eq!(request.complete_silence_ms, 1_500);
    }
}
