//! Console recognizer adapter.
//!
//! Stands in for a platform speech engine: recognizer lines typed on stdin
//! (`partial …`, `final …`, `error …`, `ready`, `begin`, `end`) are delivered
//! through the session's listener, but only while the session has the
//! recognizer started, like a real engine that emits nothing once stopped.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tilawa_core::{
    error::Result,
    recognizer::{LifecycleEvent, RecognitionRequest},
    EventSink, RecognitionErrorKind, RecognitionEvent, RecognitionListener, SpeechRecognizer,
};
use tracing::{debug, info};

/// The `SpeechRecognizer` half, owned by the session.
pub struct ConsoleRecognizer {
    active: Arc<AtomicBool>,
    sink: EventSink,
}

/// The input half, owned by the stdin loop.
#[derive(Clone)]
pub struct ConsoleFeed {
    active: Arc<AtomicBool>,
    sink: EventSink,
}

pub fn console_recognizer(sink: EventSink) -> (ConsoleRecognizer, ConsoleFeed) {
    let active = Arc::new(AtomicBool::new(false));
    (
        ConsoleRecognizer {
            active: Arc::clone(&active),
            sink: sink.clone(),
        },
        ConsoleFeed { active, sink },
    )
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn start(&mut self, request: &RecognitionRequest) -> Result<()> {
        info!(language = %request.language, "console recognizer started");
        self.active.store(true, Ordering::SeqCst);
        self.sink.on_ready_for_speech();
        Ok(())
    }

    fn stop(&mut self) {
        debug!("console recognizer stopped");
        self.active.store(false, Ordering::SeqCst);
    }
}

impl ConsoleFeed {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Deliver `event` if the recognizer is started. Returns whether it was
    /// delivered.
    pub fn deliver(&self, event: RecognitionEvent) -> bool {
        if !self.is_active() {
            return false;
        }
        let is_final_or_error = matches!(
            event,
            RecognitionEvent::FinalResult(_) | RecognitionEvent::Error(_)
        );
        self.sink.send(event);
        if is_final_or_error {
            // One utterance per start: the session restarts us when it wants more.
            self.active.store(false, Ordering::SeqCst);
        }
        true
    }
}

/// Parse a recognizer line. `None` if the line is not recognizer input.
pub fn parse_recognizer_line(line: &str) -> Option<std::result::Result<RecognitionEvent, String>> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    let event = match head {
        "partial" | "p" => Ok(RecognitionEvent::PartialResult(rest.to_string())),
        "final" | "f" => Ok(RecognitionEvent::FinalResult(rest.to_string())),
        "error" => parse_error_kind(rest).map(RecognitionEvent::Error),
        "ready" => Ok(RecognitionEvent::Lifecycle(LifecycleEvent::ReadyForSpeech)),
        "begin" => Ok(RecognitionEvent::Lifecycle(LifecycleEvent::BeginningOfSpeech)),
        "end" => Ok(RecognitionEvent::Lifecycle(LifecycleEvent::EndOfSpeech)),
        _ => return None,
    };
    Some(event)
}

fn parse_error_kind(raw: &str) -> std::result::Result<RecognitionErrorKind, String> {
    if let Ok(code) = raw.parse::<i32>() {
        return Ok(RecognitionErrorKind::from_platform_code(code));
    }
    match raw.to_ascii_lowercase().as_str() {
        "permission" | "permission-denied" => Ok(RecognitionErrorKind::PermissionDenied),
        "no-speech" | "no-match" | "nomatch" => Ok(RecognitionErrorKind::NoSpeechDetected),
        "timeout" | "speech-timeout" => Ok(RecognitionErrorKind::SpeechTimeout),
        "network" => Ok(RecognitionErrorKind::Network),
        "network-timeout" => Ok(RecognitionErrorKind::NetworkTimeout),
        "audio" => Ok(RecognitionErrorKind::Audio),
        "" => Err("error needs a code or name".into()),
        other => Err(format!("unknown recognizer error: {other}")),
    }
}
