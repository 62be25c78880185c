//! `ScriptedRecognizer`: replays canned utterances instead of listening.
//!
//! Each `start()` emits the next scripted utterance through the listener, so
//! the whole session flow (auto restarts included) can be exercised without
//! a microphone or platform engine.

use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tracing::debug;

use crate::error::{Result, TilawaError};
use crate::recognizer::{
    EventSink, LifecycleEvent, RecognitionEvent, RecognitionRequest, SpeechRecognizer,
};

/// Start/stop counters, shared so tests can observe a recognizer that has
/// been moved into a `RecognizerHandle`.
#[derive(Debug, Default)]
pub struct ScriptCounters {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

pub struct ScriptedRecognizer {
    sink: EventSink,
    utterances: VecDeque<Vec<RecognitionEvent>>,
    counters: Arc<ScriptCounters>,
    deny_permission: bool,
}

impl ScriptedRecognizer {
    /// Replay `utterances` verbatim, one per `start()`.
    pub fn new(sink: EventSink, utterances: Vec<Vec<RecognitionEvent>>) -> Self {
        Self {
            sink,
            utterances: utterances.into(),
            counters: Arc::new(ScriptCounters::default()),
            deny_permission: false,
        }
    }

    /// Build one final-only utterance per text (see [`utterance`]).
    pub fn from_texts<S: AsRef<str>>(sink: EventSink, texts: &[S]) -> Self {
        let utterances = texts.iter().map(|t| utterance(t.as_ref())).collect();
        Self::new(sink, utterances)
    }

    /// Refuse every `start()` as if microphone access were missing.
    pub fn deny_permission(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    pub fn counters(&self) -> Arc<ScriptCounters> {
        Arc::clone(&self.counters)
    }

    pub fn remaining(&self) -> usize {
        self.utterances.len()
    }
}

/// Lifecycle events followed by a single final result for `text`.
///
/// No cumulative partials: the aligner never re-matches words it already
/// confirmed, so "w1" then "w1 w2" would lose "w2". Script partials
/// explicitly with [`ScriptedRecognizer::new`] when a test needs them.
pub fn utterance(text: &str) -> Vec<RecognitionEvent> {
    let words: Vec<&str> = text.split_whitespace().collect();
    vec![
        RecognitionEvent::Lifecycle(LifecycleEvent::ReadyForSpeech),
        RecognitionEvent::Lifecycle(LifecycleEvent::BeginningOfSpeech),
        RecognitionEvent::Lifecycle(LifecycleEvent::EndOfSpeech),
        RecognitionEvent::FinalResult(words.join(" ")),
    ]
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn start(&mut self, request: &RecognitionRequest) -> Result<()> {
        if self.deny_permission {
            return Err(TilawaError::PermissionDenied);
        }
        self.counters.starts.fetch_add(1, Ordering::SeqCst);

        match self.utterances.pop_front() {
            Some(events) => {
                debug!(
                    language = %request.language,
                    events = events.len(),
                    "replaying scripted utterance"
                );
                for event in events {
                    self.sink.send(event);
                }
            }
            None => debug!("script exhausted, staying silent"),
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::event_channel;

    #[test]
    fn utterance_emits_lifecycle_then_single_final() {
        let events = utterance("  الحمد لله   رب ");
        assert_eq!(
            events,
            vec![
                RecognitionEvent::Lifecycle(LifecycleEvent::ReadyForSpeech),
                RecognitionEvent::Lifecycle(LifecycleEvent::BeginningOfSpeech),
                RecognitionEvent::Lifecycle(LifecycleEvent::EndOfSpeech),
                RecognitionEvent::FinalResult("الحمد لله رب".into()),
            ]
        );
        assert!(!events
            .iter()
            .any(|ev| matches!(ev, RecognitionEvent::PartialResult(_))));
    }

    #[test]
    fn scripted_texts_align_fully_one_utterance_each() {
        use crate::align::Aligner;
        use crate::text::ReferenceText;

        let mut aligner = Aligner::new(
            ReferenceText::new("بسم الله الرحمن الرحيم الحمد لله رب العالمين")
                .expect("reference"),
        );
        for text in ["بسم الله الرحمن الرحيم", "الحمد لله رب"] {
            for event in utterance(text) {
                match event {
                    RecognitionEvent::PartialResult(t) | RecognitionEvent::FinalResult(t) => {
                        aligner.feed(&t);
                    }
                    _ => {}
                }
            }
        }
        assert_eq!(aligner.last_matched_index(), Some(6));
    }

    #[test]
    fn each_start_replays_one_utterance() {
        let (sink, stream) = event_channel();
        let mut recognizer = ScriptedRecognizer::new(
            sink,
            vec![
                vec![RecognitionEvent::FinalResult("بسم".into())],
                vec![RecognitionEvent::FinalResult("الله".into())],
            ],
        );
        let counters = recognizer.counters();
        let request = RecognitionRequest::default();

        recognizer.start(&request).expect("first start");
        assert_eq!(
            stream.try_recv().expect("first"),
            RecognitionEvent::FinalResult("بسم".into())
        );
        assert!(stream.try_recv().is_err());

        recognizer.start(&request).expect("second start");
        recognizer.start(&request).expect("exhausted start");
        recognizer.stop();

        assert_eq!(
            stream.try_recv().expect("second"),
            RecognitionEvent::FinalResult("الله".into())
        );
        assert!(stream.try_recv().is_err());
        assert_eq!(counters.starts.load(Ordering::SeqCst), 3);
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
        assert_eq!(recognizer.remaining(), 0);
    }

    #[test]
    fn denied_permission_fails_start() {
        let (sink, _stream) = event_channel();
        let mut recognizer = ScriptedRecognizer::from_texts(sink, &["بسم"]).deny_permission();
        let err = recognizer
            .start(&RecognitionRequest::default())
            .expect_err("start should fail");
        assert!(matches!(err, TilawaError::PermissionDenied));
        assert_eq!(recognizer.remaining(), 1);
    }
}
