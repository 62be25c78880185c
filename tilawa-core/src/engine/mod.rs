//! `RecitationSession`: top-level recitation controller.
//!
//! ## Lifecycle
//!
//! ```text
//! RecitationSession::new()
//!     └─► spawn_dispatcher()     → events consumed on one thread
//!         └─► toggle_listening() → recognizer started, status = Listening
//!             ├─► results        → aligner fed, status = Matched | Completed
//!             └─► toggle_listening() → recognizer stopped, status = Stopped
//! ```
//!
//! ## Threading
//!
//! Recognizer callbacks only enqueue onto the [`EventStream`]. The dispatcher
//! thread is the single writer that calls [`RecitationSession::handle_event`].
//! The aligner lock is never held while calling into the recognizer.

pub mod dispatch;
pub mod messages;

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    align::Aligner,
    error::{Result, TilawaError},
    ipc::events::{Progress, ProgressEvent, SessionStatus, SessionStatusEvent},
    recognizer::{
        EventStream, LifecycleEvent, RecognitionErrorKind, RecognitionEvent, RecognitionRequest,
        RecognizerHandle,
    },
    text::ReferenceText,
};

pub use dispatch::{DiagnosticsSnapshot, SessionDiagnostics};
pub use messages::StatusMessages;

/// Broadcast channel capacity for progress and status events.
const BROADCAST_CAP: usize = 256;

/// What toggling listening back on does to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    /// Continue from the last matched word.
    #[default]
    Resume,
    /// Rewind to the first word on every start.
    FromStart,
}

/// Configuration for `RecitationSession`.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub restart_policy: RestartPolicy,
    /// Delay before the recognizer is restarted after a final result or a
    /// silence error while still listening. Default: 1 s.
    pub auto_retry_delay: Duration,
    /// How long the dispatcher waits for an event before checking for due
    /// restarts and shutdown. Default: 20 ms.
    pub dispatch_poll_interval: Duration,
    pub request: RecognitionRequest,
    pub messages: StatusMessages,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            restart_policy: RestartPolicy::Resume,
            auto_retry_delay: Duration::from_millis(1_000),
            dispatch_poll_interval: Duration::from_millis(20),
            request: RecognitionRequest::default(),
            messages: StatusMessages::default(),
        }
    }
}

/// Work the caller of [`RecitationSession::handle_event`] must schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Followup {
    None,
    /// Call [`RecitationSession::resume_recognizer`] with `epoch` once `after`
    /// has elapsed.
    RestartRecognizer { after: Duration, epoch: u64 },
}

/// The recitation session handle.
///
/// `Send + Sync`; wrap in `Arc` to share between the dispatcher, the host's
/// command handlers and event-forwarding tasks.
pub struct RecitationSession {
    config: SessionConfig,
    recognizer: RecognizerHandle,
    aligner: Mutex<Aligner>,
    listening: AtomicBool,
    /// Bumped on every start/stop so stale scheduled restarts are ignored.
    listen_epoch: AtomicU64,
    /// `true` while the dispatcher thread should keep running.
    dispatching: AtomicBool,
    events: Mutex<Option<EventStream>>,
    progress_tx: broadcast::Sender<ProgressEvent>,
    status_tx: broadcast::Sender<SessionStatusEvent>,
    seq: AtomicU64,
    diagnostics: SessionDiagnostics,
}

impl RecitationSession {
    /// Create a session over `reference`. Does not start listening.
    ///
    /// `events` must be the stream paired with the sink `recognizer` reports
    /// through (see [`crate::recognizer::event_channel`]).
    pub fn new(
        config: SessionConfig,
        reference: ReferenceText,
        recognizer: RecognizerHandle,
        events: EventStream,
    ) -> Self {
        let (progress_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        info!(words = reference.len(), "recitation session created");

        Self {
            config,
            recognizer,
            aligner: Mutex::new(Aligner::new(reference)),
            listening: AtomicBool::new(false),
            listen_epoch: AtomicU64::new(0),
            dispatching: AtomicBool::new(false),
            events: Mutex::new(Some(events)),
            progress_tx,
            status_tx,
            seq: AtomicU64::new(0),
            diagnostics: SessionDiagnostics::default(),
        }
    }

    /// Run the dispatcher on its own thread until [`shutdown`](Self::shutdown).
    ///
    /// # Errors
    /// - `TilawaError::AlreadyRunning` if the event stream was already taken.
    /// - `TilawaError::Io` if the thread cannot be spawned.
    pub fn spawn_dispatcher(self: &Arc<Self>) -> Result<JoinHandle<()>> {
        let events = self.events.lock().take().ok_or(TilawaError::AlreadyRunning)?;
        self.dispatching.store(true, Ordering::SeqCst);

        let ctx = dispatch::DispatchContext {
            session: Arc::clone(self),
            events,
        };
        let handle = std::thread::Builder::new()
            .name("tilawa-dispatch".into())
            .spawn(move || dispatch::run(ctx))
            .inspect_err(|_| self.dispatching.store(false, Ordering::SeqCst))?;
        Ok(handle)
    }

    /// Ask the dispatcher to exit after its current poll.
    pub fn shutdown(&self) {
        self.dispatching.store(false, Ordering::SeqCst);
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatching.load(Ordering::SeqCst)
    }

    /// Flip listening on or off. Returns the new listening flag.
    ///
    /// # Errors
    /// Propagates the recognizer start failure after surfacing it as
    /// `SessionStatus::Error`; listening stays off in that case.
    pub fn toggle_listening(&self) -> Result<bool> {
        if self.is_listening() {
            self.stop_listening();
            Ok(false)
        } else {
            self.start_listening()?;
            Ok(true)
        }
    }

    fn start_listening(&self) -> Result<()> {
        let rewound = {
            let mut aligner = self.aligner.lock();
            let rewind = aligner.is_complete()
                || self.config.restart_policy == RestartPolicy::FromStart;
            if rewind && aligner.last_matched_index().is_some() {
                aligner.reset();
                true
            } else {
                false
            }
        };
        if rewound {
            info!("starting a new pass from the first word");
            self.publish_progress();
        }

        self.listening.store(true, Ordering::SeqCst);
        self.listen_epoch.fetch_add(1, Ordering::SeqCst);
        self.start_recognizer()
    }

    fn stop_listening(&self) {
        self.listening.store(false, Ordering::SeqCst);
        self.listen_epoch.fetch_add(1, Ordering::SeqCst);
        self.recognizer.0.lock().stop();
        self.set_status(SessionStatus::Stopped);
        info!("listening stopped");
    }

    fn start_recognizer(&self) -> Result<()> {
        self.set_status(SessionStatus::Listening);

        let started = self.recognizer.0.lock().start(&self.config.request);
        if let Err(e) = started {
            warn!("recognizer failed to start: {e}");
            self.listening.store(false, Ordering::SeqCst);
            let message = match &e {
                TilawaError::PermissionDenied => &self.config.messages.permission_denied,
                _ => &self.config.messages.start_failed,
            };
            self.set_status(SessionStatus::Error(message.clone()));
            return Err(e);
        }
        Ok(())
    }

    /// Restart the recognizer for the next utterance if the user is still
    /// listening and nothing toggled since `epoch` was issued.
    pub fn resume_recognizer(&self, epoch: u64) -> Result<()> {
        if !self.is_listening() || self.listen_epoch.load(Ordering::SeqCst) != epoch {
            debug!(epoch, "skipping stale recognizer restart");
            return Ok(());
        }
        self.diagnostics.auto_restarts.fetch_add(1, Ordering::Relaxed);
        self.start_recognizer()
    }

    /// Rewind the cursor to the first word (explicit new pass).
    pub fn restart(&self) {
        {
            let mut aligner = self.aligner.lock();
            aligner.reset();
            if self.is_listening() {
                aligner.set_status(SessionStatus::Listening);
            }
        }
        info!("recitation restarted");
        self.publish_progress();
        self.publish_status();
    }

    /// Apply one recognizer event. The single consumer of the event queue.
    pub fn handle_event(&self, event: RecognitionEvent) -> Followup {
        match event {
            RecognitionEvent::PartialResult(text) => {
                self.diagnostics.partials_fed.fetch_add(1, Ordering::Relaxed);
                debug!(%text, "partial hypothesis");
                self.apply_hypothesis(&text, false)
            }
            RecognitionEvent::FinalResult(text) => {
                self.diagnostics.finals_fed.fetch_add(1, Ordering::Relaxed);
                debug!(%text, "final hypothesis");
                self.apply_hypothesis(&text, true)
            }
            RecognitionEvent::Error(kind) => self.apply_error(kind),
            RecognitionEvent::Lifecycle(lifecycle) => {
                self.apply_lifecycle(lifecycle);
                Followup::None
            }
        }
    }

    fn apply_hypothesis(&self, text: &str, is_final: bool) -> Followup {
        let result = self.aligner.lock().feed(text);

        if let Some(last) = result.newly_matched_up_to {
            self.diagnostics.advances.fetch_add(1, Ordering::Relaxed);
            info!(last, prefix = %result.recognized_prefix, "recitation advanced");
            self.publish_progress();

            if result.status.is_completed() {
                info!("recitation completed");
                self.listening.store(false, Ordering::SeqCst);
                self.listen_epoch.fetch_add(1, Ordering::SeqCst);
                self.recognizer.0.lock().stop();
            }
            self.publish_status();
        }

        if is_final && self.is_listening() {
            return self.restart_followup();
        }
        Followup::None
    }

    fn apply_error(&self, kind: RecognitionErrorKind) -> Followup {
        self.diagnostics.recognizer_errors.fetch_add(1, Ordering::Relaxed);
        warn!(?kind, "speech recognition error");

        if kind.auto_retry() && self.is_listening() {
            return self.restart_followup();
        }
        if self.aligner.lock().is_complete() {
            debug!(?kind, "ignoring recognizer error after completion");
            return Followup::None;
        }

        self.listening.store(false, Ordering::SeqCst);
        self.listen_epoch.fetch_add(1, Ordering::SeqCst);
        let message = self.config.messages.for_error(kind).to_string();
        self.set_status(SessionStatus::Error(message));
        Followup::None
    }

    fn apply_lifecycle(&self, lifecycle: LifecycleEvent) {
        let status = match lifecycle {
            LifecycleEvent::ReadyForSpeech => SessionStatus::ReadyToListen,
            LifecycleEvent::BeginningOfSpeech => SessionStatus::Listening,
            LifecycleEvent::EndOfSpeech => {
                debug!("end of speech");
                return;
            }
        };

        if !self.is_listening() {
            debug!(?lifecycle, "lifecycle event while not listening");
            return;
        }
        {
            let mut aligner = self.aligner.lock();
            if aligner.is_complete() {
                return;
            }
            aligner.set_status(status);
        }
        self.publish_status();
    }

    fn restart_followup(&self) -> Followup {
        Followup::RestartRecognizer {
            after: self.config.auto_retry_delay,
            epoch: self.listen_epoch.load(Ordering::SeqCst),
        }
    }

    // ── Observables ──────────────────────────────────────────────────────────

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SessionStatus {
        self.aligner.lock().status().clone()
    }

    pub fn status_message(&self) -> String {
        self.config.messages.describe(&self.status())
    }

    pub fn recognized_prefix(&self) -> String {
        self.aligner.lock().recognized_prefix().to_string()
    }

    pub fn progress(&self) -> Progress {
        self.aligner.lock().progress()
    }

    /// Original reference words, for display.
    pub fn reference_words(&self) -> Vec<String> {
        self.aligner
            .lock()
            .reference()
            .words()
            .iter()
            .map(|w| w.original.clone())
            .collect()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    pub fn subscribe_progress(&self) -> broadcast::Receiver<ProgressEvent> {
        self.progress_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<SessionStatusEvent> {
        self.status_tx.subscribe()
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn set_status(&self, status: SessionStatus) {
        self.aligner.lock().set_status(status);
        self.publish_status();
    }

    fn publish_status(&self) {
        let status = self.status();
        let _ = self.status_tx.send(SessionStatusEvent {
            message: self.config.messages.describe(&status),
            status,
            is_listening: self.is_listening(),
        });
    }

    fn publish_progress(&self) {
        let progress = self.progress();
        let _ = self.progress_tx.send(ProgressEvent {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            progress,
        });
    }
}
