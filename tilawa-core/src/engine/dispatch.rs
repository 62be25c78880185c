//! Blocking dispatch loop.
//!
//! ## Per iteration
//!
//! ```text
//! 1. Check the dispatching flag
//! 2. Wait up to dispatch_poll_interval for a RecognitionEvent
//! 3. RecitationSession::handle_event → Followup
//! 4. Followup::RestartRecognizer → remember the deadline
//! 5. Deadline reached → RecitationSession::resume_recognizer
//! ```
//!
//! Runs on a dedicated thread so recognizer callbacks never execute
//! alignment work themselves and `feed` is never entered concurrently.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Instant;

use crossbeam_channel::RecvTimeoutError;
use tracing::{debug, info, info_span, warn};

use crate::engine::{Followup, RecitationSession};
use crate::recognizer::EventStream;

#[derive(Default)]
pub struct SessionDiagnostics {
    pub partials_fed: AtomicUsize,
    pub finals_fed: AtomicUsize,
    pub advances: AtomicUsize,
    pub recognizer_errors: AtomicUsize,
    pub auto_restarts: AtomicUsize,
}

impl SessionDiagnostics {
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            partials_fed: self.partials_fed.load(Ordering::Relaxed),
            finals_fed: self.finals_fed.load(Ordering::Relaxed),
            advances: self.advances.load(Ordering::Relaxed),
            recognizer_errors: self.recognizer_errors.load(Ordering::Relaxed),
            auto_restarts: self.auto_restarts.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub partials_fed: usize,
    pub finals_fed: usize,
    pub advances: usize,
    pub recognizer_errors: usize,
    pub auto_restarts: usize,
}

/// Everything the loop needs, moved onto the dispatcher thread.
pub struct DispatchContext {
    pub session: Arc<RecitationSession>,
    pub events: EventStream,
}

/// A recognizer restart waiting for its deadline.
struct PendingRestart {
    due: Instant,
    epoch: u64,
}

/// Run until the session is shut down or every event sender is gone.
pub fn run(ctx: DispatchContext) {
    let _span = info_span!("dispatch").entered();
    info!("dispatcher started");

    let poll = ctx.session.config().dispatch_poll_interval;
    let mut pending: Option<PendingRestart> = None;

    loop {
        if !ctx.session.is_dispatching() {
            break;
        }

        match ctx.events.recv_timeout(poll) {
            Ok(event) => {
                if let Followup::RestartRecognizer { after, epoch } =
                    ctx.session.handle_event(event)
                {
                    debug!(?after, epoch, "recognizer restart scheduled");
                    pending = Some(PendingRestart {
                        due: Instant::now() + after,
                        epoch,
                    });
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                info!("recognition event senders dropped");
                break;
            }
        }

        if pending.as_ref().is_some_and(|p| Instant::now() >= p.due) {
            if let Some(restart) = pending.take() {
                if let Err(e) = ctx.session.resume_recognizer(restart.epoch) {
                    warn!("automatic recognizer restart failed: {e}");
                }
            }
        }
    }

    ctx.session.shutdown();
    info!(diagnostics = ?ctx.session.diagnostics(), "dispatcher stopped");
}
