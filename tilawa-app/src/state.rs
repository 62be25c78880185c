//! Console host state.
//!
//! `AppState` is shared (via `Arc`) between the stdin command loop and the
//! event-forwarding tasks.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tilawa_core::{Progress, RecitationSession};

use crate::console::ConsoleFeed;
use crate::settings::AppSettings;

pub struct AppState {
    pub session: Arc<RecitationSession>,
    /// Stdin recognizer input; `None` in replay mode.
    pub feed: Option<ConsoleFeed>,
    /// Whether unrecited reference words are printed (memorization mode hides them).
    pub text_visible: AtomicBool,
    /// Emit events as JSON lines instead of rendered text.
    pub json_output: bool,
    pub settings: Mutex<AppSettings>,
    pub settings_path: PathBuf,
    pub commands_executed: AtomicUsize,
    pub recognizer_lines_dropped: AtomicUsize,
}

impl AppState {
    pub fn new(
        session: Arc<RecitationSession>,
        feed: Option<ConsoleFeed>,
        settings: AppSettings,
        settings_path: PathBuf,
        json_output: bool,
    ) -> Self {
        Self {
            session,
            feed,
            text_visible: AtomicBool::new(settings.show_reference_text),
            json_output,
            settings: Mutex::new(settings),
            settings_path,
            commands_executed: AtomicUsize::new(0),
            recognizer_lines_dropped: AtomicUsize::new(0),
        }
    }

    pub fn is_text_visible(&self) -> bool {
        self.text_visible.load(Ordering::SeqCst)
    }

    /// Render progress: recited words in brackets, then the rest of the
    /// passage (or a placeholder when the text is hidden).
    pub fn render(&self, progress: &Progress) -> String {
        render_progress(
            &self.session.reference_words(),
            progress,
            self.is_text_visible(),
        )
    }
}

pub fn render_progress(words: &[String], progress: &Progress, text_visible: bool) -> String {
    let done = progress.matched_words.min(words.len());
    let mut out = format!("({}/{}) ", done, progress.total_words);

    if done > 0 {
        out.push('[');
        out.push_str(&progress.recognized_prefix);
        out.push(']');
    }

    let remaining = &words[done..];
    if !remaining.is_empty() {
        if done > 0 {
            out.push(' ');
        }
        if text_visible {
            out.push_str(&remaining.join(" "));
        } else {
            out.push('…');
        }
    }
    out
}
