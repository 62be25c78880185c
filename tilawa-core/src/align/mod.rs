//! Incremental alignment of recognizer hypotheses against the reference.
//!
//! ## Algorithm
//!
//! ```text
//! search = last_matched + 1
//! for candidate in hypothesis.split_whitespace():
//!     while search < N:
//!         if key(candidate) == reference[search]:
//!             last_matched = search; search += 1; next candidate
//!         search += 1                      (skip a dropped reference word)
//!     search == N → discard remaining candidates
//! ```
//!
//! The search never starts below `last_matched + 1`, so re-feeding an
//! overlapping partial cannot count an already-matched word twice. It also
//! means a partial that repeats matched words before extending them ("w1" then
//! "w1 w2") advances nothing: "w1" runs the search off the end and "w2" is
//! discarded. A single candidate may jump ahead over reference words the
//! recognizer dropped. Candidates that normalize to nothing (a stray mark or
//! tatweel) are skipped rather than treated as a miss.

use tracing::{debug, trace};

use crate::ipc::events::{Progress, SessionStatus};
use crate::text::{normalize, ReferenceText};

/// Index of the last reference word confirmed as recited.
///
/// `None` stands for "nothing matched yet" (-1). Only moves forward except on
/// an explicit [`Aligner::reset`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlignmentCursor(Option<usize>);

impl AlignmentCursor {
    pub fn last_matched(self) -> Option<usize> {
        self.0
    }

    /// First reference index still eligible for matching.
    fn next_search_index(self) -> usize {
        self.0.map_or(0, |i| i + 1)
    }
}

/// Outcome of a single [`Aligner::feed`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentResult {
    /// New `last_matched_index` if this call advanced the cursor.
    pub newly_matched_up_to: Option<usize>,
    pub recognized_prefix: String,
    pub status: SessionStatus,
}

impl AlignmentResult {
    pub fn advanced(&self) -> bool {
        self.newly_matched_up_to.is_some()
    }
}

/// Tracks recitation progress through a [`ReferenceText`].
///
/// Not reentrant: callers serialize `feed` (the session dispatcher does).
#[derive(Debug, Clone)]
pub struct Aligner {
    reference: ReferenceText,
    cursor: AlignmentCursor,
    recognized_prefix: String,
    status: SessionStatus,
}

impl Aligner {
    pub fn new(reference: ReferenceText) -> Self {
        Self {
            reference,
            cursor: AlignmentCursor::default(),
            recognized_prefix: String::new(),
            status: SessionStatus::Idle,
        }
    }

    /// Align one hypothesis (partial or final) and advance the cursor as far
    /// as matching words allow.
    ///
    /// Never fails. If nothing matched, the cursor, prefix and status are left
    /// exactly as they were.
    pub fn feed(&mut self, hypothesis: &str) -> AlignmentResult {
        let total = self.reference.len();
        let before = self.cursor;
        let mut search = self.cursor.next_search_index();

        'candidates: for candidate in hypothesis.split_whitespace() {
            let key = normalize(candidate);
            if key.is_empty() {
                continue;
            }

            loop {
                if search >= total {
                    trace!(candidate, "reference exhausted, discarding remaining candidates");
                    break 'candidates;
                }
                let matched = self.reference.key(search) == key;
                search += 1;
                if matched {
                    self.cursor = AlignmentCursor(Some(search - 1));
                    continue 'candidates;
                }
            }
        }

        let newly_matched_up_to = if self.cursor != before {
            self.cursor.last_matched()
        } else {
            None
        };

        if let Some(last) = newly_matched_up_to {
            self.recognized_prefix = self.reference.prefix_through(last);
            self.status = if last + 1 == total {
                SessionStatus::Completed
            } else {
                SessionStatus::Matched
            };
            debug!(last, total, "alignment advanced");
        }

        AlignmentResult {
            newly_matched_up_to,
            recognized_prefix: self.recognized_prefix.clone(),
            status: self.status.clone(),
        }
    }

    /// Rewind to the start of the reference for a new pass.
    pub fn reset(&mut self) {
        self.cursor = AlignmentCursor::default();
        self.recognized_prefix.clear();
        self.status = SessionStatus::Idle;
    }

    /// Apply a lifecycle or error status decided by the session.
    pub fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn last_matched_index(&self) -> Option<usize> {
        self.cursor.last_matched()
    }

    pub fn recognized_prefix(&self) -> &str {
        &self.recognized_prefix
    }

    /// `true` once the last reference word has matched.
    pub fn is_complete(&self) -> bool {
        self.cursor.last_matched() == Some(self.reference.len() - 1)
    }

    pub fn reference(&self) -> &ReferenceText {
        &self.reference
    }

    pub fn progress(&self) -> Progress {
        Progress {
            last_matched_index: self.cursor.last_matched(),
            matched_words: self.cursor.next_search_index(),
            total_words: self.reference.len(),
            recognized_prefix: self.recognized_prefix.clone(),
        }
    }
}
