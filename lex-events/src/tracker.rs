//! Per-request progress/stage state machine (§4.2). One [`StateTracker`]
//! is created per request; it owns the single task that is allowed to
//! advance its state (so happens-before ordering on the broadcast channel
//! is trivially satisfied — there is exactly one writer).

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use lex_core::RequestId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::registry::{sequence_for, StageSequence};

/// Everything broadcast to SSE subscribers as the request progresses
/// (§4.2, §6). `Partial` carries whatever shape the caller hands it —
/// the tracker itself has no opinion on entry/partial-entry structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "kind")]
pub enum TrackerEvent {
    Progress {
        request_id: RequestId,
        stage: String,
        progress: u8,
        message: Option<String>,
        details: Option<serde_json::Value>,
    },
    Partial {
        request_id: RequestId,
        #[cfg_attr(feature = "openapi", schema(value_type = Object))]
        data: serde_json::Value,
    },
    Complete {
        request_id: RequestId,
    },
    Error {
        request_id: RequestId,
        kind: String,
        message: String,
    },
    Cancelled {
        request_id: RequestId,
    },
}

/// Per-request stage/progress tracker feeding a broadcast channel (§4.2).
/// `reset`/`update`/`complete`/`error` mirror the spec's named contract
/// exactly.
pub struct StateTracker {
    request_id: RequestId,
    sequence: StageSequence,
    current_index: Mutex<usize>,
    progress: AtomicU8,
    terminal: AtomicBool,
    sender: broadcast::Sender<TrackerEvent>,
}

impl StateTracker {
    /// `category` selects the data-configured stage sequence this
    /// request's `update` calls are validated against (§4.2).
    pub fn new(request_id: RequestId, category: &str) -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            request_id,
            sequence: sequence_for(category),
            current_index: Mutex::new(0),
            progress: AtomicU8::new(0),
            terminal: AtomicBool::new(false),
            sender,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn sequence(&self) -> &StageSequence {
        &self.sequence
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.sender.subscribe()
    }

    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Acquire)
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.load(Ordering::Acquire)
    }

    /// Clear terminal flags so the tracker can be reused for a retried
    /// attempt of the same request (§4.2 `reset()`).
    pub fn reset(&self) {
        *self.current_index.lock().expect("tracker lock poisoned") = 0;
        self.progress.store(0, Ordering::Release);
        self.terminal.store(false, Ordering::Release);
    }

    /// Advance to `stage_name`, raising `progress` monotonically (§4.2
    /// `update()`). A repeated update at the already-current stage only
    /// replaces message/details — it never regresses progress, and an
    /// unknown stage name (one not in this category's sequence) is
    /// ignored rather than panicking, since stale callers can race a
    /// `reset()`.
    pub fn update(&self, stage_name: &str, message: Option<String>, details: Option<serde_json::Value>) {
        if self.is_terminal() {
            return;
        }
        let Some(index) = self.sequence.index_of(stage_name) else {
            tracing::debug!(stage = stage_name, "update() called with unknown stage name, ignoring");
            return;
        };

        {
            let mut current = self.current_index.lock().expect("tracker lock poisoned");
            if index >= *current {
                *current = index;
            }
        }

        let new_progress = self.sequence.progress_of(index);
        self.progress.fetch_max(new_progress, Ordering::AcqRel);

        let _ = self.sender.send(TrackerEvent::Progress {
            request_id: self.request_id,
            stage: stage_name.to_string(),
            progress: self.progress(),
            message,
            details,
        });
    }

    /// Emit a progressive partial payload without advancing stage/progress
    /// (§4.8 "Progressive streaming").
    pub fn emit_partial(&self, data: serde_json::Value) {
        if self.is_terminal() {
            return;
        }
        let _ = self.sender.send(TrackerEvent::Partial { request_id: self.request_id, data });
    }

    /// Mark the request complete (§4.2 `complete()`). Only the first of
    /// `complete()`/`error()`/`cancel()` to run wins; later calls are
    /// no-ops, satisfying "only one wins".
    pub fn complete(&self) {
        if self.terminal.swap(true, Ordering::AcqRel) {
            return;
        }
        self.progress.store(100, Ordering::Release);
        let _ = self.sender.send(TrackerEvent::Complete { request_id: self.request_id });
    }

    /// Mark the request failed (§4.2 `error()`, §7 "exactly one terminal
    /// `error` event").
    pub fn error(&self, kind: &str, message: &str) {
        if self.terminal.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.sender.send(TrackerEvent::Error {
            request_id: self.request_id,
            kind: kind.to_string(),
            message: message.to_string(),
        });
    }

    /// Mark the request cancelled (§5 "Completes the state tracker with a
    /// terminal 'cancelled' event").
    pub fn cancel(&self) {
        if self.terminal.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.sender.send(TrackerEvent::Cancelled { request_id: self.request_id });
    }

    pub fn started_at(&self) -> chrono::DateTime<chrono::Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_raises_progress_monotonically() {
        let tracker = StateTracker::new(RequestId::new(), "lookup");
        tracker.update("Clustering", None, None);
        assert_eq!(tracker.progress(), 55);
        tracker.update("ResolvingWord", None, None);
        assert_eq!(tracker.progress(), 55, "progress must not regress");
    }

    #[test]
    fn only_one_terminal_call_wins() {
        let tracker = StateTracker::new(RequestId::new(), "lookup");
        let mut rx = tracker.subscribe();
        tracker.complete();
        tracker.error("internal", "too late");
        assert!(tracker.is_terminal());

        let event = rx.try_recv().unwrap();
        assert!(matches!(event, TrackerEvent::Complete { .. }));
        assert!(rx.try_recv().is_err(), "no second terminal event should be sent");
    }

    #[test]
    fn events_stop_after_terminal() {
        let tracker = StateTracker::new(RequestId::new(), "lookup");
        tracker.complete();
        tracker.update("Clustering", None, None);
        assert_eq!(tracker.progress(), 100);
    }

    #[test]
    fn reset_clears_terminal_and_progress() {
        let tracker = StateTracker::new(RequestId::new(), "lookup");
        tracker.complete();
        assert!(tracker.is_terminal());
        tracker.reset();
        assert!(!tracker.is_terminal());
        assert_eq!(tracker.progress(), 0);
    }

    #[tokio::test]
    async fn subscribers_see_a_non_decreasing_progress_sequence_ending_terminal() {
        let tracker = StateTracker::new(RequestId::new(), "lookup");
        let mut rx = tracker.subscribe();

        tracker.update("Normalizing", None, None);
        tracker.update("ResolvingWord", None, None);
        tracker.update("FetchingProviders", None, None);
        tracker.complete();

        let mut last = 0u8;
        let mut saw_terminal = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                TrackerEvent::Progress { progress, .. } => {
                    assert!(progress >= last);
                    last = progress;
                }
                TrackerEvent::Complete { .. } => saw_terminal = true,
                _ => {}
            }
        }
        assert!(saw_terminal);
    }
}
