//! SSE event framing (§6 "HTTP lookup (streaming)"). One helper builds
//! each named event kind; [`complete_events`] is the only non-trivial
//! piece, splitting a large serialized entry into `complete_start` /
//! `complete_chunk` / `complete_end` once it crosses the 32 KiB bar.

use axum::response::sse::Event;
use lex_core::SynthesizedEntry;
use lex_events::{StageSequence, TrackerEvent};
use serde_json::json;

/// Payloads above this size stream as `complete_start`/`complete_chunk`/
/// `complete_end` instead of one `complete` event (§6, §8).
pub const COMPLETE_CHUNK_THRESHOLD_BYTES: usize = 32 * 1024;

/// Each chunk's `data` segment length, chosen well under the threshold so
/// a handful of chunks cover even a multi-hundred-KiB entry.
const CHUNK_SIZE_BYTES: usize = 8 * 1024;

pub fn config_event(sequence: &StageSequence) -> Event {
    Event::default().event("config").json_data(sequence).unwrap_or_else(|_| Event::default().event("config"))
}

/// Translate one [`TrackerEvent`] into its SSE frame. `Complete` carries
/// no payload of its own in the tracker (the caller supplies the final
/// entry separately via [`complete_events`]), so it is not handled here.
pub fn progress_or_partial_event(event: &TrackerEvent) -> Option<Event> {
    match event {
        TrackerEvent::Progress { stage, progress, message, details, .. } => Some(
            Event::default()
                .event("progress")
                .json_data(json!({
                    "stage": stage,
                    "progress": progress,
                    "message": message,
                    "details": details,
                }))
                .unwrap_or_else(|_| Event::default().event("progress")),
        ),
        TrackerEvent::Partial { data, .. } => {
            Some(Event::default().event("partial").json_data(data).unwrap_or_else(|_| Event::default().event("partial")))
        }
        TrackerEvent::Complete { .. } | TrackerEvent::Error { .. } | TrackerEvent::Cancelled { .. } => None,
    }
}

pub fn error_event(kind: &str, message: &str) -> Event {
    Event::default()
        .event("error")
        .json_data(json!({ "kind": kind, "message": message }))
        .unwrap_or_else(|_| Event::default().event("error").data(message.to_string()))
}

/// One `complete` event if `entry` serializes under the threshold,
/// otherwise `complete_start` + N `complete_chunk` (monotone
/// `chunk_index`) + `complete_end` (§6, §8).
pub fn complete_events(entry: &SynthesizedEntry) -> Vec<Event> {
    let serialized = match serde_json::to_string(entry) {
        Ok(s) => s,
        Err(_) => return vec![error_event("internal", "failed to serialize synthesized entry")],
    };

    if serialized.len() <= COMPLETE_CHUNK_THRESHOLD_BYTES {
        return vec![Event::default().event("complete").data(serialized)];
    }

    let total_bytes = serialized.len();
    let chunks: Vec<&str> = chunk_str(&serialized, CHUNK_SIZE_BYTES);
    let mut events = Vec::with_capacity(chunks.len() + 2);

    events.push(
        Event::default()
            .event("complete_start")
            .json_data(json!({
                "total_bytes": total_bytes,
                "chunk_count": chunks.len(),
                "fingerprint": entry.fingerprint,
            }))
            .unwrap_or_else(|_| Event::default().event("complete_start")),
    );

    for (index, chunk) in chunks.iter().enumerate() {
        events.push(
            Event::default()
                .event("complete_chunk")
                .json_data(json!({ "chunk_index": index, "data": chunk }))
                .unwrap_or_else(|_| Event::default().event("complete_chunk")),
        );
    }

    events.push(Event::default().event("complete_end").data(""));
    events
}

/// Split `s` into `max_bytes`-ish pieces on UTF-8 boundaries (never
/// inside a multi-byte codepoint).
fn chunk_str(s: &str, max_bytes: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < s.len() {
        let mut end = (start + max_bytes).min(s.len());
        while end < s.len() && !s.is_char_boundary(end) {
            end -= 1;
        }
        chunks.push(&s[start..end]);
        start = end;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use lex_core::Word;
    use std::collections::BTreeSet;

    fn small_entry() -> SynthesizedEntry {
        SynthesizedEntry {
            id: "e1".to_string(),
            word: Word::new("cogent", "cogent", "en"),
            definitions: vec![],
            pronunciation: None,
            etymology: None,
            word_forms: None,
            facts: None,
            model_info: lex_core::ModelInfo::default(),
            provider_set: BTreeSet::new(),
            fingerprint: SynthesizedEntry::compute_fingerprint(&BTreeSet::new(), &[], "m", "v1"),
            created_at: chrono::Utc::now(),
            version_info: lex_core::VersionInfo { pipeline_version: "v1".to_string(), model_tier: "medium".to_string() },
        }
    }

    #[test]
    fn small_entry_is_a_single_complete_event() {
        let events = complete_events(&small_entry());
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn large_entry_chunks_with_monotone_indices() {
        let mut entry = small_entry();
        entry.facts = Some(vec!["x".repeat(50_000)]);
        let events = complete_events(&entry);
        assert!(events.len() >= 4, "expected complete_start + >=2 chunks + complete_end");
    }

    #[test]
    fn chunking_never_splits_a_utf8_codepoint() {
        let s = "é".repeat(10_000);
        let chunks = chunk_str(&s, 7);
        for chunk in &chunks {
            assert!(std::str::from_utf8(chunk.as_bytes()).is_ok());
        }
        assert_eq!(chunks.concat(), s);
    }
}
