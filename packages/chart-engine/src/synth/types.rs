//! Event stream type definitions

use serde::Serialize;

/// Onset or release of a sounding note.
///
/// Variant order is the tie-break at equal ticks: a release sorts before an
/// onset, so a note retriggered on the same tick closes before it reopens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Release,
    Onset,
}

/// Event at an absolute tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimedEvent {
    pub kind: EventKind,
    pub tick: i64,
    pub pitch: u8,
}

/// Event relative to the previous one in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeltaEvent {
    pub kind: EventKind,
    pub delta: u32,
    pub pitch: u8,
}

/// Delta-encoded stream ready for the timing-file writer.
///
/// # Fields
/// - `events`: onsets and releases in playback order
/// - `end_tick`: absolute tick of the last event (0 for an empty stream)
/// - `clamped`: how many deltas were negative and clamped to zero
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStream {
    pub events: Vec<DeltaEvent>,
    pub end_tick: i64,
    pub clamped: usize,
}

impl EventStream {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Sum of all deltas.
    pub fn elapsed_ticks(&self) -> u64 {
        self.events.iter().map(|e| e.delta as u64).sum()
    }

    /// Absolute ticks reconstructed from the deltas.
    pub fn absolute(&self) -> Vec<(u64, EventKind, u8)> {
        let mut tick = 0u64;
        self.events
            .iter()
            .map(|e| {
                tick += e.delta as u64;
                (tick, e.kind, e.pitch)
            })
            .collect()
    }
}
