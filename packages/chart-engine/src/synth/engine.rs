//! Event synthesis engine
//!
//! Converts stored notes into an absolute-tick schedule, orders it, then
//! delta-encodes it for the timing-file writer.

use crate::document::Note;
use crate::ticks::{min_duration_ticks, TickClock};
use crate::timeline::Timeline;

use super::pitch::PitchMap;
use super::types::{DeltaEvent, EventKind, EventStream, TimedEvent};

/// Build the ordered absolute-tick schedule for `notes`.
///
/// Each note contributes one onset at `tick_at(time)` and one release
/// `duration` ticks later. Time is recomputed from the note's storage
/// coordinates, so a stale cached `time` cannot leak into the export.
///
/// # Duration
/// `round(h / (fps * speed) * ticks_per_second)`, never shorter than
/// [`min_duration_ticks`]. Notes without a usable extent get the minimum.
///
/// # Ordering
/// Ascending tick; at equal ticks every release comes before every onset.
/// Events that tie on both keep arrival order.
pub fn schedule(
    notes: &[Note],
    timeline: &Timeline,
    clock: &TickClock,
    pitches: &PitchMap,
) -> Vec<TimedEvent> {
    let mut events = Vec::with_capacity(notes.len() * 2);

    for note in notes {
        let tick = clock.tick_at(timeline.note_time(note));
        let duration = match note.extent() {
            Some(h) => clock.duration_ticks(timeline.seconds_for_pixels(h)),
            None => min_duration_ticks(),
        };
        let pitch = pitches.pitch_of(note.lane);

        events.push(TimedEvent {
            kind: EventKind::Onset,
            tick,
            pitch,
        });
        events.push(TimedEvent {
            kind: EventKind::Release,
            tick: tick.saturating_add(duration),
            pitch,
        });
    }

    // Stable: ties on (tick, kind) keep arrival order.
    events.sort_by_key(|e| (e.tick, e.kind));
    events
}

/// Delta-encode an ordered schedule.
///
/// The cursor starts at tick 0. A negative delta can only come from events
/// before tick 0 (notes timed before the clip start) or an unsorted schedule;
/// it is clamped to zero and counted in [`EventStream::clamped`].
pub fn encode_deltas(events: &[TimedEvent]) -> EventStream {
    let mut cursor: i64 = 0;
    let mut clamped = 0;
    let mut out = Vec::with_capacity(events.len());

    for event in events {
        let raw = event.tick.saturating_sub(cursor);
        let delta = if raw < 0 {
            clamped += 1;
            log::warn!(
                "negative delta {} at tick {} (pitch {}) clamped to zero",
                raw,
                event.tick,
                event.pitch
            );
            0
        } else {
            raw.min(u32::MAX as i64) as u32
        };
        out.push(DeltaEvent {
            kind: event.kind,
            delta,
            pitch: event.pitch,
        });
        cursor = event.tick;
    }

    EventStream {
        events: out,
        end_tick: events.last().map(|e| e.tick).unwrap_or(0),
        clamped,
    }
}

/// Synthesize the delta-encoded event stream for `notes`.
///
/// # Example
/// ```rust
/// use slitchart::{synthesize, ChunkPosition, Note, PitchMap, ScanParams, TickClock, Timeline};
///
/// let params = ScanParams::new(60.0, 20.0, 2000.0, 0.0).unwrap();
/// let timeline = Timeline::new(params, Default::default()).unwrap();
/// let clock = TickClock::new(120.0).unwrap();
/// let note = Note::new(ChunkPosition { chunk_index: 0, chunk_height: 2000.0, y: 800.0 }, 0);
///
/// let stream = synthesize(&[note], &timeline, &clock, &PitchMap::default());
/// assert_eq!(stream.len(), 2);
/// assert_eq!(stream.events[0].delta, 256);
/// assert_eq!(stream.events[1].delta, 16);
/// ```
pub fn synthesize(
    notes: &[Note],
    timeline: &Timeline,
    clock: &TickClock,
    pitches: &PitchMap,
) -> EventStream {
    let events = schedule(notes, timeline, clock, pitches);
    let stream = encode_deltas(&events);
    if stream.clamped > 0 {
        log::warn!(
            "{} of {} events had out-of-order timing; check the note source",
            stream.clamped,
            stream.len()
        );
    }
    log::debug!(
        "synthesized {} events from {} notes, last tick {}",
        stream.len(),
        notes.len(),
        stream.end_tick
    );
    stream
}
