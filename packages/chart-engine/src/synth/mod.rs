//! # Event Synthesis Module
//!
//! Turn a collection of stored notes into the ordered, delta-encoded stream of
//! onset/release events that the timing-file writer consumes.
//!
//! ## Sub-modules
//! - `types` - EventKind, TimedEvent, DeltaEvent, EventStream
//! - `pitch` - lane to pitch mapping (explicit map, chromatic or GM drum fallback)
//! - `engine` - scheduling and delta encoding
//!
//! ## Pipeline
//! 1. **Tick** - note time (from storage coordinates) through the [`TickClock`](crate::TickClock)
//! 2. **Duration** - pixel extent `h` converted to ticks, floored at a 1/32 note
//! 3. **Pitch** - [`PitchMap::pitch_of`] for the note's lane
//! 4. **Order** - ascending tick, releases before onsets at equal ticks
//! 5. **Encode** - deltas against a cursor starting at 0; negative deltas clamp to 0
//!
//! ## Entry Point
//! [`synthesize()`] - notes in, [`EventStream`] out. It only reads the notes.
//!
//! ## Example
//! ```rust
//! use slitchart::{synthesize, ChunkPosition, EventKind, Note, PitchMap, ScanParams, TickClock, Timeline};
//!
//! let params = ScanParams::new(60.0, 20.0, 2000.0, 0.0).unwrap();
//! let timeline = Timeline::new(params, Default::default()).unwrap();
//! let clock = TickClock::new(120.0).unwrap();
//!
//! // Two lanes hit together one second in.
//! let at = ChunkPosition { chunk_index: 0, chunk_height: 2000.0, y: 800.0 };
//! let notes = vec![Note::new(at, 0), Note::new(at, 1)];
//!
//! let stream = synthesize(&notes, &timeline, &clock, &PitchMap::default());
//! assert_eq!(stream.events[0].kind, EventKind::Onset);
//! assert_eq!(stream.events[0].delta, 256);
//! assert_eq!(stream.events[1].delta, 0);
//! ```
//!
//! ## Overlap
//! Onsets and releases are separate events, so notes on different lanes can
//! overlap freely. On one pitch, a release landing on the same tick as the next
//! onset is always emitted first; otherwise the retrigger would be cut short by
//! the previous note's release.

mod engine;
mod pitch;
mod types;


pub use engine::{encode_deltas, schedule, synthesize};
pub use pitch::{PitchMap, PitchScheme, DEFAULT_BASE_PITCH, GM_DRUM_MAP};
pub use types::{DeltaEvent, EventKind, EventStream, TimedEvent};
