//! # slitchart
//!
//! Turns the output of a slit-scan note detector into an editable chart and a
//! MIDI timing file.
//!
//! A video is sampled one pixel row per frame and the rows are stacked into a
//! tall "waterfall" image, cut into tiles. Notes are stored by tile and row;
//! everything else (seconds, beat grid, ticks, preview pixels) is derived.
//!
//! ## Modules
//! - `timeline` - tile/row ↔ global pixel ↔ seconds
//! - `grid` - bar lines and 192-step quantization
//! - `lanes` - horizontal lane partition
//! - `ticks` - seconds ↔ MIDI ticks at a fixed tempo
//! - `synth` - onset/release event synthesis
//! - `midi` - Standard MIDI File writer
//! - `document` - notes and metadata documents
//! - `store` - clip directories on disk
//! - `config` - YAML project configuration
//! - `editor` - interactive editing and preview frames
//! - `detector` - external slicer/detector processes
//! - `api` - high-level entry points

pub mod api;
pub mod config;
pub mod detector;
pub mod document;
pub mod editor;
pub mod error;
pub mod grid;
pub mod lanes;
pub mod midi;
pub mod store;
pub mod synth;
pub mod ticks;
pub mod timeline;

pub use api::{
    clip_info, detect_clip, export_clip, export_notes, open_editor, quantize_clip, resolve_tempo,
    save_editor, set_bar_lines, set_bpm, slice_clip, ClipSummary, Export, TempoSource,
};
pub use config::ProjectConfig;
pub use detector::{Detector, DetectorSettings, ScriptDetector, SliceRequest};
pub use document::{
    parse_metadata_document, parse_notes_document, write_notes_document, Chart, Note, NoteKind,
    ScanMetadata,
};
pub use editor::{Editor, PreviewNote, Viewport};
pub use error::{ChartError, Result};
pub use grid::{BeatGrid, SUBDIVISIONS};
pub use lanes::LanePartition;
pub use midi::{write_midi, ExportOptions, DRUM_CHANNEL};
pub use store::{ChartUpdate, ClipStore};
pub use synth::{synthesize, EventKind, EventStream, PitchMap, PitchScheme};
pub use ticks::{TickClock, DEFAULT_BPM, PPQ};
pub use timeline::{ChunkLayout, ChunkPosition, ScanParams, Timeline};
