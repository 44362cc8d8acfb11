//! # Chart Documents
//!
//! Types that cross the boundary with the detector and the clip store.
//!
//! ## Notes document
//! The detector has written two shapes over time:
//! ```text
//! legacy:  [ {note}, {note}, ... ]
//! current: { "notes": [ {note}, ... ], "bpm": 143.9, "bar_lines": [ ... ] }
//! ```
//! [`parse_notes_document`] accepts both and normalizes them straight into a
//! [`Chart`], so nothing past this module knows which shape was on disk. The
//! store always writes the current shape back.
//!
//! ## Metadata document
//! Written by the slicer next to the tiles. It carries the scan parameters every
//! time/tick transform needs ([`ScanMetadata::scan_params`]).
//!
//! ## Note fields
//! `(chunk_index, chunk_height, y)` is the authoritative position. `time` and
//! `global_y` are caches and are recomputed through a
//! [`Timeline`](crate::Timeline) whenever the position changes.
//!
//! A note is rejected on decode when `chunk_height` is not positive, or when
//! `chunk_height`, `y` or `h` is not finite or exceeds [`MAX_COORDINATE`].
//!
//! ## Tempo
//! An absent `bpm` means the default tempo. A stored `bpm` of 0 (or below) is
//! the detector saying it could not estimate one; that case is kept as
//! [`Chart::tempo_unknown`] and written back as 0.

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, Result};
use crate::ticks::DEFAULT_BPM;
use crate::timeline::{ChunkPosition, ScanParams};

/// Largest pixel magnitude a notes document may carry.
pub const MAX_COORDINATE: f64 = 1.0e9;

/// Marker kind of a note. Every kind currently sounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    #[default]
    Hit,
    Hold,
    #[serde(other)]
    Marker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub chunk_index: u32,
    pub chunk_height: f64,
    pub lane: usize,
    pub y: f64,
    /// Blob extent along the time axis, in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_y: Option<f64>,
    #[serde(rename = "type", default)]
    pub kind: NoteKind,
}

impl Note {
    /// A hit note at `position` with empty caches.
    pub fn new(position: ChunkPosition, lane: usize) -> Self {
        Self {
            chunk_index: position.chunk_index,
            chunk_height: position.chunk_height,
            lane,
            y: position.y,
            h: None,
            time: None,
            global_y: None,
            kind: NoteKind::Hit,
        }
    }

    pub fn with_extent(mut self, h: f64) -> Self {
        self.h = Some(h);
        self
    }

    pub fn position(&self) -> ChunkPosition {
        ChunkPosition {
            chunk_index: self.chunk_index,
            chunk_height: self.chunk_height,
            y: self.y,
        }
    }

    /// Overwrite the authoritative position. Caches are cleared because they
    /// no longer describe this note.
    pub fn set_position(&mut self, position: ChunkPosition) {
        self.chunk_index = position.chunk_index;
        self.chunk_height = position.chunk_height;
        self.y = position.y;
        self.time = None;
        self.global_y = None;
    }

    /// Pixel extent, treating absent and non-positive values alike.
    pub fn extent(&self) -> Option<f64> {
        self.h.filter(|h| h.is_finite() && *h > 0.0)
    }
}

/// Notes plus tempo grid for one clip, independent of the on-disk shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub notes: Vec<Note>,
    /// Stored tempo. `None` when the document had none or a non-positive one.
    pub bpm: Option<f64>,
    /// The document stored a non-positive bpm: the detector found no tempo,
    /// so one should be estimated from the bar lines.
    pub tempo_unknown: bool,
    pub bar_lines: Vec<f64>,
}

impl Chart {
    pub fn new(notes: Vec<Note>) -> Self {
        Self {
            notes,
            bpm: None,
            tempo_unknown: false,
            bar_lines: Vec::new(),
        }
    }

    /// Store `bpm`. A non-positive or non-finite value marks the tempo unknown.
    pub fn set_bpm(&mut self, bpm: f64) {
        let usable = bpm.is_finite() && bpm > 0.0;
        self.bpm = Some(bpm).filter(|_| usable);
        self.tempo_unknown = !usable;
    }

    /// Stored tempo, or the default when none is usable.
    pub fn bpm_or_default(&self) -> f64 {
        self.bpm.unwrap_or(DEFAULT_BPM)
    }
}

impl Default for Chart {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// The two notes-document shapes the detector has produced.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NotesDocument {
    Legacy(Vec<Note>),
    Current {
        notes: Vec<Note>,
        #[serde(default)]
        bpm: Option<f64>,
        #[serde(default)]
        bar_lines: Option<Vec<f64>>,
    },
}

impl From<NotesDocument> for Chart {
    fn from(document: NotesDocument) -> Self {
        match document {
            NotesDocument::Legacy(notes) => Chart::new(notes),
            NotesDocument::Current {
                notes,
                bpm,
                bar_lines,
            } => {
                let mut chart = Chart {
                    bar_lines: bar_lines.unwrap_or_default(),
                    ..Chart::new(notes)
                };
                if let Some(bpm) = bpm {
                    chart.set_bpm(bpm);
                }
                chart
            }
        }
    }
}

/// The shape [`write_notes_document`] produces.
#[derive(Serialize)]
struct CurrentDocument<'a> {
    notes: &'a [Note],
    #[serde(skip_serializing_if = "Option::is_none")]
    bpm: Option<f64>,
    bar_lines: &'a [f64],
}

fn check_coordinate(index: usize, field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value.abs() <= MAX_COORDINATE {
        Ok(())
    } else {
        Err(ChartError::malformed(
            "notes document",
            format!("note {}: {} out of range ({})", index, field, value),
        ))
    }
}

fn validate_note(index: usize, note: &Note) -> Result<()> {
    check_coordinate(index, "chunk_height", note.chunk_height)?;
    if note.chunk_height <= 0.0 {
        return Err(ChartError::malformed(
            "notes document",
            format!("note {}: chunk_height must be positive ({})", index, note.chunk_height),
        ));
    }
    check_coordinate(index, "y", note.y)?;
    if let Some(h) = note.h {
        check_coordinate(index, "h", h)?;
    }
    Ok(())
}

/// Decode a notes document of either shape.
///
/// # Example
/// ```
/// use slitchart::parse_notes_document;
///
/// let legacy = r#"[{"chunk_index": 0, "chunk_height": 2000, "lane": 3, "y": 800}]"#;
/// let chart = parse_notes_document(legacy).unwrap();
/// assert_eq!(chart.notes.len(), 1);
/// assert_eq!(chart.bpm_or_default(), 120.0);
/// assert!(chart.bar_lines.is_empty());
/// ```
pub fn parse_notes_document(source: &str) -> Result<Chart> {
    let document: NotesDocument = serde_json::from_str(source)
        .map_err(|e| ChartError::malformed("notes document", e))?;
    let chart: Chart = document.into();
    for (index, note) in chart.notes.iter().enumerate() {
        validate_note(index, note)?;
    }
    Ok(chart)
}

/// Encode a chart in the current document shape.
pub fn write_notes_document(chart: &Chart) -> Result<String> {
    let document = CurrentDocument {
        notes: &chart.notes,
        bpm: chart.bpm.or(if chart.tempo_unknown { Some(0.0) } else { None }),
        bar_lines: &chart.bar_lines,
    };
    serde_json::to_string_pretty(&document).map_err(|e| ChartError::malformed("notes document", e))
}

/// Scan metadata written by the slicer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub fps: f64,
    pub speed: f64,
    #[serde(alias = "chunk_size")]
    pub standard_chunk_height: f64,
    #[serde(default)]
    pub start_time: f64,
    /// Scan-line row in the source frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
}

impl ScanMetadata {
    /// Validated scan parameters.
    pub fn scan_params(&self) -> Result<ScanParams> {
        ScanParams::new(
            self.fps,
            self.speed,
            self.standard_chunk_height,
            self.start_time,
        )
    }

    /// Track bounds recorded by the slicer, if both are present.
    pub fn track(&self) -> Option<(f64, f64)> {
        Some((self.x1?, self.x2?))
    }
}

pub fn parse_metadata_document(source: &str) -> Result<ScanMetadata> {
    serde_json::from_str(source).map_err(|e| ChartError::malformed("metadata document", e))
}
