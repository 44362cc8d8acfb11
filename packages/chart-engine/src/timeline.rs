//! # Chunk/Time Transform
//!
//! The waterfall image is sliced into fixed-height tiles. Inside a tile, row
//! `y = chunk_height` is the earliest sampled row and `y = 0` the latest, so
//! time runs *up* the tile while tiles themselves are numbered forward in time.
//!
//! All tiles are unified into one scalar, the **global pixel position** `g`,
//! which increases monotonically with playback time:
//!
//! ```text
//! g    = chunk_index * standard_chunk_height + (chunk_height - y)
//! time = start_time + g / (fps * speed)
//! ```
//!
//! The inverse picks the tile by `floor(g / standard_chunk_height)` and looks up
//! that tile's real height in the [`ChunkLayout`] (the last tile of a clip is
//! usually shorter than the rest).
//!
//! Everything that needs to move between storage coordinates and time goes
//! through a [`Timeline`]. Its scan parameters are validated once when it is
//! built, so the transforms themselves cannot fail.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::Note;
use crate::error::{ChartError, Result};

/// Per-clip scan parameters written by the slicer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanParams {
    /// Source clip sampling rate, frames per second.
    pub fps: f64,
    /// Scroll rate of the scan, pixels per frame.
    pub speed: f64,
    pub standard_chunk_height: f64,
    /// Clip time (seconds) of the first sampled row.
    pub start_time: f64,
}

impl ScanParams {
    pub fn new(fps: f64, speed: f64, standard_chunk_height: f64, start_time: f64) -> Result<Self> {
        let params = Self {
            fps,
            speed,
            standard_chunk_height,
            start_time,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        let rate = self.fps * self.speed;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ChartError::InvalidConfig(format!(
                "fps * speed must be positive (fps={}, speed={})",
                self.fps, self.speed
            )));
        }
        if !self.standard_chunk_height.is_finite() || self.standard_chunk_height <= 0.0 {
            return Err(ChartError::InvalidConfig(format!(
                "standard chunk height must be positive, got {}",
                self.standard_chunk_height
            )));
        }
        if !self.start_time.is_finite() {
            return Err(ChartError::InvalidConfig(format!(
                "start time must be finite, got {}",
                self.start_time
            )));
        }
        Ok(())
    }

    /// Pixels of waterfall produced per second of clip.
    pub fn pixels_per_second(&self) -> f64 {
        self.fps * self.speed
    }
}

/// Storage-space coordinates of a point on the waterfall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkPosition {
    pub chunk_index: u32,
    pub chunk_height: f64,
    pub y: f64,
}

/// Heights of tiles that differ from the standard tile height.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkLayout {
    irregular: BTreeMap<u32, f64>,
}

impl ChunkLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every tile height that the notes report and that differs from
    /// `standard`.
    pub fn from_notes(standard: f64, notes: &[Note]) -> Self {
        let mut layout = Self::new();
        for note in notes {
            layout.register(note.chunk_index, note.chunk_height, standard);
        }
        layout
    }

    /// Record a tile's real height. Heights equal to `standard` are not stored.
    pub fn register(&mut self, chunk_index: u32, height: f64, standard: f64) {
        if height.is_finite() && height > 0.0 && height != standard {
            self.irregular.insert(chunk_index, height);
        } else {
            self.irregular.remove(&chunk_index);
        }
    }

    pub fn height_of(&self, chunk_index: u32, standard: f64) -> f64 {
        self.irregular.get(&chunk_index).copied().unwrap_or(standard)
    }

    pub fn irregular_tiles(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.irregular.iter().map(|(i, h)| (*i, *h))
    }
}

/// Validated scan parameters plus tile layout: the single source of truth for
/// converting between storage coordinates, global pixels and seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    params: ScanParams,
    layout: ChunkLayout,
}

impl Timeline {
    pub fn new(params: ScanParams, layout: ChunkLayout) -> Result<Self> {
        params.validate()?;
        Ok(Self { params, layout })
    }

    /// Timeline whose layout is derived from a note collection.
    pub fn for_notes(params: ScanParams, notes: &[Note]) -> Result<Self> {
        let layout = ChunkLayout::from_notes(params.standard_chunk_height, notes);
        Self::new(params, layout)
    }

    pub fn params(&self) -> &ScanParams {
        &self.params
    }

    pub fn layout(&self) -> &ChunkLayout {
        &self.layout
    }

    pub fn register_tile(&mut self, chunk_index: u32, height: f64) {
        self.layout
            .register(chunk_index, height, self.params.standard_chunk_height);
    }

    pub fn chunk_height(&self, chunk_index: u32) -> f64 {
        self.layout
            .height_of(chunk_index, self.params.standard_chunk_height)
    }

    /// Storage coordinates to global pixel position.
    pub fn global_of(&self, position: &ChunkPosition) -> f64 {
        position.chunk_index as f64 * self.params.standard_chunk_height
            + (position.chunk_height - position.y)
    }

    /// Global pixel position to storage coordinates.
    ///
    /// Positions before the first row stay in tile 0 with `y` beyond its
    /// height, which keeps the round trip exact.
    pub fn position_at_global(&self, g: f64) -> ChunkPosition {
        let standard = self.params.standard_chunk_height;
        let chunk_index = (g / standard).floor().max(0.0) as u32;
        let base = chunk_index as f64 * standard;
        let chunk_height = self.chunk_height(chunk_index);
        ChunkPosition {
            chunk_index,
            chunk_height,
            y: chunk_height - (g - base),
        }
    }

    pub fn time_at_global(&self, g: f64) -> f64 {
        self.params.start_time + g / self.params.pixels_per_second()
    }

    pub fn global_at_time(&self, time: f64) -> f64 {
        (time - self.params.start_time) * self.params.pixels_per_second()
    }

    /// # Example
    /// ```
    /// use slitchart::{ChunkPosition, ScanParams, Timeline};
    ///
    /// let params = ScanParams::new(60.0, 20.0, 2000.0, 0.0).unwrap();
    /// let timeline = Timeline::new(params, Default::default()).unwrap();
    /// let position = ChunkPosition { chunk_index: 0, chunk_height: 2000.0, y: 800.0 };
    /// assert_eq!(timeline.time_of(&position), 1.0);
    /// ```
    pub fn time_of(&self, position: &ChunkPosition) -> f64 {
        self.time_at_global(self.global_of(position))
    }

    pub fn position_at_time(&self, time: f64) -> ChunkPosition {
        self.position_at_global(self.global_at_time(time))
    }

    /// Seconds covered by `pixels` rows of waterfall.
    pub fn seconds_for_pixels(&self, pixels: f64) -> f64 {
        pixels / self.params.pixels_per_second()
    }

    /// Recompute a note's derived caches from its authoritative fields.
    pub fn refresh(&self, note: &mut Note) {
        let g = self.global_of(&note.position());
        note.global_y = Some(g);
        note.time = Some(self.time_at_global(g));
    }

    /// Move a note to global position `g`, rewriting its storage coordinates
    /// and caches together.
    pub fn relocate(&self, note: &mut Note, g: f64) {
        note.set_position(self.position_at_global(g));
        self.refresh(note);
    }

    /// Authoritative time of a note, ignoring any cached value.
    pub fn note_time(&self, note: &Note) -> f64 {
        self.time_of(&note.position())
    }

    pub fn note_global(&self, note: &Note) -> f64 {
        self.global_of(&note.position())
    }
}
