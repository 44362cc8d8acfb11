//! Clip storage.
//!
//! One directory per clip under a store root:
//!
//! ```text
//! <root>/<clip>/metadata.json   scan parameters (written by the slicer)
//! <root>/<clip>/notes.json      notes, bpm and bar lines (detector, then editor)
//! <root>/<clip>/chunk_*.jpg     tiles
//! ```
//!
//! Reads accept either notes-document shape; writes always produce the current
//! one. Updates are partial: only the fields present in a [`ChartUpdate`]
//! replace what is stored.

use std::fs;
use std::path::{Path, PathBuf};

use crate::document::{
    parse_metadata_document, parse_notes_document, write_notes_document, Chart, Note, ScanMetadata,
};
use crate::error::{ChartError, Result};

pub const METADATA_FILE: &str = "metadata.json";
pub const NOTES_FILE: &str = "notes.json";

/// Partial replacement of a stored chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartUpdate {
    pub notes: Option<Vec<Note>>,
    pub bpm: Option<f64>,
    pub bar_lines: Option<Vec<f64>>,
}

impl ChartUpdate {
    pub fn notes(notes: Vec<Note>) -> Self {
        Self {
            notes: Some(notes),
            ..Self::default()
        }
    }

    pub fn bpm(bpm: f64) -> Self {
        Self {
            bpm: Some(bpm),
            ..Self::default()
        }
    }

    pub fn bar_lines(bar_lines: Vec<f64>) -> Self {
        Self {
            bar_lines: Some(bar_lines),
            ..Self::default()
        }
    }

    /// Apply onto `chart`. A non-positive bpm marks the tempo unknown, as the
    /// detector does.
    pub fn apply(self, chart: &mut Chart) {
        if let Some(notes) = self.notes {
            chart.notes = notes;
        }
        if let Some(bpm) = self.bpm {
            chart.set_bpm(bpm);
        }
        if let Some(bar_lines) = self.bar_lines {
            chart.bar_lines = bar_lines;
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClipStore {
    root: PathBuf,
}

impl ClipStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn clip_dir(&self, clip: &str) -> PathBuf {
        self.root.join(clip)
    }

    /// Clip names with a metadata document, sorted.
    pub fn clips(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut clips = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.path().join(METADATA_FILE).is_file() {
                clips.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        clips.sort();
        Ok(clips)
    }

    pub fn has_notes(&self, clip: &str) -> bool {
        self.clip_dir(clip).join(NOTES_FILE).is_file()
    }

    pub fn load_metadata(&self, clip: &str) -> Result<ScanMetadata> {
        let path = self.clip_dir(clip).join(METADATA_FILE);
        let content = read_required(&path, "metadata", clip)?;
        parse_metadata_document(&content)
    }

    pub fn load_chart(&self, clip: &str) -> Result<Chart> {
        let path = self.clip_dir(clip).join(NOTES_FILE);
        let content = read_required(&path, "notes document", clip)?;
        let chart = parse_notes_document(&content)?;
        log::debug!(
            "loaded {} notes for '{}' from {}",
            chart.notes.len(),
            clip,
            path.display()
        );
        Ok(chart)
    }

    /// Replace the stored chart.
    pub fn save_chart(&self, clip: &str, chart: &Chart) -> Result<()> {
        let dir = self.clip_dir(clip);
        fs::create_dir_all(&dir)?;
        let path = dir.join(NOTES_FILE);
        fs::write(&path, write_notes_document(chart)?)?;
        log::debug!("wrote {} notes for '{}' to {}", chart.notes.len(), clip, path.display());
        Ok(())
    }

    /// Merge `update` into the stored chart and write it back.
    ///
    /// The clip's notes document must already exist.
    pub fn update(&self, clip: &str, update: ChartUpdate) -> Result<Chart> {
        let mut chart = self.load_chart(clip)?;
        update.apply(&mut chart);
        self.save_chart(clip, &chart)?;
        Ok(chart)
    }
}

fn read_required(path: &Path, what: &str, clip: &str) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ChartError::NotFound(format!(
            "{} for clip '{}' ({})",
            what,
            clip,
            path.display()
        ))),
        Err(e) => Err(e.into()),
    }
}
