//! # Public API
//!
//! Entry points that tie the clip store, configuration and engine together.
//! Each one takes a [`ClipStore`] and a clip name, reads what it needs, and
//! writes back only through the store.
//!
//! ## Functions
//!
//! - [`open_editor()`] - load a clip into an [`Editor`]
//! - [`save_editor()`] - persist an editor's notes (bpm and bar lines untouched)
//! - [`export_clip()`] - synthesize the clip and encode it as a MIDI file
//! - [`quantize_clip()`] - snap every stored note to the beat grid
//! - [`set_bpm()`] / [`set_bar_lines()`] - partial tempo updates
//! - [`clip_info()`] - summary of a stored clip
//! - [`slice_clip()`] / [`detect_clip()`] - run the external slicer/detector
//!
//! ## Tempo
//!
//! Export uses the stored bpm, or 120 bpm when the document has none. When the
//! detector stored 0 ([`Chart::tempo_unknown`]) the bar lines are used to
//! estimate one ([`BeatGrid::estimate_bpm`]); failing that, 120 bpm.
//!
//! ## Typical Usage
//!
//! ```no_run
//! use slitchart::{export_clip, open_editor, save_editor, ClipStore, ProjectConfig};
//!
//! let store = ClipStore::new("data");
//! let config = ProjectConfig::default();
//!
//! let mut editor = open_editor(&store, "song", &config)?;
//! editor.add_note(12.5, 3, config.quantize_on_add)?;
//! save_editor(&store, "song", &editor)?;
//!
//! let export = export_clip(&store, "song", &config)?;
//! std::fs::write("song.mid", &export.midi)?;
//! # Ok::<(), slitchart::ChartError>(())
//! ```

use crate::config::ProjectConfig;
use crate::detector::{Detector, SliceRequest};
use crate::document::{Chart, Note};
use crate::editor::Editor;
use crate::error::{ChartError, Result};
use crate::grid::BeatGrid;
use crate::midi::write_midi;
use crate::store::{ChartUpdate, ClipStore};
use crate::synth::synthesize;
use crate::ticks::{TickClock, DEFAULT_BPM};
use crate::timeline::{ScanParams, Timeline};

/// Where an export's tempo came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempoSource {
    Stored,
    Estimated,
    Default,
}

/// Result of [`export_clip()`].
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub midi: Vec<u8>,
    pub bpm: f64,
    pub tempo_source: TempoSource,
    pub notes: usize,
    /// Events whose delta had to be clamped to 0.
    pub clamped: usize,
}

/// Result of [`clip_info()`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSummary {
    pub notes: usize,
    pub bpm: f64,
    pub tempo_source: TempoSource,
    pub bar_lines: usize,
    /// Times of the first and last note, seconds.
    pub span: Option<(f64, f64)>,
}

/// Resolve the tempo for `chart`.
pub fn resolve_tempo(chart: &Chart, params: &ScanParams, config: &ProjectConfig) -> (f64, TempoSource) {
    if let Some(bpm) = chart.bpm {
        return (bpm, TempoSource::Stored);
    }
    if !chart.tempo_unknown {
        return (DEFAULT_BPM, TempoSource::Default);
    }
    let grid = BeatGrid::new(chart.bar_lines.iter().copied());
    match grid.estimate_bpm(config.detector.beats_per_line(), params.pixels_per_second()) {
        Some(bpm) => (bpm, TempoSource::Estimated),
        None => (DEFAULT_BPM, TempoSource::Default),
    }
}

/// Load a clip into an editor.
///
/// # Errors
/// [`ChartError::NotFound`] when the clip has no metadata or notes document.
pub fn open_editor(store: &ClipStore, clip: &str, config: &ProjectConfig) -> Result<Editor> {
    let metadata = store.load_metadata(clip)?;
    let chart = store.load_chart(clip)?;
    let lanes = config.lanes(&metadata)?;
    let grid = BeatGrid::new(chart.bar_lines.iter().copied());
    Editor::new(metadata.scan_params()?, grid, lanes, config.preview, chart.notes)
}

/// Write the editor's notes back, leaving bpm and bar lines as stored.
pub fn save_editor(store: &ClipStore, clip: &str, editor: &Editor) -> Result<()> {
    store.update(clip, ChartUpdate::notes(editor.snapshot()))?;
    Ok(())
}

/// Encode `notes` as a MIDI file at `bpm`.
pub fn export_notes(notes: &[Note], params: ScanParams, bpm: f64, config: &ProjectConfig) -> Result<(Vec<u8>, usize)> {
    let timeline = Timeline::for_notes(params, notes)?;
    let clock = TickClock::new(bpm)?;
    let stream = synthesize(notes, &timeline, &clock, &config.pitches);
    let midi = write_midi(&stream, &clock, &config.export)?;
    Ok((midi, stream.clamped))
}

/// Synthesize a stored clip.
///
/// # Example
/// ```no_run
/// use slitchart::{export_clip, ClipStore, ProjectConfig};
///
/// let export = export_clip(&ClipStore::new("data"), "song", &ProjectConfig::default())?;
/// println!("{} notes at {:.1} bpm", export.notes, export.bpm);
/// # Ok::<(), slitchart::ChartError>(())
/// ```
pub fn export_clip(store: &ClipStore, clip: &str, config: &ProjectConfig) -> Result<Export> {
    let params = store.load_metadata(clip)?.scan_params()?;
    let chart = store.load_chart(clip)?;
    let (bpm, tempo_source) = resolve_tempo(&chart, &params, config);
    let (midi, clamped) = export_notes(&chart.notes, params, bpm, config)?;
    log::info!(
        "exported {} notes from '{}' at {:.2} bpm ({:?}), {} bytes",
        chart.notes.len(),
        clip,
        bpm,
        tempo_source,
        midi.len()
    );
    Ok(Export {
        midi,
        bpm,
        tempo_source,
        notes: chart.notes.len(),
        clamped,
    })
}

/// Snap every stored note of a clip to its beat grid. Returns how many moved.
pub fn quantize_clip(store: &ClipStore, clip: &str, config: &ProjectConfig) -> Result<usize> {
    let mut editor = open_editor(store, clip, config)?;
    if !editor.grid().is_usable() {
        log::warn!("'{}' has fewer than two bar lines; nothing to quantize against", clip);
        return Ok(0);
    }
    let moved = editor.quantize_all();
    save_editor(store, clip, &editor)?;
    Ok(moved)
}

pub fn set_bpm(store: &ClipStore, clip: &str, bpm: f64) -> Result<()> {
    TickClock::new(bpm)?;
    store.update(clip, ChartUpdate::bpm(bpm))?;
    Ok(())
}

/// Replace a clip's bar lines. They are stored sorted.
pub fn set_bar_lines(store: &ClipStore, clip: &str, bar_lines: &[f64]) -> Result<()> {
    let grid = BeatGrid::new(bar_lines.iter().copied());
    if grid.bar_lines().len() != bar_lines.len() {
        return Err(ChartError::InvalidConfig(
            "bar lines must be finite and distinct".to_string(),
        ));
    }
    store.update(clip, ChartUpdate::bar_lines(grid.bar_lines().to_vec()))?;
    Ok(())
}

pub fn clip_info(store: &ClipStore, clip: &str, config: &ProjectConfig) -> Result<ClipSummary> {
    let params = store.load_metadata(clip)?.scan_params()?;
    let chart = store.load_chart(clip)?;
    let (bpm, tempo_source) = resolve_tempo(&chart, &params, config);
    let timeline = Timeline::for_notes(params, &chart.notes)?;

    let span = chart
        .notes
        .iter()
        .map(|n| timeline.note_time(n))
        .fold(None, |acc: Option<(f64, f64)>, t| match acc {
            Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
            None => Some((t, t)),
        });

    Ok(ClipSummary {
        notes: chart.notes.len(),
        bpm,
        tempo_source,
        bar_lines: chart.bar_lines.len(),
        span,
    })
}

/// Run the slicer for a clip. Blocks until it exits.
pub fn slice_clip(store: &ClipStore, clip: &str, request: &SliceRequest, detector: &impl Detector) -> Result<()> {
    detector.slice(request, &store.clip_dir(clip))?;
    store.load_metadata(clip)?;
    Ok(())
}

/// Run the note detector for a sliced clip and return the result.
pub fn detect_clip(
    store: &ClipStore,
    clip: &str,
    config: &ProjectConfig,
    detector: &impl Detector,
) -> Result<Chart> {
    detector.detect(&store.clip_dir(clip), &config.lane_ratios)?;
    let chart = store.load_chart(clip)?;
    log::info!(
        "detected {} notes and {} bar lines in '{}'",
        chart.notes.len(),
        chart.bar_lines.len(),
        clip
    );
    Ok(chart)
}
