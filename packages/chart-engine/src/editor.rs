//! # Interactive Editing
//!
//! The editor keeps two coordinate systems reconciled:
//!
//! - **Storage space** - `(chunk_index, chunk_height, y)` on the tiled waterfall.
//!   This is what gets persisted.
//! - **Preview space** - a continuously scrolling view. A note's head is drawn
//!   `Δt * visual_speed` pixels above the hit line, where
//!   `Δt = (note.time + visual_offset) - now`.
//!
//! `visual_speed` (pixels per second of preview) is unrelated to the scan
//! `speed` (pixels per frame of waterfall). `visual_offset` is a display trim
//! only: it shifts what the user sees and clicks, and is subtracted back out
//! before anything is stored.
//!
//! Every edit goes preview → time → (optional grid snap) → storage through the
//! [`Timeline`], never by writing preview coordinates into a note. The note
//! collection stays sorted by time with fresh caches after every operation.
//!
//! Rendering a frame ([`Editor::visible_notes`]) only reads; the host can call it
//! on every redraw and stop whenever playback pauses.

use serde::Deserialize;

use crate::document::Note;
use crate::error::{ChartError, Result};
use crate::grid::BeatGrid;
use crate::lanes::LanePartition;
use crate::timeline::{ScanParams, Timeline};

/// Preview settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Viewport {
    /// Preview scroll rate, pixels per second.
    pub visual_speed: f64,
    /// Display trim in seconds, positive draws notes later.
    pub visual_offset: f64,
    /// Screen row of the hit line.
    pub hit_line: f64,
    /// Hit-test slack around a note's box, pixels.
    pub tolerance: f64,
    /// Drawn length of notes with no (or a tiny) extent, pixels.
    pub min_note_length: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            visual_speed: 600.0,
            visual_offset: 0.0,
            hit_line: 600.0,
            tolerance: 8.0,
            min_note_length: 6.0,
        }
    }
}

impl Viewport {
    pub fn validate(&self) -> Result<()> {
        if !self.visual_speed.is_finite() || self.visual_speed <= 0.0 {
            return Err(ChartError::InvalidConfig(format!(
                "preview visual speed must be positive, got {}",
                self.visual_speed
            )));
        }
        if !self.visual_offset.is_finite() || !self.hit_line.is_finite() {
            return Err(ChartError::InvalidConfig(
                "preview offset and hit line must be finite".to_string(),
            ));
        }
        if !(self.tolerance >= 0.0) || !(self.min_note_length >= 0.0) {
            return Err(ChartError::InvalidConfig(
                "preview tolerance and minimum note length must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// One note as drawn in a preview frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewNote {
    /// Index into [`Editor::notes`].
    pub index: usize,
    pub lane: usize,
    pub x_start: f64,
    pub x_end: f64,
    /// Screen row of the note's onset.
    pub head_y: f64,
    /// Drawn extent upward from `head_y`.
    pub length: f64,
}

#[derive(Debug, Clone)]
pub struct Editor {
    timeline: Timeline,
    grid: BeatGrid,
    lanes: LanePartition,
    viewport: Viewport,
    notes: Vec<Note>,
}

impl Editor {
    pub fn new(
        params: ScanParams,
        grid: BeatGrid,
        lanes: LanePartition,
        viewport: Viewport,
        notes: Vec<Note>,
    ) -> Result<Self> {
        viewport.validate()?;
        let timeline = Timeline::for_notes(params, &notes)?;
        let mut editor = Self {
            timeline,
            grid,
            lanes,
            viewport,
            notes,
        };
        for note in &mut editor.notes {
            editor.timeline.refresh(note);
        }
        editor.sort();
        Ok(editor)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Copy of the collection, for export while editing continues.
    pub fn snapshot(&self) -> Vec<Note> {
        self.notes.clone()
    }

    pub fn into_notes(self) -> Vec<Note> {
        self.notes
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn grid(&self) -> &BeatGrid {
        &self.grid
    }

    pub fn set_grid(&mut self, grid: BeatGrid) {
        self.grid = grid;
    }

    pub fn lanes(&self) -> &LanePartition {
        &self.lanes
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_visual_offset(&mut self, seconds: f64) {
        if seconds.is_finite() {
            self.viewport.visual_offset = seconds;
        }
    }

    // --- preview-space math ---

    /// Pixels between the hit line and the note head (positive = above).
    pub fn screen_offset(&self, note: &Note, now: f64) -> f64 {
        let dt = (self.timeline.note_time(note) + self.viewport.visual_offset) - now;
        dt * self.viewport.visual_speed
    }

    pub fn head_y(&self, note: &Note, now: f64) -> f64 {
        self.viewport.hit_line - self.screen_offset(note, now)
    }

    /// `Δt` of a screen row.
    pub fn dt_at(&self, screen_y: f64) -> f64 {
        (self.viewport.hit_line - screen_y) / self.viewport.visual_speed
    }

    /// Stored time that a click on `screen_y` refers to.
    pub fn time_at(&self, screen_y: f64, now: f64) -> f64 {
        now + self.dt_at(screen_y) - self.viewport.visual_offset
    }

    pub fn rendered_length(&self, note: &Note) -> f64 {
        let seconds = note
            .extent()
            .map(|h| self.timeline.seconds_for_pixels(h))
            .unwrap_or(0.0);
        (seconds * self.viewport.visual_speed).max(self.viewport.min_note_length)
    }

    // --- edits ---

    /// Add a note where the user clicked. Returns its index.
    pub fn add_at(&mut self, x: f64, screen_y: f64, now: f64, quantize: bool) -> Result<usize> {
        let lane = self.lanes.lane_of(x).ok_or_else(|| {
            ChartError::OutOfRange(format!("x = {} is outside the lane track", x))
        })?;
        let time = self.time_at(screen_y, now);
        self.add_note(time, lane, quantize)
    }

    /// Add a note at stored time `time` on `lane`. Returns its index.
    pub fn add_note(&mut self, time: f64, lane: usize, quantize: bool) -> Result<usize> {
        if lane >= self.lanes.len() {
            return Err(ChartError::OutOfRange(format!(
                "lane {} does not exist ({} lanes)",
                lane,
                self.lanes.len()
            )));
        }
        let g = self.snap(self.global_for(time)?, quantize);
        let mut note = Note::new(self.timeline.position_at_global(g), lane);
        self.timeline.refresh(&mut note);
        log::debug!(
            "added note on lane {} at {:.4}s (chunk {}, y {:.2})",
            lane,
            note.time.unwrap_or(time),
            note.chunk_index,
            note.y
        );
        Ok(self.insert(note))
    }

    /// Index of the note under the cursor, preferring the one whose head is
    /// closest to the click.
    pub fn hit_test(&self, x: f64, screen_y: f64, now: f64) -> Option<usize> {
        let lane = self.lanes.lane_of(x)?;
        let tolerance = self.viewport.tolerance;

        self.notes
            .iter()
            .enumerate()
            .filter(|(_, note)| note.lane == lane)
            .filter_map(|(index, note)| {
                let head = self.head_y(note, now);
                let tail = head - self.rendered_length(note);
                if screen_y >= tail - tolerance && screen_y <= head + tolerance {
                    Some((index, (screen_y - head).abs()))
                } else {
                    None
                }
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// Remove the note under the cursor, if any.
    pub fn delete_at(&mut self, x: f64, screen_y: f64, now: f64) -> Option<Note> {
        let index = self.hit_test(x, screen_y, now)?;
        let note = self.notes.remove(index);
        log::debug!("deleted note on lane {} at index {}", note.lane, index);
        Some(note)
    }

    pub fn remove(&mut self, index: usize) -> Result<Note> {
        self.check_index(index)?;
        Ok(self.notes.remove(index))
    }

    /// Move a note by `dy` screen pixels (positive = down = earlier) and,
    /// when `x` lands on a lane, onto that lane. Returns the new index.
    pub fn drag(&mut self, index: usize, dy: f64, x: Option<f64>, quantize: bool) -> Result<usize> {
        self.check_index(index)?;
        let note = &self.notes[index];
        let time = self.timeline.note_time(note) - dy / self.viewport.visual_speed;
        let lane = x.and_then(|x| self.lanes.lane_of(x)).unwrap_or(note.lane);
        let g = self.snap(self.global_for(time)?, quantize);

        let mut moved = self.notes.remove(index);
        moved.lane = lane;
        self.timeline.relocate(&mut moved, g);
        Ok(self.insert(moved))
    }

    /// Snap one note to the beat grid. Returns its new index.
    pub fn quantize_note(&mut self, index: usize) -> Result<usize> {
        self.check_index(index)?;
        let mut note = self.notes.remove(index);
        let g = self.grid.quantize(self.timeline.note_global(&note));
        self.timeline.relocate(&mut note, g);
        Ok(self.insert(note))
    }

    /// Snap every note to the beat grid. Returns how many moved.
    pub fn quantize_all(&mut self) -> usize {
        let mut moved = 0;
        for note in &mut self.notes {
            let g = self.timeline.note_global(note);
            let snapped = self.grid.quantize(g);
            if snapped != g {
                moved += 1;
            }
            self.timeline.relocate(note, snapped);
        }
        self.sort();
        log::info!("quantized {} of {} notes", moved, self.notes.len());
        moved
    }

    /// Notes intersecting a viewport `height` pixels tall at playback time `now`.
    pub fn visible_notes(&self, now: f64, height: f64) -> Vec<PreviewNote> {
        self.notes
            .iter()
            .enumerate()
            .filter_map(|(index, note)| {
                let (x_start, x_end) = self.lanes.bounds(note.lane)?;
                let head_y = self.head_y(note, now);
                let length = self.rendered_length(note);
                if head_y < 0.0 || head_y - length > height {
                    return None;
                }
                Some(PreviewNote {
                    index,
                    lane: note.lane,
                    x_start,
                    x_end,
                    head_y,
                    length,
                })
            })
            .collect()
    }

    // --- internals ---

    fn global_for(&self, time: f64) -> Result<f64> {
        let g = self.timeline.global_at_time(time);
        if !g.is_finite() || g < 0.0 {
            return Err(ChartError::OutOfRange(format!(
                "{:.4}s is before the first sampled row ({:.4}s)",
                time,
                self.timeline.params().start_time
            )));
        }
        Ok(g)
    }

    fn snap(&self, g: f64, quantize: bool) -> f64 {
        if quantize {
            self.grid.quantize(g)
        } else {
            g
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.notes.len() {
            return Err(ChartError::OutOfRange(format!(
                "note index {} (collection has {})",
                index,
                self.notes.len()
            )));
        }
        Ok(())
    }

    fn sort_key(&self, note: &Note) -> (f64, usize) {
        (self.timeline.note_time(note), note.lane)
    }

    fn sort(&mut self) {
        let timeline = &self.timeline;
        self.notes.sort_by(|a, b| {
            let ka = (timeline.note_time(a), a.lane);
            let kb = (timeline.note_time(b), b.lane);
            ka.0.total_cmp(&kb.0).then(ka.1.cmp(&kb.1))
        });
    }

    fn insert(&mut self, note: Note) -> usize {
        let key = self.sort_key(&note);
        let index = self.notes.partition_point(|n| {
            let k = self.sort_key(n);
            k.0 < key.0 || (k.0 == key.0 && k.1 <= key.1)
        });
        self.notes.insert(index, note);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::timeline::ChunkPosition;

    /// 1200 px/s scan, 2000 px tiles; 4 lanes over [0, 400); preview 600 px/s
    /// with the hit line at y = 600; one bar every 4800 px (4 s).
    fn editor(notes: Vec<Note>) -> Editor {
        let params = ScanParams::new(60.0, 20.0, 2000.0, 0.0).unwrap();
        let grid = BeatGrid::new([0.0, 4800.0, 9600.0]);
        let lanes = LanePartition::uniform(0.0, 400.0, 4).unwrap();
        Editor::new(params, grid, lanes, Viewport::default(), notes).unwrap()
    }

    fn note(chunk_index: u32, y: f64, lane: usize) -> Note {
        Note::new(ChunkPosition { chunk_index, chunk_height: 2000.0, y }, lane)
    }

    #[test]
    fn test_new_sorts_and_fills_caches() {
        let ed = editor(vec![note(1, 1000.0, 0), note(0, 800.0, 2)]);
        assert_eq!(ed.notes()[0].lane, 2);
        assert_abs_diff_eq!(ed.notes()[0].time.unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ed.notes()[1].global_y.unwrap(), 3000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_preview_offset() {
        let ed = editor(vec![note(0, 800.0, 0)]);
        // note at 1 s, now 0.5 s: 0.5 s * 600 px/s above the hit line
        assert_abs_diff_eq!(ed.screen_offset(&ed.notes()[0], 0.5), 300.0, epsilon = 1e-9);
        assert_abs_diff_eq!(ed.head_y(&ed.notes()[0], 0.5), 300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_add_round_trips_through_storage() {
        let mut ed = editor(vec![]);
        // click 300 px above the hit line at now = 2 s -> 2.5 s
        let index = ed.add_at(150.0, 300.0, 2.0, false).unwrap();
        let added = &ed.notes()[index];
        assert_eq!(added.lane, 1);
        assert_eq!(added.chunk_index, 1);
        assert_abs_diff_eq!(added.y, 1000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(added.time.unwrap(), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_visual_offset_not_stored() {
        let mut ed = editor(vec![]);
        ed.set_visual_offset(0.25);
        let index = ed.add_at(50.0, 300.0, 2.0, false).unwrap();
        let stored = ed.notes()[index].time.unwrap();
        assert_abs_diff_eq!(stored, 2.25, epsilon = 1e-12);
        // and it is drawn back exactly where it was clicked
        assert_abs_diff_eq!(ed.head_y(&ed.notes()[index], 2.0), 300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_add_quantizes() {
        let mut ed = editor(vec![]);
        // 1.01 s = 1212 px -> nearest 25 px step is 1200 px = 1.0 s
        let index = ed.add_note(1.01, 3, true).unwrap();
        assert_abs_diff_eq!(ed.notes()[index].time.unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ed.notes()[index].y, 800.0, epsilon = 1e-9);
    }

    #[test]
    fn test_add_keeps_order() {
        let mut ed = editor(vec![note(0, 800.0, 0), note(1, 1000.0, 0)]);
        let index = ed.add_note(2.0, 1, false).unwrap();
        assert_eq!(index, 1);
        let times: Vec<f64> = ed.notes().iter().map(|n| n.time.unwrap()).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_add_rejects_outside_track_and_before_start() {
        let mut ed = editor(vec![]);
        assert!(matches!(ed.add_at(400.0, 300.0, 2.0, false), Err(ChartError::OutOfRange(_))));
        assert!(matches!(ed.add_note(-1.0, 0, false), Err(ChartError::OutOfRange(_))));
        assert!(matches!(ed.add_note(1.0, 4, false), Err(ChartError::OutOfRange(_))));
        assert!(ed.notes().is_empty());
    }

    #[test]
    fn test_delete_hits_nearest_in_lane() {
        let mut ed = editor(vec![note(0, 800.0, 0), note(0, 776.0, 0), note(0, 800.0, 1)]);
        // now = 1 s: first head on the hit line (600); second 20 ms later -> 12 px above
        let removed = ed.delete_at(10.0, 597.0, 1.0).unwrap();
        assert_eq!(removed.lane, 0);
        assert_abs_diff_eq!(removed.y, 800.0, epsilon = 1e-9);
        assert_eq!(ed.notes().len(), 2);
        assert!(ed.notes().iter().any(|n| n.lane == 1));
    }

    #[test]
    fn test_delete_misses() {
        let mut ed = editor(vec![note(0, 800.0, 0)]);
        assert!(ed.delete_at(10.0, 400.0, 1.0).is_none());
        assert!(ed.delete_at(150.0, 600.0, 1.0).is_none());
        assert_eq!(ed.notes().len(), 1);
    }

    #[test]
    fn test_hit_box_covers_extent() {
        // 240 px of waterfall = 0.2 s = 120 preview px
        let mut long = note(0, 800.0, 0);
        long.h = Some(240.0);
        let ed = editor(vec![long]);
        assert_eq!(ed.hit_test(10.0, 600.0 - 100.0, 1.0), Some(0));
        assert_eq!(ed.hit_test(10.0, 600.0 - 125.0, 1.0), Some(0));
        assert_eq!(ed.hit_test(10.0, 600.0 - 130.0, 1.0), None);
    }

    #[test]
    fn test_drag_moves_and_changes_lane() {
        let mut ed = editor(vec![note(0, 800.0, 0)]);
        // 300 px up = 0.5 s later
        let index = ed.drag(0, -300.0, Some(350.0), false).unwrap();
        let moved = &ed.notes()[index];
        assert_eq!(moved.lane, 3);
        assert_abs_diff_eq!(moved.time.unwrap(), 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(moved.y, 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_quantize_all() {
        let ed_notes = vec![note(0, 790.0, 0), note(0, 800.0, 1)];
        let mut ed = editor(ed_notes);
        assert_eq!(ed.quantize_all(), 1);
        for n in ed.notes() {
            assert_abs_diff_eq!(n.global_y.unwrap(), 1200.0, epsilon = 1e-9);
            assert_abs_diff_eq!(n.y, 800.0, epsilon = 1e-9);
        }
        assert_eq!(ed.notes()[0].lane, 0);
        assert_eq!(ed.notes()[1].lane, 1);
    }

    #[test]
    fn test_visible_notes() {
        let ed = editor(vec![note(0, 800.0, 0), note(2, 2000.0, 1), note(0, 800.0, 7)]);
        let frame = ed.visible_notes(1.0, 800.0);
        // second note is 2.33 s ahead = 1400 px above the hit line: off screen
        assert_eq!(frame.len(), 1);
        assert_eq!(frame[0].lane, 0);
        assert_eq!((frame[0].x_start, frame[0].x_end), (0.0, 100.0));
        assert_abs_diff_eq!(frame[0].head_y, 600.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bad_index() {
        let mut ed = editor(vec![]);
        assert!(matches!(ed.remove(0), Err(ChartError::OutOfRange(_))));
        assert!(matches!(ed.drag(0, 1.0, None, false), Err(ChartError::OutOfRange(_))));
        assert!(matches!(ed.quantize_note(0), Err(ChartError::OutOfRange(_))));
    }
}
