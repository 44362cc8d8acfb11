//! # Beat-Grid Quantizer
//!
//! Bar lines are global pixel positions marking the start of each bar. A
//! position is snapped to the nearest of [`SUBDIVISIONS`] equal steps of the bar
//! that contains it:
//!
//! ```text
//! fraction = (g - bar[i]) / (bar[i+1] - bar[i])
//! g'       = bar[i] + round(fraction * 192) / 192 * (bar[i+1] - bar[i])
//! ```
//!
//! 192 steps per bar resolve 1/48 of a beat in 4/4, which covers quarter,
//! eighth, triplet, sixteenth and 32nd grids at once.
//!
//! Positions before the first bar line, at or after the last one, or on a grid
//! with fewer than two lines are returned unchanged. Quantization only ever
//! moves a position; the note's lane is never touched.

/// Snap steps per bar.
pub const SUBDIVISIONS: u32 = 192;

/// Accepted spread of bar spacing around the median when estimating tempo.
const SPACING_TOLERANCE: (f64, f64) = (0.8, 1.2);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeatGrid {
    bar_lines: Vec<f64>,
}

impl BeatGrid {
    /// Build a grid from bar-line positions. Non-finite entries are dropped,
    /// the rest sorted and deduplicated.
    pub fn new(bar_lines: impl IntoIterator<Item = f64>) -> Self {
        let mut bar_lines: Vec<f64> = bar_lines.into_iter().filter(|g| g.is_finite()).collect();
        bar_lines.sort_by(f64::total_cmp);
        bar_lines.dedup();
        Self { bar_lines }
    }

    pub fn bar_lines(&self) -> &[f64] {
        &self.bar_lines
    }

    /// True when at least one full bar exists to snap into.
    pub fn is_usable(&self) -> bool {
        self.bar_lines.len() >= 2
    }

    /// Index `i` of the bar `[bar[i], bar[i+1])` containing `g`.
    pub fn bar_at(&self, g: f64) -> Option<usize> {
        let i = self.bar_lines.partition_point(|bar| *bar <= g).checked_sub(1)?;
        if i + 1 < self.bar_lines.len() {
            Some(i)
        } else {
            None
        }
    }

    /// Snap `g` onto the grid.
    ///
    /// # Example
    /// ```
    /// use slitchart::BeatGrid;
    ///
    /// let grid = BeatGrid::new([0.0, 4800.0]);
    /// assert_eq!(grid.quantize(1200.0), 1200.0);
    /// assert_eq!(grid.quantize(1210.0), 1200.0);
    /// assert_eq!(grid.quantize(-5.0), -5.0);
    /// ```
    pub fn quantize(&self, g: f64) -> f64 {
        let Some(i) = self.bar_at(g) else {
            return g;
        };
        let start = self.bar_lines[i];
        let width = self.bar_lines[i + 1] - start;
        start + snap_fraction((g - start) / width) * width
    }

    /// Estimate tempo from bar spacing.
    ///
    /// Spacings further than 20% from the median are treated as missed or
    /// doubled detections and ignored; the rest are averaged.
    pub fn estimate_bpm(&self, beats_per_line: f64, pixels_per_second: f64) -> Option<f64> {
        if !self.is_usable() || beats_per_line <= 0.0 || pixels_per_second <= 0.0 {
            return None;
        }
        let mut spacings: Vec<f64> = self.bar_lines.windows(2).map(|w| w[1] - w[0]).collect();
        spacings.sort_by(f64::total_cmp);
        let mid = spacings.len() / 2;
        let median = if spacings.len() % 2 == 0 {
            (spacings[mid - 1] + spacings[mid]) / 2.0
        } else {
            spacings[mid]
        };

        let (low, high) = SPACING_TOLERANCE;
        let kept: Vec<f64> = spacings
            .into_iter()
            .filter(|s| *s > low * median && *s < high * median)
            .collect();
        if kept.is_empty() {
            return None;
        }
        let mean = kept.iter().sum::<f64>() / kept.len() as f64;
        let seconds_per_line = mean / pixels_per_second;
        Some(60.0 / seconds_per_line * beats_per_line)
    }
}

/// Round a bar fraction to the nearest of [`SUBDIVISIONS`] steps.
pub fn snap_fraction(fraction: f64) -> f64 {
    let steps = SUBDIVISIONS as f64;
    (fraction * steps).round() / steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn test_quarter_boundary_unchanged() {
        let grid = BeatGrid::new([0.0, 4800.0]);
        assert_eq!(grid.quantize(1200.0), 1200.0);
    }

    #[test]
    fn test_snaps_to_nearest_step() {
        // 4800 / 192 = 25 px per step
        let grid = BeatGrid::new([0.0, 4800.0]);
        assert_abs_diff_eq!(grid.quantize(12.0), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(grid.quantize(13.0), 25.0, epsilon = 1e-9);
        assert_abs_diff_eq!(grid.quantize(4790.0), 4800.0, epsilon = 1e-9);
    }

    #[test]
    fn test_uses_enclosing_bar() {
        let grid = BeatGrid::new([1000.0, 2920.0, 4840.0]);
        assert_eq!(grid.bar_at(3000.0), Some(1));
        // 1920 / 192 = 10 px per step
        assert_abs_diff_eq!(grid.quantize(3004.0), 3000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(grid.quantize(3006.0), 3010.0, epsilon = 1e-9);
    }

    #[test]
    fn test_outside_grid_is_noop() {
        let grid = BeatGrid::new([1000.0, 2000.0]);
        assert_eq!(grid.quantize(999.0), 999.0);
        assert_eq!(grid.quantize(2000.0), 2000.0);
        assert_eq!(grid.quantize(2500.5), 2500.5);
        assert_eq!(BeatGrid::new([]).quantize(17.3), 17.3);
        assert_eq!(BeatGrid::new([5.0]).quantize(17.3), 17.3);
    }

    #[test]
    fn test_unsorted_input_is_normalized() {
        let grid = BeatGrid::new([3000.0, 1000.0, 2000.0, 2000.0, f64::NAN]);
        assert_eq!(grid.bar_lines(), &[1000.0, 2000.0, 3000.0]);
    }

    #[test]
    fn test_estimate_bpm_ignores_outliers() {
        // 1200 px/s; bars every 2400 px = 2 s per bar, 4 beats -> 120 bpm
        let grid = BeatGrid::new([0.0, 2400.0, 4800.0, 7200.0, 8400.0, 10800.0]);
        let bpm = grid.estimate_bpm(4.0, 1200.0).unwrap();
        assert_abs_diff_eq!(bpm, 120.0, epsilon = 1e-9);
    }

    #[test]
    fn test_estimate_bpm_needs_two_lines() {
        assert_eq!(BeatGrid::new([10.0]).estimate_bpm(4.0, 1200.0), None);
        assert_eq!(BeatGrid::new([0.0, 100.0]).estimate_bpm(4.0, 0.0), None);
    }

    proptest! {
        #[test]
        fn proptest_quantize_idempotent(g in -100.0f64..10_000.0) {
            let grid = BeatGrid::new([0.0, 1750.0, 3600.0, 5000.0, 9000.0]);
            let once = grid.quantize(g);
            let twice = grid.quantize(once);
            prop_assert!((once - twice).abs() < 1e-6);
        }

        #[test]
        fn proptest_fraction_on_grid(g in 0.0f64..4799.0) {
            let grid = BeatGrid::new([0.0, 4800.0]);
            let steps = grid.quantize(g) / 4800.0 * SUBDIVISIONS as f64;
            prop_assert!((steps - steps.round()).abs() < 1e-6);
            prop_assert!((0.0..=SUBDIVISIONS as f64).contains(&steps.round()));
        }
    }
}
