//! Lane partitioning of the scanned track span.
//!
//! A track interval `[x1, x2)` is split into N contiguous bands whose widths are
//! proportional to the configured lane ratios. Bands are half-open and
//! left-inclusive, so a point sitting exactly on a boundary belongs to the lane
//! that starts there.

use crate::error::{ChartError, Result};

/// Detector default when no ratios are configured.
pub const DEFAULT_LANE_COUNT: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct LanePartition {
    /// N + 1 edges; `edges[0] == x1` and `edges[N] == x2` exactly.
    edges: Vec<f64>,
}

impl LanePartition {
    /// Split `[x1, x2)` into bands weighted by `ratios`.
    ///
    /// # Example
    /// ```
    /// use slitchart::LanePartition;
    ///
    /// let lanes = LanePartition::new(0.0, 400.0, &[1.0, 2.0, 1.0]).unwrap();
    /// assert_eq!(lanes.bounds(1), Some((100.0, 300.0)));
    /// assert_eq!(lanes.lane_of(100.0), Some(1));
    /// assert_eq!(lanes.lane_of(400.0), None);
    /// ```
    pub fn new(x1: f64, x2: f64, ratios: &[f64]) -> Result<Self> {
        if ratios.is_empty() {
            return Err(ChartError::InvalidConfig(
                "lane ratios must not be empty".to_string(),
            ));
        }
        if let Some((lane, ratio)) = ratios
            .iter()
            .enumerate()
            .find(|(_, r)| !r.is_finite() || **r <= 0.0)
        {
            return Err(ChartError::InvalidConfig(format!(
                "lane {} has non-positive ratio {}",
                lane, ratio
            )));
        }
        if !x1.is_finite() || !x2.is_finite() || x2 <= x1 {
            return Err(ChartError::InvalidConfig(format!(
                "track interval [{}, {}) is empty",
                x1, x2
            )));
        }

        let total: f64 = ratios.iter().sum();
        let width = x2 - x1;
        let mut edges = Vec::with_capacity(ratios.len() + 1);
        let mut acc = 0.0;
        edges.push(x1);
        for ratio in &ratios[..ratios.len() - 1] {
            acc += ratio;
            edges.push(x1 + width * (acc / total));
        }
        edges.push(x2);

        Ok(Self { edges })
    }

    /// Equal-width lanes.
    pub fn uniform(x1: f64, x2: f64, count: usize) -> Result<Self> {
        Self::new(x1, x2, &vec![1.0; count])
    }

    pub fn len(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn span(&self) -> (f64, f64) {
        (self.edges[0], self.edges[self.edges.len() - 1])
    }

    /// Lane whose band contains `x`, or `None` outside the track.
    pub fn lane_of(&self, x: f64) -> Option<usize> {
        let (x1, x2) = self.span();
        if !(x >= x1 && x < x2) {
            return None;
        }
        let inner = &self.edges[1..self.edges.len() - 1];
        Some(inner.partition_point(|edge| *edge <= x))
    }

    /// `[start, end)` of a lane.
    pub fn bounds(&self, lane: usize) -> Option<(f64, f64)> {
        if lane >= self.len() {
            return None;
        }
        Some((self.edges[lane], self.edges[lane + 1]))
    }

    pub fn center(&self, lane: usize) -> Option<f64> {
        self.bounds(lane).map(|(a, b)| (a + b) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_widths_follow_ratios() {
        let lanes = LanePartition::new(10.0, 110.0, &[1.0, 1.5, 2.5]).unwrap();
        assert_eq!(lanes.len(), 3);
        let (a, b) = lanes.bounds(0).unwrap();
        assert_abs_diff_eq!(b - a, 20.0, epsilon = 1e-9);
        let (a, b) = lanes.bounds(1).unwrap();
        assert_abs_diff_eq!(b - a, 30.0, epsilon = 1e-9);
        let (a, b) = lanes.bounds(2).unwrap();
        assert_abs_diff_eq!(b - a, 50.0, epsilon = 1e-9);
        assert_eq!(lanes.span(), (10.0, 110.0));
    }

    #[test]
    fn test_boundary_belongs_to_next_lane() {
        let lanes = LanePartition::uniform(0.0, 90.0, 3).unwrap();
        assert_eq!(lanes.lane_of(0.0), Some(0));
        assert_eq!(lanes.lane_of(29.999), Some(0));
        assert_eq!(lanes.lane_of(30.0), Some(1));
        assert_eq!(lanes.lane_of(60.0), Some(2));
        assert_eq!(lanes.lane_of(89.999), Some(2));
    }

    #[test]
    fn test_outside_track() {
        let lanes = LanePartition::uniform(0.0, 90.0, 3).unwrap();
        assert_eq!(lanes.lane_of(-0.1), None);
        assert_eq!(lanes.lane_of(90.0), None);
        assert_eq!(lanes.lane_of(f64::NAN), None);
        assert_eq!(lanes.bounds(3), None);
    }

    #[test]
    fn test_rejects_degenerate_input() {
        assert!(matches!(
            LanePartition::new(0.0, 10.0, &[]),
            Err(ChartError::InvalidConfig(_))
        ));
        assert!(matches!(
            LanePartition::new(0.0, 10.0, &[1.0, 0.0]),
            Err(ChartError::InvalidConfig(_))
        ));
        assert!(matches!(
            LanePartition::new(0.0, 10.0, &[1.0, -2.0]),
            Err(ChartError::InvalidConfig(_))
        ));
        assert!(matches!(
            LanePartition::new(10.0, 10.0, &[1.0]),
            Err(ChartError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_single_lane_covers_track() {
        let lanes = LanePartition::new(5.0, 6.0, &[3.0]).unwrap();
        assert_eq!(lanes.lane_of(5.0), Some(0));
        assert_eq!(lanes.lane_of(5.99), Some(0));
        assert_eq!(lanes.center(0), Some(5.5));
    }
}
