//! Tick clock: seconds to musical ticks at a single fixed tempo.
//!
//! `ticks_per_second = PPQ * bpm / 60`, `tick = round(time * ticks_per_second)`.
//! Every sounding note lasts at least [`min_duration_ticks`] (a 1/32 note).

use crate::error::{ChartError, Result};

/// Pulses per quarter note of the exported timing file.
pub const PPQ: u16 = 128;

/// Tempo used when neither the notes document nor the user provides one.
pub const DEFAULT_BPM: f64 = 120.0;

/// Shortest sounding note, in ticks.
pub const fn min_duration_ticks() -> i64 {
    PPQ as i64 / 8
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickClock {
    bpm: f64,
}

impl TickClock {
    pub fn new(bpm: f64) -> Result<Self> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(ChartError::InvalidConfig(format!(
                "tempo must be a positive number of beats per minute, got {}",
                bpm
            )));
        }
        Ok(Self { bpm })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn ticks_per_second(&self) -> f64 {
        PPQ as f64 * self.bpm / 60.0
    }

    /// # Example
    /// ```
    /// use slitchart::TickClock;
    ///
    /// let clock = TickClock::new(120.0).unwrap();
    /// assert_eq!(clock.ticks_per_second(), 256.0);
    /// assert_eq!(clock.tick_at(1.0), 256);
    /// ```
    pub fn tick_at(&self, time: f64) -> i64 {
        (time * self.ticks_per_second()).round() as i64
    }

    /// Ticks for a span of `seconds`, floored at [`min_duration_ticks`].
    pub fn duration_ticks(&self, seconds: f64) -> i64 {
        let ticks = (seconds * self.ticks_per_second()).round() as i64;
        ticks.max(min_duration_ticks())
    }

    /// Tempo as microseconds per quarter note, the unit of the tempo meta event.
    pub fn micros_per_quarter(&self) -> u32 {
        (60_000_000.0 / self.bpm).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_per_second() {
        assert_eq!(TickClock::new(120.0).unwrap().ticks_per_second(), 256.0);
        assert_eq!(TickClock::new(60.0).unwrap().ticks_per_second(), 128.0);
    }

    #[test]
    fn test_tick_rounds_to_nearest() {
        let clock = TickClock::new(120.0).unwrap();
        assert_eq!(clock.tick_at(0.0), 0);
        assert_eq!(clock.tick_at(1.0), 256);
        assert_eq!(clock.tick_at(1.0 / 256.0 * 10.4), 10);
        assert_eq!(clock.tick_at(1.0 / 256.0 * 10.6), 11);
        assert_eq!(clock.tick_at(-0.5), -128);
    }

    #[test]
    fn test_duration_floor() {
        let clock = TickClock::new(120.0).unwrap();
        assert_eq!(min_duration_ticks(), 16);
        assert_eq!(clock.duration_ticks(0.0), 16);
        assert_eq!(clock.duration_ticks(0.01), 16);
        assert_eq!(clock.duration_ticks(0.5), 128);
    }

    #[test]
    fn test_tempo_meta_value() {
        assert_eq!(TickClock::new(120.0).unwrap().micros_per_quarter(), 500_000);
        assert_eq!(TickClock::new(90.0).unwrap().micros_per_quarter(), 666_667);
    }

    #[test]
    fn test_rejects_bad_tempo() {
        assert!(TickClock::new(0.0).is_err());
        assert!(TickClock::new(-120.0).is_err());
        assert!(TickClock::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_deterministic() {
        let a = TickClock::new(137.5).unwrap();
        let b = TickClock::new(137.5).unwrap();
        for i in 0..1000 {
            let t = i as f64 * 0.0137;
            assert_eq!(a.tick_at(t), b.tick_at(t));
        }
    }
}
