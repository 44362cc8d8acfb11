//! Lane to pitch mapping
//!
//! An explicit per-lane mapping always wins. Lanes without an entry fall back
//! to the configured scheme: chromatic (`base_pitch + lane`) or the General MIDI
//! drum kit for the first nine lanes.

use std::collections::BTreeMap;

use serde::Deserialize;

/// GM percussion keys for lanes 0..9: kick, snare, closed hat, open hat,
/// low tom, high tom, crash, ride, floor tom.
pub const GM_DRUM_MAP: [u8; 9] = [36, 38, 42, 46, 45, 48, 49, 51, 41];

/// Chromatic fallback base (C4).
pub const DEFAULT_BASE_PITCH: u8 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PitchScheme {
    #[default]
    Chromatic,
    Drums,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PitchMap {
    mapping: BTreeMap<usize, u8>,
    scheme: PitchScheme,
    base_pitch: u8,
}

impl Default for PitchMap {
    fn default() -> Self {
        Self::new(PitchScheme::Chromatic, DEFAULT_BASE_PITCH)
    }
}

impl PitchMap {
    pub fn new(scheme: PitchScheme, base_pitch: u8) -> Self {
        Self {
            mapping: BTreeMap::new(),
            scheme,
            base_pitch: base_pitch.min(127),
        }
    }

    pub fn with_mapping(mut self, mapping: BTreeMap<usize, u8>) -> Self {
        self.mapping = mapping
            .into_iter()
            .map(|(lane, pitch)| (lane, pitch.min(127)))
            .collect();
        self
    }

    pub fn scheme(&self) -> PitchScheme {
        self.scheme
    }

    /// # Example
    /// ```
    /// use std::collections::BTreeMap;
    /// use slitchart::{PitchMap, PitchScheme};
    ///
    /// let map = PitchMap::new(PitchScheme::Chromatic, 60)
    ///     .with_mapping(BTreeMap::from([(2, 38)]));
    /// assert_eq!(map.pitch_of(0), 60);
    /// assert_eq!(map.pitch_of(2), 38);
    /// assert_eq!(map.pitch_of(3), 63);
    /// ```
    pub fn pitch_of(&self, lane: usize) -> u8 {
        if let Some(pitch) = self.mapping.get(&lane) {
            return *pitch;
        }
        if self.scheme == PitchScheme::Drums {
            if let Some(pitch) = GM_DRUM_MAP.get(lane) {
                return *pitch;
            }
        }
        (self.base_pitch as usize + lane).min(127) as u8
    }
}
