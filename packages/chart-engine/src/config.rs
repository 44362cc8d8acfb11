//! Project configuration.
//!
//! A small YAML file, kebab-case keys, everything optional:
//!
//! ```yaml
//! track: { x1: 600, x2: 1320 }
//! lane-ratios: [1, 1, 1.5, 1, 1, 1, 1, 1, 1]
//! lane-mapping: { 0: 36, 1: 38 }
//! pitch-scheme: drums
//! program: 0
//! preview:
//!   visual-speed: 800
//!   hit-line: 700
//! quantize-on-add: true
//! detector:
//!   threshold: 180
//!   bars-per-line: 2
//! ```
//!
//! The file is read into [`RawConfig`] as written and then checked into a
//! [`ProjectConfig`]. A missing file means defaults.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::detector::DetectorSettings;
use crate::document::ScanMetadata;
use crate::editor::Viewport;
use crate::error::{ChartError, Result};
use crate::lanes::{LanePartition, DEFAULT_LANE_COUNT};
use crate::midi::{ExportOptions, DRUM_CHANNEL};
use crate::synth::{PitchMap, PitchScheme, DEFAULT_BASE_PITCH};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RawConfig {
    pub track: Option<RawTrack>,
    pub lane_ratios: Option<Vec<f64>>,
    pub lane_mapping: Option<BTreeMap<usize, u8>>,
    pub pitch_scheme: Option<PitchScheme>,
    pub base_pitch: Option<u8>,
    pub channel: Option<u8>,
    pub program: Option<u8>,
    pub preview: Option<Viewport>,
    pub quantize_on_add: Option<bool>,
    pub detector: Option<DetectorSettings>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct RawTrack {
    pub x1: f64,
    pub x2: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    /// Lane-track bounds; `None` defers to the clip's metadata.
    pub track: Option<(f64, f64)>,
    pub lane_ratios: Vec<f64>,
    pub pitches: PitchMap,
    pub export: ExportOptions,
    pub preview: Viewport,
    pub quantize_on_add: bool,
    pub detector: DetectorSettings,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            track: None,
            lane_ratios: vec![1.0; DEFAULT_LANE_COUNT],
            pitches: PitchMap::default(),
            export: ExportOptions::default(),
            preview: Viewport::default(),
            quantize_on_add: true,
            detector: DetectorSettings::default(),
        }
    }
}

impl ProjectConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawConfig = serde_yaml::from_str(content)
            .map_err(|e| ChartError::malformed("configuration", e))?;
        Self::from_raw(raw)
    }

    /// Load `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_raw(raw: RawConfig) -> Result<Self> {
        let track = match raw.track {
            Some(RawTrack { x1, x2 }) => {
                if !(x1.is_finite() && x2.is_finite()) || x2 <= x1 {
                    return Err(ChartError::InvalidConfig(format!(
                        "track bounds [{}, {}) are empty",
                        x1, x2
                    )));
                }
                Some((x1, x2))
            }
            None => None,
        };

        let lane_ratios = raw
            .lane_ratios
            .unwrap_or_else(|| vec![1.0; DEFAULT_LANE_COUNT]);
        // Same checks as the partition itself, on a dummy track.
        LanePartition::new(0.0, 1.0, &lane_ratios)?;

        let scheme = raw.pitch_scheme.unwrap_or_default();
        let base_pitch = raw.base_pitch.unwrap_or(DEFAULT_BASE_PITCH);
        if base_pitch > 127 {
            return Err(ChartError::InvalidConfig(format!(
                "base pitch must be 0-127, got {}",
                base_pitch
            )));
        }
        let mapping = raw.lane_mapping.unwrap_or_default();
        if let Some((lane, pitch)) = mapping.iter().find(|(_, p)| **p > 127) {
            return Err(ChartError::InvalidConfig(format!(
                "lane {} maps to pitch {}, outside 0-127",
                lane, pitch
            )));
        }
        let pitches = PitchMap::new(scheme, base_pitch).with_mapping(mapping);

        let default_channel = match scheme {
            PitchScheme::Drums => DRUM_CHANNEL,
            PitchScheme::Chromatic => 0,
        };
        let export = ExportOptions {
            channel: raw.channel.unwrap_or(default_channel),
            program: raw.program.unwrap_or(0),
            ..ExportOptions::default()
        };
        export.validate()?;

        let preview = raw.preview.unwrap_or_default();
        preview.validate()?;

        let detector = raw.detector.unwrap_or_default();
        if detector.beats_per_bar == 0 || detector.bars_per_line == 0 || detector.chunk_size == 0 {
            return Err(ChartError::InvalidConfig(
                "detector beats-per-bar, bars-per-line and chunk-size must be positive".to_string(),
            ));
        }
        if !detector.speed.is_finite() || detector.speed <= 0.0 {
            return Err(ChartError::InvalidConfig(format!(
                "detector speed must be positive, got {}",
                detector.speed
            )));
        }

        Ok(Self {
            track,
            lane_ratios,
            pitches,
            export,
            preview,
            quantize_on_add: raw.quantize_on_add.unwrap_or(true),
            detector,
        })
    }

    /// Lane partition for a clip: configured track, else the slicer's, else
    /// the unit interval.
    pub fn lanes(&self, metadata: &ScanMetadata) -> Result<LanePartition> {
        let (x1, x2) = self.track.or_else(|| metadata.track()).unwrap_or((0.0, 1.0));
        LanePartition::new(x1, x2, &self.lane_ratios)
    }
}
