//! Boundary with the external slicer and note detector.
//!
//! Both run out of process and deliver their results as files in the clip
//! directory: the slicer writes tiles plus `metadata.json`, the detector writes
//! `notes.json`. The engine never consumes partial output; a run either exits
//! successfully and its documents are read through the
//! [`ClipStore`](crate::ClipStore), or it is reported as a processing failure.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use crate::error::{ChartError, Result};

/// Slicer request: where to scan and how fast.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceRequest {
    pub video: PathBuf,
    /// Scan-line row in the source frame.
    pub scan_y: u32,
    pub x1: u32,
    pub x2: u32,
    pub start: Option<f64>,
    pub end: Option<f64>,
    /// Pixels per frame.
    pub speed: f64,
}

impl SliceRequest {
    pub fn validate(&self) -> Result<()> {
        if self.x2 <= self.x1 {
            return Err(ChartError::InvalidConfig(format!(
                "track bounds [{}, {}) are empty",
                self.x1, self.x2
            )));
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(ChartError::InvalidConfig(format!(
                "scan speed must be positive, got {}",
                self.speed
            )));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if end > 0.0 && end <= start {
                return Err(ChartError::InvalidConfig(format!(
                    "scan window ends ({}) before it starts ({})",
                    end, start
                )));
            }
        }
        Ok(())
    }
}

/// Detector tuning, from the project configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DetectorSettings {
    pub python: PathBuf,
    /// Directory holding `slit_scan.py` and `detect_notes.py`.
    pub scripts: PathBuf,
    pub threshold: u8,
    pub beats_per_bar: u32,
    pub bars_per_line: u32,
    pub chunk_size: u32,
    /// Slicer scroll speed, pixels per frame.
    pub speed: f64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            python: PathBuf::from("python3"),
            scripts: PathBuf::from("scripts"),
            threshold: 200,
            beats_per_bar: 4,
            bars_per_line: 1,
            chunk_size: 5000,
            speed: 10.0,
        }
    }
}

impl DetectorSettings {
    /// Beats between two detected bar lines.
    pub fn beats_per_line(&self) -> f64 {
        (self.beats_per_bar * self.bars_per_line) as f64
    }
}

/// Something that can slice a clip and detect notes in its tiles.
pub trait Detector {
    /// Produce tiles and the metadata document in `clip_dir`.
    fn slice(&self, request: &SliceRequest, clip_dir: &Path) -> Result<()>;

    /// Produce the notes document in `clip_dir` from its tiles.
    fn detect(&self, clip_dir: &Path, lane_ratios: &[f64]) -> Result<()>;
}

/// Runs the Python slicer/detector scripts as one-shot subprocesses.
#[derive(Debug, Clone)]
pub struct ScriptDetector {
    settings: DetectorSettings,
}

impl ScriptDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    pub fn slice_command(&self, request: &SliceRequest, clip_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.settings.python);
        cmd.arg(self.settings.scripts.join("slit_scan.py"))
            .arg("--video")
            .arg(&request.video)
            .arg("--output")
            .arg(clip_dir)
            .arg("--y")
            .arg(request.scan_y.to_string())
            .arg("--x1")
            .arg(request.x1.to_string())
            .arg("--x2")
            .arg(request.x2.to_string())
            .arg("--chunk-size")
            .arg(self.settings.chunk_size.to_string())
            .arg("--speed")
            .arg(request.speed.to_string());
        if let Some(start) = request.start {
            cmd.arg("--start").arg(start.to_string());
        }
        if let Some(end) = request.end {
            cmd.arg("--end").arg(end.to_string());
        }
        cmd
    }

    pub fn detect_command(&self, clip_dir: &Path, lane_ratios: &[f64]) -> Command {
        let ratios: Vec<String> = lane_ratios.iter().map(|r| r.to_string()).collect();
        let mut cmd = Command::new(&self.settings.python);
        cmd.arg(self.settings.scripts.join("detect_notes.py"))
            .arg("--input")
            .arg(clip_dir)
            .arg("--lanes")
            .arg(lane_ratios.len().to_string())
            .arg("--lane-ratios")
            .arg(ratios.join(","))
            .arg("--threshold")
            .arg(self.settings.threshold.to_string())
            .arg("--beats-per-bar")
            .arg(self.settings.beats_per_bar.to_string())
            .arg("--bars-per-line")
            .arg(self.settings.bars_per_line.to_string());
        cmd
    }

    fn run(mut cmd: Command, what: &str) -> Result<()> {
        log::debug!("running {}: {:?}", what, cmd);
        let output = cmd
            .output()
            .map_err(|e| ChartError::Processing(format!("could not start {}: {}", what, e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(ChartError::Processing(format!(
                "{} exited with {}: {}",
                what,
                output.status,
                detail.trim()
            )));
        }
        log::info!("{} finished", what);
        Ok(())
    }
}

impl Detector for ScriptDetector {
    fn slice(&self, request: &SliceRequest, clip_dir: &Path) -> Result<()> {
        request.validate()?;
        std::fs::create_dir_all(clip_dir)?;
        Self::run(self.slice_command(request, clip_dir), "slicer")
    }

    fn detect(&self, clip_dir: &Path, lane_ratios: &[f64]) -> Result<()> {
        if lane_ratios.is_empty() {
            return Err(ChartError::InvalidConfig(
                "lane ratios must not be empty".to_string(),
            ));
        }
        if !clip_dir.join(crate::store::METADATA_FILE).is_file() {
            return Err(ChartError::NotFound(format!(
                "metadata in {}; slice the clip first",
                clip_dir.display()
            )));
        }
        Self::run(self.detect_command(clip_dir, lane_ratios), "detector")
    }
}
