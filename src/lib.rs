//! Command implementations behind the `slitchart` binary.
//!
//! Arguments are parsed into an [`Invocation`] and executed by [`run`], which
//! returns the line to print on success.

pub mod error;

use std::fs;
use std::path::PathBuf;

use slitchart::{
    clip_info, detect_clip, export_clip, quantize_clip, set_bar_lines, set_bpm, slice_clip,
    ClipStore, ProjectConfig, ScriptDetector, SliceRequest,
};

pub use error::CliError;

pub const USAGE: &str = "\
Usage: slitchart [--store DIR] [--config FILE] <command> ...

Commands:
  info <clip>
  export <clip> [output.mid]
  quantize <clip>
  set-bpm <clip> <bpm>
  set-bar-lines <clip> <g1,g2,...>
  slice <clip> <video> <scan-y> <x1> <x2> [start] [end]
  detect <clip>";

pub const DEFAULT_STORE: &str = "data";
/// Looked up in the store root when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "slitchart.yaml";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Info { clip: String },
    Export { clip: String, output: Option<PathBuf> },
    Quantize { clip: String },
    SetBpm { clip: String, bpm: f64 },
    SetBarLines { clip: String, bar_lines: Vec<f64> },
    Slice { clip: String, request: SliceRequest },
    Detect { clip: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub store: PathBuf,
    pub config: Option<PathBuf>,
    pub command: Command,
}

/// Parse everything after the program name.
pub fn parse_args(args: &[String]) -> Result<Invocation, CliError> {
    let mut store = PathBuf::from(DEFAULT_STORE);
    let mut config = None;
    let mut rest = args;

    loop {
        match rest.first().map(String::as_str) {
            Some("--store") => {
                store = PathBuf::from(flag_value(rest, "--store")?);
                rest = &rest[2..];
            }
            Some("--config") => {
                config = Some(PathBuf::from(flag_value(rest, "--config")?));
                rest = &rest[2..];
            }
            _ => break,
        }
    }

    let (name, operands) = rest
        .split_first()
        .ok_or_else(|| CliError::Usage(USAGE.to_string()))?;
    let clip = operands
        .first()
        .cloned()
        .ok_or_else(|| CliError::Usage(format!("'{}' needs a clip name\n\n{}", name, USAGE)))?;
    let extra = &operands[1..];

    let command = match name.as_str() {
        "info" => Command::Info { clip },
        "export" => Command::Export {
            clip,
            output: extra.first().map(PathBuf::from),
        },
        "quantize" => Command::Quantize { clip },
        "set-bpm" => Command::SetBpm {
            clip,
            bpm: number(required(extra, 0, "bpm")?, "bpm")?,
        },
        "set-bar-lines" => Command::SetBarLines {
            clip,
            bar_lines: number_list(required(extra, 0, "bar lines")?)?,
        },
        "slice" => Command::Slice {
            clip,
            request: SliceRequest {
                video: PathBuf::from(required(extra, 0, "video")?),
                scan_y: number(required(extra, 1, "scan-y")?, "scan-y")?,
                x1: number(required(extra, 2, "x1")?, "x1")?,
                x2: number(required(extra, 3, "x2")?, "x2")?,
                start: extra.get(4).map(|s| number(s, "start")).transpose()?,
                end: extra.get(5).map(|s| number(s, "end")).transpose()?,
                // filled in from the detector settings
                speed: 0.0,
            },
        },
        "detect" => Command::Detect { clip },
        other => {
            return Err(CliError::Usage(format!("Unknown command '{}'\n\n{}", other, USAGE)));
        }
    };

    Ok(Invocation {
        store,
        config,
        command,
    })
}

fn flag_value<'a>(rest: &'a [String], flag: &str) -> Result<&'a str, CliError> {
    rest.get(1)
        .map(String::as_str)
        .ok_or_else(|| CliError::Usage(format!("{} needs a value", flag)))
}

fn required<'a>(extra: &'a [String], index: usize, what: &str) -> Result<&'a str, CliError> {
    extra
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| CliError::Usage(format!("missing {}\n\n{}", what, USAGE)))
}

fn number<T: std::str::FromStr>(value: &str, what: &str) -> Result<T, CliError> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Usage(format!("invalid {}: '{}'", what, value)))
}

fn number_list(value: &str) -> Result<Vec<f64>, CliError> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| number(part, "bar line"))
        .collect()
}

impl Invocation {
    fn load_config(&self) -> Result<ProjectConfig, CliError> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(|| self.store.join(DEFAULT_CONFIG_FILE));
        Ok(ProjectConfig::load(&path)?)
    }
}

/// Execute a parsed command. Returns the summary line for stdout.
pub fn run(invocation: &Invocation) -> Result<String, CliError> {
    let store = ClipStore::new(&invocation.store);
    let config = invocation.load_config()?;
    log::debug!("store {}, command {:?}", store.root().display(), invocation.command);

    match &invocation.command {
        Command::Info { clip } => {
            let info = clip_info(&store, clip, &config)?;
            let span = match info.span {
                Some((first, last)) => format!("{:.3}s - {:.3}s", first, last),
                None => "empty".to_string(),
            };
            Ok(format!(
                "{}: {} notes, {:.2} bpm ({:?}), {} bar lines, {}",
                clip, info.notes, info.bpm, info.tempo_source, info.bar_lines, span
            ))
        }
        Command::Export { clip, output } => {
            let export = export_clip(&store, clip, &config)?;
            let path = output
                .clone()
                .unwrap_or_else(|| store.clip_dir(clip).join(format!("{}.mid", clip)));
            fs::write(&path, &export.midi).map_err(|source| CliError::Write {
                path: path.display().to_string(),
                source,
            })?;
            if export.clamped > 0 {
                log::warn!("{} events were clamped to the start of the file", export.clamped);
            }
            Ok(format!(
                "Wrote {} notes at {:.2} bpm to {}",
                export.notes,
                export.bpm,
                path.display()
            ))
        }
        Command::Quantize { clip } => {
            let moved = quantize_clip(&store, clip, &config)?;
            Ok(format!("{}: quantized, {} notes moved", clip, moved))
        }
        Command::SetBpm { clip, bpm } => {
            set_bpm(&store, clip, *bpm)?;
            Ok(format!("{}: bpm set to {}", clip, bpm))
        }
        Command::SetBarLines { clip, bar_lines } => {
            set_bar_lines(&store, clip, bar_lines)?;
            Ok(format!("{}: {} bar lines stored", clip, bar_lines.len()))
        }
        Command::Slice { clip, request } => {
            let request = SliceRequest {
                speed: config.detector.speed,
                ..request.clone()
            };
            let detector = ScriptDetector::new(config.detector.clone());
            slice_clip(&store, clip, &request, &detector)?;
            Ok(format!("{}: sliced into {}", clip, store.clip_dir(clip).display()))
        }
        Command::Detect { clip } => {
            let detector = ScriptDetector::new(config.detector.clone());
            let chart = detect_clip(&store, clip, &config, &detector)?;
            Ok(format!(
                "{}: detected {} notes, {} bar lines",
                clip,
                chart.notes.len(),
                chart.bar_lines.len()
            ))
        }
    }
}
