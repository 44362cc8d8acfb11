//! Integration tests for the chart engine
//!
//! Tests the full path from clip documents on disk through editing to MIDI bytes.

use std::fs;
use std::path::{Path, PathBuf};

use midly::{MidiMessage, Smf, TrackEventKind};
use slitchart::*;

const METADATA: &str = r#"{"fps": 60, "speed": 20, "chunk_size": 2000, "y": 900, "x1": 0, "x2": 900}"#;

fn temp_root(name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("slitchart-it-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).unwrap();
    root
}

fn seed(root: &Path, clip: &str, notes: &str) -> ClipStore {
    let dir = root.join(clip);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("metadata.json"), METADATA).unwrap();
    fs::write(dir.join("notes.json"), notes).unwrap();
    ClipStore::new(root)
}

/// (absolute tick, is onset, channel, key) for every note event.
fn note_events(bytes: &[u8]) -> Vec<(u32, bool, u8, u8)> {
    let smf = Smf::parse(bytes).unwrap();
    let mut tick = 0;
    let mut out = Vec::new();
    for event in &smf.tracks[0] {
        tick += event.delta.as_int();
        if let TrackEventKind::Midi { channel, message } = event.kind {
            match message {
                MidiMessage::NoteOn { key, .. } => out.push((tick, true, channel.as_int(), key.as_int())),
                MidiMessage::NoteOff { key, .. } => out.push((tick, false, channel.as_int(), key.as_int())),
                _ => {}
            }
        }
    }
    out
}

#[test]
fn test_open_edit_save_export() {
    let root = temp_root("edit");
    // legacy shape: 1.0 s on lane 0, 2.5 s on lane 4
    let store = seed(
        &root,
        "song",
        r#"[{"chunk_index": 1, "chunk_height": 2000, "lane": 4, "y": 1000},
            {"chunk_index": 0, "chunk_height": 2000, "lane": 0, "y": 800}]"#,
    );
    let config = ProjectConfig::default();

    let mut editor = open_editor(&store, "song", &config).unwrap();
    assert_eq!(editor.lanes().len(), 9);
    assert_eq!(editor.notes()[0].lane, 0);
    editor.add_note(2.0, 2, false).unwrap();
    save_editor(&store, "song", &editor).unwrap();

    let export = export_clip(&store, "song", &config).unwrap();
    assert_eq!(export.notes, 3);
    assert_eq!(export.bpm, 120.0);
    assert_eq!(export.tempo_source, TempoSource::Default);
    assert_eq!(export.clamped, 0);
    assert_eq!(
        note_events(&export.midi),
        vec![
            (256, true, 0, 60),
            (272, false, 0, 60),
            (512, true, 0, 62),
            (528, false, 0, 62),
            (640, true, 0, 64),
            (656, false, 0, 64),
        ]
    );

    // the store now holds the current shape with caches filled in
    let text = fs::read_to_string(root.join("song").join("notes.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["notes"].as_array().unwrap().len(), 3);
    assert!(value["notes"][0]["time"].is_number());
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_export_does_not_disturb_editor() {
    let root = temp_root("snapshot");
    let store = seed(&root, "song", r#"{"notes": [], "bpm": 150}"#);
    let config = ProjectConfig::default();

    let mut editor = open_editor(&store, "song", &config).unwrap();
    editor.add_note(0.5, 1, false).unwrap();
    let before = editor.snapshot();
    let timeline = editor.timeline().clone();
    let (bytes, _) = export_notes(&before, *timeline.params(), 150.0, &config).unwrap();
    assert!(!bytes.is_empty());
    assert_eq!(editor.notes(), before.as_slice());
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_drum_export() {
    let root = temp_root("drums");
    let store = seed(
        &root,
        "song",
        r#"{"notes": [{"chunk_index": 0, "chunk_height": 2000, "lane": 1, "y": 800, "type": "hit"}],
            "bpm": 120}"#,
    );
    let config = ProjectConfig::from_yaml("pitch-scheme: drums\n").unwrap();
    let export = export_clip(&store, "song", &config).unwrap();
    assert_eq!(export.tempo_source, TempoSource::Stored);
    assert_eq!(
        note_events(&export.midi),
        vec![(256, true, 9, 38), (272, false, 9, 38)]
    );
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_bar_lines_quantize_and_tempo() {
    let root = temp_root("grid");
    // 1210 px is 10 px past a 1/192 step of a 4800 px bar; 3000 px is on one
    let store = seed(
        &root,
        "song",
        r#"{"notes": [{"chunk_index": 0, "chunk_height": 2000, "lane": 1, "y": 790},
                      {"chunk_index": 1, "chunk_height": 2000, "lane": 2, "y": 1000}],
            "bpm": 0}"#,
    );
    let config = ProjectConfig::default();

    // without a grid nothing moves
    assert_eq!(quantize_clip(&store, "song", &config).unwrap(), 0);

    set_bar_lines(&store, "song", &[4800.0, 0.0]).unwrap();
    assert_eq!(store.load_chart("song").unwrap().bar_lines, vec![0.0, 4800.0]);
    assert_eq!(quantize_clip(&store, "song", &config).unwrap(), 1);

    let chart = store.load_chart("song").unwrap();
    assert_eq!(chart.notes[0].global_y, Some(1200.0));
    assert_eq!(chart.notes[0].y, 800.0);

    // one 4 s bar of 4 beats
    let info = clip_info(&store, "song", &config).unwrap();
    assert_eq!(info.tempo_source, TempoSource::Estimated);
    assert!((info.bpm - 60.0).abs() < 1e-9);
    assert_eq!(info.bar_lines, 2);
    let (first, last) = info.span.unwrap();
    assert!((first - 1.0).abs() < 1e-9);
    assert!((last - 2.5).abs() < 1e-9);

    set_bpm(&store, "song", 96.0).unwrap();
    let info = clip_info(&store, "song", &config).unwrap();
    assert_eq!(info.tempo_source, TempoSource::Stored);
    assert_eq!(info.bpm, 96.0);
    assert!(matches!(set_bpm(&store, "song", -1.0), Err(ChartError::InvalidConfig(_))));
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_absent_bpm_exports_at_default() {
    let root = temp_root("absent-bpm");
    let store = seed(
        &root,
        "song",
        r#"{"notes": [{"chunk_index": 0, "chunk_height": 2000, "lane": 0, "y": 800}],
            "bar_lines": [0, 1200, 2400]}"#,
    );
    let config = ProjectConfig::default();

    let export = export_clip(&store, "song", &config).unwrap();
    assert_eq!(export.bpm, 120.0);
    assert_eq!(export.tempo_source, TempoSource::Default);

    // the bar lines still drive quantization, and saving keeps the tempo absent
    quantize_clip(&store, "song", &config).unwrap();
    let info = clip_info(&store, "song", &config).unwrap();
    assert_eq!((info.bpm, info.tempo_source), (120.0, TempoSource::Default));
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_out_of_range_note_is_reported() {
    let root = temp_root("out-of-range");
    let store = seed(
        &root,
        "song",
        r#"[{"chunk_index": 0, "chunk_height": 2000, "lane": 0, "y": -1e300}]"#,
    );
    let config = ProjectConfig::default();
    assert!(matches!(
        export_clip(&store, "song", &config),
        Err(ChartError::MalformedDocument { .. })
    ));
    assert!(matches!(
        open_editor(&store, "song", &config),
        Err(ChartError::MalformedDocument { .. })
    ));
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_missing_clip() {
    let root = temp_root("missing");
    let store = ClipStore::new(&root);
    let config = ProjectConfig::default();
    assert!(matches!(open_editor(&store, "nope", &config), Err(ChartError::NotFound(_))));
    assert!(matches!(export_clip(&store, "nope", &config), Err(ChartError::NotFound(_))));
    let _ = fs::remove_dir_all(&root);
}

/// Writes canned documents instead of running the scripts.
struct CannedDetector;

impl Detector for CannedDetector {
    fn slice(&self, _request: &SliceRequest, clip_dir: &Path) -> Result<()> {
        fs::create_dir_all(clip_dir)?;
        fs::write(clip_dir.join("metadata.json"), METADATA)?;
        Ok(())
    }

    fn detect(&self, clip_dir: &Path, lane_ratios: &[f64]) -> Result<()> {
        let notes = format!(
            r#"{{"notes": [{{"chunk_index": 0, "chunk_height": 2000, "lane": {}, "y": 800}}],
                "bpm": 128, "bar_lines": [0, 4800]}}"#,
            lane_ratios.len() - 1
        );
        fs::write(clip_dir.join("notes.json"), notes)?;
        Ok(())
    }
}

#[test]
fn test_slice_then_detect() {
    let root = temp_root("detect");
    let store = ClipStore::new(&root);
    let config = ProjectConfig::default();
    let request = SliceRequest {
        video: PathBuf::from("clip.mp4"),
        scan_y: 900,
        x1: 0,
        x2: 900,
        start: None,
        end: None,
        speed: 20.0,
    };

    slice_clip(&store, "song", &request, &CannedDetector).unwrap();
    assert_eq!(store.clips().unwrap(), vec!["song".to_string()]);

    let chart = detect_clip(&store, "song", &config, &CannedDetector).unwrap();
    assert_eq!(chart.notes[0].lane, 8);
    assert_eq!(chart.bpm, Some(128.0));

    let editor = open_editor(&store, "song", &config).unwrap();
    assert!(editor.grid().is_usable());
    let _ = fs::remove_dir_all(&root);
}
