//! Standard MIDI File export.
//!
//! One track: track name, one tempo declaration, one program (instrument)
//! declaration on the export channel, then the onset/release stream and an
//! end-of-track marker. Timing is metrical at [`PPQ`] ticks per quarter note.

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};

use crate::error::{ChartError, Result};
use crate::synth::{EventKind, EventStream};
use crate::ticks::{TickClock, PPQ};

/// General MIDI percussion channel (channel 10, zero-based 9).
pub const DRUM_CHANNEL: u8 = 9;

const DEFAULT_VELOCITY: u8 = 100;
const MAX_DELTA: u32 = 0x0FFF_FFFF;
const MAX_TEMPO: u32 = 0x00FF_FFFF;

/// Channel and instrument of the exported track.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub channel: u8,
    pub program: u8,
    pub velocity: u8,
    pub track_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            channel: 0,
            program: 0,
            velocity: DEFAULT_VELOCITY,
            track_name: "chart".to_string(),
        }
    }
}

impl ExportOptions {
    pub fn validate(&self) -> Result<()> {
        if self.channel > 15 {
            return Err(ChartError::InvalidConfig(format!(
                "MIDI channel must be 0-15, got {}",
                self.channel
            )));
        }
        if self.program > 127 || self.velocity > 127 || self.velocity == 0 {
            return Err(ChartError::InvalidConfig(format!(
                "program must be 0-127 and velocity 1-127, got {} / {}",
                self.program, self.velocity
            )));
        }
        Ok(())
    }
}

/// Build the in-memory MIDI file for `stream`.
pub fn to_smf<'a>(stream: &EventStream, clock: &TickClock, options: &'a ExportOptions) -> Result<Smf<'a>> {
    options.validate()?;
    let channel = u4::new(options.channel);

    let mut track: Track<'a> = Vec::with_capacity(stream.len() + 4);
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(options.track_name.as_bytes())),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(clock.micros_per_quarter().min(MAX_TEMPO)))),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel,
            message: MidiMessage::ProgramChange {
                program: u7::new(options.program),
            },
        },
    });

    for event in &stream.events {
        let key = u7::new(event.pitch.min(127));
        let message = match event.kind {
            EventKind::Onset => MidiMessage::NoteOn {
                key,
                vel: u7::new(options.velocity),
            },
            EventKind::Release => MidiMessage::NoteOff { key, vel: u7::new(0) },
        };
        track.push(TrackEvent {
            delta: u28::new(event.delta.min(MAX_DELTA)),
            kind: TrackEventKind::Midi { channel, message },
        });
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    Ok(Smf {
        header: Header::new(Format::SingleTrack, Timing::Metrical(u15::new(PPQ))),
        tracks: vec![track],
    })
}

/// Encode `stream` as Standard MIDI File bytes.
pub fn write_midi(stream: &EventStream, clock: &TickClock, options: &ExportOptions) -> Result<Vec<u8>> {
    let smf = to_smf(stream, clock, options)?;
    let mut buffer = Vec::new();
    smf.write_std(&mut buffer)?;
    Ok(buffer)
}
