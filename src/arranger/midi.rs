// MIDI Export - Convert instrument tracks to Standard MIDI Files using midly crate
// One file per track: a conductor track plus a single instrument track

use midly::{Header, MetaMessage, MidiMessage, Smf, Timing, Track as MidiTrack, TrackEvent, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::tracks::{Track, TrackCollection};

/// Percussion channel (channel 10, 0-indexed)
const DRUM_CHANNEL: u8 = 9;
const MELODIC_CHANNEL: u8 = 0;

/// Largest metrical division SMF headers can carry (15 bits)
const MAX_PPQ: u16 = 0x7FFF;

/// Largest tempo meta value (24 bits of microseconds per quarter)
const MAX_US_PER_QUARTER: f64 = 16_777_215.0;

#[derive(Debug, Error)]
pub enum MidiExportError {
    #[error("Failed to write MIDI: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid MIDI options: {0}")]
    InvalidOptions(String),
}

/// MIDI export options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiExportOptions {
    /// Pulses per quarter note
    pub ppq: u16,

    /// Fixed tempo used to place seconds on the tick grid
    pub bpm: f64,

    /// Include tempo metadata
    pub include_tempo: bool,

    /// Include track names
    pub track_names: bool,
}

impl Default for MidiExportOptions {
    fn default() -> Self {
        MidiExportOptions {
            ppq: 220,
            bpm: 120.0,
            include_tempo: true,
            track_names: true,
        }
    }
}

impl MidiExportOptions {
    /// Reject values the SMF header or tempo meta event cannot represent
    pub fn validate(&self) -> Result<(), MidiExportError> {
        if self.ppq == 0 || self.ppq > MAX_PPQ {
            return Err(MidiExportError::InvalidOptions(format!(
                "ppq must be between 1 and {}, got {}",
                MAX_PPQ, self.ppq
            )));
        }
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(MidiExportError::InvalidOptions(format!(
                "bpm must be a positive number, got {}",
                self.bpm
            )));
        }
        if (60_000_000.0 / self.bpm).round() > MAX_US_PER_QUARTER {
            return Err(MidiExportError::InvalidOptions(format!(
                "bpm {} is too slow for a MIDI tempo event",
                self.bpm
            )));
        }
        Ok(())
    }

    pub fn ticks_per_second(&self) -> f64 {
        self.ppq as f64 * self.bpm / 60.0
    }

    fn seconds_to_ticks(&self, seconds: f64) -> u32 {
        (seconds * self.ticks_per_second()).round().max(0.0) as u32
    }
}

/// Export one track to MIDI file bytes
pub fn export_track_midi(track: &Track, options: &MidiExportOptions) -> Result<Vec<u8>, MidiExportError> {
    options.validate()?;

    let header = Header {
        format: midly::Format::Parallel,
        timing: Timing::Metrical(options.ppq.into()),
    };

    let smf = Smf {
        header,
        tracks: vec![conductor_track(options), instrument_track(track, options)],
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| MidiExportError::Write(e.to_string()))?;

    Ok(bytes)
}

/// Write `<name>.mid` for every track in the collection into `dir`
pub fn export_collection(
    tracks: &TrackCollection,
    dir: &Path,
    options: &MidiExportOptions,
) -> Result<Vec<PathBuf>, MidiExportError> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for (_, track) in tracks.iter() {
        let path = dir.join(format!("{}.mid", track.name));
        let bytes = export_track_midi(track, options)?;
        std::fs::write(&path, bytes)?;
        log::info!(
            "Wrote {} ({} notes, {:.2}s)",
            path.display(),
            track.notes.len(),
            track.end_time()
        );
        written.push(path);
    }

    Ok(written)
}

/// Track 0: name and tempo
fn conductor_track<'a>(options: &MidiExportOptions) -> MidiTrack<'a> {
    let mut track = MidiTrack::new();

    if options.include_tempo {
        let us_per_quarter = (60_000_000.0 / options.bpm).round() as u32;
        track.push(TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter.into())),
        });
    }

    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    track
}

/// Sort rank at equal ticks: releases before new attacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventOrder {
    Setup,
    NoteOff,
    NoteOn,
}

fn instrument_track<'a>(track: &'a Track, options: &MidiExportOptions) -> MidiTrack<'a> {
    let channel = if track.is_drum { DRUM_CHANNEL } else { MELODIC_CHANNEL };
    let mut events: Vec<(u32, EventOrder, TrackEventKind<'a>)> = Vec::new();

    if options.track_names {
        events.push((
            0,
            EventOrder::Setup,
            TrackEventKind::Meta(MetaMessage::TrackName(track.name.as_bytes())),
        ));
    }

    events.push((
        0,
        EventOrder::Setup,
        TrackEventKind::Midi {
            channel: channel.into(),
            message: MidiMessage::ProgramChange {
                program: track.program.into(),
            },
        },
    ));

    for note in &track.notes {
        let tick_on = options.seconds_to_ticks(note.start);
        // Zero-length notes still get one tick so the release follows the attack
        let tick_off = options.seconds_to_ticks(note.end).max(tick_on + 1);

        events.push((
            tick_on,
            EventOrder::NoteOn,
            TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOn {
                    key: note.pitch.into(),
                    vel: note.velocity.into(),
                },
            },
        ));
        events.push((
            tick_off,
            EventOrder::NoteOff,
            TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOff {
                    key: note.pitch.into(),
                    vel: 0.into(),
                },
            },
        ));
    }

    events.sort_by_key(|(tick, order, _)| (*tick, *order));

    // Absolute ticks to deltas
    let mut midi_track = MidiTrack::new();
    let mut last_tick = 0;
    for (tick, _, kind) in events {
        midi_track.push(TrackEvent {
            delta: tick.saturating_sub(last_tick).into(),
            kind,
        });
        last_tick = tick;
    }

    midi_track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    midi_track
}
