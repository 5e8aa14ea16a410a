// Instrument tracks
// Owned note collections for the piano, bass and drum parts of a transcription

use serde::{Deserialize, Serialize};

use super::drum_pattern::assign_drums;
use super::emitter::emit_notes;
use crate::notes::{NoteEvent, NoteSegment};

/// General MIDI program 0, Acoustic Grand Piano
pub const PROGRAM_ACOUSTIC_GRAND_PIANO: u8 = 0;

/// Which part of the arrangement a track plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackRole {
    Piano,
    Bass,
    Drum,
}

impl TrackRole {
    pub const ALL: [TrackRole; 3] = [TrackRole::Piano, TrackRole::Bass, TrackRole::Drum];

    pub fn name(self) -> &'static str {
        match self {
            TrackRole::Piano => "piano",
            TrackRole::Bass => "bass",
            TrackRole::Drum => "drum",
        }
    }
}

/// One instrument and its notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,

    /// General MIDI program number
    pub program: u8,

    /// Played on the percussion channel
    pub is_drum: bool,

    pub notes: Vec<NoteEvent>,
}

impl Track {
    pub fn new(name: impl Into<String>, program: u8, is_drum: bool) -> Self {
        Track {
            name: name.into(),
            program,
            is_drum,
            notes: Vec::new(),
        }
    }

    pub fn for_role(role: TrackRole) -> Self {
        match role {
            TrackRole::Piano => Track::new(role.name(), PROGRAM_ACOUSTIC_GRAND_PIANO, false),
            TrackRole::Bass => Track::new(role.name(), 0, false),
            TrackRole::Drum => Track::new(role.name(), 0, true),
        }
    }

    pub fn add_note(&mut self, note: NoteEvent) {
        self.notes.push(note);
    }

    /// End time of the last sounding note in seconds
    pub fn end_time(&self) -> f64 {
        self.notes.iter().map(|n| n.end).fold(0.0, f64::max)
    }
}

/// The three parts produced for one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackCollection {
    pub piano: Track,
    pub bass: Track,
    pub drum: Track,
}

impl TrackCollection {
    pub fn new() -> Self {
        TrackCollection {
            piano: Track::for_role(TrackRole::Piano),
            bass: Track::for_role(TrackRole::Bass),
            drum: Track::for_role(TrackRole::Drum),
        }
    }

    pub fn get(&self, role: TrackRole) -> &Track {
        match role {
            TrackRole::Piano => &self.piano,
            TrackRole::Bass => &self.bass,
            TrackRole::Drum => &self.drum,
        }
    }

    /// Tracks in piano, bass, drum order
    pub fn iter(&self) -> impl Iterator<Item = (TrackRole, &Track)> + '_ {
        TrackRole::ALL.into_iter().map(move |role| (role, self.get(role)))
    }
}

impl Default for TrackCollection {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the piano, bass and drum tracks for a list of segments
pub fn arrange_segments(segments: &[NoteSegment]) -> TrackCollection {
    let mut tracks = TrackCollection::new();

    for hit in assign_drums(segments) {
        tracks.drum.add_note(hit);
    }

    // NoteEvent is Copy: each track receives its own value
    for note in emit_notes(segments) {
        tracks.piano.add_note(note);
        tracks.bass.add_note(note);
    }

    log::debug!(
        "Arranged {} piano, {} bass, {} drum note(s)",
        tracks.piano.notes.len(),
        tracks.bass.notes.len(),
        tracks.drum.notes.len()
    );

    tracks
}
