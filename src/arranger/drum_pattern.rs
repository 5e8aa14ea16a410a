// Drum pattern assignment
// Cycles a fixed four-step kit pattern over successive note segments,
// taking only segment timing into account

use serde::{Deserialize, Serialize};

use crate::notes::{NoteEvent, NoteSegment};

/// General MIDI percussion key numbers
pub const MIDI_KICK: u8 = 35; // B0, acoustic bass drum
pub const MIDI_SNARE: u8 = 38; // D1, acoustic snare
pub const MIDI_CLOSED_HIHAT: u8 = 42; // F#1

/// Velocity for every drum hit
pub const DRUM_VELOCITY: u8 = 100;

/// Percussion voices used by the pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrumVoice {
    Kick,
    Snare,
    ClosedHihat,
}

impl DrumVoice {
    pub fn midi_note(self) -> u8 {
        match self {
            DrumVoice::Kick => MIDI_KICK,
            DrumVoice::Snare => MIDI_SNARE,
            DrumVoice::ClosedHihat => MIDI_CLOSED_HIHAT,
        }
    }
}

const PATTERN: [&[DrumVoice]; 4] = [
    &[DrumVoice::Kick, DrumVoice::ClosedHihat],
    &[DrumVoice::ClosedHihat],
    &[DrumVoice::Kick, DrumVoice::ClosedHihat, DrumVoice::Snare],
    &[DrumVoice::ClosedHihat],
];

/// Voices struck for the `counter`-th non-empty segment (zero-based)
pub fn drum_slot(counter: usize) -> &'static [DrumVoice] {
    PATTERN[counter % PATTERN.len()]
}

/// Drum hits for a run of segments, each spanning its segment's first to last timestamp
pub fn assign_drums(segments: &[NoteSegment]) -> Vec<NoteEvent> {
    let mut hits = Vec::new();

    for (counter, segment) in segments.iter().filter(|s| !s.is_empty()).enumerate() {
        let (start, end) = match (segment.start(), segment.end()) {
            (Some(start), Some(end)) => (start, end),
            _ => continue,
        };

        hits.extend(
            drum_slot(counter)
                .iter()
                .map(|voice| NoteEvent::drum(voice.midi_note(), start, end, DRUM_VELOCITY)),
        );
    }

    hits
}
