// Note types
// Segments of voiced pitch frames and the note events derived from them

use serde::{Deserialize, Serialize};

/// Consecutive voiced frames judged to belong to one note
///
/// `frequencies` and `times` are parallel and never empty once finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSegment {
    pub frequencies: Vec<f64>,
    pub times: Vec<f64>,
}

impl NoteSegment {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Timestamp of the first frame
    pub fn start(&self) -> Option<f64> {
        self.times.first().copied()
    }

    /// Timestamp of the last frame
    pub fn end(&self) -> Option<f64> {
        self.times.last().copied()
    }

    /// Arithmetic mean of the raw frame frequencies
    pub fn mean_frequency(&self) -> Option<f64> {
        if self.frequencies.is_empty() {
            return None;
        }
        Some(self.frequencies.iter().sum::<f64>() / self.frequencies.len() as f64)
    }
}

/// A single note in one instrument track
///
/// Plain value: every track owns its own copies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI note number (0-127)
    pub pitch: u8,

    /// Start time in seconds
    pub start: f64,

    /// End time in seconds
    pub end: f64,

    /// MIDI velocity (0-127)
    pub velocity: u8,

    /// Percussion key rather than a pitched note
    pub is_drum: bool,
}

impl NoteEvent {
    pub fn new(pitch: u8, start: f64, end: f64, velocity: u8) -> Self {
        NoteEvent {
            pitch: pitch.min(127),
            start,
            end,
            velocity: velocity.min(127),
            is_drum: false,
        }
    }

    pub fn drum(key: u8, start: f64, end: f64, velocity: u8) -> Self {
        NoteEvent {
            is_drum: true,
            ..NoteEvent::new(key, start, end, velocity)
        }
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}
