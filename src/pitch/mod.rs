// Pitch estimation module
// Frame-wise fundamental frequency tracking and pitch unit conversions

pub mod convert;
pub mod yin;

pub use convert::{hz_to_midi, midi_to_hz, note_to_hz, note_to_midi, quantize_midi};
pub use yin::{YinConfig, YinEstimator};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PitchError {
    #[error("Invalid note name: {0}")]
    InvalidNoteName(String),

    #[error("Invalid frequency range: fmin={fmin} Hz, fmax={fmax} Hz")]
    InvalidRange { fmin: f64, fmax: f64 },

    #[error("Invalid framing: frame_length={frame_length}, hop_length={hop_length}")]
    InvalidFrame {
        frame_length: usize,
        hop_length: usize,
    },

    #[error("Sample rate must be positive")]
    InvalidSampleRate,

    #[error("FFT failed: {0}")]
    Fft(String),
}

/// Per-frame fundamental frequency estimate
///
/// `frequencies[i]` is in Hz, or non-positive for an unvoiced frame.
/// `times[i]` is the frame center in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PitchTrack {
    pub frequencies: Vec<f64>,
    pub times: Vec<f64>,
}

impl PitchTrack {
    pub fn new(frequencies: Vec<f64>, times: Vec<f64>) -> Self {
        PitchTrack { frequencies, times }
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Number of frames with a positive frequency
    pub fn voiced_count(&self) -> usize {
        self.frequencies.iter().filter(|&&f| f > 0.0).count()
    }
}

/// Source of a per-frame f0 estimate for a mono waveform
pub trait PitchEstimator {
    fn estimate(&self, samples: &[f32], sample_rate: u32) -> Result<PitchTrack, PitchError>;
}

/// Center time in seconds of each of `n_frames` frames spaced `hop_length` apart
pub fn frame_times(n_frames: usize, hop_length: usize, sample_rate: u32) -> Vec<f64> {
    if sample_rate == 0 {
        return vec![0.0; n_frames];
    }
    (0..n_frames)
        .map(|i| (i * hop_length) as f64 / sample_rate as f64)
        .collect()
}
