// Top-level transcription errors
// Wraps per-stage errors and maps them onto client-facing responses

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arranger::MidiExportError;
use crate::audio::AudioError;
use crate::pitch::PitchError;

#[derive(Debug, Error)]
pub enum TranscribeError {
    /// No note segment could be formed from the pitch stream
    #[error("volume of voice is too low to detect frequencies")]
    InsufficientSignal,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Pitch estimation error: {0}")]
    Pitch(#[from] PitchError),

    #[error("MIDI export error: {0}")]
    MidiExport(#[from] MidiExportError),
}

impl TranscribeError {
    /// HTTP-equivalent status for surfacing the error to a client
    pub fn status_code(&self) -> u16 {
        match self {
            TranscribeError::InsufficientSignal | TranscribeError::InvalidInput(_) => 400,
            // Undecodable, truncated or unsupported uploads
            TranscribeError::Audio(_) => 400,
            _ => 500,
        }
    }

    /// Whether the caller supplied something unusable (as opposed to an internal failure)
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

/// Structured error body handed to a request-handling layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub detail: String,
}

impl From<&TranscribeError> for ErrorResponse {
    fn from(error: &TranscribeError) -> Self {
        ErrorResponse {
            status: error.status_code(),
            detail: error.to_string(),
        }
    }
}

pub type TranscribeResult<T> = Result<T, TranscribeError>;
