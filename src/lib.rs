// Voxband - Voice to piano, bass and drum MIDI
// Module declarations

pub mod arranger;
pub mod audio;
pub mod config;
pub mod error;
pub mod notes;
pub mod pipeline;
pub mod pitch;

pub use arranger::{MidiExportOptions, Track, TrackCollection, TrackRole};
pub use config::TranscriptionConfig;
pub use error::{ErrorResponse, TranscribeError, TranscribeResult};
pub use notes::{NoteEvent, NoteSegment};
pub use pipeline::{transcribe, transcribe_wav, transcribe_with, Transcriber, Transcription};
pub use pitch::{PitchEstimator, PitchTrack};
