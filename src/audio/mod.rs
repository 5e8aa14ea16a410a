// Audio processing module
// WAV ingestion and silence masking of the raw waveform

pub mod ingest;
pub mod silence;

pub use ingest::{ingest_wav, write_wav, AudioData, AudioError};
pub use silence::{detect_non_silent, mask_silence, silence_spans, SilenceConfig, SilenceMasker, SilenceSpan};
