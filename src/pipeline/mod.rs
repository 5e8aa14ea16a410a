// Pipeline execution module
// Orchestrates waveform -> silence mask -> pitch track -> segments -> tracks

pub mod trace;

pub use trace::{read_trace_file, Stage, TraceEntry, TraceError, TraceWriter};

use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::arranger::{arrange_segments, export_collection, MidiExportOptions, TrackCollection};
use crate::audio::{ingest_wav, SilenceMasker, SilenceSpan};
use crate::config::TranscriptionConfig;
use crate::error::{TranscribeError, TranscribeResult};
use crate::notes::NoteSegmenter;
use crate::pitch::{PitchEstimator, YinEstimator};

/// Result of transcribing one recording
#[derive(Debug, Clone, Serialize)]
pub struct Transcription {
    pub run_id: Uuid,
    pub sample_rate: u32,
    pub tracks: TrackCollection,
    pub silence_spans: Vec<SilenceSpan>,
    pub frame_count: usize,
    pub voiced_frames: usize,
    pub segment_count: usize,
}

impl Transcription {
    /// Write `piano.mid`, `bass.mid` and `drum.mid` into `dir`
    pub fn export_midi(&self, dir: &Path, options: &MidiExportOptions) -> TranscribeResult<Vec<PathBuf>> {
        Ok(export_collection(&self.tracks, dir, options)?)
    }
}

/// Configured pipeline, generic over the pitch estimator
pub struct Transcriber<E = YinEstimator> {
    masker: SilenceMasker,
    estimator: E,
    segmenter: NoteSegmenter,
    trace: Option<TraceWriter>,
}

impl Transcriber<YinEstimator> {
    pub fn from_config(config: &TranscriptionConfig) -> TranscribeResult<Self> {
        let yin = YinEstimator::new(config.pitch.to_yin()?);
        Ok(Transcriber::with_estimator(config, yin))
    }
}

impl<E: PitchEstimator> Transcriber<E> {
    pub fn with_estimator(config: &TranscriptionConfig, estimator: E) -> Self {
        Transcriber {
            masker: SilenceMasker::new(config.silence.clone()),
            estimator,
            segmenter: NoteSegmenter::new(config.segmenter.clone()),
            trace: None,
        }
    }

    /// Record stage progress to a JSONL trace
    pub fn with_trace(mut self, writer: TraceWriter) -> Self {
        self.trace = Some(writer);
        self
    }

    /// Transcribe a mono waveform. Silent spans of `samples` are zeroed in place.
    pub fn transcribe(&self, samples: &mut [f32], sample_rate: u32) -> TranscribeResult<Transcription> {
        validate_waveform(samples, sample_rate)?;

        let run_id = self
            .trace
            .as_ref()
            .map(TraceWriter::run_id)
            .unwrap_or_else(Uuid::new_v4);

        log::info!(
            "Transcribing {:.2}s of audio at {} Hz (run {})",
            samples.len() as f64 / sample_rate as f64,
            sample_rate,
            run_id
        );

        self.trace(Stage::SilenceMasking, 0.0, "Masking silence", None);
        let silence_spans = self.masker.apply(samples);
        let silent_samples: usize = silence_spans.iter().map(SilenceSpan::len).sum();
        log::info!(
            "Masked {} silent span(s), {} of {} samples",
            silence_spans.len(),
            silent_samples,
            samples.len()
        );

        self.trace(Stage::PitchEstimation, 0.2, "Estimating pitch", None);
        let pitch = self.estimator.estimate(samples, sample_rate)?;
        let voiced_frames = pitch.voiced_count();
        log::info!("Pitch track: {} frames, {} voiced", pitch.len(), voiced_frames);

        self.trace(
            Stage::Segmentation,
            0.6,
            "Segmenting notes",
            Some(serde_json::json!({ "frames": pitch.len(), "voiced_frames": voiced_frames })),
        );
        let segments = match self.segmenter.segment_track(&pitch) {
            Ok(segments) => segments,
            Err(e) => {
                self.trace(Stage::Segmentation, 1.0, e.to_string(), None);
                return Err(e);
            }
        };
        log::info!("Found {} note segment(s)", segments.len());

        let tracks = arrange_segments(&segments);
        self.trace(
            Stage::Arrangement,
            1.0,
            format!("Arranged {} segment(s)", segments.len()),
            Some(serde_json::json!({
                "piano_notes": tracks.piano.notes.len(),
                "bass_notes": tracks.bass.notes.len(),
                "drum_notes": tracks.drum.notes.len(),
            })),
        );

        Ok(Transcription {
            run_id,
            sample_rate,
            tracks,
            silence_spans,
            frame_count: pitch.len(),
            voiced_frames,
            segment_count: segments.len(),
        })
    }

    fn trace(&self, stage: Stage, progress: f32, message: impl Into<String>, data: Option<serde_json::Value>) {
        if let Some(ref writer) = self.trace {
            if let Err(e) = writer.record(stage, progress, message, data) {
                log::warn!("Failed to write trace entry: {}", e);
            }
        }
    }
}

fn validate_waveform(samples: &[f32], sample_rate: u32) -> TranscribeResult<()> {
    if samples.is_empty() {
        return Err(TranscribeError::InvalidInput("waveform is empty".to_string()));
    }
    if sample_rate == 0 {
        return Err(TranscribeError::InvalidInput(
            "sample rate must be positive".to_string(),
        ));
    }
    if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
        return Err(TranscribeError::InvalidInput(format!(
            "sample {} is not a finite number",
            index
        )));
    }
    Ok(())
}

/// Transcribe with the default YIN estimator
pub fn transcribe(
    samples: &mut [f32],
    sample_rate: u32,
    config: &TranscriptionConfig,
) -> TranscribeResult<Transcription> {
    Transcriber::from_config(config)?.transcribe(samples, sample_rate)
}

/// Transcribe with any pitch estimator in place of YIN
pub fn transcribe_with<E: PitchEstimator>(
    estimator: E,
    samples: &mut [f32],
    sample_rate: u32,
    config: &TranscriptionConfig,
) -> TranscribeResult<Transcription> {
    Transcriber::with_estimator(config, estimator).transcribe(samples, sample_rate)
}

/// Decode WAV bytes, downmix to mono and transcribe
pub fn transcribe_wav(bytes: &[u8], config: &TranscriptionConfig) -> TranscribeResult<Transcription> {
    let audio = ingest_wav(bytes)?;
    let mut mono = audio.to_mono();
    transcribe(&mut mono, audio.sample_rate, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::{PitchError, PitchTrack};
    use tempfile::TempDir;

    /// Replays a fixed pitch track regardless of the waveform
    struct FixedEstimator(PitchTrack);

    impl PitchEstimator for FixedEstimator {
        fn estimate(&self, _samples: &[f32], _sample_rate: u32) -> Result<PitchTrack, PitchError> {
            Ok(self.0.clone())
        }
    }

    fn loud_waveform() -> Vec<f32> {
        (0..22050)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 22050.0).sin())
            .collect()
    }

    #[test]
    fn test_fixed_track_single_note() {
        let track = PitchTrack::new(
            vec![220.0, 220.0, 220.0, 0.0, 0.0],
            vec![0.0, 0.1, 0.2, 0.3, 0.4],
        );
        let transcriber =
            Transcriber::with_estimator(&TranscriptionConfig::default(), FixedEstimator(track));

        let mut samples = loud_waveform();
        let result = transcriber.transcribe(&mut samples, 22050).unwrap();

        assert_eq!(result.segment_count, 1);
        assert_eq!(result.voiced_frames, 3);
        assert_eq!(result.tracks.piano.notes.len(), 1);

        let note = result.tracks.piano.notes[0];
        assert_eq!((note.pitch, note.start, note.end, note.velocity), (57, 0.0, 0.2, 100));
        assert_eq!(result.tracks.bass.notes, result.tracks.piano.notes);

        let drums: Vec<u8> = result.tracks.drum.notes.iter().map(|n| n.pitch).collect();
        assert_eq!(drums, vec![35, 42]);
    }

    #[test]
    fn test_unvoiced_track_is_insufficient_signal() {
        let track = PitchTrack::new(vec![0.0; 4], vec![0.0, 0.1, 0.2, 0.3]);
        let result = transcribe_with(
            FixedEstimator(track),
            &mut loud_waveform(),
            22050,
            &TranscriptionConfig::default(),
        );
        assert!(matches!(result, Err(TranscribeError::InsufficientSignal)));
    }

    #[test]
    fn test_silent_waveform_is_insufficient_signal() {
        let mut samples = vec![0.0; 22050];
        let result = transcribe(&mut samples, 22050, &TranscriptionConfig::default());
        assert!(matches!(result, Err(TranscribeError::InsufficientSignal)));
    }

    #[test]
    fn test_invalid_inputs() {
        let config = TranscriptionConfig::default();

        let result = transcribe(&mut [], 22050, &config);
        assert!(matches!(result, Err(TranscribeError::InvalidInput(_))));

        let result = transcribe(&mut [0.1, 0.2], 0, &config);
        assert!(matches!(result, Err(TranscribeError::InvalidInput(_))));

        let result = transcribe(&mut [0.1, f32::NAN], 22050, &config);
        assert!(matches!(result, Err(TranscribeError::InvalidInput(_))));
    }

    #[test]
    fn test_bad_note_range_is_pitch_error() {
        let mut config = TranscriptionConfig::default();
        config.pitch.fmax_note = "nope".to_string();

        let result = transcribe(&mut loud_waveform(), 22050, &config);
        assert!(matches!(result, Err(TranscribeError::Pitch(_))));
    }

    #[test]
    fn test_trace_records_stages() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("trace.jsonl");
        let run_id = Uuid::new_v4();

        let track = PitchTrack::new(vec![330.0, 330.0, 0.0], vec![0.0, 0.1, 0.2]);
        let transcriber =
            Transcriber::with_estimator(&TranscriptionConfig::default(), FixedEstimator(track))
                .with_trace(TraceWriter::new(&path, run_id));

        let result = transcriber.transcribe(&mut loud_waveform(), 22050).unwrap();
        assert_eq!(result.run_id, run_id);

        let entries = read_trace_file(&path).unwrap();
        let stages: Vec<Stage> = entries.iter().map(|e| e.stage).collect();
        assert_eq!(
            stages,
            vec![
                Stage::SilenceMasking,
                Stage::PitchEstimation,
                Stage::Segmentation,
                Stage::Arrangement,
            ]
        );
        assert_eq!(entries[3].data.as_ref().unwrap()["drum_notes"], 2);
    }
}
