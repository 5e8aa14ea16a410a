// Note segmentation
// Groups consecutive voiced pitch frames into note segments using an
// equal-temperament band anchored at each segment's first frequency

use serde::{Deserialize, Serialize};

use super::types::NoteSegment;
use crate::error::{TranscribeError, TranscribeResult};
use crate::pitch::PitchTrack;

/// Equal-temperament semitone ratio, 2^(1/12)
pub const SEMITONE_RATIO: f64 = 1.059_463_094_359_295_3;

/// Segmenter options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Finalize a segment still open when the stream ends.
    /// Off by default: a trailing voiced run without a closing unvoiced frame is dropped.
    pub keep_trailing_segment: bool,
}

/// Segment under construction
#[derive(Debug, Default)]
struct OpenSegment {
    anchor: f64,
    half_tone: f64,
    frequencies: Vec<f64>,
    times: Vec<f64>,
}

impl OpenSegment {
    fn anchored(f: f64, t: f64, copies: usize) -> Self {
        OpenSegment {
            anchor: f,
            half_tone: f * (SEMITONE_RATIO - 1.0),
            frequencies: vec![f; copies],
            times: vec![t; copies],
        }
    }

    fn push(&mut self, f: f64, t: f64) {
        self.frequencies.push(f);
        self.times.push(t);
    }

    fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    fn finish(self) -> NoteSegment {
        NoteSegment {
            frequencies: self.frequencies,
            times: self.times,
        }
    }
}

/// Continuation test for a voiced frame inside an open segment.
/// Either side alone admits every frequency on its half of the band, so only
/// an unvoiced frame closes a segment in practice.
fn continues_segment(f: f64, anchor: f64, half_tone: f64) -> bool {
    f <= anchor + half_tone || f > anchor - half_tone
}

#[derive(Debug, Clone, Default)]
pub struct NoteSegmenter {
    config: SegmenterConfig,
}

impl NoteSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        NoteSegmenter { config }
    }

    pub fn segment_track(&self, track: &PitchTrack) -> TranscribeResult<Vec<NoteSegment>> {
        self.segment(&track.frequencies, &track.times)
    }

    /// Single forward pass over parallel frequency/time arrays.
    /// Non-positive (or NaN) frequencies are unvoiced.
    pub fn segment(&self, frequencies: &[f64], times: &[f64]) -> TranscribeResult<Vec<NoteSegment>> {
        if frequencies.len() != times.len() {
            return Err(TranscribeError::InvalidInput(format!(
                "pitch track has {} frequencies but {} timestamps",
                frequencies.len(),
                times.len()
            )));
        }

        let mut segments = Vec::new();
        let mut open: Option<OpenSegment> = None;

        for (&f, &t) in frequencies.iter().zip(times) {
            #[allow(clippy::neg_cmp_op_on_partial_ord)]
            let unvoiced = !(f > 0.0);

            if unvoiced {
                if let Some(segment) = open.take() {
                    if !segment.is_empty() {
                        segments.push(segment.finish());
                    }
                }
                continue;
            }

            open = match open.take() {
                None => Some(OpenSegment::anchored(f, t, 1)),
                Some(mut segment) if continues_segment(f, segment.anchor, segment.half_tone) => {
                    segment.push(f, t);
                    Some(segment)
                }
                Some(closed) => {
                    segments.push(closed.finish());
                    // The new segment starts with its anchor frame recorded twice
                    Some(OpenSegment::anchored(f, t, 2))
                }
            };
        }

        if let Some(segment) = open {
            if self.config.keep_trailing_segment && !segment.is_empty() {
                segments.push(segment.finish());
            } else if !segment.is_empty() {
                log::debug!("Dropping trailing open segment of {} frame(s)", segment.frequencies.len());
            }
        }

        if segments.is_empty() {
            return Err(TranscribeError::InsufficientSignal);
        }

        log::debug!("Segmented {} frame(s) into {} note(s)", frequencies.len(), segments.len());
        Ok(segments)
    }
}

/// Segment with the default configuration
pub fn segment_pitch_track(frequencies: &[f64], times: &[f64]) -> TranscribeResult<Vec<NoteSegment>> {
    NoteSegmenter::default().segment(frequencies, times)
}
