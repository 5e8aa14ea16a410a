// Silence masking
// Finds low-energy spans relative to the loudest frame and zeroes them so the
// pitch estimator never sees room noise as a voiced tone

use serde::{Deserialize, Serialize};

/// Smallest power considered when converting to decibels
const AMIN: f64 = 1e-10;

/// Configuration for non-silent region detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceConfig {
    /// Frames quieter than this many dB below the loudest frame are silent
    pub top_db: f64,

    /// Analysis frame length in samples
    pub frame_length: usize,

    /// Hop between analysis frames in samples
    pub hop_length: usize,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        SilenceConfig {
            top_db: 20.0,
            frame_length: 2048,
            hop_length: 512,
        }
    }
}

/// Half-open sample range `[start, end)` considered non-voiced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SilenceSpan {
    pub start: usize,
    pub end: usize,
}

impl SilenceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        SilenceSpan { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Detect non-silent regions as ascending `(start, end)` sample ranges
pub fn detect_non_silent(samples: &[f32], config: &SilenceConfig) -> Vec<(usize, usize)> {
    if samples.is_empty() || config.hop_length == 0 || config.frame_length == 0 {
        return Vec::new();
    }

    let power = frame_mean_square(samples, config.frame_length, config.hop_length);
    let peak = power.iter().copied().fold(0.0f64, f64::max);

    if peak <= 0.0 {
        return Vec::new();
    }

    let reference_db = 10.0 * peak.max(AMIN).log10();
    let non_silent: Vec<bool> = power
        .iter()
        .map(|&p| 10.0 * p.max(AMIN).log10() - reference_db > -config.top_db)
        .collect();

    let mut regions = Vec::new();
    let mut run_start: Option<usize> = None;

    for (frame, &loud) in non_silent.iter().enumerate() {
        match (loud, run_start) {
            (true, None) => run_start = Some(frame),
            (false, Some(start)) => {
                regions.push(frames_to_range(start, frame, config.hop_length, samples.len()));
                run_start = None;
            }
            _ => {}
        }
    }

    if let Some(start) = run_start {
        regions.push(frames_to_range(
            start,
            non_silent.len(),
            config.hop_length,
            samples.len(),
        ));
    }

    regions.retain(|(start, end)| start < end);
    regions
}

/// Mean square energy of centered, zero-padded frames
fn frame_mean_square(samples: &[f32], frame_length: usize, hop_length: usize) -> Vec<f64> {
    let pad = frame_length / 2;
    let n_frames = 1 + samples.len() / hop_length;

    // Prefix sums of squared samples make every frame O(1)
    let mut prefix = Vec::with_capacity(samples.len() + 1);
    prefix.push(0.0f64);
    let mut acc = 0.0f64;
    for &s in samples {
        acc += (s as f64) * (s as f64);
        prefix.push(acc);
    }

    (0..n_frames)
        .map(|frame| {
            // Frame covers padded indices [frame * hop, frame * hop + frame_length)
            let padded_start = frame * hop_length;
            let start = padded_start.saturating_sub(pad).min(samples.len());
            let end = (padded_start + frame_length)
                .saturating_sub(pad)
                .min(samples.len());
            (prefix[end] - prefix[start]).max(0.0) / frame_length as f64
        })
        .collect()
}

fn frames_to_range(start_frame: usize, end_frame: usize, hop: usize, len: usize) -> (usize, usize) {
    ((start_frame * hop).min(len), (end_frame * hop).min(len))
}

/// Complement of the non-silent regions over `[0, len)`
///
/// Boundary spans before the first and after the last region are always
/// produced, even when empty. With no regions the whole waveform is one span.
pub fn silence_spans(non_silent: &[(usize, usize)], len: usize) -> Vec<SilenceSpan> {
    let (first, last) = match (non_silent.first(), non_silent.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return vec![SilenceSpan::new(0, len)],
    };

    let mut spans = Vec::with_capacity(non_silent.len() + 1);
    spans.push(SilenceSpan::new(0, first.0));

    for pair in non_silent.windows(2) {
        spans.push(SilenceSpan::new(pair[0].1, pair[1].0));
    }

    spans.push(SilenceSpan::new(last.1, len));
    spans
}

/// Zero the waveform over every span
pub fn mask_silence(samples: &mut [f32], spans: &[SilenceSpan]) {
    let len = samples.len();
    for span in spans {
        let start = span.start.min(len);
        let end = span.end.min(len);
        if start < end {
            samples[start..end].fill(0.0);
        }
    }
}

/// Two-phase masker: spans are computed from an immutable view, then applied
#[derive(Debug, Clone, Default)]
pub struct SilenceMasker {
    config: SilenceConfig,
}

impl SilenceMasker {
    pub fn new(config: SilenceConfig) -> Self {
        SilenceMasker { config }
    }

    /// Compute silence spans without touching the waveform
    pub fn find_spans(&self, samples: &[f32]) -> Vec<SilenceSpan> {
        let regions = detect_non_silent(samples, &self.config);
        if regions.is_empty() {
            log::warn!("No non-silent region found; masking the whole waveform");
        } else {
            log::debug!("Found {} non-silent region(s)", regions.len());
        }
        silence_spans(&regions, samples.len())
    }

    /// Compute spans and zero them in place, returning the spans applied
    pub fn apply(&self, samples: &mut [f32]) -> Vec<SilenceSpan> {
        let spans = self.find_spans(samples);
        mask_silence(samples, &spans);
        spans
    }
}
