// YIN fundamental frequency estimator
// Frame-wise f0 with the cumulative mean normalized difference function;
// the difference function is computed from an FFT cross-correlation

use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{frame_times, PitchError, PitchEstimator, PitchTrack};

/// Frames whose energy falls below this are unvoiced without further analysis
const MIN_FRAME_ENERGY: f64 = 1e-10;

/// Configuration for the YIN estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YinConfig {
    /// Lowest detectable frequency in Hz
    pub fmin: f64,

    /// Highest detectable frequency in Hz
    pub fmax: f64,

    /// Analysis frame length in samples
    pub frame_length: usize,

    /// Hop between frames in samples
    pub hop_length: usize,

    /// CMNDF dip threshold (lower = stricter voicing)
    pub threshold: f64,
}

impl Default for YinConfig {
    fn default() -> Self {
        YinConfig {
            fmin: 65.406_391_325_149_66,  // C2
            fmax: 2_093.004_522_404_789, // C7
            frame_length: 2048,
            hop_length: 512,
            threshold: 0.1,
        }
    }
}

/// YIN estimator
#[derive(Debug, Clone, Default)]
pub struct YinEstimator {
    config: YinConfig,
}

impl YinEstimator {
    pub fn new(config: YinConfig) -> Self {
        YinEstimator { config }
    }

    pub fn config(&self) -> &YinConfig {
        &self.config
    }

    fn validate(&self, sample_rate: u32) -> Result<(), PitchError> {
        let c = &self.config;
        if sample_rate == 0 {
            return Err(PitchError::InvalidSampleRate);
        }
        if !(c.fmin > 0.0 && c.fmax > c.fmin) {
            return Err(PitchError::InvalidRange {
                fmin: c.fmin,
                fmax: c.fmax,
            });
        }
        if c.hop_length == 0 || c.frame_length < 4 {
            return Err(PitchError::InvalidFrame {
                frame_length: c.frame_length,
                hop_length: c.hop_length,
            });
        }
        Ok(())
    }
}

impl PitchEstimator for YinEstimator {
    fn estimate(&self, samples: &[f32], sample_rate: u32) -> Result<PitchTrack, PitchError> {
        self.validate(sample_rate)?;

        let c = &self.config;
        let sr = sample_rate as f64;
        let win_length = c.frame_length / 2;
        let max_lag = ((sr / c.fmin).ceil() as usize).min(c.frame_length - win_length - 1);
        let min_lag = ((sr / c.fmax).floor() as usize).max(1);

        if min_lag >= max_lag {
            return Err(PitchError::InvalidRange {
                fmin: c.fmin,
                fmax: c.fmax,
            });
        }

        let mut kernel = DifferenceKernel::new(c.frame_length, win_length, max_lag);

        // Centered frames: zero padding of half a frame on both sides
        let pad = c.frame_length / 2;
        let mut padded = vec![0.0f64; samples.len() + 2 * pad];
        for (dst, &src) in padded[pad..pad + samples.len()].iter_mut().zip(samples) {
            *dst = src as f64;
        }

        let n_frames = 1 + samples.len() / c.hop_length;
        let mut frequencies = Vec::with_capacity(n_frames);

        for frame_idx in 0..n_frames {
            let start = frame_idx * c.hop_length;
            let frame = &padded[start..start + c.frame_length];

            let f0 = match kernel.cmndf(frame)? {
                Some(cmndf) => pick_period(cmndf, min_lag, max_lag, c.threshold)
                    .map(|tau| sr / tau)
                    .filter(|f| *f >= c.fmin && *f <= c.fmax)
                    .unwrap_or(0.0),
                None => 0.0,
            };
            frequencies.push(f0);
        }

        let voiced = frequencies.iter().filter(|f| **f > 0.0).count();
        log::debug!("YIN: {} frames, {} voiced", n_frames, voiced);

        Ok(PitchTrack {
            times: frame_times(n_frames, c.hop_length, sample_rate),
            frequencies,
        })
    }
}

/// Reusable FFT plans and buffers for the YIN difference function
struct DifferenceKernel {
    win_length: usize,
    max_lag: usize,
    forward: Arc<dyn RealToComplex<f64>>,
    inverse: Arc<dyn ComplexToReal<f64>>,
    head_buf: Vec<f64>,
    frame_buf: Vec<f64>,
    head_spec: Vec<Complex<f64>>,
    frame_spec: Vec<Complex<f64>>,
    xcorr: Vec<f64>,
    prefix: Vec<f64>,
    cmndf: Vec<f64>,
}

impl DifferenceKernel {
    fn new(frame_length: usize, win_length: usize, max_lag: usize) -> Self {
        // Linear (not circular) correlation needs room for both signals
        let fft_len = (frame_length + win_length).next_power_of_two();
        let mut planner = RealFftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);

        DifferenceKernel {
            win_length,
            max_lag,
            head_buf: forward.make_input_vec(),
            frame_buf: forward.make_input_vec(),
            head_spec: forward.make_output_vec(),
            frame_spec: forward.make_output_vec(),
            xcorr: inverse.make_output_vec(),
            prefix: vec![0.0; frame_length + 1],
            cmndf: vec![0.0; max_lag + 1],
            forward,
            inverse,
        }
    }

    /// Cumulative mean normalized difference for lags `0..=max_lag`,
    /// or `None` when the frame carries no energy
    fn cmndf(&mut self, frame: &[f64]) -> Result<Option<&[f64]>, PitchError> {
        let w = self.win_length;
        let fft_len = self.head_buf.len();

        self.prefix[0] = 0.0;
        for (i, &x) in frame.iter().enumerate() {
            self.prefix[i + 1] = self.prefix[i] + x * x;
        }
        let head_energy = self.prefix[w];
        if head_energy < MIN_FRAME_ENERGY {
            return Ok(None);
        }

        self.head_buf.fill(0.0);
        self.head_buf[..w].copy_from_slice(&frame[..w]);
        self.frame_buf.fill(0.0);
        self.frame_buf[..frame.len()].copy_from_slice(frame);

        self.forward
            .process(&mut self.head_buf, &mut self.head_spec)
            .map_err(|e| PitchError::Fft(e.to_string()))?;
        self.forward
            .process(&mut self.frame_buf, &mut self.frame_spec)
            .map_err(|e| PitchError::Fft(e.to_string()))?;

        // conj(H) * F gives sum_j head[j] * frame[j + tau]
        for (f, h) in self.frame_spec.iter_mut().zip(self.head_spec.iter()) {
            *f *= h.conj();
        }
        if let Some(first) = self.frame_spec.first_mut() {
            first.im = 0.0;
        }
        if let Some(last) = self.frame_spec.last_mut() {
            last.im = 0.0;
        }

        self.inverse
            .process(&mut self.frame_spec, &mut self.xcorr)
            .map_err(|e| PitchError::Fft(e.to_string()))?;

        let norm = fft_len as f64;
        self.cmndf[0] = 1.0;
        let mut running_sum = 0.0;

        for tau in 1..=self.max_lag {
            let tail_energy = self.prefix[tau + w] - self.prefix[tau];
            let diff = (head_energy + tail_energy - 2.0 * self.xcorr[tau] / norm).max(0.0);
            running_sum += diff;

            self.cmndf[tau] = if running_sum > MIN_FRAME_ENERGY {
                diff * tau as f64 / running_sum
            } else {
                1.0
            };
        }

        Ok(Some(self.cmndf.as_slice()))
    }
}

/// First CMNDF valley under the threshold, refined by parabolic interpolation
fn pick_period(cmndf: &[f64], min_lag: usize, max_lag: usize, threshold: f64) -> Option<f64> {
    let mut tau = min_lag;
    while tau < max_lag {
        if cmndf[tau] < threshold {
            while tau + 1 < max_lag && cmndf[tau + 1] < cmndf[tau] {
                tau += 1;
            }
            return Some(parabolic_interpolation(cmndf, tau));
        }
        tau += 1;
    }
    None
}

fn parabolic_interpolation(data: &[f64], tau: usize) -> f64 {
    if tau == 0 || tau + 1 >= data.len() {
        return tau as f64;
    }

    let s0 = data[tau - 1];
    let s1 = data[tau];
    let s2 = data[tau + 1];

    let denominator = 2.0 * (s0 - 2.0 * s1 + s2);
    if denominator.abs() < 1e-12 {
        return tau as f64;
    }

    let adjustment = (s0 - s2) / denominator;
    if adjustment.is_finite() && adjustment.abs() < 1.0 {
        tau as f64 + adjustment
    } else {
        tau as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                (0.6 * (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate as f64).sin())
                    as f32
            })
            .collect()
    }

    /// Straightforward O(n * lag) difference function for cross-checking
    fn direct_difference(frame: &[f64], win: usize, max_lag: usize) -> Vec<f64> {
        (0..=max_lag)
            .map(|tau| {
                (0..win)
                    .map(|j| {
                        let d = frame[j] - frame[j + tau];
                        d * d
                    })
                    .sum()
            })
            .collect()
    }

    #[test]
    fn test_fft_difference_matches_direct() {
        let frame: Vec<f64> = sine(330.0, 22050, 256)
            .into_iter()
            .enumerate()
            .map(|(i, s)| s as f64 + 0.05 * ((i * 7 % 13) as f64 / 13.0))
            .collect();
        let (win, max_lag) = (128, 100);

        let direct = direct_difference(&frame, win, max_lag);
        let mut expected = vec![1.0; max_lag + 1];
        let mut running = 0.0;
        for tau in 1..=max_lag {
            running += direct[tau];
            expected[tau] = direct[tau] * tau as f64 / running;
        }

        let mut kernel = DifferenceKernel::new(256, win, max_lag);
        let cmndf = kernel.cmndf(&frame).unwrap().unwrap();

        for tau in 1..=max_lag {
            assert!(
                (cmndf[tau] - expected[tau]).abs() < 1e-6,
                "tau {}: {} vs {}",
                tau,
                cmndf[tau],
                expected[tau]
            );
        }
    }

    #[test]
    fn test_sine_pitch() {
        let estimator = YinEstimator::default();
        let track = estimator.estimate(&sine(220.0, 22050, 22050), 22050).unwrap();

        // Skip the half-padded edge frames
        let inner = &track.frequencies[4..track.len() - 4];
        assert!(inner.iter().all(|&f| (f - 220.0).abs() < 2.0));
    }

    #[test]
    fn test_pitch_at_44100() {
        let estimator = YinEstimator::default();
        let track = estimator.estimate(&sine(110.0, 44100, 44100), 44100).unwrap();

        let mid = track.len() / 2;
        assert!((track.frequencies[mid] - 110.0).abs() < 1.0);
    }

    #[test]
    fn test_silence_is_unvoiced() {
        let estimator = YinEstimator::default();
        let track = estimator.estimate(&vec![0.0; 8192], 22050).unwrap();

        assert_eq!(track.len(), 1 + 8192 / 512);
        assert!(track.frequencies.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_frame_count_and_times() {
        let estimator = YinEstimator::default();
        let track = estimator.estimate(&vec![0.0; 1000], 22050).unwrap();

        assert_eq!(track.len(), 2);
        assert_eq!(track.times[0], 0.0);
        assert!((track.times[1] - 512.0 / 22050.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_configuration() {
        let estimator = YinEstimator::new(YinConfig {
            fmin: 500.0,
            fmax: 100.0,
            ..Default::default()
        });
        assert!(matches!(
            estimator.estimate(&[0.0; 16], 22050),
            Err(PitchError::InvalidRange { .. })
        ));

        let estimator = YinEstimator::default();
        assert!(matches!(
            estimator.estimate(&[0.0; 16], 0),
            Err(PitchError::InvalidSampleRate)
        ));
    }

    #[test]
    fn test_parabolic_interpolation_symmetric() {
        let data = [3.0, 1.0, 3.0];
        assert_eq!(parabolic_interpolation(&data, 1), 1.0);

        let skewed = [2.0, 1.0, 3.0];
        assert!(parabolic_interpolation(&skewed, 1) < 1.0);
    }
}
