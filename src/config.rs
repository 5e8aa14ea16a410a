// Transcription configuration
// TOML-backed settings for every pipeline stage; every field has a default

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::arranger::MidiExportOptions;
use crate::audio::SilenceConfig;
use crate::notes::SegmenterConfig;
use crate::pitch::{note_to_hz, PitchError, YinConfig};

pub const CONFIG_FILE_NAME: &str = "voxband.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub silence: SilenceConfig,
    pub pitch: PitchConfig,
    pub segmenter: SegmenterConfig,
    pub midi: MidiExportOptions,
}

/// Pitch search range given as note names, plus YIN framing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    pub fmin_note: String,
    pub fmax_note: String,
    pub frame_length: usize,
    pub hop_length: usize,
    pub threshold: f64,
}

impl Default for PitchConfig {
    fn default() -> Self {
        let yin = YinConfig::default();
        PitchConfig {
            fmin_note: "C2".to_string(),
            fmax_note: "C7".to_string(),
            frame_length: yin.frame_length,
            hop_length: yin.hop_length,
            threshold: yin.threshold,
        }
    }
}

impl PitchConfig {
    /// Resolve note names into an estimator configuration
    pub fn to_yin(&self) -> Result<YinConfig, PitchError> {
        Ok(YinConfig {
            fmin: note_to_hz(&self.fmin_note)?,
            fmax: note_to_hz(&self.fmax_note)?,
            frame_length: self.frame_length,
            hop_length: self.hop_length,
            threshold: self.threshold,
        })
    }
}

impl TranscriptionConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: TranscriptionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the parser accepts but later stages cannot use
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.midi
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("[midi] {}", e)))
    }
}

pub fn load_config(path: &Path) -> Result<TranscriptionConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    TranscriptionConfig::from_toml_str(&content)
}

/// `./voxband.toml`, then the platform config directory
pub fn find_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    let platform = dirs::config_dir()?.join("voxband").join("config.toml");
    platform.exists().then_some(platform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = TranscriptionConfig::default();
        assert_eq!(config.silence.top_db, 20.0);
        assert_eq!(config.pitch.fmin_note, "C2");
        assert_eq!(config.pitch.fmax_note, "C7");
        assert!(!config.segmenter.keep_trailing_segment);
        assert_eq!(config.midi.ppq, 220);
    }

    #[test]
    fn test_default_pitch_range_matches_estimator() {
        let yin = PitchConfig::default().to_yin().unwrap();
        let reference = YinConfig::default();
        assert!((yin.fmin - reference.fmin).abs() < 1e-9);
        assert!((yin.fmax - reference.fmax).abs() < 1e-9);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TranscriptionConfig::from_toml_str(
            r#"
            [silence]
            top_db = 30.0

            [pitch]
            fmin_note = "E2"

            [segmenter]
            keep_trailing_segment = true
            "#,
        )
        .unwrap();

        assert_eq!(config.silence.top_db, 30.0);
        assert_eq!(config.silence.hop_length, 512);
        assert_eq!(config.pitch.fmin_note, "E2");
        assert_eq!(config.pitch.fmax_note, "C7");
        assert!(config.segmenter.keep_trailing_segment);
        assert_eq!(config.midi.bpm, 120.0);
    }

    #[test]
    fn test_bad_note_name_fails_resolution() {
        let config = PitchConfig {
            fmin_note: "X9".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.to_yin(), Err(PitchError::InvalidNoteName(_))));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            TranscriptionConfig::from_toml_str("[silence\ntop_db = "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_unusable_midi_values_rejected() {
        let too_fine = TranscriptionConfig::from_toml_str("[midi]\nppq = 40000\n");
        assert!(matches!(too_fine, Err(ConfigError::Invalid(_))));

        let stopped = TranscriptionConfig::from_toml_str("[midi]\nbpm = 0.0\n");
        assert!(matches!(stopped, Err(ConfigError::Invalid(_))));

        let backwards = TranscriptionConfig::from_toml_str("[midi]\nbpm = -90.0\n");
        assert!(matches!(backwards, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[midi]\nppq = 480\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.midi.ppq, 480);

        let missing = load_config(&temp_dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
