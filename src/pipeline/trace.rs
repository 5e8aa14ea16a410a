// Pipeline progress tracing
// Append-only JSONL log of transcription stages, one line per stage event

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during trace operations
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Transcription stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SilenceMasking,
    PitchEstimation,
    Segmentation,
    Arrangement,
    MidiExport,
}

/// A single line of the trace file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// RFC 3339 timestamp
    pub timestamp: String,

    /// Transcription run this entry belongs to
    pub run_id: Uuid,

    pub stage: Stage,

    /// Overall pipeline progress [0.0, 1.0]
    pub progress: f32,

    pub message: String,

    /// Optional structured payload (counts, timings)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    pub fn new(run_id: Uuid, stage: Stage, progress: f32, message: impl Into<String>) -> Self {
        TraceEntry {
            timestamp: Utc::now().to_rfc3339(),
            run_id,
            stage,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Appends entries for one run to a JSONL file
#[derive(Debug, Clone)]
pub struct TraceWriter {
    file_path: PathBuf,
    run_id: Uuid,
}

impl TraceWriter {
    pub fn new(file_path: impl Into<PathBuf>, run_id: Uuid) -> Self {
        TraceWriter {
            file_path: file_path.into(),
            run_id,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Append one entry, creating the file if needed
    pub fn append(&self, entry: &TraceEntry) -> Result<(), TraceError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    /// Record a stage event for this writer's run
    pub fn record(
        &self,
        stage: Stage,
        progress: f32,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Result<(), TraceError> {
        let mut entry = TraceEntry::new(self.run_id, stage, progress, message);
        if let Some(data) = data {
            entry = entry.with_data(data);
        }
        self.append(&entry)
    }
}

/// Read every entry back from a JSONL trace file
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path)?;

    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(TraceError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_progress_clamping() {
        let run_id = Uuid::new_v4();
        assert_eq!(TraceEntry::new(run_id, Stage::Segmentation, -0.5, "x").progress, 0.0);
        assert_eq!(TraceEntry::new(run_id, Stage::Segmentation, 1.5, "x").progress, 1.0);
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        let json = serde_json::to_string(&Stage::SilenceMasking).unwrap();
        assert_eq!(json, "\"silence_masking\"");
        let json = serde_json::to_string(&Stage::MidiExport).unwrap();
        assert_eq!(json, "\"midi_export\"");
    }

    #[test]
    fn test_writer_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("trace.jsonl");
        let run_id = Uuid::new_v4();
        let writer = TraceWriter::new(&path, run_id);

        writer
            .record(Stage::SilenceMasking, 0.0, "Masking silence", None)
            .unwrap();
        writer
            .record(
                Stage::Segmentation,
                0.6,
                "Found 3 segments",
                Some(serde_json::json!({ "segments": 3 })),
            )
            .unwrap();

        let entries = read_trace_file(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.run_id == run_id));
        assert_eq!(entries[0].stage, Stage::SilenceMasking);
        assert!(entries[0].data.is_none());
        assert_eq!(entries[1].data.as_ref().unwrap()["segments"], 3);
    }

    #[test]
    fn test_data_omitted_when_absent() {
        let entry = TraceEntry::new(Uuid::nil(), Stage::Arrangement, 0.5, "Arranging");
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("\"data\""));

        let with = entry.with_data(serde_json::json!({ "notes": 4 }));
        assert_eq!(with.data.unwrap()["notes"], 4);
    }

    #[test]
    fn test_read_skips_blank_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("trace.jsonl");
        let writer = TraceWriter::new(&path, Uuid::nil());
        writer.record(Stage::MidiExport, 1.0, "Done", None).unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"\n\n")
            .unwrap();

        assert_eq!(read_trace_file(&path).unwrap().len(), 1);
    }
}
