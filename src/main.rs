use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use uuid::Uuid;

use voxband::audio::{ingest_wav, write_wav};
use voxband::config::{find_config_path, load_config};
use voxband::pipeline::{Stage, TraceWriter};
use voxband::{ErrorResponse, TranscribeError, Transcriber, TranscriptionConfig};

#[derive(Parser, Debug)]
#[command(name = "voxband", about = "Turn a sung or hummed melody into piano, bass and drum MIDI")]
struct Cli {
    /// Input recording (WAV)
    input: PathBuf,

    /// Directory for piano.mid, bass.mid, drum.mid and summary.json
    #[arg(short, long, default_value = "voxband-out")]
    output: PathBuf,

    /// TOML config file (defaults to ./voxband.toml or the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Append a JSONL stage trace to this file
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Also write the silence-masked waveform as WAV
    #[arg(long)]
    masked_wav: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Summary {
    run_id: Uuid,
    input: PathBuf,
    input_sha256: String,
    sample_rate: u32,
    duration_secs: f64,
    frame_count: usize,
    voiced_frames: usize,
    segment_count: usize,
    piano_notes: usize,
    bass_notes: usize,
    drum_notes: usize,
    midi_files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config = match cli.config.clone().or_else(find_config_path) {
        Some(path) => {
            let config = load_config(&path)?;
            log::info!("Loaded config from {}", path.display());
            config
        }
        None => TranscriptionConfig::default(),
    };

    let bytes = std::fs::read(&cli.input)
        .with_context(|| format!("Failed to read input file: {}", cli.input.display()))?;
    let input_sha256 = hex::encode(Sha256::digest(&bytes));

    let audio = ingest_wav(&bytes).map_err(TranscribeError::from);
    let audio = match audio {
        Ok(audio) => audio,
        Err(e) => return Err(report(e)),
    };
    let mut samples = audio.to_mono();

    let trace = cli.trace.as_ref().map(|path| TraceWriter::new(path, Uuid::new_v4()));
    let mut transcriber = Transcriber::from_config(&config).map_err(report)?;
    if let Some(ref writer) = trace {
        transcriber = transcriber.with_trace(writer.clone());
    }

    let transcription = transcriber
        .transcribe(&mut samples, audio.sample_rate)
        .map_err(report)?;

    if let Some(ref path) = cli.masked_wav {
        write_wav(path, &samples, audio.sample_rate)
            .with_context(|| format!("Failed to write masked waveform: {}", path.display()))?;
        log::info!("Wrote masked waveform to {}", path.display());
    }

    let midi_files = transcription
        .export_midi(&cli.output, &config.midi)
        .map_err(report)?;

    if let Some(ref writer) = trace {
        let data = serde_json::json!({ "files": midi_files });
        if let Err(e) = writer.record(Stage::MidiExport, 1.0, "Exported MIDI", Some(data)) {
            log::warn!("Failed to write trace entry: {}", e);
        }
    }

    let tracks = &transcription.tracks;
    let summary = Summary {
        run_id: transcription.run_id,
        input: cli.input.clone(),
        input_sha256,
        sample_rate: audio.sample_rate,
        duration_secs: audio.duration_secs(),
        frame_count: transcription.frame_count,
        voiced_frames: transcription.voiced_frames,
        segment_count: transcription.segment_count,
        piano_notes: tracks.piano.notes.len(),
        bass_notes: tracks.bass.notes.len(),
        drum_notes: tracks.drum.notes.len(),
        midi_files,
    };

    let summary_path = cli.output.join("summary.json");
    std::fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("Failed to write {}", summary_path.display()))?;

    log::info!(
        "Done: {} note(s) from {} ({})",
        summary.segment_count,
        cli.input.display(),
        summary.input_sha256
    );

    Ok(())
}

/// Print the client-facing error body to stderr and hand the error on
fn report(error: TranscribeError) -> anyhow::Error {
    let response = ErrorResponse::from(&error);
    if error.is_client_error() {
        log::warn!("Rejected input: {}", error);
    } else {
        log::error!("Transcription failed: {}", error);
    }
    match serde_json::to_string(&response) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}: {}", response.status, response.detail),
    }
    anyhow::Error::new(error)
}
