// Arranger - Turns note segments into piano, bass and drum tracks
// and writes them out as Standard MIDI Files

pub mod drum_pattern;
pub mod emitter;
pub mod midi;
pub mod tracks;

// Re-export main types
pub use drum_pattern::{assign_drums, drum_slot, DrumVoice, DRUM_VELOCITY, MIDI_CLOSED_HIHAT, MIDI_KICK, MIDI_SNARE};
pub use emitter::{emit_note, emit_notes, NOTE_VELOCITY};
pub use midi::{export_collection, export_track_midi, MidiExportError, MidiExportOptions};
pub use tracks::{arrange_segments, Track, TrackCollection, TrackRole};
