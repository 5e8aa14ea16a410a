// Note emission
// One semitone-quantized note per segment, duplicated into the melodic and bass tracks

use crate::notes::{NoteEvent, NoteSegment};
use crate::pitch::quantize_midi;

/// Velocity for every pitched note
pub const NOTE_VELOCITY: u8 = 100;

/// Pitched note for one segment: mean frequency rounded to the nearest MIDI note
pub fn emit_note(segment: &NoteSegment) -> Option<NoteEvent> {
    let mean = segment.mean_frequency()?;
    let start = segment.start()?;
    let end = segment.end()?;

    Some(NoteEvent::new(quantize_midi(mean), start, end, NOTE_VELOCITY))
}

/// Pitched notes for every non-empty segment, in segment order
pub fn emit_notes(segments: &[NoteSegment]) -> Vec<NoteEvent> {
    segments.iter().filter_map(emit_note).collect()
}
