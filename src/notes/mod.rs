// Notes module
// Segment voiced pitch frames into discrete notes

pub mod segmenter;
pub mod types;

pub use segmenter::{segment_pitch_track, NoteSegmenter, SegmenterConfig, SEMITONE_RATIO};
pub use types::{NoteEvent, NoteSegment};
