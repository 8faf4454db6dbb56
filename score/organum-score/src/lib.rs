//! Score-side data model: timed note events with provenance and repair
//! bookkeeping, MIDI-shaped tracks with the fixed organ channel/program
//! mapping, the counterpoint violation report, and the generation error
//! taxonomy.
//!
//! Everything downstream of the form generators speaks these types; the
//! generator never performs I/O, so this crate is the entire output
//! surface.

pub mod error;
pub mod note;
pub mod report;
pub mod track;

pub use error::GenerateError;
pub use note::{sort_notes, NoteEvent, NoteSource, Protection, Repairs};
pub use report::CounterpointReport;
pub use track::{dedup_single_voice, gm_program, sort_tracks, OrganManual, Track, ORGAN_VELOCITY};
