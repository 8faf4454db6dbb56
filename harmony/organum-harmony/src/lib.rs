//! The tonal skeleton of a piece: an ordered, contiguous sequence of
//! harmonic events covering a total span, with constructors for the
//! standard backbone and for progression templates, plus cadential
//! mutation of the final two events.
//!
//! ```
//! use organum_harmony::{HarmonicTimeline, Resolution};
//! use organum_theory::{KeySignature, PitchClass};
//!
//! let key = KeySignature::major(PitchClass::new(0));
//! let timeline = HarmonicTimeline::standard(key, 4 * 1920, Resolution::Bar);
//! assert_eq!(timeline.total_duration(), 4 * 1920);
//! assert_eq!(timeline.get_at(0).chord.root.value(), 0);
//! ```

pub mod event;
pub mod progression;
pub mod timeline;

pub use event::{bass_register, HarmonicEvent};
pub use progression::{chord_on_degree, CadenceKind, ProgressionType};
pub use timeline::{HarmonicTimeline, Resolution, TimelineError};
