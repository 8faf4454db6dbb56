//! Tonal primitives for the generator: MIDI pitches and pitch classes,
//! interval math with the consonance table, diatonic scales with exact
//! degree round-trips, chord constructors, and key-signature algebra.
//!
//! The crate is layered so higher-level concepts build on lower ones:
//! - [`Pitch`] and [`PitchClass`] wrap raw MIDI numbers so range and
//!   class arithmetic stay in one place.
//! - [`interval`] reduces compound intervals and classifies consonance.
//! - [`ScaleKind`] maps pitches onto absolute scale degrees and back,
//!   exactly on scale members and to the nearest degree otherwise.
//! - [`Chord`] derives its tones from a quality table.
//! - [`KeySignature`] ties everything together with dominant, relative,
//!   parallel, and circle-of-fifths relationships.
//!
//! # Example
//! Walk a V–I cadence in C major:
//!
//! ```
//! use organum_theory::{Chord, ChordDegree, ChordQuality, KeySignature, Mode, PitchClass};
//! let key = KeySignature::new(PitchClass::new(0), Mode::Major);
//! let dominant = key.dominant();
//! assert_eq!(dominant.tonic.value(), 7);
//!
//! let five = Chord::new(dominant.tonic, ChordQuality::Dominant7, ChordDegree::V);
//! assert!(five.contains_class(PitchClass::new(5))); // the seventh, F
//! assert_eq!(key.circle_of_fifths_distance(&dominant), 1);
//! ```

pub mod chord;
pub mod interval;
pub mod key;
pub mod pitch;
pub mod scale;

pub use chord::{Chord, ChordDegree, ChordQuality};
pub use key::{KeySignature, Mode};
pub use pitch::{MIDDLE_C, Pitch, PitchClass, PitchRange};
pub use scale::ScaleKind;
