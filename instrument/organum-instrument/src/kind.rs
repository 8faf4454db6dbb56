//! instrument/organum-instrument/src/kind.rs
//! Instrument family tags and the shared playability interface.

use organum_theory::{Pitch, PitchRange};

/// The instrument families the generator can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    /// Pipe organ: manuals plus pedal, no simultaneity limit.
    Organ,
    /// Harpsichord: two-hand keyboard, modest compass.
    Harpsichord,
    /// Piano: two-hand keyboard, full 88-key compass.
    Piano,
    /// Violin: bowed, double stops on adjacent strings.
    Violin,
    /// Cello: bowed, double stops on adjacent strings.
    Cello,
    /// Guitar rendered in the single-voice idiom.
    Guitar,
}

/// Quoting playability for single pitches.
///
/// The cost scale is shared across families: 0.0 is effortless, values
/// around 1.0 mark awkward but possible, and anything at or above
/// [`Playability::IMPOSSIBLE`] is unplayable.
pub trait Playability {
    /// Sentinel cost for unplayable pitches.
    const IMPOSSIBLE: f32 = 1e6;

    /// Full playable compass.
    fn range(&self) -> PitchRange;

    /// Cost of sounding a single pitch.
    fn pitch_cost(&self, pitch: Pitch) -> f32;

    /// Whether a pitch is playable at all.
    fn is_playable(&self, pitch: Pitch) -> bool {
        self.pitch_cost(pitch) < Self::IMPOSSIBLE
    }
}
