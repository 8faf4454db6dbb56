//! instrument/organum-instrument/src/fretted.rs
//! Guitar model in the single-voice idiom.
//!
//! The generator writes guitar as a melodic instrument: one note at a
//! time, standard-tuning compass. Anything simultaneous is a violation
//! the guard resolves.

use organum_theory::{Pitch, PitchRange};

use crate::kind::Playability;

/// Classical guitar, standard tuning, first twelve frets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuitarModel;

impl GuitarModel {
    /// Maximum simultaneous notes in the single-voice idiom.
    pub const MAX_SIMULTANEOUS: usize = 1;
}

impl Playability for GuitarModel {
    fn range(&self) -> PitchRange {
        // E2 (open sixth string) to E6 (first string, twelfth fret).
        PitchRange::new(40, 88)
    }

    fn pitch_cost(&self, pitch: Pitch) -> f32 {
        if self.range().contains(pitch) { 0.0 } else { Self::IMPOSSIBLE }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compass_covers_standard_tuning() {
        let guitar = GuitarModel;
        assert!(guitar.is_playable(Pitch::new(40)));
        assert!(guitar.is_playable(Pitch::new(88)));
        assert!(!guitar.is_playable(Pitch::new(30)));
    }
}
