//! core/organum-theory/src/key.rs
//! Key signatures and their relationships.
//!
//! A key bundles a tonic [`PitchClass`] with a [`Mode`] and exposes the
//! classical neighbour operations: dominant, subdominant, relative,
//! parallel, and circle-of-fifths distance. Cross-mode distance routes
//! through the relative key, which costs nothing on the circle.

use crate::pitch::{Pitch, PitchClass};
use crate::scale::ScaleKind;

/// Major or minor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Major mode.
    Major,
    /// Minor mode (realized as harmonic minor).
    Minor,
}

/// A tonal key: tonic pitch class plus mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySignature {
    /// Tonic pitch class.
    pub tonic: PitchClass,
    /// Major or minor.
    pub mode: Mode,
}

impl KeySignature {
    /// Construct a key from tonic and mode.
    #[must_use]
    pub fn new(tonic: PitchClass, mode: Mode) -> Self {
        Self { tonic, mode }
    }

    /// Major key on the given tonic.
    #[must_use]
    pub fn major(tonic: PitchClass) -> Self {
        Self::new(tonic, Mode::Major)
    }

    /// Minor key on the given tonic.
    #[must_use]
    pub fn minor(tonic: PitchClass) -> Self {
        Self::new(tonic, Mode::Minor)
    }

    /// Whether this key is minor.
    #[must_use]
    pub fn is_minor(self) -> bool {
        self.mode == Mode::Minor
    }

    /// The scale realizing this key: major, or harmonic minor.
    #[must_use]
    pub fn scale(self) -> ScaleKind {
        match self.mode {
            Mode::Major => ScaleKind::Major,
            Mode::Minor => ScaleKind::HarmonicMinor,
        }
    }

    /// Dominant: a perfect fifth up, same mode.
    #[must_use]
    pub fn dominant(self) -> Self {
        Self::new(self.tonic.transpose(7), self.mode)
    }

    /// Subdominant: a perfect fourth up, same mode.
    #[must_use]
    pub fn subdominant(self) -> Self {
        Self::new(self.tonic.transpose(5), self.mode)
    }

    /// Relative key: mode flips, tonic moves a minor third.
    #[must_use]
    pub fn relative(self) -> Self {
        match self.mode {
            Mode::Major => Self::minor(self.tonic.transpose(-3)),
            Mode::Minor => Self::major(self.tonic.transpose(3)),
        }
    }

    /// Parallel key: same tonic, mode flips.
    #[must_use]
    pub fn parallel(self) -> Self {
        match self.mode {
            Mode::Major => Self::minor(self.tonic),
            Mode::Minor => Self::major(self.tonic),
        }
    }

    /// Circle-of-fifths distance, 0..=6.
    ///
    /// Keys of different modes are measured through the relative key,
    /// which sits at distance zero from its partner.
    #[must_use]
    pub fn circle_of_fifths_distance(&self, other: &Self) -> u8 {
        let lhs = if self.mode == other.mode { *self } else { self.relative() };
        fifths_between(lhs.tonic, other.tonic)
    }

    /// Whether two keys are within one step on the circle of fifths.
    #[must_use]
    pub fn is_closely_related(&self, other: &Self) -> bool {
        self.circle_of_fifths_distance(other) <= 1
    }

    /// The closely related keys: self, dominant, subdominant, relative,
    /// parallel, and the dominant of the relative, deduplicated.
    #[must_use]
    pub fn closely_related_keys(self) -> Vec<Self> {
        let mut keys = vec![self, self.dominant(), self.subdominant(), self.relative()];
        for candidate in [self.parallel(), self.relative().dominant()] {
            if !keys.contains(&candidate) {
                keys.push(candidate);
            }
        }
        keys
    }

    /// MIDI pitch of the tonic in the given octave (C4 = 60).
    #[must_use]
    pub fn tonic_pitch(self, octave: i8) -> Pitch {
        self.tonic.in_octave(octave)
    }
}

/// Minimum steps between two tonics on the circle of fifths.
fn fifths_between(a: PitchClass, b: PitchClass) -> u8 {
    let mut forward = a;
    for step in 0..=6u8 {
        if forward == b {
            return step;
        }
        forward = forward.transpose(7);
    }
    let mut backward = a;
    for step in 0..=6u8 {
        if backward == b {
            return step;
        }
        backward = backward.transpose(5);
    }
    6
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pc(v: u8) -> PitchClass {
        PitchClass::new(v)
    }

    #[test]
    fn neighbour_operations() {
        let c = KeySignature::major(pc(0));
        assert_eq!(c.dominant(), KeySignature::major(pc(7)));
        assert_eq!(c.subdominant(), KeySignature::major(pc(5)));
        assert_eq!(c.relative(), KeySignature::minor(pc(9)));
        assert_eq!(c.parallel(), KeySignature::minor(pc(0)));

        let a_minor = KeySignature::minor(pc(9));
        assert_eq!(a_minor.relative(), c);
        assert_eq!(a_minor.dominant(), KeySignature::minor(pc(4)));
    }

    #[test]
    fn fifths_distance_same_mode() {
        let c = KeySignature::major(pc(0));
        assert_eq!(c.circle_of_fifths_distance(&c), 0);
        assert_eq!(c.circle_of_fifths_distance(&KeySignature::major(pc(7))), 1);
        assert_eq!(c.circle_of_fifths_distance(&KeySignature::major(pc(5))), 1);
        assert_eq!(c.circle_of_fifths_distance(&KeySignature::major(pc(2))), 2);
        assert_eq!(c.circle_of_fifths_distance(&KeySignature::major(pc(6))), 6);
    }

    #[test]
    fn fifths_distance_cross_mode_routes_through_relative() {
        let c = KeySignature::major(pc(0));
        let a_minor = KeySignature::minor(pc(9));
        assert_eq!(c.circle_of_fifths_distance(&a_minor), 0);
        let e_minor = KeySignature::minor(pc(4));
        assert_eq!(c.circle_of_fifths_distance(&e_minor), 1);
    }

    #[test]
    fn closely_related_set_contains_the_classics() {
        let g = KeySignature::major(pc(7));
        let related = g.closely_related_keys();
        assert!(related.contains(&g));
        assert!(related.contains(&KeySignature::major(pc(2)))); // D
        assert!(related.contains(&KeySignature::major(pc(0)))); // C
        assert!(related.contains(&KeySignature::minor(pc(4)))); // e
        assert!(related.len() >= 5);
    }

    #[test]
    fn minor_keys_use_harmonic_minor() {
        assert_eq!(KeySignature::minor(pc(0)).scale(), ScaleKind::HarmonicMinor);
        assert_eq!(KeySignature::major(pc(0)).scale(), ScaleKind::Major);
    }

    #[test]
    fn tonic_pitch_placement() {
        assert_eq!(KeySignature::major(pc(0)).tonic_pitch(4).midi(), 60);
        assert_eq!(KeySignature::minor(pc(7)).tonic_pitch(2).midi(), 43);
    }
}
