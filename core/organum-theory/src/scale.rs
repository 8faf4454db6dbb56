//! core/organum-theory/src/scale.rs
//! Scale membership and absolute-degree arithmetic.
//!
//! The generator works in exactly two scales: major and harmonic minor.
//! Degrees are absolute (octave-spanning) integers so that melodic
//! arithmetic like "two degrees up" crosses octave boundaries cleanly.
//! [`ScaleKind::pitch_to_degree`] and [`ScaleKind::degree_to_pitch`] are
//! exact inverses on scale members; off-scale pitches map to the nearest
//! degree.

use crate::pitch::{Pitch, PitchClass};

/// The closed scale set used throughout the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleKind {
    /// Ionian major.
    Major,
    /// Harmonic minor (raised seventh).
    HarmonicMinor,
}

impl ScaleKind {
    /// Semitone offsets of the seven degrees above the tonic.
    #[must_use]
    pub const fn offsets(self) -> &'static [u8; 7] {
        match self {
            Self::Major => &[0, 2, 4, 5, 7, 9, 11],
            Self::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
        }
    }

    /// Set membership test for a pitch against this scale on `tonic`.
    #[must_use]
    pub fn contains(self, pitch: Pitch, tonic: PitchClass) -> bool {
        let rel = (i32::from(pitch.midi()) - i32::from(tonic.value())).rem_euclid(12) as u8;
        self.offsets().contains(&rel)
    }

    /// Absolute degree index of a pitch relative to `tonic`.
    ///
    /// Scale members round-trip exactly through [`Self::degree_to_pitch`];
    /// chromatic pitches resolve to the nearest degree (lower on ties).
    #[must_use]
    pub fn pitch_to_degree(self, pitch: Pitch, tonic: PitchClass) -> i32 {
        let rel = i32::from(pitch.midi()) - i32::from(tonic.value());
        let octave = rel.div_euclid(12);
        let within = rel.rem_euclid(12) as u8;

        let offsets = self.offsets();
        let mut best = 0;
        let mut best_dist = u8::MAX;
        for (idx, &off) in offsets.iter().enumerate() {
            let dist = off.abs_diff(within);
            if dist < best_dist {
                best_dist = dist;
                best = idx;
            }
        }
        octave * 7 + best as i32
    }

    /// Pitch for an absolute degree index relative to `tonic`.
    #[must_use]
    pub fn degree_to_pitch(self, degree: i32, tonic: PitchClass) -> Pitch {
        let octave = degree.div_euclid(7);
        let within = degree.rem_euclid(7) as usize;
        let midi =
            i32::from(tonic.value()) + octave * 12 + i32::from(self.offsets()[within]);
        Pitch::from_signed(midi)
    }

    /// Snap a chromatic pitch onto the closest scale member.
    #[must_use]
    pub fn nearest_tone(self, pitch: Pitch, tonic: PitchClass) -> Pitch {
        self.degree_to_pitch(self.pitch_to_degree(pitch, tonic), tonic)
    }

    /// All scale members inside a closed pitch range, ascending.
    #[must_use]
    pub fn tones_in_range(self, tonic: PitchClass, low: Pitch, high: Pitch) -> Vec<Pitch> {
        (low.midi()..=high.midi())
            .map(Pitch::new)
            .filter(|p| self.contains(*p, tonic))
            .collect()
    }
}
