//! core/organum-theory/src/pitch.rs
//! MIDI pitch and pitch-class newtypes.
//!
//! [`Pitch`] values are the atomic musical alphabet of the generator:
//! plain MIDI numbers with arithmetic that cannot leave 0..=127. Every
//! higher module (`scale`, `chord`, `key`) operates on these primitives.

use core::fmt;

/// Middle C in the standard MIDI mapping.
pub const MIDDLE_C: Pitch = Pitch(60);

/// Absolute MIDI pitch, 0..=127.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pitch(u8);

impl Pitch {
    /// Construct from a raw MIDI number, saturating at 127.
    #[must_use]
    pub fn new(midi: u8) -> Self {
        Self(midi.min(127))
    }

    /// Const-context constructor; values above 127 clamp to 127.
    #[must_use]
    pub const fn from_midi(midi: u8) -> Self {
        Self(if midi > 127 { 127 } else { midi })
    }

    /// Construct from a signed value, clamping into the MIDI range.
    #[must_use]
    pub fn from_signed(midi: i32) -> Self {
        Self(midi.clamp(0, 127) as u8)
    }

    /// Raw MIDI number.
    #[must_use]
    pub fn midi(self) -> u8 {
        self.0
    }

    /// Pitch class (pitch mod 12).
    #[must_use]
    pub fn class(self) -> PitchClass {
        PitchClass::new(self.0 % 12)
    }

    /// Transpose by a semitone count, clamping into the MIDI range.
    #[must_use]
    pub fn transpose(self, semitones: i32) -> Self {
        Self::from_signed(i32::from(self.0) + semitones)
    }

    /// Signed semitone distance from `other` to `self`.
    #[must_use]
    pub fn interval_from(self, other: Pitch) -> i32 {
        i32::from(self.0) - i32::from(other.0)
    }

    /// Absolute semitone distance to `other`.
    #[must_use]
    pub fn distance_to(self, other: Pitch) -> u8 {
        self.0.abs_diff(other.0)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pitch class 0..=11 (C = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PitchClass(u8);

impl PitchClass {
    /// Construct from a semitone index, wrapped mod 12.
    #[must_use]
    pub fn new(semitones: u8) -> Self {
        Self(semitones % 12)
    }

    /// Semitone index 0..=11.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Transpose by a semitone count, wrapping mod 12.
    #[must_use]
    pub fn transpose(self, semitones: i32) -> Self {
        let wrapped = (i32::from(self.0) + semitones).rem_euclid(12);
        Self(wrapped as u8)
    }

    /// The pitch with this class in the given octave (C4 = octave 4 = MIDI 60).
    #[must_use]
    pub fn in_octave(self, octave: i8) -> Pitch {
        Pitch::from_signed((i32::from(octave) + 1) * 12 + i32::from(self.0))
    }
}

/// Closed pitch range for a voice, manual, or string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchRange {
    /// Lowest playable pitch.
    pub low: Pitch,
    /// Highest playable pitch.
    pub high: Pitch,
}

impl PitchRange {
    /// Construct a range from raw MIDI bounds.
    #[must_use]
    pub fn new(low: u8, high: u8) -> Self {
        Self { low: Pitch::new(low.min(high)), high: Pitch::new(high.max(low)) }
    }

    /// Whether the range contains `pitch`.
    #[must_use]
    pub fn contains(self, pitch: Pitch) -> bool {
        pitch >= self.low && pitch <= self.high
    }

    /// Clamp a pitch into the range.
    #[must_use]
    pub fn clamp(self, pitch: Pitch) -> Pitch {
        pitch.max(self.low).min(self.high)
    }

    /// Midpoint of the range.
    #[must_use]
    pub fn center(self) -> Pitch {
        Pitch::new(u8::midpoint(self.low.midi(), self.high.midi()))
    }
}
