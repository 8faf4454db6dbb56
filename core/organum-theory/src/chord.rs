//! core/organum-theory/src/chord.rs
//! Chords as root + quality + Roman-numeral degree.
//!
//! Intervals above the root derive entirely from the quality table, so a
//! chord stays three small copyable fields. Seventh qualities add a
//! fourth tone; triads have none.

use crate::pitch::{Pitch, PitchClass};

/// Chord quality. The third, fifth, and optional seventh follow from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordQuality {
    /// Major triad.
    Major,
    /// Minor triad.
    Minor,
    /// Diminished triad.
    Diminished,
    /// Augmented triad.
    Augmented,
    /// Dominant seventh.
    Dominant7,
    /// Minor seventh.
    Minor7,
    /// Half-diminished seventh.
    HalfDim7,
    /// Fully diminished seventh.
    Diminished7,
}

impl ChordQuality {
    /// Semitones from root to third.
    #[must_use]
    pub const fn third(self) -> u8 {
        match self {
            Self::Major | Self::Augmented | Self::Dominant7 => 4,
            Self::Minor | Self::Diminished | Self::Minor7 | Self::HalfDim7 | Self::Diminished7 => {
                3
            }
        }
    }

    /// Semitones from root to fifth.
    #[must_use]
    pub const fn fifth(self) -> u8 {
        match self {
            Self::Diminished | Self::HalfDim7 | Self::Diminished7 => 6,
            Self::Augmented => 8,
            _ => 7,
        }
    }

    /// Semitones from root to seventh, when the quality carries one.
    #[must_use]
    pub const fn seventh(self) -> Option<u8> {
        match self {
            Self::Dominant7 | Self::Minor7 | Self::HalfDim7 => Some(10),
            Self::Diminished7 => Some(9),
            _ => None,
        }
    }

    /// Whether the quality sounds minor.
    #[must_use]
    pub const fn is_minor(self) -> bool {
        self.third() == 3
    }
}

/// Roman-numeral function label for a chord within its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum ChordDegree {
    /// Tonic.
    I,
    /// Supertonic.
    ii,
    /// Mediant.
    iii,
    /// Subdominant.
    IV,
    /// Dominant.
    V,
    /// Submediant.
    vi,
    /// Leading-tone diminished.
    viiDim,
    /// Secondary dominant of the dominant.
    V_of_V,
    /// Secondary dominant of the subdominant.
    V_of_IV,
}

/// A chord: root pitch class, quality, and functional degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chord {
    /// Root pitch class.
    pub root: PitchClass,
    /// Quality determining the stacked intervals.
    pub quality: ChordQuality,
    /// Roman-numeral label within the governing key.
    pub degree: ChordDegree,
}

impl Chord {
    /// Construct a chord from its three fields.
    #[must_use]
    pub fn new(root: PitchClass, quality: ChordQuality, degree: ChordDegree) -> Self {
        Self { root, quality, degree }
    }

    /// Pitch classes of the chord tones (root, third, fifth, seventh).
    #[must_use]
    pub fn tone_classes(&self) -> Vec<PitchClass> {
        let mut classes = vec![
            self.root,
            self.root.transpose(i32::from(self.quality.third())),
            self.root.transpose(i32::from(self.quality.fifth())),
        ];
        if let Some(seventh) = self.quality.seventh() {
            classes.push(self.root.transpose(i32::from(seventh)));
        }
        classes
    }

    /// Whether a pitch class belongs to the chord.
    #[must_use]
    pub fn contains_class(&self, class: PitchClass) -> bool {
        self.tone_classes().contains(&class)
    }

    /// Whether a pitch sounds a chord tone.
    #[must_use]
    pub fn contains(&self, pitch: Pitch) -> bool {
        self.contains_class(pitch.class())
    }

    /// All chord tones inside a closed pitch range, ascending.
    #[must_use]
    pub fn tones_in_range(&self, low: Pitch, high: Pitch) -> Vec<Pitch> {
        let classes = self.tone_classes();
        (low.midi()..=high.midi())
            .map(Pitch::new)
            .filter(|p| classes.contains(&p.class()))
            .collect()
    }

    /// The chord tone nearest to `pitch` within a closed range, if any.
    #[must_use]
    pub fn nearest_tone(&self, pitch: Pitch, low: Pitch, high: Pitch) -> Option<Pitch> {
        self.tones_in_range(low, high)
            .into_iter()
            .min_by_key(|candidate| candidate.distance_to(pitch))
    }

    /// Root, third, and fifth as pitches in a base octave, clamped to MIDI.
    #[must_use]
    pub fn triad_in_octave(&self, octave: i8) -> [Pitch; 3] {
        let root = self.root.in_octave(octave);
        [
            root,
            root.transpose(i32::from(self.quality.third())),
            root.transpose(i32::from(self.quality.fifth())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pc(v: u8) -> PitchClass {
        PitchClass::new(v)
    }

    #[test]
    fn quality_interval_table() {
        assert_eq!(ChordQuality::Major.third(), 4);
        assert_eq!(ChordQuality::Minor.third(), 3);
        assert_eq!(ChordQuality::Diminished.fifth(), 6);
        assert_eq!(ChordQuality::Augmented.fifth(), 8);
        assert_eq!(ChordQuality::Dominant7.seventh(), Some(10));
        assert_eq!(ChordQuality::Diminished7.seventh(), Some(9));
        assert_eq!(ChordQuality::Major.seventh(), None);
    }

    #[test]
    fn g_dominant_seventh_tones() {
        let chord = Chord::new(pc(7), ChordQuality::Dominant7, ChordDegree::V);
        for class in [7u8, 11, 2, 5] {
            assert!(chord.contains_class(pc(class)), "{class}");
        }
        assert!(!chord.contains_class(pc(0)));
    }

    #[test]
    fn tones_in_range_covers_octaves() {
        let chord = Chord::new(pc(0), ChordQuality::Major, ChordDegree::I);
        let tones = chord.tones_in_range(Pitch::new(48), Pitch::new(72));
        let midis: Vec<u8> = tones.iter().map(|p| p.midi()).collect();
        assert_eq!(midis, vec![48, 52, 55, 60, 64, 67, 72]);
    }

    #[test]
    fn nearest_tone_minimizes_distance() {
        let chord = Chord::new(pc(0), ChordQuality::Minor, ChordDegree::I);
        let nearest = chord
            .nearest_tone(Pitch::new(61), Pitch::new(48), Pitch::new(72))
            .expect("range holds chord tones");
        assert_eq!(nearest.midi(), 60);
        assert!(chord.nearest_tone(Pitch::new(60), Pitch::new(90), Pitch::new(91)).is_none());
    }

    #[test]
    fn triad_in_octave_places_root() {
        let chord = Chord::new(pc(9), ChordQuality::Minor, ChordDegree::vi);
        let [root, third, fifth] = chord.triad_in_octave(3);
        assert_eq!(root.midi(), 57);
        assert_eq!(third.midi(), 60);
        assert_eq!(fifth.midi(), 64);
    }
}
