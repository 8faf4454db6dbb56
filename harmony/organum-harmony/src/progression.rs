//! harmony/organum-harmony/src/progression.rs
//! Diatonic chord spelling, progression templates, and cadences.

use organum_theory::{Chord, ChordDegree, ChordQuality, KeySignature};

/// Progression templates used by [`crate::HarmonicTimeline::progression`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressionType {
    /// Root motion falling by fifths through the diatonic circle.
    DescendingFifths,
    /// The vi–ii–V–I circle.
    CircleOfFifths,
    /// Secondary dominants colouring the circle chromatically.
    ChromaticCircle,
    /// Plagal-leaning motion through the subdominant.
    Subdominant,
    /// A borrowed minor subdominant inside the phrase.
    BorrowedChord,
}

impl ProgressionType {
    /// Degree sequence of the template.
    #[must_use]
    pub const fn degrees(self) -> &'static [ChordDegree] {
        use ChordDegree as D;
        match self {
            Self::DescendingFifths => {
                &[D::I, D::IV, D::viiDim, D::iii, D::vi, D::ii, D::V, D::I]
            }
            Self::CircleOfFifths => &[D::I, D::vi, D::ii, D::V, D::I],
            Self::ChromaticCircle => &[D::I, D::V_of_IV, D::IV, D::V_of_V, D::V, D::I],
            Self::Subdominant => &[D::I, D::IV, D::I, D::IV, D::V, D::I],
            Self::BorrowedChord => &[D::I, D::IV, D::ii, D::V, D::I],
        }
    }
}

/// Cadence kinds rewriting the final two events of a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CadenceKind {
    /// V → I.
    Perfect,
    /// Ends on V.
    Half,
    /// V → vi.
    Deceptive,
}

/// Spell the conventional chord on a scale degree of `key`.
///
/// The dominant is always major (the raised leading tone in minor), the
/// leading-tone chord is diminished (fully diminished seventh in minor),
/// and minor-mode mediant and submediant sit on the lowered degrees.
#[must_use]
pub fn chord_on_degree(key: KeySignature, degree: ChordDegree) -> Chord {
    use ChordDegree as D;
    let minor = key.is_minor();
    let (offset, quality) = match degree {
        D::I => (0, if minor { ChordQuality::Minor } else { ChordQuality::Major }),
        D::ii => (2, if minor { ChordQuality::Diminished } else { ChordQuality::Minor }),
        D::iii => {
            if minor {
                (3, ChordQuality::Major)
            } else {
                (4, ChordQuality::Minor)
            }
        }
        D::IV => (5, if minor { ChordQuality::Minor } else { ChordQuality::Major }),
        D::V => (7, ChordQuality::Major),
        D::vi => {
            if minor {
                (8, ChordQuality::Major)
            } else {
                (9, ChordQuality::Minor)
            }
        }
        D::viiDim => {
            (11, if minor { ChordQuality::Diminished7 } else { ChordQuality::Diminished })
        }
        D::V_of_V => (2, ChordQuality::Major),
        D::V_of_IV => (0, ChordQuality::Major),
    };
    Chord::new(key.tonic.transpose(offset), quality, degree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use organum_theory::PitchClass;

    fn pc(v: u8) -> PitchClass {
        PitchClass::new(v)
    }

    #[test]
    fn templates_start_and_end_on_tonal_anchors() {
        for prog in [
            ProgressionType::DescendingFifths,
            ProgressionType::CircleOfFifths,
            ProgressionType::ChromaticCircle,
            ProgressionType::Subdominant,
            ProgressionType::BorrowedChord,
        ] {
            let degrees = prog.degrees();
            assert!(degrees.len() >= 4, "{prog:?}");
            assert_eq!(degrees[0], ChordDegree::I, "{prog:?}");
            assert_eq!(*degrees.last().expect("non-empty"), ChordDegree::I, "{prog:?}");
        }
    }

    #[test]
    fn major_key_spelling() {
        let c = KeySignature::major(pc(0));
        let one = chord_on_degree(c, ChordDegree::I);
        assert_eq!(one.root.value(), 0);
        assert_eq!(one.quality, ChordQuality::Major);

        let two = chord_on_degree(c, ChordDegree::ii);
        assert_eq!(two.root.value(), 2);
        assert_eq!(two.quality, ChordQuality::Minor);

        let seven = chord_on_degree(c, ChordDegree::viiDim);
        assert_eq!(seven.root.value(), 11);
        assert_eq!(seven.quality, ChordQuality::Diminished);
    }

    #[test]
    fn minor_key_spelling() {
        let c_minor = KeySignature::minor(pc(0));
        let one = chord_on_degree(c_minor, ChordDegree::I);
        assert_eq!(one.quality, ChordQuality::Minor);

        // Dominant stays major thanks to the raised leading tone.
        let five = chord_on_degree(c_minor, ChordDegree::V);
        assert_eq!(five.root.value(), 7);
        assert_eq!(five.quality, ChordQuality::Major);

        // Submediant is the lowered sixth degree, major.
        let six = chord_on_degree(c_minor, ChordDegree::vi);
        assert_eq!(six.root.value(), 8);
        assert_eq!(six.quality, ChordQuality::Major);

        let seven = chord_on_degree(c_minor, ChordDegree::viiDim);
        assert_eq!(seven.quality, ChordQuality::Diminished7);
    }

    #[test]
    fn secondary_dominants() {
        let g = KeySignature::major(pc(7));
        let v_of_v = chord_on_degree(g, ChordDegree::V_of_V);
        assert_eq!(v_of_v.root.value(), 9);
        assert_eq!(v_of_v.quality, ChordQuality::Major);

        let v_of_iv = chord_on_degree(g, ChordDegree::V_of_IV);
        assert_eq!(v_of_iv.root.value(), 7);
        assert_eq!(v_of_iv.quality, ChordQuality::Major);
    }
}
