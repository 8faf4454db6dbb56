//! instrument/organum-instrument/src/keyboard.rs
//! Two-hand keyboard model: span constraints, hand assignment, and
//! playable-voicing suggestions.

use organum_theory::{Pitch, PitchRange};
use smallvec::SmallVec;

use crate::kind::Playability;

/// Hand span constraints by skill level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanConstraints {
    /// Maximum semitone span a hand can cover at once.
    pub max_span: u8,
    /// Maximum notes one hand plays simultaneously.
    pub max_notes_per_hand: u8,
}

impl SpanConstraints {
    /// A ninth, four notes per hand.
    #[must_use]
    pub const fn beginner() -> Self {
        Self { max_span: 12, max_notes_per_hand: 4 }
    }

    /// A tenth, five notes per hand.
    #[must_use]
    pub const fn intermediate() -> Self {
        Self { max_span: 14, max_notes_per_hand: 5 }
    }

    /// An eleventh, five notes per hand. Organists are assumed here.
    #[must_use]
    pub const fn virtuoso() -> Self {
        Self { max_span: 16, max_notes_per_hand: 5 }
    }
}

/// A two-hand keyboard with a fixed compass and span constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardModel {
    range: PitchRange,
    span: SpanConstraints,
}

impl KeyboardModel {
    /// 88-key piano at the given skill level.
    #[must_use]
    pub fn piano(span: SpanConstraints) -> Self {
        Self { range: PitchRange::new(21, 108), span }
    }

    /// Bach-era harpsichord compass, virtuoso spans.
    #[must_use]
    pub fn harpsichord() -> Self {
        Self { range: PitchRange::new(29, 89), span: SpanConstraints::virtuoso() }
    }

    /// Span constraints in force.
    #[must_use]
    pub fn span_constraints(&self) -> SpanConstraints {
        self.span
    }

    /// Split sorted pitches into left- and right-hand groups.
    ///
    /// The split point minimizes the wider of the two spans; ties go to
    /// the more even note count.
    #[must_use]
    pub fn assign_hands(&self, sorted: &[Pitch]) -> (SmallVec<[Pitch; 5]>, SmallVec<[Pitch; 5]>) {
        if sorted.is_empty() {
            return (SmallVec::new(), SmallVec::new());
        }
        let mut best_split = sorted.len() / 2;
        let mut best_score = u32::MAX;
        for split in 0..=sorted.len() {
            let left = &sorted[..split];
            let right = &sorted[split..];
            let span = |notes: &[Pitch]| -> u32 {
                match (notes.first(), notes.last()) {
                    (Some(lo), Some(hi)) => u32::from(hi.distance_to(*lo)),
                    _ => 0,
                }
            };
            let balance = left.len().abs_diff(right.len()) as u32;
            let score = span(left).max(span(right)) * 8 + balance;
            if score < best_score {
                best_score = score;
                best_split = split;
            }
        }
        (sorted[..best_split].iter().copied().collect(), sorted[best_split..].iter().copied().collect())
    }

    /// Whether one hand can cover the sorted pitch group.
    #[must_use]
    pub fn playable_by_one_hand(&self, sorted: &[Pitch]) -> bool {
        if sorted.len() > usize::from(self.span.max_notes_per_hand) {
            return false;
        }
        match (sorted.first(), sorted.last()) {
            (Some(lo), Some(hi)) => hi.distance_to(*lo) <= self.span.max_span,
            _ => true,
        }
    }

    /// Whether two hands can cover the sorted voicing.
    #[must_use]
    pub fn is_voicing_playable(&self, sorted: &[Pitch]) -> bool {
        if sorted.iter().any(|p| !self.range.contains(*p)) {
            return false;
        }
        let (left, right) = self.assign_hands(sorted);
        self.playable_by_one_hand(&left) && self.playable_by_one_hand(&right)
    }

    /// Suggest a playable voicing for the desired sorted pitches.
    ///
    /// Tries, in order: the pitches as given (clamped into range), octave
    /// adjustment of outliers toward the cluster, dropping inner notes
    /// down to two, and finally the outer pair alone. Returns the same
    /// number of pitches as requested when possible, otherwise fewer.
    #[must_use]
    pub fn suggest_playable_voicing(&self, desired: &[Pitch]) -> Vec<Pitch> {
        let mut clamped: Vec<Pitch> = desired.iter().map(|p| self.range.clamp(*p)).collect();
        clamped.sort_unstable();
        if self.is_voicing_playable(&clamped) {
            return clamped;
        }

        // Pull outliers an octave toward the median.
        if let Some(&median) = clamped.get(clamped.len() / 2) {
            let mut adjusted = clamped.clone();
            for pitch in &mut adjusted {
                if pitch.distance_to(median) > 12 {
                    let toward = if *pitch > median { -12 } else { 12 };
                    let moved = pitch.transpose(toward);
                    if self.range.contains(moved) {
                        *pitch = moved;
                    }
                }
            }
            adjusted.sort_unstable();
            if self.is_voicing_playable(&adjusted) {
                return adjusted;
            }
        }

        // Drop inner notes until the remainder fits.
        let mut reduced = clamped.clone();
        while reduced.len() > 2 && !self.is_voicing_playable(&reduced) {
            let mid = reduced.len() / 2;
            reduced.remove(mid);
        }
        if self.is_voicing_playable(&reduced) {
            return reduced;
        }

        // Outer pair as the last resort.
        match (clamped.first(), clamped.last()) {
            (Some(&lo), Some(&hi)) if lo != hi => {
                let pair = vec![lo, hi];
                if self.is_voicing_playable(&pair) { pair } else { vec![lo] }
            }
            (Some(&lo), _) => vec![lo],
            _ => Vec::new(),
        }
    }
}

impl Playability for KeyboardModel {
    fn range(&self) -> PitchRange {
        self.range
    }

    fn pitch_cost(&self, pitch: Pitch) -> f32 {
        if self.range.contains(pitch) { 0.0 } else { Self::IMPOSSIBLE }
    }
}
