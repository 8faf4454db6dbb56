//! instrument/organum-instrument/src/bowed.rs
//! Bowed string models: tuning, positions, and double-stop feasibility.
//!
//! A pitch is played on the string whose open pitch sits closest below
//! it; a double stop needs two adjacent strings whose left-hand positions
//! are close enough to finger together.

use organum_theory::{Pitch, PitchRange};
use smallvec::SmallVec;

use crate::kind::Playability;

/// Maximum position spread (semitones) fingered together in a double stop.
const MAX_POSITION_SPREAD: u8 = 5;

/// A stopped-note location: string index plus semitones above open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerPosition {
    /// String index, 0 = lowest.
    pub string: u8,
    /// Semitones above the open string (0 = open).
    pub semitones_above_open: u8,
}

/// A four-string bowed instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct BowedModel {
    tuning: [Pitch; 4],
    max_above_open: [u8; 4],
    range: PitchRange,
    shift_cost: f32,
    high_position_threshold: [u8; 4],
}

impl BowedModel {
    /// Solo violin: G3 D4 A4 E5, range G3..C7.
    #[must_use]
    pub fn violin() -> Self {
        Self {
            tuning: [Pitch::new(55), Pitch::new(62), Pitch::new(69), Pitch::new(76)],
            max_above_open: [19, 20, 20, 20],
            range: PitchRange::new(55, 96),
            shift_cost: 0.1,
            high_position_threshold: [65, 72, 79, 86],
        }
    }

    /// Solo cello: C2 G2 D3 A3, range C2..E5.
    #[must_use]
    pub fn cello() -> Self {
        Self {
            tuning: [Pitch::new(36), Pitch::new(43), Pitch::new(50), Pitch::new(57)],
            max_above_open: [19, 19, 19, 19],
            range: PitchRange::new(36, 76),
            shift_cost: 0.2,
            high_position_threshold: [48, 55, 62, 69],
        }
    }

    /// Open-string pitches, low to high.
    #[must_use]
    pub fn tuning(&self) -> &[Pitch; 4] {
        &self.tuning
    }

    /// Whether the pitch is an open string.
    #[must_use]
    pub fn is_open_string(&self, pitch: Pitch) -> bool {
        self.tuning.contains(&pitch)
    }

    /// Every string/position able to produce the pitch.
    #[must_use]
    pub fn positions_for(&self, pitch: Pitch) -> SmallVec<[FingerPosition; 4]> {
        let mut positions = SmallVec::new();
        for (idx, open) in self.tuning.iter().enumerate() {
            if pitch < *open {
                continue;
            }
            let above = pitch.distance_to(*open);
            if above <= self.max_above_open[idx] {
                positions.push(FingerPosition {
                    string: idx as u8,
                    semitones_above_open: above,
                });
            }
        }
        positions
    }

    /// Whether two pitches form a physically feasible double stop:
    /// adjacent strings, compatible left-hand positions.
    #[must_use]
    pub fn is_double_stop_feasible(&self, a: Pitch, b: Pitch) -> bool {
        for pos_a in self.positions_for(a) {
            for pos_b in self.positions_for(b) {
                if pos_a.string == pos_b.string {
                    continue;
                }
                if pos_a.string.abs_diff(pos_b.string) != 1 {
                    continue;
                }
                // Open strings combine with anything on the neighbour.
                if pos_a.semitones_above_open == 0 || pos_b.semitones_above_open == 0 {
                    return true;
                }
                if pos_a.semitones_above_open.abs_diff(pos_b.semitones_above_open)
                    <= MAX_POSITION_SPREAD
                {
                    return true;
                }
            }
        }
        false
    }

    /// Cost of the easiest fingering for a feasible double stop.
    #[must_use]
    pub fn double_stop_cost(&self, a: Pitch, b: Pitch) -> f32 {
        if !self.is_double_stop_feasible(a, b) {
            return Self::IMPOSSIBLE;
        }
        let mut best = Self::IMPOSSIBLE;
        for pos_a in self.positions_for(a) {
            for pos_b in self.positions_for(b) {
                if pos_a.string.abs_diff(pos_b.string) != 1 {
                    continue;
                }
                let open_bonus =
                    if pos_a.semitones_above_open == 0 || pos_b.semitones_above_open == 0 {
                        0.0
                    } else {
                        0.1
                    };
                let height = f32::from(pos_a.semitones_above_open.max(pos_b.semitones_above_open));
                let cost = open_bonus + height * self.shift_cost * 0.5;
                if cost < best {
                    best = cost;
                }
            }
        }
        best
    }

    /// Whether the easiest fingering for the pitch is in a high position.
    #[must_use]
    pub fn is_high_position(&self, pitch: Pitch) -> bool {
        self.positions_for(pitch)
            .iter()
            .all(|pos| pitch.midi() > self.high_position_threshold[usize::from(pos.string)])
    }
}

impl Playability for BowedModel {
    fn range(&self) -> PitchRange {
        self.range
    }

    fn pitch_cost(&self, pitch: Pitch) -> f32 {
        let positions = self.positions_for(pitch);
        let Some(easiest) = positions
            .iter()
            .map(|pos| f32::from(pos.semitones_above_open) * self.shift_cost)
            .min_by(f32::total_cmp)
        else {
            return Self::IMPOSSIBLE;
        };
        easiest
    }
}
