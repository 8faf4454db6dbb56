//! instrument/organum-instrument/src/organ.rs
//! Pipe organ ranges and the soft pedal penalty.
//!
//! The organ imposes no simultaneity limit (stops, not hands, set the
//! texture), so its physical model reduces to per-manual ranges plus a
//! soft cost for pedal notes drifting out of the comfortable compass.

use organum_score::OrganManual;
use organum_theory::{Pitch, PitchRange};

use crate::kind::Playability;

/// Penalty per semitone outside the ideal pedal range. A soft cost, not
/// a hard rejection.
pub const PEDAL_PENALTY_PER_SEMITONE: f32 = 5.0;

/// Organ manual and pedal ranges, Bach-era defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganSpec {
    /// Manual I range.
    pub great: PitchRange,
    /// Manual II range.
    pub swell: PitchRange,
    /// Manual III range.
    pub positiv: PitchRange,
    /// Pedal range.
    pub pedal: PitchRange,
}

impl Default for OrganSpec {
    fn default() -> Self {
        Self {
            great: OrganManual::Great.range(),
            swell: OrganManual::Swell.range(),
            positiv: OrganManual::Positiv.range(),
            pedal: OrganManual::Pedal.range(),
        }
    }
}

impl OrganSpec {
    /// Range of a specific manual.
    #[must_use]
    pub fn manual_range(&self, manual: OrganManual) -> PitchRange {
        match manual {
            OrganManual::Great => self.great,
            OrganManual::Swell => self.swell,
            OrganManual::Positiv => self.positiv,
            OrganManual::Pedal => self.pedal,
        }
    }

    /// Soft penalty for a pedal pitch outside the ideal compass.
    #[must_use]
    pub fn pedal_penalty(&self, pitch: Pitch) -> f32 {
        if self.pedal.contains(pitch) {
            return 0.0;
        }
        let distance = if pitch < self.pedal.low {
            self.pedal.low.distance_to(pitch)
        } else {
            pitch.distance_to(self.pedal.high)
        };
        f32::from(distance) * PEDAL_PENALTY_PER_SEMITONE
    }
}

impl Playability for OrganSpec {
    fn range(&self) -> PitchRange {
        // Union of pedal and manual compasses.
        PitchRange::new(self.pedal.low.midi(), self.great.high.midi())
    }

    fn pitch_cost(&self, pitch: Pitch) -> f32 {
        if self.range().contains(pitch) { 0.0 } else { Self::IMPOSSIBLE }
    }
}
