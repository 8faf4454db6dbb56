//! forms/organum-forms/src/techniques.rs
//! Shared baroque organ performance devices: the Picardy third and
//! registration plans.
//!
//! Registration models stop density, not key velocity — organ notes stay
//! at the fixed velocity, and the plan rides along as auxiliary data for
//! whatever renders the score.

use organum_score::NoteEvent;
use organum_theory::{KeySignature, PitchRange};
use organum_time::Tick;
use serde::{Deserialize, Serialize};

/// Raise minor-third pitch classes to major in the final bar of a
/// minor-key piece. No-op in major keys; a raise that would leave the
/// voice range is skipped rather than clamped.
pub fn apply_picardy(
    notes: &mut [NoteEvent],
    key: KeySignature,
    final_bar_tick: Tick,
    range: PitchRange,
) {
    if !key.is_minor() {
        return;
    }
    let minor_third = key.tonic.transpose(3);
    for note in notes {
        if note.start_tick >= final_bar_tick && note.pitch.class() == minor_third {
            let raised = note.pitch.transpose(1);
            if range.contains(raised) {
                note.pitch = raised;
            }
        }
    }
}

/// A labelled stop-density level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopLevel {
    /// Light stops: flute 8', principal 4'.
    Piano,
    /// Principal chorus 8', 4', 2'.
    Mezzo,
    /// Full principals and flutes.
    Forte,
    /// Principals with mixtures.
    Pleno,
    /// Everything, reeds included.
    Tutti,
}

/// One registration change at a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationPoint {
    /// Where the change takes effect.
    pub tick: Tick,
    /// The stop density from this point on.
    pub level: StopLevel,
    /// Human-readable label for the rendering layer.
    pub label: String,
}

/// An ordered plan of registration changes across a piece.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationPlan {
    /// Change points in tick order.
    pub points: Vec<RegistrationPoint>,
}

impl RegistrationPlan {
    /// Append a change point, keeping tick order.
    pub fn add_point(&mut self, tick: Tick, level: StopLevel, label: impl Into<String>) {
        self.points.push(RegistrationPoint { tick, level, label: label.into() });
        self.points.sort_by_key(|p| p.tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use organum_score::NoteSource;
    use organum_theory::{Pitch, PitchClass};

    fn mk(start: Tick, pitch: u8) -> NoteEvent {
        NoteEvent::new(start, 480, Pitch::new(pitch), 80, 0, NoteSource::FreeCounterpoint)
    }

    #[test]
    fn picardy_raises_the_final_third() {
        let key = KeySignature::minor(PitchClass::new(0));
        let range = PitchRange::new(36, 96);
        // E-flat inside the final bar becomes E natural; earlier ones stay.
        let mut notes = vec![mk(0, 63), mk(4000, 63), mk(4000, 60)];
        apply_picardy(&mut notes, key, 3840, range);
        assert_eq!(notes[0].pitch.midi(), 63);
        assert_eq!(notes[1].pitch.midi(), 64);
        assert_eq!(notes[2].pitch.midi(), 60);
    }

    #[test]
    fn picardy_is_a_noop_in_major() {
        let key = KeySignature::major(PitchClass::new(0));
        let mut notes = vec![mk(4000, 63)];
        apply_picardy(&mut notes, key, 3840, PitchRange::new(36, 96));
        assert_eq!(notes[0].pitch.midi(), 63);
    }

    #[test]
    fn picardy_skips_raises_that_leave_the_range() {
        let key = KeySignature::minor(PitchClass::new(11));
        // D3 is the minor third of B minor and sits at the pedal ceiling.
        let mut notes = vec![mk(4000, 50)];
        apply_picardy(&mut notes, key, 3840, PitchRange::new(24, 50));
        assert_eq!(notes[0].pitch.midi(), 50);
    }

    #[test]
    fn registration_points_stay_ordered() {
        let mut plan = RegistrationPlan::default();
        plan.add_point(3840, StopLevel::Forte, "forte");
        plan.add_point(0, StopLevel::Piano, "piano");
        plan.add_point(1920, StopLevel::Mezzo, "mezzo");
        let ticks: Vec<Tick> = plan.points.iter().map(|p| p.tick).collect();
        assert_eq!(ticks, vec![0, 1920, 3840]);
        assert_eq!(plan.points[0].level, StopLevel::Piano);
    }
}
