//! score/organum-score/src/note.rs
//! The atomic output unit and its provenance machinery.
//!
//! Every repair pass gates its edits on the note's [`Protection`] level,
//! derived from the [`NoteSource`] provenance tag, and records what it
//! touched in the [`Repairs`] bitset. The bitset is how passes observe
//! each other without sharing mutable state.

use bitflags::bitflags;
use organum_theory::Pitch;
use organum_time::Tick;
use serde::{Deserialize, Serialize};

/// Provenance of a note: which structural role emitted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteSource {
    /// Passacaglia ground bass theme. Immutable.
    GroundBass,
    /// Goldberg-style aria bass. Immutable.
    GoldbergBass,
    /// Chorale cantus firmus. Immutable.
    CantusFixed,
    /// Pedal point or structural pedal line. Octave shifts allowed.
    PedalPoint,
    /// Free counterpoint, open to any rewrite.
    FreeCounterpoint,
    /// Unclassified; treated as free counterpoint.
    Unknown,
}

/// How much a repair pass may alter a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Protection {
    /// No changes at all.
    Immutable,
    /// Octave shift only, and only to bring into range.
    SemiImmutable,
    /// Octave shift; degree shift only when no octave fits the range.
    Structural,
    /// Any rewrite.
    Flexible,
}

impl NoteSource {
    /// Protection level granted to notes with this provenance.
    #[must_use]
    pub const fn protection(self) -> Protection {
        match self {
            Self::GroundBass | Self::GoldbergBass | Self::CantusFixed => Protection::Immutable,
            Self::PedalPoint => Protection::Structural,
            Self::FreeCounterpoint | Self::Unknown => Protection::Flexible,
        }
    }
}

bitflags! {
    /// Which repair passes touched a note.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Repairs: u16 {
        /// Snapped to a chord tone.
        const CHORD_SNAP = 1 << 0;
        /// Displaced by an octave.
        const OCTAVE_ADJUST = 1 << 1;
        /// Duration trimmed to remove an overlap.
        const OVERLAP_TRIM = 1 << 2;
        /// Duration altered for articulation (breath, quantize).
        const ARTICULATION = 1 << 3;
        /// Moved off a repeated pitch.
        const REPEATED_PITCH = 1 << 4;
        /// Adjusted by leap resolution.
        const LEAP_RESOLUTION = 1 << 5;
        /// Adjusted by parallel-perfect repair.
        const PARALLEL_FIX = 1 << 6;
        /// Snapped onto the diatonic scale.
        const DIATONIC_SNAP = 1 << 7;
        /// Adjusted by voice separation.
        const SEPARATION = 1 << 8;
        /// Expanded from an ornament host.
        const ORNAMENTED = 1 << 9;
        /// Adjusted by the strong-beat consonance pass.
        const CONSONANCE_FIX = 1 << 10;
    }
}

/// A single timed note in a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    /// Start position in ticks (non-negative by construction).
    pub start_tick: Tick,
    /// Sounding length in ticks; always positive in a completed score.
    pub duration: Tick,
    /// MIDI pitch.
    pub pitch: Pitch,
    /// MIDI velocity (organ pieces fix this at 80).
    pub velocity: u8,
    /// Logical voice index within the piece.
    pub voice: u8,
    /// Provenance tag driving protection.
    pub source: NoteSource,
    /// Repair passes that touched this note.
    pub repairs: Repairs,
}

impl NoteEvent {
    /// Construct a note with empty repair history.
    #[must_use]
    pub fn new(
        start_tick: Tick,
        duration: Tick,
        pitch: Pitch,
        velocity: u8,
        voice: u8,
        source: NoteSource,
    ) -> Self {
        Self { start_tick, duration, pitch, velocity, voice, source, repairs: Repairs::empty() }
    }

    /// Tick one past the end of the note.
    #[must_use]
    pub fn end_tick(self) -> Tick {
        self.start_tick + self.duration
    }

    /// Whether this note is sounding at `tick`.
    #[must_use]
    pub fn sounds_at(self, tick: Tick) -> bool {
        self.start_tick <= tick && tick < self.end_tick()
    }

    /// Whether this note overlaps another in time.
    #[must_use]
    pub fn overlaps(self, other: &NoteEvent) -> bool {
        self.start_tick < other.end_tick() && other.start_tick < self.end_tick()
    }

    /// Protection level derived from provenance.
    #[must_use]
    pub fn protection(self) -> Protection {
        self.source.protection()
    }
}

/// Sort notes by `(start_tick, pitch)` — the track invariant.
pub fn sort_notes(notes: &mut [NoteEvent]) {
    notes.sort_by(|a, b| {
        a.start_tick.cmp(&b.start_tick).then(a.pitch.cmp(&b.pitch))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(start: Tick, dur: Tick, pitch: u8) -> NoteEvent {
        NoteEvent::new(start, dur, Pitch::new(pitch), 80, 0, NoteSource::FreeCounterpoint)
    }

    #[test]
    fn protection_follows_provenance() {
        assert_eq!(NoteSource::GroundBass.protection(), Protection::Immutable);
        assert_eq!(NoteSource::CantusFixed.protection(), Protection::Immutable);
        assert_eq!(NoteSource::PedalPoint.protection(), Protection::Structural);
        assert_eq!(NoteSource::FreeCounterpoint.protection(), Protection::Flexible);
        assert_eq!(NoteSource::Unknown.protection(), Protection::Flexible);
    }

    #[test]
    fn protection_orders_strictest_first() {
        assert!(Protection::Immutable < Protection::SemiImmutable);
        assert!(Protection::SemiImmutable < Protection::Structural);
        assert!(Protection::Structural < Protection::Flexible);
    }

    #[test]
    fn sounding_window_is_half_open() {
        let n = note(480, 240, 60);
        assert!(!n.sounds_at(479));
        assert!(n.sounds_at(480));
        assert!(n.sounds_at(719));
        assert!(!n.sounds_at(720));
    }

    #[test]
    fn overlap_detection() {
        let a = note(0, 480, 60);
        assert!(a.overlaps(&note(240, 480, 64)));
        assert!(!a.overlaps(&note(480, 480, 64)));
    }

    #[test]
    fn sorting_breaks_ties_by_pitch() {
        let mut notes = vec![note(480, 240, 67), note(0, 240, 64), note(480, 240, 60)];
        sort_notes(&mut notes);
        assert_eq!(notes[0].start_tick, 0);
        assert_eq!(notes[1].pitch.midi(), 60);
        assert_eq!(notes[2].pitch.midi(), 67);
    }

    #[test]
    fn repair_bits_accumulate() {
        let mut n = note(0, 480, 60);
        n.repairs |= Repairs::CHORD_SNAP;
        n.repairs |= Repairs::OCTAVE_ADJUST;
        assert!(n.repairs.contains(Repairs::CHORD_SNAP | Repairs::OCTAVE_ADJUST));
        assert!(!n.repairs.contains(Repairs::ORNAMENTED));
    }
}
