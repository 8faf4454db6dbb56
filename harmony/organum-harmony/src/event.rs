//! harmony/organum-harmony/src/event.rs
//! A half-open span of governed harmony.

use organum_theory::{Chord, KeySignature, Pitch, PitchRange};
use organum_time::Tick;

/// Pedal register used to clamp event bass pitches (C1..=D3, the organ
/// pedal compass).
#[must_use]
pub fn bass_register() -> PitchRange {
    PitchRange::new(24, 50)
}

/// A harmonic event: `[tick, end_tick)` under one key and chord.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicEvent {
    /// Start tick (inclusive).
    pub tick: Tick,
    /// End tick (exclusive); equals the next event's start.
    pub end_tick: Tick,
    /// Governing key and mode.
    pub key: KeySignature,
    /// Governing chord.
    pub chord: Chord,
    /// Explicit bass pitch, clamped into the bass register.
    pub bass_pitch: Pitch,
    /// Non-negative structural weight.
    pub weight: f32,
}

impl HarmonicEvent {
    /// Construct an event, deriving the bass pitch from the chord root.
    #[must_use]
    pub fn new(tick: Tick, end_tick: Tick, key: KeySignature, chord: Chord) -> Self {
        let bass = bass_register().clamp(chord.root.in_octave(1));
        Self { tick, end_tick, key, chord, bass_pitch: bass, weight: 1.0 }
    }

    /// Span length in ticks.
    #[must_use]
    pub fn duration(&self) -> Tick {
        self.end_tick - self.tick
    }

    /// Whether the event covers `tick`.
    #[must_use]
    pub fn covers(&self, tick: Tick) -> bool {
        self.tick <= tick && tick < self.end_tick
    }

    /// Copy of this event shifted later by `offset` ticks.
    #[must_use]
    pub fn shifted(&self, offset: Tick) -> Self {
        Self { tick: self.tick + offset, end_tick: self.end_tick + offset, ..*self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use organum_theory::{ChordDegree, ChordQuality, PitchClass};

    fn event(tick: Tick, end: Tick) -> HarmonicEvent {
        let key = KeySignature::major(PitchClass::new(0));
        let chord = Chord::new(PitchClass::new(0), ChordQuality::Major, ChordDegree::I);
        HarmonicEvent::new(tick, end, key, chord)
    }

    #[test]
    fn coverage_is_half_open() {
        let ev = event(480, 960);
        assert!(!ev.covers(479));
        assert!(ev.covers(480));
        assert!(ev.covers(959));
        assert!(!ev.covers(960));
    }

    #[test]
    fn bass_pitch_lands_in_the_pedal_register() {
        let key = KeySignature::minor(PitchClass::new(11));
        let chord = Chord::new(PitchClass::new(11), ChordQuality::Minor, ChordDegree::I);
        let ev = HarmonicEvent::new(0, 480, key, chord);
        assert!(bass_register().contains(ev.bass_pitch));
        assert_eq!(ev.bass_pitch.class().value(), 11);
    }

    #[test]
    fn shifting_preserves_duration() {
        let ev = event(0, 1920).shifted(3840);
        assert_eq!(ev.tick, 3840);
        assert_eq!(ev.end_tick, 5760);
        assert_eq!(ev.duration(), 1920);
    }
}
