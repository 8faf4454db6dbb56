//! instrument/organum-instrument/src/guard.rs
//! Final reconciliation of a score with the target instrument.
//!
//! Two passes. The range pass moves out-of-range notes by octave,
//! preserving melodic contour when it can and never touching Immutable
//! notes. The simultaneity pass sweeps note-on/note-off boundaries,
//! reconstructs what sounds together, and applies the repair ladder:
//! drop Flexible notes, octave-shift infeasible double stops, spread
//! bowed chords with tiny tick offsets (never across a beat head), or
//! ask the keyboard model for a playable voicing.

use std::collections::HashMap;

use organum_score::{NoteEvent, NoteSource, Protection, Track};
use organum_theory::{Pitch, PitchRange};
use organum_time::is_beat_head;

use crate::bowed::BowedModel;
use crate::fretted::GuitarModel;
use crate::keyboard::{KeyboardModel, SpanConstraints};
use crate::kind::{InstrumentKind, Playability};
use crate::organ::OrganSpec;

/// Largest tiny-offset delta used to arpeggiate a bowed chord.
const TINY_OFFSET_MAX: u32 = 3;

/// What the guard did to the score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardOutcome {
    /// Notes modified or dropped.
    pub changes: u32,
    /// Violations left in place because protection forbade every fix.
    pub unresolved: u32,
}

/// A simultaneity violation found at a sweep boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Violation {
    None,
    TooManySimultaneous,
    InfeasibleDoubleStop,
}

enum Backend {
    Organ(OrganSpec),
    Keyboard(KeyboardModel),
    Bowed(BowedModel),
    Fretted(GuitarModel),
}

/// The final pass reconciling a score with one instrument's physics.
pub struct ImpossibilityGuard {
    backend: Backend,
}

impl ImpossibilityGuard {
    /// Build the guard for an instrument family.
    #[must_use]
    pub fn for_kind(kind: InstrumentKind) -> Self {
        let backend = match kind {
            InstrumentKind::Organ => Backend::Organ(OrganSpec::default()),
            InstrumentKind::Harpsichord => Backend::Keyboard(KeyboardModel::harpsichord()),
            InstrumentKind::Piano => {
                Backend::Keyboard(KeyboardModel::piano(SpanConstraints::intermediate()))
            }
            InstrumentKind::Violin => Backend::Bowed(BowedModel::violin()),
            InstrumentKind::Cello => Backend::Bowed(BowedModel::cello()),
            InstrumentKind::Guitar => Backend::Fretted(GuitarModel),
        };
        Self { backend }
    }

    /// Playable compass of the target instrument.
    #[must_use]
    pub fn range(&self) -> PitchRange {
        match &self.backend {
            Backend::Organ(spec) => spec.range(),
            Backend::Keyboard(kb) => kb.range(),
            Backend::Bowed(bowed) => bowed.range(),
            Backend::Fretted(guitar) => guitar.range(),
        }
    }

    /// Run both passes over the tracks, in place.
    pub fn enforce(&self, tracks: &mut [Track]) -> GuardOutcome {
        let mut outcome = GuardOutcome::default();
        self.fix_ranges(tracks, &mut outcome);
        self.fix_simultaneity(tracks, &mut outcome);

        for track in tracks.iter_mut() {
            track.notes.retain(|n| n.duration > 0);
            track.sort();
        }
        outcome
    }

    // --- Pass 1: range ---

    fn fix_ranges(&self, tracks: &mut [Track], outcome: &mut GuardOutcome) {
        let range = self.range();
        let mut prev_by_voice: HashMap<u8, Pitch> = HashMap::new();

        for track in tracks.iter_mut() {
            for note in &mut track.notes {
                if note.duration == 0 {
                    continue;
                }
                if range.contains(note.pitch) {
                    prev_by_voice.insert(note.voice, note.pitch);
                    continue;
                }
                let prev = prev_by_voice.get(&note.voice).copied();
                match fix_pitch_range(note.pitch, note.protection(), prev, range) {
                    Some(fixed) if fixed != note.pitch => {
                        note.pitch = fixed;
                        outcome.changes += 1;
                    }
                    Some(_) => {}
                    None => {
                        log::warn!(
                            "impossibility guard: {:?} note pitch {} outside [{}, {}], left intact",
                            note.source,
                            note.pitch,
                            range.low,
                            range.high
                        );
                        outcome.unresolved += 1;
                    }
                }
                prev_by_voice.insert(note.voice, note.pitch);
            }
        }
    }

    // --- Pass 2: simultaneity ---

    fn fix_simultaneity(&self, tracks: &mut [Track], outcome: &mut GuardOutcome) {
        if matches!(self.backend, Backend::Organ(_)) {
            // The organ sets no simultaneity limit.
            return;
        }

        // Flatten to (track, note) pairs so repairs can mutate freely.
        let mut flat: Vec<(usize, NoteEvent)> = Vec::new();
        for (trk, track) in tracks.iter_mut().enumerate() {
            for note in track.notes.drain(..) {
                if note.duration > 0 {
                    flat.push((trk, note));
                }
            }
        }

        // Boundary events: note-offs sort before note-ons at the same tick.
        let mut boundaries: Vec<(u32, bool, usize)> = Vec::with_capacity(flat.len() * 2);
        for (idx, (_, note)) in flat.iter().enumerate() {
            boundaries.push((note.start_tick, false, idx));
            boundaries.push((note.end_tick(), true, idx));
        }
        boundaries.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut active: Vec<usize> = Vec::new();
        let mut cursor = 0;
        while cursor < boundaries.len() {
            let tick = boundaries[cursor].0;
            while cursor < boundaries.len() && boundaries[cursor].0 == tick {
                let (_, is_off, idx) = boundaries[cursor];
                if is_off {
                    active.retain(|a| *a != idx);
                } else {
                    active.push(idx);
                }
                cursor += 1;
            }
            active.retain(|idx| flat[*idx].1.duration > 0);
            if active.len() < 2 {
                continue;
            }

            let group: Vec<usize> = active.clone();
            if self.check_group(&flat, &group) != Violation::None {
                self.repair_group(&mut flat, &group, tick, outcome);
                active.retain(|idx| flat[*idx].1.duration > 0);
                if self.check_group(&flat, &active) != Violation::None {
                    outcome.unresolved += 1;
                }
            }
        }

        for (trk, note) in flat {
            tracks[trk].notes.push(note);
        }
    }

    fn check_group(&self, flat: &[(usize, NoteEvent)], group: &[usize]) -> Violation {
        if group.len() < 2 {
            return Violation::None;
        }
        match &self.backend {
            Backend::Organ(_) => Violation::None,
            Backend::Fretted(_) => Violation::TooManySimultaneous,
            Backend::Bowed(bowed) => {
                if group.len() >= 3 {
                    Violation::TooManySimultaneous
                } else if bowed
                    .is_double_stop_feasible(flat[group[0]].1.pitch, flat[group[1]].1.pitch)
                {
                    Violation::None
                } else {
                    Violation::InfeasibleDoubleStop
                }
            }
            Backend::Keyboard(kb) => {
                let mut pitches: Vec<Pitch> = group.iter().map(|i| flat[*i].1.pitch).collect();
                pitches.sort_unstable();
                if kb.is_voicing_playable(&pitches) {
                    Violation::None
                } else {
                    Violation::TooManySimultaneous
                }
            }
        }
    }

    fn repair_group(
        &self,
        flat: &mut [(usize, NoteEvent)],
        group: &[usize],
        tick: u32,
        outcome: &mut GuardOutcome,
    ) {
        // Strictest protection first.
        let mut ordered: Vec<usize> = group.to_vec();
        ordered.sort_by_key(|idx| flat[*idx].1.protection());

        match &self.backend {
            Backend::Organ(_) => {}
            Backend::Fretted(_) => {
                drop_flexible_from_back(flat, &mut ordered, outcome);
            }
            Backend::Bowed(bowed) => {
                if ordered.len() >= 3 {
                    spread_with_tiny_offsets(flat, &ordered, outcome);
                } else {
                    self.repair_double_stop(flat, &ordered, bowed, tick, outcome);
                }
            }
            Backend::Keyboard(kb) => {
                let mut by_pitch: Vec<usize> = group.to_vec();
                by_pitch.sort_by_key(|idx| flat[*idx].1.pitch);
                let pitches: Vec<Pitch> = by_pitch.iter().map(|i| flat[*i].1.pitch).collect();
                let suggested = kb.suggest_playable_voicing(&pitches);
                if suggested.len() == pitches.len() {
                    for (slot, idx) in by_pitch.iter().enumerate() {
                        let note = &mut flat[*idx].1;
                        if matches!(
                            note.protection(),
                            Protection::Immutable | Protection::SemiImmutable
                        ) {
                            continue;
                        }
                        if note.pitch != suggested[slot] {
                            note.pitch = suggested[slot];
                            outcome.changes += 1;
                        }
                    }
                } else {
                    drop_flexible_from_back(flat, &mut ordered, outcome);
                }
            }
        }
    }

    fn repair_double_stop(
        &self,
        flat: &mut [(usize, NoteEvent)],
        ordered: &[usize],
        bowed: &BowedModel,
        tick: u32,
        outcome: &mut GuardOutcome,
    ) {
        let (keep_idx, shift_idx) = (ordered[0], ordered[1]);
        let keep_level = flat[keep_idx].1.protection();
        let shift_level = flat[shift_idx].1.protection();

        if keep_level == Protection::Immutable && shift_level == Protection::Immutable {
            log::warn!(
                "impossibility guard: two Immutable notes in infeasible double stop at tick {tick}"
            );
            outcome.unresolved += 1;
            return;
        }

        if shift_level == Protection::Flexible {
            flat[shift_idx].1.duration = 0;
            outcome.changes += 1;
            return;
        }

        // Preserve the basso line; octave-shift the other note.
        let target = if is_basso(flat[shift_idx].1.source) && !is_basso(flat[keep_idx].1.source) {
            keep_idx
        } else {
            shift_idx
        };
        let pitch = flat[target].1.pitch;
        for shift in [12, -12] {
            let candidate = pitch.transpose(shift);
            if candidate != pitch && bowed.range().contains(candidate) {
                flat[target].1.pitch = candidate;
                outcome.changes += 1;
                return;
            }
        }
        outcome.unresolved += 1;
    }
}

/// Bass-line provenances the double-stop repair preserves.
fn is_basso(source: NoteSource) -> bool {
    matches!(
        source,
        NoteSource::GroundBass | NoteSource::GoldbergBass | NoteSource::PedalPoint
    )
}

/// Octave-shift acceptability: the interval to the previous pitch must
/// not grow and the contour direction must not flip.
fn octave_shift_acceptable(original: Pitch, shifted: Pitch, prev: Option<Pitch>) -> bool {
    let Some(prev) = prev else { return true };
    let orig_dist = original.distance_to(prev);
    let shift_dist = shifted.distance_to(prev);
    if shift_dist > orig_dist {
        return false;
    }
    let orig_dir = original.interval_from(prev).signum();
    let shift_dir = shifted.interval_from(prev).signum();
    !(orig_dir != 0 && shift_dir != 0 && orig_dir != shift_dir)
}

/// Range-pass fix for one out-of-range pitch. `None` means the note must
/// stay as-is (Immutable, or no displacement fits).
fn fix_pitch_range(
    pitch: Pitch,
    level: Protection,
    prev: Option<Pitch>,
    range: PitchRange,
) -> Option<Pitch> {
    if level == Protection::Immutable {
        return None;
    }

    let up = pitch.transpose(12);
    let down = pitch.transpose(-12);
    if range.contains(up) && octave_shift_acceptable(pitch, up, prev) {
        return Some(up);
    }
    if range.contains(down) && octave_shift_acceptable(pitch, down, prev) {
        return Some(down);
    }

    // Structural and SemiImmutable retry ignoring contour: out-of-range is
    // worse than a direction reversal.
    if matches!(level, Protection::Structural | Protection::SemiImmutable) {
        if range.contains(down) {
            return Some(down);
        }
        if range.contains(up) {
            return Some(up);
        }
        return None;
    }

    Some(range.clamp(pitch))
}

/// Drop Flexible notes from the least-protected end until one remains.
fn drop_flexible_from_back(
    flat: &mut [(usize, NoteEvent)],
    ordered: &mut Vec<usize>,
    outcome: &mut GuardOutcome,
) {
    while ordered.len() > 1 {
        let Some(&last) = ordered.last() else { break };
        if flat[last].1.protection() == Protection::Flexible {
            flat[last].1.duration = 0;
            ordered.pop();
            outcome.changes += 1;
        } else {
            break;
        }
    }
}

/// Convert a bowed chord into an arpeggio with 1..=3-tick offsets on the
/// least-protected notes. Structural notes on beat heads keep their tick.
fn spread_with_tiny_offsets(
    flat: &mut [(usize, NoteEvent)],
    ordered: &[usize],
    outcome: &mut GuardOutcome,
) {
    let mut delta: u32 = 1;
    for idx in ordered.iter().rev() {
        let note = &mut flat[*idx].1;
        match note.protection() {
            Protection::Immutable | Protection::SemiImmutable => continue,
            Protection::Structural if is_beat_head(note.start_tick) => continue,
            _ => {}
        }
        note.start_tick += delta;
        if note.duration > delta {
            note.duration -= delta;
        }
        outcome.changes += 1;
        delta = (delta + 1).min(TINY_OFFSET_MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use organum_score::sort_notes;

    fn note(start: u32, dur: u32, pitch: u8, voice: u8, source: NoteSource) -> NoteEvent {
        NoteEvent::new(start, dur, Pitch::new(pitch), 80, voice, source)
    }

    fn track_with(notes: Vec<NoteEvent>) -> Track {
        let mut t = Track::new(0, 19, "test");
        t.notes = notes;
        t
    }

    #[test]
    fn range_pass_shifts_flexible_notes_by_octave() {
        let guard = ImpossibilityGuard::for_kind(InstrumentKind::Violin);
        let mut tracks =
            vec![track_with(vec![note(0, 480, 40, 0, NoteSource::FreeCounterpoint)])];
        let outcome = guard.enforce(&mut tracks);
        assert!(outcome.changes >= 1);
        let fixed = tracks[0].notes[0].pitch;
        assert!(guard.range().contains(fixed));
        // One octave up from E2 is E3 (52), below the violin G string, so
        // the guard keeps climbing via clamp or lands in range.
        assert!(fixed.midi() >= 55);
    }

    #[test]
    fn range_pass_leaves_immutable_notes_and_counts_them() {
        let guard = ImpossibilityGuard::for_kind(InstrumentKind::Violin);
        let mut tracks = vec![track_with(vec![note(0, 480, 30, 0, NoteSource::GroundBass)])];
        let outcome = guard.enforce(&mut tracks);
        assert_eq!(tracks[0].notes[0].pitch.midi(), 30);
        assert!(outcome.unresolved >= 1);
    }

    #[test]
    fn bowed_triple_stop_becomes_an_arpeggio() {
        let guard = ImpossibilityGuard::for_kind(InstrumentKind::Violin);
        let mut tracks = vec![track_with(vec![
            note(480, 480, 55, 0, NoteSource::FreeCounterpoint),
            note(480, 480, 64, 1, NoteSource::FreeCounterpoint),
            note(480, 480, 72, 2, NoteSource::FreeCounterpoint),
        ])];
        guard.enforce(&mut tracks);
        let mut starts: Vec<u32> = tracks[0].notes.iter().map(|n| n.start_tick).collect();
        starts.sort_unstable();
        starts.dedup();
        // At least one note was nudged off the shared tick.
        assert!(starts.len() >= 2);
        // Offsets stay tiny.
        for s in &starts {
            assert!(*s - 480 <= TINY_OFFSET_MAX);
        }
    }

    #[test]
    fn guitar_drops_all_but_one_simultaneous_note() {
        let guard = ImpossibilityGuard::for_kind(InstrumentKind::Guitar);
        let mut tracks = vec![track_with(vec![
            note(0, 480, 52, 0, NoteSource::FreeCounterpoint),
            note(0, 480, 59, 1, NoteSource::FreeCounterpoint),
        ])];
        guard.enforce(&mut tracks);
        assert_eq!(tracks[0].notes.len(), 1);
    }

    #[test]
    fn organ_permits_dense_chords() {
        let guard = ImpossibilityGuard::for_kind(InstrumentKind::Organ);
        let notes: Vec<NoteEvent> = (0..6)
            .map(|i| note(0, 480, 48 + i * 4, i as u8, NoteSource::FreeCounterpoint))
            .collect();
        let mut tracks = vec![track_with(notes)];
        let outcome = guard.enforce(&mut tracks);
        assert_eq!(tracks[0].notes.len(), 6);
        assert_eq!(outcome.unresolved, 0);
    }

    #[test]
    fn enforce_restores_sort_order() {
        let guard = ImpossibilityGuard::for_kind(InstrumentKind::Organ);
        let mut tracks = vec![track_with(vec![
            note(960, 480, 60, 0, NoteSource::FreeCounterpoint),
            note(0, 480, 64, 0, NoteSource::FreeCounterpoint),
        ])];
        guard.enforce(&mut tracks);
        let mut sorted = tracks[0].notes.clone();
        sort_notes(&mut sorted);
        assert_eq!(sorted, tracks[0].notes);
    }
}
