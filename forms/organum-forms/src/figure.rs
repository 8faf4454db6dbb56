//! forms/organum-forms/src/figure.rs
//! Per-voice note emitters: scale passages, arpeggios, chord pads, and
//! the moto perpetuo line.
//!
//! Each primitive returns a sorted note list lying entirely within its
//! span. They are pure functions of the harmonic context plus the RNG.

use organum_harmony::{HarmonicEvent, HarmonicTimeline};
use organum_rand::SeededRng;
use organum_score::{NoteEvent, NoteSource, ORGAN_VELOCITY};
use organum_theory::{KeySignature, Pitch, PitchRange};
use organum_time::{
    duration::{HALF_NOTE, SIXTEENTH_NOTE, WHOLE_NOTE},
    is_strong_beat, Tick,
};

/// Soft band half-width for the moto perpetuo line, in semitones.
const MOTO_BAND: u8 = 14;

/// Construct a free-counterpoint note at organ velocity.
#[must_use]
pub fn note_on(tick: Tick, duration: Tick, pitch: Pitch, voice: u8, source: NoteSource) -> NoteEvent {
    NoteEvent::new(tick, duration, pitch, ORGAN_VELOCITY, voice, source)
}

/// Stepwise walker over an index into a tone array, reversing at edges.
struct Walker {
    idx: usize,
    ascending: bool,
}

impl Walker {
    fn new(idx: usize, ascending: bool) -> Self {
        Self { idx, ascending }
    }

    fn advance(&mut self, step: usize, len: usize) {
        if self.ascending {
            if self.idx + step < len {
                self.idx += step;
            } else {
                self.ascending = false;
                self.idx = self.idx.saturating_sub(step);
            }
        } else if self.idx >= step {
            self.idx -= step;
        } else {
            self.ascending = true;
            if self.idx + step < len {
                self.idx += step;
            } else if len > 0 {
                self.idx = len - 1;
            }
        }
    }
}

/// Stepwise scale passage across one harmonic event.
///
/// Direction alternates with `pattern_index` (even ascends); roughly 15%
/// of moves skip a third, and the line folds back at the range edges.
#[must_use]
pub fn scale_passage(
    event: &HarmonicEvent,
    range: PitchRange,
    voice: u8,
    note_duration: Tick,
    pattern_index: usize,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let mut notes = Vec::new();
    let tones = event.key.scale().tones_in_range(event.key.tonic, range.low, range.high);
    if tones.is_empty() {
        return notes;
    }

    let ascending = pattern_index % 2 == 0;
    let start_idx = if ascending {
        rng.range(0, (tones.len() as i32 - 1) / 3) as usize
    } else {
        let hi = tones.len() as i32 - 1;
        let lo = (tones.len() as i32 * 2 / 3).min(hi);
        rng.range(lo, hi) as usize
    };

    let mut walker = Walker::new(start_idx, ascending);
    let mut tick = event.tick;
    while tick < event.end_tick {
        let dur = note_duration.min(event.end_tick - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(tick, dur, tones[walker.idx], voice, NoteSource::FreeCounterpoint));
        tick += dur;

        let step = if rng.chance(0.15) { 2 } else { 1 };
        walker.advance(step, tones.len());
    }
    notes
}

/// Zig-zag arpeggio through the event's chord tones across the range.
#[must_use]
pub fn arpeggio_passage(
    event: &HarmonicEvent,
    range: PitchRange,
    voice: u8,
    note_duration: Tick,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let mut notes = Vec::new();
    let tones = event.chord.tones_in_range(range.low, range.high);
    if tones.is_empty() {
        return notes;
    }

    let start = rng.range(0, tones.len() as i32 - 1) as usize;
    let ascending = rng.chance(0.6);
    let mut walker = Walker::new(start, ascending);

    let mut tick = event.tick;
    while tick < event.end_tick {
        let dur = note_duration.min(event.end_tick - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(tick, dur, tones[walker.idx], voice, NoteSource::FreeCounterpoint));
        tick += dur;
        walker.advance(1, tones.len());
    }
    notes
}

/// Sustained chord pad in half and whole notes, choosing the chord tone
/// nearest the previous pitch for minimal motion.
#[must_use]
pub fn chord_pad(
    timeline: &HarmonicTimeline,
    range: PitchRange,
    voice: u8,
    start_tick: Tick,
    end_tick: Tick,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let mut notes = Vec::new();
    let mut prev = range.center();

    let mut tick = start_tick;
    while tick < end_tick {
        let event = timeline.get_at(tick);
        let search = PitchRange::new(
            prev.midi().saturating_sub(12).max(range.low.midi()),
            (prev.midi() + 12).min(range.high.midi()),
        );
        let tone = event
            .chord
            .nearest_tone(prev, search.low, search.high)
            .or_else(|| event.chord.nearest_tone(prev, range.low, range.high));
        let Some(pitch) = tone else {
            tick += HALF_NOTE;
            continue;
        };

        let mut dur = if rng.chance(0.4) { WHOLE_NOTE } else { HALF_NOTE };
        dur = dur.min(end_tick - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(tick, dur, pitch, voice, NoteSource::FreeCounterpoint));
        prev = pitch;
        tick += dur;
    }
    notes
}

/// Continuous sixteenth notes with no rests.
///
/// Strong beats snap to the nearest chord tone; weak beats take a one-step
/// scale move (rarely two). A ±14-semitone soft band around the entry
/// pitch keeps the line from roaming the whole compass.
#[must_use]
pub fn moto_perpetuo(
    timeline: &HarmonicTimeline,
    key: KeySignature,
    range: PitchRange,
    voice: u8,
    start_tick: Tick,
    end_tick: Tick,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let mut notes = Vec::new();
    let tones = key.scale().tones_in_range(key.tonic, range.low, range.high);
    if tones.is_empty() {
        return notes;
    }

    let center = tones[tones.len() / 2];
    let mut walker = Walker::new(tones.len() / 2, true);

    let mut tick = start_tick;
    while tick < end_tick {
        let dur = SIXTEENTH_NOTE.min(end_tick - tick);
        if dur == 0 {
            break;
        }

        if is_strong_beat(tick) {
            let current = tones[walker.idx];
            let low = Pitch::new(current.midi().saturating_sub(MOTO_BAND).max(range.low.midi()));
            let high = Pitch::new((current.midi() + MOTO_BAND).min(range.high.midi()));
            let event = timeline.get_at(tick);
            if let Some(best) = event.chord.nearest_tone(current, low, high) {
                if let Some(idx) = tones.iter().position(|t| *t >= best) {
                    walker.idx = idx;
                }
            }
        } else {
            let step = if rng.chance(0.15) { 2 } else { 1 };
            walker.advance(step, tones.len());
        }

        // Soft band: fold the direction back toward the entry pitch.
        if tones[walker.idx].midi() > center.midi() + MOTO_BAND {
            walker.ascending = false;
        } else if tones[walker.idx].midi() + MOTO_BAND < center.midi() {
            walker.ascending = true;
        }
        if rng.chance(0.08) {
            walker.ascending = !walker.ascending;
        }

        notes.push(note_on(tick, dur, tones[walker.idx], voice, NoteSource::FreeCounterpoint));
        tick += dur;
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use organum_harmony::Resolution;
    use organum_theory::PitchClass;
    use organum_time::TICKS_PER_BAR;

    fn setup() -> (HarmonicTimeline, KeySignature) {
        let key = KeySignature::major(PitchClass::new(0));
        (HarmonicTimeline::standard(key, 4 * TICKS_PER_BAR, Resolution::Bar), key)
    }

    fn in_span_and_sorted(notes: &[NoteEvent], start: Tick, end: Tick) {
        for pair in notes.windows(2) {
            assert!(pair[0].start_tick <= pair[1].start_tick);
        }
        for n in notes {
            assert!(n.start_tick >= start);
            assert!(n.end_tick() <= end);
            assert!(n.duration > 0);
        }
    }

    #[test]
    fn scale_passage_stays_in_range_and_scale() {
        let (timeline, key) = setup();
        let mut rng = SeededRng::new(42);
        let range = PitchRange::new(48, 84);
        let event = timeline.events()[0];
        let notes = scale_passage(&event, range, 0, 240, 0, &mut rng);
        assert!(!notes.is_empty());
        in_span_and_sorted(&notes, event.tick, event.end_tick);
        for n in &notes {
            assert!(range.contains(n.pitch));
            assert!(key.scale().contains(n.pitch, key.tonic));
        }
    }

    #[test]
    fn arpeggio_emits_only_chord_tones() {
        let (timeline, _) = setup();
        let mut rng = SeededRng::new(7);
        let range = PitchRange::new(48, 84);
        let event = timeline.events()[1]; // IV chord
        let notes = arpeggio_passage(&event, range, 0, 240, &mut rng);
        assert!(!notes.is_empty());
        for n in &notes {
            assert!(event.chord.contains(n.pitch), "{}", n.pitch);
        }
    }

    #[test]
    fn chord_pad_moves_minimally() {
        let (timeline, _) = setup();
        let mut rng = SeededRng::new(3);
        let range = PitchRange::new(48, 72);
        let notes = chord_pad(&timeline, range, 1, 0, 4 * TICKS_PER_BAR, &mut rng);
        assert!(!notes.is_empty());
        in_span_and_sorted(&notes, 0, 4 * TICKS_PER_BAR);
        for pair in notes.windows(2) {
            assert!(pair[1].pitch.distance_to(pair[0].pitch) <= 12);
        }
    }

    #[test]
    fn moto_perpetuo_has_no_rests() {
        let (timeline, key) = setup();
        let mut rng = SeededRng::new(42);
        let range = PitchRange::new(36, 96);
        let notes =
            moto_perpetuo(&timeline, key, range, 0, 0, 2 * TICKS_PER_BAR, &mut rng);
        assert_eq!(notes.len(), 2 * 16);
        let mut expected = 0;
        for n in &notes {
            assert_eq!(n.start_tick, expected);
            assert_eq!(n.duration, SIXTEENTH_NOTE);
            expected = n.end_tick();
        }
    }

    #[test]
    fn moto_perpetuo_respects_the_soft_band() {
        let (timeline, key) = setup();
        let mut rng = SeededRng::new(11);
        let range = PitchRange::new(36, 96);
        let notes =
            moto_perpetuo(&timeline, key, range, 0, 0, 8 * TICKS_PER_BAR, &mut rng);
        let tones = key.scale().tones_in_range(key.tonic, range.low, range.high);
        let center = tones[tones.len() / 2];
        for n in &notes {
            // The band is soft: chord snaps may poke past it briefly, but
            // never by more than a few semitones.
            assert!(n.pitch.distance_to(center) <= MOTO_BAND + 8, "{}", n.pitch);
        }
    }
}
