//! forms/organum-forms/src/bass.rs
//! Pedal lines: walking bass and the thematic (augmented-motif) bass.

use organum_harmony::HarmonicTimeline;
use organum_rand::SeededRng;
use organum_score::{NoteEvent, NoteSource, Repairs};
use organum_theory::{KeySignature, PitchRange};
use organum_time::{
    duration::{HALF_NOTE, QUARTER_NOTE},
    Tick, TICKS_PER_BAR,
};

use crate::figure::note_on;
use crate::motif::{augment, transpose};
use crate::roles::organ_voice_range;

/// Pedal compass used by the bass generators.
fn pedal_range() -> PitchRange {
    organ_voice_range(3)
}

/// Walking bass for one phrase.
///
/// Fast movements walk four quarters per bar: root, a passing tone, a
/// weighted fifth/third/passing target, and a scale-step approach to the
/// next bar's root. Slow movements collapse to two half notes 80% of the
/// time.
#[must_use]
pub fn walking_bass(
    phrase_start: Tick,
    phrase_end: Tick,
    timeline: &HarmonicTimeline,
    pedal_dur: Tick,
    key: KeySignature,
    voice: u8,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let range = pedal_range();
    let scale = key.scale();
    let mut notes = Vec::new();

    let mut bar_start = phrase_start;
    while bar_start < phrase_end {
        let event = timeline.get_at(bar_start);
        let root = range.clamp(event.bass_pitch);

        let fifth = event
            .chord
            .nearest_tone(root.transpose(7), range.low, range.high)
            .unwrap_or(root);
        let third = event
            .chord
            .nearest_tone(root.transpose(4), range.low, range.high)
            .unwrap_or(root);

        // Approach tone: one scale step below the next bar's root (or the
        // current root in the final bar).
        let approach = {
            let next_bar = bar_start + TICKS_PER_BAR;
            let target = if next_bar < phrase_end {
                range.clamp(timeline.get_at(next_bar).bass_pitch)
            } else {
                root
            };
            let deg = scale.pitch_to_degree(target, key.tonic);
            range.clamp(scale.degree_to_pitch(deg - 1, key.tonic))
        };

        if pedal_dur >= HALF_NOTE && !rng.chance(0.20) {
            // Two half notes: root, then the fifth or an approach tone.
            notes.push(note_on(bar_start, HALF_NOTE, root, voice, NoteSource::PedalPoint));
            let second = if bar_start + TICKS_PER_BAR < phrase_end {
                let next_root = range.clamp(timeline.get_at(bar_start + TICKS_PER_BAR).bass_pitch);
                if next_root == root { fifth } else { approach }
            } else {
                fifth
            };
            notes.push(note_on(
                bar_start + HALF_NOTE,
                HALF_NOTE,
                second,
                voice,
                NoteSource::PedalPoint,
            ));
        } else {
            // Four quarters. Beat 3 target first, then the beat 2 passing
            // tone between root and target.
            let roll = rng.float(0.0, 1.0);
            let beat3 = if roll < 0.60 {
                fifth
            } else if roll < 0.85 {
                third
            } else {
                let deg = scale.pitch_to_degree(root, key.tonic);
                range.clamp(scale.degree_to_pitch(deg + 2, key.tonic))
            };

            let root_deg = scale.pitch_to_degree(root, key.tonic);
            let beat3_deg = scale.pitch_to_degree(beat3, key.tonic);
            let mut mid_deg = (root_deg + beat3_deg) / 2;
            if mid_deg == root_deg {
                mid_deg = root_deg + 1;
            }
            let beat2 = range.clamp(scale.degree_to_pitch(mid_deg, key.tonic));
            let beat4 = approach;

            for (offset, pitch) in
                [(0, root), (1, beat2), (2, beat3), (3, beat4)]
            {
                notes.push(note_on(
                    bar_start + offset * QUARTER_NOTE,
                    QUARTER_NOTE,
                    pitch,
                    voice,
                    NoteSource::PedalPoint,
                ));
            }
        }

        bar_start += TICKS_PER_BAR;
    }

    notes.retain(|n| n.start_tick < phrase_end);
    for note in &mut notes {
        if note.end_tick() > phrase_end {
            note.duration = phrase_end - note.start_tick;
        }
    }
    notes
}

/// Thematic bass: the motif augmented 2× and dropped two octaves into
/// the pedal register. Fills any remainder of the phrase with the root.
#[must_use]
pub fn thematic_bass(
    phrase_start: Tick,
    phrase_end: Tick,
    motif: &[NoteEvent],
    timeline: &HarmonicTimeline,
    voice: u8,
) -> Vec<NoteEvent> {
    let range = pedal_range();
    let augmented = augment(motif, phrase_start, 2);
    let mut bass = transpose(&augmented, -24);

    for note in &mut bass {
        let clamped = range.clamp(note.pitch);
        if clamped != note.pitch {
            note.pitch = clamped;
            note.repairs |= Repairs::OCTAVE_ADJUST;
        }
        note.voice = voice;
        note.source = NoteSource::PedalPoint;
    }

    bass.retain(|n| n.start_tick < phrase_end);
    for note in &mut bass {
        if note.end_tick() > phrase_end {
            note.duration = phrase_end - note.start_tick;
            note.repairs |= Repairs::OVERLAP_TRIM;
        }
    }

    let filled_to = bass.last().map_or(phrase_start, |n| n.end_tick());
    if filled_to < phrase_end {
        let event = timeline.get_at(filled_to);
        let root = range.clamp(event.bass_pitch);
        bass.push(note_on(filled_to, phrase_end - filled_to, root, voice, NoteSource::PedalPoint));
    }
    bass
}
