//! forms/organum-forms/src/motif.rs
//! Motif generation, melodic transforms, and the diatonic sequence.
//!
//! Motifs are emitted at tick 0 in a neutral register; callers place them
//! with [`place_in_register`] and [`shift_ticks`]. Transforms are pure:
//! they return new note lists and never touch the input.

use organum_harmony::HarmonicEvent;
use organum_rand::SeededRng;
use organum_score::{NoteEvent, NoteSource, Repairs};
use organum_theory::{interval, KeySignature, Pitch, PitchClass, PitchRange, ScaleKind};
use organum_time::Tick;

/// Knobs controlling motif emission, set per movement character.
#[derive(Debug, Clone, Copy)]
pub struct MotifParams {
    /// Primary note duration.
    pub primary_dur: Tick,
    /// Secondary, shorter duration.
    pub secondary_dur: Tick,
    /// Probability of the secondary duration.
    pub secondary_prob: f32,
    /// Minimum motif length in notes.
    pub len_min: i32,
    /// Maximum motif length in notes.
    pub len_max: i32,
    /// Probability of stepwise motion.
    pub step_ratio: f32,
    /// Probability of a third skip.
    pub skip_ratio: f32,
}

/// Generate a 4–8 note motif starting and ending on chord tones.
///
/// A leap is always followed by contrary stepwise recovery.
#[must_use]
pub fn generate_motif(
    event: &HarmonicEvent,
    params: &MotifParams,
    key: KeySignature,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let scale = key.scale();
    let num_notes = rng.range(params.len_min, params.len_max);

    let start = event
        .chord
        .nearest_tone(Pitch::new(60), Pitch::new(55), Pitch::new(72))
        .unwrap_or(Pitch::new(60));

    let mut motif = Vec::with_capacity(num_notes as usize);
    let mut tick: Tick = 0;
    let mut prev = start;
    let mut need_recovery = false;
    let mut recover_down = false;

    for idx in 0..num_notes {
        let dur =
            if rng.chance(params.secondary_prob) { params.secondary_dur } else { params.primary_dur };

        let pitch = if idx == 0 {
            start
        } else if need_recovery {
            let deg = scale.pitch_to_degree(prev, key.tonic);
            let step = if recover_down { -1 } else { 1 };
            need_recovery = false;
            scale.degree_to_pitch(deg + step, key.tonic)
        } else {
            let roll = rng.float(0.0, 1.0);
            let deg = scale.pitch_to_degree(prev, key.tonic);
            let direction = if rng.chance(0.5) { 1 } else { -1 };
            if roll < params.step_ratio {
                scale.degree_to_pitch(deg + direction, key.tonic)
            } else if roll < params.step_ratio + params.skip_ratio {
                scale.degree_to_pitch(deg + 2 * direction, key.tonic)
            } else {
                let leap = rng.range(3, 4) * direction;
                need_recovery = true;
                recover_down = direction > 0;
                scale.degree_to_pitch(deg + leap, key.tonic)
            }
        };

        let pitch = PitchRange::new(48, 84).clamp(pitch);
        motif.push(NoteEvent::new(tick, dur, pitch, 80, 0, NoteSource::FreeCounterpoint));
        tick += dur;
        prev = pitch;
    }

    // Close on a chord tone for harmonic stability.
    if let Some(last) = motif.last_mut() {
        if let Some(tone) =
            event.chord.nearest_tone(last.pitch, Pitch::new(48), Pitch::new(84))
        {
            if tone != last.pitch {
                last.pitch = tone;
                last.repairs |= Repairs::CHORD_SNAP;
            }
        }
    }
    motif
}

/// Total tick span of a motif.
#[must_use]
pub fn motif_duration(motif: &[NoteEvent]) -> Tick {
    motif.last().map_or(0, |n| n.end_tick())
}

/// Shift every start tick by `offset`.
pub fn shift_ticks(notes: &mut [NoteEvent], offset: Tick) {
    for note in notes {
        note.start_tick += offset;
    }
}

/// Assign a voice id to every note.
pub fn set_voice(notes: &mut [NoteEvent], voice: u8) {
    for note in notes {
        note.voice = voice;
    }
}

/// Chromatic transposition of a melody.
#[must_use]
pub fn transpose(notes: &[NoteEvent], semitones: i32) -> Vec<NoteEvent> {
    notes
        .iter()
        .map(|n| NoteEvent { pitch: n.pitch.transpose(semitones), ..*n })
        .collect()
}

/// Diatonic transposition by scale degrees.
#[must_use]
pub fn transpose_diatonic(
    notes: &[NoteEvent],
    degrees: i32,
    tonic: PitchClass,
    scale: ScaleKind,
) -> Vec<NoteEvent> {
    notes
        .iter()
        .map(|n| {
            let deg = scale.pitch_to_degree(n.pitch, tonic);
            NoteEvent { pitch: scale.degree_to_pitch(deg + degrees, tonic), ..*n }
        })
        .collect()
}

/// Diatonic inversion about a pivot pitch.
#[must_use]
pub fn invert_diatonic(
    notes: &[NoteEvent],
    pivot: Pitch,
    tonic: PitchClass,
    scale: ScaleKind,
) -> Vec<NoteEvent> {
    let pivot_deg = scale.pitch_to_degree(pivot, tonic);
    notes
        .iter()
        .map(|n| {
            let deg = scale.pitch_to_degree(n.pitch, tonic);
            NoteEvent { pitch: scale.degree_to_pitch(2 * pivot_deg - deg, tonic), ..*n }
        })
        .collect()
}

/// Diminution: durations halved, ticks rebuilt from `start_tick`.
#[must_use]
pub fn diminish(notes: &[NoteEvent], start_tick: Tick) -> Vec<NoteEvent> {
    let mut tick = start_tick;
    notes
        .iter()
        .map(|n| {
            let dur = (n.duration / 2).max(1);
            let out = NoteEvent { start_tick: tick, duration: dur, ..*n };
            tick += dur;
            out
        })
        .collect()
}

/// Augmentation: durations multiplied, ticks rebuilt from `start_tick`.
#[must_use]
pub fn augment(notes: &[NoteEvent], start_tick: Tick, factor: u32) -> Vec<NoteEvent> {
    let mut tick = start_tick;
    notes
        .iter()
        .map(|n| {
            let dur = n.duration * factor;
            let out = NoteEvent { start_tick: tick, duration: dur, ..*n };
            tick += dur;
            out
        })
        .collect()
}

/// Retrograde: pitch order reversed, rhythm rebuilt forward.
#[must_use]
pub fn retrograde(notes: &[NoteEvent], start_tick: Tick) -> Vec<NoteEvent> {
    let mut tick = start_tick;
    notes
        .iter()
        .rev()
        .map(|n| {
            let out = NoteEvent { start_tick: tick, ..*n };
            tick += n.duration;
            out
        })
        .collect()
}

/// Fortspinnung: repeat a motif diatonically shifted, one degree per
/// repetition in `direction`, starting at `start_tick`.
///
/// The caller trims the result at the phrase boundary and runs the
/// parallel-perfect truncation check.
#[must_use]
pub fn diatonic_sequence(
    motif: &[NoteEvent],
    repetitions: u32,
    direction: i32,
    start_tick: Tick,
    tonic: PitchClass,
    scale: ScaleKind,
) -> Vec<NoteEvent> {
    let mut sequence = Vec::new();
    let span = motif_duration(motif);
    if span == 0 {
        return sequence;
    }
    for rep in 1..=repetitions {
        let mut shifted = transpose_diatonic(motif, direction * rep as i32, tonic, scale);
        let offset = start_tick + span * (rep - 1);
        shift_ticks(&mut shifted, offset);
        sequence.extend(shifted);
    }
    sequence
}

/// Truncate a sequence at the first pair of consecutive same-sized
/// parallel perfect steps (unison, fifth, or octave twice in a row).
pub fn truncate_on_parallel_steps(sequence: &mut Vec<NoteEvent>) {
    if sequence.len() < 4 {
        return;
    }
    for idx in 2..sequence.len() {
        let step_prev = interval::simple(sequence[idx - 1].pitch.interval_from(sequence[idx - 2].pitch));
        let step_curr = interval::simple(sequence[idx].pitch.interval_from(sequence[idx - 1].pitch));
        let both_perfect = interval::is_perfect(step_prev) && interval::is_perfect(step_curr);
        if both_perfect && step_prev == step_curr {
            sequence.truncate(idx);
            return;
        }
    }
}

/// Transpose a melody so its average pitch lands on `center`, clamping
/// into the range afterwards.
#[must_use]
pub fn place_in_register(notes: &[NoteEvent], center: Pitch, range: PitchRange) -> Vec<NoteEvent> {
    if notes.is_empty() {
        return Vec::new();
    }
    let sum: i32 = notes.iter().map(|n| i32::from(n.pitch.midi())).sum();
    let avg = sum / notes.len() as i32;
    let shift = i32::from(center.midi()) - avg;
    notes
        .iter()
        .map(|n| {
            let mut out = NoteEvent { pitch: range.clamp(n.pitch.transpose(shift)), ..*n };
            if out.pitch != n.pitch {
                out.repairs |= Repairs::OCTAVE_ADJUST;
            }
            out
        })
        .collect()
}

/// Clamp leaps wider than `threshold` semitones by octave displacement
/// toward the previous note. Cadence-window notes (the final two beats
/// before `phrase_end`) and leap resolutions are exempt, and a correction
/// never crosses the register `center`.
pub fn clamp_excessive_leaps(
    notes: &mut [NoteEvent],
    threshold: i32,
    center: Pitch,
    phrase_end: Tick,
) {
    if notes.len() < 2 {
        return;
    }
    let cadence_start = phrase_end.saturating_sub(2 * organum_time::TICKS_PER_BEAT);
    let mut prev_was_large = false;

    for idx in 1..notes.len() {
        let prev = notes[idx - 1].pitch;
        let curr = notes[idx].pitch;
        let leap = curr.interval_from(prev);

        if notes[idx].start_tick >= cadence_start || prev_was_large {
            prev_was_large = leap.abs() > threshold;
            continue;
        }
        if leap.abs() <= threshold {
            prev_was_large = false;
            continue;
        }

        let shift = interval::nearest_octave_shift(-leap);
        let candidate = curr.transpose(shift);

        let crosses_center =
            (curr >= center) != (candidate >= center);
        if !crosses_center && candidate.distance_to(prev) < curr.distance_to(prev) {
            notes[idx].pitch = candidate;
            notes[idx].repairs |= Repairs::OCTAVE_ADJUST;
        }
        prev_was_large = true;
    }
}
