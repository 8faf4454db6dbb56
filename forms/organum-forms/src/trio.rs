//! forms/organum-forms/src/trio.rs
//! Trio sonata: three equal voices across three movements.
//!
//! Each movement is phrase-based four-bar counterpoint: a leader states
//! the motif and spins it out, the follower answers in imitation, free
//! figuration fills the back half, and the pedal walks underneath.
//! Movements derive their own seeds (`seed`, `seed + 1000`, `seed + 2000`)
//! so they can be generated independently without sharing draws.

use organum_harmony::{CadenceKind, HarmonicTimeline, ProgressionType, Resolution};
use organum_rand::SeededRng;
use organum_score::{
    dedup_single_voice, sort_tracks, CounterpointReport, GenerateError, NoteEvent, NoteSource,
    Repairs, Track,
};
use organum_theory::{KeySignature, Pitch, PitchClass, PitchRange, ScaleKind};
use organum_time::{
    duration::{EIGHTH_NOTE, HALF_NOTE, QUARTER_NOTE, SIXTEENTH_NOTE},
    position_in_bar, Tick, TICKS_PER_BAR,
};

use organum_instrument::{ImpossibilityGuard, InstrumentKind};
use crate::analyze::analyze_counterpoint;
use crate::bass::{thematic_bass, walking_bass};
use crate::figure::note_on;
use crate::motif::{
    clamp_excessive_leaps, diatonic_sequence, diminish, generate_motif, invert_diatonic,
    motif_duration, place_in_register, retrograde, set_voice, shift_ticks, transpose_diatonic,
    truncate_on_parallel_steps, MotifParams,
};
use crate::ornament::{apply_ornaments, OrnamentConfig, OrnamentContext};
use crate::roles::VoiceRole;
use crate::techniques::apply_picardy;
use crate::tracks::trio_tracks;
use crate::validate::{Pipeline, StackContext};

const FAST_MOVEMENT_BARS: u32 = 16;
const SLOW_MOVEMENT_BARS: u32 = 12;
const MOVEMENT2_SEED_OFFSET: u32 = 1000;
const MOVEMENT3_SEED_OFFSET: u32 = 2000;

const PHRASE_BARS: u32 = 4;
const PHRASE_TICKS: Tick = PHRASE_BARS * TICKS_PER_BAR;

const RH_RANGE: PitchRange = PitchRange { low: Pitch::from_midi(64), high: Pitch::from_midi(84) };
const LH_RANGE: PitchRange = PitchRange { low: Pitch::from_midi(48), high: Pitch::from_midi(72) };
const RH_CENTER: u8 = 74;
const LH_CENTER: u8 = 60;

/// Movement character: the tempo word decides every texture parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementCharacter {
    /// Fast opening movement.
    Allegro,
    /// Slow middle movement in the relative key.
    Adagio,
    /// Fast closing movement.
    Vivace,
}

/// Texture parameters for one movement character.
struct CharacterParams {
    motif: MotifParams,
    pedal_dur: Tick,
    thematic_bass_prob: f32,
    /// Weights over {DescendingFifths, CircleOfFifths, ChromaticCircle,
    /// Subdominant, BorrowedChord}.
    harmonic_weights: [f32; 5],
}

fn character_params(character: MovementCharacter) -> CharacterParams {
    match character {
        MovementCharacter::Allegro => CharacterParams {
            motif: MotifParams {
                primary_dur: EIGHTH_NOTE,
                secondary_dur: SIXTEENTH_NOTE,
                secondary_prob: 0.30,
                len_min: 6,
                len_max: 8,
                step_ratio: 0.55,
                skip_ratio: 0.28,
            },
            pedal_dur: QUARTER_NOTE,
            thematic_bass_prob: 0.20,
            harmonic_weights: [0.30, 0.25, 0.20, 0.15, 0.10],
        },
        MovementCharacter::Adagio => CharacterParams {
            motif: MotifParams {
                primary_dur: QUARTER_NOTE,
                secondary_dur: EIGHTH_NOTE,
                secondary_prob: 0.50,
                len_min: 5,
                len_max: 7,
                step_ratio: 0.65,
                skip_ratio: 0.25,
            },
            pedal_dur: HALF_NOTE,
            thematic_bass_prob: 0.30,
            harmonic_weights: [0.20, 0.25, 0.10, 0.30, 0.15],
        },
        MovementCharacter::Vivace => CharacterParams {
            motif: MotifParams {
                primary_dur: EIGHTH_NOTE,
                secondary_dur: SIXTEENTH_NOTE,
                secondary_prob: 0.40,
                len_min: 4,
                len_max: 6,
                step_ratio: 0.55,
                skip_ratio: 0.28,
            },
            pedal_dur: QUARTER_NOTE,
            thematic_bass_prob: 0.25,
            harmonic_weights: [0.20, 0.20, 0.30, 0.15, 0.15],
        },
    }
}

/// Trio sonata configuration.
#[derive(Debug, Clone, Copy)]
pub struct TrioSonataConfig {
    /// Home key of the outer movements.
    pub key: KeySignature,
    /// Tempo for the outer movements.
    pub bpm_fast: u16,
    /// Tempo for the middle movement.
    pub bpm_slow: u16,
    /// Generation seed; movements offset it explicitly.
    pub seed: u32,
    /// Raise the final third of minor movements.
    pub enable_picardy: bool,
}

impl Default for TrioSonataConfig {
    fn default() -> Self {
        Self {
            key: KeySignature::major(PitchClass::new(0)),
            bpm_fast: 120,
            bpm_slow: 60,
            seed: 42,
            enable_picardy: true,
        }
    }
}

/// One movement of the sonata.
#[derive(Debug, Clone)]
pub struct TrioMovement {
    /// Right hand, left hand, pedal.
    pub tracks: Vec<Track>,
    /// The harmonic skeleton used.
    pub timeline: HarmonicTimeline,
    /// Movement length in ticks.
    pub total_duration_ticks: Tick,
    /// Movement tempo.
    pub bpm: u16,
    /// Movement key.
    pub key: KeySignature,
    /// Movement character.
    pub character: MovementCharacter,
    /// Declared pitch range of each voice.
    pub voice_ranges: Vec<PitchRange>,
    /// Faults surviving the repair stack.
    pub report: CounterpointReport,
}

/// A generated trio sonata: fast, slow, fast.
#[derive(Debug, Clone)]
pub struct TrioSonataOutput {
    /// The three movements in order.
    pub movements: Vec<TrioMovement>,
    /// Counterpoint report aggregated across movements.
    pub report: CounterpointReport,
}

// ---------------------------------------------------------------------
// Movement timeline
// ---------------------------------------------------------------------

/// Build a movement timeline phrase by phrase with weighted progression
/// choice, occasional mid-phrase modulation, and cadences.
fn movement_timeline(
    key: KeySignature,
    duration: Tick,
    params: &CharacterParams,
    rng: &mut SeededRng,
) -> HarmonicTimeline {
    const PROG_TYPES: [ProgressionType; 5] = [
        ProgressionType::DescendingFifths,
        ProgressionType::CircleOfFifths,
        ProgressionType::ChromaticCircle,
        ProgressionType::Subdominant,
        ProgressionType::BorrowedChord,
    ];

    let mut weights = params.harmonic_weights;
    if !key.is_minor() {
        // Major movements keep the tonality clean: chromatic and borrowed
        // mass moves onto the diatonic progressions.
        let redistribute = weights[2] + weights[4];
        weights[2] = 0.0;
        weights[4] = 0.0;
        weights[0] += redistribute * 0.40;
        weights[1] += redistribute * 0.35;
        weights[3] += redistribute * 0.25;
    }

    let num_phrases = (duration / PHRASE_TICKS).max(1);
    let mut combined = HarmonicTimeline::new();

    for phrase in 0..num_phrases {
        let phrase_start = phrase * PHRASE_TICKS;
        let phrase_dur = PHRASE_TICKS.min(duration - phrase_start);

        let phrase_key = if phrase > 0 && phrase < num_phrases - 1 && rng.chance(0.25) {
            if rng.chance(0.6) { key.dominant() } else { key.relative() }
        } else {
            key
        };

        let progression = if phrase == num_phrases - 1 {
            if rng.chance(0.5) {
                ProgressionType::Subdominant
            } else {
                ProgressionType::CircleOfFifths
            }
        } else {
            PROG_TYPES[rng.weighted(&weights)]
        };

        let mut phrase_tl =
            HarmonicTimeline::progression(phrase_key, phrase_dur, Resolution::Bar, progression);

        if phrase == num_phrases - 1 {
            phrase_tl.apply_cadence(CadenceKind::Perfect, phrase_key);
        } else if phrase > 0 && rng.chance(0.60) {
            let cadence = [CadenceKind::Half, CadenceKind::Deceptive, CadenceKind::Perfect]
                [rng.weighted(&[0.40, 0.30, 0.30])];
            phrase_tl.apply_cadence(cadence, phrase_key);
        }

        combined.extend_shifted(&phrase_tl);
    }
    combined
}

// ---------------------------------------------------------------------
// Upper-voice phrase generation
// ---------------------------------------------------------------------

/// Duration chooser with movement-dependent allowed sets.
fn choose_duration(params: &CharacterParams, rng: &mut SeededRng, remaining: Tick) -> Tick {
    let slow = params.motif.primary_dur >= QUARTER_NOTE;
    let durs: [Tick; 3] = if slow {
        [EIGHTH_NOTE, QUARTER_NOTE, HALF_NOTE]
    } else {
        [SIXTEENTH_NOTE, EIGHTH_NOTE, QUARTER_NOTE]
    };
    let fitting: Vec<Tick> = durs.into_iter().filter(|d| *d <= remaining).collect();
    if fitting.is_empty() {
        return 0;
    }
    let roll = rng.float(0.0, 1.0);
    if roll < params.motif.secondary_prob {
        fitting[0]
    } else if fitting.len() >= 3 && roll > 0.85 {
        fitting[2]
    } else if fitting.len() >= 2 {
        fitting[1]
    } else {
        fitting[0]
    }
}

/// Free figuration: downbeats anchor on chord tones, weak positions move
/// by step with occasional skips, repetition is forced away.
#[allow(clippy::too_many_arguments)]
fn figuration(
    start: Tick,
    end: Tick,
    timeline: &HarmonicTimeline,
    params: &CharacterParams,
    range: PitchRange,
    voice: u8,
    last_pitch: Pitch,
    key: KeySignature,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let scale = key.scale();
    let mut notes = Vec::new();
    let mut prev = last_pitch;

    let mut tick = start;
    while tick < end {
        let dur = choose_duration(params, rng, end - tick);
        if dur == 0 {
            break;
        }
        let event = timeline.get_at(tick);
        let downbeat = position_in_bar(tick) == 0;
        let deg = scale.pitch_to_degree(prev, key.tonic);
        let direction = if rng.chance(0.5) { 1 } else { -1 };

        let mut pitch = if downbeat {
            let snapped = event
                .chord
                .nearest_tone(prev, range.low, range.high)
                .unwrap_or(prev);
            if snapped == prev {
                scale.degree_to_pitch(deg + direction, key.tonic)
            } else {
                snapped
            }
        } else {
            let size = if rng.chance(0.75) { 1 } else { 2 };
            scale.degree_to_pitch(deg + size * direction, key.tonic)
        };

        pitch = range.clamp(pitch);
        if pitch == prev {
            pitch = range.clamp(scale.degree_to_pitch(deg - direction, key.tonic));
        }

        notes.push(note_on(tick, dur, pitch, voice, NoteSource::FreeCounterpoint));
        prev = pitch;
        tick += dur;
    }
    notes
}

struct PhraseVoices {
    leader: Vec<NoteEvent>,
    follower: Vec<NoteEvent>,
}

/// Bars 1–2: leader motif + Fortspinnung, follower in delayed imitation.
/// Bars 3–4: free figuration anchored to chord tones.
#[allow(clippy::too_many_arguments)]
fn upper_voice_phrase(
    phrase_start: Tick,
    motif: &[NoteEvent],
    timeline: &HarmonicTimeline,
    params: &CharacterParams,
    leader_voice: u8,
    key: KeySignature,
    rng: &mut SeededRng,
) -> PhraseVoices {
    let scale = key.scale();
    let leader_is_rh = leader_voice == 0;
    let (leader_range, leader_center) = if leader_is_rh {
        (RH_RANGE, Pitch::new(RH_CENTER))
    } else {
        (LH_RANGE, Pitch::new(LH_CENTER))
    };
    let (follower_range, follower_center, follower_voice) = if leader_is_rh {
        (LH_RANGE, Pitch::new(LH_CENTER), 1)
    } else {
        (RH_RANGE, Pitch::new(RH_CENTER), 0)
    };

    let phrase_end = phrase_start + PHRASE_TICKS;
    let half_phrase = phrase_start + PHRASE_TICKS / 2;
    let fortspinnung_end = phrase_start + PHRASE_TICKS * 3 / 4;

    // --- Leader: motif placed in register. ---
    let mut leader_motif = place_in_register(motif, leader_center, leader_range);
    clamp_excessive_leaps(&mut leader_motif, 12, leader_center, phrase_end);
    set_voice(&mut leader_motif, leader_voice);
    shift_ticks(&mut leader_motif, phrase_start);

    // --- Fortspinnung. ---
    let motif_span = motif_duration(motif);
    let seq_start = phrase_start + motif_span;
    let mut leader_seq = Vec::new();
    if seq_start < fortspinnung_end && motif_span > 0 {
        let slow = params.motif.primary_dur >= QUARTER_NOTE;
        let reps = if !slow && rng.chance(0.45) { 2 } else { 1 };
        let direction = if rng.chance(0.65) { -1 } else { 1 };

        let mut seq = diatonic_sequence(motif, reps, direction, seq_start, key.tonic, scale);
        for note in &mut seq {
            let clamped = leader_range.clamp(note.pitch);
            if clamped != note.pitch {
                note.pitch = clamped;
                note.repairs |= Repairs::OCTAVE_ADJUST;
            }
            note.voice = leader_voice;
        }
        seq.retain(|n| n.start_tick < fortspinnung_end);
        for note in &mut seq {
            if note.end_tick() > fortspinnung_end {
                note.duration = fortspinnung_end - note.start_tick;
                note.repairs |= Repairs::OVERLAP_TRIM;
            }
        }
        truncate_on_parallel_steps(&mut seq);
        leader_seq = seq;
    }

    // --- Follower: transformed imitation at half the motif length. ---
    let raw_offset = motif_span / 2;
    let imitation_offset =
        (((raw_offset + EIGHTH_NOTE) / QUARTER_NOTE) * QUARTER_NOTE).max(QUARTER_NOTE);

    let transform = rng.weighted(&[0.40, 0.30, 0.15, 0.15]);
    let mut follower_imitation = match transform {
        0 => transpose_diatonic(motif, 0, key.tonic, scale),
        1 => {
            let pivot = motif.first().map_or(Pitch::new(60), |n| n.pitch);
            invert_diatonic(motif, pivot, key.tonic, scale)
        }
        2 => diminish(motif, 0),
        _ => retrograde(motif, 0),
    };
    follower_imitation = place_in_register(&follower_imitation, follower_center, follower_range);
    clamp_excessive_leaps(&mut follower_imitation, 12, follower_center, phrase_end);
    set_voice(&mut follower_imitation, follower_voice);
    shift_ticks(&mut follower_imitation, phrase_start + imitation_offset);

    // Imitation ends at the half-phrase boundary.
    for note in &mut follower_imitation {
        if note.end_tick() > half_phrase {
            note.duration = half_phrase.saturating_sub(note.start_tick);
            note.repairs |= Repairs::OVERLAP_TRIM;
        }
    }
    follower_imitation.retain(|n| n.start_tick < half_phrase && n.duration > 0);

    // --- Free figuration for the rest of the phrase. ---
    let leader_fig_start = leader_seq
        .last()
        .map_or(fortspinnung_end, |n| n.end_tick().max(fortspinnung_end));
    let leader_last = leader_seq
        .last()
        .or(leader_motif.last())
        .map_or(leader_center, |n| n.pitch);
    let follower_last = follower_imitation.last().map_or(follower_center, |n| n.pitch);

    let leader_fig = figuration(
        leader_fig_start,
        phrase_end,
        timeline,
        params,
        leader_range,
        leader_voice,
        leader_last,
        key,
        rng,
    );
    let follower_fig = figuration(
        half_phrase,
        phrase_end,
        timeline,
        params,
        follower_range,
        follower_voice,
        follower_last,
        key,
        rng,
    );

    let mut leader = leader_motif;
    leader.extend(leader_seq);
    leader.extend(leader_fig);

    let mut follower = follower_imitation;
    follower.extend(follower_fig);

    PhraseVoices { leader, follower }
}

/// Swap two voice groups' registers (invertible counterpoint).
fn swap_registers(upper: &mut [NoteEvent], lower: &mut [NoteEvent]) {
    let move_group = |notes: &mut [NoteEvent], from_center: u8, to_center: u8, to: PitchRange| {
        for n in notes {
            let offset = i32::from(n.pitch.midi()) - i32::from(from_center);
            n.pitch = to.clamp(Pitch::from_signed(i32::from(to_center) + offset));
            n.repairs |= Repairs::OCTAVE_ADJUST;
        }
    };
    move_group(upper, RH_CENTER, LH_CENTER, LH_RANGE);
    move_group(lower, LH_CENTER, RH_CENTER, RH_RANGE);
}

// ---------------------------------------------------------------------
// Post-passes specific to the trio texture
// ---------------------------------------------------------------------

/// Replace the first two bars of a pedal-lead phrase with half-note
/// chord outlines so the thematic bass is heard.
fn simplify_for_pedal_lead(
    notes: &mut Vec<NoteEvent>,
    phrase_start: Tick,
    phrase_end: Tick,
    timeline: &HarmonicTimeline,
    range: PitchRange,
    voice: u8,
) {
    let simplify_end = (phrase_start + 2 * TICKS_PER_BAR).min(phrase_end);
    notes.retain(|n| {
        n.voice != voice || n.start_tick < phrase_start || n.start_tick >= simplify_end
    });

    let center = range.center();
    let mut tick = phrase_start;
    let mut alternate = false;
    while tick < simplify_end {
        let event = timeline.get_at(tick);
        let mut pitch = event
            .chord
            .nearest_tone(center, range.low, range.high)
            .unwrap_or(center);
        if alternate {
            if let Some(other) = event
                .chord
                .tones_in_range(range.low, range.high)
                .into_iter()
                .find(|t| *t != pitch)
            {
                pitch = other;
            }
        }
        let dur = HALF_NOTE.min(simplify_end - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(tick, dur, pitch, voice, NoteSource::FreeCounterpoint));
        tick += dur;
        alternate = !alternate;
    }
}

/// Try a cadential suspension before `cadence_tick`: Sus4–3 first, then
/// Sus7–6. Silently does nothing when no candidate is legal.
fn insert_cadential_suspension(
    tracks: &mut [Track],
    cadence_tick: Tick,
    leader_voice: u8,
    key: KeySignature,
    scale: ScaleKind,
) -> bool {
    if cadence_tick < TICKS_PER_BAR {
        return false;
    }
    let search_start = cadence_tick - TICKS_PER_BAR;
    let range = if leader_voice == 0 { RH_RANGE } else { LH_RANGE };
    let other_voice = usize::from(1 - leader_voice);

    let Some(target_idx) = tracks[usize::from(leader_voice)]
        .notes
        .iter()
        .rposition(|n| n.start_tick >= search_start && n.start_tick < cadence_tick)
    else {
        return false;
    };
    let target = tracks[usize::from(leader_voice)].notes[target_idx];

    let other_pitch = tracks[other_voice]
        .notes
        .iter()
        .find(|n| n.sounds_at(target.start_tick))
        .map(|n| n.pitch);

    let deg = scale.pitch_to_degree(target.pitch, key.tonic);
    // (suspension degrees up, resolution step down).
    for (sus_up, res_step) in [(1, -1), (4, -1)] {
        let sus_pitch = scale.degree_to_pitch(deg + sus_up, key.tonic);
        let res_pitch = scale.degree_to_pitch(deg + sus_up + res_step, key.tonic);

        if res_pitch.distance_to(target.pitch) > 4 {
            continue;
        }
        if !range.contains(sus_pitch) || !range.contains(res_pitch) {
            continue;
        }
        if let Some(other) = other_pitch {
            if leader_voice == 0 && sus_pitch < other {
                continue;
            }
            if leader_voice == 1 && sus_pitch > other {
                continue;
            }
        }

        let note = &mut tracks[usize::from(leader_voice)].notes[target_idx];
        note.pitch = sus_pitch;
        note.repairs |= Repairs::CHORD_SNAP;
        let held = cadence_tick - note.start_tick;
        if held > 0 {
            note.duration = held;
            note.repairs |= Repairs::OVERLAP_TRIM;
        }
        let voice = note.voice;
        let velocity = note.velocity;
        tracks[usize::from(leader_voice)].notes.push(NoteEvent::new(
            cadence_tick,
            QUARTER_NOTE,
            res_pitch,
            velocity,
            voice,
            NoteSource::FreeCounterpoint,
        ));
        return true;
    }
    false
}

/// Truncate upper-voice notes into the last sixteenth before each phrase
/// boundary; the pedal sustains through.
fn insert_breathing_rests(tracks: &mut [Track], num_phrases: u32, duration: Tick) {
    for phrase in 1..num_phrases {
        let boundary = phrase * PHRASE_TICKS;
        if boundary > duration {
            break;
        }
        let breath_start = boundary - SIXTEENTH_NOTE;
        for track in tracks.iter_mut().take(2) {
            for note in &mut track.notes {
                if note.start_tick < breath_start && note.end_tick() > breath_start {
                    note.duration = breath_start - note.start_tick;
                    note.repairs |= Repairs::ARTICULATION;
                }
            }
        }
    }
}

/// Quantize upper-voice durations onto the movement's allowed set.
fn quantize_durations(tracks: &mut [Track], params: &CharacterParams) {
    let slow = params.motif.primary_dur >= QUARTER_NOTE;
    let allowed: [Tick; 3] = if slow {
        [EIGHTH_NOTE, QUARTER_NOTE, HALF_NOTE]
    } else {
        [SIXTEENTH_NOTE, EIGHTH_NOTE, QUARTER_NOTE]
    };
    for track in tracks.iter_mut().take(2) {
        for note in &mut track.notes {
            if allowed.contains(&note.duration) {
                continue;
            }
            let best = allowed
                .iter()
                .copied()
                .min_by_key(|d| d.abs_diff(note.duration))
                .unwrap_or(note.duration);
            note.duration = best;
            note.repairs |= Repairs::ARTICULATION;
        }
    }
}

// ---------------------------------------------------------------------
// Movement generation
// ---------------------------------------------------------------------

fn trio_ranges() -> Vec<PitchRange> {
    vec![RH_RANGE, LH_RANGE, PitchRange::new(24, 50)]
}

fn generate_movement(
    key: KeySignature,
    num_bars: u32,
    bpm: u16,
    seed: u32,
    character: MovementCharacter,
) -> TrioMovement {
    let duration = num_bars * TICKS_PER_BAR;
    let mut rng = SeededRng::new(seed);
    let params = character_params(character);
    let scale = key.scale();

    let timeline = movement_timeline(key, duration, &params, &mut rng);
    let motif = generate_motif(timeline.get_at(0), &params.motif, key, &mut rng);

    let mut tracks = trio_tracks();
    let num_phrases = (duration / PHRASE_TICKS).max(1);

    for phrase in 0..num_phrases {
        let phrase_start = phrase * PHRASE_TICKS;
        let phrase_end = (phrase_start + PHRASE_TICKS).min(duration);
        let leader_voice = if phrase % 2 == 0 { 0u8 } else { 1 };

        // Vary the motif diatonically from the second phrase on.
        let phrase_motif = if phrase == 0 {
            motif.clone()
        } else {
            let mut shift = rng.range(-2, 2);
            if shift == 0 {
                shift = 1;
            }
            transpose_diatonic(&motif, shift, key.tonic, scale)
        };

        let mut voices = upper_voice_phrase(
            phrase_start,
            &phrase_motif,
            &timeline,
            &params,
            leader_voice,
            key,
            &mut rng,
        );

        // Invertible counterpoint, occasionally.
        if rng.chance(0.12) {
            if leader_voice == 0 {
                swap_registers(&mut voices.leader, &mut voices.follower);
            } else {
                swap_registers(&mut voices.follower, &mut voices.leader);
            }
        }

        for note in voices.leader.into_iter().chain(voices.follower) {
            if usize::from(note.voice) < tracks.len() {
                tracks[usize::from(note.voice)].notes.push(note);
            }
        }

        // Pedal: thematic lead or walking bass.
        let is_thematic = rng.chance(params.thematic_bass_prob);
        let pedal_notes = if is_thematic {
            thematic_bass(phrase_start, phrase_end, &motif, &timeline, 2)
        } else {
            walking_bass(
                phrase_start,
                phrase_end,
                &timeline,
                params.pedal_dur,
                key,
                2,
                &mut rng,
            )
        };
        tracks[2].notes.extend(pedal_notes);

        if is_thematic && phrase > 0 {
            let rh = &mut tracks[0].notes;
            simplify_for_pedal_lead(rh, phrase_start, phrase_end, &timeline, RH_RANGE, 0);
            let lh = &mut tracks[1].notes;
            simplify_for_pedal_lead(lh, phrase_start, phrase_end, &timeline, LH_RANGE, 1);
        }
    }

    sort_tracks(&mut tracks);

    let ctx = StackContext {
        timeline: &timeline,
        key,
        ranges: trio_ranges(),
        bass_voice: 2,
    };
    let mut report = Pipeline::standard().run(&mut tracks, &ctx);

    // Cadential suspensions at phrase boundaries, alternating the voice.
    for phrase in 1..num_phrases {
        let cadence_tick = phrase * PHRASE_TICKS;
        let sus_voice = if (phrase - 1) % 2 == 0 { 0 } else { 1 };
        let _ = insert_cadential_suspension(&mut tracks, cadence_tick, sus_voice, key, scale);
    }
    insert_breathing_rests(&mut tracks, num_phrases, duration);
    sort_tracks(&mut tracks);

    quantize_durations(&mut tracks, &params);

    // Ornament the manual voices; the pedal is Ground and stays plain.
    let density = match character {
        MovementCharacter::Vivace => 0.06,
        _ => 0.08,
    };
    for voice in 0..2u8 {
        let orn_ctx = OrnamentContext {
            config: OrnamentConfig { density, ..OrnamentConfig::default() },
            role: VoiceRole::Respond,
            bpm,
            range: if voice == 0 { RH_RANGE } else { LH_RANGE },
            timeline: Some(&timeline),
        };
        let mut orn_rng = SeededRng::new(seed + u32::from(voice) * 100);
        let idx = usize::from(voice);
        tracks[idx].notes = apply_ornaments(&tracks[idx].notes, &orn_ctx, &mut orn_rng);
    }
    report.accumulate(&Pipeline::post_ornament().run(&mut tracks, &ctx));
    dedup_single_voice(&mut tracks);

    let guard = ImpossibilityGuard::for_kind(InstrumentKind::Organ);
    report.repair_failures += guard.enforce(&mut tracks).unresolved;

    report.accumulate(&analyze_counterpoint(&tracks));

    TrioMovement {
        tracks,
        timeline,
        total_duration_ticks: duration,
        bpm,
        key,
        character,
        voice_ranges: trio_ranges(),
        report,
    }
}

/// Generate a three-movement trio sonata.
///
/// # Errors
/// Returns [`GenerateError::InvalidConfig`] when either tempo is zero.
pub fn generate_trio_sonata(
    config: &TrioSonataConfig,
) -> Result<TrioSonataOutput, GenerateError> {
    if config.bpm_fast == 0 || config.bpm_slow == 0 {
        return Err(GenerateError::InvalidConfig("tempos must be positive".into()));
    }

    let slow_key = config.key.relative();
    let mut movements = vec![
        generate_movement(
            config.key,
            FAST_MOVEMENT_BARS,
            config.bpm_fast,
            config.seed,
            MovementCharacter::Allegro,
        ),
        generate_movement(
            slow_key,
            SLOW_MOVEMENT_BARS,
            config.bpm_slow,
            config.seed + MOVEMENT2_SEED_OFFSET,
            MovementCharacter::Adagio,
        ),
        generate_movement(
            config.key,
            FAST_MOVEMENT_BARS,
            config.bpm_fast,
            config.seed + MOVEMENT3_SEED_OFFSET,
            MovementCharacter::Vivace,
        ),
    ];

    if config.enable_picardy {
        for movement in &mut movements {
            if movement.key.is_minor() && movement.total_duration_ticks > TICKS_PER_BAR {
                let final_bar = movement.total_duration_ticks - TICKS_PER_BAR;
                let ranges = trio_ranges();
                for (voice, track) in movement.tracks.iter_mut().enumerate() {
                    apply_picardy(&mut track.notes, movement.key, final_bar, ranges[voice]);
                }
            }
        }
    }

    let mut report = CounterpointReport::default();
    for movement in &movements {
        report.accumulate(&movement.report);
    }

    Ok(TrioSonataOutput { movements, report })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_movements_fast_slow_fast() {
        let output = generate_trio_sonata(&TrioSonataConfig::default()).expect("generates");
        assert_eq!(output.movements.len(), 3);
        let bpms: Vec<u16> = output.movements.iter().map(|m| m.bpm).collect();
        assert_eq!(bpms, vec![120, 60, 120]);
        assert_eq!(output.movements[0].character, MovementCharacter::Allegro);
        assert_eq!(output.movements[1].character, MovementCharacter::Adagio);
        assert_eq!(output.movements[2].character, MovementCharacter::Vivace);
    }

    #[test]
    fn middle_movement_is_in_the_relative_key() {
        let config = TrioSonataConfig::default();
        let output = generate_trio_sonata(&config).expect("generates");
        assert_eq!(output.movements[1].key, config.key.relative());
        assert_eq!(output.movements[0].key, config.key);
        assert_eq!(output.movements[2].key, config.key);
    }

    #[test]
    fn each_movement_has_the_trio_tracks() {
        let output = generate_trio_sonata(&TrioSonataConfig::default()).expect("generates");
        for movement in &output.movements {
            assert_eq!(movement.tracks.len(), 3);
            let channels: Vec<u8> = movement.tracks.iter().map(|t| t.channel).collect();
            assert_eq!(channels, vec![0, 1, 3]);
            for track in &movement.tracks {
                assert!(!track.notes.is_empty());
            }
        }
    }

    #[test]
    fn movement_lengths_follow_the_plan() {
        let output = generate_trio_sonata(&TrioSonataConfig::default()).expect("generates");
        assert_eq!(output.movements[0].total_duration_ticks, 16 * TICKS_PER_BAR);
        assert_eq!(output.movements[1].total_duration_ticks, 12 * TICKS_PER_BAR);
        assert_eq!(output.movements[2].total_duration_ticks, 16 * TICKS_PER_BAR);
    }

    #[test]
    fn voices_respect_their_registers() {
        let output = generate_trio_sonata(&TrioSonataConfig::default()).expect("generates");
        let ranges = trio_ranges();
        for movement in &output.movements {
            for (voice, track) in movement.tracks.iter().enumerate() {
                for note in &track.notes {
                    assert!(
                        ranges[voice].contains(note.pitch),
                        "movement voice {voice} pitch {}",
                        note.pitch
                    );
                }
            }
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let config = TrioSonataConfig::default();
        let a = generate_trio_sonata(&config).expect("generates");
        let b = generate_trio_sonata(&config).expect("generates");
        for (ma, mb) in a.movements.iter().zip(&b.movements) {
            for (ta, tb) in ma.tracks.iter().zip(&mb.tracks) {
                assert_eq!(ta.notes, tb.notes);
            }
        }
    }

    #[test]
    fn zero_tempo_is_rejected() {
        let config = TrioSonataConfig { bpm_fast: 0, ..TrioSonataConfig::default() };
        assert!(matches!(
            generate_trio_sonata(&config),
            Err(GenerateError::InvalidConfig(_))
        ));
    }
}
