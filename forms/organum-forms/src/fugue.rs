//! forms/organum-forms/src/fugue.rs
//! Fugue exposition: a subject answered voice by voice at fixed
//! intervals, each entry dissolving into free counterpoint.
//!
//! The exposition machinery here also serves the paired forms (prelude
//! and fugue, toccata and fugue): the prelude sizes itself from the
//! fugue length this generator reports.

use organum_harmony::{CadenceKind, HarmonicTimeline, Resolution};
use organum_rand::SeededRng;
use organum_score::{CounterpointReport, GenerateError, NoteEvent, NoteSource, Track};
use organum_theory::{KeySignature, PitchClass, PitchRange};
use organum_time::{
    duration::{EIGHTH_NOTE, QUARTER_NOTE},
    Tick, TICKS_PER_BAR,
};

use organum_instrument::{ImpossibilityGuard, InstrumentKind};
use crate::analyze::analyze_counterpoint;
use crate::figure::note_on;
use crate::motif::{place_in_register, set_voice, shift_ticks, transpose_diatonic};
use crate::ornament::{apply_ornaments, OrnamentConfig, OrnamentContext};
use crate::roles::{organ_voice_range, VoiceRole};
use crate::techniques::apply_picardy;
use crate::tracks::organ_tracks;
use crate::validate::{Pipeline, StackContext};

/// Subject length in bars; entries stagger at this interval.
const SUBJECT_BARS: u32 = 2;

/// Fugue configuration.
#[derive(Debug, Clone, Copy)]
pub struct FugueConfig {
    /// Governing key.
    pub key: KeySignature,
    /// Tempo (ornament speed only).
    pub bpm: u16,
    /// Generation seed.
    pub seed: u32,
    /// Voice count, clamped to 2..=5.
    pub num_voices: u8,
    /// Total length in bars; must leave room for every entry.
    pub total_bars: u32,
    /// Raise the final third in minor keys.
    pub enable_picardy: bool,
}

impl Default for FugueConfig {
    fn default() -> Self {
        Self {
            key: KeySignature::minor(PitchClass::new(7)),
            bpm: 96,
            seed: 42,
            num_voices: 3,
            total_bars: 16,
            enable_picardy: true,
        }
    }
}

/// A generated fugue exposition.
#[derive(Debug, Clone)]
pub struct FugueOutput {
    /// One track per voice.
    pub tracks: Vec<Track>,
    /// The harmonic skeleton used.
    pub timeline: HarmonicTimeline,
    /// Total length in ticks.
    pub total_duration_ticks: Tick,
    /// `(voice, entry tick)` for each subject statement.
    pub entries: Vec<(u8, Tick)>,
    /// Declared pitch range of each voice's manual.
    pub voice_ranges: Vec<PitchRange>,
    /// Faults surviving the repair stack.
    pub report: CounterpointReport,
}

/// Emit the subject: eight quarter notes walking the scale from the
/// tonic degree, leaps answered by steps.
fn build_subject(key: KeySignature, rng: &mut SeededRng) -> Vec<NoteEvent> {
    let scale = key.scale();
    let start = key.tonic_pitch(4);
    let start_deg = scale.pitch_to_degree(start, key.tonic);

    let mut degrees = vec![start_deg];
    let mut need_recovery = false;
    let mut recover_down = false;
    for _ in 1..8 {
        let prev = *degrees.last().unwrap_or(&start_deg);
        let next = if need_recovery {
            need_recovery = false;
            prev + if recover_down { -1 } else { 1 }
        } else {
            let roll = rng.float(0.0, 1.0);
            let dir = if rng.chance(0.5) { 1 } else { -1 };
            if roll < 0.6 {
                prev + dir
            } else if roll < 0.85 {
                prev + 2 * dir
            } else {
                need_recovery = true;
                recover_down = dir > 0;
                prev + 3 * dir
            }
        };
        degrees.push(next);
    }
    // Close on the dominant degree for a tonal answer to pick up.
    if let Some(last) = degrees.last_mut() {
        *last = start_deg + 4;
    }

    let note_dur = SUBJECT_BARS * TICKS_PER_BAR / 8;
    degrees
        .iter()
        .enumerate()
        .map(|(idx, deg)| {
            note_on(
                idx as u32 * note_dur,
                note_dur,
                scale.degree_to_pitch(*deg, key.tonic),
                0,
                NoteSource::FreeCounterpoint,
            )
        })
        .collect()
}

/// Free counterpoint after an entry: stepwise eighth/quarter motion.
fn free_counterpoint(
    key: KeySignature,
    voice: u8,
    start: Tick,
    end: Tick,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let range = organ_voice_range(voice);
    let tones = key.scale().tones_in_range(key.tonic, range.low, range.high);
    let mut notes = Vec::new();
    if tones.is_empty() {
        return notes;
    }
    let mut idx = tones.len() / 2;
    let mut ascending = rng.chance(0.5);
    let mut tick = start;
    while tick < end {
        let dur = (if rng.chance(0.5) { EIGHTH_NOTE } else { QUARTER_NOTE }).min(end - tick);
        if dur == 0 {
            break;
        }
        let step = if rng.chance(0.15) { 2 } else { 1 };
        if ascending {
            if idx + step < tones.len() {
                idx += step;
            } else {
                ascending = false;
                idx = idx.saturating_sub(step);
            }
        } else if idx >= step {
            idx -= step;
        } else {
            ascending = true;
            idx = (idx + step).min(tones.len() - 1);
        }
        if rng.chance(0.12) {
            ascending = !ascending;
        }
        notes.push(note_on(tick, dur, tones[idx], voice, NoteSource::FreeCounterpoint));
        tick += dur;
    }
    notes
}

/// Generate a fugue exposition.
///
/// # Errors
/// Returns [`GenerateError::InvalidConfig`] when `total_bars` cannot
/// hold every staggered entry.
pub fn generate_fugue(config: &FugueConfig) -> Result<FugueOutput, GenerateError> {
    let num_voices = config.num_voices.clamp(2, 5);
    let needed = SUBJECT_BARS * u32::from(num_voices);
    if config.total_bars < needed {
        return Err(GenerateError::InvalidConfig(format!(
            "total_bars {} cannot hold {num_voices} entries of {SUBJECT_BARS} bars",
            config.total_bars
        )));
    }

    let mut rng = SeededRng::new(config.seed);
    let total = config.total_bars * TICKS_PER_BAR;
    let mut timeline = HarmonicTimeline::standard(config.key, total, Resolution::Bar);
    timeline.apply_cadence(CadenceKind::Perfect, config.key);

    let subject = build_subject(config.key, &mut rng);
    let mut tracks = organ_tracks(num_voices);
    let mut entries = Vec::new();

    for voice in 0..num_voices {
        let entry_tick = u32::from(voice) * SUBJECT_BARS * TICKS_PER_BAR;
        entries.push((voice, entry_tick));

        // Alternate subject and answer: odd entries a fifth up.
        let scale = config.key.scale();
        let stated = if voice % 2 == 1 {
            transpose_diatonic(&subject, 4, config.key.tonic, scale)
        } else {
            subject.clone()
        };
        let range = organ_voice_range(voice);
        let mut placed = place_in_register(&stated, range.center(), range);
        set_voice(&mut placed, voice);
        shift_ticks(&mut placed, entry_tick);
        tracks[usize::from(voice)].notes.extend(placed);

        // Free counterpoint from the end of the statement to the close.
        let free_start = entry_tick + SUBJECT_BARS * TICKS_PER_BAR;
        if free_start < total {
            tracks[usize::from(voice)].notes.extend(free_counterpoint(
                config.key, voice, free_start, total, &mut rng,
            ));
        }
    }

    let voice_ranges: Vec<PitchRange> = (0..num_voices).map(organ_voice_range).collect();
    let ctx = StackContext {
        timeline: &timeline,
        key: config.key,
        ranges: voice_ranges.clone(),
        bass_voice: num_voices - 1,
    };
    let mut report = Pipeline::standard().run(&mut tracks, &ctx);

    for voice in 0..num_voices {
        let role = VoiceRole::for_voice(voice);
        if role == VoiceRole::Ground {
            continue;
        }
        let orn_ctx = OrnamentContext {
            config: OrnamentConfig { density: 0.06, ..OrnamentConfig::default() },
            role,
            bpm: config.bpm,
            range: organ_voice_range(voice),
            timeline: Some(&timeline),
        };
        let idx = usize::from(voice);
        tracks[idx].notes = apply_ornaments(&tracks[idx].notes, &orn_ctx, &mut rng);
    }
    report.accumulate(&Pipeline::post_ornament().run(&mut tracks, &ctx));

    if config.enable_picardy && config.key.is_minor() {
        for (voice, track) in tracks.iter_mut().enumerate() {
            apply_picardy(
                &mut track.notes,
                config.key,
                total - TICKS_PER_BAR,
                organ_voice_range(voice as u8),
            );
        }
    }

    let guard = ImpossibilityGuard::for_kind(InstrumentKind::Organ);
    report.repair_failures += guard.enforce(&mut tracks).unresolved;

    report.accumulate(&analyze_counterpoint(&tracks));

    Ok(FugueOutput { tracks, timeline, total_duration_ticks: total, entries, voice_ranges, report })
}
