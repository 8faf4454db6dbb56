//! forms/organum-forms/src/prelude.rs
//! Organ prelude generator: free-form passage work or perpetual motion.

use organum_harmony::{HarmonicTimeline, Resolution};
use organum_rand::SeededRng;
use organum_score::{CounterpointReport, GenerateError, NoteEvent, NoteSource, Track};
use organum_theory::{KeySignature, Mode, PitchClass, PitchRange};
use organum_time::{
    duration::{EIGHTH_NOTE, HALF_NOTE, QUARTER_NOTE, WHOLE_NOTE},
    Tick, TICKS_PER_BAR,
};
use serde::{Deserialize, Serialize};

use organum_instrument::{ImpossibilityGuard, InstrumentKind};
use crate::analyze::analyze_counterpoint;
use crate::figure::{arpeggio_passage, moto_perpetuo, note_on, scale_passage};
use crate::ornament::{apply_ornaments, OrnamentConfig, OrnamentContext};
use crate::roles::{organ_voice_range, VoiceRole};
use crate::techniques::apply_picardy;
use crate::tracks::organ_tracks;
use crate::validate::{Pipeline, StackContext};

/// Prelude style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreludeType {
    /// Varied scale and arpeggio passage work.
    FreeForm,
    /// Continuous sixteenth-note motion.
    Perpetual,
}

/// Prelude configuration.
#[derive(Debug, Clone, Copy)]
pub struct PreludeConfig {
    /// Governing key.
    pub key: KeySignature,
    /// Prelude style.
    pub prelude_type: PreludeType,
    /// Voice count, clamped to 2..=5.
    pub num_voices: u8,
    /// Tempo (ornament speed only).
    pub bpm: u16,
    /// Generation seed.
    pub seed: u32,
    /// Paired fugue length; the prelude takes 70% of it, or 12 bars at 0.
    pub fugue_length_ticks: Tick,
    /// Raise the final third in minor keys.
    pub enable_picardy: bool,
}

impl Default for PreludeConfig {
    fn default() -> Self {
        Self {
            key: KeySignature::new(PitchClass::new(0), Mode::Major),
            prelude_type: PreludeType::FreeForm,
            num_voices: 3,
            bpm: 100,
            seed: 42,
            fugue_length_ticks: 0,
            enable_picardy: true,
        }
    }
}

/// A generated prelude.
#[derive(Debug, Clone)]
pub struct PreludeOutput {
    /// One track per voice.
    pub tracks: Vec<Track>,
    /// The harmonic skeleton used.
    pub timeline: HarmonicTimeline,
    /// Total length in ticks.
    pub total_duration_ticks: Tick,
    /// Declared pitch range of each voice's manual.
    pub voice_ranges: Vec<PitchRange>,
    /// Faults surviving the repair stack.
    pub report: CounterpointReport,
}

/// Target prelude length: 70% of the fugue, rounded up to a whole bar,
/// or twelve bars when no fugue length is given.
#[must_use]
pub fn prelude_length(fugue_length_ticks: Tick) -> Tick {
    if fugue_length_ticks == 0 {
        return 12 * TICKS_PER_BAR;
    }
    let raw = fugue_length_ticks * 7 / 10;
    raw.div_ceil(TICKS_PER_BAR) * TICKS_PER_BAR
}

/// Quarter/half chord tones for a supporting middle voice.
fn middle_voice(
    timeline: &HarmonicTimeline,
    range: PitchRange,
    voice: u8,
    start: Tick,
    end: Tick,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let mut notes = Vec::new();
    let mut use_half = rng.chance(0.4);
    let mut tick = start;
    while tick < end {
        let event = timeline.get_at(tick);
        let tones = event.chord.tones_in_range(
            range.clamp(event.chord.root.in_octave(3)),
            range.clamp(event.chord.root.in_octave(4).transpose(7)),
        );
        let pitch = if tones.is_empty() {
            range.clamp(event.bass_pitch)
        } else {
            *rng.pick(&tones)
        };
        let dur = (if use_half { HALF_NOTE } else { QUARTER_NOTE }).min(end - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(tick, dur, pitch, voice, NoteSource::FreeCounterpoint));
        tick += dur;
        use_half = !use_half;
    }
    notes
}

/// Half/whole bass notes on the event bass pitch.
fn bass_voice(
    timeline: &HarmonicTimeline,
    range: PitchRange,
    voice: u8,
    start: Tick,
    end: Tick,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let mut notes = Vec::new();
    let mut use_whole = rng.chance(0.5);
    let mut tick = start;
    while tick < end {
        let event = timeline.get_at(tick);
        let dur = (if use_whole { WHOLE_NOTE } else { HALF_NOTE }).min(end - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(tick, dur, range.clamp(event.bass_pitch), voice, NoteSource::FreeCounterpoint));
        tick += dur;
        use_whole = !use_whole;
    }
    notes
}

/// Generate an organ prelude.
///
/// # Errors
/// Returns [`GenerateError::EmptyResult`] if no notes could be produced.
pub fn generate_prelude(config: &PreludeConfig) -> Result<PreludeOutput, GenerateError> {
    let num_voices = config.num_voices.clamp(2, 5);
    let mut rng = SeededRng::new(config.seed);

    let total = prelude_length(config.fugue_length_ticks);
    let timeline = HarmonicTimeline::standard(config.key, total, Resolution::Beat);
    if timeline.is_empty() {
        return Err(GenerateError::EmptyResult("prelude timeline".into()));
    }

    let mut all_notes: Vec<NoteEvent> = Vec::new();
    let bass = num_voices - 1;

    match config.prelude_type {
        PreludeType::Perpetual => {
            // Top voice runs sixteenths across the whole span.
            all_notes.extend(moto_perpetuo(
                &timeline,
                config.key,
                organ_voice_range(0),
                0,
                0,
                total,
                &mut rng,
            ));
            if num_voices >= 2 {
                all_notes.extend(middle_voice(
                    &timeline,
                    organ_voice_range(1),
                    1,
                    0,
                    total,
                    &mut rng,
                ));
            }
            if num_voices >= 3 {
                all_notes.extend(bass_voice(
                    &timeline,
                    organ_voice_range(bass),
                    bass,
                    0,
                    total,
                    &mut rng,
                ));
            }
            for extra in 2..bass {
                all_notes.extend(middle_voice(
                    &timeline,
                    organ_voice_range(extra),
                    extra,
                    0,
                    total,
                    &mut rng,
                ));
            }
        }
        PreludeType::FreeForm => {
            for (event_idx, event) in timeline.events().iter().enumerate() {
                let voice0 = if rng.chance(0.5) {
                    scale_passage(event, organ_voice_range(0), 0, EIGHTH_NOTE, event_idx, &mut rng)
                } else {
                    arpeggio_passage(event, organ_voice_range(0), 0, EIGHTH_NOTE, &mut rng)
                };
                all_notes.extend(voice0);
            }
            if num_voices >= 2 {
                all_notes.extend(middle_voice(
                    &timeline,
                    organ_voice_range(1),
                    1,
                    0,
                    total,
                    &mut rng,
                ));
            }
            if num_voices >= 3 {
                all_notes.extend(bass_voice(
                    &timeline,
                    organ_voice_range(bass),
                    bass,
                    0,
                    total,
                    &mut rng,
                ));
            }
            for extra in 2..bass {
                all_notes.extend(middle_voice(
                    &timeline,
                    organ_voice_range(extra),
                    extra,
                    0,
                    total,
                    &mut rng,
                ));
            }
        }
    }

    if all_notes.is_empty() {
        return Err(GenerateError::EmptyResult("prelude voices".into()));
    }

    let mut tracks = organ_tracks(num_voices);
    for note in all_notes {
        if usize::from(note.voice) < tracks.len() {
            tracks[usize::from(note.voice)].notes.push(note);
        }
    }

    let voice_ranges: Vec<PitchRange> = (0..num_voices).map(organ_voice_range).collect();
    let ctx = StackContext {
        timeline: &timeline,
        key: config.key,
        ranges: voice_ranges.clone(),
        bass_voice: bass,
    };
    let mut report = Pipeline::standard().run(&mut tracks, &ctx);

    // Light ornamentation on the top voice; perpetual sixteenths are too
    // short to qualify and stay clean.
    let orn_ctx = OrnamentContext {
        config: OrnamentConfig { density: 0.05, ..OrnamentConfig::default() },
        role: VoiceRole::Assert,
        bpm: config.bpm,
        range: organ_voice_range(0),
        timeline: Some(&timeline),
    };
    tracks[0].notes = apply_ornaments(&tracks[0].notes, &orn_ctx, &mut rng);
    report.accumulate(&Pipeline::post_ornament().run(&mut tracks, &ctx));

    if config.enable_picardy && config.key.is_minor() && total > TICKS_PER_BAR {
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

    Ok(PreludeOutput { tracks, timeline, total_duration_ticks: total, voice_ranges, report })
}
