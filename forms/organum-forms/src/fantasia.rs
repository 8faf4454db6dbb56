//! forms/organum-forms/src/fantasia.rs
//! Fantasia free section: ornamental melody over sustained harmony.
//!
//! Short-note voices (melody, countermelody) are generated per timeline
//! event; long-note voices (chord pad, pedal) span events and look the
//! timeline up at each note start instead.

use organum_harmony::{HarmonicTimeline, Resolution};
use organum_rand::SeededRng;
use organum_score::{CounterpointReport, GenerateError, NoteEvent, NoteSource, Track};
use organum_theory::{KeySignature, PitchClass, PitchRange};
use organum_time::{
    duration::{EIGHTH_NOTE, HALF_NOTE, QUARTER_NOTE, WHOLE_NOTE},
    Tick, TICKS_PER_BAR,
};

use organum_instrument::{ImpossibilityGuard, InstrumentKind};
use crate::analyze::analyze_counterpoint;
use crate::figure::note_on;
use crate::ornament::{apply_ornaments, OrnamentConfig, OrnamentContext};
use crate::roles::{organ_voice_range, VoiceRole};
use crate::techniques::apply_picardy;
use crate::tracks::organ_tracks;
use crate::validate::{Pipeline, StackContext};

/// Fantasia configuration.
#[derive(Debug, Clone, Copy)]
pub struct FantasiaConfig {
    /// Governing key.
    pub key: KeySignature,
    /// Tempo (ornament speed only).
    pub bpm: u16,
    /// Generation seed.
    pub seed: u32,
    /// Voice count, clamped to 2..=5.
    pub num_voices: u8,
    /// Length of the free section in bars.
    pub section_bars: u32,
    /// Raise the final third in minor keys.
    pub enable_picardy: bool,
}

impl Default for FantasiaConfig {
    fn default() -> Self {
        Self {
            key: KeySignature::minor(PitchClass::new(7)),
            bpm: 66,
            seed: 42,
            num_voices: 4,
            section_bars: 32,
            enable_picardy: true,
        }
    }
}

/// A generated fantasia.
#[derive(Debug, Clone)]
pub struct FantasiaOutput {
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

/// Contemplative quarter/eighth melody weaving through the scale with
/// occasional leaps to chord tones. One harmonic event at a time.
fn ornamental_melody(
    event: &organum_harmony::HarmonicEvent,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let range = PitchRange::new(60, 84);
    let mut notes = Vec::new();
    let key = event.key;
    let tones = key.scale().tones_in_range(key.tonic, range.low, range.high);
    if tones.is_empty() {
        return notes;
    }

    // Anchor the start near the first chord tone in range.
    let mut idx = tones.len() / 2;
    if let Some(anchor) = event.chord.nearest_tone(tones[idx], range.low, range.high) {
        if let Some(pos) = tones.iter().position(|t| *t >= anchor) {
            idx = pos;
        }
    }
    let mut ascending = rng.chance(0.5);

    let mut tick = event.tick;
    while tick < event.end_tick {
        let dur = (if rng.chance(0.4) { EIGHTH_NOTE } else { QUARTER_NOTE })
            .min(event.end_tick - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(tick, dur, tones[idx], 0, NoteSource::FreeCounterpoint));
        tick += dur;

        let step = if rng.chance(0.2) { rng.range(2, 3) as usize } else { 1 };
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
        if rng.chance(0.15) {
            ascending = !ascending;
        }
    }
    notes
}

/// Gentle eighth-note countermelody in the Positiv register.
fn countermelody(
    event: &organum_harmony::HarmonicEvent,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let range = PitchRange::new(55, 79);
    let mut notes = Vec::new();
    let key = event.key;
    let tones = key.scale().tones_in_range(key.tonic, range.low, range.high);
    if tones.is_empty() {
        return notes;
    }

    let mut idx = tones.len() / 3;
    let mut ascending = rng.chance(0.5);
    let mut tick = event.tick;
    while tick < event.end_tick {
        let dur = EIGHTH_NOTE.min(event.end_tick - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(tick, dur, tones[idx], 2, NoteSource::FreeCounterpoint));
        tick += dur;

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
        if rng.chance(0.2) {
            ascending = !ascending;
        }
    }
    notes
}

/// Half/whole sustained chord tones across the full span, looking the
/// timeline up at each note start.
fn sustained_chords(
    timeline: &HarmonicTimeline,
    total: Tick,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let range = PitchRange::new(48, 72);
    let mut notes = Vec::new();
    let mut use_whole = rng.chance(0.5);

    let mut tick = 0;
    while tick < total {
        let event = timeline.get_at(tick);
        let tones = event.chord.tones_in_range(range.low, range.high);
        let pitch = if tones.is_empty() {
            range.clamp(event.bass_pitch)
        } else {
            *rng.pick(&tones)
        };

        let dur = (if use_whole { WHOLE_NOTE } else { HALF_NOTE }).min(total - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(tick, dur, pitch, 1, NoteSource::FreeCounterpoint));
        tick += dur;
        use_whole = !use_whole;
    }
    notes
}

/// Whole-note pedal foundation on the event bass pitch.
fn slow_bass(timeline: &HarmonicTimeline, total: Tick) -> Vec<NoteEvent> {
    let range = organ_voice_range(3);
    let mut notes = Vec::new();
    let mut tick = 0;
    while tick < total {
        let event = timeline.get_at(tick);
        let dur = WHOLE_NOTE.min(total - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(tick, dur, range.clamp(event.bass_pitch), 3, NoteSource::PedalPoint));
        tick += dur;
    }
    notes
}

/// Generate a fantasia free section.
///
/// # Errors
/// Returns [`GenerateError::InvalidConfig`] when `section_bars` is zero,
/// and [`GenerateError::EmptyResult`] if no notes could be produced.
pub fn generate_fantasia(config: &FantasiaConfig) -> Result<FantasiaOutput, GenerateError> {
    if config.section_bars == 0 {
        return Err(GenerateError::InvalidConfig("section_bars must be > 0".into()));
    }
    let num_voices = config.num_voices.clamp(2, 5);
    let mut rng = SeededRng::new(config.seed);

    let total = config.section_bars * TICKS_PER_BAR;
    let timeline = HarmonicTimeline::standard(config.key, total, Resolution::Beat);

    let mut all_notes: Vec<NoteEvent> = Vec::new();

    // Per-event generation for the short-note voices.
    for event in timeline.events() {
        all_notes.extend(ornamental_melody(event, &mut rng));
        if num_voices >= 3 {
            all_notes.extend(countermelody(event, &mut rng));
        }
    }

    // Full-span generation for the long-note voices.
    if num_voices >= 2 {
        all_notes.extend(sustained_chords(&timeline, total, &mut rng));
    }
    if num_voices >= 4 {
        all_notes.extend(slow_bass(&timeline, total));
    }

    if all_notes.is_empty() {
        return Err(GenerateError::EmptyResult("fantasia voices".into()));
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
        bass_voice: num_voices - 1,
    };
    let mut report = Pipeline::standard().run(&mut tracks, &ctx);

    // Decorate the melody and countermelody; the pad and pedal carry the
    // sustained texture and stay plain.
    for (voice, role) in [(0u8, VoiceRole::Assert), (2u8, VoiceRole::Propel)] {
        if usize::from(voice) >= tracks.len() {
            continue;
        }
        let orn_ctx = OrnamentContext {
            config: OrnamentConfig { density: 0.08, ..OrnamentConfig::default() },
            role,
            bpm: config.bpm,
            range: organ_voice_range(voice),
            timeline: Some(&timeline),
        };
        let voice_idx = usize::from(voice);
        tracks[voice_idx].notes = apply_ornaments(&tracks[voice_idx].notes, &orn_ctx, &mut rng);
    }
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

    Ok(FantasiaOutput { tracks, timeline, total_duration_ticks: total, voice_ranges, report })
}
