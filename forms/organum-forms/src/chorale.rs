//! forms/organum-forms/src/chorale.rs
//! Chorale prelude: an immutable cantus firmus with figuration, inner
//! voice, and pedal woven against it.
//!
//! The cantus is chosen from a small built-in catalogue by `seed mod N`
//! and transposed into the configured key. Everything else follows the
//! harmonic timeline.

use organum_harmony::{HarmonicTimeline, Resolution};
use organum_rand::SeededRng;
use organum_score::{
    CounterpointReport, GenerateError, NoteEvent, NoteSource, Track, ORGAN_VELOCITY,
};
use organum_theory::{KeySignature, Pitch, PitchClass, PitchRange};
use organum_time::{
    duration::{EIGHTH_NOTE, HALF_NOTE, QUARTER_NOTE, SIXTEENTH_NOTE},
    position_in_bar, Tick, TICKS_PER_BAR, TICKS_PER_BEAT,
};

use organum_instrument::{ImpossibilityGuard, InstrumentKind};
use crate::analyze::analyze_counterpoint;
use crate::figure::note_on;
use crate::ornament::{apply_ornaments, OrnamentConfig, OrnamentContext};
use crate::roles::VoiceRole;
use crate::techniques::apply_picardy;
use crate::tracks::chorale_tracks;
use crate::validate::{Pipeline, StackContext};

/// One cantus note: pitch in the C-major source key, duration in beats.
struct CantusNote {
    pitch: u8,
    beats: u8,
}

struct CantusMelody {
    name: &'static str,
    notes: &'static [CantusNote],
}

const fn cn(pitch: u8, beats: u8) -> CantusNote {
    CantusNote { pitch, beats }
}

/// "Wachet auf" — ascending/descending stepwise arch (after Nicolai, 1599).
const WACHET_AUF: [CantusNote; 16] = [
    cn(60, 4), cn(62, 4), cn(64, 4), cn(65, 4),
    cn(67, 8),
    cn(65, 4), cn(64, 4), cn(62, 4), cn(60, 4),
    cn(62, 4), cn(64, 8),
    cn(67, 4), cn(65, 4), cn(64, 4), cn(62, 4),
    cn(60, 8),
];

/// "Nun komm" — gentle stepwise arc (after the Advent tune).
const NUN_KOMM: [CantusNote; 15] = [
    cn(64, 4), cn(62, 4), cn(60, 4), cn(62, 4),
    cn(64, 4), cn(64, 4), cn(64, 8),
    cn(65, 4), cn(67, 4), cn(69, 4), cn(67, 4),
    cn(65, 4), cn(64, 4), cn(62, 4), cn(60, 8),
];

/// "Ein feste Burg" — bold, assertive line (after Luther, 1529).
const EIN_FESTE_BURG: [CantusNote; 15] = [
    cn(67, 4), cn(67, 4), cn(67, 4), cn(64, 4),
    cn(65, 4), cn(67, 4), cn(69, 4), cn(67, 8),
    cn(65, 4), cn(64, 4), cn(62, 4), cn(64, 4),
    cn(60, 4), cn(62, 4), cn(60, 8),
];

const CATALOG: [CantusMelody; 3] = [
    CantusMelody { name: "Wachet auf", notes: &WACHET_AUF },
    CantusMelody { name: "Nun komm", notes: &NUN_KOMM },
    CantusMelody { name: "Ein feste Burg", notes: &EIN_FESTE_BURG },
];

/// Chorale prelude configuration.
#[derive(Debug, Clone, Copy)]
pub struct ChoraleConfig {
    /// Governing key; the cantus transposes to it.
    pub key: KeySignature,
    /// Tempo (ornament speed only).
    pub bpm: u16,
    /// Generation seed; also selects the cantus (`seed mod 3`).
    pub seed: u32,
    /// Raise the final third in minor keys.
    pub enable_picardy: bool,
}

impl Default for ChoraleConfig {
    fn default() -> Self {
        Self {
            key: KeySignature::major(PitchClass::new(0)),
            bpm: 60,
            seed: 42,
            enable_picardy: true,
        }
    }
}

/// A generated chorale prelude.
#[derive(Debug, Clone)]
pub struct ChoraleOutput {
    /// Counterpoint (Great), Cantus (Swell), Inner (Great), Pedal.
    pub tracks: Vec<Track>,
    /// The harmonic skeleton used.
    pub timeline: HarmonicTimeline,
    /// Total length in ticks (the cantus length).
    pub total_duration_ticks: Tick,
    /// Name of the chosen chorale melody.
    pub chorale_name: &'static str,
    /// Declared pitch range of each voice; the inner voice is capped
    /// below the cantus floor.
    pub voice_ranges: Vec<PitchRange>,
    /// Faults surviving the repair stack.
    pub report: CounterpointReport,
}

/// Tonic offset wrapped into -6..=5 so the cantus stays in its register.
fn transposition_offset(key: KeySignature) -> i32 {
    let raw = i32::from(key.tonic.value());
    if raw > 6 { raw - 12 } else { raw }
}

/// Voice ranges for the four chorale voices, cantus-dependent: the inner
/// voice is capped just below the cantus floor so the lines never cross.
fn chorale_ranges(cantus_low: Pitch) -> Vec<PitchRange> {
    let inner_high = cantus_low.midi().saturating_sub(1).max(49);
    vec![
        PitchRange::new(48, 71),
        PitchRange::new(36, 96),
        PitchRange::new(inner_high.saturating_sub(12), inner_high),
        PitchRange::new(24, 50),
    ]
}

/// Eighth/sixteenth figuration against one cantus note. Downbeats carry
/// the longer values; strong beats anchor on chord tones.
fn figuration(
    start: Tick,
    end: Tick,
    timeline: &HarmonicTimeline,
    key: KeySignature,
    range: PitchRange,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let mut notes = Vec::new();
    let tones = key.scale().tones_in_range(key.tonic, range.low, range.high);
    if tones.is_empty() {
        return notes;
    }

    let mut idx = tones.len() / 2;
    let mut ascending = rng.chance(0.5);
    let mut tick = start;
    while tick < end {
        let on_downbeat = position_in_bar(tick) == 0;
        let dur = if on_downbeat {
            EIGHTH_NOTE
        } else if rng.chance(0.35) {
            SIXTEENTH_NOTE
        } else {
            EIGHTH_NOTE
        }
        .min(end - tick);
        if dur == 0 {
            break;
        }

        // Strong-beat chord anchoring keeps the weave consonant.
        if tick % TICKS_PER_BEAT == 0 && organum_time::is_strong_beat(tick) {
            let event = timeline.get_at(tick);
            if let Some(anchor) = event.chord.nearest_tone(tones[idx], range.low, range.high) {
                if let Some(pos) = tones.iter().position(|t| *t >= anchor) {
                    idx = pos;
                }
            }
        }

        notes.push(note_on(tick, dur, tones[idx], 0, NoteSource::FreeCounterpoint));
        tick += dur;

        let step = if rng.chance(0.25) { 2 } else { 1 };
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

/// Slow inner-voice chord tones strictly below the cantus.
fn inner_voice(
    start: Tick,
    end: Tick,
    timeline: &HarmonicTimeline,
    range: PitchRange,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let mut notes = Vec::new();
    let mut prev = range.center();
    let mut use_half = rng.chance(0.5);

    let mut tick = start;
    while tick < end {
        let event = timeline.get_at(tick);
        let pitch = event
            .chord
            .nearest_tone(prev, range.low, range.high)
            .unwrap_or_else(|| range.clamp(event.bass_pitch.transpose(12)));

        let dur = (if use_half { HALF_NOTE } else { QUARTER_NOTE }).min(end - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(tick, dur, pitch, 2, NoteSource::FreeCounterpoint));
        prev = pitch;
        tick += dur;
        use_half = !use_half;
    }
    notes
}

/// Pedal bass alternating chord root and fifth in quarters and halves.
fn pedal_bass(
    start: Tick,
    end: Tick,
    timeline: &HarmonicTimeline,
    range: PitchRange,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let mut notes = Vec::new();
    let mut tick = start;
    while tick < end {
        let event = timeline.get_at(tick);
        let root = range.clamp(event.bass_pitch);
        let fifth = range.clamp(root.transpose(7));
        let pitch = if rng.chance(0.67) { root } else { fifth };

        let dur = (if rng.chance(0.5) { QUARTER_NOTE } else { HALF_NOTE }).min(end - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(tick, dur, pitch, 3, NoteSource::PedalPoint));
        tick += dur;
    }
    notes
}

/// Generate a chorale prelude.
///
/// # Errors
/// Returns [`GenerateError::EmptyResult`] if the cantus has no length.
pub fn generate_chorale_prelude(config: &ChoraleConfig) -> Result<ChoraleOutput, GenerateError> {
    let melody = &CATALOG[(config.seed % CATALOG.len() as u32) as usize];

    let total: Tick =
        melody.notes.iter().map(|n| Tick::from(n.beats) * TICKS_PER_BEAT).sum();
    if total == 0 {
        return Err(GenerateError::EmptyResult("cantus firmus".into()));
    }

    let timeline = HarmonicTimeline::standard(config.key, total, Resolution::Beat);
    let mut tracks = chorale_tracks();
    let offset = transposition_offset(config.key);
    let swell = PitchRange::new(36, 96);

    // Place the cantus on the Swell, immutable.
    let mut cantus_tick: Tick = 0;
    let mut cantus_low = Pitch::new(127);
    for note in melody.notes {
        let dur = Tick::from(note.beats) * TICKS_PER_BEAT;
        let pitch = swell.clamp(Pitch::new(note.pitch).transpose(offset));
        cantus_low = cantus_low.min(pitch);
        tracks[1].notes.push(NoteEvent::new(
            cantus_tick,
            dur,
            pitch,
            ORGAN_VELOCITY,
            1,
            NoteSource::CantusFixed,
        ));
        cantus_tick += dur;
    }

    let ranges = chorale_ranges(cantus_low);
    let mut rng = SeededRng::new(config.seed);

    // Weave the other voices against each cantus note.
    let mut tick: Tick = 0;
    for note in melody.notes {
        let dur = Tick::from(note.beats) * TICKS_PER_BEAT;
        let end = tick + dur;
        tracks[0].notes.extend(figuration(tick, end, &timeline, config.key, ranges[0], &mut rng));
        tracks[2].notes.extend(inner_voice(tick, end, &timeline, ranges[2], &mut rng));
        tracks[3].notes.extend(pedal_bass(tick, end, &timeline, ranges[3], &mut rng));
        tick = end;
    }

    let ctx = StackContext {
        timeline: &timeline,
        key: config.key,
        ranges: ranges.clone(),
        bass_voice: 3,
    };
    let mut report = Pipeline::standard().run(&mut tracks, &ctx);

    // Only the counterpoint voice is decorated; the cantus is sacrosanct
    // and the inner/pedal voices carry the slow texture.
    let orn_ctx = OrnamentContext {
        config: OrnamentConfig { density: 0.10, ..OrnamentConfig::default() },
        role: VoiceRole::Assert,
        bpm: config.bpm,
        range: ranges[0],
        timeline: Some(&timeline),
    };
    tracks[0].notes = apply_ornaments(&tracks[0].notes, &orn_ctx, &mut rng);
    report.accumulate(&Pipeline::post_ornament().run(&mut tracks, &ctx));

    if config.enable_picardy && config.key.is_minor() && total > TICKS_PER_BAR {
        for (voice, track) in tracks.iter_mut().enumerate() {
            // The cantus keeps its pitches even at the close.
            if voice == 1 {
                continue;
            }
            apply_picardy(&mut track.notes, config.key, total - TICKS_PER_BAR, ranges[voice]);
        }
    }

    let guard = ImpossibilityGuard::for_kind(InstrumentKind::Organ);
    report.repair_failures += guard.enforce(&mut tracks).unresolved;

    report.accumulate(&analyze_counterpoint(&tracks));

    Ok(ChoraleOutput {
        tracks,
        timeline,
        total_duration_ticks: total,
        chorale_name: melody.name,
        voice_ranges: ranges,
        report,
    })
}
