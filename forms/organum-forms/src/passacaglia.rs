//! forms/organum-forms/src/passacaglia.rs
//! Passacaglia: an immutable ground bass repeated under upper voices of
//! increasing rhythmic intensity.
//!
//! The ground bass is generated once from its own seed and laid down
//! verbatim in every variation; the upper voices climb through four
//! complexity stages as the variations progress.

use organum_harmony::{HarmonicTimeline, Resolution};
use organum_rand::SeededRng;
use organum_score::{CounterpointReport, GenerateError, NoteEvent, NoteSource, Track};
use organum_theory::{KeySignature, Pitch, PitchClass, PitchRange};
use organum_time::{
    duration::{EIGHTH_NOTE, QUARTER_NOTE, SIXTEENTH_NOTE, WHOLE_NOTE},
    Tick, TICKS_PER_BAR, TICKS_PER_BEAT,
};

use organum_instrument::{ImpossibilityGuard, InstrumentKind};
use crate::analyze::analyze_counterpoint;
use crate::figure::note_on;
use crate::ornament::{apply_ornaments, OrnamentConfig, OrnamentContext};
use crate::roles::{organ_voice_range, VoiceRole};
use crate::techniques::apply_picardy;
use crate::tracks::organ_tracks;
use crate::validate::{Pipeline, StackContext};

/// Passacaglia configuration.
#[derive(Debug, Clone, Copy)]
pub struct PassacagliaConfig {
    /// Governing key (C minor in the model works).
    pub key: KeySignature,
    /// Tempo (ornament speed only).
    pub bpm: u16,
    /// Generation seed; the ground bass derives from it directly.
    pub seed: u32,
    /// Voice count, clamped to 3..=5.
    pub num_voices: u8,
    /// Number of ground-bass variations.
    pub num_variations: u32,
    /// Ground-bass theme length in bars.
    pub ground_bass_bars: u32,
    /// Raise the final third in minor keys.
    pub enable_picardy: bool,
}

impl Default for PassacagliaConfig {
    fn default() -> Self {
        Self {
            key: KeySignature::minor(PitchClass::new(0)),
            bpm: 60,
            seed: 42,
            num_voices: 4,
            num_variations: 12,
            ground_bass_bars: 8,
            enable_picardy: true,
        }
    }
}

/// A generated passacaglia.
#[derive(Debug, Clone)]
pub struct PassacagliaOutput {
    /// One track per voice; the last is the pedal carrying the ground.
    pub tracks: Vec<Track>,
    /// The harmonic skeleton used.
    pub timeline: HarmonicTimeline,
    /// Total length in ticks.
    pub total_duration_ticks: Tick,
    /// The ground-bass theme as emitted (one statement).
    pub ground_bass: Vec<NoteEvent>,
    /// Declared pitch range of each voice's manual.
    pub voice_ranges: Vec<PitchRange>,
    /// Faults surviving the repair stack.
    pub report: CounterpointReport,
}

/// Build the ground-bass theme: one whole note per bar, a stepwise
/// descent from the tonic through in-scale pedal degrees, closed by a
/// V–I tail. First and last notes carry the tonic pitch class.
#[must_use]
pub fn generate_ground_bass(key: KeySignature, bars: u32, seed: u32) -> Vec<NoteEvent> {
    let mut notes = Vec::new();
    if bars == 0 {
        return notes;
    }
    let mut rng = SeededRng::new(seed);
    let range = organ_voice_range(3);
    let scale = key.scale();
    let pedal_tones = scale.tones_in_range(key.tonic, range.low, range.high);

    let tonic = range.clamp(key.tonic_pitch(2));
    let tonic = scale.nearest_tone(tonic, key.tonic);
    let tonic_idx = pedal_tones
        .iter()
        .position(|t| *t == tonic)
        .unwrap_or(pedal_tones.len() / 2);

    // Dominant below the starting tonic when the register allows.
    let mut dominant_raw = tonic.transpose(-5);
    if !range.contains(dominant_raw) {
        dominant_raw = tonic.transpose(7);
    }
    let dominant = scale.nearest_tone(range.clamp(dominant_raw), key.tonic);

    let mut pitches: Vec<Pitch> = Vec::with_capacity(bars as usize);
    match bars {
        1 => pitches.push(tonic),
        2 => {
            // No room for the cadential dominant; keep the tonic frame.
            pitches.push(tonic);
            pitches.push(tonic);
        }
        _ => {
            let descent = bars - 2;
            let mut idx = tonic_idx;
            for _ in 0..descent {
                pitches.push(pedal_tones[idx]);
                if idx > 0 {
                    idx -= 1;
                } else if rng.chance(0.3) && pedal_tones.len() > 1 {
                    idx = 1;
                }
            }
            pitches.push(dominant);
            pitches.push(tonic);
        }
    }

    let mut tick: Tick = 0;
    for pitch in pitches {
        notes.push(NoteEvent::new(tick, WHOLE_NOTE, pitch, 80, 3, NoteSource::GroundBass));
        tick += WHOLE_NOTE;
    }
    notes
}

/// Variation complexity stage by index.
fn stage(variation: u32) -> u8 {
    match variation {
        0..=2 => 0, // quarter chord tones
        3..=5 => 1, // eighth scale passages
        6..=8 => 2, // eighth arpeggios
        _ => 3,     // sixteenth figurations
    }
}

/// Quarter-note chord tones (Establish stage).
fn establish(
    start: Tick,
    end: Tick,
    voice: u8,
    timeline: &HarmonicTimeline,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let range = organ_voice_range(voice);
    let octave = if voice <= 1 { rng.range(4, 5) as i8 } else { 3 };
    let mut notes = Vec::new();
    let mut tick = start;
    while tick < end {
        let event = timeline.get_at(tick);
        let triad = event.chord.triad_in_octave(octave);
        let valid: Vec<Pitch> = triad.into_iter().filter(|p| range.contains(*p)).collect();
        let pitch = if valid.is_empty() {
            range.clamp(event.bass_pitch.transpose(12))
        } else {
            *rng.pick(&valid)
        };
        let dur = QUARTER_NOTE.min(end - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(tick, dur, pitch, voice, NoteSource::FreeCounterpoint));
        tick += dur;
    }
    notes
}

/// Scale or figuration walker shared by the later stages.
fn walk(
    start: Tick,
    end: Tick,
    voice: u8,
    key: KeySignature,
    note_dur: Tick,
    start_fraction: (usize, usize),
    skip_prob: f32,
    reverse_prob: f32,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let range = organ_voice_range(voice);
    let tones = key.scale().tones_in_range(key.tonic, range.low, range.high);
    let mut notes = Vec::new();
    if tones.is_empty() {
        return notes;
    }
    let mut idx = tones.len() * start_fraction.0 / start_fraction.1;
    idx = idx.min(tones.len() - 1);
    let mut ascending = rng.chance(0.5);

    let mut tick = start;
    while tick < end {
        let dur = note_dur.min(end - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(tick, dur, tones[idx], voice, NoteSource::FreeCounterpoint));
        tick += dur;

        let step = if rng.chance(skip_prob) { 2 } else { 1 };
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
        if rng.chance(reverse_prob) {
            ascending = !ascending;
        }
    }
    notes
}

/// Eighth-note arpeggios over the harmonic timeline (Develop-late stage).
fn arpeggio_stage(
    start: Tick,
    end: Tick,
    voice: u8,
    timeline: &HarmonicTimeline,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let range = organ_voice_range(voice);
    let mut notes = Vec::new();
    let mut tick = start;
    while tick < end {
        let event = timeline.get_at(tick);
        let tones = event.chord.tones_in_range(range.low, range.high);
        if tones.is_empty() {
            tick += EIGHTH_NOTE;
            continue;
        }
        let mut idx = rng.range(0, tones.len() as i32 - 1) as usize;
        let mut up = rng.chance(0.6);

        // One beat at a time so chord changes take hold.
        let beat_end = (tick + TICKS_PER_BEAT).min(end);
        while tick < beat_end {
            let dur = EIGHTH_NOTE.min(beat_end - tick);
            if dur == 0 {
                break;
            }
            notes.push(note_on(tick, dur, tones[idx], voice, NoteSource::FreeCounterpoint));
            tick += dur;
            if up {
                if idx + 1 < tones.len() {
                    idx += 1;
                } else {
                    up = false;
                    idx = idx.saturating_sub(1);
                }
            } else if idx > 0 {
                idx -= 1;
            } else {
                up = true;
                idx = (idx + 1).min(tones.len() - 1);
            }
        }
    }
    notes
}

fn variation_notes(
    variation: u32,
    start: Tick,
    bars: u32,
    voice: u8,
    timeline: &HarmonicTimeline,
    key: KeySignature,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let end = start + bars * TICKS_PER_BAR;
    match stage(variation) {
        0 => establish(start, end, voice, timeline, rng),
        1 => walk(start, end, voice, key, EIGHTH_NOTE, (1, 2), 0.25, 0.15, rng),
        2 => arpeggio_stage(start, end, voice, timeline, rng),
        _ => walk(start, end, voice, key, SIXTEENTH_NOTE, (2, 3), 0.2, 0.2, rng),
    }
}

/// Generate a passacaglia.
///
/// # Errors
/// Returns [`GenerateError::InvalidConfig`] on a non-positive variation
/// or bar count, and [`GenerateError::EmptyResult`] if the ground bass
/// comes out empty.
pub fn generate_passacaglia(
    config: &PassacagliaConfig,
) -> Result<PassacagliaOutput, GenerateError> {
    if config.num_variations == 0 || config.ground_bass_bars == 0 {
        return Err(GenerateError::InvalidConfig(
            "num_variations and ground_bass_bars must be > 0".into(),
        ));
    }
    let num_voices = config.num_voices.clamp(3, 5);
    let mut rng = SeededRng::new(config.seed);

    let ground = generate_ground_bass(config.key, config.ground_bass_bars, config.seed);
    if ground.is_empty() {
        return Err(GenerateError::EmptyResult("ground bass".into()));
    }

    let variation_len = config.ground_bass_bars * TICKS_PER_BAR;
    let total = config.num_variations * variation_len;
    let timeline = HarmonicTimeline::standard(config.key, total, Resolution::Beat);

    let mut tracks = organ_tracks(num_voices);
    let pedal = num_voices - 1;

    // The ground bass is stated verbatim in every variation; upper voices
    // thread the one base RNG in variation order.
    for variation in 0..config.num_variations {
        let var_start = variation * variation_len;
        for note in &ground {
            let mut stated = *note;
            stated.start_tick += var_start;
            stated.voice = pedal;
            tracks[usize::from(pedal)].notes.push(stated);
        }
        for voice in 0..pedal {
            let notes = variation_notes(
                variation,
                var_start,
                config.ground_bass_bars,
                voice,
                &timeline,
                config.key,
                &mut rng,
            );
            tracks[usize::from(voice)].notes.extend(notes);
        }
    }

    let voice_ranges: Vec<PitchRange> = (0..num_voices).map(organ_voice_range).collect();
    let ctx = StackContext {
        timeline: &timeline,
        key: config.key,
        ranges: voice_ranges.clone(),
        bass_voice: pedal,
    };
    let mut report = Pipeline::standard().run(&mut tracks, &ctx);

    // Upper voices take light ornamentation by role; the ground never does.
    for voice in 0..pedal {
        let orn_ctx = OrnamentContext {
            config: OrnamentConfig { density: 0.06, ..OrnamentConfig::default() },
            role: VoiceRole::for_voice(voice),
            bpm: config.bpm,
            range: organ_voice_range(voice),
            timeline: Some(&timeline),
        };
        let idx = usize::from(voice);
        tracks[idx].notes = apply_ornaments(&tracks[idx].notes, &orn_ctx, &mut rng);
    }
    report.accumulate(&Pipeline::post_ornament().run(&mut tracks, &ctx));

    if config.enable_picardy && config.key.is_minor() && total > TICKS_PER_BAR {
        for voice in 0..pedal {
            let idx = usize::from(voice);
            apply_picardy(
                &mut tracks[idx].notes,
                config.key,
                total - TICKS_PER_BAR,
                organ_voice_range(voice),
            );
        }
    }

    let guard = ImpossibilityGuard::for_kind(InstrumentKind::Organ);
    report.repair_failures += guard.enforce(&mut tracks).unresolved;

    report.accumulate(&analyze_counterpoint(&tracks));

    Ok(PassacagliaOutput {
        tracks,
        timeline,
        total_duration_ticks: total,
        ground_bass: ground,
        voice_ranges,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_bass_shape_eight_bars() {
        let key = KeySignature::minor(PitchClass::new(0));
        let notes = generate_ground_bass(key, 8, 42);
        assert_eq!(notes.len(), 8);
        for n in &notes {
            assert_eq!(n.duration, WHOLE_NOTE);
            assert_eq!(n.source, NoteSource::GroundBass);
            assert!(organ_voice_range(3).contains(n.pitch));
        }
        // Tonic frame.
        assert_eq!(notes[0].pitch.class(), key.tonic);
        assert_eq!(notes[7].pitch.class(), key.tonic);
        // Interior motion stays within a major sixth; the tail may reach
        // an octave.
        for pair in notes[..7].windows(2) {
            assert!(pair[1].pitch.distance_to(pair[0].pitch) <= 9);
        }
        assert!(notes[7].pitch.distance_to(notes[6].pitch) <= 12);
    }

    #[test]
    fn ground_bass_framing_holds_in_every_key() {
        for tonic in 0..12u8 {
            for key in [
                KeySignature::minor(PitchClass::new(tonic)),
                KeySignature::major(PitchClass::new(tonic)),
            ] {
                let notes = generate_ground_bass(key, 8, 7);
                assert_eq!(notes.first().map(|n| n.pitch.class()), Some(key.tonic));
                assert_eq!(notes.last().map(|n| n.pitch.class()), Some(key.tonic));
            }
        }
    }

    #[test]
    fn degenerate_bar_counts_keep_the_frame() {
        let key = KeySignature::minor(PitchClass::new(2));
        assert_eq!(generate_ground_bass(key, 1, 1).len(), 1);
        let two = generate_ground_bass(key, 2, 1);
        assert_eq!(two.len(), 2);
        assert_eq!(two[0].pitch.class(), key.tonic);
        assert_eq!(two[1].pitch.class(), key.tonic);
        assert!(generate_ground_bass(key, 0, 1).is_empty());
    }

    #[test]
    fn ground_repeats_identically_across_variations() {
        let output = generate_passacaglia(&PassacagliaConfig::default()).expect("generates");
        let pedal = &output.tracks[3].notes;
        assert_eq!(pedal.len(), 96);
        for note in pedal {
            assert_eq!(note.source, NoteSource::GroundBass);
        }
        for variation in 1..12usize {
            for idx in 0..8usize {
                assert_eq!(
                    pedal[variation * 8 + idx].pitch,
                    pedal[idx].pitch,
                    "variation {variation} note {idx}"
                );
                assert_eq!(pedal[variation * 8 + idx].duration, pedal[idx].duration);
            }
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let zero_vars = PassacagliaConfig { num_variations: 0, ..PassacagliaConfig::default() };
        assert!(matches!(
            generate_passacaglia(&zero_vars),
            Err(GenerateError::InvalidConfig(_))
        ));
        let zero_bars = PassacagliaConfig { ground_bass_bars: 0, ..PassacagliaConfig::default() };
        assert!(matches!(
            generate_passacaglia(&zero_bars),
            Err(GenerateError::InvalidConfig(_))
        ));
    }

    #[test]
    fn stages_intensify_across_variations() {
        let output = generate_passacaglia(&PassacagliaConfig::default()).expect("generates");
        let var_len = 8 * TICKS_PER_BAR;
        let count_in = |track: &Track, var: u32| {
            track
                .notes
                .iter()
                .filter(|n| {
                    n.start_tick >= var * var_len && n.start_tick < (var + 1) * var_len
                })
                .count()
        };
        // Sixteenth-note figuration (variation 11) is denser than the
        // quarter-note establishment (variation 0).
        let early = count_in(&output.tracks[0], 0);
        let late = count_in(&output.tracks[0], 11);
        assert!(late > early * 2, "early {early} late {late}");
    }
}
