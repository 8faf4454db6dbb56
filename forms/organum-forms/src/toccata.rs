//! forms/organum-forms/src/toccata.rs
//! Toccata generators: the Perpetuus arc and the Sectionalis wave.
//!
//! Both archetypes allocate bars to named sections, lay a bespoke
//! harmonic plan over them, and drive the section textures from the
//! shared voice primitives. Registration plans ride along as auxiliary
//! data; note velocities never move.

use organum_harmony::{chord_on_degree, HarmonicEvent, HarmonicTimeline};
use organum_rand::SeededRng;
use organum_score::{
    dedup_single_voice, CounterpointReport, GenerateError, NoteEvent, NoteSource, Track,
};
use organum_theory::{Chord, ChordDegree, ChordQuality, KeySignature, PitchClass, PitchRange};
use organum_time::{
    duration::{EIGHTH_NOTE, QUARTER_NOTE, SIXTEENTH_NOTE, WHOLE_NOTE},
    is_strong_beat, Tick, TICKS_PER_BAR,
};

use organum_instrument::{ImpossibilityGuard, InstrumentKind};
use crate::analyze::analyze_counterpoint;
use crate::figure::{chord_pad, moto_perpetuo, note_on};
use crate::ornament::{apply_ornaments, OrnamentConfig, OrnamentContext};
use crate::roles::VoiceRole;
use crate::techniques::{apply_picardy, RegistrationPlan, StopLevel};
use crate::tracks::toccata_tracks;
use crate::validate::{Pipeline, StackContext};

/// The two toccata archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToccataArchetype {
    /// Ascending energy: continuous sixteenth-note moto perpetuo.
    Perpetuus,
    /// Wave energy: free, quasi-fugal, cadenza, and coda sections.
    Sectionalis,
}

/// Named section identities across both archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionId {
    /// Perpetuus opening third.
    Ascent,
    /// Perpetuus sustained middle.
    Plateau,
    /// Perpetuus drive to the close.
    Climax,
    /// Sectionalis opening free passage.
    Free1,
    /// Sectionalis imitative middle.
    QuasiFugal,
    /// Sectionalis second free passage.
    Free2,
    /// Sectionalis pedal solo.
    Cadenza,
    /// Sectionalis closing drive.
    Coda,
}

/// A section's half-open tick span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionBoundary {
    /// Section identity.
    pub id: SectionId,
    /// Start tick (inclusive).
    pub start: Tick,
    /// End tick (exclusive).
    pub end: Tick,
}

/// Toccata configuration.
#[derive(Debug, Clone, Copy)]
pub struct ToccataConfig {
    /// Governing key.
    pub key: KeySignature,
    /// Which archetype to generate.
    pub archetype: ToccataArchetype,
    /// Tempo (ornament speed only).
    pub bpm: u16,
    /// Generation seed.
    pub seed: u32,
    /// Voice count, clamped to 2..=5.
    pub num_voices: u8,
    /// Total length in bars.
    pub total_bars: u32,
    /// Raise the final third in minor keys.
    pub enable_picardy: bool,
}

impl Default for ToccataConfig {
    fn default() -> Self {
        Self {
            key: KeySignature::minor(PitchClass::new(2)),
            archetype: ToccataArchetype::Perpetuus,
            bpm: 110,
            seed: 42,
            num_voices: 3,
            total_bars: 24,
            enable_picardy: true,
        }
    }
}

/// A generated toccata.
#[derive(Debug, Clone)]
pub struct ToccataOutput {
    /// One track per voice.
    pub tracks: Vec<Track>,
    /// The harmonic skeleton used.
    pub timeline: HarmonicTimeline,
    /// Total length in ticks.
    pub total_duration_ticks: Tick,
    /// The archetype that was generated.
    pub archetype: ToccataArchetype,
    /// Section layout.
    pub sections: Vec<SectionBoundary>,
    /// Stop-density plan for the rendering layer.
    pub registration: RegistrationPlan,
    /// Declared pitch range of each voice's manual.
    pub voice_ranges: Vec<PitchRange>,
    /// Faults surviving the repair stack.
    pub report: CounterpointReport,
}

/// Manual range for a toccata voice: Great, Swell, Pedal, Positiv.
fn toccata_voice_range(voice: u8) -> PitchRange {
    match voice {
        0 | 1 => PitchRange::new(36, 96),
        2 => PitchRange::new(24, 50),
        3 => PitchRange::new(48, 96),
        _ => PitchRange::new(36, 96),
    }
}

/// Distribute `total_bars` over proportions; each section gets at least
/// one bar and the largest takes the rounding remainder.
fn allocate_bars(total_bars: u32, proportions: &[f32]) -> Vec<u32> {
    let mut bars: Vec<u32> = proportions
        .iter()
        .map(|p| ((total_bars as f32 * p) as u32).max(1))
        .collect();
    let assigned: u32 = bars.iter().sum();
    let largest = proportions
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map_or(0, |(idx, _)| idx);
    if total_bars > assigned {
        bars[largest] += total_bars - assigned;
    } else if assigned > total_bars {
        let excess = assigned - total_bars;
        bars[largest] = bars[largest].saturating_sub(excess).max(1);
    }
    bars
}

fn build_sections(bar_counts: &[u32], ids: &[SectionId]) -> Vec<SectionBoundary> {
    let mut sections = Vec::with_capacity(ids.len());
    let mut tick = 0;
    for (count, id) in bar_counts.iter().zip(ids) {
        let end = tick + count * TICKS_PER_BAR;
        sections.push(SectionBoundary { id: *id, start: tick, end });
        tick = end;
    }
    sections
}

/// Push a plan chord onto the timeline; spans are contiguous by
/// construction in the plan builders.
fn plan_chord(
    timeline: &mut HarmonicTimeline,
    key: KeySignature,
    tick: Tick,
    end_tick: Tick,
    degree: ChordDegree,
    weight: f32,
) {
    let chord = chord_on_degree(key, degree);
    let mut event = HarmonicEvent::new(tick, end_tick, key, chord);
    event.weight = weight;
    let _ = timeline.push(event);
}

fn segment_degrees(
    timeline: &mut HarmonicTimeline,
    key: KeySignature,
    start: Tick,
    end: Tick,
    degrees: &[ChordDegree],
) {
    let count = degrees.len() as u32;
    let seg = ((end - start) / count).max(1);
    for (idx, degree) in degrees.iter().enumerate() {
        let s = start + seg * idx as u32;
        let e = if idx as u32 + 1 == count { end } else { start + seg * (idx as u32 + 1) };
        if s >= e {
            break;
        }
        plan_chord(timeline, key, s, e, *degree, 1.0);
    }
}

// ---------------------------------------------------------------------
// Perpetuus
// ---------------------------------------------------------------------

fn perpetuus_plan(key: KeySignature, sections: &[SectionBoundary]) -> HarmonicTimeline {
    use ChordDegree as D;
    let mut timeline = HarmonicTimeline::new();

    // Ascent: slow harmonies, one chord per sixth.
    segment_degrees(
        &mut timeline,
        key,
        sections[0].start,
        sections[0].end,
        &[D::I, D::IV, D::V, D::I, D::vi, D::IV],
    );
    // Plateau: one chord per seventh, circling through secondaries.
    segment_degrees(
        &mut timeline,
        key,
        sections[1].start,
        sections[1].end,
        &[D::I, D::V_of_IV, D::IV, D::V_of_V, D::V, D::viiDim, D::I],
    );
    // Climax: compressed cadential drive; the final tonic lands major
    // with extra weight.
    let s = sections[2].start;
    let end = sections[2].end;
    let seg = ((end - s) / 4).max(1);
    plan_chord(&mut timeline, key, s, s + seg, ChordDegree::IV, 1.0);
    plan_chord(&mut timeline, key, s + seg, s + 2 * seg, ChordDegree::V_of_V, 1.0);
    plan_chord(&mut timeline, key, s + 2 * seg, s + 3 * seg, ChordDegree::V, 1.0);
    let final_chord = Chord::new(key.tonic, ChordQuality::Major, ChordDegree::I);
    let mut final_event = HarmonicEvent::new(s + 3 * seg, end, key, final_chord);
    final_event.weight = 1.5;
    let _ = timeline.push(final_event);

    timeline
}

fn generate_perpetuus(
    config: &ToccataConfig,
    num_voices: u8,
    rng: &mut SeededRng,
) -> (Vec<NoteEvent>, HarmonicTimeline, Vec<SectionBoundary>, RegistrationPlan) {
    let bars = allocate_bars(config.total_bars, &[0.35, 0.40, 0.25]);
    let sections =
        build_sections(&bars, &[SectionId::Ascent, SectionId::Plateau, SectionId::Climax]);
    let timeline = perpetuus_plan(config.key, &sections);

    let mut notes = Vec::new();
    let key = config.key;

    // Ascent: voice 0 runs from the start; voice 1 pads in at 40%.
    let ascent = sections[0];
    notes.extend(moto_perpetuo(
        &timeline, key, toccata_voice_range(0), 0, ascent.start, ascent.end, rng,
    ));
    let entry = ascent.start + (ascent.end - ascent.start) * 40 / 100;
    notes.extend(chord_pad(&timeline, toccata_voice_range(1), 1, entry, ascent.end, rng));

    // Plateau: both manuals in moto perpetuo; the pedal enters.
    let plateau = sections[1];
    for voice in [0u8, 1] {
        notes.extend(moto_perpetuo(
            &timeline, key, toccata_voice_range(voice), voice, plateau.start, plateau.end, rng,
        ));
    }

    // Climax: manuals drive on.
    let climax = sections[2];
    for voice in [0u8, 1] {
        notes.extend(moto_perpetuo(
            &timeline, key, toccata_voice_range(voice), voice, climax.start, climax.end, rng,
        ));
    }

    if num_voices >= 3 {
        for span in [plateau, climax] {
            let mut pedal = chord_pad(
                &timeline,
                toccata_voice_range(2),
                2,
                span.start,
                span.end,
                rng,
            );
            for n in &mut pedal {
                n.source = NoteSource::PedalPoint;
            }
            notes.extend(pedal);
        }
    }
    for voice in 3..num_voices {
        notes.extend(chord_pad(
            &timeline,
            toccata_voice_range(voice),
            voice,
            climax.start,
            climax.end,
            rng,
        ));
    }

    let mut registration = RegistrationPlan::default();
    registration.add_point(ascent.start, StopLevel::Piano, "piano");
    registration.add_point(entry, StopLevel::Mezzo, "mezzo");
    registration.add_point(plateau.start, StopLevel::Forte, "forte");
    registration.add_point(
        plateau.start + (plateau.end - plateau.start) / 2,
        StopLevel::Pleno,
        "pleno",
    );
    registration.add_point(climax.start, StopLevel::Tutti, "tutti");

    (notes, timeline, sections, registration)
}

// ---------------------------------------------------------------------
// Sectionalis
// ---------------------------------------------------------------------

fn sectionalis_plan(key: KeySignature, sections: &[SectionBoundary]) -> HarmonicTimeline {
    use ChordDegree as D;
    let mut timeline = HarmonicTimeline::new();

    segment_degrees(
        &mut timeline,
        key,
        sections[0].start,
        sections[0].end,
        &[D::I, D::V, D::I, D::IV, D::V],
    );
    segment_degrees(
        &mut timeline,
        key,
        sections[1].start,
        sections[1].end,
        &[D::I, D::V, D::vi, D::IV, D::V, D::I],
    );
    segment_degrees(
        &mut timeline,
        key,
        sections[2].start,
        sections[2].end,
        &[D::vi, D::IV, D::V_of_V, D::V],
    );
    // Cadenza: a single dominant pedal.
    plan_chord(&mut timeline, key, sections[3].start, sections[3].end, D::V, 0.8);
    segment_degrees(
        &mut timeline,
        key,
        sections[4].start,
        sections[4].end,
        &[D::IV, D::V_of_V, D::V, D::I],
    );
    timeline
}

/// Imitative section: a 2-bar head motif stated in each voice at 2-bar
/// intervals, each entry continuing in free counterpoint.
fn quasi_fugal(
    key: KeySignature,
    num_voices: u8,
    start: Tick,
    end: Tick,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let mut notes = Vec::new();
    let voices = num_voices.min(3);
    let motif_span = 2 * TICKS_PER_BAR;
    let motif_len = 8usize;

    // The head motif as scale-index offsets from each voice's centre.
    let mut offsets = vec![0i32; motif_len];
    for idx in 1..motif_len {
        offsets[idx] = offsets[idx - 1] + rng.range(-2, 2);
    }
    let note_dur = motif_span / motif_len as u32;

    for voice in 0..voices {
        let entry = start + u32::from(voice) * motif_span;
        if entry >= end {
            break;
        }
        let range = toccata_voice_range(voice);
        let tones = key.scale().tones_in_range(key.tonic, range.low, range.high);
        if tones.is_empty() {
            continue;
        }
        let base = tones.len() as i32 / 2;

        for (idx, offset) in offsets.iter().enumerate() {
            let tick = entry + idx as u32 * note_dur;
            if tick >= end {
                break;
            }
            let dur = note_dur.min(end - tick);
            let tone_idx = (base + offset).clamp(0, tones.len() as i32 - 1) as usize;
            notes.push(note_on(tick, dur, tones[tone_idx], voice, NoteSource::FreeCounterpoint));
        }

        // Free counterpoint after the statement.
        let mut idx = base as usize;
        let mut ascending = rng.chance(0.5);
        let mut tick = entry + motif_span;
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
    }
    notes
}

/// Pedal cadenza: a sixteenth-note scale descent, a dominant-seventh
/// arpeggio, and an oscillating trill on the dominant.
fn pedal_cadenza(key: KeySignature, start: Tick, end: Tick) -> Vec<NoteEvent> {
    let mut notes = Vec::new();
    let range = toccata_voice_range(2);
    let tones = key.scale().tones_in_range(key.tonic, range.low, range.high);
    if tones.is_empty() {
        return notes;
    }
    let voice = 2u8;
    let mid = start + (end - start) / 2;

    // Phase 1: descending run.
    let mut idx = tones.len() - 1;
    let mut tick = start;
    while tick < mid {
        let dur = SIXTEENTH_NOTE.min(mid - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(tick, dur, tones[idx], voice, NoteSource::PedalPoint));
        tick += dur;
        idx = if idx > 0 { idx - 1 } else { tones.len() - 1 };
    }

    // Phase 2: rising V7 arpeggio.
    let dominant = key.dominant();
    let v7 = Chord::new(dominant.tonic, ChordQuality::Dominant7, ChordDegree::V);
    let arp = v7.tones_in_range(range.low, range.high);
    let arp_end = tick + (end - tick) * 60 / 100;
    let mut arp_idx = 0usize;
    while tick < arp_end && !arp.is_empty() {
        let dur = SIXTEENTH_NOTE.min(arp_end - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(tick, dur, arp[arp_idx % arp.len()], voice, NoteSource::PedalPoint));
        tick += dur;
        arp_idx += 1;
    }

    // Phase 3: trill on the dominant against its upper scale neighbour.
    let dom_pitch = key.scale().nearest_tone(range.clamp(dominant.tonic.in_octave(1)), key.tonic);
    let upper = tones.iter().copied().find(|t| *t > dom_pitch).unwrap_or(dom_pitch);
    let mut use_main = true;
    while tick < end {
        let dur = SIXTEENTH_NOTE.min(end - tick);
        if dur == 0 {
            break;
        }
        notes.push(note_on(
            tick,
            dur,
            if use_main { dom_pitch } else { upper },
            voice,
            NoteSource::PedalPoint,
        ));
        tick += dur;
        use_main = !use_main;
    }
    notes
}

/// Free section: eighth/sixteenth passage work on the top two manuals,
/// chord-targeted on strong beats.
fn free_section(
    timeline: &HarmonicTimeline,
    key: KeySignature,
    num_voices: u8,
    start: Tick,
    end: Tick,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let mut notes = Vec::new();
    for voice in 0..num_voices.min(2) {
        let range = toccata_voice_range(voice);
        let tones = key.scale().tones_in_range(key.tonic, range.low, range.high);
        if tones.is_empty() {
            continue;
        }
        let mut idx = tones.len() / 2;
        let mut ascending = voice == 0;

        let mut tick = start;
        while tick < end {
            let dur = (if rng.chance(0.6) { EIGHTH_NOTE } else { SIXTEENTH_NOTE }).min(end - tick);
            if dur == 0 {
                break;
            }

            if is_strong_beat(tick) {
                let event = timeline.get_at(tick);
                if let Some(best) = event.chord.nearest_tone(tones[idx], range.low, range.high) {
                    if let Some(pos) = tones.iter().position(|t| *t >= best) {
                        idx = pos;
                    }
                }
            } else {
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
            }
            if rng.chance(0.10) {
                ascending = !ascending;
            }

            notes.push(note_on(tick, dur, tones[idx], voice, NoteSource::FreeCounterpoint));
            tick += dur;
        }
    }
    notes
}

fn generate_sectionalis(
    config: &ToccataConfig,
    num_voices: u8,
    rng: &mut SeededRng,
) -> (Vec<NoteEvent>, HarmonicTimeline, Vec<SectionBoundary>, RegistrationPlan) {
    let bars = allocate_bars(config.total_bars, &[0.20, 0.25, 0.20, 0.15, 0.20]);
    let sections = build_sections(
        &bars,
        &[
            SectionId::Free1,
            SectionId::QuasiFugal,
            SectionId::Free2,
            SectionId::Cadenza,
            SectionId::Coda,
        ],
    );
    let timeline = sectionalis_plan(config.key, &sections);
    let key = config.key;

    let mut notes = Vec::new();
    notes.extend(free_section(&timeline, key, num_voices, sections[0].start, sections[0].end, rng));
    notes.extend(quasi_fugal(key, num_voices, sections[1].start, sections[1].end, rng));
    notes.extend(free_section(&timeline, key, num_voices, sections[2].start, sections[2].end, rng));
    notes.extend(pedal_cadenza(key, sections[3].start, sections[3].end));
    notes.extend(free_section(&timeline, key, num_voices, sections[4].start, sections[4].end, rng));

    // Pedal support outside the cadenza: sustained tones, then an
    // energetic quarter-note coda.
    if num_voices >= 3 {
        let range = toccata_voice_range(2);
        for section in &sections[..3] {
            let mut tick = section.start;
            while tick < section.end {
                let event = timeline.get_at(tick);
                let dur = WHOLE_NOTE.min(section.end - tick);
                if dur == 0 {
                    break;
                }
                notes.push(note_on(
                    tick,
                    dur,
                    range.clamp(event.bass_pitch),
                    2,
                    NoteSource::PedalPoint,
                ));
                tick += dur;
            }
        }
        let coda = sections[4];
        let mut tick = coda.start;
        while tick < coda.end {
            let event = timeline.get_at(tick);
            let dur = QUARTER_NOTE.min(coda.end - tick);
            if dur == 0 {
                break;
            }
            notes.push(note_on(
                tick,
                dur,
                range.clamp(event.bass_pitch),
                2,
                NoteSource::PedalPoint,
            ));
            tick += dur;
        }
    }

    let mut registration = RegistrationPlan::default();
    registration.add_point(sections[0].start, StopLevel::Forte, "forte");
    registration.add_point(sections[1].start, StopLevel::Mezzo, "mezzo");
    registration.add_point(sections[2].start, StopLevel::Piano, "piano");
    registration.add_point(sections[3].start, StopLevel::Pleno, "pleno");
    registration.add_point(sections[4].start, StopLevel::Tutti, "tutti");

    (notes, timeline, sections, registration)
}

// ---------------------------------------------------------------------
// Shared driver
// ---------------------------------------------------------------------

/// Generate a toccata in the configured archetype.
///
/// # Errors
/// Returns [`GenerateError::InvalidConfig`] when `total_bars` is zero.
pub fn generate_toccata(config: &ToccataConfig) -> Result<ToccataOutput, GenerateError> {
    if config.total_bars == 0 {
        return Err(GenerateError::InvalidConfig("total_bars must be > 0".into()));
    }
    let num_voices = config.num_voices.clamp(2, 5);
    let mut rng = SeededRng::new(config.seed);
    let total = config.total_bars * TICKS_PER_BAR;

    let (all_notes, timeline, sections, registration) = match config.archetype {
        ToccataArchetype::Perpetuus => generate_perpetuus(config, num_voices, &mut rng),
        ToccataArchetype::Sectionalis => generate_sectionalis(config, num_voices, &mut rng),
    };
    if all_notes.is_empty() {
        return Err(GenerateError::EmptyResult("toccata sections".into()));
    }

    let mut tracks = toccata_tracks(num_voices);
    for note in all_notes {
        if usize::from(note.voice) < tracks.len() {
            tracks[usize::from(note.voice)].notes.push(note);
        }
    }
    dedup_single_voice(&mut tracks);

    let voice_ranges: Vec<PitchRange> = (0..num_voices).map(toccata_voice_range).collect();
    let ctx = StackContext {
        timeline: &timeline,
        key: config.key,
        ranges: voice_ranges.clone(),
        bass_voice: 2.min(num_voices - 1),
    };
    let mut report = Pipeline::standard().run(&mut tracks, &ctx);

    // Very light ornaments; the continuous textures should stay clean.
    let density = match config.archetype {
        ToccataArchetype::Perpetuus => 0.03,
        ToccataArchetype::Sectionalis => 0.08,
    };
    for voice in 0..num_voices.min(2) {
        let orn_ctx = OrnamentContext {
            config: OrnamentConfig { density, ..OrnamentConfig::default() },
            role: VoiceRole::Propel,
            bpm: config.bpm,
            range: toccata_voice_range(voice),
            timeline: Some(&timeline),
        };
        let idx = usize::from(voice);
        tracks[idx].notes = apply_ornaments(&tracks[idx].notes, &orn_ctx, &mut rng);
    }
    report.accumulate(&Pipeline::post_ornament().run(&mut tracks, &ctx));
    dedup_single_voice(&mut tracks);

    if config.enable_picardy && config.key.is_minor() && total > TICKS_PER_BAR {
        for (voice, track) in tracks.iter_mut().enumerate() {
            apply_picardy(
                &mut track.notes,
                config.key,
                total - TICKS_PER_BAR,
                toccata_voice_range(voice as u8),
            );
        }
    }

    for track in &mut tracks {
        track.sort();
    }
    let guard = ImpossibilityGuard::for_kind(InstrumentKind::Organ);
    report.repair_failures += guard.enforce(&mut tracks).unresolved;

    report.accumulate(&analyze_counterpoint(&tracks));

    Ok(ToccataOutput {
        tracks,
        timeline,
        total_duration_ticks: total,
        archetype: config.archetype,
        sections,
        registration,
        voice_ranges,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_allocation_sums_to_the_total() {
        for total in [5u32, 10, 24, 37] {
            let bars = allocate_bars(total, &[0.35, 0.40, 0.25]);
            assert_eq!(bars.iter().sum::<u32>(), total, "total {total}");
            assert!(bars.iter().all(|b| *b >= 1));
        }
    }

    #[test]
    fn perpetuus_sections_partition_the_piece() {
        let output = generate_toccata(&ToccataConfig::default()).expect("generates");
        assert_eq!(output.sections.len(), 3);
        assert_eq!(output.sections[0].start, 0);
        for pair in output.sections.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(output.sections[2].end, output.total_duration_ticks);
        assert_eq!(output.timeline.total_duration(), output.total_duration_ticks);
    }

    #[test]
    fn sectionalis_has_five_sections_and_a_cadenza() {
        let config = ToccataConfig {
            archetype: ToccataArchetype::Sectionalis,
            total_bars: 30,
            ..ToccataConfig::default()
        };
        let output = generate_toccata(&config).expect("generates");
        assert_eq!(output.sections.len(), 5);
        assert_eq!(output.sections[3].id, SectionId::Cadenza);

        // The cadenza belongs to the pedal alone.
        let cadenza = output.sections[3];
        for track in &output.tracks[..2] {
            assert!(
                !track
                    .notes
                    .iter()
                    .any(|n| n.start_tick >= cadenza.start && n.start_tick < cadenza.end),
                "manual voice plays during the cadenza"
            );
        }
        assert!(output.tracks[2]
            .notes
            .iter()
            .any(|n| n.start_tick >= cadenza.start && n.start_tick < cadenza.end));
    }

    #[test]
    fn voice_one_enters_at_forty_percent_of_the_ascent() {
        let config = ToccataConfig { total_bars: 20, ..ToccataConfig::default() };
        let output = generate_toccata(&config).expect("generates");
        let ascent = output.sections[0];
        let expected_entry = ascent.start + (ascent.end - ascent.start) * 40 / 100;
        let first_v1 = output.tracks[1]
            .notes
            .iter()
            .map(|n| n.start_tick)
            .min()
            .expect("voice 1 plays");
        assert!(first_v1 >= expected_entry, "{first_v1} < {expected_entry}");
    }

    #[test]
    fn registration_plans_differ_by_archetype() {
        let perp = generate_toccata(&ToccataConfig::default()).expect("generates");
        let sect = generate_toccata(&ToccataConfig {
            archetype: ToccataArchetype::Sectionalis,
            ..ToccataConfig::default()
        })
        .expect("generates");
        assert_eq!(perp.registration.points.first().map(|p| p.level), Some(StopLevel::Piano));
        assert_eq!(sect.registration.points.first().map(|p| p.level), Some(StopLevel::Forte));
    }

    #[test]
    fn zero_bars_is_rejected() {
        let config = ToccataConfig { total_bars: 0, ..ToccataConfig::default() };
        assert!(matches!(generate_toccata(&config), Err(GenerateError::InvalidConfig(_))));
    }

    #[test]
    fn determinism_holds() {
        let config = ToccataConfig {
            archetype: ToccataArchetype::Sectionalis,
            ..ToccataConfig::default()
        };
        let a = generate_toccata(&config).expect("generates");
        let b = generate_toccata(&config).expect("generates");
        for (ta, tb) in a.tracks.iter().zip(&b.tracks) {
            assert_eq!(ta.notes, tb.notes);
        }
    }
}
