//! forms/organum-forms/src/validate.rs
//! The ordered repair pipeline.
//!
//! Passes run in a fixed, named order and are idempotent: rerunning a
//! pass on its own output changes nothing. Every pitch-changing pass
//! gates on the note's protection level and records its touch in the
//! `repairs` bitset. Tracks are indexed by voice: track `i` carries
//! voice `i`.

use organum_harmony::HarmonicTimeline;
use organum_score::{
    sort_tracks, CounterpointReport, NoteEvent, Protection, Repairs, Track,
};
use organum_theory::{interval, KeySignature, Mode, Pitch, PitchRange};
use organum_time::{position_in_bar, Tick, TICKS_PER_BAR};

/// One repair pass in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Classify and repair non-harmonic tones.
    NonHarmonicTone,
    /// Break consecutive parallel perfect intervals.
    ParallelPerfect {
        /// Upper bound on repeated scans.
        max_iterations: u8,
    },
    /// Resolve melodic leaps wider than 13 semitones.
    LeapResolution,
    /// Keep every adjacent voice pair at least an octave apart.
    VoiceSeparation {
        /// Minimum separation in semitones.
        min_semitones: u8,
    },
    /// Snap chromatic pitches onto the scale (major mode only).
    DiatonicSnap,
    /// Force consonance on bar-strong beats.
    StrongBeatConsonance,
    /// Break immediate pitch repetitions.
    RepeatedPitch,
}

/// Context shared by every pass.
pub struct StackContext<'a> {
    /// Governing harmonic timeline.
    pub timeline: &'a HarmonicTimeline,
    /// Governing key.
    pub key: KeySignature,
    /// Per-voice pitch ranges, indexed like the tracks.
    pub ranges: Vec<PitchRange>,
    /// Voice index carrying the bass line.
    pub bass_voice: u8,
}

impl StackContext<'_> {
    fn range(&self, voice: u8) -> PitchRange {
        self.ranges
            .get(usize::from(voice))
            .copied()
            .unwrap_or_else(|| PitchRange::new(0, 127))
    }
}

/// A named ordered pipeline of passes.
#[derive(Debug, Clone)]
pub struct Pipeline {
    passes: Vec<Pass>,
}

impl Pipeline {
    /// The full stack run after raw generation.
    ///
    /// Voice separation sits last: every earlier pass preserves pitch
    /// classes or stays range-checked, but only octave placement keeps
    /// the spacing guarantee, so it must be the final pitch modifier.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            passes: vec![
                Pass::NonHarmonicTone,
                Pass::ParallelPerfect { max_iterations: 3 },
                Pass::LeapResolution,
                Pass::DiatonicSnap,
                Pass::StrongBeatConsonance,
                Pass::RepeatedPitch,
                Pass::VoiceSeparation { min_semitones: 12 },
            ],
        }
    }

    /// The reduced stack rerun after ornament expansion. Separation
    /// closes this one too, so its spacing survives the reruns.
    #[must_use]
    pub fn post_ornament() -> Self {
        Self {
            passes: vec![
                Pass::ParallelPerfect { max_iterations: 3 },
                Pass::LeapResolution,
                Pass::StrongBeatConsonance,
                Pass::VoiceSeparation { min_semitones: 12 },
            ],
        }
    }

    /// The configured pass order.
    #[must_use]
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    /// Run every pass in order; returns repair-failure counts.
    pub fn run(&self, tracks: &mut [Track], ctx: &StackContext<'_>) -> CounterpointReport {
        let mut report = CounterpointReport::default();
        for pass in &self.passes {
            match *pass {
                Pass::NonHarmonicTone => repair_non_harmonic_tones(tracks, ctx),
                Pass::ParallelPerfect { max_iterations } => {
                    repair_parallel_perfect(tracks, ctx, max_iterations);
                }
                Pass::LeapResolution => resolve_leaps(tracks, ctx),
                Pass::VoiceSeparation { min_semitones } => {
                    separate_voices(tracks, ctx, min_semitones);
                }
                Pass::DiatonicSnap => snap_diatonic(tracks, ctx),
                Pass::StrongBeatConsonance => {
                    report.repair_failures += enforce_strong_beat_consonance(tracks, ctx);
                }
                Pass::RepeatedPitch => avoid_repeated_pitches(tracks, ctx),
            }
        }
        sort_tracks(tracks);
        report
    }
}

fn can_rewrite(note: &NoteEvent) -> bool {
    note.protection() == Protection::Flexible
}

fn can_octave(note: &NoteEvent) -> bool {
    note.protection() != Protection::Immutable
}

/// The note sounding at `tick` in a track, if any.
fn sounding_at(track: &Track, tick: Tick) -> Option<&NoteEvent> {
    track.notes.iter().find(|n| n.sounds_at(tick))
}

// ---------------------------------------------------------------------
// Non-harmonic-tone repair
// ---------------------------------------------------------------------

/// Classification of a weak-beat non-chord tone by its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonHarmonicKind {
    /// Stepwise motion through, same direction.
    Passing,
    /// Step away and back.
    Neighbor,
    /// Sounds the next pitch early.
    Anticipation,
    /// Step in, leap out the other way.
    Escape,
}

/// Classify a weak-beat non-chord tone, or `None` if it fits no figure.
#[must_use]
pub fn classify_non_harmonic(prev: Pitch, curr: Pitch, next: Pitch) -> Option<NonHarmonicKind> {
    let approach = curr.interval_from(prev);
    let departure = next.interval_from(curr);

    if curr == next {
        return Some(NonHarmonicKind::Anticipation);
    }
    if approach.abs() <= 2 && approach != 0 && next == prev {
        return Some(NonHarmonicKind::Neighbor);
    }
    if approach.abs() <= 2
        && approach != 0
        && departure.abs() <= 2
        && departure != 0
        && approach.signum() == departure.signum()
    {
        return Some(NonHarmonicKind::Passing);
    }
    if approach.abs() <= 2
        && approach != 0
        && departure.abs() > 2
        && approach.signum() != departure.signum()
    {
        return Some(NonHarmonicKind::Escape);
    }
    None
}

fn harsh_against_bass(tracks: &[Track], ctx: &StackContext<'_>, pitch: Pitch, tick: Tick) -> bool {
    let Some(bass_track) = tracks.get(usize::from(ctx.bass_voice)) else {
        return false;
    };
    let Some(bass) = sounding_at(bass_track, tick) else {
        return false;
    };
    interval::is_harsh_against_bass(interval::simple(pitch.interval_from(bass.pitch)))
}

fn repair_non_harmonic_tones(tracks: &mut [Track], ctx: &StackContext<'_>) {
    for voice in 0..tracks.len() as u8 {
        if voice == ctx.bass_voice {
            continue;
        }
        let range = ctx.range(voice);
        for idx in 0..tracks[usize::from(voice)].notes.len() {
            let note = tracks[usize::from(voice)].notes[idx];
            if !can_rewrite(&note) {
                continue;
            }
            let event = ctx.timeline.get_at(note.start_tick);
            if event.chord.contains(note.pitch) {
                continue;
            }

            let must_snap = if position_in_bar(note.start_tick) == 0 {
                harsh_against_bass(tracks, ctx, note.pitch, note.start_tick)
            } else {
                let prev = idx
                    .checked_sub(1)
                    .map_or(note.pitch, |i| tracks[usize::from(voice)].notes[i].pitch);
                let next = tracks[usize::from(voice)]
                    .notes
                    .get(idx + 1)
                    .map_or(note.pitch, |n| n.pitch);
                classify_non_harmonic(prev, note.pitch, next).is_none()
                    && harsh_against_bass(tracks, ctx, note.pitch, note.start_tick)
            };

            if must_snap {
                if let Some(tone) = event.chord.nearest_tone(note.pitch, range.low, range.high) {
                    let target = &mut tracks[usize::from(voice)].notes[idx];
                    target.pitch = tone;
                    target.repairs |= Repairs::CHORD_SNAP;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------
// Parallel-perfect repair
// ---------------------------------------------------------------------

fn repair_parallel_perfect(tracks: &mut [Track], ctx: &StackContext<'_>, max_iterations: u8) {
    for _ in 0..max_iterations {
        let mut changed = false;
        for upper in 0..tracks.len() as u8 {
            for lower in (upper + 1)..tracks.len() as u8 {
                changed |= repair_parallel_pair(tracks, ctx, upper, lower);
            }
        }
        if !changed {
            break;
        }
    }
}

fn repair_parallel_pair(
    tracks: &mut [Track],
    ctx: &StackContext<'_>,
    upper: u8,
    lower: u8,
) -> bool {
    let mut changed = false;
    let upper_len = tracks[usize::from(upper)].notes.len();

    for idx in 1..upper_len {
        let curr = tracks[usize::from(upper)].notes[idx];
        let prev = tracks[usize::from(upper)].notes[idx - 1];
        let Some(lower_curr) =
            sounding_at(&tracks[usize::from(lower)], curr.start_tick).copied()
        else {
            continue;
        };
        let Some(lower_prev) =
            sounding_at(&tracks[usize::from(lower)], prev.start_tick).copied()
        else {
            continue;
        };

        let ivl_prev = interval::simple(prev.pitch.interval_from(lower_prev.pitch));
        let ivl_curr = interval::simple(curr.pitch.interval_from(lower_curr.pitch));
        if !interval::is_perfect(ivl_prev) || ivl_prev != ivl_curr {
            continue;
        }
        let upper_motion = curr.pitch.interval_from(prev.pitch).signum();
        let lower_motion = lower_curr.pitch.interval_from(lower_prev.pitch).signum();
        if upper_motion == 0 || upper_motion != lower_motion {
            continue;
        }

        if fix_parallel_note(tracks, ctx, upper, idx, lower_curr.pitch) {
            changed = true;
        }
    }
    changed
}

/// Try to fix the second note of a parallel pair: a one-degree scale
/// shift first, then an octave displacement, else leave it.
fn fix_parallel_note(
    tracks: &mut [Track],
    ctx: &StackContext<'_>,
    voice: u8,
    idx: usize,
    against: Pitch,
) -> bool {
    let note = tracks[usize::from(voice)].notes[idx];
    let range = ctx.range(voice);
    let scale = ctx.key.scale();

    if can_rewrite(&note) {
        let deg = scale.pitch_to_degree(note.pitch, ctx.key.tonic);
        for shift in [-1, 1] {
            let candidate = scale.degree_to_pitch(deg + shift, ctx.key.tonic);
            let simple = interval::simple(candidate.interval_from(against));
            if !interval::is_perfect(simple)
                && range.contains(candidate)
                && candidate > against
            {
                let target = &mut tracks[usize::from(voice)].notes[idx];
                target.pitch = candidate;
                target.repairs |= Repairs::PARALLEL_FIX;
                return true;
            }
        }
    }

    if can_octave(&note) {
        for shift in [12, -12] {
            let candidate = note.pitch.transpose(shift);
            let simple = interval::simple(candidate.interval_from(against));
            if candidate != note.pitch
                && !interval::is_perfect(simple)
                && range.contains(candidate)
                && candidate > against
            {
                let target = &mut tracks[usize::from(voice)].notes[idx];
                target.pitch = candidate;
                target.repairs |= Repairs::PARALLEL_FIX | Repairs::OCTAVE_ADJUST;
                return true;
            }
        }
    }

    // No candidate preserves range without crossing: revert (leave as-is).
    false
}

// ---------------------------------------------------------------------
// Leap resolution
// ---------------------------------------------------------------------

const LEAP_THRESHOLD: i32 = 13;
const CROSSING_PENALTY: f64 = 900.0;
const NEXT_WEIGHT: f64 = 0.75;

fn resolve_leaps(tracks: &mut [Track], ctx: &StackContext<'_>) {
    for voice in 0..tracks.len() as u8 {
        let range = ctx.range(voice);
        let len = tracks[usize::from(voice)].notes.len();
        for idx in 1..len {
            let curr = tracks[usize::from(voice)].notes[idx];
            if !can_octave(&curr) {
                continue;
            }
            let prev = tracks[usize::from(voice)].notes[idx - 1];
            let leap = curr.pitch.interval_from(prev.pitch);
            if leap.abs() <= LEAP_THRESHOLD {
                continue;
            }
            let next = tracks[usize::from(voice)]
                .notes
                .get(idx + 1)
                .map_or(curr.pitch, |n| n.pitch);

            // Three octave-displacement candidates.
            let shift1 = interval::nearest_octave_shift(leap);
            let shift2 = if shift1 > 0 { shift1 - 12 } else { shift1 + 12 };
            let dir = leap.signum();
            let candidates = [
                range.clamp(curr.pitch.transpose(-shift1)),
                range.clamp(curr.pitch.transpose(-shift2)),
                range.clamp(prev.pitch.transpose(dir * 12)),
            ];

            let mut best_score = CROSSING_PENALTY;
            let mut best_pitch = curr.pitch;
            for candidate in candidates {
                let new_leap = candidate.interval_from(prev.pitch);
                if new_leap.abs() > LEAP_THRESHOLD {
                    continue;
                }
                let score = if would_cross(tracks, voice, &curr, candidate) {
                    CROSSING_PENALTY
                } else {
                    f64::from(new_leap.abs())
                        + NEXT_WEIGHT * f64::from(candidate.interval_from(next).abs())
                };
                if score < best_score {
                    best_score = score;
                    best_pitch = candidate;
                }
            }

            if best_score < CROSSING_PENALTY && best_pitch != curr.pitch {
                let target = &mut tracks[usize::from(voice)].notes[idx];
                target.pitch = best_pitch;
                target.repairs |= Repairs::LEAP_RESOLUTION;
            }
        }
    }
}

/// Whether placing `candidate` for `note` would cross another voice
/// sounding at overlapping ticks. Smaller voice index sits higher.
fn would_cross(tracks: &[Track], voice: u8, note: &NoteEvent, candidate: Pitch) -> bool {
    for (other_voice, track) in tracks.iter().enumerate() {
        let other_voice = other_voice as u8;
        if other_voice == voice {
            continue;
        }
        for other in &track.notes {
            if !other.overlaps(note) {
                continue;
            }
            if voice < other_voice && candidate < other.pitch {
                return true;
            }
            if voice > other_voice && candidate > other.pitch {
                return true;
            }
        }
    }
    false
}

// ---------------------------------------------------------------------
// Voice separation
// ---------------------------------------------------------------------

/// Spread every adjacent voice pair to at least `min_semitones`.
///
/// Pairs are swept bottom-up so a raised voice lands before the pair
/// above it is examined, and each note moves at most once (the
/// separation repair bit records the move). A violation survives only
/// when both endpoints are blocked: already moved, Immutable, or with
/// no in-range octave left.
fn separate_voices(tracks: &mut [Track], ctx: &StackContext<'_>, min_semitones: u8) {
    let voices = tracks.len();
    if voices < 2 {
        return;
    }
    // Moves can cascade one pair per round; once-per-note keeps the
    // sweep finite well inside this bound.
    for _ in 0..voices + 2 {
        let mut changed = false;
        for lower in (1..voices).rev() {
            changed |= separate_pair(tracks, ctx, lower as u8 - 1, lower as u8, min_semitones);
        }
        if !changed {
            break;
        }
    }
}

fn separate_pair(
    tracks: &mut [Track],
    ctx: &StackContext<'_>,
    upper: u8,
    lower: u8,
    min_semitones: u8,
) -> bool {
    let upper_range = ctx.range(upper);
    let lower_range = ctx.range(lower);
    let mut changed = false;

    for idx in 0..tracks[usize::from(upper)].notes.len() {
        for jdx in 0..tracks[usize::from(lower)].notes.len() {
            let up_note = tracks[usize::from(upper)].notes[idx];
            let low_note = tracks[usize::from(lower)].notes[jdx];
            if !up_note.overlaps(&low_note) {
                continue;
            }
            if up_note.pitch.interval_from(low_note.pitch) >= i32::from(min_semitones) {
                continue;
            }

            let raised = up_note.pitch.transpose(12);
            if !up_note.repairs.contains(Repairs::SEPARATION)
                && can_octave(&up_note)
                && upper_range.contains(raised)
            {
                let target = &mut tracks[usize::from(upper)].notes[idx];
                target.pitch = raised;
                target.repairs |= Repairs::SEPARATION | Repairs::OCTAVE_ADJUST;
                changed = true;
                continue;
            }
            // Upper blocked: pull the lower voice down instead.
            let lowered = low_note.pitch.transpose(-12);
            if !low_note.repairs.contains(Repairs::SEPARATION)
                && can_octave(&low_note)
                && lower_range.contains(lowered)
            {
                let target = &mut tracks[usize::from(lower)].notes[jdx];
                target.pitch = lowered;
                target.repairs |= Repairs::SEPARATION | Repairs::OCTAVE_ADJUST;
                changed = true;
            }
        }
    }
    changed
}

// ---------------------------------------------------------------------
// Diatonic enforcement (major mode only)
// ---------------------------------------------------------------------

fn snap_diatonic(tracks: &mut [Track], ctx: &StackContext<'_>) {
    if ctx.key.mode == Mode::Minor {
        // The raised leading tone and harmonic-minor sixth are legal.
        return;
    }
    let scale = ctx.key.scale();
    for voice in 0..tracks.len() as u8 {
        let range = ctx.range(voice);
        for note in &mut tracks[usize::from(voice)].notes {
            if !can_rewrite(note) {
                continue;
            }
            if !scale.contains(note.pitch, ctx.key.tonic) {
                note.pitch = range.clamp(scale.nearest_tone(note.pitch, ctx.key.tonic));
                note.repairs |= Repairs::DIATONIC_SNAP;
            }
        }
    }
}

// ---------------------------------------------------------------------
// Strong-beat consonance
// ---------------------------------------------------------------------

fn pair_is_dissonant(upper_pitch: Pitch, lower_pitch: Pitch, lower_is_bass: bool) -> bool {
    let simple = interval::simple(upper_pitch.interval_from(lower_pitch));
    if interval::is_consonant(simple) {
        return false;
    }
    // The perfect fourth is a dissonance only over the bass.
    if simple == interval::PERFECT_FOURTH && !lower_is_bass {
        return false;
    }
    true
}

fn enforce_strong_beat_consonance(tracks: &mut [Track], ctx: &StackContext<'_>) -> u32 {
    let max_end = tracks
        .iter()
        .flat_map(|t| t.notes.iter().map(|n| n.end_tick()))
        .max()
        .unwrap_or(0);

    let mut failures = 0;
    let mut tick = 0;
    while tick < max_end {
        // One sounding note index per voice at this strong beat.
        let sounding: Vec<Option<usize>> = tracks
            .iter()
            .map(|t| t.notes.iter().position(|n| n.sounds_at(tick)))
            .collect();

        for i in 0..tracks.len() {
            for j in (i + 1)..tracks.len() {
                let (Some(idx_i), Some(idx_j)) = (sounding[i], sounding[j]) else {
                    continue;
                };
                let upper_pitch = tracks[i].notes[idx_i].pitch;
                let lower_pitch = tracks[j].notes[idx_j].pitch;
                let lower_is_bass = j as u8 == ctx.bass_voice;
                if !pair_is_dissonant(upper_pitch, lower_pitch, lower_is_bass) {
                    continue;
                }
                if !fix_consonance(tracks, ctx, i, idx_i, lower_pitch, lower_is_bass, tick) {
                    log::warn!(
                        "strong-beat dissonance left at tick {tick} between voices {i} and {j}"
                    );
                    failures += 1;
                }
            }
        }
        tick += TICKS_PER_BAR / 2;
    }
    failures
}

/// The four-stage consonance fix ladder on the higher voice.
#[allow(clippy::too_many_arguments)]
fn fix_consonance(
    tracks: &mut [Track],
    ctx: &StackContext<'_>,
    voice: usize,
    idx: usize,
    against: Pitch,
    against_is_bass: bool,
    tick: Tick,
) -> bool {
    let note = tracks[voice].notes[idx];
    let range = ctx.range(voice as u8);
    let scale = ctx.key.scale();
    let event = ctx.timeline.get_at(tick);

    let consonant_with = |p: Pitch| !pair_is_dissonant(p, against, against_is_bass);

    // 1. Nearest chord tone within three semitones.
    if can_rewrite(&note) {
        if let Some(tone) = event.chord.nearest_tone(note.pitch, range.low, range.high) {
            if tone.distance_to(note.pitch) <= 3 && consonant_with(tone) {
                let target = &mut tracks[voice].notes[idx];
                target.pitch = tone;
                target.repairs |= Repairs::CONSONANCE_FIX | Repairs::CHORD_SNAP;
                return true;
            }
        }

        let deg = scale.pitch_to_degree(note.pitch, ctx.key.tonic);
        // 2. Scale-step shifts that are consonant chord tones.
        for shift in [1, -1, 2, -2, 3, -3] {
            let candidate = scale.degree_to_pitch(deg + shift, ctx.key.tonic);
            if range.contains(candidate) && consonant_with(candidate) && event.chord.contains(candidate)
            {
                let target = &mut tracks[voice].notes[idx];
                target.pitch = candidate;
                target.repairs |= Repairs::CONSONANCE_FIX;
                return true;
            }
        }
        // 3. Scale-step shifts that are merely consonant.
        for shift in [1, -1, 2, -2, 3, -3] {
            let candidate = scale.degree_to_pitch(deg + shift, ctx.key.tonic);
            if range.contains(candidate) && consonant_with(candidate) {
                let target = &mut tracks[voice].notes[idx];
                target.pitch = candidate;
                target.repairs |= Repairs::CONSONANCE_FIX;
                return true;
            }
        }
    }

    // 4. Octave displacement.
    if can_octave(&note) {
        for shift in [12, -12] {
            let candidate = note.pitch.transpose(shift);
            if candidate != note.pitch && range.contains(candidate) && consonant_with(candidate) {
                let target = &mut tracks[voice].notes[idx];
                target.pitch = candidate;
                target.repairs |= Repairs::CONSONANCE_FIX | Repairs::OCTAVE_ADJUST;
                return true;
            }
        }
    }

    false
}

// ---------------------------------------------------------------------
// Repeated-pitch avoidance
// ---------------------------------------------------------------------

fn avoid_repeated_pitches(tracks: &mut [Track], ctx: &StackContext<'_>) {
    let scale = ctx.key.scale();
    for voice in 0..tracks.len() as u8 {
        let range = ctx.range(voice);
        let center = range.center();
        for idx in 1..tracks[usize::from(voice)].notes.len() {
            let prev_pitch = tracks[usize::from(voice)].notes[idx - 1].pitch;
            let note = tracks[usize::from(voice)].notes[idx];
            if note.pitch != prev_pitch || !can_rewrite(&note) {
                continue;
            }

            let deg = scale.pitch_to_degree(note.pitch, ctx.key.tonic);
            let dir: i32 = if note.pitch < center { 1 } else { -1 };

            let mut fixed = false;
            for shift in [dir, -dir, 2 * dir, -2 * dir] {
                let candidate = range.clamp(scale.degree_to_pitch(deg + shift, ctx.key.tonic));
                if candidate != prev_pitch {
                    let target = &mut tracks[usize::from(voice)].notes[idx];
                    target.pitch = candidate;
                    target.repairs |= Repairs::REPEATED_PITCH;
                    fixed = true;
                    break;
                }
            }
            if !fixed {
                // Range boundary: push three degrees toward the centre.
                let candidate = range.clamp(scale.degree_to_pitch(deg + 3 * dir, ctx.key.tonic));
                let target = &mut tracks[usize::from(voice)].notes[idx];
                target.pitch = candidate;
                target.repairs |= Repairs::REPEATED_PITCH;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use organum_harmony::Resolution;
    use organum_score::NoteSource;
    use organum_theory::PitchClass;

    fn mk(start: Tick, dur: Tick, pitch: u8, voice: u8) -> NoteEvent {
        NoteEvent::new(start, dur, Pitch::new(pitch), 80, voice, NoteSource::FreeCounterpoint)
    }

    fn mk_tracks(per_voice: Vec<Vec<NoteEvent>>) -> Vec<Track> {
        per_voice
            .into_iter()
            .enumerate()
            .map(|(idx, notes)| {
                let mut t = Track::new(idx as u8, 19, format!("v{idx}"));
                t.notes = notes;
                t
            })
            .collect()
    }

    fn ctx<'a>(timeline: &'a HarmonicTimeline, key: KeySignature, voices: usize) -> StackContext<'a> {
        StackContext {
            timeline,
            key,
            ranges: (0..voices).map(|_| PitchRange::new(24, 96)).collect(),
            bass_voice: voices.saturating_sub(1) as u8,
        }
    }

    fn c_major() -> KeySignature {
        KeySignature::major(PitchClass::new(0))
    }

    #[test]
    fn classification_covers_the_figures() {
        let p = Pitch::new;
        assert_eq!(
            classify_non_harmonic(p(60), p(62), p(64)),
            Some(NonHarmonicKind::Passing)
        );
        assert_eq!(
            classify_non_harmonic(p(60), p(62), p(60)),
            Some(NonHarmonicKind::Neighbor)
        );
        assert_eq!(
            classify_non_harmonic(p(60), p(62), p(62)),
            Some(NonHarmonicKind::Anticipation)
        );
        assert_eq!(
            classify_non_harmonic(p(60), p(62), p(57)),
            Some(NonHarmonicKind::Escape)
        );
        assert_eq!(classify_non_harmonic(p(60), p(66), p(72)), None);
    }

    #[test]
    fn downbeat_harsh_dissonance_is_snapped() {
        let key = c_major();
        let timeline = HarmonicTimeline::standard(key, TICKS_PER_BAR, Resolution::Bar);
        // Bass C3; upper voice D4 on the downbeat: a major ninth, harsh.
        let mut tracks = mk_tracks(vec![
            vec![mk(0, 480, 62, 0)],
            vec![mk(0, 1920, 48, 1)],
        ]);
        let context = ctx(&timeline, key, 2);
        Pipeline { passes: vec![Pass::NonHarmonicTone] }.run(&mut tracks, &context);
        let fixed = tracks[0].notes[0];
        assert!(timeline.get_at(0).chord.contains(fixed.pitch));
        assert!(fixed.repairs.contains(Repairs::CHORD_SNAP));
    }

    #[test]
    fn weak_beat_passing_tones_survive() {
        let key = c_major();
        let timeline = HarmonicTimeline::standard(key, TICKS_PER_BAR, Resolution::Bar);
        // C E on chord tones with a passing D between, off the downbeat.
        let mut tracks = mk_tracks(vec![
            vec![mk(480, 240, 60, 0), mk(720, 240, 62, 0), mk(960, 240, 64, 0)],
            vec![mk(0, 1920, 36, 1)],
        ]);
        let context = ctx(&timeline, key, 2);
        Pipeline { passes: vec![Pass::NonHarmonicTone] }.run(&mut tracks, &context);
        assert_eq!(tracks[0].notes[1].pitch.midi(), 62);
    }

    #[test]
    fn parallel_fifths_are_broken() {
        let key = c_major();
        let timeline = HarmonicTimeline::standard(key, TICKS_PER_BAR, Resolution::Bar);
        // Two consecutive perfect fifths moving the same way.
        let mut tracks = mk_tracks(vec![
            vec![mk(0, 480, 67, 0), mk(480, 480, 69, 0)],
            vec![mk(0, 480, 60, 1), mk(480, 480, 62, 1)],
        ]);
        let context = ctx(&timeline, key, 2);
        Pipeline { passes: vec![Pass::ParallelPerfect { max_iterations: 3 }] }
            .run(&mut tracks, &context);
        let second = interval::simple(
            tracks[0].notes[1].pitch.interval_from(tracks[1].notes[1].pitch),
        );
        assert!(!interval::is_perfect(second), "interval {second} still perfect");
    }

    #[test]
    fn parallel_repair_is_idempotent() {
        let key = c_major();
        let timeline = HarmonicTimeline::standard(key, TICKS_PER_BAR, Resolution::Bar);
        let mut tracks = mk_tracks(vec![
            vec![mk(0, 480, 67, 0), mk(480, 480, 69, 0)],
            vec![mk(0, 480, 60, 1), mk(480, 480, 62, 1)],
        ]);
        let context = ctx(&timeline, key, 2);
        let pipeline = Pipeline { passes: vec![Pass::ParallelPerfect { max_iterations: 3 }] };
        pipeline.run(&mut tracks, &context);
        let snapshot = tracks.clone();
        pipeline.run(&mut tracks, &context);
        assert_eq!(snapshot, tracks);
    }

    #[test]
    fn wide_leaps_are_folded_in() {
        let key = c_major();
        let timeline = HarmonicTimeline::standard(key, TICKS_PER_BAR, Resolution::Bar);
        let mut tracks = mk_tracks(vec![vec![
            mk(0, 480, 60, 0),
            mk(480, 480, 79, 0),
            mk(960, 480, 64, 0),
        ]]);
        let context = ctx(&timeline, key, 1);
        Pipeline { passes: vec![Pass::LeapResolution] }.run(&mut tracks, &context);
        let leap = tracks[0].notes[1].pitch.interval_from(tracks[0].notes[0].pitch);
        assert!(leap.abs() <= 13, "leap {leap}");
        assert!(tracks[0].notes[1].repairs.contains(Repairs::LEAP_RESOLUTION));
    }

    #[test]
    fn voice_separation_opens_the_gap() {
        let key = c_major();
        let timeline = HarmonicTimeline::standard(key, TICKS_PER_BAR, Resolution::Bar);
        let mut tracks = mk_tracks(vec![
            vec![mk(0, 960, 64, 0)],
            vec![mk(0, 960, 60, 1)],
        ]);
        let mut context = ctx(&timeline, key, 2);
        context.ranges = vec![PitchRange::new(48, 96), PitchRange::new(36, 84)];
        Pipeline { passes: vec![Pass::VoiceSeparation { min_semitones: 12 }] }
            .run(&mut tracks, &context);
        let gap = tracks[0].notes[0].pitch.interval_from(tracks[1].notes[0].pitch);
        assert!(gap >= 12, "gap {gap}");
        assert!(tracks[0].notes[0].repairs.contains(Repairs::SEPARATION));
    }

    #[test]
    fn voice_separation_covers_every_adjacent_pair() {
        let key = c_major();
        let timeline = HarmonicTimeline::standard(key, TICKS_PER_BAR, Resolution::Bar);
        // Three voices stacked a third apart: both pairs violate.
        let mut tracks = mk_tracks(vec![
            vec![mk(0, 960, 67, 0)],
            vec![mk(0, 960, 64, 1)],
            vec![mk(0, 960, 60, 2)],
        ]);
        let context = ctx(&timeline, key, 3);
        Pipeline { passes: vec![Pass::VoiceSeparation { min_semitones: 12 }] }
            .run(&mut tracks, &context);
        let top = tracks[0].notes[0].pitch;
        let mid = tracks[1].notes[0].pitch;
        let low = tracks[2].notes[0].pitch;
        assert!(top.interval_from(mid) >= 12, "top gap {}", top.interval_from(mid));
        assert!(mid.interval_from(low) >= 12, "mid gap {}", mid.interval_from(low));
    }

    #[test]
    fn voice_separation_moves_each_note_at_most_once() {
        let key = c_major();
        let timeline = HarmonicTimeline::standard(key, TICKS_PER_BAR, Resolution::Bar);
        // The middle voice is squeezed inside a 13-semitone range: no
        // placement satisfies both neighbours, so after one move apiece
        // the pass must settle instead of oscillating.
        let mut tracks = mk_tracks(vec![
            vec![mk(0, 960, 60, 0)],
            vec![mk(0, 960, 55, 1)],
            vec![mk(0, 960, 49, 2)],
        ]);
        let mut context = ctx(&timeline, key, 3);
        context.ranges = vec![
            PitchRange::new(55, 62),
            PitchRange::new(47, 59),
            PitchRange::new(36, 50),
        ];
        let pipeline = Pipeline { passes: vec![Pass::VoiceSeparation { min_semitones: 12 }] };
        pipeline.run(&mut tracks, &context);
        let snapshot = tracks.clone();
        // Idempotent: every surviving violation is certifiably blocked.
        pipeline.run(&mut tracks, &context);
        assert_eq!(snapshot, tracks);
        for track in &tracks {
            let note = track.notes[0];
            assert!(context.range(note.voice).contains(note.pitch));
        }
    }

    #[test]
    fn diatonic_snap_skips_minor_mode() {
        let timeline =
            HarmonicTimeline::standard(KeySignature::minor(PitchClass::new(9)), TICKS_PER_BAR, Resolution::Bar);
        let key = KeySignature::minor(PitchClass::new(9));
        // G# is the raised leading tone of A minor: legal, untouched.
        let mut tracks = mk_tracks(vec![vec![mk(0, 480, 68, 0)]]);
        let context = ctx(&timeline, key, 1);
        Pipeline { passes: vec![Pass::DiatonicSnap] }.run(&mut tracks, &context);
        assert_eq!(tracks[0].notes[0].pitch.midi(), 68);
    }

    #[test]
    fn diatonic_snap_fixes_major_chromatics() {
        let key = c_major();
        let timeline = HarmonicTimeline::standard(key, TICKS_PER_BAR, Resolution::Bar);
        let mut tracks = mk_tracks(vec![vec![mk(0, 480, 61, 0)]]);
        let context = ctx(&timeline, key, 1);
        Pipeline { passes: vec![Pass::DiatonicSnap] }.run(&mut tracks, &context);
        let fixed = tracks[0].notes[0];
        assert!(key.scale().contains(fixed.pitch, key.tonic));
        assert!(fixed.repairs.contains(Repairs::DIATONIC_SNAP));
    }

    #[test]
    fn strong_beat_dissonance_is_resolved() {
        let key = c_major();
        let timeline = HarmonicTimeline::standard(key, TICKS_PER_BAR, Resolution::Bar);
        // B over C bass on the downbeat: a major seventh.
        let mut tracks = mk_tracks(vec![
            vec![mk(0, 960, 71, 0)],
            vec![mk(0, 960, 48, 1)],
        ]);
        let context = ctx(&timeline, key, 2);
        let report =
            Pipeline { passes: vec![Pass::StrongBeatConsonance] }.run(&mut tracks, &context);
        let simple = interval::simple(
            tracks[0].notes[0].pitch.interval_from(tracks[1].notes[0].pitch),
        );
        assert!(interval::is_consonant(simple), "still {simple}");
        assert_eq!(report.repair_failures, 0);
    }

    #[test]
    fn repeated_pitches_are_displaced() {
        let key = c_major();
        let timeline = HarmonicTimeline::standard(key, TICKS_PER_BAR, Resolution::Bar);
        let mut tracks = mk_tracks(vec![vec![mk(0, 480, 60, 0), mk(480, 480, 60, 0)]]);
        let context = ctx(&timeline, key, 1);
        Pipeline { passes: vec![Pass::RepeatedPitch] }.run(&mut tracks, &context);
        assert_ne!(tracks[0].notes[0].pitch, tracks[0].notes[1].pitch);
        assert!(tracks[0].notes[1].repairs.contains(Repairs::REPEATED_PITCH));
    }

    #[test]
    fn immutable_notes_pass_through_every_pass() {
        let key = c_major();
        let timeline = HarmonicTimeline::standard(key, 2 * TICKS_PER_BAR, Resolution::Bar);
        let cantus = NoteEvent::new(0, 960, Pitch::new(62), 80, 0, NoteSource::CantusFixed);
        let mut tracks = mk_tracks(vec![
            vec![cantus, NoteEvent::new(960, 960, Pitch::new(62), 80, 0, NoteSource::CantusFixed)],
            vec![mk(0, 1920, 48, 1)],
        ]);
        let context = ctx(&timeline, key, 2);
        Pipeline::standard().run(&mut tracks, &context);
        assert_eq!(tracks[0].notes[0].pitch.midi(), 62);
        assert_eq!(tracks[0].notes[1].pitch.midi(), 62);
        assert!(tracks[0].notes[0].repairs.is_empty());
    }

    #[test]
    fn standard_pipeline_order_is_fixed() {
        let passes = Pipeline::standard();
        assert_eq!(
            passes.passes()[0..3],
            [
                Pass::NonHarmonicTone,
                Pass::ParallelPerfect { max_iterations: 3 },
                Pass::LeapResolution,
            ]
        );
        // Separation is the final pitch modifier in both pipelines.
        assert_eq!(
            *passes.passes().last().expect("non-empty"),
            Pass::VoiceSeparation { min_semitones: 12 }
        );
        assert_eq!(
            *Pipeline::post_ornament().passes().last().expect("non-empty"),
            Pass::VoiceSeparation { min_semitones: 12 }
        );
    }
}
