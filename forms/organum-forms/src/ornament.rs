//! forms/organum-forms/src/ornament.rs
//! Ornament selection and expansion.
//!
//! Eligible notes (long enough, not in the Ground role) may be replaced
//! by a micro-sequence that fills exactly the host's duration: the host
//! start never moves, velocity and voice carry over, and every emitted
//! note wears the ornament repair bit. Trill speed follows the tempo.

use organum_harmony::HarmonicTimeline;
use organum_rand::SeededRng;
use organum_score::{NoteEvent, Repairs};
use organum_theory::{Pitch, PitchRange};
use organum_time::{
    duration::{EIGHTH_NOTE, QUARTER_NOTE},
    is_strong_beat, tempo::trill_alternations, Tick,
};
use smallvec::SmallVec;

use crate::roles::VoiceRole;

/// The ornament vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrnamentType {
    /// Main–upper alternation.
    Trill,
    /// Main, lower, main.
    Mordent,
    /// Short upper-note trill.
    Pralltriller,
    /// Upper, main, lower, main.
    Turn,
    /// Grace note on the beat.
    Appoggiatura,
    /// Ascending grace group into the main note.
    Schleifer,
    /// Grace note before the main note.
    Vorschlag,
    /// Ornamental after-stroke ending.
    Nachschlag,
    /// Trill closed by a nachschlag resolution.
    CompoundTrillNachschlag,
    /// Turn flowing into a trill.
    CompoundTurnTrill,
}

/// Which ornament types are enabled, and how often they apply.
#[derive(Debug, Clone, Copy)]
pub struct OrnamentConfig {
    /// Enable plain trills.
    pub trill: bool,
    /// Enable mordents.
    pub mordent: bool,
    /// Enable turns.
    pub turn: bool,
    /// Enable vorschlag grace notes.
    pub vorschlag: bool,
    /// Enable compound ornaments.
    pub compound: bool,
    /// Probability of ornamenting an eligible note.
    pub density: f32,
}

impl Default for OrnamentConfig {
    fn default() -> Self {
        Self { trill: true, mordent: true, turn: true, vorschlag: true, compound: true, density: 0.15 }
    }
}

/// Everything the engine needs to decorate one voice.
pub struct OrnamentContext<'a> {
    /// Enabled types and density.
    pub config: OrnamentConfig,
    /// Role of the voice being decorated; Ground gets nothing.
    pub role: VoiceRole,
    /// Tempo, for trill speed.
    pub bpm: u16,
    /// Pitch range of the voice, clamping ornament neighbours.
    pub range: PitchRange,
    /// Harmonic context; `None` falls back to metric defaults.
    pub timeline: Option<&'a HarmonicTimeline>,
}

/// Minimum host duration for ornamentation (an eighth note).
#[must_use]
pub fn is_eligible(note: &NoteEvent, role: VoiceRole) -> bool {
    role != VoiceRole::Ground && note.duration >= EIGHTH_NOTE
}

/// Choose an ornament for a note.
///
/// With harmonic context: chord tones trill on weak beats and take the
/// compound trill + nachschlag on strong beats (if at least a beat long);
/// non-chord tones take a vorschlag on strong beats and the compound
/// turn + trill on long weak beats. Otherwise the metric defaults decide:
/// strong beats prefer the trill, weak beats the mordent, turn last.
#[must_use]
pub fn select_ornament(note: &NoteEvent, ctx: &OrnamentContext<'_>) -> Option<OrnamentType> {
    let cfg = &ctx.config;
    let strong = is_strong_beat(note.start_tick);

    if let Some(timeline) = ctx.timeline {
        if !timeline.is_empty() {
            let chord_tone = timeline.get_at(note.start_tick).chord.contains(note.pitch);
            if chord_tone && !strong && cfg.trill {
                return Some(OrnamentType::Trill);
            }
            if chord_tone && strong && note.duration >= QUARTER_NOTE && cfg.compound {
                return Some(OrnamentType::CompoundTrillNachschlag);
            }
            if !chord_tone && strong && cfg.vorschlag {
                return Some(OrnamentType::Vorschlag);
            }
            if !chord_tone && !strong && note.duration >= QUARTER_NOTE && cfg.compound {
                return Some(OrnamentType::CompoundTurnTrill);
            }
        }
    }

    if strong && cfg.trill {
        Some(OrnamentType::Trill)
    } else if !strong && cfg.mordent {
        Some(OrnamentType::Mordent)
    } else if cfg.turn {
        Some(OrnamentType::Turn)
    } else {
        None
    }
}

/// Upper neighbour one scale-ish step above, clamped into range.
fn upper_neighbor(pitch: Pitch, range: PitchRange) -> Pitch {
    range.clamp(pitch.transpose(2))
}

/// Lower neighbour a step below, clamped into range.
fn lower_neighbor(pitch: Pitch, range: PitchRange) -> Pitch {
    range.clamp(pitch.transpose(-2))
}

/// Split `total` into `count` near-equal micro-durations (first notes
/// absorb the remainder, every slice positive).
fn split_duration(total: Tick, count: u32) -> SmallVec<[Tick; 12]> {
    let count = count.max(1).min(total);
    let base = total / count;
    let mut remainder = total % count;
    let mut slices = SmallVec::new();
    for _ in 0..count {
        let extra = u32::from(remainder > 0);
        remainder = remainder.saturating_sub(1);
        slices.push(base + extra);
    }
    slices
}

/// Expand one host note into its ornament micro-sequence.
#[must_use]
pub fn expand(note: &NoteEvent, ornament: OrnamentType, ctx: &OrnamentContext<'_>) -> Vec<NoteEvent> {
    let main = note.pitch;
    let upper = upper_neighbor(main, ctx.range);
    let lower = lower_neighbor(main, ctx.range);

    let pitches: SmallVec<[Pitch; 12]> = match ornament {
        OrnamentType::Trill => {
            let alternations = trill_alternations(ctx.bpm);
            let mut seq = SmallVec::new();
            for _ in 0..alternations {
                seq.push(main);
                seq.push(upper);
            }
            seq.push(main);
            seq
        }
        OrnamentType::Mordent => SmallVec::from_slice(&[main, lower, main]),
        OrnamentType::Pralltriller => SmallVec::from_slice(&[upper, main]),
        OrnamentType::Turn => SmallVec::from_slice(&[upper, main, lower, main]),
        OrnamentType::Appoggiatura | OrnamentType::Vorschlag => {
            SmallVec::from_slice(&[upper, main])
        }
        OrnamentType::Schleifer => SmallVec::from_slice(&[lower_neighbor(lower, ctx.range), lower, main]),
        OrnamentType::Nachschlag => SmallVec::from_slice(&[main, upper, main]),
        OrnamentType::CompoundTrillNachschlag => {
            SmallVec::from_slice(&[main, upper, main, upper, main, lower, main])
        }
        OrnamentType::CompoundTurnTrill => {
            SmallVec::from_slice(&[upper, main, lower, main, upper, main])
        }
    };

    let slices = split_duration(note.duration, pitches.len() as u32);
    let mut tick = note.start_tick;
    let mut out = Vec::with_capacity(slices.len());
    for (pitch, dur) in pitches.iter().zip(slices.iter()) {
        let mut micro = NoteEvent::new(tick, *dur, *pitch, note.velocity, note.voice, note.source);
        micro.repairs = note.repairs | Repairs::ORNAMENTED;
        out.push(micro);
        tick += dur;
    }
    // Very short hosts may not fit the full figure; whatever fits keeps
    // the host's overall span.
    if out.is_empty() {
        let mut host = *note;
        host.repairs |= Repairs::ORNAMENTED;
        out.push(host);
    }
    out
}

/// Decorate a voice: roll the density gate per eligible note, select,
/// and expand. Non-ornamented notes pass through unchanged.
#[must_use]
pub fn apply_ornaments(
    notes: &[NoteEvent],
    ctx: &OrnamentContext<'_>,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let density = ctx.config.density * ctx.role.ornament_factor();
    let mut out = Vec::with_capacity(notes.len());
    for note in notes {
        if !is_eligible(note, ctx.role) || !rng.chance(density) {
            out.push(*note);
            continue;
        }
        match select_ornament(note, ctx) {
            Some(ornament) => out.extend(expand(note, ornament, ctx)),
            None => out.push(*note),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use organum_harmony::Resolution;
    use organum_score::NoteSource;
    use organum_theory::{KeySignature, PitchClass};
    use organum_time::TICKS_PER_BAR;

    fn mk(start: Tick, dur: Tick, pitch: u8) -> NoteEvent {
        NoteEvent::new(start, dur, Pitch::new(pitch), 80, 1, NoteSource::FreeCounterpoint)
    }

    fn ctx<'a>(timeline: Option<&'a HarmonicTimeline>) -> OrnamentContext<'a> {
        OrnamentContext {
            config: OrnamentConfig::default(),
            role: VoiceRole::Respond,
            bpm: 100,
            range: PitchRange::new(36, 96),
            timeline,
        }
    }

    #[test]
    fn ground_and_short_notes_are_ineligible() {
        assert!(!is_eligible(&mk(0, 480, 60), VoiceRole::Ground));
        assert!(!is_eligible(&mk(0, 120, 60), VoiceRole::Respond));
        assert!(is_eligible(&mk(0, 240, 60), VoiceRole::Respond));
    }

    #[test]
    fn harmonic_selection_table() {
        let key = KeySignature::major(PitchClass::new(0));
        let timeline = HarmonicTimeline::standard(key, TICKS_PER_BAR, Resolution::Bar);
        let context = ctx(Some(&timeline));

        // Chord tone on a weak beat: trill.
        assert_eq!(select_ornament(&mk(480, 480, 60), &context), Some(OrnamentType::Trill));
        // Chord tone, strong beat, at least a beat long: compound.
        assert_eq!(
            select_ornament(&mk(0, 960, 64), &context),
            Some(OrnamentType::CompoundTrillNachschlag)
        );
        // Non-chord tone on a strong beat: vorschlag.
        assert_eq!(select_ornament(&mk(960, 480, 62), &context), Some(OrnamentType::Vorschlag));
        // Non-chord tone, weak beat, long: compound turn + trill.
        assert_eq!(
            select_ornament(&mk(480, 960, 62), &context),
            Some(OrnamentType::CompoundTurnTrill)
        );
    }

    #[test]
    fn metric_defaults_without_context() {
        let context = ctx(None);
        assert_eq!(select_ornament(&mk(0, 480, 60), &context), Some(OrnamentType::Trill));
        assert_eq!(select_ornament(&mk(480, 480, 60), &context), Some(OrnamentType::Mordent));

        let mut config = OrnamentConfig::default();
        config.trill = false;
        config.mordent = false;
        let fallback = OrnamentContext { config, ..ctx(None) };
        assert_eq!(select_ornament(&mk(0, 480, 60), &fallback), Some(OrnamentType::Turn));
    }

    #[test]
    fn expansion_preserves_span_voice_and_velocity() {
        let context = ctx(None);
        let host = mk(960, 480, 64);
        for ornament in [
            OrnamentType::Trill,
            OrnamentType::Mordent,
            OrnamentType::Turn,
            OrnamentType::Vorschlag,
            OrnamentType::CompoundTrillNachschlag,
            OrnamentType::CompoundTurnTrill,
            OrnamentType::Schleifer,
            OrnamentType::Pralltriller,
            OrnamentType::Nachschlag,
            OrnamentType::Appoggiatura,
        ] {
            let micro = expand(&host, ornament, &context);
            assert!(!micro.is_empty(), "{ornament:?}");
            assert_eq!(micro[0].start_tick, host.start_tick, "{ornament:?}");
            let total: Tick = micro.iter().map(|n| n.duration).sum();
            assert_eq!(total, host.duration, "{ornament:?}");
            for n in &micro {
                assert_eq!(n.velocity, host.velocity);
                assert_eq!(n.voice, host.voice);
                assert!(n.repairs.contains(Repairs::ORNAMENTED));
                assert!(n.duration > 0);
            }
        }
    }

    #[test]
    fn trill_speed_scales_with_bpm() {
        let slow = OrnamentContext { bpm: 40, ..ctx(None) };
        let fast = OrnamentContext { bpm: 160, ..ctx(None) };
        let host = mk(0, 960, 60);
        let slow_notes = expand(&host, OrnamentType::Trill, &slow);
        let fast_notes = expand(&host, OrnamentType::Trill, &fast);
        assert!(fast_notes.len() > slow_notes.len());
        assert_eq!(slow_notes.len(), 2 * 2 + 1);
        assert_eq!(fast_notes.len(), 6 * 2 + 1);
    }

    #[test]
    fn ground_role_passes_everything_through() {
        let context = OrnamentContext { role: VoiceRole::Ground, ..ctx(None) };
        let notes = vec![mk(0, 960, 60), mk(960, 960, 62)];
        let mut rng = SeededRng::new(1);
        assert_eq!(apply_ornaments(&notes, &context, &mut rng), notes);
    }

    #[test]
    fn density_zero_changes_nothing() {
        let mut config = OrnamentConfig::default();
        config.density = 0.0;
        let context = OrnamentContext { config, ..ctx(None) };
        let notes = vec![mk(0, 480, 60); 8];
        let mut rng = SeededRng::new(2);
        assert_eq!(apply_ornaments(&notes, &context, &mut rng).len(), 8);
    }

    #[test]
    fn ornament_pitches_stay_in_range() {
        let context = OrnamentContext { range: PitchRange::new(60, 62), ..ctx(None) };
        let micro = expand(&mk(0, 480, 62), OrnamentType::Trill, &context);
        for n in &micro {
            assert!(context.range.contains(n.pitch));
        }
    }
}
