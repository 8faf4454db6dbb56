//! forms/organum-forms/src/analyze.rs
//! Post-hoc counterpoint metrics.
//!
//! Nothing here mutates the score. The analyzer reports what survived
//! the repair stack so callers can decide how strict to be.

use organum_score::{CounterpointReport, Track};
use organum_theory::interval;
use organum_time::is_strong_beat;

/// Count parallel perfects, voice crossings, and strong-beat fourths
/// over the bass. Tracks are indexed by voice; the last voice of three
/// or more is the bass.
#[must_use]
pub fn analyze_counterpoint(tracks: &[Track]) -> CounterpointReport {
    let mut report = CounterpointReport::default();
    let bass_voice = if tracks.len() >= 3 { Some(tracks.len() - 1) } else { None };

    for upper in 0..tracks.len() {
        for lower in (upper + 1)..tracks.len() {
            report.parallel_perfect += count_parallel_perfect(&tracks[upper], &tracks[lower]);
            report.voice_crossing += count_crossings(&tracks[upper], &tracks[lower]);
        }
    }

    if let Some(bass) = bass_voice {
        for upper in 0..bass {
            report.strong_beat_fourths += count_strong_beat_fourths(&tracks[upper], &tracks[bass]);
        }
    }
    report
}

fn count_parallel_perfect(upper: &Track, lower: &Track) -> u32 {
    let mut count = 0;
    for pair in upper.notes.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let Some(lower_prev) = lower.notes.iter().find(|n| n.sounds_at(prev.start_tick)) else {
            continue;
        };
        let Some(lower_curr) = lower.notes.iter().find(|n| n.sounds_at(curr.start_tick)) else {
            continue;
        };
        let ivl_prev = interval::simple(prev.pitch.interval_from(lower_prev.pitch));
        let ivl_curr = interval::simple(curr.pitch.interval_from(lower_curr.pitch));
        let upper_motion = curr.pitch.interval_from(prev.pitch).signum();
        let lower_motion = lower_curr.pitch.interval_from(lower_prev.pitch).signum();
        if interval::is_perfect(ivl_prev)
            && ivl_prev == ivl_curr
            && upper_motion != 0
            && upper_motion == lower_motion
        {
            count += 1;
        }
    }
    count
}

fn count_crossings(upper: &Track, lower: &Track) -> u32 {
    let mut count = 0;
    for up_note in &upper.notes {
        for low_note in lower.notes.iter().filter(|n| n.overlaps(up_note)) {
            if up_note.pitch < low_note.pitch {
                count += 1;
                break;
            }
        }
    }
    count
}

fn count_strong_beat_fourths(upper: &Track, bass: &Track) -> u32 {
    let mut count = 0;
    for note in &upper.notes {
        if !is_strong_beat(note.start_tick) {
            continue;
        }
        if let Some(bass_note) = bass.notes.iter().find(|n| n.sounds_at(note.start_tick)) {
            let simple = interval::simple(note.pitch.interval_from(bass_note.pitch));
            if simple == interval::PERFECT_FOURTH {
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use organum_score::{NoteEvent, NoteSource};
    use organum_theory::Pitch;

    fn mk(start: u32, dur: u32, pitch: u8, voice: u8) -> NoteEvent {
        NoteEvent::new(start, dur, Pitch::new(pitch), 80, voice, NoteSource::FreeCounterpoint)
    }

    fn track(notes: Vec<NoteEvent>) -> Track {
        let mut t = Track::new(0, 19, "t");
        t.notes = notes;
        t
    }

    #[test]
    fn detects_parallel_fifths() {
        let tracks = vec![
            track(vec![mk(0, 480, 67, 0), mk(480, 480, 69, 0)]),
            track(vec![mk(0, 480, 60, 1), mk(480, 480, 62, 1)]),
        ];
        let report = analyze_counterpoint(&tracks);
        assert_eq!(report.parallel_perfect, 1);
    }

    #[test]
    fn contrary_fifths_are_legal() {
        let tracks = vec![
            track(vec![mk(0, 480, 67, 0), mk(480, 480, 65, 0)]),
            track(vec![mk(0, 480, 60, 1), mk(480, 480, 58, 1)]),
        ];
        // Same interval but we need same direction; both moved down, so
        // this IS parallel. Use contrary motion instead.
        let contrary = vec![
            track(vec![mk(0, 480, 67, 0), mk(480, 480, 72, 0)]),
            track(vec![mk(0, 480, 60, 1), mk(480, 480, 53, 1)]),
        ];
        assert_eq!(analyze_counterpoint(&tracks).parallel_perfect, 1);
        assert_eq!(analyze_counterpoint(&contrary).parallel_perfect, 0);
    }

    #[test]
    fn detects_crossings() {
        let tracks = vec![
            track(vec![mk(0, 480, 55, 0)]),
            track(vec![mk(0, 480, 60, 1)]),
        ];
        assert_eq!(analyze_counterpoint(&tracks).voice_crossing, 1);
    }

    #[test]
    fn counts_strong_beat_fourths_over_bass() {
        let tracks = vec![
            track(vec![mk(0, 480, 65, 0), mk(480, 480, 65, 0)]),
            track(vec![mk(0, 960, 58, 1)]),
            track(vec![mk(0, 960, 48, 2)]),
        ];
        // Voice 0 at F4 over C bass on the downbeat: perfect fourth
        // (65 - 48 = 17 → simple 5). The weak-beat copy is not counted.
        assert_eq!(analyze_counterpoint(&tracks).strong_beat_fourths, 1);
    }

    #[test]
    fn clean_texture_reports_clean() {
        let tracks = vec![
            track(vec![mk(0, 480, 64, 0), mk(480, 480, 65, 0)]),
            track(vec![mk(0, 480, 60, 1), mk(480, 480, 57, 1)]),
        ];
        let report = analyze_counterpoint(&tracks);
        assert_eq!(report.parallel_perfect, 0);
        assert_eq!(report.voice_crossing, 0);
    }
}
