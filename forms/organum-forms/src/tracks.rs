//! forms/organum-forms/src/tracks.rs
//! Track construction for the organ forms.

use organum_score::{gm_program, Track};

struct TrackSpec {
    channel: u8,
    program: u8,
    name: &'static str,
}

const ORGAN_SPECS: [TrackSpec; 5] = [
    TrackSpec { channel: 0, program: gm_program::CHURCH_ORGAN, name: "Manual I (Great)" },
    TrackSpec { channel: 1, program: gm_program::REED_ORGAN, name: "Manual II (Swell)" },
    TrackSpec { channel: 2, program: gm_program::CHURCH_ORGAN, name: "Manual III (Positiv)" },
    TrackSpec { channel: 3, program: gm_program::CHURCH_ORGAN, name: "Pedal" },
    TrackSpec { channel: 4, program: gm_program::CHURCH_ORGAN, name: "Manual IV" },
];

/// Organ tracks for the fugue-family forms, one per voice.
#[must_use]
pub fn organ_tracks(num_voices: u8) -> Vec<Track> {
    ORGAN_SPECS
        .iter()
        .take(usize::from(num_voices.min(5)))
        .map(|spec| Track::new(spec.channel, spec.program, spec.name))
        .collect()
}

const TOCCATA_SPECS: [TrackSpec; 5] = [
    TrackSpec { channel: 0, program: gm_program::CHURCH_ORGAN, name: "Manual I (Great)" },
    TrackSpec { channel: 1, program: gm_program::REED_ORGAN, name: "Manual II (Swell)" },
    TrackSpec { channel: 3, program: gm_program::CHURCH_ORGAN, name: "Pedal" },
    TrackSpec { channel: 2, program: gm_program::CHURCH_ORGAN, name: "Manual III (Positiv)" },
    TrackSpec { channel: 4, program: gm_program::CHURCH_ORGAN, name: "Manual IV" },
];

/// Toccata tracks: the pedal sits at voice 2, manuals around it.
#[must_use]
pub fn toccata_tracks(num_voices: u8) -> Vec<Track> {
    TOCCATA_SPECS
        .iter()
        .take(usize::from(num_voices.min(5)))
        .map(|spec| Track::new(spec.channel, spec.program, spec.name))
        .collect()
}

/// The three trio-sonata tracks: right hand, left hand, pedal.
#[must_use]
pub fn trio_tracks() -> Vec<Track> {
    vec![
        Track::new(0, gm_program::CHURCH_ORGAN, "Right Hand (Great)"),
        Track::new(1, gm_program::REED_ORGAN, "Left Hand (Swell)"),
        Track::new(3, gm_program::CHURCH_ORGAN, "Pedal"),
    ]
}

/// The four chorale-prelude tracks. The inner voice shares the Great
/// manual (and channel) with the counterpoint voice.
#[must_use]
pub fn chorale_tracks() -> Vec<Track> {
    vec![
        Track::new(0, gm_program::CHURCH_ORGAN, "Counterpoint (Great)"),
        Track::new(1, gm_program::REED_ORGAN, "Cantus Firmus (Swell)"),
        Track::new(0, gm_program::CHURCH_ORGAN, "Inner Voice (Great)"),
        Track::new(3, gm_program::CHURCH_ORGAN, "Pedal"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organ_track_table() {
        let tracks = organ_tracks(4);
        assert_eq!(tracks.len(), 4);
        let channels: Vec<u8> = tracks.iter().map(|t| t.channel).collect();
        assert_eq!(channels, vec![0, 1, 2, 3]);
        assert_eq!(tracks[1].program, gm_program::REED_ORGAN);
        assert_eq!(tracks[3].name, "Pedal");
    }

    #[test]
    fn voice_count_caps_at_five() {
        assert_eq!(organ_tracks(7).len(), 5);
    }

    #[test]
    fn toccata_pedal_sits_at_voice_two() {
        let tracks = toccata_tracks(3);
        let channels: Vec<u8> = tracks.iter().map(|t| t.channel).collect();
        assert_eq!(channels, vec![0, 1, 3]);
        assert_eq!(tracks[2].name, "Pedal");
    }

    #[test]
    fn trio_channels_skip_the_positiv() {
        let tracks = trio_tracks();
        let channels: Vec<u8> = tracks.iter().map(|t| t.channel).collect();
        assert_eq!(channels, vec![0, 1, 3]);
    }

    #[test]
    fn chorale_tracks_share_the_great() {
        let tracks = chorale_tracks();
        assert_eq!(tracks.len(), 4);
        let channels: Vec<u8> = tracks.iter().map(|t| t.channel).collect();
        assert_eq!(channels, vec![0, 1, 0, 3]);
        assert_eq!(tracks[2].name, "Inner Voice (Great)");
    }
}
