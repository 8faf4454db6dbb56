//! score/organum-score/src/track.rs
//! Tracks and the fixed organ channel/program mapping.

use crate::note::{sort_notes, NoteEvent};
use organum_theory::PitchRange;

/// Fixed velocity for every organ and harpsichord note; pipe organs are
/// not velocity-sensitive.
pub const ORGAN_VELOCITY: u8 = 80;

/// General MIDI program numbers used by the generator (0-indexed).
pub mod gm_program {
    /// Acoustic Grand Piano.
    pub const PIANO: u8 = 0;
    /// Harpsichord.
    pub const HARPSICHORD: u8 = 6;
    /// Church Organ.
    pub const CHURCH_ORGAN: u8 = 19;
    /// Reed Organ.
    pub const REED_ORGAN: u8 = 20;
    /// Nylon String Guitar.
    pub const NYLON_GUITAR: u8 = 24;
    /// Violin.
    pub const VIOLIN: u8 = 40;
    /// Cello.
    pub const CELLO: u8 = 42;
}

/// Organ manuals and pedal, mapping directly onto MIDI channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrganManual {
    /// Manual I — MIDI channel 0.
    Great,
    /// Manual II — MIDI channel 1.
    Swell,
    /// Manual III — MIDI channel 2.
    Positiv,
    /// Pedal keyboard — MIDI channel 3.
    Pedal,
}

impl OrganManual {
    /// MIDI channel for this manual.
    #[must_use]
    pub const fn channel(self) -> u8 {
        match self {
            Self::Great => 0,
            Self::Swell => 1,
            Self::Positiv => 2,
            Self::Pedal => 3,
        }
    }

    /// GM program: Reed Organ on the Swell, Church Organ elsewhere.
    #[must_use]
    pub const fn program(self) -> u8 {
        match self {
            Self::Swell => gm_program::REED_ORGAN,
            _ => gm_program::CHURCH_ORGAN,
        }
    }

    /// Default playable range of this manual on a Bach-era organ.
    #[must_use]
    pub fn range(self) -> PitchRange {
        match self {
            Self::Great | Self::Swell => PitchRange::new(36, 96),
            Self::Positiv => PitchRange::new(48, 96),
            Self::Pedal => PitchRange::new(24, 50),
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Great => "Great",
            Self::Swell => "Swell",
            Self::Positiv => "Positiv",
            Self::Pedal => "Pedal",
        }
    }
}

/// One output track: a channel, a GM program, a name, and sorted notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// MIDI channel 0..=15.
    pub channel: u8,
    /// General MIDI program number.
    pub program: u8,
    /// Display name.
    pub name: String,
    /// Notes, sorted by `(start_tick, pitch)` once finalized.
    pub notes: Vec<NoteEvent>,
}

impl Track {
    /// Construct an empty track.
    #[must_use]
    pub fn new(channel: u8, program: u8, name: impl Into<String>) -> Self {
        Self { channel, program, name: name.into(), notes: Vec::new() }
    }

    /// Track hosted on an organ manual, named for display.
    #[must_use]
    pub fn on_manual(manual: OrganManual, name: impl Into<String>) -> Self {
        Self::new(manual.channel(), manual.program(), name)
    }

    /// Restore the `(start_tick, pitch)` sort invariant.
    pub fn sort(&mut self) {
        sort_notes(&mut self.notes);
    }
}

/// Sort every track's notes.
pub fn sort_tracks(tracks: &mut [Track]) {
    for track in tracks {
        track.sort();
    }
}

/// Deduplicate same-tick notes within each track and truncate overlaps so
/// each voice sounds one note at a time. Longer notes win ties.
pub fn dedup_single_voice(tracks: &mut [Track]) {
    for track in tracks {
        let notes = &mut track.notes;
        if notes.len() < 2 {
            continue;
        }
        notes.sort_by(|a, b| {
            a.start_tick.cmp(&b.start_tick).then(b.duration.cmp(&a.duration))
        });
        notes.dedup_by(|b, a| a.start_tick == b.start_tick);
        for idx in 0..notes.len().saturating_sub(1) {
            let next_start = notes[idx + 1].start_tick;
            if notes[idx].end_tick() > next_start {
                notes[idx].duration = (next_start - notes[idx].start_tick).max(1);
            }
        }
    }
}
