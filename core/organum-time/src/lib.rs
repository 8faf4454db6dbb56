//! core/organum-time/src/lib.rs
//! Integer tick grid shared by every layer of the generator.
//!
//! All timing is expressed in ticks; there is no floating-point time. A
//! quarter note is [`TICKS_PER_BEAT`] ticks and a 4/4 bar is
//! [`TICKS_PER_BAR`]. Metric position helpers classify ticks into beats
//! and bar offsets, and [`tempo`] maps BPM onto ornament speed.
//!
//! ```
//! use organum_time::{beat_in_bar, is_strong_beat, TICKS_PER_BAR};
//! assert_eq!(beat_in_bar(TICKS_PER_BAR + 960), 2);
//! assert!(is_strong_beat(TICKS_PER_BAR + 960));
//! ```

pub mod duration;
pub mod tempo;

pub use duration::{
    BREVE, EIGHTH_NOTE, HALF_NOTE, QUARTER_NOTE, SIXTEENTH_NOTE, WHOLE_NOTE,
};

/// Musical time expressed on the fixed integer grid.
pub type Tick = u32;

/// Ticks per quarter-note beat.
pub const TICKS_PER_BEAT: Tick = 480;

/// Ticks per 4/4 bar.
pub const TICKS_PER_BAR: Tick = TICKS_PER_BEAT * 4;

/// Beat index (0..=3) of a tick within its 4/4 bar.
#[must_use]
pub fn beat_in_bar(tick: Tick) -> u8 {
    ((tick % TICKS_PER_BAR) / TICKS_PER_BEAT) as u8
}

/// Tick offset within the bar (0 on every downbeat).
#[must_use]
pub fn position_in_bar(tick: Tick) -> Tick {
    tick % TICKS_PER_BAR
}

/// Strong beats are beat 0 and beat 2 of a 4/4 bar.
#[must_use]
pub fn is_strong_beat(tick: Tick) -> bool {
    matches!(beat_in_bar(tick), 0 | 2)
}

/// Whether a tick falls exactly on a beat head.
#[must_use]
pub fn is_beat_head(tick: Tick) -> bool {
    tick % TICKS_PER_BEAT == 0
}

/// Total tick span of `bars` whole bars.
#[must_use]
pub fn bars(count: u32) -> Tick {
    count * TICKS_PER_BAR
}
