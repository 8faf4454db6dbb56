//! core/organum-time/src/tempo.rs
//! Tempo-derived performance parameters.
//!
//! The generator has no real-time clock; BPM only influences a handful of
//! interpretation choices, chiefly how many alternations a trill receives.

/// Number of trill alternations for a given tempo.
///
/// Very slow tempos get 2 alternations, scaling up to 6 at presto. The
/// thresholds bracket the common baroque tempo words.
#[must_use]
pub fn trill_alternations(bpm: u16) -> u8 {
    match bpm {
        0..=59 => 2,
        60..=79 => 3,
        80..=109 => 4,
        110..=139 => 5,
        _ => 6,
    }
}
