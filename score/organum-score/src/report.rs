//! score/organum-score/src/report.rs
//! Post-hoc counterpoint metrics attached to generation results.

use serde::{Deserialize, Serialize};

/// Counts of counterpoint faults left in a finished score.
///
/// Repair passes fix what they can within protection limits; whatever
/// survives is counted here so callers can decide how strict to be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpointReport {
    /// Consecutive parallel perfect intervals (unison, fifth, octave).
    pub parallel_perfect: u32,
    /// Voice crossings between adjacent voices.
    pub voice_crossing: u32,
    /// Perfect fourths over the bass on strong beats.
    pub strong_beat_fourths: u32,
    /// Repairs abandoned because protection forbade the only fix.
    pub repair_failures: u32,
}

impl CounterpointReport {
    /// Fold another report into this one.
    pub fn accumulate(&mut self, other: &CounterpointReport) {
        self.parallel_perfect += other.parallel_perfect;
        self.voice_crossing += other.voice_crossing;
        self.strong_beat_fourths += other.strong_beat_fourths;
        self.repair_failures += other.repair_failures;
    }

    /// Whether the score is free of recorded faults.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.parallel_perfect == 0
            && self.voice_crossing == 0
            && self.strong_beat_fourths == 0
            && self.repair_failures == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulation_sums_fields() {
        let mut total = CounterpointReport::default();
        total.accumulate(&CounterpointReport {
            parallel_perfect: 2,
            voice_crossing: 1,
            strong_beat_fourths: 3,
            repair_failures: 0,
        });
        total.accumulate(&CounterpointReport {
            parallel_perfect: 1,
            ..CounterpointReport::default()
        });
        assert_eq!(total.parallel_perfect, 3);
        assert_eq!(total.voice_crossing, 1);
        assert_eq!(total.strong_beat_fourths, 3);
        assert!(!total.is_clean());
    }

    #[test]
    fn default_report_is_clean() {
        assert!(CounterpointReport::default().is_clean());
    }

    #[test]
    fn report_serializes() {
        let report = CounterpointReport { parallel_perfect: 1, ..Default::default() };
        let json = serde_json::to_string(&report).expect("serializable");
        assert!(json.contains("\"parallel_perfect\":1"));
    }
}
