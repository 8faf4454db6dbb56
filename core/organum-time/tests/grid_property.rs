//! Property tests for the tick grid: metric positions always partition
//! the bar, and bar spans accumulate linearly.

use organum_time::{
    bars, beat_in_bar, is_beat_head, is_strong_beat, position_in_bar, TICKS_PER_BAR,
    TICKS_PER_BEAT,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn beat_index_stays_in_the_bar(tick in 0u32..=8_000_000) {
        let beat = beat_in_bar(tick);
        prop_assert!(beat < 4);
        prop_assert!(position_in_bar(tick) < TICKS_PER_BAR);
    }

    #[test]
    fn strong_beats_are_exactly_zero_and_two(tick in 0u32..=8_000_000) {
        let beat = beat_in_bar(tick);
        prop_assert_eq!(is_strong_beat(tick), beat == 0 || beat == 2);
    }

    #[test]
    fn beat_heads_recover_their_beat_index(bar in 0u32..1000, beat in 0u32..4) {
        let tick = bars(bar) + beat * TICKS_PER_BEAT;
        prop_assert!(is_beat_head(tick));
        prop_assert_eq!(u32::from(beat_in_bar(tick)), beat);
        prop_assert_eq!(position_in_bar(tick), beat * TICKS_PER_BEAT);
    }

    #[test]
    fn bar_spans_accumulate(count_a in 0u32..500, count_b in 0u32..500) {
        prop_assert_eq!(bars(count_a) + bars(count_b), bars(count_a + count_b));
    }
}
