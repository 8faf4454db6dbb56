//! harmony/organum-harmony/src/timeline.rs
//! The contiguous harmonic timeline.
//!
//! Invariants, maintained by every public operation:
//! - the first event starts at tick 0,
//! - each event ends exactly where the next begins,
//! - the last event ends at the total duration.

use organum_theory::{ChordDegree, KeySignature};
use organum_time::{Tick, TICKS_PER_BAR, TICKS_PER_BEAT};
use thiserror::Error;

use crate::event::HarmonicEvent;
use crate::progression::{chord_on_degree, CadenceKind, ProgressionType};

/// Granularity of the generated backbone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// One event per beat.
    Beat,
    /// One event per bar.
    Bar,
}

impl Resolution {
    /// Tick span of one event at this resolution.
    #[must_use]
    pub const fn span(self) -> Tick {
        match self {
            Self::Beat => TICKS_PER_BEAT,
            Self::Bar => TICKS_PER_BAR,
        }
    }
}

/// Violations of the timeline contiguity invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimelineError {
    /// The appended event does not start where the timeline ends.
    #[error("event at tick {got} does not continue the timeline ending at {expected}")]
    NonContiguous {
        /// Where the timeline currently ends.
        expected: Tick,
        /// Where the rejected event started.
        got: Tick,
    },
    /// The appended event has a non-positive span.
    #[error("event span [{tick}, {end_tick}) is empty")]
    EmptySpan {
        /// Event start.
        tick: Tick,
        /// Event end.
        end_tick: Tick,
    },
}

/// Ordered, contiguous sequence of [`HarmonicEvent`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarmonicTimeline {
    events: Vec<HarmonicEvent>,
}

impl HarmonicTimeline {
    /// An empty timeline; populate with [`Self::push`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain I–IV–V–I backbone covering `total_duration`.
    #[must_use]
    pub fn standard(key: KeySignature, total_duration: Tick, resolution: Resolution) -> Self {
        const BACKBONE: [ChordDegree; 4] =
            [ChordDegree::I, ChordDegree::IV, ChordDegree::V, ChordDegree::I];
        Self::from_degree_cycle(key, total_duration, resolution, &BACKBONE)
    }

    /// A phrase built from one progression template, cycled as needed.
    #[must_use]
    pub fn progression(
        key: KeySignature,
        total_duration: Tick,
        resolution: Resolution,
        progression: ProgressionType,
    ) -> Self {
        Self::from_degree_cycle(key, total_duration, resolution, progression.degrees())
    }

    fn from_degree_cycle(
        key: KeySignature,
        total_duration: Tick,
        resolution: Resolution,
        degrees: &[ChordDegree],
    ) -> Self {
        let mut timeline = Self::new();
        if total_duration == 0 || degrees.is_empty() {
            return timeline;
        }
        let span = resolution.span();
        let mut tick = 0;
        let mut idx = 0;
        while tick < total_duration {
            let end = (tick + span).min(total_duration);
            let chord = chord_on_degree(key, degrees[idx % degrees.len()]);
            // Infallible: each event starts exactly where the last ended.
            let _ = timeline.push(HarmonicEvent::new(tick, end, key, chord));
            tick = end;
            idx += 1;
        }
        timeline
    }

    /// Append an event, enforcing contiguity.
    ///
    /// # Errors
    /// [`TimelineError::NonContiguous`] if the event does not start where
    /// the timeline ends; [`TimelineError::EmptySpan`] on a zero span.
    pub fn push(&mut self, event: HarmonicEvent) -> Result<(), TimelineError> {
        if event.end_tick <= event.tick {
            return Err(TimelineError::EmptySpan { tick: event.tick, end_tick: event.end_tick });
        }
        let expected = self.total_duration();
        if event.tick != expected {
            return Err(TimelineError::NonContiguous { expected, got: event.tick });
        }
        self.events.push(event);
        Ok(())
    }

    /// Append every event of another timeline, shifted onto this one's end.
    pub fn extend_shifted(&mut self, other: &HarmonicTimeline) {
        let offset = self.total_duration();
        for event in &other.events {
            // Contiguity carries over from the source timeline.
            let _ = self.push(event.shifted(offset));
        }
    }

    /// All events in order.
    #[must_use]
    pub fn events(&self) -> &[HarmonicEvent] {
        &self.events
    }

    /// Tick where the timeline ends (0 when empty).
    #[must_use]
    pub fn total_duration(&self) -> Tick {
        self.events.last().map_or(0, |e| e.end_tick)
    }

    /// Whether no events have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The event covering `tick`, by binary search.
    ///
    /// Ticks past the end resolve to the final event, so lookups made at a
    /// piece's closing boundary stay well-defined.
    ///
    /// # Panics
    /// Panics if the timeline is empty.
    #[must_use]
    pub fn get_at(&self, tick: Tick) -> &HarmonicEvent {
        assert!(!self.events.is_empty(), "lookup on empty timeline");
        let idx = match self.events.binary_search_by(|e| e.tick.cmp(&tick)) {
            Ok(found) => found,
            Err(insertion) => insertion.saturating_sub(1),
        };
        &self.events[idx.min(self.events.len() - 1)]
    }

    /// Rewrite the final two events to close with the given cadence.
    ///
    /// Earlier events are untouched. With a single event only that event
    /// is rewritten to the cadence goal.
    pub fn apply_cadence(&mut self, kind: CadenceKind, key: KeySignature) {
        let (penultimate, last) = match kind {
            CadenceKind::Perfect => (ChordDegree::V, ChordDegree::I),
            CadenceKind::Half => (ChordDegree::IV, ChordDegree::V),
            CadenceKind::Deceptive => (ChordDegree::V, ChordDegree::vi),
        };
        let len = self.events.len();
        if len == 0 {
            return;
        }
        if len >= 2 {
            let chord = chord_on_degree(key, penultimate);
            let ev = &mut self.events[len - 2];
            *ev = HarmonicEvent { weight: ev.weight, ..HarmonicEvent::new(ev.tick, ev.end_tick, key, chord) };
        }
        let chord = chord_on_degree(key, last);
        let ev = &mut self.events[len - 1];
        *ev = HarmonicEvent { weight: ev.weight, ..HarmonicEvent::new(ev.tick, ev.end_tick, key, chord) };
    }
}
