//! Physical instrument models and the final impossibility guard.
//!
//! Each instrument family answers the same two questions: which pitches
//! are playable at all, and which combinations may sound together. The
//! [`Playability`] trait quotes a per-pitch cost; the per-family models
//! answer the simultaneity question; [`guard::ImpossibilityGuard`] is the
//! final pass reconciling a finished score with the answers.

pub mod bowed;
pub mod fretted;
pub mod guard;
pub mod keyboard;
pub mod kind;
pub mod organ;

pub use bowed::BowedModel;
pub use fretted::GuitarModel;
pub use guard::ImpossibilityGuard;
pub use keyboard::{KeyboardModel, SpanConstraints};
pub use kind::{InstrumentKind, Playability};
pub use organ::OrganSpec;
