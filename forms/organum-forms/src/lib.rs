//! Form generators and the machinery they share.
//!
//! The crate is the top of the generation stack. Per-voice primitives
//! ([`figure`], [`motif`], [`bass`]) emit raw candidate notes; the
//! [`validate`] pipeline enforces the counterpoint invariants through
//! ordered, idempotent repair passes; the [`ornament`] engine expands
//! selected notes into grace figures; [`analyze`] reports what survived.
//! The form modules ([`prelude`], [`fugue`], [`chorale`], [`passacaglia`],
//! [`toccata`], [`fantasia`], [`trio`]) schedule all of that into
//! complete pieces.
//!
//! Every generator is a pure function of its configuration: the same
//! config produces byte-identical tracks.
//!
//! ```
//! use organum_forms::prelude::{generate_prelude, PreludeConfig};
//! let output = generate_prelude(&PreludeConfig::default()).expect("generates");
//! assert!(!output.tracks.is_empty());
//! ```

pub mod analyze;
pub mod bass;
pub mod chorale;
pub mod fantasia;
pub mod figure;
pub mod fugue;
pub mod motif;
pub mod ornament;
pub mod passacaglia;
pub mod prelude;
pub mod roles;
pub mod techniques;
pub mod toccata;
pub mod tracks;
pub mod trio;
pub mod validate;

pub use analyze::analyze_counterpoint;
pub use roles::{is_pedal_voice, organ_voice_range, VoiceRole};
pub use validate::{Pass, Pipeline, StackContext};
