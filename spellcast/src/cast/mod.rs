//! Gesture spell-casting engine.
//!
//! Per tick, each hand supplies its pose delta relative to the cast-start
//! pose plus its trigger state.  Each hand's matcher narrows the template
//! library down while the trigger is held, and the coordinator decides
//! whether the hands are casting alone, side by side, or together on a
//! two-handed spell.
//!
//! The library is immutable; all per-cast state lives in per-hand tables.
//! Nothing here blocks, allocates threads, or performs I/O outside the
//! loader.

pub mod candidate;
pub mod config;
pub mod coordinator;
pub mod effect;
pub mod geometry;
pub mod hand;
pub mod loader;
pub mod matcher;
pub mod template;

pub use config::CastConfig;
pub use coordinator::{
    ActiveSpellRecord, CandidateView, CastCoordinator, CastEvent, CastMode, DualState,
};
pub use effect::SpellEffect;
pub use hand::{Hand, HandInput};
pub use matcher::{CastState, HandMatcher, MatchOutcome};
pub use template::{LibraryError, SpellTemplate, TemplateId, TemplateLibrary, Waypoint};
