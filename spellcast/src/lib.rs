//! Spellcast: two-handed gesture spell matching.
//!
//! [`cast`] holds the engine.  [`replay`] drives it from recorded tick
//! scripts, and [`sexp`] holds the plist helpers both use.

pub mod cast;
pub mod replay;
pub mod sexp;
