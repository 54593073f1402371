//! Score element resolution with tiered fallback
//!
//! Locates the two score-bearing elements of a match page whose markup
//! changes without notice:
//! - Document-wide selector matching (primary tier)
//! - Container-scoped selector matching
//! - Text/class heuristic scan (last resort)
//!
//! A result is either a full pair or nothing; a lone match is never emitted.

pub mod errors;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use errors::*;
pub use resolver::*;
pub use strategies::*;
pub use types::*;
