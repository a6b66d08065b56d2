//! Shared infrastructure used by every phase of the Gos toolchain: source
//! positions and the phase-tagged diagnostic type each phase's own error
//! enum converts into.

mod diagnostic;
mod span;

pub use diagnostic::{Diagnostic, Phase};
pub use span::Span;
