//! Pitch-synchronous overlap-add analysis and synthesis (spec.md §4.1).

pub mod analysis;
pub mod synthesis;

pub use analysis::{analyze_pitch_marks, PsolaAnalysisOpts};
pub use synthesis::{psola_synthesize, PsolaSynthesisOpts};
