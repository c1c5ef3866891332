//! Error taxonomy for the engine.
//!
//! Leaf DSP routines never fail on numeric edge cases (see `SPEC_FULL.md`
//! §A); only the handful of operations listed in the public API table
//! return a `Result`. `CacheFull` is never constructed outside
//! [`crate::cache`] and never escapes the crate.

use thiserror::Error;

/// Errors the engine can report across its public API.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller violated a documented precondition (e.g. a non-power-of-two
    /// FFT size). Always surfaced, never recovered internally.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// PSOLA/pitch analysis could not produce a result because the input
    /// was shorter than the minimum analysis length, or effectively
    /// silent.
    #[error("analysis produced no result: {0}")]
    AnalysisEmpty(String),

    /// Internal-only: an analysis cache reached its capacity. Triggers
    /// eviction and is never surfaced to callers.
    #[error("cache full")]
    CacheFull,

    /// `render` was cancelled via its `CancelToken`. The partial output
    /// rendered before cancellation is still returned alongside this.
    #[error("render cancelled after {notes_rendered} note(s)")]
    Cancelled { notes_rendered: usize },

    /// `render` was called with a note sequence that resolved no samples
    /// at all.
    #[error("no samples resolved for any note in the sequence")]
    NoSamples,
}

/// Result alias used across the public API.
pub type EngineResult<T> = Result<T, EngineError>;
