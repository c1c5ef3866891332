//! Core data model: immutable samples, oto timing parameters, notes, and
//! the analysis structs the leaf components produce (spec.md §3).

use std::sync::Arc;

/// An immutable mono PCM buffer at a known sample rate.
///
/// Raw PCM is always owned by the caller; the engine borrows it read-only
/// everywhere except inside the scheduler's sample arena, where a `Sample`
/// is held behind an `Arc` so notes can reference it by stable id without
/// cloning the underlying buffer (spec.md §9, "arena + indices").
#[derive(Debug, Clone)]
pub struct Sample {
    pub sample_rate: u32,
    pub pcm: Arc<[f32]>,
}

impl Sample {
    pub fn new(sample_rate: u32, pcm: Vec<f32>) -> Self {
        Self {
            sample_rate,
            pcm: Arc::from(pcm),
        }
    }

    pub fn len(&self) -> usize {
        self.pcm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }

    pub fn duration_s(&self) -> f64 {
        self.pcm.len() as f64 / self.sample_rate as f64
    }
}

/// Opaque, stable identifier for a sample held in a scheduler's arena.
/// Notes reference samples by id rather than by name so the scheduler
/// never needs a back-reference into the caller's sample map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleId(pub u64);

/// Oto timing parameters, in milliseconds, relative to the start of the
/// sample unless noted (spec.md §3). Arrives from external oto parsers as
/// loosely typed data; by the time it reaches the engine every field is a
/// concrete float, with no optional sentinel values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OtoParams {
    /// Playback start inside the sample, ms.
    pub offset_ms: f64,
    /// End of the fixed region that must not be time-stretched, ms.
    pub consonant_ms: f64,
    /// Absolute end (ms from start) if positive; `duration + cutoff_ms` if
    /// negative; play to the end if zero.
    pub cutoff_ms: f64,
    /// How far before the notated note start the voiced portion begins, ms.
    pub preutterance_ms: f64,
    /// Crossfade region with the previous note's tail, ms.
    pub overlap_ms: f64,
}

impl Default for OtoParams {
    fn default() -> Self {
        Self {
            offset_ms: 0.0,
            consonant_ms: 0.0,
            cutoff_ms: 0.0,
            preutterance_ms: 0.0,
            overlap_ms: 0.0,
        }
    }
}

/// `OtoParams` resolved against a concrete sample: every field clamped
/// into sample-index space and made internally consistent per spec.md §3's
/// invariants. Never trust raw oto values from input; always resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveOto {
    pub offset: usize,
    pub consonant: usize,
    pub effective_end: usize,
    pub preutterance: usize,
    pub overlap: usize,
}

impl OtoParams {
    /// Resolve against a sample of the given length/sample rate, clamping
    /// into `0 ≤ offset ≤ consonant ≤ effective_end ≤ duration` and
    /// `0 ≤ overlap ≤ preutterance`.
    pub fn resolve(&self, len: usize, sample_rate: u32) -> EffectiveOto {
        let ms_to_samples = |ms: f64| -> usize {
            ((ms.max(0.0) / 1000.0) * sample_rate as f64).round() as usize
        };

        let duration_ms = len as f64 * 1000.0 / sample_rate as f64;
        let offset_ms = self.offset_ms.max(0.0).min(duration_ms);
        let consonant_ms = self.consonant_ms.max(offset_ms).min(duration_ms);

        let end_ms = if self.cutoff_ms > 0.0 {
            self.cutoff_ms.min(duration_ms)
        } else if self.cutoff_ms < 0.0 {
            (duration_ms + self.cutoff_ms).max(consonant_ms)
        } else {
            duration_ms
        };
        let end_ms = end_ms.max(consonant_ms).min(duration_ms);

        let offset = ms_to_samples(offset_ms).min(len);
        let consonant = ms_to_samples(consonant_ms).clamp(offset, len);
        let effective_end = ms_to_samples(end_ms).clamp(consonant, len);

        let preutterance = ms_to_samples(self.preutterance_ms);
        let overlap = ms_to_samples(self.overlap_ms).min(preutterance);

        EffectiveOto {
            offset,
            consonant,
            effective_end,
            preutterance,
            overlap,
        }
    }
}

/// A single target note in a melody (spec.md §3). The sequence passed to
/// `render` must be strictly increasing in `start_time_s`.
#[derive(Debug, Clone)]
pub struct Note {
    pub start_time_s: f64,
    pub duration_s: f64,
    pub pitch_semitones: f32,
    pub alias: String,
}

/// Choice of analysis window for PSOLA grain extraction (spec.md §4.1.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    #[default]
    Hann,
    Hamming,
    Triangular,
}

/// Result of pitch-synchronous analysis on one source sample (spec.md §3).
/// Computed once per sample, cached by fingerprint; the cache never
/// mutates an entry once inserted.
#[derive(Debug, Clone)]
pub struct PsolaAnalysis {
    pub pitch_marks: Vec<usize>,
    pub pitch_periods: Vec<usize>,
    pub voiced_flags: Vec<bool>,
    pub sample_rate: u32,
}

impl PsolaAnalysis {
    pub fn is_empty(&self) -> bool {
        self.pitch_marks.is_empty()
    }

    /// True unless every mark in the analysis is unvoiced.
    pub fn has_voiced(&self) -> bool {
        self.voiced_flags.iter().any(|&v| v)
    }
}

/// Loudness metrics for a buffer (spec.md §4.4.1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessAnalysis {
    pub rms: f32,
    pub rms_db: f32,
    pub peak: f32,
    pub peak_db: f32,
    pub crest_factor: f32,
    pub has_content: bool,
}

/// Result of autocorrelation-based pitch detection (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchResult {
    pub period_s: f64,
    pub frequency_hz: f32,
    pub confidence: f32,
    pub detected: bool,
}

impl PitchResult {
    pub fn not_detected() -> Self {
        Self {
            period_s: 0.0,
            frequency_hz: 0.0,
            confidence: 0.0,
            detected: false,
        }
    }
}

/// Outcome of a `render` call: which notes were skipped (alias
/// unresolved, sample too short) and whether the render was cancelled
/// partway through.
#[derive(Debug, Clone, Default)]
pub struct RenderStatus {
    pub skipped_notes: Vec<SkippedNote>,
    pub cancelled: bool,
}

/// Record of a note the scheduler could not render, and why.
#[derive(Debug, Clone)]
pub struct SkippedNote {
    pub note_index: usize,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_clamps_invariants() {
        let oto = OtoParams {
            offset_ms: -10.0,
            consonant_ms: 5.0,
            cutoff_ms: 0.0,
            preutterance_ms: 20.0,
            overlap_ms: 1000.0,
        };
        let sr = 44100;
        let len = sr as usize; // 1 s
        let eff = oto.resolve(len, sr);
        assert!(eff.offset <= eff.consonant);
        assert!(eff.consonant <= eff.effective_end);
        assert!(eff.effective_end <= len);
        assert!(eff.overlap <= eff.preutterance);
    }

    #[test]
    fn resolve_negative_cutoff_measures_from_end() {
        let oto = OtoParams {
            offset_ms: 0.0,
            consonant_ms: 0.0,
            cutoff_ms: -100.0,
            preutterance_ms: 0.0,
            overlap_ms: 0.0,
        };
        let sr = 1000;
        let len = 1000; // 1 s
        let eff = oto.resolve(len, sr);
        // end = duration(1000ms) - 100ms = 900ms -> 900 samples at 1kHz.
        assert_eq!(eff.effective_end, 900);
    }

    #[test]
    fn sample_duration_matches_len_over_rate() {
        let s = Sample::new(1000, vec![0.0; 500]);
        assert_eq!(s.duration_s(), 0.5);
    }
}
