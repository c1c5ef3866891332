//! Autocorrelation-based pitch detection (spec.md §4.5).
//!
//! Unlike the teacher's `pyin.rs`, which walks a cumulative mean normalized
//! difference function, this module works directly off the normalized
//! autocorrelation of a single analysis window — simpler, and the
//! algorithm the spec calls for — but keeps the teacher's frame/parabolic-
//! interpolation/voicing-gate shape.

use tracing::{debug, trace};

use crate::types::PitchResult;

/// Tunables for [`detect_pitch`] (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchOpts {
    pub min_freq_hz: f32,
    pub max_freq_hz: f32,
    pub peak_threshold: f32,
    pub analysis_start_s: f64,
    pub analysis_duration_s: f64,
}

impl Default for PitchOpts {
    fn default() -> Self {
        Self {
            min_freq_hz: 50.0,
            max_freq_hz: 1000.0,
            peak_threshold: 0.2,
            analysis_start_s: 0.0,
            analysis_duration_s: 0.1,
        }
    }
}

/// Detect the dominant pitch period in a PCM buffer via normalized
/// autocorrelation (spec.md §4.5). Never fails: silence or an absent peak
/// produces [`PitchResult::not_detected`].
pub fn detect_pitch(samples: &[f32], sample_rate: u32, opts: &PitchOpts) -> PitchResult {
    let start = ((opts.analysis_start_s * sample_rate as f64).round() as usize).min(samples.len());
    let window_len = (opts.analysis_duration_s * sample_rate as f64).round() as usize;
    let end = (start + window_len).min(samples.len());
    if end <= start {
        return PitchResult::not_detected();
    }
    let frame = &samples[start..end];

    let min_lag = (sample_rate as f32 / opts.max_freq_hz).floor().max(1.0) as usize;
    let max_lag = (sample_rate as f32 / opts.min_freq_hz).ceil() as usize;
    let max_lag = max_lag.min(frame.len().saturating_sub(1));
    if max_lag <= min_lag {
        return PitchResult::not_detected();
    }

    let ac = normalized_autocorrelation(frame, max_lag);

    // Skip the initial monotonic decay near lag 0 before hunting for a peak,
    // same shape as the teacher's CMND walk but on raw normalized ac.
    let decay_floor = 0.5 * opts.peak_threshold;
    let mut lag = min_lag;
    while lag < max_lag && ac[lag] > decay_floor {
        lag += 1;
    }

    let mut chosen = None;
    while lag < max_lag {
        let is_local_max = ac[lag] >= ac[lag - 1] && ac[lag] >= ac.get(lag + 1).copied().unwrap_or(f32::MIN);
        if is_local_max && ac[lag] > opts.peak_threshold {
            chosen = Some(lag);
            break;
        }
        lag += 1;
    }

    let Some(peak_lag) = chosen else {
        trace!(max_lag, "detect_pitch: no peak above threshold");
        return PitchResult::not_detected();
    };

    let refined_lag = if peak_lag > 0 && peak_lag + 1 < ac.len() {
        parabolic_refine(&ac, peak_lag)
    } else {
        peak_lag as f32
    };

    let period_s = refined_lag as f64 / sample_rate as f64;
    if period_s <= 0.0 {
        return PitchResult::not_detected();
    }
    let frequency_hz = (1.0 / period_s) as f32;
    debug!(frequency_hz, confidence = ac[peak_lag], "detect_pitch found peak");

    PitchResult {
        period_s,
        frequency_hz,
        confidence: ac[peak_lag],
        detected: true,
    }
}

/// Normalized autocorrelation for lags `0..=max_lag`, normalized so that
/// `r[0] == 1.0` for non-silent input (`0.0` for silence).
fn normalized_autocorrelation(frame: &[f32], max_lag: usize) -> Vec<f32> {
    let n = frame.len();
    let energy: f32 = frame.iter().map(|x| x * x).sum();
    let mut r = vec![0.0f32; max_lag + 1];
    if energy < 1e-12 {
        return r;
    }
    for (lag, slot) in r.iter_mut().enumerate() {
        let mut acc = 0.0f32;
        for i in 0..n.saturating_sub(lag) {
            acc += frame[i] * frame[i + lag];
        }
        *slot = acc / energy;
    }
    r
}

fn parabolic_refine(ac: &[f32], lag: usize) -> f32 {
    let x0 = ac[lag - 1];
    let x1 = ac[lag];
    let x2 = ac[lag + 1];
    let denom = 2.0 * (2.0 * x1 - x2 - x0);
    if denom.abs() < 1e-9 {
        lag as f32
    } else {
        lag as f32 + (x2 - x0) / denom
    }
}

/// Semitone correction needed to move `detected_hz` onto `reference_hz`
/// (spec.md §4.5). Zero if either frequency is non-positive.
pub fn pitch_correction_semitones(detected_hz: f32, reference_hz: f32) -> f32 {
    if detected_hz <= 0.0 || reference_hz <= 0.0 {
        return 0.0;
    }
    12.0 * (reference_hz / detected_hz).log2()
}

/// Clamp a detected period into a usable PSOLA grain size, in seconds
/// (spec.md §4.5). Invalid (non-positive) periods fall back to 0.1 s.
pub fn optimal_grain_size_s(period_s: f64, min_s: f64, max_s: f64) -> f64 {
    if period_s <= 0.0 {
        return 0.1;
    }
    (period_s * 2.0).clamp(min_s, max_s)
}

/// Median detected period across `n_windows` equally spaced analysis
/// windows (spec.md §4.5, §B). Windows with no detection are skipped; if
/// every window fails, returns `0.0` rather than falling back to a
/// default, so callers can treat `0.0` as "no correction needed."
pub fn representative_pitch(
    samples: &[f32],
    sample_rate: u32,
    n_windows: usize,
    window_duration_s: f64,
    start_offset_s: f64,
) -> f64 {
    if n_windows == 0 || samples.is_empty() {
        return 0.0;
    }
    let total_duration_s = samples.len() as f64 / sample_rate as f64;
    let usable = (total_duration_s - start_offset_s).max(0.0);
    let mut periods: Vec<f64> = Vec::with_capacity(n_windows);

    for i in 0..n_windows {
        let start_s = if n_windows == 1 {
            start_offset_s
        } else {
            start_offset_s + usable * i as f64 / (n_windows - 1) as f64
        };
        let opts = PitchOpts {
            analysis_start_s: start_s,
            analysis_duration_s: window_duration_s,
            ..PitchOpts::default()
        };
        let result = detect_pitch(samples, sample_rate, &opts);
        if result.detected {
            periods.push(result.period_s);
        }
    }

    if periods.is_empty() {
        return 0.0;
    }
    periods.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = periods.len() / 2;
    if periods.len() % 2 == 0 {
        0.5 * (periods[mid - 1] + periods[mid])
    } else {
        periods[mid]
    }
}
