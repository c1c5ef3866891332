//! Pitch-synchronous analysis (spec.md §4.1.1).
//!
//! Generalizes the teacher's `find_pitch_marks`, which walked a PYIN frame
//! grid, into a self-contained frame scan: short-time energy plus
//! autocorrelation per frame, then a forward walk that snaps each
//! candidate mark onto the nearest local energy peak.

use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::types::PsolaAnalysis;

const MIN_ANALYSIS_SAMPLES: usize = 100;

/// Tunables for [`analyze_pitch_marks`] (spec.md §4.1.1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsolaAnalysisOpts {
    pub min_pitch_hz: f32,
    pub max_pitch_hz: f32,
    pub confidence_threshold: f32,
    pub silence_floor: f32,
}

impl Default for PsolaAnalysisOpts {
    fn default() -> Self {
        Self {
            min_pitch_hz: 50.0,
            max_pitch_hz: 800.0,
            confidence_threshold: 0.3,
            silence_floor: 1e-4,
        }
    }
}

/// Detect glottal pitch marks across a whole sample (spec.md §4.1.1).
///
/// Fails only when `samples` is shorter than the minimum analysis length;
/// callers should fall back to unmodified playback for that sample.
pub fn analyze_pitch_marks(
    samples: &[f32],
    sample_rate: u32,
    opts: &PsolaAnalysisOpts,
) -> EngineResult<PsolaAnalysis> {
    let len = samples.len();
    if len < MIN_ANALYSIS_SAMPLES {
        return Err(EngineError::AnalysisEmpty(format!(
            "sample has {len} frames, fewer than the {MIN_ANALYSIS_SAMPLES} minimum"
        )));
    }

    let hop = ((0.01 * sample_rate as f64).round() as usize).max(1);
    let min_lag = (sample_rate as f32 / opts.max_pitch_hz).floor().max(1.0) as usize;
    let max_lag = (sample_rate as f32 / opts.min_pitch_hz).ceil() as usize;
    let synthetic_period = ((0.01 * sample_rate as f64).round() as usize).max(1);
    let frame_len = (max_lag * 2).clamp(min_lag * 2, len);

    let n_frames = if len > frame_len {
        (len - frame_len) / hop + 1
    } else {
        1
    };

    let mut frame_period = Vec::with_capacity(n_frames);
    let mut frame_voiced = Vec::with_capacity(n_frames);

    for f in 0..n_frames {
        let start = f * hop;
        let end = (start + frame_len).min(len);
        let frame = &samples[start..end];
        let energy = frame_rms(frame);
        let frame_max_lag = max_lag.min(frame.len().saturating_sub(1));

        if frame_max_lag <= min_lag || energy < opts.silence_floor {
            frame_period.push(synthetic_period);
            frame_voiced.push(false);
            continue;
        }

        match autocorrelation_peak(frame, min_lag, frame_max_lag) {
            Some((lag, peak)) if peak > opts.confidence_threshold => {
                frame_period.push(lag.max(1));
                frame_voiced.push(true);
            }
            _ => {
                frame_period.push(synthetic_period);
                frame_voiced.push(false);
            }
        }
    }

    let first_voiced_frame = frame_voiced.iter().position(|&v| v);
    let mut pos: f64 = match first_voiced_frame {
        Some(f) => (f * hop) as f64,
        None => 0.0,
    };

    let mut marks = Vec::new();
    let mut periods = Vec::new();
    let mut voiced = Vec::new();

    while (pos.round() as usize) < len {
        let frame_idx = ((pos as usize) / hop).min(n_frames - 1);
        let period = frame_period[frame_idx];
        let is_voiced = frame_voiced[frame_idx];

        let snapped = snap_to_energy_maximum(samples, pos.round() as usize, period);
        marks.push(snapped);
        periods.push(period);
        voiced.push(is_voiced);

        pos += period as f64;
    }

    let mut out_marks = Vec::with_capacity(marks.len());
    let mut out_periods = Vec::with_capacity(marks.len());
    let mut out_voiced = Vec::with_capacity(marks.len());
    for i in 0..marks.len() {
        if marks[i] >= len {
            continue;
        }
        if let Some(&last) = out_marks.last() {
            if marks[i] <= last {
                continue;
            }
        }
        out_marks.push(marks[i]);
        out_periods.push(periods[i]);
        out_voiced.push(voiced[i]);
    }

    if out_marks.is_empty() {
        warn!(len, "analyze_pitch_marks: buffer produced no marks");
    } else {
        debug!(
            count = out_marks.len(),
            voiced = out_voiced.iter().filter(|v| **v).count(),
            "analyze_pitch_marks done"
        );
    }

    Ok(PsolaAnalysis {
        pitch_marks: out_marks,
        pitch_periods: out_periods,
        voiced_flags: out_voiced,
        sample_rate,
    })
}

fn frame_rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = frame.iter().map(|x| x * x).sum();
    (sum_sq / frame.len() as f32).sqrt()
}

/// Normalized autocorrelation peak within `[min_lag, max_lag]`, refined by
/// parabolic interpolation. Returns `None` if the frame has no energy.
fn autocorrelation_peak(frame: &[f32], min_lag: usize, max_lag: usize) -> Option<(usize, f32)> {
    let energy: f32 = frame.iter().map(|x| x * x).sum();
    if energy < 1e-12 {
        return None;
    }

    let mut best_lag = min_lag;
    let mut best_val = f32::MIN;
    for lag in min_lag..=max_lag {
        let mut acc = 0.0f32;
        for i in 0..frame.len().saturating_sub(lag) {
            acc += frame[i] * frame[i + lag];
        }
        let normalized = acc / energy;
        if normalized > best_val {
            best_val = normalized;
            best_lag = lag;
        }
    }

    Some((best_lag, best_val))
}

/// Snap a candidate mark to the loudest sample within `±25%` of `period`.
fn snap_to_energy_maximum(samples: &[f32], center: usize, period: usize) -> usize {
    let radius = ((period as f64 * 0.25).round() as usize).max(1);
    let last = samples.len().saturating_sub(1);
    let center = center.min(last);
    let lo = center.saturating_sub(radius);
    let hi = (center + radius).min(last);

    let mut best_idx = center;
    let mut best_val = samples[center] * samples[center];
    for i in lo..=hi {
        let e = samples[i] * samples[i];
        if e > best_val {
            best_val = e;
            best_idx = i;
        }
    }
    best_idx
}
