//! Pitch-synchronous synthesis (spec.md §4.1.2).
//!
//! Generalizes the teacher's `overlap_add`, which re-spaced PYIN-derived
//! marks by a target/original F0 ratio, into grain spacing driven directly
//! by a pitch-shift-in-semitones and a time-stretch factor, with the
//! window-sum normalization folded into the shared [`crate::fft::OlaAccum`].

use crate::fft;
use crate::types::{PsolaAnalysis, WindowType};

/// Parameters for [`psola_synthesize`] (spec.md §4.1.2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsolaSynthesisOpts {
    pub pitch_shift_semitones: f32,
    pub time_stretch: f64,
    pub window_type: WindowType,
}

impl Default for PsolaSynthesisOpts {
    fn default() -> Self {
        Self {
            pitch_shift_semitones: 0.0,
            time_stretch: 1.0,
            window_type: WindowType::default(),
        }
    }
}

/// Pitch-shift and/or time-stretch `sample` using its precomputed
/// [`PsolaAnalysis`] (spec.md §4.1.2). Never fails: an empty analysis or
/// zero-length output simply produces silence.
pub fn psola_synthesize(sample: &[f32], analysis: &PsolaAnalysis, opts: &PsolaSynthesisOpts) -> Vec<f32> {
    let len = sample.len();
    let is_identity =
        opts.pitch_shift_semitones == 0.0 && (opts.time_stretch - 1.0).abs() < 1e-9;
    if is_identity {
        return sample.to_vec();
    }

    let output_len = (len as f64 * opts.time_stretch).ceil() as usize;
    if output_len == 0 || analysis.is_empty() {
        return vec![0.0; output_len];
    }

    let alpha = 2f64.powf(-(opts.pitch_shift_semitones as f64) / 12.0);
    let marks = &analysis.pitch_marks;
    let periods = &analysis.pitch_periods;
    let voiced = &analysis.voiced_flags;

    let mut accum = fft::OlaAccum::new(output_len);
    let mut t_out: f64 = 0.0;
    let mut mark_idx = 0usize;

    while (t_out.round() as usize) < output_len {
        let t_in = t_out / opts.time_stretch;
        mark_idx = nearest_mark_index(marks, t_in, mark_idx);

        let period = periods[mark_idx];
        let mark = marks[mark_idx];
        let grain_len = 2 * period;
        let window = fft::window(opts.window_type, grain_len);
        let grain = extract_grain(sample, mark as isize - period as isize, grain_len);

        let out_start = t_out.round() as isize - period as isize;
        accum.add(out_start, &grain, &window);

        let advance = if voiced[mark_idx] {
            alpha * period as f64
        } else {
            period as f64
        };
        t_out += advance.max(1.0);
    }

    accum.finish()
}

/// Locate the analysis mark nearest `t_in`, clamping to the first/last mark
/// rather than extrapolating. `hint` is the previously returned index;
/// since `t_in` only increases across a synthesis run this lets the search
/// walk forward instead of restarting from zero each step.
fn nearest_mark_index(marks: &[usize], t_in: f64, hint: usize) -> usize {
    let last = marks.len() - 1;
    if t_in <= marks[0] as f64 {
        return 0;
    }
    if t_in >= marks[last] as f64 {
        return last;
    }

    let mut idx = hint.min(last.saturating_sub(1));
    while idx + 1 <= last && (marks[idx + 1] as f64) <= t_in {
        idx += 1;
    }
    if idx >= last {
        return last;
    }
    let dist_lo = t_in - marks[idx] as f64;
    let dist_hi = marks[idx + 1] as f64 - t_in;
    if dist_hi < dist_lo {
        idx + 1
    } else {
        idx
    }
}

/// Read a grain of `len` samples starting at `start`, zero-padding any part
/// that falls outside `[0, sample.len())`.
fn extract_grain(sample: &[f32], start: isize, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let idx = start + i as isize;
            if idx < 0 || idx as usize >= sample.len() {
                0.0
            } else {
                sample[idx as usize]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psola::analysis::{analyze_pitch_marks, PsolaAnalysisOpts};
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: u32, duration_s: f64) -> Vec<f32> {
        let n = (duration_s * sample_rate as f64).round() as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn identity_fast_path_is_bit_identical() {
        let sr = 44100;
        let signal = sine(200.0, sr, 0.1);
        let analysis = analyze_pitch_marks(&signal, sr, &PsolaAnalysisOpts::default()).unwrap();
        let output = psola_synthesize(&signal, &analysis, &PsolaSynthesisOpts::default());
        assert_eq!(output, signal);
    }

    #[test]
    fn time_stretch_changes_length_by_the_expected_ratio() {
        let sr = 44100;
        let signal = sine(200.0, sr, 0.1);
        let analysis = analyze_pitch_marks(&signal, sr, &PsolaAnalysisOpts::default()).unwrap();
        let opts = PsolaSynthesisOpts {
            time_stretch: 1.5,
            ..PsolaSynthesisOpts::default()
        };
        let output = psola_synthesize(&signal, &analysis, &opts);
        let expected = (signal.len() as f64 * 1.5).ceil() as usize;
        assert_eq!(output.len(), expected);
    }

    #[test]
    fn output_has_no_nan_or_inf() {
        let sr = 44100;
        let signal = sine(200.0, sr, 0.1);
        let analysis = analyze_pitch_marks(&signal, sr, &PsolaAnalysisOpts::default()).unwrap();
        let opts = PsolaSynthesisOpts {
            pitch_shift_semitones: 12.0,
            time_stretch: 1.3,
            ..PsolaSynthesisOpts::default()
        };
        let output = psola_synthesize(&signal, &analysis, &opts);
        assert!(output.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn output_peak_bounded_relative_to_input() {
        let sr = 44100;
        let signal = sine(200.0, sr, 0.2);
        let input_peak = signal.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
        let analysis = analyze_pitch_marks(&signal, sr, &PsolaAnalysisOpts::default()).unwrap();
        let opts = PsolaSynthesisOpts {
            pitch_shift_semitones: 7.0,
            ..PsolaSynthesisOpts::default()
        };
        let output = psola_synthesize(&signal, &analysis, &opts);
        let output_peak = output.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
        assert!(output_peak <= 2.0 * input_peak + 1e-3);
    }

    #[test]
    fn silent_input_stays_silent() {
        let samples = vec![0.0f32; 4410];
        let analysis = analyze_pitch_marks(&samples, 44100, &PsolaAnalysisOpts::default()).unwrap();
        let opts = PsolaSynthesisOpts {
            time_stretch: 1.2,
            ..PsolaSynthesisOpts::default()
        };
        let output = psola_synthesize(&samples, &analysis, &opts);
        assert!(output.iter().all(|&s| s == 0.0));
    }
}
