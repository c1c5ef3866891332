use crate::autotune::{FRAME_LENGTH, HOP_LENGTH, MAX_F0, MIN_F0, PYIN_SIGMA, PYIN_THRESHOLD};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PYINData {
    f0: Vec<f32>,
    voiced_flag: Vec<bool>,
    voiced_prob: Vec<f32>,
}

impl PYINData {
    pub fn new(f0: Vec<f32>, voiced_flag: Vec<bool>, voiced_prob: Vec<f32>) -> Self {
        Self {
            f0,
            voiced_flag,
            voiced_prob,
        }
    }
    pub fn f0(&self) -> &Vec<f32> {
        &self.f0
    }

    pub fn voiced_flag(&self) -> &Vec<bool> {
        &self.voiced_flag
    }

    pub fn voiced_prob(&self) -> &Vec<f32> {
        &self.voiced_prob
    }
}

/// Simple RMS energy of a frame, used for voicing / silence detection.
/// Suggested by AI
fn frame_rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = frame.iter().map(|x| x * x).sum();
    (sum_sq / frame.len() as f32).sqrt()
}

fn difference_function(frame: &[f32], max_lag: usize) -> Vec<f32> {
    let n = frame.len();
    let mut d = vec![0.0; max_lag];

    for tau in 1..max_lag {
        let mut acc = 0.0;
        for i in 0..(n - tau) {
            let diff = frame[i] - frame[i + tau];
            acc += diff * diff;
        }
        d[tau] = acc;
    }
    d
}
fn cumulative_mean_normalized_difference(d: &[f32], max_lag: usize) -> Vec<f32> {
    let mut cmnd = vec![0.0; max_lag];
    let mut running_sum = 0.0;

    for tau in 1..max_lag {
        running_sum += d[tau];
        cmnd[tau] = if running_sum > 0.0 {
            d[tau] * (tau as f32) / running_sum
        } else {
            0.0
        };
    }

    cmnd
}

fn parabolic_interp(cmnd: &[f32], tau: usize) -> f32 {
    let x0 = cmnd[tau - 1];
    let x1 = cmnd[tau];
    let x2 = cmnd[tau + 1];
    let denom = 2.0 * (2.0 * x1 - x2 - x0);
    if denom.abs() < 1e-9 {
        tau as f32
    } else {
        tau as f32 + (x2 - x0) / denom
    }
}

fn find_pitch_candidates(
    cmnd: &[f32],
    threshold: f32,
    min_lag: usize,
    max_lag: usize,
    sample_rate: u32,
) -> (Vec<f32>, Vec<f32>) {
    let mut f0s = Vec::new();
    let mut ps = Vec::new();

    let mut found = false;
    for tau in (min_lag + 1)..(max_lag - 1) {
        if found {
            break;
        }

        let v = cmnd[tau];
        if v < threshold && v < cmnd[tau - 1] && v <= cmnd[tau + 1] {
            found = true;

            let refined_tau = parabolic_interp(cmnd, tau);
            let f0 = sample_rate as f32 / refined_tau;
            let p = (1.0 - v).clamp(0.0, 1.0);

            f0s.push(f0);
            ps.push(p);
        }
    }

    if f0s.is_empty() {
        (vec![0.0], vec![0.0])
    } else {
        (f0s, ps)
    }
}

fn probabilistic_f0_selection(
    f0_candidates: &[f32],
    candidate_probs: &[f32],
    sigma: f32,
    previous_f0: Option<f32>,
) -> (f32, bool, f32) {
    if f0_candidates.is_empty() {
        return (0.0, false, 0.0);
    }
    let mut best_score = 0.0;
    let mut best_f0_i: usize = 0;
    let mut continuity: f32;
    let mut score: f32;
    let sigma2 = sigma * sigma;

    for i in 0..f0_candidates.len() {
        let candidate = f0_candidates[i];

        // Hard octave / subharmonic guard
        if let Some(pf0) = previous_f0 {
            if pf0 > 0.0 {
                let ratio = candidate / pf0;
                if ratio < 0.7 || ratio > 1.5 {
                    continue; // skip this candidate entirely
                }
            }
        }
        let prob = candidate_probs[i];
        let continuity = if let Some(pf0) = previous_f0 {
            if pf0 > 0.0 && candidate > 0.0 {
                let ratio = candidate / pf0;
                let octave_distance = ratio.log2();
                (-0.5 * (octave_distance * octave_distance) / sigma2).exp()
            } else {
                1.0
            }
        } else {
            1.0
        };
        score = prob * continuity;
        if score > best_score {
            best_score = score;
            best_f0_i = i;
        }
    }
    // WARNING: Need to add threshold as a parameter to control voiced/unvoiced decision
    let voiced_flag = best_score > 0.5;
    (f0_candidates[best_f0_i], voiced_flag, best_score)
}

pub fn pyin(
    signal: &[f32],
    sample_rate: u32,
    frame_length: Option<usize>,
    hop_length: Option<usize>,
    fmin: Option<f32>,
    fmax: Option<f32>,
    threshold: Option<f32>,
    sigma: Option<f32>,
) -> PYINData {
    let frame_length = frame_length.unwrap_or(FRAME_LENGTH);
    let hop_length = hop_length.unwrap_or(HOP_LENGTH);
    let fmin = fmin.unwrap_or(MIN_F0);
    let fmax = fmax.unwrap_or(MAX_F0);
    let min_lag = (sample_rate as f32 / fmax).floor() as usize;
    let max_lag = (sample_rate as f32 / fmin).ceil() as usize;
    let threshold = threshold.unwrap_or(PYIN_THRESHOLD);
    let sigma = sigma.unwrap_or(PYIN_SIGMA);
    debug!(
        frame_length,
        hop_length, fmin, fmax, min_lag, max_lag, threshold, sigma, "PYIN parameters"
    );

    if signal.len() < frame_length {
        return PYINData {
            f0: Vec::new(),
            voiced_flag: Vec::new(),
            voiced_prob: Vec::new(),
        };
    }

    let n_frames = (signal.len() - frame_length) / hop_length + 1;

    let mut f0 = vec![0.0; n_frames];
    let mut voiced_flag = vec![false; n_frames];
    let mut voiced_prob = vec![0.0; n_frames];
    let mut previous_f0: Option<f32> = None;

    // Simple global RMS to derive a silence threshold.
    let global_rms = frame_rms(signal);
    let silence_rms_threshold = global_rms * 0.02 + 1e-6;
    for i in 0..n_frames {
        let start = i * hop_length;
        let end = start + frame_length;
        let frame = &signal[start..end];

        // Silence / very low energy handling: mark as unvoiced directly.
        let frame_energy = frame_rms(frame);
        if frame_energy < silence_rms_threshold {
            f0[i] = 0.0;
            voiced_flag[i] = false;
            voiced_prob[i] = 0.0;
            previous_f0 = None;
            continue;
        }

        if max_lag <= min_lag + 2 || max_lag >= frame_length {
            f0[i] = 0.0;
            voiced_flag[i] = false;
            voiced_prob[i] = 0.0;
            previous_f0 = None;
            continue;
        }

        let d = difference_function(frame, max_lag);
        let cmnd = cumulative_mean_normalized_difference(&d, max_lag);
        let (f0_candidates, candidate_probs) =
            find_pitch_candidates(&cmnd, threshold, min_lag, max_lag, sample_rate);
        let (best_f0, is_voiced, best_prob) =
            probabilistic_f0_selection(&f0_candidates, &candidate_probs, sigma, previous_f0);

        // Additional guard: reject obviously out-of-range or unstable f0 as unvoiced.
        let mut final_f0 = best_f0;
        let mut final_voiced = is_voiced;
        let mut final_prob = best_prob;

        if !final_voiced || final_f0 <= 0.0 || final_f0 < fmin * 0.8 || final_f0 > fmax * 1.2 {
            final_f0 = 0.0;
            final_voiced = false;
            final_prob = 0.0;
            previous_f0 = None;
        } else {
            previous_f0 = Some(final_f0);
        }

        f0[i] = final_f0;
        voiced_flag[i] = final_voiced;
        voiced_prob[i] = final_prob;
    }

    PYINData {
        f0,
        voiced_flag,
        voiced_prob,
    }
}
