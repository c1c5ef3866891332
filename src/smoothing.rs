//! Spectral smoothing at sample joins (spec.md §4.3) and the spectral
//! distance metric used to decide whether smoothing is worth doing at all
//! (spec.md §4.3.1).

use crate::cepstrum;
use crate::fft;
use crate::types::WindowType;

/// Tunables for [`apply_spectral_smoothing`] (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingOpts {
    pub fft_size: usize,
    pub lifter_order: Option<usize>,
    pub distance_threshold: f32,
}

impl Default for SmoothingOpts {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            lifter_order: None,
            distance_threshold: 0.1,
        }
    }
}

/// Log-magnitude spectral distance between two envelopes over bins
/// `[1, N/2]` (spec.md §4.3.1).
pub fn spectral_distance(envelope_a: &[f32], envelope_b: &[f32]) -> f32 {
    const EPS: f32 = 1e-10;
    let half = envelope_a.len() / 2;
    if half == 0 {
        return 0.0;
    }
    let mut acc = 0.0f32;
    let mut count = 0usize;
    for k in 1..=half.min(envelope_b.len().saturating_sub(1)).max(1) {
        if k >= envelope_a.len() || k >= envelope_b.len() {
            break;
        }
        acc += ((envelope_a[k] + EPS).ln() - (envelope_b[k] + EPS).ln()).abs();
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        acc / count as f32
    }
}

/// Blend the spectral envelopes of `tail_a`'s end and `head_b`'s start so
/// the timbral discontinuity at their join is less abrupt (spec.md §4.3).
/// Modifies both buffers in place. A no-op (fast path) when either buffer
/// is too short, empty, or `spectral_distance` is already below
/// `opts.distance_threshold`.
pub fn apply_spectral_smoothing(
    tail_a: &mut [f32],
    head_b: &mut [f32],
    sample_rate: u32,
    spectral_distance: f32,
    opts: &SmoothingOpts,
) {
    let n = opts.fft_size;
    if tail_a.len() < n || head_b.len() < n || tail_a.is_empty() || head_b.is_empty() {
        return;
    }
    if spectral_distance < opts.distance_threshold {
        return;
    }
    let Ok(plan) = fft::plan_for(n) else {
        return;
    };

    let lifter_order = opts
        .lifter_order
        .unwrap_or_else(|| cepstrum::default_lifter_order(sample_rate));
    let analysis_window = fft::window(WindowType::Hann, n);

    let tail_region = &tail_a[tail_a.len() - n..];
    let head_region = &head_b[..n];

    let windowed_tail: Vec<f32> = tail_region.iter().zip(&analysis_window).map(|(s, w)| s * w).collect();
    let windowed_head: Vec<f32> = head_region.iter().zip(&analysis_window).map(|(s, w)| s * w).collect();

    let e_a = cepstrum::spectral_envelope(&windowed_tail, n, lifter_order);
    let e_b = cepstrum::spectral_envelope(&windowed_head, n, lifter_order);
    let e_mid: Vec<f32> = e_a.iter().zip(&e_b).map(|(a, b)| (a * b).max(0.0).sqrt()).collect();

    let normalized_distance = spectral_distance.min(1.0);
    let peak_blend = 0.5 * normalized_distance;

    let corrected_tail = corrected_frame(&plan, tail_region, &e_a, &e_mid);
    let corrected_head = corrected_frame(&plan, head_region, &e_b, &e_mid);

    let last = (n - 1).max(1) as f32;
    let tail_start = tail_a.len() - n;
    for i in 0..n {
        let ramp = peak_blend * (i as f32 / last);
        tail_a[tail_start + i] = (1.0 - ramp) * tail_region[i] + ramp * corrected_tail[i];
    }
    for i in 0..n {
        let ramp = peak_blend * (1.0 - i as f32 / last);
        head_b[i] = (1.0 - ramp) * head_region[i] + ramp * corrected_head[i];
    }
}

/// Refilter `frame` so its envelope moves from `source_envelope` toward
/// `target_envelope`, via a direct (unwindowed) FFT/gain/IFFT pass.
fn corrected_frame(
    plan: &fft::FftPlan,
    frame: &[f32],
    source_envelope: &[f32],
    target_envelope: &[f32],
) -> Vec<f32> {
    const EPS: f32 = 1e-10;
    let n = frame.len();
    let mut re = frame.to_vec();
    let mut im = vec![0.0f32; n];
    plan.forward_split(&mut re, &mut im);

    for k in 0..n {
        let gain = (target_envelope[k] / (source_envelope[k] + EPS)).clamp(0.25, 2.0);
        re[k] *= gain;
        im[k] *= gain;
    }

    plan.inverse_split(&mut re, &mut im);
    re
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: u32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn below_threshold_distance_is_a_no_op() {
        let mut tail = sine(200.0, 44100, 4096);
        let mut head = sine(200.0, 44100, 4096);
        let tail_before = tail.clone();
        let head_before = head.clone();
        apply_spectral_smoothing(&mut tail, &mut head, 44100, 0.01, &SmoothingOpts::default());
        assert_eq!(tail, tail_before);
        assert_eq!(head, head_before);
    }

    #[test]
    fn short_buffers_are_untouched() {
        let mut tail = vec![0.1f32; 100];
        let mut head = vec![0.1f32; 100];
        let before_tail = tail.clone();
        let before_head = head.clone();
        apply_spectral_smoothing(&mut tail, &mut head, 44100, 1.0, &SmoothingOpts::default());
        assert_eq!(tail, before_tail);
        assert_eq!(head, before_head);
    }

    #[test]
    fn empty_buffers_are_untouched() {
        let mut tail: Vec<f32> = Vec::new();
        let mut head: Vec<f32> = Vec::new();
        apply_spectral_smoothing(&mut tail, &mut head, 44100, 1.0, &SmoothingOpts::default());
        assert!(tail.is_empty() && head.is_empty());
    }

    #[test]
    fn smoothing_never_amplifies_energy_beyond_4x() {
        let mut tail = sine(200.0, 44100, 4096);
        let mut head = sine(800.0, 44100, 4096);
        let tail_rms_before = rms(&tail);
        let head_rms_before = rms(&head);

        apply_spectral_smoothing(&mut tail, &mut head, 44100, 1.0, &SmoothingOpts::default());

        assert!(tail.iter().all(|v| v.is_finite()));
        assert!(head.iter().all(|v| v.is_finite()));
        assert!(rms(&tail) <= 4.0 * tail_rms_before + 1e-6);
        assert!(rms(&head) <= 4.0 * head_rms_before + 1e-6);
    }

    #[test]
    fn silence_stays_silent_and_finite() {
        let mut tail = vec![0.0f32; 4096];
        let mut head = vec![0.0f32; 4096];
        apply_spectral_smoothing(&mut tail, &mut head, 44100, 1.0, &SmoothingOpts::default());
        assert!(tail.iter().all(|v| v.is_finite()));
        assert!(head.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn distance_of_identical_envelopes_is_zero() {
        let e = vec![1.0f32; 64];
        assert_eq!(spectral_distance(&e, &e), 0.0);
    }

    fn rms(s: &[f32]) -> f32 {
        (s.iter().map(|x| x * x).sum::<f32>() / s.len() as f32).sqrt()
    }
}
