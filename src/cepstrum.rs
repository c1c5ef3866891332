//! Cepstral spectral envelope extraction, shared by formant preservation
//! (spec.md §4.2.1) and spectral smoothing (spec.md §4.3).
//!
//! The lifter is a symmetric raised-cosine taper folded around the
//! cepstrum's midpoint, since a real-valued source signal makes the
//! cepstrum itself symmetric (`cep[N-k] == cep[k]`) — so the "keep low
//! quefrency, taper, zero the middle, mirror back near N" shape in the
//! spec collapses to one taper function evaluated at `min(k, N-k)`.

use std::f32::consts::PI;

use crate::fft;

/// `L ≈ sample_rate / 1000`, the spec's default lifter order.
pub fn default_lifter_order(sample_rate: u32) -> usize {
    ((sample_rate as f64 / 1000.0).round().max(1.0)) as usize
}

/// Extract the magnitude spectral envelope of one time-domain frame via
/// cepstral liftering (spec.md §4.2.1). `frame` is zero-padded or
/// truncated to `fft_size`. Returns `fft_size` magnitude values.
pub fn spectral_envelope(frame: &[f32], fft_size: usize, lifter_order: usize) -> Vec<f32> {
    let plan = match fft::plan_for(fft_size) {
        Ok(plan) => plan,
        Err(_) => return vec![0.0; fft_size],
    };

    let mut re: Vec<f32> = (0..fft_size).map(|i| frame.get(i).copied().unwrap_or(0.0)).collect();
    let mut im = vec![0.0f32; fft_size];
    plan.forward_split(&mut re, &mut im);

    const EPS: f32 = 1e-10;
    let mut log_mag: Vec<f32> = re
        .iter()
        .zip(im.iter())
        .map(|(r, i)| ((r * r + i * i).sqrt() + EPS).ln())
        .collect();
    let mut cep_im = vec![0.0f32; fft_size];
    plan.inverse_split(&mut log_mag, &mut cep_im);

    let w = 4usize.min(lifter_order / 2);
    apply_lifter(&mut log_mag, lifter_order, w);

    let mut env_im = vec![0.0f32; fft_size];
    plan.forward_split(&mut log_mag, &mut env_im);

    log_mag.into_iter().map(|v| v.exp()).collect()
}

fn apply_lifter(cep: &mut [f32], l: usize, w: usize) {
    let n = cep.len();
    for (k, c) in cep.iter_mut().enumerate() {
        let folded = k.min(n - k);
        *c *= taper(folded, l, w);
    }
}

fn taper(k: usize, l: usize, w: usize) -> f32 {
    if w == 0 {
        return if k <= l { 1.0 } else { 0.0 };
    }
    let low = l.saturating_sub(w);
    if k <= low {
        return 1.0;
    }
    if k > l {
        return 0.0;
    }
    let t = (k - low) as f32 / w as f32;
    0.5 * (1.0 + (PI * t).cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI as PIF;

    fn sine_frame(freq: f32, sample_rate: u32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PIF * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn envelope_is_finite_and_nonnegative() {
        let frame = sine_frame(220.0, 44100, 2048);
        let lifter = default_lifter_order(44100);
        let envelope = spectral_envelope(&frame, 2048, lifter);
        assert_eq!(envelope.len(), 2048);
        assert!(envelope.iter().all(|v| v.is_finite() && *v >= 0.0));
    }

    #[test]
    fn silence_produces_finite_envelope() {
        let frame = vec![0.0f32; 2048];
        let lifter = default_lifter_order(44100);
        let envelope = spectral_envelope(&frame, 2048, lifter);
        assert!(envelope.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn shorter_frame_is_zero_padded_without_panicking() {
        let frame = sine_frame(220.0, 44100, 512);
        let envelope = spectral_envelope(&frame, 2048, 44);
        assert_eq!(envelope.len(), 2048);
    }

    #[test]
    fn default_lifter_order_tracks_sample_rate() {
        assert_eq!(default_lifter_order(44100), 44);
        assert_eq!(default_lifter_order(22050), 22);
    }
}
