//! Cepstral formant preservation (spec.md §4.2.2): re-shapes PSOLA output
//! so vowel formants stay near their original frequencies instead of
//! following the pitch shift.

use crate::cepstrum;
use crate::fft::{self, OlaAccum};
use crate::types::WindowType;

/// Tunables for [`apply_formant_preservation`] (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormantOpts {
    pub fft_size: usize,
    pub hop_size: usize,
    pub lifter_order: Option<usize>,
    /// `0.0` fully preserves original formants; `>= 1.0` disables
    /// correction entirely (formants follow pitch, spec's fast path);
    /// values in between partially warp the reference envelope.
    pub formant_scale: f32,
}

impl Default for FormantOpts {
    fn default() -> Self {
        let fft_size = 2048;
        Self {
            fft_size,
            hop_size: fft_size / 4,
            lifter_order: None,
            formant_scale: 0.0,
        }
    }
}

/// Correct the spectral envelope of `shifted` (PSOLA output) to match
/// `orig`'s formants (spec.md §4.2.2). `orig` and `shifted` are assumed to
/// be time-aligned (pitch-shift only, no time-stretch). Never fails.
pub fn apply_formant_preservation(
    orig: &[f32],
    shifted: &[f32],
    sample_rate: u32,
    pitch_shift_semitones: f32,
    opts: &FormantOpts,
) -> Vec<f32> {
    if opts.formant_scale >= 1.0 {
        return shifted.to_vec();
    }

    let fft_size = opts.fft_size;
    let Ok(plan) = fft::plan_for(fft_size) else {
        return shifted.to_vec();
    };
    let lifter_order = opts
        .lifter_order
        .unwrap_or_else(|| cepstrum::default_lifter_order(sample_rate));
    let window = fft::window(WindowType::Hann, fft_size);

    let output_len = shifted.len();
    let mut accum = OlaAccum::new(output_len);

    let mut start: isize = 0;
    while (start as usize) < output_len || start == 0 {
        let orig_frame = windowed_frame(orig, start, fft_size, &window);
        let shifted_frame = windowed_frame(shifted, start, fft_size, &window);

        let mut e_orig = cepstrum::spectral_envelope(&orig_frame, fft_size, lifter_order);
        if opts.formant_scale > 0.0 {
            e_orig = warp_envelope(&e_orig, pitch_shift_semitones * opts.formant_scale);
        }
        let e_shift = cepstrum::spectral_envelope(&shifted_frame, fft_size, lifter_order);

        let mut re = shifted_frame.clone();
        let mut im = vec![0.0f32; fft_size];
        plan.forward_split(&mut re, &mut im);

        const EPS: f32 = 1e-10;
        for k in 0..fft_size {
            let gain = (e_orig[k] / (e_shift[k] + EPS)).clamp(0.1, 10.0);
            re[k] *= gain;
            im[k] *= gain;
        }

        plan.inverse_split(&mut re, &mut im);
        let synthesis: Vec<f32> = re.iter().zip(window.iter()).map(|(s, w)| s * w).collect();
        accum.add(start, &synthesis, &window);

        if output_len == 0 {
            break;
        }
        start += opts.hop_size as isize;
    }

    accum.finish()
}

fn windowed_frame(signal: &[f32], start: isize, fft_size: usize, window: &[f32]) -> Vec<f32> {
    (0..fft_size)
        .map(|i| {
            let idx = start + i as isize;
            let sample = if idx < 0 || idx as usize >= signal.len() {
                0.0
            } else {
                signal[idx as usize]
            };
            sample * window.get(i).copied().unwrap_or(0.0)
        })
        .collect()
}

/// Frequency-warp an envelope by `semitones`, linearly interpolating
/// across bins and mirroring the upper half so the result stays conjugate
/// symmetric (spec.md §4.2.2).
fn warp_envelope(envelope: &[f32], semitones: f32) -> Vec<f32> {
    let n = envelope.len();
    if n == 0 {
        return Vec::new();
    }
    let ratio = 2f32.powf(semitones / 12.0);
    let half = n / 2;
    let mut out = vec![0.0f32; n];
    for (k, slot) in out.iter_mut().take(half + 1).enumerate() {
        *slot = interp_bin(envelope, k as f32 / ratio, half);
    }
    for k in (half + 1)..n {
        out[k] = out[n - k];
    }
    out
}

fn interp_bin(envelope: &[f32], pos: f32, half: usize) -> f32 {
    if pos <= 0.0 {
        return envelope[0];
    }
    if pos >= half as f32 {
        return envelope[half];
    }
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(half);
    let frac = pos - lo as f32;
    envelope[lo] * (1.0 - frac) + envelope[hi] * frac
}
