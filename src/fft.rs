//! Radix-2 Cooley-Tukey FFT primitives (spec.md §9 "FFT").
//!
//! Iterative, in-place, decimation-in-time, with twiddle factors and the
//! bit-reversal permutation cached per size behind a process-wide plan
//! cache (mirroring the `RwLock`-guarded cache shape `rf-dsp`'s IR
//! spectrum cache uses, minus the disk persistence — nothing here needs
//! to survive a process restart).
//!
//! Two storage layouts are supported because two call sites in this crate
//! want different ones: interleaved `[re, im, re, im, ...]` for the
//! envelope/smoothing code that keeps full complex spectra around, and
//! split real/imaginary arrays for the cepstrum code, which starts from a
//! purely real signal.

use crate::error::{EngineError, EngineResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::f32::consts::PI;
use std::sync::{Arc, OnceLock};

use crate::types::WindowType;

/// A cached FFT plan for one transform size: the bit-reversal permutation
/// and the forward twiddle factors, both computed once and reused by every
/// transform of that size.
pub struct FftPlan {
    size: usize,
    log2_size: u32,
    bit_rev: Vec<u32>,
    /// `twiddles[k] = (cos(-2*pi*k/size), sin(-2*pi*k/size))` for `k in 0..size/2`.
    twiddles: Vec<(f32, f32)>,
}

impl FftPlan {
    pub fn new(size: usize) -> EngineResult<Self> {
        if size == 0 || !size.is_power_of_two() {
            return Err(EngineError::InvalidInput(format!(
                "fft size must be a power of two, got {size}"
            )));
        }
        let log2_size = size.trailing_zeros();
        let bit_rev = (0..size as u32)
            .map(|i| i.reverse_bits() >> (32 - log2_size))
            .collect();
        let twiddles = (0..size / 2)
            .map(|k| {
                let angle = -2.0 * PI * k as f32 / size as f32;
                (angle.cos(), angle.sin())
            })
            .collect();
        Ok(Self {
            size,
            log2_size,
            bit_rev,
            twiddles,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn butterfly(&self, re: &mut [f32], im: &mut [f32], inverse: bool) {
        let n = self.size;
        let mut m = 2usize;
        while m <= n {
            let half = m / 2;
            let stride = n / m;
            let mut start = 0;
            while start < n {
                for k in 0..half {
                    let (tw_re, tw_im_fwd) = self.twiddles[k * stride];
                    let tw_im = if inverse { -tw_im_fwd } else { tw_im_fwd };
                    let a = start + k;
                    let b = a + half;
                    let br = re[b] * tw_re - im[b] * tw_im;
                    let bi = re[b] * tw_im + im[b] * tw_re;
                    let ar = re[a];
                    let ai = im[a];
                    re[a] = ar + br;
                    im[a] = ai + bi;
                    re[b] = ar - br;
                    im[b] = ai - bi;
                }
                start += m;
            }
            m <<= 1;
        }
        if inverse {
            let scale = 1.0 / n as f32;
            for v in re.iter_mut() {
                *v *= scale;
            }
            for v in im.iter_mut() {
                *v *= scale;
            }
        }
    }

    fn permute_split(&self, re: &mut [f32], im: &mut [f32]) {
        for i in 0..self.size {
            let j = self.bit_rev[i] as usize;
            if j > i {
                re.swap(i, j);
                im.swap(i, j);
            }
        }
    }

    /// Forward transform on split real/imaginary arrays, in place.
    pub fn forward_split(&self, re: &mut [f32], im: &mut [f32]) {
        debug_assert_eq!(re.len(), self.size);
        debug_assert_eq!(im.len(), self.size);
        self.permute_split(re, im);
        self.butterfly(re, im, false);
    }

    /// Inverse transform on split real/imaginary arrays, in place
    /// (includes the `1/N` scale).
    pub fn inverse_split(&self, re: &mut [f32], im: &mut [f32]) {
        debug_assert_eq!(re.len(), self.size);
        debug_assert_eq!(im.len(), self.size);
        self.permute_split(re, im);
        self.butterfly(re, im, true);
    }

    /// Forward transform on an interleaved `[re, im, re, im, ...]` buffer,
    /// in place.
    pub fn forward_interleaved(&self, buf: &mut [f32]) {
        debug_assert_eq!(buf.len(), 2 * self.size);
        let (mut re, mut im) = deinterleave(buf, self.size);
        self.forward_split(&mut re, &mut im);
        reinterleave(buf, &re, &im);
    }

    /// Inverse transform on an interleaved buffer, in place.
    pub fn inverse_interleaved(&self, buf: &mut [f32]) {
        debug_assert_eq!(buf.len(), 2 * self.size);
        let (mut re, mut im) = deinterleave(buf, self.size);
        self.inverse_split(&mut re, &mut im);
        reinterleave(buf, &re, &im);
    }
}

fn deinterleave(buf: &[f32], n: usize) -> (Vec<f32>, Vec<f32>) {
    let mut re = Vec::with_capacity(n);
    let mut im = Vec::with_capacity(n);
    for chunk in buf.chunks_exact(2) {
        re.push(chunk[0]);
        im.push(chunk[1]);
    }
    (re, im)
}

fn reinterleave(buf: &mut [f32], re: &[f32], im: &[f32]) {
    for (chunk, (r, i)) in buf.chunks_exact_mut(2).zip(re.iter().zip(im.iter())) {
        chunk[0] = *r;
        chunk[1] = *i;
    }
}

type PlanCache = RwLock<HashMap<usize, Arc<FftPlan>>>;
static PLAN_CACHE: OnceLock<PlanCache> = OnceLock::new();

/// Fetch (or build and cache) the FFT plan for `size`.
pub fn plan_for(size: usize) -> EngineResult<Arc<FftPlan>> {
    let cache = PLAN_CACHE.get_or_init(|| RwLock::new(HashMap::new()));
    if let Some(plan) = cache.read().get(&size) {
        return Ok(Arc::clone(plan));
    }
    let plan = Arc::new(FftPlan::new(size)?);
    cache.write().insert(size, Arc::clone(&plan));
    Ok(plan)
}

/// Build an analysis/synthesis window of the given type and length.
pub fn window(kind: WindowType, len: usize) -> Vec<f32> {
    if len == 0 {
        return Vec::new();
    }
    if len == 1 {
        return vec![1.0];
    }
    let n = len as f32 - 1.0;
    match kind {
        WindowType::Hann => (0..len)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / n).cos())
            .collect(),
        WindowType::Hamming => (0..len)
            .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f32 / n).cos())
            .collect(),
        WindowType::Triangular => {
            let half = n / 2.0;
            (0..len)
                .map(|i| 1.0 - ((i as f32 - half) / half).abs())
                .collect()
        }
    }
}

/// Window-sum-normalized overlap-add accumulator (spec.md §4.1.2 step 5,
/// reused by formant correction and spectral smoothing). Grains are added
/// at arbitrary (possibly negative or past-the-end) positions; contributions
/// outside `[0, len)` are silently clipped. `finish` divides by the
/// accumulated squared-window energy wherever it exceeds `1e-6`, leaving
/// untouched (zero) samples where no grain ever overlapped.
pub struct OlaAccum {
    data: Vec<f32>,
    window_sum: Vec<f32>,
}

impl OlaAccum {
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
            window_sum: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Add `grain[i] * win[i]` into the accumulator at `start + i`, for
    /// every `i` where that index falls inside the accumulator's bounds.
    pub fn add(&mut self, start: isize, grain: &[f32], win: &[f32]) {
        let n = grain.len().min(win.len());
        for i in 0..n {
            let pos = start + i as isize;
            if pos < 0 || pos as usize >= self.data.len() {
                continue;
            }
            let pos = pos as usize;
            let w = win[i];
            self.data[pos] += grain[i] * w;
            self.window_sum[pos] += w * w;
        }
    }

    pub fn finish(mut self) -> Vec<f32> {
        for (sample, wsum) in self.data.iter_mut().zip(self.window_sum.iter()) {
            if *wsum > 1e-6 {
                *sample /= wsum;
            }
        }
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn energy(re: &[f32], im: &[f32]) -> f32 {
        re.iter().zip(im).map(|(r, i)| r * r + i * i).sum()
    }

    #[test]
    fn parseval_theorem_holds() {
        let plan = FftPlan::new(64).unwrap();
        let mut re: Vec<f32> = (0..64)
            .map(|i| (i as f32 * 0.37).sin() + 0.1 * (i as f32 * 1.9).cos())
            .collect();
        let mut im = vec![0.0; 64];
        let time_energy = energy(&re, &im);

        plan.forward_split(&mut re, &mut im);
        let freq_energy = energy(&re, &im) / 64.0;

        assert!((time_energy - freq_energy).abs() < 1e-3);
    }

    #[test]
    fn dc_input_produces_dc_bin_only() {
        let plan = FftPlan::new(16).unwrap();
        let mut re = vec![1.0f32; 16];
        let mut im = vec![0.0f32; 16];
        plan.forward_split(&mut re, &mut im);
        assert!((re[0] - 16.0).abs() < 1e-3);
        for k in 1..16 {
            assert!(re[k].abs() < 1e-3);
            assert!(im[k].abs() < 1e-3);
        }
    }

    #[test]
    fn impulse_produces_flat_spectrum() {
        let plan = FftPlan::new(32).unwrap();
        let mut re = vec![0.0f32; 32];
        re[0] = 1.0;
        let mut im = vec![0.0f32; 32];
        plan.forward_split(&mut re, &mut im);
        for k in 0..32 {
            assert!((re[k] - 1.0).abs() < 1e-5);
            assert!(im[k].abs() < 1e-5);
        }
    }

    #[test]
    fn forward_then_inverse_round_trips() {
        let plan = FftPlan::new(128).unwrap();
        let original: Vec<f32> = (0..128).map(|i| (i as f32 * 0.05).sin()).collect();
        let mut re = original.clone();
        let mut im = vec![0.0f32; 128];
        plan.forward_split(&mut re, &mut im);
        plan.inverse_split(&mut re, &mut im);
        for (a, b) in original.iter().zip(re.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
        for v in im {
            assert!(v.abs() < 1e-4);
        }
    }

    #[test]
    fn interleaved_matches_split() {
        let plan = FftPlan::new(32).unwrap();
        let signal: Vec<f32> = (0..32).map(|i| (i as f32 * 0.2).cos()).collect();

        let mut re = signal.clone();
        let mut im = vec![0.0f32; 32];
        plan.forward_split(&mut re, &mut im);

        let mut interleaved = vec![0.0f32; 64];
        for (i, s) in signal.iter().enumerate() {
            interleaved[2 * i] = *s;
        }
        plan.forward_interleaved(&mut interleaved);

        for k in 0..32 {
            assert!((interleaved[2 * k] - re[k]).abs() < 1e-3);
            assert!((interleaved[2 * k + 1] - im[k]).abs() < 1e-3);
        }
    }

    #[test]
    fn rejects_non_power_of_two() {
        assert!(FftPlan::new(100).is_err());
    }

    #[test]
    fn windows_share_length_and_range_invariants() {
        for kind in [WindowType::Hann, WindowType::Hamming, WindowType::Triangular] {
            let w = window(kind, 256);
            assert_eq!(w.len(), 256);
            for &v in &w {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn ola_accum_normalizes_overlap_energy() {
        let win = window(WindowType::Hann, 8);
        let mut accum = OlaAccum::new(16);
        let grain = vec![1.0f32; 8];
        accum.add(0, &grain, &win);
        accum.add(4, &grain, &win);
        let out = accum.finish();
        assert_eq!(out.len(), 16);
        for v in out {
            assert!(v.is_finite());
        }
    }
}
