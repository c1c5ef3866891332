//! Loudness analysis and normalization (spec.md §4.4).

use tracing::debug;

use crate::types::LoudnessAnalysis;

const SILENCE_RMS_FLOOR: f32 = 1e-6;

/// Tunables for [`normalization_gain`] (spec.md §4.4.2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationOpts {
    pub target_rms_db: f32,
    pub median_rms_db: Option<f32>,
    pub min_gain_db: f32,
    pub max_gain_db: f32,
    pub max_peak_db: f32,
    pub knee_db: f32,
    pub join_threshold_db: f32,
}

impl Default for NormalizationOpts {
    fn default() -> Self {
        Self {
            target_rms_db: -18.0,
            median_rms_db: None,
            min_gain_db: -24.0,
            max_gain_db: 24.0,
            max_peak_db: -0.3,
            knee_db: 6.0,
            join_threshold_db: 3.0,
        }
    }
}

fn to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// RMS/peak/crest-factor analysis of a buffer (spec.md §4.4.1). Never fails.
pub fn analyze_loudness(samples: &[f32]) -> LoudnessAnalysis {
    if samples.is_empty() {
        return LoudnessAnalysis {
            rms: 0.0,
            rms_db: f32::NEG_INFINITY,
            peak: 0.0,
            peak_db: f32::NEG_INFINITY,
            crest_factor: 0.0,
            has_content: false,
        };
    }

    let sum_sq: f32 = samples.iter().map(|x| x * x).sum();
    let rms = (sum_sq / samples.len() as f32).sqrt();
    let peak = samples.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
    let has_content = rms >= SILENCE_RMS_FLOOR;
    let crest_factor = if rms > 0.0 { peak / rms } else { 0.0 };

    LoudnessAnalysis {
        rms,
        rms_db: to_db(rms),
        peak,
        peak_db: to_db(peak),
        crest_factor,
        has_content,
    }
}

/// Linear gain to apply to a buffer with the given `analysis` so its RMS
/// approaches the target loudness without exceeding the peak ceiling
/// (spec.md §4.4.2). Order is fixed: clamp the requested RMS gain first,
/// then evaluate the peak ceiling, then apply the soft/hard knee.
pub fn normalization_gain(analysis: &LoudnessAnalysis, opts: &NormalizationOpts) -> f32 {
    if !analysis.has_content {
        return 1.0;
    }

    let target = opts.median_rms_db.unwrap_or(opts.target_rms_db);
    let g_rms = (target - analysis.rms_db).clamp(opts.min_gain_db, opts.max_gain_db);

    let projected_peak_db = analysis.peak_db + g_rms;
    let g_db = if projected_peak_db > opts.max_peak_db {
        let required_reduction = projected_peak_db - opts.max_peak_db;
        let applied_reduction = if required_reduction > opts.knee_db {
            opts.knee_db + 0.5 * (required_reduction - opts.knee_db)
        } else {
            required_reduction
        };
        g_rms - applied_reduction
    } else {
        g_rms
    };

    debug!(g_rms, g_db, "normalization_gain");
    10f32.powf(g_db / 20.0)
}

/// Median RMS (dB) across analyses with content; falls back to
/// `opts.target_rms_db` if none have content (spec.md §4.4.3).
pub fn median_rms_db(analyses: &[LoudnessAnalysis], opts: &NormalizationOpts) -> f32 {
    let mut values: Vec<f32> = analyses
        .iter()
        .filter(|a| a.has_content)
        .map(|a| a.rms_db)
        .collect();
    if values.is_empty() {
        return opts.target_rms_db;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}

/// Additional linear gain ramp to apply across a join's overlap region so a
/// crossfade between two differently normalized clips reads as equal
/// energy (spec.md §4.4.4). Returns `None` when the loudness difference is
/// already within `opts.join_threshold_db`.
pub fn join_gain_correction(gain_a: f32, gain_b: f32, opts: &NormalizationOpts) -> Option<f32> {
    let db_a = to_db(gain_a);
    let db_b = to_db(gain_b);
    let diff = (db_b - db_a).abs();
    if diff <= opts.join_threshold_db {
        return None;
    }
    Some(10f32.powf((db_a - db_b) / 20.0))
}
