//! Baseline-noise outlier rejection and tone splitting.
//!
//! Two passes over the whole recording:
//!
//! ```text
//! pass 1   every trial  →  (rms, p2p) over [0, stim_onset)
//!          pooled over ALL sessions  →  BaselineStats (mean, std; ddof = 0)
//! pass 2   every trial  →  keep iff rms <= rms_mean + z·rms_std
//!                               and p2p <= p2p_mean + z·p2p_std
//! ```
//!
//! Thresholds are global, not per session.  Pass 2 only starts once pass 1
//! has seen every trial of every session.
use ndarray::{s, Array2, ArrayView, ArrayView1, ArrayView2, ArrayView3, Axis, Dimension};
use rayon::prelude::*;

use crate::error::{LfpError, Result};
use crate::trials::CleanedTrials;

/// Pooled baseline statistics over every trial of every session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineStats {
    pub rms_mean: f64,
    pub rms_std: f64,
    pub p2p_mean: f64,
    pub p2p_std: f64,
}

impl BaselineStats {
    /// `(rms_thr, p2p_thr)` for multiplier `z`.
    ///
    /// A zero standard deviation collapses the threshold onto the mean for
    /// every `z`, including `z = ∞`.
    pub fn thresholds(&self, z: f64) -> (f64, f64) {
        let thr = |mean: f64, std: f64| if std == 0.0 { mean } else { mean + z * std };
        (thr(self.rms_mean, self.rms_std), thr(self.p2p_mean, self.p2p_std))
    }
}

/// Baseline RMS and peak-to-peak of one baseline segment.
pub fn baseline_rms_p2p(baseline: ArrayView1<'_, f64>) -> (f64, f64) {
    let n = baseline.len() as f64;
    let rms = (baseline.iter().map(|&v| v * v).sum::<f64>() / n).sqrt();
    let (lo, hi) = baseline
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    (rms, hi - lo)
}

/// Population mean and standard deviation (`ddof = 0`).
fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn check_onset(stim_onset: usize, n_samples: usize) -> Result<()> {
    if stim_onset == 0 || stim_onset > n_samples {
        return Err(LfpError::Configuration(format!(
            "stim_onset must satisfy 0 < stim_onset <= {n_samples}, got {stim_onset}"
        )));
    }
    Ok(())
}

/// Pass 1: pooled baseline statistics.
///
/// `trials` may have any number of leading dimensions; the last axis is
/// samples.  Every lane along that axis counts as one trial.
pub fn compute_baseline_metrics<D: Dimension>(
    trials: ArrayView<'_, f64, D>,
    stim_onset: usize,
) -> Result<BaselineStats> {
    let ndim = trials.ndim();
    if ndim == 0 {
        return Err(LfpError::DataShape("trial tensor has no sample axis".into()));
    }
    let sample_axis = Axis(ndim - 1);
    check_onset(stim_onset, trials.len_of(sample_axis))?;

    let lanes: Vec<ArrayView1<'_, f64>> = trials.lanes(sample_axis).into_iter().collect();
    if lanes.is_empty() {
        return Err(LfpError::DataShape("no trials to compute baseline statistics".into()));
    }

    let (rms, p2p): (Vec<f64>, Vec<f64>) = lanes
        .par_iter()
        .map(|lane| baseline_rms_p2p(lane.slice(s![..stim_onset])))
        .unzip();

    let (rms_mean, rms_std) = mean_std(&rms);
    let (p2p_mean, p2p_std) = mean_std(&p2p);
    log::debug!(
        "baseline stats over {} trials: rms {rms_mean:.4} ± {rms_std:.4}, p2p {p2p_mean:.4} ± {p2p_std:.4}",
        lanes.len()
    );
    Ok(BaselineStats { rms_mean, rms_std, p2p_mean, p2p_std })
}

/// Pass 2: keep/reject mask, shape `[S, T]`, `true` = keep.
///
/// A trial is kept iff both its baseline RMS and P2P are `<=` their
/// thresholds.  There is no tolerance: with a constant baseline everywhere
/// the thresholds equal the means and only trials exactly at the mean pass.
pub fn build_signal_mask(
    trials: ArrayView3<'_, f64>,
    stim_onset: usize,
    stats: &BaselineStats,
    z: f64,
) -> Result<Array2<bool>> {
    let (n_s, n_t, n_x) = trials.dim();
    check_onset(stim_onset, n_x)?;
    let (rms_thr, p2p_thr) = stats.thresholds(z);

    let keep: Vec<bool> = (0..n_s * n_t)
        .into_par_iter()
        .map(|i| {
            let base = trials.slice(s![i / n_t, i % n_t, ..stim_onset]);
            let (rms, p2p) = baseline_rms_p2p(base);
            rms <= rms_thr && p2p <= p2p_thr
        })
        .collect();

    Array2::from_shape_vec((n_s, n_t), keep)
        .map_err(|e| LfpError::DataShape(format!("mask shape: {e}")))
}

/// Apply `mask` along the trial axis of every session, preserving order.
pub fn apply_mask_per_session(
    trials: ArrayView3<'_, f64>,
    tones: ArrayView2<'_, f64>,
    mask: &Array2<bool>,
) -> Result<CleanedTrials> {
    let (n_s, n_t, n_x) = trials.dim();
    if tones.dim() != (n_s, n_t) || mask.dim() != (n_s, n_t) {
        return Err(LfpError::DataShape(format!(
            "trials ({n_s}, {n_t}), tones {:?} and mask {:?} disagree",
            tones.dim(),
            mask.dim()
        )));
    }

    let n_kept = mask.iter().filter(|&&k| k).count();
    let mut flat = Vec::with_capacity(n_kept * n_x);
    let mut kept_tones = Vec::with_capacity(n_kept);
    let mut ranges = Vec::with_capacity(n_s);

    for s_idx in 0..n_s {
        let start = kept_tones.len();
        for t_idx in 0..n_t {
            if mask[[s_idx, t_idx]] {
                flat.extend(trials.slice(s![s_idx, t_idx, ..]).iter().copied());
                kept_tones.push(tones[[s_idx, t_idx]]);
            }
        }
        ranges.push(start..kept_tones.len());
    }

    let arena = Array2::from_shape_vec((n_kept, n_x), flat)
        .map_err(|e| LfpError::DataShape(format!("cleaned arena shape: {e}")))?;
    CleanedTrials::from_parts(arena, kept_tones, ranges)
}

/// Low/high split of one session.
#[derive(Debug, Clone)]
pub struct ToneSplit {
    /// `[n_low, N]` trials labelled with the smaller tone code.
    pub low: Array2<f64>,
    /// `[n_high, N]` trials labelled with the larger tone code.
    pub high: Array2<f64>,
    pub low_tone: f64,
    pub high_tone: f64,
}

/// Split one session's trials by tone.
///
/// The session must carry exactly two distinct tone codes; zero, one, or
/// more than two fail with [`LfpError::DataShape`], as does a NaN code.
pub fn split_by_tone(trials: ArrayView2<'_, f64>, tones: &[f64]) -> Result<ToneSplit> {
    if trials.nrows() != tones.len() {
        return Err(LfpError::DataShape(format!(
            "{} trials but {} tone labels",
            trials.nrows(),
            tones.len()
        )));
    }
    if tones.iter().any(|t| t.is_nan()) {
        return Err(LfpError::DataShape("tone labels contain NaN".into()));
    }

    let mut uniq = tones.to_vec();
    uniq.sort_by(|a, b| a.total_cmp(b));
    uniq.dedup();
    if uniq.len() != 2 {
        return Err(LfpError::DataShape(format!(
            "expected exactly 2 distinct tone values, found {} ({uniq:?})",
            uniq.len()
        )));
    }
    let (low_tone, high_tone) = (uniq[0], uniq[1]);

    let rows_with = |tone: f64| -> Vec<usize> {
        tones.iter().enumerate().filter(|&(_, &t)| t == tone).map(|(i, _)| i).collect()
    };
    let low = trials.select(Axis(0), &rows_with(low_tone));
    let high = trials.select(Axis(0), &rows_with(high_tone));

    Ok(ToneSplit { low, high, low_tone, high_tone })
}

/// Per-session split metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneInfo {
    /// 1-based session number.
    pub session: usize,
    pub low_tone: f64,
    pub high_tone: f64,
    pub n_low: usize,
    pub n_high: usize,
}

/// One session after tone splitting.
#[derive(Debug, Clone)]
pub struct SessionSplit {
    pub info: ToneInfo,
    pub low: Array2<f64>,
    pub high: Array2<f64>,
}

/// Split every session of `cleaned` into low/high groups.
pub fn split_all_sessions_by_tone(cleaned: &CleanedTrials) -> Result<Vec<SessionSplit>> {
    (0..cleaned.n_sessions())
        .map(|s_idx| {
            let (trials, tones) = cleaned.session(s_idx);
            let split = split_by_tone(trials, tones).map_err(|e| match e {
                LfpError::DataShape(msg) => {
                    LfpError::DataShape(format!("session {}: {msg}", s_idx + 1))
                }
                other => other,
            })?;
            let info = ToneInfo {
                session: s_idx + 1,
                low_tone: split.low_tone,
                high_tone: split.high_tone,
                n_low: split.low.nrows(),
                n_high: split.high.nrows(),
            };
            log::debug!(
                "session {}: low tone {} × {} trials, high tone {} × {} trials",
                info.session, info.low_tone, info.n_low, info.high_tone, info.n_high
            );
            Ok(SessionSplit { info, low: split.low, high: split.high })
        })
        .collect()
}
