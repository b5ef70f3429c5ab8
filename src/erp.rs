//! Event-related potential: baseline correction, averaging, peak and PSD.
//!
//! `baseline_correct`  — per trial: x[t] −= mean(x[0 .. stim_onset])
//! `compute_erp`       — mean over baseline-corrected trials
//! `peak_amp_latency`  — most negative ERP sample inside a window
//! `erp_psd`           — Welch PSD of the ERP up to `max_freq`
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{LfpError, Result};
use crate::spectral::{welch, Psd};

/// Trial-averaged, baseline-corrected response.
#[derive(Debug, Clone)]
pub struct Erp {
    /// `[N]` averaged response.
    pub erp: Array1<f64>,
    /// `[N]` sample times in ms from trial start.
    pub t_ms: Array1<f64>,
}

/// Amplitude and latency of the ERP trough.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub amplitude: f64,
    /// Latency relative to stimulus onset, in ms.  Negative before onset.
    pub latency_ms: f64,
    /// Sample index of the peak from trial start.
    pub index: usize,
}

/// Subtract each trial's pre-stimulus mean.  `trials`: `[n_trials, N]`.
pub fn baseline_correct(trials: ArrayView2<'_, f64>, stim_onset: usize) -> Result<Array2<f64>> {
    let n_x = trials.ncols();
    if stim_onset == 0 || stim_onset > n_x {
        return Err(LfpError::Configuration(format!(
            "stim_onset must satisfy 0 < stim_onset <= {n_x}, got {stim_onset}"
        )));
    }
    let mut out = trials.to_owned();
    for mut row in out.rows_mut() {
        let m = row.slice(s![..stim_onset]).mean().unwrap_or(0.0);
        row.mapv_inplace(|v| v - m);
    }
    Ok(out)
}

/// Baseline-correct every trial, then average across trials.
///
/// # Errors
///
/// [`LfpError::DataShape`] for an empty group; [`LfpError::Configuration`]
/// for an out-of-range `stim_onset` or non-positive `fs`.
pub fn compute_erp(trials: ArrayView2<'_, f64>, stim_onset: usize, fs: f64) -> Result<Erp> {
    if trials.nrows() == 0 {
        return Err(LfpError::DataShape("cannot average an empty trial group".into()));
    }
    if !(fs.is_finite() && fs > 0.0) {
        return Err(LfpError::Configuration(format!("fs must be finite and > 0, got {fs}")));
    }
    let corrected = baseline_correct(trials, stim_onset)?;
    let erp = corrected
        .mean_axis(Axis(0))
        .ok_or_else(|| LfpError::DataShape("empty trial group".into()))?;
    let t_ms = Array1::from_shape_fn(erp.len(), |i| i as f64 / fs * 1000.0);
    Ok(Erp { erp, t_ms })
}

/// Most negative ERP sample in `[win_start_ms, win_end_ms)`, where the
/// window is measured from trial start and clamped to the ERP length.
///
/// Ties resolve to the earliest sample.  Latency is reported relative to
/// `stim_onset`.
pub fn peak_amp_latency(
    erp: ArrayView1<'_, f64>,
    fs: f64,
    stim_onset: usize,
    win_start_ms: f64,
    win_end_ms: f64,
) -> Result<Peak> {
    let to_idx = |ms: f64| ((ms / 1000.0 * fs).max(0.0) as usize).min(erp.len());
    let (start, end) = (to_idx(win_start_ms), to_idx(win_end_ms));
    if start >= end {
        return Err(LfpError::Configuration(format!(
            "peak window [{win_start_ms}, {win_end_ms}) ms selects no samples of a {}-sample ERP",
            erp.len()
        )));
    }

    let (local, &amplitude) = erp
        .slice(s![start..end])
        .into_iter()
        .enumerate()
        .fold(None, |best: Option<(usize, &f64)>, (i, v)| match best {
            Some((_, b)) if !(v < b) => best,
            _ => Some((i, v)),
        })
        .ok_or_else(|| LfpError::DataShape("empty peak window".into()))?;

    let index = start + local;
    let latency_ms = (index as f64 - stim_onset as f64) / fs * 1000.0;
    Ok(Peak { amplitude, latency_ms, index })
}

/// Welch PSD of an ERP, restricted to `freq <= max_freq`.
pub fn erp_psd(erp: ArrayView1<'_, f64>, fs: f64, max_freq: f64, nperseg: usize) -> Result<Psd> {
    let x: Vec<f64> = erp.to_vec();
    Ok(welch(&x, fs, nperseg)?.truncate(max_freq))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array2};

    #[test]
    fn erp_removes_per_trial_offsets() {
        // Two trials with different DC offsets but the same evoked dip.
        let trials = Array2::from_shape_fn((2, 10), |(r, t)| {
            let offset = if r == 0 { 5.0 } else { -3.0 };
            offset + if t == 6 { -2.0 } else { 0.0 }
        });
        let erp = compute_erp(trials.view(), 4, 1000.0).unwrap();
        for (t, &v) in erp.erp.iter().enumerate() {
            let exp = if t == 6 { -2.0 } else { 0.0 };
            approx::assert_abs_diff_eq!(v, exp, epsilon = 1e-12);
        }
        approx::assert_abs_diff_eq!(erp.t_ms[3], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_group_is_shape_error() {
        let trials = Array2::<f64>::zeros((0, 10));
        assert!(matches!(compute_erp(trials.view(), 4, 1000.0), Err(LfpError::DataShape(_))));
    }

    #[test]
    fn peak_latency_relative_to_onset() {
        // fs = 1 kHz → 1 sample per ms.
        let erp = arr1(&[0.0, 0.0, -1.0, 0.0, -4.0, 0.0, -4.0, 0.0, -9.0, 0.0]);
        let p = peak_amp_latency(erp.view(), 1000.0, 2, 1.0, 8.0).unwrap();
        assert_eq!(p.amplitude, -4.0);
        assert_eq!(p.index, 4);
        approx::assert_abs_diff_eq!(p.latency_ms, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn peak_window_clamped_and_validated() {
        let erp = arr1(&[0.0, -1.0, -2.0]);
        let p = peak_amp_latency(erp.view(), 1000.0, 0, 0.0, 100.0).unwrap();
        assert_eq!(p.index, 2);
        assert!(peak_amp_latency(erp.view(), 1000.0, 0, 5.0, 100.0).is_err());
    }
}
