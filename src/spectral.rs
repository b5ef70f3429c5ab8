//! Segment-based spectral estimation shared by the ERP and TFR analyses.
//!
//! Follows `scipy.signal._spectral_helper` with `boundary=None`,
//! `padded=False`, `detrend='constant'`, one-sided output and
//! `scaling='density'`:
//!
//! ```text
//! step    = nperseg − noverlap
//! n_seg   = (len − noverlap) / step
//! seg_k   = x[k·step .. k·step + nperseg] − mean
//! P_k(f)  = |rfft(w · seg_k)|² / (fs · Σw²)      (×2 except DC and even-n Nyquist)
//! t_k     = (nperseg / 2 + k·step) / fs
//! ```
use std::f64::consts::PI;

use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{LfpError, Result};

/// Periodic Hann window (`scipy.signal.get_window('hann', n)`).
pub fn hann_periodic(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

/// Periodic Tukey window (`scipy.signal.get_window(('tukey', alpha), n)`).
///
/// Computed as the symmetric window of length `n + 1` with the last sample
/// dropped.
pub fn tukey_periodic(n: usize, alpha: f64) -> Vec<f64> {
    if n == 0 {
        return vec![];
    }
    if alpha <= 0.0 {
        return vec![1.0; n];
    }
    if alpha >= 1.0 {
        return hann_periodic(n);
    }
    let m = n + 1;
    let denom = (m - 1) as f64;
    let width = (alpha * denom / 2.0).floor() as usize;
    (0..n)
        .map(|i| {
            let x = i as f64;
            if i <= width {
                0.5 * (1.0 + (PI * (-1.0 + 2.0 * x / alpha / denom)).cos())
            } else if i < m - width - 1 {
                1.0
            } else {
                0.5 * (1.0 + (PI * (-2.0 / alpha + 1.0 + 2.0 * x / alpha / denom)).cos())
            }
        })
        .collect()
}

/// One-sided frequency axis for an `nfft`-point transform.
pub fn rfft_freqs(nfft: usize, fs: f64) -> Vec<f64> {
    (0..=nfft / 2).map(|k| k as f64 * fs / nfft as f64).collect()
}

/// Per-segment one-sided power spectral densities.
#[derive(Debug, Clone)]
pub struct SegmentPsd {
    /// `[n_freqs]` in Hz.
    pub freqs: Vec<f64>,
    /// `[n_segments]` segment centres in seconds.
    pub times: Vec<f64>,
    /// `[n_freqs, n_segments]` density.
    pub power: Array2<f64>,
}

/// Density PSD of every `window.len()`-sample segment of `x`.
///
/// # Errors
///
/// [`LfpError::DataShape`] if `x` is shorter than one segment;
/// [`LfpError::Configuration`] if `noverlap >= window.len()` or `fs <= 0`.
pub fn segment_psd(x: &[f64], fs: f64, window: &[f64], noverlap: usize) -> Result<SegmentPsd> {
    let nperseg = window.len();
    if nperseg == 0 || noverlap >= nperseg {
        return Err(LfpError::Configuration(format!(
            "noverlap ({noverlap}) must be smaller than nperseg ({nperseg})"
        )));
    }
    if !(fs.is_finite() && fs > 0.0) {
        return Err(LfpError::Configuration(format!("fs must be finite and > 0, got {fs}")));
    }
    if x.len() < nperseg {
        return Err(LfpError::DataShape(format!(
            "signal of {} samples is shorter than one {nperseg}-sample segment",
            x.len()
        )));
    }

    let step = nperseg - noverlap;
    let n_seg = (x.len() - noverlap) / step;
    let n_freq = nperseg / 2 + 1;
    let scale = 1.0 / (fs * window.iter().map(|w| w * w).sum::<f64>());

    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft = planner.plan_fft_forward(nperseg);

    let mut power = Array2::<f64>::zeros((n_freq, n_seg));
    let mut buf: Vec<Complex<f64>> = vec![Complex::default(); nperseg];
    for k in 0..n_seg {
        let seg = &x[k * step..k * step + nperseg];
        let mean = seg.iter().sum::<f64>() / nperseg as f64;
        for ((b, &v), &w) in buf.iter_mut().zip(seg).zip(window) {
            *b = Complex { re: (v - mean) * w, im: 0.0 };
        }
        fft.process(&mut buf);

        for (f, bin) in buf[..n_freq].iter().enumerate() {
            let doubled = f != 0 && !(nperseg % 2 == 0 && f == nperseg / 2);
            let p = bin.norm_sqr() * scale;
            power[[f, k]] = if doubled { 2.0 * p } else { p };
        }
    }

    let half = nperseg as f64 / 2.0;
    let times = (0..n_seg).map(|k| (half + (k * step) as f64) / fs).collect();
    Ok(SegmentPsd { freqs: rfft_freqs(nperseg, fs), times, power })
}

/// One-sided power spectral density.
#[derive(Debug, Clone)]
pub struct Psd {
    pub freqs: Vec<f64>,
    pub power: Vec<f64>,
}

impl Psd {
    /// Keep only bins with `freq <= max_freq`.
    pub fn truncate(self, max_freq: f64) -> Self {
        let keep = self.freqs.iter().take_while(|&&f| f <= max_freq).count();
        Self {
            freqs: self.freqs[..keep].to_vec(),
            power: self.power[..keep].to_vec(),
        }
    }
}

/// Welch's averaged periodogram (`scipy.signal.welch(x, fs, nperseg=nperseg)`).
///
/// Periodic Hann window, 50 % overlap.  `nperseg` is clamped to `x.len()`.
pub fn welch(x: &[f64], fs: f64, nperseg: usize) -> Result<Psd> {
    if x.is_empty() {
        return Err(LfpError::DataShape("cannot estimate the PSD of an empty signal".into()));
    }
    let nperseg = nperseg.min(x.len());
    let window = hann_periodic(nperseg);
    let seg = segment_psd(x, fs, &window, nperseg / 2)?;

    let n_seg = seg.power.ncols() as f64;
    let power = seg.power.rows().into_iter().map(|row| row.sum() / n_seg).collect();
    Ok(Psd { freqs: seg.freqs, power })
}
