//! Zero-phase IIR application matching `scipy.signal.filtfilt(b, a, x)`.
//!
//! ```text
//! padlen = 3 · max(len(a), len(b))
//! ext    = odd-extend(x, padlen)           2·x[0] − x[padlen..1], x, 2·x[-1] − x[-2..]
//! zi     = lfilter_zi(b, a)                steady-state of a unit step
//! y      = lfilter(b, a, ext,     zi · ext[0])
//! y      = lfilter(b, a, rev(y),  zi · y[-1])
//! out    = rev(y)[padlen .. padlen + len(x)]
//! ```
//!
//! The forward and backward passes cancel each other's phase, so the
//! response has zero group delay and magnitude `|H|²`.
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;

use super::design::IirCoeffs;
use crate::error::{LfpError, Result};
use crate::outliers::{SessionSplit, ToneInfo};

/// `b` and `a` zero-padded to a common length.
fn padded(coeffs: &IirCoeffs) -> (Vec<f64>, Vec<f64>) {
    let n = coeffs.ntaps();
    let mut b = coeffs.b.clone();
    let mut a = coeffs.a.clone();
    b.resize(n, 0.0);
    a.resize(n, 0.0);
    (b, a)
}

/// Initial state for a step response steady state (`scipy.signal.lfilter_zi`).
///
/// Solves `(I − Cᵀ)·zi = b[1:] − a[1:]·b[0]` where `C` is the companion
/// matrix of `a`.
pub fn lfilter_zi(coeffs: &IirCoeffs) -> Result<Vec<f64>> {
    let (b, a) = padded(coeffs);
    let m = b.len() - 1;
    if m == 0 {
        return Ok(vec![]);
    }

    let i_minus_a = DMatrix::from_fn(m, m, |i, j| {
        let mut v = if i == j { 1.0 } else { 0.0 };
        if j == 0 {
            v += a[i + 1];
        }
        if j == i + 1 {
            v -= 1.0;
        }
        v
    });
    let rhs = DVector::from_fn(m, |i, _| b[i + 1] - a[i + 1] * b[0]);

    let zi = i_minus_a.lu().solve(&rhs).ok_or_else(|| {
        LfpError::NumericInstability("steady-state system for lfilter_zi is singular".into())
    })?;
    Ok(zi.iter().copied().collect())
}

/// Direct-form II transposed IIR filter (`scipy.signal.lfilter`).
///
/// `zi` seeds the delay line; `None` starts from rest.
pub fn lfilter(coeffs: &IirCoeffs, x: &[f64], zi: Option<&[f64]>) -> Vec<f64> {
    let (b, a) = padded(coeffs);
    let m = b.len() - 1;
    let mut z = match zi {
        Some(zi) => zi.to_vec(),
        None => vec![0.0; m],
    };
    z.resize(m, 0.0);

    x.iter()
        .map(|&xn| {
            let yn = b[0] * xn + z.first().copied().unwrap_or(0.0);
            for i in 0..m {
                let next = if i + 1 < m { z[i + 1] } else { 0.0 };
                z[i] = b[i + 1] * xn + next - a[i + 1] * yn;
            }
            yn
        })
        .collect()
}

/// Edge length used by [`filtfilt`] for `coeffs`.
#[inline]
pub fn filtfilt_padlen(coeffs: &IirCoeffs) -> usize {
    3 * coeffs.ntaps()
}

/// Odd extension: `2·x[0] − x[n..=1]` before, `2·x[-1] − x[-2..]` after.
fn odd_ext(x: &[f64], n: usize) -> Vec<f64> {
    let len = x.len();
    let first = x[0];
    let last = x[len - 1];
    let mut out = Vec::with_capacity(len + 2 * n);
    out.extend((1..=n).rev().map(|i| 2.0 * first - x[i]));
    out.extend_from_slice(x);
    out.extend((1..=n).map(|i| 2.0 * last - x[len - 1 - i]));
    out
}

fn filtfilt_with_zi(coeffs: &IirCoeffs, zi: &[f64], x: &[f64]) -> Result<Vec<f64>> {
    let edge = filtfilt_padlen(coeffs);
    if x.len() <= edge {
        return Err(LfpError::DataShape(format!(
            "trial of {} samples is too short for zero-phase filtering (needs > {edge})",
            x.len()
        )));
    }

    let ext = odd_ext(x, edge);
    let z0: Vec<f64> = zi.iter().map(|&v| v * ext[0]).collect();
    let mut y = lfilter(coeffs, &ext, Some(&z0));

    y.reverse();
    let z0: Vec<f64> = zi.iter().map(|&v| v * y[0]).collect();
    let mut y = lfilter(coeffs, &y, Some(&z0));
    y.reverse();

    Ok(y[edge..edge + x.len()].to_vec())
}

/// Zero-phase filter a single trial.  Output has the input's length.
///
/// # Errors
///
/// [`LfpError::DataShape`] if `x.len() <= 3 · max(len(a), len(b))`.
pub fn filtfilt(coeffs: &IirCoeffs, x: &[f64]) -> Result<Vec<f64>> {
    let zi = lfilter_zi(coeffs)?;
    filtfilt_with_zi(coeffs, &zi, x)
}

/// [`filtfilt`] on an `ndarray` trial.
pub fn apply_filter(trial: ArrayView1<'_, f64>, coeffs: &IirCoeffs) -> Result<Array1<f64>> {
    let x: Vec<f64> = trial.to_vec();
    filtfilt(coeffs, &x).map(Array1::from)
}

/// Zero-phase filter every row of a `[n_trials, N]` group independently.
///
/// Rows are filtered in parallel; the output keeps trial order.
pub fn apply_filter_trials(trials: ArrayView2<'_, f64>, coeffs: &IirCoeffs) -> Result<Array2<f64>> {
    let (n_tr, n_x) = trials.dim();
    if n_tr == 0 {
        return Ok(Array2::zeros((0, n_x)));
    }
    let zi = lfilter_zi(coeffs)?;

    let rows: Vec<Vec<f64>> = (0..n_tr)
        .into_par_iter()
        .map(|i| filtfilt_with_zi(coeffs, &zi, &trials.row(i).to_vec()))
        .collect::<Result<_>>()?;

    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n_tr, n_x), flat)
        .map_err(|e| LfpError::DataShape(format!("filtered group shape: {e}")))
}

/// Low/high groups of one session after zero-phase filtering.
#[derive(Debug, Clone)]
pub struct FilteredSession {
    pub info: ToneInfo,
    pub low: Array2<f64>,
    pub high: Array2<f64>,
}

/// Filter the low and high group of every session with the shared `coeffs`.
pub fn filter_sessions(splits: &[SessionSplit], coeffs: &IirCoeffs) -> Result<Vec<FilteredSession>> {
    splits
        .iter()
        .map(|split| {
            Ok(FilteredSession {
                info: split.info,
                low: apply_filter_trials(split.low.view(), coeffs)?,
                high: apply_filter_trials(split.high.view(), coeffs)?,
            })
        })
        .collect()
}
