//! IIR Butterworth low-pass design matching `scipy.signal.butter(N, Wn)`.
//!
//! For order `N` and normalised cutoff `Wn = cutoff_hz / nyquist`:
//!   • analog prototype poles  p_m = −exp(iπ·m / 2N),  m = −N+1, −N+3, …, N−1
//!   • pre-warp               ω = 4·tan(π·Wn / 2)       (bilinear at fs = 2)
//!   • scale                  p ← ω·p,  k = ωᴺ
//!   • bilinear               z_p = (4 + p) / (4 − p),  N zeros at −1,
//!                            k ← k · Re(1 / ∏(4 − p))
//!   • expand                 b = k·poly(zeros),  a = poly(poles)
use std::f64::consts::PI;

use rustfft::num_complex::Complex64;

use crate::error::{LfpError, Result};

/// Transfer-function coefficients `b(z) / a(z)`, highest power first, with
/// `a[0] == 1`.
///
/// Designed once and shared read-only by every trial of every session.
#[derive(Debug, Clone, PartialEq)]
pub struct IirCoeffs {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

impl IirCoeffs {
    /// Wrap raw coefficients, normalising so that `a[0] == 1`.
    pub fn new(b: Vec<f64>, a: Vec<f64>) -> Result<Self> {
        let a0 = match a.first() {
            Some(&v) if v != 0.0 && v.is_finite() => v,
            _ => {
                return Err(LfpError::Configuration(
                    "denominator must be non-empty with a finite, non-zero a[0]".into(),
                ))
            }
        };
        if b.is_empty() {
            return Err(LfpError::Configuration("numerator must be non-empty".into()));
        }
        if b.iter().chain(a.iter()).any(|v| !v.is_finite()) {
            return Err(LfpError::NumericInstability("non-finite filter coefficient".into()));
        }
        Ok(Self {
            b: b.iter().map(|v| v / a0).collect(),
            a: a.iter().map(|v| v / a0).collect(),
        })
    }

    /// Number of taps of the longer polynomial.
    #[inline]
    pub fn ntaps(&self) -> usize {
        self.a.len().max(self.b.len())
    }

    /// Schur–Cohn stability test: `true` iff every pole lies strictly inside
    /// the unit circle.
    ///
    /// Runs the step-down (backward Levinson) recursion on the denominator;
    /// the filter is stable iff every reflection coefficient has `|k| < 1`.
    pub fn is_stable(&self) -> bool {
        let mut a = self.a.clone();
        while a.len() > 1 {
            let m = a.len() - 1;
            let k = a[m];
            if !(k.abs() < 1.0) {
                return false;
            }
            let denom = 1.0 - k * k;
            a = (0..m).map(|i| (a[i] - k * a[m - i]) / denom).collect();
        }
        true
    }

    /// Complex response `H(e^{iω})` at normalised angular frequency `omega`
    /// (radians per sample).
    pub fn response(&self, omega: f64) -> Complex64 {
        let eval = |c: &[f64]| {
            c.iter()
                .enumerate()
                .map(|(k, &v)| v * Complex64::from_polar(1.0, -omega * k as f64))
                .sum::<Complex64>()
        };
        eval(&self.b) / eval(&self.a)
    }

    /// Magnitude response at `freq_hz` for sampling rate `fs`.
    pub fn gain_at(&self, freq_hz: f64, fs: f64) -> f64 {
        self.response(2.0 * PI * freq_hz / fs).norm()
    }
}

/// Digital zeros, poles and gain of a filter.
#[derive(Debug, Clone)]
pub struct Zpk {
    pub zeros: Vec<Complex64>,
    pub poles: Vec<Complex64>,
    pub gain: f64,
}

/// Butterworth low-pass in zero-pole-gain form.
///
/// `wn` is the cutoff normalised to Nyquist, in `(0, 1)`.
pub fn butter_lowpass_zpk(order: usize, wn: f64) -> Zpk {
    let n = order as f64;
    let warped = 4.0 * (PI * wn / 2.0).tan();

    let analog: Vec<Complex64> = (0..order)
        .map(|i| {
            let m = -(n - 1.0) + 2.0 * i as f64;
            -Complex64::from_polar(1.0, PI * m / (2.0 * n)) * warped
        })
        .collect();

    let fs2 = Complex64::new(4.0, 0.0);
    let poles: Vec<Complex64> = analog.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();
    let denom: Complex64 = analog.iter().map(|&p| fs2 - p).product();
    let gain = (Complex64::new(warped.powi(order as i32), 0.0) / denom).re;

    Zpk { zeros: vec![Complex64::new(-1.0, 0.0); order], poles, gain }
}

/// Polynomial with the given roots, highest power first (`numpy.poly`).
pub fn poly(roots: &[Complex64]) -> Vec<Complex64> {
    let mut c = vec![Complex64::new(1.0, 0.0)];
    for &r in roots {
        let mut next = vec![Complex64::default(); c.len() + 1];
        for (i, &ci) in c.iter().enumerate() {
            next[i] += ci;
            next[i + 1] -= ci * r;
        }
        c = next;
    }
    c
}

/// Expand zero-pole-gain into real transfer-function coefficients.
///
/// Roots must come in conjugate pairs; imaginary residue is dropped.
pub fn zpk_to_ba(zpk: &Zpk) -> Result<IirCoeffs> {
    let b = poly(&zpk.zeros).iter().map(|c| c.re * zpk.gain).collect();
    let a = poly(&zpk.poles).iter().map(|c| c.re).collect();
    IirCoeffs::new(b, a)
}

/// Design a Butterworth low-pass of the given `order`.
///
/// Matches `scipy.signal.butter(order, cutoff_hz / nyquist, btype="low")`.
///
/// # Errors
///
/// * [`LfpError::Configuration`] if `order == 0`, any frequency is not
///   finite and positive, or `cutoff_hz >= nyquist`.
/// * [`LfpError::NumericInstability`] if a designed pole falls on or
///   outside the unit circle.
pub fn design_lowpass(order: usize, cutoff_hz: f64, nyquist: f64) -> Result<IirCoeffs> {
    if order == 0 {
        return Err(LfpError::Configuration("filter order must be > 0".into()));
    }
    if !(cutoff_hz.is_finite() && cutoff_hz > 0.0 && nyquist.is_finite() && nyquist > 0.0) {
        return Err(LfpError::Configuration(format!(
            "cutoff ({cutoff_hz}) and nyquist ({nyquist}) must be finite and > 0"
        )));
    }
    if cutoff_hz >= nyquist {
        return Err(LfpError::Configuration(format!(
            "cutoff {cutoff_hz} Hz must be below nyquist {nyquist} Hz"
        )));
    }

    let zpk = butter_lowpass_zpk(order, cutoff_hz / nyquist);
    if let Some(p) = zpk.poles.iter().find(|p| p.norm() >= 1.0) {
        return Err(LfpError::NumericInstability(format!(
            "designed pole {p} lies outside the unit circle"
        )));
    }
    let coeffs = zpk_to_ba(&zpk)?;
    if !coeffs.is_stable() {
        return Err(LfpError::NumericInstability(format!(
            "order-{order} denominator failed the stability test after expansion"
        )));
    }
    log::debug!("designed order-{order} Butterworth low-pass at {cutoff_hz} Hz (nyquist {nyquist} Hz)");
    Ok(coeffs)
}
