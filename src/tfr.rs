//! Time-frequency representation: trial-averaged spectrogram and band power.
//!
//! `spectrogram`              — `scipy.signal.spectrogram` defaults
//!                              (periodic Tukey α = 0.25, constant detrend,
//!                              one-sided density)
//! `compute_mean_spectrogram` — mean over trials of the squared spectrogram
//!                              value, rows with `freq <= max_freq`
//! `extract_band_power`       — mean over the rows of one band, per time bin
use ndarray::{s, Array1, Array2, ArrayView2, Axis};

use crate::error::{LfpError, Result};
use crate::spectral::{segment_psd, tukey_periodic};

/// Named frequency band, inclusive on both ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub name: String,
    pub low_hz: f64,
    pub high_hz: f64,
}

impl Band {
    pub fn new(name: impl Into<String>, low_hz: f64, high_hz: f64) -> Self {
        Self { name: name.into(), low_hz, high_hz }
    }

    /// theta (4–8 Hz), beta (13–30 Hz), gamma (30–80 Hz).
    pub fn defaults() -> Vec<Band> {
        vec![
            Band::new("theta", 4.0, 8.0),
            Band::new("beta", 13.0, 30.0),
            Band::new("gamma", 30.0, 80.0),
        ]
    }

    #[inline]
    pub fn contains(&self, freq: f64) -> bool {
        freq >= self.low_hz && freq <= self.high_hz
    }
}

/// Power over frequency and time.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// `[n_freqs]` in Hz.
    pub freqs: Vec<f64>,
    /// `[n_times]` segment centres in seconds from trial start.
    pub times: Vec<f64>,
    /// `[n_freqs, n_times]`.
    pub power: Array2<f64>,
}

impl Spectrogram {
    /// Keep rows with `freq <= max_freq`.
    pub fn truncate(self, max_freq: f64) -> Self {
        let keep = self.freqs.iter().take_while(|&&f| f <= max_freq).count();
        Self {
            freqs: self.freqs[..keep].to_vec(),
            times: self.times,
            power: self.power.slice(s![..keep, ..]).to_owned(),
        }
    }

    /// `10 · log10(power + 1e-12)`, for display.
    pub fn to_db(&self) -> Array2<f64> {
        self.power.mapv(|p| 10.0 * (p + 1e-12).log10())
    }
}

/// Density spectrogram of one signal.
///
/// `nperseg` is clamped to the signal length.
pub fn spectrogram(x: &[f64], fs: f64, nperseg: usize, noverlap: usize) -> Result<Spectrogram> {
    if x.is_empty() {
        return Err(LfpError::DataShape("cannot compute the spectrogram of an empty signal".into()));
    }
    let nperseg = nperseg.min(x.len());
    let window = tukey_periodic(nperseg, 0.25);
    let seg = segment_psd(x, fs, &window, noverlap)?;
    Ok(Spectrogram { freqs: seg.freqs, times: seg.times, power: seg.power })
}

/// Trial-averaged spectrogram of a `[n_trials, N]` group.
///
/// Each trial's spectrogram value is squared before averaging, the quantity
/// the tone-contrast analysis reports as TFR power.
pub fn compute_mean_spectrogram(
    trials: ArrayView2<'_, f64>,
    fs: f64,
    nperseg: usize,
    noverlap: usize,
    max_freq: f64,
) -> Result<Spectrogram> {
    let n_trials = trials.nrows();
    if n_trials == 0 {
        return Err(LfpError::DataShape("cannot average the spectrogram of an empty group".into()));
    }

    let mut acc: Option<Spectrogram> = None;
    for row in trials.axis_iter(Axis(0)) {
        let sg = spectrogram(&row.to_vec(), fs, nperseg, noverlap)?;
        let sq = sg.power.mapv(|p| p * p);
        acc = Some(match acc {
            None => Spectrogram { power: sq, ..sg },
            Some(mut a) => {
                a.power += &sq;
                a
            }
        });
    }

    let mut mean = acc.ok_or_else(|| LfpError::DataShape("empty trial group".into()))?;
    mean.power /= n_trials as f64;
    Ok(mean.truncate(max_freq))
}

/// Mean of `power` rows whose frequency falls in `band`, per time bin.
///
/// Returns zeros when no frequency bin lies inside the band.
pub fn extract_band_power(power: &Array2<f64>, freqs: &[f64], band: &Band) -> Result<Array1<f64>> {
    if power.nrows() != freqs.len() {
        return Err(LfpError::DataShape(format!(
            "{} power rows but {} frequencies",
            power.nrows(),
            freqs.len()
        )));
    }
    let rows: Vec<usize> = freqs
        .iter()
        .enumerate()
        .filter(|&(_, &f)| band.contains(f))
        .map(|(i, _)| i)
        .collect();
    if rows.is_empty() {
        return Ok(Array1::zeros(power.ncols()));
    }
    power
        .select(Axis(0), &rows)
        .mean_axis(Axis(0))
        .ok_or_else(|| LfpError::DataShape("empty band selection".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::f64::consts::PI;

    #[test]
    fn band_power_averages_rows_in_band() {
        let power = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0], [7.0, 8.0]];
        let freqs = [2.0, 4.0, 8.0, 9.0];
        let bp = extract_band_power(&power, &freqs, &Band::new("theta", 4.0, 8.0)).unwrap();
        assert_eq!(bp.to_vec(), vec![4.0, 5.0]);
    }

    #[test]
    fn band_without_bins_is_zero() {
        let power = array![[1.0, 2.0], [3.0, 4.0]];
        let bp = extract_band_power(&power, &[0.0, 100.0], &Band::new("x", 10.0, 20.0)).unwrap();
        assert_eq!(bp.to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn spectrogram_localises_tone_in_frequency() {
        let fs = 1000.0;
        let x: Vec<f64> = (0..2000).map(|i| (2.0 * PI * 62.5 * i as f64 / fs).sin()).collect();
        let sg = spectrogram(&x, fs, 256, 200).unwrap();
        // 62.5 Hz sits exactly on bin 16 of a 256-point transform at 1 kHz.
        for col in sg.power.columns() {
            let peak = col
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap();
            assert_eq!(peak, 16);
        }
    }

    #[test]
    fn mean_spectrogram_of_identical_trials_is_squared_single() {
        let fs = 1000.0;
        let row: Vec<f64> = (0..600).map(|i| (i as f64 * 0.37).sin()).collect();
        let trials = Array2::from_shape_fn((3, 600), |(_, t)| row[t]);
        let single = spectrogram(&row, fs, 256, 200).unwrap().truncate(100.0);
        let mean = compute_mean_spectrogram(trials.view(), fs, 256, 200, 100.0).unwrap();

        assert_eq!(mean.freqs, single.freqs);
        assert_eq!(mean.power.dim(), single.power.dim());
        for (m, s) in mean.power.iter().zip(single.power.iter()) {
            approx::assert_relative_eq!(*m, s * s, max_relative = 1e-12);
        }
    }
}
