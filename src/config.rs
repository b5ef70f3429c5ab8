//! Pipeline configuration.
//!
//! [`PipelineConfig`] holds every tunable parameter of the analysis.  The
//! defaults describe the tone paradigm the pipeline was built for: 10 kHz
//! sampling, stimulus at sample 1000 (100 ms), 10th-order 1 kHz low-pass.
use crate::error::{LfpError, Result};
use crate::tfr::Band;

/// Configuration for the full LFP analysis pipeline.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use lfp_tone::PipelineConfig;
///
/// let cfg = PipelineConfig {
///     z:         2.5,      // stricter outlier rejection
///     cutoff_hz: 500.0,
///     ..PipelineConfig::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Sampling rate in Hz.
    ///
    /// Default: `10 000.0` Hz.
    pub fs: f64,

    /// Nyquist frequency used to normalise the low-pass cutoff.
    ///
    /// Normally `fs / 2`, but kept separate so recordings decimated
    /// upstream can be described exactly.
    ///
    /// Default: `5 000.0` Hz.
    pub nyquist: f64,

    /// Sample index of the stimulus onset.
    ///
    /// Samples `[0, stim_onset)` form the baseline window used both for
    /// outlier statistics and for ERP baseline correction.
    ///
    /// Default: `1000` (100 ms at 10 kHz).
    pub stim_onset: usize,

    /// Butterworth low-pass cutoff in Hz.  Must be below [`Self::nyquist`].
    ///
    /// Default: `1 000.0` Hz.
    pub cutoff_hz: f64,

    /// Butterworth filter order.  The effective order after zero-phase
    /// application is twice this value.
    ///
    /// Default: `10`.
    pub filter_order: usize,

    /// Outlier threshold multiplier: a trial is rejected when its baseline
    /// RMS or P2P exceeds `mean + z · std` of the pooled population.
    ///
    /// Default: `3.0`.
    pub z: f64,

    /// Highest frequency kept in the ERP power spectrum.
    ///
    /// Default: `200.0` Hz.
    pub max_freq: f64,

    /// Start of the ERP peak search window, in ms from trial start.
    ///
    /// Default: `100.0` ms.
    pub win_start_ms: f64,

    /// End (exclusive) of the ERP peak search window, in ms from trial start.
    ///
    /// Default: `250.0` ms.
    pub win_end_ms: f64,

    /// Welch segment length for the ERP power spectrum.
    ///
    /// Default: `512`.
    pub psd_nperseg: usize,

    /// Spectrogram segment length.
    ///
    /// Default: `256`.
    pub tfr_nperseg: usize,

    /// Spectrogram segment overlap.  Must be smaller than `tfr_nperseg`.
    ///
    /// Default: `200`.
    pub tfr_noverlap: usize,

    /// Highest frequency kept in the trial-averaged spectrogram.
    ///
    /// Default: `100.0` Hz.
    pub tfr_max_freq: f64,

    /// Frequency bands for band-power time courses.
    ///
    /// Default: theta (4–8 Hz), beta (13–30 Hz), gamma (30–80 Hz).
    pub bands: Vec<Band>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fs: 1e4,
            nyquist: 5e3,
            stim_onset: 1000,
            cutoff_hz: 1e3,
            filter_order: 10,
            z: 3.0,
            max_freq: 200.0,
            win_start_ms: 100.0,
            win_end_ms: 250.0,
            psd_nperseg: 512,
            tfr_nperseg: 256,
            tfr_noverlap: 200,
            tfr_max_freq: 100.0,
            bands: Band::defaults(),
        }
    }
}

impl PipelineConfig {
    /// Check every parameter that can be checked without looking at data.
    ///
    /// Data-dependent limits (`stim_onset <= n_samples`, trial length versus
    /// filter padding) are checked by the stage that consumes them.
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(LfpError::Configuration(format!("{name} must be finite and > 0, got {v}")))
            }
        };
        positive("fs", self.fs)?;
        positive("nyquist", self.nyquist)?;
        positive("cutoff_hz", self.cutoff_hz)?;
        positive("max_freq", self.max_freq)?;
        positive("tfr_max_freq", self.tfr_max_freq)?;

        if self.cutoff_hz >= self.nyquist {
            return Err(LfpError::Configuration(format!(
                "cutoff_hz ({}) must be below nyquist ({})",
                self.cutoff_hz, self.nyquist
            )));
        }
        if self.stim_onset == 0 {
            return Err(LfpError::Configuration("stim_onset must be > 0".into()));
        }
        if self.filter_order == 0 {
            return Err(LfpError::Configuration("filter_order must be > 0".into()));
        }
        if self.z.is_nan() {
            return Err(LfpError::Configuration("z must not be NaN".into()));
        }
        if !(self.win_start_ms >= 0.0 && self.win_start_ms < self.win_end_ms) {
            return Err(LfpError::Configuration(format!(
                "peak window [{}, {}) ms is empty or negative",
                self.win_start_ms, self.win_end_ms
            )));
        }
        if self.psd_nperseg == 0 || self.tfr_nperseg == 0 {
            return Err(LfpError::Configuration("segment lengths must be > 0".into()));
        }
        if self.tfr_noverlap >= self.tfr_nperseg {
            return Err(LfpError::Configuration(format!(
                "tfr_noverlap ({}) must be smaller than tfr_nperseg ({})",
                self.tfr_noverlap, self.tfr_nperseg
            )));
        }
        for band in &self.bands {
            if !(band.low_hz <= band.high_hz) {
                return Err(LfpError::Configuration(format!(
                    "band '{}' has low > high ({} > {})",
                    band.name, band.low_hz, band.high_hz
                )));
            }
        }
        Ok(())
    }

    /// Stimulus onset in milliseconds from trial start.
    ///
    /// ```
    /// use lfp_tone::PipelineConfig;
    /// assert_eq!(PipelineConfig::default().stim_onset_ms(), 100.0);
    /// ```
    pub fn stim_onset_ms(&self) -> f64 {
        self.stim_onset as f64 / self.fs * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn cutoff_at_nyquist_rejected() {
        let cfg = PipelineConfig { cutoff_hz: 5e3, ..PipelineConfig::default() };
        assert!(matches!(cfg.validate(), Err(LfpError::Configuration(_))));
    }

    #[test]
    fn zero_onset_and_order_rejected() {
        let cfg = PipelineConfig { stim_onset: 0, ..PipelineConfig::default() };
        assert!(matches!(cfg.validate(), Err(LfpError::Configuration(_))));
        let cfg = PipelineConfig { filter_order: 0, ..PipelineConfig::default() };
        assert!(matches!(cfg.validate(), Err(LfpError::Configuration(_))));
    }

    #[test]
    fn overlap_must_be_shorter_than_segment() {
        let cfg = PipelineConfig { tfr_noverlap: 256, ..PipelineConfig::default() };
        assert!(cfg.validate().is_err());
    }
}
