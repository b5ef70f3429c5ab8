//! End-to-end analysis: conditioning (rejection → split → filter) followed by
//! ERP and TFR analysis of every low/high group.
use ndarray::{concatenate, Array1, Array2, ArrayView2, Axis};

use crate::config::PipelineConfig;
use crate::erp::{compute_erp, erp_psd, peak_amp_latency, Erp, Peak};
use crate::error::{LfpError, Result};
use crate::filter::{design_lowpass, filter_sessions, FilteredSession, IirCoeffs};
use crate::outliers::{
    apply_mask_per_session, build_signal_mask, compute_baseline_metrics,
    split_all_sessions_by_tone, BaselineStats, ToneInfo,
};
use crate::spectral::Psd;
use crate::tfr::{compute_mean_spectrogram, extract_band_power, Band, Spectrogram};
use crate::trials::{CleanedTrials, Recording};

/// Output of the core signal-conditioning stage.
#[derive(Debug, Clone)]
pub struct Conditioned {
    pub stats: BaselineStats,
    /// `[S, T]`, `true` = kept.
    pub mask: Array2<bool>,
    pub cleaned: CleanedTrials,
    pub coeffs: IirCoeffs,
    pub filtered: Vec<FilteredSession>,
}

/// Reject outliers, split by tone and zero-phase filter every group.
pub fn condition(rec: &Recording, cfg: &PipelineConfig) -> Result<Conditioned> {
    cfg.validate()?;

    let stats = compute_baseline_metrics(rec.lfp.view(), cfg.stim_onset)?;
    let mask = build_signal_mask(rec.lfp.view(), cfg.stim_onset, &stats, cfg.z)?;
    let cleaned = apply_mask_per_session(rec.lfp.view(), rec.tones.view(), &mask)?;
    log::info!(
        "outlier rejection (z = {}): kept {} of {} trials",
        cfg.z,
        cleaned.n_trials(),
        rec.n_sessions() * rec.n_trials()
    );
    for (s, &kept) in cleaned.kept_counts().iter().enumerate() {
        if kept * 2 < rec.n_trials() {
            log::warn!("session {}: only {kept} of {} trials survived rejection", s + 1, rec.n_trials());
        }
    }

    let splits = split_all_sessions_by_tone(&cleaned)?;
    let coeffs = design_lowpass(cfg.filter_order, cfg.cutoff_hz, cfg.nyquist)?;
    let filtered = filter_sessions(&splits, &coeffs)?;
    log::info!(
        "filtered {} sessions with order-{} low-pass at {} Hz",
        filtered.len(),
        cfg.filter_order,
        cfg.cutoff_hz
    );

    Ok(Conditioned { stats, mask, cleaned, coeffs, filtered })
}

/// ERP and TFR results of one tone group.
#[derive(Debug, Clone)]
pub struct GroupAnalysis {
    /// `[n_trials, N]` filtered trials.
    pub trials: Array2<f64>,
    pub erp: Erp,
    pub peak: Peak,
    /// ERP power spectrum up to `max_freq`.
    pub psd: Psd,
    /// Trial-averaged spectrogram up to `tfr_max_freq`.
    pub tfr: Spectrogram,
    /// One time course per configured band, in band order.
    pub band_power: Vec<(Band, Array1<f64>)>,
}

/// Analyse one filtered `[n_trials, N]` group.
pub fn analyse_group(trials: ArrayView2<'_, f64>, cfg: &PipelineConfig) -> Result<GroupAnalysis> {
    let erp = compute_erp(trials, cfg.stim_onset, cfg.fs)?;
    let peak = peak_amp_latency(erp.erp.view(), cfg.fs, cfg.stim_onset, cfg.win_start_ms, cfg.win_end_ms)?;
    let psd = erp_psd(erp.erp.view(), cfg.fs, cfg.max_freq, cfg.psd_nperseg)?;
    let tfr = compute_mean_spectrogram(trials, cfg.fs, cfg.tfr_nperseg, cfg.tfr_noverlap, cfg.tfr_max_freq)?;
    let band_power: Vec<(Band, Array1<f64>)> = cfg
        .bands
        .iter()
        .map(|band| Ok((band.clone(), extract_band_power(&tfr.power, &tfr.freqs, band)?)))
        .collect::<Result<_>>()?;

    Ok(GroupAnalysis { trials: trials.to_owned(), erp, peak, psd, tfr, band_power })
}

/// Per-session results.
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub info: ToneInfo,
    /// Trials recorded in the session.
    pub n_before: usize,
    /// Trials kept after outlier rejection.
    pub n_after: usize,
    pub low: GroupAnalysis,
    pub high: GroupAnalysis,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub stats: BaselineStats,
    pub mask: Array2<bool>,
    pub coeffs: IirCoeffs,
    pub sessions: Vec<SessionResult>,
}

impl PipelineOutput {
    fn pooled(&self, pick: impl Fn(&SessionResult) -> &GroupAnalysis) -> Result<Array2<f64>> {
        let views: Vec<ArrayView2<'_, f64>> = self.sessions.iter().map(|s| pick(s).trials.view()).collect();
        concatenate(Axis(0), &views).map_err(|e| LfpError::DataShape(format!("pooling trials: {e}")))
    }

    /// Filtered low-tone trials of all sessions, stacked in session order.
    pub fn pooled_low(&self) -> Result<Array2<f64>> {
        self.pooled(|s| &s.low)
    }

    /// Filtered high-tone trials of all sessions, stacked in session order.
    pub fn pooled_high(&self) -> Result<Array2<f64>> {
        self.pooled(|s| &s.high)
    }
}

/// Run the whole analysis on `rec`.
///
/// # Pipeline steps
///
/// 1. Pooled baseline RMS / P2P statistics over every trial of every session.
/// 2. Keep mask at `mean + z · std`, applied per session.
/// 3. Low/high tone split per session.
/// 4. Butterworth low-pass, applied forward-backward to every trial.
/// 5. Per group: ERP, trough amplitude/latency, ERP PSD, mean spectrogram,
///    band-power time courses.
///
/// Any error aborts the run; no session is skipped.
pub fn run_pipeline(rec: &Recording, cfg: &PipelineConfig) -> Result<PipelineOutput> {
    let conditioned = condition(rec, cfg)?;
    let Conditioned { stats, mask, cleaned, coeffs, filtered } = conditioned;

    let sessions = filtered
        .into_iter()
        .enumerate()
        .map(|(s, f)| {
            let low = analyse_group(f.low.view(), cfg)?;
            let high = analyse_group(f.high.view(), cfg)?;
            log::debug!(
                "session {}: low peak {:.4} @ {:.1} ms, high peak {:.4} @ {:.1} ms",
                f.info.session,
                low.peak.amplitude,
                low.peak.latency_ms,
                high.peak.amplitude,
                high.peak.latency_ms
            );
            Ok(SessionResult {
                info: f.info,
                n_before: rec.n_trials(),
                n_after: cleaned.session_len(s),
                low,
                high,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    log::info!("analysed {} sessions", sessions.len());
    Ok(PipelineOutput { stats, mask, coeffs, sessions })
}
