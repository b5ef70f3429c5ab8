//! # lfp-tone — low/high tone LFP analysis in pure Rust
//!
//! `lfp-tone` conditions multi-session local-field-potential recordings from
//! a two-tone auditory paradigm and compares the responses to the low and
//! the high tone.  Filter design and spectral estimates follow
//! `scipy.signal` (`butter`, `filtfilt`, `welch`, `spectrogram`) so results
//! can be checked against reference traces.
//!
//! ## Pipeline overview
//!
//! ```text
//! recording.safetensors          lfp [S, T, N]  tones [S, T]
//!   │
//!   ├─ compute_baseline_metrics  RMS / P2P over [0, stim_onset), pooled over ALL sessions
//!   ├─ build_signal_mask         keep iff rms <= μ + zσ  and  p2p <= μ + zσ
//!   ├─ apply_mask_per_session    ragged arena: one row range per session
//!   ├─ split_all_sessions_by_tone  low = min tone, high = max tone
//!   ├─ design_lowpass            Butterworth IIR (order 10, 1 kHz)
//!   ├─ filter_sessions           forward-backward, zero phase
//!   │
//!   ├─ ERP   compute_erp · peak_amp_latency · erp_psd
//!   └─ TFR   compute_mean_spectrogram · extract_band_power
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use lfp_tone::{run_pipeline, PipelineConfig, Recording};
//! use std::path::Path;
//!
//! let rec = Recording::load(Path::new("data/recording.safetensors")).unwrap();
//! let cfg = PipelineConfig::default();
//! let out = run_pipeline(&rec, &cfg).unwrap();
//!
//! for s in &out.sessions {
//!     println!(
//!         "session {}: {} -> {} trials, low peak {:.3} @ {:.1} ms",
//!         s.info.session, s.n_before, s.n_after, s.low.peak.amplitude, s.low.peak.latency_ms,
//!     );
//! }
//! ```
//!
//! ## Running individual steps
//!
//! ```
//! use lfp_tone::outliers::{
//!     apply_mask_per_session, build_signal_mask, compute_baseline_metrics,
//!     split_all_sessions_by_tone,
//! };
//! use lfp_tone::filter::{design_lowpass, filter_sessions};
//! use ndarray::{Array2, Array3};
//!
//! let lfp = Array3::from_shape_fn((2, 4, 200), |(s, t, i)| ((s + t + i) as f64 * 0.1).sin());
//! let tones = Array2::from_shape_fn((2, 4), |(_, t)| if t % 2 == 0 { 4000.0 } else { 8000.0 });
//!
//! let stats   = compute_baseline_metrics(lfp.view(), 50).unwrap();
//! let mask    = build_signal_mask(lfp.view(), 50, &stats, 3.0).unwrap();
//! let cleaned = apply_mask_per_session(lfp.view(), tones.view(), &mask).unwrap();
//! let splits  = split_all_sessions_by_tone(&cleaned).unwrap();
//!
//! let coeffs   = design_lowpass(4, 1000.0, 5000.0).unwrap();
//! let filtered = filter_sessions(&splits, &coeffs).unwrap();
//! assert_eq!(filtered.len(), 2);
//! ```

pub mod config;
pub mod erp;
pub mod error;
pub mod filter;
pub mod io;
pub mod outliers;
pub mod pipeline;
pub mod report;
pub mod spectral;
pub mod tfr;
pub mod trials;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config / errors
pub use config::PipelineConfig;
pub use error::{LfpError, Result};

// trial containers
pub use trials::{CleanedTrials, Recording};

// outlier rejection
pub use outliers::{
    apply_mask_per_session, baseline_rms_p2p, build_signal_mask, compute_baseline_metrics,
    split_all_sessions_by_tone, split_by_tone, BaselineStats, SessionSplit, ToneInfo, ToneSplit,
};

// filter — design + zero-phase application
pub use filter::{
    apply_filter, apply_filter_trials, design_lowpass, filter_sessions, filtfilt, FilteredSession,
    IirCoeffs,
};

// analyses
pub use erp::{compute_erp, erp_psd, peak_amp_latency, Erp, Peak};
pub use spectral::{welch, Psd};
pub use tfr::{compute_mean_spectrogram, extract_band_power, spectrogram, Band, Spectrogram};

// orchestration
pub use pipeline::{condition, run_pipeline, Conditioned, GroupAnalysis, PipelineOutput, SessionResult};
