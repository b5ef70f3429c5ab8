//! Butterworth IIR design and zero-phase application.
//!
//! - [`design`]: digital Butterworth low-pass via bilinear transform,
//!   matching `scipy.signal.butter(N, Wn, btype="low")`.
//! - [`apply`]: forward-backward filtering with odd padding and steady-state
//!   initial conditions, matching `scipy.signal.filtfilt`.

pub mod apply;
pub mod design;

pub use apply::{
    apply_filter, apply_filter_trials, filter_sessions, filtfilt, filtfilt_padlen, lfilter,
    lfilter_zi, FilteredSession,
};
pub use design::{butter_lowpass_zpk, design_lowpass, poly, zpk_to_ba, IirCoeffs, Zpk};
