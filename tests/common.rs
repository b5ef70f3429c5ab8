/// Shared synthetic-data builders for integration tests.
use lfp_tone::Recording;
use ndarray::{Array2, Array3};
use std::f64::consts::PI;

pub const LOW_TONE: f64 = 4000.0;
pub const HIGH_TONE: f64 = 8000.0;

#[allow(unused)]
/// `sin(2π·freq·t)` sampled at `fs`.
pub fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
}

#[allow(unused)]
/// Deterministic pseudo-noise in `[-0.5, 0.5)`, distinct per (session, trial, sample).
pub fn noise(s: usize, t: usize, i: usize) -> f64 {
    let h = (i * 7919 + t * 104_729 + s * 1_299_709) % 1000;
    h as f64 / 1000.0 - 0.5
}

#[allow(unused)]
/// Tone code of trial `t`: even trials low, odd trials high.
pub fn alternating_tone(t: usize) -> f64 {
    if t % 2 == 0 { LOW_TONE } else { HIGH_TONE }
}

#[allow(unused)]
/// Baseline of `stim_onset` samples made of two full sine periods scaled by
/// `amp`, so RMS and P2P are both proportional to `amp`.
pub fn sine_baseline(amp: f64, i: usize, stim_onset: usize) -> f64 {
    amp * (4.0 * PI * i as f64 / stim_onset as f64).sin()
}

#[allow(unused)]
/// `[S, T, N]` recording whose baseline amplitude is `amp(s, t)`; post-stimulus
/// samples are a slow ramp.
pub fn scaled_baseline_recording(
    n_s: usize,
    n_t: usize,
    n_x: usize,
    stim_onset: usize,
    amp: impl Fn(usize, usize) -> f64,
) -> Recording {
    let lfp = Array3::from_shape_fn((n_s, n_t, n_x), |(s, t, i)| {
        if i < stim_onset {
            sine_baseline(amp(s, t), i, stim_onset)
        } else {
            (i - stim_onset) as f64 * 1e-3
        }
    });
    let tones = Array2::from_shape_fn((n_s, n_t), |(_, t)| alternating_tone(t));
    Recording::new(lfp, tones).unwrap()
}

#[allow(unused)]
/// Evoked-response recording: small noise everywhere plus a Gaussian trough
/// `trough_ms` after onset, twice as deep for the low tone.
///
/// Trial `(s, t)` listed in `outliers` gets 50× baseline noise.
pub fn evoked_recording(
    n_s: usize,
    n_t: usize,
    n_x: usize,
    fs: f64,
    stim_onset: usize,
    trough_ms: f64,
    outliers: &[(usize, usize)],
) -> Recording {
    let centre = stim_onset as f64 + trough_ms / 1000.0 * fs;
    let sigma = 0.01 * fs;
    let lfp = Array3::from_shape_fn((n_s, n_t, n_x), |(s, t, i)| {
        let mut v = 0.05 * noise(s, t, i);
        if i < stim_onset && outliers.contains(&(s, t)) {
            v *= 50.0;
        }
        let depth = if alternating_tone(t) == LOW_TONE { 2.0 } else { 1.0 };
        let d = (i as f64 - centre) / sigma;
        v - depth * (-0.5 * d * d).exp()
    });
    let tones = Array2::from_shape_fn((n_s, n_t), |(_, t)| alternating_tone(t));
    Recording::new(lfp, tones).unwrap()
}

#[allow(unused)]
/// Maximum absolute difference between two equally long slices.
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "length mismatch");
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0_f64, f64::max)
}
