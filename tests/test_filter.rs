mod common;
use common::{max_abs_diff, sine};
use lfp_tone::filter::{filtfilt_padlen, lfilter, lfilter_zi};
use lfp_tone::{
    apply_filter, apply_filter_trials, design_lowpass, filter_sessions, filtfilt, LfpError,
    SessionSplit, ToneInfo,
};
use ndarray::Array2;

const FS: f64 = 1e4;

// ── Zero phase ────────────────────────────────────────────────────────────────

#[test]
fn impulse_response_is_symmetric() {
    let coeffs = design_lowpass(4, 1000.0, 5000.0).unwrap();
    let mut x = vec![0.0; 401];
    x[200] = 1.0;
    let y = filtfilt(&coeffs, &x).unwrap();

    assert_eq!(y.len(), x.len());
    for k in 1..150 {
        let diff = (y[200 + k] - y[200 - k]).abs();
        assert!(diff < 1e-9, "y[200+{k}]={} ≠ y[200-{k}]={}", y[200 + k], y[200 - k]);
    }
    // Peak stays on the impulse: no group delay.
    let argmax = y.iter().enumerate().fold(0, |best, (i, &v)| if v > y[best] { i } else { best });
    assert_eq!(argmax, 200);
}

#[test]
fn passband_sine_is_unchanged() {
    let coeffs = design_lowpass(10, 1000.0, 5000.0).unwrap();
    let x = sine(50.0, FS, 5000);
    let y = filtfilt(&coeffs, &x).unwrap();
    let err = max_abs_diff(&y[500..4500], &x[500..4500]);
    assert!(err < 1e-3, "50 Hz passband error {err:.2e}");
}

#[test]
fn stopband_sine_is_removed() {
    let coeffs = design_lowpass(10, 1000.0, 5000.0).unwrap();
    let x = sine(3000.0, FS, 5000);
    let y = filtfilt(&coeffs, &x).unwrap();
    let peak = y[500..4500].iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    assert!(peak < 1e-3, "3 kHz residual {peak:.2e}");
}

#[test]
fn constant_signal_passes_through() {
    // lfilter_zi seeds the steady state, so a DC input has no start-up transient.
    let coeffs = design_lowpass(6, 500.0, 5000.0).unwrap();
    let zi = lfilter_zi(&coeffs).unwrap();
    let z0: Vec<f64> = zi.iter().map(|v| v * 3.0).collect();
    let y = lfilter(&coeffs, &[3.0; 64], Some(&z0));
    assert!(max_abs_diff(&y, &[3.0; 64]) < 1e-6);

    let y = filtfilt(&coeffs, &[3.0; 100]).unwrap();
    assert!(max_abs_diff(&y, &[3.0; 100]) < 1e-6);
}

// ── Length limits ─────────────────────────────────────────────────────────────

#[test]
fn trial_must_be_longer_than_padlen() {
    let coeffs = design_lowpass(10, 1000.0, 5000.0).unwrap();
    let padlen = filtfilt_padlen(&coeffs);
    assert_eq!(padlen, 33);

    assert!(matches!(filtfilt(&coeffs, &vec![0.0; padlen]), Err(LfpError::DataShape(_))));
    assert_eq!(filtfilt(&coeffs, &vec![0.0; padlen + 1]).unwrap().len(), padlen + 1);
}

// ── Trial groups ──────────────────────────────────────────────────────────────

#[test]
fn trials_are_filtered_independently() {
    let coeffs = design_lowpass(10, 1000.0, 5000.0).unwrap();
    let trials = Array2::from_shape_fn((6, 300), |(t, i)| {
        ((i as f64) * 0.05 * (t + 1) as f64).sin() + if i == 150 { t as f64 } else { 0.0 }
    });
    let out = apply_filter_trials(trials.view(), &coeffs).unwrap();
    assert_eq!(out.dim(), (6, 300));

    for (t, row) in trials.rows().into_iter().enumerate() {
        let single = apply_filter(row, &coeffs).unwrap();
        let diff = max_abs_diff(out.row(t).as_slice().unwrap(), single.as_slice().unwrap());
        assert_eq!(diff, 0.0, "trial {t} differs from single-trial filtering");
    }
}

#[test]
fn empty_group_keeps_sample_axis() {
    let coeffs = design_lowpass(4, 1000.0, 5000.0).unwrap();
    let out = apply_filter_trials(Array2::<f64>::zeros((0, 120)).view(), &coeffs).unwrap();
    assert_eq!(out.dim(), (0, 120));
}

#[test]
fn filter_sessions_keeps_tone_info() {
    let coeffs = design_lowpass(4, 1000.0, 5000.0).unwrap();
    let info = ToneInfo { session: 3, low_tone: 1.0, high_tone: 2.0, n_low: 2, n_high: 1 };
    let split = SessionSplit {
        info,
        low: Array2::from_elem((2, 80), 1.0),
        high: Array2::from_elem((1, 80), -1.0),
    };
    let out = filter_sessions(&[split], &coeffs).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].info, info);
    assert_eq!(out[0].low.dim(), (2, 80));
    assert!(out[0].high.iter().all(|&v| (v + 1.0).abs() < 1e-6));
}
