mod common;
use common::{evoked_recording, noise, HIGH_TONE, LOW_TONE};
use lfp_tone::io::{read_all_f64, write_lines, StWriter};
use lfp_tone::{condition, report, run_pipeline, LfpError, PipelineConfig, Recording};
use ndarray::{Array2, Array3};

const FS: f64 = 1000.0;
const STIM: usize = 100;

fn test_config() -> PipelineConfig {
    PipelineConfig {
        fs: FS,
        nyquist: FS / 2.0,
        stim_onset: STIM,
        cutoff_hz: 100.0,
        filter_order: 4,
        ..PipelineConfig::default()
    }
}

/// 2 sessions × 12 trials × 600 samples, trough 80 ms after onset, one
/// outlier (session 1, trial 0).
fn recording() -> Recording {
    evoked_recording(2, 12, 600, FS, STIM, 80.0, &[(0, 0)])
}

// ── End to end ────────────────────────────────────────────────────────────────

#[test]
fn pipeline_rejects_outlier_and_finds_troughs() {
    let out = run_pipeline(&recording(), &test_config()).unwrap();
    assert_eq!(out.sessions.len(), 2);
    assert!(!out.mask[[0, 0]]);
    assert_eq!(out.mask.iter().filter(|&&k| !k).count(), 1);

    let s1 = &out.sessions[0];
    assert_eq!((s1.n_before, s1.n_after), (12, 11));
    assert_eq!((s1.info.n_low, s1.info.n_high), (5, 6));
    assert_eq!((s1.info.low_tone, s1.info.high_tone), (LOW_TONE, HIGH_TONE));

    for s in &out.sessions {
        for g in [&s.low, &s.high] {
            assert!(
                (g.peak.latency_ms - 80.0).abs() <= 2.0,
                "session {} latency {}",
                s.info.session,
                g.peak.latency_ms
            );
            assert_eq!(g.erp.erp.len(), 600);
            assert_eq!(g.band_power.len(), 3);
            for (_, bp) in &g.band_power {
                assert_eq!(bp.len(), g.tfr.times.len());
            }
            assert!(g.psd.freqs.iter().all(|&f| f <= 200.0));
            assert!(g.tfr.freqs.iter().all(|&f| f <= 100.0));
        }
        // Low tone trough is twice as deep.
        assert!(s.low.peak.amplitude < s.high.peak.amplitude);
        approx::assert_abs_diff_eq!(s.low.peak.amplitude, -2.0, epsilon = 0.1);
        approx::assert_abs_diff_eq!(s.high.peak.amplitude, -1.0, epsilon = 0.1);
    }
}

#[test]
fn pooled_groups_stack_sessions() {
    let out = run_pipeline(&recording(), &test_config()).unwrap();
    let low = out.pooled_low().unwrap();
    let high = out.pooled_high().unwrap();
    assert_eq!(low.dim(), (5 + 6, 600));
    assert_eq!(high.dim(), (6 + 6, 600));
    assert_eq!(low.row(5), out.sessions[1].low.trials.row(0));
}

#[test]
fn condition_exposes_intermediates() {
    let rec = recording();
    let c = condition(&rec, &test_config()).unwrap();
    assert_eq!(c.cleaned.kept_counts(), vec![11, 12]);
    assert_eq!(c.coeffs.b.len(), 5);
    assert!(c.coeffs.is_stable());
    assert_eq!(c.filtered[1].low.dim(), (6, 600));
    assert!(c.stats.rms_std > 0.0);
}

#[test]
fn summaries_are_one_line_per_session() {
    let out = run_pipeline(&recording(), &test_config()).unwrap();
    assert_eq!(
        report::rejection_summary(&out),
        vec![
            "Session 1: 12 -> 11 trials after outlier rejection".to_string(),
            "Session 2: 12 -> 12 trials after outlier rejection".to_string(),
        ]
    );
    let peaks = report::peak_summary(&out);
    assert_eq!(peaks.len(), 4);
    assert!(peaks[0].starts_with("Session 1 Low: peak_amp="));
    assert!(peaks[3].starts_with("Session 2 High: peak_amp="));
    assert!(report::tone_summary(&out)[0].contains("low tone 4000 (5 trials)"));
}

// ── Failure propagation ───────────────────────────────────────────────────────

#[test]
fn invalid_config_is_rejected_before_work() {
    let cfg = PipelineConfig { cutoff_hz: 600.0, ..test_config() };
    assert!(matches!(run_pipeline(&recording(), &cfg), Err(LfpError::Configuration(_))));
}

#[test]
fn single_tone_session_aborts_the_run() {
    let rec = recording();
    let mut tones = rec.tones.clone();
    tones.row_mut(1).fill(LOW_TONE);
    let rec = Recording::new(rec.lfp, tones).unwrap();
    assert!(matches!(run_pipeline(&rec, &test_config()), Err(LfpError::DataShape(_))));
}

#[test]
fn trials_too_short_for_filter_are_rejected() {
    let lfp = Array3::from_shape_fn((1, 4, 15), |(s, t, i)| noise(s, t, i));
    let tones = Array2::from_shape_fn((1, 4), |(_, t)| if t < 2 { 1.0 } else { 2.0 });
    let rec = Recording::new(lfp, tones).unwrap();
    let cfg = PipelineConfig { stim_onset: 10, ..test_config() };
    assert!(matches!(run_pipeline(&rec, &cfg), Err(LfpError::DataShape(_))));
}

#[test]
fn mismatched_tone_shape_is_data_shape_error() {
    let lfp = Array3::<f64>::zeros((2, 3, 10));
    let tones = Array2::<f64>::zeros((2, 4));
    assert!(matches!(Recording::new(lfp, tones), Err(LfpError::DataShape(_))));
}

// ── Files ─────────────────────────────────────────────────────────────────────

#[test]
fn recording_round_trips_through_safetensors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rec.safetensors");
    let rec = recording();
    rec.save(&path).unwrap();

    let back = Recording::load(&path).unwrap();
    assert_eq!(back.lfp, rec.lfp);
    assert_eq!(back.tones, rec.tones);
}

#[test]
fn writer_output_is_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.safetensors");
    let mut w = StWriter::new();
    w.add_f64_arr2("m", &Array2::from_shape_fn((2, 3), |(r, c)| (r * 3 + c) as f64));
    w.add_i32("counts", &[12, 11], &[2]);
    w.write(&path).unwrap();

    let all = read_all_f64(&path).unwrap();
    assert_eq!(all["m"], (vec![2, 3], vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]));
    assert_eq!(all["counts"], (vec![2], vec![12.0, 11.0]));
}

#[test]
fn missing_lfp_key_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.safetensors");
    let mut w = StWriter::new();
    w.add_f64("tones", &[1.0, 2.0], &[1, 2]);
    w.write(&path).unwrap();

    let err = Recording::load(&path).unwrap_err();
    assert!(err.to_string().contains("lfp"), "{err}");
}

#[test]
fn summary_lines_are_written_with_trailing_newline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("summary.txt");
    write_lines(&path, &["a".to_string(), "b".to_string()]).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
}
