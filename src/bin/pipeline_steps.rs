/// pipeline_steps: run only the conditioning stages on a recording and write
/// every intermediate array to one safetensors file for comparison against a
/// reference implementation.
///
/// Output keys:
///   baseline_stats    [4]          f64  rms_mean, rms_std, p2p_mean, p2p_std
///   mask              [S, T]       i32  1 = kept
///   kept_counts       [S]          i32
///   b, a              [order + 1]  f64  Butterworth coefficients
///   low_N, high_N     [n, N]       f64  filtered groups of session N (1-based)
///   tones_N           [2]          f64  low / high tone code of session N
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use lfp_tone::{condition, io::StWriter, PipelineConfig, Recording};

#[derive(Parser, Debug)]
#[command(name = "pipeline_steps")]
struct Args {
    /// Input recording.
    #[arg(long)]
    input: PathBuf,

    /// Output safetensors path.
    #[arg(long)]
    output: PathBuf,

    /// Sampling rate (Hz).
    #[arg(long, default_value_t = 1e4)]
    fs: f64,

    /// Stimulus onset (sample index).
    #[arg(long, default_value_t = 1000)]
    stim_onset: usize,

    /// Low-pass cutoff (Hz).
    #[arg(long, default_value_t = 1e3)]
    cutoff: f64,

    /// Butterworth order.
    #[arg(long, default_value_t = 10)]
    order: usize,

    /// Outlier threshold multiplier.
    #[arg(long, default_value_t = 3.0)]
    z: f64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let cfg = PipelineConfig {
        fs: args.fs,
        nyquist: args.fs / 2.0,
        stim_onset: args.stim_onset,
        cutoff_hz: args.cutoff,
        filter_order: args.order,
        z: args.z,
        ..PipelineConfig::default()
    };

    let t0 = std::time::Instant::now();
    let rec = Recording::load(&args.input)?;
    let ms_load = t0.elapsed().as_secs_f64() * 1000.0;

    let t1 = std::time::Instant::now();
    let c = condition(&rec, &cfg)?;
    let ms_cond = t1.elapsed().as_secs_f64() * 1000.0;

    // Parsed by comparison scripts.
    eprintln!("TIMING load={ms_load:.4}ms condition={ms_cond:.4}ms");

    let mut w = StWriter::new();
    let st = c.stats;
    w.add_f64("baseline_stats", &[st.rms_mean, st.rms_std, st.p2p_mean, st.p2p_std], &[4]);
    let mask: Vec<i32> = c.mask.iter().map(|&k| k as i32).collect();
    w.add_i32("mask", &mask, &[c.mask.nrows(), c.mask.ncols()]);
    let kept: Vec<i32> = c.cleaned.kept_counts().into_iter().map(|n| n as i32).collect();
    w.add_i32("kept_counts", &kept, &[kept.len()]);
    w.add_f64("b", &c.coeffs.b, &[c.coeffs.b.len()]);
    w.add_f64("a", &c.coeffs.a, &[c.coeffs.a.len()]);
    for f in &c.filtered {
        let n = f.info.session;
        w.add_f64_arr2(&format!("low_{n}"), &f.low);
        w.add_f64_arr2(&format!("high_{n}"), &f.high);
        w.add_f64(&format!("tones_{n}"), &[f.info.low_tone, f.info.high_tone], &[2]);
    }
    w.write(&args.output)?;

    eprintln!("Written → {}", args.output.display());
    Ok(())
}
