//! lfp_pipeline: run the full low/high tone analysis on one recording and
//! write every derived array plus the text summaries into an output directory.
//!
//! Output files:
//!   raw_data.safetensors                  lfp [S, T, N], tones [S, T]
//!   outlier_rejection_summary.txt         per-session trial counts
//!   tone_split_summary.txt                per-session tone codes and group sizes
//!   time_domain_results.txt               ERP trough amplitude / latency
//!   session_K.safetensors                 filtered groups, ERPs, PSDs, TFRs, band power
//!   pooled.safetensors                    low / high trials of all sessions stacked
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use lfp_tone::{
    io::{write_lines, StWriter},
    report, run_pipeline, GroupAnalysis, PipelineConfig, Recording,
};

#[derive(Parser, Debug)]
#[command(name = "lfp_pipeline", about = "Outlier rejection, filtering and ERP/TFR analysis of tone LFP recordings")]
struct Args {
    /// Input recording (safetensors with `lfp` [S, T, N] and `tones` [S, T]).
    #[arg(long)]
    input: PathBuf,

    /// Output directory (created if missing).
    #[arg(long, default_value = "results")]
    out_dir: PathBuf,

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

    /// Highest ERP PSD frequency (Hz).
    #[arg(long, default_value_t = 200.0)]
    max_freq: f64,

    /// Peak window start (ms from trial start).
    #[arg(long, default_value_t = 100.0)]
    win_start_ms: f64,

    /// Peak window end (ms from trial start).
    #[arg(long, default_value_t = 250.0)]
    win_end_ms: f64,
}

fn add_group(w: &mut StWriter, prefix: &str, g: &GroupAnalysis) {
    w.add_f64_arr2(&format!("{prefix}_filtered"), &g.trials);
    w.add_f64_arr1(&format!("{prefix}_erp"), &g.erp.erp);
    w.add_f64(&format!("{prefix}_psd_freqs"), &g.psd.freqs, &[g.psd.freqs.len()]);
    w.add_f64(&format!("{prefix}_psd"), &g.psd.power, &[g.psd.power.len()]);
    w.add_f64(&format!("{prefix}_tfr_freqs"), &g.tfr.freqs, &[g.tfr.freqs.len()]);
    w.add_f64(&format!("{prefix}_tfr_times"), &g.tfr.times, &[g.tfr.times.len()]);
    w.add_f64_arr2(&format!("{prefix}_tfr"), &g.tfr.power);
    w.add_f64_arr2(&format!("{prefix}_tfr_db"), &g.tfr.to_db());
    for (band, bp) in &g.band_power {
        w.add_f64_arr1(&format!("{prefix}_band_{}", band.name), bp);
    }
    w.add_f64(&format!("{prefix}_peak"), &[g.peak.amplitude, g.peak.latency_ms], &[2]);
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = PipelineConfig {
        fs: args.fs,
        nyquist: args.fs / 2.0,
        stim_onset: args.stim_onset,
        cutoff_hz: args.cutoff,
        filter_order: args.order,
        z: args.z,
        max_freq: args.max_freq,
        win_start_ms: args.win_start_ms,
        win_end_ms: args.win_end_ms,
        ..PipelineConfig::default()
    };

    let rec = Recording::load(&args.input)?;
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    rec.save(&args.out_dir.join("raw_data.safetensors"))?;

    let out = run_pipeline(&rec, &cfg)?;

    write_lines(&args.out_dir.join("outlier_rejection_summary.txt"), &report::rejection_summary(&out))?;
    write_lines(&args.out_dir.join("tone_split_summary.txt"), &report::tone_summary(&out))?;
    write_lines(&args.out_dir.join("time_domain_results.txt"), &report::peak_summary(&out))?;

    for s in &out.sessions {
        let mut w = StWriter::new();
        add_group(&mut w, "low", &s.low);
        add_group(&mut w, "high", &s.high);
        w.add_f64_arr1("t_ms", &s.low.erp.t_ms);
        w.add_f64("tones", &[s.info.low_tone, s.info.high_tone], &[2]);
        w.add_i32(
            "counts",
            &[s.n_before as i32, s.n_after as i32, s.info.n_low as i32, s.info.n_high as i32],
            &[4],
        );
        w.write(&args.out_dir.join(format!("session_{}.safetensors", s.info.session)))?;
    }

    let mut pooled = StWriter::new();
    pooled.add_f64_arr2("lfp_low_all", &out.pooled_low()?);
    pooled.add_f64_arr2("lfp_high_all", &out.pooled_high()?);
    pooled.write(&args.out_dir.join("pooled.safetensors"))?;

    log::info!("results written to {}", args.out_dir.display());
    Ok(())
}
