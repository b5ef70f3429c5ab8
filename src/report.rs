//! Plain-text summaries of a pipeline run.
use crate::pipeline::PipelineOutput;

/// `Session k: before -> after trials after outlier rejection`, one per session.
pub fn rejection_summary(out: &PipelineOutput) -> Vec<String> {
    out.sessions
        .iter()
        .map(|s| {
            format!(
                "Session {}: {} -> {} trials after outlier rejection",
                s.info.session, s.n_before, s.n_after
            )
        })
        .collect()
}

/// Low and high ERP trough per session.
pub fn peak_summary(out: &PipelineOutput) -> Vec<String> {
    out.sessions
        .iter()
        .flat_map(|s| {
            [("Low", &s.low), ("High", &s.high)].map(|(label, g)| {
                format!(
                    "Session {} {label}: peak_amp={:.4}, latency_ms={:.1}",
                    s.info.session, g.peak.amplitude, g.peak.latency_ms
                )
            })
        })
        .collect()
}

/// Tone assignment and group sizes per session.
pub fn tone_summary(out: &PipelineOutput) -> Vec<String> {
    out.sessions
        .iter()
        .map(|s| {
            format!(
                "Session {}: low tone {} ({} trials), high tone {} ({} trials)",
                s.info.session, s.info.low_tone, s.info.n_low, s.info.high_tone, s.info.n_high
            )
        })
        .collect()
}
