//! Trial containers.
//!
//! [`Recording`] is the immutable `[S, T, N]` input (sessions × trials ×
//! samples) plus the `[S, T]` tone labels.
//!
//! [`CleanedTrials`] is the ragged result of outlier rejection, stored as an
//! arena: every kept trial of every session lives in one contiguous
//! `[total_kept, N]` array and each session owns a `start..end` row range.
use std::ops::Range;

use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::error::{LfpError, Result};

/// Multi-session LFP recording with one tone label per trial.
#[derive(Debug, Clone)]
pub struct Recording {
    /// `[S, T, N]` voltage-like samples.
    pub lfp: Array3<f64>,
    /// `[S, T]` tone-frequency codes.
    pub tones: Array2<f64>,
}

impl Recording {
    /// Pair a trial tensor with its tone labels.
    ///
    /// Fails with [`LfpError::DataShape`] when the `(session, trial)`
    /// dimensions of the two tensors disagree or the recording is empty.
    pub fn new(lfp: Array3<f64>, tones: Array2<f64>) -> Result<Self> {
        let (n_s, n_t, n_x) = lfp.dim();
        if tones.dim() != (n_s, n_t) {
            return Err(LfpError::DataShape(format!(
                "tone tensor {:?} does not match trial tensor sessions × trials ({n_s}, {n_t})",
                tones.dim()
            )));
        }
        if n_s == 0 || n_t == 0 || n_x == 0 {
            return Err(LfpError::DataShape(format!(
                "empty recording: {n_s} sessions × {n_t} trials × {n_x} samples"
            )));
        }
        Ok(Self { lfp, tones })
    }

    #[inline]
    pub fn n_sessions(&self) -> usize {
        self.lfp.dim().0
    }

    #[inline]
    pub fn n_trials(&self) -> usize {
        self.lfp.dim().1
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.lfp.dim().2
    }
}

/// Trials that survived outlier rejection, grouped by session.
#[derive(Debug, Clone)]
pub struct CleanedTrials {
    trials: Array2<f64>,
    tones: Vec<f64>,
    ranges: Vec<Range<usize>>,
}

impl CleanedTrials {
    /// Build the arena from a flat trial store and contiguous session ranges.
    ///
    /// `ranges` must tile `0..trials.nrows()` in order.
    pub(crate) fn from_parts(
        trials: Array2<f64>,
        tones: Vec<f64>,
        ranges: Vec<Range<usize>>,
    ) -> Result<Self> {
        if trials.nrows() != tones.len() {
            return Err(LfpError::DataShape(format!(
                "{} cleaned trials but {} tone labels",
                trials.nrows(),
                tones.len()
            )));
        }
        let mut cursor = 0;
        for r in &ranges {
            if r.start != cursor || r.end < r.start {
                return Err(LfpError::DataShape(format!(
                    "session range {r:?} does not continue at row {cursor}"
                )));
            }
            cursor = r.end;
        }
        if cursor != trials.nrows() {
            return Err(LfpError::DataShape(format!(
                "session ranges cover {cursor} of {} rows",
                trials.nrows()
            )));
        }
        Ok(Self { trials, tones, ranges })
    }

    #[inline]
    pub fn n_sessions(&self) -> usize {
        self.ranges.len()
    }

    /// Total kept trials across all sessions.
    #[inline]
    pub fn n_trials(&self) -> usize {
        self.trials.nrows()
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.trials.ncols()
    }

    /// Kept trial count of session `s`.
    pub fn session_len(&self, s: usize) -> usize {
        self.ranges[s].len()
    }

    /// Kept trial counts, one per session.
    pub fn kept_counts(&self) -> Vec<usize> {
        self.ranges.iter().map(|r| r.len()).collect()
    }

    /// Row range of session `s` inside the arena.
    pub fn range(&self, s: usize) -> Range<usize> {
        self.ranges[s].clone()
    }

    /// Borrow session `s` as `([n_kept, N] trials, [n_kept] tones)`.
    pub fn session(&self, s: usize) -> (ArrayView2<'_, f64>, &[f64]) {
        let r = self.range(s);
        (
            self.trials.slice_axis(Axis(0), (r.start..r.end).into()),
            &self.tones[r],
        )
    }

    /// The whole `[total_kept, N]` arena.
    pub fn trials(&self) -> ArrayView2<'_, f64> {
        self.trials.view()
    }

    pub fn tones(&self) -> &[f64] {
        &self.tones
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_rejects_mismatched_tones() {
        let lfp = Array3::<f64>::zeros((2, 4, 10));
        let tones = Array2::<f64>::zeros((2, 3));
        assert!(matches!(Recording::new(lfp, tones), Err(LfpError::DataShape(_))));
    }

    #[test]
    fn arena_sessions_are_views_into_flat_store() {
        let trials = Array2::from_shape_fn((5, 3), |(r, _)| r as f64);
        let tones = vec![1.0, 2.0, 1.0, 2.0, 2.0];
        let cleaned = CleanedTrials::from_parts(trials, tones, vec![0..2, 2..5]).unwrap();

        assert_eq!(cleaned.kept_counts(), vec![2, 3]);
        let (t1, tones1) = cleaned.session(1);
        assert_eq!(t1.nrows(), 3);
        assert_eq!(t1[[0, 0]], 2.0);
        assert_eq!(tones1, &[1.0, 2.0, 2.0]);
    }

    #[test]
    fn arena_rejects_gapped_ranges() {
        let trials = Array2::<f64>::zeros((4, 3));
        let res = CleanedTrials::from_parts(trials, vec![0.0; 4], vec![0..1, 2..4]);
        assert!(res.is_err());
    }

    #[test]
    fn arena_allows_empty_sessions() {
        let trials = Array2::<f64>::zeros((2, 3));
        let cleaned =
            CleanedTrials::from_parts(trials, vec![1.0, 2.0], vec![0..0, 0..2]).unwrap();
        assert_eq!(cleaned.session_len(0), 0);
        assert_eq!(cleaned.session(0).0.nrows(), 0);
    }
}
