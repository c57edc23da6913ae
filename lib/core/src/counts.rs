//! Classification labels and confusion-matrix counts
//!
//! A compared pair lands in exactly one of five buckets. False
//! positives are split into false discoveries (both sides present,
//! score below threshold) and false alarms (prediction invented a
//! value); `fp` is always their sum.

use serde::{Deserialize, Serialize};

/// Float tolerance for threshold comparisons
///
/// Boundary equality must not flip on float noise, so a score within
/// this distance below a threshold still counts as meeting it.
pub const SCORE_EPSILON: f64 = 1e-10;

/// True when `score` meets `threshold` under [`SCORE_EPSILON`]
pub fn meets_threshold(score: f64, threshold: f64) -> bool {
    score >= threshold - SCORE_EPSILON
}

/// Classification outcome of one compared pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    /// Ground truth present, prediction present, score meets threshold
    Tp,
    /// Both sides null-equivalent
    Tn,
    /// Both sides present, score below threshold
    Fd,
    /// Ground truth null, prediction present
    Fa,
    /// Ground truth present, prediction null
    Fn,
}

/// Classify a scored pair where both sides are present
pub fn classify_pair(score: f64, threshold: f64) -> Classification {
    if meets_threshold(score, threshold) {
        Classification::Tp
    } else {
        Classification::Fd
    }
}

/// Confusion-matrix counts; `fp = fd + fa` is maintained on every update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub tp: u32,
    pub tn: u32,
    pub fd: u32,
    pub fa: u32,
    pub fp: u32,
    #[serde(rename = "fn")]
    pub fn_: u32,
}

impl Counts {
    /// Counts with a single classification recorded
    pub fn single(label: Classification) -> Self {
        let mut counts = Self::default();
        counts.record(label);
        counts
    }

    /// Record one classification
    pub fn record(&mut self, label: Classification) {
        match label {
            Classification::Tp => self.tp += 1,
            Classification::Tn => self.tn += 1,
            Classification::Fd => {
                self.fd += 1;
                self.fp += 1;
            }
            Classification::Fa => {
                self.fa += 1;
                self.fp += 1;
            }
            Classification::Fn => self.fn_ += 1,
        }
    }

    /// Component-wise accumulate
    pub fn add(&mut self, other: &Counts) {
        self.tp += other.tp;
        self.tn += other.tn;
        self.fd += other.fd;
        self.fa += other.fa;
        self.fp += other.fp;
        self.fn_ += other.fn_;
    }

    /// Total classified pairs
    pub fn total(&self) -> u32 {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// True when nothing was misclassified (no fd, fa, or fn)
    pub fn mismatch_free(&self) -> bool {
        self.fd == 0 && self.fa == 0 && self.fn_ == 0
    }
}

/// Metrics derived from a counts block
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
}

impl DerivedMetrics {
    /// Compute derived metrics from counts
    ///
    /// `recall_with_fd` switches recall to `tp / (tp + fn + fd)`,
    /// penalizing wrong extractions as missed ones. Zero denominators
    /// yield 0.0 rather than NaN.
    pub fn from_counts(counts: &Counts, recall_with_fd: bool) -> Self {
        let tp = counts.tp as f64;
        let precision = ratio(tp, (counts.tp + counts.fp) as f64);
        let recall_denom = if recall_with_fd {
            counts.tp + counts.fn_ + counts.fd
        } else {
            counts.tp + counts.fn_
        };
        let recall = ratio(tp, recall_denom as f64);
        let f1 = ratio(2.0 * precision * recall, precision + recall);
        let accuracy = ratio(
            (counts.tp + counts.tn) as f64,
            (counts.tp + counts.tn + counts.fp + counts.fn_) as f64,
        );
        Self {
            precision,
            recall,
            f1,
            accuracy,
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fp_tracks_fd_plus_fa() {
        let mut counts = Counts::default();
        counts.record(Classification::Fd);
        counts.record(Classification::Fa);
        counts.record(Classification::Fa);
        counts.record(Classification::Tp);
        assert_eq!(counts.fp, counts.fd + counts.fa);
        assert_eq!(counts.fp, 3);

        let mut sum = Counts::single(Classification::Fd);
        sum.add(&counts);
        assert_eq!(sum.fp, sum.fd + sum.fa);
    }

    #[test]
    fn test_meets_threshold_boundary() {
        assert!(meets_threshold(0.7, 0.7));
        // A hair under the cutoff still matches under the epsilon.
        assert!(meets_threshold(0.7 - 1e-12, 0.7));
        assert!(!meets_threshold(0.69, 0.7));
    }

    #[test]
    fn test_classify_pair() {
        assert_eq!(classify_pair(0.9, 0.7), Classification::Tp);
        assert_eq!(classify_pair(0.5, 0.7), Classification::Fd);
    }

    #[test]
    fn test_derived_metrics() {
        let counts = Counts {
            tp: 6,
            tn: 1,
            fd: 1,
            fa: 1,
            fp: 2,
            fn_: 2,
        };
        let derived = DerivedMetrics::from_counts(&counts, false);
        assert!((derived.precision - 0.75).abs() < 1e-9);
        assert!((derived.recall - 0.75).abs() < 1e-9);
        assert!((derived.f1 - 0.75).abs() < 1e-9);
        assert!((derived.accuracy - 7.0 / 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_recall_with_fd() {
        let counts = Counts {
            tp: 6,
            fd: 2,
            fp: 2,
            fn_: 2,
            ..Counts::default()
        };
        let plain = DerivedMetrics::from_counts(&counts, false);
        let with_fd = DerivedMetrics::from_counts(&counts, true);
        assert!((plain.recall - 0.75).abs() < 1e-9);
        assert!((with_fd.recall - 0.6).abs() < 1e-9);
        // Precision is unaffected by the recall variant.
        assert_eq!(plain.precision, with_fd.precision);
    }

    #[test]
    fn test_zero_denominators() {
        let derived = DerivedMetrics::from_counts(&Counts::default(), false);
        assert_eq!(derived.precision, 0.0);
        assert_eq!(derived.recall, 0.0);
        assert_eq!(derived.f1, 0.0);
        assert_eq!(derived.accuracy, 0.0);
    }

    #[test]
    fn test_classification_serializes_uppercase() {
        let json = serde_json::to_string(&Classification::Fd).unwrap();
        assert_eq!(json, "\"FD\"");
    }
}
