//! Comparator trait and built-in implementations
//!
//! A comparator scores a ground-truth value against a predicted value
//! and returns a similarity in [0,1]. The engine looks comparators up
//! by name in a [`crate::ComparatorRegistry`]; callers can plug in
//! their own (embedding- or LLM-backed) implementations behind the
//! same trait.

use crate::distance::{
    absolute_number_similarity, edit_distance_similarity, jaccard_tokens,
    relative_number_similarity, trigram_similarity,
};
use serde_json::Value;

/// Errors a similarity function may signal
///
/// The engine does not propagate these: a failing comparator scores 0.0
/// and the pair is classified as a false discovery.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ComparatorError {
    #[error("Comparator returned {0}, outside [0,1]")]
    OutOfRange(f64),

    #[error("External similarity service failed: {0}")]
    External(String),
}

/// A named similarity function over JSON values
pub trait Comparator: Send + Sync {
    /// Score `gt` against `pred`, returning a similarity in [0,1]
    ///
    /// Implementations must treat unparseable input as wholly dissimilar
    /// (score 0.0) rather than erroring.
    fn similarity(&self, gt: &Value, pred: &Value) -> Result<f64, ComparatorError>;
}

impl<F> Comparator for F
where
    F: Fn(&Value, &Value) -> Result<f64, ComparatorError> + Send + Sync,
{
    fn similarity(&self, gt: &Value, pred: &Value) -> Result<f64, ComparatorError> {
        self(gt, pred)
    }
}

/// Render a primitive value as text for string-based comparators
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Extract a number, accepting numeric strings
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Strict equality on the underlying JSON value
///
/// Numbers compare numerically (`2` equals `2.0`), strings are
/// case-sensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exact;

impl Comparator for Exact {
    fn similarity(&self, gt: &Value, pred: &Value) -> Result<f64, ComparatorError> {
        let equal = match (as_number(gt), as_number(pred)) {
            (Some(a), Some(b)) => a == b,
            _ => gt == pred,
        };
        Ok(if equal { 1.0 } else { 0.0 })
    }
}

/// ASCII case-insensitive string equality
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactCaseInsensitive;

impl Comparator for ExactCaseInsensitive {
    fn similarity(&self, gt: &Value, pred: &Value) -> Result<f64, ComparatorError> {
        match (as_text(gt), as_text(pred)) {
            (Some(a), Some(b)) => Ok(if a.eq_ignore_ascii_case(&b) { 1.0 } else { 0.0 }),
            _ => Ok(0.0),
        }
    }
}

/// Normalized Levenshtein similarity; non-strings are stringified first
#[derive(Debug, Clone, Copy, Default)]
pub struct EditDistance;

impl Comparator for EditDistance {
    fn similarity(&self, gt: &Value, pred: &Value) -> Result<f64, ComparatorError> {
        match (as_text(gt), as_text(pred)) {
            (Some(a), Some(b)) => Ok(edit_distance_similarity(&a, &b)),
            _ => Ok(0.0),
        }
    }
}

/// Numeric comparator with a tolerance band
///
/// Relative by default: differences within `tolerance * max(|a|, |b|)`
/// score 1.0, beyond the band the score decays as `1 - relative_diff`.
/// [`Tolerance::absolute`] switches to a fixed-width band with
/// exponential decay.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    tolerance: f64,
    absolute: bool,
}

/// Default relative tolerance for the `tolerance` registry entry
pub const DEFAULT_TOLERANCE: f64 = 0.01;

impl Default for Tolerance {
    fn default() -> Self {
        Self::relative(DEFAULT_TOLERANCE)
    }
}

impl Tolerance {
    /// Relative tolerance: the band scales with the magnitudes compared
    pub fn relative(tolerance: f64) -> Self {
        Self {
            tolerance,
            absolute: false,
        }
    }

    /// Absolute tolerance: a fixed-width band
    pub fn absolute(tolerance: f64) -> Self {
        Self {
            tolerance,
            absolute: true,
        }
    }
}

impl Comparator for Tolerance {
    fn similarity(&self, gt: &Value, pred: &Value) -> Result<f64, ComparatorError> {
        match (as_number(gt), as_number(pred)) {
            (Some(a), Some(b)) => Ok(if self.absolute {
                absolute_number_similarity(a, b, self.tolerance)
            } else {
                relative_number_similarity(a, b, self.tolerance)
            }),
            _ => Ok(0.0),
        }
    }
}

/// Whitespace-token Jaccard similarity, lowercased
#[derive(Debug, Clone, Copy, Default)]
pub struct Jaccard;

impl Comparator for Jaccard {
    fn similarity(&self, gt: &Value, pred: &Value) -> Result<f64, ComparatorError> {
        match (as_text(gt), as_text(pred)) {
            (Some(a), Some(b)) => Ok(jaccard_tokens(&a, &b)),
            _ => Ok(0.0),
        }
    }
}

/// Character-trigram similarity, lowercased
#[derive(Debug, Clone, Copy, Default)]
pub struct Trigram;

impl Comparator for Trigram {
    fn similarity(&self, gt: &Value, pred: &Value) -> Result<f64, ComparatorError> {
        match (as_text(gt), as_text(pred)) {
            (Some(a), Some(b)) => Ok(trigram_similarity(&a, &b)),
            _ => Ok(0.0),
        }
    }
}
