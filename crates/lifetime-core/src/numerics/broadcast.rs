//! Scalar-or-array values with elementwise broadcasting.
//!
//! A calculator collects its `Sampled` inputs, asks [`broadcast_len`] for the
//! common length and evaluates its scalar formula once per index. Scalars
//! broadcast against arrays; arrays must all share one length.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Sampled {
    Scalar(f64),
    Array(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BroadcastError {
    #[error("field '{field}' has length {actual}, expected {expected} to match '{reference}'")]
    ShapeMismatch {
        field: &'static str,
        actual: usize,
        reference: &'static str,
        expected: usize,
    },
}

impl Sampled {
    /// Evaluate `value_at` at each broadcast index; `None` produces a scalar.
    pub fn from_fn(len: Option<usize>, mut value_at: impl FnMut(usize) -> f64) -> Self {
        match len {
            None => Self::Scalar(value_at(0)),
            Some(len) => Self::Array((0..len).map(value_at).collect()),
        }
    }

    /// Value at broadcast index `index`.
    ///
    /// Callers obtain `index` from [`broadcast_len`], so arrays are long enough.
    pub fn at(&self, index: usize) -> f64 {
        match self {
            Self::Scalar(value) => *value,
            Self::Array(values) => values[index],
        }
    }

    pub fn array_len(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => None,
            Self::Array(values) => Some(values.len()),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(value) => Some(*value),
            Self::Array(_) => None,
        }
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        let len = self.array_len().unwrap_or(1);
        (0..len).map(move |index| self.at(index))
    }

    pub fn map(&self, mut transform: impl FnMut(f64) -> f64) -> Self {
        match self {
            Self::Scalar(value) => Self::Scalar(transform(*value)),
            Self::Array(values) => Self::Array(values.iter().copied().map(transform).collect()),
        }
    }
}

impl Default for Sampled {
    fn default() -> Self {
        Self::Scalar(0.0)
    }
}

impl From<f64> for Sampled {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<f64>> for Sampled {
    fn from(values: Vec<f64>) -> Self {
        Self::Array(values)
    }
}

impl From<&[f64]> for Sampled {
    fn from(values: &[f64]) -> Self {
        Self::Array(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Sampled {
    fn from(values: [f64; N]) -> Self {
        Self::Array(values.to_vec())
    }
}

/// Common array length of `fields`, or `None` when every field is scalar.
pub fn broadcast_len(fields: &[(&'static str, &Sampled)]) -> Result<Option<usize>, BroadcastError> {
    let mut reference: Option<(&'static str, usize)> = None;

    for &(field, value) in fields {
        let Some(actual) = value.array_len() else {
            continue;
        };
        match reference {
            None => reference = Some((field, actual)),
            Some((reference_field, expected)) if expected != actual => {
                return Err(BroadcastError::ShapeMismatch {
                    field,
                    actual,
                    reference: reference_field,
                    expected,
                });
            }
            Some(_) => {}
        }
    }

    Ok(reference.map(|(_, len)| len))
}
