use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, StemError};

/// Per-input gain multipliers, in input order.
///
/// Values are literal multipliers: negatives invert phase and values above
/// 1.0 amplify. Nothing is clamped here.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeVector(Vec<f32>);

impl VolumeVector {
    pub fn new(volumes: Vec<f32>) -> Self {
        Self(volumes)
    }

    /// Parses a comma-separated list such as `0.5,1.0,0.8`.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: String| StemError::VolumeFormatInvalid {
            input: input.to_string(),
            reason,
        };

        if input.trim().is_empty() {
            return Err(invalid("expected at least one value".into()));
        }

        input
            .split(',')
            .map(|part| {
                let part = part.trim();
                let v: f32 = part
                    .parse()
                    .map_err(|_| invalid(format!("`{part}` is not a number")))?;
                if !v.is_finite() {
                    return Err(invalid(format!("`{part}` is not a finite number")));
                }
                Ok(v)
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Reconciles the vector to `n` inputs: missing entries are 1.0, extra
    /// entries are ignored.
    pub fn for_inputs(&self, n: usize) -> Vec<f32> {
        if self.0.len() > n {
            warn!(
                given = self.0.len(),
                inputs = n,
                "more volumes than inputs, ignoring the extra entries"
            );
        }
        (0..n).map(|i| self.0.get(i).copied().unwrap_or(1.0)).collect()
    }
}

impl FromStr for VolumeVector {
    type Err = StemError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Vec<f32>> for VolumeVector {
    fn from(v: Vec<f32>) -> Self {
        Self(v)
    }
}
