use crate::error::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};

/// Frozen standardisation fit: `z = (x - mean) / scale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.mean.len() != self.scale.len() {
            return Err(format!(
                "scaler has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err("scaler parameters must be finite".into());
        }
        Ok(())
    }

    pub fn normalize(&self, x: &[f64]) -> AnalysisResult<Vec<f64>> {
        if x.len() != self.n_features() {
            return Err(AnalysisError::ShapeMismatch {
                expected: self.n_features(),
                actual: x.len(),
            });
        }
        Ok(x.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(value, (mean, scale))| {
                // Constant training features were fit with a zero scale.
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (value - mean) / scale
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaler() -> StandardScaler {
        StandardScaler {
            mean: vec![1.0, 10.0, 0.0],
            scale: vec![0.5, 2.0, 0.0],
        }
    }

    #[test]
    fn standardises_each_feature() {
        let z = scaler().normalize(&[2.0, 6.0, 3.0]).unwrap();
        assert_eq!(z, vec![2.0, -2.0, 3.0]);
    }

    #[test]
    fn rejects_wrong_dimensionality() {
        let err = scaler().normalize(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::ShapeMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn mismatched_parameter_lengths_fail_validation() {
        let bad = StandardScaler {
            mean: vec![0.0; 8],
            scale: vec![1.0; 7],
        };
        assert!(bad.validate().is_err());
    }
}
