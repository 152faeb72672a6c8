//! Ordinary least squares with an intercept
//!
//! Solves the normal equations `(XᵀX + λI) w = Xᵀy` with a Cholesky
//! factorization, falling back to LU. The tiny ridge `λ` (never applied to
//! the intercept) keeps the system solvable when a feature is constant or two
//! features are collinear, which happens whenever a sub-metric was missing
//! for every training example.

use crate::errors::{RelatednessError, Result};
use nalgebra::{DMatrix, DVector};

/// Ridge strength relative to the mean diagonal of `XᵀX`
const RIDGE: f64 = 1e-9;

/// A fitted linear model
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresFit {
    /// Intercept first, then one coefficient per feature
    pub coefficients: Vec<f64>,
    /// Coefficient of determination on the training data
    pub r_squared: f64,
}

impl LeastSquaresFit {
    /// Apply the model to one feature row
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.coefficients[0]
            + self.coefficients[1..]
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

/// Fit `targets ≈ w0 + Σ wj * features[j]`
pub fn fit_least_squares(features: &[Vec<f64>], targets: &[f64]) -> Result<LeastSquaresFit> {
    if features.is_empty() {
        return Err(RelatednessError::no_training_data(
            "least squares needs at least one row",
        ));
    }
    if features.len() != targets.len() {
        return Err(RelatednessError::dimension_mismatch(features.len(), targets.len()));
    }
    let p = features[0].len();
    if let Some(bad) = features.iter().find(|row| row.len() != p) {
        return Err(RelatednessError::dimension_mismatch(p, bad.len()));
    }

    let rows = features.len();
    let dim = p + 1;
    let x = DMatrix::from_fn(rows, dim, |r, c| if c == 0 { 1.0 } else { features[r][c - 1] });
    let y = DVector::from_column_slice(targets);

    let mut normal = x.transpose() * &x;
    let rhs = x.transpose() * &y;
    let scale = normal.diagonal().sum() / dim as f64;
    let ridge = RIDGE * scale.max(1.0);
    for d in 1..dim {
        normal[(d, d)] += ridge;
    }

    let solved = normal
        .clone()
        .cholesky()
        .map(|chol| chol.solve(&rhs))
        .or_else(|| normal.lu().solve(&rhs))
        .ok_or_else(|| {
            RelatednessError::no_training_data("training features form a singular system")
        })?;

    let fit = LeastSquaresFit {
        coefficients: solved.iter().copied().collect(),
        r_squared: 0.0,
    };
    let r_squared = r_squared(&fit, features, targets);
    Ok(LeastSquaresFit { r_squared, ..fit })
}

fn r_squared(fit: &LeastSquaresFit, features: &[Vec<f64>], targets: &[f64]) -> f64 {
    let mean = targets.iter().sum::<f64>() / targets.len() as f64;
    let total: f64 = targets.iter().map(|y| (y - mean).powi(2)).sum();
    if total == 0.0 {
        return 1.0;
    }
    let residual: f64 = features
        .iter()
        .zip(targets)
        .map(|(x, y)| (y - fit.predict(x)).powi(2))
        .sum();
    1.0 - residual / total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_exact_line() {
        let features: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64 / 10.0]).collect();
        let targets: Vec<f64> = features.iter().map(|x| 0.1 + 0.5 * x[0]).collect();
        let fit = fit_least_squares(&features, &targets).unwrap();
        assert!((fit.coefficients[0] - 0.1).abs() < 1e-6);
        assert!((fit.coefficients[1] - 0.5).abs() < 1e-6);
        assert!(fit.r_squared > 0.999_999);
    }

    #[test]
    fn test_two_features() {
        let features = vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![2.0, 1.0],
            vec![0.5, 3.0],
        ];
        let targets: Vec<f64> = features.iter().map(|x| 1.0 + 2.0 * x[0] - x[1]).collect();
        let fit = fit_least_squares(&features, &targets).unwrap();
        assert!((fit.coefficients[0] - 1.0).abs() < 1e-6);
        assert!((fit.coefficients[1] - 2.0).abs() < 1e-6);
        assert!((fit.coefficients[2] + 1.0).abs() < 1e-6);
        assert!((fit.predict(&[1.0, 2.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_constant_feature_does_not_blow_up() {
        let features = vec![vec![0.3, 1.0], vec![0.3, 2.0], vec![0.3, 3.0]];
        let targets = vec![1.0, 2.0, 3.0];
        let fit = fit_least_squares(&features, &targets).unwrap();
        assert!(fit.coefficients.iter().all(|c| c.is_finite()));
        for (x, y) in features.iter().zip(&targets) {
            assert!((fit.predict(x) - y).abs() < 1e-4);
        }
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            fit_least_squares(&[], &[]),
            Err(RelatednessError::NoTrainingData { .. })
        ));
        assert!(matches!(
            fit_least_squares(&[vec![1.0]], &[1.0, 2.0]),
            Err(RelatednessError::DimensionMismatch { .. })
        ));
        assert!(fit_least_squares(&[vec![1.0], vec![1.0, 2.0]], &[1.0, 2.0]).is_err());
    }
}
