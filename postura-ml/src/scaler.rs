use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// Per-dimension mean and standard deviation captured at fit time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    pub mean: Array1<f64>,
    /// Population standard deviation; zero-variance columns hold 1.0.
    pub std: Array1<f64>,
}

/// Standardizes feature vectors to zero mean and unit variance.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FeatureScaler {
    state: Option<ScalerState>,
}

impl FeatureScaler {
    pub fn new() -> Self {
        FeatureScaler { state: None }
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&ScalerState> {
        self.state.as_ref()
    }

    /// Fitted dimensionality, if any.
    pub fn dim(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.mean.len())
    }

    /// Fit on `matrix`, rejecting zero-variance columns.
    pub fn fit(&mut self, matrix: &Array2<f64>) -> Result<()> {
        let (state, degenerate) = compute_state(matrix)?;
        if let Some(&dimension) = degenerate.first() {
            return Err(RiskError::DegenerateDimension { dimension });
        }
        self.state = Some(state);
        Ok(())
    }

    /// Fit on `matrix`, mapping zero-variance columns to 0 instead of failing.
    pub fn fit_lenient(&mut self, matrix: &Array2<f64>) -> Result<()> {
        let (state, degenerate) = compute_state(matrix)?;
        if !degenerate.is_empty() {
            log::warn!(
                "{} zero-variance feature dimension(s) scaled to 0: {:?}",
                degenerate.len(),
                degenerate
            );
        }
        self.state = Some(state);
        Ok(())
    }

    /// Standardize a single feature vector.
    pub fn transform(&self, vector: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        let state = self.state.as_ref().ok_or(RiskError::NotFitted)?;
        check_dim(state, vector.len())?;
        Ok((&vector - &state.mean) / &state.std)
    }

    /// Standardize a slice without going through ndarray views.
    pub fn transform_slice(&self, vector: &[f64]) -> Result<Array1<f64>> {
        self.transform(ArrayView1::from(vector))
    }

    /// Standardize every row of `matrix`.
    pub fn transform_matrix(&self, matrix: &Array2<f64>) -> Result<Array2<f64>> {
        let state = self.state.as_ref().ok_or(RiskError::NotFitted)?;
        check_dim(state, matrix.ncols())?;
        let mean = state.mean.view().insert_axis(Axis(0));
        let std = state.std.view().insert_axis(Axis(0));
        Ok((matrix - &mean) / &std)
    }
}

fn check_dim(state: &ScalerState, actual: usize) -> Result<()> {
    let expected = state.mean.len();
    if expected != actual {
        return Err(RiskError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// Returns the state plus the indices of zero-variance columns.
fn compute_state(matrix: &Array2<f64>) -> Result<(ScalerState, Vec<usize>)> {
    if matrix.nrows() == 0 {
        return Err(RiskError::EmptyInput("feature matrix has no rows"));
    }
    if matrix.ncols() == 0 {
        return Err(RiskError::EmptyInput("feature matrix has no columns"));
    }

    let n = matrix.nrows() as f64;
    let mean = matrix.sum_axis(Axis(0)) / n;
    let centered = matrix - &mean.view().insert_axis(Axis(0));
    let mut std = (centered.mapv(|v| v * v).sum_axis(Axis(0)) / n).mapv(f64::sqrt);

    let mut degenerate = Vec::new();
    for (i, s) in std.iter_mut().enumerate() {
        if *s == 0.0 || !s.is_finite() {
            degenerate.push(i);
            *s = 1.0;
        }
    }

    Ok((ScalerState { mean, std }, degenerate))
}
