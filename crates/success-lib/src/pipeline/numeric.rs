//! Numeric feature preprocessing: median imputation then standardization

use crate::error::{Result, SuccessError};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Replaces non-finite values with the per-column training median
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedianImputer {
    medians: Vec<f64>,
}

impl MedianImputer {
    pub fn fit(&mut self, x: &Array2<f64>) {
        self.medians = x
            .axis_iter(Axis(1))
            .map(|col| {
                let mut finite: Vec<f64> = col.iter().copied().filter(|v| v.is_finite()).collect();
                median(&mut finite)
            })
            .collect();
    }

    pub fn transform(&self, x: &mut Array2<f64>) {
        for (mut col, &fill) in x.axis_iter_mut(Axis(1)).zip(&self.medians) {
            col.mapv_inplace(|v| if v.is_finite() { v } else { fill });
        }
    }

    pub fn medians(&self) -> &[f64] {
        &self.medians
    }
}

/// Z-score scaling with population statistics; constant columns keep scale 1
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(&mut self, x: &Array2<f64>) {
        let n = x.nrows().max(1) as f64;
        self.means.clear();
        self.scales.clear();
        for col in x.axis_iter(Axis(1)) {
            let mean = col.sum() / n;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            self.means.push(mean);
            self.scales.push(if std > 1e-12 { std } else { 1.0 });
        }
    }

    pub fn transform(&self, x: &mut Array2<f64>) {
        for ((mut col, &mean), &scale) in x.axis_iter_mut(Axis(1)).zip(&self.means).zip(&self.scales) {
            col.mapv_inplace(|v| (v - mean) / scale);
        }
    }
}

/// Imputer followed by scaler over the engineered numeric block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NumericTransform {
    n_features: usize,
    imputer: MedianImputer,
    scaler: StandardScaler,
}

impl NumericTransform {
    pub fn fit_transform(&mut self, mut x: Array2<f64>) -> Array2<f64> {
        self.n_features = x.ncols();
        self.imputer.fit(&x);
        self.imputer.transform(&mut x);
        self.scaler.fit(&x);
        self.scaler.transform(&mut x);
        x
    }

    pub fn transform(&self, mut x: Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features {
            return Err(SuccessError::Inference(format!(
                "numeric block has {} columns, expected {}",
                x.ncols(),
                self.n_features
            )));
        }
        self.imputer.transform(&mut x);
        self.scaler.transform(&mut x);
        Ok(x)
    }
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_median() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(&mut []), 0.0);
    }

    #[test]
    fn test_imputer_fills_non_finite() {
        let mut x = array![[1.0, f64::NAN], [3.0, 4.0], [f64::NAN, 6.0]];
        let mut imputer = MedianImputer::default();
        imputer.fit(&x);
        assert_eq!(imputer.medians(), &[2.0, 5.0]);
        imputer.transform(&mut x);
        assert_eq!(x, array![[1.0, 5.0], [3.0, 4.0], [2.0, 6.0]]);
    }

    #[test]
    fn test_scaler_standardizes_and_handles_constants() {
        let x = array![[1.0, 7.0], [3.0, 7.0]];
        let mut transform = NumericTransform::default();
        let out = transform.fit_transform(x);
        assert_eq!(out, array![[-1.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn test_transform_rejects_wrong_width() {
        let mut transform = NumericTransform::default();
        transform.fit_transform(array![[1.0, 2.0]]);
        assert!(transform.transform(array![[1.0, 2.0, 3.0]]).is_err());
    }
}
