//! Ridge-регрессия и кодирование таблицы признаков в матрицу

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::config::UNKNOWN;
use crate::error::{PipelineError, Result};
use crate::preprocessing::feature_engineering::{FeatureTable, CATEGORICAL_FEATURES, NUMERIC_FEATURES};

/// Стандартизация числовых признаков и one-hot для категориальных.
/// Пропуски (NaN) заменяются средним по обучающей выборке.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureEncoder {
    mean: Vec<f64>,
    std: Vec<f64>,
    vocabulary: Vec<Vec<String>>,
}

impl FeatureEncoder {
    pub fn fit(table: &FeatureTable) -> Result<Self> {
        if table.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }

        let X = table.numeric_matrix();
        let mut mean = Vec::with_capacity(X.ncols());
        let mut std = Vec::with_capacity(X.ncols());
        for column in X.axis_iter(Axis(1)) {
            let present: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
            if present.is_empty() {
                mean.push(0.0);
                std.push(1.0);
                continue;
            }
            let m = present.iter().sum::<f64>() / present.len() as f64;
            let variance = present.iter().map(|v| (v - m).powi(2)).sum::<f64>() / present.len() as f64;
            // Избегаем деления на ноль
            let s = variance.sqrt();
            mean.push(m);
            std.push(if s < 1e-10 { 1.0 } else { s });
        }

        let vocabulary = (0..CATEGORICAL_FEATURES.len())
            .map(|j| {
                let mut values: Vec<String> = table
                    .rows
                    .iter()
                    .map(|row| row.categorical_values()[j].to_string())
                    .chain(std::iter::once(UNKNOWN.to_string()))
                    .collect();
                values.sort();
                values.dedup();
                values
            })
            .collect();

        Ok(Self { mean, std, vocabulary })
    }

    pub fn n_columns(&self) -> usize {
        NUMERIC_FEATURES.len() + self.vocabulary.iter().map(Vec::len).sum::<usize>()
    }

    pub fn transform(&self, table: &FeatureTable) -> Array2<f64> {
        let numeric = table.numeric_matrix();
        let mut X = Array2::zeros((table.len(), self.n_columns()));

        for (i, row) in table.rows.iter().enumerate() {
            for j in 0..NUMERIC_FEATURES.len() {
                let value = numeric[[i, j]];
                let value = if value.is_nan() { self.mean[j] } else { value };
                X[[i, j]] = (value - self.mean[j]) / self.std[j];
            }

            let mut offset = NUMERIC_FEATURES.len();
            for (j, value) in row.categorical_values().into_iter().enumerate() {
                let vocab = &self.vocabulary[j];
                let idx = vocab
                    .binary_search_by(|v| v.as_str().cmp(value))
                    .or_else(|_| vocab.binary_search_by(|v| v.as_str().cmp(UNKNOWN)));
                if let Ok(idx) = idx {
                    X[[i, offset + idx]] = 1.0;
                }
                offset += vocab.len();
            }
        }

        X
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegressor {
    alpha: f64,
    weights: Vec<f64>,
    bias: f64,
}

impl RidgeRegressor {
    /// (X^T X + αI) w = X^T y на центрированных данных
    pub fn fit(X: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<Self> {
        let n_samples = X.nrows();
        let n_features = X.ncols();

        if n_samples == 0 || n_features == 0 {
            return Err(PipelineError::EmptyBatch);
        }
        if y.len() != n_samples {
            return Err(PipelineError::Model(format!(
                "target length {} does not match {} rows",
                y.len(),
                n_samples
            )));
        }

        let x_mean = X.mean_axis(Axis(0)).ok_or(PipelineError::EmptyBatch)?;
        let y_mean = y.mean().ok_or(PipelineError::EmptyBatch)?;
        let Xc = X - &x_mean;
        let yc = y - y_mean;

        let mut xtx = Xc.t().dot(&Xc);
        for i in 0..n_features {
            xtx[[i, i]] += alpha;
        }
        let xty = Xc.t().dot(&yc);

        let weights = cholesky_solve(&xtx, &xty)?;
        let bias = y_mean - x_mean.dot(&weights);

        Ok(Self {
            alpha,
            weights: weights.to_vec(),
            bias,
        })
    }

    pub fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        if X.ncols() != self.weights.len() {
            return Err(PipelineError::Model(format!(
                "expected {} columns, got {}",
                self.weights.len(),
                X.ncols()
            )));
        }
        let weights = Array1::from(self.weights.clone());
        Ok(X.dot(&weights) + self.bias)
    }
}

/// Решение A x = b разложением Холецкого A = L L^T.
/// A = Xc^T Xc + αI симметрична и при α > 0 положительно определена;
/// неположительный элемент на диагонали L - ошибка.
fn cholesky_solve(A: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = A.nrows();
    let mut L = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let diag = A[[j, j]] - (0..j).map(|k| L[[j, k]].powi(2)).sum::<f64>();
        if diag.is_nan() || diag <= 1e-12 {
            return Err(PipelineError::Model(format!(
                "normal equations are not positive definite at column {j}"
            )));
        }
        let l_jj = diag.sqrt();
        L[[j, j]] = l_jj;

        for i in (j + 1)..n {
            let off = A[[i, j]] - (0..j).map(|k| L[[i, k]] * L[[j, k]]).sum::<f64>();
            L[[i, j]] = off / l_jj;
        }
    }

    // L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let acc = (0..i).map(|k| L[[i, k]] * z[k]).sum::<f64>();
        z[i] = (b[i] - acc) / L[[i, i]];
    }

    // L^T x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let acc = ((i + 1)..n).map(|k| L[[k, i]] * x[k]).sum::<f64>();
        x[i] = (z[i] - acc) / L[[i, i]];
    }

    Ok(x)
}
