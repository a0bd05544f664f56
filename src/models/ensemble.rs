//! Ансамбль регрессоров на логарифмической шкале цены.
//!
//! Контракт: каждый участник возвращает log(1 + price), ансамбль
//! переводит каждое предсказание обратно через exp(x) - 1 и усредняет.

#![allow(non_snake_case)]

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::TrainingConfig;
use crate::error::{PipelineError, Result};
use crate::models::ridge::{FeatureEncoder, RidgeRegressor};
use crate::preprocessing::feature_engineering::FeatureTable;

/// Внешний предсказатель: таблица признаков -> сырые цены (по строке на объявление).
pub trait PricePredictor: Send + Sync {
    fn predict_raw(&self, table: &FeatureTable) -> Result<Vec<f64>>;
}

/// Среднее арифметическое exp(x) - 1 по участникам ансамбля.
pub fn average_expm1(member_predictions: &[Vec<f64>]) -> Result<Vec<f64>> {
    let Some(first) = member_predictions.first() else {
        return Err(PipelineError::Model("ensemble has no members".to_string()));
    };
    let n_rows = first.len();
    if member_predictions.iter().any(|p| p.len() != n_rows) {
        return Err(PipelineError::Model("members returned different row counts".to_string()));
    }

    let n_members = member_predictions.len() as f64;
    let mut raw = vec![0.0; n_rows];
    for predictions in member_predictions {
        for (acc, log_price) in raw.iter_mut().zip(predictions) {
            *acc += log_price.exp_m1() / n_members;
        }
    }
    Ok(raw)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleMember {
    pub seed: u64,
    model: RidgeRegressor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ensemble {
    encoder: FeatureEncoder,
    members: Vec<EnsembleMember>,
}

impl Ensemble {
    /// Обучение: цель log(1 + price), по одному участнику на seed,
    /// каждый на своей бутстрэп-выборке.
    pub fn train(table: &FeatureTable, prices: &[f64], config: &TrainingConfig) -> Result<Self> {
        if table.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }
        if table.len() != prices.len() {
            return Err(PipelineError::Model(format!(
                "{} feature rows but {} prices",
                table.len(),
                prices.len()
            )));
        }
        if config.seeds.is_empty() {
            return Err(PipelineError::Config("training.seeds is empty".to_string()));
        }

        let encoder = FeatureEncoder::fit(table)?;
        let X = encoder.transform(table);
        let y: Array1<f64> = prices.iter().map(|p| p.ln_1p()).collect();
        let n = X.nrows();

        let mut members = Vec::with_capacity(config.seeds.len());
        for &seed in &config.seeds {
            tracing::info!("Training model with seed {}...", seed);
            let mut rng = StdRng::seed_from_u64(seed);
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let X_sample = X.select(ndarray::Axis(0), &sample);
            let y_sample = y.select(ndarray::Axis(0), &sample);
            let model = RidgeRegressor::fit(&X_sample, &y_sample, config.ridge_alpha)?;
            members.push(EnsembleMember { seed, model });
        }

        tracing::info!("Ensemble trained: {} members on {} rows", members.len(), n);
        Ok(Self { encoder, members })
    }

    pub fn members(&self) -> &[EnsembleMember] {
        &self.members
    }

    /// Логарифмические предсказания каждого участника.
    pub fn predict_log(&self, table: &FeatureTable) -> Result<Vec<Vec<f64>>> {
        let X = self.encoder.transform(table);
        self.members
            .iter()
            .map(|m| m.model.predict(&X).map(|p| p.to_vec()))
            .collect()
    }
}

impl PricePredictor for Ensemble {
    fn predict_raw(&self, table: &FeatureTable) -> Result<Vec<f64>> {
        if table.is_empty() {
            return Ok(Vec::new());
        }
        let raw = average_expm1(&self.predict_log(table)?)?;
        tracing::debug!("Raw ensemble predictions: {:?}", raw);
        Ok(raw)
    }
}
