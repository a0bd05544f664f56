//! Пакетные задачи: построение артефактов, обучение, пакетный прогноз

use crate::artifacts::{self, ArtifactSnapshot, ArtifactStore};
use crate::config::{PipelineConfig, TrainingContextPolicy};
use crate::error::{PipelineError, Result};
use crate::models::calibration::{CalibrationContext, Calibrator};
use crate::models::ensemble::{Ensemble, PricePredictor};
use crate::preprocessing::adapter::ListingAdapter;
use crate::preprocessing::feature_engineering::{FeatureBuilder, FeatureTable};
use crate::preprocessing::normalization::ListingNormalizer;
use crate::types::{CompletedListing, FlatPrediction, RawListing};

/// Подготовленный корпус: полные записи и цены (если известны), строка к строке.
#[derive(Debug, Clone)]
pub struct PreparedCorpus {
    pub listings: Vec<CompletedListing>,
    pub prices: Vec<Option<f64>>,
}

impl PreparedCorpus {
    pub fn prepare(raw: &[RawListing], config: &PipelineConfig) -> Self {
        let normalized = ListingNormalizer::new(&config.normalizer).normalize_batch(raw);
        let prices = normalized.iter().map(|l| l.price).collect();
        let listings = ListingAdapter::new(&config.features).complete_corpus(&normalized);
        Self { listings, prices }
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

/// Строит и публикует снимок артефактов и калибровочный контекст.
pub fn build_artifacts(
    corpus: &PreparedCorpus,
    config: &PipelineConfig,
    store: &dyn ArtifactStore,
) -> Result<(ArtifactSnapshot, CalibrationContext)> {
    tracing::info!("Building artifacts from {} listings...", corpus.len());
    let snapshot = ArtifactSnapshot::build(&corpus.listings, &config.features)?;
    let calibration = CalibrationContext::from_training(&corpus.listings, &corpus.prices, config)?;

    snapshot.publish(store, corpus.len())?;
    artifacts::save_json(store, artifacts::CALIBRATION_CONTEXT, &calibration)?;
    Ok((snapshot, calibration))
}

/// Статистики для признаков при обучении, в зависимости от политики.
pub fn training_snapshot(
    corpus: &PreparedCorpus,
    config: &PipelineConfig,
    store: &dyn ArtifactStore,
) -> Result<ArtifactSnapshot> {
    match config.features.training_policy {
        TrainingContextPolicy::Recompute => ArtifactSnapshot::build(&corpus.listings, &config.features),
        TrainingContextPolicy::Frozen => ArtifactSnapshot::load(store),
    }
}

/// Обучает ансамбль на строках с известной ценой и публикует его.
pub fn train(corpus: &PreparedCorpus, config: &PipelineConfig, store: &dyn ArtifactStore) -> Result<Ensemble> {
    let snapshot = training_snapshot(corpus, config, store)?;
    let table = FeatureBuilder::new(&config.features, &snapshot).build_table(&corpus.listings);

    let priced: Vec<usize> = corpus
        .prices
        .iter()
        .enumerate()
        .filter(|(_, p)| matches!(p, Some(price) if *price >= 0.0))
        .map(|(i, _)| i)
        .collect();
    if priced.is_empty() {
        return Err(PipelineError::Model("no listings with a price to train on".to_string()));
    }
    let prices: Vec<f64> = priced.iter().filter_map(|&i| corpus.prices[i]).collect();
    tracing::info!("Training on {} of {} listings", priced.len(), corpus.len());

    let ensemble = Ensemble::train(&table.select(&priced), &prices, &config.training)?;
    artifacts::save_json(store, artifacts::ENSEMBLE, &ensemble)?;
    tracing::info!("Training finished.");
    Ok(ensemble)
}

pub fn load_ensemble(store: &dyn ArtifactStore) -> Result<Ensemble> {
    artifacts::load_json(store, artifacts::ENSEMBLE)
}

/// Прогноз для батча выгрузки: признаки по замороженному снимку,
/// затем калибровка. Порядок строк сохраняется.
pub fn predict_batch(
    corpus: &PreparedCorpus,
    config: &PipelineConfig,
    snapshot: &ArtifactSnapshot,
    calibration: &CalibrationContext,
    predictor: &dyn PricePredictor,
) -> Result<Vec<FlatPrediction>> {
    if corpus.is_empty() {
        return Err(PipelineError::EmptyBatch);
    }

    let table: FeatureTable = FeatureBuilder::new(&config.features, snapshot).build_table(&corpus.listings);
    tracing::info!("Generating raw predictions...");
    let raw = predictor.predict_raw(&table)?;

    let calibrator = Calibrator::new(&config.calibration, &config.features.capital_city, calibration);
    let calibrated = calibrator.calibrate(&raw, &corpus.listings)?;

    Ok(corpus
        .listings
        .iter()
        .zip(calibrated)
        .map(|(listing, price)| FlatPrediction {
            listing_id: listing.listing_id,
            predicted_price: price,
        })
        .collect())
}
