//! Оценка одиночных запросов: адаптер -> признаки -> ансамбль -> калибровка.
//!
//! Состояние сервиса только читается, поэтому его можно делить между
//! запросами без блокировок.

use crate::artifacts::{self, ArtifactSnapshot, ArtifactStore};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::models::calibration::{CalibrationContext, Calibrator};
use crate::models::ensemble::{Ensemble, PricePredictor};
use crate::preprocessing::adapter::ListingAdapter;
use crate::preprocessing::feature_engineering::{FeatureBuilder, FeatureTable};
use crate::types::{CompletedListing, FlatPrediction, MinimalListingRequest};

pub struct PriceService {
    config: PipelineConfig,
    snapshot: ArtifactSnapshot,
    calibration: CalibrationContext,
    predictor: Box<dyn PricePredictor>,
}

impl PriceService {
    pub fn new(
        config: PipelineConfig,
        snapshot: ArtifactSnapshot,
        calibration: CalibrationContext,
        predictor: Box<dyn PricePredictor>,
    ) -> Self {
        Self {
            config,
            snapshot,
            calibration,
            predictor,
        }
    }

    /// Загружает снимок, калибровочный контекст и ансамбль из хранилища.
    pub fn load(config: PipelineConfig, store: &dyn ArtifactStore) -> Result<Self> {
        let snapshot = ArtifactSnapshot::load(store)?;
        let calibration: CalibrationContext = artifacts::load_json(store, artifacts::CALIBRATION_CONTEXT)?;
        let ensemble: Ensemble = artifacts::load_json(store, artifacts::ENSEMBLE)?;
        tracing::info!(
            "Service loaded: {} combos, {} ensemble members",
            snapshot.combo_freq.len(),
            ensemble.members().len()
        );
        Ok(Self::new(config, snapshot, calibration, Box::new(ensemble)))
    }

    pub fn complete(&self, requests: &[MinimalListingRequest]) -> Vec<CompletedListing> {
        let adapter = ListingAdapter::new(&self.config.features);
        requests.iter().map(|r| adapter.from_request(r)).collect()
    }

    pub fn features(&self, requests: &[MinimalListingRequest]) -> FeatureTable {
        FeatureBuilder::new(&self.config.features, &self.snapshot).build_table(&self.complete(requests))
    }

    pub fn predict_many(&self, requests: &[MinimalListingRequest]) -> Result<Vec<FlatPrediction>> {
        if requests.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }

        let listings = self.complete(requests);
        let table = FeatureBuilder::new(&self.config.features, &self.snapshot).build_table(&listings);
        let raw = self.predictor.predict_raw(&table)?;
        tracing::debug!("raw: {:?}", raw);

        let calibrator = Calibrator::new(
            &self.config.calibration,
            &self.config.features.capital_city,
            &self.calibration,
        );
        let calibrated = calibrator.calibrate(&raw, &listings)?;

        Ok(requests
            .iter()
            .zip(calibrated)
            .map(|(request, price)| FlatPrediction {
                listing_id: Some(request.listing_id),
                predicted_price: price,
            })
            .collect())
    }

    pub fn predict(&self, request: &MinimalListingRequest) -> Result<FlatPrediction> {
        self.predict_many(std::slice::from_ref(request))?
            .pop()
            .ok_or(PipelineError::EmptyBatch)
    }
}
