//! Постобработка сырых предсказаний ансамбля.
//!
//! Шаги применяются последовательно и включаются по отдельности:
//! 1. медиана цены по улице (справочно для смешивания),
//! 2. смешивание дорогих объявлений столицы с медианой улицы,
//! 3. подтягивание цен в ЖК из справочника,
//! 4. округление вниз до шага.
//!
//! Каждый шаг - чистая функция над батчем, порядок строк сохраняется.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::{CalibrationConfig, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::stats::{median, percentile};
use crate::types::CompletedListing;

/// Справочные цены из обучающего корпуса.
/// Таблица ЖК сюда не входит: она берётся из `CalibrationConfig` при запуске.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationContext {
    /// Улица -> медианная цена среди объявлений столицы
    pub street_medians: HashMap<String, f64>,
    pub global_median: f64,
}

impl CalibrationContext {
    /// `prices[i]` - цена `listings[i]`; строки без цены не участвуют.
    pub fn from_training(
        listings: &[CompletedListing],
        prices: &[Option<f64>],
        config: &PipelineConfig,
    ) -> Result<Self> {
        if listings.len() != prices.len() {
            return Err(PipelineError::Model(format!(
                "{} listings but {} prices",
                listings.len(),
                prices.len()
            )));
        }

        let capital = config.features.capital_city.as_str();
        let mut by_street: HashMap<String, Vec<f64>> = HashMap::new();
        let mut all_prices = Vec::new();

        for (listing, price) in listings.iter().zip(prices) {
            let Some(price) = price else { continue };
            all_prices.push(*price);
            if listing.city != capital {
                continue;
            }
            if let Some(street) = &listing.street {
                by_street.entry(street.clone()).or_default().push(*price);
            }
        }

        let global_median = median(&all_prices)
            .ok_or_else(|| PipelineError::MissingStatistic("global_median".to_string()))?;

        let street_medians: HashMap<String, f64> = by_street
            .into_iter()
            .filter_map(|(street, prices)| median(&prices).map(|m| (street, m)))
            .collect();

        tracing::info!(
            "Calibration context: {} streets in {}, global median {:.0}",
            street_medians.len(),
            capital,
            global_median
        );

        Ok(Self {
            street_medians,
            global_median,
        })
    }
}

pub struct Calibrator<'a> {
    config: &'a CalibrationConfig,
    capital_city: &'a str,
    context: &'a CalibrationContext,
}

impl<'a> Calibrator<'a> {
    pub fn new(
        config: &'a CalibrationConfig,
        capital_city: &'a str,
        context: &'a CalibrationContext,
    ) -> Self {
        Self {
            config,
            capital_city,
            context,
        }
    }

    /// Медиана улицы или общая медиана, если улицы нет в справочнике.
    pub fn street_medians(&self, rows: &[CompletedListing]) -> Vec<f64> {
        tracing::info!("Calculating street median shrink...");
        rows.iter()
            .map(|row| {
                row.street
                    .as_ref()
                    .and_then(|s| self.context.street_medians.get(s))
                    .copied()
                    .unwrap_or(self.context.global_median)
            })
            .collect()
    }

    /// Объявления столицы выше перцентиля батча смешиваются с медианой улицы:
    /// (1 - α) * raw + α * street_median.
    pub fn blend_expensive(
        &self,
        predictions: &[f64],
        rows: &[CompletedListing],
        street_medians: &[f64],
    ) -> Vec<f64> {
        let Some(threshold) = percentile(predictions, self.config.blend_percentile) else {
            return predictions.to_vec();
        };
        let alpha = self.config.alpha;

        let mut blended_count = 0;
        let blended = predictions
            .iter()
            .zip(rows)
            .zip(street_medians)
            .map(|((&prediction, row), &street_median)| {
                if row.city == self.capital_city && prediction > threshold {
                    blended_count += 1;
                    (1.0 - alpha) * prediction + alpha * street_median
                } else {
                    prediction
                }
            })
            .collect();

        tracing::info!("Blending {} expensive flats...", blended_count);
        blended
    }

    /// Цена ниже factor * медианы ЖК поднимается до raise * медианы.
    /// Справочник ЖК - `complex_medians` текущей конфигурации.
    pub fn apply_complex_corrections(&self, predictions: &[f64], rows: &[CompletedListing]) -> Vec<f64> {
        let mut corrected_by_complex: BTreeMap<&str, usize> = BTreeMap::new();

        let corrected = predictions
            .iter()
            .zip(rows)
            .map(|(&prediction, row)| {
                let Some((name, &reference)) = row
                    .complex
                    .as_ref()
                    .and_then(|c| self.config.complex_medians.get_key_value(c))
                else {
                    return prediction;
                };
                if prediction < reference * self.config.floor_factor {
                    *corrected_by_complex.entry(name.as_str()).or_insert(0) += 1;
                    reference * self.config.raise_factor
                } else {
                    prediction
                }
            })
            .collect();

        for (name, count) in &corrected_by_complex {
            tracing::info!("Corrected {} flats in {}", count, name);
        }
        corrected
    }

    pub fn calibrate(&self, predictions: &[f64], rows: &[CompletedListing]) -> Result<Vec<f64>> {
        if predictions.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }
        if predictions.len() != rows.len() {
            return Err(PipelineError::Model(format!(
                "{} predictions for {} listings",
                predictions.len(),
                rows.len()
            )));
        }

        tracing::info!("Starting prediction calibration...");
        let mut calibrated = predictions.to_vec();

        if self.config.street_blend {
            let street_medians = self.street_medians(rows);
            calibrated = self.blend_expensive(&calibrated, rows, &street_medians);
        }
        if self.config.complex_correction {
            calibrated = self.apply_complex_corrections(&calibrated, rows);
        }
        if self.config.rounding {
            if self.config.rounding_step <= 0.0 {
                return Err(PipelineError::Config(format!(
                    "rounding_step must be positive, got {}",
                    self.config.rounding_step
                )));
            }
            calibrated = round_prices(&calibrated, self.config.rounding_step);
        }

        tracing::info!("Calibration done.");
        Ok(calibrated)
    }
}

/// Округление вниз до ближайшего кратного шага.
pub fn round_prices(predictions: &[f64], step: f64) -> Vec<f64> {
    predictions.iter().map(|p| (p / step).floor() * step).collect()
}
