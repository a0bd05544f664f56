//! Заполнение пропусков перед построением признаков.
//!
//! Оба источника записей (минимальный запрос при обслуживании и разобранная
//! выгрузка при обучении) приводятся к одному `CompletedListing`, дальше
//! признаки строит один и тот же `FeatureBuilder`.

use crate::config::{FeatureConfig, ServingDefaults, UNKNOWN};
use crate::stats::median;
use crate::types::{CompletedListing, MinimalListingRequest, NormalizedListing};

fn category(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// Этажность 0 считается пропуском в обоих путях.
fn floors_total_or(value: Option<f64>, default: f64) -> f64 {
    value.filter(|v| *v != 0.0).unwrap_or(default)
}

/// Медианы обучающего корпуса для площади и числа комнат.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorpusFill {
    pub total_area: f64,
    pub rooms_count: f64,
}

impl CorpusFill {
    pub fn from_corpus(listings: &[NormalizedListing], defaults: &ServingDefaults) -> Self {
        let areas: Vec<f64> = listings.iter().filter_map(|l| l.total_area).collect();
        let rooms: Vec<f64> = listings.iter().filter_map(|l| l.rooms_count).collect();
        Self {
            total_area: median(&areas).unwrap_or(defaults.total_area),
            rooms_count: median(&rooms).unwrap_or(defaults.rooms_count),
        }
    }
}

pub struct ListingAdapter<'a> {
    defaults: &'a ServingDefaults,
}

impl<'a> ListingAdapter<'a> {
    pub fn new(config: &'a FeatureConfig) -> Self {
        Self { defaults: &config.defaults }
    }

    /// Запрос на оценку -> полная запись с документированными значениями по умолчанию.
    pub fn from_request(&self, request: &MinimalListingRequest) -> CompletedListing {
        let d = self.defaults;
        CompletedListing {
            listing_id: Some(request.listing_id),
            total_area: request.total_area.unwrap_or(d.total_area),
            rooms_count: request.rooms_count.unwrap_or(d.rooms_count),
            floor: request.floor.unwrap_or(d.floor),
            floors_total: floors_total_or(request.floors_total, d.floors_total),
            loggia_count: request.loggia_count.unwrap_or(d.loggia_count),
            lat: request.lat,
            lon: request.lon,
            renovation: category(request.renovation.as_deref()),
            parking: category(request.parking.as_deref()),
            building_type: category(request.building_type.as_deref()),
            room_type: category(request.room_type.as_deref()),
            city: category(request.city.as_deref()),
            street: request.street.clone().filter(|s| !s.trim().is_empty()),
            complex: request.complex.clone().filter(|s| !s.trim().is_empty()),
            description: request.description.clone().unwrap_or_default(),
        }
    }

    /// Разобранная запись выгрузки -> полная запись.
    /// Площадь и комнаты заполняются медианами корпуса, остальное как при обслуживании.
    pub fn from_normalized(&self, listing: &NormalizedListing, fill: &CorpusFill) -> CompletedListing {
        let d = self.defaults;
        CompletedListing {
            listing_id: listing.listing_id,
            total_area: listing.total_area.unwrap_or(fill.total_area),
            rooms_count: listing.rooms_count.unwrap_or(fill.rooms_count),
            floor: listing.floor.unwrap_or(d.floor),
            floors_total: floors_total_or(listing.floors_total, d.floors_total),
            loggia_count: listing.loggia_count(),
            lat: listing.lat,
            lon: listing.lon,
            renovation: category(listing.renovation.as_deref()),
            parking: category(listing.parking.as_deref()),
            building_type: category(listing.building_type.as_deref()),
            room_type: category(listing.room_type.as_deref()),
            city: category(listing.city.as_deref()),
            street: listing.street.clone(),
            complex: listing.complex.clone(),
            description: listing.description.clone().unwrap_or_default(),
        }
    }

    pub fn complete_corpus(&self, listings: &[NormalizedListing]) -> Vec<CompletedListing> {
        let fill = CorpusFill::from_corpus(listings, self.defaults);
        tracing::debug!(
            "Corpus fill: total_area={:.1}, rooms_count={:.1}",
            fill.total_area,
            fill.rooms_count
        );
        listings.iter().map(|l| self.from_normalized(l, &fill)).collect()
    }
}
