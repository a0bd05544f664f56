//! Построение вектора признаков для ансамбля.
//!
//! Один и тот же код используется при обучении и при обслуживании: вход
//! всегда `CompletedListing`, статистики корпуса всегда берутся из
//! `ArtifactSnapshot`. Расхождение train/serve возможно только через
//! разные снимки, но не через разную логику.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::artifacts::ArtifactSnapshot;
use crate::config::FeatureConfig;
use crate::types::CompletedListing;

/// Порядок признаков, который ожидает модель.
pub const FEATURES: [&str; 18] = [
    "total_area",
    "renovation",
    "parking",
    "lat",
    "lon",
    "building_type",
    "room_type",
    "rarity_index",
    "flag_big_area",
    "rooms_count",
    "loggia_count",
    "floor_ratio",
    "city",
    "exp",
    "dist_center",
    "log_area",
    "area_sq",
    "lux_anchor_flag",
];

pub const CATEGORICAL_FEATURES: [&str; 5] =
    ["renovation", "parking", "building_type", "room_type", "city"];

pub const NUMERIC_FEATURES: [&str; 13] = [
    "total_area",
    "lat",
    "lon",
    "rarity_index",
    "flag_big_area",
    "rooms_count",
    "loggia_count",
    "floor_ratio",
    "exp",
    "dist_center",
    "log_area",
    "area_sq",
    "lux_anchor_flag",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub total_area: f64,
    pub renovation: String,
    pub parking: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub building_type: String,
    pub room_type: String,
    pub rarity_index: f64,
    pub flag_big_area: u8,
    pub rooms_count: f64,
    pub loggia_count: f64,
    pub floor_ratio: f64,
    pub city: String,
    pub exp: f64,
    pub dist_center: f64,
    pub log_area: f64,
    pub area_sq: f64,
    pub lux_anchor_flag: u8,
}

impl FeatureVector {
    /// Числовые признаки в порядке `NUMERIC_FEATURES`; пропуск координат -> NaN.
    pub fn numeric_values(&self) -> [f64; 13] {
        [
            self.total_area,
            self.lat.unwrap_or(f64::NAN),
            self.lon.unwrap_or(f64::NAN),
            self.rarity_index,
            self.flag_big_area as f64,
            self.rooms_count,
            self.loggia_count,
            self.floor_ratio,
            self.exp,
            self.dist_center,
            self.log_area,
            self.area_sq,
            self.lux_anchor_flag as f64,
        ]
    }

    /// Категориальные признаки в порядке `CATEGORICAL_FEATURES`.
    pub fn categorical_values(&self) -> [&str; 5] {
        [
            self.renovation.as_str(),
            self.parking.as_str(),
            self.building_type.as_str(),
            self.room_type.as_str(),
            self.city.as_str(),
        ]
    }
}

/// Таблица признаков батча. Порядок строк совпадает с порядком объявлений.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub rows: Vec<FeatureVector>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn numeric_matrix(&self) -> Array2<f64> {
        let mut matrix = Array2::zeros((self.rows.len(), NUMERIC_FEATURES.len()));
        for (i, row) in self.rows.iter().enumerate() {
            for (j, value) in row.numeric_values().iter().enumerate() {
                matrix[[i, j]] = *value;
            }
        }
        matrix
    }

    pub fn select(&self, indices: &[usize]) -> FeatureTable {
        FeatureTable {
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

/// Ключ комбинации "площадь_комнаты": обе величины округляются до целого.
pub fn combo_key(total_area: f64, rooms_count: f64) -> String {
    format!("{}_{}", total_area.round() as i64, rooms_count.round() as i64)
}

pub fn floor_ratio(floor: f64, floors_total: f64) -> f64 {
    if floors_total == 0.0 {
        return 0.0;
    }
    (floor / floors_total).clamp(0.0, 1.0)
}

pub fn rarity_index(combo_frequency: u64) -> f64 {
    1.0 / (combo_frequency as f64 + 1.0)
}

pub struct FeatureBuilder<'a> {
    config: &'a FeatureConfig,
    snapshot: &'a ArtifactSnapshot,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(config: &'a FeatureConfig, snapshot: &'a ArtifactSnapshot) -> Self {
        Self { config, snapshot }
    }

    pub fn build(&self, listing: &CompletedListing) -> FeatureVector {
        let area = listing.total_area;

        let combo_frequency = self
            .snapshot
            .combo_freq
            .get(&combo_key(area, listing.rooms_count))
            .copied()
            .unwrap_or(0);
        let rarity = rarity_index(combo_frequency);

        let is_capital = (listing.city == self.config.capital_city) as u8 as f64;
        let premium = self
            .config
            .premium_renovations
            .iter()
            .any(|r| *r == listing.renovation) as u8 as f64;

        let dist_center = center_distance(self.config, &listing.city, listing.lat, listing.lon)
            .unwrap_or(self.snapshot.dist_center_median);

        FeatureVector {
            total_area: area,
            renovation: listing.renovation.clone(),
            parking: listing.parking.clone(),
            lat: listing.lat,
            lon: listing.lon,
            building_type: listing.building_type.clone(),
            room_type: listing.room_type.clone(),
            rarity_index: rarity,
            flag_big_area: (area > self.snapshot.area_threshold) as u8,
            rooms_count: listing.rooms_count,
            loggia_count: listing.loggia_count,
            floor_ratio: floor_ratio(listing.floor, listing.floors_total),
            city: listing.city.clone(),
            exp: area * is_capital * premium * rarity,
            dist_center,
            log_area: area.ln_1p(),
            area_sq: area.powi(2),
            lux_anchor_flag: lux_anchor_flag(&self.config.lux_keywords, &listing.description),
        }
    }

    pub fn build_table(&self, listings: &[CompletedListing]) -> FeatureTable {
        FeatureTable {
            rows: listings.iter().map(|l| self.build(l)).collect(),
        }
    }
}

/// Евклидово расстояние в градусах до центра города из справочника.
/// None, если города нет в справочнике или нет координат.
pub fn center_distance(
    config: &FeatureConfig,
    city: &str,
    lat: Option<f64>,
    lon: Option<f64>,
) -> Option<f64> {
    let center = config.city_centers.get(city)?;
    let (lat, lon) = (lat?, lon?);
    Some(((lat - center.lat).powi(2) + (lon - center.lon).powi(2)).sqrt())
}

pub fn lux_anchor_flag(keywords: &[String], description: &str) -> u8 {
    let text = description.to_lowercase();
    keywords.iter().any(|k| text.contains(k.as_str())) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn snapshot() -> ArtifactSnapshot {
        let mut combo_freq = HashMap::new();
        combo_freq.insert("45_1".to_string(), 3);
        combo_freq.insert("80_3".to_string(), 1);
        ArtifactSnapshot {
            combo_freq,
            area_threshold: 100.0,
            dist_center_median: 0.15,
        }
    }

    fn listing() -> CompletedListing {
        CompletedListing {
            listing_id: Some(1),
            total_area: 80.0,
            rooms_count: 3.0,
            floor: 4.0,
            floors_total: 16.0,
            loggia_count: 1.0,
            lat: Some(55.76),
            lon: Some(37.62),
            renovation: "Евроремонт".to_string(),
            parking: "Подземная".to_string(),
            building_type: "Монолитный".to_string(),
            room_type: "Изолированная".to_string(),
            city: "Москва".to_string(),
            street: Some("улица Арбат".to_string()),
            complex: None,
            description: "Панорамное остекление и консьерж".to_string(),
        }
    }

    #[test]
    fn test_area_transforms() {
        let config = FeatureConfig::default();
        let snapshot = snapshot();
        let features = FeatureBuilder::new(&config, &snapshot).build(&listing());
        assert!((features.log_area - 81.0_f64.ln()).abs() < 1e-12);
        assert_eq!(features.area_sq, 6400.0);
        assert_eq!(features.flag_big_area, 0);
        assert_eq!(features.floor_ratio, 0.25);
    }

    #[test]
    fn test_rarity_and_exp() {
        let config = FeatureConfig::default();
        let snapshot = snapshot();
        let features = FeatureBuilder::new(&config, &snapshot).build(&listing());
        assert_eq!(features.rarity_index, 0.5);
        assert_eq!(features.exp, 40.0);

        let mut plain = listing();
        plain.renovation = "unknown".to_string();
        let features = FeatureBuilder::new(&config, &snapshot).build(&plain);
        assert_eq!(features.exp, 0.0);
    }

    #[test]
    fn test_unseen_combo_has_rarity_one() {
        let config = FeatureConfig::default();
        let snapshot = snapshot();
        let mut unusual = listing();
        unusual.total_area = 233.4;
        let features = FeatureBuilder::new(&config, &snapshot).build(&unusual);
        assert_eq!(features.rarity_index, 1.0);
        assert_eq!(features.flag_big_area, 1);
    }

    #[test]
    fn test_distance_fallback_to_median() {
        let config = FeatureConfig::default();
        let snapshot = snapshot();
        let builder = FeatureBuilder::new(&config, &snapshot);

        let features = builder.build(&listing());
        let expected = ((55.76_f64 - 55.7558).powi(2) + (37.62_f64 - 37.6173).powi(2)).sqrt();
        assert!((features.dist_center - expected).abs() < 1e-12);

        let mut no_coords = listing();
        no_coords.lat = None;
        assert_eq!(builder.build(&no_coords).dist_center, 0.15);

        let mut other_city = listing();
        other_city.city = "Казань".to_string();
        assert_eq!(builder.build(&other_city).dist_center, 0.15);
    }

    #[test]
    fn test_lux_flag() {
        let keywords = FeatureConfig::default().lux_keywords;
        assert_eq!(lux_anchor_flag(&keywords, "ПАНОРАМНОЕ ОСТЕКЛЕНИЕ"), 1);
        assert_eq!(lux_anchor_flag(&keywords, "Valet parking"), 1);
        assert_eq!(lux_anchor_flag(&keywords, "Уютная квартира"), 0);
        assert_eq!(lux_anchor_flag(&keywords, ""), 0);
    }

    #[test]
    fn test_combo_key_rounds_both_parts() {
        assert_eq!(combo_key(45.4, 1.0), "45_1");
        assert_eq!(combo_key(45.6, 2.0), "46_2");
        assert_eq!(combo_key(120.0, 4.0), "120_4");
    }

    #[test]
    fn test_floor_ratio_clipped() {
        assert_eq!(floor_ratio(20.0, 10.0), 1.0);
        assert_eq!(floor_ratio(-1.0, 10.0), 0.0);
        assert_eq!(floor_ratio(5.0, 10.0), 0.5);
    }

    #[test]
    fn test_numeric_matrix_shape() {
        let config = FeatureConfig::default();
        let snapshot = snapshot();
        let mut second = listing();
        second.lon = None;
        let table = FeatureBuilder::new(&config, &snapshot).build_table(&[listing(), second]);
        let matrix = table.numeric_matrix();
        assert_eq!(matrix.shape(), &[2, NUMERIC_FEATURES.len()]);
        assert!(matrix[[1, 2]].is_nan());
        assert_eq!(matrix[[0, 0]], 80.0);
        assert_eq!(NUMERIC_FEATURES.len() + CATEGORICAL_FEATURES.len(), FEATURES.len());
    }
}
