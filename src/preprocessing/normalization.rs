//! Разбор свободного текста объявления в типизированные признаки

use std::collections::BTreeMap;

use crate::config::{KeywordPair, NormalizerConfig};
use crate::types::{NormalizedListing, PairCounts, RawListing};

/// Строка -> число. Нечисловой ввод даёт None, а не ошибку.
pub fn coerce_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn segments(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim)
}

fn nth_segment(raw: Option<&str>, n: usize) -> Option<String> {
    raw.and_then(|s| segments(s).nth(n))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn embedded_count(part: &str) -> u32 {
    let digits: String = part.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

pub struct ListingNormalizer<'a> {
    config: &'a NormalizerConfig,
}

impl<'a> ListingNormalizer<'a> {
    pub fn new(config: &'a NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn normalize(&self, raw: &RawListing) -> NormalizedListing {
        let (city, street) = self.parse_address(raw.address.as_deref());
        let (rooms_count, room_type) = Self::parse_rooms(raw.rooms.as_deref());
        let number = |field: &Option<String>| field.as_deref().and_then(coerce_number);

        NormalizedListing {
            listing_id: raw.listing_id,
            city,
            street,
            rooms_count,
            room_type,
            total_area: number(&raw.total_area),
            floor: number(&raw.floor),
            floors_total: number(&raw.floors_total),
            price: number(&raw.price),
            parking: non_empty(raw.parking.as_deref()),
            renovation: non_empty(raw.renovation.as_deref()),
            building_type: nth_segment(raw.building.as_deref(), 1),
            complex: nth_segment(raw.complex_name.as_deref(), 0),
            lat: number(&raw.lat),
            lon: number(&raw.lon),
            balcony: Self::parse_pair(raw.balcony.as_deref(), &self.config.balcony),
            elevator: Self::parse_pair(raw.elevator.as_deref(), &self.config.elevator),
            bathroom: Self::parse_pair(raw.bathroom.as_deref(), &self.config.bathroom),
            extras: self.parse_extras(raw.extras.as_deref()),
            description: raw.description.clone(),
        }
    }

    pub fn normalize_batch(&self, raw: &[RawListing]) -> Vec<NormalizedListing> {
        tracing::info!("Normalizing {} raw listings", raw.len());
        raw.iter().map(|r| self.normalize(r)).collect()
    }

    /// Город - текст до первой запятой, улица - первый сегмент
    /// с ключевым словом ("улица", "проспект", ...).
    pub fn parse_address(&self, address: Option<&str>) -> (Option<String>, Option<String>) {
        let Some(address) = address else {
            return (None, None);
        };
        let city = nth_segment(Some(address), 0);
        let street = segments(address)
            .find(|part| self.config.street_keywords.iter().any(|k| part.contains(k.as_str())))
            .map(str::to_string);
        (city, street)
    }

    /// "2, Изолированная" -> (Some(2.0), Some("Изолированная"))
    pub fn parse_rooms(rooms: Option<&str>) -> (Option<f64>, Option<String>) {
        let count = rooms.and_then(|s| segments(s).next()).and_then(coerce_number);
        (count, nth_segment(rooms, 1))
    }

    pub fn parse_pair(raw: Option<&str>, keywords: &KeywordPair) -> PairCounts {
        let mut counts = PairCounts::default();
        let Some(raw) = raw else {
            return counts;
        };
        for part in segments(raw) {
            if part.contains(keywords.first.as_str()) {
                counts.has_first = true;
                counts.first_count = embedded_count(part);
            } else if part.contains(keywords.second.as_str()) {
                counts.has_second = true;
                counts.second_count = embedded_count(part);
            }
        }
        counts
    }

    pub fn parse_extras(&self, extras: Option<&str>) -> BTreeMap<String, bool> {
        self.config
            .extras
            .iter()
            .map(|(keyword, flag)| {
                let present = extras.map(|s| s.contains(keyword.as_str())).unwrap_or(false);
                (flag.clone(), present)
            })
            .collect()
    }
}
