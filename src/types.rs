/// Типы данных конвейера оценки

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::preprocessing::normalization::coerce_number;

/// Объявление в том виде, в каком оно пришло из выгрузки.
/// Числовые поля хранятся строками: приводятся к числам только в нормализаторе.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawListing {
    pub listing_id: Option<i64>,
    pub address: Option<String>,
    pub rooms: Option<String>, // "2, Изолированная"
    pub building: Option<String>,
    pub complex_name: Option<String>,
    pub parking: Option<String>,
    pub renovation: Option<String>,
    pub balcony: Option<String>,
    pub elevator: Option<String>,
    pub bathroom: Option<String>,
    pub extras: Option<String>,
    pub description: Option<String>,
    pub total_area: Option<String>,
    pub floor: Option<String>,
    pub floors_total: Option<String>,
    pub price: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
}

/// Наличие и количество двух категорий из одного текстового поля
/// (балкон/лоджия, пассажирский/грузовой лифт, совмещенный/раздельный санузел).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairCounts {
    pub has_first: bool,
    pub first_count: u32,
    pub has_second: bool,
    pub second_count: u32,
}

/// Объявление после разбора свободного текста.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedListing {
    pub listing_id: Option<i64>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub rooms_count: Option<f64>,
    pub room_type: Option<String>,
    pub total_area: Option<f64>,
    pub floor: Option<f64>,
    pub floors_total: Option<f64>,
    pub price: Option<f64>,
    pub parking: Option<String>,
    pub renovation: Option<String>,
    pub building_type: Option<String>,
    pub complex: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub balcony: PairCounts,
    pub elevator: PairCounts,
    pub bathroom: PairCounts,
    pub extras: BTreeMap<String, bool>,
    pub description: Option<String>,
}

impl NormalizedListing {
    pub fn loggia_count(&self) -> f64 {
        self.balcony.second_count as f64
    }
}

/// Запись, в которой заполнены все поля, нужные построителю признаков.
/// Получается адаптером (из запроса) или при подготовке обучающего корпуса.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedListing {
    pub listing_id: Option<i64>,
    pub total_area: f64,
    pub rooms_count: f64,
    pub floor: f64,
    pub floors_total: f64,
    pub loggia_count: f64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub renovation: String,
    pub parking: String,
    pub building_type: String,
    pub room_type: String,
    pub city: String,
    pub street: Option<String>,
    pub complex: Option<String>,
    pub description: String,
}

/// Минимальный запрос на оценку.
/// Все поля, кроме listing_id, необязательны.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinimalListingRequest {
    pub listing_id: i64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_area: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rooms_count: Option<f64>,
    #[serde(default)]
    pub renovation: Option<String>, // Дизайнерский/Евроремонт/Косметический/Без ремонта
    #[serde(default)]
    pub parking: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub lon: Option<f64>,
    #[serde(default)]
    pub building_type: Option<String>,
    #[serde(default)]
    pub room_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub loggia_count: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub floor: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub floors_total: Option<f64>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub street: Option<String>, // Например: Ленинский проспект
    #[serde(default)]
    pub complex: Option<String>, // Например: Twin Peaks
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatPrediction {
    pub listing_id: Option<i64>,
    pub predicted_price: f64,
}

/// Число или числовая строка; всё остальное превращается в None.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64().filter(|x| x.is_finite()),
        serde_json::Value::String(s) => coerce_number(&s),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_coerces_numbers() {
        let json = r#"{"listing_id": 7, "total_area": "45.5", "rooms_count": "two",
                       "floor": 3, "floors_total": null, "lat": true}"#;
        let request: MinimalListingRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.listing_id, 7);
        assert_eq!(request.total_area, Some(45.5));
        assert_eq!(request.rooms_count, None);
        assert_eq!(request.floor, Some(3.0));
        assert_eq!(request.floors_total, None);
        assert_eq!(request.lat, None);
        assert_eq!(request.city, None);
    }

    #[test]
    fn test_request_only_id() {
        let request: MinimalListingRequest = serde_json::from_str(r#"{"listing_id": 1}"#).unwrap();
        assert_eq!(request.total_area, None);
        assert_eq!(request.description, None);
    }
}
