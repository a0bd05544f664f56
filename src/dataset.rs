//! Чтение выгрузки объявлений и запись прогнозов (CSV)

use std::io::{Read, Write};
use std::path::Path;

use crate::error::Result;
use crate::preprocessing::normalization::coerce_number;
use crate::types::{FlatPrediction, RawListing};

/// Заголовки исходной таблицы.
pub mod columns {
    pub const LISTING_ID: &str = "ID  объявления";
    pub const ROOMS: &str = "Количество комнат";
    pub const ADDRESS: &str = "Адрес";
    pub const BUILDING: &str = "Дом";
    pub const PARKING: &str = "Парковка";
    pub const DESCRIPTION: &str = "Описание";
    pub const RENOVATION: &str = "Ремонт";
    pub const BALCONY: &str = "Балкон";
    pub const BATHROOM: &str = "Санузел";
    pub const EXTRAS: &str = "Дополнительно";
    pub const COMPLEX_NAME: &str = "Название ЖК";
    pub const ELEVATOR: &str = "Лифт";
    pub const PRICE: &str = "Price";
    pub const TOTAL_AREA: &str = "Площадь_общая";
    pub const FLOOR: &str = "Этаж";
    pub const FLOORS_TOTAL: &str = "Этажность";
    pub const LAT: &str = "lat";
    pub const LON: &str = "lon";
}

pub fn read_listings(path: &Path) -> Result<Vec<RawListing>> {
    let file = std::fs::File::open(path)?;
    let listings = read_listings_from(file)?;
    tracing::info!("Loaded {} listings from {}", listings.len(), path.display());
    Ok(listings)
}

pub fn read_listings_from<R: Read>(reader: R) -> Result<Vec<RawListing>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut listings = Vec::new();
    for record in reader.records() {
        let row = record?;
        let get_field = |name: &str| -> Option<String> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .and_then(|idx| row.get(idx))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        listings.push(RawListing {
            listing_id: get_field(columns::LISTING_ID)
                .as_deref()
                .and_then(coerce_number)
                .map(|id| id as i64),
            address: get_field(columns::ADDRESS),
            rooms: get_field(columns::ROOMS),
            building: get_field(columns::BUILDING),
            complex_name: get_field(columns::COMPLEX_NAME),
            parking: get_field(columns::PARKING),
            renovation: get_field(columns::RENOVATION),
            balcony: get_field(columns::BALCONY),
            elevator: get_field(columns::ELEVATOR),
            bathroom: get_field(columns::BATHROOM),
            extras: get_field(columns::EXTRAS),
            description: get_field(columns::DESCRIPTION),
            total_area: get_field(columns::TOTAL_AREA),
            floor: get_field(columns::FLOOR),
            floors_total: get_field(columns::FLOORS_TOTAL),
            price: get_field(columns::PRICE),
            lat: get_field(columns::LAT),
            lon: get_field(columns::LON),
        });
    }

    Ok(listings)
}

pub fn write_predictions(path: &Path, predictions: &[FlatPrediction]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_predictions_to(file, predictions)?;
    tracing::info!("Predictions saved to {}", path.display());
    Ok(())
}

pub fn write_predictions_to<W: Write>(writer: W, predictions: &[FlatPrediction]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for prediction in predictions {
        writer.serialize(prediction)?;
    }
    writer.flush()?;
    Ok(())
}
