//! Свойства построителя признаков и калибровки на случайных входах.

use std::collections::HashMap;

use proptest::prelude::*;

use flat_price::config::PipelineConfig;
use flat_price::models::calibration::round_prices;
use flat_price::preprocessing::feature_engineering::{floor_ratio, rarity_index};
use flat_price::{
    ArtifactSnapshot, CorpusFill, FeatureBuilder, ListingAdapter, ListingNormalizer, MinimalListingRequest,
    NormalizedListing, PairCounts, RawListing,
};

fn snapshot() -> ArtifactSnapshot {
    ArtifactSnapshot {
        combo_freq: HashMap::from([("45_1".to_string(), 12), ("60_2".to_string(), 30)]),
        area_threshold: 110.0,
        dist_center_median: 0.08,
    }
}

fn arb_category() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("Евроремонт".to_string())),
        Just(Some("Подземная".to_string())),
        "[а-яА-Я ]{1,12}".prop_map(Some),
    ]
}

fn arb_city() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("Москва".to_string())),
        Just(Some("Санкт-Петербург".to_string())),
        Just(Some("Казань".to_string())),
    ]
}

fn arb_request() -> impl Strategy<Value = MinimalListingRequest> {
    (
        (
            any::<i64>(),
            proptest::option::of(10.0..400.0f64),
            proptest::option::of(0.0..10.0f64),
            proptest::option::of(0.0..60.0f64),
            proptest::option::of(0.0..60.0f64),
            proptest::option::of(0.0..4.0f64),
        ),
        (
            proptest::option::of(54.0..61.0f64),
            proptest::option::of(29.0..62.0f64),
            arb_category(),
            arb_category(),
            arb_city(),
            proptest::option::of("[а-яА-Я ]{0,40}"),
        ),
    )
        .prop_map(
            |((listing_id, total_area, rooms_count, floor, floors_total, loggia_count), (lat, lon, renovation, parking, city, description))| {
                MinimalListingRequest {
                    listing_id,
                    total_area,
                    rooms_count,
                    floor,
                    floors_total,
                    loggia_count,
                    lat,
                    lon,
                    renovation,
                    parking,
                    city,
                    description,
                    ..Default::default()
                }
            },
        )
}

fn arb_street() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("улица Арбат".to_string())),
        Just(Some("Ленинский проспект".to_string())),
    ]
}

fn arb_complex() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("Четыре солнца".to_string())),
        Just(Some("Парк Палас".to_string())),
    ]
}

/// Одна и та же квартира в двух формах: разобранная запись выгрузки и запрос.
fn arb_listing_pair() -> impl Strategy<Value = (NormalizedListing, MinimalListingRequest)> {
    (
        (
            any::<i64>(),
            proptest::option::of(10.0..400.0f64),
            proptest::option::of(0.0..10.0f64),
            proptest::option::of(0.0..60.0f64),
            proptest::option::of(0.0..60.0f64),
            0u32..4,
        ),
        (
            proptest::option::of((54.0..61.0f64, 29.0..62.0f64)),
            (arb_category(), arb_category(), arb_category(), arb_category()),
            arb_city(),
            arb_street(),
            arb_complex(),
            proptest::option::of("[а-яА-Я ]{0,40}"),
        ),
    )
        .prop_map(
            |(
                (listing_id, total_area, rooms_count, floor, floors_total, loggias),
                (coords, (renovation, parking, building_type, room_type), city, street, complex, description),
            )| {
                let normalized = NormalizedListing {
                    listing_id: Some(listing_id),
                    city: city.clone(),
                    street: street.clone(),
                    rooms_count,
                    room_type: room_type.clone(),
                    total_area,
                    floor,
                    floors_total,
                    parking: parking.clone(),
                    renovation: renovation.clone(),
                    building_type: building_type.clone(),
                    complex: complex.clone(),
                    lat: coords.map(|c| c.0),
                    lon: coords.map(|c| c.1),
                    balcony: PairCounts {
                        has_second: loggias > 0,
                        second_count: loggias,
                        ..Default::default()
                    },
                    description: description.clone(),
                    ..Default::default()
                };
                let request = MinimalListingRequest {
                    listing_id,
                    total_area,
                    rooms_count,
                    renovation,
                    parking,
                    lat: coords.map(|c| c.0),
                    lon: coords.map(|c| c.1),
                    building_type,
                    room_type,
                    loggia_count: Some(loggias as f64),
                    floor,
                    floors_total,
                    city,
                    street,
                    complex,
                    description,
                };
                (normalized, request)
            },
        )
}

proptest! {
    #[test]
    fn training_and_serving_features_match((normalized, request) in arb_listing_pair()) {
        let config = PipelineConfig::default();
        let snapshot = snapshot();
        let adapter = ListingAdapter::new(&config.features);
        let builder = FeatureBuilder::new(&config.features, &snapshot);
        // медианы корпуса совпадают с умолчаниями запроса
        let fill = CorpusFill {
            total_area: config.features.defaults.total_area,
            rooms_count: config.features.defaults.rooms_count,
        };

        let from_corpus = adapter.from_normalized(&normalized, &fill);
        let from_request = adapter.from_request(&request);
        prop_assert_eq!(&from_corpus, &from_request);
        prop_assert_eq!(builder.build(&from_corpus), builder.build(&from_request));
    }

    #[test]
    fn feature_vector_is_total(request in arb_request()) {
        let config = PipelineConfig::default();
        let snapshot = snapshot();
        let listing = ListingAdapter::new(&config.features).from_request(&request);
        let features = FeatureBuilder::new(&config.features, &snapshot).build(&listing);

        for (i, value) in features.numeric_values().iter().enumerate() {
            // координаты - единственные признаки, которые могут отсутствовать
            if i == 1 || i == 2 {
                continue;
            }
            prop_assert!(value.is_finite(), "numeric feature {} is {}", i, value);
        }
        for category in features.categorical_values() {
            prop_assert!(!category.is_empty());
        }
        prop_assert!(features.floor_ratio >= 0.0 && features.floor_ratio <= 1.0);
    }

    #[test]
    fn feature_builder_is_idempotent(request in arb_request()) {
        let config = PipelineConfig::default();
        let snapshot = snapshot();
        let listing = ListingAdapter::new(&config.features).from_request(&request);
        let builder = FeatureBuilder::new(&config.features, &snapshot);
        prop_assert_eq!(builder.build(&listing), builder.build(&listing));
    }

    #[test]
    fn floor_ratio_stays_in_unit_interval(floor in -5.0..100.0f64, floors_total in 1.0..100.0f64) {
        let ratio = floor_ratio(floor, floors_total);
        prop_assert!((0.0..=1.0).contains(&ratio));
    }

    #[test]
    fn rarity_index_in_half_open_unit_interval(frequency in 0u64..1_000_000) {
        let rarity = rarity_index(frequency);
        prop_assert!(rarity > 0.0 && rarity <= 1.0);
        prop_assert_eq!(rarity == 1.0, frequency == 0);
    }

    #[test]
    fn rounding_is_idempotent(price in 0.0..50_000_000.0f64) {
        let once = round_prices(&[price], 5_000.0);
        let twice = round_prices(&once, 5_000.0);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn normalizer_accepts_any_text(
        rooms in proptest::option::of(".{0,20}"),
        address in proptest::option::of(".{0,60}"),
        balcony in proptest::option::of(".{0,30}"),
        area in proptest::option::of(".{0,10}"),
    ) {
        let config = PipelineConfig::default();
        let raw = RawListing {
            rooms,
            address,
            balcony,
            total_area: area,
            ..Default::default()
        };
        let normalized = ListingNormalizer::new(&config.normalizer).normalize(&raw);
        if let Some(area) = normalized.total_area {
            prop_assert!(area.is_finite());
        }
        let completed = ListingAdapter::new(&config.features).complete_corpus(&[normalized]);
        prop_assert!(!completed[0].city.is_empty());
        prop_assert!(completed[0].floors_total > 0.0);
    }
}
