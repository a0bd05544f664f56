//! Общие фикстуры: синтетическая выгрузка в формате исходной таблицы.

#![allow(dead_code)]

use flat_price::dataset::read_listings_from;
use flat_price::RawListing;

pub const HEADER: &str = "ID  объявления,Количество комнат,Адрес,Дом,Парковка,Описание,Ремонт,Балкон,Санузел,Дополнительно,Название ЖК,Лифт,Price,Площадь_общая,Этаж,Этажность,lat,lon";

const STREETS: [&str; 4] = ["улица Арбат", "Ленинский проспект", "Тверская улица", "Пречистенская набережная"];
const RENOVATIONS: [&str; 4] = ["Дизайнерский", "Евроремонт", "Косметический", "Без ремонта"];

/// Детерминированный корпус: Москва и Санкт-Петербург, цена растёт с площадью.
pub fn corpus_csv(rows: usize) -> String {
    let mut csv = String::from(HEADER);
    csv.push('\n');
    for i in 0..rows {
        let rooms = 1 + i % 4;
        let area = 30.0 + 12.0 * rooms as f64 + (i % 7) as f64;
        let (city, lat, lon) = if i % 3 == 0 {
            ("Санкт-Петербург", 59.93 + 0.01 * (i % 5) as f64, 30.33 + 0.01 * (i % 4) as f64)
        } else {
            ("Москва", 55.75 + 0.01 * (i % 5) as f64, 37.61 + 0.01 * (i % 4) as f64)
        };
        let street = STREETS[i % STREETS.len()];
        let renovation = RENOVATIONS[i % RENOVATIONS.len()];
        let price = area * 2_500.0 + if city == "Москва" { 40_000.0 } else { 0.0 };
        let description = if i % 10 == 0 { "Панорамное остекление, консьерж" } else { "Светлая квартира" };

        csv.push_str(&format!(
            "{id},\"{rooms}, Изолированная\",\"{city}, {street}, {house}\",\"1, Монолитный\",Подземная,\"{description}\",{renovation},\"Лоджия ({loggia})\",\"Совмещенный (1)\",\"Интернет, Холодильник\",,\"Пасс (1)\",{price},{area},{floor},{floors},{lat},{lon}\n",
            id = 1000 + i,
            house = 1 + i,
            loggia = i % 2,
            floor = 1 + i % 12,
            floors = 12 + i % 5,
        ));
    }
    csv
}

pub fn corpus(rows: usize) -> Vec<RawListing> {
    read_listings_from(corpus_csv(rows).as_bytes()).unwrap()
}
