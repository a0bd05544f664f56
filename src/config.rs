//! Конфигурация конвейера: словари ключевых слов, справочники и константы.
//!
//! Все таблицы, которые раньше были зашиты в код, живут здесь и передаются
//! явно в нормализатор, построитель признаков и калибратор.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub const CONFIG_VERSION: u32 = 1;

pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub version: u32,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        if config.version != CONFIG_VERSION {
            return Err(PipelineError::Config(format!(
                "unsupported config version {} (expected {})",
                config.version, CONFIG_VERSION
            )));
        }
        Ok(config)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            normalizer: NormalizerConfig::default(),
            features: FeatureConfig::default(),
            calibration: CalibrationConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

/// Пара категорий в текстовом поле вида "Балкон (1), Лоджия (2)".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordPair {
    pub first: String,
    pub second: String,
}

impl KeywordPair {
    fn new(first: &str, second: &str) -> Self {
        Self {
            first: first.to_string(),
            second: second.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    pub street_keywords: Vec<String>,
    pub balcony: KeywordPair,
    pub elevator: KeywordPair,
    pub bathroom: KeywordPair,
    /// Подстрока в поле "Дополнительно" -> имя флага
    pub extras: BTreeMap<String, String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        let street_keywords = ["улица", "набережная", "проспект", "бульвар", "шоссе", "переулок"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let extras = [
            ("Ванна", "bath"),
            ("Душевая кабина", "shower"),
            ("Интернет", "internet"),
            ("Кондиционер", "air_conditioner"),
            ("Мебель в комнатах", "furniture_rooms"),
            ("Мебель на кухне", "furniture_kitchen"),
            ("Посудомоечная машина", "dishwasher"),
            ("Стиральная машина", "washing_machine"),
            ("Телевизор", "tv"),
            ("Телефон", "phone"),
            ("Холодильник", "fridge"),
        ]
        .iter()
        .map(|(ru, en)| (ru.to_string(), en.to_string()))
        .collect();

        Self {
            street_keywords,
            balcony: KeywordPair::new("Балкон", "Лоджия"),
            elevator: KeywordPair::new("Пасс", "Груз"),
            bathroom: KeywordPair::new("Совмещенный", "Раздельный"),
            extras,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CityCenter {
    pub lat: f64,
    pub lon: f64,
}

/// Значения для полей, которые не пришли в запросе.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingDefaults {
    pub total_area: f64,
    pub rooms_count: f64,
    pub floor: f64,
    pub floors_total: f64,
    pub loggia_count: f64,
}

impl Default for ServingDefaults {
    fn default() -> Self {
        Self {
            total_area: 60.0,
            rooms_count: 2.0,
            floor: 5.0,
            floors_total: 10.0,
            loggia_count: 0.0,
        }
    }
}

/// Откуда брать порог площади, медиану расстояния и частоты комбинаций
/// при обучении.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingContextPolicy {
    /// Пересчитать по текущему обучающему батчу
    Recompute,
    /// Взять замороженный снимок артефактов
    Frozen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub capital_city: String,
    pub premium_renovations: Vec<String>,
    pub city_centers: BTreeMap<String, CityCenter>,
    pub lux_keywords: Vec<String>,
    pub defaults: ServingDefaults,
    pub area_quantile: f64,
    pub training_policy: TrainingContextPolicy,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        let city_centers = [
            ("Москва", 55.7558, 37.6173),
            ("Санкт-Петербург", 59.9343, 30.3351),
            ("Свердловская область", 56.8389, 60.6057),
        ]
        .iter()
        .map(|(name, lat, lon)| (name.to_string(), CityCenter { lat: *lat, lon: *lon }))
        .collect();

        let lux_keywords = [
            "двухуровнев",
            "двухэтаж",
            "панорамное остекление",
            "французские окна",
            "терраса на крыше",
            "консьерж",
            "valet",
            "лобби",
            "residence",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self {
            capital_city: "Москва".to_string(),
            premium_renovations: vec!["Дизайнерский".to_string(), "Евроремонт".to_string()],
            city_centers,
            lux_keywords,
            defaults: ServingDefaults::default(),
            area_quantile: 0.9,
            training_policy: TrainingContextPolicy::Recompute,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub street_blend: bool,
    pub complex_correction: bool,
    pub rounding: bool,
    pub alpha: f64,
    /// Перцентиль сырого прогноза (0-100), выше которого включается смешивание
    pub blend_percentile: f64,
    pub floor_factor: f64,
    pub raise_factor: f64,
    pub rounding_step: f64,
    /// Название ЖК -> эталонная медианная цена
    pub complex_medians: BTreeMap<String, f64>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        let complex_medians = [
            ("Четыре солнца", 3_700_000.0),
            ("Парк Палас", 2_300_000.0),
            ("Прайм Парк", 850_000.0),
            ("Смоленская Застава", 850_000.0),
            ("Дом на Озерковской", 650_000.0),
            ("Новопесковский", 550_000.0),
            ("Меркурий Тауэр", 575_000.0),
            ("Четыре Ветра", 490_000.0),
            ("Триумф-Палас", 450_000.0),
            ("Созвездие Капитал-1", 420_000.0),
            ("Клубный дом Печатников", 395_000.0),
            ("Поклонная 9", 330_000.0),
            ("Созвездие Капитал-2", 270_000.0),
        ]
        .iter()
        .map(|(name, price)| (name.to_string(), *price))
        .collect();

        Self {
            street_blend: true,
            complex_correction: true,
            rounding: true,
            alpha: 0.25,
            blend_percentile: 90.0,
            floor_factor: 0.9,
            raise_factor: 1.05,
            rounding_step: 5000.0,
            complex_medians,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub seeds: Vec<u64>,
    pub ridge_alpha: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seeds: vec![11, 22, 33, 44, 55],
            ridge_alpha: 1.0,
        }
    }
}

/// Настройки запуска из переменных окружения.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub artifacts_dir: PathBuf,
    pub config_path: Option<PathBuf>,
    pub bind_addr: String,
}

impl AppSettings {
    pub fn from_env() -> Self {
        Self {
            artifacts_dir: env::var("FLAT_PRICE_ARTIFACTS")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("artifacts")),
            config_path: env::var("FLAT_PRICE_CONFIG").ok().map(PathBuf::from),
            bind_addr: env::var("FLAT_PRICE_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
        }
    }

    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        match &self.config_path {
            Some(path) => PipelineConfig::load(path),
            None => Ok(PipelineConfig::default()),
        }
    }
}
