//! Замороженные статистики обучающего корпуса и их хранение.
//!
//! Снимок строится один раз по полному корпусу и при обслуживании только
//! читается. Публикация на диск атомарна: blob пишется во временный файл
//! и переименовывается.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::{FeatureConfig, CONFIG_VERSION};
use crate::error::{PipelineError, Result};
use crate::preprocessing::feature_engineering::{center_distance, combo_key};
use crate::stats::{median, quantile};
use crate::types::CompletedListing;

pub const COMBO_FREQ: &str = "combo_freq";
pub const AREA_THRESHOLD: &str = "area_threshold";
pub const DIST_CENTER_MEDIAN: &str = "dist_center_median";
pub const ENSEMBLE: &str = "ensemble";
pub const CALIBRATION_CONTEXT: &str = "calibration_context";
pub const MANIFEST: &str = "manifest";

/// Хранилище именованных blob-ов.
pub trait ArtifactStore: Send + Sync {
    fn load_blob(&self, name: &str) -> Result<Vec<u8>>;
    fn save_blob(&self, name: &str, bytes: &[u8]) -> Result<()>;
}

pub fn save_json<T: Serialize>(store: &dyn ArtifactStore, name: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    store.save_blob(name, &bytes)
}

pub fn load_json<T: DeserializeOwned>(store: &dyn ArtifactStore, name: &str) -> Result<T> {
    let bytes = store.load_blob(name)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// `<dir>/<name>.json`
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn load_blob(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.blob_path(name);
        if !path.exists() {
            return Err(PipelineError::ArtifactNotFound(name.to_string()));
        }
        Ok(std::fs::read(path)?)
    }

    fn save_blob(&self, name: &str, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.blob_path(name);
        let tmp = self.root.join(format!(".{name}.json.tmp"));
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        tracing::debug!("Published artifact {}", path.display());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryArtifactStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn load_blob(&self, name: &str) -> Result<Vec<u8>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| PipelineError::Storage("artifact store lock poisoned".to_string()))?;
        blobs
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::ArtifactNotFound(name.to_string()))
    }

    fn save_blob(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| PipelineError::Storage("artifact store lock poisoned".to_string()))?;
        blobs.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Сопроводительная информация о построенном снимке.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub config_version: u32,
    pub rows: usize,
    pub built_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSnapshot {
    /// "площадь_комнаты" -> число объявлений
    pub combo_freq: HashMap<String, u64>,
    /// Квантиль площади (по умолчанию 0.9)
    pub area_threshold: f64,
    /// Медиана расстояния до центра
    pub dist_center_median: f64,
}

impl ArtifactSnapshot {
    pub fn build(listings: &[CompletedListing], config: &FeatureConfig) -> Result<Self> {
        let mut combo_freq: HashMap<String, u64> = HashMap::new();
        for listing in listings {
            *combo_freq
                .entry(combo_key(listing.total_area, listing.rooms_count))
                .or_insert(0) += 1;
        }

        let areas: Vec<f64> = listings.iter().map(|l| l.total_area).collect();
        let area_threshold = quantile(&areas, config.area_quantile)
            .ok_or_else(|| PipelineError::MissingStatistic(AREA_THRESHOLD.to_string()))?;

        let distances: Vec<f64> = listings
            .iter()
            .filter_map(|l| center_distance(config, &l.city, l.lat, l.lon))
            .collect();
        let dist_center_median = median(&distances)
            .ok_or_else(|| PipelineError::MissingStatistic("dist_center".to_string()))?;

        tracing::info!(
            "Artifacts built: {} combos, area_threshold={:.2}, dist_center_median={:.4}",
            combo_freq.len(),
            area_threshold,
            dist_center_median
        );

        Ok(Self {
            combo_freq,
            area_threshold,
            dist_center_median,
        })
    }

    pub fn publish(&self, store: &dyn ArtifactStore, rows: usize) -> Result<()> {
        save_json(store, COMBO_FREQ, &self.combo_freq)?;
        save_json(store, AREA_THRESHOLD, &self.area_threshold)?;
        save_json(store, DIST_CENTER_MEDIAN, &self.dist_center_median)?;
        save_json(
            store,
            MANIFEST,
            &ArtifactManifest {
                config_version: CONFIG_VERSION,
                rows,
                built_at: Utc::now(),
            },
        )
    }

    pub fn load(store: &dyn ArtifactStore) -> Result<Self> {
        Ok(Self {
            combo_freq: load_json(store, COMBO_FREQ)?,
            area_threshold: load_json(store, AREA_THRESHOLD)?,
            dist_center_median: load_json(store, DIST_CENTER_MEDIAN)?,
        })
    }
}
