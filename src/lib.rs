//! Flat price - оценка рыночной цены квартиры

pub mod artifacts;
pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod service;
pub mod stats;
pub mod types;

pub use types::*;
pub use models::*;
pub use preprocessing::*;

// Re-export для удобства
pub use artifacts::{ArtifactSnapshot, ArtifactStore, FsArtifactStore, MemoryArtifactStore};
pub use config::{AppSettings, PipelineConfig};
pub use error::{PipelineError, Result};
pub use service::PriceService;
