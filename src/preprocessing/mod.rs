/// Модуль предобработки данных

pub mod adapter;
pub mod feature_engineering;
pub mod normalization;

pub use adapter::{CorpusFill, ListingAdapter};
pub use feature_engineering::{FeatureBuilder, FeatureTable, FeatureVector};
pub use normalization::ListingNormalizer;
