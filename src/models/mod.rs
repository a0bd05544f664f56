/// Модели: ансамбль и калибровка

pub mod calibration;
pub mod ensemble;
pub mod ridge;

pub use calibration::{CalibrationContext, Calibrator};
pub use ensemble::{Ensemble, PricePredictor};
