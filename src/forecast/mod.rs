//! Synthetic PM2.5 history and quadratic-trend forecasting.
//!
//! Both halves are pure functions of their arguments: no globals, no caches,
//! so analyses for different cities can run side by side without coordination.

pub mod regression;
pub mod synthesizer;
pub mod trend;

pub use synthesizer::synthesize_for_reading;
pub use trend::forecast;

/// Lowest concentration (µg/m³) any synthesized or forecast value may take.
pub const MIN_CONCENTRATION: f64 = 10.0;

/// Heuristic confidence envelope applied to every forecast point.
pub mod band {
    pub const LOWER_FACTOR: f64 = 0.85;
    pub const UPPER_FACTOR: f64 = 1.15;
}
