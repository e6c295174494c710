//! Small shared utilities

pub mod trend;

pub use trend::{TrendConfig, TrendDetector, TrendDirection};
