//! Trend detection over a sliding window of samples
//!
//! Classifies a stream of integer samples (bandwidth estimates, in our case)
//! as trending upward, downward, or neither. Used by the adaptive bitrate
//! loop to decide whether the receiver-side estimate is rising or collapsing
//! before acting on it.

use std::collections::VecDeque;

/// Direction of the observed trend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Upward,
    Neutral,
    Downward,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Upward => write!(f, "upward"),
            TrendDirection::Neutral => write!(f, "neutral"),
            TrendDirection::Downward => write!(f, "downward"),
        }
    }
}

/// Trend detector configuration
#[derive(Debug, Clone)]
pub struct TrendConfig {
    /// Number of samples required before a non-neutral direction is reported.
    /// Also the sliding window length.
    pub window: usize,
    /// Minimum relative slope (per sample, relative to the window mean)
    /// before the trend counts as a direction.
    pub slope_threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window: 3,
            slope_threshold: 0.02,
        }
    }
}

/// Sliding-window trend detector
///
/// Keeps the last `window` samples and fits a least-squares line through
/// them. The slope is normalized by the window mean so the threshold does
/// not depend on the magnitude of the samples.
#[derive(Debug)]
pub struct TrendDetector {
    config: TrendConfig,
    samples: VecDeque<i64>,
}

impl TrendDetector {
    pub fn new(config: TrendConfig) -> Self {
        let capacity = config.window;
        Self {
            config,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Push a new sample, evicting the oldest once the window is full
    pub fn add_value(&mut self, value: i64) {
        if self.samples.len() == self.config.window {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    /// Current direction of the window
    ///
    /// Returns `Neutral` until the window is full, and whenever the
    /// normalized slope stays within `slope_threshold`.
    pub fn direction(&self) -> TrendDirection {
        if self.samples.len() < self.config.window {
            return TrendDirection::Neutral;
        }

        let slope = match self.relative_slope() {
            Some(slope) => slope,
            None => return TrendDirection::Neutral,
        };

        if slope > self.config.slope_threshold {
            TrendDirection::Upward
        } else if slope < -self.config.slope_threshold {
            TrendDirection::Downward
        } else {
            TrendDirection::Neutral
        }
    }

    /// Clear all accumulated samples
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Least-squares slope over the window, normalized by the window mean.
    /// None when the mean is zero (all-zero estimates carry no direction).
    fn relative_slope(&self) -> Option<f64> {
        let n = self.samples.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = self.samples.iter().map(|&y| y as f64).sum::<f64>() / n;

        if mean_y == 0.0 {
            return None;
        }

        let mut num = 0.0;
        let mut den = 0.0;
        for (i, &y) in self.samples.iter().enumerate() {
            let dx = i as f64 - mean_x;
            num += dx * (y as f64 - mean_y);
            den += dx * dx;
        }

        if den == 0.0 {
            return None;
        }

        Some(num / den / mean_y.abs())
    }
}

impl Default for TrendDetector {
    fn default() -> Self {
        Self::new(TrendConfig::default())
    }
}
