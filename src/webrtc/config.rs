//! Peer session configuration

use std::time::Duration;

/// Bandwidth estimator / adaptive bitrate configuration
///
/// Durations are hysteresis windows for the control loop; see
/// [`estimator`](crate::webrtc::estimator) for how each gate is applied.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    /// Run the estimator at all. When false, no control loop is spawned.
    pub enabled: bool,
    /// Read the estimate and publish metrics, but never switch variants
    pub passive: bool,
    /// Emit per-tick diagnostics at debug level
    pub debug: bool,
    /// Control loop period
    pub read_interval: Duration,
    /// Minimum time the estimate must be stable before an upgrade
    pub stable_duration: Duration,
    /// Minimum time the estimate must be unstable before a downgrade
    pub unstable_duration: Duration,
    /// Time without direction, while the current variant does not fit,
    /// before the loop treats the link as stalled
    pub stalled_duration: Duration,
    /// Minimum time between two upgrades
    pub upgrade_backoff: Duration,
    /// Minimum time between two downgrades
    pub downgrade_backoff: Duration,
    /// Required relative headroom (`target / stream_bitrate` vs
    /// `1 + diff_threshold`) before acting. Negative disables both
    /// threshold gates.
    pub diff_threshold: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            passive: false,
            debug: false,
            read_interval: Duration::from_secs(2),
            stable_duration: Duration::from_secs(12),
            unstable_duration: Duration::from_secs(6),
            stalled_duration: Duration::from_secs(24),
            upgrade_backoff: Duration::from_secs(5),
            downgrade_backoff: Duration::from_secs(10),
            diff_threshold: 0.15,
        }
    }
}

/// Per-peer configuration, immutable after construction
#[derive(Debug, Clone, Default)]
pub struct PeerConfig {
    /// When false, offers and answers are withheld until ICE gathering
    /// completes and carry all candidates inline
    pub ice_trickle: bool,
    pub estimator: EstimatorConfig,
}
