//! Adaptive bitrate control loop
//!
//! One controller task per peer. Each tick it reads the receiver-side
//! bandwidth estimate, classifies its trend, compares it against the bound
//! variant's bitrate, and walks the variant ladder down under congestion and
//! up when there is sustained headroom. Hysteresis comes from four gates:
//! per-direction backoffs, a stability window before upgrades, an
//! instability window before downgrades, and a relative headroom threshold.
//! A "stalled" heuristic catches the case where the estimate flattens below
//! what the current variant needs and the trend alone says nothing.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use crate::stream::StreamSelector;
use crate::utils::trend::{TrendDetector, TrendDirection};
use crate::webrtc::config::EstimatorConfig;
use crate::webrtc::peer::{PeerSession, PeerVideoRequest};
use crate::webrtc::transport::ConnectionState;

/// Receiver-side bandwidth estimator, as exposed by the transport's
/// congestion controller
pub trait BandwidthEstimator: Send + Sync {
    /// Current estimate of sustainable throughput, in bits per second
    fn target_bitrate(&self) -> i64;
}

/// Elapsed time since an anchor that may not have happened yet
fn since(now: Instant, anchor: Option<Instant>) -> Duration {
    anchor
        .map(|anchor| now.duration_since(anchor))
        .unwrap_or(Duration::MAX)
}

impl PeerSession {
    /// Start the adaptive bitrate controller for this peer
    ///
    /// Returns `None` without spawning anything when no estimator is wired
    /// in or the estimator is disabled by config. Call once after
    /// construction; the task exits on its own once the connection reports
    /// `Closed`.
    pub fn spawn_bitrate_controller(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let estimator = self.bandwidth_estimator()?.clone();

        let config = self.estimator_config().clone();
        if !config.enabled {
            return None;
        }

        let peer = Arc::clone(self);
        Some(tokio::spawn(async move {
            peer.run_bitrate_controller(estimator, config).await;
        }))
    }

    async fn run_bitrate_controller(
        self: Arc<Self>,
        estimator: Arc<dyn BandwidthEstimator>,
        config: EstimatorConfig,
    ) {
        let verbose = config.debug;
        let mut trend = TrendDetector::default();

        let start = Instant::now();
        let mut ticker = time::interval_at(start + config.read_interval, config.read_interval);

        // the estimate counts as stable from loop start; measuring the
        // stall window also starts here
        let mut stable_since = start;
        let mut stalled_since = start;
        let mut unstable_since: Option<Instant> = None;
        let mut last_upgrade: Option<Instant> = None;
        let mut last_downgrade: Option<Instant> = None;

        loop {
            ticker.tick().await;
            let now = Instant::now();

            let target = estimator.target_bitrate();
            self.session_metrics()
                .set_receiver_estimated_target_bitrate(target as f64);

            if self.connection_state() == ConnectionState::Closed {
                debug!("peer connection closed, stopping bitrate controller");
                break;
            }

            if config.passive || self.adaptive_blocked().await {
                continue;
            }

            trend.add_value(target);
            let direction = trend.direction();

            let stream = match self.video_stream().await {
                Some(stream) => stream,
                None => {
                    if verbose {
                        debug!("no video stream bound yet, skipping estimate");
                    }
                    continue;
                }
            };

            let stream_id = stream.id().to_string();
            let stream_bitrate = stream.bitrate();
            if stream_bitrate == 0 {
                if verbose {
                    debug!("stream bitrate not known yet, skipping estimate");
                }
                continue;
            }

            let diff = target as f64 / stream_bitrate as f64;

            if verbose {
                debug!(
                    target_bitrate = target,
                    stream_bitrate,
                    diff,
                    direction = %direction,
                    "read bitrate estimate"
                );
            }

            // while the trend has a direction, or the current variant still
            // fits, we are not stalling
            if direction != TrendDirection::Neutral || diff > 1.0 + config.diff_threshold {
                stalled_since = now;
            }

            let stalled = direction == TrendDirection::Neutral
                && now.duration_since(stalled_since) > config.stalled_duration;
            if stalled && verbose {
                warn!("estimate is flat below the current variant, assuming congestion");
            }

            if direction == TrendDirection::Downward || stalled {
                // congesting, so the estimate is no longer stable
                stable_since = now;

                if since(now, last_downgrade) < config.downgrade_backoff {
                    if verbose {
                        debug!("downgraded recently, backing off");
                    }
                    continue;
                }

                if since(now, unstable_since) < config.unstable_duration {
                    if verbose {
                        debug!("not unstable long enough yet, waiting");
                    }
                    continue;
                }

                if config.diff_threshold >= 0.0 && diff > 1.0 + config.diff_threshold {
                    if verbose {
                        debug!(diff, "current variant still fits, holding");
                    }
                    continue;
                }

                let result = self
                    .set_video(PeerVideoRequest {
                        selector: Some(StreamSelector::Lower(stream_id)),
                        ..Default::default()
                    })
                    .await;
                last_downgrade = Some(now);

                match result {
                    Ok(()) => {
                        if verbose {
                            debug!("downgraded video variant");
                        }
                    }
                    Err(err) if err.is_stream_not_found() => {
                        if verbose {
                            debug!("already at the lowest variant");
                        }
                    }
                    Err(err) => warn!("failed to downgrade video variant: {}", err),
                }
                continue;
            }

            // not congesting, so the estimate is no longer unstable
            unstable_since = Some(now);

            if since(now, last_upgrade) < config.upgrade_backoff {
                if verbose {
                    debug!("upgraded recently, backing off");
                }
                continue;
            }

            if now.duration_since(stable_since) < config.stable_duration {
                if verbose {
                    debug!("not stable long enough yet, waiting");
                }
                continue;
            }

            if config.diff_threshold >= 0.0 && diff < 1.0 + config.diff_threshold {
                if verbose {
                    debug!(diff, "not enough headroom for a higher variant");
                }
                continue;
            }

            let result = self
                .set_video(PeerVideoRequest {
                    selector: Some(StreamSelector::Higher(stream_id)),
                    ..Default::default()
                })
                .await;
            last_upgrade = Some(now);

            match result {
                Ok(()) => {
                    if verbose {
                        debug!("upgraded video variant");
                    }
                }
                Err(err) if err.is_stream_not_found() => {
                    if verbose {
                        debug!("already at the highest variant");
                    }
                }
                Err(err) => warn!("failed to upgrade video variant: {}", err),
            }
        }
    }
}
