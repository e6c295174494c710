//! Per-peer metrics sink
//!
//! The core pushes a handful of scalars into whatever metrics backend the
//! server wires in. Kept behind a trait so the session code does not depend
//! on the exporter.

use std::sync::Arc;

/// Sink for per-peer session metrics
pub trait SessionMetrics: Send + Sync {
    /// Latest receiver-side bandwidth estimate, in bits per second
    fn set_receiver_estimated_target_bitrate(&self, bitrate: f64);

    /// Identifier of the video variant currently bound to the peer
    fn set_video_id(&self, id: &str);
}

/// Metrics sink that drops everything
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl SessionMetrics for NoopMetrics {
    fn set_receiver_estimated_target_bitrate(&self, _bitrate: f64) {}

    fn set_video_id(&self, _id: &str) {}
}

impl NoopMetrics {
    pub fn shared() -> Arc<dyn SessionMetrics> {
        Arc::new(NoopMetrics)
    }
}
