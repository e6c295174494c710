//! Signaling events emitted toward the viewer
//!
//! The core does not own the signaling transport; it hands named events to
//! the session registry which delivers them over whatever wire the server
//! uses. Payloads here are state snapshots, not a log: consumers must treat
//! them as fire-and-forget.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event names understood by existing viewers
pub mod event {
    /// Video state snapshot (disabled flag, bound variant, auto mode)
    pub const SIGNAL_VIDEO: &str = "signal/video";
    /// Audio state snapshot (disabled flag)
    pub const SIGNAL_AUDIO: &str = "signal/audio";
}

/// Signaling-side session handle
///
/// Implemented by the session registry. `send` must not call back into the
/// peer while the caller holds the peer monitor; the core guarantees this by
/// emitting from a detached task.
pub trait Session: Send + Sync {
    /// Whether this session is the host (source of truth for input).
    /// Cursor telemetry is suppressed toward the host.
    fn is_host(&self) -> bool;

    /// Deliver a named event to the viewer. Fire-and-forget.
    fn send(&self, event: &str, payload: Value);
}

/// Payload of [`event::SIGNAL_VIDEO`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerVideo {
    pub disabled: bool,
    /// Identifier of the currently bound variant, empty when unbound
    pub id: String,
    /// Mirror of `id` kept for older viewers
    // TODO: drop once no deployed viewer reads "video"
    pub video: String,
    pub auto: bool,
}

/// Payload of [`event::SIGNAL_AUDIO`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerAudio {
    pub disabled: bool,
}
