//! Per-peer WebRTC session core
//!
//! One session per connected viewer, carrying a video track, an audio
//! track, and a binary control channel, with adaptive bitrate selection
//! over the capture layer's variant ladder.
//!
//! Architecture:
//! ```text
//! signaling driver ──► PeerSession ──► TrackBinding ◄──► transport sender
//!        ▲                 │
//!        │                 ├── data channel ──► cursor frames
//!   signal/video           │
//!   signal/audio           ▼
//!                    variant ladder (capture layer)
//!
//! estimator ──► bitrate controller ──► PeerSession::set_video(higher|lower)
//! ```
//!
//! The transport itself (SDP, ICE, DTLS, SRTP) stays behind the traits in
//! [`transport`]; this module owns session state, serialization, and policy.

pub mod config;
pub mod estimator;
pub mod payload;
pub mod peer;
pub mod track;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{EstimatorConfig, PeerConfig};
pub use estimator::BandwidthEstimator;
pub use payload::{CursorImage, OP_CURSOR_IMAGE, OP_CURSOR_POSITION};
pub use peer::{PeerAudioRequest, PeerSession, PeerSessionParams, PeerVideoRequest};
pub use track::{TrackBinding, TrackKind};
pub use transport::{
    ConnectionState, DataChannel, IceCandidate, SdpType, SessionDescription, TrackSink,
    Transport, TransportError,
};
