//! Opaque peer transport interface
//!
//! The real-time stack (SDP, ICE, DTLS, SRTP, data-channel framing) lives
//! outside this crate. The session core drives it through the traits below
//! and observes it through [`ConnectionState`]. Shapes mirror the browser
//! API so the signaling layer can pass descriptions and candidates through
//! unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stream::MediaStream;

/// Failure reported by the transport stack
///
/// The core treats the message as opaque and propagates it verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Session description kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// SDP session description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// ICE candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    /// Candidate string
    pub candidate: String,
    /// SDP mid (media ID)
    #[serde(rename = "sdpMid")]
    pub sdp_mid: Option<String>,
    /// SDP mline index
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
    /// Username fragment
    #[serde(rename = "usernameFragment")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_mline_index: None,
            username_fragment: None,
        }
    }
}

/// Connection state as observed from the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::New => write!(f, "new"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Failed => write!(f, "failed"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// Peer connection, as consumed by the session core
///
/// One instance per peer, owned exclusively by the [`PeerSession`]. When ICE
/// trickle is off, candidates gathered before `wait_gathering_complete`
/// resolves must already be folded into `local_description`.
///
/// [`PeerSession`]: crate::webrtc::PeerSession
#[async_trait]
pub trait Transport: Send + Sync {
    async fn create_offer(&self, ice_restart: bool) -> Result<SessionDescription, TransportError>;

    async fn create_answer(&self) -> Result<SessionDescription, TransportError>;

    async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError>;

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;

    /// The local description as currently populated, including any gathered
    /// candidates
    async fn local_description(&self) -> Option<SessionDescription>;

    /// Current connection state, non-blocking
    fn connection_state(&self) -> ConnectionState;

    /// Resolves once ICE gathering for the pending local description
    /// completes
    async fn wait_gathering_complete(&self);

    async fn close(&self) -> Result<(), TransportError>;
}

/// Reliable binary channel toward the viewer
#[async_trait]
pub trait DataChannel: Send + Sync {
    /// Send one frame. May block on transport backpressure.
    async fn send(&self, data: Bytes) -> Result<(), TransportError>;
}

/// Transport-side track sender
///
/// The write path (capture → RTP) runs inside the transport stack; the core
/// only swaps the source and gates forwarding.
#[async_trait]
pub trait TrackSink: Send + Sync {
    /// Point the sender at a new source stream. The transport may reject the
    /// swap (e.g. on a codec change); the error surfaces to the caller.
    async fn attach(&self, stream: Arc<dyn MediaStream>) -> Result<(), TransportError>;

    /// Stop or resume forwarding packets without tearing down the sender
    fn set_paused(&self, paused: bool);
}
