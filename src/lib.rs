//! deskstream - remote desktop streaming session core
//!
//! This crate provides the per-peer media session core of a remote desktop
//! streaming server: session state and negotiation, track bindings over an
//! opaque real-time transport, the cursor control channel, and adaptive
//! bitrate selection across pre-encoded stream variants.

pub mod error;
pub mod events;
pub mod metrics;
pub mod stream;
pub mod utils;
pub mod webrtc;

pub use error::{AppError, Result};
