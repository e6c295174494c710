//! Per-peer media session
//!
//! One [`PeerSession`] per connected viewer. It owns the peer transport, the
//! data channel, and both track bindings, and serializes every externally
//! visible operation on a single per-peer monitor so the signaling handler,
//! the metrics reader, the bitrate controller, and the destroy path can all
//! call in concurrently.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::events::{event, PeerAudio, PeerVideo, Session};
use crate::metrics::SessionMetrics;
use crate::stream::{
    MediaStream, StreamSelector, StreamSelectorManager, StreamSinkManager, VariantSelector,
};
use crate::webrtc::config::{EstimatorConfig, PeerConfig};
use crate::webrtc::estimator::BandwidthEstimator;
use crate::webrtc::payload::{self, CursorImage};
use crate::webrtc::track::{TrackBinding, TrackKind};
use crate::webrtc::transport::{
    ConnectionState, DataChannel, IceCandidate, SessionDescription, TrackSink, Transport,
    TransportError,
};

/// Partial update of the peer's video state
///
/// Absent fields leave the corresponding state untouched; the call applies
/// whatever is present as one diff.
#[derive(Debug, Clone, Default)]
pub struct PeerVideoRequest {
    pub disabled: Option<bool>,
    pub selector: Option<StreamSelector>,
    pub auto: Option<bool>,
}

/// Partial update of the peer's audio state
#[derive(Debug, Clone, Default)]
pub struct PeerAudioRequest {
    pub disabled: Option<bool>,
}

/// Everything a peer session is wired to at construction
pub struct PeerSessionParams {
    pub config: PeerConfig,
    pub transport: Arc<dyn Transport>,
    pub data_channel: Arc<dyn DataChannel>,
    pub session: Arc<dyn Session>,
    pub video: Arc<dyn StreamSelectorManager>,
    pub audio: Arc<dyn StreamSinkManager>,
    pub video_sink: Arc<dyn TrackSink>,
    pub audio_sink: Arc<dyn TrackSink>,
    pub estimator: Option<Arc<dyn BandwidthEstimator>>,
    pub metrics: Arc<dyn SessionMetrics>,
}

#[derive(Debug, Default)]
struct PeerFlags {
    paused: bool,
    video_disabled: bool,
    audio_disabled: bool,
    video_auto: bool,
}

/// Per-peer media session core
///
/// Construction wires the tracks but leaves them unbound; the signaling
/// layer attaches audio via [`attach_audio`](Self::attach_audio) and video
/// through the first [`set_video`](Self::set_video) carrying a selector.
pub struct PeerSession {
    config: PeerConfig,
    session: Arc<dyn Session>,
    metrics: Arc<dyn SessionMetrics>,
    transport: Arc<dyn Transport>,
    data_channel: Arc<dyn DataChannel>,
    video_pool: VariantSelector,
    audio_pool: Arc<dyn StreamSinkManager>,
    video_track: TrackBinding,
    audio_track: TrackBinding,
    estimator: Option<Arc<dyn BandwidthEstimator>>,
    /// The per-peer monitor. Every public operation takes it for its whole
    /// duration, including transport awaits.
    state: Mutex<PeerFlags>,
}

impl PeerSession {
    pub fn new(params: PeerSessionParams) -> Arc<Self> {
        Arc::new(Self {
            config: params.config,
            session: params.session,
            metrics: params.metrics,
            transport: params.transport,
            data_channel: params.data_channel,
            video_pool: VariantSelector::new(params.video),
            audio_pool: params.audio,
            video_track: TrackBinding::new(TrackKind::Video, params.video_sink),
            audio_track: TrackBinding::new(TrackKind::Audio, params.audio_sink),
            estimator: params.estimator,
            state: Mutex::new(PeerFlags::default()),
        })
    }

    //
    // connection
    //

    /// Create an offer and install it as the local description
    ///
    /// With ICE trickle disabled this blocks, possibly for seconds, until
    /// gathering completes and returns the fully populated description.
    pub async fn create_offer(&self, ice_restart: bool) -> Result<SessionDescription> {
        let _monitor = self.state.lock().await;

        let offer = self.transport.create_offer(ice_restart).await?;
        self.install_local_description(offer).await
    }

    /// Create an answer and install it as the local description
    pub async fn create_answer(&self) -> Result<SessionDescription> {
        let _monitor = self.state.lock().await;

        let answer = self.transport.create_answer().await?;
        self.install_local_description(answer).await
    }

    /// Caller must hold the monitor
    async fn install_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<SessionDescription> {
        self.transport.set_local_description(desc).await?;

        if !self.config.ice_trickle {
            // candidates are folded into the description instead of
            // trickling through signaling
            self.transport.wait_gathering_complete().await;
        }

        self.transport.local_description().await.ok_or_else(|| {
            AppError::Transport(TransportError::new("local description missing after set"))
        })
    }

    pub async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let _monitor = self.state.lock().await;
        Ok(self.transport.set_remote_description(desc).await?)
    }

    pub async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let _monitor = self.state.lock().await;
        Ok(self.transport.add_ice_candidate(candidate).await?)
    }

    /// Connection state as currently reported by the transport
    pub fn connection_state(&self) -> ConnectionState {
        self.transport.connection_state()
    }

    /// Close the peer connection
    ///
    /// Idempotent: once the transport reports `Closed`, further calls do
    /// nothing. Close failures are logged, never surfaced. The bitrate
    /// controller notices the closed state on its next tick and exits on its
    /// own; this does not wait for it.
    pub async fn destroy(&self) {
        let _monitor = self.state.lock().await;

        if self.transport.connection_state() == ConnectionState::Closed {
            return;
        }

        match self.transport.close().await {
            Ok(()) => info!("peer connection destroyed"),
            Err(err) => warn!("failed to close peer connection: {}", err),
        }
    }

    //
    // pause
    //

    /// Pause or resume the whole session
    ///
    /// Each track ends up paused when either the session is paused or that
    /// kind is disabled.
    pub async fn set_paused(&self, paused: bool) {
        let mut flags = self.state.lock().await;

        self.video_track
            .set_paused(paused || flags.video_disabled)
            .await;
        self.audio_track
            .set_paused(paused || flags.audio_disabled)
            .await;

        info!("set paused: {}", paused);
        flags.paused = paused;
    }

    pub async fn paused(&self) -> bool {
        self.state.lock().await.paused
    }

    //
    // video
    //

    /// Apply a partial video update
    ///
    /// When any observable state changed, the new [`PeerVideo`] snapshot is
    /// emitted as `signal/video` from a detached task: the signaling
    /// transport may call back into this peer, so the event must never go
    /// out while the monitor is held.
    pub async fn set_video(self: &Arc<Self>, request: PeerVideoRequest) -> Result<()> {
        let mut flags = self.state.lock().await;
        let mut modified = false;

        if let Some(disabled) = request.disabled {
            if flags.video_disabled != disabled {
                flags.video_disabled = disabled;
                self.video_track.set_paused(disabled || flags.paused).await;

                info!("set video disabled: {}", disabled);
                modified = true;
            }
        }

        if let Some(selector) = &request.selector {
            let stream = self.video_pool.resolve(selector)?;

            let changed = self.video_track.set_stream(stream.clone()).await?;
            if changed {
                let video_id = stream.id();
                self.metrics.set_video_id(video_id);

                info!("set video: {}", video_id);
                modified = true;
            }
        }

        if let Some(auto) = request.auto {
            let auto = if self.estimator.is_none() || self.config.estimator.passive {
                if auto {
                    warn!("estimator is absent or passive, video auto stays off");
                }
                false
            } else {
                auto
            };

            if flags.video_auto != auto {
                flags.video_auto = auto;

                info!("set video auto: {}", auto);
                modified = true;
            }
        }

        drop(flags);

        if modified {
            self.notify_video();
        }

        Ok(())
    }

    /// Current video state snapshot
    pub async fn video(&self) -> PeerVideo {
        let flags = self.state.lock().await;
        let id = self.video_track.id().await.unwrap_or_default();

        PeerVideo {
            disabled: flags.video_disabled,
            id: id.clone(),
            video: id,
            auto: flags.video_auto,
        }
    }

    //
    // audio
    //

    /// Apply a partial audio update, emitting `signal/audio` on change
    pub async fn set_audio(self: &Arc<Self>, request: PeerAudioRequest) -> Result<()> {
        let mut flags = self.state.lock().await;
        let mut modified = false;

        if let Some(disabled) = request.disabled {
            if flags.audio_disabled != disabled {
                flags.audio_disabled = disabled;
                self.audio_track.set_paused(disabled || flags.paused).await;

                info!("set audio disabled: {}", disabled);
                modified = true;
            }
        }

        drop(flags);

        if modified {
            self.notify_audio();
        }

        Ok(())
    }

    /// Current audio state snapshot
    pub async fn audio(&self) -> PeerAudio {
        let flags = self.state.lock().await;
        PeerAudio {
            disabled: flags.audio_disabled,
        }
    }

    /// Bind the audio track to the sink pool's stream
    ///
    /// Called once by the session bootstrap when capture is ready.
    pub async fn attach_audio(&self) -> Result<()> {
        let _monitor = self.state.lock().await;

        let stream = self.audio_pool.get_stream().ok_or(AppError::StreamNotFound)?;
        self.audio_track.set_stream(stream).await?;
        Ok(())
    }

    //
    // data channel
    //

    /// Send the viewer a cursor position frame
    ///
    /// Suppressed toward the host session, which is the source of the
    /// cursor. Coordinates truncate to unsigned 16 bit.
    pub async fn send_cursor_position(&self, x: i32, y: i32) -> Result<()> {
        let _monitor = self.state.lock().await;

        if self.session.is_host() {
            return Ok(());
        }

        let frame = payload::encode_cursor_position(x as u16, y as u16);
        Ok(self.data_channel.send(frame).await?)
    }

    /// Send the viewer a cursor image frame
    pub async fn send_cursor_image(&self, cursor: &CursorImage, img: &[u8]) -> Result<()> {
        let _monitor = self.state.lock().await;

        let frame = payload::encode_cursor_image(cursor, img)?;
        Ok(self.data_channel.send(frame).await?)
    }

    //
    // signaling notifications
    //

    fn notify_video(self: &Arc<Self>) {
        let peer = Arc::clone(self);
        tokio::spawn(async move {
            let video = peer.video().await;
            match serde_json::to_value(&video) {
                Ok(snapshot) => peer.session.send(event::SIGNAL_VIDEO, snapshot),
                Err(err) => warn!("failed to serialize video signal: {}", err),
            }
        });
    }

    fn notify_audio(self: &Arc<Self>) {
        let peer = Arc::clone(self);
        tokio::spawn(async move {
            let audio = peer.audio().await;
            match serde_json::to_value(&audio) {
                Ok(snapshot) => peer.session.send(event::SIGNAL_AUDIO, snapshot),
                Err(err) => warn!("failed to serialize audio signal: {}", err),
            }
        });
    }

    //
    // bitrate controller plumbing
    //

    pub(crate) fn bandwidth_estimator(&self) -> Option<&Arc<dyn BandwidthEstimator>> {
        self.estimator.as_ref()
    }

    pub(crate) fn estimator_config(&self) -> &EstimatorConfig {
        &self.config.estimator
    }

    pub(crate) fn session_metrics(&self) -> &dyn SessionMetrics {
        self.metrics.as_ref()
    }

    /// True while the controller must not touch the variant selection
    pub(crate) async fn adaptive_blocked(&self) -> bool {
        let flags = self.state.lock().await;
        !flags.video_auto || flags.video_disabled || flags.paused
    }

    pub(crate) async fn video_stream(&self) -> Option<Arc<dyn MediaStream>> {
        self.video_track.stream().await
    }

    #[cfg(test)]
    pub(crate) async fn video_track_paused(&self) -> bool {
        self.video_track.paused().await
    }

    #[cfg(test)]
    pub(crate) async fn audio_track_paused(&self) -> bool {
        self.audio_track.paused().await
    }
}
