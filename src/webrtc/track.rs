//! Track bindings between pool streams and transport senders

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::stream::MediaStream;
use crate::webrtc::transport::TrackSink;

/// Media kind of a track binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
        }
    }
}

#[derive(Default)]
struct BindingState {
    stream: Option<Arc<dyn MediaStream>>,
    paused: bool,
}

/// Live binding of one media kind to a source stream
///
/// Owns the association between the transport-side sender and whichever pool
/// stream currently feeds it. Source swaps hold the binding lock across the
/// sink attach, so the write path never observes a half-switched source.
pub struct TrackBinding {
    kind: TrackKind,
    sink: Arc<dyn TrackSink>,
    state: Mutex<BindingState>,
}

impl TrackBinding {
    pub fn new(kind: TrackKind, sink: Arc<dyn TrackSink>) -> Self {
        Self {
            kind,
            sink,
            state: Mutex::new(BindingState::default()),
        }
    }

    /// Replace the source stream
    ///
    /// Returns `Ok(false)` when the binding already points at a stream with
    /// the same id. A rejected attach (e.g. codec change) surfaces verbatim
    /// and leaves the previous binding in place.
    pub async fn set_stream(&self, stream: Arc<dyn MediaStream>) -> Result<bool> {
        let mut state = self.state.lock().await;

        if let Some(current) = &state.stream {
            if current.id() == stream.id() {
                return Ok(false);
            }
        }

        self.sink.attach(stream.clone()).await?;
        debug!("{} track bound to stream: {}", self.kind, stream.id());

        state.stream = Some(stream);
        Ok(true)
    }

    /// Currently bound source stream
    pub async fn stream(&self) -> Option<Arc<dyn MediaStream>> {
        self.state.lock().await.stream.clone()
    }

    /// Identifier of the bound stream
    pub async fn id(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .stream
            .as_ref()
            .map(|s| s.id().to_string())
    }

    /// Gate packet forwarding; the underlying sender stays alive
    pub async fn set_paused(&self, paused: bool) {
        let mut state = self.state.lock().await;
        if state.paused == paused {
            return;
        }

        state.paused = paused;
        self.sink.set_paused(paused);
        debug!("{} track paused: {}", self.kind, paused);
    }

    pub async fn paused(&self) -> bool {
        self.state.lock().await.paused
    }
}
