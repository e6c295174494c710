//! Shared mock implementations for session core tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tokio::sync::Notify;

use crate::events::Session;
use crate::metrics::SessionMetrics;
use crate::stream::{MediaStream, StreamSelector, StreamSelectorManager, StreamSinkManager};
use crate::webrtc::estimator::BandwidthEstimator;
use crate::webrtc::transport::{
    ConnectionState, DataChannel, IceCandidate, SessionDescription, TrackSink, Transport,
    TransportError,
};

/// Pool stream with an adjustable bitrate
#[derive(Debug)]
pub struct TestStream {
    id: String,
    bitrate: AtomicI64,
}

impl TestStream {
    pub fn shared(id: &str, bitrate: u64) -> Arc<dyn MediaStream> {
        Arc::new(Self {
            id: id.to_string(),
            bitrate: AtomicI64::new(bitrate as i64),
        })
    }

    pub fn new(id: &str, bitrate: u64) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            bitrate: AtomicI64::new(bitrate as i64),
        })
    }

    pub fn set_bitrate(&self, bitrate: u64) {
        self.bitrate.store(bitrate as i64, Ordering::SeqCst);
    }
}

impl MediaStream for TestStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn bitrate(&self) -> u64 {
        self.bitrate.load(Ordering::SeqCst) as u64
    }
}

/// Track sink recording attaches and pause toggles
#[derive(Default)]
pub struct RecordingSink {
    attached: Mutex<Vec<String>>,
    reject: Mutex<Option<String>>,
    paused: AtomicBool,
    pause_calls: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attached(&self) -> Vec<String> {
        self.attached.lock().unwrap().clone()
    }

    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn pause_calls(&self) -> usize {
        self.pause_calls.load(Ordering::SeqCst)
    }

    /// Make the next attach fail with the given transport error
    pub fn reject_next_attach(&self, reason: &str) {
        *self.reject.lock().unwrap() = Some(reason.to_string());
    }
}

#[async_trait]
impl TrackSink for RecordingSink {
    async fn attach(&self, stream: Arc<dyn MediaStream>) -> Result<(), TransportError> {
        if let Some(reason) = self.reject.lock().unwrap().take() {
            return Err(TransportError::new(reason));
        }
        self.attached.lock().unwrap().push(stream.id().to_string());
        Ok(())
    }

    fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
        self.pause_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Scriptable transport double
///
/// Descriptions are canned, candidates are recorded, and ICE gathering
/// completes when the test calls [`MockTransport::complete_gathering`].
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<Option<ConnectionState>>,
    local: Mutex<Option<SessionDescription>>,
    remote: Mutex<Option<SessionDescription>>,
    candidates: Mutex<Vec<IceCandidate>>,
    offers: AtomicUsize,
    answers: AtomicUsize,
    close_calls: AtomicUsize,
    fail_close: AtomicBool,
    gathered: AtomicBool,
    gather_notify: Notify,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap() = Some(state);
    }

    /// Mark ICE gathering as complete and fold a candidate line into the
    /// local description, the way a real stack would
    pub fn complete_gathering(&self) {
        if let Some(desc) = self.local.lock().unwrap().as_mut() {
            desc.sdp.push_str("\na=candidate:1 1 udp 1 198.51.100.7 50000 typ host");
        }
        self.gathered.store(true, Ordering::SeqCst);
        self.gather_notify.notify_waiters();
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    pub fn offer_calls(&self) -> usize {
        self.offers.load(Ordering::SeqCst)
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.remote.lock().unwrap().clone()
    }

    pub fn candidates(&self) -> Vec<IceCandidate> {
        self.candidates.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn create_offer(
        &self,
        ice_restart: bool,
    ) -> Result<SessionDescription, TransportError> {
        self.offers.fetch_add(1, Ordering::SeqCst);
        let sdp = if ice_restart {
            "v=0 mock offer restart"
        } else {
            "v=0 mock offer"
        };
        Ok(SessionDescription::offer(sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        self.answers.fetch_add(1, Ordering::SeqCst);
        Ok(SessionDescription::answer("v=0 mock answer"))
    }

    async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        *self.local.lock().unwrap() = Some(desc);
        Ok(())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        *self.remote.lock().unwrap() = Some(desc);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        self.candidates.lock().unwrap().push(candidate);
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().unwrap().clone()
    }

    fn connection_state(&self) -> ConnectionState {
        self.state.lock().unwrap().unwrap_or(ConnectionState::New)
    }

    async fn wait_gathering_complete(&self) {
        loop {
            let notified = self.gather_notify.notified();
            if self.gathered.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(TransportError::new("close failed"));
        }
        self.set_state(ConnectionState::Closed);
        Ok(())
    }
}

/// Data channel capturing every sent frame
#[derive(Default)]
pub struct RecordingDataChannel {
    frames: Mutex<Vec<Bytes>>,
}

impl RecordingDataChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn frames(&self) -> Vec<Bytes> {
        self.frames.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataChannel for RecordingDataChannel {
    async fn send(&self, data: Bytes) -> Result<(), TransportError> {
        self.frames.lock().unwrap().push(data);
        Ok(())
    }
}

/// Signaling session capturing emitted events
pub struct RecordingSession {
    host: bool,
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingSession {
    pub fn new(host: bool) -> Arc<Self> {
        Arc::new(Self {
            host,
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().unwrap().clone()
    }
}

impl Session for RecordingSession {
    fn is_host(&self) -> bool {
        self.host
    }

    fn send(&self, event: &str, payload: Value) {
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), payload));
    }
}

/// Estimator replaying a scripted sample sequence
///
/// Returns the last sample once the script runs out, so a tail value holds
/// for the rest of the test.
pub struct ScriptedEstimator {
    samples: Mutex<VecDeque<i64>>,
    last: AtomicI64,
}

impl ScriptedEstimator {
    pub fn new(samples: &[i64]) -> Arc<Self> {
        let last = samples.last().copied().unwrap_or(0);
        Arc::new(Self {
            samples: Mutex::new(samples.iter().copied().collect()),
            last: AtomicI64::new(last),
        })
    }

    pub fn constant(value: i64) -> Arc<Self> {
        Self::new(&[value])
    }
}

impl BandwidthEstimator for ScriptedEstimator {
    fn target_bitrate(&self) -> i64 {
        match self.samples.lock().unwrap().pop_front() {
            Some(sample) => {
                self.last.store(sample, Ordering::SeqCst);
                sample
            }
            None => self.last.load(Ordering::SeqCst),
        }
    }
}

/// Metrics sink capturing every published scalar
#[derive(Default)]
pub struct RecordingMetrics {
    bitrates: Mutex<Vec<f64>>,
    video_ids: Mutex<Vec<String>>,
}

impl RecordingMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn bitrates(&self) -> Vec<f64> {
        self.bitrates.lock().unwrap().clone()
    }

    pub fn video_ids(&self) -> Vec<String> {
        self.video_ids.lock().unwrap().clone()
    }
}

impl SessionMetrics for RecordingMetrics {
    fn set_receiver_estimated_target_bitrate(&self, bitrate: f64) {
        self.bitrates.lock().unwrap().push(bitrate);
    }

    fn set_video_id(&self, id: &str) {
        self.video_ids.lock().unwrap().push(id.to_string());
    }
}

/// Pool wrapper recording every selector resolution
pub struct RecordingPool {
    inner: Arc<dyn StreamSelectorManager>,
    selectors: Mutex<Vec<StreamSelector>>,
}

impl RecordingPool {
    pub fn new(inner: Arc<dyn StreamSelectorManager>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            selectors: Mutex::new(Vec::new()),
        })
    }

    pub fn selectors(&self) -> Vec<StreamSelector> {
        self.selectors.lock().unwrap().clone()
    }
}

impl StreamSelectorManager for RecordingPool {
    fn get_stream(&self, selector: &StreamSelector) -> Option<Arc<dyn MediaStream>> {
        self.selectors.lock().unwrap().push(selector.clone());
        self.inner.get_stream(selector)
    }
}

/// Audio pool serving a single fixed stream
pub struct SingleSink {
    stream: Option<Arc<dyn MediaStream>>,
}

impl SingleSink {
    pub fn new(stream: Arc<dyn MediaStream>) -> Arc<Self> {
        Arc::new(Self {
            stream: Some(stream),
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self { stream: None })
    }
}

impl StreamSinkManager for SingleSink {
    fn get_stream(&self) -> Option<Arc<dyn MediaStream>> {
        self.stream.clone()
    }
}
