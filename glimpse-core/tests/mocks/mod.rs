//! Mock infrastructure for testing
//!
//! A scripted capture host, a fake endpoint factory and a recording sink.
//! Host and endpoint calls land in one shared [`CallLog`] so tests can check
//! the order of the whole negotiation.

#![allow(dead_code)]

use async_trait::async_trait;
use glimpse_core::endpoint::{
    ConnectionState, EndpointEvent, EndpointFactory, EventSender, MediaStream, PeerEndpoint,
    TrackKind,
};
use glimpse_core::error::{GlimpseError, Result};
use glimpse_core::events::{EventBus, HostEvent, Subscription};
use glimpse_core::host::HostBridge;
use glimpse_core::sink::PlaybackSink;
use glimpse_core::types::{
    CaptureSource, IceCandidate, PreviewOffer, PreviewParams, SourceType,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Ordered record of calls across host and endpoints
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Entries starting with `prefix`
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.matching(prefix).len()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Create a monitor snapshot with a tiny valid thumbnail
pub fn monitor(handle: isize, title: &str) -> CaptureSource {
    CaptureSource {
        id: format!("monitor_{}", handle),
        title: title.to_string(),
        thumbnail: "iVBORw0KGgo=".to_string(),
        icon: None,
        source_type: SourceType::Monitor,
        width: 1920,
        height: 1080,
    }
}

/// Create a window snapshot with an icon
pub fn window(handle: isize, title: &str) -> CaptureSource {
    CaptureSource {
        id: format!("window_{}", handle),
        title: title.to_string(),
        thumbnail: "iVBORw0KGgo=".to_string(),
        icon: Some("AAAA".to_string()),
        source_type: SourceType::Window,
        width: 800,
        height: 600,
    }
}

/// Poll `condition` until it holds or a second passes
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

#[derive(Default)]
struct FakeHostState {
    monitors: Vec<CaptureSource>,
    windows: Vec<CaptureSource>,
    failing: HashSet<String>,
    failures_left: Option<usize>,
    offer_id_override: Option<String>,
    answers: Vec<(String, String)>,
    candidates: Vec<(String, IceCandidate)>,
}

/// Scripted [`HostBridge`]
pub struct FakeHost {
    log: CallLog,
    state: Mutex<FakeHostState>,
    events: EventBus,
}

impl FakeHost {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            state: Mutex::new(FakeHostState::default()),
            events: EventBus::default(),
        }
    }

    pub fn with_monitors(self, monitors: Vec<CaptureSource>) -> Self {
        self.state.lock().monitors = monitors;
        self
    }

    pub fn with_windows(self, windows: Vec<CaptureSource>) -> Self {
        self.state.lock().windows = windows;
        self
    }

    pub fn set_monitors(&self, monitors: Vec<CaptureSource>) {
        self.state.lock().monitors = monitors;
    }

    /// Make `command` fail until [`FakeHost::succeed`] is called
    pub fn fail(&self, command: &str) {
        self.state.lock().failing.insert(command.to_string());
    }

    /// Make `command` fail only for the next `times` calls
    pub fn fail_times(&self, command: &str, times: usize) {
        let mut state = self.state.lock();
        state.failing.insert(command.to_string());
        state.failures_left = Some(times);
    }

    pub fn succeed(&self, command: &str) {
        self.state.lock().failing.remove(command);
    }

    /// Answer offer requests with an offer for a different id
    pub fn mismatch_offer_id(&self, id: &str) {
        self.state.lock().offer_id_override = Some(id.to_string());
    }

    pub fn answers(&self) -> Vec<(String, String)> {
        self.state.lock().answers.clone()
    }

    pub fn candidates(&self) -> Vec<(String, IceCandidate)> {
        self.state.lock().candidates.clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn publish(&self, event: HostEvent) -> usize {
        self.events.publish(event)
    }

    fn call(&self, command: &str, arg: &str) -> Result<()> {
        self.log.push(format!("host:{}:{}", command, arg));

        let mut state = self.state.lock();
        if !state.failing.contains(command) {
            return Ok(());
        }
        if let Some(left) = state.failures_left.as_mut() {
            *left -= 1;
            if *left == 0 {
                state.failing.remove(command);
                state.failures_left = None;
            }
        }
        Err(GlimpseError::host(format!("{} rejected", command)))
    }
}

#[async_trait]
impl HostBridge for FakeHost {
    async fn get_monitors(&self, _params: PreviewParams) -> Result<Vec<CaptureSource>> {
        self.call("get_monitors", "")?;
        Ok(self.state.lock().monitors.clone())
    }

    async fn get_windows(&self, _params: PreviewParams) -> Result<Vec<CaptureSource>> {
        self.call("get_windows", "")?;
        Ok(self.state.lock().windows.clone())
    }

    async fn get_monitor_by_id(&self, id: &str, _params: PreviewParams) -> Result<CaptureSource> {
        self.call("get_monitor_by_id", id)?;
        self.state
            .lock()
            .monitors
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| GlimpseError::SourceNotFound(id.to_string()))
    }

    async fn get_window_by_id(&self, id: &str, _params: PreviewParams) -> Result<CaptureSource> {
        self.call("get_window_by_id", id)?;
        self.state
            .lock()
            .windows
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| GlimpseError::SourceNotFound(id.to_string()))
    }

    async fn start_monitor_preview(&self, hmonitor: isize, _params: PreviewParams) -> Result<()> {
        self.call("start_monitor_preview", &format!("monitor_{}", hmonitor))
    }

    async fn start_window_preview(&self, hwnd: isize, _params: PreviewParams) -> Result<()> {
        self.call("start_window_preview", &format!("window_{}", hwnd))
    }

    async fn get_preview_offer(&self, id: &str) -> Result<PreviewOffer> {
        self.call("get_preview_offer", id)?;
        let offer_id = self
            .state
            .lock()
            .offer_id_override
            .clone()
            .unwrap_or_else(|| id.to_string());
        Ok(PreviewOffer {
            id: offer_id,
            sdp: format!("offer-for-{}", id),
        })
    }

    async fn accept_preview_answer(&self, id: &str, sdp: &str) -> Result<()> {
        self.call("accept_preview_answer", id)?;
        self.state
            .lock()
            .answers
            .push((id.to_string(), sdp.to_string()));
        Ok(())
    }

    async fn add_preview_ice_candidate(&self, id: &str, candidate: IceCandidate) -> Result<()> {
        self.call("add_preview_ice_candidate", id)?;
        self.state
            .lock()
            .candidates
            .push((id.to_string(), candidate));
        Ok(())
    }

    async fn stop_preview(&self, id: &str) -> Result<()> {
        self.call("stop_preview", id)
    }

    async fn subscribe(&self) -> Result<Subscription<HostEvent>> {
        self.call("subscribe", "")?;
        Ok(self.events.subscribe())
    }
}

/// What a fake endpoint emits once its answer is set
#[derive(Clone, Default)]
pub struct EndpointScript {
    /// (track id, number of streams attached)
    pub tracks: Vec<(String, usize)>,
    pub candidates: usize,
}

impl EndpointScript {
    /// One video track with one stream and `candidates` candidates
    pub fn video(candidates: usize) -> Self {
        Self {
            tracks: vec![("video0".to_string(), 1)],
            candidates,
        }
    }
}

/// Fake [`PeerEndpoint`] that records each step
pub struct FakeEndpoint {
    id: String,
    log: CallLog,
    failing_step: Option<String>,
    fail_close: bool,
    script: EndpointScript,
    events: EventSender,
    state: Mutex<ConnectionState>,
}

impl FakeEndpoint {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        *self.state.lock() == ConnectionState::Closed
    }

    fn step(&self, name: &str) -> Result<()> {
        self.log.push(format!("endpoint:{}:{}", name, self.id));
        if self.failing_step.as_deref() == Some(name) {
            return Err(GlimpseError::negotiation(format!("{} failed", name)));
        }
        Ok(())
    }

    fn emit_script(&self) {
        for n in 0..self.script.candidates {
            let _ = self.events.send(EndpointEvent::Candidate(IceCandidate {
                candidate: format!("candidate:{} 1 udp 2122260223 127.0.0.1 5000{} typ host", n, n),
                sdp_mid: Some("0".to_string()),
                sdp_mline_index: Some(0),
            }));
        }

        for (track_id, stream_count) in &self.script.tracks {
            let streams = (0..*stream_count)
                .map(|n| {
                    MediaStream::detached(
                        format!("{}-stream-{}-{}", self.id, track_id, n),
                        track_id.clone(),
                        TrackKind::Video,
                    )
                })
                .collect();
            let _ = self.events.send(EndpointEvent::Track {
                track_id: track_id.clone(),
                streams,
            });
        }
    }
}

#[async_trait]
impl PeerEndpoint for FakeEndpoint {
    async fn set_remote_offer(&self, sdp: &str) -> Result<()> {
        self.step("set_remote_offer")?;
        if sdp != format!("offer-for-{}", self.id) {
            return Err(GlimpseError::negotiation(format!("unexpected offer {}", sdp)));
        }
        Ok(())
    }

    async fn create_answer(&self) -> Result<String> {
        self.step("create_answer")?;
        Ok(format!("answer-for-{}", self.id))
    }

    async fn set_local_answer(&self, sdp: &str) -> Result<()> {
        self.step("set_local_answer")?;
        assert_eq!(sdp, format!("answer-for-{}", self.id));
        // Candidates and tracks show up before the host has the answer
        self.emit_script();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.log.push(format!("endpoint:close:{}", self.id));
        *self.state.lock() = ConnectionState::Closed;
        if self.fail_close {
            return Err(GlimpseError::webrtc("close failed"));
        }
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }
}

/// Builds [`FakeEndpoint`]s and keeps every one it made
pub struct FakeEndpointFactory {
    log: CallLog,
    failing_step: Mutex<Option<String>>,
    fail_close: Mutex<bool>,
    script: Mutex<EndpointScript>,
    created: Mutex<Vec<Arc<FakeEndpoint>>>,
}

impl FakeEndpointFactory {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failing_step: Mutex::new(None),
            fail_close: Mutex::new(false),
            script: Mutex::new(EndpointScript::video(0)),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Make every new endpoint fail at `step` ("create" fails the factory)
    pub fn fail_at(&self, step: &str) {
        *self.failing_step.lock() = Some(step.to_string());
    }

    pub fn clear_failure(&self) {
        *self.failing_step.lock() = None;
    }

    pub fn fail_close(&self, fail: bool) {
        *self.fail_close.lock() = fail;
    }

    pub fn script(&self, script: EndpointScript) {
        *self.script.lock() = script;
    }

    pub fn created(&self) -> Vec<Arc<FakeEndpoint>> {
        self.created.lock().clone()
    }

    /// Endpoints created for `id`, oldest first
    pub fn created_for(&self, id: &str) -> Vec<Arc<FakeEndpoint>> {
        self.created
            .lock()
            .iter()
            .filter(|e| e.id == id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EndpointFactory for FakeEndpointFactory {
    async fn create(&self, source_id: &str, events: EventSender) -> Result<Arc<dyn PeerEndpoint>> {
        self.log.push(format!("endpoint:create:{}", source_id));
        let failing_step = self.failing_step.lock().clone();
        if failing_step.as_deref() == Some("create") {
            return Err(GlimpseError::webrtc("create failed"));
        }

        let endpoint = Arc::new(FakeEndpoint {
            id: source_id.to_string(),
            log: self.log.clone(),
            failing_step,
            fail_close: *self.fail_close.lock(),
            script: self.script.lock().clone(),
            events,
            state: Mutex::new(ConnectionState::New),
        });
        self.created.lock().push(endpoint.clone());
        Ok(endpoint)
    }
}

/// Sink that records every attach and play
#[derive(Default)]
pub struct RecordingSink {
    attached: Mutex<Vec<MediaStream>>,
    plays: Mutex<usize>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attached(&self) -> Vec<MediaStream> {
        self.attached.lock().clone()
    }

    pub fn plays(&self) -> usize {
        *self.plays.lock()
    }
}

impl PlaybackSink for RecordingSink {
    fn attach(&self, stream: MediaStream) {
        self.attached.lock().push(stream);
    }

    fn play(&self) -> Result<()> {
        *self.plays.lock() += 1;
        Ok(())
    }
}

/// Host, factory and log wired together
pub struct Harness {
    pub log: CallLog,
    pub host: Arc<FakeHost>,
    pub factory: Arc<FakeEndpointFactory>,
}

impl Harness {
    pub fn new() -> Self {
        let log = CallLog::default();
        Self {
            host: Arc::new(FakeHost::new(log.clone())),
            factory: Arc::new(FakeEndpointFactory::new(log.clone())),
            log,
        }
    }

    pub fn with_monitors(monitors: Vec<CaptureSource>) -> Self {
        let log = CallLog::default();
        Self {
            host: Arc::new(FakeHost::new(log.clone()).with_monitors(monitors)),
            factory: Arc::new(FakeEndpointFactory::new(log.clone())),
            log,
        }
    }

    pub fn host_bridge(&self) -> Arc<dyn HostBridge> {
        self.host.clone()
    }

    pub fn endpoint_factory(&self) -> Arc<dyn EndpointFactory> {
        self.factory.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_host_fail_times() {
        let host = FakeHost::new(CallLog::default());
        host.fail_times("stop_preview", 1);

        assert!(host.stop_preview("monitor_1").await.is_err());
        assert!(host.stop_preview("monitor_1").await.is_ok());
    }

    #[test]
    fn test_call_log_matching() {
        let log = CallLog::default();
        log.push("host:get_monitors:");
        log.push("endpoint:create:monitor_1");
        assert_eq!(log.count("host:"), 1);
        assert_eq!(log.entries().len(), 2);
    }
}
