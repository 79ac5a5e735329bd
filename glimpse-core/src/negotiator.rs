//! Preview negotiation
//!
//! Runs the receiving side of the host's preview signaling for one source:
//!
//! ```text
//! start preview ─▶ get offer ─▶ create endpoint ─▶ set remote (offer)
//!        ─▶ create answer ─▶ set local (answer) ─▶ send answer ─▶ trickle ICE
//! ```
//!
//! The first incoming track that carries a stream is bound to the playback
//! sink. Any failing step aborts the sequence, closes the half-built
//! endpoint and returns the error; nothing is retried unless a
//! [`RetryPolicy`] asks for it.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::RetryPolicy;
use crate::endpoint::{EndpointEvent, EndpointFactory, MediaStream, PeerEndpoint};
use crate::error::{GlimpseError, Result, ResultExt};
use crate::host::HostBridge;
use crate::sink::PlaybackSink;
use crate::types::{IceCandidate, NativeHandle, PreviewParams};

/// Drives offer/answer exchanges against the host
pub struct PreviewNegotiator {
    host: Arc<dyn HostBridge>,
    factory: Arc<dyn EndpointFactory>,
    trickle_ice: bool,
    retry: RetryPolicy,
}

impl PreviewNegotiator {
    /// Create a negotiator with trickle ICE on and no retries
    pub fn new(host: Arc<dyn HostBridge>, factory: Arc<dyn EndpointFactory>) -> Self {
        Self {
            host,
            factory,
            trickle_ice: true,
            retry: RetryPolicy::none(),
        }
    }

    /// Forward locally gathered candidates to the host
    pub fn with_trickle_ice(mut self, enabled: bool) -> Self {
        self.trickle_ice = enabled;
        self
    }

    /// Retry policy used by [`PreviewNegotiator::preview_with_retry`]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Ask the host to start streaming a monitor
    pub async fn start_monitor_preview(
        &self,
        hmonitor: isize,
        params: PreviewParams,
    ) -> Result<()> {
        self.host
            .start_monitor_preview(hmonitor, params)
            .await
            .inspect_err(|e| warn!("Failed to start monitor preview: {}", e))
    }

    /// Ask the host to start streaming a window
    pub async fn start_window_preview(&self, hwnd: isize, params: PreviewParams) -> Result<()> {
        self.host
            .start_window_preview(hwnd, params)
            .await
            .inspect_err(|e| warn!("Failed to start window preview: {}", e))
    }

    /// Start the host stream for whatever `id` refers to
    pub async fn start_preview(&self, id: &str, params: PreviewParams) -> Result<NativeHandle> {
        let handle = NativeHandle::parse(id)?;
        match handle {
            NativeHandle::Monitor(hmonitor) => self.start_monitor_preview(hmonitor, params).await?,
            NativeHandle::Window(hwnd) => self.start_window_preview(hwnd, params).await?,
        }
        Ok(handle)
    }

    /// Negotiate a connection for an already started preview
    ///
    /// Returns the endpoint once both descriptions are set and the host has
    /// the answer. The caller owns registration.
    pub async fn negotiate(
        &self,
        id: &str,
        sink: Arc<dyn PlaybackSink>,
    ) -> Result<Arc<dyn PeerEndpoint>> {
        let offer = self
            .host
            .get_preview_offer(id)
            .await
            .context(format!("Fetching preview offer for {}", id))?;

        if offer.id != id {
            return Err(GlimpseError::negotiation(format!(
                "Host answered offer request for {} with offer for {}",
                id, offer.id
            )));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let endpoint = self
            .factory
            .create(id, events_tx)
            .await
            .context(format!("Creating endpoint for {}", id))?;

        let (answer_sent_tx, answer_sent_rx) = oneshot::channel();
        tokio::spawn(run_endpoint_events(
            id.to_string(),
            events_rx,
            answer_sent_rx,
            sink,
            self.trickle_ice.then(|| self.host.clone()),
        ));

        match self.exchange(id, endpoint.as_ref(), &offer.sdp).await {
            Ok(()) => {
                let _ = answer_sent_tx.send(());
                info!("Preview connection negotiated for {}", id);
                Ok(endpoint)
            }
            Err(e) => {
                warn!("Failed to set up preview connection for {}: {}", id, e);
                if let Err(close_err) = endpoint.close().await {
                    debug!("Closing failed endpoint for {}: {}", id, close_err);
                }
                Err(e)
            }
        }
    }

    /// Offer in, answer out, in that order
    async fn exchange(&self, id: &str, endpoint: &dyn PeerEndpoint, offer_sdp: &str) -> Result<()> {
        endpoint.set_remote_offer(offer_sdp).await?;
        let answer = endpoint.create_answer().await?;
        endpoint.set_local_answer(&answer).await?;

        self.host
            .accept_preview_answer(id, &answer)
            .await
            .context(format!("Sending answer for {}", id))
    }

    /// Start the host stream and negotiate its connection
    pub async fn preview(
        &self,
        id: &str,
        params: PreviewParams,
        sink: Arc<dyn PlaybackSink>,
    ) -> Result<Arc<dyn PeerEndpoint>> {
        self.start_preview(id, params).await?;
        self.negotiate(id, sink).await
    }

    /// [`PreviewNegotiator::preview`] under the configured retry policy
    ///
    /// Between attempts the host stream is stopped so the next start is
    /// accepted.
    pub async fn preview_with_retry(
        &self,
        id: &str,
        params: PreviewParams,
        sink: Arc<dyn PlaybackSink>,
    ) -> Result<Arc<dyn PeerEndpoint>> {
        let mut attempt = 1;
        loop {
            match self.preview(id, params, sink.clone()).await {
                Ok(endpoint) => return Ok(endpoint),
                Err(e) if attempt < self.retry.max_attempts && is_retryable(&e) => {
                    warn!(
                        "Preview attempt {}/{} for {} failed: {}",
                        attempt, self.retry.max_attempts, id, e
                    );
                    if let Err(stop_err) = self.host.stop_preview(id).await {
                        debug!("Stop before retry for {} failed: {}", id, stop_err);
                    }
                    attempt += 1;
                    tokio::time::sleep(self.retry.delay_before(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_retryable(err: &GlimpseError) -> bool {
    !matches!(err.root(), GlimpseError::InvalidSourceId(_))
}

/// Handle one endpoint's events for its whole life
///
/// Tracks and candidates that arrive before the host has the answer are held
/// back and handled once it does. If negotiation fails they are dropped, so
/// a failed preview never reaches the sink.
async fn run_endpoint_events(
    id: String,
    mut events: mpsc::UnboundedReceiver<EndpointEvent>,
    answer_sent: oneshot::Receiver<()>,
    sink: Arc<dyn PlaybackSink>,
    trickle_to: Option<Arc<dyn HostBridge>>,
) {
    let mut answer_sent = Some(answer_sent);
    let mut pending: Vec<IceCandidate> = Vec::new();
    let mut held_tracks: Vec<(String, Vec<MediaStream>)> = Vec::new();
    let mut bound = false;

    loop {
        let step = match answer_sent.as_mut() {
            Some(signal) => tokio::select! {
                result = signal => Step::AnswerSent(result.is_ok()),
                event = events.recv() => Step::Event(event),
            },
            None => Step::Event(events.recv().await),
        };

        let event = match step {
            Step::AnswerSent(false) => {
                debug!("Negotiation for {} abandoned, dropping event handler", id);
                return;
            }
            Step::AnswerSent(true) => {
                answer_sent = None;
                for (track_id, streams) in held_tracks.drain(..) {
                    bound = bind_first_stream(&id, sink.as_ref(), bound, &track_id, streams);
                }
                if let Some(host) = &trickle_to {
                    for candidate in pending.drain(..) {
                        forward_candidate(host.as_ref(), &id, candidate).await;
                    }
                }
                continue;
            }
            Step::Event(Some(event)) => event,
            Step::Event(None) => {
                debug!("Endpoint events for {} ended", id);
                return;
            }
        };

        match event {
            EndpointEvent::Track { track_id, streams } if answer_sent.is_some() => {
                held_tracks.push((track_id, streams));
            }
            EndpointEvent::Track { track_id, streams } => {
                bound = bind_first_stream(&id, sink.as_ref(), bound, &track_id, streams);
            }
            EndpointEvent::StateChange(state) => {
                debug!("Connection state for {}: {}", id, state);
            }
            EndpointEvent::Candidate(candidate) => match &trickle_to {
                Some(host) if answer_sent.is_none() => {
                    forward_candidate(host.as_ref(), &id, candidate).await;
                }
                Some(_) => pending.push(candidate),
                None => debug!("ICE candidate for {}: {}", id, candidate.candidate),
            },
        }
    }
}

enum Step {
    AnswerSent(bool),
    Event(Option<EndpointEvent>),
}

/// Returns whether a stream is bound after handling this track
fn bind_first_stream(
    id: &str,
    sink: &dyn PlaybackSink,
    already_bound: bool,
    track_id: &str,
    streams: Vec<MediaStream>,
) -> bool {
    if already_bound {
        warn!(
            "Preview {} delivered extra track {}; keeping the first bound stream",
            id, track_id
        );
        return true;
    }

    let Some(stream) = streams.into_iter().next() else {
        debug!("Track {} for {} has no stream attached", track_id, id);
        return false;
    };

    info!("Binding stream {} (track {}) for {}", stream.id, track_id, id);
    sink.attach(stream);
    if let Err(e) = sink.play() {
        warn!("Playback failed to start for {}: {}", id, e);
    }
    true
}

async fn forward_candidate(host: &dyn HostBridge, id: &str, candidate: IceCandidate) {
    debug!("Trickling ICE candidate for {}: {}", id, candidate.candidate);
    if let Err(e) = host.add_preview_ice_candidate(id, candidate).await {
        warn!("Failed to send ICE candidate for {}: {}", id, e);
    }
}
