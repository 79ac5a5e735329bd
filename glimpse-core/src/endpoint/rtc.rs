//! WebRTC endpoint backed by the `webrtc` crate

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

use super::{
    ConnectionState, EndpointEvent, EndpointFactory, EventSender, MediaStream, PeerEndpoint,
    TrackKind,
};
use crate::error::{GlimpseError, Result};
use crate::types::IceCandidate;

/// Builds [`RtcEndpoint`]s
#[derive(Debug, Clone, Default)]
pub struct RtcEndpointFactory {
    /// STUN/TURN urls
    ice_servers: Vec<String>,
}

impl RtcEndpointFactory {
    /// Create a factory using the given ICE servers
    pub fn new(ice_servers: Vec<String>) -> Self {
        Self { ice_servers }
    }

    fn rtc_configuration(&self) -> RTCConfiguration {
        let ice_servers: Vec<RTCIceServer> = self
            .ice_servers
            .iter()
            .map(|url| RTCIceServer {
                urls: vec![url.clone()],
                ..Default::default()
            })
            .collect();

        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }
}

#[async_trait]
impl EndpointFactory for RtcEndpointFactory {
    async fn create(&self, source_id: &str, events: EventSender) -> Result<Arc<dyn PeerEndpoint>> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| GlimpseError::webrtc(format!("Failed to register codecs: {}", e)))?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)
            .map_err(|e| GlimpseError::webrtc(format!("Failed to register interceptors: {}", e)))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let pc = api
            .new_peer_connection(self.rtc_configuration())
            .await
            .map_err(|e| GlimpseError::webrtc(format!("Failed to create peer connection: {}", e)))?;

        let endpoint = RtcEndpoint {
            source_id: source_id.to_string(),
            pc: Arc::new(pc),
            state: Arc::new(Mutex::new(ConnectionState::New)),
        };
        endpoint.install_handlers(events);

        debug!("Created WebRTC endpoint for {}", source_id);
        Ok(Arc::new(endpoint))
    }
}

/// Receive-only peer connection for one preview
pub struct RtcEndpoint {
    source_id: String,
    pc: Arc<RTCPeerConnection>,
    state: Arc<Mutex<ConnectionState>>,
}

impl RtcEndpoint {
    fn install_handlers(&self, events: EventSender) {
        let track_events = events.clone();
        self.pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let kind = match track.kind() {
                    RTPCodecType::Video => TrackKind::Video,
                    RTPCodecType::Audio => TrackKind::Audio,
                    _ => TrackKind::Unknown,
                };
                let track_id = track.id();
                // A track without msid carries no stream to bind
                let streams = if track.stream_id().is_empty() {
                    Vec::new()
                } else {
                    vec![MediaStream::from_remote(track, kind)]
                };
                let _ = track_events.send(EndpointEvent::Track { track_id, streams });
                Box::pin(async {})
            },
        ));

        let state_events = events.clone();
        let state = self.state.clone();
        let source_id = self.source_id.clone();
        self.pc
            .on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
                let new_state = match s {
                    RTCPeerConnectionState::New => Some(ConnectionState::New),
                    RTCPeerConnectionState::Connecting => Some(ConnectionState::Connecting),
                    RTCPeerConnectionState::Connected => Some(ConnectionState::Connected),
                    RTCPeerConnectionState::Disconnected => Some(ConnectionState::Disconnected),
                    RTCPeerConnectionState::Failed => Some(ConnectionState::Failed),
                    RTCPeerConnectionState::Closed => Some(ConnectionState::Closed),
                    _ => None,
                };

                if let Some(new_state) = new_state {
                    info!("Connection state for {}: {}", source_id, new_state);
                    *state.lock() = new_state;
                    let _ = state_events.send(EndpointEvent::StateChange(new_state));
                }
                Box::pin(async {})
            }));

        self.pc
            .on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
                if let Some(c) = candidate {
                    match c.to_json() {
                        Ok(init) => {
                            let _ = events.send(EndpointEvent::Candidate(IceCandidate {
                                candidate: init.candidate,
                                sdp_mid: init.sdp_mid,
                                sdp_mline_index: init.sdp_mline_index,
                            }));
                        }
                        Err(e) => warn!("Failed to serialize ICE candidate: {}", e),
                    }
                }
                Box::pin(async {})
            }));
    }
}

#[async_trait]
impl PeerEndpoint for RtcEndpoint {
    async fn set_remote_offer(&self, sdp: &str) -> Result<()> {
        let offer = RTCSessionDescription::offer(sdp.to_string())
            .map_err(|e| GlimpseError::negotiation(format!("Invalid SDP offer: {}", e)))?;

        self.pc
            .set_remote_description(offer)
            .await
            .map_err(|e| {
                GlimpseError::negotiation(format!("Failed to set remote description: {}", e))
            })
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self
            .pc
            .create_answer(None)
            .await
            .map_err(|e| GlimpseError::negotiation(format!("Failed to create answer: {}", e)))?;
        Ok(answer.sdp)
    }

    async fn set_local_answer(&self, sdp: &str) -> Result<()> {
        let answer = RTCSessionDescription::answer(sdp.to_string())
            .map_err(|e| GlimpseError::negotiation(format!("Invalid SDP answer: {}", e)))?;

        self.pc
            .set_local_description(answer)
            .await
            .map_err(|e| {
                GlimpseError::negotiation(format!("Failed to set local description: {}", e))
            })
    }

    async fn close(&self) -> Result<()> {
        debug!("Closing WebRTC endpoint for {}", self.source_id);
        self.pc
            .close()
            .await
            .map_err(|e| GlimpseError::webrtc(format!("Failed to close connection: {}", e)))?;
        *self.state.lock() = ConnectionState::Closed;
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }
}
