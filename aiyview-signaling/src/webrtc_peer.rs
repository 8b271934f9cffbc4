//! [`PeerConnection`] backed by the `webrtc` crate
//!
//! Callbacks registered on the underlying connection never touch session
//! state; they only forward [`PeerEvent`]s into an unbounded channel that the
//! session loop drains.

use crate::peer::{PeerConnection, PeerConnectionState, PeerEvent};
use crate::protocol::{IceCandidateDescriptor, SdpType, SessionDescription};
use aiyview_core::{AiyViewError, AiyViewResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;

/// Receiver side of the peer event channel
pub type PeerEventReceiver = mpsc::UnboundedReceiver<PeerEvent>;

/// WebRTC peer connection for a receive-only viewer session
pub struct WebRtcPeer {
    session_id: String,
    pc: Arc<RTCPeerConnection>,
}

impl WebRtcPeer {
    /// Create a peer connection using the given STUN/TURN urls.
    ///
    /// Returns the peer together with the channel its events are delivered on.
    pub async fn new(
        ice_urls: Vec<String>,
        session_id: impl Into<String>,
    ) -> AiyViewResult<(Self, PeerEventReceiver)> {
        let session_id = session_id.into();

        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| AiyViewError::Initialization {
                reason: format!("failed to register codecs: {}", e),
            })?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine).map_err(|e| {
            AiyViewError::Initialization {
                reason: format!("failed to register interceptors: {}", e),
            }
        })?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers = if ice_urls.is_empty() {
            Vec::new()
        } else {
            vec![RTCIceServer {
                urls: ice_urls,
                ..Default::default()
            }]
        };

        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let pc = api
            .new_peer_connection(rtc_config)
            .await
            .map_err(|e| AiyViewError::Initialization {
                reason: format!("failed to create peer connection: {}", e),
            })?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let peer = Self {
            session_id,
            pc: Arc::new(pc),
        };
        peer.setup_event_handlers(events_tx);

        info!("Peer connection created for session {}", peer.session_id);
        Ok((peer, events_rx))
    }

    /// Session this peer belongs to
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn setup_event_handlers(&self, events: mpsc::UnboundedSender<PeerEvent>) {
        let state_events = events.clone();
        let session_id = self.session_id.clone();
        self.pc
            .on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
                let events = state_events.clone();
                let session_id = session_id.clone();

                Box::pin(async move {
                    let state = match s {
                        RTCPeerConnectionState::New => PeerConnectionState::New,
                        RTCPeerConnectionState::Connecting => PeerConnectionState::Connecting,
                        RTCPeerConnectionState::Connected => PeerConnectionState::Connected,
                        RTCPeerConnectionState::Disconnected => PeerConnectionState::Disconnected,
                        RTCPeerConnectionState::Failed => PeerConnectionState::Failed,
                        RTCPeerConnectionState::Closed => PeerConnectionState::Closed,
                        _ => return,
                    };
                    info!("Peer {} connection state: {}", session_id, state);
                    let _ = events.send(PeerEvent::StateChanged(state));
                })
            }));

        // The server does not take trickled candidates from the viewer
        self.pc
            .on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
                match candidate.map(|c| c.to_json()) {
                    Some(Ok(init)) => debug!("Local ICE candidate: {}", init.candidate),
                    Some(Err(e)) => debug!("Unreadable local ICE candidate: {}", e),
                    None => debug!("Local ICE gathering complete"),
                }
                Box::pin(async {})
            }));

        let track_events = events.clone();
        self.pc
            .on_track(Box::new(move |track, _receiver, _transceiver| {
                let events = track_events.clone();
                let kind = track.kind().to_string();
                info!(
                    "Remote track added: kind={}, codec={}",
                    kind,
                    track.codec().capability.mime_type
                );
                let _ = events.send(PeerEvent::TrackAdded {
                    kind: kind.clone(),
                    track_id: track.id(),
                });

                // Drain the track so the first packet can be observed and
                // the receive buffers never fill up
                tokio::spawn(async move {
                    let mut first = true;
                    while let Ok((_packet, _attributes)) = track.read_rtp().await {
                        if first {
                            first = false;
                            debug!("First {} packet received", kind);
                            let _ = events.send(PeerEvent::FirstMediaPacket { kind: kind.clone() });
                        }
                    }
                    debug!("Remote {} track ended", kind);
                });

                Box::pin(async {})
            }));

        self.pc
            .on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
                let events = events.clone();
                Box::pin(async move {
                    let label = dc.label().to_string();
                    info!("Data channel announced: {}", label);

                    let open_events = events.clone();
                    let open_label = label.clone();
                    dc.on_open(Box::new(move || {
                        info!("Data channel opened: {}", open_label);
                        let _ = open_events.send(PeerEvent::DataChannelOpen {
                            label: open_label.clone(),
                        });
                        Box::pin(async {})
                    }));

                    let message_events = events.clone();
                    let message_label = label.clone();
                    dc.on_message(Box::new(move |msg: DataChannelMessage| {
                        debug!("Data channel message: {} bytes", msg.data.len());
                        let _ = message_events.send(PeerEvent::DataChannelMessage {
                            label: message_label.clone(),
                            is_string: msg.is_string,
                            data: msg.data,
                        });
                        Box::pin(async {})
                    }));

                    let close_events = events.clone();
                    let close_label = label.clone();
                    dc.on_close(Box::new(move || {
                        info!("Data channel closed: {}", close_label);
                        let _ = close_events.send(PeerEvent::DataChannelClosed {
                            label: close_label.clone(),
                        });
                        Box::pin(async {})
                    }));

                    let error_events = events;
                    dc.on_error(Box::new(move |err| {
                        warn!("Data channel {} error: {}", label, err);
                        let _ = error_events.send(PeerEvent::DataChannelError {
                            label: label.clone(),
                            reason: err.to_string(),
                        });
                        Box::pin(async {})
                    }));
                })
            }));
    }
}

fn negotiation_error(step: &str, e: impl std::fmt::Display) -> AiyViewError {
    AiyViewError::Negotiation {
        step: step.to_string(),
        reason: e.to_string(),
    }
}

fn to_rtc_description(description: SessionDescription) -> AiyViewResult<RTCSessionDescription> {
    let parsed = match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp),
        SdpType::Answer => RTCSessionDescription::answer(description.sdp),
        SdpType::Pranswer => RTCSessionDescription::pranswer(description.sdp),
        SdpType::Rollback => {
            return Err(negotiation_error(
                "parse_description",
                "rollback descriptions are not supported",
            ))
        }
    };
    parsed.map_err(|e| negotiation_error("parse_description", e))
}

fn from_rtc_description(description: RTCSessionDescription) -> AiyViewResult<SessionDescription> {
    let sdp_type = match description.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Rollback => SdpType::Rollback,
        other => {
            return Err(negotiation_error(
                "create_answer",
                format!("unexpected description type {:?}", other),
            ))
        }
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: description.sdp,
    })
}

#[async_trait]
impl PeerConnection for WebRtcPeer {
    async fn set_remote_description(&self, description: SessionDescription) -> AiyViewResult<()> {
        let description = to_rtc_description(description)?;
        self.pc
            .set_remote_description(description)
            .await
            .map_err(|e| negotiation_error("set_remote_description", e))
    }

    async fn create_answer(&self) -> AiyViewResult<SessionDescription> {
        let answer = self
            .pc
            .create_answer(None)
            .await
            .map_err(|e| negotiation_error("create_answer", e))?;
        from_rtc_description(answer)
    }

    async fn set_local_description(&self, description: SessionDescription) -> AiyViewResult<()> {
        let description = to_rtc_description(description)?;
        self.pc
            .set_local_description(description)
            .await
            .map_err(|e| negotiation_error("set_local_description", e))
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateDescriptor) -> AiyViewResult<()> {
        let line = candidate.candidate.clone();
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: None,
        };

        self.pc
            .add_ice_candidate(init)
            .await
            .map_err(|e| AiyViewError::IceCandidateRejected {
                candidate: line,
                reason: e.to_string(),
            })
    }

    async fn close(&self) -> AiyViewResult<()> {
        self.pc.close().await.map_err(|e| AiyViewError::Transport {
            reason: format!("failed to close peer connection: {}", e),
        })?;
        info!("Peer connection closed for session {}", self.session_id);
        Ok(())
    }
}
