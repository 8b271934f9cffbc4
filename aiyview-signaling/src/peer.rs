//! Peer connection abstraction
//!
//! The signaling client drives negotiation through [`PeerConnection`] and
//! learns about media and data channel activity through [`PeerEvent`]s. The
//! production implementation lives in [`crate::webrtc_peer`].

use crate::protocol::{IceCandidateDescriptor, SessionDescription};
use aiyview_core::AiyViewResult;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

/// Negotiation surface of a WebRTC peer connection
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Apply the remote session description
    async fn set_remote_description(&self, description: SessionDescription) -> AiyViewResult<()>;

    /// Create an answer to the applied remote offer
    async fn create_answer(&self) -> AiyViewResult<SessionDescription>;

    /// Apply the local session description
    async fn set_local_description(&self, description: SessionDescription) -> AiyViewResult<()>;

    /// Add a remote ICE candidate
    async fn add_ice_candidate(&self, candidate: IceCandidateDescriptor) -> AiyViewResult<()>;

    /// Close the connection and release its transports
    async fn close(&self) -> AiyViewResult<()>;
}

/// Aggregate peer connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnectionState {
    /// Nothing has happened yet
    New,
    /// ICE/DTLS in progress
    Connecting,
    /// Media can flow
    Connected,
    /// Connectivity lost, may come back
    Disconnected,
    /// Connectivity checks failed
    Failed,
    /// Connection closed
    Closed,
}

impl fmt::Display for PeerConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerConnectionState::New => write!(f, "new"),
            PeerConnectionState::Connecting => write!(f, "connecting"),
            PeerConnectionState::Connected => write!(f, "connected"),
            PeerConnectionState::Disconnected => write!(f, "disconnected"),
            PeerConnectionState::Failed => write!(f, "failed"),
            PeerConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// Something that happened on the peer connection
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// A remote media track arrived
    TrackAdded {
        /// `audio` or `video`
        kind: String,
        /// Track identifier
        track_id: String,
    },
    /// The first media packet of a remote track was received
    FirstMediaPacket {
        /// `audio` or `video`
        kind: String,
    },
    /// A remote data channel opened
    DataChannelOpen {
        /// Channel label
        label: String,
    },
    /// A message arrived on a data channel
    DataChannelMessage {
        /// Channel label
        label: String,
        /// Whether the payload was sent as text
        is_string: bool,
        /// Raw payload
        data: Bytes,
    },
    /// A data channel closed
    DataChannelClosed {
        /// Channel label
        label: String,
    },
    /// A data channel reported an error
    DataChannelError {
        /// Channel label
        label: String,
        /// Error description
        reason: String,
    },
    /// The aggregate connection state changed
    StateChanged(PeerConnectionState),
}

impl PeerEvent {
    /// Whether the event is a remote video track arriving
    pub fn is_video_track(&self) -> bool {
        matches!(self, PeerEvent::TrackAdded { kind, .. } if kind == "video")
    }
}
