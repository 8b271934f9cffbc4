//! # aiyview Signaling
//!
//! Client side of the uv4l WebRTC signaling exchange.
//! Handles the call/offer/answer flow over a WebSocket control channel,
//! ordered application of remote ICE candidates, and the peer connection
//! that carries the video track and the detection data channel.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod candidates;
pub mod client;
pub mod peer;
pub mod protocol;
pub mod transport;
pub mod webrtc_peer;

// Re-export main types
pub use candidates::CandidateQueue;
pub use client::{SignalingClient, SignalingState, SignalingStats};
pub use peer::{PeerConnection, PeerConnectionState, PeerEvent};
pub use protocol::{
    CallOptions, ClientMessage, IceCandidateDescriptor, SdpType, ServerMessage,
    SessionDescription,
};
pub use transport::{ControlChannel, WebSocketChannel};
pub use webrtc_peer::{PeerEventReceiver, WebRtcPeer};
