//! Events reported by a running viewer

use aiyview_signaling::{PeerConnectionState, SignalingState};
use tokio::sync::mpsc;

/// Status changes a viewer reports while it runs
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// The signaling session changed state
    StateChanged {
        /// New state
        state: SignalingState,
    },
    /// The remote video is playing and the overlay was sized to it
    VideoReady {
        /// Overlay width in pixels
        width: u32,
        /// Overlay height in pixels
        height: u32,
    },
    /// The remote video changed size and the overlay followed
    VideoResized {
        /// New width in pixels
        width: u32,
        /// New height in pixels
        height: u32,
    },
    /// A detection result was drawn
    DetectionsRendered {
        /// Items drawn
        drawn: usize,
        /// Items skipped as unknown or malformed
        skipped: usize,
    },
    /// The overlay was cleared because detections stopped arriving
    OverlayCleared,
    /// The detection data channel opened
    MetadataChannelOpen {
        /// Channel label
        label: String,
    },
    /// The detection data channel closed
    MetadataChannelClosed {
        /// Channel label
        label: String,
    },
    /// The peer connection changed state
    PeerStateChanged {
        /// New state
        state: PeerConnectionState,
    },
    /// Answering the server's offer failed; the session will not retry
    NegotiationFailed {
        /// Failure description
        reason: String,
    },
    /// Something went wrong
    Error {
        /// Error description
        error: String,
        /// Whether the session keeps going
        recoverable: bool,
    },
    /// The session ended
    Closed {
        /// Why it ended
        reason: String,
    },
}

impl ViewerEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            ViewerEvent::StateChanged { .. } => "state_changed",
            ViewerEvent::VideoReady { .. } => "video_ready",
            ViewerEvent::VideoResized { .. } => "video_resized",
            ViewerEvent::DetectionsRendered { .. } => "detections_rendered",
            ViewerEvent::OverlayCleared => "overlay_cleared",
            ViewerEvent::MetadataChannelOpen { .. } => "metadata_channel_open",
            ViewerEvent::MetadataChannelClosed { .. } => "metadata_channel_closed",
            ViewerEvent::PeerStateChanged { .. } => "peer_state_changed",
            ViewerEvent::NegotiationFailed { .. } => "negotiation_failed",
            ViewerEvent::Error { .. } => "error",
            ViewerEvent::Closed { .. } => "closed",
        }
    }

    /// Check if this is an overlay-related event
    pub fn is_overlay_event(&self) -> bool {
        matches!(
            self,
            ViewerEvent::VideoReady { .. }
                | ViewerEvent::VideoResized { .. }
                | ViewerEvent::DetectionsRendered { .. }
                | ViewerEvent::OverlayCleared
        )
    }

    /// Check if this is a connection-related event
    pub fn is_connection_event(&self) -> bool {
        matches!(
            self,
            ViewerEvent::StateChanged { .. }
                | ViewerEvent::MetadataChannelOpen { .. }
                | ViewerEvent::MetadataChannelClosed { .. }
                | ViewerEvent::PeerStateChanged { .. }
                | ViewerEvent::Closed { .. }
        )
    }

    /// Check if this is an error event
    pub fn is_error_event(&self) -> bool {
        matches!(
            self,
            ViewerEvent::NegotiationFailed { .. } | ViewerEvent::Error { .. }
        )
    }
}

/// Stream of viewer events for async iteration
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<ViewerEvent>,
}

impl EventStream {
    /// Create a new event stream with a receiver
    pub fn new(receiver: mpsc::UnboundedReceiver<ViewerEvent>) -> Self {
        Self { receiver }
    }

    /// Get the next event; `None` once the viewer is gone
    pub async fn next(&mut self) -> Option<ViewerEvent> {
        self.receiver.recv().await
    }

    /// Try to get the next event without blocking
    pub fn try_next(&mut self) -> Result<Option<ViewerEvent>, mpsc::error::TryRecvError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(mpsc::error::TryRecvError::Disconnected)
            }
        }
    }

    /// Close the event stream
    pub fn close(&mut self) {
        self.receiver.close();
    }

    /// Check if the event stream is closed
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}
