//! # aiyview
//!
//! Live view of an AIY Vision Kit camera with its detections drawn on top.
//!
//! The kit's uv4l server streams the camera over WebRTC and publishes each
//! inference cycle on a data channel. A [`Viewer`] performs the uv4l
//! signaling exchange, sizes an overlay to the incoming video and redraws it
//! for every detection result, clearing it when results stop arriving.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aiyview::{LiveViewer, ViewerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ViewerConfig::from_location("http://raspberrypi.local:4664/")?;
//!     let mut viewer = LiveViewer::connect(config).await?;
//!
//!     let mut events = viewer.events().expect("events are taken once");
//!     tokio::spawn(async move {
//!         while let Some(event) = events.next().await {
//!             println!("Viewer event: {:?}", event);
//!         }
//!     });
//!
//!     let shutdown = async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     };
//!     let stats = viewer.run(shutdown).await?;
//!     println!("{} detections rendered", stats.detections_rendered);
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export the types a viewer is assembled from
pub use aiyview_core::{AiyViewError, AiyViewResult, DetectionItem, DetectionResult};
pub use aiyview_diagnostics::{init_logging, ConnectionInfo, SessionStats, DEFAULT_DIRECTIVE};
pub use aiyview_media::{Canvas, DisplayList, OverlayConfig, OverlayStyle, SurfaceSize};
pub use aiyview_signaling::{
    CallOptions, ControlChannel, PeerConnection, PeerConnectionState, PeerEvent,
    PeerEventReceiver, SignalingClient, SignalingState, WebRtcPeer, WebSocketChannel,
};

// Public API modules
pub mod config;
pub mod event;
pub mod viewer;

// Re-export main API types
pub use config::{parse_video_size, ViewerConfig, SIGNALING_PATH, SIGNALING_PORT, STUN_PORT};
pub use event::{EventStream, ViewerEvent};
pub use viewer::{LiveViewer, Viewer};
