//! Viewer configuration and defaults

use aiyview_core::{AiyViewError, AiyViewResult};
use aiyview_media::{OverlayConfig, SurfaceSize};
use aiyview_signaling::CallOptions;
use std::path::PathBuf;
use url::Url;

/// Port the uv4l server accepts signaling connections on
pub const SIGNALING_PORT: u16 = 9080;
/// Port of the STUN server running next to uv4l
pub const STUN_PORT: u16 = 3478;
/// Path of the uv4l WebRTC signaling endpoint
pub const SIGNALING_PATH: &str = "/stream/webrtc";

/// Capture size of the Vision Kit camera
const DEFAULT_VIDEO_SIZE: SurfaceSize = SurfaceSize {
    width: 1640,
    height: 922,
};

/// Configuration for one viewer session
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Host running the uv4l server
    pub host: String,
    /// Signaling port
    pub port: u16,
    /// Use `wss` for the control channel
    pub secure: bool,
    /// Options sent with the call request
    pub call_options: CallOptions,
    /// Overlay style and staleness timing
    pub overlay: OverlayConfig,
    /// Intrinsic size of the remote video. Frames are not decoded, so the
    /// overlay is sized from this.
    pub video_size: SurfaceSize,
    /// Write the overlay to this SVG file after every change
    pub svg_output: Option<PathBuf>,
}

impl ViewerConfig {
    /// Configuration for a uv4l server on `host` with default settings
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: SIGNALING_PORT,
            secure: false,
            call_options: CallOptions::default(),
            overlay: OverlayConfig::default(),
            video_size: DEFAULT_VIDEO_SIZE,
            svg_output: None,
        }
    }

    /// Derive the configuration from the location of the page the viewer
    /// was served from. An `https` page makes the control channel `wss`.
    pub fn from_location(location: &str) -> AiyViewResult<Self> {
        let url = Url::parse(location).map_err(|e| AiyViewError::InvalidConfiguration {
            field: "location".to_string(),
            reason: e.to_string(),
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| AiyViewError::MissingConfiguration {
                field: "host".to_string(),
            })?;

        let mut config = Self::for_host(host);
        config.secure = url.scheme() == "https";
        Ok(config)
    }

    /// WebSocket URL of the signaling endpoint
    pub fn signaling_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, SIGNALING_PATH)
    }

    /// STUN server URL handed to the peer connection
    pub fn stun_url(&self) -> String {
        format!("stun:{}:{}", self.host, STUN_PORT)
    }

    /// Check the configuration before connecting
    pub fn validate(&self) -> AiyViewResult<()> {
        if self.host.is_empty() {
            return Err(AiyViewError::MissingConfiguration {
                field: "host".to_string(),
            });
        }
        if self.port == 0 {
            return Err(AiyViewError::InvalidConfiguration {
                field: "port".to_string(),
                reason: "port must be non-zero".to_string(),
            });
        }
        if self.overlay.sweep_interval.is_zero() {
            return Err(AiyViewError::InvalidConfiguration {
                field: "sweep_interval".to_string(),
                reason: "interval must be non-zero".to_string(),
            });
        }
        if self.overlay.staleness_threshold.is_zero() {
            return Err(AiyViewError::InvalidConfiguration {
                field: "staleness_threshold".to_string(),
                reason: "threshold must be non-zero".to_string(),
            });
        }

        Url::parse(&self.signaling_url()).map_err(|e| AiyViewError::InvalidConfiguration {
            field: "host".to_string(),
            reason: format!("'{}' does not form a valid URL: {}", self.host, e),
        })?;
        Ok(())
    }
}

/// Parse a `WIDTHxHEIGHT` video size such as `1640x922`
pub fn parse_video_size(value: &str) -> AiyViewResult<SurfaceSize> {
    let invalid = |reason: &str| AiyViewError::InvalidConfiguration {
        field: "video_size".to_string(),
        reason: format!("'{}': {}", value, reason),
    };

    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| invalid("expected WIDTHxHEIGHT"))?;
    let width = width
        .trim()
        .parse::<u32>()
        .map_err(|_| invalid("width is not a number"))?;
    let height = height
        .trim()
        .parse::<u32>()
        .map_err(|_| invalid("height is not a number"))?;

    SurfaceSize::new(width, height).map_err(|e| invalid(&e.to_string()))
}
