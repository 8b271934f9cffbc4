//! Structured logging setup

use aiyview_core::{AiyViewError, AiyViewResult};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_DIRECTIVE: &str = "info,webrtc=warn,webrtc_ice=warn,webrtc_dtls=warn";

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_directive`. If a subscriber is
/// already installed the call does nothing.
pub fn init_logging(default_directive: &str) -> AiyViewResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive).map_err(|e| {
            AiyViewError::InvalidConfiguration {
                field: "log_level".to_string(),
                reason: e.to_string(),
            }
        })?,
    };

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("Logging already initialised");
    }
    Ok(())
}
