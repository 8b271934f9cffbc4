//! Session statistics and connection snapshots

use aiyview_core::{AiyViewError, AiyViewResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Counters for one viewer session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Control messages sent to the server
    pub control_messages_sent: u64,
    /// Control messages received from the server
    pub control_messages_received: u64,
    /// Remote ICE candidates received
    pub candidates_received: u64,
    /// Remote ICE candidates applied
    pub candidates_applied: u64,
    /// Remote ICE candidates rejected by the peer connection
    pub candidates_rejected: u64,
    /// Remote ICE candidates discarded unapplied
    pub candidates_dropped: u64,
    /// Messages received on the metadata channel
    pub metadata_messages: u64,
    /// Metadata messages that could not be parsed
    pub metadata_rejected: u64,
    /// Detection results drawn
    pub detections_rendered: u64,
    /// Detection items drawn
    pub items_drawn: u64,
    /// Detection items skipped as unknown or malformed
    pub items_skipped: u64,
    /// Overlay clears caused by stale detections
    pub stale_clears: u64,
    /// Detection results dropped before the surface was ready
    pub renders_dropped: u64,
}

impl SessionStats {
    /// Share of received candidates that made it into the peer connection
    pub fn candidate_success_rate(&self) -> f64 {
        if self.candidates_received == 0 {
            return 0.0;
        }
        self.candidates_applied as f64 / self.candidates_received as f64
    }

    /// Encode as JSON
    pub fn to_json(&self) -> AiyViewResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| AiyViewError::ProtocolError {
            message: format!("failed to encode session stats: {}", e),
        })
    }
}

/// Point-in-time description of a viewer session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Session identifier
    pub session_id: String,
    /// Signaling endpoint
    pub signaling_url: String,
    /// Signaling state name
    pub state: String,
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// How long the session has been running
    pub duration: Duration,
    /// Counters at the time of the snapshot
    pub stats: SessionStats,
}

impl ConnectionInfo {
    /// Take a snapshot at `now`
    pub fn snapshot(
        session_id: impl Into<String>,
        signaling_url: impl Into<String>,
        state: impl fmt::Display,
        started_at: DateTime<Utc>,
        now: DateTime<Utc>,
        stats: SessionStats,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            signaling_url: signaling_url.into(),
            state: state.to_string(),
            started_at,
            duration: (now - started_at).to_std().unwrap_or_default(),
            stats,
        }
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session {} [{}] {} for {:.1}s: {} detections, {}/{} candidates applied, {} stale clears",
            self.session_id,
            self.state,
            self.signaling_url,
            self.duration.as_secs_f64(),
            self.stats.detections_rendered,
            self.stats.candidates_applied,
            self.stats.candidates_received,
            self.stats.stale_clears
        )
    }
}
