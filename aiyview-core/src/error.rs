//! Error types for aiyview

use thiserror::Error;

/// Main error type for aiyview operations
#[derive(Error, Debug)]
pub enum AiyViewError {
    /// Initialization error
    #[error("Initialization failed: {reason}")]
    Initialization {
        /// Reason for initialization failure
        reason: String,
    },

    /// Missing configuration error
    #[error("Missing required configuration: {field}")]
    MissingConfiguration {
        /// Missing configuration field
        field: String,
    },

    /// Configuration value could not be used
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfiguration {
        /// Offending configuration field
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Transport error on the control channel or the peer connection
    #[error("Transport error: {reason}")]
    Transport {
        /// Reason for transport error
        reason: String,
    },

    /// The control channel is no longer open
    #[error("Control channel closed")]
    ControlChannelClosed,

    /// A session description step was rejected
    #[error("Negotiation failed during {step}: {reason}")]
    Negotiation {
        /// Negotiation step that failed (e.g. "set_remote_description")
        step: String,
        /// Reason reported by the transport
        reason: String,
    },

    /// An ICE candidate was rejected by the peer connection
    #[error("ICE candidate rejected ({candidate}): {reason}")]
    IceCandidateRejected {
        /// Candidate line that was rejected
        candidate: String,
        /// Reason reported by the transport
        reason: String,
    },

    /// Invalid state error
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Protocol error
    #[error("Protocol error: {message}")]
    ProtocolError {
        /// Error message
        message: String,
    },

    /// Detection metadata could not be interpreted
    #[error("Malformed metadata: {reason}")]
    MalformedMetadata {
        /// Why the payload was rejected
        reason: String,
    },

    /// Invalid message format
    #[error("Invalid message format: {message}, error: {source}")]
    InvalidMessage {
        /// Invalid message content
        message: String,
        /// Parsing error
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type alias for aiyview operations
pub type AiyViewResult<T> = Result<T, AiyViewError>;

impl AiyViewError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            AiyViewError::Initialization { .. } => "INITIALIZATION_FAILED".to_string(),
            AiyViewError::MissingConfiguration { .. } => "MISSING_CONFIGURATION".to_string(),
            AiyViewError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION".to_string(),
            AiyViewError::Transport { .. } => "TRANSPORT_ERROR".to_string(),
            AiyViewError::ControlChannelClosed => "CONTROL_CHANNEL_CLOSED".to_string(),
            AiyViewError::Negotiation { .. } => "NEGOTIATION_FAILED".to_string(),
            AiyViewError::IceCandidateRejected { .. } => "ICE_CANDIDATE_REJECTED".to_string(),
            AiyViewError::InvalidState { .. } => "INVALID_STATE".to_string(),
            AiyViewError::ProtocolError { .. } => "PROTOCOL_ERROR".to_string(),
            AiyViewError::MalformedMetadata { .. } => "MALFORMED_METADATA".to_string(),
            AiyViewError::InvalidMessage { .. } => "INVALID_MESSAGE".to_string(),
        }
    }

    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            AiyViewError::Initialization { .. } => ErrorCategory::Configuration,
            AiyViewError::MissingConfiguration { .. } => ErrorCategory::Configuration,
            AiyViewError::InvalidConfiguration { .. } => ErrorCategory::Configuration,
            AiyViewError::Transport { .. } => ErrorCategory::Transport,
            AiyViewError::ControlChannelClosed => ErrorCategory::Transport,
            AiyViewError::Negotiation { .. } => ErrorCategory::Negotiation,
            AiyViewError::IceCandidateRejected { .. } => ErrorCategory::Negotiation,
            AiyViewError::InvalidState { .. } => ErrorCategory::State,
            AiyViewError::ProtocolError { .. } => ErrorCategory::Protocol,
            AiyViewError::MalformedMetadata { .. } => ErrorCategory::Metadata,
            AiyViewError::InvalidMessage { .. } => ErrorCategory::Protocol,
        }
    }

    /// Whether the session can keep going after this error.
    ///
    /// Transport and negotiation failures leave the session degraded for good;
    /// bad input is skipped and the session carries on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Protocol | ErrorCategory::Metadata
        ) || matches!(self, AiyViewError::IceCandidateRejected { .. })
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration and parameter errors
    Configuration,
    /// Control channel or media transport failures
    Transport,
    /// Offer/answer or candidate negotiation failures
    Negotiation,
    /// State management errors
    State,
    /// Control channel messages that could not be understood
    Protocol,
    /// Detection metadata that could not be understood
    Metadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let negotiation = AiyViewError::Negotiation {
            step: "set_remote_description".to_string(),
            reason: "bad sdp".to_string(),
        };
        assert_eq!(negotiation.category(), ErrorCategory::Negotiation);
        assert!(!negotiation.is_recoverable());

        let metadata = AiyViewError::MalformedMetadata {
            reason: "not json".to_string(),
        };
        assert_eq!(metadata.category(), ErrorCategory::Metadata);
        assert!(metadata.is_recoverable());

        let rejected = AiyViewError::IceCandidateRejected {
            candidate: "candidate:1".to_string(),
            reason: "no transport".to_string(),
        };
        assert!(rejected.is_recoverable());
        assert!(!AiyViewError::ControlChannelClosed.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let error = AiyViewError::Negotiation {
            step: "create_answer".to_string(),
            reason: "no remote description".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Negotiation failed during create_answer: no remote description"
        );
        assert_eq!(error.error_code(), "NEGOTIATION_FAILED");
    }
}
