//! Overlay rendering error types

use thiserror::Error;

/// Main error type for overlay and surface operations
#[derive(Error, Debug)]
pub enum MediaError {
    /// Surface dimensions that cannot be drawn on
    #[error("Invalid surface dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// Drawing was attempted before the video surface was ready
    #[error("Surface not ready: {operation}")]
    SurfaceNotReady {
        /// Operation that was attempted
        operation: String,
    },

    /// The current frame could not be written out
    #[error("Export failed: {reason}")]
    ExportFailed {
        /// Failure reason
        reason: String,
    },
}

/// Result type alias for media operations
pub type MediaResult<T> = Result<T, MediaError>;

impl MediaError {
    /// Whether rendering can continue after this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            MediaError::SurfaceNotReady { .. } => true,
            MediaError::ExportFailed { .. } => true,
            MediaError::InvalidDimensions { .. } => false,
        }
    }

    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            MediaError::InvalidDimensions { .. } => ErrorCategory::Configuration,
            MediaError::SurfaceNotReady { .. } => ErrorCategory::State,
            MediaError::ExportFailed { .. } => ErrorCategory::Data,
        }
    }

    /// Get error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            MediaError::InvalidDimensions { .. } => "INVALID_DIMENSIONS",
            MediaError::SurfaceNotReady { .. } => "SURFACE_NOT_READY",
            MediaError::ExportFailed { .. } => "EXPORT_FAILED",
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Surface parameters that cannot be used
    Configuration,
    /// Operation attempted at the wrong time
    State,
    /// Frame output failures
    Data,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_bad_dimensions_are_fatal() {
        let dimensions = MediaError::InvalidDimensions {
            width: 0,
            height: 720,
        };
        assert_eq!(dimensions.category(), ErrorCategory::Configuration);
        assert!(!dimensions.is_recoverable());
        assert_eq!(dimensions.to_string(), "Invalid surface dimensions: 0x720");

        let early = MediaError::SurfaceNotReady {
            operation: "render".to_string(),
        };
        assert_eq!(early.category(), ErrorCategory::State);
        assert!(early.is_recoverable());
        assert_eq!(early.error_code(), "SURFACE_NOT_READY");
    }

    #[test]
    fn test_export_failure_from_unwritable_path() {
        let mut canvas = crate::DisplayList::new();
        crate::Canvas::resize(&mut canvas, 4, 4);
        let missing = std::env::temp_dir()
            .join("aiyview-no-such-dir")
            .join("overlay.svg");

        let error = canvas.write_svg(&missing).unwrap_err();
        assert_eq!(error.error_code(), "EXPORT_FAILED");
        assert_eq!(error.category(), ErrorCategory::Data);
        assert!(error.to_string().contains("overlay.svg"));
    }
}
