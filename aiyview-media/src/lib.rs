//! # aiyview Media
//!
//! Detection overlay rendering for aiyview.
//! This crate sizes a drawing surface to the incoming video, draws detection
//! boxes and labels on it, and clears it when detections go stale.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod canvas;
pub mod error;
pub mod overlay;
pub mod surface;

// Re-export main types
pub use canvas::{Canvas, Color, DisplayList, DrawCommand, Shape};
pub use error::{ErrorCategory, MediaError, MediaResult};
pub use overlay::{
    class_label, face_label, joy_color, BoxGeometry, OverlayConfig, OverlayRenderer,
    OverlayStats, OverlayStyle, RenderSummary,
};
pub use surface::{SurfaceSize, VideoSurface};
