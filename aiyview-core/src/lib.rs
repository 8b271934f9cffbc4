//! # aiyview Core
//!
//! Shared error types and the detection data model for the aiyview client.
//! The signaling and media crates both build on these types; neither depends
//! on the other.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod detection;
pub mod error;

// Re-export main types
pub use detection::{
    BoundingBox, ClassLabel, DetectionItem, DetectionResult, DetectionSink, FaceDetection,
    ObjectDetection,
};
pub use error::{AiyViewError, AiyViewResult, ErrorCategory};
