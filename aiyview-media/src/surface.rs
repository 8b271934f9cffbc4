//! Video surface readiness
//!
//! The overlay can only be sized once the video's intrinsic dimensions are
//! known and playback has started. The two signals can arrive in either
//! order; [`VideoSurface`] reports the dimensions exactly once, when the
//! second one lands.

use crate::error::{MediaError, MediaResult};
use std::fmt;
use tracing::{debug, info};

/// Intrinsic video size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl SurfaceSize {
    /// Create a size, rejecting empty surfaces
    pub fn new(width: u32, height: u32) -> MediaResult<Self> {
        if width == 0 || height == 0 {
            return Err(MediaError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Tracks the "metadata loaded" and "playing" signals of the video element
#[derive(Debug, Default)]
pub struct VideoSurface {
    size: Option<SurfaceSize>,
    playing: bool,
    announced: bool,
}

impl VideoSurface {
    /// Create a surface with neither signal received
    pub fn new() -> Self {
        Self::default()
    }

    /// Intrinsic dimensions became known.
    ///
    /// Returns the size if this completes readiness. A later call with
    /// different dimensions is a resize and is returned as well.
    pub fn on_metadata_loaded(&mut self, width: u32, height: u32) -> MediaResult<Option<SurfaceSize>> {
        let size = SurfaceSize::new(width, height)?;
        debug!("Video metadata ready: {}", size);

        let previous = self.size.replace(size);
        if self.announced {
            if previous == Some(size) {
                return Ok(None);
            }
            info!("Remote video size changed to {}", size);
            return Ok(Some(size));
        }
        Ok(self.try_announce())
    }

    /// Playback started.
    ///
    /// Returns the size if this completes readiness.
    pub fn on_playing(&mut self) -> Option<SurfaceSize> {
        if self.playing {
            return None;
        }
        debug!("Video playing");
        self.playing = true;
        self.try_announce()
    }

    fn try_announce(&mut self) -> Option<SurfaceSize> {
        match (self.size, self.playing, self.announced) {
            (Some(size), true, false) => {
                self.announced = true;
                info!("Video surface ready: {}", size);
                Some(size)
            }
            _ => None,
        }
    }

    /// Whether both signals have been received
    pub fn is_ready(&self) -> bool {
        self.announced
    }

    /// Known intrinsic size, if any
    pub fn size(&self) -> Option<SurfaceSize> {
        self.size
    }
}
