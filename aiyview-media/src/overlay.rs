//! Detection overlay renderer
//!
//! Turns each [`DetectionResult`] into canvas calls and clears the canvas
//! when detections stop arriving. Time is passed in explicitly so the
//! staleness sweep can be driven by any clock.

use crate::canvas::{Canvas, Color};
use crate::error::{MediaError, MediaResult};
use crate::surface::SurfaceSize;
use aiyview_core::{BoundingBox, DetectionItem, DetectionResult, DetectionSink};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Style applied when the surface is initialized
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    /// Box outline width
    pub line_width: f64,
    /// Colour for object boxes and all text without a colour of its own
    pub color: Color,
    /// Label font
    pub font: String,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            line_width: 8.0,
            color: Color::CYAN,
            font: "20px Verdana".to_string(),
        }
    }
}

/// Renderer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Drawing style
    pub style: OverlayStyle,
    /// Clear the overlay when nothing was rendered for longer than this
    pub staleness_threshold: Duration,
    /// How often the staleness sweep should run
    pub sweep_interval: Duration,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            style: OverlayStyle::default(),
            staleness_threshold: Duration::from_millis(1000),
            sweep_interval: Duration::from_millis(500),
        }
    }
}

/// Outcome of one [`OverlayRenderer::render`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    /// Items drawn
    pub drawn: usize,
    /// Items skipped as unknown or malformed
    pub skipped: usize,
}

/// Renderer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayStats {
    /// Detection results rendered
    pub renders: u64,
    /// Items drawn across all renders
    pub items_drawn: u64,
    /// Items skipped across all renders
    pub items_skipped: u64,
    /// Clears caused by the staleness sweep
    pub stale_clears: u64,
    /// Results dropped because the surface was not ready
    pub dropped: u64,
}

/// Canvas coordinates of a box: top-left corner plus the second pair passed
/// to `stroke_rect`.
///
/// The second pair is `width * W - x` and `height * H - y`, subtracting the
/// normalized origin from a pixel extent. Existing overlays are drawn this
/// way, so it is kept as is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxGeometry {
    /// Left edge in pixels
    pub x: f64,
    /// Top edge in pixels
    pub y: f64,
    /// Width argument to `stroke_rect`
    pub width: f64,
    /// Height argument to `stroke_rect`
    pub height: f64,
}

impl BoxGeometry {
    /// Project a normalized box onto a `surface_width` x `surface_height` canvas
    pub fn project(bbox: &BoundingBox, surface_width: f64, surface_height: f64) -> Self {
        Self {
            x: bbox.x * surface_width,
            y: bbox.y * surface_height,
            width: bbox.width * surface_width - bbox.x,
            height: bbox.height * surface_height - bbox.y,
        }
    }
}

/// Face box colour: red grows with joy, blue with its absence
pub fn joy_color(joy: f64) -> Color {
    let joy = joy.clamp(0.0, 1.0);
    Color::rgb(
        (joy * 255.0).round() as u8,
        70,
        ((1.0 - joy) * 255.0).round() as u8,
    )
}

fn percent(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Label for a face box
pub fn face_label(score: f64, joy: f64) -> String {
    format!("Face: {}% Joy: {}%", percent(score), percent(joy))
}

/// Label for an object box or a class line
pub fn class_label(class_name: &str, score: f64) -> String {
    format!("{} - {}%", class_name, percent(score))
}

/// Draws detection results on a canvas aligned with the video
pub struct OverlayRenderer<C> {
    canvas: C,
    config: OverlayConfig,
    size: Option<SurfaceSize>,
    last_sighting: Option<Instant>,
    stats: OverlayStats,
}

impl<C: Canvas> OverlayRenderer<C> {
    /// Create a renderer; nothing is drawn until the surface is initialized
    pub fn new(canvas: C, config: OverlayConfig) -> Self {
        Self {
            canvas,
            config,
            size: None,
            last_sighting: None,
            stats: OverlayStats::default(),
        }
    }

    /// Size the canvas to the video and apply the default style.
    ///
    /// Calling it again, e.g. after the video was resized, resizes the
    /// canvas and reapplies the style.
    pub fn initialize_surface(&mut self, video_width: u32, video_height: u32) -> MediaResult<()> {
        let size = SurfaceSize::new(video_width, video_height)?;

        self.canvas.resize(size.width, size.height);
        self.canvas.set_line_width(self.config.style.line_width);
        self.canvas.set_stroke_color(self.config.style.color);
        self.canvas.set_fill_color(self.config.style.color);
        self.canvas.set_font(&self.config.style.font);
        self.size = Some(size);

        info!("Overlay ready to draw on {}", size);
        self.present();
        Ok(())
    }

    fn present(&mut self) {
        if let Err(e) = self.canvas.flush() {
            warn!("Failed to present overlay frame: {}", e);
        }
    }

    /// Whether [`OverlayRenderer::initialize_surface`] has run
    pub fn is_initialized(&self) -> bool {
        self.size.is_some()
    }

    /// Surface size, once initialized
    pub fn size(&self) -> Option<SurfaceSize> {
        self.size
    }

    /// Replace the drawing with `result`, recording `now` as the last sighting.
    ///
    /// Unknown or malformed items are skipped; the rest of the batch is drawn.
    pub fn render(&mut self, result: &DetectionResult, now: Instant) -> MediaResult<RenderSummary> {
        let Some(size) = self.size else {
            self.stats.dropped += 1;
            warn!(
                "Dropping detection result with {} item(s): surface not ready",
                result.len()
            );
            return Err(MediaError::SurfaceNotReady {
                operation: "render".to_string(),
            });
        };

        self.last_sighting = Some(now);
        self.canvas.clear();

        let (width, height) = (f64::from(size.width), f64::from(size.height));
        let default_color = self.config.style.color;
        let mut summary = RenderSummary::default();

        for (index, item) in result.objects.iter().enumerate() {
            match item {
                DetectionItem::Face(face) => {
                    let label = face_label(face.score, face.joy);
                    self.draw_box(&face.bounding_box, width, height, &label, joy_color(face.joy));
                }
                DetectionItem::Object(object) => {
                    let label = class_label(&object.class_name, object.score);
                    self.draw_box(&object.bounding_box, width, height, &label, default_color);
                }
                DetectionItem::Class(class) => {
                    let label = class_label(&class.class_name, class.score);
                    self.canvas.set_fill_color(default_color);
                    self.canvas.fill_text(&label, 20.0, 20.0 * (index as f64 + 1.0));
                }
                DetectionItem::Unknown { .. } => {
                    warn!("Skipping detection item of unknown kind '{}'", item.kind());
                    summary.skipped += 1;
                    continue;
                }
                DetectionItem::Invalid { reason, .. } => {
                    warn!("Skipping malformed '{}' item: {}", item.kind(), reason);
                    summary.skipped += 1;
                    continue;
                }
            }
            summary.drawn += 1;
        }

        self.present();
        self.stats.renders += 1;
        self.stats.items_drawn += summary.drawn as u64;
        self.stats.items_skipped += summary.skipped as u64;
        debug!(
            "Rendered {} item(s), skipped {}",
            summary.drawn, summary.skipped
        );
        Ok(summary)
    }

    fn draw_box(&mut self, bbox: &BoundingBox, width: f64, height: f64, label: &str, color: Color) {
        let geometry = BoxGeometry::project(bbox, width, height);
        self.canvas.set_stroke_color(color);
        self.canvas.set_fill_color(color);
        self.canvas.fill_text(label, geometry.x + 5.0, geometry.y - 10.0);
        self.canvas
            .stroke_rect(geometry.x, geometry.y, geometry.width, geometry.height);
    }

    /// Clear the overlay if the last render is older than the staleness
    /// threshold. Returns whether it cleared.
    ///
    /// A clear consumes the last sighting, so one quiet period clears once.
    pub fn sweep(&mut self, now: Instant) -> bool {
        let Some(last) = self.last_sighting else {
            return false;
        };
        if now.saturating_duration_since(last) <= self.config.staleness_threshold {
            return false;
        }

        self.canvas.clear();
        self.last_sighting = None;
        self.present();
        self.stats.stale_clears += 1;
        debug!("No detections for {:?}, overlay cleared", now - last);
        true
    }

    /// Time of the last render not yet cleared by the sweep
    pub fn last_sighting(&self) -> Option<Instant> {
        self.last_sighting
    }

    /// Interval at which [`OverlayRenderer::sweep`] should be called
    pub fn sweep_interval(&self) -> Duration {
        self.config.sweep_interval
    }

    /// Counters collected so far
    pub fn stats(&self) -> OverlayStats {
        self.stats
    }

    /// The canvas being drawn on
    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    /// Mutable access to the canvas
    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }
}

impl<C: Canvas> DetectionSink for OverlayRenderer<C> {
    fn on_detection(&mut self, result: DetectionResult) {
        // Errors are already logged by render
        let _ = self.render(&result, Instant::now());
    }
}
