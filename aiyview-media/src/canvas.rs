//! Drawing surface abstraction
//!
//! [`Canvas`] mirrors the handful of 2D-context operations the overlay needs.
//! [`DisplayList`] is the in-memory implementation: it keeps the shapes
//! currently visible and can export them as SVG. A list built with
//! [`DisplayList::recording`] also logs every call made on it.

use crate::error::{MediaError, MediaResult};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

/// RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl Color {
    /// CSS `cyan`
    pub const CYAN: Color = Color::rgb(0, 255, 255);

    /// Create a colour from its components
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb` form
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Minimal 2D drawing context
pub trait Canvas {
    /// Set the surface size; this also clears it
    fn resize(&mut self, width: u32, height: u32);

    /// Surface width in pixels
    fn width(&self) -> u32;

    /// Surface height in pixels
    fn height(&self) -> u32;

    /// Clear the whole surface
    fn clear(&mut self);

    /// Stroke width for rectangles
    fn set_line_width(&mut self, width: f64);

    /// Colour used by [`Canvas::stroke_rect`]
    fn set_stroke_color(&mut self, color: Color);

    /// Colour used by [`Canvas::fill_text`]
    fn set_fill_color(&mut self, color: Color);

    /// Font in CSS shorthand, e.g. `20px Verdana`
    fn set_font(&mut self, font: &str);

    /// Outline a rectangle
    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    /// Draw a line of text with its baseline at `(x, y)`
    fn fill_text(&mut self, text: &str, x: f64, y: f64);

    /// Present the current frame. Canvases that draw directly do nothing.
    fn flush(&mut self) -> MediaResult<()> {
        Ok(())
    }
}

/// One recorded canvas call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    /// [`Canvas::resize`]
    Resize {
        /// New width
        width: u32,
        /// New height
        height: u32,
    },
    /// [`Canvas::clear`]
    Clear,
    /// [`Canvas::set_line_width`]
    SetLineWidth {
        /// Stroke width
        width: f64,
    },
    /// [`Canvas::set_stroke_color`]
    SetStrokeColor {
        /// Stroke colour
        color: Color,
    },
    /// [`Canvas::set_fill_color`]
    SetFillColor {
        /// Fill colour
        color: Color,
    },
    /// [`Canvas::set_font`]
    SetFont {
        /// Font shorthand
        font: String,
    },
    /// [`Canvas::stroke_rect`]
    StrokeRect {
        /// Left
        x: f64,
        /// Top
        y: f64,
        /// Width, may be negative
        width: f64,
        /// Height, may be negative
        height: f64,
    },
    /// [`Canvas::fill_text`]
    FillText {
        /// Text
        text: String,
        /// Baseline x
        x: f64,
        /// Baseline y
        y: f64,
    },
}

/// A shape currently visible on a [`DisplayList`], with the style it was drawn in
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    /// Outlined rectangle
    Rect {
        /// Left
        x: f64,
        /// Top
        y: f64,
        /// Width, may be negative
        width: f64,
        /// Height, may be negative
        height: f64,
        /// Stroke colour
        color: Color,
        /// Stroke width
        line_width: f64,
    },
    /// Text label
    Text {
        /// Text
        text: String,
        /// Baseline x
        x: f64,
        /// Baseline y
        y: f64,
        /// Fill colour
        color: Color,
        /// Font shorthand
        font: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct Style {
    line_width: f64,
    stroke: Color,
    fill: Color,
    font: String,
}

impl Default for Style {
    // 2D context defaults
    fn default() -> Self {
        Self {
            line_width: 1.0,
            stroke: Color::rgb(0, 0, 0),
            fill: Color::rgb(0, 0, 0),
            font: "10px sans-serif".to_string(),
        }
    }
}

/// Recording canvas
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    width: u32,
    height: u32,
    style: Style,
    shapes: Vec<Shape>,
    commands: Vec<DrawCommand>,
    record: bool,
    svg_output: Option<PathBuf>,
}

impl DisplayList {
    /// Create an empty 0x0 canvas
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a canvas that also logs every call, for inspecting draw order
    pub fn recording() -> Self {
        Self {
            record: true,
            ..Self::default()
        }
    }

    /// Create a canvas that rewrites `path` with the current frame on every flush
    pub fn with_svg_output(path: impl Into<PathBuf>) -> Self {
        Self {
            svg_output: Some(path.into()),
            ..Self::default()
        }
    }

    /// Shapes drawn since the last clear
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Every call made on this canvas, oldest first. Always empty unless
    /// built with [`DisplayList::recording`].
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Forget the recorded calls, keeping the visible shapes
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of clears recorded, counting resizes
    pub fn clear_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Clear | DrawCommand::Resize { .. }))
            .count()
    }

    fn log(&mut self, command: DrawCommand) {
        if self.record {
            self.commands.push(command);
        }
    }

    /// Render the visible shapes as an SVG document
    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        for shape in &self.shapes {
            match shape {
                Shape::Rect {
                    x,
                    y,
                    width,
                    height,
                    color,
                    line_width,
                } => {
                    // SVG has no negative extents; normalise like strokeRect does
                    let (x, width) = if *width < 0.0 { (x + width, -width) } else { (*x, *width) };
                    let (y, height) = if *height < 0.0 { (y + height, -height) } else { (*y, *height) };
                    let _ = writeln!(
                        svg,
                        r#"  <rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
                        x, y, width, height, color, line_width
                    );
                }
                Shape::Text {
                    text,
                    x,
                    y,
                    color,
                    font,
                } => {
                    let _ = writeln!(
                        svg,
                        r#"  <text x="{}" y="{}" fill="{}" style="font: {}">{}</text>"#,
                        x,
                        y,
                        color,
                        escape_xml(font),
                        escape_xml(text)
                    );
                }
            }
        }
        svg.push_str("</svg>\n");
        svg
    }

    /// Write the current frame to `path` as SVG
    pub fn write_svg(&self, path: impl AsRef<Path>) -> MediaResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_svg()).map_err(|e| MediaError::ExportFailed {
            reason: format!("{}: {}", path.display(), e),
        })
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

impl Canvas for DisplayList {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.shapes.clear();
        // Resizing a 2D context also resets its state
        self.style = Style::default();
        self.log(DrawCommand::Resize { width, height });
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self) {
        self.shapes.clear();
        self.log(DrawCommand::Clear);
    }

    fn set_line_width(&mut self, width: f64) {
        self.style.line_width = width;
        self.log(DrawCommand::SetLineWidth { width });
    }

    fn set_stroke_color(&mut self, color: Color) {
        self.style.stroke = color;
        self.log(DrawCommand::SetStrokeColor { color });
    }

    fn set_fill_color(&mut self, color: Color) {
        self.style.fill = color;
        self.log(DrawCommand::SetFillColor { color });
    }

    fn set_font(&mut self, font: &str) {
        self.style.font = font.to_string();
        self.log(DrawCommand::SetFont {
            font: font.to_string(),
        });
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.shapes.push(Shape::Rect {
            x,
            y,
            width,
            height,
            color: self.style.stroke,
            line_width: self.style.line_width,
        });
        self.log(DrawCommand::StrokeRect {
            x,
            y,
            width,
            height,
        });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        self.shapes.push(Shape::Text {
            text: text.to_string(),
            x,
            y,
            color: self.style.fill,
            font: self.style.font.clone(),
        });
        self.log(DrawCommand::FillText {
            text: text.to_string(),
            x,
            y,
        });
    }

    fn flush(&mut self) -> MediaResult<()> {
        match &self.svg_output {
            Some(path) => self.write_svg(path),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex_is_zero_padded() {
        assert_eq!(Color::rgb(0, 70, 255).to_hex(), "#0046ff");
        assert_eq!(Color::CYAN.to_string(), "#00ffff");
    }

    #[test]
    fn test_shapes_capture_style_at_draw_time() {
        let mut canvas = DisplayList::recording();
        canvas.resize(100, 50);
        canvas.set_stroke_color(Color::rgb(255, 0, 0));
        canvas.set_line_width(4.0);
        canvas.stroke_rect(1.0, 2.0, 3.0, 4.0);
        canvas.set_stroke_color(Color::CYAN);

        assert_eq!(
            canvas.shapes(),
            &[Shape::Rect {
                x: 1.0,
                y: 2.0,
                width: 3.0,
                height: 4.0,
                color: Color::rgb(255, 0, 0),
                line_width: 4.0,
            }]
        );

        canvas.clear();
        assert!(canvas.shapes().is_empty());
        assert_eq!(canvas.clear_count(), 2);
    }

    #[test]
    fn test_svg_export() {
        let mut canvas = DisplayList::new();
        canvas.resize(640, 480);
        canvas.set_fill_color(Color::CYAN);
        canvas.set_font("20px Verdana");
        canvas.fill_text("cat & dog <1>", 20.0, 20.0);
        canvas.stroke_rect(10.0, 10.0, -5.0, 5.0);

        let svg = canvas.to_svg();
        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="640" height="480""#));
        assert!(svg.contains("cat &amp; dog &lt;1&gt;"));
        assert!(svg.contains(r##"fill="#00ffff" style="font: 20px Verdana""##));
        assert!(svg.contains(r#"<rect x="5" y="10" width="5" height="5""#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_flush_writes_svg_file() {
        let path = std::env::temp_dir().join(format!("aiyview-flush-{}.svg", std::process::id()));
        let mut canvas = DisplayList::with_svg_output(&path);
        canvas.resize(10, 10);
        canvas.stroke_rect(1.0, 1.0, 2.0, 2.0);
        canvas.flush().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, canvas.to_svg());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_plain_canvas_keeps_no_call_log() {
        let mut canvas = DisplayList::new();
        canvas.resize(64, 64);
        for frame in 0..1000 {
            canvas.clear();
            canvas.set_stroke_color(Color::CYAN);
            canvas.stroke_rect(1.0, 1.0, 10.0, 10.0);
            canvas.fill_text(&format!("frame {}", frame), 2.0, 2.0);
        }

        assert!(canvas.commands().is_empty());
        assert_eq!(canvas.shapes().len(), 2);
    }

    #[test]
    fn test_flush_without_output_is_noop() {
        let mut canvas = DisplayList::new();
        assert!(canvas.flush().is_ok());
    }
}
