//! Drawing surfaces.
//!
//! Visualizers draw through the [`Surface`] trait with a p5-like immediate
//! mode API: set the fill and stroke, then issue shapes. Two implementations
//! ship here, one that records commands for inspection and one that builds an
//! SVG document.

use crate::color::Color;
use serde::Serialize;
use std::any::Any;
use std::fmt::Write;

/// Fill and stroke in effect when a shape is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Style {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_weight: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: Some(Color::WHITE),
            stroke: Some(Color::BLACK),
            stroke_weight: 1.0,
        }
    }
}

/// A full-canvas raster, row major.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelImage {
    pub width: usize,
    pub height: usize,
    pixels: Vec<Color>,
}

impl PixelImage {
    pub fn new(width: usize, height: usize, fill: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width * height],
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Color> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    pub fn set(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    pub fn row(&self, y: usize) -> &[Color] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }
}

pub trait Surface: Send {
    fn width(&self) -> f64;
    fn height(&self) -> f64;

    /// Clears everything drawn so far to `color`.
    fn background(&mut self, color: Color);
    fn fill(&mut self, color: Option<Color>);
    fn stroke(&mut self, color: Option<Color>);
    fn stroke_weight(&mut self, weight: f64);

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn ellipse(&mut self, cx: f64, cy: f64, w: f64, h: f64);
    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64);
    fn polygon(&mut self, points: &[(f64, f64)]);
    /// Text centered on `(x, y)`.
    fn text(&mut self, text: &str, x: f64, y: f64, size: f64);
    fn image(&mut self, image: &PixelImage);

    fn circle(&mut self, cx: f64, cy: f64, diameter: f64) {
        self.ellipse(cx, cy, diameter, diameter);
    }

    fn triangle(&mut self, a: (f64, f64), b: (f64, f64), c: (f64, f64)) {
        self.polygon(&[a, b, c]);
    }

    fn no_stroke(&mut self) {
        self.stroke(None);
    }

    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawCommand {
    Background {
        color: Color,
    },
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        style: Style,
    },
    Ellipse {
        cx: f64,
        cy: f64,
        w: f64,
        h: f64,
        style: Style,
    },
    Line {
        from: (f64, f64),
        to: (f64, f64),
        style: Style,
    },
    Polygon {
        points: Vec<(f64, f64)>,
        style: Style,
    },
    Text {
        text: String,
        x: f64,
        y: f64,
        size: f64,
        style: Style,
    },
    Image {
        width: usize,
        height: usize,
    },
}

/// Records every command; used by tests and for JSON dumps.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: f64,
    height: f64,
    style: Style,
    commands: Vec<DrawCommand>,
    image: Option<PixelImage>,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            style: Style::default(),
            commands: Vec::new(),
            image: None,
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Most recent raster drawn with [`Surface::image`].
    pub fn last_image(&self) -> Option<&PixelImage> {
        self.image.as_ref()
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn background(&mut self, color: Color) {
        self.commands.push(DrawCommand::Background { color });
    }

    fn fill(&mut self, color: Option<Color>) {
        self.style.fill = color;
    }

    fn stroke(&mut self, color: Option<Color>) {
        self.style.stroke = color;
    }

    fn stroke_weight(&mut self, weight: f64) {
        self.style.stroke_weight = weight;
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let style = self.style;
        self.commands.push(DrawCommand::Rect { x, y, w, h, style });
    }

    fn ellipse(&mut self, cx: f64, cy: f64, w: f64, h: f64) {
        let style = self.style;
        self.commands
            .push(DrawCommand::Ellipse { cx, cy, w, h, style });
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let style = self.style;
        self.commands.push(DrawCommand::Line {
            from: (x1, y1),
            to: (x2, y2),
            style,
        });
    }

    fn polygon(&mut self, points: &[(f64, f64)]) {
        let style = self.style;
        self.commands.push(DrawCommand::Polygon {
            points: points.to_vec(),
            style,
        });
    }

    fn text(&mut self, text: &str, x: f64, y: f64, size: f64) {
        let style = self.style;
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            x,
            y,
            size,
            style,
        });
    }

    fn image(&mut self, image: &PixelImage) {
        self.commands.push(DrawCommand::Image {
            width: image.width,
            height: image.height,
        });
        self.image = Some(image.clone());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Accumulates an SVG document.
#[derive(Debug, Clone)]
pub struct SvgSurface {
    width: f64,
    height: f64,
    style: Style,
    body: String,
}

impl SvgSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            style: Style::default(),
            body: String::new(),
        }
    }

    pub fn to_svg(&self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n{body}</svg>\n",
            w = self.width,
            h = self.height,
            body = self.body
        )
    }

    fn paint(&self) -> String {
        let fill = match self.style.fill {
            Some(c) => c.to_hex(),
            None => "none".to_string(),
        };
        match self.style.stroke {
            Some(c) => format!(
                "fill=\"{fill}\" stroke=\"{}\" stroke-width=\"{}\"",
                c.to_hex(),
                self.style.stroke_weight
            ),
            None => format!("fill=\"{fill}\""),
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// Writing to a String cannot fail, so the fmt::Results below are ignored.
impl Surface for SvgSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn background(&mut self, color: Color) {
        self.body.clear();
        let _ = writeln!(
            self.body,
            "<rect x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" fill=\"{}\"/>",
            self.width,
            self.height,
            color.to_hex()
        );
    }

    fn fill(&mut self, color: Option<Color>) {
        self.style.fill = color;
    }

    fn stroke(&mut self, color: Option<Color>) {
        self.style.stroke = color;
    }

    fn stroke_weight(&mut self, weight: f64) {
        self.style.stroke_weight = weight;
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let paint = self.paint();
        let _ = writeln!(
            self.body,
            "<rect x=\"{x}\" y=\"{y}\" width=\"{w}\" height=\"{h}\" {paint}/>"
        );
    }

    fn ellipse(&mut self, cx: f64, cy: f64, w: f64, h: f64) {
        let paint = self.paint();
        let _ = writeln!(
            self.body,
            "<ellipse cx=\"{cx}\" cy=\"{cy}\" rx=\"{}\" ry=\"{}\" {paint}/>",
            w / 2.0,
            h / 2.0
        );
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let stroke = self
            .style
            .stroke
            .map(|c| c.to_hex())
            .unwrap_or_else(|| "none".to_string());
        let _ = writeln!(
            self.body,
            "<line x1=\"{x1}\" y1=\"{y1}\" x2=\"{x2}\" y2=\"{y2}\" stroke=\"{stroke}\" stroke-width=\"{}\"/>",
            self.style.stroke_weight
        );
    }

    fn polygon(&mut self, points: &[(f64, f64)]) {
        let paint = self.paint();
        let points = points
            .iter()
            .map(|(x, y)| format!("{x},{y}"))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(self.body, "<polygon points=\"{points}\" {paint}/>");
    }

    fn text(&mut self, text: &str, x: f64, y: f64, size: f64) {
        let fill = self
            .style
            .fill
            .map(|c| c.to_hex())
            .unwrap_or_else(|| "none".to_string());
        let _ = writeln!(
            self.body,
            "<text x=\"{x}\" y=\"{y}\" font-size=\"{size}\" fill=\"{fill}\" text-anchor=\"middle\" dominant-baseline=\"central\">{}</text>",
            escape(text)
        );
    }

    fn image(&mut self, image: &PixelImage) {
        let sx = self.width / image.width.max(1) as f64;
        let sy = self.height / image.height.max(1) as f64;
        for y in 0..image.height {
            let row = image.row(y);
            let mut start = 0;
            while start < row.len() {
                let color = row[start];
                let mut end = start + 1;
                while end < row.len() && row[end] == color {
                    end += 1;
                }
                let _ = writeln!(
                    self.body,
                    "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{sy}\" fill=\"{}\"/>",
                    start as f64 * sx,
                    y as f64 * sy,
                    (end - start) as f64 * sx,
                    color.to_hex()
                );
                start = end;
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_captures_style() {
        let mut surface = RecordingSurface::new(10.0, 10.0);
        surface.fill(Some(Color::rgb(1, 2, 3)));
        surface.no_stroke();
        surface.circle(5.0, 5.0, 2.0);
        assert_eq!(
            surface.commands(),
            &[DrawCommand::Ellipse {
                cx: 5.0,
                cy: 5.0,
                w: 2.0,
                h: 2.0,
                style: Style {
                    fill: Some(Color::rgb(1, 2, 3)),
                    stroke: None,
                    stroke_weight: 1.0,
                },
            }]
        );
    }

    #[test]
    fn svg_document() {
        let mut surface = SvgSurface::new(20.0, 10.0);
        surface.background(Color::WHITE);
        surface.fill(Some(Color::rgb(255, 0, 0)));
        surface.no_stroke();
        surface.rect(1.0, 2.0, 3.0, 4.0);
        surface.text("a<b", 5.0, 5.0, 8.0);
        let svg = surface.to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("<rect x=\"1\" y=\"2\" width=\"3\" height=\"4\" fill=\"#ff0000\"/>"));
        assert!(svg.contains("a&lt;b"));
        surface.background(Color::BLACK);
        assert!(!surface.to_svg().contains("#ff0000"));
    }

    #[test]
    fn svg_image_runs() {
        let mut image = PixelImage::new(4, 1, Color::WHITE);
        image.set(2, 0, Color::BLACK);
        let mut surface = SvgSurface::new(4.0, 1.0);
        surface.image(&image);
        assert_eq!(surface.to_svg().matches("<rect").count(), 3);
    }
}
