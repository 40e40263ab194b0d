// src/render.rs

//! Turns a graph and its layout into an encoded image.
//!
//! Rendering happens in two passes. [`plan`] maps layout coordinates onto
//! the canvas and produces a [`Scene`], an ordered list of draw operations:
//! title, edges, nodes, node labels, edge labels. [`rasterize`] paints that
//! scene onto a fresh canvas, and [`draw`] runs both and encodes the result.

use std::collections::HashMap;
use std::io::Cursor;

use image::{Rgb, RgbImage};
use thiserror::Error;
use tracing::debug;

use crate::graph::{EdgeIndex, GraphModel, NodeId};
use crate::layout::{Layout, Position};
use crate::raster::{text_size, Canvas};
use crate::style::{parse_color, OutputFormat, RenderStyle};

/// Font sizes in a style are points; the canvas is rendered at 100 dpi.
const PIXELS_PER_POINT: f32 = 100.0 / 72.0;

/// Padding around edge-label boxes and below the title, in pixels.
const LABEL_PADDING: i32 = 3;
const TITLE_PADDING: i32 = 12;

/// Self-loop rings are this fraction of the node radius.
const SELF_LOOP_RATIO: f32 = 0.6;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no position for node '{node}'")]
    MissingPosition { node: NodeId },
    #[error("invalid style: {0}")]
    InvalidStyle(String),
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

pub type Pixel = (i32, i32);

/// One drawing step. Coordinates are canvas pixels, origin top-left.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Title {
        text: String,
        origin: Pixel,
        size: u32,
        color: Rgb<u8>,
    },
    EdgeSegment {
        edge: EdgeIndex,
        from: Pixel,
        to: Pixel,
        width: u32,
        color: Rgb<u8>,
    },
    SelfLoop {
        edge: EdgeIndex,
        center: Pixel,
        radius: u32,
        width: u32,
        color: Rgb<u8>,
    },
    NodeShape {
        node: NodeId,
        center: Pixel,
        radius: u32,
        fill: Rgb<u8>,
        border: Rgb<u8>,
        border_width: u32,
    },
    NodeLabel {
        node: NodeId,
        text: String,
        origin: Pixel,
        size: u32,
        color: Rgb<u8>,
        bold: bool,
    },
    EdgeLabel {
        edge: EdgeIndex,
        text: String,
        origin: Pixel,
        size: u32,
        color: Rgb<u8>,
        background: Option<Rgb<u8>>,
    },
}

/// Everything needed to paint one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    pub background: Rgb<u8>,
    pub format: OutputFormat,
    pub ops: Vec<DrawOp>,
}

impl Scene {
    pub fn node_shapes(&self) -> usize {
        self.count(|op| matches!(op, DrawOp::NodeShape { .. }))
    }

    /// Straight segments plus self-loop rings.
    pub fn edge_segments(&self) -> usize {
        self.count(|op| matches!(op, DrawOp::EdgeSegment { .. } | DrawOp::SelfLoop { .. }))
    }

    pub fn node_labels(&self) -> usize {
        self.count(|op| matches!(op, DrawOp::NodeLabel { .. }))
    }

    pub fn edge_labels(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::EdgeLabel { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&DrawOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }
}

/// An encoded image ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl RenderedImage {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Text drawn next to each edge: its id and its length as written in the
/// source row.
pub fn edge_label(id: &str, length: &str) -> String {
    format!("id={}, len={}", id, length)
}

struct Palette {
    background: Rgb<u8>,
    node: Rgb<u8>,
    node_border: Rgb<u8>,
    edge: Rgb<u8>,
    node_font: Rgb<u8>,
    edge_font: Rgb<u8>,
    edge_label_background: Option<Rgb<u8>>,
    title: Rgb<u8>,
}

impl Palette {
    fn resolve(style: &RenderStyle) -> Result<Self, RenderError> {
        let color = |field: &str, value: &str| {
            parse_color(value).ok_or_else(|| {
                RenderError::InvalidStyle(format!("{} '{}' is not a known color", field, value))
            })
        };
        Ok(Palette {
            background: color("background", &style.background)?,
            node: color("node_color", &style.node_color)?,
            node_border: color("node_border_color", &style.node_border_color)?,
            edge: color("edge_color", &style.edge_color)?,
            node_font: color("node_font_color", &style.node_font_color)?,
            edge_font: color("edge_font_color", &style.edge_font_color)?,
            edge_label_background: style
                .edge_label_background
                .as_deref()
                .map(|c| color("edge_label_background", c))
                .transpose()?,
            title: color("title_color", &style.title_color)?,
        })
    }
}

fn points_to_pixels(points: u32) -> u32 {
    ((points as f32 * PIXELS_PER_POINT).round() as u32).max(1)
}

/// Rejects an empty canvas and any stroke, radius or glyph larger than the
/// canvas itself.
fn check_geometry(style: &RenderStyle) -> Result<(), RenderError> {
    if style.width == 0 || style.height == 0 {
        return Err(RenderError::InvalidStyle(format!(
            "canvas must be non-empty, got {}x{}",
            style.width, style.height
        )));
    }
    let limit = style.width.max(style.height);
    let sizes = [
        ("node_radius", style.node_radius),
        ("node_border_width", style.node_border_width),
        ("edge_width", style.edge_width),
        ("node_font_size", points_to_pixels(style.node_font_size)),
        ("edge_font_size", points_to_pixels(style.edge_font_size)),
        ("title_font_size", points_to_pixels(style.title_font_size)),
    ];
    for (field, pixels) in sizes {
        if pixels > limit {
            return Err(RenderError::InvalidStyle(format!(
                "{} of {} px does not fit a {}x{} canvas",
                field, pixels, style.width, style.height
            )));
        }
    }
    Ok(())
}

/// Affine map from layout space to canvas pixels. Preserves aspect ratio
/// and flips y so that larger layout y values sit higher on the canvas.
struct Viewport {
    mid: Position,
    scale: f64,
    center: (f64, f64),
}

impl Viewport {
    fn fit(points: &[Position], left: f64, top: f64, right: f64, bottom: f64) -> Self {
        let mut lo = points[0];
        let mut hi = points[0];
        for p in points {
            lo = Position::new(lo.x.min(p.x), lo.y.min(p.y));
            hi = Position::new(hi.x.max(p.x), hi.y.max(p.y));
        }
        let (avail_w, avail_h) = ((right - left).max(1.0), (bottom - top).max(1.0));
        let (range_x, range_y) = (hi.x - lo.x, hi.y - lo.y);
        let sx = if range_x > 0.0 { avail_w / range_x } else { f64::INFINITY };
        let sy = if range_y > 0.0 { avail_h / range_y } else { f64::INFINITY };
        let scale = sx.min(sy);
        Viewport {
            mid: Position::new((lo.x + hi.x) / 2.0, (lo.y + hi.y) / 2.0),
            scale: if scale.is_finite() { scale } else { 0.0 },
            center: ((left + right) / 2.0, (top + bottom) / 2.0),
        }
    }

    fn project(&self, p: Position) -> Pixel {
        let x = self.center.0 + (p.x - self.mid.x) * self.scale;
        let y = self.center.1 - (p.y - self.mid.y) * self.scale;
        (x.round() as i32, y.round() as i32)
    }
}

/// Plans the drawing of `graph` at `layout` positions without touching any
/// pixels.
pub fn plan(graph: &GraphModel, layout: &Layout, style: &RenderStyle) -> Result<Scene, RenderError> {
    check_geometry(style)?;
    let palette = Palette::resolve(style)?;

    let mut points = Vec::with_capacity(graph.node_count());
    for node in graph.nodes() {
        let pos = layout
            .get(node)
            .ok_or_else(|| RenderError::MissingPosition { node: node.clone() })?;
        points.push(pos);
    }

    let mut ops = Vec::with_capacity(1 + 2 * graph.edge_count() + 2 * graph.node_count());

    let title_px = points_to_pixels(style.title_font_size);
    let mut top = style.margin as f64;
    if !style.title.is_empty() {
        let (w, _) = text_size(&style.title, title_px, false);
        ops.push(DrawOp::Title {
            text: style.title.clone(),
            origin: ((style.width as i32 - w as i32) / 2, TITLE_PADDING),
            size: title_px,
            color: palette.title,
        });
        top = top.max((title_px as i32 + 2 * TITLE_PADDING) as f64 + style.node_radius as f64);
    }

    if points.is_empty() {
        return Ok(Scene {
            width: style.width,
            height: style.height,
            background: palette.background,
            format: style.format,
            ops,
        });
    }

    let viewport = Viewport::fit(
        &points,
        style.margin as f64,
        top,
        style.width as f64 - style.margin as f64,
        style.height as f64 - style.margin as f64,
    );
    let centers: Vec<Pixel> = points.iter().map(|p| viewport.project(*p)).collect();
    let center_of = |node: &NodeId| -> Result<Pixel, RenderError> {
        graph
            .node_index(node)
            .map(|i| centers[i])
            .ok_or_else(|| RenderError::MissingPosition { node: node.clone() })
    };

    let loop_radius = ((style.node_radius as f32 * SELF_LOOP_RATIO).round() as u32).max(1);

    // Edges.
    let mut anchors = Vec::with_capacity(graph.edge_count());
    for (e, edge) in graph.edges().iter().enumerate() {
        let a = center_of(&edge.a)?;
        let b = center_of(&edge.b)?;
        if edge.is_self_loop() {
            let center = (a.0, a.1 - style.node_radius as i32);
            ops.push(DrawOp::SelfLoop {
                edge: e,
                center,
                radius: loop_radius,
                width: style.edge_width,
                color: palette.edge,
            });
            anchors.push((center.0, center.1 - loop_radius as i32));
        } else {
            ops.push(DrawOp::EdgeSegment {
                edge: e,
                from: a,
                to: b,
                width: style.edge_width,
                color: palette.edge,
            });
            anchors.push(((a.0 + b.0) / 2, (a.1 + b.1) / 2));
        }
    }

    // Nodes, then their labels on top.
    for (node, &center) in graph.nodes().iter().zip(&centers) {
        ops.push(DrawOp::NodeShape {
            node: node.clone(),
            center,
            radius: style.node_radius,
            fill: palette.node,
            border: palette.node_border,
            border_width: style.node_border_width,
        });
    }
    let node_px = points_to_pixels(style.node_font_size);
    for (node, &center) in graph.nodes().iter().zip(&centers) {
        let text = node.to_string();
        let (w, h) = text_size(&text, node_px, style.node_label_bold);
        ops.push(DrawOp::NodeLabel {
            node: node.clone(),
            origin: (center.0 - w as i32 / 2, center.1 - h as i32 / 2),
            text,
            size: node_px,
            color: palette.node_font,
            bold: style.node_label_bold,
        });
    }

    // Edge labels. Parallel edges share a midpoint, so later ones are
    // stacked below the first.
    let edge_px = points_to_pixels(style.edge_font_size);
    let mut seen: HashMap<(NodeId, NodeId), i32> = HashMap::new();
    for (e, (edge, &anchor)) in graph.edges().iter().zip(&anchors).enumerate() {
        let key = if edge.a <= edge.b {
            (edge.a.clone(), edge.b.clone())
        } else {
            (edge.b.clone(), edge.a.clone())
        };
        let slot = seen.entry(key).or_insert(0);
        let text = edge_label(&edge.id, &edge.length_text);
        let (w, h) = text_size(&text, edge_px, false);
        let row_height = h as i32 + 2 * LABEL_PADDING + 2;
        ops.push(DrawOp::EdgeLabel {
            edge: e,
            origin: (
                anchor.0 - w as i32 / 2,
                anchor.1 - h as i32 / 2 + *slot * row_height,
            ),
            text,
            size: edge_px,
            color: palette.edge_font,
            background: palette.edge_label_background,
        });
        *slot += 1;
    }

    debug!(
        "[render] planned {} draw operations for {} nodes, {} edges",
        ops.len(),
        graph.node_count(),
        graph.edge_count()
    );

    Ok(Scene {
        width: style.width,
        height: style.height,
        background: palette.background,
        format: style.format,
        ops,
    })
}

/// Paints `scene` onto a new canvas.
pub fn rasterize(scene: &Scene) -> RgbImage {
    let mut canvas = Canvas::new(scene.width, scene.height, scene.background);
    for op in &scene.ops {
        match op {
            DrawOp::Title {
                text,
                origin,
                size,
                color,
            } => canvas.draw_text(origin.0, origin.1, text, *size, *color, false),
            DrawOp::EdgeSegment {
                from,
                to,
                width,
                color,
                ..
            } => canvas.draw_line(from.0, from.1, to.0, to.1, *width, *color),
            DrawOp::SelfLoop {
                center,
                radius,
                width,
                color,
                ..
            } => canvas.draw_ring(center.0, center.1, *radius, *width, *color),
            DrawOp::NodeShape {
                center,
                radius,
                fill,
                border,
                border_width,
                ..
            } => {
                canvas.fill_circle(center.0, center.1, *radius, *border);
                let inner = radius.saturating_sub(*border_width);
                canvas.fill_circle(center.0, center.1, inner, *fill);
            }
            DrawOp::NodeLabel {
                text,
                origin,
                size,
                color,
                bold,
                ..
            } => canvas.draw_text(origin.0, origin.1, text, *size, *color, *bold),
            DrawOp::EdgeLabel {
                text,
                origin,
                size,
                color,
                background,
                ..
            } => {
                if let Some(bg) = background {
                    let (w, h) = text_size(text, *size, false);
                    canvas.fill_rect(
                        origin.0 - LABEL_PADDING,
                        origin.1 - LABEL_PADDING,
                        w + 2 * LABEL_PADDING as u32,
                        h + 2 * LABEL_PADDING as u32,
                        *bg,
                    );
                }
                canvas.draw_text(origin.0, origin.1, text, *size, *color, false);
            }
        }
    }
    canvas.into_image()
}

/// Encodes a painted canvas in `format`.
pub fn encode(image: &RgbImage, format: OutputFormat) -> Result<RenderedImage, RenderError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format.image_format())?;
    Ok(RenderedImage {
        bytes,
        format,
        width: image.width(),
        height: image.height(),
    })
}

/// Draws `graph` at `layout` positions and returns the encoded image.
pub fn draw(graph: &GraphModel, layout: &Layout, style: &RenderStyle) -> Result<RenderedImage, RenderError> {
    let scene = plan(graph, layout, style)?;
    let image = rasterize(&scene);
    let rendered = encode(&image, scene.format)?;
    debug!(
        "[render] encoded {}x{} {} ({} bytes)",
        rendered.width,
        rendered.height,
        rendered.content_type(),
        rendered.bytes.len()
    );
    Ok(rendered)
}
