// src/style.rs

//! Render style: every visual knob the renderer reads, passed explicitly to
//! each draw call. Defaults reproduce a large, readable figure with light
//! blue nodes and dark red edge annotations.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::Rgb;
use palette::Srgb;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Tga,
}

impl OutputFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Tga => "image/x-tga",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Tga => "tga",
        }
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Tga => image::ImageFormat::Tga,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Blank border kept clear of node centers, in pixels.
    pub margin: u32,
    pub background: String,
    pub node_radius: u32,
    pub node_color: String,
    pub node_border_color: String,
    pub node_border_width: u32,
    pub edge_color: String,
    pub edge_width: u32,
    pub node_font_size: u32,
    pub node_font_color: String,
    pub node_label_bold: bool,
    pub edge_font_size: u32,
    pub edge_font_color: String,
    /// Box drawn behind each edge label; `None` draws the text bare.
    pub edge_label_background: Option<String>,
    /// Empty means no title.
    pub title: String,
    pub title_font_size: u32,
    pub title_color: String,
    pub format: OutputFormat,
}

impl Default for RenderStyle {
    fn default() -> Self {
        RenderStyle {
            width: 1400,
            height: 1200,
            margin: 80,
            background: "white".to_string(),
            node_radius: 40,
            node_color: "lightblue".to_string(),
            node_border_color: "black".to_string(),
            node_border_width: 2,
            edge_color: "black".to_string(),
            edge_width: 2,
            node_font_size: 14,
            node_font_color: "black".to_string(),
            node_label_bold: true,
            edge_font_size: 12,
            edge_font_color: "darkred".to_string(),
            edge_label_background: Some("white".to_string()),
            title: "Custom Styled Network Graph".to_string(),
            title_font_size: 18,
            title_color: "black".to_string(),
            format: OutputFormat::Png,
        }
    }
}

#[derive(Debug, Error)]
pub enum StyleError {
    #[error("cannot read style file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse style file: {0}")]
    Json(#[from] serde_json::Error),
}

impl RenderStyle {
    /// Reads a JSON style file. Keys left out keep their default values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StyleError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_json(&self) -> Result<String, StyleError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parses an SVG/CSS color keyword (`"lightblue"`) or a hex triplet
/// (`"#add8e6"`, `"add8e6"`).
pub fn parse_color(value: &str) -> Option<Rgb<u8>> {
    let value = value.trim();
    let named = value.to_ascii_lowercase();
    let color: Srgb<u8> = match palette::named::from_str(&named) {
        Some(c) => c,
        None => value.parse::<Srgb<u8>>().ok()?,
    };
    Some(Rgb([color.red, color.green, color.blue]))
}
