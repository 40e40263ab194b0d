// src/deliver.rs

//! Hands a finished image to its consumer: a file on disk, an HTML page with
//! the image inlined, or the terminal.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use tracing::info;

use crate::render::RenderedImage;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot decode image for display: {0}")]
    Image(#[from] image::ImageError),
    #[error("terminal display failed: {0}")]
    Terminal(#[from] viuer::ViuError),
}

/// Writes the encoded bytes to `path`.
pub fn write_image<P: AsRef<Path>>(image: &RenderedImage, path: P) -> Result<(), DeliveryError> {
    let mut w = BufWriter::new(File::create(path.as_ref())?);
    w.write_all(&image.bytes)?;
    w.flush()?;
    info!(
        "[deliver] wrote {}x{} {} to {}",
        image.width,
        image.height,
        image.content_type(),
        path.as_ref().display()
    );
    Ok(())
}

/// Returns the image as a `data:` URI.
pub fn data_uri(image: &RenderedImage) -> String {
    format!("data:{};base64,{}", image.content_type(), STANDARD.encode(&image.bytes))
}

/// Builds a standalone HTML page showing the image under `title`.
pub fn html_page(image: &RenderedImage, title: &str) -> String {
    let title = escape_html(title);
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n\
         <body>\n<h1>{title}</h1>\n\
         <img src=\"{src}\" width=\"{w}\" height=\"{h}\" alt=\"{title}\">\n\
         </body>\n\
         </html>\n",
        title = title,
        src = data_uri(image),
        w = image.width,
        h = image.height,
    )
}

pub fn write_html_page<P: AsRef<Path>>(
    image: &RenderedImage,
    title: &str,
    path: P,
) -> Result<(), DeliveryError> {
    let mut w = BufWriter::new(File::create(path.as_ref())?);
    w.write_all(html_page(image, title).as_bytes())?;
    w.flush()?;
    info!("[deliver] wrote HTML page to {}", path.as_ref().display());
    Ok(())
}

/// Prints the image in the terminal, scaled to at most `max_width` cells.
pub fn show_in_terminal(image: &RenderedImage, max_width: u32) -> Result<(), DeliveryError> {
    let decoded = image::load_from_memory_with_format(&image.bytes, image.format.image_format())?;
    let config = viuer::Config {
        width: Some(max_width),
        absolute_offset: false,
        ..Default::default()
    };
    viuer::print(&decoded, &config)?;
    Ok(())
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
