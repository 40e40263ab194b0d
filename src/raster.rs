// src/raster.rs

//! Pixel-level drawing onto an RGB canvas: thick lines, filled circles,
//! rings, rectangles and 8×8 bitmap text scaled to a pixel height.
//! Everything clips silently at the canvas edge.

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgb, RgbImage};

/// Width of a text cell relative to its height.
const GLYPH_ASPECT: f32 = 0.75;

pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb<u8>) -> Self {
        Canvas {
            image: RgbImage::from_pixel(width, height, background),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    #[inline]
    fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && x < self.width() as i64 && y < self.height() as i64 {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Canvas-clipped inclusive pixel box `[x0, x1] × [y0, y1]` around
    /// (cx, cy) with half-width `r`, or `None` when it misses the canvas.
    fn clip_box(&self, cx: i64, cy: i64, r: i64) -> Option<(i64, i64, i64, i64)> {
        let x0 = (cx - r).max(0);
        let x1 = (cx + r).min(self.width() as i64 - 1);
        let y0 = (cy - r).max(0);
        let y1 = (cy + r).min(self.height() as i64 - 1);
        (x0 <= x1 && y0 <= y1).then_some((x0, x1, y0, y1))
    }

    /// Bresenham line, stamped with a `width`-pixel square at each step.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, width: u32, color: Rgb<u8>) {
        let w = width.max(1) as i64;
        let lo = -(w / 2);
        let hi = w - w / 2;
        let (cw, ch) = (self.width() as i64, self.height() as i64);

        let (x0, y0, x1, y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -((y1 - y0).abs());
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            for py in (y + lo).max(0)..(y + hi).min(ch) {
                for px in (x + lo).max(0)..(x + hi).min(cw) {
                    self.image.put_pixel(px as u32, py as u32, color);
                }
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Filled disc of `radius` around (cx, cy).
    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: u32, color: Rgb<u8>) {
        self.fill_annulus(cx as i64, cy as i64, radius as i64, -1, color);
    }

    /// Circle outline of `radius`, `width` pixels thick, centered on the
    /// radius.
    pub fn draw_ring(&mut self, cx: i32, cy: i32, radius: u32, width: u32, color: Rgb<u8>) {
        let w = width.max(1) as i64;
        let outer = radius as i64 + w / 2;
        let inner = (radius as i64 - (w - w / 2)).max(0);
        self.fill_annulus(cx as i64, cy as i64, outer, inner, color);
    }

    /// Pixels with `inner < distance <= outer` from (cx, cy). A negative
    /// `inner` fills the whole disc.
    fn fill_annulus(&mut self, cx: i64, cy: i64, outer: i64, inner: i64, color: Rgb<u8>) {
        // Keeps dx² + dy² inside i64.
        let outer = outer.min(i32::MAX as i64);
        let Some((x0, x1, y0, y1)) = self.clip_box(cx, cy, outer) else {
            return;
        };
        let oo = outer * outer;
        let ii = if inner < 0 { -1 } else { inner.min(outer) * inner.min(outer) };
        for y in y0..=y1 {
            let dy = y - cy;
            for x in x0..=x1 {
                let dx = x - cx;
                let d2 = dx * dx + dy * dy;
                if d2 <= oo && d2 > ii {
                    self.image.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgb<u8>) {
        let (x, y) = (x as i64, y as i64);
        let x_end = (x + width as i64).min(self.width() as i64);
        let y_end = (y + height as i64).min(self.height() as i64);
        for yy in y.max(0)..y_end {
            for xx in x.max(0)..x_end {
                self.image.put_pixel(xx as u32, yy as u32, color);
            }
        }
    }

    /// Draws `text` with its top-left corner at (x, y). Glyphs are
    /// `size` pixels tall; `bold` doubles every stroke one pixel to the right.
    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, size: u32, color: Rgb<u8>, bold: bool) {
        let size = size.max(1);
        let advance = glyph_advance(size);
        let (x, y) = (x as i64, y as i64);
        let rows = (-y).max(0)..(self.height() as i64 - y).min(size as i64);
        for (i, ch) in text.chars().enumerate() {
            let gx = x + i as i64 * advance as i64;
            if gx >= self.width() as i64 {
                break;
            }
            let Some(glyph) = glyph_for(ch) else {
                continue;
            };
            for py in rows.clone() {
                let row = glyph[(py as u64 * 8 / size as u64) as usize];
                for px in 0..advance.min(self.width()) {
                    let bit = (px as u64 * 8 / advance as u64) as u32;
                    if row & (1 << bit) != 0 {
                        self.put(gx + px as i64, y + py, color);
                        if bold {
                            self.put(gx + px as i64 + 1, y + py, color);
                        }
                    }
                }
            }
        }
    }
}

fn glyph_advance(size: u32) -> u32 {
    ((size as f32 * GLYPH_ASPECT).round() as u32).max(1)
}

fn glyph_for(ch: char) -> Option<[u8; 8]> {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
}

/// Pixel extent `(width, height)` of `text` drawn at `size`.
pub fn text_size(text: &str, size: u32, bold: bool) -> (u32, u32) {
    let size = size.max(1);
    let chars = text.chars().count() as u32;
    let extra = if bold && chars > 0 { 1 } else { 0 };
    (chars * glyph_advance(size) + extra, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn count(canvas: &Canvas, color: Rgb<u8>) -> usize {
        canvas.image.pixels().filter(|p| **p == color).count()
    }

    #[test]
    fn line_covers_both_endpoints() {
        let mut c = Canvas::new(20, 20, WHITE);
        c.draw_line(2, 3, 15, 11, 1, BLACK);
        assert_eq!(*c.image.get_pixel(2, 3), BLACK);
        assert_eq!(*c.image.get_pixel(15, 11), BLACK);
    }

    #[test]
    fn thick_line_is_wider_than_thin_line() {
        let mut thin = Canvas::new(30, 30, WHITE);
        thin.draw_line(5, 15, 25, 15, 1, BLACK);
        let mut thick = Canvas::new(30, 30, WHITE);
        thick.draw_line(5, 15, 25, 15, 3, BLACK);
        assert_eq!(count(&thin, BLACK), 21);
        assert_eq!(count(&thick, BLACK), 69);
    }

    #[test]
    fn shapes_clip_at_canvas_edge() {
        let mut c = Canvas::new(10, 10, WHITE);
        c.fill_circle(0, 0, 4, BLACK);
        c.draw_line(-5, -5, 20, 20, 2, BLACK);
        c.fill_rect(8, 8, 10, 10, BLACK);
        assert!(count(&c, BLACK) > 0);
    }

    #[test]
    fn ring_leaves_center_untouched() {
        let mut c = Canvas::new(40, 40, WHITE);
        c.draw_ring(20, 20, 10, 2, BLACK);
        assert_eq!(*c.image.get_pixel(20, 20), WHITE);
        assert_eq!(*c.image.get_pixel(30, 20), BLACK);
    }

    /// Oversized geometry is clipped to the canvas instead of overflowing.
    #[test]
    fn huge_shapes_clip_without_overflow() {
        let mut c = Canvas::new(16, 16, WHITE);
        c.fill_circle(8, 8, u32::MAX, BLACK);
        assert_eq!(count(&c, BLACK), 256);

        let mut r = Canvas::new(16, 16, WHITE);
        r.draw_ring(8, 8, 50_000, 4, BLACK);
        r.fill_rect(i32::MAX - 1, 0, u32::MAX, u32::MAX, BLACK);
        r.draw_text(0, 100, "A", u32::MAX, BLACK, true);
        assert_eq!(count(&r, BLACK), 0);

        r.draw_line(0, 0, 15, 15, u32::MAX, BLACK);
        assert_eq!(count(&r, BLACK), 256);
    }

    #[test]
    fn text_size_scales_with_font() {
        assert_eq!(text_size("abcd", 8, false), (24, 8));
        assert_eq!(text_size("abcd", 16, false), (48, 16));
        assert_eq!(text_size("", 16, true), (0, 16));
    }

    #[test]
    fn text_draws_pixels_inside_its_box() {
        let mut c = Canvas::new(64, 32, WHITE);
        c.draw_text(4, 4, "A1", 16, BLACK, false);
        let (w, h) = text_size("A1", 16, false);
        let inked = count(&c, BLACK);
        assert!(inked > 0);
        for (x, y, p) in c.image.enumerate_pixels() {
            if *p == BLACK {
                assert!(x >= 4 && x < 4 + w && y >= 4 && y < 4 + h);
            }
        }
    }
}
