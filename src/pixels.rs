use crate::geometry::{Point, Rect, Size};
use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    fn lerp(self, other: Rgba, t: f32) -> Rgba {
        let mix = |a: u8, b: u8| -> u8 {
            (a as f32 + (b as f32 - a as f32) * t)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Rgba {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }
}

/// Owned straight-alpha RGBA image. Every skin slice, cached tab image and
/// overlay surface is one of these, which keeps the alpha-aware hit testing
/// independent of any GUI toolkit bitmap type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgba::TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, fill: Rgba) -> Self {
        let mut pixels = vec![0u8; (width as usize) * (height as usize) * 4];
        for chunk in pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[fill.r, fill.g, fill.b, fill.a]);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        assert_eq!(pixels.len(), (width as usize) * (height as usize) * 4);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Decodes a PNG (or any format enabled on the `image` crate) into RGBA.
    pub fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        let decoded = image::load_from_memory(bytes)
            .context("failed to decode skin image")?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        Ok(Self::from_pixels(width, height, decoded.into_raw()))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as i32, self.height as i32)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + x as usize) * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        let idx = self.index(x, y);
        Rgba {
            r: self.pixels[idx],
            g: self.pixels[idx + 1],
            b: self.pixels[idx + 2],
            a: self.pixels[idx + 3],
        }
    }

    /// Alpha at a signed coordinate; anything outside the image is transparent.
    pub fn alpha_at(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.pixels[self.index(x as u32, y as u32) + 3]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.index(x, y);
        self.pixels[idx..idx + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
    }

    fn blend_at(&mut self, x: i32, y: i32, top: Rgba, opacity: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = self.index(x as u32, y as u32);
        let bottom = Rgba {
            r: self.pixels[idx],
            g: self.pixels[idx + 1],
            b: self.pixels[idx + 2],
            a: self.pixels[idx + 3],
        };
        let scaled = Rgba {
            a: ((top.a as f32) * opacity).round().clamp(0.0, 255.0) as u8,
            ..top
        };
        let out = blend_pixel(bottom, scaled);
        self.pixels[idx..idx + 4].copy_from_slice(&[out.r, out.g, out.b, out.a]);
    }

    /// Overwrites every pixel inside `rect`.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        let Some(clip) = rect.intersection(self.bounds()) else {
            return;
        };
        for y in clip.top()..clip.bottom() {
            for x in clip.left()..clip.right() {
                self.set_pixel(x as u32, y as u32, color);
            }
        }
    }

    /// Makes `rect` fully transparent so whatever lies beneath the layered
    /// window shows through.
    pub fn clear_rect(&mut self, rect: Rect) {
        self.fill_rect(rect, Rgba::TRANSPARENT);
    }

    pub fn fill_vertical_gradient(&mut self, rect: Rect, top: Rgba, bottom: Rgba) {
        let Some(clip) = rect.intersection(self.bounds()) else {
            return;
        };
        let span = (rect.height - 1).max(1) as f32;
        for y in clip.top()..clip.bottom() {
            let color = top.lerp(bottom, (y - rect.top()) as f32 / span);
            for x in clip.left()..clip.right() {
                self.set_pixel(x as u32, y as u32, color);
            }
        }
    }

    /// Source-over blends `rect` with a solid colour.
    pub fn blend_rect(&mut self, rect: Rect, color: Rgba) {
        let Some(clip) = rect.intersection(self.bounds()) else {
            return;
        };
        for y in clip.top()..clip.bottom() {
            for x in clip.left()..clip.right() {
                self.blend_at(x, y, color, 1.0);
            }
        }
    }

    /// Source-over blends `src` with its top-left corner at `at`, clipped to
    /// this buffer.
    pub fn draw(&mut self, src: &PixelBuffer, at: Point) {
        self.draw_with_opacity(src, at, 1.0);
    }

    pub fn draw_with_opacity(&mut self, src: &PixelBuffer, at: Point, opacity: f32) {
        for sy in 0..src.height {
            let dy = at.y + sy as i32;
            if dy < 0 || dy >= self.height as i32 {
                continue;
            }
            for sx in 0..src.width {
                let dx = at.x + sx as i32;
                if dx < 0 || dx >= self.width as i32 {
                    continue;
                }
                let color = src.pixel(sx, sy);
                if color.a == 0 {
                    continue;
                }
                self.blend_at(dx, dy, color, opacity);
            }
        }
    }

    /// Draws `src` scaled with nearest-neighbour sampling to fill `dest`.
    /// Used to stretch the one-pixel-wide center slice of a tab skin.
    pub fn draw_stretched(&mut self, src: &PixelBuffer, dest: Rect) {
        if dest.is_empty() || src.is_empty() {
            return;
        }
        for dy in 0..dest.height {
            let sy = ((dy as i64 * src.height as i64) / dest.height as i64) as u32;
            for dx in 0..dest.width {
                let sx = ((dx as i64 * src.width as i64) / dest.width as i64) as u32;
                let color = src.pixel(sx, sy);
                if color.a == 0 {
                    continue;
                }
                self.blend_at(dest.x + dx, dest.y + dy, color, 1.0);
            }
        }
    }

    /// Writes the image as premultiplied BGRA, the layout a 32-bpp DIB section
    /// expects for per-pixel-alpha layered windows.
    pub fn write_premultiplied_bgra(&self, out: &mut [u8]) {
        assert_eq!(out.len(), self.pixels.len());
        for (dst, src) in out.chunks_exact_mut(4).zip(self.pixels.chunks_exact(4)) {
            let a = src[3] as u32;
            if a == 0 {
                dst.copy_from_slice(&[0, 0, 0, 0]);
                continue;
            }
            let premultiply = |c: u8| -> u8 { ((c as u32 * a + 127) / 255) as u8 };
            dst[0] = premultiply(src[2]);
            dst[1] = premultiply(src[1]);
            dst[2] = premultiply(src[0]);
            dst[3] = src[3];
        }
    }
}

fn blend_pixel(bottom: Rgba, top: Rgba) -> Rgba {
    let sa = top.a as f32 / 255.0;
    let da = bottom.a as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    if out_a <= f32::EPSILON {
        return Rgba::TRANSPARENT;
    }

    let blend = |s: u8, d: u8| -> u8 {
        (((s as f32 * sa) + (d as f32 * da * (1.0 - sa))) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };

    Rgba {
        r: blend(top.r, bottom.r),
        g: blend(top.g, bottom.g),
        b: blend(top.b, bottom.b),
        a: (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    }
}
