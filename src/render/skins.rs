//! Built-in skins. Their bitmaps are generated at start-up so the crate works
//! without shipping art; [`SkinImages::overlay_dir`] swaps in real PNG slices.

use crate::pixels::{PixelBuffer, Rgba};
use crate::render::skin::{SkinImages, SkinMetrics, SkinProfile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinKind {
    #[default]
    Chrome,
    Classic,
}

impl SkinKind {
    pub fn build(self) -> Arc<dyn SkinProfile> {
        match self {
            SkinKind::Chrome => Arc::new(ChromeSkin::new()),
            SkinKind::Classic => Arc::new(ClassicSkin::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lean {
    /// `/` edge: transparent in the top-left corner.
    Left,
    /// `\` edge: transparent in the top-right corner.
    Right,
}

fn slanted_edge(width: u32, height: u32, color: Rgba, lean: Lean) -> PixelBuffer {
    let mut image = PixelBuffer::new(width, height);
    for y in 0..height {
        // Columns covered on this row grow linearly towards the bottom.
        let covered = ((y + 1) * width).div_ceil(height);
        for x in 0..width {
            let inside = match lean {
                Lean::Left => x >= width - covered,
                Lean::Right => x < covered,
            };
            if inside {
                image.set_pixel(x, y, color);
            }
        }
    }
    image
}

fn solid(width: u32, height: u32, color: Rgba) -> PixelBuffer {
    PixelBuffer::filled(width, height, color)
}

/// Cross made of two diagonal strokes, optionally on a filled disc.
fn cross_glyph(size: u32, stroke: Rgba, disc: Option<Rgba>) -> PixelBuffer {
    let mut image = PixelBuffer::new(size, size);
    let center = (size as f32 - 1.0) / 2.0;
    let radius = size as f32 / 2.0;
    let inset = size as f32 * 0.28;
    for y in 0..size {
        for x in 0..size {
            let (fx, fy) = (x as f32, y as f32);
            if let Some(disc) = disc {
                let dx = fx - center;
                let dy = fy - center;
                if dx * dx + dy * dy <= radius * radius {
                    image.set_pixel(x, y, disc);
                }
            }
            let within = fx >= inset
                && fy >= inset
                && fx <= size as f32 - 1.0 - inset
                && fy <= size as f32 - 1.0 - inset;
            let on_diagonal = (fx - fy).abs() <= 0.75
                || (fx + fy - (size as f32 - 1.0)).abs() <= 0.75;
            if within && on_diagonal {
                image.set_pixel(x, y, stroke);
            }
        }
    }
    image
}

/// Parallelogram with a plus sign, the "new tab" button.
fn add_glyph(width: u32, height: u32, fill: Rgba, stroke: Rgba) -> PixelBuffer {
    let mut image = PixelBuffer::new(width, height);
    let slant = height / 2;
    for y in 0..height {
        let shift = slant * (height - 1 - y) / height.max(1);
        for x in shift..(width - slant + shift).min(width) {
            image.set_pixel(x, y, fill);
        }
    }
    let cx = width / 2;
    let cy = height / 2;
    let arm = height / 4;
    for d in 0..=arm * 2 {
        image.set_pixel(cx - arm + d, cy, stroke);
        image.set_pixel(cx, cy - arm + d, stroke);
    }
    image
}

fn plus_tile(width: u32, height: u32, fill: Rgba, stroke: Rgba) -> PixelBuffer {
    let mut image = PixelBuffer::filled(width, height, fill);
    let cx = width / 2;
    let cy = height / 2;
    for d in 0..=10 {
        image.set_pixel(cx - 5 + d, cy, stroke);
        image.set_pixel(cx, cy - 5 + d, stroke);
    }
    image
}

fn caption_box(width: u32, height: u32, glyph: CaptionGlyph, stroke: Rgba) -> PixelBuffer {
    // Near-transparent fill keeps the whole box hit-testable.
    let mut image = PixelBuffer::filled(width, height, Rgba::rgba(0, 0, 0, 1));
    let cx = width / 2;
    let cy = height / 2;
    match glyph {
        CaptionGlyph::Minimize => {
            for x in cx - 5..=cx + 5 {
                image.set_pixel(x, cy, stroke);
            }
        }
        CaptionGlyph::Maximize => outline(&mut image, cx - 5, cy - 5, 10, stroke),
        CaptionGlyph::Restore => {
            outline(&mut image, cx - 3, cy - 5, 8, stroke);
            outline(&mut image, cx - 5, cy - 3, 8, stroke);
        }
        CaptionGlyph::Close => {
            let cross = cross_glyph(16, stroke, None);
            image.draw(&cross, crate::geometry::Point::new(cx as i32 - 8, cy as i32 - 8));
        }
    }
    image
}

#[derive(Debug, Clone, Copy)]
enum CaptionGlyph {
    Minimize,
    Maximize,
    Restore,
    Close,
}

fn outline(image: &mut PixelBuffer, x: u32, y: u32, size: u32, color: Rgba) {
    for d in 0..=size {
        image.set_pixel(x + d, y, color);
        image.set_pixel(x + d, y + size, color);
        image.set_pixel(x, y + d, color);
        image.set_pixel(x + size, y + d, color);
    }
}

/// Rounded, overlapping tabs that only occupy the strip below the native
/// caption buttons.
pub struct ChromeSkin {
    images: SkinImages,
    metrics: SkinMetrics,
}

impl ChromeSkin {
    const TAB_HEIGHT: u32 = 28;
    const EDGE_WIDTH: u32 = 14;

    pub fn new() -> Self {
        let active = Rgba::rgb(247, 248, 250);
        let inactive = Rgba::rgb(214, 220, 229);
        let h = Self::TAB_HEIGHT;
        let w = Self::EDGE_WIDTH;
        let images = SkinImages {
            active_left: Some(Arc::new(slanted_edge(w, h, active, Lean::Left))),
            active_center: Some(Arc::new(solid(1, h, active))),
            active_right: Some(Arc::new(slanted_edge(w, h, active, Lean::Right))),
            inactive_left: Some(Arc::new(slanted_edge(w, h, inactive, Lean::Left))),
            inactive_center: Some(Arc::new(solid(1, h, inactive))),
            inactive_right: Some(Arc::new(slanted_edge(w, h, inactive, Lean::Right))),
            close_button: Some(Arc::new(cross_glyph(
                14,
                Rgba::rgb(90, 90, 90),
                Some(Rgba::rgba(0, 0, 0, 1)),
            ))),
            close_button_hover: Some(Arc::new(cross_glyph(
                14,
                Rgba::WHITE,
                Some(Rgba::rgb(219, 68, 55)),
            ))),
            add_button: Some(Arc::new(add_glyph(
                28,
                18,
                Rgba::rgb(200, 208, 220),
                Rgba::rgb(90, 90, 90),
            ))),
            add_button_hover: Some(Arc::new(add_glyph(
                28,
                18,
                Rgba::rgb(232, 236, 242),
                Rgba::rgb(40, 40, 40),
            ))),
            ..SkinImages::default()
        };
        Self {
            images,
            metrics: SkinMetrics {
                caption_margin_left: 4,
                caption_margin_right: 4,
                caption_margin_top: 8,
                icon_margin_left: 2,
                icon_margin_right: 4,
                icon_margin_top: 6,
                close_button_margin_left: 4,
                close_button_margin_right: 0,
                close_button_margin_top: 7,
                add_button_margin_left: 2,
                add_button_margin_right: 8,
                add_button_margin_top: 5,
                overlap_width: 14,
                top_padding: 8,
                strip_left_padding: 4,
                min_content_width: 24,
                max_content_width: 200,
            },
        }
    }

    pub fn with_images(mut self, images: SkinImages) -> Self {
        self.images = images;
        self
    }
}

impl Default for ChromeSkin {
    fn default() -> Self {
        Self::new()
    }
}

impl SkinProfile for ChromeSkin {
    fn name(&self) -> &str {
        "chrome"
    }

    fn images(&self) -> &SkinImages {
        &self.images
    }

    fn metrics(&self) -> &SkinMetrics {
        &self.metrics
    }
}

/// Flat rectangular tabs that take over the whole title bar, including the
/// minimize, maximize and close boxes.
pub struct ClassicSkin {
    images: SkinImages,
    metrics: SkinMetrics,
}

impl ClassicSkin {
    const TAB_HEIGHT: u32 = 30;
    const BOX_WIDTH: u32 = 46;

    pub fn new() -> Self {
        let active = Rgba::rgb(255, 255, 255);
        let inactive = Rgba::rgb(43, 87, 154);
        let border = Rgba::rgb(30, 60, 110);
        let h = Self::TAB_HEIGHT;
        let glyph = Rgba::WHITE;
        let images = SkinImages {
            active_left: Some(Arc::new(solid(1, h, border))),
            active_center: Some(Arc::new(solid(1, h, active))),
            active_right: Some(Arc::new(solid(1, h, border))),
            inactive_left: Some(Arc::new(solid(1, h, border))),
            inactive_center: Some(Arc::new(solid(1, h, inactive))),
            inactive_right: Some(Arc::new(solid(1, h, border))),
            close_button: Some(Arc::new(cross_glyph(
                12,
                Rgba::rgb(120, 120, 120),
                Some(Rgba::rgba(0, 0, 0, 1)),
            ))),
            close_button_hover: Some(Arc::new(cross_glyph(
                12,
                Rgba::BLACK,
                Some(Rgba::rgb(210, 210, 210)),
            ))),
            add_button: Some(Arc::new(plus_tile(30, h, Rgba::rgb(43, 87, 154), glyph))),
            add_button_hover: Some(Arc::new(plus_tile(30, h, Rgba::rgb(70, 110, 175), glyph))),
            minimize_box: Some(Arc::new(caption_box(Self::BOX_WIDTH, h, CaptionGlyph::Minimize, glyph))),
            maximize_box: Some(Arc::new(caption_box(Self::BOX_WIDTH, h, CaptionGlyph::Maximize, glyph))),
            restore_box: Some(Arc::new(caption_box(Self::BOX_WIDTH, h, CaptionGlyph::Restore, glyph))),
            close_box: Some(Arc::new(caption_box(Self::BOX_WIDTH, h, CaptionGlyph::Close, glyph))),
            ..SkinImages::default()
        };
        Self {
            images,
            metrics: SkinMetrics {
                caption_margin_left: 8,
                caption_margin_right: 4,
                caption_margin_top: 9,
                icon_margin_left: 6,
                icon_margin_right: 4,
                icon_margin_top: 7,
                close_button_margin_left: 4,
                close_button_margin_right: 8,
                close_button_margin_top: 9,
                add_button_margin_left: 0,
                add_button_margin_right: 0,
                add_button_margin_top: 0,
                overlap_width: 0,
                top_padding: 0,
                strip_left_padding: 0,
                min_content_width: 24,
                max_content_width: 240,
            },
        }
    }
}

impl ClassicSkin {
    pub fn with_images(mut self, images: SkinImages) -> Self {
        self.images = images;
        self
    }
}

impl Default for ClassicSkin {
    fn default() -> Self {
        Self::new()
    }
}

impl SkinProfile for ClassicSkin {
    fn name(&self) -> &str {
        "classic"
    }

    fn images(&self) -> &SkinImages {
        &self.images
    }

    fn metrics(&self) -> &SkinMetrics {
        &self.metrics
    }

    fn renders_entire_title_bar(&self) -> bool {
        true
    }

    fn caption_color(&self, active: bool) -> Rgba {
        if active {
            Rgba::BLACK
        } else {
            Rgba::WHITE
        }
    }

    fn title_bar_fill(&self, window_active: bool) -> (Rgba, Rgba) {
        if window_active {
            (Rgba::rgb(43, 87, 154), Rgba::rgb(43, 87, 154))
        } else {
            (Rgba::rgb(90, 120, 170), Rgba::rgb(90, 120, 170))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{slanted_edge, ChromeSkin, ClassicSkin, Lean};
    use crate::pixels::Rgba;
    use crate::render::skin::SkinProfile;

    #[test]
    fn left_edge_is_transparent_in_top_left_corner() {
        let edge = slanted_edge(14, 28, Rgba::WHITE, Lean::Left);
        assert_eq!(edge.alpha_at(0, 0), 0);
        assert_eq!(edge.alpha_at(13, 0), 255);
        assert_eq!(edge.alpha_at(0, 27), 255);
    }

    #[test]
    fn right_edge_mirrors_left_edge() {
        let edge = slanted_edge(14, 28, Rgba::WHITE, Lean::Right);
        assert_eq!(edge.alpha_at(13, 0), 0);
        assert_eq!(edge.alpha_at(0, 0), 255);
        assert_eq!(edge.alpha_at(13, 27), 255);
    }

    #[test]
    fn builtin_skins_have_strip_heights() {
        assert_eq!(ChromeSkin::new().tab_strip_height().unwrap(), 36);
        assert_eq!(ClassicSkin::new().tab_strip_height().unwrap(), 30);
        assert!(ClassicSkin::new().renders_entire_title_bar());
        assert!(!ChromeSkin::new().renders_entire_title_bar());
    }
}
