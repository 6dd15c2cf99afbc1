use crate::error::{Result, TabStripError};
use crate::pixels::{PixelBuffer, Rgba};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Caption buttons drawn by skins that take over the whole title bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizingBox {
    Minimize,
    Maximize,
    Close,
}

/// Bitmaps a skin supplies. Any image the renderer needs but the skin left
/// unset is reported as [`TabStripError::MissingSkinImage`].
#[derive(Debug, Clone, Default)]
pub struct SkinImages {
    pub active_left: Option<Arc<PixelBuffer>>,
    pub active_center: Option<Arc<PixelBuffer>>,
    pub active_right: Option<Arc<PixelBuffer>>,
    pub inactive_left: Option<Arc<PixelBuffer>>,
    pub inactive_center: Option<Arc<PixelBuffer>>,
    pub inactive_right: Option<Arc<PixelBuffer>>,
    pub close_button: Option<Arc<PixelBuffer>>,
    pub close_button_hover: Option<Arc<PixelBuffer>>,
    pub add_button: Option<Arc<PixelBuffer>>,
    pub add_button_hover: Option<Arc<PixelBuffer>>,
    pub background: Option<Arc<PixelBuffer>>,
    pub minimize_box: Option<Arc<PixelBuffer>>,
    pub maximize_box: Option<Arc<PixelBuffer>>,
    pub restore_box: Option<Arc<PixelBuffer>>,
    pub close_box: Option<Arc<PixelBuffer>>,
}

const SKIN_FILES: &[&str] = &[
    "active_left",
    "active_center",
    "active_right",
    "inactive_left",
    "inactive_center",
    "inactive_right",
    "close_button",
    "close_button_hover",
    "add_button",
    "add_button_hover",
    "background",
    "minimize_box",
    "maximize_box",
    "restore_box",
    "close_box",
];

impl SkinImages {
    pub fn require<'a>(
        image: &'a Option<Arc<PixelBuffer>>,
        name: &'static str,
    ) -> Result<&'a Arc<PixelBuffer>> {
        image.as_ref().ok_or(TabStripError::MissingSkinImage(name))
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut Option<Arc<PixelBuffer>>> {
        let slot = match name {
            "active_left" => &mut self.active_left,
            "active_center" => &mut self.active_center,
            "active_right" => &mut self.active_right,
            "inactive_left" => &mut self.inactive_left,
            "inactive_center" => &mut self.inactive_center,
            "inactive_right" => &mut self.inactive_right,
            "close_button" => &mut self.close_button,
            "close_button_hover" => &mut self.close_button_hover,
            "add_button" => &mut self.add_button,
            "add_button_hover" => &mut self.add_button_hover,
            "background" => &mut self.background,
            "minimize_box" => &mut self.minimize_box,
            "maximize_box" => &mut self.maximize_box,
            "restore_box" => &mut self.restore_box,
            "close_box" => &mut self.close_box,
            _ => return None,
        };
        Some(slot)
    }

    /// Loads `<name>.png` for every known slot from `dir`. Missing files leave
    /// the slot as it was so a directory can override part of a skin.
    pub fn overlay_dir(&mut self, dir: &Path) -> anyhow::Result<usize> {
        let mut loaded = 0;
        for name in SKIN_FILES {
            let path = dir.join(format!("{name}.png"));
            if !path.exists() {
                continue;
            }
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let image = PixelBuffer::decode(&bytes)
                .with_context(|| format!("invalid skin image {}", path.display()))?;
            if let Some(slot) = self.slot_mut(name) {
                *slot = Some(Arc::new(image));
                loaded += 1;
            }
        }
        tracing::debug!(dir = %dir.display(), loaded, "loaded skin images");
        Ok(loaded)
    }

    pub fn load_dir(dir: &Path) -> anyhow::Result<Self> {
        let mut images = Self::default();
        images.overlay_dir(dir)?;
        Ok(images)
    }
}

/// Margins and offsets a skin declares, all in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinMetrics {
    pub caption_margin_left: i32,
    pub caption_margin_right: i32,
    pub caption_margin_top: i32,
    pub icon_margin_left: i32,
    pub icon_margin_right: i32,
    pub icon_margin_top: i32,
    pub close_button_margin_left: i32,
    pub close_button_margin_right: i32,
    pub close_button_margin_top: i32,
    pub add_button_margin_left: i32,
    pub add_button_margin_right: i32,
    pub add_button_margin_top: i32,
    /// Horizontal overlap between neighbouring tabs.
    pub overlap_width: i32,
    /// Space above the tabs inside the overlay.
    pub top_padding: i32,
    /// Space before the first tab.
    pub strip_left_padding: i32,
    pub min_content_width: i32,
    pub max_content_width: i32,
}

/// Overridable knobs that distinguish one skin from another.
pub trait SkinProfile: Send + Sync {
    fn name(&self) -> &str;

    fn images(&self) -> &SkinImages;

    fn metrics(&self) -> &SkinMetrics;

    fn overlap_width(&self) -> i32 {
        self.metrics().overlap_width
    }

    fn top_padding(&self) -> i32 {
        self.metrics().top_padding
    }

    /// Skins that draw the minimize, maximize and close boxes themselves
    /// take over the entire title bar instead of just the strip.
    fn renders_entire_title_bar(&self) -> bool {
        false
    }

    fn caption_color(&self, active: bool) -> Rgba {
        if active {
            Rgba::BLACK
        } else {
            Rgba::rgb(70, 70, 70)
        }
    }

    /// Top and bottom colours of the title bar fill painted when the desktop
    /// is not compositing.
    fn title_bar_fill(&self, window_active: bool) -> (Rgba, Rgba) {
        if window_active {
            (Rgba::rgb(200, 215, 235), Rgba::rgb(185, 205, 230))
        } else {
            (Rgba::rgb(225, 230, 238), Rgba::rgb(215, 222, 232))
        }
    }

    fn sizing_box_hover(&self, sizing_box: SizingBox) -> Rgba {
        match sizing_box {
            SizingBox::Close => Rgba::rgba(232, 17, 35, 255),
            SizingBox::Minimize | SizingBox::Maximize => Rgba::rgba(255, 255, 255, 48),
        }
    }

    /// Height of one tab, taken from the active center slice.
    fn tab_height(&self) -> Result<i32> {
        let center = SkinImages::require(&self.images().active_center, "active_center")?;
        Ok(center.height() as i32)
    }

    /// Total height of the strip the overlay must cover.
    fn tab_strip_height(&self) -> Result<i32> {
        Ok(self.top_padding() + self.tab_height()?)
    }
}
