use crate::pipeline::hook::DoubleClickDetector;
use crate::render::{ChromeSkin, ClassicSkin, SkinKind, SkinProfile};
use crate::window::theme::ThemeMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn default_tear_distance() -> i32 {
    10
}

fn default_show_add_button() -> bool {
    true
}

fn default_thumbnail_opacity() -> f32 {
    0.7
}

fn default_double_click_distance() -> i32 {
    4
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabStripSettings {
    /// Pixels the cursor must leave the tab strip by before a dragged tab
    /// tears off.
    #[serde(default = "default_tear_distance")]
    pub tear_distance: i32,
    #[serde(default = "default_show_add_button")]
    pub show_add_button: bool,
    #[serde(default)]
    pub skin: SkinKind,
    /// Directory of `<slot>.png` files replacing the built-in skin images.
    #[serde(default)]
    pub skin_dir: Option<PathBuf>,
    /// Opacity of the floating thumbnail while a tab is torn off.
    #[serde(default = "default_thumbnail_opacity")]
    pub thumbnail_opacity: f32,
    /// Overrides the desktop double-click time.
    #[serde(default)]
    pub double_click_interval_ms: Option<u32>,
    /// Full width of the box two presses must share to count as a double
    /// click.
    #[serde(default = "default_double_click_distance")]
    pub double_click_distance: i32,
    /// Forces a theme mode instead of asking the desktop.
    #[serde(default)]
    pub theme_override: Option<ThemeMode>,
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for TabStripSettings {
    fn default() -> Self {
        Self {
            tear_distance: default_tear_distance(),
            show_add_button: default_show_add_button(),
            skin: SkinKind::default(),
            skin_dir: None,
            thumbnail_opacity: default_thumbnail_opacity(),
            double_click_interval_ms: None,
            double_click_distance: default_double_click_distance(),
            theme_override: None,
            debug_logging: false,
            log_file: None,
        }
    }
}

impl TabStripSettings {
    /// Reads settings from `path`. A missing or empty file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme_override.unwrap_or_else(ThemeMode::detect)
    }

    pub fn double_click_detector(&self) -> DoubleClickDetector {
        let system = DoubleClickDetector::system();
        DoubleClickDetector::new(
            self.double_click_interval_ms
                .unwrap_or_else(|| system.interval_ms()),
            (self.double_click_distance / 2).max(1),
        )
    }

    /// Builds the configured skin, layering images from `skin_dir` on top.
    pub fn build_skin(&self) -> anyhow::Result<Arc<dyn SkinProfile>> {
        let Some(dir) = &self.skin_dir else {
            return Ok(self.skin.build());
        };
        let skin: Arc<dyn SkinProfile> = match self.skin {
            SkinKind::Chrome => {
                let base = ChromeSkin::new();
                let mut images = base.images().clone();
                images.overlay_dir(dir)?;
                Arc::new(base.with_images(images))
            }
            SkinKind::Classic => {
                let base = ClassicSkin::new();
                let mut images = base.images().clone();
                images.overlay_dir(dir)?;
                Arc::new(base.with_images(images))
            }
        };
        Ok(skin)
    }
}

#[cfg(test)]
mod tests {
    use super::TabStripSettings;
    use crate::render::SkinKind;
    use crate::window::theme::ThemeMode;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: TabStripSettings = serde_json::from_str(r#"{"tear_distance": 25}"#).unwrap();
        assert_eq!(settings.tear_distance, 25);
        assert!(settings.show_add_button);
        assert_eq!(settings.skin, SkinKind::Chrome);
        assert_eq!(settings.double_click_distance, 4);
    }

    #[test]
    fn enums_use_snake_case() {
        let settings: TabStripSettings =
            serde_json::from_str(r#"{"skin": "classic", "theme_override": "legacy"}"#).unwrap();
        assert_eq!(settings.skin, SkinKind::Classic);
        assert_eq!(settings.theme(), ThemeMode::Legacy);
    }

    #[test]
    fn interval_override_wins() {
        let settings = TabStripSettings {
            double_click_interval_ms: Some(123),
            ..TabStripSettings::default()
        };
        assert_eq!(settings.double_click_detector().interval_ms(), 123);
    }
}
