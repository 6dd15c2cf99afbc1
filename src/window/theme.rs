use crate::geometry::{Point, Rect};
use crate::window::host::WindowState;
use crate::window::nc::FrameMetrics;
use serde::{Deserialize, Serialize};

/// How the desktop draws window frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    /// Non-composited classic frames. The overlay covers the whole caption
    /// and lets the native buttons show through a hole.
    Legacy,
    /// Themed but flat frames without glass.
    Basic,
    /// Desktop composition is on; the overlay sits over a transparent
    /// caption and skips painting a background.
    Composited,
}

impl ThemeMode {
    #[cfg(windows)]
    pub fn detect() -> Self {
        use windows::Win32::Graphics::Dwm::DwmIsCompositionEnabled;
        use windows::Win32::UI::Controls::IsAppThemed;
        match unsafe { DwmIsCompositionEnabled() } {
            Ok(enabled) if enabled.as_bool() => ThemeMode::Composited,
            _ if unsafe { IsAppThemed() }.as_bool() => ThemeMode::Basic,
            _ => ThemeMode::Legacy,
        }
    }

    #[cfg(not(windows))]
    pub fn detect() -> Self {
        ThemeMode::Composited
    }

    pub fn paints_background(self) -> bool {
        self != ThemeMode::Composited
    }
}

/// Where the overlay goes and how the strip is laid out inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayLayout {
    /// Overlay window bounds in screen coordinates.
    pub bounds: Rect,
    /// Offset of the strip inside the overlay surface.
    pub render_offset: Point,
    /// Width the tabs and the add button may use.
    pub available_width: i32,
    /// Area punched transparent so the native caption buttons show.
    pub caption_hole: Option<Rect>,
}

/// Inputs of [`overlay_layout`].
#[derive(Debug, Clone, Copy)]
pub struct LayoutInput {
    pub host: Rect,
    pub state: WindowState,
    pub frame: FrameMetrics,
    pub theme: ThemeMode,
    pub strip_height: i32,
    /// The skin draws minimize, maximize and close itself.
    pub entire_title_bar: bool,
    /// Width of those skin-drawn boxes.
    pub sizing_boxes_width: i32,
}

/// Overlay bounds for one of the three theme modes.
pub fn overlay_layout(input: &LayoutInput) -> OverlayLayout {
    let frame = &input.frame;
    let host = input.host;
    let maximized = input.state == WindowState::Maximized;
    let inner_width = (host.width - 2 * frame.border_width).max(0);
    let reserved = if input.entire_title_bar {
        input.sizing_boxes_width
    } else {
        frame.caption_buttons_width
    };

    match input.theme {
        ThemeMode::Legacy => {
            // The overlay spans the native caption, buttons included.
            let top = if maximized {
                host.top() + frame.border_height
            } else {
                host.top()
            };
            let offset_y = if maximized { 0 } else { frame.border_height };
            let bounds = Rect::new(
                host.left() + frame.border_width,
                top,
                inner_width,
                offset_y + input.strip_height,
            );
            let caption_hole = (!input.entire_title_bar).then(|| {
                Rect::new(
                    inner_width - frame.caption_buttons_width,
                    0,
                    frame.caption_buttons_width,
                    offset_y + frame.caption_height,
                )
            });
            OverlayLayout {
                bounds,
                render_offset: Point::new(0, offset_y),
                available_width: (inner_width - reserved).max(0),
                caption_hole,
            }
        }
        ThemeMode::Basic | ThemeMode::Composited => {
            let width = if input.entire_title_bar {
                inner_width
            } else {
                (inner_width - frame.caption_buttons_width).max(0)
            };
            let bounds = Rect::new(
                host.left() + frame.border_width,
                host.top() + frame.border_height,
                width,
                input.strip_height,
            );
            let available_width = if input.entire_title_bar {
                (width - input.sizing_boxes_width).max(0)
            } else {
                width
            };
            OverlayLayout {
                bounds,
                render_offset: Point::new(0, 0),
                available_width,
                caption_hole: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{overlay_layout, LayoutInput, ThemeMode};
    use crate::geometry::{Point, Rect};
    use crate::window::host::WindowState;
    use crate::window::nc::FrameMetrics;

    fn input(theme: ThemeMode, entire_title_bar: bool) -> LayoutInput {
        LayoutInput {
            host: Rect::new(100, 50, 1000, 700),
            state: WindowState::Normal,
            frame: FrameMetrics::default(),
            theme,
            strip_height: 36,
            entire_title_bar,
            sizing_boxes_width: 138,
        }
    }

    #[test]
    fn composited_overlay_stops_before_native_buttons() {
        let layout = overlay_layout(&input(ThemeMode::Composited, false));
        assert_eq!(layout.bounds, Rect::new(108, 58, 984 - 138, 36));
        assert_eq!(layout.available_width, 846);
        assert!(layout.caption_hole.is_none());
    }

    #[test]
    fn legacy_overlay_covers_caption_and_punches_hole() {
        let layout = overlay_layout(&input(ThemeMode::Legacy, false));
        assert_eq!(layout.bounds, Rect::new(108, 50, 984, 44));
        assert_eq!(layout.render_offset, Point::new(0, 8));
        assert_eq!(layout.available_width, 984 - 138);
        assert_eq!(layout.caption_hole, Some(Rect::new(846, 0, 138, 31)));
    }

    #[test]
    fn entire_title_bar_skin_reserves_its_own_boxes() {
        let layout = overlay_layout(&input(ThemeMode::Basic, true));
        assert_eq!(layout.bounds.width, 984);
        assert_eq!(layout.available_width, 984 - 138);

        let legacy = overlay_layout(&input(ThemeMode::Legacy, true));
        assert!(legacy.caption_hole.is_none());
    }

    #[test]
    fn maximized_legacy_overlay_drops_top_border() {
        let mut maximized = input(ThemeMode::Legacy, false);
        maximized.state = WindowState::Maximized;
        let layout = overlay_layout(&maximized);
        assert_eq!(layout.bounds.y, 58);
        assert_eq!(layout.render_offset, Point::new(0, 0));
    }
}
