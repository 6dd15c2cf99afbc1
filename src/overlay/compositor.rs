use crate::error::Result;
use crate::geometry::{Point, Rect};
use crate::overlay::surface::LayeredSurface;
use crate::pixels::PixelBuffer;
use crate::render::{RenderPass, TabRenderer};
use crate::tabs::TabRef;
use crate::window::host::{HostWindow, WindowState};
use crate::window::theme::{overlay_layout, LayoutInput, OverlayLayout, ThemeMode};

/// Whether a click on the overlay was consumed by the tab strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Not over a tab, the add button or a sizing box; the host window gets
    /// the message so native caption dragging keeps working.
    Forward,
    Handled,
}

/// Mouse messages the overlay window receives directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMouse {
    LeftDown,
    LeftDoubleClick,
    MiddleUp,
}

/// Answer to a hit-test query against the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayHit {
    /// Over the strip. Reported as caption so focus stays with the host.
    Caption,
    Outside,
}

/// The overlay glued to one host window's title bar.
pub struct Overlay {
    surface: Box<dyn LayeredSurface>,
    theme: ThemeMode,
    layout: Option<OverlayLayout>,
    disposed: bool,
}

impl Overlay {
    pub fn new(surface: Box<dyn LayeredSurface>, theme: ThemeMode) -> Self {
        Self {
            surface,
            theme,
            layout: None,
            disposed: false,
        }
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    /// Called when the system theme or colours change.
    pub fn set_theme(&mut self, theme: ThemeMode) {
        if self.theme != theme {
            tracing::debug!(?theme, "overlay theme changed");
            self.theme = theme;
            self.layout = None;
        }
    }

    pub fn layout(&self) -> Option<&OverlayLayout> {
        self.layout.as_ref()
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.layout.map(|layout| layout.bounds)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Recomputes the overlay bounds from the host. A disposed overlay
    /// ignores the call and returns `false`.
    pub fn sync_position(&mut self, host: &dyn HostWindow, renderer: &TabRenderer) -> Result<bool> {
        if self.disposed {
            return Ok(false);
        }
        let skin = renderer.skin();
        let input = LayoutInput {
            host: host.bounds(),
            state: host.state(),
            frame: host.frame_metrics(),
            theme: self.theme,
            strip_height: skin.tab_strip_height()?,
            entire_title_bar: skin.renders_entire_title_bar(),
            sizing_boxes_width: renderer.sizing_boxes_width()?,
        };
        self.layout = Some(overlay_layout(&input));
        Ok(true)
    }

    /// Converts a screen point into overlay surface coordinates.
    pub fn to_local(&self, screen: Point) -> Option<Point> {
        self.layout
            .map(|layout| screen.relative_to(layout.bounds.origin()))
    }

    pub fn hit_test(&self, screen: Point) -> OverlayHit {
        match self.layout {
            Some(layout) if !self.disposed && layout.bounds.contains(screen) => OverlayHit::Caption,
            _ => OverlayHit::Outside,
        }
    }

    /// Renders the strip and presents it. Returns `false` when nothing was
    /// drawn because the overlay is disposed or the host is minimized or
    /// has no width.
    pub fn render(
        &mut self,
        renderer: &mut TabRenderer,
        tabs: &[TabRef],
        host: &dyn HostWindow,
        cursor: Point,
        force_redraw: bool,
    ) -> Result<bool> {
        if self.disposed {
            return Ok(false);
        }
        let state = host.state();
        if state == WindowState::Minimized || host.bounds().width <= 0 {
            self.surface.hide();
            return Ok(false);
        }
        if self.layout.is_none() {
            self.sync_position(host, renderer)?;
        }
        let Some(layout) = self.layout else {
            return Ok(false);
        };
        if layout.bounds.is_empty() {
            return Ok(false);
        }

        let mut frame = PixelBuffer::new(layout.bounds.width as u32, layout.bounds.height as u32);
        if self.theme.paints_background() {
            let skin = renderer.skin();
            match skin.images().background.as_ref() {
                Some(background) => frame.draw_stretched(background, frame.bounds()),
                None => {
                    let (top, bottom) = skin.title_bar_fill(host.is_active());
                    let bounds = frame.bounds();
                    frame.fill_vertical_gradient(bounds, top, bottom);
                }
            }
        }

        let pass = RenderPass {
            offset: layout.render_offset,
            cursor: cursor.relative_to(layout.bounds.origin()),
            available_width: layout.available_width,
            force_redraw,
            maximized: state == WindowState::Maximized,
        };
        renderer.render(tabs, &mut frame, &pass)?;

        if let Some(hole) = layout.caption_hole {
            frame.clear_rect(hole);
        }
        self.surface.present(&frame, layout.bounds, host.opacity())?;
        Ok(true)
    }

    pub fn hide(&mut self) {
        if !self.disposed {
            self.surface.hide();
        }
    }

    /// Destroys the native overlay. Late position updates become no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.layout = None;
        self.surface.destroy();
        tracing::debug!("overlay disposed");
    }
}

impl Drop for Overlay {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::{Overlay, OverlayHit};
    use crate::error::TabStripError;
    use crate::geometry::{Point, Rect};
    use crate::overlay::surface::MemorySurface;
    use crate::render::{BlockCaptionPainter, ChromeSkin, TabRenderer};
    use crate::tabs::{Tab, TabContent, TabRef};
    use crate::window::host::{HeadlessHost, HostWindow, WindowState};
    use crate::window::theme::ThemeMode;
    use std::sync::Arc;

    struct Doc;

    impl TabContent for Doc {
        fn title(&self) -> String {
            "Doc".into()
        }

        fn set_bounds(&self, _bounds: Rect) {}
    }

    fn renderer() -> TabRenderer {
        TabRenderer::new(Arc::new(ChromeSkin::new()), Arc::new(BlockCaptionPainter::default()))
    }

    fn tabs() -> Vec<TabRef> {
        let tab = Tab::new(Arc::new(Doc));
        tab.set_active(true);
        vec![tab]
    }

    #[test]
    fn render_presents_frame_sized_to_overlay() {
        let (surface, handle) = MemorySurface::new();
        let mut overlay = Overlay::new(Box::new(surface), ThemeMode::Composited);
        let host = HeadlessHost::new(Rect::new(0, 0, 1000, 700));
        let mut renderer = renderer();

        assert!(overlay
            .render(&mut renderer, &tabs(), &host, Point::new(-100, -100), false)
            .unwrap());
        let frame = handle.last_frame().unwrap();
        assert_eq!(frame.bounds, Rect::new(8, 8, 984 - 138, 36));
        assert_eq!(frame.image.width(), 846);
        assert_eq!(frame.opacity, 255);
    }

    #[test]
    fn minimized_or_zero_width_host_skips_render() {
        let (surface, handle) = MemorySurface::new();
        let mut overlay = Overlay::new(Box::new(surface), ThemeMode::Composited);
        let host = HeadlessHost::new(Rect::new(0, 0, 1000, 700));
        let mut renderer = renderer();

        host.set_state(WindowState::Minimized);
        assert!(!overlay
            .render(&mut renderer, &tabs(), &host, Point::default(), false)
            .unwrap());
        host.set_state(WindowState::Normal);
        host.set_bounds(Rect::new(0, 0, 0, 700));
        assert!(!overlay
            .render(&mut renderer, &tabs(), &host, Point::default(), false)
            .unwrap());
        assert_eq!(handle.present_count(), 0);
    }

    #[test]
    fn legacy_mode_punches_hole_for_caption_buttons() {
        let (surface, handle) = MemorySurface::new();
        let mut overlay = Overlay::new(Box::new(surface), ThemeMode::Legacy);
        let host = HeadlessHost::new(Rect::new(0, 0, 1000, 700));
        let mut renderer = renderer();
        overlay
            .render(&mut renderer, &tabs(), &host, Point::default(), false)
            .unwrap();

        let frame = handle.last_frame().unwrap();
        let width = frame.image.width() as i32;
        assert_eq!(frame.image.alpha_at(width - 10, 10), 0, "caption buttons show through");
        assert_eq!(frame.image.alpha_at(width - 200, 4), 255, "title bar is painted");
    }

    #[test]
    fn blit_failure_propagates() {
        let (surface, handle) = MemorySurface::new();
        handle.fail_presents_with(1400);
        let mut overlay = Overlay::new(Box::new(surface), ThemeMode::Composited);
        let host = HeadlessHost::new(Rect::new(0, 0, 1000, 700));
        let err = overlay
            .render(&mut renderer(), &tabs(), &host, Point::default(), false)
            .unwrap_err();
        assert!(matches!(err, TabStripError::Blit { code: 1400 }));
    }

    #[test]
    fn disposed_overlay_ignores_sync_and_render() {
        let (surface, handle) = MemorySurface::new();
        let mut overlay = Overlay::new(Box::new(surface), ThemeMode::Composited);
        let host = HeadlessHost::new(Rect::new(0, 0, 1000, 700));
        let mut renderer = renderer();

        overlay.dispose();
        assert!(handle.is_destroyed());
        assert!(!overlay.sync_position(&host, &renderer).unwrap());
        assert!(overlay.bounds().is_none());
        assert!(!overlay
            .render(&mut renderer, &tabs(), &host, Point::default(), false)
            .unwrap());
        assert_eq!(overlay.hit_test(Point::new(20, 20)), OverlayHit::Outside);
    }

    #[test]
    fn hit_test_reports_caption_over_strip() {
        let (surface, _handle) = MemorySurface::new();
        let mut overlay = Overlay::new(Box::new(surface), ThemeMode::Composited);
        let host = HeadlessHost::new(Rect::new(0, 0, 1000, 700));
        overlay.sync_position(&host, &renderer()).unwrap();
        assert_eq!(overlay.hit_test(Point::new(20, 20)), OverlayHit::Caption);
        assert_eq!(overlay.hit_test(Point::new(20, 200)), OverlayHit::Outside);
    }
}
