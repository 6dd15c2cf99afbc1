use crate::error::Result;
use crate::geometry::{Point, Rect};
use crate::hit_test::{is_over_image, HitRegion};
use crate::pixels::PixelBuffer;
use crate::render::caption::{fit_caption, CaptionPainter};
use crate::render::layout::{compute_tab_content_width, tab_positions, ContentLimits, LayoutRequest};
use crate::render::skin::{SizingBox, SkinImages, SkinProfile};
use crate::tabs::TabRef;
use std::sync::Arc;

const ICON_SIZE: i32 = 16;

/// Per-window renderer state. Only the UI thread mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RendererState {
    /// Content width used by the previous pass; a different value forces every
    /// tab to re-composite.
    pub cached_content_width: Option<i32>,
    pub tab_content_width: i32,
    pub over_close_button: Option<usize>,
    pub over_add_button: bool,
    pub over_sizing_box: Option<SizingBox>,
    pub is_repositioning: bool,
    pub drag_anchor: Option<Point>,
}

/// Inputs of one render pass. All points are in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPass {
    /// Where the strip starts inside the surface; depends on the theme mode.
    pub offset: Point,
    pub cursor: Point,
    /// Width the tabs and the add button may use, starting at `offset.x`.
    pub available_width: i32,
    pub force_redraw: bool,
    pub maximized: bool,
}

/// Draws a tab strip and answers geometric queries about the last frame.
pub struct TabRenderer {
    skin: Arc<dyn SkinProfile>,
    captions: Arc<dyn CaptionPainter>,
    show_add_button: bool,
    state: RendererState,
    add_button: Option<HitRegion>,
    sizing_boxes: Vec<(SizingBox, HitRegion)>,
}

impl TabRenderer {
    pub fn new(skin: Arc<dyn SkinProfile>, captions: Arc<dyn CaptionPainter>) -> Self {
        Self {
            skin,
            captions,
            show_add_button: true,
            state: RendererState::default(),
            add_button: None,
            sizing_boxes: Vec::new(),
        }
    }

    pub fn with_add_button(mut self, show: bool) -> Self {
        self.show_add_button = show;
        self
    }

    pub fn skin(&self) -> &Arc<dyn SkinProfile> {
        &self.skin
    }

    pub fn state(&self) -> &RendererState {
        &self.state
    }

    pub fn show_add_button(&self) -> bool {
        self.show_add_button
    }

    pub fn tab_strip_height(&self) -> Result<i32> {
        self.skin.tab_strip_height()
    }

    /// Width reserved for the add button including its margins, or zero when
    /// the button is hidden.
    pub fn add_button_width(&self) -> Result<i32> {
        if !self.show_add_button {
            return Ok(0);
        }
        let images = self.skin.images();
        let metrics = self.skin.metrics();
        let add = SkinImages::require(&images.add_button, "add_button")?;
        Ok(add.width() as i32 + metrics.add_button_margin_left + metrics.add_button_margin_right)
    }

    /// Combined width of the minimize, maximize and close boxes.
    pub fn sizing_boxes_width(&self) -> Result<i32> {
        if !self.skin.renders_entire_title_bar() {
            return Ok(0);
        }
        let images = self.skin.images();
        let minimize = SkinImages::require(&images.minimize_box, "minimize_box")?;
        let maximize = SkinImages::require(&images.maximize_box, "maximize_box")?;
        let close = SkinImages::require(&images.close_box, "close_box")?;
        Ok((minimize.width() + maximize.width() + close.width()) as i32)
    }

    fn edge_width(&self, active: bool) -> Result<i32> {
        let images = self.skin.images();
        let (left, right) = if active {
            (
                SkinImages::require(&images.active_left, "active_left")?,
                SkinImages::require(&images.active_right, "active_right")?,
            )
        } else {
            (
                SkinImages::require(&images.inactive_left, "inactive_left")?,
                SkinImages::require(&images.inactive_right, "inactive_right")?,
            )
        };
        Ok((left.width() + right.width()) as i32)
    }

    /// Content width for `tab_count` tabs sharing `available_width`.
    pub fn content_width_for(&self, tab_count: usize, available_width: i32) -> Result<i32> {
        let metrics = self.skin.metrics();
        let request = LayoutRequest {
            tab_count,
            available_width,
            overlap_width: self.skin.overlap_width(),
            show_add_button: self.show_add_button,
            add_button_width: self.add_button_width()?,
        };
        let limits = ContentLimits {
            edge_width: self.edge_width(true)?,
            min_content_width: metrics.min_content_width.max(0),
            max_content_width: metrics.max_content_width,
        };
        Ok(compute_tab_content_width(request, limits))
    }

    /// Renders `tabs` into `surface`. Inactive tabs are drawn first in list
    /// order and the active tab last so overlapping neighbours never cover it.
    pub fn render(
        &mut self,
        tabs: &[TabRef],
        surface: &mut PixelBuffer,
        pass: &RenderPass,
    ) -> Result<()> {
        let metrics = *self.skin.metrics();
        let strip_width = pass.available_width - metrics.strip_left_padding;
        let content_width = self.content_width_for(tabs.len(), strip_width)?;
        let reflow = self.state.cached_content_width != Some(content_width);
        self.state.tab_content_width = content_width;
        self.state.cached_content_width = Some(content_width);

        let tab_width = self.edge_width(true)? + content_width;
        let top = pass.offset.y + self.skin.top_padding();
        let start_x = pass.offset.x + metrics.strip_left_padding;
        let positions = tab_positions(tabs.len(), start_x, tab_width, self.skin.overlap_width());

        for (tab, x) in tabs.iter().zip(&positions) {
            tab.refresh_from_content();
            if reflow || pass.force_redraw || tab.cached_image().is_none() {
                self.composite_tab(tab, content_width)?;
            }
            let size = tab
                .cached_image()
                .map(|image| image.size())
                .unwrap_or_default();
            tab.set_area(Rect::from_origin_size(Point::new(*x, top), size));
            self.place_close_button(tab, content_width)?;
        }

        let draw_order = tabs
            .iter()
            .filter(|tab| !tab.is_active())
            .chain(tabs.iter().filter(|tab| tab.is_active()));
        for tab in draw_order {
            if let Some(image) = tab.cached_image() {
                surface.draw(&image, tab.area().origin());
            }
            self.draw_close_button(tab, surface, pass.cursor)?;
        }

        self.add_button = None;
        if self.show_add_button {
            let images = self.skin.images();
            let add = SkinImages::require(&images.add_button, "add_button")?;
            let hover = SkinImages::require(&images.add_button_hover, "add_button_hover")?;
            let x = match tabs.iter().map(|tab| tab.area().right()).max() {
                Some(right) => right + metrics.add_button_margin_left,
                None => start_x + metrics.add_button_margin_left,
            };
            let origin = Point::new(x, top + metrics.add_button_margin_top);
            let region = HitRegion::new(Arc::clone(add), origin);
            let over = region.contains(pass.cursor);
            surface.draw(if over { hover } else { add }, origin);
            self.state.over_add_button = over;
            self.add_button = Some(region);
        }

        self.sizing_boxes.clear();
        if self.skin.renders_entire_title_bar() {
            self.draw_sizing_boxes(surface, pass)?;
        }
        Ok(())
    }

    fn composite_tab(&self, tab: &TabRef, content_width: i32) -> Result<()> {
        let images = self.skin.images();
        let metrics = self.skin.metrics();
        let active = tab.is_active();
        let (left, center, right) = if active {
            (
                SkinImages::require(&images.active_left, "active_left")?,
                SkinImages::require(&images.active_center, "active_center")?,
                SkinImages::require(&images.active_right, "active_right")?,
            )
        } else {
            (
                SkinImages::require(&images.inactive_left, "inactive_left")?,
                SkinImages::require(&images.inactive_center, "inactive_center")?,
                SkinImages::require(&images.inactive_right, "inactive_right")?,
            )
        };

        let left_width = left.width() as i32;
        let height = center.height().max(left.height()).max(right.height());
        let width = (left_width + content_width + right.width() as i32).max(0) as u32;
        let mut image = PixelBuffer::new(width, height);
        image.draw(left, Point::new(0, 0));
        image.draw_stretched(
            center,
            Rect::new(left_width, 0, content_width, center.height() as i32),
        );
        image.draw(right, Point::new(left_width + content_width, 0));

        let mut caption_x = left_width + metrics.caption_margin_left;
        if let Some(icon) = tab.icon() {
            let icon_x = left_width + metrics.icon_margin_left;
            image.draw_stretched(
                &icon,
                Rect::new(icon_x, metrics.icon_margin_top, ICON_SIZE, ICON_SIZE),
            );
            caption_x = icon_x + ICON_SIZE + metrics.icon_margin_right;
        }

        let mut caption_right = left_width + content_width - metrics.caption_margin_right;
        if tab.show_close_button() {
            let close = SkinImages::require(&images.close_button, "close_button")?;
            caption_right -= close.width() as i32
                + metrics.close_button_margin_left
                + metrics.close_button_margin_right;
        }
        let caption = fit_caption(
            self.captions.as_ref(),
            &tab.caption(),
            caption_right - caption_x,
        );
        if !caption.is_empty() {
            self.captions.paint(
                &mut image,
                &caption,
                Point::new(caption_x, metrics.caption_margin_top),
                self.skin.caption_color(active),
            );
        }

        tracing::trace!(tab = tab.id().value(), content_width, active, "composited tab");
        tab.set_cached_image(Arc::new(image), content_width);
        Ok(())
    }

    fn place_close_button(&self, tab: &TabRef, content_width: i32) -> Result<()> {
        if !tab.show_close_button() {
            tab.set_close_area(Rect::default());
            return Ok(());
        }
        let images = self.skin.images();
        let metrics = self.skin.metrics();
        let close = SkinImages::require(&images.close_button, "close_button")?;
        let left = if tab.is_active() {
            SkinImages::require(&images.active_left, "active_left")?
        } else {
            SkinImages::require(&images.inactive_left, "inactive_left")?
        };
        let area = tab.area();
        let x = area.left() + left.width() as i32 + content_width
            - metrics.close_button_margin_right
            - close.width() as i32;
        let origin = Point::new(x, area.top() + metrics.close_button_margin_top);
        tab.set_close_area(Rect::from_origin_size(origin, close.size()));
        Ok(())
    }

    fn draw_close_button(&self, tab: &TabRef, surface: &mut PixelBuffer, cursor: Point) -> Result<()> {
        if !tab.show_close_button() {
            return Ok(());
        }
        let images = self.skin.images();
        let close = SkinImages::require(&images.close_button, "close_button")?;
        let hover = SkinImages::require(&images.close_button_hover, "close_button_hover")?;
        let origin = tab.close_area().origin();
        let image = if is_over_image(close, origin, cursor) {
            hover
        } else {
            close
        };
        surface.draw(image, origin);
        Ok(())
    }

    fn draw_sizing_boxes(&mut self, surface: &mut PixelBuffer, pass: &RenderPass) -> Result<()> {
        let images = self.skin.images();
        let minimize = SkinImages::require(&images.minimize_box, "minimize_box")?;
        let maximize = if pass.maximized {
            SkinImages::require(&images.restore_box, "restore_box")?
        } else {
            SkinImages::require(&images.maximize_box, "maximize_box")?
        };
        let close = SkinImages::require(&images.close_box, "close_box")?;

        let mut right = surface.width() as i32;
        let mut hovered = None;
        for (kind, image) in [
            (SizingBox::Close, close),
            (SizingBox::Maximize, maximize),
            (SizingBox::Minimize, minimize),
        ] {
            right -= image.width() as i32;
            let origin = Point::new(right, pass.offset.y);
            let region = HitRegion::new(Arc::clone(image), origin);
            if region.contains(pass.cursor) {
                surface.blend_rect(region.area, self.skin.sizing_box_hover(kind));
                hovered = Some(kind);
            }
            surface.draw(image, origin);
            self.sizing_boxes.push((kind, region));
        }
        self.state.over_sizing_box = hovered;
        Ok(())
    }

    /// Tab under `cursor`. The active tab is tested first because it is drawn
    /// on top of its neighbours.
    pub fn over_tab(&self, tabs: &[TabRef], cursor: Point) -> Option<TabRef> {
        let hit = |tab: &&TabRef| {
            tab.cached_image()
                .is_some_and(|image| is_over_image(&image, tab.area().origin(), cursor))
        };
        tabs.iter()
            .filter(|tab| tab.is_active())
            .find(hit)
            .or_else(|| tabs.iter().filter(|tab| !tab.is_active()).find(hit))
            .cloned()
    }

    /// Surface rectangle of the add button drawn by the last pass.
    pub fn add_button_area(&self) -> Option<Rect> {
        self.add_button.as_ref().map(|region| region.area)
    }

    pub fn is_over_add_button(&self, cursor: Point) -> bool {
        self.add_button
            .as_ref()
            .is_some_and(|region| region.contains(cursor))
    }

    pub fn is_over_close_button(&self, tab: &TabRef, cursor: Point) -> bool {
        if !tab.show_close_button() {
            return false;
        }
        match self.skin.images().close_button.as_ref() {
            Some(close) => is_over_image(close, tab.close_area().origin(), cursor),
            None => false,
        }
    }

    pub fn is_over_sizing_box(&self, cursor: Point) -> Option<SizingBox> {
        self.sizing_boxes
            .iter()
            .find(|(_, region)| region.contains(cursor))
            .map(|(kind, _)| *kind)
    }

    /// Re-tests every hover candidate. Returns `true` when any flag changed
    /// and the strip needs a redraw.
    pub fn update_hover(&mut self, tabs: &[TabRef], cursor: Point) -> bool {
        let over_close_button = self.over_tab(tabs, cursor).and_then(|tab| {
            if self.is_over_close_button(&tab, cursor) {
                tabs.iter().position(|candidate| candidate.id() == tab.id())
            } else {
                None
            }
        });
        let over_add_button = self.is_over_add_button(cursor);
        let over_sizing_box = self.is_over_sizing_box(cursor);

        let changed = over_close_button != self.state.over_close_button
            || over_add_button != self.state.over_add_button
            || over_sizing_box != self.state.over_sizing_box;
        self.state.over_close_button = over_close_button;
        self.state.over_add_button = over_add_button;
        self.state.over_sizing_box = over_sizing_box;
        changed
    }

    /// Index at which a tab dropped at `cursor` is inserted: before the first
    /// tab whose horizontal midpoint lies right of the cursor.
    pub fn drop_index(&self, tabs: &[TabRef], cursor: Point) -> usize {
        tabs.iter()
            .position(|tab| {
                let area = tab.area();
                cursor.x < area.left() + area.width / 2
            })
            .unwrap_or(tabs.len())
    }

    pub fn begin_reposition(&mut self, anchor: Point) {
        self.state.is_repositioning = true;
        self.state.drag_anchor = Some(anchor);
    }

    pub fn end_reposition(&mut self) {
        self.state.is_repositioning = false;
        self.state.drag_anchor = None;
    }

    pub fn is_repositioning(&self) -> bool {
        self.state.is_repositioning
    }

    /// Drops every cached tab image so the next pass re-composites all tabs.
    pub fn invalidate(&mut self, tabs: &[TabRef]) {
        self.state.cached_content_width = None;
        for tab in tabs {
            tab.invalidate();
        }
    }
}
