use crate::geometry::Rect;
use crate::pixels::PixelBuffer;
use crate::tabs::content::TabContent;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static NEXT_TAB_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(u64);

impl TabId {
    fn next() -> Self {
        Self(NEXT_TAB_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

pub type TabRef = Arc<Tab>;

#[derive(Debug, Clone, Default)]
struct TabState {
    caption: String,
    icon: Option<Arc<PixelBuffer>>,
    active: bool,
    show_close_button: bool,
    cached_image: Option<Arc<PixelBuffer>>,
    cached_content_width: i32,
    area: Rect,
    close_area: Rect,
}

/// One open document or view in the strip.
pub struct Tab {
    id: TabId,
    content: Arc<dyn TabContent>,
    state: Mutex<TabState>,
}

impl Tab {
    pub fn new(content: Arc<dyn TabContent>) -> TabRef {
        let caption = content.title();
        let icon = content.icon();
        Arc::new(Self {
            id: TabId::next(),
            content,
            state: Mutex::new(TabState {
                caption,
                icon,
                show_close_button: true,
                ..TabState::default()
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, TabState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn content(&self) -> &Arc<dyn TabContent> {
        &self.content
    }

    pub fn caption(&self) -> String {
        self.state().caption.clone()
    }

    /// Pulls the caption and icon from the hosted content. Returns `true` when
    /// the caption changed, in which case the cached image is dropped.
    pub fn refresh_from_content(&self) -> bool {
        let title = self.content.title();
        let icon = self.content.icon();
        let mut state = self.state();
        let changed = state.caption != title;
        if changed {
            state.caption = title;
            state.cached_image = None;
        }
        state.icon = icon;
        changed
    }

    pub fn icon(&self) -> Option<Arc<PixelBuffer>> {
        self.state().icon.clone()
    }

    pub fn is_active(&self) -> bool {
        self.state().active
    }

    /// Changing the flag invalidates the cached image so the next render pass
    /// re-composites the tab with the other skin state.
    pub fn set_active(&self, active: bool) {
        let mut state = self.state();
        if state.active != active {
            state.active = active;
            state.cached_image = None;
        }
    }

    pub fn show_close_button(&self) -> bool {
        self.state().show_close_button
    }

    pub fn set_show_close_button(&self, show: bool) {
        let mut state = self.state();
        if state.show_close_button != show {
            state.show_close_button = show;
            state.cached_image = None;
        }
    }

    pub fn cached_image(&self) -> Option<Arc<PixelBuffer>> {
        self.state().cached_image.clone()
    }

    pub fn cached_content_width(&self) -> i32 {
        self.state().cached_content_width
    }

    pub fn set_cached_image(&self, image: Arc<PixelBuffer>, content_width: i32) {
        let mut state = self.state();
        state.cached_image = Some(image);
        state.cached_content_width = content_width;
    }

    pub fn invalidate(&self) {
        self.state().cached_image = None;
    }

    /// Area of the tab on the overlay surface.
    pub fn area(&self) -> Rect {
        self.state().area
    }

    pub fn set_area(&self, area: Rect) {
        self.state().area = area;
    }

    /// Area of the close glyph on the overlay surface.
    pub fn close_area(&self) -> Rect {
        self.state().close_area
    }

    pub fn set_close_area(&self, area: Rect) {
        self.state().close_area = area;
    }
}

impl PartialEq for Tab {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Tab {}

impl fmt::Debug for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Tab")
            .field("id", &self.id)
            .field("caption", &state.caption)
            .field("active", &state.active)
            .finish()
    }
}
