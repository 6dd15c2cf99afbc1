use crate::error::Result;
use crate::geometry::{Point, Rect};
use crate::overlay::surface::LayeredSurface;
use crate::pixels::PixelBuffer;
use crate::tabs::TabRef;
use crate::window::host::WindowId;
use crate::window::tabbed::TabbedWindow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Tab strip of one open window, snapshotted when a tab is torn off.
#[derive(Clone)]
pub struct DropArea {
    pub window: Weak<TabbedWindow>,
    pub window_id: WindowId,
    /// Screen rectangle a torn tab must enter to merge.
    pub area: Rect,
}

impl std::fmt::Debug for DropArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropArea")
            .field("window_id", &self.window_id)
            .field("area", &self.area)
            .finish()
    }
}

/// Floating preview that follows the cursor while a tab is torn off.
pub trait ThumbnailWindow: Send {
    fn move_to(&mut self, cursor: Point);
    fn close(&mut self);
}

pub trait ThumbnailFactory: Send + Sync {
    fn create(&self, image: &PixelBuffer, cursor: Point) -> Result<Box<dyn ThumbnailWindow>>;
}

/// Thumbnail drawn on a layered surface at reduced opacity.
pub struct SurfaceThumbnail {
    surface: Box<dyn LayeredSurface>,
    image: PixelBuffer,
    opacity: u8,
}

impl SurfaceThumbnail {
    pub fn new(surface: Box<dyn LayeredSurface>, image: PixelBuffer, opacity: u8) -> Self {
        Self {
            surface,
            image,
            opacity,
        }
    }

    fn bounds_at(&self, cursor: Point) -> Rect {
        let size = self.image.size();
        // Cursor sits near the top middle of the preview, where it grabbed the tab.
        Rect::new(cursor.x - size.width / 2, cursor.y - 8, size.width, size.height)
    }
}

impl ThumbnailWindow for SurfaceThumbnail {
    fn move_to(&mut self, cursor: Point) {
        let bounds = self.bounds_at(cursor);
        if let Err(err) = self.surface.present(&self.image, bounds, self.opacity) {
            tracing::warn!(?err, "failed to move tab thumbnail");
        }
    }

    fn close(&mut self) {
        self.surface.destroy();
    }
}

type SurfaceFactory = Box<dyn Fn() -> Result<Box<dyn LayeredSurface>> + Send + Sync>;

/// Builds [`SurfaceThumbnail`]s from a surface constructor.
pub struct SurfaceThumbnailFactory {
    surfaces: SurfaceFactory,
    opacity: u8,
}

impl SurfaceThumbnailFactory {
    /// `opacity` is a fraction in `0.0..=1.0`.
    pub fn new<F>(surfaces: F, opacity: f32) -> Self
    where
        F: Fn() -> Result<Box<dyn LayeredSurface>> + Send + Sync + 'static,
    {
        Self {
            surfaces: Box::new(surfaces),
            opacity: (opacity.clamp(0.0, 1.0) * 255.0).round() as u8,
        }
    }
}

impl ThumbnailFactory for SurfaceThumbnailFactory {
    fn create(&self, image: &PixelBuffer, cursor: Point) -> Result<Box<dyn ThumbnailWindow>> {
        let surface = (self.surfaces)()?;
        let mut thumbnail = SurfaceThumbnail::new(surface, image.clone(), self.opacity);
        thumbnail.move_to(cursor);
        Ok(Box::new(thumbnail))
    }
}

/// The tab currently in flight.
pub struct TornTab {
    pub tab: TabRef,
    pub source: WindowId,
    pub drop_areas: Vec<DropArea>,
    thumbnail: Option<Box<dyn ThumbnailWindow>>,
}

impl TornTab {
    fn close_thumbnail(&mut self) {
        if let Some(mut thumbnail) = self.thumbnail.take() {
            thumbnail.close();
        }
    }
}

/// Process-wide owner of the torn tab. One instance is created by the
/// application and handed to every window; its lock guarantees that at most
/// one tab is in flight at any time.
pub struct DragCoordinator {
    torn: Mutex<Option<TornTab>>,
    thumbnails: Arc<dyn ThumbnailFactory>,
}

impl DragCoordinator {
    pub fn new(thumbnails: Arc<dyn ThumbnailFactory>) -> Self {
        Self {
            torn: Mutex::new(None),
            thumbnails,
        }
    }

    fn torn(&self) -> MutexGuard<'_, Option<TornTab>> {
        self.torn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the in-flight slot for `tab`. Returns `false` without side
    /// effects when another tab already holds it.
    pub fn try_tear(
        &self,
        tab: TabRef,
        source: WindowId,
        drop_areas: Vec<DropArea>,
        cursor: Point,
    ) -> bool {
        let mut torn = self.torn();
        if torn.is_some() {
            return false;
        }
        let thumbnail = match tab.cached_image() {
            Some(image) => match self.thumbnails.create(&image, cursor) {
                Ok(thumbnail) => Some(thumbnail),
                Err(err) => {
                    tracing::warn!(?err, "failed to create tab thumbnail");
                    None
                }
            },
            None => None,
        };
        tracing::debug!(
            tab = tab.id().value(),
            source = source.value(),
            targets = drop_areas.len(),
            "tab torn off"
        );
        *torn = Some(TornTab {
            tab,
            source,
            drop_areas,
            thumbnail,
        });
        true
    }

    pub fn is_dragging(&self) -> bool {
        self.torn().is_some()
    }

    /// Whether the tab in flight was torn from `window`.
    pub fn is_torn_from(&self, window: WindowId) -> bool {
        self.torn().as_ref().is_some_and(|torn| torn.source == window)
    }

    pub fn torn_tab(&self) -> Option<TabRef> {
        self.torn().as_ref().map(|torn| Arc::clone(&torn.tab))
    }

    pub fn move_thumbnail(&self, cursor: Point) {
        if let Some(thumbnail) = self.torn().as_mut().and_then(|torn| torn.thumbnail.as_mut()) {
            thumbnail.move_to(cursor);
        }
    }

    /// First snapshotted drop area containing `cursor`.
    pub fn drop_target(&self, cursor: Point) -> Option<DropArea> {
        self.torn().as_ref().and_then(|torn| {
            torn.drop_areas
                .iter()
                .find(|area| area.area.contains(cursor))
                .cloned()
        })
    }

    /// Releases the in-flight tab and closes its thumbnail. Only one caller
    /// ever receives it.
    pub fn take(&self) -> Option<TornTab> {
        let mut torn = self.torn().take()?;
        torn.close_thumbnail();
        Some(torn)
    }
}

#[cfg(test)]
mod tests {
    use super::{DragCoordinator, SurfaceThumbnailFactory};
    use crate::geometry::{Point, Rect};
    use crate::overlay::surface::{LayeredSurface, MemorySurface, MemorySurfaceHandle};
    use crate::pixels::PixelBuffer;
    use crate::tabs::{Tab, TabContent, TabRef};
    use crate::window::host::WindowId;
    use std::sync::{Arc, Mutex};

    struct Doc;

    impl TabContent for Doc {
        fn title(&self) -> String {
            "Doc".into()
        }

        fn set_bounds(&self, _bounds: Rect) {}
    }

    fn tab_with_image() -> TabRef {
        let tab = Tab::new(Arc::new(Doc));
        tab.set_cached_image(Arc::new(PixelBuffer::new(40, 20)), 10);
        tab
    }

    fn coordinator() -> (DragCoordinator, Arc<Mutex<Vec<MemorySurfaceHandle>>>) {
        let handles = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&handles);
        let factory = SurfaceThumbnailFactory::new(
            move || {
                let (surface, handle) = MemorySurface::new();
                sink.lock().unwrap().push(handle);
                Ok(Box::new(surface) as Box<dyn LayeredSurface>)
            },
            0.5,
        );
        (DragCoordinator::new(Arc::new(factory)), handles)
    }

    #[test]
    fn second_tear_is_refused() {
        let (drag, _) = coordinator();
        let source = WindowId::next();
        assert!(drag.try_tear(tab_with_image(), source, Vec::new(), Point::new(0, 0)));
        assert!(!drag.try_tear(tab_with_image(), WindowId::next(), Vec::new(), Point::new(0, 0)));
        assert!(drag.is_torn_from(source));
    }

    #[test]
    fn thumbnail_follows_cursor_and_closes_on_take() {
        let (drag, handles) = coordinator();
        drag.try_tear(tab_with_image(), WindowId::next(), Vec::new(), Point::new(100, 100));
        drag.move_thumbnail(Point::new(300, 200));

        let handle = handles.lock().unwrap()[0].clone();
        let frame = handle.last_frame().unwrap();
        assert_eq!(frame.bounds, Rect::new(280, 192, 40, 20));
        assert_eq!(frame.opacity, 128);

        assert!(drag.take().is_some());
        assert!(handle.is_destroyed());
        assert!(drag.take().is_none());
        assert!(!drag.is_dragging());
    }
}
