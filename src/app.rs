use crate::error::TabStripError;
use crate::geometry::{Point, Rect, Size};
use crate::overlay::{LayeredSurface, MemorySurface};
use crate::pipeline::dispatch::{InlineDispatcher, UiDispatcher};
use crate::pipeline::drag::{DragCoordinator, DropArea, SurfaceThumbnailFactory, ThumbnailFactory};
use crate::render::{BlockCaptionPainter, CaptionPainter, SkinProfile, TabRenderer};
use crate::settings::TabStripSettings;
use crate::tabs::{ContentFactory, TabRef};
use crate::window::host::{WindowId, WindowState};
use crate::window::tabbed::{TabbedWindow, WindowParts, WindowServices};
use crate::window::theme::ThemeMode;
use anyhow::anyhow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Size of a window opened without a source to copy from.
pub const DEFAULT_WINDOW_SIZE: Size = Size::new(1000, 700);

/// Where the cursor grabs a released tab's new window, relative to its
/// top-left corner.
const RELEASE_GRAB: Point = Point::new(60, 20);

/// What the window factory is asked to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRequest {
    pub bounds: Rect,
    pub state: WindowState,
}

type WindowFactory = Box<dyn Fn(&WindowRequest) -> anyhow::Result<WindowParts> + Send + Sync>;
type ExitListener = Box<dyn Fn() + Send + Sync>;
type OpenListener = Box<dyn Fn(&Arc<TabbedWindow>) + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Collects the collaborators of a [`TabbedApplication`].
pub struct TabbedApplicationBuilder {
    settings: TabStripSettings,
    dispatcher: Arc<dyn UiDispatcher>,
    content: Arc<ContentFactory>,
    windows: Option<WindowFactory>,
    thumbnails: Option<Arc<dyn ThumbnailFactory>>,
    captions: Arc<dyn CaptionPainter>,
    skin: Option<Arc<dyn SkinProfile>>,
    theme: Option<ThemeMode>,
    opened: Option<OpenListener>,
}

impl TabbedApplicationBuilder {
    pub fn settings(mut self, settings: TabStripSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn UiDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn content_factory(mut self, content: Arc<ContentFactory>) -> Self {
        self.content = content;
        self
    }

    /// Callback creating the host window, overlay surface and hook of every
    /// new window.
    pub fn window_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&WindowRequest) -> anyhow::Result<WindowParts> + Send + Sync + 'static,
    {
        self.windows = Some(Box::new(factory));
        self
    }

    pub fn thumbnails(mut self, thumbnails: Arc<dyn ThumbnailFactory>) -> Self {
        self.thumbnails = Some(thumbnails);
        self
    }

    pub fn captions(mut self, captions: Arc<dyn CaptionPainter>) -> Self {
        self.captions = captions;
        self
    }

    /// Uses `skin` instead of the one named in the settings.
    pub fn skin(mut self, skin: Arc<dyn SkinProfile>) -> Self {
        self.skin = Some(skin);
        self
    }

    /// Uses `theme` instead of asking the desktop.
    pub fn theme(mut self, theme: ThemeMode) -> Self {
        self.theme = Some(theme);
        self
    }

    /// Runs after every window is created and registered, before it gets
    /// any tabs. Platform glue uses it to route native messages.
    pub fn on_window_opened<F>(mut self, listener: F) -> Self
    where
        F: Fn(&Arc<TabbedWindow>) + Send + Sync + 'static,
    {
        self.opened = Some(Box::new(listener));
        self
    }

    pub fn build(self) -> anyhow::Result<Arc<TabbedApplication>> {
        let windows = self.windows.ok_or_else(|| {
            anyhow!(TabStripError::WindowCreation(
                "no window factory configured".to_string()
            ))
        })?;
        let skin = match self.skin {
            Some(skin) => skin,
            None => self.settings.build_skin()?,
        };
        skin.tab_strip_height()?;
        let thumbnails = self.thumbnails.unwrap_or_else(|| {
            Arc::new(SurfaceThumbnailFactory::new(
                || Ok(Box::new(MemorySurface::new().0) as Box<dyn LayeredSurface>),
                self.settings.thumbnail_opacity,
            ))
        });
        let theme = self.theme.unwrap_or_else(|| self.settings.theme());
        tracing::debug!(skin = skin.name(), ?theme, "tabbed application built");

        Ok(Arc::new_cyclic(|weak| TabbedApplication {
            this: weak.clone(),
            settings: self.settings,
            dispatcher: self.dispatcher,
            drag: Arc::new(DragCoordinator::new(thumbnails)),
            content: self.content,
            window_factory: windows,
            opened: self.opened,
            captions: self.captions,
            skin,
            theme: Mutex::new(theme),
            windows: Mutex::new(Vec::new()),
            exit_listeners: Mutex::new(Vec::new()),
            exited: AtomicBool::new(false),
        }))
    }
}

/// Registry of every open tabbed window plus the services they share.
///
/// The application exits, in the sense of [`TabbedApplication::on_exit`],
/// when its last window closes.
pub struct TabbedApplication {
    this: Weak<TabbedApplication>,
    settings: TabStripSettings,
    dispatcher: Arc<dyn UiDispatcher>,
    drag: Arc<DragCoordinator>,
    content: Arc<ContentFactory>,
    window_factory: WindowFactory,
    opened: Option<OpenListener>,
    captions: Arc<dyn CaptionPainter>,
    skin: Arc<dyn SkinProfile>,
    theme: Mutex<ThemeMode>,
    windows: Mutex<Vec<Arc<TabbedWindow>>>,
    exit_listeners: Mutex<Vec<ExitListener>>,
    exited: AtomicBool,
}

impl TabbedApplication {
    pub fn builder() -> TabbedApplicationBuilder {
        TabbedApplicationBuilder {
            settings: TabStripSettings::default(),
            dispatcher: Arc::new(InlineDispatcher),
            content: Arc::new(ContentFactory::new()),
            windows: None,
            thumbnails: None,
            captions: Arc::new(BlockCaptionPainter::default()),
            skin: None,
            theme: None,
            opened: None,
        }
    }

    pub fn settings(&self) -> &TabStripSettings {
        &self.settings
    }

    pub fn dispatcher(&self) -> &Arc<dyn UiDispatcher> {
        &self.dispatcher
    }

    pub fn drag(&self) -> &Arc<DragCoordinator> {
        &self.drag
    }

    pub fn content_factory(&self) -> &Arc<ContentFactory> {
        &self.content
    }

    pub fn theme(&self) -> ThemeMode {
        *lock(&self.theme)
    }

    fn services(&self) -> WindowServices {
        WindowServices {
            app: self.this.clone(),
            drag: Arc::clone(&self.drag),
            factory: Arc::clone(&self.content),
            dispatcher: Arc::clone(&self.dispatcher),
            tear_distance: self.settings.tear_distance,
        }
    }

    /// Creates an empty, hidden window and starts its mouse pipeline.
    pub fn open_window(&self, request: WindowRequest) -> anyhow::Result<Arc<TabbedWindow>> {
        let parts = (self.window_factory)(&request)?;
        let renderer = TabRenderer::new(Arc::clone(&self.skin), Arc::clone(&self.captions))
            .with_add_button(self.settings.show_add_button);
        if request.state != WindowState::Normal {
            parts.host.set_state(request.state);
        }
        let window = TabbedWindow::new(
            parts.host,
            parts.surface,
            renderer,
            self.theme(),
            self.services(),
        )?;
        if let Err(err) = window.start_pipeline(parts.hook, self.settings.double_click_detector()) {
            window.close();
            return Err(err);
        }
        lock(&self.windows).push(Arc::clone(&window));
        if let Some(opened) = &self.opened {
            opened(&window);
        }
        tracing::info!(window = window.id().value(), bounds = ?request.bounds, "window opened");
        Ok(window)
    }

    /// Opens a visible window holding one new tab from the content factory.
    pub fn open_window_with_new_tab(&self, bounds: Rect) -> anyhow::Result<Arc<TabbedWindow>> {
        let window = self.open_window(WindowRequest {
            bounds,
            state: WindowState::Normal,
        })?;
        window.host().show();
        if let Err(err) = window.add_new_tab() {
            window.close();
            return Err(err);
        }
        Ok(window)
    }

    /// Opens a window for a tab released outside every strip. A maximized
    /// source is mirrored; otherwise the window keeps the source's size and
    /// opens under the cursor.
    pub fn spawn_window_with(
        &self,
        tab: TabRef,
        cursor: Point,
        source: Option<(WindowState, Rect)>,
    ) -> anyhow::Result<Arc<TabbedWindow>> {
        let request = match source {
            Some((WindowState::Maximized, bounds)) => WindowRequest {
                bounds,
                state: WindowState::Maximized,
            },
            other => {
                let size = other
                    .map(|(_, bounds)| bounds.size())
                    .unwrap_or(DEFAULT_WINDOW_SIZE);
                WindowRequest {
                    bounds: Rect::new(
                        cursor.x - RELEASE_GRAB.x,
                        cursor.y - RELEASE_GRAB.y,
                        size.width,
                        size.height,
                    ),
                    state: WindowState::Normal,
                }
            }
        };
        let window = match self.open_window(request) {
            Ok(window) => window,
            Err(err) => {
                tab.content().close();
                return Err(err);
            }
        };
        window.host().show();
        window.insert_tab(0, tab, true);
        Ok(window)
    }

    /// Drop-area snapshots of every other window currently showing tabs.
    pub fn drop_areas(&self, excluding: WindowId) -> Vec<DropArea> {
        self.windows()
            .iter()
            .filter(|window| window.id() != excluding)
            .filter_map(|window| window.drop_target())
            .collect()
    }

    pub fn windows(&self) -> Vec<Arc<TabbedWindow>> {
        lock(&self.windows).clone()
    }

    pub fn open_windows(&self) -> usize {
        lock(&self.windows).len()
    }

    pub fn window(&self, id: WindowId) -> Option<Arc<TabbedWindow>> {
        lock(&self.windows).iter().find(|window| window.id() == id).cloned()
    }

    /// Forwards a desktop theme change to every window.
    pub fn set_theme(&self, theme: ThemeMode) {
        *lock(&self.theme) = theme;
        for window in self.windows() {
            window.on_theme_changed(theme);
        }
    }

    /// Closes every window. Contents are not asked for permission.
    pub fn close_all(&self) {
        for window in self.windows() {
            window.close();
        }
    }

    /// Drops a closed window from the registry. Called by the window itself.
    pub fn unregister(&self, id: WindowId) {
        let remaining = {
            let mut windows = lock(&self.windows);
            let before = windows.len();
            windows.retain(|window| window.id() != id);
            if windows.len() == before {
                return;
            }
            windows.len()
        };
        tracing::debug!(window = id.value(), remaining, "window unregistered");
        if remaining == 0 && !self.exited.swap(true, Ordering::SeqCst) {
            tracing::info!("last window closed");
            for listener in lock(&self.exit_listeners).iter() {
                listener();
            }
        }
    }

    /// Registers a callback run once when the last window closes.
    pub fn on_exit<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        lock(&self.exit_listeners).push(Box::new(listener));
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::{TabbedApplication, WindowRequest};
    use crate::error::TabStripError;
    use crate::geometry::{Point, Rect};
    use crate::overlay::MemorySurface;
    use crate::pipeline::hook::MockHookBackend;
    use crate::tabs::{ContentFactory, Tab, TabContent};
    use crate::window::host::{HeadlessHost, HostWindow, WindowState};
    use crate::window::tabbed::WindowParts;
    use crate::window::theme::ThemeMode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Doc;

    impl TabContent for Doc {
        fn title(&self) -> String {
            "Doc".into()
        }

        fn set_bounds(&self, _bounds: Rect) {}
    }

    fn app() -> Arc<TabbedApplication> {
        TabbedApplication::builder()
            .theme(ThemeMode::Composited)
            .content_factory(Arc::new(ContentFactory::with_handler(|| {
                Ok(Arc::new(Doc) as Arc<dyn TabContent>)
            })))
            .window_factory(|request: &WindowRequest| {
                let (surface, _) = MemorySurface::new();
                let (hook, _) = MockHookBackend::new();
                Ok(WindowParts {
                    host: Arc::new(HeadlessHost::new(request.bounds)) as Arc<dyn HostWindow>,
                    surface: Box::new(surface),
                    hook: Box::new(hook),
                })
            })
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_window_factory() {
        let err = TabbedApplication::builder().build().err().unwrap();
        assert!(matches!(
            err.downcast_ref::<TabStripError>(),
            Some(TabStripError::WindowCreation(_))
        ));
    }

    #[test]
    fn last_window_closing_fires_exit_once() {
        let app = app();
        let exits = Arc::new(AtomicUsize::new(0));
        let counter = exits.clone();
        app.on_exit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let first = app.open_window_with_new_tab(Rect::new(0, 0, 800, 600)).unwrap();
        let second = app.open_window_with_new_tab(Rect::new(900, 0, 800, 600)).unwrap();
        assert_eq!(app.open_windows(), 2);

        first.close();
        assert!(!app.has_exited());
        second.close();
        second.close();
        assert!(app.has_exited());
        assert_eq!(exits.load(Ordering::SeqCst), 1);
        assert_eq!(app.open_windows(), 0);
    }

    #[test]
    fn drop_areas_exclude_source_and_empty_windows() {
        let app = app();
        let source = app.open_window_with_new_tab(Rect::new(0, 0, 800, 600)).unwrap();
        let target = app.open_window_with_new_tab(Rect::new(900, 0, 800, 600)).unwrap();
        let _empty = app
            .open_window(WindowRequest {
                bounds: Rect::new(0, 700, 800, 600),
                state: WindowState::Normal,
            })
            .unwrap();

        let areas = app.drop_areas(source.id());
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].window_id, target.id());
        assert_eq!(Some(areas[0].area), target.drop_area());
    }

    #[test]
    fn released_tab_mirrors_maximized_source() {
        let app = app();
        let bounds = Rect::new(0, 0, 1920, 1040);
        let window = app
            .spawn_window_with(
                Tab::new(Arc::new(Doc)),
                Point::new(500, 20),
                Some((WindowState::Maximized, bounds)),
            )
            .unwrap();
        assert_eq!(window.host().state(), WindowState::Maximized);
        assert_eq!(window.host().bounds(), bounds);
        assert_eq!(window.tabs().len(), 1);
        assert!(window.tabs().get(0).unwrap().is_active());
    }

    #[test]
    fn released_tab_opens_under_cursor() {
        let app = app();
        let window = app
            .spawn_window_with(
                Tab::new(Arc::new(Doc)),
                Point::new(500, 300),
                Some((WindowState::Normal, Rect::new(0, 0, 640, 480))),
            )
            .unwrap();
        assert_eq!(window.host().bounds(), Rect::new(440, 280, 640, 480));
        assert!(window.host().is_visible());
    }
}
