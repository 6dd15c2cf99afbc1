#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use titlebar_tabs::geometry::Rect;
use titlebar_tabs::overlay::{LayeredSurface, MemorySurface, MemorySurfaceHandle};
use titlebar_tabs::pipeline::{MockHookBackend, MockHookHandle, SurfaceThumbnailFactory};
use titlebar_tabs::tabs::{ContentFactory, TabContent};
use titlebar_tabs::window::{HeadlessHost, HostWindow, ThemeMode, WindowId, WindowParts};
use titlebar_tabs::{TabStripSettings, TabbedApplication, TabbedWindow, WindowRequest};

pub struct Doc {
    pub title: String,
    pub closed: AtomicBool,
    pub visible: AtomicBool,
    pub attached_to: Mutex<Option<WindowId>>,
}

impl Doc {
    pub fn new(title: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            title: title.into(),
            closed: AtomicBool::new(false),
            visible: AtomicBool::new(false),
            attached_to: Mutex::new(None),
        })
    }
}

impl TabContent for Doc {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn set_bounds(&self, _bounds: Rect) {}

    fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }

    fn attach_to(&self, host: WindowId) {
        *self.attached_to.lock().unwrap() = Some(host);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct WindowHandles {
    pub host: Arc<HeadlessHost>,
    pub surface: MemorySurfaceHandle,
    pub hook: MockHookHandle,
}

/// A headless application whose native parts are all inspectable.
pub struct Harness {
    pub app: Arc<TabbedApplication>,
    pub handles: Arc<Mutex<HashMap<WindowId, WindowHandles>>>,
    pub thumbnails: Arc<Mutex<Vec<MemorySurfaceHandle>>>,
    pub created: Arc<AtomicUsize>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(TabStripSettings::default())
    }

    pub fn with_settings(settings: TabStripSettings) -> Self {
        let handles: Arc<Mutex<HashMap<WindowId, WindowHandles>>> = Arc::default();
        let thumbnails: Arc<Mutex<Vec<MemorySurfaceHandle>>> = Arc::default();
        let created = Arc::new(AtomicUsize::new(0));

        let counter = created.clone();
        let content = ContentFactory::with_handler(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Doc::new(format!("Doc {n}")) as Arc<dyn TabContent>)
        });

        let thumbnail_handles = thumbnails.clone();
        let thumbnail_factory = SurfaceThumbnailFactory::new(
            move || {
                let (surface, handle) = MemorySurface::new();
                thumbnail_handles.lock().unwrap().push(handle);
                Ok(Box::new(surface) as Box<dyn LayeredSurface>)
            },
            settings.thumbnail_opacity,
        );

        let window_handles = handles.clone();
        let app = TabbedApplication::builder()
            .settings(settings)
            .theme(ThemeMode::Composited)
            .content_factory(Arc::new(content))
            .thumbnails(Arc::new(thumbnail_factory))
            .window_factory(move |request: &WindowRequest| {
                let host = Arc::new(HeadlessHost::new(request.bounds));
                let (surface, surface_handle) = MemorySurface::new();
                let (hook, hook_handle) = MockHookBackend::new();
                window_handles.lock().unwrap().insert(
                    host.id(),
                    WindowHandles {
                        host: host.clone(),
                        surface: surface_handle,
                        hook: hook_handle,
                    },
                );
                Ok(WindowParts {
                    host: host as Arc<dyn HostWindow>,
                    surface: Box::new(surface),
                    hook: Box::new(hook),
                })
            })
            .build()
            .unwrap();

        Self {
            app,
            handles,
            thumbnails,
            created,
        }
    }

    /// Opens a window at `bounds` holding `tabs` factory-made tabs.
    pub fn window_with_tabs(&self, bounds: Rect, tabs: usize) -> Arc<TabbedWindow> {
        let window = self.app.open_window_with_new_tab(bounds).unwrap();
        for _ in 1..tabs {
            window.add_new_tab().unwrap();
        }
        window
    }

    pub fn handles(&self, window: &TabbedWindow) -> WindowHandles {
        self.handles.lock().unwrap()[&window.id()].clone()
    }

    pub fn hook(&self, window: &TabbedWindow) -> MockHookHandle {
        self.handles(window).hook
    }
}

/// Polls `condition` until it holds or two seconds pass.
pub fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
