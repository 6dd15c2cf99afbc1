use crate::app::TabbedApplication;
use crate::error::Result;
use crate::geometry::{Point, Rect};
use crate::overlay::{ClickOutcome, LayeredSurface, Overlay, OverlayHit, OverlayMouse};
use crate::pipeline::dispatch::UiDispatcher;
use crate::pipeline::drag::{DragCoordinator, DropArea};
use crate::pipeline::hook::{DoubleClickDetector, HookBackend};
use crate::pipeline::interpreter::{MousePipeline, PipelineContext};
use crate::render::{SizingBox, TabRenderer};
use crate::tabs::{ContentFactory, Tab, TabCollection, TabContent, TabRef};
use crate::window::host::{HostWindow, WindowId, WindowState};
use crate::window::nc::{resolve_hit_test, NcHit, NcPadding, SizeReaction, SizeTracker};
use crate::window::theme::ThemeMode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Payload of the selection events. Handlers of the `*ing` events may set
/// `cancel` to veto the change.
#[derive(Debug, Clone)]
pub struct TabSelectionEvent {
    pub tab: Option<TabRef>,
    pub index: Option<usize>,
    pub cancel: bool,
}

impl TabSelectionEvent {
    fn new(tab: Option<TabRef>, index: Option<usize>) -> Self {
        Self {
            tab,
            index,
            cancel: false,
        }
    }
}

type CancelableHandler = Arc<dyn Fn(&mut TabSelectionEvent) + Send + Sync>;
type NotifyHandler = Arc<dyn Fn(&TabSelectionEvent) + Send + Sync>;

#[derive(Default)]
struct SelectionEvents {
    deselecting: Mutex<Vec<CancelableHandler>>,
    selecting: Mutex<Vec<CancelableHandler>>,
    deselected: Mutex<Vec<NotifyHandler>>,
    selected: Mutex<Vec<NotifyHandler>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Raises a cancelable event. Returns `true` when a handler vetoed it.
fn raise_cancelable(handlers: &Mutex<Vec<CancelableHandler>>, event: &mut TabSelectionEvent) -> bool {
    let handlers = lock(handlers).clone();
    for handler in handlers {
        handler(event);
        if event.cancel {
            return true;
        }
    }
    false
}

fn raise(handlers: &Mutex<Vec<NotifyHandler>>, event: &TabSelectionEvent) {
    let handlers = lock(handlers).clone();
    for handler in handlers {
        handler(event);
    }
}

struct WindowUi {
    renderer: TabRenderer,
    overlay: Overlay,
    sizes: SizeTracker,
    padding: NcPadding,
    /// Last cursor position seen by the pipeline, in screen coordinates.
    cursor: Point,
}

/// Native pieces a window is assembled from.
pub struct WindowParts {
    pub host: Arc<dyn HostWindow>,
    pub surface: Box<dyn LayeredSurface>,
    pub hook: Box<dyn HookBackend>,
}

/// Shared services every window of an application uses.
#[derive(Clone)]
pub struct WindowServices {
    pub app: Weak<TabbedApplication>,
    pub drag: Arc<DragCoordinator>,
    pub factory: Arc<ContentFactory>,
    pub dispatcher: Arc<dyn UiDispatcher>,
    pub tear_distance: i32,
}

enum StripTarget {
    SizingBox(SizingBox),
    AddButton,
    CloseButton(TabRef),
    Tab(TabRef),
}

/// A host window whose caption is replaced by a tab strip.
///
/// Everything except [`TabbedWindow::drop_area`] and the queries the mouse
/// pipeline sends through the dispatcher runs on the UI thread.
pub struct TabbedWindow {
    id: WindowId,
    host: Arc<dyn HostWindow>,
    tabs: TabCollection,
    ui: Mutex<WindowUi>,
    events: SelectionEvents,
    services: WindowServices,
    pipeline: Mutex<Option<MousePipeline>>,
    closed: AtomicBool,
}

impl TabbedWindow {
    pub fn new(
        host: Arc<dyn HostWindow>,
        surface: Box<dyn LayeredSurface>,
        renderer: TabRenderer,
        theme: ThemeMode,
        services: WindowServices,
    ) -> Result<Arc<Self>> {
        let strip_height = renderer.tab_strip_height()?;
        let state = host.state();
        let padding = NcPadding::compute(&host.frame_metrics(), strip_height, state);
        let window = Arc::new_cyclic(|weak: &Weak<TabbedWindow>| {
            let tabs = TabCollection::new();
            let listener = weak.clone();
            tabs.on_collection_modified(move |_| {
                if let Some(window) = listener.upgrade() {
                    window.refresh(false);
                }
            });
            Self {
                id: host.id(),
                host,
                tabs,
                ui: Mutex::new(WindowUi {
                    renderer,
                    overlay: Overlay::new(surface, theme),
                    sizes: SizeTracker::new(state),
                    padding,
                    cursor: Point::new(i32::MIN / 2, i32::MIN / 2),
                }),
                events: SelectionEvents::default(),
                services,
                pipeline: Mutex::new(None),
                closed: AtomicBool::new(false),
            }
        });
        window.host.refresh_frame();
        tracing::debug!(window = window.id.value(), ?theme, "tabbed window created");
        Ok(window)
    }

    fn ui(&self) -> MutexGuard<'_, WindowUi> {
        lock(&self.ui)
    }

    /// Installs the mouse hook and starts this window's consumer thread.
    pub fn start_pipeline(
        self: &Arc<Self>,
        hook: Box<dyn HookBackend>,
        double_click: DoubleClickDetector,
    ) -> anyhow::Result<()> {
        let context = PipelineContext {
            window: Arc::downgrade(self),
            window_id: self.id,
            app: self.services.app.clone(),
            drag: Arc::clone(&self.services.drag),
            dispatcher: Arc::clone(&self.services.dispatcher),
            tear_distance: self.services.tear_distance,
        };
        let pipeline = MousePipeline::start(hook, double_click, context)?;
        *lock(&self.pipeline) = Some(pipeline);
        Ok(())
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn host(&self) -> &Arc<dyn HostWindow> {
        &self.host
    }

    pub fn tabs(&self) -> &TabCollection {
        &self.tabs
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn on_deselecting<F>(&self, handler: F)
    where
        F: Fn(&mut TabSelectionEvent) + Send + Sync + 'static,
    {
        lock(&self.events.deselecting).push(Arc::new(handler));
    }

    pub fn on_selecting<F>(&self, handler: F)
    where
        F: Fn(&mut TabSelectionEvent) + Send + Sync + 'static,
    {
        lock(&self.events.selecting).push(Arc::new(handler));
    }

    pub fn on_deselected<F>(&self, handler: F)
    where
        F: Fn(&TabSelectionEvent) + Send + Sync + 'static,
    {
        lock(&self.events.deselected).push(Arc::new(handler));
    }

    pub fn on_selected<F>(&self, handler: F)
    where
        F: Fn(&TabSelectionEvent) + Send + Sync + 'static,
    {
        lock(&self.events.selected).push(Arc::new(handler));
    }

    pub fn selected_tab(&self) -> Option<TabRef> {
        self.tabs.find(|tab| tab.is_active())
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.tabs.snapshot().iter().position(|tab| tab.is_active())
    }

    pub fn select_index(&self, index: usize) -> bool {
        match self.tabs.get(index) {
            Some(tab) => self.select_tab(&tab),
            None => false,
        }
    }

    /// Makes `tab` the active one. Either selection event may cancel, in which
    /// case nothing changes and `false` is returned.
    pub fn select_tab(&self, tab: &TabRef) -> bool {
        let Some(index) = self.tabs.index_of(tab) else {
            return false;
        };
        let current = self.selected_tab();
        if current.as_ref() == Some(tab) {
            return true;
        }
        let current_index = current.as_ref().and_then(|tab| self.tabs.index_of(tab));

        let mut deselecting = TabSelectionEvent::new(current.clone(), current_index);
        if current.is_some() && raise_cancelable(&self.events.deselecting, &mut deselecting) {
            tracing::debug!(window = self.id.value(), "deselection cancelled");
            return false;
        }
        let mut selecting = TabSelectionEvent::new(Some(Arc::clone(tab)), Some(index));
        if raise_cancelable(&self.events.selecting, &mut selecting) {
            tracing::debug!(window = self.id.value(), "selection cancelled");
            return false;
        }

        if let Some(previous) = &current {
            previous.set_active(false);
            previous.content().set_visible(false);
            raise(&self.events.deselected, &deselecting);
        }
        tab.set_active(true);
        tab.content().set_visible(true);
        self.resize_contents();
        raise(&self.events.selected, &selecting);
        tracing::debug!(window = self.id.value(), tab = tab.id().value(), index, "tab selected");
        self.refresh(false);
        true
    }

    /// Appends a tab hosting `content` and selects it.
    pub fn add_tab(&self, content: Arc<dyn TabContent>) -> TabRef {
        content.attach_to(self.id);
        let tab = Tab::new(content);
        self.tabs.push(Arc::clone(&tab));
        self.select_tab(&tab);
        tab
    }

    /// Asks the content factory for new content and appends it as the
    /// active tab.
    pub fn add_new_tab(&self) -> anyhow::Result<TabRef> {
        let content = self.services.factory.create()?;
        content.wait_until_ready();
        Ok(self.add_tab(content))
    }

    /// Inserts an existing tab, typically one dragged in from another window.
    pub fn insert_tab(&self, index: usize, tab: TabRef, select: bool) -> usize {
        tab.content().attach_to(self.id);
        tab.set_active(false);
        let index = self.tabs.insert(index, Arc::clone(&tab));
        if select {
            self.select_tab(&tab);
        }
        index
    }

    /// Closes `tab` unless its content refuses. Closing the last tab closes
    /// the window.
    pub fn close_tab(&self, tab: &TabRef) -> bool {
        if !self.tabs.contains(tab) || !tab.content().request_close() {
            return false;
        }
        if !self.remove_tab(tab) {
            return false;
        }
        tab.content().close();
        tracing::debug!(window = self.id.value(), tab = tab.id().value(), "tab closed");
        if self.tabs.is_empty() {
            self.close();
        }
        true
    }

    /// Removes `tab` without closing its content, moving the selection to a
    /// neighbour first when it was active. Nothing is removed when that
    /// selection is cancelled.
    pub fn remove_tab(&self, tab: &TabRef) -> bool {
        let Some(index) = self.tabs.index_of(tab) else {
            return false;
        };
        if tab.is_active() {
            let neighbour = if index > 0 { index - 1 } else { index + 1 };
            if let Some(next) = self.tabs.get(neighbour) {
                if !self.select_tab(&next) {
                    tracing::debug!(window = self.id.value(), "tab removal cancelled");
                    return false;
                }
            }
        }
        self.tabs.remove(tab);
        tab.set_active(false);
        tab.content().set_visible(false);
        true
    }

    /// Inserts a torn tab at the slot under `cursor` and selects it.
    pub fn merge_tab(&self, tab: TabRef, cursor: Point) -> usize {
        let index = {
            let ui = self.ui();
            match ui.overlay.to_local(cursor) {
                Some(local) => ui.renderer.drop_index(&self.tabs.snapshot(), local),
                None => self.tabs.len(),
            }
        };
        tracing::debug!(window = self.id.value(), tab = tab.id().value(), index, "tab merged");
        self.host.show();
        self.insert_tab(index, tab, true)
    }

    /// Screen rectangle of the tab strip. Torn tabs dropped inside it merge
    /// into this window.
    pub fn drop_area(&self) -> Option<Rect> {
        self.ui().overlay.bounds()
    }

    /// Drop-area snapshot of this window, or `None` while it shows no tabs.
    pub fn drop_target(self: &Arc<Self>) -> Option<DropArea> {
        if self.is_closed() || self.tabs.is_empty() || !self.host.is_visible() {
            return None;
        }
        self.drop_area().map(|area| DropArea {
            window: Arc::downgrade(self),
            window_id: self.id,
            area,
        })
    }

    /// Screen rectangle of `tab` as drawn by the last render pass.
    pub fn tab_bounds(&self, tab: &TabRef) -> Option<Rect> {
        if !self.tabs.contains(tab) {
            return None;
        }
        let origin = self.drop_area()?.origin();
        Some(tab.area().offset(origin.x, origin.y))
    }

    /// Screen rectangle of the add button, once a pass has drawn one.
    pub fn add_button_bounds(&self) -> Option<Rect> {
        let ui = self.ui();
        let origin = ui.overlay.bounds()?.origin();
        ui.renderer
            .add_button_area()
            .map(|area| area.offset(origin.x, origin.y))
    }

    pub fn toggle_maximize(&self) {
        let next = match self.host.state() {
            WindowState::Maximized => WindowState::Normal,
            _ => WindowState::Maximized,
        };
        self.host.set_state(next);
        self.on_size(next);
    }

    /// Sizes the selected tab's content to the client area below the strip.
    pub fn resize_contents(&self) {
        let Some(tab) = self.selected_tab() else {
            return;
        };
        let bounds = {
            let ui = self.ui();
            let window = self.host.bounds();
            let client = ui.padding.client_rect(window);
            ui.padding
                .content_rect(window)
                .offset(-client.left(), -client.top())
        };
        tab.content().set_bounds(bounds);
    }

    /// Renders the strip and presents it. Blit failures propagate.
    pub fn render(&self, force_redraw: bool) -> Result<bool> {
        if self.is_closed() {
            return Ok(false);
        }
        let tabs = self.tabs.snapshot();
        let mut ui = self.ui();
        let ui = &mut *ui;
        ui.overlay
            .render(&mut ui.renderer, &tabs, self.host.as_ref(), ui.cursor, force_redraw)
    }

    /// Like [`TabbedWindow::render`] for callers with nowhere to propagate to.
    fn refresh(&self, force_redraw: bool) {
        if let Err(err) = self.render(force_redraw) {
            tracing::error!(?err, window = self.id.value(), "failed to render tab strip");
        }
    }

    fn sync_overlay(&self) {
        let mut ui = self.ui();
        let ui = &mut *ui;
        if let Err(err) = ui.overlay.sync_position(self.host.as_ref(), &ui.renderer) {
            tracing::error!(?err, window = self.id.value(), "failed to position overlay");
        }
    }

    fn strip_target(&self, local: Point) -> Option<StripTarget> {
        let ui = self.ui();
        if let Some(sizing_box) = ui.renderer.is_over_sizing_box(local) {
            return Some(StripTarget::SizingBox(sizing_box));
        }
        if ui.renderer.is_over_add_button(local) {
            return Some(StripTarget::AddButton);
        }
        let tab = ui.renderer.over_tab(&self.tabs.snapshot(), local)?;
        if ui.renderer.is_over_close_button(&tab, local) {
            Some(StripTarget::CloseButton(tab))
        } else {
            Some(StripTarget::Tab(tab))
        }
    }

    /// Routes a click the overlay received. Clicks over nothing the strip
    /// draws are forwarded so native caption dragging keeps working.
    pub fn handle_overlay_mouse(&self, kind: OverlayMouse, screen: Point) -> ClickOutcome {
        let Some(local) = self.ui().overlay.to_local(screen) else {
            return ClickOutcome::Forward;
        };
        let Some(target) = self.strip_target(local) else {
            return ClickOutcome::Forward;
        };
        match (kind, target) {
            (OverlayMouse::LeftDown, StripTarget::SizingBox(sizing_box)) => {
                self.apply_sizing_box(sizing_box)
            }
            (OverlayMouse::LeftDown, StripTarget::AddButton) => {
                if let Err(err) = self.add_new_tab() {
                    tracing::error!(?err, window = self.id.value(), "failed to add tab");
                }
            }
            (OverlayMouse::LeftDown, StripTarget::CloseButton(tab)) => {
                self.close_tab(&tab);
            }
            (OverlayMouse::LeftDown, StripTarget::Tab(tab)) => {
                if self.select_tab(&tab) {
                    self.ui().renderer.begin_reposition(local);
                }
            }
            (
                OverlayMouse::MiddleUp,
                StripTarget::Tab(tab) | StripTarget::CloseButton(tab),
            ) => {
                self.close_tab(&tab);
            }
            (OverlayMouse::MiddleUp | OverlayMouse::LeftDoubleClick, _) => {}
        }
        ClickOutcome::Handled
    }

    fn apply_sizing_box(&self, sizing_box: SizingBox) {
        match sizing_box {
            SizingBox::Minimize => {
                self.host.set_state(WindowState::Minimized);
                self.on_size(WindowState::Minimized);
            }
            SizingBox::Maximize => self.toggle_maximize(),
            SizingBox::Close => {
                self.request_close();
            }
        }
    }

    /// Pointer moved over the screen. Redraws when a hover flag changed.
    pub fn pointer_moved(&self, screen: Point) {
        let changed = {
            let mut ui = self.ui();
            ui.cursor = screen;
            match ui.overlay.to_local(screen) {
                Some(local) => ui.renderer.update_hover(&self.tabs.snapshot(), local),
                None => false,
            }
        };
        if changed {
            self.refresh(false);
        }
    }

    pub fn is_repositioning(&self) -> bool {
        self.ui().renderer.is_repositioning()
    }

    /// Moves the selected tab to the slot under `screen` while repositioning.
    pub fn reposition_to(&self, screen: Point) {
        let Some(from) = self.selected_index() else {
            return;
        };
        let target = {
            let mut ui = self.ui();
            ui.cursor = screen;
            let Some(local) = ui.overlay.to_local(screen) else {
                return;
            };
            ui.renderer.drop_index(&self.tabs.snapshot(), local)
        };
        // Removing the tab first shifts every later slot left by one.
        let to = if target > from { target - 1 } else { target };
        if to != from && self.tabs.move_item(from, to) {
            tracing::debug!(window = self.id.value(), from, to, "tab repositioned");
        }
    }

    pub fn end_reposition(&self) {
        self.ui().renderer.end_reposition();
    }

    /// Tears the selected tab out of the strip and hands it to the drag
    /// coordinator. Returns `false` when another tab is already in flight.
    pub fn tear_off(&self, cursor: Point) -> bool {
        let Some(tab) = self.selected_tab() else {
            return false;
        };
        self.end_reposition();
        let drop_areas = self
            .services
            .app
            .upgrade()
            .map(|app| app.drop_areas(self.id))
            .unwrap_or_default();
        if !self
            .services
            .drag
            .try_tear(Arc::clone(&tab), self.id, drop_areas, cursor)
        {
            return false;
        }
        if !self.remove_tab(&tab) {
            self.services.drag.take();
            return false;
        }
        if self.tabs.is_empty() {
            self.ui().overlay.hide();
            self.host.hide();
        }
        true
    }

    /// Closes the window once its last tab has been dragged away.
    pub fn close_if_empty(&self) -> bool {
        if self.tabs.is_empty() {
            self.close();
            true
        } else {
            false
        }
    }

    pub fn on_activate(&self, active: bool) {
        tracing::debug!(window = self.id.value(), active, "host activation changed");
        self.update_padding();
        self.refresh(false);
    }

    /// Answers a non-client hit-test for the host window.
    pub fn on_hit_test(&self, native: NcHit, screen: Point) -> NcHit {
        let strip_height = match self.ui().renderer.tab_strip_height() {
            Ok(height) => height,
            Err(err) => {
                tracing::error!(?err, "tab strip height unavailable");
                return native;
            }
        };
        resolve_hit_test(
            native,
            self.host.bounds(),
            screen,
            &self.host.frame_metrics(),
            strip_height,
            self.host.state(),
        )
    }

    /// Hit-test answer for the overlay window itself.
    pub fn overlay_hit_test(&self, screen: Point) -> OverlayHit {
        self.ui().overlay.hit_test(screen)
    }

    pub fn padding(&self) -> NcPadding {
        self.ui().padding
    }

    fn update_padding(&self) {
        let mut ui = self.ui();
        match ui.renderer.tab_strip_height() {
            Ok(strip) => {
                ui.padding = NcPadding::compute(&self.host.frame_metrics(), strip, self.host.state())
            }
            Err(err) => tracing::error!(?err, "tab strip height unavailable"),
        }
    }

    pub fn on_size(&self, state: WindowState) -> SizeReaction {
        let reaction = self.ui().sizes.observe(state);
        if reaction == SizeReaction::Restyle {
            tracing::debug!(window = self.id.value(), ?state, "window restyled");
            self.update_padding();
            self.host.refresh_frame();
            {
                let mut ui = self.ui();
                let tabs = self.tabs.snapshot();
                ui.renderer.invalidate(&tabs);
            }
        }
        self.sync_overlay();
        self.resize_contents();
        self.refresh(reaction == SizeReaction::Restyle);
        reaction
    }

    pub fn on_move(&self) {
        self.sync_overlay();
        self.refresh(false);
    }

    pub fn on_theme_changed(&self, theme: ThemeMode) {
        self.ui().overlay.set_theme(theme);
        self.update_padding();
        self.host.refresh_frame();
        self.sync_overlay();
        self.refresh(true);
    }

    /// Closes the window when every tab's content agrees. A single refusal
    /// leaves all tabs in place.
    pub fn request_close(&self) -> bool {
        if !self
            .tabs
            .snapshot()
            .iter()
            .all(|tab| tab.content().request_close())
        {
            tracing::debug!(window = self.id.value(), "window close cancelled by tab");
            return false;
        }
        self.close();
        true
    }

    /// Tears the window down. Safe to call more than once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!(window = self.id.value(), "closing tabbed window");
        let pipeline = lock(&self.pipeline).take();
        if let Some(mut pipeline) = pipeline {
            pipeline.shutdown();
        }
        self.ui().overlay.dispose();
        self.tabs.suppress_events();
        for tab in self.tabs.snapshot() {
            tab.content().close();
        }
        self.tabs.clear();
        self.host.close();
        if let Some(app) = self.services.app.upgrade() {
            app.unregister(self.id);
        }
    }
}

impl std::fmt::Debug for TabbedWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabbedWindow")
            .field("id", &self.id)
            .field("tabs", &self.tabs.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{TabbedWindow, WindowServices};
    use crate::geometry::{Point, Rect};
    use crate::overlay::{ClickOutcome, MemorySurface, MemorySurfaceHandle, OverlayMouse};
    use crate::pipeline::dispatch::InlineDispatcher;
    use crate::pipeline::drag::{DragCoordinator, SurfaceThumbnailFactory};
    use crate::render::{BlockCaptionPainter, ChromeSkin, TabRenderer};
    use crate::tabs::{ContentFactory, TabContent, TabRef};
    use crate::window::host::{HeadlessHost, HostWindow, WindowState};
    use crate::window::theme::ThemeMode;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex, Weak};

    struct Doc {
        title: &'static str,
        allow_close: AtomicBool,
        closed: AtomicBool,
        bounds: Mutex<Option<Rect>>,
    }

    impl Doc {
        fn new(title: &'static str) -> Arc<Self> {
            Arc::new(Self {
                title,
                allow_close: AtomicBool::new(true),
                closed: AtomicBool::new(false),
                bounds: Mutex::new(None),
            })
        }
    }

    impl TabContent for Doc {
        fn title(&self) -> String {
            self.title.into()
        }

        fn set_bounds(&self, bounds: Rect) {
            *self.bounds.lock().unwrap() = Some(bounds);
        }

        fn request_close(&self) -> bool {
            self.allow_close.load(Ordering::SeqCst)
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn active_count(window: &TabbedWindow) -> usize {
        window
            .tabs()
            .snapshot()
            .iter()
            .filter(|tab| tab.is_active())
            .count()
    }

    fn window() -> (Arc<TabbedWindow>, Arc<HeadlessHost>, MemorySurfaceHandle) {
        let host = Arc::new(HeadlessHost::new(Rect::new(0, 0, 1000, 700)));
        host.show();
        let (surface, handle) = MemorySurface::new();
        let renderer = TabRenderer::new(
            Arc::new(ChromeSkin::new()),
            Arc::new(BlockCaptionPainter::default()),
        );
        let services = WindowServices {
            app: Weak::new(),
            drag: Arc::new(DragCoordinator::new(Arc::new(SurfaceThumbnailFactory::new(
                || Ok(Box::new(MemorySurface::new().0) as Box<dyn crate::overlay::LayeredSurface>),
                0.7,
            )))),
            factory: Arc::new(ContentFactory::with_handler(|| {
                Ok(Doc::new("New") as Arc<dyn TabContent>)
            })),
            dispatcher: Arc::new(InlineDispatcher),
            tear_distance: 10,
        };
        let window = TabbedWindow::new(
            host.clone() as Arc<dyn HostWindow>,
            Box::new(surface),
            renderer,
            ThemeMode::Composited,
            services,
        )
        .unwrap();
        (window, host, handle)
    }

    fn centre(tab: &TabRef, window: &TabbedWindow) -> Point {
        let origin = window.drop_area().unwrap().origin();
        let area = tab.area();
        Point::new(
            origin.x + area.left() + area.width / 2,
            origin.y + area.top() + area.height / 2 + 4,
        )
    }

    #[test]
    fn adding_tabs_keeps_exactly_one_active() {
        let (window, _, handle) = window();
        let first = window.add_tab(Doc::new("One"));
        let second = window.add_tab(Doc::new("Two"));
        assert!(!first.is_active());
        assert!(second.is_active());
        assert_eq!(window.selected_index(), Some(1));
        assert!(handle.present_count() > 0);
    }

    #[test]
    fn cancelled_selection_changes_nothing() {
        let (window, _, _) = window();
        let first = window.add_tab(Doc::new("One"));
        let second = window.add_tab(Doc::new("Two"));
        window.on_selecting(|event| event.cancel = true);
        assert!(!window.select_tab(&first));
        assert!(second.is_active());
        assert!(!first.is_active());
    }

    #[test]
    fn cancelled_deselection_changes_nothing() {
        let (window, _, _) = window();
        let first = window.add_tab(Doc::new("One"));
        window.add_tab(Doc::new("Two"));
        window.select_tab(&first);
        let notified = Arc::new(AtomicBool::new(false));
        let flag = notified.clone();
        window.on_deselecting(|event| event.cancel = true);
        window.on_selected(move |_| flag.store(true, Ordering::SeqCst));
        assert!(!window.select_index(1));
        assert!(first.is_active());
        assert!(!notified.load(Ordering::SeqCst));
    }

    #[test]
    fn selected_content_fills_area_below_strip() {
        let (window, _, _) = window();
        let doc = Doc::new("One");
        window.add_tab(doc.clone());
        let bounds = doc.bounds.lock().unwrap().unwrap();
        // 8 pixel borders, 36 pixel strip plus the top border above it.
        assert_eq!(bounds, Rect::new(0, 44, 984, 692 - 44));
    }

    #[test]
    fn closing_active_tab_selects_left_neighbour() {
        let (window, _, _) = window();
        let first = window.add_tab(Doc::new("One"));
        let second = window.add_tab(Doc::new("Two"));
        assert!(window.close_tab(&second));
        assert!(first.is_active());
        assert_eq!(window.tabs().len(), 1);
    }

    #[test]
    fn refused_close_keeps_tab() {
        let (window, _, _) = window();
        let doc = Doc::new("Busy");
        doc.allow_close.store(false, Ordering::SeqCst);
        let tab = window.add_tab(doc);
        assert!(!window.close_tab(&tab));
        assert!(window.tabs().contains(&tab));
    }

    #[test]
    fn cancelled_neighbour_selection_keeps_closing_tab() {
        let (window, _, _) = window();
        window.add_tab(Doc::new("One"));
        let doc = Doc::new("Two");
        let second = window.add_tab(doc.clone());
        window.on_selecting(|event| event.cancel = true);

        assert!(!window.close_tab(&second));

        assert!(window.tabs().contains(&second));
        assert!(second.is_active());
        assert_eq!(active_count(&window), 1);
        assert!(!doc.closed.load(Ordering::SeqCst));
    }

    #[test]
    fn cancelled_neighbour_selection_aborts_tear_off() {
        let (window, _, _) = window();
        window.add_tab(Doc::new("One"));
        let second = window.add_tab(Doc::new("Two"));
        window.on_deselecting(|event| event.cancel = true);

        assert!(!window.tear_off(Point::new(400, 400)));

        assert_eq!(window.tabs().len(), 2);
        assert!(second.is_active());
        assert!(!window.services.drag.is_dragging());
    }

    #[test]
    fn refused_window_close_leaves_every_tab() {
        let (window, host, _) = window();
        let first = Doc::new("One");
        let second = Doc::new("Two");
        let busy = Doc::new("Busy");
        busy.allow_close.store(false, Ordering::SeqCst);
        window.add_tab(first.clone());
        window.add_tab(second.clone());
        let last = window.add_tab(busy);
        let before = window.tabs().snapshot();

        assert!(!window.request_close());

        assert_eq!(window.tabs().snapshot(), before);
        assert!(last.is_active());
        assert!(!window.is_closed());
        assert!(!host.is_closed());
        assert!(!first.closed.load(Ordering::SeqCst));
        assert!(!second.closed.load(Ordering::SeqCst));
    }

    #[test]
    fn agreed_window_close_closes_all_content() {
        let (window, host, _) = window();
        let first = Doc::new("One");
        let second = Doc::new("Two");
        window.add_tab(first.clone());
        window.add_tab(second.clone());

        assert!(window.request_close());

        assert!(window.is_closed());
        assert!(host.is_closed());
        assert!(first.closed.load(Ordering::SeqCst));
        assert!(second.closed.load(Ordering::SeqCst));
    }

    #[test]
    fn closing_last_tab_closes_window() {
        let (window, host, handle) = window();
        let tab = window.add_tab(Doc::new("Only"));
        assert!(window.close_tab(&tab));
        assert!(window.is_closed());
        assert!(host.is_closed());
        assert!(handle.is_destroyed());
    }

    #[test]
    fn click_on_empty_strip_is_forwarded() {
        let (window, _, _) = window();
        window.add_tab(Doc::new("One"));
        let strip = window.drop_area().unwrap();
        let empty = Point::new(strip.right() - 5, strip.top() + 20);
        assert_eq!(
            window.handle_overlay_mouse(OverlayMouse::LeftDown, empty),
            ClickOutcome::Forward
        );
    }

    #[test]
    fn click_on_inactive_tab_selects_and_starts_reposition() {
        let (window, _, _) = window();
        let first = window.add_tab(Doc::new("One"));
        window.add_tab(Doc::new("Two"));
        let point = centre(&first, &window);
        assert_eq!(
            window.handle_overlay_mouse(OverlayMouse::LeftDown, point),
            ClickOutcome::Handled
        );
        assert!(first.is_active());
        assert!(window.is_repositioning());
        window.end_reposition();
        assert!(!window.is_repositioning());
    }

    #[test]
    fn middle_click_closes_tab() {
        let (window, _, _) = window();
        let first = window.add_tab(Doc::new("One"));
        window.add_tab(Doc::new("Two"));
        let point = centre(&first, &window);
        window.handle_overlay_mouse(OverlayMouse::MiddleUp, point);
        assert!(!window.tabs().contains(&first));
    }

    #[test]
    fn reposition_moves_selected_tab_right() {
        let (window, _, _) = window();
        let first = window.add_tab(Doc::new("One"));
        let second = window.add_tab(Doc::new("Two"));
        let third = window.add_tab(Doc::new("Three"));
        window.select_tab(&first);
        let target = centre(&third, &window);
        window.reposition_to(Point::new(target.x + 40, target.y));
        let order: Vec<_> = window.tabs().snapshot();
        assert_eq!(order, vec![second, third, first]);
    }

    #[test]
    fn reposition_presents_one_complete_frame() {
        let (window, _, handle) = window();
        let first = window.add_tab(Doc::new("One"));
        window.add_tab(Doc::new("Two"));
        let third = window.add_tab(Doc::new("Three"));
        window.select_tab(&first);
        let lens = Arc::new(Mutex::new(Vec::new()));
        let seen = lens.clone();
        let weak = Arc::downgrade(&window);
        window.tabs().on_collection_modified(move |_| {
            if let Some(window) = weak.upgrade() {
                seen.lock().unwrap().push(window.tabs().len());
            }
        });
        let presents = handle.present_count();

        let target = centre(&third, &window);
        window.reposition_to(Point::new(target.x + 40, target.y));

        assert_eq!(window.tabs().get(2), Some(first));
        assert_eq!(*lens.lock().unwrap(), vec![3]);
        assert_eq!(handle.present_count(), presents + 1);
    }

    #[test]
    fn maximize_toggle_restyles() {
        let (window, host, _) = window();
        window.add_tab(Doc::new("One"));
        let refreshes = host.frame_refreshes();
        window.toggle_maximize();
        assert_eq!(host.state(), WindowState::Maximized);
        assert!(host.frame_refreshes() > refreshes);
        assert_eq!(window.padding().top, 8);
        window.toggle_maximize();
        assert_eq!(host.state(), WindowState::Normal);
        assert_eq!(window.padding().top, 0);
    }

    #[test]
    fn close_is_idempotent() {
        let (window, _, _) = window();
        window.add_tab(Doc::new("One"));
        window.close();
        window.close();
        assert!(window.is_closed());
        assert!(window.tabs().is_empty());
        assert!(!window.render(true).unwrap());
    }
}
