//! Consumer side of the mouse pipeline.
//!
//! One thread per window drains the hook channel and turns raw events into
//! hover updates, tab repositioning, tear-off, combine and release. Every step
//! that touches a window goes through the [`UiDispatcher`].

use crate::app::TabbedApplication;
use crate::error::Result;
use crate::geometry::Point;
use crate::pipeline::dispatch::{invoke, UiDispatcher};
use crate::pipeline::drag::{DragCoordinator, DropArea, TornTab};
use crate::pipeline::hook::{DoubleClickDetector, HookBackend, HookSink, MouseMessage, RawMouseEvent};
use crate::window::host::WindowId;
use crate::window::tabbed::TabbedWindow;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;

/// Everything the consumer thread needs to reach its window.
#[derive(Clone)]
pub struct PipelineContext {
    pub window: Weak<TabbedWindow>,
    pub window_id: WindowId,
    pub app: Weak<TabbedApplication>,
    pub drag: Arc<DragCoordinator>,
    pub dispatcher: Arc<dyn UiDispatcher>,
    pub tear_distance: i32,
}

/// A window's hook registration plus the thread that interprets its events.
pub struct MousePipeline {
    hook: Box<dyn HookBackend>,
    consumer: Option<JoinHandle<()>>,
    dispatcher: Arc<dyn UiDispatcher>,
    window_id: WindowId,
}

impl MousePipeline {
    /// Spawns the consumer and installs the hook feeding it.
    pub fn start(
        mut hook: Box<dyn HookBackend>,
        double_click: DoubleClickDetector,
        context: PipelineContext,
    ) -> anyhow::Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let window_id = context.window_id;
        let dispatcher = Arc::clone(&context.dispatcher);
        let interpreter = Interpreter::new(context);
        let consumer = std::thread::Builder::new()
            .name(format!("tab-mouse-{}", window_id.value()))
            .spawn(move || {
                raise_priority();
                interpreter.run(receiver);
            })?;
        // The consumer exits by itself once the sink is dropped with the
        // failed install.
        hook.install(HookSink::new(sender, double_click))?;
        tracing::debug!(window = window_id.value(), "mouse pipeline started");
        Ok(Self {
            hook,
            consumer: Some(consumer),
            dispatcher,
            window_id,
        })
    }

    pub fn is_running(&self) -> bool {
        self.hook.is_installed()
    }

    /// Uninstalls the hook, which closes the channel, and waits for the
    /// consumer to drain what is left. The wait is skipped when called from
    /// the consumer itself or from the UI thread the consumer may be
    /// blocked on.
    pub fn shutdown(&mut self) {
        if let Err(err) = self.hook.uninstall() {
            tracing::warn!(?err, window = self.window_id.value(), "failed to uninstall mouse hook");
        }
        let Some(consumer) = self.consumer.take() else {
            return;
        };
        let on_consumer = consumer.thread().id() == std::thread::current().id();
        if on_consumer || self.dispatcher.is_ui_thread() {
            tracing::debug!(window = self.window_id.value(), "mouse pipeline detached");
            return;
        }
        if consumer.join().is_err() {
            tracing::warn!(window = self.window_id.value(), "mouse pipeline thread panicked");
        }
        tracing::debug!(window = self.window_id.value(), "mouse pipeline stopped");
    }
}

impl Drop for MousePipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(windows)]
fn raise_priority() {
    use windows::Win32::System::Threading::{
        GetCurrentThread, SetThreadPriority, THREAD_PRIORITY_ABOVE_NORMAL,
    };
    unsafe {
        let _ = SetThreadPriority(GetCurrentThread(), THREAD_PRIORITY_ABOVE_NORMAL);
    }
}

#[cfg(not(windows))]
fn raise_priority() {}

struct Interpreter {
    context: PipelineContext,
    /// Last two press positions, oldest first.
    clicks: [Option<Point>; 2],
    was_dragging: bool,
    /// This window's pipeline owns the tab currently in flight.
    torn: bool,
}

impl Interpreter {
    fn new(context: PipelineContext) -> Self {
        Self {
            context,
            clicks: [None, None],
            was_dragging: false,
            torn: false,
        }
    }

    fn run(mut self, events: Receiver<RawMouseEvent>) {
        while let Ok(event) = events.recv() {
            if let Err(err) = self.handle(event) {
                tracing::warn!(
                    ?err,
                    window = self.context.window_id.value(),
                    message = ?event.message,
                    "failed to interpret mouse event"
                );
            }
        }
        tracing::debug!(window = self.context.window_id.value(), "mouse pipeline drained");
    }

    fn handle(&mut self, event: RawMouseEvent) -> Result<()> {
        match event.message {
            MouseMessage::Move => self.on_move(event.point),
            MouseMessage::LeftDown => {
                self.clicks = [self.clicks[1], Some(event.point)];
                self.was_dragging = false;
                Ok(())
            }
            MouseMessage::LeftUp => {
                self.on_left_up(event.point);
                Ok(())
            }
            MouseMessage::LeftDoubleClick => self.on_double_click(event.point),
            _ => Ok(()),
        }
    }

    /// Runs `f` against the window on the UI thread and waits for the result.
    /// `None` when the window is gone.
    fn query<R, F>(&self, f: F) -> Result<Option<R>>
    where
        R: Send + 'static,
        F: FnOnce(&TabbedWindow) -> R + Send + 'static,
    {
        let window = self.context.window.clone();
        invoke(self.context.dispatcher.as_ref(), move || {
            window.upgrade().map(|window| f(&window))
        })
    }

    fn post<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&TabbedWindow) + Send + 'static,
    {
        let window = self.context.window.clone();
        self.context.dispatcher.post(Box::new(move || {
            if let Some(window) = window.upgrade() {
                f(&window);
            }
        }))
    }

    fn on_move(&mut self, point: Point) -> Result<()> {
        if self.torn {
            self.context.drag.move_thumbnail(point);
            if let Some(target) = self.context.drag.drop_target(point) {
                self.combine(target, point)?;
            }
            return Ok(());
        }

        let state = self.query(|window| (window.is_repositioning(), window.drop_area()))?;
        let Some((repositioning, strip)) = state else {
            return Ok(());
        };
        if !repositioning {
            return self.post(move |window| window.pointer_moved(point));
        }

        self.was_dragging = true;
        let tear = self.context.tear_distance;
        let outside = strip.is_some_and(|strip| !strip.inflate(tear, tear).contains(point));
        if outside {
            self.torn = self
                .query(move |window| window.tear_off(point))?
                .unwrap_or(false);
            return Ok(());
        }
        self.post(move |window| window.reposition_to(point))
    }

    /// Hands the torn tab to the window under the cursor and closes the
    /// source when it has nothing left.
    fn combine(&mut self, target: DropArea, point: Point) -> Result<()> {
        self.torn = false;
        let Some(torn) = self.context.drag.take() else {
            return Ok(());
        };
        let source = self.context.window.clone();
        let app = self.context.app.clone();
        invoke(self.context.dispatcher.as_ref(), move || {
            match target.window.upgrade() {
                Some(window) if !window.is_closed() => {
                    window.merge_tab(Arc::clone(&torn.tab), point);
                }
                _ => {
                    tracing::warn!(
                        window = target.window_id.value(),
                        "drop target closed, opening a new window"
                    );
                    release_to_new_window(&app, &source, torn, point);
                    return;
                }
            }
            if let Some(source) = source.upgrade() {
                source.close_if_empty();
            }
        })
    }

    fn on_left_up(&mut self, point: Point) {
        if self.torn {
            self.torn = false;
            let Some(torn) = self.context.drag.take() else {
                return;
            };
            if let Some(target) = torn
                .drop_areas
                .iter()
                .find(|area| area.area.contains(point))
                .cloned()
            {
                let window = target.window.clone();
                let source = self.context.window.clone();
                let app = self.context.app.clone();
                let result = invoke(self.context.dispatcher.as_ref(), move || {
                    match window.upgrade() {
                        Some(window) if !window.is_closed() => {
                            window.merge_tab(Arc::clone(&torn.tab), point);
                            if let Some(source) = source.upgrade() {
                                source.close_if_empty();
                            }
                        }
                        _ => release_to_new_window(&app, &source, torn, point),
                    }
                });
                if let Err(err) = result {
                    tracing::warn!(?err, "failed to dispatch tab drop");
                }
                return;
            }
            let source = self.context.window.clone();
            let app = self.context.app.clone();
            if let Err(err) = invoke(self.context.dispatcher.as_ref(), move || {
                release_to_new_window(&app, &source, torn, point)
            }) {
                tracing::warn!(?err, "failed to dispatch tab release");
            }
            return;
        }

        if self.was_dragging {
            tracing::debug!(
                window = self.context.window_id.value(),
                clicks = ?self.clicks,
                "drag finished"
            );
        }
        self.was_dragging = false;
        if let Err(err) = self.post(|window| window.end_reposition()) {
            tracing::warn!(?err, "failed to dispatch mouse-up");
        }
    }

    /// Every window's hook sees the click; only the active window under it
    /// toggles.
    fn on_double_click(&mut self, point: Point) -> Result<()> {
        self.post(move |window| {
            if window.host().is_active()
                && window.drop_area().is_some_and(|area| area.contains(point))
            {
                window.toggle_maximize();
            }
        })
    }
}

/// Opens a new window for a tab released outside every strip. The new window
/// mirrors a maximized source; otherwise it opens under the cursor with the
/// source's size.
fn release_to_new_window(
    app: &Weak<TabbedApplication>,
    source: &Weak<TabbedWindow>,
    torn: TornTab,
    cursor: Point,
) {
    let source = source.upgrade();
    let Some(app) = app.upgrade() else {
        tracing::warn!("application gone, torn tab dropped");
        torn.tab.content().close();
        return;
    };
    let source_state = source
        .as_ref()
        .map(|window| (window.host().state(), window.host().bounds()));
    match app.spawn_window_with(torn.tab, cursor, source_state) {
        Ok(window) => {
            tracing::debug!(window = window.id().value(), "torn tab released to new window");
        }
        Err(err) => tracing::error!(?err, "failed to open window for torn tab"),
    }
    if let Some(source) = source {
        source.close_if_empty();
    }
}
