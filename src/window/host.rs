use crate::geometry::Rect;
use crate::window::nc::FrameMetrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    pub fn next() -> Self {
        Self(NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowState {
    #[default]
    Normal,
    Minimized,
    Maximized,
}

/// The top-level window whose caption the tab strip replaces.
///
/// Every call happens on the UI thread. Bounds are screen coordinates of the
/// whole window including its frame.
pub trait HostWindow: Send + Sync {
    fn id(&self) -> WindowId;

    fn bounds(&self) -> Rect;

    fn set_bounds(&self, bounds: Rect);

    fn state(&self) -> WindowState;

    fn set_state(&self, state: WindowState);

    fn is_active(&self) -> bool;

    fn is_visible(&self) -> bool;

    fn show(&self);

    fn hide(&self);

    /// Destroys the native window. Calling it twice is harmless.
    fn close(&self);

    /// Window opacity, used as the constant alpha of the overlay blit.
    fn opacity(&self) -> u8 {
        255
    }

    fn frame_metrics(&self) -> FrameMetrics {
        FrameMetrics::default()
    }

    /// Asks the platform to recompute the non-client frame and repaint.
    fn refresh_frame(&self) {}
}

#[derive(Debug, Clone)]
struct HeadlessState {
    bounds: Rect,
    state: WindowState,
    active: bool,
    visible: bool,
    closed: bool,
    frame_refreshes: usize,
}

/// In-memory host used off Windows and in tests.
#[derive(Debug)]
pub struct HeadlessHost {
    id: WindowId,
    state: Mutex<HeadlessState>,
}

impl HeadlessHost {
    pub fn new(bounds: Rect) -> Self {
        Self {
            id: WindowId::next(),
            state: Mutex::new(HeadlessState {
                bounds,
                state: WindowState::Normal,
                active: true,
                visible: false,
                closed: false,
                frame_refreshes: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_active(&self, active: bool) {
        self.lock().active = active;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn frame_refreshes(&self) -> usize {
        self.lock().frame_refreshes
    }
}

impl HostWindow for HeadlessHost {
    fn id(&self) -> WindowId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.lock().bounds
    }

    fn set_bounds(&self, bounds: Rect) {
        self.lock().bounds = bounds;
    }

    fn state(&self) -> WindowState {
        self.lock().state
    }

    fn set_state(&self, state: WindowState) {
        self.lock().state = state;
    }

    fn is_active(&self) -> bool {
        self.lock().active
    }

    fn is_visible(&self) -> bool {
        let state = self.lock();
        state.visible && !state.closed
    }

    fn show(&self) {
        self.lock().visible = true;
    }

    fn hide(&self) {
        self.lock().visible = false;
    }

    fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.visible = false;
    }

    fn refresh_frame(&self) {
        self.lock().frame_refreshes += 1;
    }
}
