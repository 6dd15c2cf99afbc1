use crate::geometry::Rect;
use crate::pixels::PixelBuffer;
use crate::window::host::WindowId;
use std::sync::Arc;

/// The embedded content a tab hosts.
///
/// Implementations usually wrap a child window owned by the embedding
/// application; the tab strip only needs its title, an optional icon and a
/// way to size and close it.
pub trait TabContent: Send + Sync {
    /// Source of the tab caption. Read again on every render pass.
    fn title(&self) -> String;

    fn icon(&self) -> Option<Arc<PixelBuffer>> {
        None
    }

    /// Resizes the content to fill the client area beneath the tab strip.
    fn set_bounds(&self, bounds: Rect);

    /// Shows or hides the content when its tab gains or loses selection.
    fn set_visible(&self, _visible: bool) {}

    /// Asks the content whether it may close. Returning `false` cancels the
    /// close and leaves the tab untouched.
    fn request_close(&self) -> bool {
        true
    }

    /// Blocks until the content's native handle exists. Content created on
    /// another execution context must be ready before it is reparented.
    fn wait_until_ready(&self) {}

    /// Moves the content under a new host window.
    fn attach_to(&self, _host: WindowId) {}

    /// Final teardown once the tab has been removed for good.
    fn close(&self) {}
}
