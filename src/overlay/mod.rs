pub mod compositor;
pub mod surface;

pub use compositor::{ClickOutcome, Overlay, OverlayHit, OverlayMouse};
pub use surface::{LayeredSurface, MemorySurface, MemorySurfaceHandle, PresentedFrame};
#[cfg(windows)]
pub use surface::Win32LayeredSurface;
