pub mod host;
pub mod nc;
pub mod tabbed;
pub mod theme;
#[cfg(windows)]
pub mod win32;

pub use host::{HeadlessHost, HostWindow, WindowId, WindowState};
pub use nc::{FrameMetrics, NcHit, NcPadding, SizeReaction};
pub use tabbed::{TabSelectionEvent, TabbedWindow, WindowParts, WindowServices};
pub use theme::ThemeMode;
