//! Non-client frame math shared by the Win32 window procedure and tests.

use crate::geometry::{Point, Rect};
use crate::window::host::WindowState;

/// Measured frame thicknesses of a sizable top-level window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMetrics {
    /// Horizontal resize border, padded border included.
    pub border_width: i32,
    /// Vertical resize border, padded border included.
    pub border_height: i32,
    pub caption_height: i32,
    /// Width of the native minimize, maximize and close buttons together.
    pub caption_buttons_width: i32,
}

impl Default for FrameMetrics {
    fn default() -> Self {
        Self {
            border_width: 8,
            border_height: 8,
            caption_height: 23,
            caption_buttons_width: 138,
        }
    }
}

impl FrameMetrics {
    #[cfg(windows)]
    pub fn system() -> Self {
        use windows::Win32::UI::WindowsAndMessaging::{
            GetSystemMetrics, SM_CXPADDEDBORDER, SM_CXSIZE, SM_CXSIZEFRAME, SM_CYCAPTION,
            SM_CYSIZEFRAME,
        };
        unsafe {
            let padding = GetSystemMetrics(SM_CXPADDEDBORDER);
            Self {
                border_width: GetSystemMetrics(SM_CXSIZEFRAME) + padding,
                border_height: GetSystemMetrics(SM_CYSIZEFRAME) + padding,
                caption_height: GetSystemMetrics(SM_CYCAPTION),
                caption_buttons_width: GetSystemMetrics(SM_CXSIZE) * 3,
            }
        }
    }

    #[cfg(not(windows))]
    pub fn system() -> Self {
        Self::default()
    }
}

/// Result of a non-client hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NcHit {
    Nowhere,
    Client,
    Caption,
    SysMenu,
    MinButton,
    MaxButton,
    CloseButton,
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl NcHit {
    pub fn is_system_button(self) -> bool {
        matches!(
            self,
            NcHit::SysMenu | NcHit::MinButton | NcHit::MaxButton | NcHit::CloseButton
        )
    }

    #[cfg(windows)]
    pub fn from_raw(code: u32) -> Self {
        use windows::Win32::UI::WindowsAndMessaging::*;
        match code {
            HTCLIENT => NcHit::Client,
            HTCAPTION => NcHit::Caption,
            HTSYSMENU => NcHit::SysMenu,
            HTMINBUTTON => NcHit::MinButton,
            HTMAXBUTTON => NcHit::MaxButton,
            HTCLOSE => NcHit::CloseButton,
            HTLEFT => NcHit::Left,
            HTRIGHT => NcHit::Right,
            HTTOP => NcHit::Top,
            HTBOTTOM => NcHit::Bottom,
            HTTOPLEFT => NcHit::TopLeft,
            HTTOPRIGHT => NcHit::TopRight,
            HTBOTTOMLEFT => NcHit::BottomLeft,
            HTBOTTOMRIGHT => NcHit::BottomRight,
            _ => NcHit::Nowhere,
        }
    }

    #[cfg(windows)]
    pub fn to_raw(self) -> u32 {
        use windows::Win32::UI::WindowsAndMessaging::*;
        match self {
            NcHit::Nowhere => HTNOWHERE,
            NcHit::Client => HTCLIENT,
            NcHit::Caption => HTCAPTION,
            NcHit::SysMenu => HTSYSMENU,
            NcHit::MinButton => HTMINBUTTON,
            NcHit::MaxButton => HTMAXBUTTON,
            NcHit::CloseButton => HTCLOSE,
            NcHit::Left => HTLEFT,
            NcHit::Right => HTRIGHT,
            NcHit::Top => HTTOP,
            NcHit::Bottom => HTBOTTOM,
            NcHit::TopLeft => HTTOPLEFT,
            NcHit::TopRight => HTTOPRIGHT,
            NcHit::BottomLeft => HTBOTTOMLEFT,
            NcHit::BottomRight => HTBOTTOMRIGHT,
        }
    }
}

/// Replaces the native hit-test result with one derived from a 3x3 grid.
///
/// System buttons and the system menu pass through. Rows are the top border,
/// the tab strip, the body and the bottom border; the top border row only
/// exists inside the measured border thickness so the strip itself drags the
/// window. A maximized window has no resize borders.
pub fn resolve_hit_test(
    native: NcHit,
    window: Rect,
    point: Point,
    frame: &FrameMetrics,
    strip_height: i32,
    state: WindowState,
) -> NcHit {
    if native.is_system_button() {
        return native;
    }
    if !window.contains(point) {
        return NcHit::Nowhere;
    }

    let maximized = state == WindowState::Maximized;
    let (bw, bh) = if maximized {
        (0, 0)
    } else {
        (frame.border_width, frame.border_height)
    };
    let strip_bottom = window.top() + frame.border_height + strip_height;

    #[derive(PartialEq)]
    enum Col {
        Left,
        Middle,
        Right,
    }
    let col = if point.x < window.left() + bw {
        Col::Left
    } else if point.x >= window.right() - bw {
        Col::Right
    } else {
        Col::Middle
    };

    if point.y < window.top() + bh {
        return match col {
            Col::Left => NcHit::TopLeft,
            Col::Middle => NcHit::Top,
            Col::Right => NcHit::TopRight,
        };
    }
    if point.y >= window.bottom() - bh {
        return match col {
            Col::Left => NcHit::BottomLeft,
            Col::Middle => NcHit::Bottom,
            Col::Right => NcHit::BottomRight,
        };
    }
    match col {
        Col::Left => NcHit::Left,
        Col::Right => NcHit::Right,
        Col::Middle if point.y < strip_bottom => NcHit::Caption,
        Col::Middle => NcHit::Client,
    }
}

/// Insets between the window rectangle and its client area once the native
/// caption has been removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NcPadding {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    /// Height at the top of the client area covered by the tab strip.
    pub strip: i32,
}

impl NcPadding {
    /// A maximized window hangs its frame off-screen, so the top inset grows to
    /// the border thickness to keep the strip visible.
    pub fn compute(frame: &FrameMetrics, strip_height: i32, state: WindowState) -> Self {
        let top = if state == WindowState::Maximized {
            frame.border_height
        } else {
            0
        };
        Self {
            left: frame.border_width,
            top,
            right: frame.border_width,
            bottom: frame.border_height,
            strip: strip_height + if top == 0 { frame.border_height } else { 0 },
        }
    }

    pub fn client_rect(&self, window: Rect) -> Rect {
        Rect::from_ltrb(
            window.left() + self.left,
            window.top() + self.top,
            window.right() - self.right,
            window.bottom() - self.bottom,
        )
    }

    /// Area left for the selected tab's content.
    pub fn content_rect(&self, window: Rect) -> Rect {
        let client = self.client_rect(window);
        Rect::from_ltrb(
            client.left(),
            (client.top() + self.strip).min(client.bottom()),
            client.right(),
            client.bottom(),
        )
    }
}

/// How the host reacts to a size message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeReaction {
    /// Maximize/restore toggled: recompute padding and redraw everything.
    Restyle,
    /// Plain move or resize: only reposition the overlay and the content.
    Reposition,
}

/// Remembers the last shown state to classify size messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeTracker {
    last_shown: WindowState,
}

impl SizeTracker {
    pub fn new(initial: WindowState) -> Self {
        Self {
            last_shown: initial,
        }
    }

    pub fn observe(&mut self, state: WindowState) -> SizeReaction {
        if state == WindowState::Minimized {
            return SizeReaction::Reposition;
        }
        let toggled = state != self.last_shown;
        self.last_shown = state;
        if toggled {
            SizeReaction::Restyle
        } else {
            SizeReaction::Reposition
        }
    }
}
