//! Native host windows.
//!
//! A plain overlapped window is subclassed so its non-client messages reach
//! the [`TabbedWindow`] that owns it. Windows are looked up by id because the
//! subclass and the overlay exist before the tabbed window does.

use crate::app::WindowRequest;
use crate::error::{Result, TabStripError};
use crate::geometry::{Point, Rect};
use crate::overlay::{ClickOutcome, LayeredSurface, OverlayMouse, Win32LayeredSurface};
use crate::pipeline::drag::SurfaceThumbnailFactory;
use crate::pipeline::hook::DefaultHookBackend;
use crate::window::host::{HostWindow, WindowId, WindowState};
use crate::window::nc::{FrameMetrics, NcHit};
use crate::window::tabbed::{TabbedWindow, WindowParts};
use crate::window::theme::ThemeMode;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once, Weak};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Shell::{DefSubclassProc, RemoveWindowSubclass, SetWindowSubclass};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, GetForegroundWindow, GetWindowRect, IsIconic,
    IsWindow, IsWindowVisible, IsZoomed, RegisterClassW, SetWindowPos, ShowWindow,
    NCCALCSIZE_PARAMS, SIZE_MAXIMIZED, SIZE_MINIMIZED, SWP_FRAMECHANGED, SWP_NOACTIVATE,
    SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER, SW_HIDE, SW_MAXIMIZE, SW_MINIMIZE, SW_RESTORE, SW_SHOW,
    WA_INACTIVE, WINDOW_EX_STYLE, WM_ACTIVATE, WM_CLOSE, WM_DWMCOMPOSITIONCHANGED, WM_MOVE,
    WM_NCACTIVATE, WM_NCCALCSIZE, WM_NCDESTROY, WM_NCHITTEST, WM_SIZE, WM_SYSCOLORCHANGE,
    WM_THEMECHANGED, WNDCLASSW, WS_OVERLAPPEDWINDOW,
};

const HOST_SUBCLASS_ID: usize = 0x5442_5442;

static WINDOWS: Lazy<Mutex<HashMap<u64, Weak<TabbedWindow>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn lookup(id: u64) -> Option<Arc<TabbedWindow>> {
    WINDOWS.lock().ok()?.get(&id)?.upgrade()
}

/// Routes native messages of `window`'s host and overlay to it. Pass this
/// to [`crate::app::TabbedApplicationBuilder::on_window_opened`].
pub fn attach(window: &Arc<TabbedWindow>) {
    if let Ok(mut windows) = WINDOWS.lock() {
        windows.insert(window.id().value(), Arc::downgrade(window));
    }
}

fn widestring(value: &str) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;
    std::ffi::OsStr::new(value)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

fn lparam_point(lparam: LPARAM) -> Point {
    Point::new(
        (lparam.0 & 0xffff) as i16 as i32,
        ((lparam.0 >> 16) & 0xffff) as i16 as i32,
    )
}

unsafe extern "system" fn host_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

unsafe extern "system" fn host_subclass_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
    _subclass_id: usize,
    ref_data: usize,
) -> LRESULT {
    if msg == WM_NCDESTROY {
        unsafe {
            let _ = RemoveWindowSubclass(hwnd, Some(host_subclass_proc), HOST_SUBCLASS_ID);
        }
        if let Ok(mut windows) = WINDOWS.lock() {
            windows.remove(&(ref_data as u64));
        }
        return unsafe { DefSubclassProc(hwnd, msg, wparam, lparam) };
    }
    let Some(window) = lookup(ref_data as u64) else {
        return unsafe { DefSubclassProc(hwnd, msg, wparam, lparam) };
    };

    match msg {
        WM_NCACTIVATE => {
            window.on_activate(wparam.0 != 0);
            // -1 keeps the default handler from repainting the native caption.
            unsafe { DefSubclassProc(hwnd, msg, wparam, LPARAM(-1)) }
        }
        WM_ACTIVATE => {
            let result = unsafe { DefSubclassProc(hwnd, msg, wparam, lparam) };
            window.on_activate((wparam.0 & 0xffff) as u32 != WA_INACTIVE);
            result
        }
        WM_NCCALCSIZE if wparam.0 != 0 => {
            let params = unsafe { &mut *(lparam.0 as *mut NCCALCSIZE_PARAMS) };
            let padding = window.padding();
            let rect = &mut params.rgrc[0];
            rect.left += padding.left;
            rect.top += padding.top;
            rect.right -= padding.right;
            rect.bottom -= padding.bottom;
            LRESULT(0)
        }
        WM_NCHITTEST => {
            let native = unsafe { DefSubclassProc(hwnd, msg, wparam, lparam) };
            let hit = window.on_hit_test(NcHit::from_raw(native.0 as u32), lparam_point(lparam));
            LRESULT(hit.to_raw() as isize)
        }
        WM_SIZE => {
            let result = unsafe { DefSubclassProc(hwnd, msg, wparam, lparam) };
            let state = match wparam.0 as u32 {
                SIZE_MINIMIZED => WindowState::Minimized,
                SIZE_MAXIMIZED => WindowState::Maximized,
                _ => WindowState::Normal,
            };
            window.on_size(state);
            result
        }
        WM_MOVE => {
            let result = unsafe { DefSubclassProc(hwnd, msg, wparam, lparam) };
            window.on_move();
            result
        }
        WM_THEMECHANGED | WM_SYSCOLORCHANGE | WM_DWMCOMPOSITIONCHANGED => {
            let result = unsafe { DefSubclassProc(hwnd, msg, wparam, lparam) };
            window.on_theme_changed(ThemeMode::detect());
            result
        }
        WM_CLOSE => {
            window.request_close();
            LRESULT(0)
        }
        _ => unsafe { DefSubclassProc(hwnd, msg, wparam, lparam) },
    }
}

/// Top-level window whose caption is replaced by a tab strip.
pub struct Win32HostWindow {
    id: WindowId,
    hwnd: isize,
}

unsafe impl Send for Win32HostWindow {}
unsafe impl Sync for Win32HostWindow {}

impl Win32HostWindow {
    pub fn create(title: &str, request: &WindowRequest) -> Result<Self> {
        static REGISTER_CLASS: Once = Once::new();
        let class_name = widestring("TitlebarTabsHost");
        let title = widestring(title);
        let hinstance = unsafe { GetModuleHandleW(PCWSTR::null()) }
            .map_err(|err| TabStripError::WindowCreation(err.to_string()))?;

        REGISTER_CLASS.call_once(|| unsafe {
            let wc = WNDCLASSW {
                hInstance: hinstance.into(),
                lpszClassName: PCWSTR(class_name.as_ptr()),
                lpfnWndProc: Some(host_wndproc),
                ..Default::default()
            };
            let _ = RegisterClassW(&wc);
        });

        let bounds = request.bounds;
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE(0),
                PCWSTR(class_name.as_ptr()),
                PCWSTR(title.as_ptr()),
                WS_OVERLAPPEDWINDOW,
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height,
                HWND::default(),
                None,
                hinstance,
                None,
            )
        }
        .map_err(|err| TabStripError::WindowCreation(err.to_string()))?;

        let id = WindowId::next();
        let subclassed = unsafe {
            SetWindowSubclass(
                hwnd,
                Some(host_subclass_proc),
                HOST_SUBCLASS_ID,
                id.value() as usize,
            )
        };
        if !subclassed.as_bool() {
            unsafe {
                let _ = DestroyWindow(hwnd);
            }
            return Err(TabStripError::WindowCreation(
                "failed to subclass host window".to_string(),
            ));
        }
        tracing::debug!(window = id.value(), hwnd = hwnd.0 as isize, "created host window");
        Ok(Self {
            id,
            hwnd: hwnd.0 as isize,
        })
    }

    pub fn hwnd(&self) -> HWND {
        HWND(self.hwnd as *mut _)
    }

    fn apply_state(&self, state: WindowState) {
        let command = match state {
            WindowState::Normal => SW_RESTORE,
            WindowState::Minimized => SW_MINIMIZE,
            WindowState::Maximized => SW_MAXIMIZE,
        };
        unsafe {
            let _ = ShowWindow(self.hwnd(), command);
        }
    }
}

impl HostWindow for Win32HostWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn bounds(&self) -> Rect {
        let mut rect = RECT::default();
        if unsafe { GetWindowRect(self.hwnd(), &mut rect) }.is_err() {
            return Rect::default();
        }
        Rect::from_ltrb(rect.left, rect.top, rect.right, rect.bottom)
    }

    fn set_bounds(&self, bounds: Rect) {
        unsafe {
            let _ = SetWindowPos(
                self.hwnd(),
                HWND::default(),
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height,
                SWP_NOZORDER | SWP_NOACTIVATE,
            );
        }
    }

    fn state(&self) -> WindowState {
        unsafe {
            if IsIconic(self.hwnd()).as_bool() {
                WindowState::Minimized
            } else if IsZoomed(self.hwnd()).as_bool() {
                WindowState::Maximized
            } else {
                WindowState::Normal
            }
        }
    }

    fn set_state(&self, state: WindowState) {
        self.apply_state(state);
    }

    fn is_active(&self) -> bool {
        unsafe { GetForegroundWindow() == self.hwnd() }
    }

    fn is_visible(&self) -> bool {
        unsafe { IsWindowVisible(self.hwnd()).as_bool() }
    }

    fn show(&self) {
        unsafe {
            let _ = ShowWindow(self.hwnd(), SW_SHOW);
        }
    }

    fn hide(&self) {
        unsafe {
            let _ = ShowWindow(self.hwnd(), SW_HIDE);
        }
    }

    fn close(&self) {
        unsafe {
            if IsWindow(self.hwnd()).as_bool() {
                let _ = DestroyWindow(self.hwnd());
            }
        }
    }

    fn frame_metrics(&self) -> FrameMetrics {
        FrameMetrics::system()
    }

    fn refresh_frame(&self) {
        unsafe {
            let _ = SetWindowPos(
                self.hwnd(),
                HWND::default(),
                0,
                0,
                0,
                0,
                SWP_FRAMECHANGED | SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE,
            );
        }
    }
}

/// Window factory for [`crate::app::TabbedApplicationBuilder::window_factory`]:
/// a subclassed host, its layered overlay and a low-level mouse hook.
pub fn create_window_parts(title: &str, request: &WindowRequest) -> anyhow::Result<WindowParts> {
    let host = Win32HostWindow::create(title, request)?;
    let id = host.id().value();
    let surface = Win32LayeredSurface::create(
        host.hwnd(),
        Arc::new(move |kind: OverlayMouse, point: Point| match lookup(id) {
            Some(window) => window.handle_overlay_mouse(kind, point),
            None => ClickOutcome::Forward,
        }),
    )?;
    Ok(WindowParts {
        host: Arc::new(host),
        surface: Box::new(surface),
        hook: Box::new(DefaultHookBackend::default()),
    })
}

/// Thumbnails drawn on unowned layered windows.
pub fn thumbnail_factory(opacity: f32) -> SurfaceThumbnailFactory {
    SurfaceThumbnailFactory::new(
        || {
            let surface = Win32LayeredSurface::create_click_through()?;
            Ok(Box::new(surface) as Box<dyn LayeredSurface>)
        },
        opacity,
    )
}
