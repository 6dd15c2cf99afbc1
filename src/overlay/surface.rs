use crate::error::{Result, TabStripError};
use crate::geometry::Rect;
use crate::pixels::PixelBuffer;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A borderless per-pixel-alpha window that shows one composited frame.
pub trait LayeredSurface: Send {
    /// Blends `image` onto the screen at `bounds` using source-over with the
    /// image's own alpha channel and `opacity` as constant alpha.
    fn present(&mut self, image: &PixelBuffer, bounds: Rect, opacity: u8) -> Result<()>;

    fn hide(&mut self);

    /// Releases the native window. Further presents are ignored.
    fn destroy(&mut self);
}

/// A frame captured by [`MemorySurface`].
#[derive(Debug, Clone)]
pub struct PresentedFrame {
    pub image: PixelBuffer,
    pub bounds: Rect,
    pub opacity: u8,
}

#[derive(Debug, Default)]
struct MemoryState {
    last: Option<PresentedFrame>,
    presents: usize,
    visible: bool,
    destroyed: bool,
    fail_with: Option<i32>,
}

/// Portable surface that keeps the last frame in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    state: Arc<Mutex<MemoryState>>,
}

/// Inspection side of a [`MemorySurface`] that stays with the caller.
#[derive(Debug, Clone)]
pub struct MemorySurfaceHandle {
    state: Arc<Mutex<MemoryState>>,
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemorySurface {
    pub fn new() -> (Self, MemorySurfaceHandle) {
        let state = Arc::new(Mutex::new(MemoryState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MemorySurfaceHandle { state },
        )
    }
}

impl LayeredSurface for MemorySurface {
    fn present(&mut self, image: &PixelBuffer, bounds: Rect, opacity: u8) -> Result<()> {
        let mut state = lock(&self.state);
        if state.destroyed {
            return Ok(());
        }
        if let Some(code) = state.fail_with {
            return Err(TabStripError::Blit { code });
        }
        state.presents += 1;
        state.visible = true;
        state.last = Some(PresentedFrame {
            image: image.clone(),
            bounds,
            opacity,
        });
        Ok(())
    }

    fn hide(&mut self) {
        lock(&self.state).visible = false;
    }

    fn destroy(&mut self) {
        let mut state = lock(&self.state);
        state.destroyed = true;
        state.visible = false;
    }
}

impl MemorySurfaceHandle {
    pub fn last_frame(&self) -> Option<PresentedFrame> {
        lock(&self.state).last.clone()
    }

    pub fn present_count(&self) -> usize {
        lock(&self.state).presents
    }

    pub fn is_visible(&self) -> bool {
        lock(&self.state).visible
    }

    pub fn is_destroyed(&self) -> bool {
        lock(&self.state).destroyed
    }

    /// Makes every following present fail with `code`.
    pub fn fail_presents_with(&self, code: i32) {
        lock(&self.state).fail_with = Some(code);
    }
}

#[cfg(windows)]
pub use platform::Win32LayeredSurface;

#[cfg(windows)]
mod platform {
    use super::LayeredSurface;
    use crate::error::{Result, TabStripError};
    use crate::geometry::{Point, Rect};
    use crate::overlay::compositor::{ClickOutcome, OverlayMouse};
    use crate::pixels::PixelBuffer;
    use once_cell::sync::Lazy;
    use std::collections::HashMap;
    use std::mem;
    use std::ptr;
    use std::sync::{Arc, Mutex, Once};
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, POINT, SIZE, WPARAM};
    use windows::Win32::Graphics::Gdi::{
        CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, GetDC, ReleaseDC,
        SelectObject, AC_SRC_ALPHA, AC_SRC_OVER, BITMAPINFO, BITMAPINFOHEADER, BI_RGB,
        BLENDFUNCTION, DIB_RGB_COLORS, HBITMAP, HDC, HGDIOBJ,
    };
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DestroyWindow, PostMessageW, RegisterClassW, ShowWindow,
        UpdateLayeredWindow, HTCAPTION, HTTRANSPARENT, SW_HIDE, ULW_ALPHA, WINDOW_EX_STYLE,
        WM_NCHITTEST, WM_NCLBUTTONDBLCLK, WM_NCLBUTTONDOWN, WM_NCMBUTTONUP, WNDCLASSW,
        WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TRANSPARENT, WS_POPUP,
    };

    /// Routes clicks on the overlay to its tabbed window.
    pub type ClickSink = Arc<dyn Fn(OverlayMouse, Point) -> ClickOutcome + Send + Sync>;

    struct Route {
        host: isize,
        sink: ClickSink,
    }

    static ROUTES: Lazy<Mutex<HashMap<isize, Route>>> = Lazy::new(|| Mutex::new(HashMap::new()));

    pub fn compose_overlay_window_ex_style() -> WINDOW_EX_STYLE {
        WS_EX_LAYERED | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE
    }

    /// Drag thumbnails let every click fall through to whatever is below.
    pub fn compose_thumbnail_window_ex_style() -> WINDOW_EX_STYLE {
        compose_overlay_window_ex_style() | WS_EX_TRANSPARENT
    }

    fn is_routed(hwnd: HWND) -> bool {
        ROUTES
            .lock()
            .map(|routes| routes.contains_key(&(hwnd.0 as isize)))
            .unwrap_or(false)
    }

    fn widestring(value: &str) -> Vec<u16> {
        use std::os::windows::ffi::OsStrExt;
        std::ffi::OsStr::new(value)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    }

    unsafe extern "system" fn overlay_wndproc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        match msg {
            // Answering caption keeps activation with the host window.
            WM_NCHITTEST if is_routed(hwnd) => LRESULT(HTCAPTION as isize),
            WM_NCHITTEST => LRESULT(HTTRANSPARENT as isize),
            WM_NCLBUTTONDOWN | WM_NCLBUTTONDBLCLK | WM_NCMBUTTONUP => {
                let x = (lparam.0 & 0xffff) as i16 as i32;
                let y = ((lparam.0 >> 16) & 0xffff) as i16 as i32;
                let kind = match msg {
                    WM_NCLBUTTONDOWN => OverlayMouse::LeftDown,
                    WM_NCLBUTTONDBLCLK => OverlayMouse::LeftDoubleClick,
                    _ => OverlayMouse::MiddleUp,
                };
                let route = ROUTES
                    .lock()
                    .ok()
                    .and_then(|routes| {
                        routes
                            .get(&(hwnd.0 as isize))
                            .map(|route| (route.host, Arc::clone(&route.sink)))
                    });
                if let Some((host, sink)) = route {
                    if sink(kind, Point::new(x, y)) == ClickOutcome::Forward {
                        let _ = unsafe {
                            PostMessageW(
                                HWND(host as *mut _),
                                msg,
                                WPARAM(HTCAPTION as usize),
                                lparam,
                            )
                        };
                    }
                }
                LRESULT(0)
            }
            _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        }
    }

    /// Screen and memory DCs plus the DIB selected into the latter, released
    /// on every exit path of a present.
    struct BlitGuard {
        screen_dc: HDC,
        mem_dc: HDC,
        dib: HBITMAP,
        old_bitmap: HGDIOBJ,
    }

    impl Drop for BlitGuard {
        fn drop(&mut self) {
            unsafe {
                if !self.old_bitmap.0.is_null() {
                    let _ = SelectObject(self.mem_dc, self.old_bitmap);
                }
                if !self.dib.0.is_null() {
                    let _ = DeleteObject(self.dib);
                }
                if !self.mem_dc.0.is_null() {
                    let _ = DeleteDC(self.mem_dc);
                }
                if !self.screen_dc.0.is_null() {
                    let _ = ReleaseDC(None, self.screen_dc);
                }
            }
        }
    }

    fn last_error_code() -> i32 {
        windows::core::Error::from_win32().code().0
    }

    /// Layered popup owned by the host so it stays above it in z-order.
    pub struct Win32LayeredSurface {
        hwnd: HWND,
    }

    unsafe impl Send for Win32LayeredSurface {}

    impl Win32LayeredSurface {
        pub fn create(host: HWND, sink: ClickSink) -> Result<Self> {
            let surface = Self::create_with_style(host, compose_overlay_window_ex_style())?;
            if let Ok(mut routes) = ROUTES.lock() {
                routes.insert(
                    surface.hwnd.0 as isize,
                    Route {
                        host: host.0 as isize,
                        sink,
                    },
                );
            }
            Ok(surface)
        }

        /// Unowned, unrouted surface that never takes a click.
        pub fn create_click_through() -> Result<Self> {
            Self::create_with_style(HWND::default(), compose_thumbnail_window_ex_style())
        }

        fn create_with_style(host: HWND, ex_style: WINDOW_EX_STYLE) -> Result<Self> {
            static REGISTER_CLASS: Once = Once::new();
            let class_name = widestring("TitlebarTabsOverlay");
            let hinstance = unsafe { GetModuleHandleW(PCWSTR::null()) }
                .map_err(|err| TabStripError::WindowCreation(err.to_string()))?;

            REGISTER_CLASS.call_once(|| unsafe {
                let wc = WNDCLASSW {
                    hInstance: hinstance.into(),
                    lpszClassName: PCWSTR(class_name.as_ptr()),
                    lpfnWndProc: Some(overlay_wndproc),
                    ..Default::default()
                };
                let _ = RegisterClassW(&wc);
            });

            let hwnd = unsafe {
                CreateWindowExW(
                    ex_style,
                    PCWSTR(class_name.as_ptr()),
                    PCWSTR::null(),
                    WS_POPUP,
                    0,
                    0,
                    0,
                    0,
                    host,
                    None,
                    hinstance,
                    None,
                )
            }
            .map_err(|err| TabStripError::WindowCreation(err.to_string()))?;
            tracing::debug!(hwnd = hwnd.0 as isize, ?ex_style, "created overlay window");
            Ok(Self { hwnd })
        }

        fn blit(&self, image: &PixelBuffer, bounds: Rect, opacity: u8) -> Result<()> {
            let screen_dc = unsafe { GetDC(None) };
            let mut guard = BlitGuard {
                screen_dc,
                mem_dc: HDC::default(),
                dib: HBITMAP::default(),
                old_bitmap: HGDIOBJ::default(),
            };
            if screen_dc.0.is_null() {
                return Err(TabStripError::Blit {
                    code: last_error_code(),
                });
            }
            guard.mem_dc = unsafe { CreateCompatibleDC(screen_dc) };
            if guard.mem_dc.0.is_null() {
                return Err(TabStripError::Blit {
                    code: last_error_code(),
                });
            }

            let mut bmi = BITMAPINFO::default();
            bmi.bmiHeader = BITMAPINFOHEADER {
                biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: bounds.width,
                biHeight: -bounds.height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            };
            let mut bits: *mut core::ffi::c_void = ptr::null_mut();
            guard.dib = unsafe {
                CreateDIBSection(
                    guard.mem_dc,
                    &bmi,
                    DIB_RGB_COLORS,
                    &mut bits,
                    windows::Win32::Foundation::HANDLE::default(),
                    0,
                )
            }
            .map_err(|err| TabStripError::Blit { code: err.code().0 })?;
            if bits.is_null() {
                return Err(TabStripError::Blit {
                    code: last_error_code(),
                });
            }

            let len = image.pixels().len();
            let out = unsafe { std::slice::from_raw_parts_mut(bits as *mut u8, len) };
            image.write_premultiplied_bgra(out);
            guard.old_bitmap = unsafe { SelectObject(guard.mem_dc, guard.dib) };

            let pt_src = POINT { x: 0, y: 0 };
            let pt_dst = POINT {
                x: bounds.x,
                y: bounds.y,
            };
            let size = SIZE {
                cx: bounds.width,
                cy: bounds.height,
            };
            let blend = BLENDFUNCTION {
                BlendOp: AC_SRC_OVER as u8,
                BlendFlags: 0,
                SourceConstantAlpha: opacity,
                AlphaFormat: AC_SRC_ALPHA as u8,
            };
            unsafe {
                UpdateLayeredWindow(
                    self.hwnd,
                    screen_dc,
                    Some(&pt_dst),
                    Some(&size),
                    guard.mem_dc,
                    Some(&pt_src),
                    COLORREF(0),
                    Some(&blend),
                    ULW_ALPHA,
                )
            }
            .map_err(|err| TabStripError::Blit { code: err.code().0 })
        }
    }

    impl LayeredSurface for Win32LayeredSurface {
        fn present(&mut self, image: &PixelBuffer, bounds: Rect, opacity: u8) -> Result<()> {
            if self.hwnd.0.is_null() || bounds.is_empty() {
                return Ok(());
            }
            self.blit(image, bounds, opacity)?;
            unsafe {
                let _ = ShowWindow(
                    self.hwnd,
                    windows::Win32::UI::WindowsAndMessaging::SW_SHOWNOACTIVATE,
                );
            }
            Ok(())
        }

        fn hide(&mut self) {
            if !self.hwnd.0.is_null() {
                unsafe {
                    let _ = ShowWindow(self.hwnd, SW_HIDE);
                }
            }
        }

        fn destroy(&mut self) {
            if self.hwnd.0.is_null() {
                return;
            }
            if let Ok(mut routes) = ROUTES.lock() {
                routes.remove(&(self.hwnd.0 as isize));
            }
            unsafe {
                let _ = DestroyWindow(self.hwnd);
            }
            self.hwnd = HWND::default();
        }
    }

    impl Drop for Win32LayeredSurface {
        fn drop(&mut self) {
            self.destroy();
        }
    }

}

#[cfg(test)]
mod tests {
    use super::{LayeredSurface, MemorySurface};
    use crate::error::TabStripError;
    use crate::geometry::Rect;
    use crate::pixels::PixelBuffer;

    #[test]
    fn memory_surface_keeps_last_frame() {
        let (mut surface, handle) = MemorySurface::new();
        let image = PixelBuffer::new(4, 2);
        surface.present(&image, Rect::new(1, 2, 4, 2), 200).unwrap();
        let frame = handle.last_frame().unwrap();
        assert_eq!(frame.bounds, Rect::new(1, 2, 4, 2));
        assert_eq!(frame.opacity, 200);
        assert!(handle.is_visible());
    }

    #[test]
    fn blit_failure_carries_code() {
        let (mut surface, handle) = MemorySurface::new();
        handle.fail_presents_with(6);
        let err = surface
            .present(&PixelBuffer::new(1, 1), Rect::new(0, 0, 1, 1), 255)
            .unwrap_err();
        assert!(matches!(err, TabStripError::Blit { code: 6 }));
    }

    #[test]
    fn destroyed_surface_ignores_presents() {
        let (mut surface, handle) = MemorySurface::new();
        surface.destroy();
        surface
            .present(&PixelBuffer::new(1, 1), Rect::new(0, 0, 1, 1), 255)
            .unwrap();
        assert_eq!(handle.present_count(), 0);
        assert!(handle.is_destroyed());
    }
}
