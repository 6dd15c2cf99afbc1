//! Global low-level mouse hook.
//!
//! The hook callback runs on a thread owned by the platform and only records
//! the event and hands it to a channel; interpretation happens on the
//! pipeline's consumer thread.

use crate::geometry::Point;
use anyhow::anyhow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMessage {
    Move,
    LeftDown,
    LeftUp,
    /// Synthesized by the hook from two close left-button presses.
    LeftDoubleClick,
    RightDown,
    RightUp,
    MiddleDown,
    MiddleUp,
    Wheel,
}

/// One captured hook event. `time` is the platform tick count in
/// milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMouseEvent {
    pub message: MouseMessage,
    pub point: Point,
    pub time: u32,
}

impl RawMouseEvent {
    pub fn new(message: MouseMessage, point: Point, time: u32) -> Self {
        Self {
            message,
            point,
            time,
        }
    }
}

/// Detects two left-button presses close together in time and space.
#[derive(Debug, Clone, Copy)]
pub struct DoubleClickDetector {
    interval_ms: u32,
    /// Maximum distance on either axis between the two presses.
    distance: i32,
    last: Option<(Point, u32)>,
}

impl DoubleClickDetector {
    pub fn new(interval_ms: u32, distance: i32) -> Self {
        Self {
            interval_ms,
            distance,
            last: None,
        }
    }

    /// Uses the desktop's double-click time and rectangle.
    #[cfg(windows)]
    pub fn system() -> Self {
        use windows::Win32::UI::Input::KeyboardAndMouse::GetDoubleClickTime;
        use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXDOUBLECLK};
        let interval = unsafe { GetDoubleClickTime() };
        let width = unsafe { GetSystemMetrics(SM_CXDOUBLECLK) };
        Self::new(interval, (width / 2).max(1))
    }

    #[cfg(not(windows))]
    pub fn system() -> Self {
        Self::new(500, 2)
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Feeds a left-button press. Returns `true` when it completes a double
    /// click; the pair is then forgotten so a third press starts over.
    pub fn observe(&mut self, point: Point, time: u32) -> bool {
        if let Some((last_point, last_time)) = self.last.take() {
            let elapsed = time.wrapping_sub(last_time);
            let near = (point.x - last_point.x).abs() <= self.distance
                && (point.y - last_point.y).abs() <= self.distance;
            if elapsed <= self.interval_ms && near {
                return true;
            }
        }
        self.last = Some((point, time));
        false
    }
}

/// The hook side of the pipeline channel. Synthesizes double clicks before
/// forwarding.
#[derive(Debug)]
pub struct HookSink {
    sender: Sender<RawMouseEvent>,
    double_click: DoubleClickDetector,
}

impl HookSink {
    pub fn new(sender: Sender<RawMouseEvent>, double_click: DoubleClickDetector) -> Self {
        Self {
            sender,
            double_click,
        }
    }

    /// Returns `false` once the consumer has gone away.
    pub fn deliver(&mut self, event: RawMouseEvent) -> bool {
        if self.sender.send(event).is_err() {
            return false;
        }
        if event.message == MouseMessage::LeftDown
            && self.double_click.observe(event.point, event.time)
        {
            let synthesized = RawMouseEvent {
                message: MouseMessage::LeftDoubleClick,
                ..event
            };
            return self.sender.send(synthesized).is_ok();
        }
        true
    }
}

pub trait HookBackend: Send {
    fn install(&mut self, sink: HookSink) -> anyhow::Result<()>;
    /// Removes the hook and drops the sink, which closes the channel.
    fn uninstall(&mut self) -> anyhow::Result<()>;
    fn is_installed(&self) -> bool;
}

#[cfg(windows)]
pub use platform::DefaultHookBackend;

#[cfg(windows)]
mod platform {
    use super::{HookBackend, HookSink, MouseMessage, RawMouseEvent};
    use crate::error::TabStripError;
    use crate::geometry::Point;
    use anyhow::anyhow;
    use std::cell::RefCell;
    use std::time::Duration;

    thread_local! {
        // Low-level hooks are called on the installing thread, so each hook
        // thread keeps its own sink.
        static SINK: RefCell<Option<HookSink>> = const { RefCell::new(None) };
    }

    struct HookThread {
        thread_id: u32,
        join: std::thread::JoinHandle<()>,
    }

    #[derive(Default)]
    pub struct DefaultHookBackend {
        hook_thread: Option<HookThread>,
    }

    unsafe impl Send for DefaultHookBackend {}

    impl HookBackend for DefaultHookBackend {
        fn install(&mut self, sink: HookSink) -> anyhow::Result<()> {
            if self.hook_thread.is_some() {
                return Ok(());
            }

            use windows::Win32::System::LibraryLoader::GetModuleHandleW;
            use windows::Win32::System::Threading::GetCurrentThreadId;
            use windows::Win32::UI::WindowsAndMessaging::{
                DispatchMessageW, GetMessageW, PeekMessageW, SetWindowsHookExW,
                TranslateMessage, UnhookWindowsHookEx, MSG, PM_NOREMOVE, WH_MOUSE_LL,
            };

            // Handshake so install() only returns once the hook is in place.
            let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<anyhow::Result<u32>>(1);

            let join = std::thread::Builder::new()
                .name("tab-mouse-hook".to_string())
                .spawn(move || {
                    // Ensure the thread has a message queue.
                    let mut msg = MSG::default();
                    unsafe {
                        let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
                    }
                    let thread_id = unsafe { GetCurrentThreadId() };
                    SINK.with(|slot| *slot.borrow_mut() = Some(sink));

                    let hmodule = match unsafe { GetModuleHandleW(None) } {
                        Ok(h) => h,
                        Err(e) => {
                            let _ = ready_tx.send(Err(anyhow!(TabStripError::HookInstall {
                                code: e.code().0
                            })));
                            return;
                        }
                    };
                    let hook = match unsafe {
                        SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), hmodule, 0)
                    } {
                        Ok(h) if !h.0.is_null() => h,
                        Ok(_) => {
                            let code = windows::core::Error::from_win32().code().0;
                            let _ = ready_tx.send(Err(anyhow!(TabStripError::HookInstall { code })));
                            return;
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(anyhow!(TabStripError::HookInstall {
                                code: e.code().0
                            })));
                            return;
                        }
                    };

                    let _ = ready_tx.send(Ok(thread_id));

                    // Message loop keeps WH_MOUSE_LL callbacks flowing.
                    loop {
                        let r = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                        if r.0 == 0 || r.0 == -1 {
                            break;
                        }
                        unsafe {
                            let _ = TranslateMessage(&msg);
                            DispatchMessageW(&msg);
                        }
                    }

                    unsafe {
                        let _ = UnhookWindowsHookEx(hook);
                    }
                    SINK.with(|slot| slot.borrow_mut().take());
                })
                .map_err(|err| anyhow!("failed to spawn hook thread: {err}"))?;

            let thread_id = ready_rx
                .recv_timeout(Duration::from_secs(2))
                .map_err(|_| anyhow!("hook thread did not signal readiness"))??;

            tracing::debug!(thread_id, "installed low-level mouse hook");
            self.hook_thread = Some(HookThread { thread_id, join });
            Ok(())
        }

        fn uninstall(&mut self) -> anyhow::Result<()> {
            if let Some(th) = self.hook_thread.take() {
                use windows::Win32::Foundation::{LPARAM, WPARAM};
                use windows::Win32::UI::WindowsAndMessaging::{PostThreadMessageW, WM_QUIT};
                unsafe {
                    let _ = PostThreadMessageW(th.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
                }
                let _ = th.join.join();
                tracing::debug!(thread_id = th.thread_id, "uninstalled low-level mouse hook");
            }
            Ok(())
        }

        fn is_installed(&self) -> bool {
            self.hook_thread.is_some()
        }
    }

    impl Drop for DefaultHookBackend {
        fn drop(&mut self) {
            let _ = self.uninstall();
        }
    }

    fn message_from_raw(msg: u32) -> Option<MouseMessage> {
        use windows::Win32::UI::WindowsAndMessaging::{
            WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP, WM_MOUSEMOVE,
            WM_MOUSEWHEEL, WM_RBUTTONDOWN, WM_RBUTTONUP,
        };
        Some(match msg {
            WM_MOUSEMOVE => MouseMessage::Move,
            WM_LBUTTONDOWN => MouseMessage::LeftDown,
            WM_LBUTTONUP => MouseMessage::LeftUp,
            WM_RBUTTONDOWN => MouseMessage::RightDown,
            WM_RBUTTONUP => MouseMessage::RightUp,
            WM_MBUTTONDOWN => MouseMessage::MiddleDown,
            WM_MBUTTONUP => MouseMessage::MiddleUp,
            WM_MOUSEWHEEL => MouseMessage::Wheel,
            _ => return None,
        })
    }

    unsafe extern "system" fn mouse_hook_proc(
        n_code: i32,
        w_param: windows::Win32::Foundation::WPARAM,
        l_param: windows::Win32::Foundation::LPARAM,
    ) -> windows::Win32::Foundation::LRESULT {
        use windows::Win32::UI::WindowsAndMessaging::{
            CallNextHookEx, HC_ACTION, HHOOK, MSLLHOOKSTRUCT,
        };

        if n_code == HC_ACTION as i32 {
            if let Some(message) = message_from_raw(w_param.0 as u32) {
                let info = unsafe { &*(l_param.0 as *const MSLLHOOKSTRUCT) };
                let event = RawMouseEvent::new(
                    message,
                    Point::new(info.pt.x, info.pt.y),
                    info.time,
                );
                SINK.with(|slot| {
                    if let Ok(mut slot) = slot.try_borrow_mut() {
                        if let Some(sink) = slot.as_mut() {
                            sink.deliver(event);
                        }
                    }
                });
            }
        }

        // Never consume: the desktop must keep seeing every mouse event.
        unsafe { CallNextHookEx(HHOOK(std::ptr::null_mut()), n_code, w_param, l_param) }
    }
}

#[cfg(not(windows))]
#[derive(Default)]
pub struct DefaultHookBackend;

#[cfg(not(windows))]
impl HookBackend for DefaultHookBackend {
    fn install(&mut self, _sink: HookSink) -> anyhow::Result<()> {
        Err(anyhow!("mouse hooks are not supported on this platform"))
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn is_installed(&self) -> bool {
        false
    }
}

#[derive(Clone)]
pub struct MockHookBackend {
    state: Arc<MockHookState>,
}

#[derive(Default)]
struct MockHookState {
    install_count: AtomicUsize,
    uninstall_count: AtomicUsize,
    sink: Mutex<Option<HookSink>>,
}

impl MockHookBackend {
    pub fn new() -> (Self, MockHookHandle) {
        let state = Arc::new(MockHookState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            MockHookHandle { state },
        )
    }
}

impl HookBackend for MockHookBackend {
    fn install(&mut self, sink: HookSink) -> anyhow::Result<()> {
        let mut guard = self.state.sink.lock().map_err(|_| anyhow!("lock"))?;
        if guard.is_none() {
            self.state.install_count.fetch_add(1, Ordering::SeqCst);
            *guard = Some(sink);
        }
        Ok(())
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        let mut guard = self.state.sink.lock().map_err(|_| anyhow!("lock"))?;
        if guard.is_some() {
            self.state.uninstall_count.fetch_add(1, Ordering::SeqCst);
        }
        *guard = None;
        Ok(())
    }

    fn is_installed(&self) -> bool {
        match self.state.sink.lock() {
            Ok(guard) => guard.is_some(),
            Err(_) => false,
        }
    }
}

/// Test side of a [`MockHookBackend`]: emits events as if the OS had.
#[derive(Clone)]
pub struct MockHookHandle {
    state: Arc<MockHookState>,
}

impl MockHookHandle {
    pub fn install_count(&self) -> usize {
        self.state.install_count.load(Ordering::SeqCst)
    }

    pub fn uninstall_count(&self) -> usize {
        self.state.uninstall_count.load(Ordering::SeqCst)
    }

    pub fn is_installed(&self) -> bool {
        match self.state.sink.lock() {
            Ok(guard) => guard.is_some(),
            Err(_) => false,
        }
    }

    pub fn emit(&self, event: RawMouseEvent) -> bool {
        match self.state.sink.lock() {
            Ok(mut guard) => guard
                .as_mut()
                .map(|sink| sink.deliver(event))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    pub fn emit_at(&self, message: MouseMessage, x: i32, y: i32, time: u32) -> bool {
        self.emit(RawMouseEvent::new(message, Point::new(x, y), time))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DoubleClickDetector, HookBackend, HookSink, MockHookBackend, MouseMessage, RawMouseEvent,
    };
    use crate::geometry::Point;
    use std::sync::mpsc;

    #[test]
    fn presses_inside_interval_make_a_double_click() {
        let mut detector = DoubleClickDetector::new(500, 2);
        assert!(!detector.observe(Point::new(10, 10), 1000));
        assert!(detector.observe(Point::new(11, 9), 1400));
    }

    #[test]
    fn slow_or_distant_presses_do_not() {
        let mut detector = DoubleClickDetector::new(500, 2);
        assert!(!detector.observe(Point::new(10, 10), 1000));
        assert!(!detector.observe(Point::new(10, 10), 1501));
        assert!(!detector.observe(Point::new(20, 10), 1600));
    }

    #[test]
    fn third_press_starts_a_new_pair() {
        let mut detector = DoubleClickDetector::new(500, 2);
        assert!(!detector.observe(Point::new(10, 10), 0));
        assert!(detector.observe(Point::new(10, 10), 100));
        assert!(!detector.observe(Point::new(10, 10), 200));
        assert!(detector.observe(Point::new(10, 10), 300));
    }

    #[test]
    fn sink_appends_synthesized_double_click() {
        let (tx, rx) = mpsc::channel();
        let mut sink = HookSink::new(tx, DoubleClickDetector::new(500, 2));
        let down = |time| RawMouseEvent::new(MouseMessage::LeftDown, Point::new(5, 5), time);
        assert!(sink.deliver(down(0)));
        assert!(sink.deliver(down(200)));
        drop(sink);

        let messages: Vec<_> = rx.iter().map(|event| event.message).collect();
        assert_eq!(
            messages,
            vec![
                MouseMessage::LeftDown,
                MouseMessage::LeftDown,
                MouseMessage::LeftDoubleClick
            ]
        );
    }

    #[test]
    fn mock_pairs_install_and_uninstall() {
        let (mut backend, handle) = MockHookBackend::new();
        let (tx, rx) = mpsc::channel();
        backend
            .install(HookSink::new(tx, DoubleClickDetector::new(500, 2)))
            .unwrap();
        assert!(backend.is_installed());
        assert!(handle.emit_at(MouseMessage::Move, 1, 2, 0));

        backend.uninstall().unwrap();
        backend.uninstall().unwrap();
        assert_eq!(handle.install_count(), 1);
        assert_eq!(handle.uninstall_count(), 1);
        assert!(!handle.emit_at(MouseMessage::Move, 1, 2, 0));
        assert_eq!(rx.iter().count(), 1, "channel closes with the sink");
    }
}
