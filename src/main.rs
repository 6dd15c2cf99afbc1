#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use titlebar_tabs::geometry::Rect;
    use titlebar_tabs::pipeline::UiQueue;
    use titlebar_tabs::tabs::{ContentFactory, TabContent};
    use titlebar_tabs::window::win32;
    use titlebar_tabs::{logging, TabStripSettings, TabbedApplication};
    use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, GetMessageW, PostThreadMessageW, TranslateMessage, MSG, WM_APP, WM_QUIT,
    };

    struct PlaceholderContent {
        title: String,
    }

    impl TabContent for PlaceholderContent {
        fn title(&self) -> String {
            self.title.clone()
        }

        fn set_bounds(&self, _bounds: Rect) {}
    }

    let settings = TabStripSettings::load("titlebar_tabs.json")?;
    logging::init(settings.debug_logging, settings.log_file.clone());

    let ui_thread = unsafe { GetCurrentThreadId() };
    let (queue, runner) = UiQueue::with_waker(move || unsafe {
        let _ = PostThreadMessageW(ui_thread, WM_APP, WPARAM(0), LPARAM(0));
    });
    let queue = Arc::new(queue);

    let opened = AtomicUsize::new(0);
    let content = ContentFactory::with_handler(move || {
        let n = opened.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(Arc::new(PlaceholderContent {
            title: format!("New tab {n}"),
        }) as Arc<dyn TabContent>)
    });

    let app = TabbedApplication::builder()
        .settings(settings.clone())
        .dispatcher(queue.clone())
        .content_factory(Arc::new(content))
        .thumbnails(Arc::new(win32::thumbnail_factory(settings.thumbnail_opacity)))
        .window_factory(|request| win32::create_window_parts("Tabs", request))
        .on_window_opened(win32::attach)
        .build()?;
    app.on_exit(move || unsafe {
        let _ = PostThreadMessageW(ui_thread, WM_QUIT, WPARAM(0), LPARAM(0));
    });
    app.open_window_with_new_tab(Rect::new(100, 100, 1000, 700))?;

    let mut msg = MSG::default();
    loop {
        let r = unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) };
        if r.0 == 0 || r.0 == -1 {
            break;
        }
        runner.run_pending();
        unsafe {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    app.close_all();
    queue.close();
    runner.run_pending();
    tracing::info!("titlebar_tabs_demo exiting");
    Ok(())
}

#[cfg(not(windows))]
fn main() {
    eprintln!("titlebar_tabs_demo needs a Windows desktop");
}
