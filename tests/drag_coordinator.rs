use std::sync::{Arc, Barrier};
use std::thread;
use titlebar_tabs::geometry::{Point, Rect};
use titlebar_tabs::overlay::{LayeredSurface, MemorySurface};
use titlebar_tabs::pipeline::{DragCoordinator, SurfaceThumbnailFactory};
use titlebar_tabs::tabs::{Tab, TabContent};
use titlebar_tabs::window::WindowId;

struct Page;

impl TabContent for Page {
    fn title(&self) -> String {
        "Page".into()
    }

    fn set_bounds(&self, _bounds: Rect) {}
}

fn coordinator() -> Arc<DragCoordinator> {
    Arc::new(DragCoordinator::new(Arc::new(SurfaceThumbnailFactory::new(
        || Ok(Box::new(MemorySurface::new().0) as Box<dyn LayeredSurface>),
        0.7,
    ))))
}

#[test]
fn only_one_of_many_racing_tears_wins() {
    let drag = coordinator();
    let barrier = Arc::new(Barrier::new(8));
    let racers: Vec<_> = (0..8)
        .map(|i| {
            let drag = drag.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let tab = Tab::new(Arc::new(Page) as Arc<dyn TabContent>);
                barrier.wait();
                drag.try_tear(tab, WindowId::next(), Vec::new(), Point::new(i, i))
            })
        })
        .collect();
    let wins = racers
        .into_iter()
        .map(|racer| racer.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(wins, 1);
    assert!(drag.is_dragging());
}

#[test]
fn torn_tab_is_taken_exactly_once() {
    let drag = coordinator();
    let tab = Tab::new(Arc::new(Page) as Arc<dyn TabContent>);
    let source = WindowId::next();
    assert!(drag.try_tear(tab.clone(), source, Vec::new(), Point::new(5, 5)));

    let takers: Vec<_> = (0..4)
        .map(|_| {
            let drag = drag.clone();
            thread::spawn(move || drag.take().map(|torn| torn.tab))
        })
        .collect();
    let taken: Vec<_> = takers
        .into_iter()
        .filter_map(|taker| taker.join().unwrap())
        .collect();
    assert_eq!(taken, vec![tab]);
    assert!(!drag.is_dragging());
    assert!(!drag.is_torn_from(source));
}
