use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use titlebar_tabs::tabs::{ListChange, ObservableList};

fn counted(list: &ObservableList<u32>) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let fine = Arc::new(AtomicUsize::new(0));
    let coarse = Arc::new(AtomicUsize::new(0));
    let f = fine.clone();
    list.on_item_changed(move |_| {
        f.fetch_add(1, Ordering::SeqCst);
    });
    let c = coarse.clone();
    list.on_collection_modified(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    (fine, coarse)
}

#[test]
fn every_mutation_raises_one_pair() {
    let list = ObservableList::new();
    let (fine, coarse) = counted(&list);

    list.push(1);
    list.insert(0, 0);
    list.extend(vec![2, 3, 4]);
    list.set(4, 40);
    list.remove(&2);
    list.remove_at(0);

    assert_eq!(list.snapshot(), vec![1, 3, 40]);
    assert_eq!(fine.load(Ordering::SeqCst), 6);
    assert_eq!(coarse.load(Ordering::SeqCst), 6);
}

#[test]
fn remove_all_reports_one_range_or_nothing() {
    let list = ObservableList::new();
    list.extend((0..10).collect());
    let changes = Arc::new(Mutex::new(Vec::new()));
    let log = changes.clone();
    list.on_collection_modified(move |change| log.lock().unwrap().push(change.clone()));

    assert_eq!(list.remove_all(|n| n % 2 == 0), 5);
    assert_eq!(list.remove_all(|n| *n > 100), 0);

    assert_eq!(
        *changes.lock().unwrap(),
        vec![ListChange::RangeRemoved {
            items: vec![0, 2, 4, 6, 8]
        }]
    );
    assert_eq!(list.snapshot(), vec![1, 3, 5, 7, 9]);
}

#[test]
fn listeners_may_read_the_list() {
    let list = Arc::new(ObservableList::new());
    let seen = Arc::new(AtomicUsize::new(0));
    let reader = Arc::downgrade(&list);
    let counter = seen.clone();
    list.on_collection_modified(move |_| {
        if let Some(list) = reader.upgrade() {
            counter.store(list.len(), Ordering::SeqCst);
        }
    });
    list.push(7u32);
    list.push(8);
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[test]
fn suppressed_list_stays_silent() {
    let list = ObservableList::new();
    let (fine, coarse) = counted(&list);
    list.suppress_events();
    list.push(1);
    list.clear();
    list.resume_events();
    list.push(2);
    assert_eq!(fine.load(Ordering::SeqCst), 1);
    assert_eq!(coarse.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_pushes_are_all_kept() {
    let list = Arc::new(ObservableList::new());
    let (_, coarse) = counted(&list);
    let workers: Vec<_> = (0..4u32)
        .map(|worker| {
            let list = list.clone();
            thread::spawn(move || {
                for i in 0..250 {
                    list.push(worker * 1000 + i);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(list.len(), 1000);
    assert_eq!(coarse.load(Ordering::SeqCst), 1000);
}
