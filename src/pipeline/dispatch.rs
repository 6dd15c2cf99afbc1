//! Marshaling work onto the UI thread.
//!
//! The consumer thread never touches windows directly; it sends closures
//! through a [`UiDispatcher`] and waits on [`invoke`] only when it needs the
//! result.

use crate::error::{Result, TabStripError};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

pub trait UiDispatcher: Send + Sync {
    /// Queues `task` for the UI thread. Fails once the UI loop has shut down.
    fn post(&self, task: UiTask) -> Result<()>;

    /// Whether the caller is the thread that runs the tasks.
    fn is_ui_thread(&self) -> bool {
        false
    }
}

/// Runs `f` on the UI thread and blocks until it returns.
pub fn invoke<R, F>(dispatcher: &dyn UiDispatcher, f: F) -> Result<R>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    if dispatcher.is_ui_thread() {
        return Ok(f());
    }
    let (tx, rx) = mpsc::sync_channel(1);
    dispatcher.post(Box::new(move || {
        let _ = tx.send(f());
    }))?;
    rx.recv()
        .map_err(|_| TabStripError::Dispatcher("ui task dropped before completing".to_string()))
}

/// Runs every task immediately on the posting thread. Used headless and in
/// tests where there is no separate UI thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl UiDispatcher for InlineDispatcher {
    fn post(&self, task: UiTask) -> Result<()> {
        task();
        Ok(())
    }
}

type Waker = Box<dyn Fn() + Send + Sync>;

/// Channel-backed dispatcher owned by the UI thread.
pub struct UiQueue {
    sender: Mutex<Option<Sender<UiTask>>>,
    owner: ThreadId,
    waker: Option<Waker>,
}

/// Receiving end of a [`UiQueue`]; lives on the UI thread.
pub struct UiRunner {
    receiver: Receiver<UiTask>,
}

impl UiQueue {
    /// Creates the queue; the calling thread becomes the UI thread.
    pub fn new() -> (Self, UiRunner) {
        Self::build(None)
    }

    /// Like [`UiQueue::new`], calling `waker` after every post so a native
    /// message loop blocked in its own wait can pick the task up.
    pub fn with_waker<F>(waker: F) -> (Self, UiRunner)
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(Some(Box::new(waker)))
    }

    fn build(waker: Option<Waker>) -> (Self, UiRunner) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender: Mutex::new(Some(sender)),
                owner: thread::current().id(),
                waker,
            },
            UiRunner { receiver },
        )
    }

    /// Stops accepting tasks. The runner finishes what is queued.
    pub fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl UiDispatcher for UiQueue {
    fn post(&self, task: UiTask) -> Result<()> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(sender) = sender else {
            return Err(TabStripError::Dispatcher("ui queue closed".to_string()));
        };
        sender
            .send(task)
            .map_err(|_| TabStripError::Dispatcher("ui runner dropped".to_string()))?;
        if let Some(waker) = &self.waker {
            waker();
        }
        Ok(())
    }

    fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.owner
    }
}

impl UiRunner {
    /// Runs everything queued right now without blocking.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        ran
    }

    /// Waits up to `timeout` for one task. Returns `false` once the queue is
    /// closed and drained.
    pub fn run_one(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(RecvTimeoutError::Timeout) => true,
            Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Runs tasks until the queue is closed.
    pub fn run(&self) {
        while let Ok(task) = self.receiver.recv() {
            task();
        }
    }
}
