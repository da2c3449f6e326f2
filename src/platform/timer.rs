//! One-shot timers.

use crossbeam_channel::{after, bounded, select, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Identifies a scheduled task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Schedules one-shot tasks.
pub trait Timer: Send + Sync {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce() + Send>) -> TimerId;

    /// Cancel a task. Cancelling a fired or unknown task is a no-op.
    fn cancel(&self, id: TimerId);
}

/// Timer backed by one short-lived thread per task.
///
/// Each thread waits on a `crossbeam_channel::after` deadline or a cancel signal,
/// whichever comes first.
pub struct ThreadTimer {
    cancels: Arc<Mutex<HashMap<TimerId, Sender<()>>>>,
    next_id: AtomicU64,
}

impl ThreadTimer {
    pub fn new() -> Self {
        Self {
            cancels: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of tasks neither fired nor cancelled.
    pub fn pending(&self) -> usize {
        self.cancels.lock().len()
    }
}

impl Default for ThreadTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for ThreadTimer {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce() + Send>) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        self.cancels.lock().insert(id, cancel_tx);

        let cancels = Arc::clone(&self.cancels);
        std::thread::spawn(move || {
            let deadline = after(delay);
            select! {
                recv(cancel_rx) -> _ => {}
                recv(deadline) -> _ => {
                    // Removing our entry decides the race with a concurrent cancel.
                    if cancels.lock().remove(&id).is_some() {
                        task();
                    }
                }
            }
        });

        id
    }

    fn cancel(&self, id: TimerId) {
        if let Some(cancel) = self.cancels.lock().remove(&id) {
            let _ = cancel.try_send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_task_fires_after_delay() {
        let timer = ThreadTimer::new();
        let (tx, rx) = bounded(1);
        timer.schedule(
            Duration::from_millis(5),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn test_cancelled_task_never_fires() {
        let timer = ThreadTimer::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let id = timer.schedule(
            Duration::from_millis(20),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );
        timer.cancel(id);
        std::thread::sleep(Duration::from_millis(60));
        assert!(!fired.load(Ordering::SeqCst));
        assert_eq!(timer.pending(), 0);
    }
}
