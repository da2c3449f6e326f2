//! Deterministic timer driven by [`ManualTimer::advance`].

use crate::platform::{Timer, TimerId};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;

type Task = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Clock {
    now: Duration,
    next_id: u64,
    tasks: BTreeMap<TimerId, (Duration, Task)>,
}

/// A timer on virtual time. Nothing fires until the test advances the clock.
#[derive(Default)]
pub struct ManualTimer {
    clock: Mutex<Clock>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move virtual time forward, running due tasks in deadline order.
    pub fn advance(&self, by: Duration) {
        let until = self.clock.lock().now + by;
        loop {
            let due = {
                let mut clock = self.clock.lock();
                let next = clock
                    .tasks
                    .iter()
                    .filter(|(_, (deadline, _))| *deadline <= until)
                    .min_by_key(|(id, (deadline, _))| (*deadline, **id))
                    .map(|(id, (deadline, _))| (*id, *deadline));
                match next {
                    Some((id, deadline)) => {
                        clock.now = deadline;
                        clock.tasks.remove(&id).map(|(_, task)| task)
                    }
                    None => {
                        clock.now = until;
                        None
                    }
                }
            };
            match due {
                Some(task) => task(),
                None => return,
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.clock.lock().tasks.len()
    }

    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce() + Send>) -> TimerId {
        let mut clock = self.clock.lock();
        clock.next_id += 1;
        let id = TimerId(clock.next_id);
        let deadline = clock.now + delay;
        clock.tasks.insert(id, (deadline, task));
        id
    }

    fn cancel(&self, id: TimerId) {
        self.clock.lock().tasks.remove(&id);
    }
}
