//! In-memory owners for tests and headless collaborators.
//!
//! The fakes behave like their browser counterparts where the store can
//! observe it: setters fire their change events synchronously, and only when
//! the value actually changes. Listeners are always invoked with no lock held,
//! so a listener may call back into the fake.

mod collections;
mod document;
mod media;
mod timer;

pub use collections::{FakeAudioTracks, FakeRemote, FakeRenditions, FakeTextTrack, FakeTextTracks};
pub use document::{FakeElement, FakeRoot, FakeShadowRoot};
pub use media::{FakeMedia, FakeMediaBuilder};
pub use timer::ManualTimer;

use crate::owners::{Listener, ListenerId};
use crate::platform::{VolumeProbe, VolumeProbeDone};
use crate::types::MediaEvent;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Listener registry shared by the fakes.
#[derive(Default)]
pub struct ListenerSet {
    listeners: Mutex<Vec<(String, ListenerId, Listener)>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, event: &str, listener: Listener) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((event.to_string(), id, listener));
        id
    }

    pub fn remove(&self, event: &str, id: ListenerId) {
        self.listeners
            .lock()
            .retain(|(name, existing, _)| !(name == event && *existing == id));
    }

    /// Invoke every listener registered for `event.kind`.
    pub fn fire(&self, event: &MediaEvent) {
        let matching: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .filter(|(name, _, _)| *name == event.kind)
            .map(|(_, _, listener)| listener.clone())
            .collect();
        for listener in matching {
            listener(event);
        }
    }

    /// Listeners registered for `event`.
    pub fn count(&self, event: &str) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|(name, _, _)| name == event)
            .count()
    }

    pub fn total(&self) -> usize {
        self.listeners.lock().len()
    }
}

/// Volume probe resolved by hand.
#[derive(Default)]
pub struct ManualVolumeProbe {
    waiting: Mutex<Vec<VolumeProbeDone>>,
}

impl ManualVolumeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probes started and not yet resolved.
    pub fn pending(&self) -> usize {
        self.waiting.lock().len()
    }

    pub fn resolve(&self, supported: bool) {
        let waiting = std::mem::take(&mut *self.waiting.lock());
        for done in waiting {
            done(supported);
        }
    }
}

impl VolumeProbe for ManualVolumeProbe {
    fn probe(&self, done: VolumeProbeDone) {
        self.waiting.lock().push(done);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_remove_only_the_given_instance() {
        let set = ListenerSet::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = {
            let calls = Arc::clone(&calls);
            Arc::new(move |_: &MediaEvent| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };
        let first = set.add("play", counter.clone());
        set.add("play", counter);

        set.remove("play", first);
        set.fire(&MediaEvent::new("play"));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(set.count("play"), 1);
    }
}
