//! Subscription handles.

use crate::snapshot::MediaState;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

/// Snapshot callback. Called synchronously on subscribe and on every change.
pub type Subscriber = Arc<dyn Fn(&MediaState) + Send + Sync>;

/// Idempotent unsubscribe handle.
///
/// Dropping the handle does not unsubscribe; call [`Unsubscribe::unsubscribe`].
pub struct Unsubscribe {
    id: SubscriptionId,
    done: AtomicBool,
    release: Box<dyn Fn(SubscriptionId) + Send + Sync>,
}

impl Unsubscribe {
    pub fn new(id: SubscriptionId, release: impl Fn(SubscriptionId) + Send + Sync + 'static) -> Self {
        Self {
            id,
            done: AtomicBool::new(false),
            release: Box::new(release),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the subscriber. Only the first call has an effect.
    pub fn unsubscribe(&self) {
        if !self.done.swap(true, Ordering::SeqCst) {
            (self.release)(self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        !self.done.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Channel end of a [`watch`](crate::MediaStore::watch) subscription.
///
/// The receiver is dropped by the store (and the channel disconnects) once its
/// buffer overflows.
#[derive(Debug)]
pub struct StateReceiver {
    pub id: SubscriptionId,
    pub receiver: crossbeam_channel::Receiver<MediaState>,
}

impl StateReceiver {
    /// Receive the next snapshot (blocking).
    pub fn recv(&self) -> Result<MediaState, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a snapshot (non-blocking).
    pub fn try_recv(&self) -> Result<MediaState, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<MediaState, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// The newest buffered snapshot, discarding older ones.
    pub fn latest(&self) -> Option<MediaState> {
        self.receiver.try_iter().last()
    }
}
