//! Subscription manager for broadcasting snapshots.

use crate::snapshot::MediaState;
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{StateReceiver, Subscriber, SubscriptionId};

/// Where a subscription's snapshots go.
enum Sink {
    Callback(Subscriber),
    Channel(Sender<MediaState>),
}

/// Manages subscriptions and broadcasts snapshots.
///
/// Subscribers are notified in subscription order. Callbacks run with no lock
/// held, so a callback may subscribe, unsubscribe or dispatch.
pub struct SubscriptionManager {
    subscriptions: RwLock<BTreeMap<SubscriptionId, Sink>>,
    next_id: AtomicU64,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    pub fn add_callback(&self, subscriber: Subscriber) -> SubscriptionId {
        let id = self.next_id();
        self.subscriptions.write().insert(id, Sink::Callback(subscriber));
        id
    }

    /// Add a bounded-channel subscriber holding up to `buffer_size` snapshots.
    pub fn add_channel(&self, buffer_size: usize) -> StateReceiver {
        let id = self.next_id();
        let (sender, receiver) = bounded(buffer_size.max(1));
        self.subscriptions.write().insert(id, Sink::Channel(sender));
        StateReceiver { id, receiver }
    }

    /// Returns false if `id` was not subscribed.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        self.subscriptions.write().remove(&id).is_some()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Deliver to one subscriber. Returns false if it is gone (or was dropped).
    pub fn send_to(&self, id: SubscriptionId, state: &MediaState) -> bool {
        let callback = {
            let subs = self.subscriptions.read();
            match subs.get(&id) {
                Some(Sink::Callback(callback)) => callback.clone(),
                Some(Sink::Channel(sender)) => {
                    let delivered = sender.try_send(state.clone()).is_ok();
                    drop(subs);
                    if !delivered {
                        self.remove(id);
                    }
                    return delivered;
                }
                None => return false,
            }
        };
        callback(state);
        true
    }

    /// Deliver to every subscriber. Returns how many channel subscribers were
    /// dropped because their buffer was full or their receiver was gone.
    pub fn broadcast(&self, state: &MediaState) -> usize {
        let mut callbacks = Vec::new();
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sink) in subs.iter() {
                match sink {
                    Sink::Callback(callback) => callbacks.push(callback.clone()),
                    Sink::Channel(sender) => match sender.try_send(state.clone()) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                            to_remove.push(*id)
                        }
                    },
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in &to_remove {
                subs.remove(id);
            }
            tracing::debug!(dropped = to_remove.len(), "dropped slow snapshot receivers");
        }

        for callback in callbacks {
            callback(state);
        }

        to_remove.len()
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::StatePatch;
    use crate::types::StateKey;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn state(paused: bool) -> MediaState {
        MediaState::from_patch(StatePatch::new().with(StateKey::Paused, paused))
    }

    #[test]
    fn test_subscribe_unsubscribe() {
        let manager = SubscriptionManager::new();

        let id = manager.add_callback(Arc::new(|_: &MediaState| {}));
        assert_eq!(manager.subscription_count(), 1);

        assert!(manager.remove(id));
        assert!(!manager.remove(id));
        assert_eq!(manager.subscription_count(), 0);
    }

    #[test]
    fn test_broadcast_in_subscription_order() {
        let manager = SubscriptionManager::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let seen = Arc::clone(&seen);
            manager.add_callback(Arc::new(move |_: &MediaState| seen.lock().push(n)));
        }
        manager.broadcast(&state(true));

        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_drop_slow_receiver() {
        let manager = SubscriptionManager::new();
        let receiver = manager.add_channel(2);

        let mut dropped = 0;
        for i in 0..10 {
            dropped += manager.broadcast(&state(i % 2 == 0));
        }

        assert_eq!(dropped, 1);
        assert_eq!(manager.subscription_count(), 0);
        assert_eq!(receiver.receiver.try_iter().count(), 2);
    }

    #[test]
    fn test_callback_may_unsubscribe_itself() {
        let manager = Arc::new(SubscriptionManager::new());
        let id_slot = Arc::new(Mutex::new(None));

        let callback = {
            let manager = Arc::clone(&manager);
            let id_slot = Arc::clone(&id_slot);
            Arc::new(move |_: &MediaState| {
                if let Some(id) = *id_slot.lock() {
                    manager.remove(id);
                }
            })
        };
        let id = manager.add_callback(callback);
        *id_slot.lock() = Some(id);

        manager.broadcast(&state(false));
        assert_eq!(manager.subscription_count(), 0);
    }
}
