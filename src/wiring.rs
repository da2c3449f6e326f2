//! Bookkeeping of exactly what the store attached to its owners.
//!
//! Every listener is remembered by the id its owner returned, so teardown
//! removes only the instances this store attached, never a sibling listener
//! registered for the same event name.

use crate::facade::{self, Teardown};
use crate::owners::{CategoryOwner, Listener, ListenerId};
use crate::types::{OwnerCategory, StateKey};
use std::collections::BTreeMap;

/// Listeners attached to one owner category.
pub struct AttachedCategory {
    pub owner: CategoryOwner,
    listeners: Vec<(StateKey, &'static str, ListenerId)>,
}

impl AttachedCategory {
    /// Attach one listener per (facade key, event name) monitored on `category`.
    pub fn attach(
        category: OwnerCategory,
        owner: CategoryOwner,
        listener_for: impl Fn(StateKey) -> Listener,
    ) -> Self {
        let mut listeners = Vec::new();
        for entry in facade::facade() {
            let events = entry.events.for_category(category);
            if events.is_empty() {
                continue;
            }
            let listener = listener_for(entry.key);
            for event in events {
                let id = owner.add_event_listener(event, listener.clone());
                listeners.push((entry.key, *event, id));
            }
        }
        tracing::trace!(?category, listeners = listeners.len(), "attached listeners");
        Self { owner, listeners }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Remove every listener this value attached.
    pub fn detach(self) {
        for (_, event, id) in self.listeners {
            self.owner.remove_event_listener(event, id);
        }
    }
}

/// Everything currently attached by one store.
#[derive(Default)]
pub struct Wiring {
    categories: BTreeMap<OwnerCategory, AttachedCategory>,
    hooks: Vec<(StateKey, Teardown)>,
}

impl Wiring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attached(&self, category: OwnerCategory) -> Option<&CategoryOwner> {
        self.categories.get(&category).map(|a| &a.owner)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.hooks.is_empty()
    }

    /// Take a category out for detaching. The caller detaches it with no lock held.
    pub fn take(&mut self, category: OwnerCategory) -> Option<AttachedCategory> {
        self.categories.remove(&category)
    }

    pub fn insert(&mut self, category: OwnerCategory, attached: AttachedCategory) {
        if let Some(previous) = self.categories.insert(category, attached) {
            tracing::warn!(?category, "replacing listeners that were never detached");
            previous.detach();
        }
    }

    pub fn add_hook(&mut self, key: StateKey, teardown: Teardown) {
        self.hooks.push((key, teardown));
    }

    pub fn take_hooks(&mut self) -> Vec<(StateKey, Teardown)> {
        std::mem::take(&mut self.hooks)
    }

    /// Number of listeners attached across all categories.
    pub fn listener_count(&self) -> usize {
        self.categories.values().map(|a| a.listener_count()).sum()
    }

    /// Detach everything. Used when the store goes away.
    pub fn clear(&mut self) {
        for (_, attached) in std::mem::take(&mut self.categories) {
            attached.detach();
        }
        for (_, teardown) in self.take_hooks() {
            teardown();
        }
    }
}
