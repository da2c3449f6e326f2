//! The store orchestrator: owns the current owners, the published snapshot,
//! the subscribers and everything wired onto the owners.

use crate::error::Result;
use crate::facade::{self, HookHandler, HookSignal};
use crate::options::{OptionsPatch, StoreOptions};
use crate::owners::{
    same_category_owner, same_owner, FullscreenElement, Listener, MediaOwner, Owners,
    OwnersDelta, RootContext, SharedOptions,
};
use crate::platform::Platform;
use crate::requests::{self, Request};
use crate::snapshot::{MediaState, StatePatch};
use crate::subscriptions::{StateReceiver, Subscriber, SubscriptionManager, Unsubscribe};
use crate::types::{MediaEvent, OwnerCategory, StateKey};
use crate::wiring::{AttachedCategory, Wiring};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Store configuration.
#[derive(Clone)]
pub struct StoreConfig {
    /// Wire owners only while at least one subscriber exists.
    pub monitor_on_demand: bool,

    /// Injected environment. Each store should get its own value.
    pub platform: Arc<Platform>,

    pub options: StoreOptions,

    pub media: Option<Arc<dyn MediaOwner>>,
    pub root: Option<Arc<dyn RootContext>>,
    pub fullscreen_target: Option<Arc<dyn FullscreenElement>>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            monitor_on_demand: true,
            platform: Arc::new(Platform::new()),
            options: StoreOptions::default(),
            media: None,
            root: None,
            fullscreen_target: None,
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("monitor_on_demand", &self.monitor_on_demand)
            .field("options", &self.options)
            .field("media", &self.media.as_ref().map(|m| m.node_id()))
            .field("root", &self.root.is_some())
            .field(
                "fullscreen_target",
                &self.fullscreen_target.as_ref().map(|t| t.node_id()),
            )
            .finish()
    }
}

/// Everything the store accepts through [`MediaStore::dispatch`].
#[derive(Clone)]
pub enum Action {
    /// A state-change intent.
    Request(Request),
    /// Replace (or clear) the media owner.
    MediaChange(Option<Arc<dyn MediaOwner>>),
    FullscreenTargetChange(Option<Arc<dyn FullscreenElement>>),
    RootContextChange(Option<Arc<dyn RootContext>>),
    /// Patch options in place. Getters see the change on their next evaluation.
    OptionsChange(OptionsPatch),
}

impl From<Request> for Action {
    fn from(request: Request) -> Self {
        Action::Request(request)
    }
}

impl From<OptionsPatch> for Action {
    fn from(patch: OptionsPatch) -> Self {
        Action::OptionsChange(patch)
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Request(request) => f.debug_tuple("Request").field(request).finish(),
            Action::MediaChange(media) => f
                .debug_tuple("MediaChange")
                .field(&media.as_ref().map(|m| m.node_id()))
                .finish(),
            Action::FullscreenTargetChange(target) => f
                .debug_tuple("FullscreenTargetChange")
                .field(&target.as_ref().map(|t| t.node_id()))
                .finish(),
            Action::RootContextChange(root) => f
                .debug_tuple("RootContextChange")
                .field(&root.is_some())
                .finish(),
            Action::OptionsChange(patch) => f.debug_tuple("OptionsChange").field(patch).finish(),
        }
    }
}

/// Work that arrived while a reconciliation pass was executing.
enum Deferred {
    Event(StateKey, MediaEvent),
    Hook(StateKey, HookSignal),
}

/// Reconciliation bookkeeping. At most one pass is ever in flight.
#[derive(Default)]
struct Reconcile {
    /// A pass is preparing or executing.
    in_flight: bool,
    /// A pass was requested since the current one read its inputs.
    requested: bool,
    /// Owner changes not yet committed, merged in arrival order.
    pending: OwnersDelta,
    /// The pass is wiring, committing or publishing.
    executing: bool,
    deferred: Vec<Deferred>,
    /// Owners are currently wired.
    monitoring: bool,
}

struct StoreInner {
    monitor_on_demand: bool,
    options: SharedOptions,
    owners: RwLock<Owners>,
    state: RwLock<MediaState>,
    subscriptions: SubscriptionManager,
    wiring: Mutex<Wiring>,
    reconcile: Mutex<Reconcile>,
}

/// Reactive media state store.
///
/// Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct MediaStore {
    inner: Arc<StoreInner>,
}

impl MediaStore {
    /// Create a store and run the initial reconciliation for the configured owners.
    pub fn new(config: StoreConfig) -> Self {
        let options = SharedOptions::new(config.options);
        let owners = Owners::empty(options.clone(), config.platform);
        let state = MediaState::from_patch(facade::snapshot(&owners));

        let inner = Arc::new(StoreInner {
            monitor_on_demand: config.monitor_on_demand,
            options,
            owners: RwLock::new(owners),
            state: RwLock::new(state),
            subscriptions: SubscriptionManager::new(),
            wiring: Mutex::new(Wiring::new()),
            reconcile: Mutex::new(Reconcile::default()),
        });

        inner.request_reconcile(OwnersDelta {
            media: Some(config.media),
            root: Some(config.root),
            fullscreen_target: Some(config.fullscreen_target),
        });

        Self { inner }
    }

    /// Route one action.
    ///
    /// Requests are ignored while the snapshot carries a fatal media error;
    /// owner and options changes are always processed.
    pub fn dispatch(&self, action: impl Into<Action>) -> Result<()> {
        match action.into() {
            Action::Request(request) => self.inner.handle_request(&request),
            Action::MediaChange(media) => {
                self.inner.request_reconcile(OwnersDelta::media(media));
                Ok(())
            }
            Action::FullscreenTargetChange(target) => {
                self.inner
                    .request_reconcile(OwnersDelta::fullscreen_target(target));
                Ok(())
            }
            Action::RootContextChange(root) => {
                self.inner.request_reconcile(OwnersDelta::root(root));
                Ok(())
            }
            Action::OptionsChange(patch) => {
                tracing::debug!(?patch, "patching options");
                self.inner.options.patch(&patch);
                Ok(())
            }
        }
    }

    /// The latest published snapshot.
    pub fn get_state(&self) -> MediaState {
        self.inner.state.read().clone()
    }

    /// The committed owners.
    pub fn owners(&self) -> Owners {
        self.inner.owners.read().clone()
    }

    /// Current options.
    pub fn options(&self) -> StoreOptions {
        self.inner.options.get()
    }

    /// Register `callback`, deliver the current snapshot to it synchronously,
    /// and start monitoring owners if this is the first subscriber.
    pub fn subscribe(&self, callback: impl Fn(&MediaState) + Send + Sync + 'static) -> Unsubscribe {
        let callback: Subscriber = Arc::new(callback);
        let id = self.inner.subscriptions.add_callback(Arc::clone(&callback));
        callback(&self.get_state());
        self.inner.subscribers_changed();

        let store = Arc::downgrade(&self.inner);
        Unsubscribe::new(id, move |id| {
            if let Some(inner) = store.upgrade() {
                if inner.subscriptions.remove(id) {
                    inner.subscribers_changed();
                }
            }
        })
    }

    /// Subscribe through a bounded channel holding up to `buffer` snapshots.
    ///
    /// The current snapshot is queued immediately. A receiver that falls
    /// `buffer` snapshots behind is dropped and stops counting as a subscriber.
    pub fn watch(&self, buffer: usize) -> StateReceiver {
        let receiver = self.inner.subscriptions.add_channel(buffer);
        self.inner
            .subscriptions
            .send_to(receiver.id, &self.get_state());
        self.inner.subscribers_changed();
        receiver
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriptions.subscription_count()
    }

    /// True while listeners are attached to the owners.
    pub fn is_monitoring(&self) -> bool {
        self.inner.reconcile.lock().monitoring
    }

    /// True while an owner change is waiting for its media to become ready.
    pub fn is_reconciling(&self) -> bool {
        self.inner.reconcile.lock().in_flight
    }

    /// Listeners currently attached across all owners.
    pub fn attached_listener_count(&self) -> usize {
        self.inner.wiring.lock().listener_count()
    }
}

impl std::fmt::Debug for MediaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStore")
            .field("owners", &*self.inner.owners.read())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl StoreInner {
    fn handle_request(self: &Arc<Self>, request: &Request) -> Result<()> {
        if !self.state.read().get(StateKey::ErrorCode).is_unset() {
            tracing::debug!(request = %request.kind(), "ignoring request while media is in error");
            return Ok(());
        }
        let owners = self.owners.read().clone();
        if let Some(patch) = requests::handle(&owners, request)? {
            self.commit(&patch);
        }
        Ok(())
    }

    fn wants_monitoring(&self) -> bool {
        !self.monitor_on_demand || self.subscriptions.subscription_count() > 0
    }

    fn subscribers_changed(self: &Arc<Self>) {
        let monitoring = self.reconcile.lock().monitoring;
        if monitoring != self.wants_monitoring() {
            self.request_reconcile(OwnersDelta::default());
        }
    }

    // --- Reconciliation ---

    /// Queue an owner change. Starts a pass unless one is already in flight,
    /// in which case the change is folded into it.
    fn request_reconcile(self: &Arc<Self>, delta: OwnersDelta) {
        {
            let mut r = self.reconcile.lock();
            r.pending.merge(delta);
            r.requested = true;
            if r.in_flight {
                tracing::debug!(pending = ?r.pending, "coalescing owner change into pending pass");
                return;
            }
            r.in_flight = true;
        }
        self.prepare();
    }

    /// Wait for pending media to become ready before wiring anything onto it.
    fn prepare(self: &Arc<Self>) {
        let media = self.reconcile.lock().pending.media_to_prepare();
        let Some(media) = media else {
            self.execute();
            return;
        };

        let store = Arc::downgrade(self);
        let prepared = Arc::clone(&media);
        media.when_ready(Box::new(move || {
            if let Some(inner) = store.upgrade() {
                inner.prepared(&prepared);
            }
        }));
    }

    fn prepared(self: &Arc<Self>, media: &Arc<dyn MediaOwner>) {
        let superseded = {
            let r = self.reconcile.lock();
            match r.pending.media_to_prepare() {
                Some(pending) => !same_owner(&pending, media),
                None => false,
            }
        };
        if superseded {
            // A later media change won while this one was preparing.
            tracing::debug!("media replaced while preparing, preparing the newer one");
            self.prepare();
        } else {
            self.execute();
        }
    }

    /// Teardown, setup, commit, recompute, publish. Then replay whatever was
    /// deferred and start another pass if more changes arrived meanwhile.
    fn execute(self: &Arc<Self>) {
        let delta = {
            let mut r = self.reconcile.lock();
            r.executing = true;
            r.requested = false;
            std::mem::take(&mut r.pending)
        };

        let current = self.owners.read().clone();
        let next = current.apply(&delta);
        let monitor = self.wants_monitoring();

        let media_replaced = match (&current.media, &next.media) {
            (Some(a), Some(b)) => !same_owner(a, b),
            (None, None) => false,
            _ => true,
        };
        let media_rewired = self.rewire(&next, monitor);

        *self.owners.write() = next.clone();
        self.reconcile.lock().monitoring = monitor;

        self.commit(&facade::recompute(&next, media_replaced || media_rewired));
        self.replay_deferred();

        let again = {
            let mut r = self.reconcile.lock();
            r.executing = false;
            if r.requested {
                true
            } else {
                r.in_flight = false;
                false
            }
        };
        if again {
            self.prepare();
        }
    }

    /// Returns true if the media category was set up or torn down.
    fn rewire(self: &Arc<Self>, next: &Owners, monitor: bool) -> bool {
        let mut teardown = Vec::new();
        let mut setup = Vec::new();

        {
            let mut wiring = self.wiring.lock();
            for category in OwnerCategory::ALL {
                let new_owner = if monitor { next.category(category) } else { None };
                let attached = wiring.attached(category).cloned();
                if same_category_owner(&attached, &new_owner) {
                    continue;
                }
                if let Some(old) = wiring.take(category) {
                    teardown.push((category, old));
                }
                if let Some(owner) = new_owner {
                    setup.push((category, owner));
                }
            }
        }

        if teardown.is_empty() && setup.is_empty() {
            tracing::trace!("owners unchanged for wiring, recomputing only");
            return false;
        }

        let rerun_hooks = teardown.iter().any(|(c, _)| *c == OwnerCategory::Media)
            || setup.iter().any(|(c, _)| *c == OwnerCategory::Media);

        tracing::debug!(
            torn_down = ?teardown.iter().map(|(c, _)| *c).collect::<Vec<_>>(),
            set_up = ?setup.iter().map(|(c, _)| *c).collect::<Vec<_>>(),
            "rewiring owners"
        );

        if rerun_hooks {
            let hooks = self.wiring.lock().take_hooks();
            for (key, hook_teardown) in hooks {
                tracing::trace!(%key, "tearing down hook");
                hook_teardown();
            }
        }
        for (_, attached) in teardown {
            attached.detach();
        }

        for (category, owner) in setup {
            let attached = AttachedCategory::attach(category, owner, |key| self.listener(key));
            self.wiring.lock().insert(category, attached);
        }

        if rerun_hooks && next.media.is_some() && monitor {
            self.run_hooks(next);
        }
        rerun_hooks
    }

    fn run_hooks(self: &Arc<Self>, owners: &Owners) {
        for entry in facade::facade() {
            for hook in entry.hooks {
                let alive = Arc::new(AtomicBool::new(true));
                let handler = self.hook_handler(entry.key, Arc::clone(&alive));
                let teardown = hook(handler, owners);
                self.wiring.lock().add_hook(
                    entry.key,
                    Box::new(move || {
                        alive.store(false, Ordering::SeqCst);
                        if let Some(teardown) = teardown {
                            teardown();
                        }
                    }),
                );
            }
        }
    }

    fn listener(self: &Arc<Self>, key: StateKey) -> Listener {
        let store: Weak<StoreInner> = Arc::downgrade(self);
        Arc::new(move |event: &MediaEvent| {
            if let Some(inner) = store.upgrade() {
                inner.on_owner_event(key, event);
            }
        })
    }

    /// Signals from a torn-down hook are ignored.
    fn hook_handler(self: &Arc<Self>, key: StateKey, alive: Arc<AtomicBool>) -> HookHandler {
        let store: Weak<StoreInner> = Arc::downgrade(self);
        Arc::new(move |signal: HookSignal| {
            if !alive.load(Ordering::SeqCst) {
                return;
            }
            if let Some(inner) = store.upgrade() {
                inner.on_hook_signal(key, signal);
            }
        })
    }

    /// Queue `work` if a pass is executing. Returns the work back otherwise.
    fn defer(&self, work: Deferred) -> Option<Deferred> {
        let mut r = self.reconcile.lock();
        if r.executing {
            r.deferred.push(work);
            None
        } else {
            Some(work)
        }
    }

    fn replay_deferred(self: &Arc<Self>) {
        loop {
            let batch = std::mem::take(&mut self.reconcile.lock().deferred);
            if batch.is_empty() {
                return;
            }
            tracing::trace!(count = batch.len(), "replaying deferred work");
            for work in batch {
                self.apply(work);
            }
        }
    }

    fn on_owner_event(self: &Arc<Self>, key: StateKey, event: &MediaEvent) {
        if let Some(work) = self.defer(Deferred::Event(key, event.clone())) {
            self.apply(work);
        }
    }

    fn on_hook_signal(self: &Arc<Self>, key: StateKey, signal: HookSignal) {
        if let Some(work) = self.defer(Deferred::Hook(key, signal)) {
            self.apply(work);
        }
    }

    fn apply(self: &Arc<Self>, work: Deferred) {
        let owners = self.owners.read().clone();
        let value = match work {
            Deferred::Event(key, event) => {
                tracing::trace!(%key, event = %event.kind, "owner event");
                (key, facade::get(key, &owners, Some(&event)))
            }
            Deferred::Hook(key, HookSignal::Value(value)) => (key, value),
            Deferred::Hook(key, HookSignal::Event(event)) => {
                (key, facade::get(key, &owners, Some(&event)))
            }
            Deferred::Hook(key, HookSignal::Recompute) => (key, facade::get(key, &owners, None)),
        };
        self.commit(&StatePatch::new().with(value.0, value.1));
    }

    // --- Publishing ---

    /// Merge `patch` into the snapshot and publish if anything changed.
    fn commit(self: &Arc<Self>, patch: &StatePatch) {
        let next = {
            let mut state = self.state.write();
            match state.merge(patch) {
                Some(next) => {
                    *state = next.clone();
                    next
                }
                None => return,
            }
        };
        tracing::trace!(keys = patch.len(), "publishing snapshot");
        let dropped = self.subscriptions.broadcast(&next);
        if dropped > 0 {
            self.subscribers_changed();
        }
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        let wiring = self.wiring.get_mut();
        if !wiring.is_empty() {
            tracing::debug!(listeners = wiring.listener_count(), "detaching from owners");
            wiring.clear();
        }
    }
}
