//! Fake document root, fullscreen container and encapsulation boundaries.

use super::media::FakeMedia;
use super::ListenerSet;
use crate::error::OwnerError;
use crate::owners::{
    ElementNode, EventTarget, FullscreenElement, Listener, ListenerId, RootContext, ShadowBoundary,
};
use crate::types::{MediaEvent, NodeId};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

struct RootState {
    fullscreen: Option<Arc<dyn ElementNode>>,
    pip: Weak<FakeMedia>,
    fullscreen_enabled: bool,
    pip_enabled: bool,
}

/// Document-like root. Fires `fullscreenchange` when its fullscreen element changes.
pub struct FakeRoot {
    listeners: ListenerSet,
    state: Mutex<RootState>,
}

impl FakeRoot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            listeners: ListenerSet::new(),
            state: Mutex::new(RootState {
                fullscreen: None,
                pip: Weak::new(),
                fullscreen_enabled: true,
                pip_enabled: true,
            }),
        })
    }

    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    pub fn set_fullscreen_element(&self, element: Option<Arc<dyn ElementNode>>) {
        self.state.lock().fullscreen = element;
        self.listeners.fire(&MediaEvent::new("fullscreenchange"));
    }

    pub fn set_fullscreen_enabled(&self, enabled: bool) {
        self.state.lock().fullscreen_enabled = enabled;
    }

    pub fn set_picture_in_picture_enabled(&self, enabled: bool) {
        self.state.lock().pip_enabled = enabled;
    }

    pub(super) fn set_picture_in_picture(&self, media: Weak<FakeMedia>) {
        self.state.lock().pip = media;
    }

    pub(super) fn clear_picture_in_picture(&self, media: NodeId) {
        let mut state = self.state.lock();
        if state.pip.upgrade().is_some_and(|m| m.node_id() == media) {
            state.pip = Weak::new();
        }
    }
}

impl EventTarget for FakeRoot {
    fn add_event_listener(&self, event: &str, listener: Listener) -> ListenerId {
        self.listeners.add(event, listener)
    }

    fn remove_event_listener(&self, event: &str, id: ListenerId) {
        self.listeners.remove(event, id)
    }
}

impl RootContext for FakeRoot {
    fn fullscreen_element(&self) -> Option<Arc<dyn ElementNode>> {
        self.state.lock().fullscreen.clone()
    }

    fn exit_fullscreen(&self) {
        let had = self.state.lock().fullscreen.take().is_some();
        if had {
            self.listeners.fire(&MediaEvent::new("fullscreenchange"));
        }
    }

    fn fullscreen_enabled(&self) -> bool {
        self.state.lock().fullscreen_enabled
    }

    fn picture_in_picture_element(&self) -> Option<NodeId> {
        self.state.lock().pip.upgrade().map(|m| m.node_id())
    }

    fn exit_picture_in_picture(&self) {
        let media = self.state.lock().pip.upgrade();
        if let Some(media) = media {
            media.leave_picture_in_picture();
        }
    }

    fn picture_in_picture_enabled(&self) -> bool {
        self.state.lock().pip_enabled
    }
}

/// Player container. Requesting fullscreen makes it the root's fullscreen element.
pub struct FakeElement {
    id: NodeId,
    this: Weak<FakeElement>,
    root: Weak<FakeRoot>,
    custom: bool,
    shadow: Option<Arc<FakeShadowRoot>>,
    descendants: Mutex<Vec<NodeId>>,
    request_error: Mutex<Option<OwnerError>>,
}

impl FakeElement {
    pub fn new(root: &Arc<FakeRoot>) -> Arc<Self> {
        Self::build(root, false, None)
    }

    /// A custom element, optionally hosting an encapsulation boundary.
    pub fn custom(root: &Arc<FakeRoot>, shadow: Option<Arc<FakeShadowRoot>>) -> Arc<Self> {
        Self::build(root, true, shadow)
    }

    fn build(root: &Arc<FakeRoot>, custom: bool, shadow: Option<Arc<FakeShadowRoot>>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id: NodeId::fresh(),
            this: this.clone(),
            root: Arc::downgrade(root),
            custom,
            shadow,
            descendants: Mutex::new(Vec::new()),
            request_error: Mutex::new(None),
        })
    }

    /// Record `node` as living inside this element (across boundaries).
    pub fn add_descendant(&self, node: NodeId) {
        self.descendants.lock().push(node);
    }

    pub fn fail_requests(&self, error: OwnerError) {
        *self.request_error.lock() = Some(error);
    }
}

impl ElementNode for FakeElement {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn is_custom_element(&self) -> bool {
        self.custom
    }

    fn shadow_root(&self) -> Option<Arc<dyn ShadowBoundary>> {
        self.shadow
            .clone()
            .map(|s| s as Arc<dyn ShadowBoundary>)
    }

    fn contains_composed(&self, other: NodeId) -> bool {
        other == self.id || self.descendants.lock().contains(&other)
    }
}

impl FullscreenElement for FakeElement {
    fn request_fullscreen(&self) -> Result<(), OwnerError> {
        if let Some(err) = self.request_error.lock().clone() {
            return Err(err);
        }
        let (Some(root), Some(this)) = (self.root.upgrade(), self.this.upgrade()) else {
            return Err(OwnerError::NotAllowed("element is detached".into()));
        };
        root.set_fullscreen_element(Some(this as Arc<dyn ElementNode>));
        Ok(())
    }
}

/// Encapsulation boundary with an optional fullscreen element accessor.
pub struct FakeShadowRoot {
    has_accessor: bool,
    fullscreen: Mutex<Option<Arc<dyn ElementNode>>>,
}

impl FakeShadowRoot {
    pub fn new() -> Arc<Self> {
        Self::build(true)
    }

    /// A boundary without its own fullscreen element accessor.
    pub fn opaque() -> Arc<Self> {
        Self::build(false)
    }

    fn build(has_accessor: bool) -> Arc<Self> {
        Arc::new(Self {
            has_accessor,
            fullscreen: Mutex::new(None),
        })
    }

    pub fn set_fullscreen_element(&self, element: Option<Arc<dyn ElementNode>>) {
        *self.fullscreen.lock() = element;
    }
}

impl ShadowBoundary for FakeShadowRoot {
    fn fullscreen_element(&self) -> Option<Option<Arc<dyn ElementNode>>> {
        self.has_accessor
            .then(|| self.fullscreen.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_fullscreen_sets_root_element() {
        let root = FakeRoot::new();
        let element = FakeElement::new(&root);
        element.request_fullscreen().unwrap();

        let current = root.fullscreen_element().unwrap();
        assert_eq!(current.node_id(), element.node_id());

        root.exit_fullscreen();
        assert!(root.fullscreen_element().is_none());
    }
}
