//! Owners: the external objects whose state the store mirrors.
//!
//! An [`Owners`] value is immutable. Replacing an owner produces a new value via
//! [`Owners::apply`]; the store swaps it in only after a reconciliation pass
//! completes, so no caller ever sees a half-updated owner set.

mod capabilities;
mod traits;

pub use capabilities::Capabilities;
pub use traits::{
    AudioTrackList, AvailabilityCallback, ElementNode, EventTarget, FullscreenElement, Listener,
    ListenerId, MediaErrorInfo, MediaOwner, RemotePlayback, RenditionList, RootContext,
    ShadowBoundary, TextTrack, TextTrackList, WatchId,
};

use crate::options::{OptionsPatch, StoreOptions};
use crate::platform::Platform;
use crate::types::OwnerCategory;
use parking_lot::RwLock;
use std::sync::Arc;

/// Options record shared by every owners version of one store.
///
/// Patched in place; getters read it live on their next evaluation.
#[derive(Clone, Debug, Default)]
pub struct SharedOptions(Arc<RwLock<StoreOptions>>);

impl SharedOptions {
    pub fn new(options: StoreOptions) -> Self {
        Self(Arc::new(RwLock::new(options)))
    }

    pub fn get(&self) -> StoreOptions {
        self.0.read().clone()
    }

    pub fn patch(&self, patch: &OptionsPatch) {
        self.0.write().apply(patch);
    }
}

/// Identity comparison for owner handles.
pub fn same_owner<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Current owners of one store.
#[derive(Clone)]
pub struct Owners {
    pub media: Option<Arc<dyn MediaOwner>>,
    pub root: Option<Arc<dyn RootContext>>,
    /// Element that enters fullscreen. Defaults to the media itself when unset.
    pub fullscreen_target: Option<Arc<dyn FullscreenElement>>,
    pub options: SharedOptions,
    pub platform: Arc<Platform>,
    caps: Capabilities,
}

impl Owners {
    /// An owners value with nothing attached.
    pub fn empty(options: SharedOptions, platform: Arc<Platform>) -> Self {
        Self {
            media: None,
            root: None,
            fullscreen_target: None,
            options,
            platform,
            caps: Capabilities::default(),
        }
    }

    /// A new owners value with `delta` applied and capabilities re-probed.
    pub fn apply(&self, delta: &OwnersDelta) -> Self {
        let media = match &delta.media {
            Some(next) => next.clone(),
            None => self.media.clone(),
        };
        let root = match &delta.root {
            Some(next) => next.clone(),
            None => self.root.clone(),
        };
        let fullscreen_target = match &delta.fullscreen_target {
            Some(next) => next.clone(),
            None => self.fullscreen_target.clone(),
        };
        let caps = Capabilities::probe(media.as_ref());
        Self {
            media,
            root,
            fullscreen_target,
            options: self.options.clone(),
            platform: Arc::clone(&self.platform),
            caps,
        }
    }

    pub fn caps(&self) -> &Capabilities {
        &self.caps
    }

    /// Snapshot of the live options record.
    pub fn options(&self) -> StoreOptions {
        self.options.get()
    }

    pub fn text_tracks(&self) -> Option<&Arc<dyn TextTrackList>> {
        self.caps.text_tracks.as_ref()
    }

    pub fn video_renditions(&self) -> Option<&Arc<dyn RenditionList>> {
        self.caps.video_renditions.as_ref()
    }

    pub fn audio_tracks(&self) -> Option<&Arc<dyn AudioTrackList>> {
        self.caps.audio_tracks.as_ref()
    }

    pub fn remote(&self) -> Option<&Arc<dyn RemotePlayback>> {
        self.caps.remote.as_ref()
    }

    /// The event source for one wiring category, if present.
    pub fn category(&self, category: OwnerCategory) -> Option<CategoryOwner> {
        match category {
            OwnerCategory::Media => self.media.clone().map(CategoryOwner::Media),
            OwnerCategory::TextTracks => self.caps.text_tracks.clone().map(CategoryOwner::TextTracks),
            OwnerCategory::VideoRenditions => self
                .caps
                .video_renditions
                .clone()
                .map(CategoryOwner::VideoRenditions),
            OwnerCategory::AudioTracks => {
                self.caps.audio_tracks.clone().map(CategoryOwner::AudioTracks)
            }
            OwnerCategory::Remote => self.caps.remote.clone().map(CategoryOwner::Remote),
            OwnerCategory::Root => self.root.clone().map(CategoryOwner::Root),
        }
    }
}

impl std::fmt::Debug for Owners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Owners")
            .field("media", &self.media.as_ref().map(|m| m.node_id()))
            .field("root", &self.root.is_some())
            .field(
                "fullscreen_target",
                &self.fullscreen_target.as_ref().map(|t| t.node_id()),
            )
            .field("caps", &self.caps)
            .finish()
    }
}

/// A pending owner replacement. `Some(None)` clears an owner; `None` leaves it.
#[derive(Clone, Default)]
pub struct OwnersDelta {
    pub media: Option<Option<Arc<dyn MediaOwner>>>,
    pub root: Option<Option<Arc<dyn RootContext>>>,
    pub fullscreen_target: Option<Option<Arc<dyn FullscreenElement>>>,
}

impl OwnersDelta {
    pub fn media(media: Option<Arc<dyn MediaOwner>>) -> Self {
        Self {
            media: Some(media),
            ..Default::default()
        }
    }

    pub fn root(root: Option<Arc<dyn RootContext>>) -> Self {
        Self {
            root: Some(root),
            ..Default::default()
        }
    }

    pub fn fullscreen_target(target: Option<Arc<dyn FullscreenElement>>) -> Self {
        Self {
            fullscreen_target: Some(target),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.media.is_none() && self.root.is_none() && self.fullscreen_target.is_none()
    }

    /// Fold a later delta into this one. Later values win field by field.
    pub fn merge(&mut self, later: OwnersDelta) {
        if later.media.is_some() {
            self.media = later.media;
        }
        if later.root.is_some() {
            self.root = later.root;
        }
        if later.fullscreen_target.is_some() {
            self.fullscreen_target = later.fullscreen_target;
        }
    }

    /// The media that must be prepared before this delta can be wired.
    pub fn media_to_prepare(&self) -> Option<Arc<dyn MediaOwner>> {
        self.media.clone().flatten()
    }
}

impl std::fmt::Debug for OwnersDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnersDelta")
            .field(
                "media",
                &self.media.as_ref().map(|m| m.as_ref().map(|m| m.node_id())),
            )
            .field("root", &self.root.as_ref().map(|r| r.is_some()))
            .field(
                "fullscreen_target",
                &self
                    .fullscreen_target
                    .as_ref()
                    .map(|t| t.as_ref().map(|t| t.node_id())),
            )
            .finish()
    }
}

/// Event source of one wiring category.
#[derive(Clone)]
pub enum CategoryOwner {
    Media(Arc<dyn MediaOwner>),
    TextTracks(Arc<dyn TextTrackList>),
    VideoRenditions(Arc<dyn RenditionList>),
    AudioTracks(Arc<dyn AudioTrackList>),
    Remote(Arc<dyn RemotePlayback>),
    Root(Arc<dyn RootContext>),
}

impl CategoryOwner {
    pub fn add_event_listener(&self, event: &str, listener: Listener) -> ListenerId {
        match self {
            CategoryOwner::Media(o) => o.add_event_listener(event, listener),
            CategoryOwner::TextTracks(o) => o.add_event_listener(event, listener),
            CategoryOwner::VideoRenditions(o) => o.add_event_listener(event, listener),
            CategoryOwner::AudioTracks(o) => o.add_event_listener(event, listener),
            CategoryOwner::Remote(o) => o.add_event_listener(event, listener),
            CategoryOwner::Root(o) => o.add_event_listener(event, listener),
        }
    }

    pub fn remove_event_listener(&self, event: &str, id: ListenerId) {
        match self {
            CategoryOwner::Media(o) => o.remove_event_listener(event, id),
            CategoryOwner::TextTracks(o) => o.remove_event_listener(event, id),
            CategoryOwner::VideoRenditions(o) => o.remove_event_listener(event, id),
            CategoryOwner::AudioTracks(o) => o.remove_event_listener(event, id),
            CategoryOwner::Remote(o) => o.remove_event_listener(event, id),
            CategoryOwner::Root(o) => o.remove_event_listener(event, id),
        }
    }

    /// Reference identity.
    pub fn same(&self, other: &CategoryOwner) -> bool {
        match (self, other) {
            (CategoryOwner::Media(a), CategoryOwner::Media(b)) => same_owner(a, b),
            (CategoryOwner::TextTracks(a), CategoryOwner::TextTracks(b)) => same_owner(a, b),
            (CategoryOwner::VideoRenditions(a), CategoryOwner::VideoRenditions(b)) => {
                same_owner(a, b)
            }
            (CategoryOwner::AudioTracks(a), CategoryOwner::AudioTracks(b)) => same_owner(a, b),
            (CategoryOwner::Remote(a), CategoryOwner::Remote(b)) => same_owner(a, b),
            (CategoryOwner::Root(a), CategoryOwner::Root(b)) => same_owner(a, b),
            _ => false,
        }
    }
}

/// True if both slots hold the same owner (or are both empty).
pub fn same_category_owner(a: &Option<CategoryOwner>, b: &Option<CategoryOwner>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.same(b),
        (None, None) => true,
        _ => false,
    }
}
