//! Collaborator contracts: the external, event-emitting objects the store reads
//! from and writes to but never constructs.

use crate::error::OwnerError;
use crate::types::{
    AudioTrackInfo, Cue, MediaEvent, NodeId, PresentationMode, ReadyState, RemoteState,
    RenditionInfo, StreamType, TextTrackKind, TextTrackMode, TimeRange,
};
use std::sync::Arc;

/// An event callback attached to an owner.
pub type Listener = Arc<dyn Fn(&MediaEvent) + Send + Sync>;

/// Identifies one attached listener instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Identifies one availability watch on a remote playback handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// Something listeners can be attached to.
///
/// `remove_event_listener` must only remove the instance identified by `id`,
/// never other listeners registered for the same event name.
pub trait EventTarget: Send + Sync {
    fn add_event_listener(&self, event: &str, listener: Listener) -> ListenerId;
    fn remove_event_listener(&self, event: &str, id: ListenerId);
}

/// An encapsulation boundary (shadow root) hosted by a custom element.
pub trait ShadowBoundary: Send + Sync {
    /// The boundary's own fullscreen element accessor.
    ///
    /// Returns `None` when the boundary has no such accessor, `Some(None)` when it
    /// has one but nothing inside it is fullscreen.
    fn fullscreen_element(&self) -> Option<Option<Arc<dyn ElementNode>>>;
}

/// An element-like node with identity.
pub trait ElementNode: Send + Sync {
    fn node_id(&self) -> NodeId;

    /// Custom elements may host their own encapsulation boundary.
    fn is_custom_element(&self) -> bool {
        false
    }

    fn shadow_root(&self) -> Option<Arc<dyn ShadowBoundary>> {
        None
    }

    /// True if `other` is this node or a descendant, crossing encapsulation boundaries.
    fn contains_composed(&self, other: NodeId) -> bool {
        other == self.node_id()
    }
}

/// The element that should go fullscreen (usually the player container).
pub trait FullscreenElement: ElementNode {
    fn supports_fullscreen(&self) -> bool {
        true
    }

    fn request_fullscreen(&self) -> Result<(), OwnerError>;
}

/// Media error reported by the playback element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaErrorInfo {
    pub code: u16,
    pub message: String,
}

/// The playback element.
///
/// Only the playback primitives are required; every richer capability has a
/// default meaning "not available on this owner".
pub trait MediaOwner: EventTarget + ElementNode {
    fn paused(&self) -> bool;
    fn play(&self) -> Result<(), OwnerError>;
    fn pause(&self);
    fn current_time(&self) -> f64;
    fn set_current_time(&self, time: f64);
    fn duration(&self) -> f64;
    /// `None` if the owner has no volume control at all.
    fn volume(&self) -> Option<f64>;
    fn set_volume(&self, volume: f64);
    fn muted(&self) -> bool;
    fn set_muted(&self, muted: bool);
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&self, rate: f64);
    /// `None` if the owner exposes no seekable ranges object at all.
    fn seekable(&self) -> Option<Vec<TimeRange>>;
    fn buffered(&self) -> Vec<TimeRange>;
    fn ready_state(&self) -> ReadyState;

    fn ended(&self) -> bool {
        false
    }

    fn video_size(&self) -> (u32, u32) {
        (0, 0)
    }

    fn error(&self) -> Option<MediaErrorInfo> {
        None
    }

    fn has_source(&self) -> bool {
        true
    }

    fn text_tracks(&self) -> Option<Arc<dyn TextTrackList>> {
        None
    }

    fn video_renditions(&self) -> Option<Arc<dyn RenditionList>> {
        None
    }

    fn audio_tracks(&self) -> Option<Arc<dyn AudioTrackList>> {
        None
    }

    fn remote(&self) -> Option<Arc<dyn RemotePlayback>> {
        None
    }

    /// Explicit stream type, when the owner knows it.
    fn stream_type(&self) -> Option<StreamType> {
        None
    }

    fn target_live_window(&self) -> Option<f64> {
        None
    }

    /// Explicit start of the live edge window, when the owner computes it.
    fn live_edge_start(&self) -> Option<f64> {
        None
    }

    /// Vendor presentation mode, when the owner reports one.
    fn presentation_mode(&self) -> Option<PresentationMode> {
        None
    }

    /// Vendor element-level fullscreen flag.
    fn displaying_fullscreen(&self) -> Option<bool> {
        None
    }

    fn supports_native_fullscreen(&self) -> bool {
        false
    }

    fn enter_native_fullscreen(&self) -> Result<(), OwnerError> {
        Err(OwnerError::NotSupported("native fullscreen".into()))
    }

    fn exit_native_fullscreen(&self) {}

    fn supports_picture_in_picture(&self) -> bool {
        false
    }

    fn request_picture_in_picture(&self) -> Result<(), OwnerError> {
        Err(OwnerError::NotSupported("picture-in-picture".into()))
    }

    fn supports_airplay(&self) -> bool {
        false
    }

    fn show_playback_target_picker(&self) {}

    fn is_airplaying(&self) -> bool {
        false
    }

    /// Invoke `ready` once the owner has finished any asynchronous upgrade.
    fn when_ready(&self, ready: Box<dyn FnOnce() + Send>) {
        ready()
    }
}

pub trait TextTrack: Send + Sync {
    fn kind(&self) -> TextTrackKind;
    fn label(&self) -> String;
    fn language(&self) -> String;
    fn mode(&self) -> TextTrackMode;
    fn set_mode(&self, mode: TextTrackMode);
    fn cues(&self) -> Vec<Cue>;
    /// Source URL, used as base for relative cue payloads.
    fn src(&self) -> Option<String> {
        None
    }
}

pub trait TextTrackList: EventTarget {
    fn tracks(&self) -> Vec<Arc<dyn TextTrack>>;
}

pub trait RenditionList: EventTarget {
    fn renditions(&self) -> Vec<RenditionInfo>;
    fn selected_index(&self) -> Option<usize>;
    fn set_selected_index(&self, index: Option<usize>);
}

pub trait AudioTrackList: EventTarget {
    fn tracks(&self) -> Vec<AudioTrackInfo>;
    fn set_enabled(&self, id: &str, enabled: bool);
}

/// Availability callback registered with a remote playback handle.
pub type AvailabilityCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Remote playback (cast) handle.
pub trait RemotePlayback: EventTarget {
    fn state(&self) -> RemoteState;
    fn prompt(&self) -> Result<(), OwnerError>;
    fn watch_availability(&self, callback: AvailabilityCallback) -> Result<WatchId, OwnerError>;
    fn cancel_watch_availability(&self, id: WatchId);
}

/// Document-like root context.
pub trait RootContext: EventTarget {
    fn fullscreen_element(&self) -> Option<Arc<dyn ElementNode>>;
    fn exit_fullscreen(&self);

    fn fullscreen_enabled(&self) -> bool {
        true
    }

    fn picture_in_picture_element(&self) -> Option<NodeId> {
        None
    }

    fn exit_picture_in_picture(&self) {}

    fn picture_in_picture_enabled(&self) -> bool {
        false
    }
}
