//! Fake sub-collections: text tracks, renditions, audio tracks, remote playback.

use super::ListenerSet;
use crate::error::OwnerError;
use crate::owners::{
    AudioTrackList, AvailabilityCallback, EventTarget, Listener, ListenerId, RemotePlayback,
    RenditionList, TextTrack, TextTrackList, WatchId,
};
use crate::types::{
    AudioTrackInfo, Cue, EventDetail, MediaEvent, RemoteState, RenditionInfo, TextTrackKind,
    TextTrackMode,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

macro_rules! event_target {
    ($ty:ty) => {
        impl EventTarget for $ty {
            fn add_event_listener(&self, event: &str, listener: Listener) -> ListenerId {
                self.listeners.add(event, listener)
            }

            fn remove_event_listener(&self, event: &str, id: ListenerId) {
                self.listeners.remove(event, id)
            }
        }

        impl $ty {
            pub fn listeners(&self) -> &ListenerSet {
                &self.listeners
            }
        }
    };
}

// --- Text tracks ---

pub struct FakeTextTrack {
    kind: TextTrackKind,
    label: String,
    language: String,
    src: Option<String>,
    mode: Mutex<TextTrackMode>,
    cues: Mutex<Vec<Cue>>,
    list: Mutex<Weak<FakeTextTracks>>,
}

impl FakeTextTrack {
    pub fn new(kind: TextTrackKind, label: &str, language: &str) -> Arc<Self> {
        Self::with_cues(kind, label, language, Vec::new(), None)
    }

    pub fn with_cues(
        kind: TextTrackKind,
        label: &str,
        language: &str,
        cues: Vec<Cue>,
        src: Option<&str>,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            label: label.to_string(),
            language: language.to_string(),
            src: src.map(str::to_string),
            mode: Mutex::new(TextTrackMode::Disabled),
            cues: Mutex::new(cues),
            list: Mutex::new(Weak::new()),
        })
    }

    pub fn subtitles(language: &str, label: &str) -> Arc<Self> {
        Self::new(TextTrackKind::Subtitles, label, language)
    }

    pub fn set_cues(&self, cues: Vec<Cue>) {
        *self.cues.lock() = cues;
    }
}

impl TextTrack for FakeTextTrack {
    fn kind(&self) -> TextTrackKind {
        self.kind
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn language(&self) -> String {
        self.language.clone()
    }

    fn mode(&self) -> TextTrackMode {
        *self.mode.lock()
    }

    /// Mode changes are reported by the owning list as `change`.
    fn set_mode(&self, mode: TextTrackMode) {
        let changed = {
            let mut current = self.mode.lock();
            std::mem::replace(&mut *current, mode) != mode
        };
        if !changed {
            return;
        }
        let list = self.list.lock().upgrade();
        if let Some(list) = list {
            list.listeners
                .fire(&MediaEvent::new("change").with_detail(EventDetail::Track(self.kind)));
        }
    }

    fn cues(&self) -> Vec<Cue> {
        self.cues.lock().clone()
    }

    fn src(&self) -> Option<String> {
        self.src.clone()
    }
}

#[derive(Default)]
pub struct FakeTextTracks {
    listeners: ListenerSet,
    tracks: Mutex<Vec<Arc<FakeTextTrack>>>,
}

event_target!(FakeTextTracks);

impl FakeTextTracks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a track and fire `addtrack`.
    pub fn add_track(self: &Arc<Self>, track: Arc<FakeTextTrack>) {
        *track.list.lock() = Arc::downgrade(self);
        let kind = track.kind;
        self.tracks.lock().push(track);
        self.listeners
            .fire(&MediaEvent::new("addtrack").with_detail(EventDetail::Track(kind)));
    }

    /// Remove a track (by identity) and fire `removetrack`.
    pub fn remove_track(&self, track: &Arc<FakeTextTrack>) {
        let removed = {
            let mut tracks = self.tracks.lock();
            let before = tracks.len();
            tracks.retain(|t| !Arc::ptr_eq(t, track));
            before != tracks.len()
        };
        if removed {
            *track.list.lock() = Weak::new();
            self.listeners
                .fire(&MediaEvent::new("removetrack").with_detail(EventDetail::Track(track.kind)));
        }
    }
}

impl TextTrackList for FakeTextTracks {
    fn tracks(&self) -> Vec<Arc<dyn TextTrack>> {
        self.tracks
            .lock()
            .iter()
            .map(|t| Arc::clone(t) as Arc<dyn TextTrack>)
            .collect()
    }
}

// --- Renditions ---

#[derive(Default)]
pub struct FakeRenditions {
    listeners: ListenerSet,
    renditions: Mutex<Vec<RenditionInfo>>,
    selected: Mutex<Option<usize>>,
}

event_target!(FakeRenditions);

impl FakeRenditions {
    pub fn new(renditions: Vec<RenditionInfo>) -> Arc<Self> {
        Arc::new(Self {
            renditions: Mutex::new(renditions),
            ..Default::default()
        })
    }

    pub fn add_rendition(&self, rendition: RenditionInfo) {
        self.renditions.lock().push(rendition);
        self.listeners.fire(&MediaEvent::new("addrendition"));
    }
}

impl RenditionList for FakeRenditions {
    fn renditions(&self) -> Vec<RenditionInfo> {
        self.renditions.lock().clone()
    }

    fn selected_index(&self) -> Option<usize> {
        *self.selected.lock()
    }

    fn set_selected_index(&self, index: Option<usize>) {
        let changed = std::mem::replace(&mut *self.selected.lock(), index) != index;
        if changed {
            self.listeners.fire(&MediaEvent::new("change"));
        }
    }
}

// --- Audio tracks ---

#[derive(Default)]
pub struct FakeAudioTracks {
    listeners: ListenerSet,
    tracks: Mutex<Vec<AudioTrackInfo>>,
}

event_target!(FakeAudioTracks);

impl FakeAudioTracks {
    pub fn new(tracks: Vec<AudioTrackInfo>) -> Arc<Self> {
        Arc::new(Self {
            tracks: Mutex::new(tracks),
            ..Default::default()
        })
    }

    pub fn add_track(&self, track: AudioTrackInfo) {
        self.tracks.lock().push(track);
        self.listeners.fire(&MediaEvent::new("addtrack"));
    }
}

impl AudioTrackList for FakeAudioTracks {
    fn tracks(&self) -> Vec<AudioTrackInfo> {
        self.tracks.lock().clone()
    }

    fn set_enabled(&self, id: &str, enabled: bool) {
        let changed = {
            let mut tracks = self.tracks.lock();
            match tracks.iter_mut().find(|t| t.id == id) {
                Some(track) if track.enabled != enabled => {
                    track.enabled = enabled;
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.listeners.fire(&MediaEvent::new("change"));
        }
    }
}

// --- Remote playback ---

struct RemoteInner {
    state: RemoteState,
    available: bool,
    watchers: BTreeMap<u64, AvailabilityCallback>,
    next_watch: u64,
}

/// Remote playback handle. `prompt` connects when disconnected and
/// disconnects when connected, firing the matching events.
pub struct FakeRemote {
    listeners: ListenerSet,
    inner: Mutex<RemoteInner>,
    watch_error: Option<OwnerError>,
    prompt_error: Mutex<Option<OwnerError>>,
}

event_target!(FakeRemote);

impl FakeRemote {
    pub fn new(available: bool) -> Arc<Self> {
        Self::build(available, None)
    }

    /// A remote whose availability watching always fails with `error`.
    pub fn unwatchable(error: OwnerError) -> Arc<Self> {
        Self::build(false, Some(error))
    }

    fn build(available: bool, watch_error: Option<OwnerError>) -> Arc<Self> {
        Arc::new(Self {
            listeners: ListenerSet::new(),
            inner: Mutex::new(RemoteInner {
                state: RemoteState::Disconnected,
                available,
                watchers: BTreeMap::new(),
                next_watch: 0,
            }),
            watch_error,
            prompt_error: Mutex::new(None),
        })
    }

    /// Report a target appearing or disappearing to every watcher.
    pub fn set_available(&self, available: bool) {
        let watchers: Vec<AvailabilityCallback> = {
            let mut inner = self.inner.lock();
            if inner.available == available {
                return;
            }
            inner.available = available;
            inner.watchers.values().cloned().collect()
        };
        for watcher in watchers {
            watcher(available);
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.inner.lock().watchers.len()
    }

    pub fn fail_prompt(&self, error: OwnerError) {
        *self.prompt_error.lock() = Some(error);
    }

    fn transition(&self, state: RemoteState, event: &str) {
        self.inner.lock().state = state;
        self.listeners.fire(&MediaEvent::new(event));
    }
}

impl RemotePlayback for FakeRemote {
    fn state(&self) -> RemoteState {
        self.inner.lock().state
    }

    fn prompt(&self) -> Result<(), OwnerError> {
        if let Some(err) = self.prompt_error.lock().clone() {
            return Err(err);
        }
        match self.state() {
            RemoteState::Disconnected => {
                self.transition(RemoteState::Connecting, "connecting");
                self.transition(RemoteState::Connected, "connect");
            }
            RemoteState::Connecting | RemoteState::Connected => {
                self.transition(RemoteState::Disconnected, "disconnect");
            }
        }
        Ok(())
    }

    /// Reports the current availability right away, like browsers do.
    fn watch_availability(&self, callback: AvailabilityCallback) -> Result<WatchId, OwnerError> {
        if let Some(err) = &self.watch_error {
            return Err(err.clone());
        }
        let (id, available) = {
            let mut inner = self.inner.lock();
            inner.next_watch += 1;
            let id = inner.next_watch;
            inner.watchers.insert(id, Arc::clone(&callback));
            (id, inner.available)
        };
        callback(available);
        Ok(WatchId(id))
    }

    fn cancel_watch_availability(&self, id: WatchId) {
        self.inner.lock().watchers.remove(&id.0);
    }
}
