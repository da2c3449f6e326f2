//! Fake playback element.

use super::collections::{FakeAudioTracks, FakeRemote, FakeRenditions, FakeTextTracks};
use super::document::FakeRoot;
use super::ListenerSet;
use crate::error::OwnerError;
use crate::owners::{
    AudioTrackList, ElementNode, EventTarget, Listener, ListenerId, MediaErrorInfo, MediaOwner,
    RemotePlayback, RenditionList, TextTrackList,
};
use crate::types::{
    EventDetail, MediaEvent, NodeId, PresentationMode, ReadyState, StreamType, TargetAvailability,
    TimeRange,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

type ReadyCallback = Box<dyn FnOnce() + Send>;

#[derive(Clone, Debug)]
struct MediaFields {
    paused: bool,
    current_time: f64,
    duration: f64,
    volume: Option<f64>,
    muted: bool,
    playback_rate: f64,
    seekable: Option<Vec<TimeRange>>,
    buffered: Vec<TimeRange>,
    ready_state: ReadyState,
    ended: bool,
    error: Option<MediaErrorInfo>,
    has_source: bool,
    stream_type: Option<StreamType>,
    target_live_window: Option<f64>,
    live_edge_start: Option<f64>,
    mode: PresentationMode,
    video_size: (u32, u32),
    airplaying: bool,
    play_error: Option<OwnerError>,
}

impl Default for MediaFields {
    fn default() -> Self {
        Self {
            paused: true,
            current_time: 0.0,
            duration: f64::NAN,
            volume: Some(1.0),
            muted: false,
            playback_rate: 1.0,
            seekable: Some(Vec::new()),
            buffered: Vec::new(),
            ready_state: ReadyState::HAVE_NOTHING,
            ended: false,
            error: None,
            has_source: true,
            stream_type: None,
            target_live_window: None,
            live_edge_start: None,
            mode: PresentationMode::Inline,
            video_size: (0, 0),
            airplaying: false,
            play_error: None,
        }
    }
}

/// Builder for [`FakeMedia`].
#[derive(Default)]
pub struct FakeMediaBuilder {
    fields: MediaFields,
    native_fullscreen: bool,
    picture_in_picture: bool,
    airplay: bool,
    deferred_ready: bool,
    text_tracks: Option<Arc<FakeTextTracks>>,
    renditions: Option<Arc<FakeRenditions>>,
    audio_tracks: Option<Arc<FakeAudioTracks>>,
    remote: Option<Arc<FakeRemote>>,
    root: Weak<FakeRoot>,
}

impl FakeMediaBuilder {
    pub fn duration(mut self, duration: f64) -> Self {
        self.fields.duration = duration;
        self
    }

    pub fn current_time(mut self, time: f64) -> Self {
        self.fields.current_time = time;
        self
    }

    /// Volume `None` models an owner without volume control.
    pub fn volume(mut self, volume: Option<f64>) -> Self {
        self.fields.volume = volume;
        self
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.fields.muted = muted;
        self
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.fields.paused = paused;
        self
    }

    /// Seekable `None` models an owner with no seekable ranges object.
    pub fn seekable(mut self, seekable: Option<Vec<TimeRange>>) -> Self {
        self.fields.seekable = seekable;
        self
    }

    pub fn buffered(mut self, buffered: Vec<TimeRange>) -> Self {
        self.fields.buffered = buffered;
        self
    }

    pub fn ready_state(mut self, ready_state: ReadyState) -> Self {
        self.fields.ready_state = ready_state;
        self
    }

    pub fn has_source(mut self, has_source: bool) -> Self {
        self.fields.has_source = has_source;
        self
    }

    pub fn stream_type(mut self, stream_type: StreamType) -> Self {
        self.fields.stream_type = Some(stream_type);
        self
    }

    pub fn target_live_window(mut self, window: f64) -> Self {
        self.fields.target_live_window = Some(window);
        self
    }

    pub fn live_edge_start(mut self, start: f64) -> Self {
        self.fields.live_edge_start = Some(start);
        self
    }

    pub fn video_size(mut self, width: u32, height: u32) -> Self {
        self.fields.video_size = (width, height);
        self
    }

    pub fn play_error(mut self, error: OwnerError) -> Self {
        self.fields.play_error = Some(error);
        self
    }

    pub fn native_fullscreen(mut self) -> Self {
        self.native_fullscreen = true;
        self
    }

    pub fn picture_in_picture(mut self) -> Self {
        self.picture_in_picture = true;
        self
    }

    pub fn airplay(mut self) -> Self {
        self.airplay = true;
        self
    }

    /// Hold `when_ready` callbacks until [`FakeMedia::make_ready`].
    pub fn deferred_ready(mut self) -> Self {
        self.deferred_ready = true;
        self
    }

    pub fn text_tracks(mut self, tracks: Arc<FakeTextTracks>) -> Self {
        self.text_tracks = Some(tracks);
        self
    }

    pub fn renditions(mut self, renditions: Arc<FakeRenditions>) -> Self {
        self.renditions = Some(renditions);
        self
    }

    pub fn audio_tracks(mut self, tracks: Arc<FakeAudioTracks>) -> Self {
        self.audio_tracks = Some(tracks);
        self
    }

    pub fn remote(mut self, remote: Arc<FakeRemote>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Link the document so picture-in-picture updates its pip element.
    pub fn root(mut self, root: &Arc<FakeRoot>) -> Self {
        self.root = Arc::downgrade(root);
        self
    }

    pub fn build(self) -> Arc<FakeMedia> {
        Arc::new_cyclic(|this| FakeMedia {
            id: NodeId::fresh(),
            this: this.clone(),
            listeners: ListenerSet::new(),
            fields: Mutex::new(self.fields),
            native_fullscreen: self.native_fullscreen,
            picture_in_picture: self.picture_in_picture,
            airplay: self.airplay,
            waiting: Mutex::new(self.deferred_ready.then(Vec::new)),
            text_tracks: self.text_tracks,
            renditions: self.renditions,
            audio_tracks: self.audio_tracks,
            remote: self.remote,
            root: self.root,
            picker_opens: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        })
    }
}

/// In-memory media element.
///
/// Setters fire the events a browser would, and only on an actual change.
pub struct FakeMedia {
    id: NodeId,
    this: Weak<FakeMedia>,
    listeners: ListenerSet,
    fields: Mutex<MediaFields>,
    native_fullscreen: bool,
    picture_in_picture: bool,
    airplay: bool,
    /// `Some` until the media is ready.
    waiting: Mutex<Option<Vec<ReadyCallback>>>,
    text_tracks: Option<Arc<FakeTextTracks>>,
    renditions: Option<Arc<FakeRenditions>>,
    audio_tracks: Option<Arc<FakeAudioTracks>>,
    remote: Option<Arc<FakeRemote>>,
    root: Weak<FakeRoot>,
    picker_opens: AtomicUsize,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeMedia {
    pub fn builder() -> FakeMediaBuilder {
        FakeMediaBuilder::default()
    }

    /// A ready on-demand media with the given duration.
    pub fn with_duration(duration: f64) -> Arc<Self> {
        Self::builder()
            .duration(duration)
            .ready_state(ReadyState::HAVE_ENOUGH_DATA)
            .seekable(Some(vec![TimeRange::new(0.0, duration)]))
            .build()
    }

    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    /// Fire an arbitrary event at this media's listeners.
    pub fn emit(&self, kind: &str) {
        self.fire(MediaEvent::new(kind));
    }

    fn fire(&self, event: MediaEvent) {
        self.listeners.fire(&event.with_target(self.id));
    }

    /// Update a field under the lock; fire `events` if `update` reports a change.
    fn update(&self, events: &[&str], update: impl FnOnce(&mut MediaFields) -> bool) {
        let changed = update(&mut self.fields.lock());
        if changed {
            for event in events {
                self.emit(event);
            }
        }
    }

    /// Run every held `when_ready` callback.
    pub fn make_ready(&self) {
        let waiting = self.waiting.lock().take().unwrap_or_default();
        for ready in waiting {
            ready();
        }
    }

    pub fn set_duration(&self, duration: f64) {
        self.update(&["durationchange"], |f| {
            let changed = !(f.duration == duration || (f.duration.is_nan() && duration.is_nan()));
            f.duration = duration;
            changed
        });
    }

    pub fn set_seekable(&self, seekable: Option<Vec<TimeRange>>) {
        self.update(&["progress"], |f| {
            let changed = f.seekable != seekable;
            f.seekable = seekable;
            changed
        });
    }

    pub fn set_buffered(&self, buffered: Vec<TimeRange>) {
        self.update(&["progress"], |f| {
            let changed = f.buffered != buffered;
            f.buffered = buffered;
            changed
        });
    }

    /// Crossing out of `HAVE_NOTHING` fires `loadedmetadata`.
    pub fn set_ready_state(&self, ready_state: ReadyState) {
        let loaded = {
            let mut f = self.fields.lock();
            let loaded = f.ready_state == ReadyState::HAVE_NOTHING
                && ready_state >= ReadyState::HAVE_METADATA;
            f.ready_state = ready_state;
            loaded
        };
        if loaded {
            self.emit("loadedmetadata");
        }
    }

    pub fn set_error(&self, error: Option<MediaErrorInfo>) {
        self.update(&["error"], |f| {
            let changed = f.error != error;
            f.error = error;
            changed
        });
    }

    pub fn set_stream_type(&self, stream_type: Option<StreamType>) {
        self.update(&["streamtypechange"], |f| {
            let changed = f.stream_type != stream_type;
            f.stream_type = stream_type;
            changed
        });
    }

    pub fn set_video_size(&self, width: u32, height: u32) {
        self.update(&["resize"], |f| {
            let changed = f.video_size != (width, height);
            f.video_size = (width, height);
            changed
        });
    }

    pub fn set_ended(&self, ended: bool) {
        self.update(&["ended"], |f| {
            let changed = f.ended != ended;
            f.ended = ended;
            changed
        });
    }

    pub fn set_airplaying(&self, airplaying: bool) {
        self.update(&["playbacktargetchange"], |f| {
            let changed = f.airplaying != airplaying;
            f.airplaying = airplaying;
            changed
        });
    }

    pub fn set_airplay_available(&self, available: bool) {
        let availability = if available {
            TargetAvailability::Available
        } else {
            TargetAvailability::NotAvailable
        };
        self.fire(
            MediaEvent::new("playbacktargetavailabilitychange")
                .with_detail(EventDetail::Availability(availability)),
        );
    }

    pub fn set_play_error(&self, error: Option<OwnerError>) {
        self.fields.lock().play_error = error;
    }

    /// Times the airplay target picker was opened.
    pub fn picker_opens(&self) -> usize {
        self.picker_opens.load(Ordering::SeqCst)
    }

    /// Playback commands received so far, in order: `play`, `pause` and `seek`.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    fn set_mode(&self, mode: PresentationMode) -> Option<PresentationMode> {
        let mut f = self.fields.lock();
        let previous = std::mem::replace(&mut f.mode, mode);
        (previous != mode).then_some(previous)
    }

    /// Leave picture-in-picture, as if the user closed the floating window.
    pub fn leave_picture_in_picture(&self) {
        if self.fields.lock().mode != PresentationMode::PictureInPicture {
            return;
        }
        self.set_mode(PresentationMode::Inline);
        if let Some(root) = self.root.upgrade() {
            root.clear_picture_in_picture(self.id);
        }
        self.emit("leavepictureinpicture");
    }
}

impl EventTarget for FakeMedia {
    fn add_event_listener(&self, event: &str, listener: Listener) -> ListenerId {
        self.listeners.add(event, listener)
    }

    fn remove_event_listener(&self, event: &str, id: ListenerId) {
        self.listeners.remove(event, id)
    }
}

impl ElementNode for FakeMedia {
    fn node_id(&self) -> NodeId {
        self.id
    }
}

impl MediaOwner for FakeMedia {
    fn paused(&self) -> bool {
        self.fields.lock().paused
    }

    fn play(&self) -> Result<(), OwnerError> {
        self.calls.lock().push("play");
        let started = {
            let mut f = self.fields.lock();
            if let Some(err) = f.play_error.clone() {
                return Err(err);
            }
            std::mem::replace(&mut f.paused, false)
        };
        if started {
            self.emit("play");
            self.emit("playing");
        }
        Ok(())
    }

    fn pause(&self) {
        self.calls.lock().push("pause");
        self.update(&["pause"], |f| !std::mem::replace(&mut f.paused, true));
    }

    fn current_time(&self) -> f64 {
        self.fields.lock().current_time
    }

    fn set_current_time(&self, time: f64) {
        self.calls.lock().push("seek");
        self.update(&["timeupdate", "seeked"], |f| {
            let changed = f.current_time != time;
            f.current_time = time;
            changed
        });
    }

    fn duration(&self) -> f64 {
        self.fields.lock().duration
    }

    fn volume(&self) -> Option<f64> {
        self.fields.lock().volume
    }

    fn set_volume(&self, volume: f64) {
        self.update(&["volumechange"], |f| match f.volume {
            Some(current) if current != volume => {
                f.volume = Some(volume);
                true
            }
            _ => false,
        });
    }

    fn muted(&self) -> bool {
        self.fields.lock().muted
    }

    fn set_muted(&self, muted: bool) {
        self.update(&["volumechange"], |f| std::mem::replace(&mut f.muted, muted) != muted);
    }

    fn playback_rate(&self) -> f64 {
        self.fields.lock().playback_rate
    }

    fn set_playback_rate(&self, rate: f64) {
        self.update(&["ratechange"], |f| {
            std::mem::replace(&mut f.playback_rate, rate) != rate
        });
    }

    fn seekable(&self) -> Option<Vec<TimeRange>> {
        self.fields.lock().seekable.clone()
    }

    fn buffered(&self) -> Vec<TimeRange> {
        self.fields.lock().buffered.clone()
    }

    fn ready_state(&self) -> ReadyState {
        self.fields.lock().ready_state
    }

    fn ended(&self) -> bool {
        self.fields.lock().ended
    }

    fn video_size(&self) -> (u32, u32) {
        self.fields.lock().video_size
    }

    fn error(&self) -> Option<MediaErrorInfo> {
        self.fields.lock().error.clone()
    }

    fn has_source(&self) -> bool {
        self.fields.lock().has_source
    }

    fn text_tracks(&self) -> Option<Arc<dyn TextTrackList>> {
        self.text_tracks
            .clone()
            .map(|t| t as Arc<dyn TextTrackList>)
    }

    fn video_renditions(&self) -> Option<Arc<dyn RenditionList>> {
        self.renditions.clone().map(|r| r as Arc<dyn RenditionList>)
    }

    fn audio_tracks(&self) -> Option<Arc<dyn AudioTrackList>> {
        self.audio_tracks
            .clone()
            .map(|t| t as Arc<dyn AudioTrackList>)
    }

    fn remote(&self) -> Option<Arc<dyn RemotePlayback>> {
        self.remote.clone().map(|r| r as Arc<dyn RemotePlayback>)
    }

    fn stream_type(&self) -> Option<StreamType> {
        self.fields.lock().stream_type
    }

    fn target_live_window(&self) -> Option<f64> {
        self.fields.lock().target_live_window
    }

    fn live_edge_start(&self) -> Option<f64> {
        self.fields.lock().live_edge_start
    }

    fn presentation_mode(&self) -> Option<PresentationMode> {
        Some(self.fields.lock().mode)
    }

    /// Set in picture-in-picture too, like the vendor flag it stands in for.
    fn displaying_fullscreen(&self) -> Option<bool> {
        self.native_fullscreen
            .then(|| self.fields.lock().mode != PresentationMode::Inline)
    }

    fn supports_native_fullscreen(&self) -> bool {
        self.native_fullscreen
    }

    fn enter_native_fullscreen(&self) -> Result<(), OwnerError> {
        if !self.native_fullscreen {
            return Err(OwnerError::NotSupported("native fullscreen".into()));
        }
        if self.set_mode(PresentationMode::Fullscreen).is_some() {
            self.emit("beginfullscreen");
        }
        Ok(())
    }

    fn exit_native_fullscreen(&self) {
        if self.fields.lock().mode != PresentationMode::Fullscreen {
            return;
        }
        self.set_mode(PresentationMode::Inline);
        self.emit("endfullscreen");
    }

    fn supports_picture_in_picture(&self) -> bool {
        self.picture_in_picture
    }

    fn request_picture_in_picture(&self) -> Result<(), OwnerError> {
        if !self.picture_in_picture {
            return Err(OwnerError::NotSupported("picture-in-picture".into()));
        }
        if self.ready_state() == ReadyState::HAVE_NOTHING {
            return Err(OwnerError::NotReady);
        }
        if self.set_mode(PresentationMode::PictureInPicture).is_none() {
            return Ok(());
        }
        if let Some(root) = self.root.upgrade() {
            root.set_picture_in_picture(self.this.clone());
        }
        self.emit("enterpictureinpicture");
        Ok(())
    }

    fn supports_airplay(&self) -> bool {
        self.airplay
    }

    fn show_playback_target_picker(&self) {
        self.picker_opens.fetch_add(1, Ordering::SeqCst);
    }

    fn is_airplaying(&self) -> bool {
        self.fields.lock().airplaying
    }

    fn when_ready(&self, ready: ReadyCallback) {
        {
            let mut waiting = self.waiting.lock();
            if let Some(waiting) = waiting.as_mut() {
                waiting.push(ready);
                return;
            }
        }
        ready()
    }
}
