//! The facade table: how each state key is read from, written to, and
//! monitored on the current owners.
//!
//! Every entry is a plain descriptor with no references of its own:
//! - `get` is total. With an owner missing it returns a documented default.
//! - `set` performs the owner-level side effect, if the key is writable.
//!   The new value is committed only when the owner confirms with an event.
//! - `events` lists, per owner category, the event names that re-evaluate `get`.
//! - `hooks` cover sources that don't map to a plain event name (persisted
//!   preferences, capability watchers). They run when the media is wired.

mod availability;
mod live;
mod playback;
mod presentation;
mod tracks;
mod volume;

pub use availability::AVAILABILITY_EVENT;
pub use live::{seekable_end, stream_type, target_live_window, time_is_live};
pub use presentation::{is_casting, is_fullscreen, is_pip, PIP_RETRY_TIMEOUT, READY_EVENT};
pub use tracks::{
    chapters_track, remember_subtitle_language, showing_subtitle_tracks, subtitle_tracks,
    text_tracks, thumbnails_track, toggle_subtitles, update_tracks_mode, TrackSelector,
    THUMBNAILS_LABEL,
};
pub use volume::UNMUTE_FALLBACK_VOLUME;

use crate::error::Result;
use crate::owners::Owners;
use crate::snapshot::StatePatch;
use crate::types::{MediaEvent, OwnerCategory, StateKey, StateValue};
use std::sync::Arc;

/// Reads a value from the owners, optionally in response to an event.
pub type Getter = fn(&Owners, Option<&MediaEvent>) -> StateValue;

/// Writes a value through to the owners.
pub type Setter = fn(&StateValue, &Owners) -> Result<()>;

/// What a custom hook reports back to the store.
#[derive(Clone, Debug)]
pub enum HookSignal {
    /// Commit this value for the hook's key.
    Value(StateValue),
    /// Re-evaluate the key's getter with this event.
    Event(MediaEvent),
    /// Re-evaluate the key's getter without an event.
    Recompute,
}

pub type HookHandler = Arc<dyn Fn(HookSignal) + Send + Sync>;

/// Undoes whatever a hook attached.
pub type Teardown = Box<dyn FnOnce() + Send>;

pub type CustomHook = fn(HookHandler, &Owners) -> Option<Teardown>;

/// Event names per owner category.
#[derive(Clone, Copy, Debug)]
pub struct EventLists {
    pub media: &'static [&'static str],
    pub text_tracks: &'static [&'static str],
    pub video_renditions: &'static [&'static str],
    pub audio_tracks: &'static [&'static str],
    pub remote: &'static [&'static str],
    pub root: &'static [&'static str],
}

impl EventLists {
    pub const NONE: EventLists = EventLists {
        media: &[],
        text_tracks: &[],
        video_renditions: &[],
        audio_tracks: &[],
        remote: &[],
        root: &[],
    };

    const fn media(media: &'static [&'static str]) -> Self {
        EventLists {
            media,
            ..EventLists::NONE
        }
    }

    pub fn for_category(&self, category: OwnerCategory) -> &'static [&'static str] {
        match category {
            OwnerCategory::Media => self.media,
            OwnerCategory::TextTracks => self.text_tracks,
            OwnerCategory::VideoRenditions => self.video_renditions,
            OwnerCategory::AudioTracks => self.audio_tracks,
            OwnerCategory::Remote => self.remote,
            OwnerCategory::Root => self.root,
        }
    }

    pub fn is_empty(&self) -> bool {
        OwnerCategory::ALL
            .iter()
            .all(|c| self.for_category(*c).is_empty())
    }
}

/// Descriptor for one state key.
pub struct FacadeEntry {
    pub key: StateKey,
    pub get: Getter,
    pub set: Option<Setter>,
    pub events: EventLists,
    pub hooks: &'static [CustomHook],
}

impl std::fmt::Debug for FacadeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacadeEntry")
            .field("key", &self.key)
            .field("writable", &self.set.is_some())
            .field("events", &self.events)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

macro_rules! entry {
    ($key:ident, $get:path) => {
        entry!($key, $get, None, EventLists::NONE, &[])
    };
    ($key:ident, $get:path, $set:expr, $events:expr) => {
        entry!($key, $get, $set, $events, &[])
    };
    ($key:ident, $get:path, $set:expr, $events:expr, $hooks:expr) => {
        FacadeEntry {
            key: StateKey::$key,
            get: $get,
            set: $set,
            events: $events,
            hooks: $hooks,
        }
    };
}

const FULLSCREEN_MEDIA_EVENTS: &[&str] =
    &["presentationmodechange", "beginfullscreen", "endfullscreen"];
const TRACK_LIST_EVENTS: &[&str] = &["addtrack", "removetrack"];
const TRACK_CHANGE_EVENTS: &[&str] = &["addtrack", "removetrack", "change"];
const RENDITION_LIST_EVENTS: &[&str] = &["addrendition", "removerendition"];
const REMOTE_STATE_EVENTS: &[&str] = &["connect", "connecting", "disconnect"];

static FACADE: &[FacadeEntry] = &[
    entry!(VideoWidth, playback::get_video_width, None, EventLists::media(&["resize"])),
    entry!(VideoHeight, playback::get_video_height, None, EventLists::media(&["resize"])),
    entry!(
        Paused,
        playback::get_paused,
        Some(playback::set_paused),
        EventLists::media(&["play", "playing", "pause", "emptied"])
    ),
    entry!(
        HasPlayed,
        playback::get_has_played,
        None,
        EventLists::media(&["playing", "emptied"])
    ),
    entry!(
        Ended,
        playback::get_ended,
        None,
        EventLists::media(&["seeked", "ended", "emptied"])
    ),
    entry!(
        PlaybackRate,
        playback::get_playback_rate,
        Some(playback::set_playback_rate),
        EventLists::media(&["ratechange", "loadstart"])
    ),
    entry!(
        Muted,
        volume::get_muted,
        Some(volume::set_muted),
        EventLists::media(&["volumechange"])
    ),
    entry!(
        Volume,
        volume::get_volume,
        Some(volume::set_volume),
        EventLists::media(&["volumechange"]),
        &[volume::restore_volume_pref]
    ),
    entry!(
        VolumeLevel,
        volume::get_volume_level,
        None,
        EventLists::media(&["volumechange"])
    ),
    entry!(
        CurrentTime,
        playback::get_current_time,
        Some(playback::set_current_time),
        EventLists::media(&["timeupdate", "loadedmetadata"])
    ),
    entry!(
        Duration,
        playback::get_duration,
        None,
        EventLists::media(&["durationchange", "loadedmetadata", "emptied"])
    ),
    entry!(
        Loading,
        playback::get_loading,
        None,
        EventLists::media(&["waiting", "playing", "emptied"])
    ),
    entry!(
        Seekable,
        playback::get_seekable,
        None,
        EventLists::media(&["loadedmetadata", "emptied", "progress", "seekablechange"])
    ),
    entry!(
        Buffered,
        playback::get_buffered,
        None,
        EventLists::media(&["progress", "emptied"])
    ),
    entry!(
        StreamType,
        live::get_stream_type,
        None,
        EventLists::media(&["emptied", "durationchange", "loadedmetadata", "streamtypechange"])
    ),
    entry!(
        TargetLiveWindow,
        live::get_target_live_window,
        None,
        EventLists::media(&[
            "emptied",
            "durationchange",
            "loadedmetadata",
            "streamtypechange",
            "targetlivewindowchange",
        ])
    ),
    entry!(
        TimeIsLive,
        live::get_time_is_live,
        None,
        EventLists::media(&["playing", "timeupdate", "progress", "waiting", "emptied"])
    ),
    entry!(
        SubtitlesList,
        tracks::get_subtitles_list,
        None,
        EventLists {
            media: &["loadstart"],
            text_tracks: TRACK_LIST_EVENTS,
            ..EventLists::NONE
        }
    ),
    entry!(
        SubtitlesShowing,
        tracks::get_subtitles_showing,
        None,
        EventLists {
            media: &["loadstart"],
            text_tracks: TRACK_CHANGE_EVENTS,
            ..EventLists::NONE
        },
        &[tracks::enable_default_subtitles]
    ),
    entry!(
        ChaptersCues,
        tracks::get_chapters_cues,
        None,
        EventLists {
            text_tracks: TRACK_CHANGE_EVENTS,
            ..EventLists::NONE
        }
    ),
    entry!(
        IsPip,
        presentation::get_is_pip,
        Some(presentation::set_is_pip),
        EventLists::media(&[
            "enterpictureinpicture",
            "leavepictureinpicture",
            "presentationmodechange",
        ])
    ),
    entry!(
        RenditionList,
        tracks::get_rendition_list,
        None,
        EventLists {
            video_renditions: RENDITION_LIST_EVENTS,
            ..EventLists::NONE
        }
    ),
    entry!(
        RenditionSelected,
        tracks::get_rendition_selected,
        Some(tracks::set_rendition_selected),
        EventLists {
            video_renditions: &["addrendition", "removerendition", "change"],
            ..EventLists::NONE
        }
    ),
    entry!(
        AudioTrackList,
        tracks::get_audio_track_list,
        None,
        EventLists {
            audio_tracks: TRACK_LIST_EVENTS,
            ..EventLists::NONE
        }
    ),
    entry!(
        AudioTrackEnabled,
        tracks::get_audio_track_enabled,
        Some(tracks::set_audio_track_enabled),
        EventLists {
            audio_tracks: TRACK_CHANGE_EVENTS,
            ..EventLists::NONE
        }
    ),
    entry!(
        IsFullscreen,
        presentation::get_is_fullscreen,
        Some(presentation::set_is_fullscreen),
        EventLists {
            media: FULLSCREEN_MEDIA_EVENTS,
            root: &["fullscreenchange"],
            ..EventLists::NONE
        }
    ),
    entry!(
        IsCasting,
        presentation::get_is_casting,
        Some(presentation::set_is_casting),
        EventLists {
            remote: REMOTE_STATE_EVENTS,
            ..EventLists::NONE
        }
    ),
    entry!(
        IsAirplaying,
        presentation::get_is_airplaying,
        Some(presentation::set_is_airplaying),
        EventLists::media(&["playbacktargetchange"])
    ),
    entry!(FullscreenUnavailable, availability::get_fullscreen_unavailable),
    entry!(PipUnavailable, availability::get_pip_unavailable),
    entry!(
        VolumeUnavailable,
        volume::get_volume_unavailable,
        None,
        EventLists::NONE,
        &[volume::watch_volume_support]
    ),
    entry!(
        CastUnavailable,
        availability::get_cast_unavailable,
        None,
        EventLists::NONE,
        &[availability::watch_cast_availability]
    ),
    entry!(
        AirplayUnavailable,
        availability::get_airplay_unavailable,
        None,
        EventLists::media(&["playbacktargetavailabilitychange"])
    ),
    entry!(
        RenditionUnavailable,
        availability::get_rendition_unavailable,
        None,
        EventLists {
            video_renditions: RENDITION_LIST_EVENTS,
            ..EventLists::NONE
        }
    ),
    entry!(
        AudioTrackUnavailable,
        availability::get_audio_track_unavailable,
        None,
        EventLists {
            audio_tracks: TRACK_LIST_EVENTS,
            ..EventLists::NONE
        }
    ),
    entry!(
        ErrorCode,
        playback::get_error_code,
        None,
        EventLists::media(&["error", "emptied"])
    ),
    entry!(
        ErrorMessage,
        playback::get_error_message,
        None,
        EventLists::media(&["error", "emptied"])
    ),
];

/// The full table, one entry per non-preview key.
pub fn facade() -> &'static [FacadeEntry] {
    FACADE
}

pub fn entry(key: StateKey) -> Option<&'static FacadeEntry> {
    FACADE.iter().find(|e| e.key == key)
}

/// Read one key. Preview keys have no facade entry and read as unset.
pub fn get(key: StateKey, owners: &Owners, event: Option<&MediaEvent>) -> StateValue {
    entry(key)
        .map(|e| (e.get)(owners, event))
        .unwrap_or_default()
}

/// Write one key through its setter. Read-only keys warn and do nothing.
pub fn set(key: StateKey, value: &StateValue, owners: &Owners) -> Result<()> {
    match entry(key).and_then(|e| e.set) {
        Some(setter) => setter(value, owners),
        None => {
            tracing::warn!(%key, "state key is read-only");
            Ok(())
        }
    }
}

/// Keys whose value only an owner event or hook report can supply.
///
/// Evaluating them without an event yields a bootstrap guess, so a recompute
/// keeps their published value for as long as the same media stays wired.
pub const EVENT_SOURCED: &[StateKey] = &[
    StateKey::HasPlayed,
    StateKey::CastUnavailable,
    StateKey::AirplayUnavailable,
];

/// Evaluate every entry without an event.
pub fn snapshot(owners: &Owners) -> StatePatch {
    FACADE
        .iter()
        .map(|e| (e.key, (e.get)(owners, None)))
        .collect()
}

/// Like [`snapshot`], but leaves out [`EVENT_SOURCED`] keys unless the media
/// was just replaced or rewired.
pub fn recompute(owners: &Owners, fresh_media: bool) -> StatePatch {
    FACADE
        .iter()
        .filter(|e| fresh_media || !EVENT_SOURCED.contains(&e.key))
        .map(|e| (e.key, (e.get)(owners, None)))
        .collect()
}

pub(crate) fn expect_bool(key: StateKey, value: &StateValue) -> Option<bool> {
    let b = value.as_bool();
    if b.is_none() {
        tracing::warn!(%key, got = value.kind(), "expected a boolean value");
    }
    b
}

pub(crate) fn expect_number(key: StateKey, value: &StateValue) -> Option<f64> {
    let n = value.as_f64();
    if n.is_none() {
        tracing::warn!(%key, got = value.kind(), "expected a numeric value");
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::StoreOptions;
    use crate::owners::SharedOptions;
    use crate::platform::Platform;
    use crate::types::{StreamType, VolumeLevel};

    fn no_owners() -> Owners {
        Owners::empty(
            SharedOptions::new(StoreOptions::default()),
            Arc::new(Platform::new()),
        )
    }

    #[test]
    fn test_one_entry_per_non_preview_key() {
        for key in StateKey::ALL {
            let found = facade().iter().filter(|e| e.key == *key).count();
            let expected = if key.is_preview() { 0 } else { 1 };
            assert_eq!(found, expected, "{key}");
        }
    }

    #[test]
    fn test_defaults_without_media() {
        let patch = snapshot(&no_owners());
        assert_eq!(patch.get(StateKey::Paused), Some(&StateValue::Bool(true)));
        assert_eq!(patch.get(StateKey::Volume), Some(&StateValue::Number(1.0)));
        assert_eq!(
            patch.get(StateKey::Duration),
            Some(&StateValue::Number(f64::NAN))
        );
        assert_eq!(
            patch.get(StateKey::VolumeLevel),
            Some(&StateValue::VolumeLevel(VolumeLevel::High))
        );
        assert_eq!(patch.get(StateKey::StreamType), Some(&StateValue::Unset));
        assert_eq!(patch.get(StateKey::Loading), Some(&StateValue::Bool(true)));
        assert_eq!(patch.get(StateKey::Seekable), Some(&StateValue::Unset));
    }

    #[test]
    fn test_default_options_fill_in_for_missing_media() {
        let owners = Owners::empty(
            SharedOptions::new(StoreOptions {
                default_duration: Some(42.0),
                default_stream_type: Some(StreamType::Live),
                ..Default::default()
            }),
            Arc::new(Platform::new()),
        );
        assert_eq!(get(StateKey::Duration, &owners, None), StateValue::Number(42.0));
        assert_eq!(
            get(StateKey::StreamType, &owners, None),
            StateValue::StreamType(StreamType::Live)
        );
    }

    #[test]
    fn test_recompute_keeps_event_sourced_keys_out() {
        let owners = no_owners();
        let patch = recompute(&owners, false);
        for key in EVENT_SOURCED {
            assert_eq!(patch.get(*key), None, "{key}");
        }
        assert!(patch.get(StateKey::Paused).is_some());

        let patch = recompute(&owners, true);
        assert_eq!(patch.len(), snapshot(&owners).len());
    }

    #[test]
    fn test_read_only_set_is_a_noop() {
        let owners = no_owners();
        assert!(set(StateKey::Duration, &StateValue::Number(3.0), &owners).is_ok());
        assert!(set(StateKey::Paused, &StateValue::Bool(false), &owners).is_ok());
    }

    #[test]
    fn test_event_lists_by_category() {
        let fullscreen = entry(StateKey::IsFullscreen).unwrap();
        assert_eq!(
            fullscreen.events.for_category(OwnerCategory::Root),
            &["fullscreenchange"]
        );
        assert!(entry(StateKey::PipUnavailable).unwrap().events.is_empty());
    }
}
