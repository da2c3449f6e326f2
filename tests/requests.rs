//! Requests dispatched through the store and their effect on owners and state.

use media_store::facade::{is_fullscreen, PIP_RETRY_TIMEOUT, UNMUTE_FALLBACK_VOLUME};
use media_store::testing::{
    FakeAudioTracks, FakeElement, FakeMedia, FakeRemote, FakeRenditions, FakeRoot, FakeShadowRoot,
    FakeTextTrack, FakeTextTracks, ManualTimer, ManualVolumeProbe,
};
use media_store::{
    Action, Availability, AudioTrackInfo, ElementNode, FullscreenElement, MediaOwner, MediaStore,
    Platform, PlatformCapabilities, ReadyState, RenditionInfo, Request, RootContext, StateKey,
    StoreConfig, StoreError, StreamType, TextTrack, TextTrackMode, TimeRange, TrackSelector,
};
use serde_json::json;
use std::sync::Arc;

fn owner(media: &Arc<FakeMedia>) -> Arc<dyn MediaOwner> {
    media.clone()
}

fn store_with(media: &Arc<FakeMedia>, platform: Platform) -> MediaStore {
    MediaStore::new(StoreConfig {
        monitor_on_demand: false,
        platform: Arc::new(platform),
        media: Some(owner(media)),
        ..Default::default()
    })
}

fn store_for(media: &Arc<FakeMedia>) -> MediaStore {
    store_with(media, Platform::new())
}

fn store_with_root(media: &Arc<FakeMedia>, root: &Arc<FakeRoot>) -> MediaStore {
    MediaStore::new(StoreConfig {
        monitor_on_demand: false,
        media: Some(owner(media)),
        root: Some(root.clone() as Arc<dyn RootContext>),
        ..Default::default()
    })
}

// --- Playback ---

#[test]
fn test_play_and_pause() {
    let media = FakeMedia::with_duration(30.0);
    let store = store_for(&media);

    store.dispatch(Request::Play).unwrap();
    let state = store.get_state();
    assert!(!state.paused());
    assert!(state.has_played());

    store.dispatch(Request::Pause).unwrap();
    assert!(store.get_state().paused());
    // Once played, stays played until the media is emptied.
    assert!(store.get_state().has_played());
}

#[test]
fn test_has_played_survives_root_change() {
    let media = FakeMedia::with_duration(30.0);
    let store = store_for(&media);
    store.dispatch(Request::Play).unwrap();
    store.dispatch(Request::Pause).unwrap();

    store
        .dispatch(Action::RootContextChange(Some(
            FakeRoot::new() as Arc<dyn RootContext>
        )))
        .unwrap();
    assert!(store.get_state().has_played());

    // A different media starts over.
    let fresh = FakeMedia::with_duration(30.0);
    store.dispatch(Action::MediaChange(Some(owner(&fresh)))).unwrap();
    assert!(!store.get_state().has_played());
}

#[test]
fn test_play_on_live_stream_seeks_to_live_edge() {
    let media = FakeMedia::builder()
        .duration(f64::INFINITY)
        .seekable(Some(vec![TimeRange::new(0.0, 125.0)]))
        .ready_state(ReadyState::HAVE_ENOUGH_DATA)
        .build();
    let store = store_for(&media);
    assert_eq!(store.get_state().stream_type(), Some(StreamType::Live));

    store.dispatch(Request::Play).unwrap();

    assert_eq!(media.calls(), ["seek", "play"]);
    assert_eq!(media.current_time(), 115.0);
    let state = store.get_state();
    assert_eq!(state.current_time(), 115.0);
    assert!(!state.paused());
    assert!(state.time_is_live());
}

#[test]
fn test_play_on_dvr_stream_keeps_position() {
    let media = FakeMedia::builder()
        .duration(f64::INFINITY)
        .target_live_window(60.0)
        .current_time(20.0)
        .seekable(Some(vec![TimeRange::new(0.0, 125.0)]))
        .build();
    let store = store_for(&media);

    store.dispatch(Request::Play).unwrap();
    assert_eq!(media.current_time(), 20.0);
    assert_eq!(media.calls(), ["play"]);
}

#[test]
fn test_rejected_play_is_not_an_error() {
    let media = FakeMedia::builder()
        .duration(30.0)
        .play_error(media_store::OwnerError::NotAllowed("autoplay".into()))
        .build();
    let store = store_for(&media);

    assert!(store.dispatch(Request::Play).is_ok());
    assert!(store.get_state().paused());
}

#[test]
fn test_seek_and_rate() {
    let media = FakeMedia::with_duration(30.0);
    let store = store_for(&media);

    store.dispatch(Request::Seek(12.0)).unwrap();
    store.dispatch(Request::PlaybackRate(1.5)).unwrap();

    let state = store.get_state();
    assert_eq!(state.current_time(), 12.0);
    assert_eq!(state.playback_rate(), 1.5);
}

#[test]
fn test_seek_to_live_uses_offset_option() {
    let media = FakeMedia::builder()
        .duration(f64::INFINITY)
        .seekable(Some(vec![TimeRange::new(0.0, 100.0)]))
        .build();
    let store = store_for(&media);
    store
        .dispatch(media_store::OptionsPatch {
            seek_to_live_offset: Some(Some(4.0)),
            ..Default::default()
        })
        .unwrap();

    store.dispatch(Request::SeekToLive).unwrap();
    assert_eq!(store.get_state().current_time(), 96.0);
}

#[test]
fn test_requests_without_media_are_noops() {
    let store = MediaStore::new(StoreConfig::default());
    for request in [
        Request::Play,
        Request::Unmute,
        Request::Volume(0.3),
        Request::Seek(3.0),
        Request::EnterFullscreen,
        Request::EnterPip,
        Request::EnterCast,
        Request::SeekToLive,
        Request::ToggleSubtitles(None),
    ] {
        store.dispatch(request).unwrap();
    }
    assert!(store.get_state().paused());
}

// --- Volume ---

#[test]
fn test_unmute_at_zero_volume_restores_audible_volume() {
    let media = FakeMedia::builder()
        .duration(30.0)
        .volume(Some(0.0))
        .muted(true)
        .build();
    let store = store_for(&media);

    store.dispatch(Request::Unmute).unwrap();

    assert_eq!(media.volume(), Some(UNMUTE_FALLBACK_VOLUME));
    let state = store.get_state();
    assert_eq!(state.volume(), 0.25);
    assert!(!state.muted());
}

#[test]
fn test_nonzero_volume_unmutes() {
    let media = FakeMedia::builder().duration(30.0).muted(true).build();
    let store = store_for(&media);

    store.dispatch(Request::Volume(0.4)).unwrap();

    let state = store.get_state();
    assert!(!state.muted());
    assert_eq!(state.volume(), 0.4);
    assert_eq!(state.volume_level(), media_store::VolumeLevel::Low);
}

#[test]
fn test_volume_unavailable_without_volume_control() {
    let media = FakeMedia::builder().duration(30.0).volume(None).build();
    let store = store_for(&media);

    assert_eq!(
        store.get_state().availability(StateKey::VolumeUnavailable),
        Some(Availability::Unsupported)
    );
}

#[test]
fn test_volume_support_probe_resolves_lazily() {
    let probe = Arc::new(ManualVolumeProbe::new());
    let media = FakeMedia::with_duration(30.0);
    let store = store_with(&media, Platform::new().with_volume_probe(probe.clone()));

    // Unknown until the probe answers.
    assert_eq!(probe.pending(), 1);
    assert_eq!(store.get_state().availability(StateKey::VolumeUnavailable), None);

    probe.resolve(false);
    assert_eq!(
        store.get_state().availability(StateKey::VolumeUnavailable),
        Some(Availability::Unsupported)
    );
}

// --- Fullscreen and picture-in-picture ---

#[test]
fn test_fullscreen_through_container() {
    let root = FakeRoot::new();
    let container = FakeElement::new(&root);
    let media = FakeMedia::with_duration(30.0);
    let store = MediaStore::new(StoreConfig {
        monitor_on_demand: false,
        media: Some(owner(&media)),
        root: Some(root.clone() as Arc<dyn RootContext>),
        fullscreen_target: Some(container.clone() as Arc<dyn FullscreenElement>),
        ..Default::default()
    });

    store.dispatch(Request::EnterFullscreen).unwrap();
    assert_eq!(
        root.fullscreen_element().map(|e| e.node_id()),
        Some(container.node_id())
    );
    assert!(store.get_state().is_fullscreen());

    store.dispatch(Request::ExitFullscreen).unwrap();
    assert!(root.fullscreen_element().is_none());
    assert!(!store.get_state().is_fullscreen());
}

#[test]
fn test_fullscreen_inside_nested_boundary() {
    let root = FakeRoot::new();
    let target = FakeElement::new(&root);
    let shadow = FakeShadowRoot::new();
    shadow.set_fullscreen_element(Some(target.clone() as Arc<dyn ElementNode>));
    let host = FakeElement::custom(&root, Some(shadow));
    let media = FakeMedia::with_duration(30.0);

    let store = MediaStore::new(StoreConfig {
        monitor_on_demand: false,
        media: Some(owner(&media)),
        root: Some(root.clone() as Arc<dyn RootContext>),
        fullscreen_target: Some(target.clone() as Arc<dyn FullscreenElement>),
        ..Default::default()
    });

    root.set_fullscreen_element(Some(host as Arc<dyn ElementNode>));
    assert!(is_fullscreen(&store.owners()));
    assert!(store.get_state().is_fullscreen());
}

#[test]
fn test_fullscreen_host_without_boundary_accessor() {
    let root = FakeRoot::new();
    let target = FakeElement::new(&root);
    let host = FakeElement::custom(&root, Some(FakeShadowRoot::opaque()));
    host.add_descendant(target.node_id());
    let media = FakeMedia::with_duration(30.0);

    let store = MediaStore::new(StoreConfig {
        monitor_on_demand: false,
        media: Some(owner(&media)),
        root: Some(root.clone() as Arc<dyn RootContext>),
        fullscreen_target: Some(target as Arc<dyn FullscreenElement>),
        ..Default::default()
    });

    root.set_fullscreen_element(Some(host as Arc<dyn ElementNode>));
    assert!(store.get_state().is_fullscreen());
}

#[test]
fn test_entering_pip_exits_fullscreen() {
    let root = FakeRoot::new();
    let media = FakeMedia::builder()
        .duration(30.0)
        .ready_state(ReadyState::HAVE_ENOUGH_DATA)
        .native_fullscreen()
        .picture_in_picture()
        .root(&root)
        .build();
    let store = store_with_root(&media, &root);

    store.dispatch(Request::EnterFullscreen).unwrap();
    assert!(store.get_state().is_fullscreen());

    store.dispatch(Request::EnterPip).unwrap();
    let state = store.get_state();
    assert!(state.is_pip());
    assert!(!state.is_fullscreen());
}

#[test]
fn test_native_fullscreen_flag_ignored_in_pip() {
    let root = FakeRoot::new();
    let media = FakeMedia::builder()
        .duration(30.0)
        .ready_state(ReadyState::HAVE_ENOUGH_DATA)
        .native_fullscreen()
        .picture_in_picture()
        .root(&root)
        .build();
    let store = store_with_root(&media, &root);

    store.dispatch(Request::EnterPip).unwrap();
    // The element flag is raised in both modes.
    assert_eq!(media.displaying_fullscreen(), Some(true));
    let state = store.get_state();
    assert!(state.is_pip());
    assert!(!state.is_fullscreen());
    assert!(!is_fullscreen(&store.owners()));

    store.dispatch(Request::EnterFullscreen).unwrap();
    assert_eq!(media.displaying_fullscreen(), Some(true));
    assert!(store.get_state().is_fullscreen());

    store.dispatch(Request::ExitFullscreen).unwrap();
    assert_eq!(media.displaying_fullscreen(), Some(false));
    assert!(!store.get_state().is_fullscreen());
}

#[test]
fn test_entering_fullscreen_exits_pip() {
    let root = FakeRoot::new();
    let media = FakeMedia::builder()
        .duration(30.0)
        .ready_state(ReadyState::HAVE_ENOUGH_DATA)
        .native_fullscreen()
        .picture_in_picture()
        .root(&root)
        .build();
    let store = store_with_root(&media, &root);

    store.dispatch(Request::EnterPip).unwrap();
    assert!(store.get_state().is_pip());
    assert_eq!(root.picture_in_picture_element(), Some(media.node_id()));

    store.dispatch(Request::EnterFullscreen).unwrap();
    let state = store.get_state();
    assert!(state.is_fullscreen());
    assert!(!state.is_pip());
    assert_eq!(root.picture_in_picture_element(), None);
}

#[test]
fn test_pip_retries_once_metadata_loads() {
    let timer = Arc::new(ManualTimer::new());
    let media = FakeMedia::builder()
        .duration(30.0)
        .picture_in_picture()
        .build();
    let store = store_with(&media, Platform::new().with_timer(timer.clone()));
    let baseline = media.listeners().count("loadedmetadata");

    store.dispatch(Request::EnterPip).unwrap();
    assert!(!store.get_state().is_pip());
    assert_eq!(timer.pending(), 1);
    assert_eq!(media.listeners().count("loadedmetadata"), baseline + 1);

    media.set_ready_state(ReadyState::HAVE_METADATA);

    assert!(store.get_state().is_pip());
    assert_eq!(timer.pending(), 0);
    assert_eq!(media.listeners().count("loadedmetadata"), baseline);
}

#[test]
fn test_pip_retry_gives_up_after_timeout() {
    let timer = Arc::new(ManualTimer::new());
    let media = FakeMedia::builder()
        .duration(30.0)
        .picture_in_picture()
        .build();
    let store = store_with(&media, Platform::new().with_timer(timer.clone()));
    let baseline = media.listeners().count("loadedmetadata");

    store.dispatch(Request::EnterPip).unwrap();
    timer.advance(PIP_RETRY_TIMEOUT);

    assert_eq!(timer.pending(), 0);
    assert_eq!(media.listeners().count("loadedmetadata"), baseline);

    media.set_ready_state(ReadyState::HAVE_METADATA);
    assert!(!store.get_state().is_pip());
}

#[test]
fn test_pip_without_source_is_not_retried() {
    let timer = Arc::new(ManualTimer::new());
    let media = FakeMedia::builder()
        .picture_in_picture()
        .has_source(false)
        .build();
    let store = store_with(&media, Platform::new().with_timer(timer.clone()));

    store.dispatch(Request::EnterPip).unwrap();
    assert_eq!(timer.pending(), 0);
    assert!(!store.get_state().is_pip());
}

#[test]
fn test_pip_unsupported_by_media() {
    let media = FakeMedia::with_duration(30.0);
    let store = store_for(&media);

    store.dispatch(Request::EnterPip).unwrap();
    let state = store.get_state();
    assert!(!state.is_pip());
    assert_eq!(
        state.availability(StateKey::PipUnavailable),
        Some(Availability::Unsupported)
    );
}

// --- Casting and airplay ---

fn cast_platform() -> Platform {
    Platform::new().with_capabilities(PlatformCapabilities {
        cast: true,
        airplay: true,
        ..Default::default()
    })
}

#[test]
fn test_cast_enter_and_exit() {
    let remote = FakeRemote::new(true);
    let media = FakeMedia::builder()
        .duration(30.0)
        .remote(remote.clone())
        .build();
    let store = store_with(&media, cast_platform());
    assert_eq!(store.get_state().availability(StateKey::CastUnavailable), None);

    store.dispatch(Request::EnterCast).unwrap();
    assert!(store.get_state().is_casting());

    // Already connected: entering again does not prompt.
    store.dispatch(Request::EnterCast).unwrap();
    assert!(store.get_state().is_casting());

    store.dispatch(Request::ExitCast).unwrap();
    assert!(!store.get_state().is_casting());
}

#[test]
fn test_cast_availability_follows_watcher() {
    let remote = FakeRemote::new(false);
    let media = FakeMedia::builder()
        .duration(30.0)
        .remote(remote.clone())
        .build();
    let store = store_with(&media, cast_platform());
    assert_eq!(remote.watcher_count(), 1);
    assert_eq!(
        store.get_state().availability(StateKey::CastUnavailable),
        Some(Availability::Unavailable)
    );

    remote.set_available(true);
    assert_eq!(store.get_state().availability(StateKey::CastUnavailable), None);

    // Rewiring other owners keeps what the watcher reported.
    store
        .dispatch(Action::RootContextChange(Some(
            FakeRoot::new() as Arc<dyn RootContext>
        )))
        .unwrap();
    assert_eq!(store.get_state().availability(StateKey::CastUnavailable), None);

    store.dispatch(Action::MediaChange(None)).unwrap();
    assert_eq!(remote.watcher_count(), 0);
}

#[test]
fn test_unwatchable_remote_does_not_block_cast() {
    let remote = FakeRemote::unwatchable(media_store::OwnerError::NotSupported("watch".into()));
    let media = FakeMedia::builder()
        .duration(30.0)
        .remote(remote)
        .build();
    let store = store_with(&media, cast_platform());

    assert_eq!(store.get_state().availability(StateKey::CastUnavailable), None);
}

#[test]
fn test_cast_unsupported_by_platform() {
    let media = FakeMedia::builder()
        .duration(30.0)
        .remote(FakeRemote::new(true))
        .build();
    let store = store_for(&media);

    assert_eq!(
        store.get_state().availability(StateKey::CastUnavailable),
        Some(Availability::Unsupported)
    );
}

#[test]
fn test_airplay_opens_picker() {
    let media = FakeMedia::builder().duration(30.0).airplay().build();
    let store = store_with(&media, cast_platform());
    assert_eq!(
        store.get_state().availability(StateKey::AirplayUnavailable),
        Some(Availability::Unavailable)
    );

    media.set_airplay_available(true);
    assert_eq!(store.get_state().availability(StateKey::AirplayUnavailable), None);

    store.dispatch(Request::Airplay).unwrap();
    assert_eq!(media.picker_opens(), 1);

    media.set_airplaying(true);
    assert!(store.get_state().is_airplaying());
}

// --- Tracks ---

fn subtitled_media() -> (Arc<FakeMedia>, Arc<FakeTextTrack>, Arc<FakeTextTrack>) {
    let tracks = FakeTextTracks::new();
    let en = FakeTextTrack::subtitles("en", "English");
    let fr = FakeTextTrack::subtitles("fr", "Français");
    tracks.add_track(en.clone());
    tracks.add_track(fr.clone());
    let media = FakeMedia::builder()
        .duration(30.0)
        .text_tracks(tracks)
        .build();
    (media, en, fr)
}

#[test]
fn test_show_and_disable_subtitles() {
    let (media, en, fr) = subtitled_media();
    let store = store_for(&media);

    store
        .dispatch(Request::ShowSubtitles(vec![TrackSelector::language("fr")]))
        .unwrap();
    assert_eq!(fr.mode(), TextTrackMode::Showing);
    assert_eq!(en.mode(), TextTrackMode::Disabled);
    let showing = store.get_state().subtitles_showing().to_vec();
    assert_eq!(showing.len(), 1);
    assert_eq!(showing[0].language, "fr");

    store
        .dispatch(Request::DisableSubtitles(vec![TrackSelector::language("fr")]))
        .unwrap();
    assert!(store.get_state().subtitles_showing().is_empty());
}

#[test]
fn test_toggle_subtitles() {
    let (media, en, _fr) = subtitled_media();
    let store = store_for(&media);

    store.dispatch(Request::ToggleSubtitles(None)).unwrap();
    // No preference: the first track wins.
    assert_eq!(en.mode(), TextTrackMode::Showing);
    assert_eq!(store.get_state().subtitles_showing().len(), 1);

    store.dispatch(Request::ToggleSubtitles(None)).unwrap();
    assert!(store.get_state().subtitles_showing().is_empty());

    store.dispatch(Request::ToggleSubtitles(Some(false))).unwrap();
    assert!(store.get_state().subtitles_showing().is_empty());
}

#[test]
fn test_rendition_selection() {
    let rendition = |id: &str, height: u32| RenditionInfo {
        id: id.to_string(),
        width: height * 16 / 9,
        height,
        bitrate: u64::from(height) * 5000,
        codec: None,
    };
    let renditions = FakeRenditions::new(vec![rendition("low", 360), rendition("high", 1080)]);
    let media = FakeMedia::builder()
        .duration(30.0)
        .renditions(renditions)
        .build();
    let store = store_for(&media);
    assert_eq!(store.get_state().rendition_list().len(), 2);
    assert_eq!(store.get_state().rendition_selected(), None);

    store
        .dispatch(Request::Rendition(Some("high".into())))
        .unwrap();
    assert_eq!(store.get_state().rendition_selected().as_deref(), Some("high"));

    store.dispatch(Request::Rendition(None)).unwrap();
    assert_eq!(store.get_state().rendition_selected(), None);
}

#[test]
fn test_audio_track_selection() {
    let track = |id: &str, enabled: bool| AudioTrackInfo {
        id: id.to_string(),
        kind: "main".into(),
        label: id.to_uppercase(),
        language: id.to_string(),
        enabled,
    };
    let tracks = FakeAudioTracks::new(vec![track("en", true), track("de", false)]);
    let media = FakeMedia::builder()
        .duration(30.0)
        .audio_tracks(tracks)
        .build();
    let store = store_for(&media);
    assert_eq!(store.get_state().audio_track_enabled().as_deref(), Some("en"));
    assert_eq!(store.get_state().availability(StateKey::AudioTrackUnavailable), None);

    store
        .dispatch(Request::AudioTrack(Some("de".into())))
        .unwrap();
    assert_eq!(store.get_state().audio_track_enabled().as_deref(), Some("de"));
}

// --- Request parsing ---

#[test]
fn test_dispatch_parsed_request() {
    let media = FakeMedia::with_duration(30.0);
    let store = store_for(&media);

    let request = Request::from_detail("mediavolumerequest", &json!(0.7)).unwrap();
    store.dispatch(request).unwrap();
    assert_eq!(store.get_state().volume(), 0.7);

    let err = Request::from_detail("mediaexplode", &json!(null)).unwrap_err();
    assert!(matches!(err, StoreError::UnknownRequest(name) if name == "mediaexplode"));
}
