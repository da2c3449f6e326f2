//! Persisted volume and subtitle-language preferences.

use media_store::platform::{SUBTITLES_LANG_PREF_KEY, VOLUME_PREF_KEY};
use media_store::testing::{FakeMedia, FakeTextTrack, FakeTextTracks};
use media_store::{
    JsonFilePreferences, MediaOwner, MediaStore, MemoryPreferences, Platform, PreferenceStorage,
    Request, StoreConfig, StoreOptions, TextTrack, TextTrackMode, TrackSelector,
};
use std::sync::Arc;
use tempfile::TempDir;

fn store(media: &Arc<FakeMedia>, prefs: Arc<dyn PreferenceStorage>, options: StoreOptions) -> MediaStore {
    let media: Arc<dyn MediaOwner> = media.clone();
    MediaStore::new(StoreConfig {
        monitor_on_demand: false,
        platform: Arc::new(Platform::new().with_preferences(prefs)),
        options,
        media: Some(media),
        ..Default::default()
    })
}

// --- Volume ---

#[test]
fn test_volume_is_persisted_and_restored() {
    let dir = TempDir::new().unwrap();
    let prefs = Arc::new(JsonFilePreferences::new(dir.path().join("prefs.json")));

    let first = FakeMedia::with_duration(30.0);
    let first_store = store(&first, prefs.clone(), StoreOptions::default());
    first_store.dispatch(Request::Volume(0.4)).unwrap();
    assert_eq!(prefs.get(VOLUME_PREF_KEY).unwrap().as_deref(), Some("0.4"));

    // A new store over new media picks the preference up from disk.
    let reopened = Arc::new(JsonFilePreferences::new(dir.path().join("prefs.json")));
    let second = FakeMedia::with_duration(30.0);
    let second_store = store(&second, reopened, StoreOptions::default());

    assert_eq!(second.volume(), Some(0.4));
    assert_eq!(second_store.get_state().volume(), 0.4);
}

#[test]
fn test_volume_pref_can_be_disabled() {
    let prefs = Arc::new(MemoryPreferences::new());
    prefs.set(VOLUME_PREF_KEY, "0.2").unwrap();
    let options = StoreOptions {
        no_volume_pref: true,
        ..Default::default()
    };

    let media = FakeMedia::with_duration(30.0);
    let store = store(&media, prefs.clone(), options);
    assert_eq!(store.get_state().volume(), 1.0);

    store.dispatch(Request::Volume(0.7)).unwrap();
    assert_eq!(prefs.get(VOLUME_PREF_KEY).unwrap().as_deref(), Some("0.2"));
}

#[test]
fn test_out_of_range_stored_volume_is_clamped() {
    let prefs = Arc::new(MemoryPreferences::new());
    prefs.set(VOLUME_PREF_KEY, "3").unwrap();

    let media = FakeMedia::with_duration(30.0);
    let store = store(&media, prefs, StoreOptions::default());
    assert_eq!(store.get_state().volume(), 1.0);
    assert_eq!(media.volume(), Some(1.0));
}

// --- Subtitles ---

fn tracks(languages: &[&str]) -> (Arc<FakeTextTracks>, Vec<Arc<FakeTextTrack>>) {
    let list = FakeTextTracks::new();
    let tracks: Vec<_> = languages
        .iter()
        .map(|lang| FakeTextTrack::subtitles(lang, &lang.to_uppercase()))
        .collect();
    for track in &tracks {
        list.add_track(track.clone());
    }
    (list, tracks)
}

fn default_subtitles() -> StoreOptions {
    StoreOptions {
        default_subtitles: true,
        ..Default::default()
    }
}

#[test]
fn test_explicit_choice_is_remembered_and_preferred() {
    let prefs = Arc::new(MemoryPreferences::new());

    let (list, _) = tracks(&["en", "fr"]);
    let media = FakeMedia::builder().duration(30.0).text_tracks(list).build();
    let first = store(&media, prefs.clone(), StoreOptions::default());
    first
        .dispatch(Request::ShowSubtitles(vec![TrackSelector::language("fr")]))
        .unwrap();
    assert_eq!(
        prefs.get(SUBTITLES_LANG_PREF_KEY).unwrap().as_deref(),
        Some("fr")
    );

    let (list, tracks) = tracks(&["en", "fr"]);
    let media = FakeMedia::builder().duration(30.0).text_tracks(list).build();
    let second = store(&media, prefs, default_subtitles());

    assert_eq!(tracks[0].mode(), TextTrackMode::Disabled);
    assert_eq!(tracks[1].mode(), TextTrackMode::Showing);
    assert_eq!(second.get_state().subtitles_showing()[0].language, "fr");
}

#[test]
fn test_default_subtitles_follow_platform_languages() {
    let (list, tracks) = tracks(&["en", "de"]);
    let media: Arc<dyn MediaOwner> = FakeMedia::builder().duration(30.0).text_tracks(list).build();
    let store = MediaStore::new(StoreConfig {
        monitor_on_demand: false,
        platform: Arc::new(Platform::new().with_languages(vec!["de-DE".into()])),
        options: default_subtitles(),
        media: Some(media),
        ..Default::default()
    });

    assert_eq!(tracks[1].mode(), TextTrackMode::Showing);
    assert_eq!(store.get_state().subtitles_showing().len(), 1);
}

#[test]
fn test_default_subtitles_apply_to_tracks_added_later() {
    let list = FakeTextTracks::new();
    let media = FakeMedia::builder()
        .duration(30.0)
        .text_tracks(list.clone())
        .build();
    let store = store(&media, Arc::new(MemoryPreferences::new()), default_subtitles());
    assert!(store.get_state().subtitles_showing().is_empty());

    let track = FakeTextTrack::subtitles("en", "English");
    list.add_track(track.clone());

    assert_eq!(track.mode(), TextTrackMode::Showing);
    assert_eq!(store.get_state().subtitles_showing().len(), 1);
}

#[test]
fn test_subtitle_pref_can_be_disabled() {
    let prefs = Arc::new(MemoryPreferences::new());
    let options = StoreOptions {
        no_subtitles_lang_pref: true,
        ..Default::default()
    };
    let (list, _) = tracks(&["en", "fr"]);
    let media = FakeMedia::builder().duration(30.0).text_tracks(list).build();
    let store = store(&media, prefs.clone(), options);

    store
        .dispatch(Request::ShowSubtitles(vec![TrackSelector::language("fr")]))
        .unwrap();
    assert_eq!(prefs.get(SUBTITLES_LANG_PREF_KEY).unwrap(), None);
}

#[test]
fn test_disabled_language_pref_falls_back_to_first_track() {
    let prefs = Arc::new(MemoryPreferences::new());
    prefs.set(SUBTITLES_LANG_PREF_KEY, "fr").unwrap();
    let (list, tracks) = tracks(&["en", "fr", "de"]);
    let media: Arc<dyn MediaOwner> = FakeMedia::builder().duration(30.0).text_tracks(list).build();
    let store = MediaStore::new(StoreConfig {
        monitor_on_demand: false,
        platform: Arc::new(
            Platform::new()
                .with_preferences(prefs)
                .with_languages(vec!["de-DE".into()]),
        ),
        options: StoreOptions {
            default_subtitles: true,
            no_subtitles_lang_pref: true,
            ..Default::default()
        },
        media: Some(media),
        ..Default::default()
    });

    assert_eq!(tracks[0].mode(), TextTrackMode::Showing);
    assert_eq!(tracks[1].mode(), TextTrackMode::Disabled);
    assert_eq!(tracks[2].mode(), TextTrackMode::Disabled);
    assert_eq!(store.get_state().subtitles_showing()[0].language, "en");
}
