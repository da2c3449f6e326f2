//! Text tracks (subtitles, chapters, thumbnails), renditions and audio tracks.

use super::{HookHandler, Teardown};
use crate::error::Result;
use crate::owners::{Listener, Owners, TextTrack};
use crate::platform::SUBTITLES_LANG_PREF_KEY;
use crate::types::{
    EventDetail, MediaEvent, StateKey, StateValue, TextTrackInfo, TextTrackKind, TextTrackMode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Label identifying the metadata track that carries scrub thumbnails.
pub const THUMBNAILS_LABEL: &str = "thumbnails";

/// Picks text tracks by language, and optionally label and kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSelector {
    pub language: String,
    pub label: Option<String>,
    pub kind: Option<TextTrackKind>,
}

impl TrackSelector {
    pub fn language(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            label: None,
            kind: None,
        }
    }

    /// Parse whitespace-separated `lang` or `lang:label` tokens.
    pub fn parse_list(s: &str) -> Vec<TrackSelector> {
        s.split_whitespace()
            .map(|token| match token.split_once(':') {
                Some((language, label)) => TrackSelector {
                    language: language.to_string(),
                    label: Some(label.to_string()),
                    kind: None,
                },
                None => TrackSelector::language(token),
            })
            .collect()
    }

    pub fn matches(&self, track: &dyn TextTrack) -> bool {
        track.language() == self.language
            && self.label.as_ref().map_or(true, |label| *label == track.label())
            && self.kind.map_or(true, |kind| kind == track.kind())
    }
}

impl From<&TextTrackInfo> for TrackSelector {
    fn from(info: &TextTrackInfo) -> Self {
        Self {
            language: info.language.clone(),
            label: Some(info.label.clone()),
            kind: Some(info.kind),
        }
    }
}

fn track_info(track: &dyn TextTrack) -> TextTrackInfo {
    TextTrackInfo {
        kind: track.kind(),
        label: track.label(),
        language: track.language(),
    }
}

pub fn text_tracks(owners: &Owners) -> Vec<Arc<dyn TextTrack>> {
    owners.text_tracks().map(|t| t.tracks()).unwrap_or_default()
}

/// Subtitle and caption tracks.
pub fn subtitle_tracks(owners: &Owners) -> Vec<Arc<dyn TextTrack>> {
    text_tracks(owners)
        .into_iter()
        .filter(|t| t.kind().is_subtitle())
        .collect()
}

pub fn showing_subtitle_tracks(owners: &Owners) -> Vec<Arc<dyn TextTrack>> {
    subtitle_tracks(owners)
        .into_iter()
        .filter(|t| t.mode() == TextTrackMode::Showing)
        .collect()
}

pub fn chapters_track(owners: &Owners) -> Option<Arc<dyn TextTrack>> {
    text_tracks(owners)
        .into_iter()
        .find(|t| t.kind() == TextTrackKind::Chapters)
}

pub fn thumbnails_track(owners: &Owners) -> Option<Arc<dyn TextTrack>> {
    text_tracks(owners)
        .into_iter()
        .find(|t| t.kind() == TextTrackKind::Metadata && t.label() == THUMBNAILS_LABEL)
}

/// Set `mode` on every track matched by any selector.
pub fn update_tracks_mode(
    mode: TextTrackMode,
    tracks: &[Arc<dyn TextTrack>],
    selectors: &[TrackSelector],
) {
    for track in tracks {
        if selectors.iter().any(|s| s.matches(track.as_ref())) {
            track.set_mode(mode);
        }
    }
}

fn primary_subtag(tag: &str) -> String {
    tag.split('-').next().unwrap_or(tag).to_lowercase()
}

/// Stored language preference first, then platform languages. Empty when
/// language preferences are turned off, so the first track wins.
fn preferred_languages(owners: &Owners) -> Vec<String> {
    if owners.options().no_subtitles_lang_pref {
        return Vec::new();
    }
    let mut languages = Vec::new();
    if let Some(prefs) = &owners.platform.preferences {
        match prefs.get(SUBTITLES_LANG_PREF_KEY) {
            Ok(Some(lang)) => languages.push(lang),
            Ok(None) => {}
            Err(err) => tracing::warn!(%err, "failed to read subtitle language preference"),
        }
    }
    languages.extend(owners.platform.languages.iter().cloned());
    languages
}

fn preferred_track(owners: &Owners, tracks: &[Arc<dyn TextTrack>]) -> Arc<dyn TextTrack> {
    let languages: Vec<String> = preferred_languages(owners)
        .iter()
        .map(|l| primary_subtag(l))
        .collect();

    let rank = |track: &Arc<dyn TextTrack>| {
        let language = track.language().to_lowercase();
        languages.iter().position(|l| language.starts_with(l.as_str()))
    };

    // min_by_key keeps the first track among equal ranks.
    tracks
        .iter()
        .filter_map(|t| rank(t).map(|r| (r, t)))
        .min_by_key(|(r, _)| *r)
        .map(|(_, t)| Arc::clone(t))
        .unwrap_or_else(|| Arc::clone(&tracks[0]))
}

/// Show or hide subtitles. `force` pins the direction; `None` flips it.
pub fn toggle_subtitles(owners: &Owners, force: Option<bool>) {
    let tracks = subtitle_tracks(owners);
    if tracks.is_empty() {
        return;
    }
    let showing = showing_subtitle_tracks(owners);
    let any_showing = !showing.is_empty();

    if force == Some(false) || (any_showing && force != Some(true)) {
        for track in &showing {
            track.set_mode(TextTrackMode::Disabled);
        }
        return;
    }

    let chosen = preferred_track(owners, &tracks);
    for track in &showing {
        track.set_mode(TextTrackMode::Disabled);
    }
    chosen.set_mode(TextTrackMode::Showing);
}

/// Persist the language of an explicit subtitle choice.
pub fn remember_subtitle_language(owners: &Owners, language: &str) {
    if language.is_empty() || owners.options().no_subtitles_lang_pref {
        return;
    }
    if let Some(prefs) = &owners.platform.preferences {
        if let Err(err) = prefs.set(SUBTITLES_LANG_PREF_KEY, language) {
            tracing::warn!(%err, "failed to persist subtitle language preference");
        }
    }
}

pub(super) fn get_subtitles_list(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    StateValue::TextTracks(
        subtitle_tracks(owners)
            .iter()
            .map(|t| track_info(t.as_ref()))
            .collect(),
    )
}

pub(super) fn get_subtitles_showing(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    StateValue::TextTracks(
        showing_subtitle_tracks(owners)
            .iter()
            .map(|t| track_info(t.as_ref()))
            .collect(),
    )
}

/// Turn subtitles on automatically when `default_subtitles` is set.
///
/// Fires at setup, on load start, and whenever a subtitle or caption track
/// is added or removed.
pub(super) fn enable_default_subtitles(_handler: HookHandler, owners: &Owners) -> Option<Teardown> {
    let media = owners.media.clone()?;
    let tracks = owners.text_tracks().cloned();

    let hook_owners = owners.clone();
    let callback: Listener = Arc::new(move |event: &MediaEvent| {
        if !hook_owners.options().default_subtitles {
            return;
        }
        if let EventDetail::Track(kind) = event.detail {
            if !kind.is_subtitle() {
                return;
            }
        }
        toggle_subtitles(&hook_owners, Some(true));
    });

    let load_id = media.add_event_listener("loadstart", Arc::clone(&callback));
    let track_ids = tracks.as_ref().map(|list| {
        (
            list.add_event_listener("addtrack", Arc::clone(&callback)),
            list.add_event_listener("removetrack", Arc::clone(&callback)),
        )
    });

    if owners.options().default_subtitles {
        toggle_subtitles(owners, Some(true));
    }

    Some(Box::new(move || {
        media.remove_event_listener("loadstart", load_id);
        if let (Some(list), Some((add_id, remove_id))) = (tracks, track_ids) {
            list.remove_event_listener("addtrack", add_id);
            list.remove_event_listener("removetrack", remove_id);
        }
    }))
}

pub(super) fn get_chapters_cues(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    StateValue::Cues(chapters_track(owners).map(|t| t.cues()).unwrap_or_default())
}

pub(super) fn get_rendition_list(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    StateValue::Renditions(
        owners
            .video_renditions()
            .map(|r| r.renditions())
            .unwrap_or_default(),
    )
}

pub(super) fn get_rendition_selected(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    let Some(list) = owners.video_renditions() else {
        return StateValue::Unset;
    };
    list.selected_index()
        .and_then(|i| list.renditions().into_iter().nth(i))
        .map(|r| r.id)
        .into()
}

/// Select a rendition by id. Unset (or an unknown id) selects automatic.
pub(super) fn set_rendition_selected(value: &StateValue, owners: &Owners) -> Result<()> {
    let Some(list) = owners.video_renditions() else {
        tracing::warn!("rendition selection not supported by this media");
        return Ok(());
    };
    let id = value.as_str();
    let index = id.and_then(|id| list.renditions().iter().position(|r| r.id == id));
    if list.selected_index() != index {
        list.set_selected_index(index);
    }
    Ok(())
}

pub(super) fn get_audio_track_list(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    StateValue::AudioTracks(owners.audio_tracks().map(|a| a.tracks()).unwrap_or_default())
}

pub(super) fn get_audio_track_enabled(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    owners
        .audio_tracks()
        .and_then(|a| a.tracks().into_iter().find(|t| t.enabled))
        .map(|t| t.id)
        .into()
}

pub(super) fn set_audio_track_enabled(value: &StateValue, owners: &Owners) -> Result<()> {
    let Some(list) = owners.audio_tracks() else {
        tracing::warn!("audio track selection not supported by this media");
        return Ok(());
    };
    let Some(id) = value.as_str() else {
        tracing::warn!(key = %StateKey::AudioTrackEnabled, got = value.kind(), "ignoring audio track of wrong type");
        return Ok(());
    };
    for track in list.tracks() {
        list.set_enabled(&track.id, track.id == id);
    }
    Ok(())
}
