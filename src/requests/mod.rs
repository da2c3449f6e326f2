//! The request table: state-change intents and one handler per intent.
//!
//! Handlers write through the facade and never commit state themselves; the
//! owner's confirming event does that. The one exception is the scrub
//! preview, whose values exist nowhere else and come back as a patch.
//!
//! A missing owner capability is never an error here. The facade setter
//! decides whether it deserves a warning.

mod preview;

pub use preview::{chapter_cue_at, resolve as resolve_preview, resolve_thumbnail, thumbnail_cue_at};

use crate::error::{Result, StoreError};
use crate::facade::{
    self, remember_subtitle_language, seekable_end, subtitle_tracks, toggle_subtitles,
    update_tracks_mode, TrackSelector,
};
use crate::owners::Owners;
use crate::snapshot::StatePatch;
use crate::types::{StateKey, StateValue, TextTrackMode};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

macro_rules! request_kinds {
    ($( $variant:ident => $name:literal, )+) => {
        /// Request names, without payloads.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum RequestKind {
            $( $variant, )+
        }

        impl RequestKind {
            pub const ALL: &'static [RequestKind] = &[ $( RequestKind::$variant, )+ ];

            /// Stable event-style name, e.g. `mediaplayrequest`.
            pub fn name(self) -> &'static str {
                match self {
                    $( RequestKind::$variant => $name, )+
                }
            }
        }

        impl FromStr for RequestKind {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $( $name => Ok(RequestKind::$variant), )+
                    other => Err(StoreError::UnknownRequest(other.to_string())),
                }
            }
        }
    };
}

request_kinds! {
    Play => "mediaplayrequest",
    Pause => "mediapauserequest",
    Mute => "mediamuterequest",
    Unmute => "mediaunmuterequest",
    Volume => "mediavolumerequest",
    Seek => "mediaseekrequest",
    PlaybackRate => "mediaplaybackraterequest",
    EnterFullscreen => "mediaenterfullscreenrequest",
    ExitFullscreen => "mediaexitfullscreenrequest",
    EnterPip => "mediaenterpiprequest",
    ExitPip => "mediaexitpiprequest",
    EnterCast => "mediaentercastrequest",
    ExitCast => "mediaexitcastrequest",
    Airplay => "mediaairplayrequest",
    ShowSubtitles => "mediashowsubtitlesrequest",
    DisableSubtitles => "mediadisablesubtitlesrequest",
    ToggleSubtitles => "mediatogglesubtitlesrequest",
    Rendition => "mediarenditionrequest",
    AudioTrack => "mediaaudiotrackrequest",
    Preview => "mediapreviewrequest",
    SeekToLive => "mediaseektoliverequest",
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A state-change intent with its payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    Play,
    Pause,
    Mute,
    Unmute,
    Volume(f64),
    Seek(f64),
    PlaybackRate(f64),
    EnterFullscreen,
    ExitFullscreen,
    EnterPip,
    ExitPip,
    EnterCast,
    ExitCast,
    Airplay,
    ShowSubtitles(Vec<TrackSelector>),
    DisableSubtitles(Vec<TrackSelector>),
    /// `Some(true)` forces on, `Some(false)` forces off, `None` flips.
    ToggleSubtitles(Option<bool>),
    /// Rendition id; `None` selects automatic.
    Rendition(Option<String>),
    AudioTrack(Option<String>),
    /// Hovered time; `None` clears the preview.
    Preview(Option<f64>),
    SeekToLive,
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn number(detail: &Value) -> Result<f64> {
    detail.as_f64().ok_or(StoreError::ValueType {
        expected: "number",
        got: json_kind(detail),
    })
}

fn optional_number(detail: &Value) -> Result<Option<f64>> {
    match detail {
        Value::Null => Ok(None),
        other => number(other).map(Some),
    }
}

fn optional_string(detail: &Value) -> Result<Option<String>> {
    match detail {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(StoreError::ValueType {
            expected: "string",
            got: json_kind(other),
        }),
    }
}

/// Selectors as `"en fr:Français"` or as an array of selector objects.
fn selectors(detail: &Value) -> Result<Vec<TrackSelector>> {
    match detail {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(TrackSelector::parse_list(s)),
        Value::Array(_) => Ok(serde_json::from_value(detail.clone())?),
        Value::Object(_) => Ok(vec![serde_json::from_value(detail.clone())?]),
        other => Err(StoreError::ValueType {
            expected: "track selectors",
            got: json_kind(other),
        }),
    }
}

impl Request {
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Play => RequestKind::Play,
            Request::Pause => RequestKind::Pause,
            Request::Mute => RequestKind::Mute,
            Request::Unmute => RequestKind::Unmute,
            Request::Volume(_) => RequestKind::Volume,
            Request::Seek(_) => RequestKind::Seek,
            Request::PlaybackRate(_) => RequestKind::PlaybackRate,
            Request::EnterFullscreen => RequestKind::EnterFullscreen,
            Request::ExitFullscreen => RequestKind::ExitFullscreen,
            Request::EnterPip => RequestKind::EnterPip,
            Request::ExitPip => RequestKind::ExitPip,
            Request::EnterCast => RequestKind::EnterCast,
            Request::ExitCast => RequestKind::ExitCast,
            Request::Airplay => RequestKind::Airplay,
            Request::ShowSubtitles(_) => RequestKind::ShowSubtitles,
            Request::DisableSubtitles(_) => RequestKind::DisableSubtitles,
            Request::ToggleSubtitles(_) => RequestKind::ToggleSubtitles,
            Request::Rendition(_) => RequestKind::Rendition,
            Request::AudioTrack(_) => RequestKind::AudioTrack,
            Request::Preview(_) => RequestKind::Preview,
            Request::SeekToLive => RequestKind::SeekToLive,
        }
    }

    /// Build a request from its name and a JSON detail (use `Value::Null` for none).
    pub fn from_detail(name: &str, detail: &Value) -> Result<Request> {
        let request = match name.parse::<RequestKind>()? {
            RequestKind::Play => Request::Play,
            RequestKind::Pause => Request::Pause,
            RequestKind::Mute => Request::Mute,
            RequestKind::Unmute => Request::Unmute,
            RequestKind::Volume => Request::Volume(number(detail)?),
            RequestKind::Seek => Request::Seek(number(detail)?),
            RequestKind::PlaybackRate => Request::PlaybackRate(number(detail)?),
            RequestKind::EnterFullscreen => Request::EnterFullscreen,
            RequestKind::ExitFullscreen => Request::ExitFullscreen,
            RequestKind::EnterPip => Request::EnterPip,
            RequestKind::ExitPip => Request::ExitPip,
            RequestKind::EnterCast => Request::EnterCast,
            RequestKind::ExitCast => Request::ExitCast,
            RequestKind::Airplay => Request::Airplay,
            RequestKind::ShowSubtitles => Request::ShowSubtitles(selectors(detail)?),
            RequestKind::DisableSubtitles => Request::DisableSubtitles(selectors(detail)?),
            RequestKind::ToggleSubtitles => Request::ToggleSubtitles(detail.as_bool()),
            RequestKind::Rendition => Request::Rendition(optional_string(detail)?),
            RequestKind::AudioTrack => Request::AudioTrack(optional_string(detail)?),
            RequestKind::Preview => Request::Preview(optional_number(detail)?),
            RequestKind::SeekToLive => Request::SeekToLive,
        };
        Ok(request)
    }
}

/// Perform a request against the owners.
///
/// Returns a patch only for values that owners can't report back.
pub fn handle(owners: &Owners, request: &Request) -> Result<Option<StatePatch>> {
    tracing::trace!(request = %request.kind(), "handling request");
    match request {
        Request::Play => write(owners, StateKey::Paused, false),
        Request::Pause => write(owners, StateKey::Paused, true),
        Request::Mute => write(owners, StateKey::Muted, true),
        Request::Unmute => write(owners, StateKey::Muted, false),
        Request::Volume(volume) => write(owners, StateKey::Volume, *volume),
        Request::Seek(time) => write(owners, StateKey::CurrentTime, *time),
        Request::PlaybackRate(rate) => write(owners, StateKey::PlaybackRate, *rate),
        Request::EnterFullscreen => write(owners, StateKey::IsFullscreen, true),
        Request::ExitFullscreen => write(owners, StateKey::IsFullscreen, false),
        Request::EnterPip => write(owners, StateKey::IsPip, true),
        Request::ExitPip => write(owners, StateKey::IsPip, false),
        Request::EnterCast => write(owners, StateKey::IsCasting, true),
        Request::ExitCast => write(owners, StateKey::IsCasting, false),
        Request::Airplay => write(owners, StateKey::IsAirplaying, true),
        Request::ShowSubtitles(selectors) => show_subtitles(owners, selectors),
        Request::DisableSubtitles(selectors) => {
            update_tracks_mode(TextTrackMode::Disabled, &subtitle_tracks(owners), selectors);
            Ok(None)
        }
        Request::ToggleSubtitles(force) => {
            toggle_subtitles(owners, *force);
            Ok(None)
        }
        Request::Rendition(id) => write(owners, StateKey::RenditionSelected, id.clone()),
        Request::AudioTrack(Some(id)) => write(owners, StateKey::AudioTrackEnabled, id.as_str()),
        Request::AudioTrack(None) => Ok(None),
        Request::Preview(time) => Ok(Some(preview::resolve(owners, *time))),
        Request::SeekToLive => seek_to_live(owners),
    }
}

fn write(owners: &Owners, key: StateKey, value: impl Into<StateValue>) -> Result<Option<StatePatch>> {
    facade::set(key, &value.into(), owners)?;
    Ok(None)
}

fn show_subtitles(owners: &Owners, selectors: &[TrackSelector]) -> Result<Option<StatePatch>> {
    let tracks = subtitle_tracks(owners);
    update_tracks_mode(TextTrackMode::Showing, &tracks, selectors);

    let chosen = tracks
        .iter()
        .find(|t| selectors.iter().any(|s| s.matches(t.as_ref())));
    if let Some(track) = chosen {
        remember_subtitle_language(owners, &track.language());
    }
    Ok(None)
}

fn seek_to_live(owners: &Owners) -> Result<Option<StatePatch>> {
    let Some(end) = seekable_end(owners) else {
        tracing::debug!("no seekable end, ignoring seek to live");
        return Ok(None);
    };
    let target = end - owners.options().seek_to_live_offset();
    write(owners, StateKey::CurrentTime, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_names_round_trip() {
        for kind in RequestKind::ALL {
            assert_eq!(kind.name().parse::<RequestKind>().unwrap(), *kind);
        }
        assert!(matches!(
            "mediawhateverrequest".parse::<RequestKind>(),
            Err(StoreError::UnknownRequest(_))
        ));
    }

    #[test]
    fn test_from_detail_parses_payloads() {
        assert_eq!(
            Request::from_detail("mediavolumerequest", &json!(0.5)).unwrap(),
            Request::Volume(0.5)
        );
        assert_eq!(
            Request::from_detail("mediapreviewrequest", &Value::Null).unwrap(),
            Request::Preview(None)
        );
        assert_eq!(
            Request::from_detail("mediashowsubtitlesrequest", &json!("en fr:Français")).unwrap(),
            Request::ShowSubtitles(vec![
                TrackSelector::language("en"),
                TrackSelector {
                    language: "fr".into(),
                    label: Some("Français".into()),
                    kind: None,
                },
            ])
        );
        assert_eq!(
            Request::from_detail("mediatogglesubtitlesrequest", &json!(true)).unwrap(),
            Request::ToggleSubtitles(Some(true))
        );
    }

    #[test]
    fn test_from_detail_rejects_wrong_type() {
        let err = Request::from_detail("mediaseekrequest", &json!("soon")).unwrap_err();
        assert!(matches!(
            err,
            StoreError::ValueType {
                expected: "number",
                got: "string"
            }
        ));
    }
}
