//! Immutable state snapshots and partial updates.

use crate::types::{
    Availability, AudioTrackInfo, Cue, RenditionInfo, StateKey, StateValue, StreamType,
    TextTrackInfo, TimeRange, VolumeLevel,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

static UNSET: StateValue = StateValue::Unset;

/// A partial snapshot: only the keys it names are replaced on merge.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatePatch {
    values: BTreeMap<StateKey, StateValue>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: StateKey, value: impl Into<StateValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: StateKey, value: impl Into<StateValue>) {
        self.values.insert(key, value.into());
    }

    pub fn get(&self, key: StateKey) -> Option<&StateValue> {
        self.values.get(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, &StateValue)> {
        self.values.iter()
    }
}

impl FromIterator<(StateKey, StateValue)> for StatePatch {
    fn from_iter<I: IntoIterator<Item = (StateKey, StateValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Immutable view of all modeled media state at a point in time.
///
/// Cloning is cheap; a change always produces a new value via [`MediaState::merge`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MediaState {
    values: Arc<BTreeMap<StateKey, StateValue>>,
}

macro_rules! typed_accessors {
    ($( $(#[$doc:meta])* $fn_name:ident: $key:ident => $ty:ty, |$v:ident| $conv:expr, $default:expr; )+) => {
        impl MediaState {
            $(
                $(#[$doc])*
                pub fn $fn_name(&self) -> $ty {
                    match self.get(StateKey::$key) {
                        $v => $conv.unwrap_or($default),
                    }
                }
            )+
        }
    };
}

typed_accessors! {
    paused: Paused => bool, |v| v.as_bool(), true;
    has_played: HasPlayed => bool, |v| v.as_bool(), false;
    ended: Ended => bool, |v| v.as_bool(), false;
    muted: Muted => bool, |v| v.as_bool(), false;
    volume: Volume => f64, |v| v.as_f64(), 1.0;
    playback_rate: PlaybackRate => f64, |v| v.as_f64(), 1.0;
    current_time: CurrentTime => f64, |v| v.as_f64(), 0.0;
    duration: Duration => f64, |v| v.as_f64(), f64::NAN;
    loading: Loading => bool, |v| v.as_bool(), true;
    target_live_window: TargetLiveWindow => f64, |v| v.as_f64(), f64::NAN;
    time_is_live: TimeIsLive => bool, |v| v.as_bool(), false;
    is_fullscreen: IsFullscreen => bool, |v| v.as_bool(), false;
    is_pip: IsPip => bool, |v| v.as_bool(), false;
    is_casting: IsCasting => bool, |v| v.as_bool(), false;
    is_airplaying: IsAirplaying => bool, |v| v.as_bool(), false;
    /// Unset unless a preview request is pending.
    preview_time: PreviewTime => Option<f64>, |v| v.as_f64().map(Some), None;
    preview_image: PreviewImage => Option<String>, |v| v.as_str().map(|s| Some(s.to_string())), None;
    /// Empty string when a preview is pending but no chapter covers it.
    preview_chapter: PreviewChapter => Option<String>, |v| v.as_str().map(|s| Some(s.to_string())), None;
    rendition_selected: RenditionSelected => Option<String>, |v| v.as_str().map(|s| Some(s.to_string())), None;
    audio_track_enabled: AudioTrackEnabled => Option<String>, |v| v.as_str().map(|s| Some(s.to_string())), None;
    error_code: ErrorCode => Option<f64>, |v| v.as_f64().map(Some), None;
    error_message: ErrorMessage => Option<String>, |v| v.as_str().map(|s| Some(s.to_string())), None;
}

impl MediaState {
    /// Build a snapshot holding exactly the given values.
    pub fn from_patch(patch: StatePatch) -> Self {
        Self {
            values: Arc::new(patch.values),
        }
    }

    /// Value for `key`, or [`StateValue::Unset`] if never computed.
    pub fn get(&self, key: StateKey) -> &StateValue {
        self.values.get(&key).unwrap_or(&UNSET)
    }

    /// True if every entry of `patch` already equals the current value.
    pub fn contains(&self, patch: &StatePatch) -> bool {
        patch.iter().all(|(k, v)| self.get(*k) == v)
    }

    /// Produce a new snapshot with `patch` applied, or `None` if nothing changes.
    pub fn merge(&self, patch: &StatePatch) -> Option<MediaState> {
        if self.contains(patch) {
            return None;
        }
        let mut values = (*self.values).clone();
        for (key, value) in patch.iter() {
            values.insert(*key, value.clone());
        }
        Some(Self {
            values: Arc::new(values),
        })
    }

    /// True if both snapshots share the same allocation.
    pub fn ptr_eq(&self, other: &MediaState) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }

    pub fn volume_level(&self) -> VolumeLevel {
        match self.get(StateKey::VolumeLevel) {
            StateValue::VolumeLevel(level) => *level,
            _ => VolumeLevel::High,
        }
    }

    pub fn stream_type(&self) -> Option<StreamType> {
        match self.get(StateKey::StreamType) {
            StateValue::StreamType(t) => Some(*t),
            _ => None,
        }
    }

    /// `[start, end]` of the seekable window, if known.
    pub fn seekable(&self) -> Option<TimeRange> {
        match self.get(StateKey::Seekable) {
            StateValue::Ranges(r) => r.first().copied(),
            _ => None,
        }
    }

    pub fn buffered(&self) -> &[TimeRange] {
        match self.get(StateKey::Buffered) {
            StateValue::Ranges(r) => r,
            _ => &[],
        }
    }

    pub fn preview_coords(&self) -> Option<&[f64]> {
        match self.get(StateKey::PreviewCoords) {
            StateValue::Coords(c) => Some(c),
            _ => None,
        }
    }

    pub fn availability(&self, key: StateKey) -> Option<Availability> {
        match self.get(key) {
            StateValue::Availability(a) => Some(*a),
            _ => None,
        }
    }

    pub fn subtitles_list(&self) -> &[TextTrackInfo] {
        match self.get(StateKey::SubtitlesList) {
            StateValue::TextTracks(t) => t,
            _ => &[],
        }
    }

    pub fn subtitles_showing(&self) -> &[TextTrackInfo] {
        match self.get(StateKey::SubtitlesShowing) {
            StateValue::TextTracks(t) => t,
            _ => &[],
        }
    }

    pub fn chapters_cues(&self) -> &[Cue] {
        match self.get(StateKey::ChaptersCues) {
            StateValue::Cues(c) => c,
            _ => &[],
        }
    }

    pub fn rendition_list(&self) -> &[RenditionInfo] {
        match self.get(StateKey::RenditionList) {
            StateValue::Renditions(r) => r,
            _ => &[],
        }
    }

    pub fn audio_track_list(&self) -> &[AudioTrackInfo] {
        match self.get(StateKey::AudioTrackList) {
            StateValue::AudioTracks(t) => t,
            _ => &[],
        }
    }

    /// Serialize to a JSON object keyed by attribute-style names.
    pub fn to_json(&self) -> crate::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_without_change_returns_none() {
        let state = MediaState::from_patch(StatePatch::new().with(StateKey::Paused, true));
        let same = StatePatch::new().with(StateKey::Paused, true);
        assert!(state.merge(&same).is_none());
    }

    #[test]
    fn test_merge_produces_new_value_and_keeps_old() {
        let state = MediaState::from_patch(
            StatePatch::new()
                .with(StateKey::Paused, true)
                .with(StateKey::Volume, 0.5),
        );
        let next = state
            .merge(&StatePatch::new().with(StateKey::Paused, false))
            .unwrap();
        assert!(state.paused());
        assert!(!next.paused());
        assert_eq!(next.volume(), 0.5);
        assert!(!state.ptr_eq(&next));
    }

    #[test]
    fn test_defaults_for_missing_keys() {
        let state = MediaState::default();
        assert!(state.paused());
        assert!(state.duration().is_nan());
        assert_eq!(state.volume(), 1.0);
        assert_eq!(state.preview_chapter(), None);
    }

    #[test]
    fn test_json_uses_attribute_names() {
        let state = MediaState::from_patch(StatePatch::new().with(StateKey::Muted, true));
        let json = state.to_json().unwrap();
        assert_eq!(json["mediaMuted"], serde_json::json!(true));
    }
}
