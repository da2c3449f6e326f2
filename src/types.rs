//! Core types for the media store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! state_keys {
    ($( $(#[$doc:meta])* $variant:ident => $name:literal, )+) => {
        /// Name of one modeled piece of media state.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum StateKey {
            $( $(#[$doc])* #[serde(rename = $name)] $variant, )+
        }

        impl StateKey {
            /// Every key, facade-backed and preview alike, in declaration order.
            pub const ALL: &'static [StateKey] = &[ $( StateKey::$variant, )+ ];

            /// Stable attribute-style name of the key.
            pub fn name(self) -> &'static str {
                match self {
                    $( StateKey::$variant => $name, )+
                }
            }
        }
    };
}

state_keys! {
    VideoWidth => "mediaWidth",
    VideoHeight => "mediaHeight",
    Paused => "mediaPaused",
    HasPlayed => "mediaHasPlayed",
    Ended => "mediaEnded",
    PlaybackRate => "mediaPlaybackRate",
    Muted => "mediaMuted",
    Volume => "mediaVolume",
    VolumeLevel => "mediaVolumeLevel",
    CurrentTime => "mediaCurrentTime",
    Duration => "mediaDuration",
    Loading => "mediaLoading",
    Seekable => "mediaSeekable",
    Buffered => "mediaBuffered",
    StreamType => "mediaStreamType",
    TargetLiveWindow => "mediaTargetLiveWindow",
    TimeIsLive => "mediaTimeIsLive",
    SubtitlesList => "mediaSubtitlesList",
    SubtitlesShowing => "mediaSubtitlesShowing",
    ChaptersCues => "mediaChaptersCues",
    IsPip => "mediaIsPip",
    RenditionList => "mediaRenditionList",
    RenditionSelected => "mediaRenditionSelected",
    AudioTrackList => "mediaAudioTrackList",
    AudioTrackEnabled => "mediaAudioTrackEnabled",
    IsFullscreen => "mediaIsFullscreen",
    IsCasting => "mediaIsCasting",
    IsAirplaying => "mediaIsAirplaying",
    FullscreenUnavailable => "mediaFullscreenUnavailable",
    PipUnavailable => "mediaPipUnavailable",
    VolumeUnavailable => "mediaVolumeUnavailable",
    CastUnavailable => "mediaCastUnavailable",
    AirplayUnavailable => "mediaAirplayUnavailable",
    RenditionUnavailable => "mediaRenditionUnavailable",
    AudioTrackUnavailable => "mediaAudioTrackUnavailable",
    /// Fatal media error code. Requests are suppressed while it is set.
    ErrorCode => "mediaErrorCode",
    ErrorMessage => "mediaErrorMessage",
    PreviewTime => "mediaPreviewTime",
    PreviewImage => "mediaPreviewImage",
    PreviewCoords => "mediaPreviewCoords",
    PreviewChapter => "mediaPreviewChapter",
}

impl StateKey {
    /// Scrub-preview keys are computed by the preview request, not by a facade entry.
    pub fn is_preview(self) -> bool {
        matches!(
            self,
            StateKey::PreviewTime
                | StateKey::PreviewImage
                | StateKey::PreviewCoords
                | StateKey::PreviewChapter
        )
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single state value.
///
/// Equality follows "same value" semantics: two NaN numbers compare equal so
/// that a media without a known duration does not republish on every pass.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(untagged)]
pub enum StateValue {
    /// No value (the attribute is absent).
    #[default]
    Unset,
    Bool(bool),
    Number(f64),
    Text(String),
    Ranges(Vec<TimeRange>),
    Coords(Vec<f64>),
    Availability(Availability),
    StreamType(StreamType),
    VolumeLevel(VolumeLevel),
    TextTracks(Vec<TextTrackInfo>),
    Cues(Vec<Cue>),
    Renditions(Vec<RenditionInfo>),
    AudioTracks(Vec<AudioTrackInfo>),
}

impl StateValue {
    pub fn is_unset(&self) -> bool {
        matches!(self, StateValue::Unset)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StateValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StateValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Variant name, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            StateValue::Unset => "unset",
            StateValue::Bool(_) => "bool",
            StateValue::Number(_) => "number",
            StateValue::Text(_) => "text",
            StateValue::Ranges(_) => "ranges",
            StateValue::Coords(_) => "coords",
            StateValue::Availability(_) => "availability",
            StateValue::StreamType(_) => "stream_type",
            StateValue::VolumeLevel(_) => "volume_level",
            StateValue::TextTracks(_) => "text_tracks",
            StateValue::Cues(_) => "cues",
            StateValue::Renditions(_) => "renditions",
            StateValue::AudioTracks(_) => "audio_tracks",
        }
    }
}

fn same_number(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl PartialEq for StateValue {
    fn eq(&self, other: &Self) -> bool {
        use StateValue::*;
        match (self, other) {
            (Unset, Unset) => true,
            (Bool(a), Bool(b)) => a == b,
            (Number(a), Number(b)) => same_number(*a, *b),
            (Text(a), Text(b)) => a == b,
            (Ranges(a), Ranges(b)) => a == b,
            (Coords(a), Coords(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_number(*x, *y))
            }
            (Availability(a), Availability(b)) => a == b,
            (StreamType(a), StreamType(b)) => a == b,
            (VolumeLevel(a), VolumeLevel(b)) => a == b,
            (TextTracks(a), TextTracks(b)) => a == b,
            (Cues(a), Cues(b)) => a == b,
            (Renditions(a), Renditions(b)) => a == b,
            (AudioTracks(a), AudioTracks(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for StateValue {
    fn from(b: bool) -> Self {
        StateValue::Bool(b)
    }
}

impl From<f64> for StateValue {
    fn from(n: f64) -> Self {
        StateValue::Number(n)
    }
}

impl From<String> for StateValue {
    fn from(s: String) -> Self {
        StateValue::Text(s)
    }
}

impl From<&str> for StateValue {
    fn from(s: &str) -> Self {
        StateValue::Text(s.to_string())
    }
}

impl<T: Into<StateValue>> From<Option<T>> for StateValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(StateValue::Unset)
    }
}

/// A `[start, end]` time range in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

/// Tri-state availability. Absence of a value (`StateValue::Unset`) means available.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// The environment or owner can never do this.
    Unsupported,
    /// Supported but not currently possible.
    Unavailable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamType {
    Live,
    OnDemand,
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeLevel {
    Off,
    Low,
    Medium,
    High,
}

impl VolumeLevel {
    /// Bucket a volume in `[0, 1]`.
    pub fn bucket(volume: f64, muted: bool) -> Self {
        if muted || volume == 0.0 {
            VolumeLevel::Off
        } else if volume < 0.5 {
            VolumeLevel::Low
        } else if volume < 0.75 {
            VolumeLevel::Medium
        } else {
            VolumeLevel::High
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTrackKind {
    Subtitles,
    Captions,
    Chapters,
    Metadata,
    Descriptions,
}

impl TextTrackKind {
    /// Subtitles and captions are the user-selectable kinds.
    pub fn is_subtitle(self) -> bool {
        matches!(self, TextTrackKind::Subtitles | TextTrackKind::Captions)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTrackMode {
    Disabled,
    Hidden,
    Showing,
}

/// Public description of a subtitle or caption track.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextTrackInfo {
    pub kind: TextTrackKind,
    pub label: String,
    pub language: String,
}

/// A timed text cue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Cue {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionInfo {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub bitrate: u64,
    pub codec: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrackInfo {
    pub id: String,
    pub kind: String,
    pub label: String,
    pub language: String,
    pub enabled: bool,
}

/// Media readiness (`HAVE_NOTHING` .. `HAVE_ENOUGH_DATA`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ReadyState(pub u8);

impl ReadyState {
    pub const HAVE_NOTHING: ReadyState = ReadyState(0);
    pub const HAVE_METADATA: ReadyState = ReadyState(1);
    pub const HAVE_CURRENT_DATA: ReadyState = ReadyState(2);
    pub const HAVE_FUTURE_DATA: ReadyState = ReadyState(3);
    pub const HAVE_ENOUGH_DATA: ReadyState = ReadyState(4);
}

impl fmt::Debug for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReadyState({})", self.0)
    }
}

/// Vendor presentation mode reported by some media owners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentationMode {
    Inline,
    Fullscreen,
    PictureInPicture,
}

/// Remote playback (cast) connection state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteState {
    Disconnected,
    Connecting,
    Connected,
}

/// Availability reported by a playback-target watcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetAvailability {
    Available,
    NotAvailable,
    /// The watcher cannot determine availability.
    Unknown,
}

/// Identity of an element-like owner. Used for fullscreen/pip element comparison.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

impl NodeId {
    /// Allocate a process-unique node id.
    pub fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Sub-owner categories that are wired independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OwnerCategory {
    Media,
    TextTracks,
    VideoRenditions,
    AudioTracks,
    Remote,
    Root,
}

impl OwnerCategory {
    pub const ALL: [OwnerCategory; 6] = [
        OwnerCategory::Media,
        OwnerCategory::TextTracks,
        OwnerCategory::VideoRenditions,
        OwnerCategory::AudioTracks,
        OwnerCategory::Remote,
        OwnerCategory::Root,
    ];
}

/// Extra payload carried by some owner events.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum EventDetail {
    #[default]
    None,
    /// Kind of the text track that was added/removed/changed.
    Track(TextTrackKind),
    /// Playback-target availability change.
    Availability(TargetAvailability),
}

/// An event fired by an owner.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaEvent {
    pub kind: String,
    pub target: Option<NodeId>,
    pub detail: EventDetail,
}

impl MediaEvent {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            target: None,
            detail: EventDetail::None,
        }
    }

    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_detail(mut self, detail: EventDetail) -> Self {
        self.detail = detail;
        self
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_values_compare_equal() {
        assert_eq!(StateValue::Number(f64::NAN), StateValue::Number(f64::NAN));
        assert_ne!(StateValue::Number(1.0), StateValue::Number(f64::NAN));
        assert_ne!(StateValue::Number(0.0), StateValue::Bool(false));
    }

    #[test]
    fn test_key_names_are_unique() {
        let mut names: Vec<_> = StateKey::ALL.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), StateKey::ALL.len());
    }

    #[test]
    fn test_unset_serializes_as_null() {
        let json = serde_json::to_string(&StateValue::Unset).unwrap();
        assert_eq!(json, "null");
        let json = serde_json::to_string(&StateValue::StreamType(StreamType::OnDemand)).unwrap();
        assert_eq!(json, "\"on-demand\"");
    }

    proptest::proptest! {
        #[test]
        fn prop_volume_level_is_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            proptest::prop_assert!(VolumeLevel::bucket(lo, false) as u8 <= VolumeLevel::bucket(hi, false) as u8);
            proptest::prop_assert_eq!(VolumeLevel::bucket(hi, true), VolumeLevel::Off);
        }
    }
}
