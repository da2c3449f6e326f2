//! Store options: the plain configuration record read live by facade getters.

use crate::error::Result;
use crate::types::StreamType;
use serde::{Deserialize, Serialize};

/// Default distance (seconds) from the seekable end still considered "live".
pub const DEFAULT_LIVE_EDGE_OFFSET: f64 = 10.0;

/// Recognized store options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreOptions {
    /// Show a subtitle track automatically once tracks load.
    pub default_subtitles: bool,

    /// Stream type used when the media can't tell.
    pub default_stream_type: Option<StreamType>,

    /// Duration used while the media has no finite duration.
    pub default_duration: Option<f64>,

    /// Seconds behind the seekable end still treated as the live edge.
    pub live_edge_offset: f64,

    /// Don't persist or restore the volume preference.
    pub no_volume_pref: bool,

    /// Don't persist or restore the subtitle language preference.
    pub no_subtitles_lang_pref: bool,

    /// Don't jump to the live edge when playing a non-DVR live stream.
    pub no_auto_seek_to_live: bool,

    /// Seconds behind the seekable end targeted by seek-to-live.
    /// Falls back to `live_edge_offset` when unset.
    pub seek_to_live_offset: Option<f64>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            default_subtitles: false,
            default_stream_type: None,
            default_duration: None,
            live_edge_offset: DEFAULT_LIVE_EDGE_OFFSET,
            no_volume_pref: false,
            no_subtitles_lang_pref: false,
            no_auto_seek_to_live: false,
            seek_to_live_offset: None,
        }
    }
}

impl StoreOptions {
    /// Load options from a JSON object. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Effective seek-to-live offset.
    pub fn seek_to_live_offset(&self) -> f64 {
        self.seek_to_live_offset.unwrap_or(self.live_edge_offset)
    }

    /// Only explicit live/on-demand defaults count; "unknown" means no default.
    pub fn usable_default_stream_type(&self) -> Option<StreamType> {
        match self.default_stream_type {
            Some(StreamType::Unknown) | None => None,
            other => other,
        }
    }

    /// Apply every field set in `patch`.
    pub fn apply(&mut self, patch: &OptionsPatch) {
        if let Some(v) = patch.default_subtitles {
            self.default_subtitles = v;
        }
        if let Some(v) = patch.default_stream_type {
            self.default_stream_type = v;
        }
        if let Some(v) = patch.default_duration {
            self.default_duration = v;
        }
        if let Some(v) = patch.live_edge_offset {
            self.live_edge_offset = v;
        }
        if let Some(v) = patch.no_volume_pref {
            self.no_volume_pref = v;
        }
        if let Some(v) = patch.no_subtitles_lang_pref {
            self.no_subtitles_lang_pref = v;
        }
        if let Some(v) = patch.no_auto_seek_to_live {
            self.no_auto_seek_to_live = v;
        }
        if let Some(v) = patch.seek_to_live_offset {
            self.seek_to_live_offset = v;
        }
    }
}

/// A partial options update. `None` leaves a field untouched; nullable fields
/// take `Some(None)` to clear.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionsPatch {
    pub default_subtitles: Option<bool>,
    pub default_stream_type: Option<Option<StreamType>>,
    pub default_duration: Option<Option<f64>>,
    pub live_edge_offset: Option<f64>,
    pub no_volume_pref: Option<bool>,
    pub no_subtitles_lang_pref: Option<bool>,
    pub no_auto_seek_to_live: Option<bool>,
    pub seek_to_live_offset: Option<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_fills_defaults() {
        let opts = StoreOptions::from_json(r#"{"liveEdgeOffset": 5, "noVolumePref": true}"#).unwrap();
        assert_eq!(opts.live_edge_offset, 5.0);
        assert!(opts.no_volume_pref);
        assert!(!opts.default_subtitles);
        assert_eq!(opts.seek_to_live_offset(), 5.0);
    }

    #[test]
    fn test_unknown_default_stream_type_is_ignored() {
        let opts = StoreOptions {
            default_stream_type: Some(StreamType::Unknown),
            ..Default::default()
        };
        assert_eq!(opts.usable_default_stream_type(), None);
    }

    #[test]
    fn test_apply_patch() {
        let mut opts = StoreOptions::default();
        opts.apply(&OptionsPatch {
            seek_to_live_offset: Some(Some(2.0)),
            default_stream_type: Some(Some(StreamType::Live)),
            ..Default::default()
        });
        assert_eq!(opts.seek_to_live_offset(), 2.0);
        assert_eq!(opts.default_stream_type, Some(StreamType::Live));
        assert_eq!(opts.live_edge_offset, DEFAULT_LIVE_EDGE_OFFSET);
    }
}
