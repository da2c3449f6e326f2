//! Capability probe table, computed once per owner change.

use super::traits::{AudioTrackList, MediaOwner, RemotePlayback, RenditionList, TextTrackList};
use std::sync::Arc;

/// What the current media owner can do.
///
/// Probed when owners are replaced so getters never re-sniff owner shape.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub text_tracks: Option<Arc<dyn TextTrackList>>,
    pub video_renditions: Option<Arc<dyn RenditionList>>,
    pub audio_tracks: Option<Arc<dyn AudioTrackList>>,
    pub remote: Option<Arc<dyn RemotePlayback>>,
    pub volume: bool,
    pub native_fullscreen: bool,
    pub picture_in_picture: bool,
    pub airplay: bool,
}

impl Capabilities {
    pub fn probe(media: Option<&Arc<dyn MediaOwner>>) -> Self {
        let Some(media) = media else {
            return Self::default();
        };
        Self {
            text_tracks: media.text_tracks(),
            video_renditions: media.video_renditions(),
            audio_tracks: media.audio_tracks(),
            remote: media.remote(),
            volume: media.volume().is_some(),
            native_fullscreen: media.supports_native_fullscreen(),
            picture_in_picture: media.supports_picture_in_picture(),
            airplay: media.supports_airplay(),
        }
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("text_tracks", &self.text_tracks.is_some())
            .field("video_renditions", &self.video_renditions.is_some())
            .field("audio_tracks", &self.audio_tracks.is_some())
            .field("remote", &self.remote.is_some())
            .field("volume", &self.volume)
            .field("native_fullscreen", &self.native_fullscreen)
            .field("picture_in_picture", &self.picture_in_picture)
            .field("airplay", &self.airplay)
            .finish()
    }
}
