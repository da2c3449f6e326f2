//! Scrub-preview resolution: thumbnail image, crop coordinates and chapter
//! title for a hovered time.
//!
//! These values can't be read back from any owner, so the preview request
//! returns them as a partial snapshot.

use crate::facade::{chapters_track, thumbnails_track};
use crate::owners::Owners;
use crate::snapshot::StatePatch;
use crate::types::{Cue, StateKey, StateValue};
use url::Url;

/// Media-fragment key carrying sprite crop coordinates.
const XYWH: &str = "xywh=";

/// Thumbnail cue for `time`.
///
/// The first cue also covers anything before it and the last cue anything
/// after it; in between the interval is `start <= time < end`.
pub fn thumbnail_cue_at(cues: &[Cue], time: f64) -> Option<&Cue> {
    let last = cues.len().checked_sub(1)?;
    cues.iter().enumerate().find_map(|(i, cue)| {
        let matched = (i == 0 && time < cue.end)
            || (i == last && cue.start <= time)
            || (cue.start <= time && time < cue.end);
        matched.then_some(cue)
    })
}

/// Chapter cue for `time`. The last chapter's end only counts when it is the
/// end of the media.
pub fn chapter_cue_at(cues: &[Cue], time: f64, duration: f64) -> Option<&Cue> {
    let last = cues.len().checked_sub(1)?;
    cues.iter().enumerate().find_map(|(i, cue)| {
        let closes_media = i == last && cue.end == duration;
        let matched = cue.start <= time && (time < cue.end || (closes_media && time <= cue.end));
        matched.then_some(cue)
    })
}

/// Resolve a cue payload against the track source, splitting off `#xywh=`.
///
/// Returns the fragment-free image reference and the crop rectangle, if any.
pub fn resolve_thumbnail(text: &str, base: Option<&str>) -> (String, Option<Vec<f64>>) {
    let (image, fragment) = match text.split_once('#') {
        Some((image, fragment)) => (image, Some(fragment)),
        None => (text, None),
    };

    let coords = fragment
        .and_then(|f| f.split('&').find_map(|part| part.strip_prefix(XYWH)))
        .and_then(|xywh| {
            let parsed: Option<Vec<f64>> = xywh.split(',').map(|n| n.trim().parse().ok()).collect();
            parsed.filter(|c| c.len() == 4)
        });

    let resolved = match Url::parse(image) {
        Ok(absolute) => absolute.to_string(),
        Err(_) => match base.map(Url::parse) {
            Some(Ok(base)) => match base.join(image) {
                Ok(joined) => joined.to_string(),
                Err(err) => {
                    tracing::warn!(%err, image, "cannot resolve thumbnail against track source");
                    image.to_string()
                }
            },
            Some(Err(err)) => {
                tracing::debug!(%err, "thumbnail track source is not an absolute URL");
                image.to_string()
            }
            None => image.to_string(),
        },
    };

    (resolved, coords)
}

/// Preview keys for a requested time. `None` clears them all.
pub fn resolve(owners: &Owners, time: Option<f64>) -> StatePatch {
    let Some(time) = time.filter(|t| !t.is_nan()) else {
        return [
            StateKey::PreviewTime,
            StateKey::PreviewImage,
            StateKey::PreviewCoords,
            StateKey::PreviewChapter,
        ]
        .into_iter()
        .map(|k| (k, StateValue::Unset))
        .collect();
    };

    let mut patch = StatePatch::new().with(StateKey::PreviewTime, time);

    let thumbnail = thumbnails_track(owners).and_then(|track| {
        let cues = track.cues();
        let cue = thumbnail_cue_at(&cues, time)?;
        Some(resolve_thumbnail(&cue.text, track.src().as_deref()))
    });
    match thumbnail {
        Some((image, coords)) => {
            patch.insert(StateKey::PreviewImage, image);
            patch.insert(
                StateKey::PreviewCoords,
                coords.map(StateValue::Coords).unwrap_or_default(),
            );
        }
        None => {
            patch.insert(StateKey::PreviewImage, StateValue::Unset);
            patch.insert(StateKey::PreviewCoords, StateValue::Unset);
        }
    }

    // An explicit request with no matching chapter still yields "", which
    // differs from unset (no request pending).
    let duration = owners.media.as_ref().map_or(f64::NAN, |m| m.duration());
    let chapter = chapters_track(owners)
        .and_then(|track| chapter_cue_at(&track.cues(), time, duration).map(|c| c.text.clone()))
        .unwrap_or_default();
    patch.insert(StateKey::PreviewChapter, chapter);

    patch
}
