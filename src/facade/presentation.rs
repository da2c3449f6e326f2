//! Fullscreen, picture-in-picture, casting and airplay.
//!
//! The three presentation modes are mutually exclusive: entering one exits
//! whichever of the other two is active first.

use super::expect_bool;
use crate::error::{OwnerError, Result};
use crate::owners::{ListenerId, MediaOwner, Owners};
use crate::platform::{Timer, TimerId};
use crate::types::{
    MediaEvent, PresentationMode, ReadyState, RemoteState, StateKey, StateValue,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// How long a not-ready picture-in-picture request waits for metadata.
pub const PIP_RETRY_TIMEOUT: Duration = Duration::from_millis(1000);

/// Event marking the media's transition out of `HAVE_NOTHING`.
pub const READY_EVENT: &str = "loadedmetadata";

pub fn is_fullscreen(owners: &Owners) -> bool {
    let Some(media) = &owners.media else {
        return false;
    };

    if media.displaying_fullscreen() == Some(true) {
        return in_native_fullscreen(media.as_ref());
    }

    let Some(root) = &owners.root else {
        return false;
    };
    let Some(current) = root.fullscreen_element() else {
        return false;
    };

    let target_id = owners
        .fullscreen_target
        .as_ref()
        .map(|t| t.node_id())
        .unwrap_or_else(|| media.node_id());
    if current.node_id() == target_id || current.node_id() == media.node_id() {
        return true;
    }

    if !current.is_custom_element() {
        return false;
    }

    // Walk nested encapsulation boundaries through their own accessors.
    let Some(mut boundary) = current.shadow_root() else {
        return current.contains_composed(target_id);
    };
    let mut inner = match boundary.fullscreen_element() {
        Some(inner) => inner,
        None => return current.contains_composed(target_id),
    };
    while let Some(element) = inner {
        if element.node_id() == target_id {
            return true;
        }
        let Some(next) = element.shadow_root() else {
            break;
        };
        boundary = next;
        inner = boundary.fullscreen_element().flatten();
    }
    false
}

/// The vendor element-level flag is also set in picture-in-picture, so it
/// only counts when the presentation mode agrees.
fn in_native_fullscreen(media: &dyn MediaOwner) -> bool {
    media.presentation_mode() == Some(PresentationMode::Fullscreen)
}

pub fn is_pip(owners: &Owners) -> bool {
    let Some(media) = &owners.media else {
        return false;
    };
    if let Some(mode) = media.presentation_mode() {
        return mode == PresentationMode::PictureInPicture;
    }
    owners
        .root
        .as_ref()
        .and_then(|r| r.picture_in_picture_element())
        .is_some_and(|id| id == media.node_id())
}

pub fn is_casting(owners: &Owners) -> bool {
    owners
        .remote()
        .is_some_and(|r| r.state() != RemoteState::Disconnected)
}

fn enter_fullscreen(owners: &Owners) {
    let platform_ok = owners.platform.capabilities.fullscreen;
    let root_ok = owners.root.as_ref().is_some_and(|r| r.fullscreen_enabled());

    let result = match (&owners.fullscreen_target, &owners.media) {
        (Some(target), _) if platform_ok && root_ok && target.supports_fullscreen() => {
            target.request_fullscreen()
        }
        (_, Some(media)) if owners.caps().native_fullscreen => media.enter_native_fullscreen(),
        _ => {
            tracing::warn!("fullscreen is not supported in this environment");
            return;
        }
    };
    if let Err(err) = result {
        tracing::warn!(%err, "fullscreen request failed");
    }
}

fn exit_fullscreen(owners: &Owners) {
    if let Some(root) = &owners.root {
        if root.fullscreen_element().is_some() {
            root.exit_fullscreen();
        }
    }
    if let Some(media) = &owners.media {
        if media.displaying_fullscreen() == Some(true) && in_native_fullscreen(media.as_ref()) {
            media.exit_native_fullscreen();
        }
    }
}

fn exit_others(owners: &Owners, entering: StateKey) {
    if entering != StateKey::IsFullscreen && is_fullscreen(owners) {
        exit_fullscreen(owners);
    }
    if entering != StateKey::IsPip && is_pip(owners) {
        exit_pip(owners);
    }
    if entering != StateKey::IsCasting && is_casting(owners) {
        prompt_remote(owners);
    }
}

pub(super) fn get_is_fullscreen(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    is_fullscreen(owners).into()
}

pub(super) fn set_is_fullscreen(value: &StateValue, owners: &Owners) -> Result<()> {
    let Some(enter) = expect_bool(StateKey::IsFullscreen, value) else {
        return Ok(());
    };
    if enter {
        exit_others(owners, StateKey::IsFullscreen);
        enter_fullscreen(owners);
    } else {
        exit_fullscreen(owners);
    }
    Ok(())
}

pub(super) fn get_is_pip(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    is_pip(owners).into()
}

fn exit_pip(owners: &Owners) {
    if let Some(root) = &owners.root {
        if root.picture_in_picture_element().is_some() {
            root.exit_picture_in_picture();
        }
    }
}

pub(super) fn set_is_pip(value: &StateValue, owners: &Owners) -> Result<()> {
    let Some(enter) = expect_bool(StateKey::IsPip, value) else {
        return Ok(());
    };
    let Some(media) = &owners.media else {
        return Ok(());
    };
    if !enter {
        exit_pip(owners);
        return Ok(());
    }

    let root_enabled = owners
        .root
        .as_ref()
        .map_or(true, |r| r.picture_in_picture_enabled());
    if !owners.platform.capabilities.picture_in_picture || !root_enabled {
        tracing::warn!("picture-in-picture is not enabled");
        return Ok(());
    }
    if !owners.caps().picture_in_picture {
        tracing::warn!("picture-in-picture may not be supported by this media");
        return Ok(());
    }

    exit_others(owners, StateKey::IsPip);

    match media.request_picture_in_picture() {
        Ok(()) => Ok(()),
        Err(OwnerError::NotReady) if !media.has_source() => {
            tracing::warn!("media is not ready for picture-in-picture: no source");
            Ok(())
        }
        Err(OwnerError::NotReady) if media.ready_state() == ReadyState::HAVE_NOTHING => {
            retry_pip_when_ready(media, &owners.platform.timer);
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

#[derive(Default)]
struct PendingRetry {
    listener: Option<ListenerId>,
    timer: Option<TimerId>,
    done: bool,
}

/// Clears whichever of the retry listener and timeout are still armed.
fn finish_retry(
    pending: &Mutex<PendingRetry>,
    media: &Weak<dyn MediaOwner>,
    timer: &Weak<dyn Timer>,
) {
    let (listener, timer_id) = {
        let mut p = pending.lock();
        p.done = true;
        (p.listener.take(), p.timer.take())
    };
    if let (Some(id), Some(media)) = (listener, media.upgrade()) {
        media.remove_event_listener(READY_EVENT, id);
    }
    if let (Some(id), Some(timer)) = (timer_id, timer.upgrade()) {
        timer.cancel(id);
    }
}

/// Retry once when metadata arrives; give up (with a warning) after the timeout.
fn retry_pip_when_ready(media: &Arc<dyn MediaOwner>, timer: &Arc<dyn Timer>) {
    tracing::debug!("media not ready for picture-in-picture, waiting for metadata");
    let pending = Arc::new(Mutex::new(PendingRetry::default()));
    let weak_media = Arc::downgrade(media);
    let weak_timer = Arc::downgrade(timer);

    let listener = {
        let pending = Arc::clone(&pending);
        let weak_media = weak_media.clone();
        let weak_timer = weak_timer.clone();
        Arc::new(move |_: &MediaEvent| {
            if pending.lock().done {
                return;
            }
            finish_retry(&pending, &weak_media, &weak_timer);
            if let Some(media) = weak_media.upgrade() {
                if let Err(err) = media.request_picture_in_picture() {
                    tracing::warn!(%err, "media is not ready for picture-in-picture");
                }
            }
        })
    };
    let listener_id = media.add_event_listener(READY_EVENT, listener);
    pending.lock().listener = Some(listener_id);

    let timeout = {
        let pending = Arc::clone(&pending);
        Box::new(move || {
            if pending.lock().done {
                return;
            }
            if let Some(media) = weak_media.upgrade() {
                if media.ready_state() == ReadyState::HAVE_NOTHING {
                    tracing::warn!(
                        "media is not ready for picture-in-picture: it must have metadata first"
                    );
                }
            }
            finish_retry(&pending, &weak_media, &weak_timer);
        })
    };
    let timer_id = timer.schedule(PIP_RETRY_TIMEOUT, timeout);

    let mut p = pending.lock();
    if p.done {
        drop(p);
        timer.cancel(timer_id);
    } else {
        p.timer = Some(timer_id);
    }
}

pub(super) fn get_is_casting(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    is_casting(owners).into()
}

fn prompt_remote(owners: &Owners) {
    let Some(remote) = owners.remote() else {
        tracing::warn!("remote playback is not supported by this media");
        return;
    };
    if let Err(err) = remote.prompt() {
        tracing::warn!(%err, "remote playback prompt failed");
    }
}

pub(super) fn set_is_casting(value: &StateValue, owners: &Owners) -> Result<()> {
    let Some(enter) = expect_bool(StateKey::IsCasting, value) else {
        return Ok(());
    };
    let Some(remote) = owners.remote() else {
        tracing::warn!("remote playback is not supported by this media");
        return Ok(());
    };
    let state = remote.state();
    if enter {
        if state != RemoteState::Disconnected {
            return Ok(());
        }
        exit_others(owners, StateKey::IsCasting);
    } else if state != RemoteState::Connected {
        return Ok(());
    }
    prompt_remote(owners);
    Ok(())
}

pub(super) fn get_is_airplaying(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    let airplaying = owners.caps().airplay
        && owners.media.as_ref().is_some_and(|m| m.is_airplaying());
    airplaying.into()
}

/// Any airplay request opens the playback target picker.
pub(super) fn set_is_airplaying(_value: &StateValue, owners: &Owners) -> Result<()> {
    let Some(media) = &owners.media else {
        return Ok(());
    };
    if !owners.platform.capabilities.airplay || !owners.caps().airplay {
        tracing::warn!("airplay is not supported in this environment");
        return Ok(());
    }
    media.show_playback_target_picker();
    Ok(())
}
