//! Tri-state availability flags.
//!
//! `Unset` means available. `Unsupported` is permanent for the current owners;
//! `Unavailable` may clear on its own (more tracks arrive, a cast target shows up).

use super::{HookHandler, HookSignal, Teardown};
use crate::error::OwnerError;
use crate::owners::Owners;
use crate::types::{Availability, EventDetail, MediaEvent, StateValue, TargetAvailability};
use std::sync::Arc;

/// Event emitted when a watched playback target comes or goes.
pub const AVAILABILITY_EVENT: &str = "availabilitychange";

fn flag(availability: Availability) -> StateValue {
    StateValue::Availability(availability)
}

/// Availability carried by a watcher event. Bootstrap evaluation assumes
/// no target until a watcher says otherwise.
fn target_availability(event: Option<&MediaEvent>) -> TargetAvailability {
    match event.map(|e| &e.detail) {
        Some(EventDetail::Availability(availability)) => *availability,
        _ => TargetAvailability::NotAvailable,
    }
}

pub(super) fn get_fullscreen_unavailable(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    let native = owners.caps().native_fullscreen;
    if !owners.platform.capabilities.fullscreen && !native {
        return flag(Availability::Unsupported);
    }
    let root_enabled = owners.root.as_ref().map_or(true, |r| r.fullscreen_enabled());
    if !root_enabled && !native {
        return flag(Availability::Unavailable);
    }
    StateValue::Unset
}

pub(super) fn get_pip_unavailable(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    if !owners.platform.capabilities.picture_in_picture || !owners.caps().picture_in_picture {
        return flag(Availability::Unsupported);
    }
    let root_enabled = owners
        .root
        .as_ref()
        .map_or(true, |r| r.picture_in_picture_enabled());
    if !root_enabled {
        return flag(Availability::Unavailable);
    }
    StateValue::Unset
}

pub(super) fn get_cast_unavailable(owners: &Owners, event: Option<&MediaEvent>) -> StateValue {
    if !owners.platform.capabilities.cast || owners.remote().is_none() {
        return flag(Availability::Unsupported);
    }
    match target_availability(event) {
        // The watcher couldn't tell; don't block the control.
        TargetAvailability::Available | TargetAvailability::Unknown => StateValue::Unset,
        TargetAvailability::NotAvailable => flag(Availability::Unavailable),
    }
}

/// Watch remote playback targets and feed availability changes back as events.
pub(super) fn watch_cast_availability(handler: HookHandler, owners: &Owners) -> Option<Teardown> {
    if !owners.platform.capabilities.cast {
        return None;
    }
    let remote = Arc::clone(owners.remote()?);

    let signal = |availability| {
        HookSignal::Event(
            MediaEvent::new(AVAILABILITY_EVENT).with_detail(EventDetail::Availability(availability)),
        )
    };

    let watcher = Arc::clone(&handler);
    let watched = remote.watch_availability(Arc::new(move |available| {
        let availability = if available {
            TargetAvailability::Available
        } else {
            TargetAvailability::NotAvailable
        };
        watcher(signal(availability));
    }));

    match watched {
        Ok(id) => Some(Box::new(move || remote.cancel_watch_availability(id))),
        Err(OwnerError::NotSupported(reason)) => {
            tracing::debug!(%reason, "remote playback availability cannot be watched");
            handler(signal(TargetAvailability::Unknown));
            None
        }
        Err(err) => {
            tracing::debug!(%err, "remote playback availability watch failed");
            handler(signal(TargetAvailability::NotAvailable));
            None
        }
    }
}

pub(super) fn get_airplay_unavailable(owners: &Owners, event: Option<&MediaEvent>) -> StateValue {
    if !owners.platform.capabilities.airplay || !owners.caps().airplay {
        return flag(Availability::Unsupported);
    }
    match target_availability(event) {
        TargetAvailability::Available => StateValue::Unset,
        _ => flag(Availability::Unavailable),
    }
}

pub(super) fn get_rendition_unavailable(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    match owners.video_renditions() {
        None => flag(Availability::Unsupported),
        Some(list) if list.renditions().is_empty() => flag(Availability::Unavailable),
        Some(_) => StateValue::Unset,
    }
}

/// Switching needs at least two tracks.
pub(super) fn get_audio_track_unavailable(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    match owners.audio_tracks() {
        None => flag(Availability::Unsupported),
        Some(list) if list.tracks().len() <= 1 => flag(Availability::Unavailable),
        Some(_) => StateValue::Unset,
    }
}
