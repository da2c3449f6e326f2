//! Volume, mute, and the volume preference.

use super::{expect_bool, HookHandler, HookSignal, Teardown};
use crate::error::Result;
use crate::owners::Owners;
use crate::platform::VOLUME_PREF_KEY;
use crate::types::{Availability, MediaEvent, StateKey, StateValue, VolumeLevel};

/// Volume written before unmuting a media whose volume is 0.
pub const UNMUTE_FALLBACK_VOLUME: f64 = 0.25;

pub(super) fn get_muted(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    owners.media.as_ref().map(|m| m.muted()).unwrap_or(false).into()
}

/// Unmuting at volume 0 first raises the volume so the change is audible.
pub(super) fn set_muted(value: &StateValue, owners: &Owners) -> Result<()> {
    let Some(muted) = expect_bool(StateKey::Muted, value) else {
        return Ok(());
    };
    let Some(media) = &owners.media else {
        return Ok(());
    };

    if !muted && media.volume() == Some(0.0) {
        set_volume(&StateValue::Number(UNMUTE_FALLBACK_VOLUME), owners)?;
    }
    media.set_muted(muted);
    Ok(())
}

pub(super) fn get_volume(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    owners
        .media
        .as_ref()
        .and_then(|m| m.volume())
        .unwrap_or(1.0)
        .into()
}

/// A non-zero volume unmutes. Unset clears the stored preference.
pub(super) fn set_volume(value: &StateValue, owners: &Owners) -> Result<()> {
    let volume = match value {
        StateValue::Number(n) => Some(*n),
        StateValue::Unset => None,
        other => {
            tracing::warn!(key = %StateKey::Volume, got = other.kind(), "ignoring volume of wrong type");
            return Ok(());
        }
    };
    let Some(media) = &owners.media else {
        return Ok(());
    };

    if !owners.options().no_volume_pref {
        persist_volume(owners, volume);
    }

    let Some(volume) = volume.filter(|v| v.is_finite()) else {
        return Ok(());
    };
    let volume = volume.clamp(0.0, 1.0);
    if volume != 0.0 && media.muted() {
        media.set_muted(false);
    }
    media.set_volume(volume);
    Ok(())
}

fn persist_volume(owners: &Owners, volume: Option<f64>) {
    let Some(prefs) = &owners.platform.preferences else {
        return;
    };
    let result = match volume {
        Some(v) => prefs.set(VOLUME_PREF_KEY, &v.to_string()),
        None => prefs.remove(VOLUME_PREF_KEY),
    };
    if let Err(err) = result {
        tracing::warn!(%err, "failed to persist volume preference");
    }
}

/// Restore the persisted volume onto freshly wired media.
pub(super) fn restore_volume_pref(handler: HookHandler, owners: &Owners) -> Option<Teardown> {
    if owners.options().no_volume_pref {
        return None;
    }
    let media = owners.media.as_ref()?;
    let prefs = owners.platform.preferences.as_ref()?;

    let stored = match prefs.get(VOLUME_PREF_KEY) {
        Ok(stored) => stored?,
        Err(err) => {
            tracing::warn!(%err, "failed to read volume preference");
            return None;
        }
    };
    let volume = stored.parse::<f64>().ok().filter(|v| v.is_finite())?;
    let volume = volume.clamp(0.0, 1.0);
    tracing::debug!(volume, "restoring volume preference");
    media.set_volume(volume);
    handler(HookSignal::Value(volume.into()));
    None
}

pub(super) fn get_volume_level(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    let level = match &owners.media {
        Some(media) => match media.volume() {
            Some(volume) => VolumeLevel::bucket(volume, media.muted()),
            None => VolumeLevel::High,
        },
        None => VolumeLevel::High,
    };
    StateValue::VolumeLevel(level)
}

pub(super) fn get_volume_unavailable(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    if owners.platform.volume_supported() == Some(false) || !owners.caps().volume {
        return StateValue::Availability(Availability::Unsupported);
    }
    StateValue::Unset
}

/// Kick off the lazy platform probe; recompute once it resolves.
pub(super) fn watch_volume_support(handler: HookHandler, owners: &Owners) -> Option<Teardown> {
    if owners.platform.volume_supported().is_some() {
        return None;
    }
    owners
        .platform
        .resolve_volume_support(Box::new(move |_| handler(HookSignal::Recompute)));
    None
}
