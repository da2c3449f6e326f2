//! Playback primitives: paused, time, duration, rate, ranges, errors.

use super::{expect_bool, expect_number, live};
use crate::error::Result;
use crate::owners::Owners;
use crate::types::{MediaEvent, ReadyState, StateKey, StateValue, StreamType, TimeRange};

pub(super) fn get_video_width(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    let width = owners.media.as_ref().map(|m| m.video_size().0).unwrap_or(0);
    StateValue::Number(width as f64)
}

pub(super) fn get_video_height(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    let height = owners.media.as_ref().map(|m| m.video_size().1).unwrap_or(0);
    StateValue::Number(height as f64)
}

pub(super) fn get_paused(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    owners.media.as_ref().map(|m| m.paused()).unwrap_or(true).into()
}

/// Playing a live stream without a DVR window jumps to the live edge first.
pub(super) fn set_paused(value: &StateValue, owners: &Owners) -> Result<()> {
    let Some(paused) = expect_bool(StateKey::Paused, value) else {
        return Ok(());
    };
    let Some(media) = &owners.media else {
        return Ok(());
    };

    if paused {
        media.pause();
        return Ok(());
    }

    let options = owners.options();
    let is_dvr = live::target_live_window(owners) > 0.0;
    if !options.no_auto_seek_to_live
        && live::stream_type(owners) == Some(StreamType::Live)
        && !is_dvr
    {
        if let Some(end) = live::seekable_end(owners) {
            let target = end - options.seek_to_live_offset();
            tracing::debug!(target, "seeking to live edge before play");
            media.set_current_time(target);
        }
    }

    if let Err(err) = media.play() {
        tracing::warn!(%err, "media rejected play");
    }
    Ok(())
}

/// True only on an actual `playing` event; bootstrap evaluation uses `!paused`.
pub(super) fn get_has_played(owners: &Owners, event: Option<&MediaEvent>) -> StateValue {
    let Some(media) = &owners.media else {
        return false.into();
    };
    match event {
        None => (!media.paused()).into(),
        Some(event) => event.is("playing").into(),
    }
}

pub(super) fn get_ended(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    owners.media.as_ref().map(|m| m.ended()).unwrap_or(false).into()
}

pub(super) fn get_playback_rate(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    owners.media.as_ref().map(|m| m.playback_rate()).unwrap_or(1.0).into()
}

pub(super) fn set_playback_rate(value: &StateValue, owners: &Owners) -> Result<()> {
    let (Some(rate), Some(media)) = (expect_number(StateKey::PlaybackRate, value), &owners.media)
    else {
        return Ok(());
    };
    if rate.is_finite() {
        media.set_playback_rate(rate);
    }
    Ok(())
}

pub(super) fn get_current_time(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    owners.media.as_ref().map(|m| m.current_time()).unwrap_or(0.0).into()
}

pub(super) fn set_current_time(value: &StateValue, owners: &Owners) -> Result<()> {
    let (Some(time), Some(media)) = (expect_number(StateKey::CurrentTime, value), &owners.media)
    else {
        return Ok(());
    };
    if time.is_finite() {
        media.set_current_time(time);
    }
    Ok(())
}

pub(super) fn get_duration(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    let duration = owners.media.as_ref().map(|m| m.duration());
    let usable = duration.filter(|d| d.is_finite() && *d != 0.0);

    if usable.is_none() {
        if let Some(default) = owners.options().default_duration {
            return default.into();
        }
    }
    match duration {
        Some(d) if d.is_finite() => d.into(),
        _ => f64::NAN.into(),
    }
}

pub(super) fn get_loading(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    owners
        .media
        .as_ref()
        .map(|m| m.ready_state() < ReadyState::HAVE_FUTURE_DATA)
        .unwrap_or(true)
        .into()
}

fn round3(n: f64) -> f64 {
    (n * 1000.0).round() / 1000.0
}

/// `[start, end]` spanning all seekable ranges, or unset if nothing is seekable.
pub(super) fn get_seekable(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    let ranges = owners
        .media
        .as_ref()
        .and_then(|m| m.seekable())
        .unwrap_or_default();
    let (Some(first), Some(last)) = (ranges.first(), ranges.last()) else {
        return StateValue::Unset;
    };
    if first.start == 0.0 && last.end == 0.0 {
        return StateValue::Unset;
    }
    StateValue::Ranges(vec![TimeRange::new(round3(first.start), round3(last.end))])
}

pub(super) fn get_buffered(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    StateValue::Ranges(owners.media.as_ref().map(|m| m.buffered()).unwrap_or_default())
}

pub(super) fn get_error_code(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    owners
        .media
        .as_ref()
        .and_then(|m| m.error())
        .map(|e| e.code as f64)
        .into()
}

pub(super) fn get_error_message(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    owners
        .media
        .as_ref()
        .and_then(|m| m.error())
        .map(|e| e.message)
        .into()
}
