//! Stream type and live-edge derivation.

use crate::owners::Owners;
use crate::types::{MediaEvent, StateValue, StreamType};

/// Explicit owner value (unless "unknown"), else derived from duration, else the default.
pub fn stream_type(owners: &Owners) -> Option<StreamType> {
    let default = owners.options().usable_default_stream_type();
    let Some(media) = &owners.media else {
        return default;
    };

    match media.stream_type() {
        Some(StreamType::Unknown) | None => {}
        explicit => return explicit,
    }

    let duration = media.duration();
    if duration == f64::INFINITY {
        Some(StreamType::Live)
    } else if duration.is_finite() {
        Some(StreamType::OnDemand)
    } else {
        default
    }
}

/// Target live window; live streams that don't report one have none (0).
pub fn target_live_window(owners: &Owners) -> f64 {
    let Some(media) = &owners.media else {
        return f64::NAN;
    };
    match media.target_live_window() {
        Some(window) if !window.is_nan() => window,
        _ if stream_type(owners) == Some(StreamType::Live) => 0.0,
        _ => f64::NAN,
    }
}

/// Upper bound of the last seekable range.
pub fn seekable_end(owners: &Owners) -> Option<f64> {
    let ranges = owners.media.as_ref()?.seekable()?;
    ranges.last().map(|r| r.end).filter(|end| end.is_finite())
}

pub fn time_is_live(owners: &Owners) -> bool {
    let Some(media) = &owners.media else {
        return false;
    };

    if let Some(live_edge_start) = media.live_edge_start() {
        if live_edge_start.is_nan() {
            return false;
        }
        return media.current_time() >= live_edge_start;
    }

    if stream_type(owners) != Some(StreamType::Live) {
        return false;
    }

    // No seekable range object at all: assume we're live.
    let Some(seekable) = media.seekable() else {
        return true;
    };
    let Some(last) = seekable.last() else {
        return false;
    };
    let live_edge_start = last.end - owners.options().live_edge_offset;
    media.current_time() >= live_edge_start
}

pub(super) fn get_stream_type(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    stream_type(owners)
        .map(StateValue::StreamType)
        .unwrap_or(StateValue::Unset)
}

pub(super) fn get_target_live_window(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    target_live_window(owners).into()
}

pub(super) fn get_time_is_live(owners: &Owners, _: Option<&MediaEvent>) -> StateValue {
    time_is_live(owners).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::StoreOptions;
    use crate::owners::{MediaOwner, OwnersDelta, SharedOptions};
    use crate::platform::Platform;
    use crate::testing::FakeMedia;
    use crate::types::TimeRange;
    use std::sync::Arc;

    fn owners_for(media: &Arc<FakeMedia>, options: StoreOptions) -> Owners {
        let media: Arc<dyn MediaOwner> = media.clone();
        Owners::empty(SharedOptions::new(options), Arc::new(Platform::new()))
            .apply(&OwnersDelta::media(Some(media)))
    }

    #[test]
    fn test_explicit_stream_type_beats_duration() {
        let media = FakeMedia::builder()
            .duration(30.0)
            .stream_type(StreamType::Live)
            .build();
        let owners = owners_for(&media, StoreOptions::default());
        assert_eq!(stream_type(&owners), Some(StreamType::Live));

        let media = FakeMedia::builder()
            .duration(30.0)
            .stream_type(StreamType::Unknown)
            .build();
        let owners = owners_for(&media, StoreOptions::default());
        assert_eq!(stream_type(&owners), Some(StreamType::OnDemand));
    }

    #[test]
    fn test_reported_live_edge_start() {
        let media = FakeMedia::builder()
            .duration(30.0)
            .current_time(20.0)
            .live_edge_start(25.0)
            .build();
        let owners = owners_for(&media, StoreOptions::default());
        // Takes precedence even on an on-demand stream.
        assert!(!time_is_live(&owners));

        media.set_current_time(25.0);
        assert!(time_is_live(&owners));

        let media = FakeMedia::builder()
            .duration(f64::INFINITY)
            .live_edge_start(f64::NAN)
            .build();
        assert!(!time_is_live(&owners_for(&media, StoreOptions::default())));
    }

    #[test]
    fn test_live_without_seekable_ranges() {
        let media = FakeMedia::builder()
            .duration(f64::INFINITY)
            .seekable(None)
            .build();
        assert!(time_is_live(&owners_for(&media, StoreOptions::default())));

        let media = FakeMedia::builder()
            .duration(f64::INFINITY)
            .seekable(Some(Vec::new()))
            .build();
        assert!(!time_is_live(&owners_for(&media, StoreOptions::default())));
    }

    #[test]
    fn test_live_edge_offset_window() {
        let media = FakeMedia::builder()
            .duration(f64::INFINITY)
            .current_time(93.0)
            .seekable(Some(vec![TimeRange::new(0.0, 100.0)]))
            .build();
        // Default window is 10s behind the seekable end.
        assert!(time_is_live(&owners_for(&media, StoreOptions::default())));

        let narrow = StoreOptions {
            live_edge_offset: 5.0,
            ..Default::default()
        };
        let owners = owners_for(&media, narrow);
        assert!(!time_is_live(&owners));

        media.set_current_time(95.0);
        assert!(time_is_live(&owners));
    }
}
