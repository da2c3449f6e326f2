//! Platform capabilities injected at store construction.
//!
//! Everything environment-specific lives here instead of in module-level
//! globals, so two stores never share cached probes and tests stay hermetic:
//! - static feature support (fullscreen, picture-in-picture, cast, airplay)
//! - a lazily resolved volume-support probe, resolved at most once per store
//! - preference storage for the two persisted preferences
//! - a timer for the picture-in-picture retry timeout
//! - the user's preferred languages

mod prefs;
mod timer;

pub use prefs::{
    JsonFilePreferences, MemoryPreferences, PreferenceStorage, SUBTITLES_LANG_PREF_KEY,
    VOLUME_PREF_KEY,
};
pub use timer::{ThreadTimer, Timer, TimerId};

use parking_lot::Mutex;
use std::sync::Arc;

/// Static environment feature support.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlatformCapabilities {
    pub fullscreen: bool,
    pub picture_in_picture: bool,
    pub cast: bool,
    pub airplay: bool,
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self {
            fullscreen: true,
            picture_in_picture: true,
            cast: false,
            airplay: false,
        }
    }
}

/// Callback receiving the result of a volume-support probe.
pub type VolumeProbeDone = Box<dyn FnOnce(bool) + Send>;

/// Detects whether volume can be changed at all (some platforms ignore writes).
pub trait VolumeProbe: Send + Sync {
    fn probe(&self, done: VolumeProbeDone);
}

enum VolumeSupport {
    Unresolved,
    Pending(Vec<VolumeProbeDone>),
    Resolved(bool),
}

/// Injected environment for one store.
pub struct Platform {
    pub capabilities: PlatformCapabilities,
    pub preferences: Option<Arc<dyn PreferenceStorage>>,
    pub timer: Arc<dyn Timer>,
    /// Preferred languages, most preferred first (BCP-47 tags).
    pub languages: Vec<String>,
    volume_probe: Option<Arc<dyn VolumeProbe>>,
    volume: Mutex<VolumeSupport>,
}

impl Platform {
    /// Default platform: no preferences, thread-backed timer, volume assumed supported.
    pub fn new() -> Self {
        Self {
            capabilities: PlatformCapabilities::default(),
            preferences: None,
            timer: Arc::new(ThreadTimer::new()),
            languages: Vec::new(),
            volume_probe: None,
            volume: Mutex::new(VolumeSupport::Resolved(true)),
        }
    }

    pub fn with_capabilities(mut self, capabilities: PlatformCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_preferences(mut self, preferences: Arc<dyn PreferenceStorage>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }

    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }

    /// Resolve volume support lazily through `probe` instead of assuming it.
    pub fn with_volume_probe(mut self, probe: Arc<dyn VolumeProbe>) -> Self {
        self.volume_probe = Some(probe);
        self.volume = Mutex::new(VolumeSupport::Unresolved);
        self
    }

    /// Volume support if already known.
    pub fn volume_supported(&self) -> Option<bool> {
        match &*self.volume.lock() {
            VolumeSupport::Resolved(supported) => Some(*supported),
            _ => None,
        }
    }

    /// Call `done` once volume support is known, starting the probe if needed.
    ///
    /// The probe runs at most once per platform value.
    pub fn resolve_volume_support(self: &Arc<Self>, done: VolumeProbeDone) {
        let resolved = {
            let mut volume = self.volume.lock();
            match &mut *volume {
                VolumeSupport::Resolved(supported) => Some((*supported, done)),
                VolumeSupport::Pending(waiters) => {
                    waiters.push(done);
                    return;
                }
                VolumeSupport::Unresolved => {
                    *volume = VolumeSupport::Pending(vec![done]);
                    None
                }
            }
        };

        if let Some((supported, done)) = resolved {
            done(supported);
            return;
        }

        let Some(probe) = self.volume_probe.clone() else {
            self.finish_volume_probe(true);
            return;
        };

        let platform = Arc::downgrade(self);
        probe.probe(Box::new(move |supported| {
            if let Some(platform) = platform.upgrade() {
                platform.finish_volume_probe(supported);
            }
        }));
    }

    fn finish_volume_probe(&self, supported: bool) {
        let waiters = {
            let mut volume = self.volume.lock();
            match std::mem::replace(&mut *volume, VolumeSupport::Resolved(supported)) {
                VolumeSupport::Pending(waiters) => waiters,
                _ => Vec::new(),
            }
        };
        tracing::debug!(supported, "volume support resolved");
        for waiter in waiters {
            waiter(supported);
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::new()
    }
}
