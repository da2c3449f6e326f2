//! # Media Store
//!
//! A reactive store that mirrors the state of a media element (and the
//! document around it) into immutable snapshots, and turns state-change
//! requests into owner side effects.
//!
//! ## Core Concepts
//!
//! - **Owners**: The external objects the store observes: the media, its
//!   sub-collections, the document root and the fullscreen container
//! - **Facade**: One descriptor per state key saying how to read, write and
//!   monitor it
//! - **Requests**: State-change intents handled by writing through the facade
//! - **Snapshots**: Immutable state values published to subscribers on change
//!
//! ## Example
//!
//! ```ignore
//! use media_store::{MediaStore, Request, StoreConfig};
//!
//! let store = MediaStore::new(StoreConfig {
//!     media: Some(media),
//!     ..Default::default()
//! });
//!
//! let unsubscribe = store.subscribe(|state| {
//!     println!("paused: {}", state.paused());
//! });
//!
//! store.dispatch(Request::Play)?;
//! store.dispatch(Request::Volume(0.5))?;
//!
//! unsubscribe.unsubscribe();
//! ```

pub mod error;
pub mod facade;
pub mod options;
pub mod owners;
pub mod platform;
pub mod requests;
pub mod snapshot;
pub mod store;
pub mod subscriptions;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
mod wiring;

// Re-exports
pub use error::{OwnerError, Result, StoreError};
pub use facade::{FacadeEntry, HookHandler, HookSignal, TrackSelector};
pub use options::{OptionsPatch, StoreOptions};
pub use owners::{
    AudioTrackList, ElementNode, EventTarget, FullscreenElement, MediaOwner, Owners,
    RemotePlayback, RenditionList, RootContext, TextTrack, TextTrackList,
};
pub use platform::{
    JsonFilePreferences, MemoryPreferences, Platform, PlatformCapabilities, PreferenceStorage,
    ThreadTimer, Timer,
};
pub use requests::{Request, RequestKind};
pub use snapshot::{MediaState, StatePatch};
pub use store::{Action, MediaStore, StoreConfig};
pub use subscriptions::{StateReceiver, SubscriptionId, Unsubscribe};
pub use types::*;
