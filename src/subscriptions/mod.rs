//! Subscription system for snapshot updates.
//!
//! Two kinds of subscribers:
//! - callbacks, invoked synchronously with every published snapshot
//! - bounded channels, dropped when their buffer overflows
//!
//! # Example
//!
//! ```ignore
//! let manager = SubscriptionManager::new();
//!
//! let id = manager.add_callback(Arc::new(|state: &MediaState| {
//!     println!("paused: {}", state.paused());
//! }));
//! let receiver = manager.add_channel(16);
//!
//! manager.broadcast(&state);
//! let latest = receiver.latest();
//! manager.remove(id);
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{StateReceiver, Subscriber, SubscriptionId, Unsubscribe};
