//! # Roster
//!
//! An in-process keyed record store with lifecycle notifications.
//!
//! ## Core Concepts
//!
//! - **Records**: any type with an identifier, keyed case-insensitively
//! - **Notifications**: before/after events on every write, delivered
//!   synchronously in subscription order
//! - **Queries**: lookup by id, full traversal, best-match by score
//! - **Loading**: bulk insert from a JSON array
//!
//! ## Example
//!
//! ```
//! use roster::{Pokemon, Store};
//!
//! let store: Store<Pokemon> = Store::new();
//! let handle = store.on_after_add(|event| println!("stored {}", event.value.id));
//!
//! store
//!     .set(Pokemon::new("Bulbasaur", 50, 20))
//!     .set(Pokemon::new("Charmander", 40, 30));
//! handle.unsubscribe();
//!
//! let best = store.select_best(|p| p.attack).unwrap();
//! assert_eq!(best.id, "Bulbasaur");
//! assert!(store.get("charmander").is_some());
//! ```

pub mod error;
pub mod loader;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use error::{Result, StoreError};
pub use loader::{load_json_file, load_json_reader, load_json_reader_with};
pub use store::{IdPolicy, Store, StoreConfig};
pub use subscriptions::{
    AfterInsert, BeforeInsert, BufferedSubscription, DropReason, EventChannel, Listener,
    ListenerId, SubscriptionHandle,
};
pub use types::*;
