//! Subscription system for store notifications.
//!
//! This module provides the in-process event channel the store uses to
//! announce writes:
//! - Before-insert events, carrying the previous and incoming record
//! - After-insert events, carrying the stored record
//!
//! Channels support:
//! - Ordered, synchronous fan-out over a snapshot of the listener list
//! - Token-based unsubscribe through [`SubscriptionHandle`]
//! - Bounded buffered subscriptions with slow-subscriber dropping
//!
//! # Example
//!
//! ```
//! use roster::EventChannel;
//!
//! let channel = EventChannel::<String>::new();
//! let handle = channel.subscribe(|msg| println!("got {msg}"));
//!
//! channel.publish(&"hello".to_string());
//! handle.unsubscribe();
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, Listener};
pub use types::{
    AfterInsert, BeforeInsert, BufferedSubscription, DropReason, ListenerId, SubscriptionHandle,
};
