//! Subscription types for store notifications.

use std::fmt;
use std::sync::{Arc, Weak};

/// Fired immediately before a record is written to the store.
#[derive(Debug)]
pub struct BeforeInsert<T> {
    /// What was stored under the normalized key before this write, if anything.
    pub previous: Option<Arc<T>>,
    /// The record about to be stored.
    pub incoming: Arc<T>,
}

/// Fired immediately after a record is written to the store.
#[derive(Debug)]
pub struct AfterInsert<T> {
    /// The record now stored under the key.
    pub value: Arc<T>,
}

// Manual impls: cloning an event clones the `Arc`s, so `T` needn't be `Clone`.
impl<T> Clone for BeforeInsert<T> {
    fn clone(&self) -> Self {
        Self {
            previous: self.previous.clone(),
            incoming: Arc::clone(&self.incoming),
        }
    }
}

impl<T> Clone for AfterInsert<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

/// Why a buffered subscription was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Receiver was dropped.
    Disconnected,
}

/// Unique identifier for a listener within a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something a listener can be detached from.
///
/// Lets a handle remove its listener without knowing the channel's event type.
pub(crate) trait Detach: Send + Sync {
    fn detach(&self, id: ListenerId) -> bool;
}

/// Handle returned by every subscribe call.
///
/// Dropping the handle leaves the listener registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
pub struct SubscriptionHandle {
    pub id: ListenerId,
    channel: Weak<dyn Detach>,
}

impl SubscriptionHandle {
    pub(crate) fn new(id: ListenerId, channel: Weak<dyn Detach>) -> Self {
        Self { id, channel }
    }

    /// Remove this listener from its channel.
    ///
    /// Returns `true` if the listener was still registered. Calling it again,
    /// or after the channel is gone, does nothing and returns `false`.
    pub fn unsubscribe(&self) -> bool {
        match self.channel.upgrade() {
            Some(channel) => channel.detach(self.id),
            None => false,
        }
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .finish()
    }
}

/// A subscription that queues events instead of running a callback.
pub struct BufferedSubscription<E> {
    pub handle: SubscriptionHandle,
    /// Channel to receive events. Disconnects once the subscription is dropped.
    pub receiver: crossbeam_channel::Receiver<E>,
}

impl<E> BufferedSubscription<E> {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<E, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<E, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<E> {
        self.receiver.try_iter().collect()
    }

    pub fn unsubscribe(&self) -> bool {
        self.handle.unsubscribe()
    }
}
