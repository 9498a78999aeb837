//! Synchronous event channel with ordered fan-out.

use crossbeam_channel::{bounded, TrySendError};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{trace, warn};

use super::types::{BufferedSubscription, Detach, DropReason, ListenerId, SubscriptionHandle};

/// Callback invoked on publish.
pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Listener list shared between a channel and its handles.
struct Listeners<E> {
    /// Registered listeners, in subscription order.
    entries: RwLock<Vec<(ListenerId, Listener<E>)>>,
    /// Counter for generating listener IDs.
    next_id: AtomicU64,
}

impl<E> Listeners<E> {
    fn allocate_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn insert(&self, id: ListenerId, listener: Listener<E>) {
        self.entries.write().push((id, listener));
    }

    fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }
}

impl<E: 'static> Detach for Listeners<E> {
    fn detach(&self, id: ListenerId) -> bool {
        self.remove(id)
    }
}

/// Ordered, synchronous publish/subscribe channel.
///
/// `publish` calls every listener registered at the moment of the call, in
/// subscription order, on the caller's thread. The listener list is copied
/// before fan-out and no lock is held while listeners run, so a listener may
/// subscribe or unsubscribe without affecting the delivery in progress.
///
/// A panicking listener aborts the fan-out and the panic propagates to the
/// publisher. Remaining listeners do not see that event.
pub struct EventChannel<E> {
    inner: Arc<Listeners<E>>,
}

impl<E: 'static> EventChannel<E> {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Listeners {
                entries: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a listener at the end of the list.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.inner.allocate_id();
        self.inner.insert(id, Arc::new(listener));
        SubscriptionHandle::new(id, self.detacher())
    }

    /// Register a listener that queues cloned events into a bounded buffer.
    ///
    /// If the buffer is full, or the receiver has been dropped, the listener
    /// removes itself. The receiver then reports disconnection once drained.
    pub fn subscribe_buffered(&self, buffer_size: usize) -> BufferedSubscription<E>
    where
        E: Clone + Send,
    {
        let id = self.inner.allocate_id();
        let (sender, receiver) = bounded(buffer_size);
        let weak: Weak<Listeners<E>> = Arc::downgrade(&self.inner);

        let listener: Listener<E> = Arc::new(move |event: &E| {
            let reason = match sender.try_send(event.clone()) {
                Ok(()) => return,
                Err(TrySendError::Full(_)) => DropReason::BufferOverflow,
                Err(TrySendError::Disconnected(_)) => DropReason::Disconnected,
            };
            warn!(listener = %id, ?reason, "dropping buffered subscriber");
            if let Some(listeners) = weak.upgrade() {
                listeners.remove(id);
            }
        });
        self.inner.insert(id, listener);

        BufferedSubscription {
            handle: SubscriptionHandle::new(id, self.detacher()),
            receiver,
        }
    }

    /// Remove a listener by ID. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.remove(id)
    }

    /// Deliver an event to every current listener, in subscription order.
    pub fn publish(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .inner
            .entries
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        trace!(listeners = snapshot.len(), "publishing event");

        for listener in snapshot {
            listener(event);
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.entries.read().len()
    }

    fn detacher(&self) -> Weak<dyn Detach> {
        let weak: Weak<Listeners<E>> = Arc::downgrade(&self.inner);
        weak
    }
}

impl<E: 'static> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}
