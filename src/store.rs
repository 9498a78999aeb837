//! Main Store struct tying the record map and its channels together.

use crate::error::{Result, StoreError};
use crate::subscriptions::{
    AfterInsert, BeforeInsert, BufferedSubscription, EventChannel, SubscriptionHandle,
};
use crate::types::{Record, RecordKey, StoreStats};
use indexmap::IndexMap;
use parking_lot::{ReentrantMutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// What `try_set` accepts as an identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdPolicy {
    /// Accept any identifier, including the empty string.
    Permissive,
    /// Reject identifiers that are empty or only whitespace.
    RejectBlank,
}

impl Default for IdPolicy {
    fn default() -> Self {
        IdPolicy::Permissive
    }
}

impl IdPolicy {
    /// Check an identifier against this policy.
    pub fn check(self, id: &str) -> Result<()> {
        match self {
            IdPolicy::Permissive => Ok(()),
            IdPolicy::RejectBlank if id.trim().is_empty() => {
                Err(StoreError::InvalidId(id.to_string()))
            }
            IdPolicy::RejectBlank => Ok(()),
        }
    }
}

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Name reported in log events.
    pub name: String,

    /// Identifier validation applied by `try_set`.
    pub id_policy: IdPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "store".to_string(),
            id_policy: IdPolicy::default(),
        }
    }
}

/// The keyed record store.
///
/// Holds at most one record per case-insensitive identifier and announces
/// every write on two channels: before the map changes and after it has
/// changed. Keys enumerate in first-insertion order; overwriting a record
/// keeps its position.
///
/// There is no global instance. Construct one and hand it (or an `Arc` of it)
/// to whatever needs it.
pub struct Store<T> {
    /// Store configuration.
    config: StoreConfig,

    /// Normalized key -> most recently set record.
    records: RwLock<IndexMap<RecordKey, Arc<T>>>,

    /// Listeners notified before a write.
    before_insert: EventChannel<BeforeInsert<T>>,

    /// Listeners notified after a write.
    after_insert: EventChannel<AfterInsert<T>>,

    set_count: AtomicU64,
    overwrite_count: AtomicU64,

    /// Serializes the whole set sequence. Re-entrant so a listener may call
    /// `set` on the same thread.
    write_lock: ReentrantMutex<()>,
}

impl<T: Record + 'static> Store<T> {
    /// Create an empty store with default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            records: RwLock::new(IndexMap::new()),
            before_insert: EventChannel::new(),
            after_insert: EventChannel::new(),
            set_count: AtomicU64::new(0),
            overwrite_count: AtomicU64::new(0),
            write_lock: ReentrantMutex::new(()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // --- Write Operations ---

    /// Store a record under its normalized identifier.
    ///
    /// Publishes a [`BeforeInsert`] carrying whatever the key held until now,
    /// writes the record, then publishes an [`AfterInsert`]. No validation is
    /// done on the identifier. Returns `self` for chaining.
    pub fn set(&self, record: T) -> &Self {
        let _lock = self.write_lock.lock();

        let key = record.key();
        let incoming = Arc::new(record);
        let previous = self.records.read().get(&key).cloned();
        let overwrite = previous.is_some();

        self.before_insert.publish(&BeforeInsert {
            previous,
            incoming: Arc::clone(&incoming),
        });

        let value = Arc::clone(&incoming);
        self.records.write().insert(key.clone(), incoming);

        self.set_count.fetch_add(1, Ordering::Relaxed);
        if overwrite {
            self.overwrite_count.fetch_add(1, Ordering::Relaxed);
        }
        debug!(store = %self.config.name, %key, overwrite, "record set");

        self.after_insert.publish(&AfterInsert { value });

        self
    }

    /// Like [`set`](Self::set), but checks the identifier against the
    /// configured [`IdPolicy`] first. A rejected record publishes nothing.
    pub fn try_set(&self, record: T) -> Result<&Self> {
        self.config.id_policy.check(record.id())?;
        Ok(self.set(record))
    }

    // --- Read Operations ---

    /// Get the record stored under `id`, ignoring case.
    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.records.read().get(&RecordKey::new(id)).cloned()
    }

    /// Whether a record is stored under `id`, ignoring case.
    pub fn contains(&self, id: &str) -> bool {
        self.records.read().contains_key(&RecordKey::new(id))
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Normalized keys, in enumeration order.
    pub fn keys(&self) -> Vec<RecordKey> {
        self.records.read().keys().cloned().collect()
    }

    /// Call `visitor` once for every stored record, in enumeration order.
    ///
    /// Iterates a snapshot taken at call time, so the visitor may call back
    /// into the store. Records written during the visit are not visited.
    pub fn visit<F>(&self, mut visitor: F)
    where
        F: FnMut(&T),
    {
        for record in self.snapshot() {
            visitor(&record);
        }
    }

    /// Return the record with the highest score.
    ///
    /// The running maximum starts at `S::default()` (zero for numbers) and a
    /// record only replaces the current best when its score is strictly
    /// greater. Consequences:
    /// - ties go to the first record in enumeration order
    /// - `None` when the store is empty
    /// - `None` when no record scores above zero, even a lone record
    pub fn select_best<S, F>(&self, score: F) -> Option<Arc<T>>
    where
        S: PartialOrd + Default,
        F: FnMut(&T) -> S,
    {
        self.select_best_above(S::default(), score)
    }

    /// [`select_best`](Self::select_best) with an explicit starting floor.
    /// Only records scoring strictly above `floor` can be returned.
    pub fn select_best_above<S, F>(&self, floor: S, mut score: F) -> Option<Arc<T>>
    where
        S: PartialOrd,
        F: FnMut(&T) -> S,
    {
        let mut max = floor;
        let mut best = None;

        for record in self.snapshot() {
            let value = score(&record);
            if value > max {
                max = value;
                best = Some(record);
            }
        }

        best
    }

    fn snapshot(&self) -> Vec<Arc<T>> {
        self.records.read().values().cloned().collect()
    }

    // --- Subscriptions ---

    /// Register a listener fired before each write.
    pub fn on_before_add<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(&BeforeInsert<T>) + Send + Sync + 'static,
    {
        self.before_insert.subscribe(listener)
    }

    /// Register a listener fired after each write.
    pub fn on_after_add<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(&AfterInsert<T>) + Send + Sync + 'static,
    {
        self.after_insert.subscribe(listener)
    }

    /// Queue after-insert events into a bounded buffer instead of a callback.
    pub fn subscribe_after_add_buffered(
        &self,
        buffer_size: usize,
    ) -> BufferedSubscription<AfterInsert<T>>
    where
        T: Send + Sync,
    {
        self.after_insert.subscribe_buffered(buffer_size)
    }

    // --- Utility ---

    /// Get store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            record_count: self.len(),
            set_count: self.set_count.load(Ordering::Relaxed),
            overwrite_count: self.overwrite_count.load(Ordering::Relaxed),
            before_listener_count: self.before_insert.listener_count(),
            after_listener_count: self.after_insert.listener_count(),
        }
    }
}

impl<T: Record + 'static> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pokemon;
    use parking_lot::Mutex;

    fn starter_store() -> Store<Pokemon> {
        let store = Store::new();
        store
            .set(Pokemon::new("Bulbasaur", 50, 20))
            .set(Pokemon::new("Charmander", 40, 30))
            .set(Pokemon::new("Venusaur", 30, 50));
        store
    }

    #[test]
    fn test_create_store() {
        let store: Store<Pokemon> = Store::new();
        assert!(store.is_empty());
        assert_eq!(store.stats(), StoreStats::default());
    }

    #[test]
    fn test_set_and_get() {
        let store = starter_store();

        assert_eq!(store.len(), 3);
        let venusaur = store.get("Venusaur").unwrap();
        assert_eq!(venusaur.defense, 50);
        assert!(store.get("Pikachu").is_none());
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let store = starter_store();

        assert_eq!(store.get("bulbasaur").unwrap().id, "Bulbasaur");
        assert_eq!(store.get("BULBASAUR").unwrap().id, "Bulbasaur");
        assert!(store.contains("cHaRmAnDeR"));
    }

    #[test]
    fn test_colliding_ids_overwrite() {
        let store = Store::new();
        store
            .set(Pokemon::new("Mew", 10, 10))
            .set(Pokemon::new("MEW", 99, 99));

        assert_eq!(store.len(), 1);
        let mew = store.get("mew").unwrap();
        assert_eq!(mew.id, "MEW");
        assert_eq!(mew.attack, 99);
        assert_eq!(store.stats().overwrite_count, 1);
    }

    #[test]
    fn test_overwrite_keeps_enumeration_position() {
        let store = starter_store();
        store.set(Pokemon::new("bulbasaur", 1, 1));

        let keys: Vec<String> = store.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["bulbasaur", "charmander", "venusaur"]);
    }

    #[test]
    fn test_empty_id_accepted_by_set() {
        let store = Store::new();
        store.set(Pokemon::new("", 1, 1));
        assert!(store.get("").is_some());
    }

    #[test]
    fn test_try_set_reject_blank() {
        let store = Store::with_config(StoreConfig {
            id_policy: IdPolicy::RejectBlank,
            ..Default::default()
        });
        let fired = Arc::new(Mutex::new(0));
        {
            let fired = Arc::clone(&fired);
            store.on_before_add(move |_| *fired.lock() += 1);
        }

        let result = store.try_set(Pokemon::new("   ", 1, 1));
        assert!(matches!(result, Err(StoreError::InvalidId(_))));
        assert!(store.try_set(Pokemon::new("", 1, 1)).is_err());
        assert!(store.is_empty());
        assert_eq!(*fired.lock(), 0);

        store.try_set(Pokemon::new("Abra", 20, 15)).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(*fired.lock(), 1);
    }

    #[test]
    fn test_try_set_permissive() {
        let store = Store::new();
        store.try_set(Pokemon::new("", 1, 1)).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_before_and_after_payloads() {
        let store = starter_store();
        let seen: Arc<Mutex<Vec<(Option<i64>, i64)>>> = Arc::new(Mutex::new(Vec::new()));
        let after: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));

        {
            let seen = Arc::clone(&seen);
            store.on_before_add(move |event| {
                seen.lock()
                    .push((event.previous.as_ref().map(|p| p.defense), event.incoming.defense));
            });
        }
        {
            let after = Arc::clone(&after);
            store.on_after_add(move |event| after.lock().push(event.value.defense));
        }

        store.set(Pokemon::new("Venusaur", 35, 60));
        store.set(Pokemon::new("Ivysaur", 40, 40));

        assert_eq!(*seen.lock(), vec![(Some(50), 60), (None, 40)]);
        assert_eq!(*after.lock(), vec![60, 40]);
    }

    #[test]
    fn test_after_value_is_stored_value() {
        let store = Arc::new(Store::new());
        let matched = Arc::new(Mutex::new(Vec::new()));

        {
            let weak = Arc::downgrade(&store);
            let matched = Arc::clone(&matched);
            store.on_after_add(move |event: &AfterInsert<Pokemon>| {
                let store = weak.upgrade().unwrap();
                let stored = store.get(&event.value.id).unwrap();
                matched.lock().push(Arc::ptr_eq(&stored, &event.value));
            });
        }

        store.set(Pokemon::new("Onix", 45, 160));
        assert_eq!(*matched.lock(), vec![true]);
    }

    #[test]
    fn test_unsubscribed_listener_stops_receiving() {
        let store = Store::new();
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let first = Arc::clone(&first);
            store.on_after_add(move |e: &AfterInsert<Pokemon>| first.lock().push(e.value.id.clone()))
        };
        {
            let second = Arc::clone(&second);
            store.on_after_add(move |e: &AfterInsert<Pokemon>| second.lock().push(e.value.id.clone()));
        }

        store
            .set(Pokemon::new("Bulbasaur", 50, 20))
            .set(Pokemon::new("Charmander", 40, 30));
        handle.unsubscribe();
        store.set(Pokemon::new("Venusaur", 30, 50));

        assert_eq!(*first.lock(), vec!["Bulbasaur", "Charmander"]);
        assert_eq!(*second.lock(), vec!["Bulbasaur", "Charmander", "Venusaur"]);
        assert_eq!(store.stats().after_listener_count, 1);
    }

    #[test]
    fn test_visit_covers_every_key_once() {
        let store = starter_store();
        store.set(Pokemon::new("VENUSAUR", 1, 1));

        let mut visited = Vec::new();
        store.visit(|p| visited.push(p.id.clone()));

        assert_eq!(visited, vec!["Bulbasaur", "Charmander", "VENUSAUR"]);
    }

    #[test]
    fn test_visit_can_write_back() {
        let store = starter_store();

        store.visit(|p| {
            store.set(Pokemon::new(format!("{}-mega", p.id), p.attack * 2, p.defense * 2));
        });

        assert_eq!(store.len(), 6);
        assert_eq!(store.get("bulbasaur-mega").unwrap().attack, 100);
    }

    #[test]
    fn test_select_best() {
        let store = starter_store();

        assert_eq!(store.select_best(|p| p.defense).unwrap().id, "Venusaur");
        assert_eq!(store.select_best(|p| p.attack).unwrap().id, "Bulbasaur");
    }

    #[test]
    fn test_select_best_first_of_ties() {
        let store = Store::new();
        store
            .set(Pokemon::new("A", 30, 0))
            .set(Pokemon::new("B", 50, 0))
            .set(Pokemon::new("C", 50, 0));

        assert_eq!(store.select_best(|p| p.attack).unwrap().id, "B");
    }

    #[test]
    fn test_select_best_empty_store() {
        let store: Store<Pokemon> = Store::new();
        assert!(store.select_best(|p| p.attack).is_none());
    }

    #[test]
    fn test_select_best_zero_and_negative_scores() {
        let store = Store::new();
        store.set(Pokemon::new("Magikarp", 0, 0));
        assert!(store.select_best(|p| p.attack).is_none());

        store.set(Pokemon::new("Shuckle", -5, 230));
        assert!(store.select_best(|p| p.attack).is_none());
        assert_eq!(
            store.select_best_above(-100, |p| p.attack).unwrap().id,
            "Magikarp"
        );
    }

    #[test]
    fn test_select_best_float_scores() {
        let store = starter_store();
        let best = store
            .select_best(|p| p.attack as f64 / p.defense as f64)
            .unwrap();
        assert_eq!(best.id, "Bulbasaur");
    }

    #[test]
    fn test_stats() {
        let store = starter_store();
        store.set(Pokemon::new("venusaur", 35, 60));
        let _h = store.on_before_add(|_| {});

        let stats = store.stats();
        assert_eq!(stats.record_count, 3);
        assert_eq!(stats.set_count, 4);
        assert_eq!(stats.overwrite_count, 1);
        assert_eq!(stats.before_listener_count, 1);
        assert_eq!(stats.after_listener_count, 0);
    }
}
