//! State broadcasting.
//!
//! [`Observable`] is a replay-latest cell: a subscriber is called with the
//! current snapshot at registration time and again after every
//! [`Observable::publish`]. [`Listeners`] is the plain fan-out used for
//! one-shot events, where nothing is replayed.
//!
//! Callbacks run synchronously on the publishing thread. A callback must
//! not subscribe to or publish on the same cell it is registered with.

use std::sync::{Arc, Mutex, MutexGuard};

/// Handle returned by `subscribe`/`listen`, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    fn insert(&mut self, callback: Callback<T>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, callback));
        id
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    fn snapshot(&self) -> Vec<Callback<T>> {
        self.entries.iter().map(|(_, cb)| Arc::clone(cb)).collect()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Replay-latest state cell.
pub struct Observable<T> {
    current: Mutex<T>,
    subscribers: Mutex<Registry<T>>,
}

impl<T: Clone> Observable<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: Mutex::new(initial),
            subscribers: Mutex::new(Registry::new()),
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> T {
        lock(&self.current).clone()
    }

    /// Register `callback`, delivering the current snapshot before returning.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let callback: Callback<T> = Arc::new(callback);
        let id = lock(&self.subscribers).insert(Arc::clone(&callback));
        let snapshot = self.get();
        callback(&snapshot);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        lock(&self.subscribers).remove(id)
    }

    /// Replace the snapshot and notify every subscriber.
    pub fn publish(&self, value: T) {
        *lock(&self.current) = value.clone();
        let callbacks = lock(&self.subscribers).snapshot();
        for cb in callbacks {
            cb(&value);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).entries.len()
    }
}

impl<T: Clone + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Event fan-out without replay.
pub struct Listeners<E> {
    registry: Mutex<Registry<E>>,
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
        }
    }

    pub fn listen<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        lock(&self.registry).insert(Arc::new(callback))
    }

    pub fn unlisten(&self, id: SubscriptionId) -> bool {
        lock(&self.registry).remove(id)
    }

    pub fn emit(&self, event: &E) {
        let callbacks = lock(&self.registry).snapshot();
        for cb in callbacks {
            cb(event);
        }
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}
