//! Ordered, duplicate-free observer registry with snapshot iteration

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Ordered set of shared observers
///
/// Observers are compared by pointer identity, so registering the same `Arc`
/// twice is a no-op. Fan-out always iterates over a [`snapshot`](Self::snapshot)
/// taken before the first callback runs; the lock is never held while an
/// observer executes, which lets callbacks register or unregister observers
/// (including themselves) mid-fan-out.
pub struct ObserverSet<T: ?Sized> {
    observers: Mutex<Vec<Arc<T>>>,
}

impl<T: ?Sized> Default for ObserverSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> std::fmt::Debug for ObserverSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("len", &self.len())
            .finish()
    }
}

impl<T: ?Sized> ObserverSet<T> {
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Append `observer` unless it is already registered
    ///
    /// Returns `true` if the observer was added.
    pub fn insert(&self, observer: Arc<T>) -> bool {
        let mut observers = self.lock();
        if observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            return false;
        }
        observers.push(observer);
        true
    }

    /// Remove `observer`, returning `true` if it was registered
    pub fn remove(&self, observer: &Arc<T>) -> bool {
        let mut observers = self.lock();
        match observers.iter().position(|o| Arc::ptr_eq(o, observer)) {
            Some(pos) => {
                observers.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, observer: &Arc<T>) -> bool {
        self.lock().iter().any(|o| Arc::ptr_eq(o, observer))
    }

    /// Copy of the current registrations, in registration order
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.lock().clone()
    }

    /// Remove every observer, returning them in registration order
    pub fn drain(&self) -> Vec<Arc<T>> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panicking observer must not wedge every later registration, so a
    // poisoned lock is recovered rather than propagated.
    fn lock(&self) -> MutexGuard<'_, Vec<Arc<T>>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
