//! Last-snapshot-wins local cache.

use std::sync::RwLock;

/// In-process projection of a remote collection, read synchronously by
/// presentation code.
///
/// The state is derived from the most recent live-query snapshot and is
/// replaced wholesale on every push — no diffing, no partial mutation.
/// Mutating workflow operations never write here; the cache only moves
/// when the next snapshot arrives.
pub struct Mirror<S> {
    state: RwLock<S>,
}

impl<S> Mirror<S> {
    /// Create a mirror seeded with `initial` state.
    pub fn new(initial: S) -> Self {
        Self {
            state: RwLock::new(initial),
        }
    }

    /// Replace the whole state in one atomic update.
    pub fn replace(&self, next: S) {
        *self.state.write().expect("mirror lock poisoned") = next;
    }

    /// Read through the current state without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.read().expect("mirror lock poisoned"))
    }
}

impl<S: Clone> Mirror<S> {
    /// Clone out the current state.
    pub fn read(&self) -> S {
        self.state.read().expect("mirror lock poisoned").clone()
    }
}

impl<S: Default> Default for Mirror<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}
