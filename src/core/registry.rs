//! # Registry of active signal loops.
//!
//! Owns the mapping `key → Handle` and nothing else. All mutation goes through
//! the methods below; the lock is never held while a loop is being joined.
//!
//! ## Rules
//! - At most one handle per key
//! - Every handle carries a unique **generation**; finalizers remove a key only
//!   if the stored generation is their own, so a finishing loop never removes
//!   its successor
//! - Taking a handle out of the map transfers the obligation to cancel/join it

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::signal_loop::LoopReport;

/// Handle to a running signal loop.
pub(crate) struct Handle {
    /// Unique generation of this loop.
    pub generation: u64,
    /// Join handle of the loop task.
    pub join: JoinHandle<LoopReport>,
    /// Individual cancellation token for this loop.
    pub cancel: CancellationToken,
}

/// Key-indexed registry of active loops.
pub(crate) struct Registry {
    handles: RwLock<HashMap<String, Handle>>,
    next_generation: AtomicU64,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            handles: RwLock::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Replaces the handle for `key` with the one built by `spawn`.
    ///
    /// `spawn` runs under the write lock and receives the new generation and the
    /// previous handle (already removed from the map). Returns the replaced
    /// generation, if any.
    pub async fn replace<F>(&self, key: &str, spawn: F) -> (u64, Option<u64>)
    where
        F: FnOnce(u64, Option<Handle>) -> Handle,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let mut handles = self.handles.write().await;
        let prev = handles.remove(key);
        let replaced = prev.as_ref().map(|h| h.generation);
        let handle = spawn(generation, prev);
        handles.insert(key.to_string(), handle);
        (generation, replaced)
    }

    /// Atomically removes and returns the handle for `key`.
    pub async fn take(&self, key: &str) -> Option<Handle> {
        self.handles.write().await.remove(key)
    }

    /// Removes `key` only if it still maps to `generation`.
    ///
    /// Returns `true` if an entry was removed.
    pub async fn remove_if_current(&self, key: &str, generation: u64) -> bool {
        let mut handles = self.handles.write().await;
        match handles.get(key) {
            Some(h) if h.generation == generation => {
                handles.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Returns sorted list of active keys.
    pub async fn keys(&self) -> Vec<String> {
        let handles = self.handles.read().await;
        let mut keys: Vec<String> = handles.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Returns true if `key` has an active handle.
    pub async fn contains(&self, key: &str) -> bool {
        self.handles.read().await.contains_key(key)
    }

    /// Number of active handles.
    pub async fn len(&self) -> usize {
        self.handles.read().await.len()
    }

    /// Removes every handle at once.
    pub async fn drain(&self) -> Vec<(String, Handle)> {
        self.handles.write().await.drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::signal_loop::LoopExit;

    fn dummy(generation: u64) -> Handle {
        Handle {
            generation,
            join: tokio::spawn(async {
                LoopReport {
                    exit: LoopExit::Exhausted,
                    emissions: 0,
                    error: None,
                }
            }),
            cancel: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn test_replace_hands_over_previous() {
        let reg = Registry::new();
        let (g1, replaced) = reg.replace("a", |g, prev| {
            assert!(prev.is_none());
            dummy(g)
        }).await;
        assert_eq!(replaced, None);

        let (g2, replaced) = reg.replace("a", |g, prev| {
            assert_eq!(prev.map(|h| h.generation), Some(g1));
            dummy(g)
        }).await;
        assert_eq!(replaced, Some(g1));
        assert!(g2 > g1);
        assert_eq!(reg.len().await, 1);
    }

    #[tokio::test]
    async fn test_stale_generation_does_not_remove_successor() {
        let reg = Registry::new();
        let (g1, _) = reg.replace("a", |g, _| dummy(g)).await;
        let (g2, _) = reg.replace("a", |g, _| dummy(g)).await;

        assert!(!reg.remove_if_current("a", g1).await);
        assert!(reg.contains("a").await);
        assert!(reg.remove_if_current("a", g2).await);
        assert!(!reg.contains("a").await);
    }

    #[tokio::test]
    async fn test_keys_sorted() {
        let reg = Registry::new();
        for k in ["c", "a", "b"] {
            reg.replace(k, |g, _| dummy(g)).await;
        }
        assert_eq!(reg.keys().await, vec!["a", "b", "c"]);
        assert_eq!(reg.drain().await.len(), 3);
        assert_eq!(reg.len().await, 0);
    }
}
