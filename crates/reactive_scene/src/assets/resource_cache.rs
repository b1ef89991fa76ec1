//! Single-flight resource cache
//!
//! The first request for a key starts its load; every later request for the
//! same key shares that load, whether still pending or already finished.
//! Entries are never evicted, failed loads included.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

use futures::future::{FutureExt, LocalBoxFuture, Shared};

/// Shared load of one resource
pub type SharedLoad<V> = Shared<LocalBoxFuture<'static, V>>;

/// Memoized asynchronous loads keyed by `K`
pub struct ResourceCache<K, V: Clone> {
    entries: HashMap<K, SharedLoad<V>>,
}

impl<K, V: Clone> Default for ResourceCache<K, V> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<K: Eq + Hash + Clone, V: Clone + 'static> ResourceCache<K, V> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared load for `key`, calling `loader` only on the first request
    pub fn get<F, Fut>(&mut self, key: &K, loader: F) -> SharedLoad<V>
    where
        F: FnOnce(&K) -> Fut,
        Fut: Future<Output = V> + 'static,
    {
        if let Some(load) = self.entries.get(key) {
            return load.clone();
        }
        let load = loader(key).boxed_local().shared();
        self.entries.insert(key.clone(), load.clone());
        load
    }

    /// Whether `key` has been requested before
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached loads
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been requested yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_concurrent_requests_share_one_load() {
        let mut cache: ResourceCache<String, Rc<String>> = ResourceCache::new();
        let calls = Rc::new(Cell::new(0));
        let (tx, rx) = oneshot::channel::<()>();
        let gate = rx.shared();

        let key = "ship".to_owned();
        let first = {
            let (calls, gate) = (calls.clone(), gate.clone());
            cache.get(&key, move |key| {
                calls.set(calls.get() + 1);
                let name = key.clone();
                async move {
                    let _ = gate.await;
                    Rc::new(name)
                }
            })
        };
        let second = cache.get(&key, |_| async { Rc::new("other".to_owned()) });

        let _ = tx.send(());
        let (a, b) = block_on(futures::future::join(first, second));

        assert_eq!(calls.get(), 1);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(*a, "ship");
    }

    #[test]
    fn test_completed_load_is_reused() {
        let mut cache: ResourceCache<u32, Result<u32, String>> = ResourceCache::new();
        let first = block_on(cache.get(&1, |_| async { Err("missing".to_owned()) }));
        let second = block_on(cache.get(&1, |_| async { Ok(7) }));

        assert_eq!(first, Err("missing".to_owned()));
        assert_eq!(second, first);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
    }
}
