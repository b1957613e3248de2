//! De-duplicating loader cache
//!
//! Every key gets exactly one slot. The first request for a key runs its
//! builder and parks the returned future; later requests get a handle to
//! the same slot. [`LoaderCache::load`] drives all parked futures together.
//!
//! A slot whose future failed, or was dropped unfinished because another
//! entry failed, holds neither a value nor a future. The next request for
//! its key replaces it with a fresh slot and runs the builder again.

use crate::LoadError;
use futures::future::{try_join_all, LocalBoxFuture};
use futures::FutureExt;
use indexmap::IndexMap;
use std::cell::OnceCell;
use std::future::Future;
use std::rc::Rc;

/// Shared view of one cache slot
#[derive(Debug)]
pub struct CacheHandle<T> {
    key: Rc<str>,
    slot: Rc<OnceCell<Rc<T>>>,
}

impl<T> Clone for CacheHandle<T> {
    fn clone(&self) -> Self {
        Self {
            key: Rc::clone(&self.key),
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> CacheHandle<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The loaded value, once the owning cache has loaded it
    pub fn get(&self) -> Option<Rc<T>> {
        self.slot.get().cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.slot.get().is_some()
    }
}

struct Entry<T> {
    handle: CacheHandle<T>,
    pending: Option<LocalBoxFuture<'static, Result<T, LoadError>>>,
}

impl<T> Entry<T> {
    /// Neither loaded nor waiting to load
    fn is_dead(&self) -> bool {
        self.pending.is_none() && !self.handle.is_ready()
    }
}

/// Loader cache keyed by resolved path
pub struct LoaderCache<T> {
    entries: IndexMap<String, Entry<T>>,
}

impl<T> Default for LoaderCache<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<T: 'static> LoaderCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for `key`, calling `builder` only if the key is new or its
    /// previous load did not finish
    pub fn get_or_add<F, Fut>(&mut self, key: &str, builder: F) -> CacheHandle<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LoadError>> + 'static,
    {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_dead() {
                return entry.handle.clone();
            }
            log::debug!("retrying {}", key);
        }
        let handle = CacheHandle {
            key: Rc::from(key),
            slot: Rc::new(OnceCell::new()),
        };
        self.entries.insert(
            key.to_string(),
            Entry {
                handle: handle.clone(),
                pending: Some(builder().boxed_local()),
            },
        );
        handle
    }

    /// Drive every pending entry to completion
    ///
    /// Fails with the first error; entries that did finish keep their
    /// values, the rest are rebuilt on their next request. Entries added
    /// after this call stay pending until the next.
    pub async fn load(&mut self) -> Result<(), LoadError> {
        let pending: Vec<_> = self
            .entries
            .values_mut()
            .filter_map(|entry| {
                let future = entry.pending.take()?;
                let slot = Rc::clone(&entry.handle.slot);
                Some(async move {
                    let value = future.await?;
                    // each future is taken once, so the slot is still empty
                    let _ = slot.set(Rc::new(value));
                    Ok::<_, LoadError>(())
                })
            })
            .collect();

        if !pending.is_empty() {
            log::debug!("loading {} cache entries", pending.len());
        }
        try_join_all(pending).await?;
        Ok(())
    }

    /// Loaded value for `key`
    pub fn get(&self, key: &str) -> Option<Rc<T>> {
        self.entries.get(key).and_then(|entry| entry.handle.get())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Loaded values in insertion order
    pub fn values(&self) -> Vec<Rc<T>> {
        self.entries
            .values()
            .filter_map(|entry| entry.handle.get())
            .collect()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every entry holds a value
    pub fn is_loaded(&self) -> bool {
        self.entries.values().all(|entry| entry.handle.is_ready())
    }
}

impl<T> std::fmt::Debug for LoaderCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderCache")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceError;
    use futures::executor::block_on;
    use std::cell::Cell;

    #[test]
    fn test_builder_runs_once_per_key() {
        let calls = Rc::new(Cell::new(0));
        let mut cache: LoaderCache<String> = LoaderCache::new();

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let calls = Rc::clone(&calls);
                cache.get_or_add("img/tiles.png", move || {
                    calls.set(calls.get() + 1);
                    async { Ok("tiles".to_string()) }
                })
            })
            .collect();

        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_loaded());
        assert!(handles[0].get().is_none());

        block_on(cache.load()).unwrap();

        let first = handles[0].get().unwrap();
        for handle in &handles {
            assert!(Rc::ptr_eq(&handle.get().unwrap(), &first));
        }
        assert!(cache.is_loaded());
        assert_eq!(cache.values().len(), 1);
        assert!(Rc::ptr_eq(&cache.get("img/tiles.png").unwrap(), &first));
    }

    #[test]
    fn test_values_keep_insertion_order() {
        let mut cache: LoaderCache<i32> = LoaderCache::new();
        for (key, value) in [("b", 2), ("a", 1), ("c", 3)] {
            cache.get_or_add(key, move || async move { Ok(value) });
        }
        block_on(cache.load()).unwrap();

        let values: Vec<i32> = cache.values().iter().map(|v| **v).collect();
        assert_eq!(values, [2, 1, 3]);
        assert_eq!(cache.keys().collect::<Vec<_>>(), ["b", "a", "c"]);
    }

    #[test]
    fn test_failure_names_key() {
        let mut cache: LoaderCache<i32> = LoaderCache::new();
        cache.get_or_add("ok.png", || async { Ok(1) });
        cache.get_or_add("broken.png", || async {
            Err(LoadError::missing(
                "broken.png",
                SourceError::NotFound {
                    path: "broken.png".to_string(),
                },
            ))
        });

        let err = block_on(cache.load()).unwrap_err();
        assert_eq!(err.key(), Some("broken.png"));
        assert!(!cache.is_loaded());
    }

    #[test]
    fn test_failed_entries_rebuild_on_next_request() {
        let calls = Rc::new(Cell::new(0));
        let mut cache: LoaderCache<i32> = LoaderCache::new();
        let add_flaky = |cache: &mut LoaderCache<i32>, calls: &Rc<Cell<i32>>| {
            let calls = Rc::clone(calls);
            cache.get_or_add("flaky.png", move || {
                calls.set(calls.get() + 1);
                let attempt = calls.get();
                async move {
                    if attempt == 1 {
                        Err(LoadError::missing(
                            "flaky.png",
                            SourceError::NotFound {
                                path: "flaky.png".to_string(),
                            },
                        ))
                    } else {
                        Ok(attempt)
                    }
                }
            })
        };

        cache.get_or_add("ok.png", || async { Ok(7) });
        let stale = add_flaky(&mut cache, &calls);
        assert!(block_on(cache.load()).is_err());
        assert!(!cache.is_loaded());
        assert_eq!(cache.get("ok.png").as_deref(), Some(&7));

        // a failed slot is never handed out as if it were loading
        let handle = add_flaky(&mut cache, &calls);
        assert_eq!(calls.get(), 2);
        block_on(cache.load()).unwrap();

        assert!(cache.is_loaded());
        assert_eq!(handle.get().as_deref(), Some(&2));
        assert_eq!(cache.get("flaky.png").as_deref(), Some(&2));
        assert!(stale.get().is_none());
        assert_eq!(cache.keys().collect::<Vec<_>>(), ["ok.png", "flaky.png"]);

        // loaded entries are not rebuilt
        add_flaky(&mut cache, &calls);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_cancelled_load_leaves_entries_retryable() {
        let mut cache: LoaderCache<i32> = LoaderCache::new();
        cache.get_or_add("slow.png", || futures::future::pending());
        {
            let load = cache.load();
            futures::pin_mut!(load);
            let waker = futures::task::noop_waker();
            let mut cx = std::task::Context::from_waker(&waker);
            assert!(load.as_mut().poll(&mut cx).is_pending());
        }

        let handle = cache.get_or_add("slow.png", || async { Ok(3) });
        block_on(cache.load()).unwrap();
        assert_eq!(handle.get().as_deref(), Some(&3));
    }

    #[test]
    fn test_empty_cache_loads() {
        let mut cache: LoaderCache<i32> = LoaderCache::new();
        block_on(cache.load()).unwrap();
        assert!(cache.is_loaded());
        assert!(cache.is_empty());
    }
}
