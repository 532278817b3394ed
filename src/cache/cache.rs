use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::write_entry_atomic;
use crate::CacheEntry;
use crate::CacheError;
use crate::CapsKey;
use crate::PendingRegistry;
use crate::QueryGuard;
use crate::QueryState;
use crate::Result;

/// Two-tier capability cache with an in-memory overlay and single-flight
/// lookup deduplication.
///
/// The system store is a read-only trusted database (e.g. shipped with a
/// distribution); the user store accumulates entries verified at runtime.
/// Lookup priority is fixed: memory overlay, system store, user store,
/// pending-lookup wait. Verified entries are written to the overlay
/// synchronously and persisted to the user store asynchronously; the system
/// store is never written.
///
/// One instance is meant to be shared process-wide among negotiation
/// engines; the composition root owns its lifecycle and injects it.
pub struct CapsCache {
    memory_overlay: DashMap<CapsKey, CacheEntry>,
    pending: PendingRegistry,
    system_db_path: Mutex<Option<PathBuf>>,
    user_db_path: Mutex<Option<PathBuf>>,
    next_lookup_id: AtomicU64,
}

impl Default for CapsCache {
    fn default() -> Self {
        Self {
            memory_overlay: DashMap::new(),
            pending: Arc::new(DashMap::new()),
            system_db_path: Mutex::new(None),
            user_db_path: Mutex::new(None),
            next_lookup_id: AtomicU64::new(1),
        }
    }
}

impl CapsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply both tier locations from configuration
    pub fn configure_stores(
        &self,
        store: &crate::StoreConfig,
    ) {
        self.set_system_db_path(store.system_db_path.clone());
        self.set_user_db_path(store.user_db_path.clone());
    }

    /// Point the read-only trusted tier at `path` (`None` disables it)
    pub fn set_system_db_path(
        &self,
        path: Option<PathBuf>,
    ) {
        *self.system_db_path.lock() = path;
    }

    /// Point the writable user tier at `path` (`None` disables persistence)
    pub fn set_user_db_path(
        &self,
        path: Option<PathBuf>,
    ) {
        *self.user_db_path.lock() = path;
    }

    /// Pure read through the store tiers: memory overlay, then system
    /// store, then user store. A read or decode failure at a disk tier is
    /// treated as a miss at that tier, not as an error.
    pub fn lookup_in_store(
        &self,
        key: &CapsKey,
    ) -> Option<CacheEntry> {
        if let Some(entry) = self.memory_overlay.get(key) {
            debug!("memory cache hit: {key}");
            return Some(entry.clone());
        }

        let rel = key.store_path();
        let tiers = [
            ("system", self.system_db_path.lock().clone()),
            ("user", self.user_db_path.lock().clone()),
        ];
        for (tier, base) in tiers {
            let Some(base) = base else {
                continue;
            };
            let path = base.join(&rel);
            match std::fs::read(&path) {
                Ok(bytes) => match CacheEntry::replay(bytes) {
                    Ok(entry) => {
                        debug!("{tier} db hit: {key}");
                        return Some(entry);
                    }
                    Err(e) => {
                        warn!("corrupt {tier} db entry at {:?}, treating as miss: {e:?}", path);
                    }
                },
                Err(_) => {}
            }
        }

        None
    }

    /// Register a fresh pending lookup for `key` and return its settlement
    /// guard.
    ///
    /// Any prior registration for the key is silently replaced (its guard
    /// can no longer evict the new one). Callers must go through
    /// [`CapsCache::lookup`] first to find an existing pending lookup
    /// rather than probing here, or they would orphan its waiters.
    pub fn create_query_future(
        &self,
        key: CapsKey,
    ) -> QueryGuard {
        let id = self.next_lookup_id.fetch_add(1, Ordering::Relaxed);
        debug!("registering pending lookup {id} for {key}");
        QueryGuard::register(key, id, Arc::clone(&self.pending))
    }

    /// Resolve `key` to a cached entry.
    ///
    /// A store hit returns immediately without suspending. On a miss this
    /// awaits the currently registered pending lookup: a successful
    /// settlement resolves every waiter; a failed settlement makes each
    /// waiter re-read the registry, because an independent retry may have
    /// registered a fresh lookup in the meantime. When no pending lookup
    /// remains, the store tiers are re-read once (a concurrent resolver
    /// may have settled in between) and only then does the miss surface
    /// as [`CacheError::NotFound`] — even when the wait ended in a
    /// verification failure.
    pub async fn lookup(
        &self,
        key: &CapsKey,
    ) -> Result<CacheEntry> {
        if let Some(entry) = self.lookup_in_store(key) {
            return Ok(entry);
        }

        loop {
            let mut rx = match self.pending.get(key) {
                Some(slot) => slot.rx.clone(),
                None => {
                    // A concurrent resolver may have committed the entry and
                    // settled between the store miss above and this read.
                    // Settlement removes the registry entry only after the
                    // overlay commit, so a store re-read observes it.
                    return match self.lookup_in_store(key) {
                        Some(entry) => Ok(entry),
                        None => Err(CacheError::NotFound(key.to_string()).into()),
                    };
                }
            };

            loop {
                let state = rx.borrow_and_update().clone();
                match state {
                    QueryState::Waiting => {
                        if rx.changed().await.is_err() {
                            // Sender gone; guard settles on drop, re-read anyway.
                            break;
                        }
                    }
                    QueryState::Ready(entry) => return Ok(entry),
                    QueryState::Failed(reason) => {
                        debug!("pending lookup for {key} failed ({reason}), re-reading registry");
                        break;
                    }
                }
            }
        }
    }

    /// Commit a verified entry.
    ///
    /// A copy goes into the memory overlay synchronously; when a user store
    /// is configured, the captured bytes are handed to a blocking worker
    /// for an atomic temp-file-plus-rename write. Durability is best
    /// effort: write failures are logged and never surfaced to the caller,
    /// and the overlay commit stands regardless.
    pub fn add_entry(
        &self,
        key: CapsKey,
        entry: CacheEntry,
    ) {
        self.memory_overlay.insert(key.clone(), entry.clone());

        let Some(base) = self.user_db_path.lock().clone() else {
            return;
        };
        let rel = key.store_path();
        let bytes = entry.captured;
        tokio::task::spawn_blocking(move || {
            if let Err(e) = write_entry_atomic(&base, &rel, &bytes) {
                error!("failed to persist cache entry for {key}: {e:?}");
            }
        });
    }

    /// Number of entries resident in the memory overlay
    pub fn overlay_len(&self) -> usize {
        self.memory_overlay.len()
    }

    #[cfg(test)]
    pub(crate) fn has_pending(
        &self,
        key: &CapsKey,
    ) -> bool {
        self.pending.contains_key(key)
    }
}
