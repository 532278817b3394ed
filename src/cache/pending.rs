use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;
use tracing::debug;

use crate::CacheEntry;
use crate::CapsKey;

/// Settlement state of a pending lookup, fanned out to every waiter
/// through a watch channel.
#[derive(Debug, Clone)]
pub(crate) enum QueryState {
    Waiting,
    Ready(CacheEntry),
    /// Verification failure (or creator cancellation); waiters re-read the
    /// pending registry instead of giving up immediately.
    Failed(String),
}

pub(crate) struct PendingSlot {
    pub(crate) id: u64,
    pub(crate) rx: watch::Receiver<QueryState>,
}

pub(crate) type PendingRegistry = Arc<DashMap<CapsKey, PendingSlot>>;

/// Single-assignment settlement handle for one pending lookup.
///
/// Returned by [`crate::CapsCache::create_query_future`]; the holder must
/// settle it exactly once. Settling removes the registry entry only while
/// this guard is still the registered lookup for its key, so a stale
/// settlement never evicts a fresher registration. Dropping an unsettled
/// guard settles it as failed, which unparks waiters without cancelling
/// any replacement lookup they may find on re-read.
pub struct QueryGuard {
    key: CapsKey,
    id: u64,
    tx: watch::Sender<QueryState>,
    registry: PendingRegistry,
    settled: bool,
}

impl QueryGuard {
    pub(crate) fn register(
        key: CapsKey,
        id: u64,
        registry: PendingRegistry,
    ) -> Self {
        let (tx, rx) = watch::channel(QueryState::Waiting);
        // Silently replaces any prior registration for the key; the prior
        // guard's settlement will fail its id check and leave this one alone.
        registry.insert(key.clone(), PendingSlot { id, rx });
        Self {
            key,
            id,
            tx,
            registry,
            settled: false,
        }
    }

    pub fn key(&self) -> &CapsKey {
        &self.key
    }

    /// Settle with a verified entry, waking every waiter with the value
    pub fn complete(
        mut self,
        entry: CacheEntry,
    ) {
        self.settle(QueryState::Ready(entry));
    }

    /// Settle with a verification failure, waking every waiter into a
    /// registry re-read
    pub fn fail(
        mut self,
        reason: impl Into<String>,
    ) {
        self.settle(QueryState::Failed(reason.into()));
    }

    fn settle(
        &mut self,
        state: QueryState,
    ) {
        // Remove before waking waiters: a waiter seeing Failed must not
        // find this same settled lookup on its registry re-read.
        self.registry.remove_if(&self.key, |_, slot| slot.id == self.id);
        let _ = self.tx.send(state);
        self.settled = true;
    }
}

impl Drop for QueryGuard {
    fn drop(&mut self) {
        if !self.settled {
            debug!("pending lookup for {} dropped unsettled", self.key);
            self.settle(QueryState::Failed("lookup cancelled".to_string()));
        }
    }
}
