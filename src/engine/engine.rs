use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;
use tracing::warn;

use crate::compute_local_key;
use crate::AdvertisementRegistry;
use crate::CacheEntry;
use crate::CacheError;
use crate::CapsCache;
use crate::CapsConfig;
use crate::CapsKey;
use crate::DiscoClient;
use crate::Error;
use crate::FeatureInfo;
use crate::HashScheme;
use crate::PeerId;
use crate::Presence;
use crate::PresenceType;
use crate::QueryGuard;
use crate::Result;

/// Capability negotiation engine.
///
/// Reacts to local feature-set changes by recomputing the advertised key
/// set, diffing it against the previous one and (un)mounting advertisement
/// endpoints; attaches capability markers to outbound available presence;
/// and resolves inbound capability claims through the shared [`CapsCache`],
/// falling back to a deduplicated live feature query.
///
/// The cache is injected so one instance can be shared by several engines;
/// its lifecycle belongs to the composition root.
pub struct CapsEngine {
    cache: Arc<CapsCache>,
    disco: Arc<dyn DiscoClient>,
    registry: Arc<dyn AdvertisementRegistry>,
    node_base: String,
    current_keys: Mutex<HashMap<HashScheme, BTreeSet<CapsKey>>>,
    sha256_enabled: AtomicBool,
    sha512_enabled: AtomicBool,
    key_changes_tx: watch::Sender<u64>,
}

impl CapsEngine {
    pub fn new(
        cache: Arc<CapsCache>,
        disco: Arc<dyn DiscoClient>,
        registry: Arc<dyn AdvertisementRegistry>,
        config: &CapsConfig,
    ) -> Self {
        let (key_changes_tx, _) = watch::channel(0);
        Self {
            cache,
            disco,
            registry,
            node_base: config.node_base.clone(),
            current_keys: Mutex::new(HashMap::new()),
            sha256_enabled: AtomicBool::new(config.schemes.sha256),
            sha512_enabled: AtomicBool::new(config.schemes.sha512),
            key_changes_tx,
        }
    }

    pub fn cache(&self) -> &Arc<CapsCache> {
        &self.cache
    }

    pub fn scheme_enabled(
        &self,
        scheme: HashScheme,
    ) -> bool {
        match scheme {
            HashScheme::Sha256 => self.sha256_enabled.load(Ordering::Relaxed),
            HashScheme::Sha512 => self.sha512_enabled.load(Ordering::Relaxed),
        }
    }

    /// Toggle inbound processing and outbound emission for one scheme.
    ///
    /// Takes effect on advertisement endpoints at the next
    /// [`CapsEngine::update_keys`].
    pub fn set_scheme_enabled(
        &self,
        scheme: HashScheme,
        enabled: bool,
    ) {
        match scheme {
            HashScheme::Sha256 => self.sha256_enabled.store(enabled, Ordering::Relaxed),
            HashScheme::Sha512 => self.sha512_enabled.store(enabled, Ordering::Relaxed),
        }
    }

    /// Counter bumped after every distinct advertised key-set change.
    /// Subscribers are expected to re-send their outbound presence.
    pub fn subscribe_key_changes(&self) -> watch::Receiver<u64> {
        self.key_changes_tx.subscribe()
    }

    /// Recompute the advertised capability keys from the current local
    /// feature description.
    ///
    /// An unchanged key set is a no-op: no endpoint churn, no
    /// notification. Otherwise only departed keys are unmounted and only
    /// new keys mounted — keys present before and after stay mounted
    /// continuously — the key set is replaced wholesale and the change
    /// notification fires exactly once.
    pub fn update_keys(&self) {
        let info = self.registry.local_info();

        let mut new_keys: HashMap<HashScheme, BTreeSet<CapsKey>> = HashMap::new();
        for scheme in HashScheme::PREFERENCE_ORDER {
            if self.scheme_enabled(scheme) {
                let key = compute_local_key(scheme, &info, &self.node_base);
                new_keys.entry(scheme).or_default().insert(key);
            }
        }

        let mut current = self.current_keys.lock();
        if *current == new_keys {
            debug!("advertised keys remained unchanged");
            return;
        }

        let old_all: BTreeSet<&CapsKey> = current.values().flatten().collect();
        let new_all: BTreeSet<&CapsKey> = new_keys.values().flatten().collect();

        for departed in old_all.difference(&new_all) {
            self.registry.unmount(departed.node());
        }
        for arrived in new_all.difference(&old_all) {
            debug!("advertising new key {arrived}");
            self.registry.mount(arrived.node(), info.clone());
        }

        *current = new_keys;
        drop(current);

        self.key_changes_tx.send_modify(|n| *n += 1);
    }

    /// Attach capability markers to outgoing available presence; other
    /// presence types pass through unchanged.
    pub fn handle_outbound_presence(
        &self,
        mut presence: Presence,
    ) -> Presence {
        if presence.type_ != PresenceType::Available {
            return presence;
        }

        let current = self.current_keys.lock();
        for scheme in HashScheme::PREFERENCE_ORDER {
            if let Some(keys) = current.get(&scheme) {
                presence.put_keys(keys.iter(), &self.node_base);
            }
        }
        presence
    }

    /// Extract candidate keys from inbound presence and, when any are
    /// claimed, kick off an asynchronous resolution whose handle is
    /// associated with the originating peer.
    pub fn handle_inbound_presence(
        self: &Arc<Self>,
        presence: &Presence,
    ) {
        let mut keys = Vec::new();
        for scheme in HashScheme::PREFERENCE_ORDER {
            if self.scheme_enabled(scheme) {
                keys.extend(presence.extract_keys(scheme));
            }
        }

        if keys.is_empty() {
            return;
        }

        let engine = Arc::clone(self);
        let peer = presence.from.clone();
        let task_peer = peer.clone();
        let task = tokio::spawn(async move { engine.lookup_info(&task_peer, keys).await });
        self.disco.set_info_future(&peer, task);
    }

    /// Resolve the peer's claimed capability keys to a feature description.
    ///
    /// Candidates are tried against the cache in preference order; the
    /// first hit (stored or settled by a concurrent lookup) wins without a
    /// network query. Only a total miss issues one live query for the
    /// highest-priority key, with the pending lookup registered so
    /// concurrent resolvers wait instead of re-querying.
    pub async fn lookup_info(
        &self,
        peer: &PeerId,
        keys: Vec<CapsKey>,
    ) -> Result<FeatureInfo> {
        for key in &keys {
            match self.cache.lookup(key).await {
                Ok(entry) => {
                    debug!("found {key} in cache");
                    return Ok(entry.info);
                }
                Err(Error::Cache(CacheError::NotFound(_))) => continue,
                Err(e) => return Err(e),
            }
        }

        let first_key = keys.into_iter().next().ok_or(CacheError::NoCandidateKeys)?;
        debug!("using key {first_key} to query peer {peer}");
        let guard = self.cache.create_query_future(first_key.clone());
        self.query_and_cache(peer, &first_key, guard).await
    }

    /// Issue the live feature query for `key`, verify the response against
    /// it and settle `guard` accordingly. A verified response is committed
    /// to the cache before waiters are woken; a hash mismatch fails the
    /// pending lookup so every concurrent waiter observes the failure.
    async fn query_and_cache(
        &self,
        peer: &PeerId,
        key: &CapsKey,
        guard: QueryGuard,
    ) -> Result<FeatureInfo> {
        let info = self.disco.query_info(peer, key.node(), true).await?;

        if !key.verify(&info) {
            warn!("peer {peer} returned info not matching {key}");
            guard.fail(format!("hash mismatch for {key}"));
            return Err(CacheError::VerificationFailed {
                node: key.node().to_string(),
            }
            .into());
        }

        let entry = CacheEntry::capture(&info)?;
        self.cache.add_entry(key.clone(), entry.clone());
        guard.complete(entry);
        Ok(info)
    }

    /// Tear down every advertised endpoint
    pub fn shutdown(&self) {
        let mut current = self.current_keys.lock();
        for key in current.values().flatten() {
            self.registry.unmount(key.node());
        }
        current.clear();
    }
}
