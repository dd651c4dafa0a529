//! An authoritative, signed, distributed NodeID → [`SignedPeerRecord`]
//! mapping over a Kademlia-style overlay (SPEC §4.3), plus the bounded local
//! caches that make lookups for recently-seen peers cheap.
//!
//! Network RPC (the actual `/sys/dht/1.0` wire protocol) is abstracted
//! behind [`DirectoryRpc`] so this crate can be exercised with an in-process
//! fake in tests, and wired to `corenet-transport` streams by the node
//! facade.

mod config;
mod error;
mod record;
mod routing;
mod store;

pub use config::{DirectoryConfig, DirectoryConfigBuilder};
pub use error::DirectoryError;
pub use record::{AddressEntry, SignedPeerRecord, CLOCK_SKEW_TOLERANCE_SECS, MAX_TTL, MIN_TTL};
pub use routing::{ALPHA, K_BUCKET_SIZE};

use corenet_crypto_keys::Ed25519Public;
use corenet_identity::{Identity, NodeId};
use parking_lot::Mutex;
use routing::RoutingTable;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use store::RecordStore;
use tracing::{debug, trace, warn};

/// The network operations a live node performs on behalf of the directory.
/// Implementations own the actual `/sys/dht/1.0` wire protocol over
/// `corenet-transport` connections; this crate only drives the algorithm.
pub trait DirectoryRpc: Send + Sync {
    fn find_node(
        &self,
        peer: NodeId,
        target: NodeId,
    ) -> impl Future<Output = Result<Vec<NodeId>, DirectoryError>> + Send;

    fn get_record(
        &self,
        peer: NodeId,
        target: NodeId,
    ) -> impl Future<Output = Result<Option<(SignedPeerRecord, Ed25519Public)>, DirectoryError>> + Send;

    fn put_record(
        &self,
        peer: NodeId,
        record: SignedPeerRecord,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;
}

/// Key-scope for a record lookup: the global node keyspace, or a
/// realm-scoped keyspace identified by `hash(RealmID)` (SPEC §4.3 key
/// schemas). This crate treats the realm hash as an opaque 32-byte key; the
/// `corenet-realm` crate owns computing it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Scope {
    Node,
    Realm([u8; 32]),
}

pub struct PeerDirectory {
    identity: Arc<Identity>,
    config: DirectoryConfig,
    routing: Mutex<RoutingTable>,
    node_store: Mutex<RecordStore>,
    realm_stores: Mutex<HashMap<[u8; 32], RecordStore>>,
    relay_address_book: Mutex<RecordStore>,
    signer_keys: Mutex<HashMap<NodeId, Ed25519Public>>,
    own_seq: AtomicU64,
    last_published_at: AtomicI64,
}

impl PeerDirectory {
    pub fn new(identity: Arc<Identity>, config: DirectoryConfig) -> Self {
        let local_id = identity.node_id();
        PeerDirectory {
            routing: Mutex::new(RoutingTable::new(local_id)),
            node_store: Mutex::new(RecordStore::new(config.local_cache_capacity)),
            realm_stores: Mutex::new(HashMap::new()),
            relay_address_book: Mutex::new(RecordStore::new(config.local_cache_capacity)),
            signer_keys: Mutex::new(HashMap::new()),
            own_seq: AtomicU64::new(0),
            last_published_at: AtomicI64::new(0),
            identity,
            config,
        }
    }

    pub fn local_node_id(&self) -> NodeId {
        self.identity.node_id()
    }

    /// Records a sighting of `peer` in the routing table; called whenever a
    /// connection is established or a DHT response names a peer.
    pub fn observe_peer(&self, peer: NodeId) {
        self.routing.lock().observe(peer);
    }

    pub fn forget_peer(&self, peer: &NodeId) {
        self.routing.lock().remove(peer);
    }

    pub fn routing_table_len(&self) -> usize {
        self.routing.lock().len()
    }

    /// Up to `count` routing-table peers closest to `target`, for serving
    /// `FIND_NODE` requests over the wire.
    pub fn closest_peers(&self, target: &NodeId, count: usize) -> Vec<NodeId> {
        self.routing.lock().closest(target, count)
    }

    /// The locally cached node-scoped record for `target`, paired with the
    /// signer's public key, for serving `GET_RECORD` requests over the wire.
    pub fn get_local_record(&self, target: &NodeId) -> Option<(SignedPeerRecord, Ed25519Public)> {
        let record = self.node_store.lock().get(target)?.clone();
        let signer = *self.signer_keys.lock().get(target)?;
        Some((record, signer))
    }

    /// Builds, signs, and locally stores a fresh record for this node's own
    /// identity (SPEC §4.3 "Self-PUT only"). The caller is responsible for
    /// replicating it to the k closest peers via [`Self::replicate`].
    pub fn sign_own_record(
        &self,
        addrs: Vec<AddressEntry>,
        ttl: std::time::Duration,
        now_unix_secs: i64,
    ) -> SignedPeerRecord {
        let seq = self.own_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let record = SignedPeerRecord::sign(&self.identity, addrs, seq, ttl, now_unix_secs);
        self.node_store
            .lock()
            .upsert(record.clone(), now_unix_secs, &|id| *id == self.local_node_id());
        self.signer_keys
            .lock()
            .insert(self.local_node_id(), self.identity.public_key());
        self.last_published_at.store(now_unix_secs, Ordering::SeqCst);
        record
    }

    pub fn republish_due(&self, now_unix_secs: i64) -> bool {
        let last = self.last_published_at.load(Ordering::SeqCst);
        now_unix_secs - last >= self.config.republish_interval.as_secs() as i64
    }

    /// Replicates `record` to the `k` routing-table peers closest to its
    /// subject, via `rpc`. Individual failures are logged and do not abort
    /// the remaining replicas (SPEC §7 "Path failure ... recovered locally").
    pub async fn replicate<R: DirectoryRpc>(&self, rpc: &R, record: &SignedPeerRecord) {
        let targets = self.routing.lock().closest(&record.node_id, self.config.k_replication);
        for peer in targets {
            if let Err(err) = rpc.put_record(peer, record.clone()).await {
                warn!(%peer, %err, "replication PUT failed");
            }
        }
    }

    /// Accepts a record pushed by another node (the PUT side of the wire
    /// protocol). Verifies signature, subject/signer match, clock skew, and
    /// sequence monotonicity before storing (SPEC §4.3 write protocol,
    /// anti-poisoning invariants).
    pub fn accept_pushed_record(
        &self,
        record: SignedPeerRecord,
        signer: &Ed25519Public,
        scope: Scope,
        now_unix_secs: i64,
    ) -> Result<(), DirectoryError> {
        record.validate(signer, now_unix_secs)?;
        let node_id = record.node_id;
        self.store_for_scope(scope, |store| {
            if store.upsert(record.clone(), now_unix_secs, &|id| *id == self.local_node_id()) {
                Ok(())
            } else {
                Err(DirectoryError::StaleSequence {
                    incoming: record.seq,
                    stored: store.get(&record.node_id).map(|r| r.seq).unwrap_or_default(),
                })
            }
        })?;
        self.signer_keys.lock().insert(node_id, *signer);
        Ok(())
    }

    fn store_for_scope<T>(&self, scope: Scope, f: impl FnOnce(&mut RecordStore) -> T) -> T {
        match scope {
            Scope::Node => f(&mut self.node_store.lock()),
            Scope::Realm(hash) => {
                let mut stores = self.realm_stores.lock();
                let store = stores
                    .entry(hash)
                    .or_insert_with(|| RecordStore::new(self.config.local_cache_capacity));
                f(store)
            }
        }
    }

    /// Step 4 of address resolution: records learned from a relay's
    /// non-authoritative address book. Never promoted into the authoritative
    /// store (SPEC §9 open question, resolved: never promoted).
    pub fn record_relay_hint(&self, record: SignedPeerRecord, now_unix_secs: i64) {
        self.relay_address_book
            .lock()
            .upsert(record, now_unix_secs, &|_| false);
    }

    /// The synchronous, network-free part of address resolution (SPEC
    /// §4.3 priority chain, steps 1, 2 and 4; step 3 is [`Self::lookup`]).
    pub fn resolve_local(&self, target: &NodeId, realm_scope: Option<[u8; 32]>) -> Option<Vec<AddressEntry>> {
        if let Some(record) = self.node_store.lock().get(target) {
            return Some(record.addrs.clone());
        }
        if let Some(hash) = realm_scope {
            if let Some(store) = self.realm_stores.lock().get(&hash) {
                if let Some(record) = store.get(target) {
                    return Some(record.addrs.clone());
                }
            }
        }
        if let Some(record) = self.relay_address_book.lock().get(target) {
            return Some(record.addrs.clone());
        }
        None
    }

    /// Step 3 (authoritative): an iterative Kademlia lookup against the
    /// network. Every candidate record is signature-verified before being
    /// considered (SPEC §4.3 read protocol); invalid records are dropped
    /// silently and never surface as an error to the caller.
    pub async fn lookup<R: DirectoryRpc>(
        &self,
        rpc: &R,
        target: NodeId,
        now_unix_secs: i64,
    ) -> Result<SignedPeerRecord, DirectoryError> {
        if let Some(record) = self.node_store.lock().get(&target) {
            return Ok(record.clone());
        }

        let mut queried = std::collections::HashSet::new();
        let mut frontier = self.routing.lock().closest(&target, self.config.k_replication);
        let mut best: Option<SignedPeerRecord> = None;

        while !frontier.is_empty() {
            let batch: Vec<NodeId> = frontier
                .iter()
                .filter(|p| !queried.contains(*p))
                .take(self.config.alpha_parallelism)
                .copied()
                .collect();
            if batch.is_empty() {
                break;
            }
            for peer in &batch {
                queried.insert(*peer);
            }

            for peer in batch {
                match rpc.get_record(peer, target).await {
                    Ok(Some((record, signer))) => {
                        if record.validate(&signer, now_unix_secs).is_ok() {
                            self.observe_peer(peer);
                            let better = best
                                .as_ref()
                                .map(|b| record.seq > b.seq)
                                .unwrap_or(true);
                            if better {
                                best = Some(record);
                            }
                        } else {
                            trace!(%peer, "dropped invalid DHT record");
                        }
                    }
                    Ok(None) => {
                        if let Ok(closer) = rpc.find_node(peer, target).await {
                            for candidate in closer {
                                if !queried.contains(&candidate) && !frontier.contains(&candidate) {
                                    frontier.push(candidate);
                                }
                            }
                        }
                    }
                    Err(err) => debug!(%peer, %err, "DHT query failed, continuing with remaining peers"),
                }
            }

            frontier.sort_by_key(|p| p.xor_distance(&target));
            frontier.truncate(self.config.k_replication);
        }

        let record = best.ok_or(DirectoryError::NotFound)?;
        self.node_store
            .lock()
            .upsert(record.clone(), now_unix_secs, &|id| *id == self.local_node_id());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corenet_address::{DialAddress, Host, Transport};
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex as StdMutex;

    fn address_entry(port: u16) -> AddressEntry {
        AddressEntry {
            dial: DialAddress::new(Transport::QuicV1, Host::Ip4("127.0.0.1".parse().unwrap()), port),
            category: corenet_address::AddressCategory::Direct,
        }
    }

    struct FakeNetwork {
        records: StdMutex<StdHashMap<NodeId, (SignedPeerRecord, Ed25519Public)>>,
    }

    impl DirectoryRpc for FakeNetwork {
        async fn find_node(&self, _peer: NodeId, _target: NodeId) -> Result<Vec<NodeId>, DirectoryError> {
            Ok(Vec::new())
        }

        async fn get_record(
            &self,
            _peer: NodeId,
            target: NodeId,
        ) -> Result<Option<(SignedPeerRecord, Ed25519Public)>, DirectoryError> {
            Ok(self.records.lock().unwrap().get(&target).cloned())
        }

        async fn put_record(&self, _peer: NodeId, record: SignedPeerRecord) -> Result<(), DirectoryError> {
            self.records
                .lock()
                .unwrap()
                .entry(record.node_id)
                .and_modify(|(existing, _)| {
                    if record.seq >= existing.seq {
                        *existing = record.clone();
                    }
                })
                .or_insert_with(|| panic!("put_record for unknown signer in test fake"));
            Ok(())
        }
    }

    #[test]
    fn sign_own_record_increments_sequence() {
        let identity = Arc::new(Identity::generate());
        let directory = PeerDirectory::new(identity, DirectoryConfig::default());
        let first = directory.sign_own_record(vec![address_entry(4001)], MIN_TTL, 1_000_000);
        let second = directory.sign_own_record(vec![address_entry(4002)], MIN_TTL, 1_000_100);
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
    }

    #[test]
    fn accept_pushed_record_rejects_stale_sequence() {
        let owner = Identity::generate();
        let directory = PeerDirectory::new(Arc::new(Identity::generate()), DirectoryConfig::default());

        let newer = SignedPeerRecord::sign(&owner, vec![address_entry(4001)], 5, MIN_TTL, 1_000_000);
        directory
            .accept_pushed_record(newer, &owner.public_key(), Scope::Node, 1_000_000)
            .unwrap();

        let older = SignedPeerRecord::sign(&owner, vec![address_entry(4002)], 4, MIN_TTL, 1_000_050);
        let result = directory.accept_pushed_record(older, &owner.public_key(), Scope::Node, 1_000_050);
        assert!(matches!(result, Err(DirectoryError::StaleSequence { .. })));
    }

    #[test]
    fn accept_pushed_record_rejects_signer_mismatch() {
        let owner = Identity::generate();
        let impostor = Identity::generate();
        let directory = PeerDirectory::new(Arc::new(Identity::generate()), DirectoryConfig::default());

        let record = SignedPeerRecord::sign(&owner, vec![address_entry(4001)], 1, MIN_TTL, 1_000_000);
        let result = directory.accept_pushed_record(record, &impostor.public_key(), Scope::Node, 1_000_000);
        assert!(matches!(result, Err(DirectoryError::NodeIdMismatch { .. })));
    }

    #[test]
    fn resolve_local_checks_node_store_then_relay_book() {
        let directory = PeerDirectory::new(Arc::new(Identity::generate()), DirectoryConfig::default());
        let owner = Identity::generate();
        let record = SignedPeerRecord::sign(&owner, vec![address_entry(9000)], 1, MIN_TTL, 1_000_000);

        assert!(directory.resolve_local(&owner.node_id(), None).is_none());
        directory.record_relay_hint(record.clone(), 1_000_000);
        assert!(directory.resolve_local(&owner.node_id(), None).is_some());
    }

    #[tokio::test]
    async fn lookup_falls_back_to_network_when_not_cached() {
        let local = Arc::new(Identity::generate());
        let directory = PeerDirectory::new(local.clone(), DirectoryConfig::default());

        let owner = Identity::generate();
        let record = SignedPeerRecord::sign(&owner, vec![address_entry(4001)], 3, MIN_TTL, 1_000_000);

        directory.observe_peer(owner.node_id());

        let mut records = StdHashMap::new();
        records.insert(owner.node_id(), (record.clone(), owner.public_key()));
        let network = FakeNetwork {
            records: StdMutex::new(records),
        };

        let found = directory.lookup(&network, owner.node_id(), 1_000_000).await.unwrap();
        assert_eq!(found.node_id, owner.node_id());
        assert_eq!(found.seq, 3);
    }
}
