//! Bounded local record store (SPEC §4.3 "Local store bounding & eviction").
//! Eviction removes the least-recently-verified entry that is not in the
//! caller-supplied protected set (the active connection table); it never
//! evicts a record seq-regresses would otherwise silently drop.

use crate::record::SignedPeerRecord;
use corenet_identity::NodeId;
use std::collections::HashMap;

struct Entry {
    record: SignedPeerRecord,
    last_verified_at: i64,
}

pub struct RecordStore {
    capacity: usize,
    entries: HashMap<NodeId, Entry>,
}

impl RecordStore {
    pub fn new(capacity: usize) -> Self {
        RecordStore {
            capacity,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, node_id: &NodeId) -> Option<&SignedPeerRecord> {
        self.entries.get(node_id).map(|e| &e.record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts `record` if it strictly advances (or matches) the stored
    /// sequence number (SPEC §3 SignedPeerRecord invariant, §8 property 3).
    /// Returns `true` if the store was updated.
    pub fn upsert(&mut self, record: SignedPeerRecord, now_unix_secs: i64, protected: &dyn Fn(&NodeId) -> bool) -> bool {
        if let Some(existing) = self.entries.get(&record.node_id) {
            if record.seq < existing.record.seq {
                return false;
            }
            if record.seq == existing.record.seq && record.to_wire_bytes() == existing.record.to_wire_bytes() {
                return false;
            }
        } else if self.entries.len() >= self.capacity {
            if !self.evict_one(protected) {
                return false;
            }
        }

        self.entries.insert(
            record.node_id,
            Entry {
                record,
                last_verified_at: now_unix_secs,
            },
        );
        true
    }

    fn evict_one(&mut self, protected: &dyn Fn(&NodeId) -> bool) -> bool {
        let victim = self
            .entries
            .iter()
            .filter(|(id, _)| !protected(id))
            .min_by_key(|(_, entry)| entry.last_verified_at)
            .map(|(id, _)| *id);

        match victim {
            Some(id) => {
                self.entries.remove(&id);
                true
            }
            None => false,
        }
    }

    pub fn remove_expired(&mut self, now_unix_secs: i64) {
        self.entries.retain(|_, e| !e.record.is_expired(now_unix_secs));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AddressEntry, MIN_TTL};
    use corenet_address::{AddressCategory, DialAddress, Host, Transport};
    use corenet_identity::Identity;

    fn record_for(identity: &Identity, seq: u64, now: i64) -> SignedPeerRecord {
        let addrs = vec![AddressEntry {
            dial: DialAddress::new(Transport::QuicV1, Host::Ip4("127.0.0.1".parse().unwrap()), 4001),
            category: AddressCategory::Direct,
        }];
        SignedPeerRecord::sign(identity, addrs, seq, MIN_TTL, now)
    }

    #[test]
    fn upsert_rejects_stale_sequence() {
        let identity = Identity::generate();
        let mut store = RecordStore::new(10);
        assert!(store.upsert(record_for(&identity, 5, 100), 100, &|_| false));
        assert!(!store.upsert(record_for(&identity, 4, 101), 101, &|_| false));
        assert_eq!(store.get(&identity.node_id()).unwrap().seq, 5);
    }

    #[test]
    fn upsert_accepts_advancing_sequence() {
        let identity = Identity::generate();
        let mut store = RecordStore::new(10);
        store.upsert(record_for(&identity, 5, 100), 100, &|_| false);
        assert!(store.upsert(record_for(&identity, 6, 101), 101, &|_| false));
        assert_eq!(store.get(&identity.node_id()).unwrap().seq, 6);
    }

    #[test]
    fn eviction_skips_protected_entries() {
        let mut store = RecordStore::new(1);
        let protected_identity = Identity::generate();
        let other_identity = Identity::generate();
        store.upsert(record_for(&protected_identity, 1, 100), 100, &|_| false);

        let protected_id = protected_identity.node_id();
        let inserted = store.upsert(record_for(&other_identity, 1, 100), 100, &move |id| *id == protected_id);
        // capacity is 1 and the only existing entry is protected, so there is
        // nothing to evict and the new record is dropped.
        assert!(!inserted);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_expired_drops_past_ttl() {
        let identity = Identity::generate();
        let mut store = RecordStore::new(10);
        let record = record_for(&identity, 1, 100);
        let expires_at = record.expires_at();
        store.upsert(record, 100, &|_| false);
        store.remove_expired(expires_at + 1);
        assert!(store.is_empty());
    }
}
