//! `MembershipProof` (SPEC §3): a short-lived MAC proving the issuer knows
//! a realm's pre-shared key and intends to talk to a specific peer.

use crate::error::RealmError;
use corenet_crypto_kdf::{RealmId, RealmKey};
use corenet_identity::NodeId;
use rand::RngCore;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Proofs older than this (or more than this far in the future, to tolerate
/// clock skew) are rejected (SPEC §3 "valid for a 5-minute window").
pub const PROOF_VALIDITY_WINDOW: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MembershipProof {
    pub node_id: NodeId,
    pub realm_id: RealmId,
    pub peer_id: NodeId,
    pub nonce: [u8; 16],
    pub timestamp: i64,
    pub mac: [u8; 32],
}

impl std::fmt::Debug for MembershipProof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipProof")
            .field("node_id", &self.node_id)
            .field("realm_id", &self.realm_id)
            .field("peer_id", &self.peer_id)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

fn canonical_message(node_id: &NodeId, realm_id: &RealmId, peer_id: &NodeId, nonce: &[u8; 16], timestamp: i64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32 + 32 + 32 + 16 + 8);
    buf.extend_from_slice(node_id.as_bytes());
    buf.extend_from_slice(realm_id.as_bytes());
    buf.extend_from_slice(peer_id.as_bytes());
    buf.extend_from_slice(nonce);
    buf.extend_from_slice(&timestamp.to_be_bytes());
    buf
}

impl MembershipProof {
    /// Issues a fresh proof asserting that `issuer` is a member of the realm
    /// backed by `key` and intends to communicate with `peer_id`.
    pub fn issue(key: &RealmKey, issuer: NodeId, peer_id: NodeId, now: SystemTime) -> Self {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);
        let timestamp = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64;
        let realm_id = key.realm_id();
        let message = canonical_message(&issuer, &realm_id, &peer_id, &nonce, timestamp);
        let mac = key.compute_membership_mac(&message);
        MembershipProof {
            node_id: issuer,
            realm_id,
            peer_id,
            nonce,
            timestamp,
            mac,
        }
    }

    /// Recomputes the MAC with `key` and checks freshness and the peer
    /// binding (SPEC §4.8 "Recompute the MAC with the local realm key;
    /// reject if mismatched").
    pub fn verify(&self, key: &RealmKey, expected_peer: NodeId, now: SystemTime) -> Result<(), RealmError> {
        if self.peer_id != expected_peer {
            return Err(RealmError::ProofNotBoundToPeer);
        }

        let now_secs = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64;
        let age = now_secs - self.timestamp;
        if age.unsigned_abs() > PROOF_VALIDITY_WINDOW.as_secs() {
            return Err(RealmError::ProofExpired);
        }

        let message = canonical_message(&self.node_id, &self.realm_id, &self.peer_id, &self.nonce, self.timestamp);
        if !key.verify_membership_mac(&message, &self.mac) {
            return Err(RealmError::AuthFailed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corenet_crypto_keys::Ed25519Pair;

    fn node_id() -> NodeId {
        NodeId::from_public_key(&Ed25519Pair::generate().public_key())
    }

    #[test]
    fn issue_then_verify_with_same_key_succeeds() {
        let key = RealmKey::from_bytes([1u8; 32]);
        let issuer = node_id();
        let peer = node_id();
        let now = SystemTime::now();
        let proof = MembershipProof::issue(&key, issuer, peer, now);
        assert!(proof.verify(&key, peer, now).is_ok());
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let key = RealmKey::from_bytes([1u8; 32]);
        let other = RealmKey::from_bytes([2u8; 32]);
        let issuer = node_id();
        let peer = node_id();
        let now = SystemTime::now();
        let proof = MembershipProof::issue(&key, issuer, peer, now);
        assert!(matches!(proof.verify(&other, peer, now), Err(RealmError::AuthFailed)));
    }

    #[test]
    fn verify_rejects_wrong_peer_binding() {
        let key = RealmKey::from_bytes([1u8; 32]);
        let issuer = node_id();
        let peer = node_id();
        let other_peer = node_id();
        let now = SystemTime::now();
        let proof = MembershipProof::issue(&key, issuer, peer, now);
        assert!(matches!(
            proof.verify(&key, other_peer, now),
            Err(RealmError::ProofNotBoundToPeer)
        ));
    }

    #[test]
    fn verify_rejects_expired_proof() {
        let key = RealmKey::from_bytes([1u8; 32]);
        let issuer = node_id();
        let peer = node_id();
        let issued_at = SystemTime::now() - Duration::from_secs(10 * 60);
        let proof = MembershipProof::issue(&key, issuer, peer, issued_at);
        assert!(matches!(proof.verify(&key, peer, SystemTime::now()), Err(RealmError::ProofExpired)));
    }
}
