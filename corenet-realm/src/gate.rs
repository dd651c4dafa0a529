//! `RealmGate` (SPEC §4.8): maintains at-most-one active realm membership,
//! authenticates peers via `MembershipProof`, and gates application
//! protocols by realm scope.

use crate::error::RealmError;
use crate::proof::MembershipProof;
use crate::protocol::{namespace_app_protocol, relay_may_forward};
use corenet_crypto_kdf::{RealmId, RealmKey};
use corenet_identity::NodeId;
use std::time::SystemTime;
use tracing::info;

#[derive(Debug, Eq, PartialEq)]
pub enum MembershipState {
    NotMember,
    Joining,
    Member,
}

struct ActiveRealm {
    key: RealmKey,
    realm_id: RealmId,
    authenticated_peers: std::collections::HashSet<NodeId>,
}

/// Owns at most one active realm membership. `join`/`leave` are the only
/// mutating operations on membership state itself; authenticated-peer
/// tracking mutates underneath while a realm is active.
pub struct RealmGate {
    local_node_id: NodeId,
    active: Option<ActiveRealm>,
}

impl RealmGate {
    pub fn new(local_node_id: NodeId) -> Self {
        RealmGate {
            local_node_id,
            active: None,
        }
    }

    pub fn state(&self) -> MembershipState {
        match &self.active {
            None => MembershipState::NotMember,
            Some(_) => MembershipState::Member,
        }
    }

    pub fn realm_id(&self) -> Option<RealmId> {
        self.active.as_ref().map(|r| r.realm_id)
    }

    /// Joins the realm backed by `key`. Fails with `AlreadyInRealm` if a
    /// realm is already active — the caller must `leave` first.
    pub fn join(&mut self, key: RealmKey) -> Result<(), RealmError> {
        if self.active.is_some() {
            return Err(RealmError::AlreadyInRealm);
        }
        let realm_id = key.realm_id();
        self.active = Some(ActiveRealm {
            key,
            realm_id,
            authenticated_peers: Default::default(),
        });
        info!(%realm_id, "joined realm");
        Ok(())
    }

    pub fn leave(&mut self) {
        if let Some(realm) = self.active.take() {
            info!(realm_id = %realm.realm_id, "left realm");
        }
    }

    /// Issues a `MembershipProof` addressed to `peer`, to be presented when
    /// opening a stream or relay circuit in the active realm.
    pub fn issue_proof(&self, peer: NodeId, now: SystemTime) -> Result<MembershipProof, RealmError> {
        let realm = self.active.as_ref().ok_or(RealmError::NotMember)?;
        Ok(MembershipProof::issue(&realm.key, self.local_node_id, peer, now))
    }

    /// Authenticates an inbound peer by verifying its proof against the
    /// active realm key and the required peer binding (this node). On
    /// success, the peer is remembered as authenticated for this realm.
    pub fn authenticate(&mut self, proof: &MembershipProof, now: SystemTime) -> Result<(), RealmError> {
        let realm = self.active.as_mut().ok_or(RealmError::NotMember)?;
        proof.verify(&realm.key, self.local_node_id, now)?;
        realm.authenticated_peers.insert(proof.node_id);
        Ok(())
    }

    pub fn is_authenticated(&self, peer: &NodeId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|r| r.authenticated_peers.contains(peer))
    }

    pub fn forget_peer(&mut self, peer: &NodeId) {
        if let Some(realm) = &mut self.active {
            realm.authenticated_peers.remove(peer);
        }
    }

    /// Rewrites `user_proto` to this realm's namespaced wire identifier.
    pub fn namespace_protocol(&self, user_proto: &str) -> Result<String, RealmError> {
        let realm = self.active.as_ref().ok_or(RealmError::NotMember)?;
        namespace_app_protocol(&realm.realm_id, user_proto)
    }

    /// Whether a stream opened on `wire_proto` by `peer` should be
    /// dispatched: the peer must be authenticated in this realm (unless the
    /// protocol is a universal `/sys/*` one) and the protocol must belong
    /// to this realm's namespace.
    pub fn may_dispatch(&self, peer: &NodeId, wire_proto: &str) -> Result<(), RealmError> {
        let realm = self.active.as_ref().ok_or(RealmError::NotMember)?;
        if wire_proto.starts_with("/sys/") {
            return Ok(());
        }
        if !relay_may_forward(&realm.realm_id, wire_proto) {
            return Err(RealmError::ProtocolNotAllowed(wire_proto.to_string()));
        }
        if !realm.authenticated_peers.contains(peer) {
            return Err(RealmError::NotMember);
        }
        Ok(())
    }

    /// Whether a relay operating in this realm may forward a circuit
    /// carrying `wire_proto`, provided `initiator` has presented and passed
    /// `proof_check` (the caller is expected to have already verified the
    /// `MembershipProof` naming this realm and the circuit target).
    pub fn relay_forward_allowed(&self, wire_proto: &str, initiator_proof_valid: bool) -> Result<(), RealmError> {
        let realm = self.active.as_ref().ok_or(RealmError::NotMember)?;
        if !relay_may_forward(&realm.realm_id, wire_proto) {
            return Err(RealmError::ProtocolNotAllowed(wire_proto.to_string()));
        }
        if !initiator_proof_valid {
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
    fn join_then_join_again_fails() {
        let mut gate = RealmGate::new(node_id());
        gate.join(RealmKey::from_bytes([1u8; 32])).unwrap();
        assert!(matches!(gate.join(RealmKey::from_bytes([2u8; 32])), Err(RealmError::AlreadyInRealm)));
    }

    #[test]
    fn leave_then_join_succeeds() {
        let mut gate = RealmGate::new(node_id());
        gate.join(RealmKey::from_bytes([1u8; 32])).unwrap();
        gate.leave();
        assert_eq!(gate.state(), MembershipState::NotMember);
        assert!(gate.join(RealmKey::from_bytes([2u8; 32])).is_ok());
    }

    #[test]
    fn authenticate_with_valid_proof_marks_peer_authenticated() {
        let local = node_id();
        let mut gate = RealmGate::new(local);
        let key = RealmKey::from_bytes([1u8; 32]);
        gate.join(key.clone()).unwrap();

        let remote = node_id();
        let now = SystemTime::now();
        let proof = MembershipProof::issue(&key, remote, local, now);

        assert!(!gate.is_authenticated(&remote));
        gate.authenticate(&proof, now).unwrap();
        assert!(gate.is_authenticated(&remote));
    }

    #[test]
    fn authenticate_with_wrong_key_fails() {
        let local = node_id();
        let mut gate = RealmGate::new(local);
        gate.join(RealmKey::from_bytes([1u8; 32])).unwrap();

        let remote = node_id();
        let now = SystemTime::now();
        let wrong_key = RealmKey::from_bytes([2u8; 32]);
        let proof = MembershipProof::issue(&wrong_key, remote, local, now);

        assert!(matches!(gate.authenticate(&proof, now), Err(RealmError::AuthFailed)));
    }

    #[test]
    fn namespace_and_dispatch_round_trip() {
        let local = node_id();
        let remote = node_id();
        let mut gate = RealmGate::new(local);
        let key = RealmKey::from_bytes([1u8; 32]);
        gate.join(key.clone()).unwrap();

        let wire = gate.namespace_protocol("chat/1.0").unwrap();
        let now = SystemTime::now();
        let proof = MembershipProof::issue(&key, remote, local, now);
        gate.authenticate(&proof, now).unwrap();

        assert!(gate.may_dispatch(&remote, &wire).is_ok());

        let other = node_id();
        assert!(matches!(gate.may_dispatch(&other, &wire), Err(RealmError::NotMember)));
    }

    #[test]
    fn sys_protocols_dispatch_without_authentication() {
        let local = node_id();
        let mut gate = RealmGate::new(local);
        gate.join(RealmKey::from_bytes([1u8; 32])).unwrap();
        assert!(gate.may_dispatch(&node_id(), "/sys/dht/1.0").is_ok());
    }
}
