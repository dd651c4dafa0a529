//! Key derivation for realm-scoped secrets.
//!
//! `RealmKey` is a 32-byte pre-shared secret; everything a realm needs
//! (its public `RealmID`, and the MAC key backing `MembershipProof`) is
//! derived from it via HKDF-SHA256 with a fixed, versioned salt/info
//! string, never used directly as a MAC or signing key.

use displaydoc::Display;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

const REALM_ID_INFO: &[u8] = b"realm-id-v1";
const REALM_MEMBERSHIP_INFO: &[u8] = b"realm-membership-v1";

#[derive(Debug, Display)]
pub enum KdfError {
    /// HKDF output length was rejected by the underlying implementation
    ExpansionFailed,
}

impl std::error::Error for KdfError {}

/// A 32-byte, high-entropy, out-of-band-shared realm secret.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RealmKey([u8; 32]);

/// The public identifier derived from a [`RealmKey`]; safe to share,
/// does not allow joining the realm.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct RealmId([u8; 32]);

impl RealmKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        RealmKey(bytes)
    }

    /// Derives the public `RealmID` for this key: `HKDF(realmKey, "realm-id-v1")`.
    pub fn realm_id(&self) -> RealmId {
        let hk = Hkdf::<Sha256>::new(None, &self.0);
        let mut out = [0u8; 32];
        // A 32-byte okm from HKDF-SHA256 never exceeds the 255*32 byte
        // limit, so this cannot fail in practice.
        hk.expand(REALM_ID_INFO, &mut out)
            .expect("32-byte HKDF expansion always succeeds");
        RealmId(out)
    }

    /// Derives the HMAC key backing [`MembershipProof`]-style MACs:
    /// `HKDF(realmKey, "realm-membership-v1")`.
    fn membership_mac_key(&self) -> [u8; 32] {
        let hk = Hkdf::<Sha256>::new(None, &self.0);
        let mut out = [0u8; 32];
        hk.expand(REALM_MEMBERSHIP_INFO, &mut out)
            .expect("32-byte HKDF expansion always succeeds");
        out
    }

    /// Computes `HMAC-SHA256(membership_mac_key, message)` over the caller's
    /// canonical encoding of `(nodeID, realmID, peerID, nonce, timestamp)`.
    pub fn compute_membership_mac(&self, message: &[u8]) -> [u8; 32] {
        let mut key = self.membership_mac_key();
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&key).expect("HMAC accepts any key length");
        key.zeroize();
        mac.update(message);
        let result = mac.finalize().into_bytes();
        let mut out = [0u8; 32];
        out.copy_from_slice(&result);
        out
    }

    /// Constant-time verification of a previously computed membership MAC.
    pub fn verify_membership_mac(&self, message: &[u8], mac: &[u8; 32]) -> bool {
        let expected = self.compute_membership_mac(message);
        expected.ct_eq(mac).into()
    }
}

impl RealmId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for RealmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RealmId({})", self.to_hex())
    }
}

impl std::fmt::Display for RealmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realm_id_is_deterministic() {
        let key = RealmKey::from_bytes([7u8; 32]);
        assert_eq!(key.realm_id().as_bytes(), key.realm_id().as_bytes());
    }

    #[test]
    fn different_keys_yield_different_realm_ids() {
        let a = RealmKey::from_bytes([1u8; 32]);
        let b = RealmKey::from_bytes([2u8; 32]);
        assert_ne!(a.realm_id().as_bytes(), b.realm_id().as_bytes());
    }

    #[test]
    fn membership_mac_round_trips() {
        let key = RealmKey::from_bytes([9u8; 32]);
        let msg = b"nodeA|realm1|nodeB|nonce|1234";
        let mac = key.compute_membership_mac(msg);
        assert!(key.verify_membership_mac(msg, &mac));
    }

    #[test]
    fn membership_mac_rejects_wrong_key() {
        let a = RealmKey::from_bytes([1u8; 32]);
        let b = RealmKey::from_bytes([2u8; 32]);
        let msg = b"nodeA|realm1|nodeB|nonce|1234";
        let mac = a.compute_membership_mac(msg);
        assert!(!b.verify_membership_mac(msg, &mac));
    }

    #[test]
    fn membership_mac_rejects_tampered_message() {
        let key = RealmKey::from_bytes([3u8; 32]);
        let mac = key.compute_membership_mac(b"original");
        assert!(!key.verify_membership_mac(b"tampered", &mac));
    }
}
