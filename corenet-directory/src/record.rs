//! [`SignedPeerRecord`]: the authoritative unit of peer information (SPEC §3,
//! wire encoding in §6). Canonical form sorts addresses lexicographically by
//! their textual rendering before signing, so two records carrying the same
//! address set in different orders produce the same signature.

use crate::error::DirectoryError;
use corenet_address::{AddressCategory, DialAddress};
use corenet_crypto_keys::{Ed25519Public, Ed25519Signature};
use corenet_identity::{Identity, NodeId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MIN_TTL: Duration = Duration::from_secs(30 * 60);
pub const MAX_TTL: Duration = Duration::from_secs(4 * 60 * 60);
pub const CLOCK_SKEW_TOLERANCE_SECS: i64 = 30;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AddressEntry {
    pub dial: DialAddress,
    pub category: AddressCategory,
}

/// A versioned, self-signed advertisement of a node's reachable addresses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedPeerRecord {
    pub node_id: NodeId,
    pub addrs: Vec<AddressEntry>,
    pub seq: u64,
    pub ttl_secs: u32,
    pub timestamp: i64,
    pub signature: Ed25519Signature,
}

impl SignedPeerRecord {
    /// Builds and signs a new record for `identity`'s own NodeID.
    pub fn sign(
        identity: &Identity,
        mut addrs: Vec<AddressEntry>,
        seq: u64,
        ttl: Duration,
        now_unix_secs: i64,
    ) -> Self {
        addrs.sort_by(|a, b| a.dial.to_string().cmp(&b.dial.to_string()));
        let ttl_secs = ttl.clamp(MIN_TTL, MAX_TTL).as_secs() as u32;
        let mut record = SignedPeerRecord {
            node_id: identity.node_id(),
            addrs,
            seq,
            ttl_secs,
            timestamp: now_unix_secs,
            signature: identity.sign(&[]),
        };
        let signature = identity.sign(&record.signing_bytes());
        record.signature = signature;
        record
    }

    /// Canonical byte form signed over: everything except the signature
    /// itself, with addresses already sorted by [`Self::sign`].
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(self.node_id.as_bytes());
        buf.extend_from_slice(&self.seq.to_be_bytes());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(&self.ttl_secs.to_be_bytes());
        buf.extend_from_slice(&(self.addrs.len() as u16).to_be_bytes());
        for entry in &self.addrs {
            let text = entry.dial.to_string();
            buf.extend_from_slice(&(text.len() as u16).to_be_bytes());
            buf.extend_from_slice(text.as_bytes());
            buf.push(match entry.category {
                AddressCategory::Direct => 0,
                AddressCategory::RelayCircuit => 1,
                AddressCategory::Candidate => 2,
            });
        }
        buf
    }

    /// Verifies the embedded signature under `signer`. Callers MUST also
    /// confirm `NodeId::from_public_key(signer) == self.node_id` — this
    /// method only checks the cryptographic signature.
    pub fn verify(&self, signer: &Ed25519Public) -> Result<(), DirectoryError> {
        signer
            .verify(&self.signing_bytes(), &self.signature)
            .map_err(|_| DirectoryError::InvalidSignature)
    }

    /// Full acceptance check for a record handed to us by a peer: signature,
    /// subject/signer match, and clock-skew window (SPEC §4.3, §8 property 3).
    pub fn validate(&self, signer: &Ed25519Public, now_unix_secs: i64) -> Result<(), DirectoryError> {
        let signer_id = NodeId::from_public_key(signer);
        if signer_id != self.node_id {
            return Err(DirectoryError::NodeIdMismatch {
                record_id: self.node_id,
                signer_id,
            });
        }
        self.verify(signer)?;
        if self.timestamp > now_unix_secs + CLOCK_SKEW_TOLERANCE_SECS {
            return Err(DirectoryError::TimestampOutOfWindow);
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs as u64)
    }

    pub fn expires_at(&self) -> i64 {
        self.timestamp + self.ttl_secs as i64
    }

    pub fn is_expired(&self, now_unix_secs: i64) -> bool {
        now_unix_secs >= self.expires_at()
    }

    /// Length-prefixed binary wire encoding (SPEC §6).
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(self.node_id.as_bytes());
        buf.extend_from_slice(&self.seq.to_be_bytes());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(&self.ttl_secs.to_be_bytes());
        buf.extend_from_slice(&(self.addrs.len() as u16).to_be_bytes());
        for entry in &self.addrs {
            let text = entry.dial.to_string();
            buf.extend_from_slice(&(text.len() as u16).to_be_bytes());
            buf.extend_from_slice(text.as_bytes());
            buf.push(match entry.category {
                AddressCategory::Direct => 0,
                AddressCategory::RelayCircuit => 1,
                AddressCategory::Candidate => 2,
            });
        }
        buf.extend_from_slice(&self.signature.to_bytes());
        buf
    }

    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self, DirectoryError> {
        let mut cursor = Cursor::new(bytes);
        let node_id = NodeId::from_bytes(cursor.take_array::<32>()?);
        let seq = u64::from_be_bytes(cursor.take_array::<8>()?);
        let timestamp = i64::from_be_bytes(cursor.take_array::<8>()?);
        let ttl_secs = u32::from_be_bytes(cursor.take_array::<4>()?);
        let count = u16::from_be_bytes(cursor.take_array::<2>()?);

        let mut addrs = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let len = u16::from_be_bytes(cursor.take_array::<2>()?) as usize;
            let text = String::from_utf8(cursor.take_slice(len)?.to_vec())
                .map_err(|e| DirectoryError::Codec(e.to_string()))?;
            let dial: DialAddress = text
                .parse()
                .map_err(|e: corenet_address::AddressParseError| DirectoryError::Codec(e.to_string()))?;
            let category = match cursor.take_slice(1)?[0] {
                0 => AddressCategory::Direct,
                1 => AddressCategory::RelayCircuit,
                2 => AddressCategory::Candidate,
                other => return Err(DirectoryError::Codec(format!("unknown category tag {other}"))),
            };
            addrs.push(AddressEntry { dial, category });
        }

        let signature_bytes = cursor.take_slice(64)?;
        let signature = Ed25519Signature::try_from(signature_bytes)
            .map_err(|e| DirectoryError::Codec(e.to_string()))?;

        Ok(SignedPeerRecord {
            node_id,
            addrs,
            seq,
            ttl_secs,
            timestamp,
            signature,
        })
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, pos: 0 }
    }

    fn take_slice(&mut self, len: usize) -> Result<&'a [u8], DirectoryError> {
        if self.pos + len > self.bytes.len() {
            return Err(DirectoryError::Codec("unexpected end of record".into()));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DirectoryError> {
        self.take_slice(N).map(|s| s.try_into().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corenet_address::{DialAddress, Host, Transport};

    fn sample_addrs() -> Vec<AddressEntry> {
        vec![AddressEntry {
            dial: DialAddress::new(Transport::QuicV1, Host::Ip4("127.0.0.1".parse().unwrap()), 4001),
            category: AddressCategory::Direct,
        }]
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let identity = Identity::generate();
        let record = SignedPeerRecord::sign(&identity, sample_addrs(), 1, MIN_TTL, 1_000_000);
        assert!(record.verify(&identity.public_key()).is_ok());
    }

    #[test]
    fn validate_rejects_wrong_signer() {
        let identity = Identity::generate();
        let other = Identity::generate();
        let record = SignedPeerRecord::sign(&identity, sample_addrs(), 1, MIN_TTL, 1_000_000);
        assert!(matches!(
            record.validate(&other.public_key(), 1_000_000),
            Err(DirectoryError::NodeIdMismatch { .. })
        ));
    }

    #[test]
    fn validate_rejects_future_timestamp_past_skew() {
        let identity = Identity::generate();
        let record = SignedPeerRecord::sign(&identity, sample_addrs(), 1, MIN_TTL, 1_000_100);
        assert!(matches!(
            record.validate(&identity.public_key(), 1_000_000),
            Err(DirectoryError::TimestampOutOfWindow)
        ));
    }

    #[test]
    fn validate_accepts_timestamp_within_skew() {
        let identity = Identity::generate();
        let record = SignedPeerRecord::sign(&identity, sample_addrs(), 1, MIN_TTL, 1_000_029);
        assert!(record.validate(&identity.public_key(), 1_000_000).is_ok());
    }

    #[test]
    fn wire_round_trip_preserves_verification() {
        let identity = Identity::generate();
        let record = SignedPeerRecord::sign(&identity, sample_addrs(), 7, MIN_TTL, 1_000_000);
        let bytes = record.to_wire_bytes();
        let decoded = SignedPeerRecord::from_wire_bytes(&bytes).unwrap();
        assert!(decoded.verify(&identity.public_key()).is_ok());
        assert_eq!(decoded.node_id, record.node_id);
        assert_eq!(decoded.seq, record.seq);
    }

    #[test]
    fn ttl_is_clamped_to_bounds() {
        let identity = Identity::generate();
        let too_short = SignedPeerRecord::sign(&identity, sample_addrs(), 1, Duration::from_secs(1), 0);
        assert_eq!(too_short.ttl(), MIN_TTL);
        let too_long = SignedPeerRecord::sign(&identity, sample_addrs(), 1, Duration::from_secs(u64::MAX), 0);
        assert_eq!(too_long.ttl(), MAX_TTL);
    }

    #[test]
    fn expiry_tracks_timestamp_plus_ttl() {
        let identity = Identity::generate();
        let record = SignedPeerRecord::sign(&identity, sample_addrs(), 1, MIN_TTL, 1_000_000);
        assert!(!record.is_expired(1_000_000));
        assert!(record.is_expired(record.expires_at() + 1));
    }
}
