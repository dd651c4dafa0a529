use corenet_crypto_keys::Ed25519Public;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 32-byte cryptographic digest of a node's long-term public key. The
/// durable identity: never forgeable without the corresponding private key,
/// displayed as a base58 string, ordered byte-wise (the ordering the DHT's
/// XOR-distance computation relies on).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct NodeId(#[serde(with = "hex_bytes")] [u8; 32]);

impl NodeId {
    /// Derives the NodeID as `sha256(publicKeyBytes)`. Deterministic: the
    /// same public key always yields the same NodeID.
    pub fn from_public_key(key: &Ed25519Public) -> Self {
        let digest = Sha256::digest(key.to_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        NodeId(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        NodeId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// XOR distance between two NodeIDs, used by the Kademlia-style
    /// directory to rank peers by closeness to a key.
    pub fn xor_distance(&self, other: &NodeId) -> [u8; 32] {
        let mut out = [0u8; 32];
        for i in 0..32 {
            out[i] = self.0[i] ^ other.0[i];
        }
        out
    }
}

impl std::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeId({})", self)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl std::str::FromStr for NodeId {
    type Err = NodeIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = bs58::decode(s)
            .into_vec()
            .map_err(|_| NodeIdParseError::InvalidBase58)?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|_| NodeIdParseError::WrongLength)?;
        Ok(NodeId(bytes))
    }
}

#[derive(Clone, Copy, Debug, displaydoc::Display, Eq, PartialEq)]
pub enum NodeIdParseError {
    /// not valid base58
    InvalidBase58,
    /// decoded to the wrong number of bytes (expected 32)
    WrongLength,
}

impl std::error::Error for NodeIdParseError {}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        hex::encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corenet_crypto_keys::Ed25519Pair;

    #[test]
    fn same_public_key_yields_same_node_id() {
        let pair = Ed25519Pair::generate();
        let pk = pair.public_key();
        assert_eq!(NodeId::from_public_key(&pk), NodeId::from_public_key(&pk));
    }

    #[test]
    fn distinct_keys_yield_distinct_node_ids() {
        let a = Ed25519Pair::generate();
        let b = Ed25519Pair::generate();
        assert_ne!(
            NodeId::from_public_key(&a.public_key()),
            NodeId::from_public_key(&b.public_key())
        );
    }

    #[test]
    fn display_parse_round_trip() {
        let pair = Ed25519Pair::generate();
        let id = NodeId::from_public_key(&pair.public_key());
        let text = id.to_string();
        let parsed: NodeId = text.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn xor_distance_to_self_is_zero() {
        let pair = Ed25519Pair::generate();
        let id = NodeId::from_public_key(&pair.public_key());
        assert_eq!(id.xor_distance(&id), [0u8; 32]);
    }

    #[test]
    fn serde_round_trip() {
        let pair = Ed25519Pair::generate();
        let id = NodeId::from_public_key(&pair.public_key());
        let json = serde_json::to_string(&id).unwrap();
        let decoded: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, decoded);
    }
}
