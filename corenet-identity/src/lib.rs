//! The node's long-term identity: a signing keypair and the [`NodeId`]
//! derived from it.

mod node_id;

pub use node_id::{NodeId, NodeIdParseError};

use corenet_crypto_keys::{Ed25519Pair, Ed25519Public, Ed25519Signature};
use displaydoc::Display;
use std::path::Path;

/// Errors loading, generating or persisting a node identity.
#[derive(Debug, Display)]
pub enum IdentityError {
    /// could not load identity from key file: {0}
    Load(corenet_keyfile::KeyFileError),
    /// could not persist identity to key file: {0}
    Persist(corenet_keyfile::KeyFileError),
}

impl std::error::Error for IdentityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IdentityError::Load(e) => Some(e),
            IdentityError::Persist(e) => Some(e),
        }
    }
}

/// Owns the node's long-term keypair; never exports the private key.
pub struct Identity {
    keypair: Ed25519Pair,
    node_id: NodeId,
}

impl Identity {
    /// Generates a fresh keypair using a secure RNG.
    pub fn generate() -> Self {
        let keypair = Ed25519Pair::generate();
        let node_id = NodeId::from_public_key(&keypair.public_key());
        Identity { keypair, node_id }
    }

    /// Loads an existing identity from `path`. Fails if the file is absent,
    /// malformed, or unreadable.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IdentityError> {
        let seed = corenet_keyfile::read_keyfile(path).map_err(IdentityError::Load)?;
        let keypair = Ed25519Pair::from_seed(&seed);
        let node_id = NodeId::from_public_key(&keypair.public_key());
        Ok(Identity { keypair, node_id })
    }

    /// Loads the identity at `path` if present, otherwise generates and
    /// persists a fresh one. The common entry point for a node's startup.
    pub fn load_or_generate<P: AsRef<Path>>(path: P) -> Result<Self, IdentityError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            let identity = Self::generate();
            identity.persist(path)?;
            Ok(identity)
        }
    }

    /// Atomically writes the keypair to `path` (write-to-temp + rename).
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<(), IdentityError> {
        let seed = self.keypair.to_seed_bytes();
        corenet_keyfile::write_keyfile(path, &seed, false).map_err(IdentityError::Persist)
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn public_key(&self) -> Ed25519Public {
        self.keypair.public_key()
    }

    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        self.keypair.sign(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_derives_matching_node_id() {
        let identity = Identity::generate();
        assert_eq!(
            identity.node_id(),
            NodeId::from_public_key(&identity.public_key())
        );
    }

    #[test]
    fn persist_then_load_preserves_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.key");
        let original = Identity::generate();
        original.persist(&path).unwrap();

        let loaded = Identity::load(&path).unwrap();
        assert_eq!(original.node_id(), loaded.node_id());
        assert_eq!(original.public_key(), loaded.public_key());
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.key");
        assert!(Identity::load(&path).is_err());
    }

    #[test]
    fn load_or_generate_creates_then_reuses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.key");
        let first = Identity::load_or_generate(&path).unwrap();
        let second = Identity::load_or_generate(&path).unwrap();
        assert_eq!(first.node_id(), second.node_id());
    }

    #[test]
    fn signing_is_verifiable_under_own_public_key() {
        let identity = Identity::generate();
        let sig = identity.sign(b"payload");
        assert!(identity.public_key().verify(b"payload", &sig).is_ok());
    }
}
