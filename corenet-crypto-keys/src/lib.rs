//! Ed25519 key material: a node's long-term signing identity and the
//! short-lived keys used to sign [`SignedPeerRecord`]s and membership proofs
//! (the records/proofs themselves live in `corenet-directory`/`corenet-realm`;
//! this crate only owns key generation, signing and verification).
//!
//! [`SignedPeerRecord`]: https://docs.rs/corenet-directory

mod error;

pub use error::KeyError;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Ed25519 public key, 32 bytes.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Ed25519Public(pub(crate) VerifyingKey);

impl std::hash::Hash for Ed25519Public {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bytes().hash(state);
    }
}

/// Ed25519 signature, 64 bytes.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Ed25519Signature(pub(crate) Signature);

impl Ed25519Public {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), KeyError> {
        self.0
            .verify(message, &signature.0)
            .map_err(|_| KeyError::InvalidSignature)
    }
}

impl TryFrom<&[u8]> for Ed25519Public {
    type Error = KeyError;

    fn try_from(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| KeyError::LengthMismatch)?;
        VerifyingKey::from_bytes(&arr)
            .map(Ed25519Public)
            .map_err(|_| KeyError::MalformedKey)
    }
}

impl std::fmt::Debug for Ed25519Public {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Public({})", hex::encode(self.to_bytes()))
    }
}

impl std::fmt::Display for Ed25519Public {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl Serialize for Ed25519Public {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for Ed25519Public {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        Ed25519Public::try_from(bytes.as_slice()).map_err(serde::de::Error::custom)
    }
}

impl Ed25519Signature {
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }
}

impl TryFrom<&[u8]> for Ed25519Signature {
    type Error = KeyError;

    fn try_from(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; 64] = bytes.try_into().map_err(|_| KeyError::LengthMismatch)?;
        Ok(Ed25519Signature(Signature::from_bytes(&arr)))
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        Ed25519Signature::try_from(bytes.as_slice()).map_err(serde::de::Error::custom)
    }
}

/// A node's long-term signing key. Never serialized, never cloned outside
/// of key-file persistence; `Drop` zeroizes the seed.
pub struct Ed25519Pair {
    signing_key: SigningKey,
}

impl Ed25519Pair {
    /// Generates a fresh keypair from the operating system's secure RNG.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        let pair = Self::from_seed(&seed);
        seed.zeroize();
        pair
    }

    /// Reconstructs a keypair from a raw 32-byte seed, e.g. one read back
    /// from a key file.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Ed25519Pair {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// The raw seed, for persistence only. Callers must zeroize the
    /// returned array once it has been written out.
    pub fn to_seed_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn public_key(&self) -> Ed25519Public {
        Ed25519Public(self.signing_key.verifying_key())
    }

    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message))
    }
}

impl Drop for Ed25519Pair {
    fn drop(&mut self) {
        // SigningKey itself zeroizes its internal seed on drop (ed25519-dalek
        // builds with the `zeroize` feature internally); nothing extra to do
        // here beyond documenting the guarantee callers rely on.
    }
}
