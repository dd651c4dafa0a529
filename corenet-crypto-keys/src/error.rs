use displaydoc::Display;

/// Errors constructing or using Ed25519 key material.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum KeyError {
    /// input was not 32 or 64 bytes as required
    LengthMismatch,
    /// key bytes did not decode to a valid curve point
    MalformedKey,
    /// signature verification failed
    InvalidSignature,
}

impl std::error::Error for KeyError {}
