use corenet_common::category::{Categorized, ErrorCategory};
use displaydoc::Display;

#[derive(Clone, Debug, Display, thiserror::Error)]
pub enum RealmError {
    /// membership authentication failed
    AuthFailed,
    /// already a member of a realm; leave first
    AlreadyInRealm,
    /// not currently a member of any realm
    NotMember,
    /// membership proof has expired
    ProofExpired,
    /// membership proof is not bound to this peer
    ProofNotBoundToPeer,
    /// protocol `{0}` uses a reserved or foreign-realm prefix
    ProtocolNotAllowed(String),
    /// peer has exceeded the realm's rate limit and was disconnected
    RateLimitDisconnect,
}

impl Categorized for RealmError {
    fn category(&self) -> ErrorCategory {
        match self {
            RealmError::AuthFailed
            | RealmError::AlreadyInRealm
            | RealmError::NotMember
            | RealmError::ProofExpired
            | RealmError::ProofNotBoundToPeer => ErrorCategory::Realm,
            RealmError::ProtocolNotAllowed(_) => ErrorCategory::Realm,
            RealmError::RateLimitDisconnect => ErrorCategory::Resource,
        }
    }
}
