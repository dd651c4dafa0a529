use corenet_common::category::{Categorized, ErrorCategory};
use corenet_identity::NodeId;
use displaydoc::Display;

/// Errors from connection establishment (SPEC §4.5). Clone-friendly so a
/// single dial outcome can be shared with every caller that deduplicated
/// onto it.
#[derive(Clone, Debug, Display, thiserror::Error)]
pub enum DialerError {
    /// no dialable addresses are known for the target peer
    NoAddressesAvailable,
    /// all {attempts} dial paths failed
    AllPathsFailed { attempts: usize },
    /// remote attested to an unexpected identity: expected {expected}, got {got}
    IdentityMismatch { expected: NodeId, got: NodeId },
    /// dial stage `{stage}` timed out
    Timeout { stage: &'static str },
    /// dial was cancelled
    Cancelled,
    /// target is not a member of the required realm
    NotInRealm,
    /// at least one dial address is required
    AddressRequired,
}

impl Categorized for DialerError {
    fn category(&self) -> ErrorCategory {
        match self {
            DialerError::NoAddressesAvailable | DialerError::AddressRequired => ErrorCategory::Address,
            DialerError::AllPathsFailed { .. } => ErrorCategory::Transport,
            DialerError::IdentityMismatch { .. } => ErrorCategory::Identity,
            DialerError::Timeout { .. } => ErrorCategory::Timeout,
            DialerError::Cancelled => ErrorCategory::Cancelled,
            DialerError::NotInRealm => ErrorCategory::Realm,
        }
    }
}

impl From<corenet_transport::TransportError> for DialerError {
    fn from(err: corenet_transport::TransportError) -> Self {
        match err {
            corenet_transport::TransportError::IdentityMismatch { expected, got } => {
                DialerError::IdentityMismatch { expected, got }
            }
            corenet_transport::TransportError::DialTimeout => DialerError::Timeout { stage: "direct" },
            _ => DialerError::AllPathsFailed { attempts: 1 },
        }
    }
}
