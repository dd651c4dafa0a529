use corenet_common::category::{Categorized, ErrorCategory};
use displaydoc::Display;

/// Top-level facade error: every component error bridges into this one at
/// the node boundary (SPEC §7 "Implementation idiom").
#[derive(Debug, Display, thiserror::Error)]
pub enum NodeError {
    /// identity error: {0}
    Identity(#[from] corenet_identity::IdentityError),
    /// transport error: {0}
    Transport(#[from] corenet_transport::TransportError),
    /// directory error: {0}
    Directory(#[from] corenet_directory::DirectoryError),
    /// reachability error: {0}
    Reachability(#[from] corenet_reachability::ReachabilityError),
    /// dial error: {0}
    Dialer(#[from] corenet_dialer::DialerError),
    /// hole punch error: {0}
    HolePunch(#[from] corenet_holepunch::HolePunchError),
    /// realm error: {0}
    Realm(#[from] corenet_realm::RealmError),
    /// address error: {0}
    Address(#[from] corenet_address::AddressParseError),
    /// I/O error: {0}
    Io(#[from] std::io::Error),
}

impl Categorized for NodeError {
    fn category(&self) -> ErrorCategory {
        match self {
            NodeError::Identity(_) => ErrorCategory::Identity,
            NodeError::Transport(e) => e.category(),
            NodeError::Directory(e) => e.category(),
            NodeError::Reachability(e) => e.category(),
            NodeError::Dialer(e) => e.category(),
            NodeError::HolePunch(e) => e.category(),
            NodeError::Realm(e) => e.category(),
            NodeError::Address(_) => ErrorCategory::Address,
            NodeError::Io(_) => ErrorCategory::Invariant,
        }
    }
}
