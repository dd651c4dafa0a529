use corenet_common::category::{Categorized, ErrorCategory};
use corenet_identity::NodeId;
use displaydoc::Display;

/// Failures surfaced by [`crate::PeerDirectory`].
#[derive(Debug, Display, thiserror::Error)]
pub enum DirectoryError {
    /// record signature did not verify
    InvalidSignature,
    /// record carries nodeID {record_id}, which does not match signer {signer_id}
    NodeIdMismatch {
        record_id: NodeId,
        signer_id: NodeId,
    },
    /// a node may only publish records for its own identity
    SelfPutOnly,
    /// rejected stale record: incoming seq {incoming} <= stored seq {stored}
    StaleSequence { incoming: u64, stored: u64 },
    /// record timestamp is outside the allowed clock-skew window
    TimestampOutOfWindow,
    /// no record found for the requested NodeID
    NotFound,
    /// malformed wire encoding: {0}
    Codec(String),
    /// local store capacity exhausted and no evictable entry was found
    StoreFull,
    /// the iterative lookup was cancelled
    Cancelled,
}

impl Categorized for DirectoryError {
    fn category(&self) -> ErrorCategory {
        match self {
            DirectoryError::InvalidSignature
            | DirectoryError::NodeIdMismatch { .. }
            | DirectoryError::SelfPutOnly
            | DirectoryError::StaleSequence { .. }
            | DirectoryError::TimestampOutOfWindow => ErrorCategory::Directory,
            DirectoryError::NotFound => ErrorCategory::Directory,
            DirectoryError::Codec(_) => ErrorCategory::Invariant,
            DirectoryError::StoreFull => ErrorCategory::Resource,
            DirectoryError::Cancelled => ErrorCategory::Cancelled,
        }
    }
}
