use corenet_common::category::{Categorized, ErrorCategory};
use corenet_identity::NodeId;
use displaydoc::Display;

/// Failure modes for [`crate::dial`] and [`crate::Listener::accept`] (SPEC §4.2).
#[derive(Debug, Display)]
pub enum TransportError {
    /// dial did not complete within the configured timeout
    DialTimeout,
    /// TLS handshake failed: {0}
    TlsHandshakeFailed(String),
    /// remote identity did not match: expected {expected}, got {got}
    IdentityMismatch { expected: NodeId, got: NodeId },
    /// peer closed the connection before the identity attestation completed
    ConnectionRefused,
    /// local endpoint setup failed: {0}
    EndpointSetup(String),
    /// identity attestation stream failed: {0}
    Attestation(String),
}

impl std::error::Error for TransportError {}

impl Categorized for TransportError {
    fn category(&self) -> ErrorCategory {
        match self {
            TransportError::DialTimeout => ErrorCategory::Timeout,
            TransportError::TlsHandshakeFailed(_) => ErrorCategory::Handshake,
            TransportError::IdentityMismatch { .. } => ErrorCategory::Identity,
            TransportError::ConnectionRefused => ErrorCategory::Transport,
            TransportError::EndpointSetup(_) => ErrorCategory::Transport,
            TransportError::Attestation(_) => ErrorCategory::Handshake,
        }
    }
}
