use corenet_common::category::{Categorized, ErrorCategory};
use displaydoc::Display;

#[derive(Debug, Display, thiserror::Error)]
pub enum ReachabilityError {
    /// NAT classification could not complete: {0}
    ClassificationFailed(String),
    /// dial-back verification did not reach the 2-peer consensus within the timeout
    VerificationTimedOut,
    /// no candidate addresses are registered
    NoCandidates,
}

impl Categorized for ReachabilityError {
    fn category(&self) -> ErrorCategory {
        match self {
            ReachabilityError::ClassificationFailed(_) => ErrorCategory::Reachability,
            ReachabilityError::VerificationTimedOut => ErrorCategory::Timeout,
            ReachabilityError::NoCandidates => ErrorCategory::Reachability,
        }
    }
}
