use corenet_common::category::{Categorized, ErrorCategory};
use displaydoc::Display;

#[derive(Clone, Debug, Display, thiserror::Error)]
pub enum HolePunchError {
    /// hole-punching is not attempted for this NAT pairing: {reason}
    Skipped { reason: &'static str },
    /// relay signaling failed: {0}
    SignalingFailed(String),
    /// neither peer reported an observed address to target
    NoAddressesObserved,
    /// burst dial did not observe a bidirectional exchange within the budget
    Timeout,
}

impl Categorized for HolePunchError {
    fn category(&self) -> ErrorCategory {
        match self {
            HolePunchError::Skipped { .. } => ErrorCategory::Reachability,
            HolePunchError::SignalingFailed(_) => ErrorCategory::Transport,
            HolePunchError::NoAddressesObserved => ErrorCategory::Reachability,
            HolePunchError::Timeout => ErrorCategory::Timeout,
        }
    }
}
