//! Lifecycle of a local candidate address (SPEC §3 AddressState, §4.4).

use corenet_address::{AddressCategory, DialAddress};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AddressState {
    Candidate,
    Validating,
    Verified,
    Published,
    Expired,
}

#[derive(Clone, Debug)]
pub struct CandidateAddress {
    pub dial: DialAddress,
    pub category: AddressCategory,
    pub state: AddressState,
}

impl CandidateAddress {
    pub fn new(dial: DialAddress, category: AddressCategory) -> Self {
        CandidateAddress {
            dial,
            category,
            state: AddressState::Candidate,
        }
    }

    pub fn begin_validation(&mut self) {
        if self.state == AddressState::Candidate {
            self.state = AddressState::Validating;
        }
    }

    pub fn mark_verified(&mut self) {
        if matches!(self.state, AddressState::Validating | AddressState::Candidate) {
            self.state = AddressState::Verified;
        }
    }

    pub fn mark_published(&mut self) {
        if self.state == AddressState::Verified {
            self.state = AddressState::Published;
        }
    }

    pub fn expire(&mut self) {
        self.state = AddressState::Expired;
    }

    pub fn is_publishable(&self) -> bool {
        matches!(self.state, AddressState::Verified | AddressState::Published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corenet_address::Host;
    use corenet_address::Transport;

    fn addr() -> CandidateAddress {
        CandidateAddress::new(
            DialAddress::new(Transport::QuicV1, Host::Ip4("10.0.0.1".parse().unwrap()), 4001),
            AddressCategory::Direct,
        )
    }

    #[test]
    fn normal_progression() {
        let mut a = addr();
        assert_eq!(a.state, AddressState::Candidate);
        a.begin_validation();
        assert_eq!(a.state, AddressState::Validating);
        a.mark_verified();
        assert_eq!(a.state, AddressState::Verified);
        assert!(a.is_publishable());
        a.mark_published();
        assert_eq!(a.state, AddressState::Published);
        assert!(a.is_publishable());
    }

    #[test]
    fn expiry_from_any_state() {
        let mut a = addr();
        a.begin_validation();
        a.expire();
        assert_eq!(a.state, AddressState::Expired);
        assert!(!a.is_publishable());
    }

    #[test]
    fn mark_published_without_verification_is_noop() {
        let mut a = addr();
        a.mark_published();
        assert_eq!(a.state, AddressState::Candidate);
    }
}
