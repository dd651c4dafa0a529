//! Determines which of the node's candidate addresses are actually
//! reachable, classifies the NAT type, and decides which addresses to
//! publish (SPEC §4.4).

mod config;
mod error;
mod nat;
mod state;

pub use config::{ReachabilityConfig, ReachabilityConfigBuilder};
pub use error::ReachabilityError;
pub use nat::{classify, MappedAddressProbe, NatType, PublishPolicy, StunClient};
pub use state::{AddressState, CandidateAddress};

use corenet_address::{AddressCategory, DialAddress};
use corenet_identity::NodeId;
use parking_lot::Mutex;
use std::future::Future;
use tracing::{debug, info};

/// What a peer asked to dial-back reports (SPEC §4.4 "Dial-back
/// verification").
pub trait DialBackClient: Send + Sync {
    fn request_dial_back(
        &self,
        verifier: NodeId,
        candidate: DialAddress,
    ) -> impl Future<Output = bool> + Send;
}

pub struct Reachability {
    config: ReachabilityConfig,
    candidates: Mutex<Vec<CandidateAddress>>,
    nat_type: Mutex<Option<NatType>>,
}

impl Reachability {
    pub fn new(config: ReachabilityConfig) -> Self {
        Reachability {
            config,
            candidates: Mutex::new(Vec::new()),
            nat_type: Mutex::new(None),
        }
    }

    pub fn register_candidate(&self, dial: DialAddress, category: AddressCategory) {
        let mut candidates = self.candidates.lock();
        if candidates.iter().any(|c| c.dial == dial) {
            return;
        }
        candidates.push(CandidateAddress::new(dial, category));
    }

    pub fn set_nat_type(&self, nat_type: NatType) {
        *self.nat_type.lock() = Some(nat_type);
    }

    pub fn nat_type(&self) -> Option<NatType> {
        *self.nat_type.lock()
    }

    /// Requests dial-back verification from `verifiers` (must supply at
    /// least [`ReachabilityConfig::dial_back_consensus`] peers) for
    /// `candidate`. Promotes the candidate to `Verified` if at least one
    /// verifier confirms within the configured timeout.
    pub async fn verify<C: DialBackClient>(
        &self,
        client: &C,
        verifiers: &[NodeId],
        dial: &DialAddress,
    ) -> Result<(), ReachabilityError> {
        {
            let mut candidates = self.candidates.lock();
            if let Some(candidate) = candidates.iter_mut().find(|c| &c.dial == dial) {
                candidate.begin_validation();
            }
        }

        let attempts = verifiers
            .iter()
            .map(|verifier| client.request_dial_back(*verifier, dial.clone()));

        let outcome = tokio::time::timeout(self.config.dial_back_timeout, async {
            futures_lite_any(attempts).await
        })
        .await;

        let confirmed = matches!(outcome, Ok(true));
        if confirmed {
            let mut candidates = self.candidates.lock();
            if let Some(candidate) = candidates.iter_mut().find(|c| &c.dial == dial) {
                candidate.mark_verified();
            }
            info!(%dial, "candidate address verified via dial-back");
            Ok(())
        } else {
            debug!(%dial, "dial-back verification failed or timed out");
            Err(ReachabilityError::VerificationTimedOut)
        }
    }

    /// Marks every address matching the current NAT publish policy as
    /// `Published`, returning the set that should be advertised.
    pub fn addresses_to_publish(&self) -> Vec<CandidateAddress> {
        let policy = self.nat_type.lock().map(NatType::publish_policy);
        let mut candidates = self.candidates.lock();
        let mut published = Vec::new();
        for candidate in candidates.iter_mut() {
            if !candidate.is_publishable() {
                continue;
            }
            let allowed = match (policy, candidate.category) {
                (None, _) => false,
                (Some(p), AddressCategory::Direct) => p.publish_direct,
                (Some(p), AddressCategory::RelayCircuit) => p.publish_relay_candidates,
                (Some(_), AddressCategory::Candidate) => false,
            };
            if allowed {
                candidate.mark_published();
                published.push(candidate.clone());
            }
        }
        published
    }

    /// `AddressReady`: true once at least one address is eligible to
    /// publish under the current NAT policy (SPEC §4.4).
    pub fn is_ready(&self) -> bool {
        !self.addresses_to_publish().is_empty()
    }
}

/// Resolves to `true` as soon as any future in `futures` resolves to `true`,
/// or `false` once all of them have resolved without a `true`. A minimal
/// fan-in since this crate otherwise has no need for the `futures` crate.
async fn futures_lite_any<F, I>(futures: I) -> bool
where
    F: Future<Output = bool>,
    I: IntoIterator<Item = F>,
{
    let mut pending: Vec<std::pin::Pin<Box<F>>> = futures.into_iter().map(Box::pin).collect();
    while !pending.is_empty() {
        let (result, _index, remaining) = futures_select(pending).await;
        if result {
            return true;
        }
        pending = remaining;
    }
    false
}

async fn futures_select<F: Future<Output = bool>>(
    mut pending: Vec<std::pin::Pin<Box<F>>>,
) -> (bool, usize, Vec<std::pin::Pin<Box<F>>>) {
    use std::task::Poll;

    std::future::poll_fn(move |cx| {
        for i in 0..pending.len() {
            if let Poll::Ready(value) = pending[i].as_mut().poll(cx) {
                let _ = pending.remove(i);
                return Poll::Ready((value, i, std::mem::take(&mut pending)));
            }
        }
        Poll::Pending
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use corenet_address::Host;
    use corenet_address::Transport;
    use corenet_crypto_keys::Ed25519Pair;

    fn node_id() -> NodeId {
        NodeId::from_public_key(&Ed25519Pair::generate().public_key())
    }

    fn dial() -> DialAddress {
        DialAddress::new(Transport::QuicV1, Host::Ip4("1.2.3.4".parse().unwrap()), 4001)
    }

    struct AlwaysConfirm;
    impl DialBackClient for AlwaysConfirm {
        async fn request_dial_back(&self, _verifier: NodeId, _candidate: DialAddress) -> bool {
            true
        }
    }

    struct NeverConfirm;
    impl DialBackClient for NeverConfirm {
        async fn request_dial_back(&self, _verifier: NodeId, _candidate: DialAddress) -> bool {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            false
        }
    }

    #[tokio::test]
    async fn verify_promotes_on_confirmation() {
        let reach = Reachability::new(ReachabilityConfig::default());
        reach.register_candidate(dial(), AddressCategory::Direct);
        let verifiers = vec![node_id(), node_id()];
        reach.verify(&AlwaysConfirm, &verifiers, &dial()).await.unwrap();
        reach.set_nat_type(NatType::None);
        assert!(reach.is_ready());
    }

    #[tokio::test]
    async fn verify_fails_without_any_confirmation() {
        let reach = Reachability::new(ReachabilityConfig::default());
        reach.register_candidate(dial(), AddressCategory::Direct);
        let verifiers = vec![node_id(), node_id()];
        let err = reach.verify(&NeverConfirm, &verifiers, &dial()).await.unwrap_err();
        assert!(matches!(err, ReachabilityError::VerificationTimedOut));
    }

    #[test]
    fn symmetric_nat_never_publishes_direct_candidates() {
        let reach = Reachability::new(ReachabilityConfig::default());
        reach.register_candidate(dial(), AddressCategory::Direct);
        reach.set_nat_type(NatType::Symmetric);
        // Force-verify without the dial-back flow for this synchronous test.
        {
            let mut candidates = reach.candidates.lock();
            candidates[0].mark_verified();
        }
        assert!(reach.addresses_to_publish().is_empty());
    }
}
