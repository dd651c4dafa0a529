//! Relay-signaled simultaneous-open hole punching (SPEC §4.6). Attempted
//! only when neither side's NAT classification rules it out; schedules a
//! synchronized burst dial against the peer's observed addresses using the
//! relay round-trip as a clock reference.

mod config;
mod error;
mod signaling;

pub use config::{HolePunchConfig, HolePunchConfigBuilder};
pub use error::HolePunchError;
pub use signaling::{PunchAck, PunchRequest};

use corenet_address::DialAddress;
use corenet_identity::NodeId;
use corenet_reachability::NatType;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Whether an attempt should be made at all for this NAT pairing (SPEC §4.6
/// applicability table). Symmetric NAT on either side makes the outbound
/// port unpredictable to the far side, so the attempt is skipped regardless
/// of what the peer's NAT looks like.
pub fn applicable(initiator: NatType, responder: NatType) -> bool {
    !matches!(initiator, NatType::Symmetric) && !matches!(responder, NatType::Symmetric)
}

/// Signals the punch request/ack exchange over an existing relay circuit.
pub trait RelaySignaling: Send + Sync {
    fn send_punch_request(
        &self,
        relay: NodeId,
        request: PunchRequest,
    ) -> impl Future<Output = Result<PunchAck, HolePunchError>> + Send;

    /// Round-trip time to `relay`, used to derive the shared `t0` burst start.
    fn measure_rtt(&self, relay: NodeId) -> impl Future<Output = Duration> + Send;
}

/// Fires the actual burst of UDP packets at the target's observed addresses.
/// Returns `true` if a bidirectional exchange was observed before
/// `burst_window` elapses.
pub trait UdpBurstClient: Send + Sync {
    fn burst_dial(
        &self,
        targets: Vec<DialAddress>,
        burst_count: u32,
        burst_spacing: Duration,
        burst_window: Duration,
    ) -> impl Future<Output = bool> + Send;
}

pub struct HolePuncher {
    config: HolePunchConfig,
}

impl HolePuncher {
    pub fn new(config: HolePunchConfig) -> Self {
        HolePuncher { config }
    }

    /// Runs a single hole-punch attempt against `target` via `relay`.
    /// `local_observed_addrs` are this node's own addresses as seen by the
    /// relay/STUN infrastructure, offered to the target in the punch request.
    pub async fn attempt<S, U>(
        &self,
        signaling: &S,
        burst: &U,
        relay: NodeId,
        initiator: NodeId,
        target: NodeId,
        initiator_nat: NatType,
        local_observed_addrs: Vec<DialAddress>,
    ) -> Result<(), HolePunchError>
    where
        S: RelaySignaling,
        U: UdpBurstClient,
    {
        tokio::time::timeout(
            self.config.attempt_timeout,
            self.attempt_inner(signaling, burst, relay, initiator, target, initiator_nat, local_observed_addrs),
        )
        .await
        .unwrap_or(Err(HolePunchError::Timeout))
    }

    async fn attempt_inner<S, U>(
        &self,
        signaling: &S,
        burst: &U,
        relay: NodeId,
        initiator: NodeId,
        target: NodeId,
        initiator_nat: NatType,
        local_observed_addrs: Vec<DialAddress>,
    ) -> Result<(), HolePunchError>
    where
        S: RelaySignaling,
        U: UdpBurstClient,
    {
        let request = PunchRequest {
            initiator,
            target,
            observed_addrs: local_observed_addrs,
            nat_type: initiator_nat,
        };

        let rtt = signaling.measure_rtt(relay).await;
        let ack = signaling.send_punch_request(relay, request).await?;

        if !applicable(initiator_nat, ack.nat_type) {
            return Err(HolePunchError::Skipped {
                reason: "at least one side is behind a symmetric NAT",
            });
        }

        if ack.observed_addrs.is_empty() {
            return Err(HolePunchError::NoAddressesObserved);
        }

        // t0 is scheduled half an RTT out from now plus the relay-reported
        // offset, so both sides start their burst at roughly the same instant.
        let delay = rtt / 2 + Duration::from_millis(ack.t0_offset_ms as u64);
        debug!(?delay, peers = ack.observed_addrs.len(), "scheduling synchronized burst");
        tokio::time::sleep(delay).await;

        let confirmed = burst
            .burst_dial(
                ack.observed_addrs,
                self.config.burst_count,
                self.config.burst_spacing,
                self.config.burst_window,
            )
            .await;

        if confirmed {
            info!(%target, "hole punch succeeded");
            Ok(())
        } else {
            Err(HolePunchError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corenet_address::Host;
    use corenet_address::Transport;
    use corenet_crypto_keys::Ed25519Pair;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn node_id() -> NodeId {
        NodeId::from_public_key(&Ed25519Pair::generate().public_key())
    }

    fn addr() -> DialAddress {
        DialAddress::new(Transport::QuicV1, Host::Ip4("9.9.9.9".parse().unwrap()), 4001)
    }

    struct FakeSignaling {
        ack_nat: NatType,
        rtt: Duration,
    }

    impl RelaySignaling for FakeSignaling {
        async fn send_punch_request(&self, _relay: NodeId, _request: PunchRequest) -> Result<PunchAck, HolePunchError> {
            Ok(PunchAck {
                observed_addrs: vec![addr()],
                nat_type: self.ack_nat,
                t0_offset_ms: 0,
            })
        }

        async fn measure_rtt(&self, _relay: NodeId) -> Duration {
            self.rtt
        }
    }

    struct FakeBurst {
        succeeds: AtomicBool,
    }

    impl UdpBurstClient for FakeBurst {
        async fn burst_dial(&self, _targets: Vec<DialAddress>, _count: u32, _spacing: Duration, _window: Duration) -> bool {
            self.succeeds.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn symmetric_nat_on_either_side_is_inapplicable() {
        assert!(!applicable(NatType::Symmetric, NatType::FullCone));
        assert!(!applicable(NatType::FullCone, NatType::Symmetric));
        assert!(applicable(NatType::FullCone, NatType::PortRestricted));
    }

    #[tokio::test]
    async fn attempt_succeeds_when_burst_confirms() {
        let puncher = HolePuncher::new(HolePunchConfig::default());
        let signaling = FakeSignaling { ack_nat: NatType::PortRestricted, rtt: Duration::from_millis(10) };
        let burst = FakeBurst { succeeds: AtomicBool::new(true) };
        let result = puncher
            .attempt(&signaling, &burst, node_id(), node_id(), node_id(), NatType::FullCone, vec![addr()])
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn attempt_is_skipped_when_target_is_symmetric() {
        let puncher = HolePuncher::new(HolePunchConfig::default());
        let signaling = FakeSignaling { ack_nat: NatType::Symmetric, rtt: Duration::from_millis(1) };
        let burst = FakeBurst { succeeds: AtomicBool::new(true) };
        let result = puncher
            .attempt(&signaling, &burst, node_id(), node_id(), node_id(), NatType::FullCone, vec![addr()])
            .await;
        assert!(matches!(result, Err(HolePunchError::Skipped { .. })));
    }

    #[tokio::test]
    async fn attempt_fails_when_burst_does_not_confirm() {
        let puncher = HolePuncher::new(HolePunchConfig::default());
        let signaling = FakeSignaling { ack_nat: NatType::PortRestricted, rtt: Duration::from_millis(1) };
        let burst = FakeBurst { succeeds: AtomicBool::new(false) };
        let result = puncher
            .attempt(&signaling, &burst, node_id(), node_id(), node_id(), NatType::FullCone, vec![addr()])
            .await;
        assert!(matches!(result, Err(HolePunchError::Timeout)));
    }
}
