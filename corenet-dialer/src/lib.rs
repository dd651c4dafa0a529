//! Connection establishment (SPEC §4.5): deduplicates concurrent dials to
//! the same peer, races direct dials to every known address, falls back to
//! relay-signaled hole punching, and finally a relayed circuit if neither
//! direct path nor hole punch succeeds.

mod config;
mod error;
mod inflight;
mod relay;

pub use config::DialerConfig;
pub use error::DialerError;
pub use inflight::InFlightTable;
pub use relay::RelayedStream;

use corenet_address::{AddressCategory, DialAddress, FullAddress};
use corenet_holepunch::{HolePuncher, RelaySignaling, UdpBurstClient};
use corenet_identity::{Identity, NodeId};
use corenet_reachability::NatType;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The concrete connection a dial resolved to: either a direct transport
/// connection, or a circuit multiplexed through a relay.
#[derive(Clone)]
pub enum DialerConnection {
    Direct(corenet_transport::Connection),
    Relayed(RelayedStream),
}

impl DialerConnection {
    pub fn remote_node_id(&self) -> NodeId {
        match self {
            DialerConnection::Direct(conn) => conn.remote_node_id(),
            DialerConnection::Relayed(stream) => stream.dest(),
        }
    }
}

pub type DialOutcome = Result<DialerConnection, DialerError>;

pub struct Dialer {
    config: DialerConfig,
    identity: Arc<Identity>,
    transport_config: corenet_transport::TransportConfig,
    holepuncher: HolePuncher,
    inflight: InFlightTable,
}

impl Dialer {
    pub fn new(config: DialerConfig, identity: Arc<Identity>) -> Self {
        Dialer {
            transport_config: corenet_transport::TransportConfig {
                dial_timeout: config.direct_race_window,
            },
            holepuncher: HolePuncher::new(corenet_holepunch::HolePunchConfig {
                attempt_timeout: config.hole_punch_timeout,
                ..corenet_holepunch::HolePunchConfig::default()
            }),
            config,
            identity,
            inflight: InFlightTable::new(),
        }
    }

    /// Establishes a connection to `target`, deduplicating against any dial
    /// to the same peer already in flight.
    pub async fn dial<S, U>(
        &self,
        target: NodeId,
        addrs: Vec<FullAddress>,
        relay_ctx: Option<RelayDialContext<'_, S, U>>,
    ) -> DialOutcome
    where
        S: RelaySignaling,
        U: UdpBurstClient,
    {
        if addrs.is_empty() && relay_ctx.is_none() {
            return Err(DialerError::AddressRequired);
        }

        self.inflight
            .dial_once(target, || {
                self.dial_inner(target, addrs, relay_ctx)
            })
            .await
    }

    async fn dial_inner<S, U>(
        &self,
        target: NodeId,
        addrs: Vec<FullAddress>,
        relay_ctx: Option<RelayDialContext<'_, S, U>>,
    ) -> DialOutcome
    where
        S: RelaySignaling,
        U: UdpBurstClient,
    {
        tokio::time::timeout(self.config.full_dial_timeout, async {
            if let Some(conn) = self.race_direct(&addrs).await {
                return Ok(DialerConnection::Direct(conn));
            }

            if let Some(ctx) = &relay_ctx {
                if let Ok(()) = self.try_hole_punch(ctx, target).await {
                    if let Some(conn) = self.race_direct(&addrs).await {
                        return Ok(DialerConnection::Direct(conn));
                    }
                }
                return self.fall_back_to_relay(ctx, target).await;
            }

            Err(DialerError::AllPathsFailed { attempts: addrs.len() })
        })
        .await
        .unwrap_or(Err(DialerError::Timeout { stage: "full_dial" }))
    }

    /// Races a direct dial against every candidate address, bounded by
    /// `max_concurrent_dials`, returning the first to succeed.
    async fn race_direct(&self, addrs: &[FullAddress]) -> Option<corenet_transport::Connection> {
        let direct_addrs: Vec<&FullAddress> = addrs
            .iter()
            .filter(|a| a.category != AddressCategory::RelayCircuit)
            .collect();
        if direct_addrs.is_empty() {
            return None;
        }

        let mut join_set = tokio::task::JoinSet::new();
        for chunk in direct_addrs.chunks(self.config.max_concurrent_dials) {
            for addr in chunk {
                let addr = (*addr).clone();
                let identity = self.identity.clone();
                let transport_config = self.transport_config.clone();
                join_set.spawn(async move { corenet_transport::dial(&addr, identity, &transport_config).await });
            }
            while let Some(result) = join_set.join_next().await {
                match result {
                    Ok(Ok(conn)) => {
                        join_set.abort_all();
                        return Some(conn);
                    }
                    Ok(Err(err)) => debug!(%err, "direct dial attempt failed"),
                    Err(err) => warn!(%err, "direct dial task panicked"),
                }
            }
        }
        None
    }

    async fn try_hole_punch<S, U>(&self, ctx: &RelayDialContext<'_, S, U>, target: NodeId) -> Result<(), ()>
    where
        S: RelaySignaling,
        U: UdpBurstClient,
    {
        if matches!(ctx.local_nat, NatType::Symmetric) {
            return Err(());
        }
        self.holepuncher
            .attempt(
                ctx.signaling,
                ctx.burst,
                ctx.relay,
                self.identity.node_id(),
                target,
                ctx.local_nat,
                ctx.local_observed_addrs.clone(),
            )
            .await
            .map_err(|err| {
                debug!(%err, "hole punch did not open a direct path");
            })
    }

    async fn fall_back_to_relay<S, U>(&self, ctx: &RelayDialContext<'_, S, U>, target: NodeId) -> DialOutcome
    where
        S: RelaySignaling,
        U: UdpBurstClient,
    {
        let relay_conn = corenet_transport::dial(ctx.relay_addr, self.identity.clone(), &self.transport_config)
            .await?;
        let stream = RelayedStream::open(relay_conn, target)
            .await
            .map_err(|_| DialerError::AllPathsFailed { attempts: 1 })?;
        info!(%target, "connected via relay fallback");
        Ok(DialerConnection::Relayed(stream))
    }
}

/// Optional inputs needed to attempt a hole-punch-then-relay fallback when
/// the direct race comes up empty.
pub struct RelayDialContext<'a, S, U> {
    pub signaling: &'a S,
    pub burst: &'a U,
    pub relay: NodeId,
    pub relay_addr: &'a FullAddress,
    pub local_nat: NatType,
    pub local_observed_addrs: Vec<DialAddress>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use corenet_address::{Host, Transport as AddressTransport};
    use corenet_crypto_keys::Ed25519Pair;

    fn node_id() -> NodeId {
        NodeId::from_public_key(&Ed25519Pair::generate().public_key())
    }

    #[tokio::test]
    async fn dial_with_no_addresses_and_no_relay_context_fails_fast() {
        let dialer = Dialer::new(DialerConfig::default(), Arc::new(Identity::generate()));
        let result: DialOutcome = dialer
            .dial::<NeverSignaling, NeverBurst>(node_id(), vec![], None)
            .await;
        assert!(matches!(result, Err(DialerError::AddressRequired)));
    }

    #[tokio::test]
    async fn dial_succeeds_over_loopback_direct_path() {
        let server_identity = Arc::new(Identity::generate());
        let client_identity = Arc::new(Identity::generate());
        let expected_id = server_identity.node_id();

        let listener =
            corenet_transport::Listener::bind("127.0.0.1:0".parse().unwrap(), server_identity.clone()).unwrap();
        let local_addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let dial_addr = DialAddress::new(
            AddressTransport::QuicV1,
            Host::Ip4(match local_addr.ip() {
                std::net::IpAddr::V4(ip) => ip,
                std::net::IpAddr::V6(_) => unreachable!(),
            }),
            local_addr.port(),
        );
        let target = FullAddress::direct(dial_addr, expected_id);

        let dialer = Dialer::new(DialerConfig::default(), client_identity);
        let outcome: DialOutcome = dialer
            .dial::<NeverSignaling, NeverBurst>(expected_id, vec![target], None)
            .await;
        let conn = outcome.unwrap();
        assert_eq!(conn.remote_node_id(), expected_id);
    }

    struct NeverSignaling;
    impl RelaySignaling for NeverSignaling {
        async fn send_punch_request(
            &self,
            _relay: NodeId,
            _request: corenet_holepunch::PunchRequest,
        ) -> Result<corenet_holepunch::PunchAck, corenet_holepunch::HolePunchError> {
            unreachable!("not exercised in these tests")
        }

        async fn measure_rtt(&self, _relay: NodeId) -> std::time::Duration {
            std::time::Duration::ZERO
        }
    }

    struct NeverBurst;
    impl UdpBurstClient for NeverBurst {
        async fn burst_dial(
            &self,
            _targets: Vec<DialAddress>,
            _count: u32,
            _spacing: std::time::Duration,
            _window: std::time::Duration,
        ) -> bool {
            unreachable!("not exercised in these tests")
        }
    }
}
