//! NAT classification (SPEC §4.4): the classic two-server STUN probe
//! sequence. A mapped address is requested from two independent servers; if
//! the external port differs between the two responses for the same local
//! port, the mapping is port-dependent. A second probe asks one server to
//! reply from a different IP/port than it received on; success there
//! distinguishes full-cone from restricted/port-restricted.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum NatType {
    None,
    FullCone,
    RestrictedCone,
    PortRestricted,
    Symmetric,
}

/// What a node should publish under each NAT classification (SPEC §4.4
/// publishing-policy table). Under symmetric NAT a "direct" address observed
/// via STUN is useless to third parties and must never be published as one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PublishPolicy {
    pub publish_direct: bool,
    pub publish_relay_candidates: bool,
}

impl NatType {
    pub fn publish_policy(self) -> PublishPolicy {
        match self {
            NatType::None | NatType::FullCone => PublishPolicy {
                publish_direct: true,
                publish_relay_candidates: false,
            },
            NatType::RestrictedCone | NatType::PortRestricted => PublishPolicy {
                publish_direct: true,
                publish_relay_candidates: true,
            },
            NatType::Symmetric => PublishPolicy {
                publish_direct: false,
                publish_relay_candidates: true,
            },
        }
    }
}

/// Result of a single STUN-style mapped-address request.
#[derive(Clone, Copy, Debug)]
pub struct MappedAddressProbe {
    pub mapped: SocketAddr,
}

/// Abstraction over the actual STUN network exchange, so classification can
/// be unit-tested without a real server.
pub trait StunClient: Send + Sync {
    /// Requests a mapped address from `server`, using `local_port` as the
    /// outbound source port.
    fn request_mapping(
        &self,
        server: SocketAddr,
        local_port: u16,
    ) -> impl Future<Output = std::io::Result<MappedAddressProbe>> + Send;

    /// Asks `server` to reply from a different IP/port than it received the
    /// request on. Returns `Ok(true)` if such a reply was observed.
    fn request_changed_address_reply(
        &self,
        server: SocketAddr,
        local_port: u16,
    ) -> impl Future<Output = std::io::Result<bool>> + Send;
}

/// Runs the classification sequence against two independent STUN servers
/// bound on the same local port.
pub async fn classify<C: StunClient>(
    client: &C,
    server_a: SocketAddr,
    server_b: SocketAddr,
    local_port: u16,
) -> Result<NatType, crate::error::ReachabilityError> {
    let map = |e: std::io::Error| crate::error::ReachabilityError::ClassificationFailed(e.to_string());

    let probe_a = client.request_mapping(server_a, local_port).await.map_err(map)?;
    let probe_b = client.request_mapping(server_b, local_port).await.map_err(map)?;

    if probe_a.mapped.port() != probe_b.mapped.port() {
        return Ok(NatType::Symmetric);
    }

    let changed_reply_ok = client
        .request_changed_address_reply(server_a, local_port)
        .await
        .map_err(map)?;

    if changed_reply_ok {
        return Ok(NatType::FullCone);
    }

    // Endpoint-independent mapping but filtered inbound from unseen peers:
    // cannot distinguish restricted-cone from port-restricted without an
    // additional port-varying probe, which this implementation treats the
    // same way for publishing purposes, so it reports the more conservative
    // of the two.
    Ok(NatType::PortRestricted)
}
