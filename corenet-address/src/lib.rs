//! Canonical addresses (§3 "Address", §6 "Full Address format").
//!
//! Two flavors share the same textual grammar:
//! - *Dial addresses* have no embedded NodeID and are used for network I/O.
//! - *Full addresses* embed a NodeID suffix and are used for identity-bound
//!   operations (publishing, directory records, dial hints).
//!
//! Parsing is idempotent: `parse(to_string(a)) == a` for both forms.

mod error;

pub use error::AddressParseError;

use corenet_identity::NodeId;
use serde::{Deserialize, Serialize};
use std::{fmt, net::IpAddr, str::FromStr};

/// Transport component of an address.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Transport {
    /// `udp/quic-v1`
    QuicV1,
    /// plain `tcp`
    Tcp,
}

impl Transport {
    fn wire_segment(self) -> &'static str {
        match self {
            Transport::QuicV1 => "udp",
            Transport::Tcp => "tcp",
        }
    }
}

/// Host component: either a literal IP or a DNS name. Host:port literals are
/// only accepted at UI boundaries and must be converted to one of these
/// before entering the core.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Host {
    Ip4(std::net::Ipv4Addr),
    Ip6(std::net::Ipv6Addr),
    Dns4(String),
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Host::Ip4(ip) => write!(f, "ip4/{ip}"),
            Host::Ip6(ip) => write!(f, "ip6/{ip}"),
            Host::Dns4(name) => write!(f, "dns4/{name}"),
        }
    }
}

/// Category of an address: native direct path, relay-forwarded, or an
/// as-yet-unverified candidate (§3 "AddressCategory").
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AddressCategory {
    Direct,
    RelayCircuit,
    Candidate,
}

/// A dial address: transport + host + port, no identity. What the network
/// layer actually connects to.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct DialAddress {
    pub transport: Transport,
    pub host: Host,
    pub port: u16,
}

impl DialAddress {
    pub fn new(transport: Transport, host: Host, port: u16) -> Self {
        DialAddress {
            transport,
            host,
            port,
        }
    }

    pub fn from_socket_addr(transport: Transport, addr: std::net::SocketAddr) -> Self {
        let host = match addr.ip() {
            IpAddr::V4(ip) => Host::Ip4(ip),
            IpAddr::V6(ip) => Host::Ip6(ip),
        };
        DialAddress::new(transport, host, addr.port())
    }
}

impl fmt::Display for DialAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}/{}", self.host, self.transport.wire_segment(), self.port)?;
        if self.transport == Transport::QuicV1 {
            write!(f, "/quic-v1")?;
        }
        Ok(())
    }
}

impl FromStr for DialAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (dial, node_id) = parse_segments(s)?;
        if node_id.is_some() {
            return Err(AddressParseError::UnexpectedNodeId);
        }
        Ok(dial)
    }
}

/// A full address: a dial address plus the NodeID it is expected to reach
/// (§3 "Address" full-address form).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FullAddress {
    pub dial: DialAddress,
    pub node_id: NodeId,
    pub category: AddressCategory,
    /// Set when this is a relay-circuit address: the relay's own full
    /// address, rendered before the `/p2p-circuit/p2p/<destID>` suffix.
    pub relay: Option<Box<FullAddress>>,
}

impl FullAddress {
    pub fn direct(dial: DialAddress, node_id: NodeId) -> Self {
        FullAddress {
            dial,
            node_id,
            category: AddressCategory::Direct,
            relay: None,
        }
    }

    pub fn via_relay(relay: FullAddress, dest: NodeId) -> Self {
        let dial = relay.dial.clone();
        FullAddress {
            dial,
            node_id: dest,
            category: AddressCategory::RelayCircuit,
            relay: Some(Box::new(relay)),
        }
    }
}

impl fmt::Display for FullAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.relay {
            Some(relay) => write!(f, "{relay}/p2p-circuit/p2p/{}", self.node_id),
            None => write!(f, "{}/p2p/{}", self.dial, self.node_id),
        }
    }
}

impl FromStr for FullAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((relay_part, dest_part)) = s.split_once("/p2p-circuit/p2p/") {
            let relay: FullAddress = relay_part.parse()?;
            let dest: NodeId = dest_part
                .parse()
                .map_err(|_| AddressParseError::InvalidNodeId)?;
            return Ok(FullAddress::via_relay(relay, dest));
        }
        let (dial, node_id) = parse_segments(s)?;
        let node_id = node_id.ok_or(AddressParseError::MissingNodeId)?;
        Ok(FullAddress::direct(dial, node_id))
    }
}

/// Shared grammar walker for `/ip4|ip6|dns4/<host>/udp|tcp/<port>/quic-v1|<none>[/p2p/<nodeID>]`.
fn parse_segments(s: &str) -> Result<(DialAddress, Option<NodeId>), AddressParseError> {
    let mut parts = s.split('/').filter(|p| !p.is_empty());

    let host = match parts.next().ok_or(AddressParseError::Truncated)? {
        "ip4" => {
            let addr = parts.next().ok_or(AddressParseError::Truncated)?;
            Host::Ip4(addr.parse().map_err(|_| AddressParseError::InvalidHost)?)
        }
        "ip6" => {
            let addr = parts.next().ok_or(AddressParseError::Truncated)?;
            Host::Ip6(addr.parse().map_err(|_| AddressParseError::InvalidHost)?)
        }
        "dns4" => {
            let name = parts.next().ok_or(AddressParseError::Truncated)?;
            Host::Dns4(name.to_string())
        }
        other => return Err(AddressParseError::UnknownScheme(other.to_string())),
    };

    let transport_tag = parts.next().ok_or(AddressParseError::Truncated)?;
    let port: u16 = parts
        .next()
        .ok_or(AddressParseError::Truncated)?
        .parse()
        .map_err(|_| AddressParseError::InvalidPort)?;

    let mut remaining: Vec<&str> = parts.collect();
    let transport = match transport_tag {
        "udp" => {
            if remaining.first() == Some(&"quic-v1") {
                remaining.remove(0);
                Transport::QuicV1
            } else {
                return Err(AddressParseError::UnknownScheme("udp-without-quic".into()));
            }
        }
        "tcp" => Transport::Tcp,
        other => return Err(AddressParseError::UnknownScheme(other.to_string())),
    };

    let dial = DialAddress::new(transport, host, port);

    if remaining.is_empty() {
        return Ok((dial, None));
    }
    if remaining.len() == 2 && remaining[0] == "p2p" {
        let node_id: NodeId = remaining[1]
            .parse()
            .map_err(|_| AddressParseError::InvalidNodeId)?;
        return Ok((dial, Some(node_id)));
    }
    Err(AddressParseError::UnexpectedTrailer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use corenet_crypto_keys::Ed25519Pair;

    fn sample_node_id() -> NodeId {
        let pair = Ed25519Pair::generate();
        NodeId::from_public_key(&pair.public_key())
    }

    #[test]
    fn dial_address_round_trip() {
        let dial = DialAddress::new(Transport::QuicV1, Host::Ip4("127.0.0.1".parse().unwrap()), 4001);
        let text = dial.to_string();
        let parsed: DialAddress = text.parse().unwrap();
        assert_eq!(dial, parsed);
        assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn tcp_dial_address_round_trip() {
        let dial = DialAddress::new(Transport::Tcp, Host::Dns4("example.com".into()), 443);
        let text = dial.to_string();
        assert_eq!(text, "/dns4/example.com/tcp/443");
        let parsed: DialAddress = text.parse().unwrap();
        assert_eq!(dial, parsed);
    }

    #[test]
    fn full_address_round_trip() {
        let node_id = sample_node_id();
        let dial = DialAddress::new(Transport::QuicV1, Host::Ip4("10.0.0.1".parse().unwrap()), 4001);
        let full = FullAddress::direct(dial, node_id);
        let text = full.to_string();
        let parsed: FullAddress = text.parse().unwrap();
        assert_eq!(full, parsed);
        assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn relay_circuit_address_round_trip() {
        let relay_id = sample_node_id();
        let dest_id = sample_node_id();
        let relay_dial = DialAddress::new(Transport::QuicV1, Host::Ip4("1.2.3.4".parse().unwrap()), 4001);
        let relay_full = FullAddress::direct(relay_dial, relay_id);
        let circuit = FullAddress::via_relay(relay_full, dest_id);

        let text = circuit.to_string();
        assert!(text.contains("/p2p-circuit/p2p/"));
        assert_eq!(circuit.category, AddressCategory::RelayCircuit);

        let parsed: FullAddress = text.parse().unwrap();
        assert_eq!(parsed.node_id, dest_id);
        assert_eq!(parsed.category, AddressCategory::RelayCircuit);
    }

    #[test]
    fn dial_address_rejects_embedded_node_id() {
        let node_id = sample_node_id();
        let text = format!("/ip4/127.0.0.1/udp/4001/quic-v1/p2p/{node_id}");
        assert!(text.parse::<DialAddress>().is_err());
    }

    #[test]
    fn full_address_requires_node_id() {
        let text = "/ip4/127.0.0.1/udp/4001/quic-v1";
        assert!(text.parse::<FullAddress>().is_err());
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!("/foo4/127.0.0.1/udp/4001".parse::<DialAddress>().is_err());
    }
}
