use corenet_address::DialAddress;
use corenet_identity::NodeId;
use corenet_reachability::NatType;
use serde::{Deserialize, Serialize};

/// Relayed to the target via the rendezvous peer (SPEC §4.6 `/sys/relay/1.0/hop`
/// signaling channel), asking it to prepare a simultaneous-open burst against
/// the initiator's observed addresses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PunchRequest {
    pub initiator: NodeId,
    pub target: NodeId,
    pub observed_addrs: Vec<DialAddress>,
    pub nat_type: NatType,
}

/// The target's reply, carrying its own observed addresses and NAT type so
/// the initiator can schedule its half of the burst, plus the relay
/// round-trip offset used to synchronize `t0` between both sides.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PunchAck {
    pub observed_addrs: Vec<DialAddress>,
    pub nat_type: NatType,
    pub t0_offset_ms: u32,
}
