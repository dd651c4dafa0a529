//! The node facade: wires identity, transport, the peer directory,
//! reachability and the dialer together behind a single handle, and drives
//! the accept loop that serves the `/sys/dht/1.0` protocol (SPEC §4, §7).
//!
//! STUN and dial-back verification are abstracted by `corenet-reachability`
//! behind [`corenet_reachability::StunClient`] and
//! [`corenet_reachability::DialBackClient`]; likewise relay signaling and UDP
//! bursting are abstracted by `corenet-holepunch`. This crate composes those
//! traits but does not ship a concrete STUN server or relay-signaling
//! service of its own — only the peer-directory wire protocol, the one
//! component every full node in the overlay must agree on, gets a concrete
//! implementation here.

mod config;
mod connections;
mod error;
mod rpc;
mod wire;

pub use config::{NodeConfig, NodeConfigBuilder};
pub use connections::ConnectionTable;
pub use error::NodeError;
pub use rpc::WireDirectoryRpc;
pub use wire::{DhtRequest, DhtResponse, DHT_PROTOCOL};

use corenet_address::FullAddress;
use corenet_dialer::Dialer;
use corenet_directory::{PeerDirectory, Scope};
use corenet_identity::{Identity, NodeId};
use corenet_reachability::Reachability;
use corenet_realm::RealmGate;
use corenet_transport::{Connection, Listener};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Startup progression (SPEC glossary): a node only claims a later stage
/// once the work backing it has actually happened, never on a timer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ReadyLevel {
    Created = 0,
    NetworkUp = 1,
    Discovered = 2,
    Reachable = 3,
    RealmReady = 4,
}

impl ReadyLevel {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ReadyLevel::Created,
            1 => ReadyLevel::NetworkUp,
            2 => ReadyLevel::Discovered,
            3 => ReadyLevel::Reachable,
            _ => ReadyLevel::RealmReady,
        }
    }
}

struct ReadyLevelCell(AtomicU8);

impl ReadyLevelCell {
    fn new() -> Self {
        ReadyLevelCell(AtomicU8::new(ReadyLevel::Created as u8))
    }

    fn get(&self) -> ReadyLevel {
        ReadyLevel::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Monotonic: never regresses an already-reached level.
    fn advance_to(&self, level: ReadyLevel) {
        let _ = self
            .0
            .fetch_max(level as u8, Ordering::SeqCst);
    }
}

/// Ties every per-node component together. Cheaply `Arc`-shareable: clone the
/// `Arc<Node>` into every task that needs to dial, publish, or dispatch.
pub struct Node {
    identity: Arc<Identity>,
    listener: Listener,
    directory: Arc<PeerDirectory>,
    reachability: Arc<Reachability>,
    dialer: Arc<Dialer>,
    realm_gate: Mutex<RealmGate>,
    connections: Arc<ConnectionTable>,
    ready: ReadyLevelCell,
}

impl Node {
    /// Loads (or generates) the node's identity, binds the QUIC listener,
    /// and constructs every component. Does not yet dial bootstrap peers or
    /// accept connections — call [`Self::run`] for that.
    pub fn start(config: &NodeConfig) -> Result<Arc<Self>, NodeError> {
        let identity = Arc::new(Identity::load_or_generate(&config.identity_path)?);
        let listener = Listener::bind(config.listen_addr, identity.clone())?;

        let directory = Arc::new(PeerDirectory::new(identity.clone(), config.directory_config()));
        let reachability = Arc::new(Reachability::new(config.reachability_config()));
        let dialer = Arc::new(Dialer::new(config.dialer_config(), identity.clone()));
        let realm_gate = Mutex::new(RealmGate::new(identity.node_id()));
        let connections = Arc::new(ConnectionTable::new());

        info!(node_id = %identity.node_id(), addr = %listener.local_addr()?, "node started");

        let node = Node {
            identity,
            listener,
            directory,
            reachability,
            dialer,
            realm_gate,
            connections,
            ready: ReadyLevelCell::new(),
        };
        node.ready.advance_to(ReadyLevel::NetworkUp);
        Ok(Arc::new(node))
    }

    pub fn node_id(&self) -> NodeId {
        self.identity.node_id()
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr, NodeError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn ready_level(&self) -> ReadyLevel {
        self.ready.get()
    }

    pub fn directory(&self) -> &Arc<PeerDirectory> {
        &self.directory
    }

    pub fn reachability(&self) -> &Arc<Reachability> {
        &self.reachability
    }

    pub fn dialer(&self) -> &Arc<Dialer> {
        &self.dialer
    }

    pub fn connections(&self) -> &Arc<ConnectionTable> {
        &self.connections
    }

    /// Joins the realm backed by `key`; once at least one peer has been
    /// authenticated into it, [`Self::ready_level`] reaches `RealmReady`.
    pub fn join_realm(&self, key: corenet_crypto_kdf::RealmKey) -> Result<(), NodeError> {
        self.realm_gate.lock().join(key)?;
        Ok(())
    }

    /// Resolves every bootstrap peer string and dials it, seeding the
    /// routing table with whatever identity each dial attests to.
    pub async fn bootstrap(&self, peers: &[String]) {
        for text in peers {
            let target = match text.parse::<FullAddress>() {
                Ok(addr) => addr,
                Err(err) => {
                    warn!(%text, %err, "skipping malformed bootstrap peer");
                    continue;
                }
            };
            match self
                .dialer
                .dial::<NoRelaySignaling, NoUdpBurst>(target.node_id, vec![target.clone()], None)
                .await
            {
                Ok(conn) => {
                    if let corenet_dialer::DialerConnection::Direct(conn) = conn {
                        self.accept_established(conn);
                    }
                    self.directory.observe_peer(target.node_id);
                }
                Err(err) => warn!(peer = %target.node_id, %err, "bootstrap dial failed"),
            }
        }
        if self.directory.routing_table_len() > 0 {
            self.ready.advance_to(ReadyLevel::Discovered);
        }
    }

    /// Runs the accept loop until the listener is closed or the process is
    /// shut down. Each inbound connection is tracked and handed a dispatch
    /// task that serves `/sys/dht/1.0` requests over every bidirectional
    /// stream the peer opens.
    pub async fn run(self: &Arc<Self>) -> Result<(), NodeError> {
        loop {
            let conn = self.listener.accept().await?;
            let node = self.clone();
            tokio::spawn(async move {
                node.accept_established(conn.clone());
                node.dispatch_loop(conn).await;
            });
        }
    }

    fn accept_established(&self, conn: Connection) {
        let peer = conn.remote_node_id();
        debug!(%peer, "connection established");
        self.connections.insert(conn);
        self.directory.observe_peer(peer);
    }

    async fn dispatch_loop(self: Arc<Self>, conn: Connection) {
        let peer = conn.remote_node_id();
        loop {
            let (mut send, mut recv) = match conn.accept_bi().await {
                Ok(streams) => streams,
                Err(err) => {
                    debug!(%peer, %err, "connection closed");
                    self.connections.remove(&peer);
                    self.directory.forget_peer(&peer);
                    return;
                }
            };
            let request: DhtRequest = match wire::read_frame(&mut recv).await {
                Ok(request) => request,
                Err(err) => {
                    debug!(%peer, %err, "malformed dht request");
                    continue;
                }
            };
            let response = self.handle_dht_request(&conn, request);
            if let Err(err) = wire::write_frame(&mut send, &response).await {
                debug!(%peer, %err, "failed to write dht response");
            }
        }
    }

    /// Serves one `/sys/dht/1.0` request arriving on `conn`. `PutRecord` only
    /// accepts self-published records — the pusher's own attested public key
    /// (from `conn`) is the only signer this node will trust without a
    /// separate lookup (SPEC §4.3 "Self-PUT only").
    fn handle_dht_request(&self, conn: &Connection, request: DhtRequest) -> DhtResponse {
        let peer = conn.remote_node_id();
        self.directory.observe_peer(peer);
        match request {
            DhtRequest::FindNode { target } => {
                let k = self.directory.routing_table_len().max(1);
                DhtResponse::Nodes(self.directory.closest_peers(&target, k))
            }
            DhtRequest::GetRecord { target } => {
                DhtResponse::Record(self.directory.get_local_record(&target))
            }
            DhtRequest::PutRecord { record } => {
                if record.node_id != peer {
                    return DhtResponse::Error("a peer may only PUT a record for its own identity".into());
                }
                let signer = conn.remote_public_key();
                match self.directory.accept_pushed_record(record, &signer, Scope::Node, now_unix()) {
                    Ok(()) => DhtResponse::Ack,
                    Err(err) => DhtResponse::Error(err.to_string()),
                }
            }
        }
    }

    /// Publishes a fresh self-record built from whatever addresses
    /// reachability currently considers publishable, then replicates it to
    /// the closest peers via the live `/sys/dht/1.0` protocol.
    pub async fn publish_self(&self) {
        let addrs: Vec<corenet_directory::AddressEntry> = self
            .reachability
            .addresses_to_publish()
            .into_iter()
            .map(|candidate| corenet_directory::AddressEntry {
                dial: candidate.dial,
                category: candidate.category,
            })
            .collect();
        if addrs.is_empty() {
            return;
        }
        let record = self
            .directory
            .sign_own_record(addrs, corenet_directory::MIN_TTL, now_unix());
        let rpc = WireDirectoryRpc::new(self.connections.clone());
        self.directory.replicate(&rpc, &record).await;
        self.ready.advance_to(ReadyLevel::Reachable);
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Relay signaling is not wired to a live relay service in this crate; a
/// bootstrap dial never supplies a [`corenet_dialer::RelayDialContext`], so
/// these impls are never actually invoked.
pub struct NoRelaySignaling;
impl corenet_holepunch::RelaySignaling for NoRelaySignaling {
    async fn send_punch_request(
        &self,
        _relay: NodeId,
        _request: corenet_holepunch::PunchRequest,
    ) -> Result<corenet_holepunch::PunchAck, corenet_holepunch::HolePunchError> {
        Err(corenet_holepunch::HolePunchError::SignalingFailed(
            "relay signaling is not configured on this node".into(),
        ))
    }

    async fn measure_rtt(&self, _relay: NodeId) -> std::time::Duration {
        std::time::Duration::ZERO
    }
}

pub struct NoUdpBurst;
impl corenet_holepunch::UdpBurstClient for NoUdpBurst {
    async fn burst_dial(
        &self,
        _targets: Vec<corenet_address::DialAddress>,
        _count: u32,
        _spacing: std::time::Duration,
        _window: std::time::Duration,
    ) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_level_never_regresses() {
        let cell = ReadyLevelCell::new();
        cell.advance_to(ReadyLevel::Reachable);
        cell.advance_to(ReadyLevel::NetworkUp);
        assert_eq!(cell.get(), ReadyLevel::Reachable);
    }

    #[tokio::test]
    async fn start_binds_listener_and_reaches_network_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig::builder(dir.path().join("node.key"), "127.0.0.1:0".parse().unwrap()).build();
        let node = Node::start(&config).unwrap();
        assert_eq!(node.ready_level(), ReadyLevel::NetworkUp);
        assert!(node.local_addr().unwrap().port() > 0);
    }
}
