//! Tracks live, identity-verified connections by remote NodeID. Populated by
//! the accept loop and by the dialer on successful direct dials.

use corenet_identity::NodeId;
use corenet_transport::Connection;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
pub struct ConnectionTable {
    inner: Mutex<HashMap<NodeId, Connection>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        ConnectionTable::default()
    }

    pub fn insert(&self, conn: Connection) {
        self.inner.lock().insert(conn.remote_node_id(), conn);
    }

    pub fn get(&self, peer: &NodeId) -> Option<Connection> {
        self.inner.lock().get(peer).cloned()
    }

    pub fn remove(&self, peer: &NodeId) {
        self.inner.lock().remove(peer);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
