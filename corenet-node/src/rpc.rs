//! [`WireDirectoryRpc`]: the live-network implementation of
//! `corenet_directory::DirectoryRpc`, riding existing connections in a
//! [`ConnectionTable`] and speaking the framed `/sys/dht/1.0` protocol from
//! `crate::wire`.

use crate::connections::ConnectionTable;
use crate::wire::{read_frame, write_frame, DhtRequest, DhtResponse};
use corenet_crypto_keys::Ed25519Public;
use corenet_directory::{DirectoryError, DirectoryRpc, SignedPeerRecord};
use corenet_identity::NodeId;
use std::sync::Arc;

pub struct WireDirectoryRpc {
    connections: Arc<ConnectionTable>,
}

impl WireDirectoryRpc {
    pub fn new(connections: Arc<ConnectionTable>) -> Self {
        WireDirectoryRpc { connections }
    }

    async fn call(&self, peer: NodeId, request: DhtRequest) -> Result<DhtResponse, DirectoryError> {
        let conn = self
            .connections
            .get(&peer)
            .ok_or(DirectoryError::NotFound)?;
        let (mut send, mut recv) = conn
            .open_bi()
            .await
            .map_err(|e| DirectoryError::Codec(format!("open stream failed: {e}")))?;
        write_frame(&mut send, &request)
            .await
            .map_err(|e| DirectoryError::Codec(format!("write failed: {e}")))?;
        read_frame(&mut recv)
            .await
            .map_err(|e| DirectoryError::Codec(format!("read failed: {e}")))
    }
}

impl DirectoryRpc for WireDirectoryRpc {
    async fn find_node(&self, peer: NodeId, target: NodeId) -> Result<Vec<NodeId>, DirectoryError> {
        match self.call(peer, DhtRequest::FindNode { target }).await? {
            DhtResponse::Nodes(nodes) => Ok(nodes),
            DhtResponse::Error(msg) => Err(DirectoryError::Codec(msg)),
            _ => Err(DirectoryError::Codec("unexpected response to find_node".into())),
        }
    }

    async fn get_record(
        &self,
        peer: NodeId,
        target: NodeId,
    ) -> Result<Option<(SignedPeerRecord, Ed25519Public)>, DirectoryError> {
        match self.call(peer, DhtRequest::GetRecord { target }).await? {
            DhtResponse::Record(record) => Ok(record),
            DhtResponse::Error(msg) => Err(DirectoryError::Codec(msg)),
            _ => Err(DirectoryError::Codec("unexpected response to get_record".into())),
        }
    }

    async fn put_record(&self, peer: NodeId, record: SignedPeerRecord) -> Result<(), DirectoryError> {
        match self.call(peer, DhtRequest::PutRecord { record }).await? {
            DhtResponse::Ack => Ok(()),
            DhtResponse::Error(msg) => Err(DirectoryError::Codec(msg)),
            _ => Err(DirectoryError::Codec("unexpected response to put_record".into())),
        }
    }
}
