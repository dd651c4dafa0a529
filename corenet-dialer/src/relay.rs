//! Minimal relay-circuit support. There is no standalone relay-server
//! component in this system — a relay circuit is just a `/sys/relay/1.0/hop`
//! request multiplexed as one bidirectional stream over an existing
//! connection to a cooperating peer, which then forwards bytes to the
//! destination on the caller's behalf (subject to the destination peer's own
//! realm/relay policy).

use corenet_identity::NodeId;
use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const MAX_FRAME_LEN: usize = 4096;

#[derive(Serialize, Deserialize)]
struct HopRequest {
    dest: NodeId,
}

#[derive(Serialize, Deserialize)]
struct HopResponse {
    ok: bool,
}

async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, value: &impl Serialize) -> io::Result<()> {
    let bytes = serde_json::to_vec(value).map_err(io::Error::other)?;
    writer.write_all(&(bytes.len() as u32).to_be_bytes()).await?;
    writer.write_all(&bytes).await
}

async fn read_frame<R: AsyncReadExt + Unpin, T: for<'de> Deserialize<'de>>(reader: &mut R) -> io::Result<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "hop frame too large"));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    serde_json::from_slice(&buf).map_err(io::Error::other)
}

/// A circuit established through a relay: a handle onto the relay
/// connection plus the destination it was opened for. Cheap to clone since
/// the underlying transport connection is itself a cloneable handle; each
/// clone re-runs the hop handshake when a fresh stream is actually opened.
#[derive(Clone)]
pub struct RelayedStream {
    relay_conn: corenet_transport::Connection,
    dest: NodeId,
}

impl RelayedStream {
    /// Opens the relay circuit: sends a `/sys/relay/1.0/hop` request over a
    /// new stream on `relay_conn` and waits for the relay's acknowledgement
    /// that it has successfully forwarded the circuit to `dest`.
    pub async fn open(relay_conn: corenet_transport::Connection, dest: NodeId) -> io::Result<Self> {
        let (mut send, mut recv) = relay_conn
            .open_bi()
            .await
            .map_err(|e| io::Error::other(e.to_string()))?;

        write_frame(&mut send, &HopRequest { dest }).await?;
        let response: HopResponse = read_frame(&mut recv).await?;
        if !response.ok {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "relay declined hop"));
        }

        Ok(RelayedStream { relay_conn, dest })
    }

    pub fn dest(&self) -> NodeId {
        self.dest
    }

    pub fn relay_node_id(&self) -> NodeId {
        self.relay_conn.remote_node_id()
    }
}
