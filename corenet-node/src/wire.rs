//! The `/sys/dht/1.0` wire protocol: one JSON-framed request/response per
//! stream, mirroring `corenet-transport`'s attestation and
//! `corenet-dialer`'s relay-hop framing (length-prefixed JSON, u32 BE).

use corenet_crypto_keys::Ed25519Public;
use corenet_directory::SignedPeerRecord;
use corenet_identity::NodeId;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub const DHT_PROTOCOL: &str = "/sys/dht/1.0";
const MAX_FRAME_LEN: u32 = 64 * 1024;

#[derive(Serialize, Deserialize)]
pub enum DhtRequest {
    FindNode { target: NodeId },
    GetRecord { target: NodeId },
    PutRecord { record: SignedPeerRecord },
}

#[derive(Serialize, Deserialize)]
pub enum DhtResponse {
    Nodes(Vec<NodeId>),
    Record(Option<(SignedPeerRecord, Ed25519Public)>),
    Ack,
    Error(String),
}

pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> std::io::Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = serde_json::to_vec(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    writer.write_all(&(bytes.len() as u32).to_be_bytes()).await?;
    writer.write_all(&bytes).await?;
    Ok(())
}

pub async fn read_frame<R, T>(reader: &mut R) -> std::io::Result<T>
where
    R: tokio::io::AsyncRead + Unpin,
    T: for<'de> Deserialize<'de>,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "dht frame too large",
        ));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    serde_json::from_slice(&buf).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
