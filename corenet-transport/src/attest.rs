//! Post-handshake identity attestation.
//!
//! QUIC/TLS gives us a confidential channel to *some* ephemeral self-signed
//! cert; it says nothing about who holds the long-term NodeID we dialed.
//! Immediately after the handshake completes, both sides exchange a small
//! signed message binding their long-term public key to the certificate DER
//! they just presented. The dialer then checks the responder's claimed key
//! hashes to the NodeID it expected (SPEC §4.2); the listener has no prior
//! expectation and simply records whichever NodeID the claim resolves to.

use crate::error::TransportError;
use corenet_crypto_keys::{Ed25519Public, Ed25519Signature};
use corenet_identity::{Identity, NodeId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const DOMAIN: &[u8] = b"corenet-identity-attestation-v1";
const MAX_FRAME: u32 = 4096;

#[derive(Serialize, Deserialize)]
struct Attestation {
    public_key: Ed25519Public,
    cert_hash: [u8; 32],
    signature: Ed25519Signature,
}

fn cert_hash(der: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(der);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

fn sign_attestation(identity: &Identity, hash: &[u8; 32]) -> Attestation {
    let mut message = Vec::with_capacity(DOMAIN.len() + 32);
    message.extend_from_slice(DOMAIN);
    message.extend_from_slice(hash);
    Attestation {
        public_key: identity.public_key(),
        cert_hash: *hash,
        signature: identity.sign(&message),
    }
}

fn verify_attestation(att: &Attestation, expected_hash: &[u8; 32]) -> Result<NodeId, TransportError> {
    if att.cert_hash != *expected_hash {
        return Err(TransportError::Attestation(
            "attested cert hash did not match the certificate presented in the handshake".into(),
        ));
    }
    let mut message = Vec::with_capacity(DOMAIN.len() + 32);
    message.extend_from_slice(DOMAIN);
    message.extend_from_slice(expected_hash);
    att.public_key
        .verify(&message, &att.signature)
        .map_err(|e| TransportError::Attestation(format!("signature check failed: {e}")))?;
    Ok(NodeId::from_public_key(&att.public_key))
}

async fn write_frame<W: tokio::io::AsyncWrite + Unpin>(
    writer: &mut W,
    att: &Attestation,
) -> Result<(), TransportError> {
    let bytes = serde_json::to_vec(att)
        .map_err(|e| TransportError::Attestation(format!("encode failed: {e}")))?;
    writer
        .write_all(&(bytes.len() as u32).to_be_bytes())
        .await
        .map_err(|e| TransportError::Attestation(format!("stream write failed: {e}")))?;
    writer
        .write_all(&bytes)
        .await
        .map_err(|e| TransportError::Attestation(format!("stream write failed: {e}")))?;
    Ok(())
}

async fn read_frame<R: tokio::io::AsyncRead + Unpin>(reader: &mut R) -> Result<Attestation, TransportError> {
    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| TransportError::Attestation(format!("stream read failed: {e}")))?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME {
        return Err(TransportError::Attestation("attestation frame too large".into()));
    }
    let mut buf = vec![0u8; len as usize];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|e| TransportError::Attestation(format!("stream read failed: {e}")))?;
    serde_json::from_slice(&buf).map_err(|e| TransportError::Attestation(format!("decode failed: {e}")))
}

fn presented_cert_der(conn: &quinn::Connection) -> Result<Vec<u8>, TransportError> {
    let identity = conn
        .peer_identity()
        .ok_or_else(|| TransportError::Attestation("no peer certificate presented".into()))?;
    let certs = identity
        .downcast::<Vec<rustls::pki_types::CertificateDer<'static>>>()
        .map_err(|_| TransportError::Attestation("unexpected peer identity type".into()))?;
    certs
        .first()
        .map(|c| c.as_ref().to_vec())
        .ok_or_else(|| TransportError::Attestation("peer presented an empty certificate chain".into()))
}

/// Runs the mutual attestation exchange. `local_cert_der` is the DER of the
/// certificate *this side* presented during the handshake. Returns the
/// peer's verified NodeID and public key.
///
/// `is_dialer` decides who opens the bidirectional stream: in QUIC either
/// side may do so, but exactly one must, or both sides race to open distinct
/// streams and neither reads the other's frame.
pub async fn run(
    conn: &quinn::Connection,
    identity: &Identity,
    local_cert_der: &[u8],
    is_dialer: bool,
) -> Result<(NodeId, Ed25519Public), TransportError> {
    let (mut send, mut recv) = if is_dialer {
        conn.open_bi()
            .await
            .map_err(|e| TransportError::Attestation(format!("open stream failed: {e}")))?
    } else {
        conn.accept_bi()
            .await
            .map_err(|e| TransportError::Attestation(format!("accept stream failed: {e}")))?
    };

    let local_hash = cert_hash(local_cert_der);
    let outgoing = sign_attestation(identity, &local_hash);
    write_frame(&mut send, &outgoing).await?;

    let peer_cert_der = presented_cert_der(conn)?;
    let peer_hash = cert_hash(&peer_cert_der);
    let incoming = read_frame(&mut recv).await?;
    let node_id = verify_attestation(&incoming, &peer_hash)?;

    Ok((node_id, incoming.public_key))
}
