//! QUIC+TLS transport (SPEC §4.2).
//!
//! `listen` binds a local [`Listener`]; `dial` establishes an outbound
//! [`Connection`] to a [`FullAddress`]. Both paths run the same post-handshake
//! identity attestation (`crate::attest`) before returning a connection to the
//! caller — there is no way to obtain a [`Connection`] whose remote NodeID
//! hasn't been cryptographically verified.

mod attest;
mod cert;
mod error;
mod verifier;

pub use error::TransportError;

use corenet_address::{DialAddress, FullAddress, Host, Transport as AddressTransport};
use corenet_identity::{Identity, NodeId};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Once};
use std::time::Duration;
use tracing::{debug, warn};

static INSTALL_CRYPTO_PROVIDER: Once = Once::new();

fn ensure_crypto_provider_installed() {
    INSTALL_CRYPTO_PROVIDER.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Tunables for [`listen`] and [`dial`].
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Wall-clock budget for a single dial, including TLS handshake and
    /// identity attestation.
    pub dial_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            dial_timeout: Duration::from_secs(10),
        }
    }
}

/// An established, identity-verified connection. Cheap to clone: the
/// underlying `quinn::Connection` is itself a handle onto shared connection
/// state.
#[derive(Clone)]
pub struct Connection {
    inner: quinn::Connection,
    remote_node_id: NodeId,
    remote_public_key: corenet_crypto_keys::Ed25519Public,
}

impl Connection {
    pub fn remote_node_id(&self) -> NodeId {
        self.remote_node_id
    }

    /// The remote's long-term public key, as verified by post-handshake
    /// attestation. Lets a caller trust a self-published record carried over
    /// this same connection without a separate DHT lookup.
    pub fn remote_public_key(&self) -> corenet_crypto_keys::Ed25519Public {
        self.remote_public_key
    }

    pub fn remote_socket_addr(&self) -> SocketAddr {
        self.inner.remote_address()
    }

    pub async fn open_bi(&self) -> Result<(quinn::SendStream, quinn::RecvStream), TransportError> {
        self.inner
            .open_bi()
            .await
            .map_err(|e| TransportError::TlsHandshakeFailed(e.to_string()))
    }

    pub async fn accept_bi(&self) -> Result<(quinn::SendStream, quinn::RecvStream), TransportError> {
        self.inner
            .accept_bi()
            .await
            .map_err(|e| TransportError::TlsHandshakeFailed(e.to_string()))
    }

    pub fn close(&self, reason: &str) {
        self.inner.close(0u32.into(), reason.as_bytes());
    }
}

/// A bound local endpoint accepting inbound connections.
pub struct Listener {
    endpoint: quinn::Endpoint,
    identity: Arc<Identity>,
    local_cert_der: rustls::pki_types::CertificateDer<'static>,
}

impl Listener {
    /// Binds to `local` and begins accepting inbound QUIC connections.
    pub fn bind(local: SocketAddr, identity: Arc<Identity>) -> Result<Self, TransportError> {
        ensure_crypto_provider_installed();

        let ephemeral = cert::generate()?;
        let cert_chain = vec![ephemeral.cert_der.clone()];

        let mut server_crypto = rustls::ServerConfig::builder()
            .with_client_cert_verifier(Arc::new(verifier::AcceptAnyClientCert))
            .with_single_cert(cert_chain, ephemeral.key_der.into())
            .map_err(|e| TransportError::EndpointSetup(format!("server TLS config: {e}")))?;
        server_crypto.alpn_protocols = vec![b"corenet/1".to_vec()];

        let quic_server_crypto = quinn::crypto::rustls::QuicServerConfig::try_from(server_crypto)
            .map_err(|e| TransportError::EndpointSetup(format!("quic server crypto: {e}")))?;
        let server_config = quinn::ServerConfig::with_crypto(Arc::new(quic_server_crypto));

        let endpoint = quinn::Endpoint::server(server_config, local)
            .map_err(|e| TransportError::EndpointSetup(format!("bind failed: {e}")))?;

        Ok(Listener {
            endpoint,
            identity,
            local_cert_der: ephemeral.cert_der,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.endpoint
            .local_addr()
            .map_err(|e| TransportError::EndpointSetup(e.to_string()))
    }

    /// Accepts the next inbound connection and runs identity attestation.
    /// The returned NodeID is whatever the peer attested to — the caller,
    /// not this function, decides whether that identity is acceptable.
    pub async fn accept(&self) -> Result<Connection, TransportError> {
        let incoming = self
            .endpoint
            .accept()
            .await
            .ok_or(TransportError::ConnectionRefused)?;
        let conn = incoming
            .await
            .map_err(|e| TransportError::TlsHandshakeFailed(e.to_string()))?;

        let (remote_node_id, remote_public_key) =
            attest::run(&conn, &self.identity, self.local_cert_der.as_ref(), false).await?;

        debug!(peer = %remote_node_id, "inbound connection attested");
        Ok(Connection {
            inner: conn,
            remote_node_id,
            remote_public_key,
        })
    }
}

fn socket_addr_of(dial: &DialAddress) -> Option<SocketAddr> {
    let ip: IpAddr = match &dial.host {
        Host::Ip4(ip) => (*ip).into(),
        Host::Ip6(ip) => (*ip).into(),
        Host::Dns4(_) => return None,
    };
    Some(SocketAddr::new(ip, dial.port))
}

/// Dials `target`, verifying that the remote attests to `target.node_id`
/// before returning — SPEC §4.2's `IdentityMismatch{expected,got}`.
pub async fn dial(
    target: &FullAddress,
    identity: Arc<Identity>,
    config: &TransportConfig,
) -> Result<Connection, TransportError> {
    ensure_crypto_provider_installed();

    if target.dial.transport != AddressTransport::QuicV1 {
        return Err(TransportError::EndpointSetup(
            "only the QUIC/UDP transport is dialable by this implementation".into(),
        ));
    }
    let socket_addr = socket_addr_of(&target.dial)
        .ok_or_else(|| TransportError::EndpointSetup("DNS host resolution is not performed here".into()))?;

    tokio::time::timeout(config.dial_timeout, dial_inner(socket_addr, target.node_id, identity))
        .await
        .map_err(|_| TransportError::DialTimeout)?
}

async fn dial_inner(
    socket_addr: SocketAddr,
    expected_node_id: NodeId,
    identity: Arc<Identity>,
) -> Result<Connection, TransportError> {
    let ephemeral = cert::generate()?;
    let cert_chain = vec![ephemeral.cert_der.clone()];

    let mut client_crypto = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier::AcceptAnyServerCert))
        .with_client_auth_cert(cert_chain, ephemeral.key_der.into())
        .map_err(|e| TransportError::EndpointSetup(format!("client TLS config: {e}")))?;
    client_crypto.alpn_protocols = vec![b"corenet/1".to_vec()];

    let quic_client_crypto = quinn::crypto::rustls::QuicClientConfig::try_from(client_crypto)
        .map_err(|e| TransportError::EndpointSetup(format!("quic client crypto: {e}")))?;
    let client_config = quinn::ClientConfig::new(Arc::new(quic_client_crypto));

    let bind_addr: SocketAddr = if socket_addr.is_ipv6() {
        "[::]:0".parse().unwrap()
    } else {
        "0.0.0.0:0".parse().unwrap()
    };
    let mut endpoint = quinn::Endpoint::client(bind_addr)
        .map_err(|e| TransportError::EndpointSetup(format!("client bind failed: {e}")))?;
    endpoint.set_default_client_config(client_config);

    let conn = endpoint
        .connect(socket_addr, "corenet.local")
        .map_err(|e| TransportError::TlsHandshakeFailed(e.to_string()))?
        .await
        .map_err(|e| TransportError::TlsHandshakeFailed(e.to_string()))?;

    let (remote_node_id, remote_public_key) =
        attest::run(&conn, &identity, ephemeral.cert_der.as_ref(), true).await?;

    if remote_node_id != expected_node_id {
        warn!(expected = %expected_node_id, got = %remote_node_id, "identity mismatch on dial");
        conn.close(0u32.into(), b"identity mismatch");
        return Err(TransportError::IdentityMismatch {
            expected: expected_node_id,
            got: remote_node_id,
        });
    }

    Ok(Connection {
        inner: conn,
        remote_node_id,
        remote_public_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use corenet_address::{DialAddress, Host, Transport as AddressTransport};

    #[tokio::test]
    async fn dial_verifies_and_connects_over_loopback() {
        let server_identity = Arc::new(Identity::generate());
        let client_identity = Arc::new(Identity::generate());
        let expected_id = server_identity.node_id();

        let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), server_identity.clone()).unwrap();
        let local_addr = listener.local_addr().unwrap();

        let client_node_id = client_identity.node_id();
        let accept_task = tokio::spawn(async move { listener.accept().await });

        let dial_addr = DialAddress::new(
            AddressTransport::QuicV1,
            Host::Ip4(match local_addr.ip() {
                IpAddr::V4(ip) => ip,
                IpAddr::V6(_) => unreachable!(),
            }),
            local_addr.port(),
        );
        let target = FullAddress::direct(dial_addr, expected_id);

        let config = TransportConfig::default();
        let client_conn = dial(&target, client_identity, &config).await.unwrap();
        assert_eq!(client_conn.remote_node_id(), expected_id);

        let server_conn = accept_task.await.unwrap().unwrap();
        assert_eq!(server_conn.remote_node_id(), client_node_id);
    }

    #[tokio::test]
    async fn dial_rejects_mismatched_identity() {
        let server_identity = Arc::new(Identity::generate());
        let client_identity = Arc::new(Identity::generate());
        let wrong_id = Identity::generate().node_id();

        let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), server_identity).unwrap();
        let local_addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let dial_addr = DialAddress::new(
            AddressTransport::QuicV1,
            Host::Ip4(match local_addr.ip() {
                IpAddr::V4(ip) => ip,
                IpAddr::V6(_) => unreachable!(),
            }),
            local_addr.port(),
        );
        let target = FullAddress::direct(dial_addr, wrong_id);

        let config = TransportConfig::default();
        let err = dial(&target, client_identity, &config).await.unwrap_err();
        assert!(matches!(err, TransportError::IdentityMismatch { .. }));
    }
}
