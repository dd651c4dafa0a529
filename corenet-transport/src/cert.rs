//! Ephemeral self-signed TLS certificates. These do not carry the node's
//! long-term identity; they exist only to stand up a TLS session, and are
//! regenerated on every process start. Identity binding happens afterward,
//! in `crate::attest`.

use rcgen::{CertificateParams, KeyPair};
use rustls::pki_types::{CertificateDer, PrivatePkcs8KeyDer};

pub struct EphemeralCert {
    pub cert_der: CertificateDer<'static>,
    pub key_der: PrivatePkcs8KeyDer<'static>,
}

/// Generates a fresh self-signed certificate for `localhost`. The subject
/// name is never checked by either [`crate::verifier::AcceptAnyServerCert`]
/// or [`crate::verifier::AcceptAnyClientCert`]; any placeholder works.
pub fn generate() -> Result<EphemeralCert, crate::error::TransportError> {
    let key_pair = KeyPair::generate()
        .map_err(|e| crate::error::TransportError::EndpointSetup(format!("key generation failed: {e}")))?;
    let params = CertificateParams::new(vec!["corenet.local".to_string()])
        .map_err(|e| crate::error::TransportError::EndpointSetup(format!("cert params failed: {e}")))?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| crate::error::TransportError::EndpointSetup(format!("self-sign failed: {e}")))?;

    Ok(EphemeralCert {
        cert_der: cert.der().clone(),
        key_der: PrivatePkcs8KeyDer::from(key_pair.serialize_der()),
    })
}
