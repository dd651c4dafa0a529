//! Protocol-ID namespacing and the relay forwarding allowlist (SPEC §4.8
//! "Protocol namespacing" / "Relay forwarding policy").

use crate::error::RealmError;
use corenet_crypto_kdf::RealmId;

/// Rewrites a user-registered protocol name (e.g. `"chat/1.0"`) into its
/// realm-namespaced wire identifier `/app/<realmID>/chat/1.0`. Registering
/// an already-prefixed ID is rejected: namespacing is mandatory and
/// irreversible at the gate.
pub fn namespace_app_protocol(realm_id: &RealmId, user_proto: &str) -> Result<String, RealmError> {
    if user_proto.starts_with('/') {
        return Err(RealmError::ProtocolNotAllowed(user_proto.to_string()));
    }
    Ok(format!("/app/{realm_id}/{user_proto}"))
}

/// Whether `wire_proto` may be forwarded by a relay operating within the
/// realm identified by `realm_id`: system protocols are universally
/// forwardable, and `/realm/<realmID>/*` or `/app/<realmID>/*` must match
/// this realm specifically. Everything else, including another realm's
/// namespace, is rejected.
pub fn relay_may_forward(realm_id: &RealmId, wire_proto: &str) -> bool {
    if wire_proto.starts_with("/sys/") {
        return true;
    }
    let own_realm_prefix = format!("/realm/{realm_id}/");
    let own_app_prefix = format!("/app/{realm_id}/");
    wire_proto.starts_with(&own_realm_prefix) || wire_proto.starts_with(&own_app_prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use corenet_crypto_kdf::RealmKey;

    #[test]
    fn namespaces_plain_protocol_name() {
        let realm_id = RealmKey::from_bytes([1u8; 32]).realm_id();
        let wire = namespace_app_protocol(&realm_id, "chat/1.0").unwrap();
        assert_eq!(wire, format!("/app/{realm_id}/chat/1.0"));
    }

    #[test]
    fn rejects_prefixed_protocol_name() {
        let realm_id = RealmKey::from_bytes([1u8; 32]).realm_id();
        assert!(namespace_app_protocol(&realm_id, "/app/other/chat/1.0").is_err());
    }

    #[test]
    fn sys_prefix_is_always_forwardable() {
        let realm_id = RealmKey::from_bytes([1u8; 32]).realm_id();
        assert!(relay_may_forward(&realm_id, "/sys/relay/1.0/hop"));
    }

    #[test]
    fn foreign_realm_prefix_is_rejected() {
        let realm_id = RealmKey::from_bytes([1u8; 32]).realm_id();
        let other_realm_id = RealmKey::from_bytes([2u8; 32]).realm_id();
        let wire_proto = format!("/app/{other_realm_id}/chat/1.0");
        assert!(!relay_may_forward(&realm_id, &wire_proto));
    }

    #[test]
    fn own_app_and_realm_prefixes_are_forwardable() {
        let realm_id = RealmKey::from_bytes([1u8; 32]).realm_id();
        assert!(relay_may_forward(&realm_id, &format!("/app/{realm_id}/chat/1.0")));
        assert!(relay_may_forward(&realm_id, &format!("/realm/{realm_id}/auth/1.0")));
    }
}
