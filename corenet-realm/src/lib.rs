//! Realm isolation (SPEC §4.8): pre-shared-key membership, protocol
//! namespacing, relay forwarding policy, and realm-scoped rate limiting.

mod error;
mod gate;
mod proof;
mod protocol;
mod rate_limit;

pub use error::RealmError;
pub use gate::{MembershipState, RealmGate};
pub use proof::{MembershipProof, PROOF_VALIDITY_WINDOW};
pub use protocol::{namespace_app_protocol, relay_may_forward};
pub use rate_limit::{RateLimitConfig, RateLimitResult, RealmMessageKind, RealmRateLimiter};
