//! Per-peer, per-message-type sliding-window rate limiting for realm
//! traffic (SPEC §4.8 "Realm-scoped rate limiting", §10.7), guarding the
//! directory RPC and membership-sync handlers from a single noisy or
//! hostile member.

use corenet_identity::NodeId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// The realm-scoped message classes subject to rate limiting.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RealmMessageKind {
    DhtRpc,
    RealmAnnounce,
    HolepunchSignal,
}

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub max_messages_per_second: u32,
    pub burst_limit: u32,
    pub burst_window: Duration,
    pub disconnect_threshold: u32,
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            max_messages_per_second: 20,
            burst_limit: 60,
            burst_window: Duration::from_secs(1),
            disconnect_threshold: 5,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed,
    RateLimited { violations: u32, remaining: u32 },
    Disconnect,
}

impl RateLimitResult {
    pub fn is_allowed(self) -> bool {
        matches!(self, RateLimitResult::Allowed)
    }

    pub fn should_disconnect(self) -> bool {
        matches!(self, RateLimitResult::Disconnect)
    }
}

#[derive(Debug, Default)]
struct PeerRateState {
    message_times: Vec<Instant>,
    violations: u32,
}

impl PeerRateState {
    fn record_message(&mut self, config: &RateLimitConfig) -> bool {
        let now = Instant::now();
        self.message_times.retain(|t| now.duration_since(*t) < config.burst_window);

        if self.message_times.len() >= config.burst_limit as usize {
            self.violations = self.violations.saturating_add(1);
            return false;
        }

        let one_second_ago = now - Duration::from_secs(1);
        let recent_count = self.message_times.iter().filter(|t| **t > one_second_ago).count();
        if recent_count >= config.max_messages_per_second as usize {
            self.violations = self.violations.saturating_add(1);
            return false;
        }

        self.message_times.push(now);
        true
    }
}

/// Tracks per-peer, per-message-kind rate limit state within a single realm.
#[derive(Debug)]
pub struct RealmRateLimiter {
    config: RateLimitConfig,
    peers: HashMap<(NodeId, RealmMessageKind), PeerRateState>,
    flagged: Vec<NodeId>,
}

impl RealmRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        RealmRateLimiter {
            config,
            peers: HashMap::new(),
            flagged: Vec::new(),
        }
    }

    pub fn record_message(&mut self, peer: NodeId, kind: RealmMessageKind) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::Allowed;
        }

        let state = self.peers.entry((peer, kind)).or_default();
        let allowed = state.record_message(&self.config);

        if allowed {
            return RateLimitResult::Allowed;
        }

        if state.violations >= self.config.disconnect_threshold {
            self.flagged.push(peer);
            RateLimitResult::Disconnect
        } else {
            RateLimitResult::RateLimited {
                violations: state.violations,
                remaining: self.config.disconnect_threshold - state.violations,
            }
        }
    }

    pub fn take_flagged_peers(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.flagged)
    }

    pub fn remove_peer(&mut self, peer: NodeId) {
        self.peers.retain(|(p, _), _| *p != peer);
    }

    pub fn tracked_peer_count(&self) -> usize {
        self.peers.len()
    }
}
