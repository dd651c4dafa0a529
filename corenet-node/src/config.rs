use corenet_dialer::DialerConfig;
use corenet_directory::DirectoryConfig;
use corenet_holepunch::HolePunchConfig;
use corenet_reachability::ReachabilityConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration composing every component's tunables (SPEC
/// §10.3). Can be constructed programmatically via [`NodeConfigBuilder`] or
/// loaded from a JSON file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Where the node's long-term identity key file lives. Generated on
    /// first run if absent.
    pub identity_path: PathBuf,
    /// Local address the QUIC listener binds to.
    pub listen_addr: SocketAddr,
    /// Known bootstrap peers, as `/ip4/.../udp/.../quic-v1/p2p/<nodeID>` strings.
    pub bootstrap_peers: Vec<String>,

    #[serde(default = "default_max_concurrent_dials")]
    pub max_concurrent_dials: usize,
    #[serde(default = "default_local_cache_capacity")]
    pub directory_cache_capacity: usize,
    #[serde(default = "default_hole_punch_burst_count")]
    pub hole_punch_burst_count: u32,
}

fn default_max_concurrent_dials() -> usize {
    DialerConfig::default().max_concurrent_dials
}

fn default_local_cache_capacity() -> usize {
    DirectoryConfig::default().local_cache_capacity
}

fn default_hole_punch_burst_count() -> u32 {
    HolePunchConfig::default().burst_count
}

impl NodeConfig {
    pub fn builder(identity_path: PathBuf, listen_addr: SocketAddr) -> NodeConfigBuilder {
        NodeConfigBuilder {
            config: NodeConfig {
                identity_path,
                listen_addr,
                bootstrap_peers: Vec::new(),
                max_concurrent_dials: default_max_concurrent_dials(),
                directory_cache_capacity: default_local_cache_capacity(),
                hole_punch_burst_count: default_hole_punch_burst_count(),
            },
        }
    }

    pub fn load_from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn dialer_config(&self) -> DialerConfig {
        DialerConfig {
            max_concurrent_dials: self.max_concurrent_dials,
            ..DialerConfig::default()
        }
    }

    pub fn directory_config(&self) -> DirectoryConfig {
        DirectoryConfig {
            local_cache_capacity: self.directory_cache_capacity,
            ..DirectoryConfig::default()
        }
    }

    pub fn reachability_config(&self) -> ReachabilityConfig {
        ReachabilityConfig::default()
    }

    pub fn hole_punch_config(&self) -> HolePunchConfig {
        HolePunchConfig {
            burst_count: self.hole_punch_burst_count,
            ..HolePunchConfig::default()
        }
    }
}

pub struct NodeConfigBuilder {
    config: NodeConfig,
}

impl NodeConfigBuilder {
    pub fn bootstrap_peers(mut self, peers: Vec<String>) -> Self {
        self.config.bootstrap_peers = peers;
        self
    }

    pub fn max_concurrent_dials(mut self, value: usize) -> Self {
        self.config.max_concurrent_dials = value;
        self
    }

    pub fn build(self) -> NodeConfig {
        self.config
    }
}
