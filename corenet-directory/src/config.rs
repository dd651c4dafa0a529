use std::time::Duration;

/// Tunables for [`crate::PeerDirectory`], mirroring the builder-style config
/// pattern used throughout this stack.
#[derive(Clone, Debug)]
pub struct DirectoryConfig {
    pub local_cache_capacity: usize,
    pub k_replication: usize,
    pub alpha_parallelism: usize,
    pub republish_interval: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        DirectoryConfig {
            local_cache_capacity: 10_000,
            k_replication: crate::routing::K_BUCKET_SIZE,
            alpha_parallelism: crate::routing::ALPHA,
            republish_interval: Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DirectoryConfigBuilder {
    config: DirectoryConfigInner,
}

#[derive(Clone, Debug, Default)]
struct DirectoryConfigInner {
    local_cache_capacity: Option<usize>,
    k_replication: Option<usize>,
    alpha_parallelism: Option<usize>,
    republish_interval: Option<Duration>,
}

impl DirectoryConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.local_cache_capacity = Some(capacity);
        self
    }

    pub fn k_replication(mut self, k: usize) -> Self {
        self.config.k_replication = Some(k);
        self
    }

    pub fn alpha_parallelism(mut self, alpha: usize) -> Self {
        self.config.alpha_parallelism = Some(alpha);
        self
    }

    pub fn republish_interval(mut self, interval: Duration) -> Self {
        self.config.republish_interval = Some(interval);
        self
    }

    pub fn build(self) -> DirectoryConfig {
        let defaults = DirectoryConfig::default();
        DirectoryConfig {
            local_cache_capacity: self.config.local_cache_capacity.unwrap_or(defaults.local_cache_capacity),
            k_replication: self.config.k_replication.unwrap_or(defaults.k_replication),
            alpha_parallelism: self.config.alpha_parallelism.unwrap_or(defaults.alpha_parallelism),
            republish_interval: self.config.republish_interval.unwrap_or(defaults.republish_interval),
        }
    }
}
