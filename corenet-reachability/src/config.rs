use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ReachabilityConfig {
    pub dial_back_timeout: Duration,
    pub dial_back_consensus: usize,
    pub reclassify_interval: Duration,
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        ReachabilityConfig {
            dial_back_timeout: Duration::from_secs(15),
            dial_back_consensus: 2,
            reclassify_interval: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReachabilityConfigBuilder {
    dial_back_timeout: Option<Duration>,
    dial_back_consensus: Option<usize>,
    reclassify_interval: Option<Duration>,
}

impl ReachabilityConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dial_back_timeout(mut self, timeout: Duration) -> Self {
        self.dial_back_timeout = Some(timeout);
        self
    }

    pub fn dial_back_consensus(mut self, n: usize) -> Self {
        self.dial_back_consensus = Some(n);
        self
    }

    pub fn reclassify_interval(mut self, interval: Duration) -> Self {
        self.reclassify_interval = Some(interval);
        self
    }

    pub fn build(self) -> ReachabilityConfig {
        let defaults = ReachabilityConfig::default();
        ReachabilityConfig {
            dial_back_timeout: self.dial_back_timeout.unwrap_or(defaults.dial_back_timeout),
            dial_back_consensus: self.dial_back_consensus.unwrap_or(defaults.dial_back_consensus),
            reclassify_interval: self.reclassify_interval.unwrap_or(defaults.reclassify_interval),
        }
    }
}
