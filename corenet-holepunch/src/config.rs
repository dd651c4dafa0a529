use std::time::Duration;

/// Tuning knobs for the simultaneous-open burst dial (SPEC §4.6).
#[derive(Clone, Debug)]
pub struct HolePunchConfig {
    /// Number of UDP packets fired per local candidate address during the burst.
    pub burst_count: u32,
    /// Spacing between successive packets within a burst.
    pub burst_spacing: Duration,
    /// Total window during which burst packets are sent and replies are accepted.
    pub burst_window: Duration,
    /// Upper bound on the whole attempt, from signaling through burst completion.
    pub attempt_timeout: Duration,
}

impl Default for HolePunchConfig {
    fn default() -> Self {
        HolePunchConfig {
            burst_count: 5,
            burst_spacing: Duration::from_millis(100),
            burst_window: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl HolePunchConfig {
    pub fn builder() -> HolePunchConfigBuilder {
        HolePunchConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct HolePunchConfigBuilder {
    inner: Option<HolePunchConfig>,
}

impl HolePunchConfigBuilder {
    fn base(&mut self) -> HolePunchConfig {
        self.inner.take().unwrap_or_default()
    }

    pub fn burst_count(mut self, burst_count: u32) -> Self {
        let mut cfg = self.base();
        cfg.burst_count = burst_count;
        self.inner = Some(cfg);
        self
    }

    pub fn attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        let mut cfg = self.base();
        cfg.attempt_timeout = attempt_timeout;
        self.inner = Some(cfg);
        self
    }

    pub fn build(self) -> HolePunchConfig {
        self.inner.unwrap_or_default()
    }
}
