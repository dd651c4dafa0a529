use std::time::Duration;

/// Tuning knobs for [`crate::Dialer`] (SPEC §4.5).
#[derive(Clone, Debug)]
pub struct DialerConfig {
    /// Upper bound on simultaneous direct-dial attempts raced against each other.
    pub max_concurrent_dials: usize,
    /// How long the direct race is given before falling back to hole-punching.
    pub direct_race_window: Duration,
    /// Budget handed to a single hole-punch attempt.
    pub hole_punch_timeout: Duration,
    /// Overall budget for the whole dial, direct race through relay fallback.
    pub full_dial_timeout: Duration,
}

impl Default for DialerConfig {
    fn default() -> Self {
        DialerConfig {
            max_concurrent_dials: 5,
            direct_race_window: Duration::from_secs(3),
            hole_punch_timeout: Duration::from_secs(10),
            full_dial_timeout: Duration::from_secs(30),
        }
    }
}
