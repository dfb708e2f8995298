//! Synchronizer tuning configuration.
//!
//! A queued synchronizer never spins for long: the first queued thread makes
//! a bounded number of extra acquire attempts before it parks, and timed waits
//! stop parking once so little time remains that a park/unpark round trip
//! would overshoot the deadline.
//!
//! # Defaults
//!
//! | Field | Default | Variable read by [`SyncConfig::from_env`] |
//! |-------|---------|-------------------------------------------|
//! | `spins_before_park` | 1 | `QSYNC_SPINS_BEFORE_PARK` |
//! | `timeout_spin_threshold` | 1µs | `QSYNC_TIMEOUT_SPIN_NS` |
//!
//! The environment is never consulted implicitly: [`SyncConfig::default`] and
//! every `new` constructor use the fixed defaults. Opt in by passing
//! `SyncConfig::from_env()` to a `with_config` constructor.

use std::time::Duration;

/// Upper bound applied by [`SyncConfig::normalize`] to the retry count.
pub const MAX_SPINS_BEFORE_PARK: u32 = 1 << 10;

/// Tuning knobs for a [`QueuedSynchronizer`](crate::queue::QueuedSynchronizer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Extra acquire attempts the first queued node makes before parking.
    pub spins_before_park: u32,
    /// Remaining time under which timed waits spin instead of parking.
    pub timeout_spin_threshold: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            spins_before_park: 1,
            timeout_spin_threshold: Duration::from_micros(1),
        }
    }
}

impl SyncConfig {
    /// Returns the defaults with any `QSYNC_*` environment overrides applied.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(spins) = parse_var::<u32>(&lookup, "QSYNC_SPINS_BEFORE_PARK") {
            config.spins_before_park = spins;
        }
        if let Some(nanos) = parse_var::<u64>(&lookup, "QSYNC_TIMEOUT_SPIN_NS") {
            config.timeout_spin_threshold = Duration::from_nanos(nanos);
        }
        config.normalize();
        config
    }

    /// Sets the number of extra acquire attempts before parking.
    #[must_use]
    pub const fn with_spins_before_park(mut self, spins: u32) -> Self {
        self.spins_before_park = spins;
        self
    }

    /// Sets the remaining-time bound under which timed waits spin.
    #[must_use]
    pub const fn with_timeout_spin_threshold(mut self, threshold: Duration) -> Self {
        self.timeout_spin_threshold = threshold;
        self
    }

    /// Clamps values to the supported range.
    pub fn normalize(&mut self) {
        if self.spins_before_park > MAX_SPINS_BEFORE_PARK {
            self.spins_before_park = MAX_SPINS_BEFORE_PARK;
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    lookup(key).and_then(|raw| raw.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.spins_before_park, 1);
        assert_eq!(config.timeout_spin_threshold, Duration::from_micros(1));
    }

    #[test]
    fn builder_setters() {
        let config = SyncConfig::default()
            .with_spins_before_park(0)
            .with_timeout_spin_threshold(Duration::ZERO);
        assert_eq!(config.spins_before_park, 0);
        assert!(config.timeout_spin_threshold.is_zero());
    }

    #[test]
    fn lookup_overrides_and_clamps() {
        let config = SyncConfig::from_lookup(|key| match key {
            "QSYNC_SPINS_BEFORE_PARK" => Some(" 99999 ".to_string()),
            "QSYNC_TIMEOUT_SPIN_NS" => Some("2500".to_string()),
            _ => None,
        });
        assert_eq!(config.spins_before_park, MAX_SPINS_BEFORE_PARK);
        assert_eq!(config.timeout_spin_threshold, Duration::from_nanos(2500));
    }

    #[test]
    fn lookup_ignores_unparseable_values() {
        let config = SyncConfig::from_lookup(|key| match key {
            "QSYNC_SPINS_BEFORE_PARK" => Some("many".to_string()),
            "QSYNC_TIMEOUT_SPIN_NS" => Some("-1".to_string()),
            _ => None,
        });
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn from_env_without_overrides_matches_defaults() {
        // The test environment does not set QSYNC_* variables.
        if std::env::vars().any(|(key, _)| key.starts_with("QSYNC_")) {
            return;
        }
        assert_eq!(SyncConfig::from_env(), SyncConfig::default());
    }

    #[test]
    fn normalize_clamps_spins() {
        let mut config = SyncConfig::default().with_spins_before_park(u32::MAX);
        config.normalize();
        assert_eq!(config.spins_before_park, MAX_SPINS_BEFORE_PARK);
    }
}
