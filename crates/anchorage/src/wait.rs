//! Wait Mechanisms
//!
//! Every wait in Anchorage is the same bounded polling loop: probe, and if the
//! probe is not satisfied sleep one poll interval, until the timeout elapses.
//! Loops never give up before the timeout has fully elapsed.
//!
//! ## Toyota Way Application
//!
//! - **Jidoka**: Probes stop the loop as soon as the condition holds
//! - **Poka-Yoke**: Non-transient errors abort the wait instead of being retried
//! - **Muda**: Sleeps are clamped so the last poll lands on the deadline

use crate::result::AnchorageResult;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for element resolution and recovery (10 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Environment variable overriding the timeout, in whole seconds
pub const TIMEOUT_ENV: &str = "ANCHORAGE_TIMEOUT_SECS";

/// Environment variable overriding the poll interval, in milliseconds
pub const POLL_INTERVAL_ENV: &str = "ANCHORAGE_POLL_INTERVAL_MS";

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_SECS * 1000,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set timeout in whole seconds
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_ms = secs.saturating_mul(1000);
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration, never shorter than one millisecond
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Defaults overridden by `ANCHORAGE_TIMEOUT_SECS` and `ANCHORAGE_POLL_INTERVAL_MS`
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the two settings
    ///
    /// Unparsable values are logged and ignored.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(secs) = parse_setting(&lookup, TIMEOUT_ENV) {
            options.timeout_ms = secs.saturating_mul(1000);
        }
        if let Some(ms) = parse_setting(&lookup, POLL_INTERVAL_ENV) {
            options.poll_interval_ms = ms;
        }
        options
    }
}

fn parse_setting<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, value = %raw, error = %err, "ignoring unparsable wait setting");
            None
        }
    }
}

// =============================================================================
// POLLING
// =============================================================================

/// Poll `probe` until it yields a value or the timeout elapses
///
/// Returns `Ok(None)` on timeout. An `Err` from the probe aborts the wait
/// immediately; probes decide for themselves which errors mean "not yet".
pub fn poll_until<T, F>(options: &WaitOptions, waited_for: &str, mut probe: F) -> AnchorageResult<Option<T>>
where
    F: FnMut() -> AnchorageResult<Option<T>>,
{
    let start = Instant::now();
    let timeout = options.timeout();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        if let Some(value) = probe()? {
            trace!(waited_for, attempts, elapsed_ms = start.elapsed().as_millis() as u64, "wait satisfied");
            return Ok(Some(value));
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            debug!(waited_for, attempts, timeout_ms = options.timeout_ms, "wait timed out");
            return Ok(None);
        }
        std::thread::sleep(options.poll_interval().min(timeout - elapsed));
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::result::AnchorageError;
    use std::collections::HashMap;

    mod options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let options = WaitOptions::default();
            assert_eq!(options.timeout_ms, 10_000);
            assert_eq!(options.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
            assert_eq!(options.timeout(), Duration::from_secs(10));
        }

        #[test]
        fn test_builder() {
            let options = WaitOptions::new().with_timeout_secs(3).with_poll_interval(5);
            assert_eq!(options.timeout_ms, 3000);
            assert_eq!(options.poll_interval(), Duration::from_millis(5));
        }

        #[test]
        fn test_zero_poll_interval_is_clamped() {
            let options = WaitOptions::new().with_poll_interval(0);
            assert_eq!(options.poll_interval(), Duration::from_millis(1));
        }

        #[test]
        fn test_from_lookup_overrides() {
            let settings: HashMap<&str, &str> =
                [(TIMEOUT_ENV, "2"), (POLL_INTERVAL_ENV, " 20 ")].into_iter().collect();
            let options = WaitOptions::from_lookup(|key| settings.get(key).map(|v| (*v).to_string()));
            assert_eq!(options.timeout_ms, 2000);
            assert_eq!(options.poll_interval_ms, 20);
        }

        #[test]
        fn test_from_lookup_ignores_garbage() {
            let options = WaitOptions::from_lookup(|key| {
                (key == TIMEOUT_ENV).then(|| "soon".to_string())
            });
            assert_eq!(options, WaitOptions::default());
        }

        #[test]
        fn test_serde_round_trip() {
            let options = WaitOptions::new().with_timeout(750);
            let json = serde_json::to_string(&options).unwrap();
            let back: WaitOptions = serde_json::from_str(&json).unwrap();
            assert_eq!(back, options);
        }
    }

    mod poll_tests {
        use super::*;

        #[test]
        fn test_returns_as_soon_as_probe_succeeds() {
            let options = WaitOptions::new().with_timeout(5000).with_poll_interval(1);
            let mut calls = 0;
            let value = poll_until(&options, "third call", || {
                calls += 1;
                Ok((calls == 3).then_some(calls))
            })
            .unwrap();
            assert_eq!(value, Some(3));
        }

        #[test]
        fn test_never_gives_up_early() {
            let options = WaitOptions::new().with_timeout(120).with_poll_interval(10);
            let start = Instant::now();
            let value: Option<()> = poll_until(&options, "nothing", || Ok(None)).unwrap();
            let elapsed = start.elapsed();
            assert!(value.is_none());
            assert!(elapsed >= Duration::from_millis(120));
            assert!(elapsed < Duration::from_millis(1000));
        }

        #[test]
        fn test_errors_abort_immediately() {
            let options = WaitOptions::new().with_timeout(5000);
            let start = Instant::now();
            let result: AnchorageResult<Option<()>> =
                poll_until(&options, "error", || Err(AnchorageError::ComponentNotLoaded));
            assert!(matches!(result, Err(AnchorageError::ComponentNotLoaded)));
            assert!(start.elapsed() < Duration::from_millis(1000));
        }

        #[test]
        fn test_zero_timeout_probes_once() {
            let options = WaitOptions::new().with_timeout(0);
            let mut calls = 0;
            let value: Option<()> = poll_until(&options, "once", || {
                calls += 1;
                Ok(None)
            })
            .unwrap();
            assert!(value.is_none());
            assert_eq!(calls, 1);
        }
    }
}
