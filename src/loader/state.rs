//! Load State Machine
//!
//! Pure transition logic for a single image load. The async driver feeds
//! it fetch outcomes and acts on the transitions it returns.

use std::time::Duration;

use serde::Serialize;

// == Load Status ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Loading,
    Loaded,
    Error,
}

impl LoadStatus {
    pub fn is_terminal(self) -> bool {
        self != LoadStatus::Loading
    }
}

// == Load State ==
/// Observable state of one load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadState {
    pub status: LoadStatus,
    /// Automatic retries spent in the current run, never above the limit
    pub retry_count: u32,
    /// URL of the current or last attempt, cache buster included
    pub current_url: String,
}

// == Retry Policy ==
/// Bounds on automatic retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each one after
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }
}

/// Delay before the retry that follows `retry_count` earlier retries:
/// `base * 2^retry_count`.
pub fn backoff_delay(base: Duration, retry_count: u32) -> Duration {
    let factor = 1u32.checked_shl(retry_count).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

/// Appends `retry=<n>&t=<timestamp>` so the attempt bypasses HTTP caches.
///
/// Always derived from the un-busted URL so parameters never pile up.
pub fn cache_busted_url(base_url: &str, retry: u32, timestamp_ms: u64) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}retry={retry}&t={timestamp_ms}")
}

// == Transition ==
/// What the driver has to do after feeding the machine an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Record success and notify `on_load`
    Loaded,
    /// Wait `delay`, then fetch `url`
    Retry { delay: Duration, url: String },
    /// Retries exhausted; notify `on_error`
    Failed,
    /// Event does not apply in the current state
    Ignored,
}

// == Load Machine ==
#[derive(Debug, Clone)]
pub struct LoadMachine {
    /// Resolved URL without any cache buster; also the cache key
    base_url: String,
    policy: RetryPolicy,
    state: LoadState,
}

impl LoadMachine {
    /// Starts in `loading`, about to fetch `base_url`.
    pub fn new(base_url: impl Into<String>, policy: RetryPolicy) -> Self {
        let base_url = base_url.into();
        Self {
            state: LoadState {
                status: LoadStatus::Loading,
                retry_count: 0,
                current_url: base_url.clone(),
            },
            base_url,
            policy,
        }
    }

    /// Starts in `loaded`: the URL was found in the cache.
    pub fn from_cache(base_url: impl Into<String>, policy: RetryPolicy) -> Self {
        let mut machine = Self::new(base_url, policy);
        machine.state.status = LoadStatus::Loaded;
        machine
    }

    /// Starts in `error` without any fetch: there was nothing to load.
    pub fn unresolvable(placeholder: impl Into<String>, policy: RetryPolicy) -> Self {
        let mut machine = Self::new(placeholder, policy);
        machine.state.status = LoadStatus::Error;
        machine
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The current attempt succeeded.
    pub fn on_success(&mut self) -> Transition {
        if self.state.status != LoadStatus::Loading {
            return Transition::Ignored;
        }
        self.state.status = LoadStatus::Loaded;
        self.state.retry_count = 0;
        Transition::Loaded
    }

    /// The current attempt failed at `now_ms`.
    pub fn on_failure(&mut self, now_ms: u64) -> Transition {
        if self.state.status != LoadStatus::Loading {
            return Transition::Ignored;
        }

        if self.state.retry_count < self.policy.max_retries {
            let delay = backoff_delay(self.policy.base_delay, self.state.retry_count);
            self.state.retry_count += 1;
            self.state.current_url =
                cache_busted_url(&self.base_url, self.state.retry_count, now_ms);
            Transition::Retry {
                delay,
                url: self.state.current_url.clone(),
            }
        } else {
            self.state.status = LoadStatus::Error;
            Transition::Failed
        }
    }

    /// Re-enters `loading` from a terminal state with a fresh retry budget.
    /// Returns false while a load is still in progress.
    pub fn manual_retry(&mut self, now_ms: u64) -> bool {
        if self.state.status == LoadStatus::Loading {
            return false;
        }
        self.state.status = LoadStatus::Loading;
        self.state.retry_count = 0;
        self.state.current_url = cache_busted_url(&self.base_url, 0, now_ms);
        true
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> LoadMachine {
        LoadMachine::new("https://cdn.example.com/a.jpg", RetryPolicy::default())
    }

    #[test]
    fn test_backoff_doubles_from_one_second() {
        let base = Duration::from_millis(1000);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(2000));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(4000));
    }

    #[test]
    fn test_backoff_saturates() {
        let base = Duration::from_millis(1000);
        assert_eq!(backoff_delay(base, 40), base.saturating_mul(u32::MAX));
    }

    #[test]
    fn test_cache_busted_url() {
        assert_eq!(
            cache_busted_url("https://cdn.example.com/a.jpg", 2, 1700),
            "https://cdn.example.com/a.jpg?retry=2&t=1700"
        );
        assert_eq!(
            cache_busted_url("https://cdn.example.com/a.jpg?w=800", 1, 5),
            "https://cdn.example.com/a.jpg?w=800&retry=1&t=5"
        );
    }

    #[test]
    fn test_success_on_first_attempt() {
        let mut m = machine();
        assert_eq!(m.state().status, LoadStatus::Loading);
        assert_eq!(m.on_success(), Transition::Loaded);
        assert_eq!(m.state().status, LoadStatus::Loaded);
        assert_eq!(m.state().retry_count, 0);
    }

    #[test]
    fn test_failures_retry_then_error() {
        let mut m = machine();
        let mut delays = Vec::new();

        for now in [10, 20, 30] {
            match m.on_failure(now) {
                Transition::Retry { delay, url } => {
                    delays.push(delay.as_millis());
                    assert!(url.ends_with(&format!("&t={now}")));
                    assert_eq!(m.state().status, LoadStatus::Loading);
                }
                other => panic!("expected retry, got {other:?}"),
            }
        }

        assert_eq!(delays, vec![1000, 2000, 4000]);
        assert_eq!(m.state().retry_count, 3);
        assert_eq!(
            m.state().current_url,
            "https://cdn.example.com/a.jpg?retry=3&t=30"
        );

        assert_eq!(m.on_failure(40), Transition::Failed);
        assert_eq!(m.state().status, LoadStatus::Error);
        assert_eq!(m.state().retry_count, 3);

        // Terminal: further events change nothing
        assert_eq!(m.on_failure(50), Transition::Ignored);
        assert_eq!(m.on_success(), Transition::Ignored);
        assert_eq!(m.state().status, LoadStatus::Error);
    }

    #[test]
    fn test_success_after_retry_clears_count() {
        let mut m = machine();
        m.on_failure(1);
        m.on_failure(2);
        assert_eq!(m.on_success(), Transition::Loaded);
        assert_eq!(m.state().retry_count, 0);
    }

    #[test]
    fn test_manual_retry_from_error() {
        let mut m = machine();
        for now in 0..4 {
            m.on_failure(now);
        }
        assert_eq!(m.state().status, LoadStatus::Error);

        assert!(m.manual_retry(99));
        assert_eq!(m.state().status, LoadStatus::Loading);
        assert_eq!(m.state().retry_count, 0);
        assert_eq!(
            m.state().current_url,
            "https://cdn.example.com/a.jpg?retry=0&t=99"
        );

        assert_eq!(m.on_success(), Transition::Loaded);
    }

    #[test]
    fn test_manual_retry_ignored_while_loading() {
        let mut m = machine();
        assert!(!m.manual_retry(1));
        assert_eq!(m.state().current_url, "https://cdn.example.com/a.jpg");
    }

    #[test]
    fn test_alternate_starting_states() {
        let cached = LoadMachine::from_cache("x", RetryPolicy::default());
        assert_eq!(cached.state().status, LoadStatus::Loaded);

        let empty = LoadMachine::unresolvable("/placeholder.svg", RetryPolicy::default());
        assert_eq!(empty.state().status, LoadStatus::Error);
        assert_eq!(empty.state().current_url, "/placeholder.svg");
    }

    #[test]
    fn test_zero_retry_policy_fails_immediately() {
        let policy = RetryPolicy {
            max_retries: 0,
            base_delay: Duration::from_millis(1000),
        };
        let mut m = LoadMachine::new("a", policy);
        assert_eq!(m.on_failure(0), Transition::Failed);
    }
}
