//! Per-host adaptive rate limiting.
//!
//! The throttler wraps every outbound HTTP call. Before a request it checks
//! whether the target host is still inside a backoff window and fails fast
//! without touching the network; after a response it looks for throttling
//! signals (a redirect to Douban's security challenge, or a plain HTTP 429)
//! and opens a new backoff window for that host.
//!
//! State is process-wide, in-memory, and keyed by hostname. It is touched
//! from every concurrent request path, so per-host updates go through the
//! map's entry lock and only ever move the deadline forward.

use std::collections::HashMap;

use dashmap::DashMap;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use serde::Serialize;

use crate::cache::unix_now;
use crate::error::{AppError, AppResult};

/// Redirect target Douban uses when it wants the caller to solve a challenge.
const SECURITY_CHALLENGE_HOST: &str = "sec.douban.com";

/// Header some APIs use to announce when the rate-limit window resets.
const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Fallback wait when a 429 carries no usable headers.
const DEFAULT_WAIT_SECONDS: f64 = 60.0;

/// Throttle state for one host, as reported by `/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct HostThrottleInfo {
    pub is_rate_limited: bool,
    pub wait_time: f64,
}

pub struct Throttler {
    /// Earliest permitted call time per host, unix seconds.
    next_call_time: DashMap<String, f64>,
    challenge_delay_seconds: f64,
}

impl Throttler {
    pub fn new(challenge_delay_seconds: f64) -> Self {
        Self {
            next_call_time: DashMap::new(),
            challenge_delay_seconds,
        }
    }

    /// Fails with `RateLimited` if `host` is still inside a backoff window.
    /// Must be called before performing any network I/O to that host.
    pub fn before_request(&self, host: &str) -> AppResult<()> {
        if let Some(next_call_time) = self.next_call_time.get(host) {
            let now = unix_now();
            if now < *next_call_time {
                return Err(AppError::RateLimited {
                    host: host.to_string(),
                    wait_secs: *next_call_time - now,
                });
            }
        }
        Ok(())
    }

    /// Inspects a response for throttling signals. Any status other than a
    /// challenge redirect or 429 passes through untouched; non-429 errors are
    /// the caller's concern.
    pub fn on_response(&self, host: &str, status: StatusCode, headers: &HeaderMap) -> AppResult<()> {
        if status.is_redirection()
            && headers
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|location| location.contains(SECURITY_CHALLENGE_HOST))
        {
            return Err(self.block(host, self.challenge_delay_seconds));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(self.block(host, Self::wait_from_headers(headers)));
        }

        Ok(())
    }

    /// Current throttle state for every host with recorded state.
    pub fn info(&self) -> HashMap<String, HostThrottleInfo> {
        let now = unix_now();
        self.next_call_time
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    HostThrottleInfo {
                        is_rate_limited: now < *entry.value(),
                        wait_time: (*entry.value() - now).max(0.0),
                    },
                )
            })
            .collect()
    }

    fn block(&self, host: &str, wait_secs: f64) -> AppError {
        let until = unix_now() + wait_secs;
        self.next_call_time
            .entry(host.to_string())
            .and_modify(|t| {
                if until > *t {
                    *t = until;
                }
            })
            .or_insert(until);
        tracing::warn!(host, wait_secs, "Rate limited by upstream");
        AppError::RateLimited {
            host: host.to_string(),
            wait_secs,
        }
    }

    fn wait_from_headers(headers: &HeaderMap) -> f64 {
        if let Some(retry_after) = headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
        {
            return retry_after as f64;
        }
        if let Some(reset_time) = headers
            .get(RATE_LIMIT_RESET_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
        {
            return (reset_time as f64 - unix_now()).max(0.0);
        }
        DEFAULT_WAIT_SECONDS
    }
}
