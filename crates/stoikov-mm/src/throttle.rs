//! Per-minute request throttle and end-of-day cutoff.
//!
//! Every placement and cancel counts as one request. Once the count for the
//! current minute exceeds the limit, or the session is inside its end-of-day
//! window, the controller switches to cover-only quoting.

use tracing::debug;

use crate::horizon::{is_new_minute, minute_bucket};

/// Request throttle governor.
#[derive(Debug, Clone)]
pub struct ThrottleGovernor {
    /// Requests allowed per minute before cover-only trips.
    request_limit: u32,
    /// End-of-day window in milliseconds.
    cover_only_window_ms: u64,
    /// Requests recorded in the current minute bucket.
    request_counter: u32,
    /// Last observed timestamp.
    last_observed_ms: Option<i64>,
}

impl ThrottleGovernor {
    pub fn new(request_limit: u32, cover_only_window_ms: u64) -> Self {
        Self {
            request_limit,
            cover_only_window_ms,
            request_counter: 0,
            last_observed_ms: None,
        }
    }

    /// Observe a timestamp, resetting the counter when its minute bucket
    /// differs from the previous one. Returns true on reset.
    pub fn observe(&mut self, now_ms: i64) -> bool {
        match self.last_observed_ms.replace(now_ms) {
            Some(last_ms) if is_new_minute(now_ms, last_ms) => {
                debug!(
                    previous = minute_bucket(last_ms),
                    current = minute_bucket(now_ms),
                    requests = self.request_counter,
                    "New minute, resetting request counter"
                );
                self.on_new_minute();
                true
            }
            _ => false,
        }
    }

    /// Count one request against the current minute.
    pub fn record_request(&mut self) {
        self.request_counter = self.request_counter.saturating_add(1);
    }

    /// Reset the per-minute counter.
    pub fn on_new_minute(&mut self) {
        self.request_counter = 0;
    }

    /// True iff the counter is strictly above the limit.
    pub fn is_over_limit(&self) -> bool {
        self.request_counter > self.request_limit
    }

    /// True iff less than the end-of-day window remains.
    pub fn end_of_day(&self, remaining_ms: i64) -> bool {
        i128::from(remaining_ms) < i128::from(self.cover_only_window_ms)
    }

    /// `end_of_day || over_limit`.
    pub fn cover_only(&self, remaining_ms: i64) -> bool {
        self.end_of_day(remaining_ms) || self.is_over_limit()
    }

    pub fn request_counter(&self) -> u32 {
        self.request_counter
    }

    pub fn request_limit(&self) -> u32 {
        self.request_limit
    }

    /// Minute bucket of the last observed timestamp.
    pub fn minute_marker(&self) -> Option<i64> {
        self.last_observed_ms.map(minute_bucket)
    }
}
