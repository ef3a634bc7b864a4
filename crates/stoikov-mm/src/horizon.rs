//! Session horizon tracking.
//!
//! Converts a timestamp into the time left until the session boundary and
//! the corresponding fraction of the session (`delta_t`). Also buckets
//! timestamps into minutes for the request throttle.

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone};
use rust_decimal::Decimal;

use stoikov_core::CoreError;

use crate::error::{MakerError, MakerResult};

/// Milliseconds per throttle bucket.
pub const MILLIS_PER_MINUTE: i64 = 60_000;

/// Remaining session time at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHorizon {
    /// Milliseconds until the session boundary. Negative past the boundary.
    pub remaining_ms: i64,
    /// `remaining_ms / session_length_ms`. Not clipped.
    pub delta_t: Decimal,
}

impl SessionHorizon {
    /// True when `delta_t` falls outside [0, 1].
    ///
    /// Quotes are still produced, but the inventory skew no longer behaves
    /// like a shrinking horizon; callers should read it as "likely end of day".
    pub fn is_degenerate(&self) -> bool {
        self.delta_t < Decimal::ZERO || self.delta_t > Decimal::ONE
    }
}

/// Computes the remaining fraction of the trading session.
#[derive(Debug, Clone)]
pub struct TimeHorizonTracker {
    /// Positive and within `i64`, checked at construction.
    session_length_ms: i64,
    utc_offset: FixedOffset,
}

impl TimeHorizonTracker {
    /// Create a tracker for sessions of `session_length_ms`, truncating to
    /// midnight in the calendar `utc_offset_minutes` east of UTC.
    pub fn new(session_length_ms: u64, utc_offset_minutes: i32) -> MakerResult<Self> {
        if session_length_ms == 0 {
            return Err(MakerError::InvalidConfig(
                "session_length_ms must be > 0".to_string(),
            ));
        }
        let session_length_ms = i64::try_from(session_length_ms).map_err(|_| {
            MakerError::InvalidConfig(format!(
                "session_length_ms too large: {session_length_ms}"
            ))
        })?;
        let utc_offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            MakerError::InvalidConfig(format!("invalid UTC offset: {utc_offset_minutes} min"))
        })?;
        Ok(Self {
            session_length_ms,
            utc_offset,
        })
    }

    pub fn session_length_ms(&self) -> u64 {
        self.session_length_ms.unsigned_abs()
    }

    /// Milliseconds from `now_ms` until midnight of the same calendar day
    /// plus the session length.
    pub fn remaining_ms(&self, now_ms: i64) -> MakerResult<i64> {
        let now: DateTime<FixedOffset> = self
            .utc_offset
            .timestamp_millis_opt(now_ms)
            .single()
            .ok_or(CoreError::InvalidTimestamp(now_ms))?;
        let midnight = self
            .utc_offset
            .from_local_datetime(&now.date_naive().and_time(NaiveTime::MIN))
            .single()
            .ok_or(CoreError::InvalidTimestamp(now_ms))?;

        midnight
            .timestamp_millis()
            .checked_add(self.session_length_ms)
            .and_then(|end_ms| end_ms.checked_sub(now_ms))
            .ok_or(MakerError::Core(CoreError::InvalidTimestamp(now_ms)))
    }

    /// Remaining time and session fraction at `now_ms`.
    pub fn horizon(&self, now_ms: i64) -> MakerResult<SessionHorizon> {
        let remaining_ms = self.remaining_ms(now_ms)?;
        let delta_t = Decimal::from(remaining_ms) / Decimal::from(self.session_length_ms);
        Ok(SessionHorizon {
            remaining_ms,
            delta_t,
        })
    }
}

/// Monotonic minute bucket for a Unix-millisecond timestamp.
#[inline]
pub fn minute_bucket(ts_ms: i64) -> i64 {
    ts_ms.div_euclid(MILLIS_PER_MINUTE)
}

/// True when `now_ms` lies in a different minute bucket than `last_ms`.
///
/// Uses the full timestamp, so equal minute-of-hour values an hour apart
/// are still distinct minutes.
#[inline]
pub fn is_new_minute(now_ms: i64, last_ms: i64) -> bool {
    minute_bucket(now_ms) != minute_bucket(last_ms)
}
