//! Market data types delivered by the host engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::Price;

/// Top-of-book snapshot for a single instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Exchange timestamp (Unix milliseconds).
    pub timestamp_ms: i64,
    /// Best bid price.
    pub bid_price: Price,
    /// Best ask price.
    pub ask_price: Price,
}

impl MarketSnapshot {
    /// Create a new snapshot without validation.
    pub fn new(timestamp_ms: i64, bid_price: Price, ask_price: Price) -> Self {
        Self {
            timestamp_ms,
            bid_price,
            ask_price,
        }
    }

    /// Create a snapshot, rejecting non-positive or crossed prices.
    pub fn try_new(timestamp_ms: i64, bid_price: Price, ask_price: Price) -> Result<Self> {
        if !bid_price.is_positive() {
            return Err(CoreError::InvalidPrice(format!("bid {bid_price}")));
        }
        if !ask_price.is_positive() {
            return Err(CoreError::InvalidPrice(format!("ask {ask_price}")));
        }
        if bid_price > ask_price {
            return Err(CoreError::InvalidPrice(format!(
                "crossed book: bid {bid_price} > ask {ask_price}"
            )));
        }
        Ok(Self::new(timestamp_ms, bid_price, ask_price))
    }

    /// Calculate mid price: (bid + ask) / 2.
    #[inline]
    pub fn mid_price(&self) -> Price {
        Price::mid(self.bid_price, self.ask_price)
    }

    /// Timestamp as a UTC datetime.
    pub fn datetime(&self) -> Result<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_ms)
            .ok_or(CoreError::InvalidTimestamp(self.timestamp_ms))
    }
}
