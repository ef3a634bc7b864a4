//! Market making configuration.
//!
//! All parameters are static for a run: they are loaded once, validated,
//! and never mutated afterwards.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{MakerError, MakerResult};

/// Milliseconds in one trading day.
pub const MILLIS_PER_DAY: u64 = 86_400_000;

/// Avellaneda-Stoikov market making configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakerConfig {
    /// Instrument symbol, used for log fields and metric labels.
    #[serde(default)]
    pub symbol: String,

    /// Order book liquidity sensitivity (`k`). Must be > 0.
    #[serde(default = "default_k")]
    pub k: Decimal,

    /// Volatility (`sigma`). Must be >= 0.
    #[serde(default = "default_sigma")]
    pub sigma: Decimal,

    /// Risk aversion (`gamma`). Must be > 0.
    #[serde(default = "default_gamma")]
    pub gamma: Decimal,

    /// Quantity of every quote leg, in lots.
    #[serde(default = "default_fixed_size")]
    pub fixed_size: u64,

    /// End-of-day cutoff: once less than this much of the session remains,
    /// only inventory-reducing legs are quoted.
    #[serde(default = "default_cover_only_window_ms")]
    pub cover_only_window_ms: u64,

    /// Requests allowed per minute before switching to cover-only.
    /// The limit itself is still allowed; only exceeding it trips.
    #[serde(default = "default_cover_only_request_limit")]
    pub cover_only_request_limit: u32,

    /// Instrument price tick. Must be > 0.
    #[serde(default = "default_price_tick")]
    pub price_tick: Decimal,

    /// Session length added to the day's midnight to get the session end.
    #[serde(default = "default_session_length_ms")]
    pub session_length_ms: u64,

    /// UTC offset of the calendar used for midnight truncation.
    #[serde(default)]
    pub session_utc_offset_minutes: i32,

    /// How long a requested cancel may stay unconfirmed before the order is
    /// dropped from tracking. 0 keeps them until confirmed.
    #[serde(default = "default_cancel_in_flight_ttl_ms")]
    pub cancel_in_flight_ttl_ms: u64,
}

impl Default for MakerConfig {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            k: default_k(),
            sigma: default_sigma(),
            gamma: default_gamma(),
            fixed_size: default_fixed_size(),
            cover_only_window_ms: default_cover_only_window_ms(),
            cover_only_request_limit: default_cover_only_request_limit(),
            price_tick: default_price_tick(),
            session_length_ms: default_session_length_ms(),
            session_utc_offset_minutes: 0,
            cancel_in_flight_ttl_ms: default_cancel_in_flight_ttl_ms(),
        }
    }
}

impl MakerConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(content: &str) -> MakerResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> MakerResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| MakerError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject configurations the quoting model cannot run with.
    pub fn validate(&self) -> MakerResult<()> {
        if self.k <= Decimal::ZERO {
            return Err(MakerError::InvalidConfig(format!(
                "k must be > 0, got {}",
                self.k
            )));
        }
        if self.gamma <= Decimal::ZERO {
            return Err(MakerError::InvalidConfig(format!(
                "gamma must be > 0, got {}",
                self.gamma
            )));
        }
        if self.sigma < Decimal::ZERO {
            return Err(MakerError::InvalidConfig(format!(
                "sigma must be >= 0, got {}",
                self.sigma
            )));
        }
        if self.fixed_size == 0 {
            return Err(MakerError::InvalidConfig(
                "fixed_size must be > 0".to_string(),
            ));
        }
        if self.price_tick <= Decimal::ZERO {
            return Err(MakerError::InvalidConfig(format!(
                "price_tick must be > 0, got {}",
                self.price_tick
            )));
        }
        if self.session_length_ms == 0 {
            return Err(MakerError::InvalidConfig(
                "session_length_ms must be > 0".to_string(),
            ));
        }
        if i64::try_from(self.session_length_ms).is_err() {
            return Err(MakerError::InvalidConfig(format!(
                "session_length_ms too large: {}",
                self.session_length_ms
            )));
        }
        if self.session_utc_offset_minutes.abs() >= 24 * 60 {
            return Err(MakerError::InvalidConfig(format!(
                "session_utc_offset_minutes out of range: {}",
                self.session_utc_offset_minutes
            )));
        }
        Ok(())
    }
}

fn default_k() -> Decimal {
    Decimal::new(1, 1) // 0.1
}
fn default_sigma() -> Decimal {
    Decimal::ONE
}
fn default_gamma() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_fixed_size() -> u64 {
    1000
}
fn default_cover_only_window_ms() -> u64 {
    15 * 60 * 1000 // last 15 minutes
}
fn default_cover_only_request_limit() -> u32 {
    400
}
fn default_price_tick() -> Decimal {
    Decimal::new(1, 2) // 0.01
}
fn default_session_length_ms() -> u64 {
    MILLIS_PER_DAY
}
fn default_cancel_in_flight_ttl_ms() -> u64 {
    5 * 60 * 1000
}
