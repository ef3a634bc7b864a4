//! Quote price calculation engine.
//!
//! Avellaneda-Stoikov quoting around an inventory-adjusted reservation price:
//! - `r = s - q * gamma * sigma^2 * delta_t`
//! - `spread = gamma * sigma^2 * delta_t + (2 / gamma) * ln(1 + gamma / k)`
//! - ask = `r + spread / 2` rounded up to the tick, bid = `r - spread / 2`
//!   rounded down to the tick

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use stoikov_core::Price;

use crate::config::MakerConfig;
use crate::error::{MakerError, MakerResult};

/// Quotes computed for one market update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    /// Inventory-adjusted fair price.
    pub reservation_price: Price,
    /// Total model spread around the reservation price.
    pub spread: Decimal,
    /// `r - spread / 2` before tick rounding.
    pub raw_bid: Price,
    /// `r + spread / 2` before tick rounding.
    pub raw_ask: Price,
    /// Bid rounded down to the price tick.
    pub bid_price: Price,
    /// Ask rounded up to the price tick.
    pub ask_price: Price,
}

/// `ln(1 + x)` for Decimal values via f64 conversion.
/// Precision loss is irrelevant next to tick rounding.
fn decimal_ln_1p(x: Decimal) -> Option<Decimal> {
    let v = x.to_f64()?.ln_1p();
    if !v.is_finite() {
        return None;
    }
    Decimal::from_f64_retain(v)
}

/// Stateless quote calculator for fixed model parameters.
#[derive(Debug, Clone)]
pub struct QuoteEngine {
    /// `gamma * sigma^2`.
    risk_coeff: Decimal,
    price_tick: Price,
    /// `(2 / gamma) * ln(1 + gamma / k)`; depends only on parameters.
    liquidity_term: Decimal,
}

impl QuoteEngine {
    /// Build an engine from validated parameters.
    ///
    /// Fails on `k <= 0`, `gamma <= 0`, `sigma < 0` or `price_tick <= 0`, and
    /// on parameters whose derived terms overflow `Decimal`.
    pub fn new(config: &MakerConfig) -> MakerResult<Self> {
        config.validate()?;

        let out_of_range = |what: &str| {
            MakerError::InvalidConfig(format!(
                "{what} out of decimal range for gamma={} k={} sigma={}",
                config.gamma, config.k, config.sigma
            ))
        };

        let ratio = config
            .gamma
            .checked_div(config.k)
            .ok_or_else(|| out_of_range("gamma / k"))?;
        let ln_term = decimal_ln_1p(ratio).ok_or_else(|| out_of_range("ln(1 + gamma / k)"))?;
        let liquidity_term = Decimal::TWO
            .checked_div(config.gamma)
            .and_then(|v| v.checked_mul(ln_term))
            .ok_or_else(|| out_of_range("liquidity term"))?;
        let risk_coeff = config
            .sigma
            .checked_mul(config.sigma)
            .and_then(|v| v.checked_mul(config.gamma))
            .ok_or_else(|| out_of_range("gamma * sigma^2"))?;

        Ok(Self {
            risk_coeff,
            price_tick: Price::new(config.price_tick),
            liquidity_term,
        })
    }

    /// Constant part of the spread, reached as `delta_t` goes to zero.
    pub fn liquidity_term(&self) -> Decimal {
        self.liquidity_term
    }

    pub fn price_tick(&self) -> Price {
        self.price_tick
    }

    /// Compute quotes for a mid price, signed inventory and session fraction.
    ///
    /// Negative `delta_t` is accepted and produces a best-effort quote.
    pub fn compute(&self, mid_price: Price, inventory: i64, delta_t: Decimal) -> Quote {
        let risk = self.risk_coeff * delta_t;

        let reservation_price = mid_price.inner() - Decimal::from(inventory) * risk;
        let spread = risk + self.liquidity_term;
        let half_spread = spread / Decimal::TWO;

        let raw_ask = Price::new(reservation_price + half_spread);
        let raw_bid = Price::new(reservation_price - half_spread);

        Quote {
            reservation_price: Price::new(reservation_price),
            spread,
            raw_bid,
            raw_ask,
            bid_price: raw_bid.round_down_to_tick(self.price_tick),
            ask_price: raw_ask.round_up_to_tick(self.price_tick),
        }
    }
}
