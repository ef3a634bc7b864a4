//! Prometheus metrics for the stoikov market maker.
//!
//! Covers:
//! - Requests counted against the per-minute throttle
//! - Cover-only (unwind-only) mode
//! - Degenerate session horizon observations
//! - Rejected orders and fills on cancel-in-flight orders
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a startup bug. These panics only occur
//! during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_gauge_vec, register_int_counter_vec, register_int_gauge_vec, Encoder, GaugeVec,
    IntCounterVec, IntGaugeVec, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Requests (placements and cancels) counted against the throttle.
/// Labels: symbol, kind (open_long/open_short/reduce_long/reduce_short/cancel)
pub static REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "stoikov_requests_total",
        "Total order requests counted against the throttle",
        &["symbol", "kind"]
    )
    .unwrap()
});

/// Current per-minute request counter.
pub static REQUEST_COUNTER: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "stoikov_request_counter",
        "Requests issued in the current minute bucket",
        &["symbol"]
    )
    .unwrap()
});

/// Cover-only mode (1 = only inventory-reducing legs allowed).
pub static COVER_ONLY: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "stoikov_cover_only",
        "Cover-only mode active (1=active)",
        &["symbol"]
    )
    .unwrap()
});

/// Updates whose session fraction fell outside [0, 1].
pub static DEGENERATE_HORIZON_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "stoikov_degenerate_horizon_total",
        "Market updates with a session fraction outside [0, 1]",
        &["symbol"]
    )
    .unwrap()
});

/// Rejected placements (synchronous refusals and venue rejects).
pub static REJECTED_ORDERS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "stoikov_rejected_orders_total",
        "Order placements rejected by the venue",
        &["symbol"]
    )
    .unwrap()
});

/// Fills that arrived for orders with a cancel in flight.
pub static LATE_FILLS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "stoikov_late_fills_total",
        "Fills received after a cancel was requested",
        &["symbol"]
    )
    .unwrap()
});

/// Latest quoted spread (price units).
pub static SPREAD: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!("stoikov_spread", "Latest model spread", &["symbol"]).unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a request counted against the throttle.
    pub fn request_issued(symbol: &str, kind: &str) {
        REQUESTS_TOTAL.with_label_values(&[symbol, kind]).inc();
    }

    /// Publish the current per-minute request counter.
    pub fn request_counter(symbol: &str, value: u32) {
        REQUEST_COUNTER
            .with_label_values(&[symbol])
            .set(i64::from(value));
    }

    /// Publish cover-only state.
    pub fn cover_only(symbol: &str, active: bool) {
        COVER_ONLY
            .with_label_values(&[symbol])
            .set(i64::from(active));
    }

    /// Record a degenerate horizon observation.
    pub fn degenerate_horizon(symbol: &str) {
        DEGENERATE_HORIZON_TOTAL.with_label_values(&[symbol]).inc();
    }

    /// Record a rejected placement.
    pub fn order_rejected(symbol: &str) {
        REJECTED_ORDERS_TOTAL.with_label_values(&[symbol]).inc();
    }

    /// Record a fill on a cancel-in-flight order.
    pub fn late_fill(symbol: &str) {
        LATE_FILLS_TOTAL.with_label_values(&[symbol]).inc();
    }

    /// Publish the latest spread.
    pub fn spread(symbol: &str, spread: f64) {
        SPREAD.with_label_values(&[symbol]).set(spread);
    }

    /// Render the default registry in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| TelemetryError::Encoding(e.to_string()))
    }
}
