//! Quote and order lifecycle control for one instrument.
//!
//! On every market update the controller:
//! 1. Rolls the throttle's minute bucket and computes the session horizon
//! 2. Computes Avellaneda-Stoikov bid/ask quotes
//! 3. Resolves cover-only mode (end of day OR throttle over limit)
//! 4. Keeps live orders if the quotes did not move, otherwise cancels them
//!    and issues the legs the inventory sign and cover-only mode allow
//!
//! Cancelled orders leave the working set when the cancel is requested, but
//! stay tracked as cancel-in-flight until the venue confirms the cancel or
//! reports a fill. A fill on a cancel-in-flight order is a late fill. Entries
//! whose cancel stays unconfirmed longer than `cancel_in_flight_ttl_ms` are
//! dropped on the next update so a venue that loses confirmations cannot grow
//! the set without bound.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use stoikov_core::{MarketSnapshot, OrderId, OrderSide, Price, Size};
use stoikov_telemetry::Metrics;

use crate::config::MakerConfig;
use crate::error::MakerResult;
use crate::horizon::TimeHorizonTracker;
use crate::quote_engine::{Quote, QuoteEngine};
use crate::throttle::ThrottleGovernor;
use crate::venue::{place_leg, ExecutionVenue, InventorySource, OrderLeg};

/// Venue acknowledgement state of a working order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPhase {
    /// Sent, no acknowledgement yet.
    Submitted,
    /// Acknowledged as resting by the venue.
    Acknowledged,
}

/// An order placed by this controller and not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedOrder {
    pub id: OrderId,
    pub leg: OrderLeg,
    pub price: Price,
    pub qty: Size,
    pub phase: OrderPhase,
    /// Market timestamp of the update that placed it.
    pub placed_at_ms: i64,
    /// Market timestamp at which its cancel was requested.
    pub cancel_requested_ms: Option<i64>,
}

/// Model state after the latest update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteState {
    pub delta_t: Decimal,
    pub reservation_price: Price,
    pub spread: Decimal,
    pub bid_price: Price,
    pub ask_price: Price,
    /// Quotes in force when orders were last issued.
    pub last_bid_price: Option<Price>,
    pub last_ask_price: Option<Price>,
}

/// What the controller did with the live orders on an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteDecision {
    /// No live orders: issued the allowed legs (possibly none).
    Issued,
    /// Quotes moved: cancelled the live orders and re-issued.
    Replaced,
    /// Quotes unchanged with live orders: sent nothing.
    Kept,
}

/// A placement accepted by the venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub leg: OrderLeg,
    pub price: Price,
    pub qty: Size,
}

/// A placement refused by the venue, synchronously or via a later reject.
///
/// Rejected legs are never retried here; the caller decides what to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedOrder {
    /// Venue id, if the order got one before being rejected.
    pub order_id: Option<OrderId>,
    pub leg: OrderLeg,
    pub price: Price,
    pub qty: Size,
    pub reason: String,
}

/// Outcome of one market update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderActions {
    pub decision: QuoteDecision,
    pub quote: Quote,
    pub remaining_ms: i64,
    pub cover_only: bool,
    pub end_of_day: bool,
    pub over_limit: bool,
    /// Session fraction outside [0, 1]; the quote is best effort.
    pub degenerate_horizon: bool,
    /// Cancels dropped from tracking without a confirmation.
    pub expired_cancels: Vec<OrderId>,
    pub cancelled: Vec<OrderId>,
    pub placed: Vec<PlacedOrder>,
    pub rejected: Vec<RejectedOrder>,
}

impl OrderActions {
    /// True when nothing was sent to the venue.
    pub fn is_noop(&self) -> bool {
        self.cancelled.is_empty() && self.placed.is_empty() && self.rejected.is_empty()
    }
}

/// Result of a fill notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    /// Fill on a working order.
    Filled(TrackedOrder),
    /// Fill on an order whose cancel was already requested.
    LateFill(TrackedOrder),
    /// Not an order this controller is tracking.
    Unknown,
}

/// Legs to quote for an inventory sign and cover-only mode.
pub fn legs_for(inventory: i64, cover_only: bool) -> &'static [OrderLeg] {
    match (inventory.signum(), cover_only) {
        (0, false) => &[OrderLeg::OpenLong, OrderLeg::OpenShort],
        (0, true) => &[],
        (1, false) => &[OrderLeg::OpenLong, OrderLeg::ReduceLong],
        (1, true) => &[OrderLeg::ReduceLong],
        (_, false) => &[OrderLeg::OpenShort, OrderLeg::ReduceShort],
        (_, true) => &[OrderLeg::ReduceShort],
    }
}

/// Quote and order lifecycle controller for a single instrument.
pub struct OrderLifecycleController<V: ExecutionVenue> {
    config: MakerConfig,
    venue: V,
    horizon: TimeHorizonTracker,
    engine: QuoteEngine,
    throttle: ThrottleGovernor,
    quote_state: QuoteState,
    fixed_size: Size,
    /// Live orders, in placement order.
    working: Vec<TrackedOrder>,
    /// Orders with a cancel requested but not yet confirmed.
    cancel_in_flight: HashMap<OrderId, TrackedOrder>,
    /// Timestamp of the latest market update.
    last_update_ms: Option<i64>,
    cover_only_active: bool,
}

impl<V: ExecutionVenue> OrderLifecycleController<V> {
    /// Create a controller. Invalid parameters fail here.
    pub fn new(config: MakerConfig, venue: V) -> MakerResult<Self> {
        config.validate()?;
        let engine = QuoteEngine::new(&config)?;
        let horizon =
            TimeHorizonTracker::new(config.session_length_ms, config.session_utc_offset_minutes)?;
        let throttle =
            ThrottleGovernor::new(config.cover_only_request_limit, config.cover_only_window_ms);

        info!(
            symbol = %config.symbol,
            k = %config.k,
            gamma = %config.gamma,
            sigma = %config.sigma,
            fixed_size = config.fixed_size,
            request_limit = config.cover_only_request_limit,
            cover_only_window_ms = config.cover_only_window_ms,
            "Market maker initialized"
        );

        Ok(Self {
            fixed_size: Size::from(config.fixed_size),
            config,
            venue,
            horizon,
            engine,
            throttle,
            quote_state: QuoteState::default(),
            working: Vec::new(),
            cancel_in_flight: HashMap::new(),
            last_update_ms: None,
            cover_only_active: false,
        })
    }

    /// Process a market update.
    ///
    /// Only fails on a timestamp chrono cannot represent.
    pub fn on_market_update<I: InventorySource + ?Sized>(
        &mut self,
        snapshot: &MarketSnapshot,
        inventory: &I,
    ) -> MakerResult<OrderActions> {
        let now_ms = snapshot.timestamp_ms;
        let position = inventory.position();

        self.last_update_ms = Some(now_ms);
        let expired_cancels = self.expire_cancels_in_flight(now_ms);
        self.throttle.observe(now_ms);
        let horizon = self.horizon.horizon(now_ms)?;
        let quote = self
            .engine
            .compute(snapshot.mid_price(), position, horizon.delta_t);

        let degenerate_horizon = horizon.is_degenerate();
        if degenerate_horizon {
            warn!(
                symbol = %self.config.symbol,
                remaining_ms = horizon.remaining_ms,
                delta_t = %horizon.delta_t,
                "Session fraction outside [0, 1], quoting best effort"
            );
            Metrics::degenerate_horizon(&self.config.symbol);
        }

        let end_of_day = self.throttle.end_of_day(horizon.remaining_ms);
        let over_limit = self.throttle.is_over_limit();
        let cover_only = end_of_day || over_limit;
        self.note_cover_only(cover_only, end_of_day, over_limit);

        self.quote_state.delta_t = horizon.delta_t;
        self.quote_state.reservation_price = quote.reservation_price;
        self.quote_state.spread = quote.spread;
        self.quote_state.bid_price = quote.bid_price;
        self.quote_state.ask_price = quote.ask_price;

        let mut actions = OrderActions {
            decision: QuoteDecision::Issued,
            quote,
            remaining_ms: horizon.remaining_ms,
            cover_only,
            end_of_day,
            over_limit,
            degenerate_horizon,
            expired_cancels,
            cancelled: Vec::new(),
            placed: Vec::new(),
            rejected: Vec::new(),
        };

        if !self.working.is_empty() {
            let unchanged = self.quote_state.last_bid_price == Some(quote.bid_price)
                && self.quote_state.last_ask_price == Some(quote.ask_price);
            if unchanged {
                actions.decision = QuoteDecision::Kept;
                self.publish_metrics(&quote);
                return Ok(actions);
            }
            actions.decision = QuoteDecision::Replaced;
            actions.cancelled = self.cancel_working();
        }

        for &leg in legs_for(position, cover_only) {
            let price = match leg.side() {
                OrderSide::Buy => quote.bid_price,
                OrderSide::Sell => quote.ask_price,
            };
            match self.issue(leg, price, now_ms) {
                Ok(placed) => actions.placed.push(placed),
                Err(rejected) => actions.rejected.push(rejected),
            }
        }

        self.quote_state.last_bid_price = Some(quote.bid_price);
        self.quote_state.last_ask_price = Some(quote.ask_price);
        self.publish_metrics(&quote);

        debug!(
            symbol = %self.config.symbol,
            delta_t = %horizon.delta_t,
            spread = %quote.spread,
            r = %quote.reservation_price,
            bid = %quote.bid_price,
            ask = %quote.ask_price,
            position,
            cover_only,
            decision = ?actions.decision,
            request_counter = self.throttle.request_counter(),
            "Quote update"
        );

        Ok(actions)
    }

    /// Mark a working order as acknowledged. Returns false for unknown ids.
    pub fn on_order_ack(&mut self, order_id: &OrderId) -> bool {
        match self.working.iter_mut().find(|o| &o.id == order_id) {
            Some(order) => {
                order.phase = OrderPhase::Acknowledged;
                debug!(symbol = %self.config.symbol, order_id = %order_id, "Order acknowledged");
                true
            }
            None => {
                debug!(
                    symbol = %self.config.symbol,
                    order_id = %order_id,
                    "Ack for untracked order"
                );
                false
            }
        }
    }

    /// Handle a venue reject.
    ///
    /// Returns the rejected leg for working orders. A reject of an order with a
    /// cancel in flight only clears it, since it was being withdrawn anyway.
    /// The throttle counter is not corrected.
    pub fn on_order_reject(&mut self, order_id: &OrderId, reason: &str) -> Option<RejectedOrder> {
        if let Some(order) = self.take_working(order_id) {
            warn!(
                symbol = %self.config.symbol,
                order_id = %order_id,
                leg = %order.leg,
                price = %order.price,
                reason,
                "Order rejected"
            );
            Metrics::order_rejected(&self.config.symbol);
            return Some(RejectedOrder {
                order_id: Some(order.id),
                leg: order.leg,
                price: order.price,
                qty: order.qty,
                reason: reason.to_string(),
            });
        }
        if self.cancel_in_flight.remove(order_id).is_some() {
            debug!(
                symbol = %self.config.symbol,
                order_id = %order_id,
                "Reject for cancelled order"
            );
        }
        None
    }

    /// Handle a fill. Fills never decrement the throttle counter.
    pub fn on_fill(&mut self, order_id: &OrderId) -> FillOutcome {
        if let Some(order) = self.take_working(order_id) {
            info!(
                symbol = %self.config.symbol,
                order_id = %order_id,
                leg = %order.leg,
                price = %order.price,
                qty = %order.qty,
                "Order filled"
            );
            return FillOutcome::Filled(order);
        }
        if let Some(order) = self.cancel_in_flight.remove(order_id) {
            warn!(
                symbol = %self.config.symbol,
                order_id = %order_id,
                leg = %order.leg,
                price = %order.price,
                "Fill on order with cancel in flight"
            );
            Metrics::late_fill(&self.config.symbol);
            return FillOutcome::LateFill(order);
        }
        warn!(symbol = %self.config.symbol, order_id = %order_id, "Fill for untracked order");
        FillOutcome::Unknown
    }

    /// Handle a cancel confirmation. Idempotent; returns true if the id was
    /// still tracked.
    pub fn on_cancel_confirm(&mut self, order_id: &OrderId) -> bool {
        if self.cancel_in_flight.remove(order_id).is_some() {
            debug!(symbol = %self.config.symbol, order_id = %order_id, "Cancel confirmed");
            return true;
        }
        // Cancelled venue-side without our request (e.g. session close).
        if self.take_working(order_id).is_some() {
            info!(
                symbol = %self.config.symbol,
                order_id = %order_id,
                "Working order cancelled by venue"
            );
            return true;
        }
        false
    }

    /// Cancel every working order, e.g. on shutdown. Each cancel counts
    /// against the throttle.
    pub fn cancel_all(&mut self) -> Vec<OrderId> {
        let cancelled = self.cancel_working();
        if !cancelled.is_empty() {
            info!(symbol = %self.config.symbol, count = cancelled.len(), "Cancelled all quotes");
        }
        Metrics::request_counter(&self.config.symbol, self.throttle.request_counter());
        cancelled
    }

    pub fn config(&self) -> &MakerConfig {
        &self.config
    }

    /// Current model variables and last issued quotes.
    pub fn quote_state(&self) -> &QuoteState {
        &self.quote_state
    }

    pub fn throttle(&self) -> &ThrottleGovernor {
        &self.throttle
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }

    pub fn venue_mut(&mut self) -> &mut V {
        &mut self.venue
    }

    /// Live orders, in placement order.
    pub fn working_orders(&self) -> &[TrackedOrder] {
        &self.working
    }

    /// Ids of live orders.
    pub fn outstanding(&self) -> impl Iterator<Item = &OrderId> {
        self.working.iter().map(|o| &o.id)
    }

    /// True while at least one order is live.
    pub fn is_quoting(&self) -> bool {
        !self.working.is_empty()
    }

    pub fn is_cancel_in_flight(&self, order_id: &OrderId) -> bool {
        self.cancel_in_flight.contains_key(order_id)
    }

    pub fn cancels_in_flight(&self) -> usize {
        self.cancel_in_flight.len()
    }

    // === Private helpers ===

    fn issue(
        &mut self,
        leg: OrderLeg,
        price: Price,
        now_ms: i64,
    ) -> Result<PlacedOrder, RejectedOrder> {
        let qty = self.fixed_size;
        self.throttle.record_request();
        Metrics::request_issued(&self.config.symbol, leg.as_str());

        match place_leg(&mut self.venue, leg, price, qty) {
            Ok(id) => {
                self.working.push(TrackedOrder {
                    id: id.clone(),
                    leg,
                    price,
                    qty,
                    phase: OrderPhase::Submitted,
                    placed_at_ms: now_ms,
                    cancel_requested_ms: None,
                });
                Ok(PlacedOrder { id, leg, price, qty })
            }
            Err(e) => {
                warn!(
                    symbol = %self.config.symbol,
                    leg = %leg,
                    price = %price,
                    error = %e,
                    "Venue refused order"
                );
                Metrics::order_rejected(&self.config.symbol);
                Err(RejectedOrder {
                    order_id: None,
                    leg,
                    price,
                    qty,
                    reason: e.to_string(),
                })
            }
        }
    }

    fn cancel_working(&mut self) -> Vec<OrderId> {
        let orders = std::mem::take(&mut self.working);
        let mut cancelled = Vec::with_capacity(orders.len());
        for mut order in orders {
            order.cancel_requested_ms = Some(self.last_update_ms.unwrap_or(order.placed_at_ms));
            self.venue.cancel(&order.id);
            self.throttle.record_request();
            Metrics::request_issued(&self.config.symbol, "cancel");
            cancelled.push(order.id.clone());
            self.cancel_in_flight.insert(order.id.clone(), order);
        }
        cancelled
    }

    fn expire_cancels_in_flight(&mut self, now_ms: i64) -> Vec<OrderId> {
        let ttl_ms = i64::try_from(self.config.cancel_in_flight_ttl_ms).unwrap_or(i64::MAX);
        if ttl_ms == 0 || self.cancel_in_flight.is_empty() {
            return Vec::new();
        }

        let mut expired = Vec::new();
        self.cancel_in_flight.retain(|id, order| {
            let requested_ms = order.cancel_requested_ms.unwrap_or(order.placed_at_ms);
            let keep = now_ms.saturating_sub(requested_ms) < ttl_ms;
            if !keep {
                expired.push(id.clone());
            }
            keep
        });

        if !expired.is_empty() {
            expired.sort();
            warn!(
                symbol = %self.config.symbol,
                count = expired.len(),
                ttl_ms,
                "Dropping cancels with no confirmation"
            );
        }
        expired
    }

    fn take_working(&mut self, order_id: &OrderId) -> Option<TrackedOrder> {
        let idx = self.working.iter().position(|o| &o.id == order_id)?;
        Some(self.working.remove(idx))
    }

    fn note_cover_only(&mut self, cover_only: bool, end_of_day: bool, over_limit: bool) {
        if cover_only == self.cover_only_active {
            return;
        }
        self.cover_only_active = cover_only;
        if cover_only {
            info!(
                symbol = %self.config.symbol,
                end_of_day,
                over_limit,
                request_counter = self.throttle.request_counter(),
                "Entering cover-only mode"
            );
        } else {
            info!(symbol = %self.config.symbol, "Leaving cover-only mode");
        }
    }

    fn publish_metrics(&self, quote: &Quote) {
        let symbol = &self.config.symbol;
        Metrics::cover_only(symbol, self.cover_only_active);
        Metrics::request_counter(symbol, self.throttle.request_counter());
        Metrics::spread(symbol, quote.spread.to_f64().unwrap_or_default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venue::{MockExecutionVenue, RecordingVenue, VenueError};
    use rust_decimal_macros::dec;

    // 2026-02-07T12:00:00Z: half of a UTC day remains.
    const NOON: i64 = 1_770_465_600_000;
    // 2026-02-08T00:00:00Z
    const NEXT_MIDNIGHT: i64 = 1_770_508_800_000;

    fn config() -> MakerConfig {
        MakerConfig {
            symbol: "TEST".to_string(),
            ..Default::default()
        }
    }

    fn snap(ts: i64, mid: Decimal) -> MarketSnapshot {
        MarketSnapshot::new(
            ts,
            Price::new(mid - dec!(0.01)),
            Price::new(mid + dec!(0.01)),
        )
    }

    fn controller(ids: &[&str]) -> OrderLifecycleController<RecordingVenue> {
        OrderLifecycleController::new(config(), RecordingVenue::with_ids(ids.iter().copied()))
            .unwrap()
    }

    fn id(s: &str) -> OrderId {
        OrderId::from(s)
    }

    fn legs(actions: &OrderActions) -> Vec<OrderLeg> {
        actions.placed.iter().map(|p| p.leg).collect()
    }

    #[test]
    fn test_flat_inventory_quotes_both_sides() {
        let mut ctrl = controller(&["A", "B"]);
        let actions = ctrl.on_market_update(&snap(NOON, dec!(100)), &0i64).unwrap();

        assert_eq!(actions.decision, QuoteDecision::Issued);
        assert!(!actions.cover_only);
        assert_eq!(actions.quote.reservation_price.inner(), dec!(100));
        assert_eq!(
            ctrl.venue().placements(),
            vec![
                (OrderLeg::OpenLong, Price::new(dec!(96.29))),
                (OrderLeg::OpenShort, Price::new(dec!(103.71))),
            ]
        );
        assert!(actions.placed.iter().all(|p| p.qty == Size::from(1000u64)));
        assert_eq!(ctrl.throttle().request_counter(), 2);
        assert_eq!(ctrl.outstanding().cloned().collect::<Vec<_>>(), vec![id("A"), id("B")]);
        assert_eq!(ctrl.quote_state().delta_t, dec!(0.5));
    }

    #[test]
    fn test_unchanged_quotes_keep_live_orders() {
        let mut ctrl = controller(&["A", "B"]);
        ctrl.on_market_update(&snap(NOON, dec!(100)), &0i64).unwrap();
        ctrl.venue_mut().take_requests();

        let actions = ctrl
            .on_market_update(&snap(NOON + 1, dec!(100)), &0i64)
            .unwrap();

        assert_eq!(actions.decision, QuoteDecision::Kept);
        assert!(actions.is_noop());
        assert!(ctrl.venue().requests().is_empty());
        assert_eq!(ctrl.throttle().request_counter(), 2);
        assert_eq!(ctrl.outstanding().count(), 2);
    }

    #[test]
    fn test_moved_quotes_cancel_and_replace() {
        let mut ctrl = controller(&["A", "B", "C", "D"]);
        ctrl.on_market_update(&snap(NOON, dec!(100)), &0i64).unwrap();
        ctrl.venue_mut().take_requests();

        let actions = ctrl
            .on_market_update(&snap(NOON + 1, dec!(101)), &0i64)
            .unwrap();

        assert_eq!(actions.decision, QuoteDecision::Replaced);
        assert_eq!(actions.cancelled, vec![id("A"), id("B")]);
        assert_eq!(ctrl.venue().cancels(), vec![id("A"), id("B")]);
        assert_eq!(legs(&actions), vec![OrderLeg::OpenLong, OrderLeg::OpenShort]);
        // 2 initial placements + 2 cancels + 2 placements
        assert_eq!(ctrl.throttle().request_counter(), 6);
        assert_eq!(ctrl.outstanding().cloned().collect::<Vec<_>>(), vec![id("C"), id("D")]);
        assert!(ctrl.is_cancel_in_flight(&id("A")));
        assert!(ctrl.is_cancel_in_flight(&id("B")));
    }

    #[test]
    fn test_long_inventory_quotes_add_and_reduce() {
        let mut ctrl = controller(&[]);
        let actions = ctrl.on_market_update(&snap(NOON, dec!(100)), &3i64).unwrap();
        assert_eq!(legs(&actions), vec![OrderLeg::OpenLong, OrderLeg::ReduceLong]);
        assert_eq!(actions.placed[0].price, actions.quote.bid_price);
        assert_eq!(actions.placed[1].price, actions.quote.ask_price);
    }

    #[test]
    fn test_short_inventory_quotes_add_and_cover() {
        let mut ctrl = controller(&[]);
        let actions = ctrl.on_market_update(&snap(NOON, dec!(100)), &-3i64).unwrap();
        assert_eq!(legs(&actions), vec![OrderLeg::OpenShort, OrderLeg::ReduceShort]);
        assert_eq!(actions.placed[0].price, actions.quote.ask_price);
        assert_eq!(actions.placed[1].price, actions.quote.bid_price);
    }

    #[test]
    fn test_over_limit_long_inventory_only_reduces() {
        let mut ctrl = controller(&[]);
        let inventory = 1000i64;
        let mut ts = NOON;
        let mut mid = dec!(1000);

        // Alternate the mid so every update replaces both legs (+4 requests).
        while ctrl.throttle().request_counter() <= 400 {
            let actions = ctrl.on_market_update(&snap(ts, mid), &inventory).unwrap();
            assert!(!actions.cover_only);
            ts += 1;
            mid = if mid == dec!(1000) { dec!(1001) } else { dec!(1000) };
        }
        assert!(ctrl.throttle().request_counter() > 400);

        let actions = ctrl.on_market_update(&snap(ts, mid), &inventory).unwrap();
        assert!(actions.over_limit);
        assert!(!actions.end_of_day);
        assert!(actions.cover_only);
        assert_eq!(actions.cancelled.len(), 2);
        assert_eq!(legs(&actions), vec![OrderLeg::ReduceLong]);
        assert_eq!(actions.placed[0].price, actions.quote.ask_price);
    }

    #[test]
    fn test_end_of_day_short_inventory_only_covers() {
        let mut ctrl = controller(&[]);
        let actions = ctrl
            .on_market_update(&snap(NEXT_MIDNIGHT - 500, dec!(100)), &-5i64)
            .unwrap();

        assert_eq!(actions.remaining_ms, 500);
        assert!(actions.end_of_day);
        assert!(!actions.over_limit);
        assert!(actions.cover_only);
        assert_eq!(legs(&actions), vec![OrderLeg::ReduceShort]);
        assert_eq!(actions.placed[0].price, actions.quote.bid_price);
    }

    #[test]
    fn test_cover_only_never_opens() {
        for inventory in [-7i64, 0, 7] {
            let mut ctrl = controller(&[]);
            let actions = ctrl
                .on_market_update(&snap(NEXT_MIDNIGHT - 1_000, dec!(100)), &inventory)
                .unwrap();
            assert!(actions.cover_only);
            assert!(actions.placed.iter().all(|p| p.leg.is_reducing()));
        }
    }

    #[test]
    fn test_cover_only_flat_inventory_goes_idle() {
        let mut ctrl = controller(&["A", "B"]);
        ctrl.on_market_update(&snap(NOON, dec!(100)), &0i64).unwrap();
        assert!(ctrl.is_quoting());

        let actions = ctrl
            .on_market_update(&snap(NEXT_MIDNIGHT - 500, dec!(100)), &0i64)
            .unwrap();

        assert_eq!(actions.decision, QuoteDecision::Replaced);
        assert_eq!(actions.cancelled, vec![id("A"), id("B")]);
        assert!(actions.placed.is_empty());
        assert!(!ctrl.is_quoting());
        assert_eq!(ctrl.cancels_in_flight(), 2);
    }

    #[test]
    fn test_fill_removes_order_without_touching_throttle() {
        let mut ctrl = controller(&["A", "B"]);
        ctrl.on_market_update(&snap(NOON, dec!(100)), &0i64).unwrap();

        match ctrl.on_fill(&id("A")) {
            FillOutcome::Filled(order) => assert_eq!(order.leg, OrderLeg::OpenLong),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(ctrl.outstanding().cloned().collect::<Vec<_>>(), vec![id("B")]);
        assert_eq!(ctrl.throttle().request_counter(), 2);
        assert_eq!(ctrl.on_fill(&id("A")), FillOutcome::Unknown);
    }

    #[test]
    fn test_fill_after_cancel_is_late_fill() {
        let mut ctrl = controller(&["A", "B", "C", "D"]);
        ctrl.on_market_update(&snap(NOON, dec!(100)), &0i64).unwrap();
        ctrl.on_market_update(&snap(NOON + 1, dec!(101)), &0i64)
            .unwrap();

        assert!(matches!(ctrl.on_fill(&id("A")), FillOutcome::LateFill(_)));
        assert!(!ctrl.is_cancel_in_flight(&id("A")));
        // Cancel confirmation racing behind the fill is a no-op.
        assert!(!ctrl.on_cancel_confirm(&id("A")));
    }

    #[test]
    fn test_unconfirmed_cancels_expire() {
        let mut ctrl = controller(&["A", "B", "C", "D"]);
        ctrl.on_market_update(&snap(NOON, dec!(100)), &0i64).unwrap();
        ctrl.on_market_update(&snap(NOON + 1, dec!(101)), &0i64)
            .unwrap();
        assert_eq!(ctrl.cancels_in_flight(), 2);

        // Still inside the TTL: kept.
        let actions = ctrl
            .on_market_update(&snap(NOON + 1 + 299_999, dec!(101)), &0i64)
            .unwrap();
        assert!(actions.expired_cancels.is_empty());
        assert_eq!(ctrl.cancels_in_flight(), 2);

        let actions = ctrl
            .on_market_update(&snap(NOON + 1 + 300_000, dec!(101)), &0i64)
            .unwrap();
        assert_eq!(actions.expired_cancels, vec![id("A"), id("B")]);
        assert_eq!(ctrl.cancels_in_flight(), 0);
        // Live orders are untouched.
        assert_eq!(ctrl.outstanding().cloned().collect::<Vec<_>>(), vec![id("C"), id("D")]);
        // A fill arriving after expiry is no longer attributable.
        assert_eq!(ctrl.on_fill(&id("A")), FillOutcome::Unknown);
    }

    #[test]
    fn test_zero_ttl_keeps_cancels_until_confirmed() {
        let config = MakerConfig {
            cancel_in_flight_ttl_ms: 0,
            ..config()
        };
        let venue = RecordingVenue::with_ids(["A", "B", "C", "D"]);
        let mut ctrl = OrderLifecycleController::new(config, venue).unwrap();
        ctrl.on_market_update(&snap(NOON, dec!(100)), &0i64).unwrap();
        ctrl.on_market_update(&snap(NOON + 1, dec!(101)), &0i64)
            .unwrap();

        let actions = ctrl
            .on_market_update(&snap(NOON + 3_600_000, dec!(101)), &0i64)
            .unwrap();
        assert!(actions.expired_cancels.is_empty());
        assert!(ctrl.is_cancel_in_flight(&id("A")));
        assert!(ctrl.is_cancel_in_flight(&id("B")));
    }

    #[test]
    fn test_cancel_confirm_is_idempotent() {
        let mut ctrl = controller(&["A", "B", "C", "D"]);
        ctrl.on_market_update(&snap(NOON, dec!(100)), &0i64).unwrap();
        ctrl.on_market_update(&snap(NOON + 1, dec!(101)), &0i64)
            .unwrap();

        assert!(ctrl.on_cancel_confirm(&id("B")));
        assert!(!ctrl.on_cancel_confirm(&id("B")));
        assert!(!ctrl.on_cancel_confirm(&id("unknown")));
        assert_eq!(ctrl.cancels_in_flight(), 1);
    }

    #[test]
    fn test_venue_side_cancel_clears_working_order() {
        let mut ctrl = controller(&["A", "B"]);
        ctrl.on_market_update(&snap(NOON, dec!(100)), &0i64).unwrap();

        assert!(ctrl.on_cancel_confirm(&id("A")));
        assert_eq!(ctrl.outstanding().count(), 1);
    }

    #[test]
    fn test_reject_is_surfaced_and_not_retried() {
        let mut ctrl = controller(&["A", "B"]);
        ctrl.on_market_update(&snap(NOON, dec!(100)), &0i64).unwrap();

        let rejected = ctrl.on_order_reject(&id("A"), "price band").unwrap();
        assert_eq!(rejected.leg, OrderLeg::OpenLong);
        assert_eq!(rejected.order_id, Some(id("A")));
        assert_eq!(rejected.reason, "price band");
        assert_eq!(ctrl.throttle().request_counter(), 2);

        // B is still live and quotes did not move: nothing is re-sent.
        ctrl.venue_mut().take_requests();
        let actions = ctrl
            .on_market_update(&snap(NOON + 1, dec!(100)), &0i64)
            .unwrap();
        assert_eq!(actions.decision, QuoteDecision::Kept);
        assert!(ctrl.venue().requests().is_empty());
    }

    #[test]
    fn test_reject_of_unknown_order() {
        let mut ctrl = controller(&[]);
        assert!(ctrl.on_order_reject(&id("nope"), "x").is_none());
    }

    #[test]
    fn test_synchronous_refusal_is_reported() {
        let mut ctrl = controller(&[]);
        ctrl.venue_mut()
            .set_refusal(Some(VenueError::Unavailable("disconnected".into())));

        let actions = ctrl.on_market_update(&snap(NOON, dec!(100)), &0i64).unwrap();

        assert!(actions.placed.is_empty());
        assert_eq!(actions.rejected.len(), 2);
        assert!(actions.rejected.iter().all(|r| r.order_id.is_none()));
        assert_eq!(ctrl.throttle().request_counter(), 2);
        assert!(!ctrl.is_quoting());
    }

    #[test]
    fn test_ack_marks_order() {
        let mut ctrl = controller(&["A", "B"]);
        ctrl.on_market_update(&snap(NOON, dec!(100)), &0i64).unwrap();

        assert!(ctrl.on_order_ack(&id("A")));
        assert!(!ctrl.on_order_ack(&id("Z")));
        assert_eq!(ctrl.working_orders()[0].phase, OrderPhase::Acknowledged);
        assert_eq!(ctrl.working_orders()[1].phase, OrderPhase::Submitted);
    }

    #[test]
    fn test_minute_rollover_resets_counter() {
        let mut ctrl = controller(&["A", "B"]);
        ctrl.on_market_update(&snap(NOON, dec!(100)), &0i64).unwrap();
        assert_eq!(ctrl.throttle().request_counter(), 2);

        let actions = ctrl
            .on_market_update(&snap(NOON + 60_000, dec!(100)), &0i64)
            .unwrap();
        assert_eq!(actions.decision, QuoteDecision::Kept);
        assert_eq!(ctrl.throttle().request_counter(), 0);
    }

    #[test]
    fn test_degenerate_horizon_is_flagged_not_fatal() {
        let config = MakerConfig {
            session_length_ms: 3_600_000,
            ..config()
        };
        let mut ctrl = OrderLifecycleController::new(config, RecordingVenue::new()).unwrap();

        let actions = ctrl.on_market_update(&snap(NOON, dec!(100)), &2i64).unwrap();

        assert!(actions.degenerate_horizon);
        assert!(actions.remaining_ms < 0);
        assert!(actions.cover_only);
        assert_eq!(legs(&actions), vec![OrderLeg::ReduceLong]);
    }

    #[test]
    fn test_cancel_all() {
        let mut ctrl = controller(&["A", "B"]);
        ctrl.on_market_update(&snap(NOON, dec!(100)), &0i64).unwrap();

        let cancelled = ctrl.cancel_all();
        assert_eq!(cancelled, vec![id("A"), id("B")]);
        assert!(!ctrl.is_quoting());
        assert_eq!(ctrl.throttle().request_counter(), 4);
        assert!(ctrl.cancel_all().is_empty());
    }

    #[test]
    fn test_invalid_config_fails_at_construction() {
        let config = MakerConfig {
            k: dec!(-1),
            ..config()
        };
        assert!(OrderLifecycleController::new(config, RecordingVenue::new()).is_err());
    }

    #[test]
    fn test_no_churn_with_mock_venue() {
        let mut venue = MockExecutionVenue::new();
        venue
            .expect_open_long()
            .times(1)
            .returning(|_, _| Ok(OrderId::from("A")));
        venue
            .expect_open_short()
            .times(1)
            .returning(|_, _| Ok(OrderId::from("B")));
        venue.expect_reduce_long().never();
        venue.expect_reduce_short().never();
        venue.expect_cancel().never();

        let mut ctrl = OrderLifecycleController::new(config(), venue).unwrap();
        ctrl.on_market_update(&snap(NOON, dec!(100)), &0i64).unwrap();
        let actions = ctrl
            .on_market_update(&snap(NOON + 10, dec!(100)), &0i64)
            .unwrap();
        assert!(actions.is_noop());
    }

    #[test]
    fn test_legs_table() {
        assert_eq!(legs_for(0, false), &[OrderLeg::OpenLong, OrderLeg::OpenShort]);
        assert!(legs_for(0, true).is_empty());
        assert_eq!(legs_for(10, false), &[OrderLeg::OpenLong, OrderLeg::ReduceLong]);
        assert_eq!(legs_for(10, true), &[OrderLeg::ReduceLong]);
        assert_eq!(legs_for(-10, false), &[OrderLeg::OpenShort, OrderLeg::ReduceShort]);
        assert_eq!(legs_for(-10, true), &[OrderLeg::ReduceShort]);
    }
}
