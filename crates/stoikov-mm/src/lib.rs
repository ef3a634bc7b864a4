//! Avellaneda-Stoikov market making for a single instrument.
//!
//! Provides:
//! - Session horizon tracking (time to the configured session end)
//! - Quote calculation around an inventory-adjusted reservation price
//! - Per-minute request throttling with end-of-day cover-only mode
//! - Order lifecycle control (keep/cancel/replace, late fills)
//!
//! # Architecture
//!
//! ```text
//! Market update → OrderLifecycleController.on_market_update()
//!                  ├─ ThrottleGovernor: roll minute bucket, over-limit check
//!                  ├─ TimeHorizonTracker: remaining ms, delta_t
//!                  ├─ QuoteEngine: reservation price, spread, bid/ask
//!                  └─ legs_for(): legs allowed by inventory and cover-only
//!                       ↓
//!                  ExecutionVenue: open_*/reduce_*/cancel
//!
//! Venue events → on_order_ack / on_order_reject / on_fill / on_cancel_confirm
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod horizon;
pub mod quote_engine;
pub mod throttle;
pub mod venue;

pub use config::MakerConfig;
pub use controller::{
    legs_for, FillOutcome, OrderActions, OrderLifecycleController, OrderPhase, PlacedOrder,
    QuoteDecision, QuoteState, RejectedOrder, TrackedOrder,
};
pub use error::{MakerError, MakerResult};
pub use horizon::{is_new_minute, minute_bucket, SessionHorizon, TimeHorizonTracker};
pub use quote_engine::{Quote, QuoteEngine};
pub use throttle::ThrottleGovernor;
pub use venue::{
    place_leg, ExecutionVenue, InventorySource, OrderLeg, RecordingVenue, VenueError,
    VenueRequest,
};
