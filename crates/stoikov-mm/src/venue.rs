//! Capabilities the controller depends on.
//!
//! The host engine supplies an [`ExecutionVenue`] that accepts order
//! placement and cancel requests, and an [`InventorySource`] that reports the
//! signed position. Both are plain traits so tests and paper trading can
//! swap in their own implementations.

use std::collections::VecDeque;
use std::fmt;

use thiserror::Error;

use stoikov_core::{OrderId, OrderSide, PositionEffect, Price, Size};

/// Synchronous refusal of a request by the venue.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VenueError {
    /// The venue refused the order outright (e.g. trading disabled).
    #[error("order refused: {0}")]
    Refused(String),

    /// The venue connection is not usable.
    #[error("venue unavailable: {0}")]
    Unavailable(String),
}

/// One side of a quote, classified by direction and position effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderLeg {
    /// Buy that opens or adds to a long position.
    OpenLong,
    /// Sell that opens or adds to a short position.
    OpenShort,
    /// Sell that reduces a long position.
    ReduceLong,
    /// Buy that covers a short position.
    ReduceShort,
}

impl OrderLeg {
    pub fn side(&self) -> OrderSide {
        match self {
            Self::OpenLong | Self::ReduceShort => OrderSide::Buy,
            Self::OpenShort | Self::ReduceLong => OrderSide::Sell,
        }
    }

    pub fn effect(&self) -> PositionEffect {
        match self {
            Self::OpenLong | Self::OpenShort => PositionEffect::Open,
            Self::ReduceLong | Self::ReduceShort => PositionEffect::Close,
        }
    }

    /// True for legs that reduce inventory (allowed in cover-only mode).
    pub fn is_reducing(&self) -> bool {
        self.effect() == PositionEffect::Close
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenLong => "open_long",
            Self::OpenShort => "open_short",
            Self::ReduceLong => "reduce_long",
            Self::ReduceShort => "reduce_short",
        }
    }
}

impl fmt::Display for OrderLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order routing capability.
///
/// Every call is fire-and-forget: fills, acknowledgements, rejects and cancel
/// confirmations come back later through the controller's `on_*` handlers.
#[cfg_attr(test, mockall::automock)]
pub trait ExecutionVenue {
    /// Buy to open or add to a long position.
    fn open_long(&mut self, price: Price, qty: Size) -> Result<OrderId, VenueError>;

    /// Sell to open or add to a short position.
    fn open_short(&mut self, price: Price, qty: Size) -> Result<OrderId, VenueError>;

    /// Sell to reduce a long position.
    fn reduce_long(&mut self, price: Price, qty: Size) -> Result<OrderId, VenueError>;

    /// Buy to cover a short position.
    fn reduce_short(&mut self, price: Price, qty: Size) -> Result<OrderId, VenueError>;

    /// Request cancellation of a working order.
    fn cancel(&mut self, order_id: &OrderId);
}

/// Dispatch a leg to the matching placement call.
pub fn place_leg<V: ExecutionVenue + ?Sized>(
    venue: &mut V,
    leg: OrderLeg,
    price: Price,
    qty: Size,
) -> Result<OrderId, VenueError> {
    match leg {
        OrderLeg::OpenLong => venue.open_long(price, qty),
        OrderLeg::OpenShort => venue.open_short(price, qty),
        OrderLeg::ReduceLong => venue.reduce_long(price, qty),
        OrderLeg::ReduceShort => venue.reduce_short(price, qty),
    }
}

/// Source of the signed position (positive = long, negative = short).
pub trait InventorySource {
    fn position(&self) -> i64;
}

impl InventorySource for i64 {
    fn position(&self) -> i64 {
        *self
    }
}

/// A request observed by [`RecordingVenue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VenueRequest {
    Place {
        id: OrderId,
        leg: OrderLeg,
        price: Price,
        qty: Size,
    },
    Cancel(OrderId),
}

/// In-memory venue that records every request.
///
/// Hands out ids from a preset queue first, then generated ids. Useful for
/// dry runs and for driving the controller in tests.
#[derive(Debug, Default)]
pub struct RecordingVenue {
    requests: Vec<VenueRequest>,
    preset_ids: VecDeque<OrderId>,
    refuse: Option<VenueError>,
}

impl RecordingVenue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use these ids, in order, for the next placements.
    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OrderId>,
    {
        Self {
            preset_ids: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Refuse every placement with `err` until cleared with `None`.
    pub fn set_refusal(&mut self, err: Option<VenueError>) {
        self.refuse = err;
    }

    pub fn requests(&self) -> &[VenueRequest] {
        &self.requests
    }

    /// Drain recorded requests.
    pub fn take_requests(&mut self) -> Vec<VenueRequest> {
        std::mem::take(&mut self.requests)
    }

    /// Recorded placements as `(leg, price)` pairs.
    pub fn placements(&self) -> Vec<(OrderLeg, Price)> {
        self.requests
            .iter()
            .filter_map(|r| match r {
                VenueRequest::Place { leg, price, .. } => Some((*leg, *price)),
                VenueRequest::Cancel(_) => None,
            })
            .collect()
    }

    /// Recorded cancels.
    pub fn cancels(&self) -> Vec<OrderId> {
        self.requests
            .iter()
            .filter_map(|r| match r {
                VenueRequest::Cancel(id) => Some(id.clone()),
                VenueRequest::Place { .. } => None,
            })
            .collect()
    }

    fn record_place(
        &mut self,
        leg: OrderLeg,
        price: Price,
        qty: Size,
    ) -> Result<OrderId, VenueError> {
        if let Some(err) = &self.refuse {
            return Err(err.clone());
        }
        let id = self.preset_ids.pop_front().unwrap_or_default();
        self.requests.push(VenueRequest::Place {
            id: id.clone(),
            leg,
            price,
            qty,
        });
        Ok(id)
    }
}

impl ExecutionVenue for RecordingVenue {
    fn open_long(&mut self, price: Price, qty: Size) -> Result<OrderId, VenueError> {
        self.record_place(OrderLeg::OpenLong, price, qty)
    }

    fn open_short(&mut self, price: Price, qty: Size) -> Result<OrderId, VenueError> {
        self.record_place(OrderLeg::OpenShort, price, qty)
    }

    fn reduce_long(&mut self, price: Price, qty: Size) -> Result<OrderId, VenueError> {
        self.record_place(OrderLeg::ReduceLong, price, qty)
    }

    fn reduce_short(&mut self, price: Price, qty: Size) -> Result<OrderId, VenueError> {
        self.record_place(OrderLeg::ReduceShort, price, qty)
    }

    fn cancel(&mut self, order_id: &OrderId) {
        self.requests.push(VenueRequest::Cancel(order_id.clone()));
    }
}
