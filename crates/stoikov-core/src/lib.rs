//! Core domain types for the stoikov market maker.
//!
//! This crate provides the primitives shared by the quoting crates:
//! - `Price`, `Size`: Precision-safe numeric types with tick rounding
//! - `MarketSnapshot`: Top-of-book update delivered by the host engine
//! - `OrderSide`, `PositionEffect`, `OrderId`: Order-related enums and identifiers

pub mod decimal;
pub mod error;
pub mod order;
pub mod types;

pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use order::{OrderId, OrderSide, PositionEffect};
pub use types::MarketSnapshot;
