//! Domain types for the pool capital ledger.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: Pool, PositionId, Symbol
//! - Distribution, the per-position capital slice
//! - Snapshot types for period-return comparison

pub mod decimal;
pub mod distribution;
pub mod primitives;
pub mod snapshot;

pub use decimal::Decimal;
pub use distribution::Distribution;
pub use primitives::{Pool, PoolParseError, PositionId, Symbol};
pub use snapshot::{LiquiditySnapshot, PortfolioSnapshot, SnapshotKind};
