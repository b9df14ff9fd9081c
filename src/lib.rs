pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{
    HttpPositionSource, MockPositionSource, PositionSource, PositionSourceError, PositionStatus,
};
pub use db::{init_db, Repository, StoreError};
pub use domain::{
    Decimal, Distribution, LiquiditySnapshot, Pool, PortfolioSnapshot, PositionId, SnapshotKind,
    Symbol,
};
pub use engine::{LedgerError, LiquidityLedger};
pub use error::AppError;
pub use orchestration::{LedgerService, OrphanReconciler, ServiceError, SnapshotRecorder};
