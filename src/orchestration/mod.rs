//! Service layer wiring the engines to persistence and collaborators.

pub mod ledger_service;
pub mod reconciler;
pub mod snapshotter;

pub use ledger_service::{LedgerService, ServiceError};
pub use reconciler::{
    OrphanReason, OrphanReconciler, OrphanRecord, ReconcileFailure, ReconcileReport,
};
pub use snapshotter::{RecordOutcome, SnapshotRecorder};
