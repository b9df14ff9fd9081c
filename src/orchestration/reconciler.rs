//! Orphan reconciliation: garbage collection for dead position references.
//!
//! A distribution is an orphan when its backing position is gone or closed
//! in the signal service but capital is still allocated to it. The dry-run
//! pass only reports; the apply pass liquidates remaining shares at the best
//! known price and removes the entry through the ordinary ledger commands.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{LedgerService, ServiceError};
use crate::datasource::PositionSource;
use crate::domain::{Decimal, Distribution, Pool, PositionId, Symbol};

/// Why a distribution was classified as an orphan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanReason {
    /// The signal service no longer knows the position.
    Missing,
    /// The signal service reports the position as closed.
    Closed,
}

impl OrphanReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrphanReason::Missing => "missing",
            OrphanReason::Closed => "closed",
        }
    }
}

/// One orphaned distribution found by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanRecord {
    pub position_id: PositionId,
    pub symbol: Symbol,
    pub remaining_shares: Decimal,
    /// Price an apply pass would liquidate at: the source's last known
    /// price, falling back to the distribution's own mark.
    pub liquidation_price: Decimal,
    pub reason: OrphanReason,
}

/// A per-item failure during an apply pass. The batch continues past it.
#[derive(Debug, Clone)]
pub struct ReconcileFailure {
    pub position_id: PositionId,
    pub reason: String,
}

/// Summary of one reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub run_id: Uuid,
    pub pool: Pool,
    pub applied: bool,
    /// Active distributions examined.
    pub examined: usize,
    pub orphans: Vec<OrphanRecord>,
    /// Orphans successfully liquidated and removed (0 on dry runs).
    pub reconciled: usize,
    pub failed: Vec<ReconcileFailure>,
    /// Capital returned to available liquidity (0 on dry runs).
    pub freed: Decimal,
}

pub struct OrphanReconciler {
    source: Arc<dyn PositionSource>,
    ledgers: Arc<LedgerService>,
}

impl OrphanReconciler {
    pub fn new(source: Arc<dyn PositionSource>, ledgers: Arc<LedgerService>) -> Self {
        Self { source, ledgers }
    }

    /// Report orphans without mutating anything.
    pub async fn dry_run(&self, pool: Pool) -> Result<ReconcileReport, ServiceError> {
        let (examined, orphans) = self.scan(pool).await?;
        Ok(ReconcileReport {
            run_id: Uuid::new_v4(),
            pool,
            applied: false,
            examined,
            orphans,
            reconciled: 0,
            failed: Vec::new(),
            freed: Decimal::zero(),
        })
    }

    /// Liquidate and remove every orphan. Per-item failures are logged and
    /// collected; the batch always runs to completion.
    pub async fn apply(&self, pool: Pool) -> Result<ReconcileReport, ServiceError> {
        let run_id = Uuid::new_v4();
        let (examined, orphans) = self.scan(pool).await?;

        let mut reconciled = 0;
        let mut failed = Vec::new();
        let mut freed = Decimal::zero();

        for orphan in &orphans {
            match self.reconcile_one(pool, orphan).await {
                Ok(returned) => {
                    reconciled += 1;
                    freed += returned;
                }
                Err(e) => {
                    warn!(
                        "Reconciliation of position {} failed: {}",
                        orphan.position_id, e
                    );
                    failed.push(ReconcileFailure {
                        position_id: orphan.position_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Reconciliation run {} for pool {}: {} orphans, {} reconciled, {} failed, {} freed",
            run_id,
            pool,
            orphans.len(),
            reconciled,
            failed.len(),
            freed
        );

        Ok(ReconcileReport {
            run_id,
            pool,
            applied: true,
            examined,
            orphans,
            reconciled,
            failed,
            freed,
        })
    }

    /// Classify every active distribution. Lookup failures are not orphans;
    /// they are logged and the distribution is left alone.
    async fn scan(&self, pool: Pool) -> Result<(usize, Vec<OrphanRecord>), ServiceError> {
        let ledger = self.ledgers.get(pool).await?;
        let active: Vec<Distribution> = ledger.active_distributions().cloned().collect();

        let mut orphans = Vec::new();
        for dist in &active {
            match self.source.fetch_position(&dist.position_id).await {
                Ok(None) => orphans.push(orphan_record(dist, None, OrphanReason::Missing)),
                Ok(Some(status)) if !status.is_open => {
                    orphans.push(orphan_record(dist, status.last_price, OrphanReason::Closed))
                }
                Ok(Some(_)) => {}
                Err(e) => {
                    warn!("Position lookup failed for {}: {}", dist.position_id, e);
                }
            }
        }

        Ok((active.len(), orphans))
    }

    async fn reconcile_one(
        &self,
        pool: Pool,
        orphan: &OrphanRecord,
    ) -> Result<Decimal, ServiceError> {
        let mut freed = Decimal::zero();

        if orphan.remaining_shares.is_positive() {
            let (_, outcome) = self
                .ledgers
                .sell(
                    pool,
                    &orphan.position_id,
                    orphan.remaining_shares,
                    orphan.liquidation_price,
                )
                .await?;
            freed += outcome.freed;
        }

        let (_, removed) = self.ledgers.remove(pool, &orphan.position_id).await?;
        freed += removed.freed;
        Ok(freed)
    }
}

fn orphan_record(
    dist: &Distribution,
    last_price: Option<Decimal>,
    reason: OrphanReason,
) -> OrphanRecord {
    OrphanRecord {
        position_id: dist.position_id.clone(),
        symbol: dist.symbol.clone(),
        remaining_shares: dist.remaining_shares(),
        liquidation_price: last_price.unwrap_or(dist.current_price),
        reason,
    }
}
