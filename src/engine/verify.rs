//! Read-only drift detection between stored and recomputed aggregates.
//!
//! Concurrent writers that bypass the per-pool lock can overwrite each
//! other's counter changes; this check recomputes the aggregates from the
//! stored distributions and flags any counter outside the balance epsilon.

use crate::domain::{Decimal, Pool};

use super::{balance_epsilon, LiquidityLedger};

/// One counter whose stored value disagrees with the recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDrift {
    pub field: &'static str,
    pub stored: Decimal,
    pub recomputed: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub pool: Pool,
    pub matches: bool,
    pub drifts: Vec<FieldDrift>,
}

/// Recompute aggregates from the ledger's distributions and compare against
/// the stored counters. Never mutates stored state.
pub fn verify_ledger(ledger: &LiquidityLedger) -> VerificationReport {
    let mut recomputed = ledger.clone();
    recomputed.recalculate();

    let eps = balance_epsilon();
    let checks = [
        (
            "distributedLiquidity",
            ledger.distributed_liquidity,
            recomputed.distributed_liquidity,
        ),
        (
            "totalProfitLoss",
            ledger.total_profit_loss,
            recomputed.total_profit_loss,
        ),
        (
            "totalProfitLossPercentage",
            ledger.total_profit_loss_percentage,
            recomputed.total_profit_loss_percentage,
        ),
        (
            "totalLiquidity",
            ledger.total_liquidity,
            recomputed.total_liquidity,
        ),
        (
            "availableLiquidity",
            ledger.available_liquidity,
            recomputed.available_liquidity,
        ),
    ];

    let drifts: Vec<FieldDrift> = checks
        .into_iter()
        .filter(|(_, stored, fresh)| (*stored - *fresh).abs() > eps)
        .map(|(field, stored, recomputed)| FieldDrift {
            field,
            stored,
            recomputed,
        })
        .collect();

    VerificationReport {
        pool: ledger.pool,
        matches: drifts.is_empty(),
        drifts,
    }
}
