//! The liquidity ledger aggregate and its command methods.
//!
//! One ledger exists per pool. Commands validate before touching any state,
//! so a rejected command leaves the aggregate exactly as it was. Every
//! successful command ends in [`LiquidityLedger::recalculate`], the single
//! site where aggregate counters are derived.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Decimal, Distribution, Pool, PositionId, Symbol};

use super::balance_epsilon;

/// Domain errors raised by ledger commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),
    #[error("no distribution for position {0}")]
    DistributionNotFound(PositionId),
    #[error("insufficient available liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity {
        requested: Decimal,
        available: Decimal,
    },
    #[error("insufficient shares: requested {requested}, held {held}")]
    InsufficientShares { requested: Decimal, held: Decimal },
}

/// Result of a (partial) sell, reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellOutcome {
    pub position_id: PositionId,
    pub shares_sold: Decimal,
    pub sell_price: Decimal,
    pub realized: Decimal,
    /// Cash returned to available liquidity: the sold fraction of the
    /// original cost basis plus the realized P&L.
    pub freed: Decimal,
    pub remaining_shares: Decimal,
    pub is_active: bool,
}

/// Result of a forced distribution removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub position_id: PositionId,
    pub symbol: Symbol,
    /// Market value handed back to available liquidity.
    pub freed: Decimal,
    /// Unrealized P&L locked into the ledger's realized accumulator at
    /// removal time.
    pub realized_locked_in: Decimal,
}

/// Aggregate root for one pool's capital counters and distributions.
///
/// Invariants, held after every command:
/// - `total_liquidity == initial_liquidity + total_profit_loss`
/// - `available_liquidity + distributed_liquidity == total_liquidity`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityLedger {
    pub pool: Pool,
    pub initial_liquidity: Decimal,
    pub total_liquidity: Decimal,
    pub available_liquidity: Decimal,
    pub distributed_liquidity: Decimal,
    /// Realized P&L accumulated at the ledger level. Survives distribution
    /// pruning; `total_profit_loss` is this plus live unrealized P&L.
    pub realized_profit_loss: Decimal,
    pub total_profit_loss: Decimal,
    pub total_profit_loss_percentage: Decimal,
    pub distributions: Vec<Distribution>,
    /// Optimistic-concurrency token; 0 until first persisted.
    pub version: i64,
}

impl LiquidityLedger {
    /// A zeroed ledger, the lazy-initialization value for a pool that has
    /// never been funded.
    pub fn empty(pool: Pool) -> Self {
        LiquidityLedger {
            pool,
            initial_liquidity: Decimal::zero(),
            total_liquidity: Decimal::zero(),
            available_liquidity: Decimal::zero(),
            distributed_liquidity: Decimal::zero(),
            realized_profit_loss: Decimal::zero(),
            total_profit_loss: Decimal::zero(),
            total_profit_loss_percentage: Decimal::zero(),
            distributions: Vec::new(),
            version: 0,
        }
    }

    /// Re-base the pool's capital: `initial_liquidity` is SET to `amount`,
    /// not incremented. Distributions and realized history are kept.
    pub fn fund(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::Validation(
                "funding amount must be positive".to_string(),
            ));
        }
        self.initial_liquidity = amount;
        self.recalculate();
        Ok(())
    }

    /// Commit a percentage of available liquidity to a newly opened
    /// position.
    pub fn allocate(
        &mut self,
        position_id: PositionId,
        symbol: Symbol,
        percentage: Decimal,
        entry_price: Decimal,
    ) -> Result<&Distribution, LedgerError> {
        if !percentage.is_positive() {
            return Err(LedgerError::Validation(
                "allocation percentage must be positive".to_string(),
            ));
        }
        if !entry_price.is_positive() {
            return Err(LedgerError::Validation(
                "entry price must be positive".to_string(),
            ));
        }
        if self
            .distributions
            .iter()
            .any(|d| d.position_id == position_id)
        {
            return Err(LedgerError::Validation(format!(
                "position {} already has a distribution",
                position_id
            )));
        }

        let amount = self.available_liquidity * percentage / Decimal::hundred();
        if !self.available_liquidity.is_positive() || amount > self.available_liquidity {
            return Err(LedgerError::InsufficientLiquidity {
                requested: amount,
                available: self.available_liquidity,
            });
        }

        self.distributions
            .push(Distribution::open(position_id, symbol, amount, entry_price));
        self.recalculate();
        Ok(self.distributions.last().expect("just pushed"))
    }

    /// Re-mark one active distribution at `price`. Idempotent for repeated
    /// calls with the same price.
    pub fn revalue(&mut self, position_id: &PositionId, price: Decimal) -> Result<(), LedgerError> {
        if !price.is_positive() {
            return Err(LedgerError::Validation(
                "price must be positive".to_string(),
            ));
        }
        let dist = self.active_distribution_mut(position_id)?;
        dist.mark_price(price);
        self.recalculate();
        Ok(())
    }

    /// Sell part or all of a distribution's remaining shares at `price`.
    ///
    /// Realized P&L accrues on both the distribution and the ledger; the
    /// remaining shares are re-marked at the sell price. Selling the last
    /// share deactivates the distribution.
    pub fn sell(
        &mut self,
        position_id: &PositionId,
        shares: Decimal,
        price: Decimal,
    ) -> Result<SellOutcome, LedgerError> {
        if !shares.is_positive() {
            return Err(LedgerError::Validation(
                "shares to sell must be positive".to_string(),
            ));
        }
        if !price.is_positive() {
            return Err(LedgerError::Validation(
                "sell price must be positive".to_string(),
            ));
        }

        let dist = self.active_distribution_mut(position_id)?;
        let remaining = dist.remaining_shares();
        if shares > remaining {
            return Err(LedgerError::InsufficientShares {
                requested: shares,
                held: remaining,
            });
        }

        let realized = (price - dist.entry_price) * shares;
        let freed = dist.allocated_amount * shares / dist.shares + realized;

        dist.sold_shares += shares;
        dist.realized_profit_loss += realized;
        dist.mark_price(price);
        if dist.remaining_shares().is_zero() {
            dist.is_active = false;
        }

        let outcome = SellOutcome {
            position_id: dist.position_id.clone(),
            shares_sold: shares,
            sell_price: price,
            realized,
            freed,
            remaining_shares: dist.remaining_shares(),
            is_active: dist.is_active,
        };

        self.realized_profit_loss += realized;
        self.recalculate();
        Ok(outcome)
    }

    /// Force-close a distribution regardless of remaining shares.
    ///
    /// The remaining market value flows back to available liquidity and any
    /// unrealized P&L on it is locked into the ledger's realized
    /// accumulator, so totals stay consistent through the deletion. Also
    /// prunes inactive entries.
    pub fn remove(&mut self, position_id: &PositionId) -> Result<RemoveOutcome, LedgerError> {
        let idx = self
            .distributions
            .iter()
            .position(|d| &d.position_id == position_id)
            .ok_or_else(|| LedgerError::DistributionNotFound(position_id.clone()))?;

        let dist = self.distributions.remove(idx);
        let freed = dist.market_value();
        let locked = if dist.is_active {
            (dist.current_price - dist.entry_price) * dist.remaining_shares()
        } else {
            Decimal::zero()
        };

        self.realized_profit_loss += locked;
        self.recalculate();
        Ok(RemoveOutcome {
            position_id: dist.position_id,
            symbol: dist.symbol,
            freed,
            realized_locked_in: locked,
        })
    }

    /// Derive every aggregate counter from current state.
    ///
    /// The only place counters are computed. Pure function of state: calling
    /// it twice in a row changes nothing.
    pub fn recalculate(&mut self) {
        let mut distributed = Decimal::zero();
        let mut unrealized = Decimal::zero();
        for dist in self.distributions.iter_mut() {
            dist.refresh_unrealized();
            if dist.is_active {
                distributed += dist.market_value();
                unrealized += dist.profit_loss;
            }
        }

        self.distributed_liquidity = distributed;
        self.total_profit_loss = self.realized_profit_loss + unrealized;
        self.total_liquidity = self.initial_liquidity + self.total_profit_loss;
        self.available_liquidity = self.total_liquidity - self.distributed_liquidity;
        self.total_profit_loss_percentage = if self.initial_liquidity.is_zero() {
            Decimal::zero()
        } else {
            self.total_profit_loss / self.initial_liquidity * Decimal::hundred()
        };
    }

    pub fn distribution(&self, position_id: &PositionId) -> Option<&Distribution> {
        self.distributions
            .iter()
            .find(|d| &d.position_id == position_id)
    }

    pub fn active_distributions(&self) -> impl Iterator<Item = &Distribution> {
        self.distributions.iter().filter(|d| d.is_active)
    }

    /// `available + distributed == total` within the balance epsilon.
    pub fn is_balanced(&self) -> bool {
        let gap = self.available_liquidity + self.distributed_liquidity - self.total_liquidity;
        gap.abs() <= balance_epsilon()
    }

    fn active_distribution_mut(
        &mut self,
        position_id: &PositionId,
    ) -> Result<&mut Distribution, LedgerError> {
        self.distributions
            .iter_mut()
            .find(|d| &d.position_id == position_id && d.is_active)
            .ok_or_else(|| LedgerError::DistributionNotFound(position_id.clone()))
    }
}
