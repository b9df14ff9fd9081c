//! Distribution: one allocation of pool capital to one open position.

use serde::{Deserialize, Serialize};

use super::{Decimal, PositionId, Symbol};

/// One slice of a pool's capital backing one open trading position.
///
/// The position itself lives in the signal service; only `position_id` links
/// them. All prices are per-unit; `shares` is the unit count bought with
/// `allocated_amount` at `entry_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    pub position_id: PositionId,
    pub symbol: Symbol,
    pub allocated_amount: Decimal,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub shares: Decimal,
    pub sold_shares: Decimal,
    pub realized_profit_loss: Decimal,
    /// Unrealized P&L on the remaining shares at `current_price`.
    pub profit_loss: Decimal,
    pub profit_loss_percentage: Decimal,
    pub is_active: bool,
}

impl Distribution {
    /// Open a new distribution: `shares = allocated_amount / entry_price`,
    /// marked at the entry price with zero unrealized P&L.
    pub fn open(
        position_id: PositionId,
        symbol: Symbol,
        allocated_amount: Decimal,
        entry_price: Decimal,
    ) -> Self {
        Distribution {
            position_id,
            symbol,
            allocated_amount,
            entry_price,
            current_price: entry_price,
            shares: allocated_amount / entry_price,
            sold_shares: Decimal::zero(),
            realized_profit_loss: Decimal::zero(),
            profit_loss: Decimal::zero(),
            profit_loss_percentage: Decimal::zero(),
            is_active: true,
        }
    }

    pub fn remaining_shares(&self) -> Decimal {
        self.shares - self.sold_shares
    }

    /// Current market value of the remaining shares. Zero once inactive.
    pub fn market_value(&self) -> Decimal {
        if !self.is_active {
            return Decimal::zero();
        }
        self.remaining_shares() * self.current_price
    }

    /// Re-mark at `price` and refresh the unrealized P&L figures.
    pub fn mark_price(&mut self, price: Decimal) {
        self.current_price = price;
        self.refresh_unrealized();
    }

    /// Recompute `profit_loss` / `profit_loss_percentage` from the current
    /// mark. Idempotent.
    pub fn refresh_unrealized(&mut self) {
        self.profit_loss = (self.current_price - self.entry_price) * self.remaining_shares();
        self.profit_loss_percentage = if self.entry_price.is_zero() {
            Decimal::zero()
        } else {
            (self.current_price - self.entry_price) / self.entry_price * Decimal::hundred()
        };
    }
}
