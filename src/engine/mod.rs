//! Pure computation engines for deterministic ledger logic.

use crate::domain::Decimal;

pub mod ledger;
pub mod returns;
pub mod verify;

pub use ledger::{LedgerError, LiquidityLedger, RemoveOutcome, SellOutcome};
pub use returns::{period_return, Period};
pub use verify::{verify_ledger, FieldDrift, VerificationReport};

/// Tolerance for counter-identity checks: 0.01 currency units.
pub fn balance_epsilon() -> Decimal {
    Decimal::new(rust_decimal::Decimal::new(1, 2))
}
