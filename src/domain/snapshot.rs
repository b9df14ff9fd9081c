//! Dated, immutable copies of a pool's totals used for period returns.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Decimal, Pool};

/// Which snapshot family a query or export targets.
///
/// Liquidity snapshots copy the ledger at the start of a calendar day;
/// portfolio snapshots are captured at a fixed market-close-adjacent time.
/// Two series because they serve two comparison semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    Liquidity,
    Portfolio,
}

impl SnapshotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotKind::Liquidity => "liquidity",
            SnapshotKind::Portfolio => "portfolio",
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SnapshotKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "liquidity" => Ok(SnapshotKind::Liquidity),
            "portfolio" => Ok(SnapshotKind::Portfolio),
            other => Err(format!("unknown snapshot kind: {}", other)),
        }
    }
}

/// Point-in-time copy of a ledger's totals for one calendar day.
///
/// At most one exists per `(pool, snapshot_date)`; rows are append-only and
/// never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquiditySnapshot {
    pub pool: Pool,
    pub snapshot_date: NaiveDate,
    pub total_liquidity: Decimal,
    pub available_liquidity: Decimal,
    pub distributed_liquidity: Decimal,
    pub total_profit_loss: Decimal,
    pub total_profit_loss_percentage: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Same totals as [`LiquiditySnapshot`], captured at a fixed daily clock
/// time rather than day-start. `captured_at` records the actual instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub pool: Pool,
    pub snapshot_date: NaiveDate,
    pub total_liquidity: Decimal,
    pub available_liquidity: Decimal,
    pub distributed_liquidity: Decimal,
    pub total_profit_loss: Decimal,
    pub total_profit_loss_percentage: Decimal,
    pub captured_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_kind_roundtrip() {
        for kind in [SnapshotKind::Liquidity, SnapshotKind::Portfolio] {
            let parsed: SnapshotKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("daily".parse::<SnapshotKind>().is_err());
    }
}
