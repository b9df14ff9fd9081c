//! Domain primitives: Pool, PositionId, Symbol.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A named capital program. Every ledger, distribution, and snapshot is
/// scoped to exactly one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pool {
    /// Short-horizon swing-trade program.
    Swing,
    /// Long-horizon holding program.
    Longterm,
}

impl Pool {
    pub const ALL: [Pool; 2] = [Pool::Swing, Pool::Longterm];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pool::Swing => "swing",
            Pool::Longterm => "longterm",
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pool: {0}")]
pub struct PoolParseError(pub String);

impl FromStr for Pool {
    type Err = PoolParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "swing" => Ok(Pool::Swing),
            "longterm" => Ok(Pool::Longterm),
            other => Err(PoolParseError(other.to_string())),
        }
    }
}

/// Identifier of the trading position a distribution backs.
///
/// A weak reference: the position is owned by the signal service and looked
/// up on demand; it may vanish or close without the ledger being told.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub String);

impl PositionId {
    pub fn new(id: String) -> Self {
        PositionId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Traded instrument ticker, kept for display and audit only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(symbol: String) -> Self {
        Symbol(symbol)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_roundtrip() {
        for pool in Pool::ALL {
            let parsed: Pool = pool.as_str().parse().unwrap();
            assert_eq!(parsed, pool);
        }
    }

    #[test]
    fn test_pool_parse_rejects_unknown() {
        let err = "daytrade".parse::<Pool>().unwrap_err();
        assert_eq!(err.0, "daytrade");
    }

    #[test]
    fn test_pool_serde_lowercase() {
        let json = serde_json::to_string(&Pool::Longterm).unwrap();
        assert_eq!(json, "\"longterm\"");
    }

    #[test]
    fn test_position_id_display() {
        let id = PositionId::new("pos-77".to_string());
        assert_eq!(id.to_string(), "pos-77");
    }
}
