//! Position lifecycle source: the external service that owns trading
//! positions.
//!
//! Distributions reference positions by id only; this trait is the lookup
//! side of that weak reference, used by orphan reconciliation to learn
//! whether a backing position still exists and what it last traded at.

use async_trait::async_trait;
use std::fmt;

use crate::domain::{Decimal, PositionId};

pub mod http;
pub mod mock;

pub use http::HttpPositionSource;
pub use mock::MockPositionSource;

/// Lifecycle state of a backing position as the signal service reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionStatus {
    /// False once the signal service has closed the position.
    pub is_open: bool,
    /// Last price the signal service saw, if it reports one.
    pub last_price: Option<Decimal>,
}

/// Lookup interface for backing positions.
///
/// Implementations must handle retry/backoff; a missing position is
/// `Ok(None)`, not an error.
#[async_trait]
pub trait PositionSource: Send + Sync + fmt::Debug {
    /// Fetch the status of one position, or `None` if the position no
    /// longer exists.
    async fn fetch_position(
        &self,
        position_id: &PositionId,
    ) -> Result<Option<PositionStatus>, PositionSourceError>;
}

/// Error type for position source operations.
#[derive(Debug, Clone)]
pub enum PositionSourceError {
    /// Network error (connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded
    RateLimited,
    /// Other error
    Other(String),
}

impl fmt::Display for PositionSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            PositionSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            PositionSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            PositionSourceError::RateLimited => write!(f, "Rate limited"),
            PositionSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for PositionSourceError {}
