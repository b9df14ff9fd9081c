//! In-memory position source for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{PositionSource, PositionSourceError, PositionStatus};
use crate::domain::{Decimal, PositionId};

/// Mock position source holding a mutable map of known positions.
#[derive(Debug, Default)]
pub struct MockPositionSource {
    positions: Mutex<HashMap<PositionId, PositionStatus>>,
}

impl MockPositionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an open position with a last price.
    pub fn set_open(&self, position_id: PositionId, last_price: Decimal) {
        self.positions.lock().expect("mock lock poisoned").insert(
            position_id,
            PositionStatus {
                is_open: true,
                last_price: Some(last_price),
            },
        );
    }

    /// Register a closed position, optionally with a last price.
    pub fn set_closed(&self, position_id: PositionId, last_price: Option<Decimal>) {
        self.positions.lock().expect("mock lock poisoned").insert(
            position_id,
            PositionStatus {
                is_open: false,
                last_price,
            },
        );
    }

    /// Delete a position entirely, as if the signal service lost it.
    pub fn forget(&self, position_id: &PositionId) {
        self.positions
            .lock()
            .expect("mock lock poisoned")
            .remove(position_id);
    }
}

#[async_trait]
impl PositionSource for MockPositionSource {
    async fn fetch_position(
        &self,
        position_id: &PositionId,
    ) -> Result<Option<PositionStatus>, PositionSourceError> {
        Ok(self
            .positions
            .lock()
            .expect("mock lock poisoned")
            .get(position_id)
            .cloned())
    }
}
