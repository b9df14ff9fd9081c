//! Single-writer command service over the ledger aggregate.
//!
//! Every mutation is load → command → persist under the pool's mutex, so
//! writers within this process are serialized per pool. The version
//! compare-and-swap in the repository rejects writes from anything that
//! bypassed the lock.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::db::{Repository, StoreError};
use crate::domain::{Decimal, Pool, PositionId, Symbol};
use crate::engine::{
    verify_ledger, LedgerError, LiquidityLedger, RemoveOutcome, SellOutcome, VerificationReport,
};

/// Errors surfaced by ledger service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Store(StoreError::Db(err))
    }
}

pub struct LedgerService {
    repo: Arc<Repository>,
    locks: HashMap<Pool, Mutex<()>>,
}

impl LedgerService {
    pub fn new(repo: Arc<Repository>) -> Self {
        let locks = Pool::ALL.iter().map(|p| (*p, Mutex::new(()))).collect();
        Self { repo, locks }
    }

    /// Current ledger for a pool; a pool never funded reads as a zeroed
    /// ledger (lazy initialization; the row appears on first mutation).
    pub async fn get(&self, pool: Pool) -> Result<LiquidityLedger, ServiceError> {
        self.load(pool).await
    }

    /// Re-base the pool's capital.
    pub async fn fund(&self, pool: Pool, amount: Decimal) -> Result<LiquidityLedger, ServiceError> {
        let (ledger, _) = self.mutate(pool, |l| l.fund(amount)).await?;
        info!("Funded pool {} with {}", pool, amount);
        Ok(ledger)
    }

    /// Allocate a percentage of available liquidity to a new position.
    pub async fn allocate(
        &self,
        pool: Pool,
        position_id: PositionId,
        symbol: Symbol,
        percentage: Decimal,
        entry_price: Decimal,
    ) -> Result<LiquidityLedger, ServiceError> {
        let id = position_id.clone();
        let (ledger, _) = self
            .mutate(pool, move |l| {
                l.allocate(position_id, symbol, percentage, entry_price)
                    .map(|_| ())
            })
            .await?;
        info!("Allocated {}% of pool {} to position {}", percentage, pool, id);
        Ok(ledger)
    }

    /// Re-mark a batch of positions in one persisted pass.
    ///
    /// Unknown or inactive position ids are collected and reported, known
    /// ones are applied; a validation failure aborts the whole batch before
    /// anything is persisted.
    pub async fn revalue_bulk(
        &self,
        pool: Pool,
        prices: Vec<(PositionId, Decimal)>,
    ) -> Result<(LiquidityLedger, Vec<PositionId>), ServiceError> {
        self.mutate(pool, move |l| {
            let mut unknown = Vec::new();
            for (position_id, price) in prices {
                match l.revalue(&position_id, price) {
                    Ok(()) => {}
                    Err(LedgerError::DistributionNotFound(id)) => unknown.push(id),
                    Err(other) => return Err(other),
                }
            }
            Ok(unknown)
        })
        .await
    }

    /// Sell part or all of a distribution.
    pub async fn sell(
        &self,
        pool: Pool,
        position_id: &PositionId,
        shares: Decimal,
        price: Decimal,
    ) -> Result<(LiquidityLedger, SellOutcome), ServiceError> {
        let id = position_id.clone();
        let result = self
            .mutate(pool, move |l| l.sell(&id, shares, price))
            .await?;
        info!(
            "Sold {} shares of position {} in pool {} at {}",
            shares, position_id, pool, price
        );
        Ok(result)
    }

    /// Force-close a distribution.
    pub async fn remove(
        &self,
        pool: Pool,
        position_id: &PositionId,
    ) -> Result<(LiquidityLedger, RemoveOutcome), ServiceError> {
        let id = position_id.clone();
        let result = self.mutate(pool, move |l| l.remove(&id)).await?;
        info!("Removed distribution {} from pool {}", position_id, pool);
        Ok(result)
    }

    /// Read-only drift check: recompute aggregates from stored
    /// distributions and compare against the stored counters.
    pub async fn verify(&self, pool: Pool) -> Result<VerificationReport, ServiceError> {
        let ledger = self.load(pool).await?;
        Ok(verify_ledger(&ledger))
    }

    async fn load(&self, pool: Pool) -> Result<LiquidityLedger, ServiceError> {
        Ok(self
            .repo
            .load_ledger(pool)
            .await?
            .unwrap_or_else(|| LiquidityLedger::empty(pool)))
    }

    /// Run one command under the pool's writer lock and persist on success.
    /// A rejected command returns before the save, leaving the store
    /// untouched.
    async fn mutate<F, T>(&self, pool: Pool, command: F) -> Result<(LiquidityLedger, T), ServiceError>
    where
        F: FnOnce(&mut LiquidityLedger) -> Result<T, LedgerError>,
    {
        let _guard = self
            .locks
            .get(&pool)
            .expect("every pool has a writer lock")
            .lock()
            .await;

        let mut ledger = self.load(pool).await?;
        let output = command(&mut ledger)?;
        ledger.version = self.repo.save_ledger(&ledger).await?;
        Ok((ledger, output))
    }
}
