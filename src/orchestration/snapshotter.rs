//! Daily snapshot recorder.
//!
//! Copies a pool's current totals into the snapshot tables, dated by the
//! calendar day in the configured reference timezone. Scheduling is the
//! caller's job (cron or admin action); invoking it again on the same day is
//! a no-op signalled by the `(pool, date)` uniqueness constraint.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info};

use super::ServiceError;
use crate::db::Repository;
use crate::domain::{LiquiditySnapshot, Pool, PortfolioSnapshot};
use crate::engine::LiquidityLedger;

/// Outcome of one recording attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// False when a snapshot for this `(pool, date)` already existed.
    pub created: bool,
    pub date: NaiveDate,
}

pub struct SnapshotRecorder {
    repo: Arc<Repository>,
    reference_tz: Tz,
}

impl SnapshotRecorder {
    pub fn new(repo: Arc<Repository>, reference_tz: Tz) -> Self {
        Self { repo, reference_tz }
    }

    /// The current calendar day in the reference timezone. All snapshot
    /// dating goes through here.
    pub fn business_date(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.reference_tz).date_naive()
    }

    /// Record today's liquidity snapshot for a pool. Idempotent per day.
    pub async fn record_liquidity(&self, pool: Pool) -> Result<RecordOutcome, ServiceError> {
        let date = self.business_date();
        let ledger = self.load(pool).await?;

        let snapshot = LiquiditySnapshot {
            pool,
            snapshot_date: date,
            total_liquidity: ledger.total_liquidity,
            available_liquidity: ledger.available_liquidity,
            distributed_liquidity: ledger.distributed_liquidity,
            total_profit_loss: ledger.total_profit_loss,
            total_profit_loss_percentage: ledger.total_profit_loss_percentage,
            created_at: Utc::now(),
        };

        let created = self.repo.insert_liquidity_snapshot(&snapshot).await?;
        if created {
            info!("Recorded liquidity snapshot for {} on {}", pool, date);
        } else {
            debug!("Liquidity snapshot for {} on {} already exists", pool, date);
        }
        Ok(RecordOutcome { created, date })
    }

    /// Record today's portfolio snapshot for a pool. Same dating and
    /// idempotence rules; the capture instant is stamped on the row.
    pub async fn record_portfolio(&self, pool: Pool) -> Result<RecordOutcome, ServiceError> {
        let date = self.business_date();
        let ledger = self.load(pool).await?;

        let snapshot = PortfolioSnapshot {
            pool,
            snapshot_date: date,
            total_liquidity: ledger.total_liquidity,
            available_liquidity: ledger.available_liquidity,
            distributed_liquidity: ledger.distributed_liquidity,
            total_profit_loss: ledger.total_profit_loss,
            total_profit_loss_percentage: ledger.total_profit_loss_percentage,
            captured_at: Utc::now(),
        };

        let created = self.repo.insert_portfolio_snapshot(&snapshot).await?;
        if created {
            info!("Recorded portfolio snapshot for {} on {}", pool, date);
        } else {
            debug!("Portfolio snapshot for {} on {} already exists", pool, date);
        }
        Ok(RecordOutcome { created, date })
    }

    async fn load(&self, pool: Pool) -> Result<LiquidityLedger, ServiceError> {
        Ok(self
            .repo
            .load_ledger(pool)
            .await?
            .unwrap_or_else(|| LiquidityLedger::empty(pool)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::domain::Decimal;
    use tempfile::TempDir;

    async fn recorder() -> (SnapshotRecorder, Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Arc::new(Repository::new(pool));
        (
            SnapshotRecorder::new(repo.clone(), chrono_tz::America::New_York),
            repo,
            temp_dir,
        )
    }

    #[tokio::test]
    async fn test_second_recording_same_day_is_noop() {
        let (recorder, repo, _tmp) = recorder().await;

        let first = recorder.record_liquidity(Pool::Swing).await.unwrap();
        assert!(first.created);

        let second = recorder.record_liquidity(Pool::Swing).await.unwrap();
        assert!(!second.created);
        assert_eq!(first.date, second.date);

        let rows = repo.list_liquidity_snapshots(Pool::Swing).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_unfunded_pool_snapshots_as_zero() {
        let (recorder, repo, _tmp) = recorder().await;
        recorder.record_liquidity(Pool::Longterm).await.unwrap();

        let rows = repo.list_liquidity_snapshots(Pool::Longterm).await.unwrap();
        assert_eq!(rows[0].total_liquidity, Decimal::zero());
    }

    #[tokio::test]
    async fn test_portfolio_series_is_separate() {
        let (recorder, repo, _tmp) = recorder().await;
        recorder.record_liquidity(Pool::Swing).await.unwrap();
        let outcome = recorder.record_portfolio(Pool::Swing).await.unwrap();
        assert!(outcome.created);

        assert_eq!(
            repo.list_portfolio_snapshots(Pool::Swing)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
