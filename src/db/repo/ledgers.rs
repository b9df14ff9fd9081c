//! Ledger aggregate persistence.
//!
//! The whole aggregate (counters row plus distribution child rows) is
//! written in one transaction. The counters row carries a version column;
//! saves compare-and-swap on it so a stale writer gets a conflict instead of
//! silently overwriting fresher state.

use sqlx::Row;

use super::{parse_decimal_column, Repository, StoreError};
use crate::domain::{Distribution, Pool, PositionId, Symbol};
use crate::engine::LiquidityLedger;

impl Repository {
    /// Load the ledger for a pool, or `None` if it was never persisted.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn load_ledger(&self, pool: Pool) -> Result<Option<LiquidityLedger>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT initial_liquidity, total_liquidity, available_liquidity,
                   distributed_liquidity, realized_profit_loss, total_profit_loss,
                   total_profit_loss_pct, version
            FROM ledgers
            WHERE pool = ?
            "#,
        )
        .bind(pool.as_str())
        .fetch_optional(self.db())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut ledger = LiquidityLedger::empty(pool);
        ledger.initial_liquidity =
            parse_decimal_column(&row.get::<String, _>("initial_liquidity"), "initial_liquidity");
        ledger.total_liquidity =
            parse_decimal_column(&row.get::<String, _>("total_liquidity"), "total_liquidity");
        ledger.available_liquidity = parse_decimal_column(
            &row.get::<String, _>("available_liquidity"),
            "available_liquidity",
        );
        ledger.distributed_liquidity = parse_decimal_column(
            &row.get::<String, _>("distributed_liquidity"),
            "distributed_liquidity",
        );
        ledger.realized_profit_loss = parse_decimal_column(
            &row.get::<String, _>("realized_profit_loss"),
            "realized_profit_loss",
        );
        ledger.total_profit_loss = parse_decimal_column(
            &row.get::<String, _>("total_profit_loss"),
            "total_profit_loss",
        );
        ledger.total_profit_loss_percentage = parse_decimal_column(
            &row.get::<String, _>("total_profit_loss_pct"),
            "total_profit_loss_pct",
        );
        ledger.version = row.get("version");
        ledger.distributions = self.load_distributions(pool).await?;

        Ok(Some(ledger))
    }

    async fn load_distributions(&self, pool: Pool) -> Result<Vec<Distribution>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT position_id, symbol, allocated_amount, entry_price, current_price,
                   shares, sold_shares, realized_profit_loss, profit_loss,
                   profit_loss_pct, is_active
            FROM distributions
            WHERE pool = ?
            ORDER BY position_id ASC
            "#,
        )
        .bind(pool.as_str())
        .fetch_all(self.db())
        .await?;

        let distributions = rows
            .iter()
            .map(|row| Distribution {
                position_id: PositionId::new(row.get("position_id")),
                symbol: Symbol::new(row.get("symbol")),
                allocated_amount: parse_decimal_column(
                    &row.get::<String, _>("allocated_amount"),
                    "allocated_amount",
                ),
                entry_price: parse_decimal_column(
                    &row.get::<String, _>("entry_price"),
                    "entry_price",
                ),
                current_price: parse_decimal_column(
                    &row.get::<String, _>("current_price"),
                    "current_price",
                ),
                shares: parse_decimal_column(&row.get::<String, _>("shares"), "shares"),
                sold_shares: parse_decimal_column(
                    &row.get::<String, _>("sold_shares"),
                    "sold_shares",
                ),
                realized_profit_loss: parse_decimal_column(
                    &row.get::<String, _>("realized_profit_loss"),
                    "realized_profit_loss",
                ),
                profit_loss: parse_decimal_column(
                    &row.get::<String, _>("profit_loss"),
                    "profit_loss",
                ),
                profit_loss_percentage: parse_decimal_column(
                    &row.get::<String, _>("profit_loss_pct"),
                    "profit_loss_pct",
                ),
                is_active: row.get::<i64, _>("is_active") != 0,
            })
            .collect();

        Ok(distributions)
    }

    /// Persist the whole aggregate atomically and return the new version.
    ///
    /// A ledger with version 0 has never been stored and takes the insert
    /// path. Any version mismatch on the counters row means another writer
    /// got there first.
    ///
    /// # Errors
    /// `StoreError::StaleWrite` on a version conflict, `StoreError::Db` on
    /// infrastructure failure.
    pub async fn save_ledger(&self, ledger: &LiquidityLedger) -> Result<i64, StoreError> {
        let new_version = ledger.version + 1;
        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut tx = self.db().begin().await?;

        let result = if ledger.version == 0 {
            sqlx::query(
                r#"
                INSERT INTO ledgers (
                    pool, initial_liquidity, total_liquidity, available_liquidity,
                    distributed_liquidity, realized_profit_loss, total_profit_loss,
                    total_profit_loss_pct, version, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(pool) DO NOTHING
                "#,
            )
            .bind(ledger.pool.as_str())
            .bind(ledger.initial_liquidity.to_canonical_string())
            .bind(ledger.total_liquidity.to_canonical_string())
            .bind(ledger.available_liquidity.to_canonical_string())
            .bind(ledger.distributed_liquidity.to_canonical_string())
            .bind(ledger.realized_profit_loss.to_canonical_string())
            .bind(ledger.total_profit_loss.to_canonical_string())
            .bind(ledger.total_profit_loss_percentage.to_canonical_string())
            .bind(new_version)
            .bind(now_ms)
            .execute(&mut *tx)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE ledgers SET
                    initial_liquidity = ?, total_liquidity = ?, available_liquidity = ?,
                    distributed_liquidity = ?, realized_profit_loss = ?,
                    total_profit_loss = ?, total_profit_loss_pct = ?,
                    version = ?, updated_at = ?
                WHERE pool = ? AND version = ?
                "#,
            )
            .bind(ledger.initial_liquidity.to_canonical_string())
            .bind(ledger.total_liquidity.to_canonical_string())
            .bind(ledger.available_liquidity.to_canonical_string())
            .bind(ledger.distributed_liquidity.to_canonical_string())
            .bind(ledger.realized_profit_loss.to_canonical_string())
            .bind(ledger.total_profit_loss.to_canonical_string())
            .bind(ledger.total_profit_loss_percentage.to_canonical_string())
            .bind(new_version)
            .bind(now_ms)
            .bind(ledger.pool.as_str())
            .bind(ledger.version)
            .execute(&mut *tx)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::StaleWrite(ledger.pool));
        }

        sqlx::query("DELETE FROM distributions WHERE pool = ?")
            .bind(ledger.pool.as_str())
            .execute(&mut *tx)
            .await?;

        for dist in &ledger.distributions {
            sqlx::query(
                r#"
                INSERT INTO distributions (
                    pool, position_id, symbol, allocated_amount, entry_price,
                    current_price, shares, sold_shares, realized_profit_loss,
                    profit_loss, profit_loss_pct, is_active
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(ledger.pool.as_str())
            .bind(dist.position_id.as_str())
            .bind(dist.symbol.as_str())
            .bind(dist.allocated_amount.to_canonical_string())
            .bind(dist.entry_price.to_canonical_string())
            .bind(dist.current_price.to_canonical_string())
            .bind(dist.shares.to_canonical_string())
            .bind(dist.sold_shares.to_canonical_string())
            .bind(dist.realized_profit_loss.to_canonical_string())
            .bind(dist.profit_loss.to_canonical_string())
            .bind(dist.profit_loss_percentage.to_canonical_string())
            .bind(dist.is_active as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(new_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::domain::Decimal;
    use tempfile::TempDir;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    async fn test_repo() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    fn sample_ledger() -> LiquidityLedger {
        let mut ledger = LiquidityLedger::empty(Pool::Swing);
        ledger.fund(dec("1000")).unwrap();
        ledger
            .allocate(
                PositionId::new("pos-1".to_string()),
                Symbol::new("AAPL".to_string()),
                dec("10"),
                dec("10"),
            )
            .unwrap();
        ledger
            .revalue(&PositionId::new("pos-1".to_string()), dec("12.5"))
            .unwrap();
        ledger
    }

    #[tokio::test]
    async fn test_load_missing_ledger_is_none() {
        let (repo, _tmp) = test_repo().await;
        assert!(repo.load_ledger(Pool::Swing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let (repo, _tmp) = test_repo().await;
        let mut ledger = sample_ledger();

        let version = repo.save_ledger(&ledger).await.unwrap();
        assert_eq!(version, 1);
        ledger.version = version;

        let loaded = repo.load_ledger(Pool::Swing).await.unwrap().unwrap();
        assert_eq!(loaded, ledger);
    }

    #[tokio::test]
    async fn test_save_bumps_version() {
        let (repo, _tmp) = test_repo().await;
        let mut ledger = sample_ledger();

        ledger.version = repo.save_ledger(&ledger).await.unwrap();
        ledger.fund(dec("2000")).unwrap();
        let version = repo.save_ledger(&ledger).await.unwrap();
        assert_eq!(version, 2);
    }

    #[tokio::test]
    async fn test_stale_write_rejected() {
        let (repo, _tmp) = test_repo().await;
        let mut first = sample_ledger();
        first.version = repo.save_ledger(&first).await.unwrap();

        // A second writer loaded the same version and saved first.
        let mut second = repo.load_ledger(Pool::Swing).await.unwrap().unwrap();
        second.fund(dec("3000")).unwrap();
        repo.save_ledger(&second).await.unwrap();

        let err = repo.save_ledger(&first).await.unwrap_err();
        assert!(matches!(err, StoreError::StaleWrite(Pool::Swing)));

        // The second writer's state won.
        let loaded = repo.load_ledger(Pool::Swing).await.unwrap().unwrap();
        assert_eq!(loaded.initial_liquidity, dec("3000"));
    }

    #[tokio::test]
    async fn test_stale_insert_rejected() {
        let (repo, _tmp) = test_repo().await;
        let ledger = sample_ledger();
        repo.save_ledger(&ledger).await.unwrap();

        // A fresh (version 0) aggregate for the same pool must not clobber.
        let err = repo.save_ledger(&sample_ledger()).await.unwrap_err();
        assert!(matches!(err, StoreError::StaleWrite(Pool::Swing)));
    }

    #[tokio::test]
    async fn test_removed_distributions_are_deleted() {
        let (repo, _tmp) = test_repo().await;
        let mut ledger = sample_ledger();
        ledger.version = repo.save_ledger(&ledger).await.unwrap();

        ledger
            .remove(&PositionId::new("pos-1".to_string()))
            .unwrap();
        ledger.version = repo.save_ledger(&ledger).await.unwrap();

        let loaded = repo.load_ledger(Pool::Swing).await.unwrap().unwrap();
        assert!(loaded.distributions.is_empty());
    }
}
