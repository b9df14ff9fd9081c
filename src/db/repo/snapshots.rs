//! Snapshot persistence: append-only writes and backward date lookups.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

use super::{parse_decimal_column, Repository};
use crate::domain::{LiquiditySnapshot, Pool, PortfolioSnapshot};

fn parse_date_column(value: &str) -> NaiveDate {
    NaiveDate::from_str(value).unwrap_or_else(|e| {
        warn!("Malformed snapshot_date {}: {}", value, e);
        NaiveDate::default()
    })
}

fn parse_instant_column(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}

fn liquidity_snapshot_from_row(pool: Pool, row: &SqliteRow) -> LiquiditySnapshot {
    LiquiditySnapshot {
        pool,
        snapshot_date: parse_date_column(&row.get::<String, _>("snapshot_date")),
        total_liquidity: parse_decimal_column(
            &row.get::<String, _>("total_liquidity"),
            "total_liquidity",
        ),
        available_liquidity: parse_decimal_column(
            &row.get::<String, _>("available_liquidity"),
            "available_liquidity",
        ),
        distributed_liquidity: parse_decimal_column(
            &row.get::<String, _>("distributed_liquidity"),
            "distributed_liquidity",
        ),
        total_profit_loss: parse_decimal_column(
            &row.get::<String, _>("total_profit_loss"),
            "total_profit_loss",
        ),
        total_profit_loss_percentage: parse_decimal_column(
            &row.get::<String, _>("total_profit_loss_pct"),
            "total_profit_loss_pct",
        ),
        created_at: parse_instant_column(row.get("created_at")),
    }
}

fn portfolio_snapshot_from_row(pool: Pool, row: &SqliteRow) -> PortfolioSnapshot {
    PortfolioSnapshot {
        pool,
        snapshot_date: parse_date_column(&row.get::<String, _>("snapshot_date")),
        total_liquidity: parse_decimal_column(
            &row.get::<String, _>("total_liquidity"),
            "total_liquidity",
        ),
        available_liquidity: parse_decimal_column(
            &row.get::<String, _>("available_liquidity"),
            "available_liquidity",
        ),
        distributed_liquidity: parse_decimal_column(
            &row.get::<String, _>("distributed_liquidity"),
            "distributed_liquidity",
        ),
        total_profit_loss: parse_decimal_column(
            &row.get::<String, _>("total_profit_loss"),
            "total_profit_loss",
        ),
        total_profit_loss_percentage: parse_decimal_column(
            &row.get::<String, _>("total_profit_loss_pct"),
            "total_profit_loss_pct",
        ),
        captured_at: parse_instant_column(row.get("captured_at")),
    }
}

impl Repository {
    /// Insert a liquidity snapshot idempotently.
    ///
    /// Returns `false` when a snapshot already exists for the same
    /// `(pool, date)`: the `ON CONFLICT DO NOTHING` no-op is the
    /// idempotence signal for the daily recorder.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_liquidity_snapshot(
        &self,
        snapshot: &LiquiditySnapshot,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO liquidity_snapshots (
                pool, snapshot_date, total_liquidity, available_liquidity,
                distributed_liquidity, total_profit_loss, total_profit_loss_pct,
                created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(pool, snapshot_date) DO NOTHING
            "#,
        )
        .bind(snapshot.pool.as_str())
        .bind(snapshot.snapshot_date.to_string())
        .bind(snapshot.total_liquidity.to_canonical_string())
        .bind(snapshot.available_liquidity.to_canonical_string())
        .bind(snapshot.distributed_liquidity.to_canonical_string())
        .bind(snapshot.total_profit_loss.to_canonical_string())
        .bind(snapshot.total_profit_loss_percentage.to_canonical_string())
        .bind(snapshot.created_at.timestamp_millis())
        .execute(self.db())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Most recent liquidity snapshot dated at or before `date`.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn liquidity_snapshot_at_or_before(
        &self,
        pool: Pool,
        date: NaiveDate,
    ) -> Result<Option<LiquiditySnapshot>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT snapshot_date, total_liquidity, available_liquidity,
                   distributed_liquidity, total_profit_loss, total_profit_loss_pct,
                   created_at
            FROM liquidity_snapshots
            WHERE pool = ? AND snapshot_date <= ?
            ORDER BY snapshot_date DESC
            LIMIT 1
            "#,
        )
        .bind(pool.as_str())
        .bind(date.to_string())
        .fetch_optional(self.db())
        .await?;

        Ok(row.map(|row| liquidity_snapshot_from_row(pool, &row)))
    }

    /// All liquidity snapshots for a pool, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_liquidity_snapshots(
        &self,
        pool: Pool,
    ) -> Result<Vec<LiquiditySnapshot>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT snapshot_date, total_liquidity, available_liquidity,
                   distributed_liquidity, total_profit_loss, total_profit_loss_pct,
                   created_at
            FROM liquidity_snapshots
            WHERE pool = ?
            ORDER BY snapshot_date DESC
            "#,
        )
        .bind(pool.as_str())
        .fetch_all(self.db())
        .await?;

        Ok(rows
            .iter()
            .map(|row| liquidity_snapshot_from_row(pool, row))
            .collect())
    }

    /// Insert a portfolio snapshot idempotently; same contract as
    /// [`Repository::insert_liquidity_snapshot`].
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_portfolio_snapshot(
        &self,
        snapshot: &PortfolioSnapshot,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO portfolio_snapshots (
                pool, snapshot_date, total_liquidity, available_liquidity,
                distributed_liquidity, total_profit_loss, total_profit_loss_pct,
                captured_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(pool, snapshot_date) DO NOTHING
            "#,
        )
        .bind(snapshot.pool.as_str())
        .bind(snapshot.snapshot_date.to_string())
        .bind(snapshot.total_liquidity.to_canonical_string())
        .bind(snapshot.available_liquidity.to_canonical_string())
        .bind(snapshot.distributed_liquidity.to_canonical_string())
        .bind(snapshot.total_profit_loss.to_canonical_string())
        .bind(snapshot.total_profit_loss_percentage.to_canonical_string())
        .bind(snapshot.captured_at.timestamp_millis())
        .execute(self.db())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Most recent portfolio snapshot dated at or before `date`.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn portfolio_snapshot_at_or_before(
        &self,
        pool: Pool,
        date: NaiveDate,
    ) -> Result<Option<PortfolioSnapshot>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT snapshot_date, total_liquidity, available_liquidity,
                   distributed_liquidity, total_profit_loss, total_profit_loss_pct,
                   captured_at
            FROM portfolio_snapshots
            WHERE pool = ? AND snapshot_date <= ?
            ORDER BY snapshot_date DESC
            LIMIT 1
            "#,
        )
        .bind(pool.as_str())
        .bind(date.to_string())
        .fetch_optional(self.db())
        .await?;

        Ok(row.map(|row| portfolio_snapshot_from_row(pool, &row)))
    }

    /// All portfolio snapshots for a pool, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_portfolio_snapshots(
        &self,
        pool: Pool,
    ) -> Result<Vec<PortfolioSnapshot>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT snapshot_date, total_liquidity, available_liquidity,
                   distributed_liquidity, total_profit_loss, total_profit_loss_pct,
                   captured_at
            FROM portfolio_snapshots
            WHERE pool = ?
            ORDER BY snapshot_date DESC
            "#,
        )
        .bind(pool.as_str())
        .fetch_all(self.db())
        .await?;

        Ok(rows
            .iter()
            .map(|row| portfolio_snapshot_from_row(pool, row))
            .collect())
    }
}
