use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::api::{parse_pool, AppState};
use crate::domain::SnapshotKind;
use crate::engine::{period_return, Period};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnsQuery {
    pub pool: String,
    /// Snapshot family to compare against: "liquidity" (default) or
    /// "portfolio".
    pub basis: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodReturnDto {
    pub period: String,
    /// Percentage, or null when no snapshot qualifies for the period.
    pub return_percentage: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnsResponse {
    pub pool: String,
    pub basis: String,
    pub current: String,
    pub as_of: String,
    pub returns: Vec<PeriodReturnDto>,
}

/// Period returns against historical snapshots: for each window, the most
/// recent snapshot at or before the target date is the comparison base.
pub async fn get_returns(
    Query(params): Query<ReturnsQuery>,
    State(state): State<AppState>,
) -> Result<Json<ReturnsResponse>, AppError> {
    let pool = parse_pool(&params.pool)?;
    let basis = match params.basis.as_deref() {
        None => SnapshotKind::Liquidity,
        Some(s) => s.parse().map_err(AppError::BadRequest)?,
    };

    let ledger = state.ledgers.get(pool).await?;
    let current = ledger.total_liquidity;
    let today = state.recorder.business_date();

    let lookups = Period::ALL.into_iter().map(|period| {
        let repo = state.repo.clone();
        async move {
            let target = period.target_date(today);
            let historical = match basis {
                SnapshotKind::Liquidity => repo
                    .liquidity_snapshot_at_or_before(pool, target)
                    .await?
                    .map(|s| s.total_liquidity),
                SnapshotKind::Portfolio => repo
                    .portfolio_snapshot_at_or_before(pool, target)
                    .await?
                    .map(|s| s.total_liquidity),
            };
            Ok::<_, sqlx::Error>((period.label(), period_return(current, historical)))
        }
    });

    let mut returns = Vec::with_capacity(Period::ALL.len());
    for result in join_all(lookups).await {
        let (label, value) = result?;
        returns.push(PeriodReturnDto {
            period: label.to_string(),
            return_percentage: value.map(|d| d.to_canonical_string()),
        });
    }

    Ok(Json(ReturnsResponse {
        pool: pool.to_string(),
        basis: basis.to_string(),
        current: current.to_canonical_string(),
        as_of: today.to_string(),
        returns,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueQuery {
    pub pool: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueResponse {
    pub pool: String,
    pub total_liquidity: String,
    pub available_liquidity: String,
    pub distributed_liquidity: String,
    pub total_profit_loss: String,
    pub total_profit_loss_percentage: String,
    pub as_of: String,
}

/// Current-value projection for dashboards.
pub async fn get_current_value(
    Query(params): Query<ValueQuery>,
    State(state): State<AppState>,
) -> Result<Json<ValueResponse>, AppError> {
    let pool = parse_pool(&params.pool)?;
    let ledger = state.ledgers.get(pool).await?;

    Ok(Json(ValueResponse {
        pool: pool.to_string(),
        total_liquidity: ledger.total_liquidity.to_canonical_string(),
        available_liquidity: ledger.available_liquidity.to_canonical_string(),
        distributed_liquidity: ledger.distributed_liquidity.to_canonical_string(),
        total_profit_loss: ledger.total_profit_loss.to_canonical_string(),
        total_profit_loss_percentage: ledger.total_profit_loss_percentage.to_canonical_string(),
        as_of: Utc::now().to_rfc3339(),
    }))
}
