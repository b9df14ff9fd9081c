use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{parse_pool, AppState};
use crate::domain::{LiquiditySnapshot, Pool, PortfolioSnapshot, SnapshotKind};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRequest {
    pub pool: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    /// False when today's snapshot already existed (idempotent no-op).
    pub created: bool,
    pub date: String,
}

pub async fn record_liquidity(
    State(state): State<AppState>,
    Json(req): Json<RecordRequest>,
) -> Result<Json<RecordResponse>, AppError> {
    let pool = parse_pool(&req.pool)?;
    let outcome = state.recorder.record_liquidity(pool).await?;
    Ok(Json(RecordResponse {
        created: outcome.created,
        date: outcome.date.to_string(),
    }))
}

pub async fn record_portfolio(
    State(state): State<AppState>,
    Json(req): Json<RecordRequest>,
) -> Result<Json<RecordResponse>, AppError> {
    let pool = parse_pool(&req.pool)?;
    let outcome = state.recorder.record_portfolio(pool).await?;
    Ok(Json(RecordResponse {
        created: outcome.created,
        date: outcome.date.to_string(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotsQuery {
    pub pool: String,
    /// "liquidity" (default) or "portfolio".
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDto {
    pub pool: String,
    pub snapshot_date: String,
    pub total_liquidity: String,
    pub available_liquidity: String,
    pub distributed_liquidity: String,
    pub total_profit_loss: String,
    pub total_profit_loss_percentage: String,
    pub recorded_at: String,
}

impl From<&LiquiditySnapshot> for SnapshotDto {
    fn from(s: &LiquiditySnapshot) -> Self {
        SnapshotDto {
            pool: s.pool.to_string(),
            snapshot_date: s.snapshot_date.to_string(),
            total_liquidity: s.total_liquidity.to_canonical_string(),
            available_liquidity: s.available_liquidity.to_canonical_string(),
            distributed_liquidity: s.distributed_liquidity.to_canonical_string(),
            total_profit_loss: s.total_profit_loss.to_canonical_string(),
            total_profit_loss_percentage: s.total_profit_loss_percentage.to_canonical_string(),
            recorded_at: s.created_at.to_rfc3339(),
        }
    }
}

impl From<&PortfolioSnapshot> for SnapshotDto {
    fn from(s: &PortfolioSnapshot) -> Self {
        SnapshotDto {
            pool: s.pool.to_string(),
            snapshot_date: s.snapshot_date.to_string(),
            total_liquidity: s.total_liquidity.to_canonical_string(),
            available_liquidity: s.available_liquidity.to_canonical_string(),
            distributed_liquidity: s.distributed_liquidity.to_canonical_string(),
            total_profit_loss: s.total_profit_loss.to_canonical_string(),
            total_profit_loss_percentage: s.total_profit_loss_percentage.to_canonical_string(),
            recorded_at: s.captured_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotsResponse {
    pub pool: String,
    pub kind: String,
    pub snapshots: Vec<SnapshotDto>,
}

fn parse_kind(kind: Option<&str>) -> Result<SnapshotKind, AppError> {
    match kind {
        None => Ok(SnapshotKind::Liquidity),
        Some(s) => s.parse().map_err(AppError::BadRequest),
    }
}

async fn fetch_snapshots(
    state: &AppState,
    pool: Pool,
    kind: SnapshotKind,
) -> Result<Vec<SnapshotDto>, AppError> {
    let dtos = match kind {
        SnapshotKind::Liquidity => state
            .repo
            .list_liquidity_snapshots(pool)
            .await?
            .iter()
            .map(SnapshotDto::from)
            .collect(),
        SnapshotKind::Portfolio => state
            .repo
            .list_portfolio_snapshots(pool)
            .await?
            .iter()
            .map(SnapshotDto::from)
            .collect(),
    };
    Ok(dtos)
}

/// Snapshot history for a pool, newest first.
pub async fn list(
    Query(params): Query<SnapshotsQuery>,
    State(state): State<AppState>,
) -> Result<Json<SnapshotsResponse>, AppError> {
    let pool = parse_pool(&params.pool)?;
    let kind = parse_kind(params.kind.as_deref())?;
    let snapshots = fetch_snapshots(&state, pool, kind).await?;

    Ok(Json(SnapshotsResponse {
        pool: pool.to_string(),
        kind: kind.to_string(),
        snapshots,
    }))
}

/// Snapshot history as a CSV download.
pub async fn export_csv(
    Query(params): Query<SnapshotsQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let pool = parse_pool(&params.pool)?;
    let kind = parse_kind(params.kind.as_deref())?;
    let snapshots = fetch_snapshots(&state, pool, kind).await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "pool",
            "snapshotDate",
            "totalLiquidity",
            "availableLiquidity",
            "distributedLiquidity",
            "totalProfitLoss",
            "totalProfitLossPercentage",
            "recordedAt",
        ])
        .map_err(|e| AppError::Internal(e.to_string()))?;

    for s in &snapshots {
        writer
            .write_record([
                s.pool.as_str(),
                s.snapshot_date.as_str(),
                s.total_liquidity.as_str(),
                s.available_liquidity.as_str(),
                s.distributed_liquidity.as_str(),
                s.total_profit_loss.as_str(),
                s.total_profit_loss_percentage.as_str(),
                s.recorded_at.as_str(),
            ])
            .map_err(|e| AppError::Internal(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let filename = format!("{}-{}-snapshots.csv", pool, kind);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}
