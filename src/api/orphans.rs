use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{parse_pool, AppState};
use crate::error::AppError;
use crate::orchestration::ReconcileReport;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphansQuery {
    pub pool: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub pool: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanDto {
    pub position_id: String,
    pub symbol: String,
    pub remaining_shares: String,
    pub liquidation_price: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureDto {
    pub position_id: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub run_id: String,
    pub pool: String,
    pub applied: bool,
    pub examined: usize,
    pub orphans: Vec<OrphanDto>,
    pub reconciled: usize,
    pub failed: Vec<FailureDto>,
    pub freed: String,
}

impl From<ReconcileReport> for ReconcileResponse {
    fn from(report: ReconcileReport) -> Self {
        ReconcileResponse {
            run_id: report.run_id.to_string(),
            pool: report.pool.to_string(),
            applied: report.applied,
            examined: report.examined,
            orphans: report
                .orphans
                .iter()
                .map(|o| OrphanDto {
                    position_id: o.position_id.to_string(),
                    symbol: o.symbol.to_string(),
                    remaining_shares: o.remaining_shares.to_canonical_string(),
                    liquidation_price: o.liquidation_price.to_canonical_string(),
                    reason: o.reason.as_str().to_string(),
                })
                .collect(),
            reconciled: report.reconciled,
            failed: report
                .failed
                .iter()
                .map(|f| FailureDto {
                    position_id: f.position_id.to_string(),
                    reason: f.reason.clone(),
                })
                .collect(),
            freed: report.freed.to_canonical_string(),
        }
    }
}

/// GET: report orphaned distributions without mutating anything.
pub async fn dry_run(
    Query(params): Query<OrphansQuery>,
    State(state): State<AppState>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let pool = parse_pool(&params.pool)?;
    let report = state.reconciler.dry_run(pool).await?;
    Ok(Json(report.into()))
}

/// POST: liquidate and remove orphans, reporting per-item results.
pub async fn apply(
    State(state): State<AppState>,
    Json(req): Json<ApplyRequest>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let pool = parse_pool(&req.pool)?;
    let report = state.reconciler.apply(pool).await?;
    Ok(Json(report.into()))
}
