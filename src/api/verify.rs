use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{parse_pool, AppState};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyQuery {
    pub pool: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftDto {
    pub field: String,
    pub stored: String,
    pub recomputed: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub pool: String,
    /// True when stored aggregates match a fresh recomputation from the
    /// stored distributions.
    pub matches: bool,
    pub drifts: Vec<DriftDto>,
}

/// Read-only drift detector for the known concurrent-write gap.
pub async fn get_verification(
    Query(params): Query<VerifyQuery>,
    State(state): State<AppState>,
) -> Result<Json<VerifyResponse>, AppError> {
    let pool = parse_pool(&params.pool)?;
    let report = state.ledgers.verify(pool).await?;

    Ok(Json(VerifyResponse {
        pool: report.pool.to_string(),
        matches: report.matches,
        drifts: report
            .drifts
            .iter()
            .map(|d| DriftDto {
                field: d.field.to_string(),
                stored: d.stored.to_canonical_string(),
                recomputed: d.recomputed.to_canonical_string(),
            })
            .collect(),
    }))
}
