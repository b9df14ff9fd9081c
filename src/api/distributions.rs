use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::ledger::{DistributionDto, LedgerResponse};
use crate::api::{parse_pool, AppState};
use crate::domain::{Decimal, PositionId, Symbol};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocateRequest {
    pub pool: String,
    pub position_id: String,
    pub symbol: String,
    /// Percentage of current available liquidity to commit.
    pub percentage: Decimal,
    pub entry_price: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocateResponse {
    pub distribution: DistributionDto,
    pub ledger: LedgerResponse,
}

pub async fn allocate(
    State(state): State<AppState>,
    Json(req): Json<AllocateRequest>,
) -> Result<Json<AllocateResponse>, AppError> {
    let pool = parse_pool(&req.pool)?;
    if req.position_id.trim().is_empty() {
        return Err(AppError::BadRequest("positionId must not be empty".into()));
    }
    let position_id = PositionId::new(req.position_id);

    let ledger = state
        .ledgers
        .allocate(
            pool,
            position_id.clone(),
            Symbol::new(req.symbol),
            req.percentage,
            req.entry_price,
        )
        .await?;

    let distribution = ledger
        .distribution(&position_id)
        .map(DistributionDto::from)
        .ok_or_else(|| AppError::Internal("allocated distribution missing".into()))?;

    Ok(Json(AllocateResponse {
        distribution,
        ledger: LedgerResponse::from(&ledger),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate {
    pub position_id: String,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevalueRequest {
    pub pool: String,
    pub prices: Vec<PriceUpdate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevalueResponse {
    pub applied: usize,
    /// Position ids with no active distribution; reported, not fatal.
    pub unknown_positions: Vec<String>,
    pub ledger: LedgerResponse,
}

/// Bulk re-mark of a pool's active distributions from a price feed.
pub async fn revalue(
    State(state): State<AppState>,
    Json(req): Json<RevalueRequest>,
) -> Result<Json<RevalueResponse>, AppError> {
    let pool = parse_pool(&req.pool)?;
    let count = req.prices.len();
    let prices: Vec<(PositionId, Decimal)> = req
        .prices
        .into_iter()
        .map(|p| (PositionId::new(p.position_id), p.price))
        .collect();

    let (ledger, unknown) = state.ledgers.revalue_bulk(pool, prices).await?;

    Ok(Json(RevalueResponse {
        applied: count - unknown.len(),
        unknown_positions: unknown.into_iter().map(|id| id.to_string()).collect(),
        ledger: LedgerResponse::from(&ledger),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellRequest {
    pub pool: String,
    pub position_id: String,
    pub shares: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellResponse {
    pub position_id: String,
    pub shares_sold: String,
    pub sell_price: String,
    pub realized: String,
    pub freed: String,
    pub remaining_shares: String,
    pub is_active: bool,
    pub ledger: LedgerResponse,
}

pub async fn sell(
    State(state): State<AppState>,
    Json(req): Json<SellRequest>,
) -> Result<Json<SellResponse>, AppError> {
    let pool = parse_pool(&req.pool)?;
    let position_id = PositionId::new(req.position_id);

    let (ledger, outcome) = state
        .ledgers
        .sell(pool, &position_id, req.shares, req.price)
        .await?;

    Ok(Json(SellResponse {
        position_id: outcome.position_id.to_string(),
        shares_sold: outcome.shares_sold.to_canonical_string(),
        sell_price: outcome.sell_price.to_canonical_string(),
        realized: outcome.realized.to_canonical_string(),
        freed: outcome.freed.to_canonical_string(),
        remaining_shares: outcome.remaining_shares.to_canonical_string(),
        is_active: outcome.is_active,
        ledger: LedgerResponse::from(&ledger),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRequest {
    pub pool: String,
    pub position_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveResponse {
    pub position_id: String,
    pub symbol: String,
    pub freed: String,
    pub realized_locked_in: String,
    pub ledger: LedgerResponse,
}

pub async fn remove(
    State(state): State<AppState>,
    Json(req): Json<RemoveRequest>,
) -> Result<Json<RemoveResponse>, AppError> {
    let pool = parse_pool(&req.pool)?;
    let position_id = PositionId::new(req.position_id);

    let (ledger, outcome) = state.ledgers.remove(pool, &position_id).await?;

    Ok(Json(RemoveResponse {
        position_id: outcome.position_id.to_string(),
        symbol: outcome.symbol.to_string(),
        freed: outcome.freed.to_canonical_string(),
        realized_locked_in: outcome.realized_locked_in.to_canonical_string(),
        ledger: LedgerResponse::from(&ledger),
    }))
}
