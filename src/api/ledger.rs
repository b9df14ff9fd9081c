use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{parse_pool, AppState};
use crate::domain::{Decimal, Distribution};
use crate::engine::LiquidityLedger;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerQuery {
    pub pool: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionDto {
    pub position_id: String,
    pub symbol: String,
    pub allocated_amount: String,
    pub entry_price: String,
    pub current_price: String,
    pub shares: String,
    pub sold_shares: String,
    pub realized_profit_loss: String,
    pub profit_loss: String,
    pub profit_loss_percentage: String,
    pub is_active: bool,
}

impl From<&Distribution> for DistributionDto {
    fn from(dist: &Distribution) -> Self {
        DistributionDto {
            position_id: dist.position_id.to_string(),
            symbol: dist.symbol.to_string(),
            allocated_amount: dist.allocated_amount.to_canonical_string(),
            entry_price: dist.entry_price.to_canonical_string(),
            current_price: dist.current_price.to_canonical_string(),
            shares: dist.shares.to_canonical_string(),
            sold_shares: dist.sold_shares.to_canonical_string(),
            realized_profit_loss: dist.realized_profit_loss.to_canonical_string(),
            profit_loss: dist.profit_loss.to_canonical_string(),
            profit_loss_percentage: dist.profit_loss_percentage.to_canonical_string(),
            is_active: dist.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerResponse {
    pub pool: String,
    pub initial_liquidity: String,
    pub total_liquidity: String,
    pub available_liquidity: String,
    pub distributed_liquidity: String,
    pub realized_profit_loss: String,
    pub total_profit_loss: String,
    pub total_profit_loss_percentage: String,
    pub version: i64,
    pub distributions: Vec<DistributionDto>,
}

impl From<&LiquidityLedger> for LedgerResponse {
    fn from(ledger: &LiquidityLedger) -> Self {
        LedgerResponse {
            pool: ledger.pool.to_string(),
            initial_liquidity: ledger.initial_liquidity.to_canonical_string(),
            total_liquidity: ledger.total_liquidity.to_canonical_string(),
            available_liquidity: ledger.available_liquidity.to_canonical_string(),
            distributed_liquidity: ledger.distributed_liquidity.to_canonical_string(),
            realized_profit_loss: ledger.realized_profit_loss.to_canonical_string(),
            total_profit_loss: ledger.total_profit_loss.to_canonical_string(),
            total_profit_loss_percentage: ledger
                .total_profit_loss_percentage
                .to_canonical_string(),
            version: ledger.version,
            distributions: ledger.distributions.iter().map(DistributionDto::from).collect(),
        }
    }
}

/// Full ledger for a pool; a pool never funded reads as zeroed totals.
pub async fn get_ledger(
    Query(params): Query<LedgerQuery>,
    State(state): State<AppState>,
) -> Result<Json<LedgerResponse>, AppError> {
    let pool = parse_pool(&params.pool)?;
    let ledger = state.ledgers.get(pool).await?;
    Ok(Json(LedgerResponse::from(&ledger)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundRequest {
    pub pool: String,
    /// New capital base; a full re-base, not an increment.
    pub total_liquidity: Decimal,
}

pub async fn fund_ledger(
    State(state): State<AppState>,
    Json(req): Json<FundRequest>,
) -> Result<Json<LedgerResponse>, AppError> {
    let pool = parse_pool(&req.pool)?;
    let ledger = state.ledgers.fund(pool, req.total_liquidity).await?;
    Ok(Json(LedgerResponse::from(&ledger)))
}
