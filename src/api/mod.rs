pub mod distributions;
pub mod health;
pub mod ledger;
pub mod orphans;
pub mod returns;
pub mod snapshots;
pub mod verify;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::db::Repository;
use crate::domain::Pool;
use crate::error::AppError;
use crate::orchestration::{LedgerService, OrphanReconciler, SnapshotRecorder};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub ledgers: Arc<LedgerService>,
    pub recorder: Arc<SnapshotRecorder>,
    pub reconciler: Arc<OrphanReconciler>,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        ledgers: Arc<LedgerService>,
        recorder: Arc<SnapshotRecorder>,
        reconciler: Arc<OrphanReconciler>,
    ) -> Self {
        Self {
            repo,
            ledgers,
            recorder,
            reconciler,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/ledger", get(ledger::get_ledger))
        .route("/v1/ledger/fund", post(ledger::fund_ledger))
        .route("/v1/distributions", post(distributions::allocate))
        .route("/v1/distributions/revalue", post(distributions::revalue))
        .route("/v1/distributions/sell", post(distributions::sell))
        .route("/v1/distributions/remove", post(distributions::remove))
        .route("/v1/orphans", get(orphans::dry_run).post(orphans::apply))
        .route("/v1/verify", get(verify::get_verification))
        .route("/v1/value", get(returns::get_current_value))
        .route("/v1/returns", get(returns::get_returns))
        .route("/v1/snapshots", get(snapshots::list))
        .route("/v1/snapshots/export", get(snapshots::export_csv))
        .route("/v1/snapshots/liquidity", post(snapshots::record_liquidity))
        .route("/v1/snapshots/portfolio", post(snapshots::record_portfolio))
        .layer(cors)
        .with_state(state)
}

pub(crate) fn parse_pool(input: &str) -> Result<Pool, AppError> {
    input
        .parse::<Pool>()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}
