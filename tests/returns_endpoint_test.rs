use axum::http::StatusCode;
use chrono::{Days, NaiveDate, Utc};
use serde_json::json;
use signalpool::api::{self, AppState};
use signalpool::datasource::MockPositionSource;
use signalpool::db::init_db;
use signalpool::domain::{Decimal, LiquiditySnapshot, Pool, PortfolioSnapshot};
use signalpool::{LedgerService, OrphanReconciler, Repository, SnapshotRecorder};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    repo: Arc<Repository>,
    _temp: TempDir,
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");

    let repo = Arc::new(Repository::new(pool));
    let ledgers = Arc::new(LedgerService::new(repo.clone()));
    let recorder = Arc::new(SnapshotRecorder::new(
        repo.clone(),
        chrono_tz::America::New_York,
    ));
    let source = Arc::new(MockPositionSource::new());
    let reconciler = Arc::new(OrphanReconciler::new(source, ledgers.clone()));
    let state = AppState::new(repo.clone(), ledgers, recorder, reconciler);
    let app = api::create_router(state);

    TestApp {
        app,
        repo,
        _temp: temp_dir,
    }
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

/// Business date as the service derives it.
fn today() -> NaiveDate {
    Utc::now()
        .with_timezone(&chrono_tz::America::New_York)
        .date_naive()
}

fn liquidity_snapshot(day: NaiveDate, total: &str) -> LiquiditySnapshot {
    LiquiditySnapshot {
        pool: Pool::Swing,
        snapshot_date: day,
        total_liquidity: dec(total),
        available_liquidity: dec(total),
        distributed_liquidity: Decimal::zero(),
        total_profit_loss: Decimal::zero(),
        total_profit_loss_percentage: Decimal::zero(),
        created_at: Utc::now(),
    }
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post(app: axum::Router, uri: &str, body: serde_json::Value) -> StatusCode {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();

    app.oneshot(req).await.unwrap().status()
}

fn return_for<'a>(body: &'a serde_json::Value, period: &str) -> &'a serde_json::Value {
    body["returns"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["period"] == period)
        .unwrap_or_else(|| panic!("no entry for period {}", period))
}

#[tokio::test]
async fn test_no_snapshots_yields_all_null() {
    let test_app = setup_test_app().await;
    post(
        test_app.app.clone(),
        "/v1/ledger/fund",
        json!({"pool": "swing", "totalLiquidity": 1000}),
    )
    .await;

    let (status, body) = get(test_app.app.clone(), "/v1/returns?pool=swing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current"], "1000");

    let returns = body["returns"].as_array().unwrap();
    assert_eq!(returns.len(), 6);
    for entry in returns {
        assert!(
            entry["returnPercentage"].is_null(),
            "expected null for {}",
            entry["period"]
        );
    }
}

#[tokio::test]
async fn test_backward_search_tolerates_gaps() {
    let test_app = setup_test_app().await;
    post(
        test_app.app.clone(),
        "/v1/ledger/fund",
        json!({"pool": "swing", "totalLiquidity": 1100}),
    )
    .await;

    // Only one snapshot, ten days old. The 1d and 7d windows look back to
    // targets newer than it and fall back to it across the gap; the longer
    // windows have targets older than it and find nothing.
    let day = today() - Days::new(10);
    test_app
        .repo
        .insert_liquidity_snapshot(&liquidity_snapshot(day, "1000"))
        .await
        .unwrap();

    let (status, body) = get(test_app.app.clone(), "/v1/returns?pool=swing").await;
    assert_eq!(status, StatusCode::OK);
    for period in ["1d", "7d"] {
        assert_eq!(
            return_for(&body, period)["returnPercentage"],
            "10",
            "period {}",
            period
        );
    }
    for period in ["15d", "30d", "6m", "1y"] {
        assert!(return_for(&body, period)["returnPercentage"].is_null());
    }
}

#[tokio::test]
async fn test_todays_snapshot_never_serves_yesterdays_window() {
    let test_app = setup_test_app().await;
    post(
        test_app.app.clone(),
        "/v1/ledger/fund",
        json!({"pool": "swing", "totalLiquidity": 1000}),
    )
    .await;

    // A snapshot dated today is in the future relative to every target
    // date, so nothing qualifies.
    test_app
        .repo
        .insert_liquidity_snapshot(&liquidity_snapshot(today(), "900"))
        .await
        .unwrap();

    let (_, body) = get(test_app.app.clone(), "/v1/returns?pool=swing").await;
    assert!(return_for(&body, "1d")["returnPercentage"].is_null());
}

#[tokio::test]
async fn test_zero_historical_value_yields_null() {
    let test_app = setup_test_app().await;
    post(
        test_app.app.clone(),
        "/v1/ledger/fund",
        json!({"pool": "swing", "totalLiquidity": 1000}),
    )
    .await;

    test_app
        .repo
        .insert_liquidity_snapshot(&liquidity_snapshot(today() - Days::new(3), "0"))
        .await
        .unwrap();

    let (_, body) = get(test_app.app.clone(), "/v1/returns?pool=swing").await;
    assert!(return_for(&body, "1d")["returnPercentage"].is_null());
}

#[tokio::test]
async fn test_negative_return() {
    let test_app = setup_test_app().await;
    post(
        test_app.app.clone(),
        "/v1/ledger/fund",
        json!({"pool": "swing", "totalLiquidity": 900}),
    )
    .await;

    test_app
        .repo
        .insert_liquidity_snapshot(&liquidity_snapshot(today() - Days::new(2), "1000"))
        .await
        .unwrap();

    let (_, body) = get(test_app.app.clone(), "/v1/returns?pool=swing").await;
    assert_eq!(return_for(&body, "1d")["returnPercentage"], "-10");
}

#[tokio::test]
async fn test_portfolio_basis_uses_portfolio_series() {
    let test_app = setup_test_app().await;
    post(
        test_app.app.clone(),
        "/v1/ledger/fund",
        json!({"pool": "swing", "totalLiquidity": 1050}),
    )
    .await;

    test_app
        .repo
        .insert_portfolio_snapshot(&PortfolioSnapshot {
            pool: Pool::Swing,
            snapshot_date: today() - Days::new(5),
            total_liquidity: dec("1000"),
            available_liquidity: dec("1000"),
            distributed_liquidity: Decimal::zero(),
            total_profit_loss: Decimal::zero(),
            total_profit_loss_percentage: Decimal::zero(),
            captured_at: Utc::now(),
        })
        .await
        .unwrap();

    // Liquidity basis sees nothing; portfolio basis sees the 5-day-old row
    // through the 1d window's backward search.
    let (_, body) = get(test_app.app.clone(), "/v1/returns?pool=swing").await;
    assert!(return_for(&body, "1d")["returnPercentage"].is_null());

    let (_, body) = get(
        test_app.app.clone(),
        "/v1/returns?pool=swing&basis=portfolio",
    )
    .await;
    assert_eq!(body["basis"], "portfolio");
    assert_eq!(return_for(&body, "1d")["returnPercentage"], "5");
}

#[tokio::test]
async fn test_unknown_basis_is_rejected() {
    let test_app = setup_test_app().await;
    let (status, _) = get(
        test_app.app.clone(),
        "/v1/returns?pool=swing&basis=weekly",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
