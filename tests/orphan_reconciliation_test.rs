//! Scenario: a distribution whose backing position was deleted or closed in
//! the signal service. Dry-run lists it without mutation; apply liquidates
//! and removes it, returning the freed capital to available liquidity.

use axum::http::StatusCode;
use serde_json::json;
use signalpool::api::{self, AppState};
use signalpool::datasource::MockPositionSource;
use signalpool::db::init_db;
use signalpool::domain::{Decimal, PositionId};
use signalpool::{LedgerService, OrphanReconciler, Repository, SnapshotRecorder};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    source: Arc<MockPositionSource>,
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
    let reconciler = Arc::new(OrphanReconciler::new(source.clone(), ledgers.clone()));
    let state = AppState::new(repo, ledgers, recorder, reconciler);
    let app = api::create_router(state);

    TestApp {
        app,
        source,
        _temp: temp_dir,
    }
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn pos(id: &str) -> PositionId {
    PositionId::new(id.to_string())
}

async fn request(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };

    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Fund the swing pool and allocate 10% at entry price 10 for `id`.
async fn seed_allocation(app: &axum::Router, id: &str) {
    request(
        app.clone(),
        "POST",
        "/v1/ledger/fund",
        Some(json!({"pool": "swing", "totalLiquidity": 1000})),
    )
    .await;
    let (status, _) = request(
        app.clone(),
        "POST",
        "/v1/distributions",
        Some(json!({
            "pool": "swing",
            "positionId": id,
            "symbol": "AAPL",
            "percentage": 10,
            "entryPrice": 10
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_dry_run_lists_orphan_without_mutation() {
    let test_app = setup_test_app().await;
    seed_allocation(&test_app.app, "deleted-pos").await;
    // The mock never learns about "deleted-pos": the weak reference dangles.

    let (status, body) = request(test_app.app.clone(), "GET", "/v1/orphans?pool=swing", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], false);
    assert_eq!(body["examined"], 1);
    assert_eq!(body["orphans"][0]["positionId"], "deleted-pos");
    assert_eq!(body["orphans"][0]["reason"], "missing");
    assert_eq!(body["reconciled"], 0);
    assert_eq!(body["freed"], "0");

    let (_, ledger) = request(test_app.app.clone(), "GET", "/v1/ledger?pool=swing", None).await;
    assert_eq!(ledger["availableLiquidity"], "900");
    assert_eq!(ledger["distributions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_apply_liquidates_and_returns_capital() {
    let test_app = setup_test_app().await;
    seed_allocation(&test_app.app, "closed-pos").await;
    test_app
        .source
        .set_closed(pos("closed-pos"), Some(dec("12")));

    let (status, body) = request(
        test_app.app.clone(),
        "POST",
        "/v1/orphans",
        Some(json!({"pool": "swing"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], true);
    assert_eq!(body["reconciled"], 1);
    assert_eq!(body["orphans"][0]["reason"], "closed");
    assert_eq!(body["orphans"][0]["liquidationPrice"], "12");
    assert_eq!(body["freed"], "120");
    assert!(body["failed"].as_array().unwrap().is_empty());
    assert!(!body["runId"].as_str().unwrap().is_empty());

    let (_, ledger) = request(test_app.app.clone(), "GET", "/v1/ledger?pool=swing", None).await;
    assert_eq!(ledger["availableLiquidity"], "1020");
    assert_eq!(ledger["totalProfitLoss"], "20");
    assert!(ledger["distributions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_apply_leaves_open_positions_alone() {
    let test_app = setup_test_app().await;
    seed_allocation(&test_app.app, "alive-pos").await;
    test_app.source.set_open(pos("alive-pos"), dec("11"));

    let (status, body) = request(
        test_app.app.clone(),
        "POST",
        "/v1/orphans",
        Some(json!({"pool": "swing"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["examined"], 1);
    assert!(body["orphans"].as_array().unwrap().is_empty());
    assert_eq!(body["reconciled"], 0);

    let (_, ledger) = request(test_app.app.clone(), "GET", "/v1/ledger?pool=swing", None).await;
    assert_eq!(ledger["distributions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_position_liquidates_at_own_mark() {
    let test_app = setup_test_app().await;
    seed_allocation(&test_app.app, "vanished").await;
    request(
        test_app.app.clone(),
        "POST",
        "/v1/distributions/revalue",
        Some(json!({"pool": "swing", "prices": [{"positionId": "vanished", "price": 8}]})),
    )
    .await;

    let (status, body) = request(
        test_app.app.clone(),
        "POST",
        "/v1/orphans",
        Some(json!({"pool": "swing"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orphans"][0]["liquidationPrice"], "8");
    // 10 shares at 8: cost basis 100, realized -20.
    assert_eq!(body["freed"], "80");

    let (_, ledger) = request(test_app.app.clone(), "GET", "/v1/ledger?pool=swing", None).await;
    assert_eq!(ledger["availableLiquidity"], "980");
    assert_eq!(ledger["totalProfitLoss"], "-20");
}
