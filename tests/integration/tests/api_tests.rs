//! API Integration Tests
//!
//! Drive the HTTP surface end to end: the real Axum app, the real storage
//! and GitHub HTTP clients against mock servers, and an in-memory database.
//!
//! Run with: cargo test -p integration-tests --test api_tests

use integration_tests::{
    assert_json, assert_status, MemoryDatabase, MemoryTable, TestOptions, TestServer,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

const CAMPAIGNS: &str = "database.create_table.campaigns";
const AVATARS: &str = "database.update_bucket.avatars";
const SMTP_HOST: &str = "environment.set_env_var.SMTP_HOST";

fn change_ids(plan: &Value) -> Vec<String> {
    plan["changes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect()
}

fn change<'a>(plan: &'a Value, id: &str) -> &'a Value {
    plan["changes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == id)
        .unwrap_or_else(|| panic!("{id} not in plan: {plan}"))
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.unwrap();
    let response = server.get("/health").await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_health_ready() {
    let server = TestServer::start().await.unwrap();
    let response = server.get("/health/ready").await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["documents"], "valid");
    assert_eq!(body["checks"]["database"], "not_configured");
}

#[tokio::test]
async fn test_health_not_ready_with_broken_documents() {
    let server = TestServer::start().await.unwrap();
    std::fs::write(server.config_dir().join("desired-state.yaml"), "database: [").unwrap();

    let response = server.get("/health/ready").await.unwrap();
    let body: Value = assert_json(response, StatusCode::SERVICE_UNAVAILABLE)
        .await
        .unwrap();
    assert_eq!(body["checks"]["documents"], "invalid");
}

// ============================================================================
// Auth Tests
// ============================================================================

#[tokio::test]
async fn test_plan_without_token() {
    let server = TestServer::start().await.unwrap();
    let response = server
        .post_with_token("/api/v1/ops/plan", None, &json!({}))
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(body["error"]["code"], "MISSING_AUTHORIZATION");
}

#[tokio::test]
async fn test_apply_with_wrong_token() {
    let server = TestServer::start().await.unwrap();
    let response = server
        .post_with_token(
            "/api/v1/ops/apply",
            Some("not-the-token"),
            &json!({"change_ids": [AVATARS]}),
        )
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

// ============================================================================
// Plan Tests
// ============================================================================

#[tokio::test]
async fn test_plan_all_scopes() {
    let server = TestServer::start().await.unwrap();
    let response = server.post_auth("/api/v1/ops/plan", &json!({})).await.unwrap();
    let plan: Value = assert_json(response, StatusCode::OK).await.unwrap();

    let ids = change_ids(&plan);
    assert!(ids.contains(&CAMPAIGNS.to_string()));
    assert!(ids.contains(&AVATARS.to_string()));
    assert!(ids.contains(&SMTP_HOST.to_string()));
    assert_eq!(plan["summary"]["total"], ids.len());
    assert_eq!(plan["requires_approval"], true);
    assert!(plan.get("plan_id").is_none());
}

#[tokio::test]
async fn test_plan_rejects_unknown_scope() {
    let server = TestServer::start().await.unwrap();
    let response = server
        .post_auth("/api/v1/ops/plan", &json!({"scopes": ["network"]}))
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_REQUEST_BODY");
}

#[tokio::test]
async fn test_missing_table_requires_approval() {
    let server = TestServer::start().await.unwrap();
    let response = server
        .post_auth("/api/v1/ops/plan", &json!({"scopes": ["database"]}))
        .await
        .unwrap();
    let plan: Value = assert_json(response, StatusCode::OK).await.unwrap();

    assert_eq!(change_ids(&plan), vec![CAMPAIGNS.to_string()]);
    let campaigns = change(&plan, CAMPAIGNS);
    assert_eq!(campaigns["type"], "create_table");
    assert_eq!(campaigns["severity"], "high");
    assert_eq!(campaigns["requires_approval"], true);
    assert_eq!(campaigns["can_auto_apply"], false);
}

#[tokio::test]
async fn test_existing_table_without_column() {
    let database = MemoryDatabase::default().with_table(
        "campaigns",
        MemoryTable {
            columns: vec!["id".to_string()],
            rls_enabled: true,
            policies: Vec::new(),
        },
    );
    let server = TestServer::start_with(TestOptions {
        database,
        ..Default::default()
    })
    .await
    .unwrap();

    let response = server
        .post_auth("/api/v1/ops/plan", &json!({"scopes": ["database"]}))
        .await
        .unwrap();
    let plan: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(
        change_ids(&plan),
        vec!["database.add_column.campaigns.title".to_string()]
    );
}

#[tokio::test]
async fn test_missing_payment_secret_short_circuits() {
    let server = TestServer::start().await.unwrap();
    let response = server
        .post_auth("/api/v1/ops/plan", &json!({"scopes": ["payment"]}))
        .await
        .unwrap();
    let plan: Value = assert_json(response, StatusCode::OK).await.unwrap();

    let types: Vec<&str> = plan["changes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["verify_stripe"]);
}

#[tokio::test]
async fn test_payment_price_checked_when_secret_present() {
    let server = TestServer::start_with(
        TestOptions::default().with_env("STRIPE_SECRET_KEY", "sk_test_123"),
    )
    .await
    .unwrap();
    let response = server
        .post_auth("/api/v1/ops/plan", &json!({"scopes": ["payment"]}))
        .await
        .unwrap();
    let plan: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(
        change_ids(&plan),
        vec!["payment.verify_price.STRIPE_PRICE_PRO".to_string()]
    );
}

#[tokio::test]
async fn test_storage_outage_is_isolated() {
    let server = TestServer::start().await.unwrap();
    server.storage_api.reset().await;
    Mock::given(method("GET"))
        .and(path("/storage/v1/bucket"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server.storage_api)
        .await;

    let response = server
        .post_auth("/api/v1/ops/plan", &json!({"scopes": ["database", "storage"]}))
        .await
        .unwrap();
    let plan: Value = assert_json(response, StatusCode::OK).await.unwrap();

    let ids = change_ids(&plan);
    assert!(ids.contains(&CAMPAIGNS.to_string()));
    assert!(ids.contains(&"database.audit_failure.storage".to_string()));
    assert!(plan["warnings"][0]
        .as_str()
        .unwrap()
        .starts_with("storage audit failed"));
}

// ============================================================================
// Apply Tests
// ============================================================================

#[tokio::test]
async fn test_direct_apply_of_unapproved_change_is_forbidden() {
    let server = TestServer::start().await.unwrap();
    let response = server
        .post_auth(
            "/api/v1/ops/apply",
            &json!({"change_ids": [CAMPAIGNS], "direct_apply": true}),
        )
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(body["error"]["code"], "POLICY_VIOLATION");
    assert_eq!(body["error"]["details"]["change_ids"], json!([CAMPAIGNS]));
    assert!(server.database.migration_names().is_empty());
}

#[tokio::test]
async fn test_bucket_visibility_applied_directly() {
    let server = TestServer::start().await.unwrap();
    Mock::given(method("PUT"))
        .and(path("/storage/v1/bucket/avatars"))
        .and(body_partial_json(json!({"public": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server.storage_api)
        .await;

    let response = server
        .post_auth("/api/v1/ops/apply", &json!({"change_ids": [AVATARS]}))
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();

    assert_eq!(body["summary"]["applied"], 1);
    let entry = &body["outcome"]["applied"][0];
    assert_eq!(entry["scope"], "storage");
    assert_eq!(entry["method"], "direct_apply");
    assert_eq!(entry["change_ids"], json!([AVATARS]));
}

#[tokio::test]
async fn test_missing_env_var_is_always_manual() {
    let server = TestServer::start_with(TestOptions {
        allow_direct_apply: true,
        ..Default::default()
    })
    .await
    .unwrap();
    let response = server
        .post_auth(
            "/api/v1/ops/apply",
            &json!({
                "change_ids": [SMTP_HOST],
                "direct_apply": true,
                "approved_change_ids": [SMTP_HOST]
            }),
        )
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();

    assert!(body["outcome"]["applied"].as_array().unwrap().is_empty());
    let skipped = &body["outcome"]["skipped"][0];
    assert_eq!(skipped["manual_action_required"], true);
    assert_eq!(skipped["resource"], "SMTP_HOST");
    assert_eq!(body["next_steps"][0]["kind"], "set_environment_variables");
    assert_eq!(body["next_steps"][0]["names"], json!(["SMTP_HOST"]));
}

#[tokio::test]
async fn test_migration_kept_locally_without_github() {
    let server = TestServer::start().await.unwrap();
    let response = server
        .post_auth("/api/v1/ops/apply", &json!({"change_ids": [CAMPAIGNS]}))
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();

    let entry = &body["outcome"]["applied"][0];
    assert_eq!(entry["method"], "local_migration_file");
    assert!(entry["note"].as_str().unwrap().contains("no GitHub token"));

    let file = entry["migration_file"].as_str().unwrap();
    let sql = std::fs::read_to_string(file).unwrap();
    assert!(sql.contains("CREATE TABLE IF NOT EXISTS \"campaigns\""));
    assert!(sql.contains("BEGIN;"));
    assert!(sql.trim_end().ends_with("COMMIT;"));
    assert_eq!(body["next_steps"][0]["kind"], "run_migration");
}

#[tokio::test]
async fn test_migration_pull_request_opened() {
    let server = TestServer::start_with(TestOptions {
        github: true,
        ..Default::default()
    })
    .await
    .unwrap();
    let github = server.github_api.as_ref().unwrap();

    Mock::given(method("GET"))
        .and(path("/repos/acme/platform/git/ref/heads/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"object": {"sha": "abc123"}})))
        .mount(github)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/platform/git/refs"))
        .and(body_partial_json(json!({"sha": "abc123"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .mount(github)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/repos/acme/platform/contents/.+_ops_reconcile\.sql$"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .mount(github)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/platform/pulls"))
        .and(body_partial_json(json!({"base": "main"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "number": 12,
            "html_url": "https://github.com/acme/platform/pull/12"
        })))
        .expect(1)
        .mount(github)
        .await;

    let response = server
        .post_auth("/api/v1/ops/apply", &json!({"change_ids": [CAMPAIGNS]}))
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();

    let entry = &body["outcome"]["applied"][0];
    assert_eq!(entry["method"], "github_pr");
    assert_eq!(entry["pr_url"], "https://github.com/acme/platform/pull/12");
    assert!(entry["branch"].as_str().unwrap().starts_with("ops/reconcile-"));
    assert_eq!(body["next_steps"][0]["kind"], "review_pull_request");
    assert_eq!(
        body["next_steps"][0]["url"],
        "https://github.com/acme/platform/pull/12"
    );
}

#[tokio::test]
async fn test_approved_direct_apply_runs_migration() {
    let server = TestServer::start_with(TestOptions {
        allow_direct_apply: true,
        ..Default::default()
    })
    .await
    .unwrap();
    let response = server
        .post_auth(
            "/api/v1/ops/apply",
            &json!({
                "change_ids": [CAMPAIGNS],
                "direct_apply": true,
                "approved_change_ids": [CAMPAIGNS]
            }),
        )
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();

    let entry = &body["outcome"]["applied"][0];
    assert_eq!(entry["scope"], "database");
    assert_eq!(entry["method"], "direct_apply");
    assert_eq!(server.database.migration_names().len(), 1);
}

#[tokio::test]
async fn test_stale_change_is_skipped() {
    let server = TestServer::start().await.unwrap();
    let response = server
        .post_auth(
            "/api/v1/ops/apply",
            &json!({"change_ids": ["database.create_table.ghosts"]}),
        )
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(
        body["outcome"]["skipped"][0]["note"],
        "change no longer detected"
    );
}

#[tokio::test]
async fn test_apply_requires_change_ids() {
    let server = TestServer::start().await.unwrap();
    let response = server
        .post_auth("/api/v1/ops/apply", &json!({"change_ids": []}))
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

// ============================================================================
// Plan History Tests
// ============================================================================

#[tokio::test]
async fn test_plan_history() {
    let server = TestServer::start_with(TestOptions {
        persist_plans: true,
        ..Default::default()
    })
    .await
    .unwrap();

    let response = server.post_auth("/api/v1/ops/plan", &json!({})).await.unwrap();
    let plan: Value = assert_json(response, StatusCode::OK).await.unwrap();
    let plan_id = plan["plan_id"].as_str().unwrap().to_string();

    let response = server.get_auth("/api/v1/ops/plans?limit=5").await.unwrap();
    let history: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(history["plans"].as_array().unwrap().len(), 1);
    assert_eq!(history["plans"][0]["id"], plan_id.as_str());
}

#[tokio::test]
async fn test_plan_history_without_store() {
    let server = TestServer::start().await.unwrap();
    let response = server.get_auth("/api/v1/ops/plans").await.unwrap();
    assert_status(response, StatusCode::SERVICE_UNAVAILABLE)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_plan_history_limit_out_of_range() {
    let server = TestServer::start().await.unwrap();
    let response = server.get_auth("/api/v1/ops/plans?limit=0").await.unwrap();
    assert_status(response, StatusCode::BAD_REQUEST).await.unwrap();
}
