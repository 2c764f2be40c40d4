//! End-to-end integration tests for the Folio report engine.
//!
//! These tests drive the gateway router the way a client would, from the
//! first prompt through enhancements, external generation, export/import
//! and eviction.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use folio_config::AppConfig;
use folio_core::{EnhancementKind, Intent, ReportType};
use folio_gateway::{GatewayState, SharedState};
use folio_report::{EnhanceRequest, ReportEngine, classify, extract_timeframe};
use http_body_util::BodyExt;
use tower::ServiceExt;

// ── Helpers ──────────────────────────────────────────────────────────────

fn gateway() -> SharedState {
    Arc::new(GatewayState::new(AppConfig::default()))
}

async fn call(
    state: &SharedState,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = folio_gateway::build_router(state.clone())
        .oneshot(req)
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn enhance(state: &SharedState, conversation: &str, prompt: &str) -> serde_json::Value {
    let (status, json) = call(
        state,
        "POST",
        "/v1/enhance",
        Some(serde_json::json!({ "conversationId": conversation, "prompt": prompt })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "enhance failed: {json}");
    json
}

fn position(document: &str, section_id: &str) -> usize {
    let marker = format!("id=\"{section_id}\"");
    assert_eq!(
        document.matches(&marker).count(),
        1,
        "{section_id} should appear exactly once"
    );
    document.find(&marker).unwrap()
}

// ── E2E: Incremental report flow ────────────────────────────────────────

#[tokio::test]
async fn e2e_report_grows_without_regeneration() {
    let state = gateway();

    let first = enhance(&state, "C1", "Analyze AAPL").await;
    assert_eq!(first["context"]["metadata"]["version"], 1);
    assert_eq!(first["context"]["state"]["reportType"], "single");
    let first_doc = first["document"].as_str().unwrap().to_string();
    assert!(first_doc.contains("Analysis Overview"));

    let second = enhance(&state, "C1", "Add technical indicators").await;
    assert_eq!(second["context"]["metadata"]["version"], 2);

    let third = enhance(&state, "C1", "Compare with MSFT").await;
    assert_eq!(third["context"]["metadata"]["version"], 3);
    assert_eq!(third["context"]["state"]["assets"], serde_json::json!(["AAPL", "MSFT"]));

    let doc = third["document"].as_str().unwrap();
    let main = position(doc, "main-analysis");
    let technical = position(doc, "technical-analysis");
    let comparison = position(doc, "comparison-analysis");
    assert!(main < technical);
    assert!(technical < comparison);

    // Only the new section was produced by the last step.
    let ops = third["operations"].as_array().unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0]["sectionId"], "comparison-analysis");
    assert_eq!(ops[0]["action"], "add");

    let (status, ctx) = call(&state, "GET", "/v1/contexts/C1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctx["enhancements"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn e2e_conversations_are_independent() {
    let state = gateway();
    enhance(&state, "A", "Analyze TSLA").await;
    enhance(&state, "B", "Review my portfolio of JPM and XOM").await;
    enhance(&state, "A", "Show risk metrics").await;

    let (_, a) = call(&state, "GET", "/v1/contexts/A", None).await;
    let (_, b) = call(&state, "GET", "/v1/contexts/B", None).await;
    assert_eq!(a["metadata"]["version"], 2);
    assert_eq!(b["metadata"]["version"], 1);
    assert_eq!(b["state"]["reportType"], "portfolio");

    let (_, list) = call(&state, "GET", "/v1/contexts", None).await;
    assert_eq!(list["count"], 2);
}

// ── E2E: External generation ────────────────────────────────────────────

#[tokio::test]
async fn e2e_prompt_then_generated_output() {
    let state = gateway();
    enhance(&state, "C1", "Analyze NVDA").await;

    let (status, built) = call(
        &state,
        "POST",
        "/v1/contexts/C1/prompt",
        Some(serde_json::json!({ "prompt": "Add an ESG summary" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let prompt = built["prompt"].as_str().unwrap();
    assert!(prompt.contains("NVDA"));
    assert!(prompt.contains("<<<ENHANCEMENT"));

    let output = concat!(
        "Here you go.\n",
        "<<<ENHANCEMENT\n",
        "{\"action\": \"add\", \"section\": \"ESG Summary\", \"content\": \"<p>Strong governance.</p>\", \"order\": 0}\n",
        "ENHANCEMENT>>>\n",
        "<<<ENHANCEMENT\n",
        "{\"action\": \"replace\", \"section\": \"no-such-section\", \"content\": \"<p>x</p>\"}\n",
        "ENHANCEMENT>>>\n",
    );
    let (status, applied) = call(
        &state,
        "POST",
        "/v1/contexts/C1/generated",
        Some(serde_json::json!({ "prompt": "Add an ESG summary", "output": output })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(applied["skippedBlocks"], 0);
    assert_eq!(applied["context"]["metadata"]["version"], 2);

    let doc = applied["document"].as_str().unwrap();
    assert!(position(doc, "esg-summary") < position(doc, "main-analysis"));
    assert!(!doc.contains("no-such-section"));
}

// ── E2E: Export / import ────────────────────────────────────────────────

#[tokio::test]
async fn e2e_export_import_preserves_document() {
    let source = gateway();
    enhance(&source, "C1", "Compare AAPL vs GOOGL").await;
    enhance(&source, "C1", "Add predictions").await;

    let req = Request::builder()
        .uri("/v1/contexts/C1/export")
        .body(Body::empty())
        .unwrap();
    let resp = folio_gateway::build_router(source.clone())
        .oneshot(req)
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let exported = resp.into_body().collect().await.unwrap().to_bytes();

    let target = gateway();
    let req = Request::builder()
        .method("POST")
        .uri("/v1/contexts/import")
        .body(Body::from(exported))
        .unwrap();
    let resp = folio_gateway::build_router(target.clone())
        .oneshot(req)
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let strip = folio_report::strip_live_regions;
    let before = source.engine.render("C1").unwrap();
    let after = target.engine.render("C1").unwrap();
    assert_eq!(strip(&before), strip(&after));
}

// ── E2E: Eviction ───────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_evict_then_start_over() {
    let state = gateway();
    enhance(&state, "C1", "Analyze AAPL").await;
    enhance(&state, "C1", "Add technical indicators").await;

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let (status, evicted) = call(
        &state,
        "POST",
        "/v1/evict",
        Some(serde_json::json!({ "maxAgeSecs": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(evicted["count"], 1);

    let (status, _) = call(&state, "GET", "/v1/contexts/C1/document", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The next prompt starts a fresh report.
    let restarted = enhance(&state, "C1", "Analyze MSFT").await;
    assert_eq!(restarted["context"]["metadata"]["version"], 1);
    assert_eq!(restarted["context"]["state"]["assets"], serde_json::json!(["MSFT"]));
}

// ── E2E: Configuration System ───────────────────────────────────────────

#[tokio::test]
async fn e2e_config_file_drives_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[store]\nsize_ceiling = 2000\n\n[report]\ndefault_symbol = \"MSFT\"\ndefault_theme = \"dark\"\n",
    )
    .unwrap();

    let config = AppConfig::load_from(&path).unwrap();
    assert_eq!(config.store.size_ceiling, 2_000);
    assert_eq!(config.gateway.port, 42718);

    let state = Arc::new(GatewayState::new(config));
    let report = enhance(&state, "C1", "Show me a report").await;
    assert_eq!(report["context"]["state"]["assets"], serde_json::json!(["MSFT"]));
    assert!(
        report["document"]
            .as_str()
            .unwrap()
            .contains("theme-dark")
    );

    for prompt in [
        "Add technical indicators",
        "Show risk metrics",
        "Add predictions",
        "show me 5 year trends",
        "Add technical indicators",
        "Show risk metrics",
    ] {
        enhance(&state, "C1", prompt).await;
    }
    let ctx = state.engine.store().get("C1").unwrap();
    assert_eq!(ctx.metadata.version, 7);
    assert!(ctx.metadata.compressed);
    assert_eq!(ctx.enhancements.len(), 5);
}

#[test]
fn e2e_config_rejects_invalid_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[store]\nretention = 0\n").unwrap();
    assert!(AppConfig::load_from(&path).is_err());
}

// ── E2E: Classification ─────────────────────────────────────────────────

#[test]
fn e2e_classification_table() {
    assert_eq!(
        classify("Compare AAPL vs MSFT", false),
        Intent::Report(ReportType::Comparison)
    );
    assert_eq!(
        classify("my portfolio holdings", false),
        Intent::Report(ReportType::Portfolio)
    );
    assert_eq!(
        classify("Add technical indicators", true),
        Intent::Enhance(EnhancementKind::AddTechnical)
    );
    assert_eq!(
        classify("make it look nicer", true),
        Intent::Enhance(EnhancementKind::Generic)
    );
    assert_eq!(extract_timeframe("show me 5 year trends"), "5 Year");
    assert_eq!(extract_timeframe("nothing about time"), "1 Year");
}

#[test]
fn e2e_engine_without_gateway() {
    let engine = ReportEngine::from_config(&AppConfig::default());
    let first = engine
        .enhance(EnhanceRequest::new("local", "Analyze the energy sector"))
        .unwrap();
    assert_eq!(first.context.state.report_type, Some(ReportType::Sector));
    assert!(first.context.state.assets.contains("XOM"));

    let err = engine.render("missing").unwrap_err();
    assert!(err.to_string().contains("missing"));
}
