use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use freqsearch_server::{router, AppState, ADMIN_TOKEN_HEADER};
use http_body_util::BodyExt;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

const TOKEN: &str = "secret";

fn write_corpus(dir: &Path, docs: &[&str], max_responses: usize) {
    let mut files = Vec::new();
    for (i, text) in docs.iter().enumerate() {
        let name = format!("file{:03}.txt", i + 1);
        fs::write(dir.join(&name), text).unwrap();
        files.push(name);
    }
    let config = serde_json::json!({
        "config": { "name": "TestEngine", "version": "0.1", "max_responses": max_responses },
        "files": files,
    });
    fs::write(dir.join("config.json"), config.to_string()).unwrap();
}

fn milk_corpus(dir: &Path, max_responses: usize) {
    write_corpus(
        dir,
        &[
            "milk milk milk milk water water water",
            "milk water water",
            "milk milk milk milk milk water water water water water",
            "americano cappuccino",
        ],
        max_responses,
    );
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = call(app, Request::get(uri).body(Body::empty()).unwrap()).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn doc_ids(json: &Value) -> Vec<u64> {
    json["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|hit| hit["doc_id"].as_u64().unwrap())
        .collect()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    milk_corpus(dir.path(), 5);
    let app = router(AppState::load(dir.path(), None).unwrap());

    let (status, json) = get(app, "/search?q=Milk%20water").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc_ids(&json), vec![2, 0, 1]);
    let top = json["results"][0]["rank"].as_f64().unwrap();
    assert!((top - 1.0).abs() < 1e-6);
    let second = json["results"][1]["rank"].as_f64().unwrap();
    assert!((second - 0.7).abs() < 1e-6);
}

#[tokio::test]
async fn search_applies_limits() {
    let dir = tempdir().unwrap();
    milk_corpus(dir.path(), 2);
    let state = AppState::load(dir.path(), None).unwrap();

    let (_, json) = get(router(state.clone()), "/search?q=milk").await;
    assert_eq!(doc_ids(&json), vec![2, 0]);

    let (_, json) = get(router(state.clone()), "/search?q=milk&k=1").await;
    assert_eq!(doc_ids(&json), vec![2]);

    let (_, json) = get(router(state), "/search?q=sugar").await;
    assert!(doc_ids(&json).is_empty());
}

#[tokio::test]
async fn stats_report_index_size() {
    let dir = tempdir().unwrap();
    milk_corpus(dir.path(), 5);
    let app = router(AppState::load(dir.path(), None).unwrap());

    let (status, json) = get(app, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["num_docs"].as_u64(), Some(4));
    assert_eq!(json["num_terms"].as_u64(), Some(4));
}

#[tokio::test]
async fn rebuild_requires_admin_token() {
    let dir = tempdir().unwrap();
    milk_corpus(dir.path(), 5);

    let app = router(AppState::load(dir.path(), None).unwrap());
    let req = Request::post("/index/rebuild").body(Body::empty()).unwrap();
    let (status, _) = call(app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let app = router(AppState::load(dir.path(), Some(TOKEN.into())).unwrap());
    let req = Request::post("/index/rebuild").header(ADMIN_TOKEN_HEADER, "wrong").body(Body::empty()).unwrap();
    let (status, _) = call(app.clone(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::post("/index/rebuild").body(Body::empty()).unwrap();
    let (status, body) = call(app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(&body[..], b"missing or wrong admin token");
}

#[tokio::test]
async fn rebuild_swaps_in_fresh_index() {
    let dir = tempdir().unwrap();
    milk_corpus(dir.path(), 5);
    let state = AppState::load(dir.path(), Some(TOKEN.into())).unwrap();
    let before = state.current();

    write_corpus(dir.path(), &["sugar", "no sweetener here", "sugar sugar"], 5);
    let req = Request::post("/index/rebuild").header(ADMIN_TOKEN_HEADER, TOKEN).body(Body::empty()).unwrap();
    let (status, body) = call(router(state.clone()), req).await;
    assert_eq!(status, StatusCode::OK);
    let stats: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(stats["num_docs"].as_u64(), Some(3));

    let (_, json) = get(router(state.clone()), "/search?q=sugar").await;
    assert_eq!(doc_ids(&json), vec![2, 0]);
    let (_, json) = get(router(state), "/search?q=milk").await;
    assert!(doc_ids(&json).is_empty());

    // A reader holding the old snapshot still sees the old corpus.
    assert_eq!(before.index.num_docs(), 4);
    assert_eq!(before.index.lookup("milk").len(), 3);
}

#[tokio::test]
async fn rebuild_failure_keeps_serving_old_index() {
    let dir = tempdir().unwrap();
    milk_corpus(dir.path(), 5);
    let state = AppState::load(dir.path(), Some(TOKEN.into())).unwrap();

    fs::write(dir.path().join("config.json"), r#"{ "config": { "name": "x", "version": "9.9" }, "files": [] }"#).unwrap();
    let req = Request::post("/index/rebuild").header(ADMIN_TOKEN_HEADER, TOKEN).body(Body::empty()).unwrap();
    let (status, _) = call(router(state.clone()), req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, json) = get(router(state), "/search?q=cappuccino").await;
    assert_eq!(doc_ids(&json), vec![3]);
}
