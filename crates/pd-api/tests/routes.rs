//! Router-level tests driven with `tower::ServiceExt::oneshot` over the
//! in-memory store.

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use pd_api::{router, AppState};
use pd_core::{DirectoryStore, Playground, PlaygroundId};
use pd_store_memory::MemoryDirectory;
use serde_json::Value;
use tower::ServiceExt;

fn park(id: &str, zip: &str, name: &str) -> Playground {
    Playground {
        id: PlaygroundId::new(id),
        name: name.to_string(),
        location: "Main St".to_string(),
        zip: zip.to_string(),
        image: None,
        features: vec![],
    }
}

fn app() -> (Router, Arc<MemoryDirectory>) {
    let store = Arc::new(MemoryDirectory::new(vec![
        park("p1", "10001", "Park A"),
        park("p2", "10002", "Park B"),
    ]));
    (router(AppState::new(store.clone())), store)
}

async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn post_form(app: &Router, uri: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn post_json(app: &Router, uri: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn index_lists_every_playground() {
    let (app, _) = app();
    let response = get(&app, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let html = body_text(response).await;
    assert!(html.contains("Park A"));
    assert!(html.contains("Park B"));
}

#[tokio::test]
async fn search_form_filters_the_page() {
    let (app, _) = app();
    get(&app, "/").await;

    let response = post_form(&app, "/search", "zip=+10001+").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");

    let html = body_text(get(&app, "/").await).await;
    assert!(html.contains("Park A"));
    assert!(!html.contains("Park B"));
    assert!(html.contains("value=\"10001\""));
}

#[tokio::test]
async fn api_search_matches_exact_zip_only() {
    let (app, _) = app();

    let json = body_json(get(&app, "/api/playgrounds?zip=%2010001%20").await).await;
    assert_eq!(json["zip"], "10001");
    assert_eq!(json["playgrounds"].as_array().unwrap().len(), 1);
    assert_eq!(json["playgrounds"][0]["id"], "p1");

    let json = body_json(get(&app, "/api/playgrounds?zip=").await).await;
    assert_eq!(json["playgrounds"].as_array().unwrap().len(), 2);

    let json = body_json(get(&app, "/api/playgrounds?zip=99999").await).await;
    assert!(json["playgrounds"].as_array().unwrap().is_empty());
    assert_eq!(json["total"], 2);
}

#[tokio::test]
async fn submitted_review_appears_first() {
    let (app, _) = app();
    get(&app, "/").await;

    post_form(&app, "/playgrounds/p1/reviews", "comment=Too+crowded&rating=2").await;
    let response = post_form(&app, "/playgrounds/p1/reviews", "comment=Great+slides&rating=4").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/#pg-p1");

    let reviews = body_json(get(&app, "/api/playgrounds/p1/reviews").await).await;
    assert_eq!(reviews.as_array().unwrap().len(), 2);
    assert_eq!(reviews[0]["comment"], "Great slides");
    assert_eq!(reviews[0]["rating"], 4);
    assert_eq!(reviews[0]["author"], "Anonymous");

    let html = body_text(get(&app, "/").await).await;
    assert!(html.contains("Great slides"));
}

#[tokio::test]
async fn blank_review_is_not_written() {
    let (app, store) = app();
    post_form(&app, "/playgrounds/p1/reviews", "comment=+++&rating=3").await;

    let stored = store.list_reviews(&PlaygroundId::new("p1")).await.unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn draft_is_kept_per_target() {
    let (app, _) = app();
    get(&app, "/").await;
    post_form(&app, "/playgrounds/p2/draft", "comment=Half+written&rating=3").await;

    let html = body_text(get(&app, "/").await).await;
    assert_eq!(html.matches("value=\"Half written\"").count(), 1);
}

#[tokio::test]
async fn out_of_range_rating_is_unprocessable() {
    let (app, _) = app();
    let response = post_json(
        &app,
        "/api/playgrounds/p1/reviews",
        r#"{"rating": 7, "comment": "too good"}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = post_form(&app, "/playgrounds/p1/draft", "comment=hi&rating=0").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn api_create_returns_created_review() {
    let (app, _) = app();
    let response = post_json(
        &app,
        "/api/playgrounds/p2/reviews",
        r#"{"rating": 5, "comment": "  Shady and quiet "}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let review = body_json(response).await;
    assert_eq!(review["comment"], "Shady and quiet");
    assert_eq!(review["playground_id"], "p2");
}

#[tokio::test]
async fn unknown_playground_write_is_rejected() {
    let (app, _) = app();
    let response = post_json(
        &app,
        "/api/playgrounds/ghost/reviews",
        r#"{"rating": 3, "comment": "where is it"}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "WRITE_REJECTED");
}

#[tokio::test]
async fn offline_store_is_reported_and_recoverable() {
    let (app, store) = app();
    store.set_available(false);

    let response = get(&app, "/api/playgrounds").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let html = body_text(get(&app, "/").await).await;
    assert!(html.contains("action=\"/reload\""));
    assert!(!html.contains("Park A"));

    store.set_available(true);
    post_form(&app, "/reload", "").await;
    let html = body_text(get(&app, "/").await).await;
    assert!(html.contains("Park A"));
}

#[tokio::test]
async fn health_and_metrics() {
    let (app, _) = app();
    let json = body_json(get(&app, "/health").await).await;
    assert_eq!(json["status"], "ok");

    get(&app, "/").await;
    let response = get(&app, "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains("playdir_store_calls_total"));
    assert!(text.contains("ListPlaygrounds"));
}

async fn stored_comments(store: &MemoryDirectory) -> Vec<String> {
    let mut comments = Vec::new();
    for id in ["p1", "p2"] {
        let reviews = store.list_reviews(&PlaygroundId::new(id)).await.unwrap();
        comments.extend(reviews.into_iter().map(|r| r.comment));
    }
    comments
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_api_creates_each_write_once() {
    let (app, store) = app();
    let requests = 200;

    let tasks: Vec<_> = (0..requests)
        .map(|n| {
            let app = app.clone();
            tokio::spawn(async move {
                let uri = format!("/api/playgrounds/p{}/reviews", n % 2 + 1);
                let body = format!(r#"{{"rating": {}, "comment": "visit {n}"}}"#, n % 5 + 1);
                post_json(&app, &uri, &body).await.status()
            })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::CREATED);
    }

    let comments = stored_comments(&store).await;
    let unique: HashSet<_> = comments.iter().collect();
    assert_eq!(comments.len(), requests);
    assert_eq!(unique.len(), requests);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_form_submits_each_write_their_own_text() {
    let (app, store) = app();
    let requests = 100;

    let tasks: Vec<_> = (0..requests)
        .map(|n| {
            let app = app.clone();
            tokio::spawn(async move {
                let uri = format!("/playgrounds/p{}/reviews", n % 2 + 1);
                let body = format!("comment=form+{n}&rating=4");
                post_form(&app, &uri, &body).await.status()
            })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::SEE_OTHER);
    }

    let comments: HashSet<_> = stored_comments(&store).await.into_iter().collect();
    let expected: HashSet<_> = (0..requests).map(|n| format!("form {n}")).collect();
    assert_eq!(comments, expected);
}

#[tokio::test]
async fn api_create_does_not_touch_the_page_draft() {
    let (app, _) = app();
    get(&app, "/").await;
    post_form(&app, "/playgrounds/p2/draft", "comment=Half+written&rating=3").await;

    post_json(&app, "/api/playgrounds/p1/reviews", r#"{"rating": 5, "comment": "Quick one"}"#).await;

    let html = body_text(get(&app, "/").await).await;
    assert!(html.contains("value=\"Half written\""));
}

#[tokio::test]
async fn odd_playground_ids_redirect_cleanly() {
    let (app, _) = app();
    let response = post_form(&app, "/playgrounds/a%0Ab/reviews/load", "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/#pg-a%0Ab");
}

#[tokio::test]
async fn client_request_id_is_echoed() {
    let (app, _) = app();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-me");
}
