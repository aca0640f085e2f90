use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use snip_gateway::{App, AppState};
use snip_generator::SeqGenerator;
use snip_storage::InMemoryRepository;
use snip_store::UrlStore;
use std::sync::Arc;
use tower::ServiceExt;

const BASE_URL: &str = "http://sn.ip";

fn app() -> Router {
    let store = UrlStore::new(InMemoryRepository::new(), SeqGenerator::with_prefix("gw"));
    App::router(AppState::new(Arc::new(store), BASE_URL))
}

struct Reply {
    status: StatusCode,
    location: Option<String>,
    body: Value,
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|value| value.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    Reply {
        status,
        location,
        body,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn shorten(app: &Router, url: &str) -> Reply {
    send(app, post_json("/api/shorten", json!({ "url": url }))).await
}

#[tokio::test]
async fn health() {
    let reply = send(&app(), get("/health")).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn shorten_then_redirect() {
    let app = app();

    let created = shorten(&app, "github.com/x").await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(
        created.body,
        json!({
            "short_url": "http://sn.ip/gw000000",
            "short_code": "gw000000",
            "original_url": "https://github.com/x",
            "existing": false,
        })
    );

    let redirect = send(&app, get("/gw000000")).await;
    assert_eq!(redirect.status, StatusCode::FOUND);
    assert_eq!(redirect.location.as_deref(), Some("https://github.com/x"));

    let stats = send(&app, get("/api/stats/gw000000")).await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["original_url"], "https://github.com/x");
    assert_eq!(stats.body["clicks"], 1);
    assert!(stats.body["created_at"].is_string());
}

#[tokio::test]
async fn shortening_twice_reports_existing() {
    let app = app();

    shorten(&app, "https://example.com").await;
    let again = shorten(&app, "example.com").await;

    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["existing"], true);
    assert_eq!(again.body["short_code"], "gw000000");
}

#[tokio::test]
async fn shorten_rejects_bad_bodies() {
    let app = app();

    let cases = [
        (post_json("/api/shorten", json!({})), "URL is required"),
        (
            post_json("/api/shorten", json!({ "url": ["a.com"] })),
            "URL must be a string",
        ),
        (
            Request::post("/api/shorten")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
            "URL is required",
        ),
        (
            Request::post("/api/shorten")
                .body(Body::from(r#"{"url":"a.com"}"#))
                .unwrap(),
            "URL is required",
        ),
    ];

    for (request, message) in cases {
        let reply = send(&app, request).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body, json!({ "error": message }));
    }

    let empty = shorten(&app, "  ").await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert!(empty.body["error"].is_string());

    let listed = send(&app, get("/api/list")).await;
    assert_eq!(listed.body, json!([]));
}

#[tokio::test]
async fn unknown_codes_are_not_found() {
    let app = app();
    let not_found = json!({ "error": "Short code not found" });

    for request in [
        get("/nope"),
        get("/api/stats/nope"),
        delete("/api/delete/nope"),
        get("/not-a-code"),
    ] {
        let reply = send(&app, request).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.body, not_found);
    }
}

#[tokio::test]
async fn list_is_newest_first() {
    let app = app();

    shorten(&app, "one.com").await;
    shorten(&app, "two.com").await;
    send(&app, get("/gw000000")).await;

    let listed = send(&app, get("/api/list")).await;

    assert_eq!(listed.status, StatusCode::OK);
    let items = listed.body.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["short_code"], "gw000001");
    assert_eq!(items[1]["short_code"], "gw000000");
    assert_eq!(items[1]["short_url"], "http://sn.ip/gw000000");
    assert_eq!(items[1]["original_url"], "https://one.com");
    assert_eq!(items[1]["clicks"], 1);
}

#[tokio::test]
async fn delete_removes_the_mapping() {
    let app = app();
    shorten(&app, "example.com").await;

    let deleted = send(&app, delete("/api/delete/gw000000")).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(
        deleted.body,
        json!({ "message": "URL deleted successfully" })
    );

    assert_eq!(
        send(&app, get("/gw000000")).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        send(&app, delete("/api/delete/gw000000")).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn bulk_shorten_mixes_outcomes() {
    let app = app();
    shorten(&app, "existing.com").await;

    let reply = send(
        &app,
        post_json(
            "/api/bulk-shorten",
            json!({ "urls": ["new.com", "https://existing.com", 42, "new.com"] }),
        ),
    )
    .await;

    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["total_processed"], 4);
    assert_eq!(reply.body["new_urls"], 1);
    assert_eq!(reply.body["existing_urls"], 2);
    assert_eq!(reply.body["errors"], 1);

    let results = reply.body["results"].as_array().unwrap();
    assert_eq!(results[0]["existing"], false);
    assert_eq!(results[0]["original_url"], "https://new.com");
    assert_eq!(results[1]["short_code"], "gw000000");
    assert_eq!(results[1]["existing"], true);
    assert_eq!(
        results[2],
        json!({ "original_url": 42, "error": "URL must be a string" })
    );
    assert_eq!(results[3]["short_code"], results[0]["short_code"]);
    assert_eq!(results[3]["existing"], true);
}

#[tokio::test]
async fn bulk_shorten_rejects_bad_batches() {
    let app = app();
    let too_many: Vec<String> = (0..101).map(|i| format!("example.com/{i}")).collect();

    let cases = [
        (json!({}), "URLs list is required"),
        (json!({ "urls": "a.com" }), "URLs must be a list"),
        (json!({ "urls": [] }), "URLs list cannot be empty"),
        (
            json!({ "urls": too_many }),
            "Maximum 100 URLs allowed per request",
        ),
    ];

    for (body, message) in cases {
        let reply = send(&app, post_json("/api/bulk-shorten", body)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body, json!({ "error": message }));
    }

    assert_eq!(send(&app, get("/api/list")).await.body, json!([]));
}
