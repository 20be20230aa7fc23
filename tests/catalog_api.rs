use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use bookshelf_kernel::{
    settings::{SeedBook, Settings},
    InitCtx,
};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn seeded_app() -> Router {
    let mut settings = Settings::default();
    settings.catalog.seed = vec![SeedBook {
        title: "Dune".to_string(),
        author: "Frank Herbert".to_string(),
        id: "B1".to_string(),
        total_copies: 2,
    }];

    let registry = bookshelf_app::build_registry().unwrap();
    registry
        .init_modules(&InitCtx {
            settings: &settings,
        })
        .await
        .unwrap();

    bookshelf_http::build_router(&registry, &settings)
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn loan(uri: &str, user: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"user": user, "id": "B1"}).to_string()))
        .unwrap()
}

#[tokio::test]
async fn seeded_catalog_is_served_under_api_books() {
    let app = seeded_app().await;

    let (status, books) = call(
        &app,
        Request::get("/api/books").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        books,
        json!([{
            "id": "B1",
            "title": "Dune",
            "author": "Frank Herbert",
            "total_copies": 2,
            "available_copies": 2
        }])
    );
}

#[tokio::test]
async fn borrow_and_return_through_full_stack() {
    let app = seeded_app().await;

    let (status, receipt) = call(&app, loan("/api/books/borrow", "Alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["message"], "Alice borrowed Dune");

    let (status, error) = call(&app, loan("/api/books/borrow", "Alice")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"]["code"], "already_borrowed");
    assert!(error["error"]["trace_id"].is_string());

    let (status, receipt) = call(&app, loan("/api/books/return", "Alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["book"]["available_copies"], 2);

    let (_, records) = call(
        &app,
        Request::get("/api/books/records")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(records, json!([]));
}

#[tokio::test]
async fn openapi_includes_books_paths() {
    let app = seeded_app().await;

    let (status, spec) = call(
        &app,
        Request::get("/docs/openapi.json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(spec["paths"]["/api/books"]["get"].is_object());
    assert!(spec["paths"]["/api/books"]["post"].is_object());
    assert!(spec["paths"].get("/api/books/").is_none());
    assert!(spec["paths"]["/api/books/borrow"]["post"].is_object());
    assert!(spec["components"]["schemas"]["Receipt"].is_object());

    // Every documented GET path must resolve on the live router.
    let (status, _) = call(&app, Request::get("/api/books").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
}
