//! HTTP handlers for the books module, mounted under `/api/books`.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bookshelf_http::error::AppError;
use serde_json::json;

use super::error::LibraryError;
use super::library::{render_search, Library};
use super::models::{Book, Format, LoanRequest, NewBook, Receipt, RecordEntry, SearchQuery};

/// The single catalog shared by every request; one lock guards each operation.
pub type SharedLibrary = Arc<Mutex<Library>>;

/// Build the module router over a shared catalog.
pub fn router(library: SharedLibrary) -> Router {
    Router::new()
        .route("/", get(list_books).post(add_book))
        .route("/search/title", get(search_by_title))
        .route("/search/author", get(search_by_author))
        .route("/borrow", post(borrow_book))
        .route("/return", post(return_book))
        .route("/records", get(list_records))
        .route("/listing", get(listing))
        .route("/health", get(health_check))
        .with_state(library)
}

impl From<LibraryError> for AppError {
    fn from(err: LibraryError) -> Self {
        let code = err.kind().code();
        let message = err.to_string();

        let app_error = match err {
            LibraryError::Validation { fields } => AppError::validation(
                fields
                    .into_iter()
                    .map(|field| json!({"field": field, "error": validation_detail(field)}))
                    .collect(),
                message,
            ),
            LibraryError::UnknownBook { .. } => AppError::not_found(message),
            LibraryError::DuplicateId { id } | LibraryError::NoCopiesAvailable { id } => {
                AppError::conflict(vec![json!({"id": id})], message)
            }
            LibraryError::AlreadyBorrowed { user, id } | LibraryError::NotBorrowed { user, id } => {
                AppError::conflict(vec![json!({"user": user, "id": id})], message)
            }
        };

        app_error.with_code(code)
    }
}

fn validation_detail(field: &str) -> &'static str {
    match field {
        "total_copies" => "must be at least 1",
        _ => "required",
    }
}

fn lock(library: &SharedLibrary) -> Result<MutexGuard<'_, Library>, AppError> {
    library
        .lock()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("catalog lock poisoned")))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

fn render_results(results: Vec<&Book>, format: Format) -> Response {
    match format {
        Format::Json => Json(results).into_response(),
        Format::Text => render_search(&results).into_response(),
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(State(library): State<SharedLibrary>) -> Result<Json<Vec<Book>>, AppError> {
    let library = lock(&library)?;
    Ok(Json(library.list_all_books().into_iter().cloned().collect()))
}

async fn add_book(
    State(library): State<SharedLibrary>,
    payload: Result<Json<NewBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Receipt>), AppError> {
    let book = json_body(payload)?;
    let receipt = lock(&library)?.add_book(book)?;
    tracing::info!(book_id = %receipt.book.id, copies = receipt.book.total_copies, "book added");
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn search_by_title(
    State(library): State<SharedLibrary>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let query = query_params(query)?;
    let library = lock(&library)?;
    Ok(render_results(library.search_by_title(&query.q), query.format))
}

async fn search_by_author(
    State(library): State<SharedLibrary>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let query = query_params(query)?;
    let library = lock(&library)?;
    Ok(render_results(library.search_by_author(&query.q), query.format))
}

async fn borrow_book(
    State(library): State<SharedLibrary>,
    payload: Result<Json<LoanRequest>, JsonRejection>,
) -> Result<Json<Receipt>, AppError> {
    let request = json_body(payload)?;
    let receipt = lock(&library)?.borrow_book(&request.user, &request.id)?;
    tracing::info!(
        user = %request.user,
        book_id = %receipt.book.id,
        available = receipt.book.available_copies,
        "book borrowed"
    );
    Ok(Json(receipt))
}

async fn return_book(
    State(library): State<SharedLibrary>,
    payload: Result<Json<LoanRequest>, JsonRejection>,
) -> Result<Json<Receipt>, AppError> {
    let request = json_body(payload)?;
    let receipt = lock(&library)?.return_book(&request.user, &request.id)?;
    tracing::info!(
        user = %request.user,
        book_id = %receipt.book.id,
        available = receipt.book.available_copies,
        "book returned"
    );
    Ok(Json(receipt))
}

async fn list_records(
    State(library): State<SharedLibrary>,
) -> Result<Json<Vec<RecordEntry>>, AppError> {
    Ok(Json(lock(&library)?.record_entries()))
}

async fn listing(State(library): State<SharedLibrary>) -> Result<String, AppError> {
    Ok(lock(&library)?.render_listing())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn app() -> (SharedLibrary, Router) {
        let library = SharedLibrary::default();
        let router = router(Arc::clone(&library));
        (library, router)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let (status, bytes) = send(router, request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn dune() -> serde_json::Value {
        json!({"title": "Dune", "author": "Herbert", "id": "B1", "total_copies": 2})
    }

    #[tokio::test]
    async fn add_book_returns_created_receipt() {
        let (library, router) = app();

        let (status, body) = send_json(&router, post_json("/", dune())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Book added successfully!");
        assert_eq!(body["book"]["available_copies"], 2);
        assert_eq!(library.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_add_maps_to_conflict() {
        let (_, router) = app();
        send(&router, post_json("/", dune())).await;

        let (status, body) = send_json(&router, post_json("/", dune())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "duplicate_id");
        assert_eq!(body["error"]["message"], "Book ID already exists!");
        assert_eq!(body["error"]["details"][0]["id"], "B1");
    }

    #[tokio::test]
    async fn blank_fields_map_to_validation_error() {
        let (_, router) = app();

        let (status, body) = send_json(
            &router,
            post_json("/borrow", json!({"user": "", "id": "B1"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["details"][0]["field"], "user");
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (_, router) = app();

        let request = Request::post("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"title\": \"Dune\","))
            .unwrap();
        let (status, body) = send_json(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");

        let (status, body) =
            send_json(&router, post_json("/", json!({"title": "Dune", "total_copies": "two"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn absent_fields_map_to_validation_error() {
        let (library, router) = app();

        let (status, body) = send_json(
            &router,
            post_json("/", json!({"title": "Dune", "id": "B1", "total_copies": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["message"], "All fields are required!");
        assert_eq!(
            body["error"]["details"],
            json!([{"field": "author", "error": "required"}])
        );
        assert!(library.lock().unwrap().is_empty());

        let (status, body) = send_json(&router, post_json("/borrow", json!({"id": "B1"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["details"][0]["field"], "user");

        let (status, body) = send_json(&router, post_json("/return", json!({}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["error"]["details"],
            json!([
                {"field": "user", "error": "required"},
                {"field": "id", "error": "required"}
            ])
        );
    }

    #[tokio::test]
    async fn zero_or_absent_copies_are_out_of_range() {
        let (_, router) = app();

        for payload in [
            json!({"title": "Dune", "author": "Herbert", "id": "B1", "total_copies": 0}),
            json!({"title": "Dune", "author": "Herbert", "id": "B1"}),
        ] {
            let (status, body) = send_json(&router, post_json("/", payload)).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(
                body["error"]["details"],
                json!([{"field": "total_copies", "error": "must be at least 1"}])
            );
        }
    }

    #[tokio::test]
    async fn invalid_search_format_uses_error_envelope() {
        let (_, router) = app();

        let (status, body) =
            send_json(&router, get_request("/search/title?q=dune&format=xml")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");
        assert!(body["error"]["trace_id"].is_string());
    }

    #[tokio::test]
    async fn lending_round_trip_over_http() {
        let (_, router) = app();
        send(&router, post_json("/", dune())).await;

        for user in ["Alice", "Bob"] {
            let (status, _) =
                send(&router, post_json("/borrow", json!({"user": user, "id": "B1"}))).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send_json(
            &router,
            post_json("/borrow", json!({"user": "Carol", "id": "B1"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "no_copies_available");

        let (status, body) = send_json(
            &router,
            post_json("/return", json!({"user": "Alice", "id": "B1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Alice returned Dune");
        assert_eq!(body["book"]["available_copies"], 1);

        let (_, records) = send_json(&router, get_request("/records")).await;
        assert_eq!(
            records,
            json!([{"user": "Bob", "book_id": "B1", "title": "Dune"}])
        );
    }

    #[tokio::test]
    async fn unknown_and_not_borrowed_errors() {
        let (_, router) = app();
        send(&router, post_json("/", dune())).await;

        let (status, body) = send_json(
            &router,
            post_json("/borrow", json!({"user": "Alice", "id": "B9"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "unknown_book");

        let (status, body) = send_json(
            &router,
            post_json("/return", json!({"user": "Alice", "id": "B1"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "not_borrowed");
    }

    #[tokio::test]
    async fn search_supports_json_and_text() {
        let (_, router) = app();
        send(&router, post_json("/", dune())).await;

        let (status, body) = send_json(&router, get_request("/search/title?q=dun")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "B1");

        let (_, body) = send_json(&router, get_request("/search/author?q=nobody")).await;
        assert_eq!(body, json!([]));

        let (status, text) = send(&router, get_request("/search/author?q=nobody&format=text")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, b"No books found\n");

        let (_, text) = send(&router, get_request("/search/title?q=DUNE&format=text")).await;
        assert_eq!(text, b"Dune | Herbert | Available: 2\n");
    }

    #[tokio::test]
    async fn listing_is_plain_text() {
        let (_, router) = app();
        send(&router, post_json("/", dune())).await;

        let response = router.clone().oneshot(get_request("/listing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("Dune | Herbert | Total: 2 | Available: 2"));
        assert!(text.contains("No borrow records found"));
    }
}
