use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};

use bookshelf_http::error::AppError;
use bookshelf_http::extract::{Json, Path, Query};
use bookshelf_kernel::settings::PaginationSettings;

use super::models::{Book, BookInput, ListParams, NewBook};
use super::repository::BookRepository;
use super::validation::ValidationPolicy;

/// Shared handler state.
#[derive(Clone)]
pub struct BooksState {
    pub repo: Arc<dyn BookRepository>,
    pub validation: ValidationPolicy,
    pub pagination: PaginationSettings,
    /// Prefix used to build `Location` headers, e.g. `/books`
    pub base_path: String,
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(state)
}

fn validate(input: &BookInput, policy: &ValidationPolicy) -> Result<NewBook, AppError> {
    input.validate(policy).map_err(|violations| {
        let details = violations
            .iter()
            .map(|violation| serde_json::json!(violation))
            .collect();
        AppError::validation(details, "book input failed validation")
    })
}

fn not_found(id: i64) -> AppError {
    AppError::not_found(format!("book {id} not found"))
}

async fn create_book(
    State(state): State<BooksState>,
    Json(input): Json<BookInput>,
) -> Result<impl IntoResponse, AppError> {
    let book = validate(&input, &state.validation)?;
    let created = state.repo.create(book).await?;

    let location = format!("{}/{}", state.base_path, created.id);
    tracing::info!(id = created.id, "book created");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        axum::Json(created),
    ))
}

async fn list_books(
    State(state): State<BooksState>,
    Query(params): Query<ListParams>,
) -> Result<axum::Json<Vec<Book>>, AppError> {
    let skip = params.skip.unwrap_or(0);
    let limit = params
        .limit
        .unwrap_or(state.pagination.default_limit)
        .min(state.pagination.max_limit);

    let books = state.repo.list(skip, limit).await?;
    Ok(axum::Json(books))
}

async fn get_book(
    State(state): State<BooksState>,
    Path(id): Path<i64>,
) -> Result<axum::Json<Book>, AppError> {
    state
        .repo
        .get(id)
        .await?
        .map(axum::Json)
        .ok_or_else(|| not_found(id))
}

async fn update_book(
    State(state): State<BooksState>,
    Path(id): Path<i64>,
    Json(input): Json<BookInput>,
) -> Result<StatusCode, AppError> {
    let book = validate(&input, &state.validation)?;

    match state.repo.update(id, book).await? {
        Some(_) => {
            tracing::info!(id, "book updated");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(not_found(id)),
    }
}

async fn delete_book(
    State(state): State<BooksState>,
    Path(id): Path<i64>,
) -> Result<axum::Json<Book>, AppError> {
    let deleted = state.repo.delete(id).await?.ok_or_else(|| not_found(id))?;
    tracing::info!(id, "book deleted");
    Ok(axum::Json(deleted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::repository::SqliteBookRepository;
    use crate::modules::books::tests::migrated_db;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app_with(pagination: PaginationSettings) -> Router {
        let db = migrated_db().await;
        router(BooksState {
            repo: Arc::new(SqliteBookRepository::new(db.pool().clone())),
            validation: ValidationPolicy::default(),
            pagination,
            base_path: "/books".to_string(),
        })
    }

    async fn app() -> Router {
        app_with(PaginationSettings::default()).await
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn dune() -> Value {
        json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "datePublished": "1965-08-01T00:00:00Z",
            "coverImage": "https://example.com/dune.jpg"
        })
    }

    async fn create(app: &Router, body: Value) -> Value {
        let response = send(app, Method::POST, "/", Some(body)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await
    }

    async fn count(app: &Router) -> usize {
        let response = send(app, Method::GET, "/", None).await;
        json_body(response).await.as_array().unwrap().len()
    }

    #[tokio::test]
    async fn create_returns_created_with_location() {
        let app = app().await;
        let response = send(&app, Method::POST, "/", Some(dune())).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let body = json_body(response).await;
        assert_eq!(location, format!("/books/{}", body["id"]));
        assert_eq!(body["title"], "Dune");
    }

    #[tokio::test]
    async fn created_book_round_trips_through_get() {
        let app = app().await;
        let created = create(&app, dune()).await;

        let response = send(&app, Method::GET, &format!("/{}", created["id"]), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = json_body(response).await;

        assert_eq!(fetched, created);
        assert_eq!(fetched["title"], "Dune");
        assert_eq!(fetched["author"], "Frank Herbert");
        assert_eq!(fetched["datePublished"], "1965-08-01T00:00:00Z");
        assert_eq!(fetched["coverImage"], "https://example.com/dune.jpg");
    }

    #[tokio::test]
    async fn missing_title_is_rejected_without_persisting() {
        let app = app().await;
        let before = count(&app).await;

        let mut body = dune();
        body.as_object_mut().unwrap().remove("title");
        let response = send(&app, Method::POST, "/", Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error = json_body(response).await;
        assert_eq!(error["error"]["code"], "validation_error");
        assert_eq!(error["error"]["details"][0]["field"], "title");
        assert_eq!(error["error"]["details"][0]["error"], "required");

        assert_eq!(count(&app).await, before);
    }

    #[tokio::test]
    async fn validation_enumerates_all_violations() {
        let app = app().await;
        let body = json!({
            "title": "t".repeat(101),
            "author": "",
            "datePublished": "soon",
            "coverImage": "not a url"
        });
        let response = send(&app, Method::POST, "/", Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error = json_body(response).await;
        let fields: Vec<_> = error["error"]["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["field"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(fields, vec!["title", "author", "datePublished", "coverImage"]);
    }

    #[tokio::test]
    async fn update_replaces_fields_and_returns_no_content() {
        let app = app().await;
        let created = create(&app, dune()).await;
        let uri = format!("/{}", created["id"]);

        let changes = json!({
            "title": "Dune Messiah",
            "author": "Frank Herbert",
            "datePublished": "1969-10-15T00:00:00Z",
            "coverImage": "https://example.com/messiah.jpg"
        });
        let response = send(&app, Method::PUT, &uri, Some(changes)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let fetched = json_body(send(&app, Method::GET, &uri, None).await).await;
        assert_eq!(fetched["id"], created["id"]);
        assert_eq!(fetched["title"], "Dune Messiah");
        assert_eq!(fetched["datePublished"], "1969-10-15T00:00:00Z");
        assert_eq!(fetched["coverImage"], "https://example.com/messiah.jpg");
    }

    #[tokio::test]
    async fn invalid_update_is_rejected() {
        let app = app().await;
        let created = create(&app, dune()).await;
        let uri = format!("/{}", created["id"]);

        let response = send(&app, Method::PUT, &uri, Some(json!({ "title": "Only" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let fetched = json_body(send(&app, Method::GET, &uri, None).await).await;
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn delete_returns_book_then_not_found() {
        let app = app().await;
        let created = create(&app, dune()).await;
        let uri = format!("/{}", created["id"]);

        let response = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, created);

        let response = send(&app, Method::GET, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found_everywhere() {
        let app = app().await;

        let response = send(&app, Method::GET, "/999", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"]["code"], "not_found");

        let response = send(&app, Method::PUT, "/999", Some(dune())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, Method::DELETE, "/999", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_numeric_id_is_bad_request() {
        let app = app().await;
        let response = send(&app, Method::GET, "/dune", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_applies_skip_and_limit() {
        let app = app().await;
        for n in 0..4 {
            let mut body = dune();
            body["title"] = json!(format!("Volume {n}"));
            create(&app, body).await;
        }

        let response = send(&app, Method::GET, "/?skip=1&limit=2", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = json_body(response).await;
        let titles: Vec<_> = page
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["Volume 1", "Volume 2"]);

        assert_eq!(count(&app).await, 4);
    }

    #[tokio::test]
    async fn list_is_empty_for_new_store() {
        let app = app().await;
        let response = send(&app, Method::GET, "/", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!([]));
    }

    #[tokio::test]
    async fn list_limit_is_capped() {
        let app = app_with(PaginationSettings {
            default_limit: 2,
            max_limit: 3,
        })
        .await;
        for _ in 0..5 {
            create(&app, dune()).await;
        }

        assert_eq!(count(&app).await, 2);

        let response = send(&app, Method::GET, "/?limit=50", None).await;
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn negative_paging_is_bad_request() {
        let app = app().await;
        let response = send(&app, Method::GET, "/?skip=-1", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
