use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use maud::Markup;
use serde::Serialize;
use tracing::info;

use crate::db::Database;
use crate::error::{CatalogError, Result};
use crate::form::{AuthorForm, BookForm, FlashParams, IndexParams};
use crate::views;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// 302 Found, the status the browser forms expect after a write.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(HealthResponse { status: "ok" })
}

pub async fn index(State(state): State<AppState>, Query(params): Query<IndexParams>) -> Result<Markup> {
    let deleted = params.is_deleted();
    let query = params.into_book_query();

    let books = state.db.list_books(&query).await?;

    let success = query.search.is_none() || !books.is_empty();
    tracing::info!(
        count = books.len(),
        sort_by = query.sort_by.as_str(),
        search = ?query.search,
        "got books"
    );

    Ok(views::index(&views::IndexView {
        books: &books,
        sort_by: query.sort_by,
        search: query.search.as_deref(),
        success,
        deleted,
    }))
}

pub async fn show_add_author(Query(flash): Query<FlashParams>) -> Markup {
    views::add_author(flash.is_success(), flash.is_deleted())
}

pub async fn add_author(State(state): State<AppState>, Form(form): Form<AuthorForm>) -> Result<Response> {
    let input = form.into_new_author()?;
    let author = state.db.create_author(&input).await?;

    tracing::info!(author_id = author.id, name = %author.name, "created author");
    Ok(found("/add_author?success=true"))
}

pub async fn show_add_book(State(state): State<AppState>, Query(flash): Query<FlashParams>) -> Result<Markup> {
    let authors = state.db.list_authors().await?;
    Ok(views::add_book(&authors, flash.is_success()))
}

pub async fn add_book(State(state): State<AppState>, Form(form): Form<BookForm>) -> Result<Response> {
    let input = form.into_new_book()?;
    let book = state.db.create_book(&input).await?;

    tracing::info!(book_id = book.id, author_id = book.author_id, title = %book.title, "created book");
    Ok(found("/add_book?success=true"))
}

pub async fn get_book(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Markup> {
    let book = state
        .db
        .get_book(id)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("book {} does not exist", id)))?;
    let author = state.db.get_author(book.author_id).await?;

    Ok(views::book_detail(&book, author.as_ref()))
}

pub async fn delete_book(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    if state.db.delete_book(id).await? {
        tracing::info!(book_id = id, "deleted book");
    } else {
        tracing::info!(book_id = id, "book already absent, nothing to delete");
    }
    Ok(found("/?deleted=true"))
}

pub async fn delete_author(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    if state.db.delete_author(id).await? {
        tracing::info!(author_id = id, "deleted author");
    } else {
        tracing::info!(author_id = id, "author already absent, nothing to delete");
    }
    Ok(found("/add_author?deleted=true"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::IN_MEMORY;
    use crate::model::{BookQuery, NewAuthor, NewBook};
    use crate::routes::routes;
    use axum::{Router, body::Body, http::Request};
    use tower::ServiceExt;

    async fn test_app() -> (Router, Arc<Database>) {
        let db = Arc::new(Database::open(std::path::Path::new(IN_MEMORY), true).await.unwrap());
        let app = routes().with_state(AppState { db: db.clone() });
        (app, db)
    }

    async fn seed(db: &Database) -> (i64, i64, i64) {
        let author = db
            .create_author(&NewAuthor {
                name: "Tolkien".to_string(),
                birth_date: None,
                death_date: None,
            })
            .await
            .unwrap();
        let hobbit = db
            .create_book(&NewBook {
                title: "The Hobbit".to_string(),
                author_id: author.id,
                publication_year: Some(1937),
                isbn: None,
            })
            .await
            .unwrap();
        let silmarillion = db
            .create_book(&NewBook {
                title: "Silmarillion".to_string(),
                author_id: author.id,
                publication_year: Some(1977),
                isbn: None,
            })
            .await
            .unwrap();
        (author.id, hobbit.id, silmarillion.id)
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn post_form(app: &Router, uri: &str, body: &str) -> Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    fn location(response: &Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    #[tokio::test]
    async fn test_healthcheck() {
        let (app, _) = test_app().await;
        let (status, body) = get(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_index_sort_by_publication_year() {
        let (app, db) = test_app().await;
        seed(&db).await;

        let (status, body) = get(&app, "/?sort_by=publication_year").await;
        assert_eq!(status, StatusCode::OK);
        let hobbit = body.find("The Hobbit").unwrap();
        let silmarillion = body.find("Silmarillion").unwrap();
        assert!(hobbit < silmarillion);
    }

    #[tokio::test]
    async fn test_index_default_sort_is_title() {
        let (app, db) = test_app().await;
        seed(&db).await;

        for uri in ["/", "/?sort_by=nonsense"] {
            let (_, body) = get(&app, uri).await;
            assert!(body.find("Silmarillion").unwrap() < body.find("The Hobbit").unwrap());
        }
    }

    #[tokio::test]
    async fn test_index_search() {
        let (app, db) = test_app().await;
        seed(&db).await;

        let (status, body) = get(&app, "/?search=Hobbit&sort_by=publication_year").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("The Hobbit"));
        assert!(!body.contains("Silmarillion"));
        assert!(!body.contains("No books found"));

        let (status, body) = get(&app, "/?search=Dune").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("No books found"));
    }

    #[tokio::test]
    async fn test_malformed_display_flags_still_render() {
        let (app, db) = test_app().await;
        seed(&db).await;

        for uri in ["/?deleted=1", "/?deleted=", "/?deleted=yes"] {
            let (status, body) = get(&app, uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert!(body.contains("The Hobbit"), "{uri}");
            assert!(!body.contains("Book deleted successfully."), "{uri}");
        }

        let (status, body) = get(&app, "/add_book?success=yes").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("Book added successfully."));

        let (status, _) = get(&app, "/add_author?success=1&deleted=").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_add_author_redirects() {
        let (app, db) = test_app().await;

        let response = post_form(&app, "/add_author", "name=+Tolkien+&birth_date=1892-01-03&death_date=").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/add_author?success=true");

        let authors = db.list_authors().await.unwrap();
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0].name, "Tolkien");
        assert_eq!(authors[0].death_date, None);

        let (status, body) = get(&app, "/add_author?success=true").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Author added successfully."));
    }

    #[tokio::test]
    async fn test_add_author_missing_name_is_bad_request() {
        let (app, db) = test_app().await;

        let response = post_form(&app, "/add_author", "birth_date=1892-01-03").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(db.list_authors().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_book_form_lists_authors() {
        let (app, db) = test_app().await;
        seed(&db).await;

        let (status, body) = get(&app, "/add_book").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("1. Tolkien"));
    }

    #[tokio::test]
    async fn test_add_book_redirects() {
        let (app, db) = test_app().await;
        let (author_id, _, _) = seed(&db).await;

        let body = format!("title=+Unfinished+Tales+&author_id={}&publication_year=1980&isbn=", author_id);
        let response = post_form(&app, "/add_book", &body).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/add_book?success=true");

        let books = db.list_books(&BookQuery::default()).await.unwrap();
        let added: Vec<_> = books.iter().filter(|b| b.book.title == "Unfinished Tales").collect();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].book.author_id, author_id);
        assert_eq!(added[0].book.isbn, None);
    }

    #[tokio::test]
    async fn test_add_book_rejections() {
        let (app, _) = test_app().await;

        let response = post_form(&app, "/add_book", "author_id=1").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = post_form(&app, "/add_book", "title=Orphan&author_id=404").await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_delete_book_is_idempotent() {
        let (app, db) = test_app().await;
        let (_, hobbit, _) = seed(&db).await;

        for _ in 0..2 {
            let response = post_form(&app, &format!("/book/{}/delete", hobbit), "").await;
            assert_eq!(response.status(), StatusCode::FOUND);
            assert_eq!(location(&response), "/?deleted=true");
        }
        assert_eq!(db.get_book(hobbit).await.unwrap(), None);

        let (_, body) = get(&app, "/?deleted=true").await;
        assert!(body.contains("Book deleted successfully."));
        assert!(!body.contains("The Hobbit"));
    }

    #[tokio::test]
    async fn test_get_book() {
        let (app, db) = test_app().await;
        let (_, hobbit, _) = seed(&db).await;

        let (status, body) = get(&app, &format!("/book/{}", hobbit)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("The Hobbit"));
        assert!(body.contains("1. Tolkien"));

        let (status, _) = get(&app, "/book/9999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_author_conflict() {
        let (app, db) = test_app().await;
        let (author_id, hobbit, silmarillion) = seed(&db).await;

        let response = post_form(&app, &format!("/author/{}/delete", author_id), "").await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        db.delete_book(hobbit).await.unwrap();
        db.delete_book(silmarillion).await.unwrap();

        let response = post_form(&app, &format!("/author/{}/delete", author_id), "").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/add_author?deleted=true");
        assert!(db.list_authors().await.unwrap().is_empty());
    }
}
