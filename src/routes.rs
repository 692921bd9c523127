use axum::{
    Router,
    routing::{get, post},
};

use crate::handler::{self, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::index))
        .route("/health", get(handler::healthcheck))
        .route("/add_author", get(handler::show_add_author).post(handler::add_author))
        .route("/add_book", get(handler::show_add_book).post(handler::add_book))
        .route("/book/:id", get(handler::get_book))
        .route("/book/:id/delete", post(handler::delete_book))
        .route("/author/:id/delete", post(handler::delete_author))
}
