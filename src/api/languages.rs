//! Supported language listing

use axum::{Json, Router, routing::get};

use crate::language::{LANGUAGES, Language};

/// Build languages router
pub fn router() -> Router {
    Router::new().route("/", get(list))
}

/// List the languages clients may select
async fn list() -> Json<&'static [Language]> {
    Json(LANGUAGES)
}
