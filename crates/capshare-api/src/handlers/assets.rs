//! Embedded static pages.

use crate::auth::{validate_access, AccessQuery};
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::{Html, IntoResponse},
};
use capshare_core::Permission;
use std::sync::Arc;

const UPLOAD_HTML: &str = include_str!("../../assets/upload.html");
const GENERATE_HTML: &str = include_str!("../../assets/generate.html");
const FORM_CSS: &str = include_str!("../../assets/form.css");

/// Upload form; only shown to holders of a valid write grant.
#[tracing::instrument(skip(state, query), fields(operation = "upload_form"))]
pub async fn upload_form(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AccessQuery>, QueryRejection>,
) -> Result<Html<&'static str>, HttpAppError> {
    let now = chrono::Utc::now().timestamp();
    let query = AccessQuery::from_extractor(query)?;
    validate_access(&state.config.users, &query, Permission::Write, now)?;
    Ok(Html(UPLOAD_HTML))
}

pub async fn generate_page() -> Html<&'static str> {
    Html(GENERATE_HTML)
}

pub async fn form_css() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], FORM_CSS)
}
