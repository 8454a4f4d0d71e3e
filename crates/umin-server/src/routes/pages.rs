use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use std::collections::BTreeMap;
use umin_core::query::ListQuery;

use crate::error::PageError;
use crate::routes::blocking_page;
use crate::state::{self, AppState};

/// GET /: send the caller to the first model's list.
pub async fn index(State(app): State<AppState>) -> Response {
    match app.dispatcher.models().iter().next() {
        Some(model) => Redirect::to(&model.list_url()).into_response(),
        None => Html(format!(
            "<h1>{}</h1>\n<p>No models configured.</p>\n",
            umin_core::render::escape(app.dispatcher.site_name())
        ))
        .into_response(),
    }
}

/// GET /{model}/: list page with checkboxes and the action chooser.
pub async fn list_page(
    State(app): State<AppState>,
    Path(model): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> Result<Html<String>, PageError> {
    let caller = state::caller(&headers);
    let transport = state::transport(&headers);
    let query = ListQuery::from_params(params);
    let dispatcher = app.dispatcher.clone();
    let name = model.clone();
    let html = blocking_page(&app, &model, transport, move || {
        dispatcher.list_page(&caller, &name, &query, transport, &[])
    })
    .await?;
    Ok(Html(html))
}
