use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use std::collections::BTreeMap;
use umin_core::query::ListQuery;

use crate::error::AppError;
use crate::state::{self, AppState};

/// GET /api/models: registered models in configuration order.
pub async fn list_models(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!(app.dispatcher.model_summaries()))
}

/// GET /api/{model}/actions: the action chooser for one model.
pub async fn list_actions(
    State(app): State<AppState>,
    Path(model): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let actions = app.dispatcher.actions_for(&model)?;
    Ok(Json(serde_json::json!(actions)))
}

/// GET /api/{model}/records: one page of records, same query parameters
/// as the list page.
pub async fn list_records(
    State(app): State<AppState>,
    Path(model): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let caller = state::caller(&headers);
    let query = ListQuery::from_params(params);
    let dispatcher = app.dispatcher.clone();
    let page = tokio::task::spawn_blocking(move || {
        dispatcher.list_records(&caller, &model, &query)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(serde_json::json!(page)))
}
