use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use umin_core::action::Transport;
use umin_core::query::ListQuery;

use crate::error::PageError;
use crate::routes::actions::{redirect, show_message};
use crate::routes::blocking_page;
use crate::state::{self, AppState};

/// POST /{model}/{id}/delete: delete one record.
///
/// htmx callers get the refreshed list fragment and a `showMessage`
/// trigger; full-page callers are sent back to the list.
pub async fn delete_record(
    State(app): State<AppState>,
    Path((model, id)): Path<(String, i64)>,
    headers: HeaderMap,
) -> Result<Response, PageError> {
    let caller = state::caller(&headers);
    let transport = state::transport(&headers);
    let dispatcher = app.dispatcher.clone();
    let name = model.clone();
    let (notice, html) = blocking_page(&app, &model, transport, move || {
        let notice = dispatcher.delete_one(&caller, &name, id)?;
        let html = match transport {
            Transport::Fragment => Some(dispatcher.list_page(
                &caller,
                &name,
                &ListQuery::default(),
                transport,
                std::slice::from_ref(&notice),
            )?),
            Transport::FullPage => None,
        };
        Ok((notice, html))
    })
    .await?;

    let Some(html) = html else {
        return Ok(redirect(&format!("/{model}/"), transport, &[notice]));
    };
    let mut response = Html(html).into_response();
    if let Some(trigger) = show_message(&[notice]) {
        response.headers_mut().insert("hx-trigger", trigger);
    }
    Ok(response)
}

/// GET /{model}/create: empty form for a new record.
pub async fn create_form(
    State(app): State<AppState>,
    Path(model): Path<String>,
    headers: HeaderMap,
) -> Result<Html<String>, PageError> {
    form(app, model, None, headers).await
}

/// GET /{model}/{id}: edit form for one record.
pub async fn edit_form(
    State(app): State<AppState>,
    Path((model, id)): Path<(String, i64)>,
    headers: HeaderMap,
) -> Result<Html<String>, PageError> {
    form(app, model, Some(id), headers).await
}

async fn form(
    app: AppState,
    model: String,
    id: Option<i64>,
    headers: HeaderMap,
) -> Result<Html<String>, PageError> {
    let caller = state::caller(&headers);
    let transport = state::transport(&headers);
    let dispatcher = app.dispatcher.clone();
    let name = model.clone();
    let html = blocking_page(&app, &model, transport, move || {
        dispatcher.form_page(&caller, &name, id, transport)
    })
    .await?;
    Ok(Html(html))
}

/// POST /{model}/create: save a new record and go back to the list.
pub async fn create_record(
    State(app): State<AppState>,
    Path(model): Path<String>,
    headers: HeaderMap,
    Form(values): Form<Vec<(String, String)>>,
) -> Result<Response, PageError> {
    let caller = state::caller(&headers);
    let transport = state::transport(&headers);
    let dispatcher = app.dispatcher.clone();
    let name = model.clone();
    let (_, notice) = blocking_page(&app, &model, transport, move || {
        dispatcher.create_one(&caller, &name, &values)
    })
    .await?;
    Ok(redirect(&format!("/{model}/"), transport, &[notice]))
}

/// POST /{model}/{id}: save changes to one record and go back to the list.
pub async fn update_record(
    State(app): State<AppState>,
    Path((model, id)): Path<(String, i64)>,
    headers: HeaderMap,
    Form(values): Form<Vec<(String, String)>>,
) -> Result<Response, PageError> {
    let caller = state::caller(&headers);
    let transport = state::transport(&headers);
    let dispatcher = app.dispatcher.clone();
    let name = model.clone();
    let (_, notice) = blocking_page(&app, &model, transport, move || {
        dispatcher.update_one(&caller, &name, id, &values)
    })
    .await?;
    Ok(redirect(&format!("/{model}/"), transport, &[notice]))
}
