use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use umin_core::action::{ExecutionResult, Notice, RawResponse, Transport};
use umin_core::dispatch::{BulkRequest, DispatchOutcome};

use crate::error::PageError;
use crate::routes::blocking_page;
use crate::state::{self, AppState};

/// POST /{model}/actions: run a bulk action over the checked rows.
///
/// Form fields: `action`, repeated `_selected_action`, and on the
/// confirming resubmission `confirm=yes` plus `token`.
pub async fn bulk_action(
    State(app): State<AppState>,
    Path(model): Path<String>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, PageError> {
    let caller = state::caller(&headers);
    let transport = state::transport(&headers);
    let dispatcher = app.dispatcher.clone();
    let name = model.clone();
    let outcome = blocking_page(&app, &model, transport, move || {
        let request = BulkRequest::from_form(name, &pairs, transport)?;
        dispatcher.dispatch(&caller, &request)
    })
    .await?;

    let list_url = format!("/{model}/");
    Ok(respond(outcome, &list_url, transport))
}

fn respond(outcome: DispatchOutcome, list_url: &str, transport: Transport) -> Response {
    match outcome.result {
        ExecutionResult::Redirect => redirect(list_url, transport, &outcome.notices),
        ExecutionResult::Raw(raw) => download(raw),
        ExecutionResult::Fragment(html) => Html(html).into_response(),
    }
}

/// Back to the list. htmx follows `HX-Redirect` instead of a 303.
pub(crate) fn redirect(list_url: &str, transport: Transport, notices: &[Notice]) -> Response {
    match transport {
        Transport::FullPage => Redirect::to(list_url).into_response(),
        Transport::Fragment => {
            let mut response = StatusCode::OK.into_response();
            if let Ok(v) = HeaderValue::from_str(list_url) {
                response.headers_mut().insert("hx-redirect", v);
            }
            if let Some(trigger) = show_message(notices) {
                response.headers_mut().insert("hx-trigger", trigger);
            }
            response
        }
    }
}

/// `HX-Trigger` payload raising a `showMessage` event for the last notice.
pub(crate) fn show_message(notices: &[Notice]) -> Option<HeaderValue> {
    let notice = notices.last()?;
    let payload = serde_json::json!({ "showMessage": notice });
    HeaderValue::from_str(&payload.to_string()).ok()
}

fn download(raw: RawResponse) -> Response {
    let mut response = (StatusCode::OK, raw.body).into_response();
    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&raw.content_type) {
        headers.insert(header::CONTENT_TYPE, v);
    }
    if let Some(filename) = raw.filename {
        let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
        if let Ok(v) = HeaderValue::from_str(&disposition) {
            headers.insert(header::CONTENT_DISPOSITION, v);
        }
    }
    response
}
