use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use umin_core::action::{NoticeLevel, Transport};
use umin_core::dispatch::Dispatcher;
use umin_core::UminError;

/// HTTP status for a core error.
pub fn status_for(e: &UminError) -> StatusCode {
    match e {
        UminError::ModelNotFound(_) | UminError::RecordNotFound { .. } => StatusCode::NOT_FOUND,
        UminError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        UminError::NotInitialized => StatusCode::BAD_REQUEST,
        e if e.is_user_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn describe(status: StatusCode, err: &anyhow::Error) -> String {
    if status.is_server_error() {
        tracing::error!("request failed: {err:#}");
        "internal server error".to_string()
    } else {
        err.to_string()
    }
}

// ---------------------------------------------------------------------------
// AppError: JSON API errors
// ---------------------------------------------------------------------------

/// Unified error type for JSON responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        self.0
            .downcast_ref::<UminError>()
            .map(status_for)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "error": describe(status, &self.0) });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// ---------------------------------------------------------------------------
// PageError: HTML errors for the admin pages
// ---------------------------------------------------------------------------

/// Error answered with a rendered message page (or fragment, for htmx).
#[derive(Debug)]
pub struct PageError {
    pub status: StatusCode,
    pub body: String,
}

impl PageError {
    pub fn render(
        dispatcher: &Dispatcher,
        err: anyhow::Error,
        model: Option<&str>,
        transport: Transport,
    ) -> Self {
        let status = err
            .downcast_ref::<UminError>()
            .map(status_for)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = describe(status, &err);
        let level = if status.is_server_error() {
            NoticeLevel::Error
        } else {
            NoticeLevel::Warning
        };
        let body = dispatcher
            .message_page(level, &message, model, transport)
            .unwrap_or_else(|e| {
                tracing::error!("cannot render error page: {e}");
                umin_core::render::escape(&message)
            });
        Self { status, body }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        (self.status, Html(self.body)).into_response()
    }
}
