pub mod actions;
pub mod api;
pub mod pages;
pub mod records;

use crate::error::PageError;
use crate::state::AppState;
use umin_core::action::Transport;

/// Run blocking store work off the async runtime, answering failures with
/// an HTML message page.
pub(crate) async fn blocking_page<T, F>(
    app: &AppState,
    model: &str,
    transport: Transport,
    work: F,
) -> Result<T, PageError>
where
    T: Send + 'static,
    F: FnOnce() -> umin_core::Result<T> + Send + 'static,
{
    let result = match tokio::task::spawn_blocking(work).await {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(e)) => anyhow::Error::from(e),
        Err(e) => anyhow::anyhow!("task join error: {e}"),
    };
    Err(PageError::render(&app.dispatcher, result, Some(model), transport))
}
