use axum::http::HeaderMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use umin_core::action::Transport;
use umin_core::config::Config;
use umin_core::dispatch::Dispatcher;
use umin_core::permission::Caller;
use umin_core::registry::ActionRegistry;

/// Header carrying the acting principal, set by the fronting auth layer.
pub const USER_HEADER: &str = "x-umin-user";

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(root: PathBuf, dispatcher: Dispatcher) -> Self {
        Self {
            root,
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Build the state from `.umin/config.yaml` under `root`, with the
    /// built-in actions registered.
    pub fn load(root: &Path) -> umin_core::Result<Self> {
        let config = Config::load(root)?;
        let dispatcher = Dispatcher::from_config(root, &config, ActionRegistry::with_builtins())?;
        tracing::debug!(
            models = dispatcher.models().len(),
            actions = dispatcher.actions().len(),
            "admin site loaded"
        );
        Ok(Self::new(root.to_path_buf(), dispatcher))
    }
}

/// The caller named by [`USER_HEADER`], or `anonymous`.
pub fn caller(headers: &HeaderMap) -> Caller {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(Caller::new)
        .unwrap_or_else(Caller::anonymous)
}

pub fn transport(headers: &HeaderMap) -> Transport {
    Transport::from_hx_request(headers.get("hx-request").and_then(|v| v.to_str().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn caller_defaults_to_anonymous() {
        let mut headers = HeaderMap::new();
        assert_eq!(caller(&headers), Caller::anonymous());
        headers.insert(USER_HEADER, HeaderValue::from_static("  "));
        assert_eq!(caller(&headers), Caller::anonymous());
        headers.insert(USER_HEADER, HeaderValue::from_static("alice"));
        assert_eq!(caller(&headers), Caller::new("alice"));
    }

    #[test]
    fn transport_follows_hx_request() {
        let mut headers = HeaderMap::new();
        assert_eq!(transport(&headers), Transport::FullPage);
        headers.insert("hx-request", HeaderValue::from_static("true"));
        assert_eq!(transport(&headers), Transport::Fragment);
    }
}
