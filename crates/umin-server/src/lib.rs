pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with the admin pages, the JSON API and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // JSON API
        .route("/api/models", get(routes::api::list_models))
        .route("/api/{model}/actions", get(routes::api::list_actions))
        .route("/api/{model}/records", get(routes::api::list_records))
        // Admin pages
        .route("/", get(routes::pages::index))
        .route("/{model}", get(routes::pages::list_page))
        .route("/{model}/", get(routes::pages::list_page))
        .route("/{model}/actions", post(routes::actions::bulk_action))
        .route(
            "/{model}/create",
            get(routes::records::create_form).post(routes::records::create_record),
        )
        .route(
            "/{model}/{id}",
            get(routes::records::edit_form).post(routes::records::update_record),
        )
        .route("/{model}/{id}/delete", post(routes::records::delete_record))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the admin server for the site configured under `root`.
pub async fn serve(root: PathBuf, port: u16, open_browser: bool) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(root, listener, open_browser).await
}

/// Start the admin server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(
    root: PathBuf,
    listener: tokio::net::TcpListener,
    open_browser: bool,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app_state = AppState::load(&root)?;
    let app = build_router(app_state);

    tracing::info!("umin admin listening on http://localhost:{actual_port}");

    if open_browser {
        let url = format!("http://localhost:{actual_port}");
        let _ = open::that(&url);
    }

    axum::serve(listener, app).await?;
    Ok(())
}
