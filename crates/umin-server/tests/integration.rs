use axum::http::{header, StatusCode};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use umin_core::config::Config;
use umin_core::model::ModelConfig;
use umin_core::permission::Operation;
use umin_core::record::Record;
use umin_core::store::{RecordStore, YamlStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Bootstrap a site with one `book` model and three records. Anyone may
/// view; only `admin` may add, change and delete.
fn init_site(dir: &TempDir) -> YamlStore {
    let mut config = Config::new("library");
    config.secret_key = Some("integration-secret".into());
    config
        .permissions
        .insert("*".into(), vec![Operation::View]);
    config
        .permissions
        .insert("admin".into(), Operation::all().to_vec());
    let mut book = ModelConfig::new("book");
    book.label_field = Some("title".into());
    book.fields = vec!["title".into(), "author".into()];
    book.list_display = vec!["title".into(), "author".into()];
    book.search_fields = vec!["title".into(), "author".into()];
    config.models.push(book);
    config.save(dir.path()).unwrap();

    let store = YamlStore::new(config.data_dir(dir.path()));
    for (id, title, author) in [(7, "Dune", "Herbert"), (9, "Emma", "Austen"), (12, "Ubik", "Dick")] {
        store
            .insert(
                "book",
                Record::new(id)
                    .with_field("title", title)
                    .with_field("author", author),
            )
            .unwrap();
    }
    store
}

fn app(dir: &TempDir) -> axum::Router {
    let state = umin_server::AppState::load(dir.path()).unwrap();
    umin_server::build_router(state)
}

struct Reply {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: String,
}

async fn send(app: axum::Router, req: axum::http::Request<axum::body::Body>) -> Reply {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    Reply {
        status,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    }
}

async fn get(app: axum::Router, uri: &str, htmx: bool) -> Reply {
    get_as(app, uri, "anonymous", htmx).await
}

async fn get_as(app: axum::Router, uri: &str, user: &str, htmx: bool) -> Reply {
    let mut req = axum::http::Request::builder()
        .uri(uri)
        .header("x-umin-user", user);
    if htmx {
        req = req.header("hx-request", "true");
    }
    send(app, req.body(axum::body::Body::empty()).unwrap()).await
}

/// POST a urlencoded form as `user`.
async fn post_form(
    app: axum::Router,
    uri: &str,
    user: &str,
    htmx: bool,
    fields: &[(&str, &str)],
) -> Reply {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let mut req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .header("x-umin-user", user);
    if htmx {
        req = req.header("hx-request", "true");
    }
    send(app, req.body(axum::body::Body::from(body)).unwrap()).await
}

fn embedded_token(html: &str) -> String {
    let marker = "name=\"token\" value=\"";
    let start = html.find(marker).expect("token input") + marker.len();
    let end = html[start..].find('"').unwrap();
    html[start..start + end].to_string()
}

fn count(store: &YamlStore) -> usize {
    store
        .filter("book", &umin_core::record::Filter::All)
        .unwrap()
        .len()
}

// ---------------------------------------------------------------------------
// List page and API
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_page_renders_full_page_and_fragment() {
    let dir = TempDir::new().unwrap();
    init_site(&dir);

    let page = get(app(&dir), "/book/", false).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("<html>"));
    assert!(page.body.contains("<td>Dune</td>"));
    assert!(page.body.contains("Delete selected items"));

    let fragment = get(app(&dir), "/book/?q=emma", true).await;
    assert_eq!(fragment.status, StatusCode::OK);
    assert!(!fragment.body.contains("<html>"));
    assert!(fragment.body.contains("<td>Emma</td>"));
    assert!(!fragment.body.contains("<td>Dune</td>"));
}

#[tokio::test]
async fn unknown_model_is_404() {
    let dir = TempDir::new().unwrap();
    init_site(&dir);
    assert_eq!(get(app(&dir), "/author/", false).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        get(app(&dir), "/api/author/actions", false).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn api_lists_models_actions_and_records() {
    let dir = TempDir::new().unwrap();
    init_site(&dir);

    let models: serde_json::Value =
        serde_json::from_str(&get(app(&dir), "/api/models", false).await.body).unwrap();
    assert_eq!(models[0]["name"], "book");
    assert_eq!(models[0]["list_url"], "/book/");

    let actions: serde_json::Value =
        serde_json::from_str(&get(app(&dir), "/api/book/actions", false).await.body).unwrap();
    assert_eq!(actions[0]["name"], "delete_selected");
    assert_eq!(actions[1]["name"], "export_csv");

    let page: serde_json::Value =
        serde_json::from_str(&get(app(&dir), "/api/book/records?q=dick", false).await.body)
            .unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["records"][0]["id"], 12);
}

// ---------------------------------------------------------------------------
// Bulk actions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_round_trip_with_vanished_record() {
    let dir = TempDir::new().unwrap();
    let store = init_site(&dir);

    let prompt = post_form(
        app(&dir),
        "/book/actions",
        "admin",
        true,
        &[
            ("action", "delete_selected"),
            ("_selected_action", "7"),
            ("_selected_action", "9"),
        ],
    )
    .await;
    assert_eq!(prompt.status, StatusCode::OK);
    assert!(prompt.body.contains("delete 2 books"));
    assert_eq!(count(&store), 3);

    let token = embedded_token(&prompt.body);
    store.delete("book", &[9]).unwrap();

    let done = post_form(
        app(&dir),
        "/book/actions",
        "admin",
        false,
        &[
            ("action", "delete_selected"),
            ("_selected_action", "7"),
            ("_selected_action", "9"),
            ("confirm", "yes"),
            ("token", &token),
        ],
    )
    .await;
    assert_eq!(done.status, StatusCode::SEE_OTHER);
    assert_eq!(done.headers[header::LOCATION], "/book/");
    assert_eq!(count(&store), 1);
}

#[tokio::test]
async fn htmx_confirmed_delete_answers_hx_redirect() {
    let dir = TempDir::new().unwrap();
    let store = init_site(&dir);
    let prompt = post_form(
        app(&dir),
        "/book/actions",
        "admin",
        true,
        &[("action", "delete_selected"), ("_selected_action", "12")],
    )
    .await;
    let token = embedded_token(&prompt.body);

    let done = post_form(
        app(&dir),
        "/book/actions",
        "admin",
        true,
        &[
            ("action", "delete_selected"),
            ("_selected_action", "12"),
            ("confirm", "yes"),
            ("token", &token),
        ],
    )
    .await;
    assert_eq!(done.status, StatusCode::OK);
    assert_eq!(done.headers["hx-redirect"], "/book/");
    assert!(done.headers["hx-trigger"]
        .to_str()
        .unwrap()
        .contains("Successfully deleted 1 books."));
    assert_eq!(count(&store), 2);
}

#[tokio::test]
async fn delete_of_vanished_selection_reports_zero() {
    let dir = TempDir::new().unwrap();
    let store = init_site(&dir);
    let reply = post_form(
        app(&dir),
        "/book/actions",
        "admin",
        true,
        &[("action", "delete_selected"), ("_selected_action", "404")],
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers["hx-redirect"], "/book/");
    assert!(reply.headers["hx-trigger"]
        .to_str()
        .unwrap()
        .contains("Successfully deleted 0 books."));
    assert_eq!(count(&store), 3);
}

#[tokio::test]
async fn export_downloads_csv() {
    let dir = TempDir::new().unwrap();
    let store = init_site(&dir);
    let reply = post_form(
        app(&dir),
        "/book/actions",
        "anonymous",
        false,
        &[
            ("action", "export_csv"),
            ("_selected_action", "9"),
            ("_selected_action", "7"),
        ],
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"book_export.csv\""
    );
    assert_eq!(reply.body, "title,author\r\nDune,Herbert\r\nEmma,Austen\r\n");
    assert_eq!(count(&store), 3);
}

#[tokio::test]
async fn empty_selection_is_400_message() {
    let dir = TempDir::new().unwrap();
    init_site(&dir);
    let reply = post_form(
        app(&dir),
        "/book/actions",
        "admin",
        true,
        &[("action", "export_csv")],
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body.contains("no items selected"));
    assert!(!reply.body.contains("<html>"));
}

#[tokio::test]
async fn unknown_action_and_bad_token_are_400() {
    let dir = TempDir::new().unwrap();
    let store = init_site(&dir);
    let unknown = post_form(
        app(&dir),
        "/book/actions",
        "admin",
        false,
        &[("action", "drop_table"), ("_selected_action", "7")],
    )
    .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert!(unknown.body.contains("drop_table"));

    let forged = post_form(
        app(&dir),
        "/book/actions",
        "admin",
        false,
        &[
            ("action", "delete_selected"),
            ("_selected_action", "7"),
            ("confirm", "yes"),
            ("token", "forged"),
        ],
    )
    .await;
    assert_eq!(forged.status, StatusCode::BAD_REQUEST);
    assert_eq!(count(&store), 3);
}

#[tokio::test]
async fn delete_without_permission_is_403() {
    let dir = TempDir::new().unwrap();
    let store = init_site(&dir);
    let reply = post_form(
        app(&dir),
        "/book/actions",
        "anonymous",
        false,
        &[("action", "delete_selected"), ("_selected_action", "7")],
    )
    .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert!(reply.body.contains("permission denied"));
    assert_eq!(count(&store), 3);
}

// ---------------------------------------------------------------------------
// Single-record delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_delete_full_page_redirects() {
    let dir = TempDir::new().unwrap();
    let store = init_site(&dir);
    let reply = post_form(app(&dir), "/book/7/delete", "admin", false, &[]).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(count(&store), 2);

    let missing = post_form(app(&dir), "/book/7/delete", "admin", false, &[]).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn single_delete_htmx_rerenders_list() {
    let dir = TempDir::new().unwrap();
    init_site(&dir);
    let reply = post_form(app(&dir), "/book/9/delete", "admin", true, &[]).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("Emma was deleted successfully."));
    assert!(!reply.body.contains("<td>Emma</td>"));
    assert!(reply.headers["hx-trigger"]
        .to_str()
        .unwrap()
        .contains("showMessage"));
}

// ---------------------------------------------------------------------------
// Create and update
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_form_needs_add_permission() {
    let dir = TempDir::new().unwrap();
    init_site(&dir);
    let denied = get(app(&dir), "/book/create", false).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let form = get_as(app(&dir), "/book/create", "admin", true).await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("<h1>Create book</h1>"));
    assert!(form.body.contains("name=\"title\" value=\"\""));
}

#[tokio::test]
async fn create_saves_and_redirects() {
    let dir = TempDir::new().unwrap();
    let store = init_site(&dir);
    let fields = [("title", "Solaris"), ("author", "Lem")];

    let denied = post_form(app(&dir), "/book/create", "anonymous", false, &fields).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(count(&store), 3);

    let reply = post_form(app(&dir), "/book/create", "admin", false, &fields).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.headers[header::LOCATION], "/book/");
    let created = store.get("book", 13).unwrap().unwrap();
    assert_eq!(created.display("title"), "Solaris");
}

#[tokio::test]
async fn create_with_unknown_field_is_400() {
    let dir = TempDir::new().unwrap();
    let store = init_site(&dir);
    let reply = post_form(app(&dir), "/book/create", "admin", true, &[("isbn", "1")]).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body.contains("unknown field"));
    assert_eq!(count(&store), 3);
}

#[tokio::test]
async fn edit_form_is_prefilled() {
    let dir = TempDir::new().unwrap();
    init_site(&dir);
    let form = get_as(app(&dir), "/book/9", "admin", false).await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("<title>Update book</title>"));
    assert!(form.body.contains("name=\"author\" value=\"Austen\""));

    let missing = get_as(app(&dir), "/book/404", "admin", false).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn htmx_update_answers_hx_redirect_with_message() {
    let dir = TempDir::new().unwrap();
    let store = init_site(&dir);
    let reply = post_form(app(&dir), "/book/7", "admin", true, &[("title", "Dune Messiah")]).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers["hx-redirect"], "/book/");
    assert!(reply.headers["hx-trigger"]
        .to_str()
        .unwrap()
        .contains("Dune Messiah was updated successfully."));
    let updated = store.get("book", 7).unwrap().unwrap();
    assert_eq!(updated.display("title"), "Dune Messiah");
    assert_eq!(updated.display("author"), "Herbert");

    let denied = post_form(app(&dir), "/book/7", "anonymous", true, &[("title", "x")]).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
}
