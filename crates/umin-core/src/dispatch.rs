//! Bulk-action dispatch.
//!
//! One submission goes through: selection check, action lookup,
//! confirmation check, execution, and result classification. The
//! dispatcher itself never touches the store; only actions do.

use crate::action::{ActionContext, Confirmation, ExecutionResult, Notice, Transport};
use crate::config::Config;
use crate::error::{Result, UminError};
use crate::model::ModelRegistry;
use crate::permission::{AllowAll, Caller, PermissionTable, Permissions};
use crate::record::{Filter, RecordId};
use crate::registry::ActionRegistry;
use crate::render::{BuiltinRenderer, Renderer};
use crate::store::{RecordStore, YamlStore};
use crate::token::{self, TokenSigner};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

/// Form field carrying the action name.
pub const ACTION_FIELD: &str = "action";
/// Form field carrying one selected id; repeated once per selected record.
pub const SELECTION_FIELD: &str = "_selected_action";
/// Form field set to `yes` on a confirming resubmission.
pub const CONFIRM_FIELD: &str = "confirm";
/// Form field carrying the confirmation token.
pub const TOKEN_FIELD: &str = "token";

// ---------------------------------------------------------------------------
// Request / outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    /// List page with checkboxes and the action chooser.
    Idle,
    /// A prompt was rendered; waiting for the caller to resubmit.
    AwaitingConfirmation,
    /// A result has been produced for this request.
    Executed,
}

/// One bulk-action submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkRequest {
    pub model: String,
    pub action: String,
    pub selected: Vec<RecordId>,
    /// The caller claims to be confirming (`confirm=yes`).
    pub confirm: bool,
    pub token: Option<String>,
    pub transport: Transport,
}

impl BulkRequest {
    pub fn new(model: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            action: action.into(),
            selected: Vec::new(),
            confirm: false,
            token: None,
            transport: Transport::FullPage,
        }
    }

    pub fn select(mut self, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.selected.extend(ids);
        self
    }

    pub fn confirmed(mut self, token: impl Into<String>) -> Self {
        self.confirm = true;
        self.token = Some(token.into());
        self
    }

    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Build a request from submitted form pairs. Repeated selection fields
    /// accumulate; blank values are ignored.
    pub fn from_form(
        model: impl Into<String>,
        pairs: &[(String, String)],
        transport: Transport,
    ) -> Result<Self> {
        let mut request = Self::new(model, "").transport(transport);
        for (key, value) in pairs {
            let value = value.trim();
            match key.as_str() {
                ACTION_FIELD => request.action = value.to_string(),
                SELECTION_FIELD if !value.is_empty() => {
                    let id = value
                        .parse::<RecordId>()
                        .map_err(|_| UminError::InvalidSelection(value.to_string()))?;
                    request.selected.push(id);
                }
                CONFIRM_FIELD => request.confirm = value == "yes",
                TOKEN_FIELD if !value.is_empty() => request.token = Some(value.to_string()),
                _ => {}
            }
        }
        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub state: DispatchState,
    pub result: ExecutionResult,
    pub notices: Vec<Notice>,
    /// Records changed (or exported) by the action, when it reports one.
    pub affected: Option<usize>,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Owns the admin site's collaborators and routes bulk submissions to
/// actions. Read-only after construction; share it behind an `Arc`.
pub struct Dispatcher {
    pub(crate) site_name: String,
    pub(crate) models: ModelRegistry,
    pub(crate) actions: ActionRegistry,
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) permissions: Arc<dyn Permissions>,
    pub(crate) renderer: Arc<dyn Renderer>,
    pub(crate) signer: TokenSigner,
}

impl Dispatcher {
    /// A dispatcher that allows everything and renders with the built-in
    /// templates. Swap collaborators with the `with_*` builders.
    pub fn new(
        models: ModelRegistry,
        actions: ActionRegistry,
        store: Arc<dyn RecordStore>,
        signer: TokenSigner,
    ) -> Self {
        Self {
            site_name: "umin".to_string(),
            models,
            actions,
            store,
            permissions: Arc::new(AllowAll),
            renderer: Arc::new(BuiltinRenderer),
            signer,
        }
    }

    /// Wire up the YAML store, the permission table and the signing secret
    /// described by `config`.
    pub fn from_config(root: &Path, config: &Config, actions: ActionRegistry) -> Result<Self> {
        let mut models = ModelRegistry::new();
        for model in &config.models {
            models.register(model.clone())?;
        }
        let secret = match config.secret() {
            Some(secret) => secret,
            None => {
                // Tokens signed with a generated key stop verifying after a restart.
                tracing::warn!("no secret key configured; using an ephemeral one");
                token::generate_secret()
            }
        };
        let store = YamlStore::new(config.data_dir(root));
        Ok(Self::new(models, actions, Arc::new(store), TokenSigner::new(secret))
            .with_site_name(&config.site.name)
            .with_permissions(Arc::new(PermissionTable::from_config(&config.permissions))))
    }

    pub fn with_site_name(mut self, name: impl Into<String>) -> Self {
        self.site_name = name.into();
        self
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn Permissions>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Handle one bulk-action submission.
    ///
    /// Caller mistakes (nothing selected, unknown action, missing or stale
    /// token) come back as user errors. An action that fails for any other
    /// reason, panics included, is reported as `ActionFailed`; permission
    /// denials pass through unchanged.
    pub fn dispatch(&self, caller: &Caller, request: &BulkRequest) -> Result<DispatchOutcome> {
        let model = self.models.get(&request.model)?;

        if request.selected.is_empty() {
            tracing::warn!(model = %model.name, action = %request.action, "nothing selected");
            return Err(UminError::NothingSelected);
        }

        let action = self.actions.resolve_for(model, &request.action).inspect_err(|e| {
            tracing::warn!(model = %model.name, "{e}");
        })?;

        let selection = Filter::ids(request.selected.iter().copied());
        let confirmation = self.confirmation(&model.name, request, &selection)?;
        tracing::debug!(
            model = %model.name,
            action = %request.action,
            selected = request.selected.len(),
            ?confirmation,
            "dispatching"
        );

        let mut ctx = ActionContext::new(
            caller,
            model,
            &request.action,
            confirmation,
            request.transport,
            &self.site_name,
            self.store.as_ref(),
            self.permissions.as_ref(),
            self.renderer.as_ref(),
            &self.signer,
        );
        let executed = catch_unwind(AssertUnwindSafe(|| action.execute(&mut ctx, &selection)));
        let result = match executed {
            Ok(Ok(result)) => result,
            Ok(Err(e)) if e.is_user_error() || matches!(e, UminError::PermissionDenied(_)) => {
                tracing::warn!(model = %model.name, action = %request.action, "{e}");
                return Err(e);
            }
            Ok(Err(e)) => {
                tracing::error!(model = %model.name, action = %request.action, error = %e, "action failed");
                return Err(UminError::ActionFailed {
                    action: request.action.clone(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                tracing::error!(model = %model.name, action = %request.action, "action panicked");
                return Err(UminError::ActionFailed {
                    action: request.action.clone(),
                    reason: "internal error".to_string(),
                });
            }
        };

        let state = match (&result, confirmation) {
            (ExecutionResult::Fragment(_), Confirmation::Unconfirmed) => {
                DispatchState::AwaitingConfirmation
            }
            _ => DispatchState::Executed,
        };
        let (notices, affected) = ctx.into_report();
        tracing::info!(
            model = %model.name,
            action = %request.action,
            result = result.kind(),
            ?state,
            ?affected,
            "bulk action"
        );

        Ok(DispatchOutcome {
            state,
            result,
            notices,
            affected,
        })
    }

    fn confirmation(
        &self,
        model: &str,
        request: &BulkRequest,
        selection: &Filter,
    ) -> Result<Confirmation> {
        match (&request.token, request.confirm) {
            (Some(token), _) => {
                if self.signer.verify(model, &request.action, selection, token) {
                    Ok(Confirmation::Confirmed)
                } else {
                    Err(UminError::InvalidConfirmation)
                }
            }
            (None, true) => Err(UminError::MissingConfirmation),
            (None, false) => Ok(Confirmation::Unconfirmed),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::actions::testing::{book_model, book_records};
    use crate::permission::{Operation, ANY_CALLER};
    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        dispatcher: Dispatcher,
        caller: Caller,
    }

    fn fixture_with(actions: ActionRegistry) -> Fixture {
        let store = Arc::new(MemoryStore::new().with_records("book", book_records()));
        let models: ModelRegistry = [book_model()].into_iter().collect();
        let dispatcher = Dispatcher::new(
            models,
            actions,
            store.clone(),
            TokenSigner::new("test-secret-key"),
        );
        Fixture {
            store,
            dispatcher,
            caller: Caller::new("admin"),
        }
    }

    fn fixture() -> Fixture {
        fixture_with(ActionRegistry::with_builtins())
    }

    fn token_for(fx: &Fixture, ids: &[RecordId]) -> String {
        fx.dispatcher
            .signer()
            .sign("book", "delete_selected", &Filter::ids(ids.iter().copied()))
    }

    #[test]
    fn unconfigured_secret_is_random_per_dispatcher() {
        if std::env::var_os("UMIN_SECRET_KEY").is_some() {
            return;
        }
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::new("library");
        let build = || {
            Dispatcher::from_config(dir.path(), &config, ActionRegistry::with_builtins()).unwrap()
        };
        let (a, b) = (build(), build());
        let selection = Filter::ids([7]);
        let token = a.signer().sign("book", "delete_selected", &selection);
        assert!(a.signer().verify("book", "delete_selected", &selection, &token));
        assert!(!b.signer().verify("book", "delete_selected", &selection, &token));
    }

    #[test]
    fn unconfirmed_delete_awaits_confirmation() {
        let fx = fixture();
        let req = BulkRequest::new("book", "delete_selected")
            .select([7, 9])
            .transport(Transport::Fragment);
        let out = fx.dispatcher.dispatch(&fx.caller, &req).unwrap();

        assert_eq!(out.state, DispatchState::AwaitingConfirmation);
        let ExecutionResult::Fragment(html) = &out.result else {
            panic!("expected fragment, got {:?}", out.result);
        };
        assert!(html.contains("delete 2 books"));
        assert!(html.contains("data-id=\"7\""));
        assert!(html.contains("data-id=\"9\""));
        assert_eq!(fx.store.count("book"), 3);
    }

    #[test]
    fn confirmed_delete_tolerates_vanished_ids() {
        let fx = fixture();
        let token = token_for(&fx, &[7, 9]);
        fx.store.delete("book", &[9]).unwrap();

        let req = BulkRequest::new("book", "delete_selected")
            .select([7, 9])
            .confirmed(token);
        let out = fx.dispatcher.dispatch(&fx.caller, &req).unwrap();

        assert_eq!(out.state, DispatchState::Executed);
        assert_eq!(out.result, ExecutionResult::Redirect);
        assert_eq!(out.affected, Some(1));
        assert_eq!(out.notices[0].message, "Successfully deleted 1 books.");
        assert!(fx.store.get("book", 7).unwrap().is_none());
        assert!(fx.store.get("book", 12).unwrap().is_some());
    }

    #[test]
    fn confirmation_round_trip_uses_embedded_token() {
        let fx = fixture();
        let first = BulkRequest::new("book", "delete_selected").select([9, 7]);
        let out = fx.dispatcher.dispatch(&fx.caller, &first).unwrap();
        let ExecutionResult::Fragment(html) = out.result else {
            panic!("expected fragment");
        };
        let token = token_for(&fx, &[7, 9]);
        assert!(html.contains(&token));

        let second = first.clone().confirmed(token);
        let out = fx.dispatcher.dispatch(&fx.caller, &second).unwrap();
        assert_eq!(out.state, DispatchState::Executed);
        assert_eq!(out.affected, Some(2));
        assert_eq!(fx.store.count("book"), 1);
    }

    #[test]
    fn empty_selection_is_refused_before_lookup() {
        let fx = fixture();
        for action in ["delete_selected", "export_csv", "no_such_action"] {
            let req = BulkRequest::new("book", action);
            assert!(matches!(
                fx.dispatcher.dispatch(&fx.caller, &req),
                Err(UminError::NothingSelected)
            ));
        }
    }

    #[test]
    fn unknown_action_is_user_error() {
        let fx = fixture();
        for name in ["", "drop_table", "<script>"] {
            let req = BulkRequest::new("book", name).select([7]);
            let err = fx.dispatcher.dispatch(&fx.caller, &req).unwrap_err();
            assert!(err.is_user_error());
            assert!(matches!(err, UminError::ActionNotFound(_)));
        }
    }

    #[test]
    fn unknown_model_is_model_not_found() {
        let fx = fixture();
        let req = BulkRequest::new("author", "delete_selected").select([1]);
        assert!(matches!(
            fx.dispatcher.dispatch(&fx.caller, &req),
            Err(UminError::ModelNotFound(_))
        ));
    }

    #[test]
    fn confirm_without_token_is_missing_confirmation() {
        let fx = fixture();
        let mut req = BulkRequest::new("book", "delete_selected").select([7]);
        req.confirm = true;
        assert!(matches!(
            fx.dispatcher.dispatch(&fx.caller, &req),
            Err(UminError::MissingConfirmation)
        ));
        assert_eq!(fx.store.count("book"), 3);
    }

    #[test]
    fn token_for_other_selection_is_rejected() {
        let fx = fixture();
        let token = token_for(&fx, &[7]);
        let req = BulkRequest::new("book", "delete_selected")
            .select([7, 9, 12])
            .confirmed(token);
        assert!(matches!(
            fx.dispatcher.dispatch(&fx.caller, &req),
            Err(UminError::InvalidConfirmation)
        ));
        assert_eq!(fx.store.count("book"), 3);
    }

    #[test]
    fn export_executes_without_confirmation() {
        let fx = fixture();
        let req = BulkRequest::new("book", "export_csv").select([7, 9]);
        let out = fx.dispatcher.dispatch(&fx.caller, &req).unwrap();
        assert_eq!(out.state, DispatchState::Executed);
        let ExecutionResult::Raw(raw) = out.result else {
            panic!("expected raw");
        };
        assert_eq!(
            String::from_utf8(raw.body).unwrap(),
            "title,author\r\nDune,Herbert\r\nEmma,Austen\r\n"
        );
    }

    #[test]
    fn export_of_vanished_selection_is_header_only() {
        let fx = fixture();
        let req = BulkRequest::new("book", "export_csv").select([404, 405]);
        let out = fx.dispatcher.dispatch(&fx.caller, &req).unwrap();
        let ExecutionResult::Raw(raw) = out.result else {
            panic!("expected raw");
        };
        assert_eq!(String::from_utf8(raw.body).unwrap(), "title,author\r\n");
        assert_eq!(out.affected, Some(0));
    }

    #[test]
    fn permission_denial_passes_through() {
        let mut fx = fixture();
        fx.dispatcher = fx.dispatcher.with_permissions(Arc::new(
            PermissionTable::new().grant(ANY_CALLER, &[Operation::View]),
        ));
        let req = BulkRequest::new("book", "delete_selected").select([7]);
        assert!(matches!(
            fx.dispatcher.dispatch(&fx.caller, &req),
            Err(UminError::PermissionDenied(_))
        ));
    }

    struct Failing;

    impl Action for Failing {
        fn label(&self) -> &str {
            "Fail"
        }

        fn execute(&self, _: &mut ActionContext<'_>, _: &Filter) -> Result<ExecutionResult> {
            Err(UminError::Store("connection reset".into()))
        }
    }

    struct Panicking;

    impl Action for Panicking {
        fn label(&self) -> &str {
            "Panic"
        }

        fn execute(&self, _: &mut ActionContext<'_>, _: &Filter) -> Result<ExecutionResult> {
            panic!("bug in custom action")
        }
    }

    #[test]
    fn internal_action_failures_become_user_errors() {
        let mut actions = ActionRegistry::with_builtins();
        actions.register("fail", Failing);
        actions.register("panic", Panicking);
        let fx = fixture_with(actions);

        for name in ["fail", "panic"] {
            let req = BulkRequest::new("book", name).select([7]);
            let err = fx.dispatcher.dispatch(&fx.caller, &req).unwrap_err();
            assert!(err.is_user_error(), "{name}: {err}");
            assert!(matches!(err, UminError::ActionFailed { ref action, .. } if action == name));
        }
    }

    #[test]
    fn from_form_collects_repeated_selection() {
        let pairs: Vec<(String, String)> = [
            ("action", "delete_selected"),
            ("_selected_action", "7"),
            ("_selected_action", "9"),
            ("_selected_action", ""),
            ("confirm", "yes"),
            ("token", "abc"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let req = BulkRequest::from_form("book", &pairs, Transport::Fragment).unwrap();
        assert_eq!(
            req,
            BulkRequest::new("book", "delete_selected")
                .select([7, 9])
                .confirmed("abc")
                .transport(Transport::Fragment)
        );
    }

    #[test]
    fn from_form_rejects_non_numeric_ids() {
        let pairs = vec![("_selected_action".to_string(), "seven".to_string())];
        assert!(matches!(
            BulkRequest::from_form("book", &pairs, Transport::FullPage),
            Err(UminError::InvalidSelection(v)) if v == "seven"
        ));
    }
}
