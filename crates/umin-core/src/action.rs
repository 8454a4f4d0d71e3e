use crate::error::{Result, UminError};
use crate::model::ModelConfig;
use crate::permission::{Caller, Operation, Permissions};
use crate::record::{Filter, Record, RecordId};
use crate::render::{Context, Renderer, FRAGMENT_SUFFIX};
use crate::store::RecordStore;
use crate::token::TokenSigner;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Request-derived state
// ---------------------------------------------------------------------------

/// Whether the caller has already accepted a destructive action's prompt.
/// Derived from the request on every submission, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    Unconfirmed,
    Confirmed,
}

/// What the caller expects back: a whole page or a fragment to swap in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    #[default]
    FullPage,
    Fragment,
}

impl Transport {
    /// htmx marks its requests with `HX-Request: true`.
    pub fn from_hx_request(header: Option<&str>) -> Self {
        match header {
            Some(v) if v.eq_ignore_ascii_case("true") => Transport::Fragment,
            _ => Transport::FullPage,
        }
    }

    /// Template id for this transport: `base` or its fragment variant.
    pub fn template_name(self, base: &str) -> String {
        match self {
            Transport::FullPage => base.to_string(),
            Transport::Fragment => format!("{base}{FRAGMENT_SUFFIX}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutionResult
// ---------------------------------------------------------------------------

/// A downloadable payload produced by an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub content_type: String,
    pub filename: Option<String>,
    pub body: Vec<u8>,
}

/// Exactly one of these comes back from every action execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Work is done; send the caller back to the list.
    Redirect,
    /// Hand the payload to the caller as-is (e.g. a file download).
    Raw(RawResponse),
    /// Rendered markup to show, typically a confirmation prompt.
    Fragment(String),
}

impl ExecutionResult {
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionResult::Redirect => "redirect",
            ExecutionResult::Raw(_) => "raw",
            ExecutionResult::Fragment(_) => "fragment",
        }
    }
}

// ---------------------------------------------------------------------------
// Notice
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeLevel::Success => "success",
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A one-off message for the caller, handed to the messaging layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A bulk operation over a selection of records.
///
/// Implementations decide for themselves whether they need confirmation:
/// a destructive action must not touch the store unless
/// `ctx.confirmation` is [`Confirmation::Confirmed`], and should answer an
/// unconfirmed call with a [`ExecutionResult::Fragment`] prompt instead.
/// Permission checks are the action's own job (see [`ActionContext::require`]).
pub trait Action: Send + Sync {
    /// Menu label. Mandatory.
    fn label(&self) -> &str;

    fn execute(&self, ctx: &mut ActionContext<'_>, selection: &Filter) -> Result<ExecutionResult>;
}

/// Everything an action may use while it runs. Built fresh for each
/// dispatch; nothing in here outlives the request.
pub struct ActionContext<'a> {
    pub caller: &'a Caller,
    pub model: &'a ModelConfig,
    /// Name the action was invoked under.
    pub action: &'a str,
    pub confirmation: Confirmation,
    pub transport: Transport,
    pub site_name: &'a str,
    pub store: &'a dyn RecordStore,
    pub permissions: &'a dyn Permissions,
    pub renderer: &'a dyn Renderer,
    pub signer: &'a TokenSigner,
    notices: Vec<Notice>,
    affected: Option<usize>,
}

impl<'a> ActionContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        caller: &'a Caller,
        model: &'a ModelConfig,
        action: &'a str,
        confirmation: Confirmation,
        transport: Transport,
        site_name: &'a str,
        store: &'a dyn RecordStore,
        permissions: &'a dyn Permissions,
        renderer: &'a dyn Renderer,
        signer: &'a TokenSigner,
    ) -> Self {
        Self {
            caller,
            model,
            action,
            confirmation,
            transport,
            site_name,
            store,
            permissions,
            renderer,
            signer,
            notices: Vec::new(),
            affected: None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmation == Confirmation::Confirmed
    }

    /// Fail with `PermissionDenied` unless the caller may perform `operation`
    /// on this model.
    pub fn require(&self, operation: Operation) -> Result<()> {
        if self.permissions.allowed(self.caller, operation, None) {
            return Ok(());
        }
        Err(UminError::PermissionDenied(format!(
            "'{}' may not {} {}",
            self.caller.name,
            operation,
            self.model.verbose_name_plural()
        )))
    }

    /// The records of the selection that still exist.
    pub fn resolve(&self, selection: &Filter) -> Result<Vec<Record>> {
        self.store.filter(&self.model.name, selection)
    }

    /// Token the caller must send back to confirm this action on `ids`.
    pub fn confirmation_token(&self, ids: impl IntoIterator<Item = RecordId>) -> String {
        self.signer
            .sign(&self.model.name, self.action, &Filter::ids(ids))
    }

    /// Render `base` in the variant matching the request transport. The
    /// site name and current notices are added to the context.
    pub fn render(&self, base: &str, mut context: Context) -> Result<String> {
        context
            .entry("site_name")
            .or_insert_with(|| self.site_name.into());
        context
            .entry("notices")
            .or_insert_with(|| serde_json::to_value(&self.notices).unwrap_or_default());
        self.renderer
            .render(&self.transport.template_name(base), &context)
    }

    pub fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Record how many records the action changed.
    pub fn set_affected(&mut self, count: usize) {
        self.affected = Some(count);
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn affected(&self) -> Option<usize> {
        self.affected
    }

    pub(crate) fn into_report(self) -> (Vec<Notice>, Option<usize>) {
        (self.notices, self.affected)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_from_hx_request_header() {
        assert_eq!(Transport::from_hx_request(Some("true")), Transport::Fragment);
        assert_eq!(Transport::from_hx_request(Some("TRUE")), Transport::Fragment);
        assert_eq!(Transport::from_hx_request(Some("false")), Transport::FullPage);
        assert_eq!(Transport::from_hx_request(None), Transport::FullPage);
    }

    #[test]
    fn template_name_per_transport() {
        assert_eq!(Transport::FullPage.template_name("list"), "list");
        assert_eq!(Transport::Fragment.template_name("list"), "list_htmx");
    }

    #[test]
    fn result_kinds_are_distinct() {
        let raw = ExecutionResult::Raw(RawResponse {
            content_type: "text/csv".into(),
            filename: None,
            body: Vec::new(),
        });
        let kinds = [
            ExecutionResult::Redirect.kind(),
            raw.kind(),
            ExecutionResult::Fragment(String::new()).kind(),
        ];
        assert_eq!(kinds, ["redirect", "raw", "fragment"]);
    }
}
