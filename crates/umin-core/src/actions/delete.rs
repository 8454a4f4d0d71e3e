use crate::action::{Action, ActionContext, ExecutionResult, Notice};
use crate::error::Result;
use crate::permission::Operation;
use crate::record::{Filter, RecordId};
use crate::render::{self, Context};
use serde_json::json;

/// Delete every selected record, after a confirmation round-trip.
///
/// Unconfirmed: renders the `actions/confirm_delete` prompt listing the
/// records that still exist, with a token bound to exactly those ids.
/// Confirmed: deletes whatever part of the selection still exists and
/// reports the number actually removed. A selection that has vanished
/// entirely needs no prompt and reports 0 removed.
#[derive(Debug, Clone, Default)]
pub struct DeleteSelected;

impl Action for DeleteSelected {
    fn label(&self) -> &str {
        "Delete selected items"
    }

    fn execute(&self, ctx: &mut ActionContext<'_>, selection: &Filter) -> Result<ExecutionResult> {
        ctx.require(Operation::Delete)?;
        let records = ctx.resolve(selection)?;
        let plural = ctx.model.verbose_name_plural();

        if ctx.is_confirmed() || records.is_empty() {
            let ids: Vec<RecordId> = records.iter().map(|r| r.id).collect();
            let removed = ctx.store.delete(&ctx.model.name, &ids)?;
            tracing::info!(
                model = %ctx.model.name,
                selected = ids.len(),
                removed,
                "bulk delete"
            );
            ctx.set_affected(removed);
            ctx.notify(Notice::success(format!(
                "Successfully deleted {removed} {plural}."
            )));
            return Ok(ExecutionResult::Redirect);
        }

        let items: Vec<_> = records
            .iter()
            .map(|r| json!({ "id": r.id, "label": ctx.model.label(r) }))
            .collect();
        let token = ctx.confirmation_token(records.iter().map(|r| r.id));
        let mut context = Context::new();
        context.insert("action".into(), ctx.action.into());
        context.insert("count".into(), records.len().into());
        context.insert("model_name".into(), plural.into());
        context.insert("items".into(), items.into());
        context.insert("token".into(), token.into());
        context.insert("actions_url".into(), ctx.model.actions_url().into());
        context.insert("list_url".into(), ctx.model.list_url().into());
        let html = ctx.render(render::CONFIRM_DELETE, context)?;
        Ok(ExecutionResult::Fragment(html))
    }
}
