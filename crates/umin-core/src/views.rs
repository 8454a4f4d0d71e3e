//! Read-side views and the one-record delete, built on the dispatcher's
//! collaborators. Create and update live in [`crate::edit`].

use crate::action::{Notice, NoticeLevel, Transport};
use crate::dispatch::Dispatcher;
use crate::error::{Result, UminError};
use crate::model::ModelConfig;
use crate::permission::{Caller, Operation};
use crate::query::{self, ListQuery, Page};
use crate::record::RecordId;
use crate::registry::ActionChoice;
use crate::render::{self, Context};
use serde::Serialize;
use serde_json::json;

/// Summary of one registered model, as served by `/api/models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub verbose_name: String,
    pub verbose_name_plural: String,
    pub list_url: String,
}

impl Dispatcher {
    pub(crate) fn require(
        &self,
        caller: &Caller,
        model: &ModelConfig,
        operation: Operation,
    ) -> Result<()> {
        if self.permissions.allowed(caller, operation, None) {
            return Ok(());
        }
        tracing::warn!(caller = %caller.name, model = %model.name, %operation, "permission denied");
        Err(UminError::PermissionDenied(format!(
            "'{}' may not {} {}",
            caller.name,
            operation,
            model.verbose_name_plural()
        )))
    }

    pub fn model_summaries(&self) -> Vec<ModelSummary> {
        self.models
            .iter()
            .map(|m| ModelSummary {
                name: m.name.clone(),
                verbose_name: m.verbose_name(),
                verbose_name_plural: m.verbose_name_plural(),
                list_url: m.list_url(),
            })
            .collect()
    }

    /// The action chooser for `model`.
    pub fn actions_for(&self, model: &str) -> Result<Vec<ActionChoice>> {
        let model = self.models.get(model)?;
        Ok(self.actions.list_for(model))
    }

    /// One page of `model`'s records after search, filters and ordering.
    pub fn list_records(&self, caller: &Caller, model: &str, query: &ListQuery) -> Result<Page> {
        let model = self.models.get(model)?;
        self.require(caller, model, Operation::View)?;
        query::list(self.store.as_ref(), model, query)
    }

    /// Render the list page (or its fragment) with checkboxes, the action
    /// chooser and any notices to show.
    pub fn list_page(
        &self,
        caller: &Caller,
        model: &str,
        query: &ListQuery,
        transport: Transport,
        notices: &[Notice],
    ) -> Result<String> {
        let model = self.models.get(model)?;
        self.require(caller, model, Operation::View)?;
        let page = query::list(self.store.as_ref(), model, query)?;

        let columns = model.display_columns();
        let headers: Vec<String> = columns
            .iter()
            .map(|c| {
                if c == crate::record::LABEL_FIELD {
                    model.verbose_name()
                } else {
                    c.replace('_', " ")
                }
            })
            .collect();
        let rows: Vec<_> = page
            .records
            .iter()
            .map(|r| {
                let cells: Vec<String> = columns.iter().map(|c| model.cell(r, c)).collect();
                json!({
                    "id": r.id,
                    "cells": cells,
                    "edit_url": model.edit_url(r.id),
                    "delete_url": model.delete_url(r.id),
                })
            })
            .collect();

        let mut context = Context::new();
        context.insert("site_name".into(), self.site_name.clone().into());
        context.insert("title".into(), model.verbose_name_plural().into());
        context.insert("model_name".into(), model.verbose_name().into());
        context.insert("model_name_plural".into(), model.verbose_name_plural().into());
        context.insert("create_url".into(), model.create_url().into());
        context.insert("notices".into(), serde_json::to_value(notices)?);
        context.insert(
            "search_query".into(),
            query.q.clone().unwrap_or_default().into(),
        );
        context.insert("list_url".into(), model.list_url().into());
        context.insert("actions_url".into(), model.actions_url().into());
        context.insert(
            "actions".into(),
            serde_json::to_value(self.actions.list_for(model))?,
        );
        context.insert("columns".into(), headers.into());
        context.insert("rows".into(), rows.into());
        let page_url = |n: usize| format!("{}{}", model.list_url(), query.query_string(Some(n)));
        context.insert(
            "page".into(),
            json!({
                "number": page.number,
                "num_pages": page.num_pages,
                "total": page.total,
                "previous_url": (page.number > 1).then(|| page_url(page.number - 1)),
                "next_url": (page.number < page.num_pages).then(|| page_url(page.number + 1)),
            }),
        );
        let filters: Vec<_> = query::filter_choices(self.store.as_ref(), model)?
            .into_iter()
            .map(|choice| {
                let selected = query.filters.get(&choice.field).cloned().unwrap_or_default();
                json!({
                    "field": choice.field,
                    "label": choice.field.replace('_', " "),
                    "values": choice.values,
                    "selected": selected,
                })
            })
            .collect();
        context.insert("filters".into(), filters.into());
        self.renderer
            .render(&transport.template_name(render::LIST), &context)
    }

    /// Delete a single record. Returns the notice to show the caller.
    pub fn delete_one(&self, caller: &Caller, model: &str, id: RecordId) -> Result<Notice> {
        let model = self.models.get(model)?;
        self.require(caller, model, Operation::Delete)?;
        let record = self
            .store
            .get(&model.name, id)?
            .ok_or_else(|| UminError::RecordNotFound {
                model: model.name.clone(),
                id,
            })?;
        let label = model.label(&record);
        self.store.delete(&model.name, &[id])?;
        tracing::info!(model = %model.name, id, "record deleted");
        Ok(Notice::success(format!("{label} was deleted successfully.")))
    }

    /// Render a standalone message, used for error pages.
    pub fn message_page(
        &self,
        level: NoticeLevel,
        message: &str,
        model: Option<&str>,
        transport: Transport,
    ) -> Result<String> {
        let list_url = model
            .and_then(|m| self.models.get(m).ok())
            .map(ModelConfig::list_url)
            .unwrap_or_default();
        let mut context = Context::new();
        context.insert("site_name".into(), self.site_name.clone().into());
        context.insert("level".into(), level.as_str().into());
        context.insert("message".into(), message.into());
        context.insert("list_url".into(), list_url.into());
        self.renderer
            .render(&transport.template_name(render::MESSAGE), &context)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
