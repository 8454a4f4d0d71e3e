//! Single-record create and update, and the form both are edited in.
//!
//! Submitted values arrive as text (form fields or `FIELD=VALUE` CLI
//! arguments) and are typed with [`parse_value`] before they reach the
//! store.

use crate::action::{Notice, Transport};
use crate::dispatch::Dispatcher;
use crate::error::{Result, UminError};
use crate::model::ModelConfig;
use crate::permission::{Caller, Operation};
use crate::record::{Record, RecordId};
use crate::render::{self, Context};
use serde_json::{json, Value};
use std::collections::BTreeMap;

impl Dispatcher {
    /// Render the create form, or the edit form of record `id`.
    pub fn form_page(
        &self,
        caller: &Caller,
        model: &str,
        id: Option<RecordId>,
        transport: Transport,
    ) -> Result<String> {
        let model = self.models.get(model)?;
        let (record, verb, form_url) = match id {
            Some(id) => {
                self.require(caller, model, Operation::Change)?;
                (Some(self.existing(model, id)?), "Update", model.edit_url(id))
            }
            None => {
                self.require(caller, model, Operation::Add)?;
                (None, "Create", model.create_url())
            }
        };

        let fields: Vec<_> = model
            .form_fields(record.as_ref())
            .into_iter()
            .map(|name| {
                let value = record
                    .as_ref()
                    .map(|r| r.display(&name))
                    .unwrap_or_default();
                json!({ "name": name, "label": name.replace('_', " "), "value": value })
            })
            .collect();

        let mut context = Context::new();
        context.insert("site_name".into(), self.site_name.clone().into());
        context.insert(
            "title".into(),
            format!("{verb} {}", model.verbose_name()).into(),
        );
        context.insert("action".into(), verb.into());
        context.insert("model_name".into(), model.verbose_name().into());
        context.insert("form_url".into(), form_url.into());
        context.insert("list_url".into(), model.list_url().into());
        context.insert("fields".into(), fields.into());
        self.renderer
            .render(&transport.template_name(render::FORM), &context)
    }

    /// Create a record from submitted `FIELD=VALUE` pairs.
    pub fn create_one(
        &self,
        caller: &Caller,
        model: &str,
        values: &[(String, String)],
    ) -> Result<(Record, Notice)> {
        let model = self.models.get(model)?;
        self.require(caller, model, Operation::Add)?;
        let fields = typed_fields(model, values)?;
        let record = self.store.create(&model.name, fields)?;
        tracing::info!(model = %model.name, id = record.id, "record created");
        let notice = Notice::success(format!(
            "{} was created successfully.",
            model.label(&record)
        ));
        Ok((record, notice))
    }

    /// Overwrite the submitted fields of record `id`; fields not submitted
    /// keep their values.
    pub fn update_one(
        &self,
        caller: &Caller,
        model: &str,
        id: RecordId,
        values: &[(String, String)],
    ) -> Result<(Record, Notice)> {
        let model = self.models.get(model)?;
        self.require(caller, model, Operation::Change)?;
        let fields = typed_fields(model, values)?;
        let mut record = self.existing(model, id)?;
        record.fields.extend(fields);
        self.store.insert(&model.name, record.clone())?;
        tracing::info!(model = %model.name, id, "record updated");
        let notice = Notice::success(format!(
            "{} was updated successfully.",
            model.label(&record)
        ));
        Ok((record, notice))
    }

    fn existing(&self, model: &ModelConfig, id: RecordId) -> Result<Record> {
        self.store
            .get(&model.name, id)?
            .ok_or_else(|| UminError::RecordNotFound {
                model: model.name.clone(),
                id,
            })
    }
}

/// Check every submitted field against the model and type its value.
fn typed_fields(model: &ModelConfig, values: &[(String, String)]) -> Result<BTreeMap<String, Value>> {
    values
        .iter()
        .map(|(field, raw)| {
            if field == "id" || (!model.fields.is_empty() && !model.fields.contains(field)) {
                return Err(UminError::InvalidField {
                    model: model.name.clone(),
                    field: field.clone(),
                });
            }
            Ok((field.clone(), parse_value(raw)))
        })
        .collect()
}

/// Numbers, booleans and null become typed values; everything else is text.
pub fn parse_value(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(v @ (Value::Number(_) | Value::Bool(_) | Value::Null)) if !raw.trim().is_empty() => v,
        _ => Value::String(raw.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
