use crate::error::{Result, UminError};
use crate::record::{Record, LABEL_FIELD};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Admin configuration for one model: which columns the list shows, what
/// search and filters apply, and which bulk actions are offered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose_name_plural: Option<String>,
    /// Field whose value labels a record in lists and confirmation prompts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_field: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list_display: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list_filter: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ordering: Vec<String>,
    #[serde(default = "default_paginate_by")]
    pub paginate_by: usize,
    /// Action names offered for this model; `None` offers every registered action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,
}

fn default_paginate_by() -> usize {
    25
}

impl ModelConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            verbose_name: None,
            verbose_name_plural: None,
            label_field: None,
            fields: Vec::new(),
            list_display: Vec::new(),
            search_fields: Vec::new(),
            list_filter: Vec::new(),
            ordering: Vec::new(),
            paginate_by: default_paginate_by(),
            actions: None,
        }
    }

    pub fn verbose_name(&self) -> String {
        self.verbose_name
            .clone()
            .unwrap_or_else(|| self.name.replace('_', " "))
    }

    pub fn verbose_name_plural(&self) -> String {
        self.verbose_name_plural
            .clone()
            .unwrap_or_else(|| format!("{}s", self.verbose_name()))
    }

    /// Columns shown in the list page.
    pub fn display_columns(&self) -> Vec<String> {
        if self.list_display.is_empty() {
            vec![LABEL_FIELD.to_string()]
        } else {
            self.list_display.clone()
        }
    }

    /// Columns written by the CSV export, in their fixed output order.
    pub fn export_columns(&self) -> Vec<String> {
        if !self.list_display.is_empty() {
            self.list_display.clone()
        } else if !self.fields.is_empty() {
            self.fields.clone()
        } else {
            vec![LABEL_FIELD.to_string()]
        }
    }

    /// Human-readable label of a record.
    pub fn label(&self, record: &Record) -> String {
        if let Some(field) = &self.label_field {
            let text = record.display(field);
            if !text.is_empty() {
                return text;
            }
        }
        format!("{} {}", self.verbose_name(), record.id)
    }

    /// Display text of one column, resolving the label pseudo-field.
    pub fn cell(&self, record: &Record, column: &str) -> String {
        if column == LABEL_FIELD {
            self.label(record)
        } else {
            record.display(column)
        }
    }

    pub fn offers_action(&self, action: &str) -> bool {
        match &self.actions {
            None => true,
            Some(names) => names.iter().any(|n| n == action),
        }
    }

    pub fn list_url(&self) -> String {
        format!("/{}/", self.name)
    }

    pub fn actions_url(&self) -> String {
        format!("/{}/actions", self.name)
    }

    pub fn delete_url(&self, id: i64) -> String {
        format!("/{}/{id}/delete", self.name)
    }

    pub fn create_url(&self) -> String {
        format!("/{}/create", self.name)
    }

    pub fn edit_url(&self, id: i64) -> String {
        format!("/{}/{id}", self.name)
    }

    /// Fields offered by the create and edit forms. Without a configured
    /// field list, an existing record's own fields are used.
    pub fn form_fields(&self, record: Option<&Record>) -> Vec<String> {
        if !self.fields.is_empty() {
            return self.fields.clone();
        }
        record
            .map(|r| r.fields.keys().cloned().collect())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// ModelRegistry
// ---------------------------------------------------------------------------

/// Models served by one admin site, keyed by name in configuration order.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelConfig>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model. A later registration under the same name replaces
    /// the earlier one.
    pub fn register(&mut self, model: ModelConfig) -> Result<()> {
        crate::paths::validate_model_name(&model.name)?;
        self.models.insert(model.name.clone(), model);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&ModelConfig> {
        self.models
            .get(name)
            .ok_or_else(|| UminError::ModelNotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelConfig> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl FromIterator<ModelConfig> for ModelRegistry {
    fn from_iter<I: IntoIterator<Item = ModelConfig>>(iter: I) -> Self {
        let mut registry = ModelRegistry::new();
        for model in iter {
            registry.models.insert(model.name.clone(), model);
        }
        registry
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
