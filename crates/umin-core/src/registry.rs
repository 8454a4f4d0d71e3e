use crate::action::Action;
use crate::actions::{DeleteSelected, ExportCsv, DELETE_SELECTED, EXPORT_CSV};
use crate::error::{Result, UminError};
use crate::model::ModelConfig;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

/// One entry of the action chooser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionChoice {
    pub name: String,
    pub label: String,
}

/// Ordered map from action name to action.
///
/// Populated at startup and read-only afterwards. Registering a name that
/// is already present replaces the earlier action (last write wins) and the
/// replacement keeps the earlier entry's position in the menu.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: IndexMap<String, Arc<dyn Action>>,
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.actions.keys()).finish()
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `delete_selected` and `export_csv`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(DELETE_SELECTED, DeleteSelected);
        registry.register(EXPORT_CSV, ExportCsv);
        registry
    }

    /// Register `action` under `name`, returning the action it replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        action: impl Action + 'static,
    ) -> Option<Arc<dyn Action>> {
        self.register_arc(name, Arc::new(action))
    }

    pub fn register_arc(
        &mut self,
        name: impl Into<String>,
        action: Arc<dyn Action>,
    ) -> Option<Arc<dyn Action>> {
        let name = name.into();
        let replaced = self.actions.insert(name.clone(), action);
        if replaced.is_some() {
            tracing::debug!(action = %name, "replaced registered action");
        }
        replaced
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Action>> {
        self.actions
            .get(name)
            .cloned()
            .ok_or_else(|| UminError::ActionNotFound(name.to_string()))
    }

    /// Resolve `name` among the actions `model` offers. Actions the model
    /// does not offer are reported exactly like unknown ones.
    pub fn resolve_for(&self, model: &ModelConfig, name: &str) -> Result<Arc<dyn Action>> {
        if !model.offers_action(name) {
            return Err(UminError::ActionNotFound(name.to_string()));
        }
        self.resolve(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Every registered action in registration order.
    pub fn list(&self) -> Vec<ActionChoice> {
        self.actions
            .iter()
            .map(|(name, action)| ActionChoice {
                name: name.clone(),
                label: action.label().to_string(),
            })
            .collect()
    }

    /// The action chooser for `model`, in registration order.
    pub fn list_for(&self, model: &ModelConfig) -> Vec<ActionChoice> {
        self.list()
            .into_iter()
            .filter(|choice| model.offers_action(&choice.name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionContext, ExecutionResult};
    use crate::record::Filter;

    struct Named(&'static str);

    impl Action for Named {
        fn label(&self) -> &str {
            self.0
        }

        fn execute(&self, _: &mut ActionContext<'_>, _: &Filter) -> Result<ExecutionResult> {
            Ok(ExecutionResult::Redirect)
        }
    }

    #[test]
    fn builtins_are_listed_in_order() {
        let names: Vec<_> = ActionRegistry::with_builtins()
            .list()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["delete_selected", "export_csv"]);
    }

    #[test]
    fn duplicate_registration_replaces_in_place() {
        let mut registry = ActionRegistry::with_builtins();
        registry.register("archive", Named("Archive"));
        let replaced = registry.register("delete_selected", Named("Trash selected"));

        assert!(replaced.is_some());
        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.list(),
            vec![
                ActionChoice {
                    name: "delete_selected".into(),
                    label: "Trash selected".into()
                },
                ActionChoice {
                    name: "export_csv".into(),
                    label: "Export selected as CSV".into()
                },
                ActionChoice {
                    name: "archive".into(),
                    label: "Archive".into()
                },
            ]
        );
        assert_eq!(registry.resolve("delete_selected").unwrap().label(), "Trash selected");
    }

    #[test]
    fn unknown_names_are_action_not_found() {
        let registry = ActionRegistry::with_builtins();
        for name in ["", "nuke", "DELETE_SELECTED", "delete_selected "] {
            assert!(matches!(
                registry.resolve(name),
                Err(UminError::ActionNotFound(n)) if n == name
            ));
        }
    }

    #[test]
    fn model_restricts_offered_actions() {
        let registry = ActionRegistry::with_builtins();
        let mut model = ModelConfig::new("book");
        model.actions = Some(vec!["export_csv".into()]);

        let names: Vec<_> = registry.list_for(&model).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["export_csv"]);
        assert!(registry.resolve_for(&model, "export_csv").is_ok());
        assert!(matches!(
            registry.resolve_for(&model, "delete_selected"),
            Err(UminError::ActionNotFound(_))
        ));
    }
}
