use crate::error::{Result, UminError};
use crate::model::ModelConfig;
use crate::paths;
use crate::permission::Operation;
use crate::record::LABEL_FIELD;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Environment variable overriding `secret_key`.
pub const SECRET_ENV: &str = "UMIN_SECRET_KEY";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn warning(message: String) -> Self {
        Self {
            level: WarnLevel::Warning,
            message,
        }
    }

    fn error(message: String) -> Self {
        Self {
            level: WarnLevel::Error,
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// SiteConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub site: SiteConfig,
    /// Key for confirmation tokens. `UMIN_SECRET_KEY` takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Principal name (or `*`) → operations it may perform.
    #[serde(default)]
    pub permissions: BTreeMap<String, Vec<Operation>>,
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(site_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            site: SiteConfig {
                name: site_name.into(),
            },
            secret_key: None,
            data_dir: None,
            permissions: BTreeMap::new(),
            models: Vec::new(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(UminError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Effective signing secret, environment first.
    pub fn secret(&self) -> Option<String> {
        std::env::var(SECRET_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.secret_key.clone().filter(|s| !s.is_empty()))
    }

    pub fn data_dir(&self, root: &Path) -> PathBuf {
        paths::data_dir(root, self.data_dir.as_deref())
    }

    pub fn model(&self, name: &str) -> Result<&ModelConfig> {
        self.models
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| UminError::ModelNotFound(name.to_string()))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Check the configuration against the given set of registered action
    /// names.
    pub fn validate(&self, known_actions: &[String]) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.secret_key.as_deref().unwrap_or("").is_empty() {
            warnings.push(ConfigWarning::warning(format!(
                "no secret_key configured; set {SECRET_ENV} or confirmation tokens \
                 will not survive a restart"
            )));
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if paths::validate_model_name(&model.name).is_err() {
                warnings.push(ConfigWarning::error(format!(
                    "invalid model name '{}'",
                    model.name
                )));
            }
            if !seen.insert(model.name.as_str()) {
                warnings.push(ConfigWarning::error(format!(
                    "model '{}' is configured more than once; the last entry wins",
                    model.name
                )));
            }
            if model.paginate_by == 0 {
                warnings.push(ConfigWarning::warning(format!(
                    "model '{}' has paginate_by = 0; the list will not paginate",
                    model.name
                )));
            }
            if let Some(label) = &model.label_field {
                check_field(model, "label_field", label, &mut warnings);
            }

            let lists = [
                ("list_display", &model.list_display),
                ("search_fields", &model.search_fields),
                ("list_filter", &model.list_filter),
            ];
            for (option, names) in lists {
                for name in names {
                    if !(option == "list_display" && name == LABEL_FIELD) {
                        check_field(model, option, name, &mut warnings);
                    }
                }
            }
            for entry in &model.ordering {
                check_field(model, "ordering", entry.trim_start_matches('-'), &mut warnings);
            }

            for action in model.actions.iter().flatten() {
                if !known_actions.iter().any(|a| a == action) {
                    warnings.push(ConfigWarning::warning(format!(
                        "unknown action '{action}' in model '{}'",
                        model.name
                    )));
                }
            }
        }

        warnings
    }
}

fn check_field(model: &ModelConfig, option: &str, field: &str, warnings: &mut Vec<ConfigWarning>) {
    if field == "id" || model.fields.iter().any(|f| f == field) {
        return;
    }
    warnings.push(ConfigWarning::warning(format!(
        "{option} of model '{}' names unknown field '{field}'",
        model.name
    )));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
