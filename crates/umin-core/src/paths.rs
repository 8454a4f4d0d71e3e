use crate::error::{Result, UminError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const UMIN_DIR: &str = ".umin";
pub const CONFIG_FILE: &str = ".umin/config.yaml";
pub const DATA_DIR: &str = ".umin/data";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn umin_dir(root: &Path) -> PathBuf {
    root.join(UMIN_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Directory holding one `<model>.yaml` file per model. A configured
/// `data_dir` is taken relative to the project root.
pub fn data_dir(root: &Path, configured: Option<&Path>) -> PathBuf {
    match configured {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => root.join(p),
        None => root.join(DATA_DIR),
    }
}

pub fn model_data_path(data_dir: &Path, model: &str) -> PathBuf {
    data_dir.join(format!("{model}.yaml"))
}

// ---------------------------------------------------------------------------
// Model name validation
// ---------------------------------------------------------------------------

static MODEL_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn model_name_re() -> &'static Regex {
    MODEL_NAME_RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap())
}

/// Model names become URL segments and file names, so keep them boring.
pub fn validate_model_name(name: &str) -> Result<()> {
    if name.len() > 64 || !model_name_re().is_match(name) {
        return Err(UminError::InvalidModelName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
