use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use umin_core::config::{Config, WarnLevel};
use umin_core::registry::ActionRegistry;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Validate the config for common mistakes
    Validate,

    /// Print the effective configuration (secret redacted)
    Show,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Validate => validate(root, json),
        ConfigSubcommand::Show => show(root, json),
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let known: Vec<String> = ActionRegistry::with_builtins()
        .list()
        .into_iter()
        .map(|c| c.name)
        .collect();
    let warnings = config.validate(&known);

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let mut config = Config::load(root).context("failed to load config")?;
    if config.secret_key.is_some() {
        config.secret_key = Some("<redacted>".to_string());
    }
    if json {
        print_json(&config)
    } else {
        print!("{}", serde_yaml::to_string(&config)?);
        Ok(())
    }
}
