use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use umin_core::config::Config;
use umin_core::model::ModelConfig;
use umin_core::paths;

#[derive(Subcommand)]
pub enum ModelsSubcommand {
    /// List configured models
    List,

    /// Add a model to the configuration
    Add {
        /// Model name (lowercase, digits and underscores)
        name: String,
        /// Field names, comma-separated
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
        /// Field used as the record label
        #[arg(long)]
        label_field: Option<String>,
        /// Columns shown in the list page, comma-separated
        #[arg(long, value_delimiter = ',')]
        list_display: Vec<String>,
        /// Fields searched by `?q=`, comma-separated
        #[arg(long, value_delimiter = ',')]
        search_fields: Vec<String>,
    },
}

pub fn run(root: &Path, subcmd: ModelsSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ModelsSubcommand::List => list(root, json),
        ModelsSubcommand::Add {
            name,
            fields,
            label_field,
            list_display,
            search_fields,
        } => {
            let mut model = ModelConfig::new(name);
            model.fields = fields;
            model.label_field = label_field;
            model.list_display = list_display;
            model.search_fields = search_fields;
            add(root, model)
        }
    }
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    if json {
        return print_json(&config.models);
    }
    if config.models.is_empty() {
        println!("No models configured.");
        return Ok(());
    }
    let rows = config
        .models
        .iter()
        .map(|m| {
            vec![
                m.name.clone(),
                m.verbose_name_plural(),
                m.fields.join(", "),
            ]
        })
        .collect();
    print_table(&["NAME", "PLURAL", "FIELDS"], rows);
    Ok(())
}

fn add(root: &Path, model: ModelConfig) -> anyhow::Result<()> {
    paths::validate_model_name(&model.name)?;
    let mut config = Config::load(root).context("failed to load config")?;
    if config.models.iter().any(|m| m.name == model.name) {
        anyhow::bail!("model '{}' already exists", model.name);
    }
    println!("Added model: {}", model.name);
    config.models.push(model);
    config.save(root).context("failed to write config.yaml")?;
    Ok(())
}
