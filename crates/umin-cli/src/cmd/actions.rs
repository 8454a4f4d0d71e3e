use crate::output::{print_json, print_table};
use clap::Subcommand;
use std::path::Path;
use umin_core::registry::ActionRegistry;

#[derive(Subcommand)]
pub enum ActionsSubcommand {
    /// List registered actions, or those a model offers
    List {
        /// Only actions offered by this model
        #[arg(long)]
        model: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: ActionsSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ActionsSubcommand::List { model } => list(root, model.as_deref(), json),
    }
}

fn list(root: &Path, model: Option<&str>, json: bool) -> anyhow::Result<()> {
    let choices = match model {
        None => ActionRegistry::with_builtins().list(),
        Some(model) => {
            let (_, dispatcher) = super::load_site(root)?;
            dispatcher.actions_for(model)?
        }
    };

    if json {
        return print_json(&choices);
    }
    let rows = choices.into_iter().map(|c| vec![c.name, c.label]).collect();
    print_table(&["NAME", "LABEL"], rows);
    Ok(())
}
