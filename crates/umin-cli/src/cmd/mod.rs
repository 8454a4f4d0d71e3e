pub mod actions;
pub mod config;
pub mod init;
pub mod models;
pub mod records;
pub mod run;
pub mod serve;

use anyhow::Context;
use std::path::Path;
use umin_core::config::Config;
use umin_core::dispatch::Dispatcher;
use umin_core::registry::ActionRegistry;

/// Load the site configuration and wire a dispatcher with the built-in actions.
pub fn load_site(root: &Path) -> anyhow::Result<(Config, Dispatcher)> {
    let config = Config::load(root).context("failed to load config")?;
    let dispatcher = Dispatcher::from_config(root, &config, ActionRegistry::with_builtins())?;
    Ok((config, dispatcher))
}
