use anyhow::Context;
use std::path::Path;
use umin_core::config::Config;
use umin_core::permission::{Operation, ANY_CALLER};
use umin_core::{io, paths, token};

pub fn run(root: &Path, name: Option<&str>) -> anyhow::Result<()> {
    let site_name = name.map(str::to_string).unwrap_or_else(|| {
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "umin".to_string())
    });

    println!("Initializing umin in: {}", root.display());

    for dir in [paths::UMIN_DIR, paths::DATA_DIR] {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    let config_path = paths::config_path(root);
    if config_path.exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
        return Ok(());
    }

    let mut cfg = Config::new(site_name);
    cfg.secret_key = Some(token::generate_secret());
    cfg.permissions
        .insert(ANY_CALLER.to_string(), vec![Operation::View]);
    cfg.permissions
        .insert("admin".to_string(), Operation::all().to_vec());
    cfg.save(root).context("failed to write config.yaml")?;
    println!("  created: {}", paths::CONFIG_FILE);
    Ok(())
}
