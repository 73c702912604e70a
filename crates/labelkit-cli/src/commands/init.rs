use std::path::Path;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use labelkit_core::config::{DashboardConfig, default_config_yaml};

use crate::cli::InitArgs;

/// Write a default labelkit.yaml into the app directory.
pub fn run(app_dir: &Path, args: InitArgs) -> Result<()> {
    let path = DashboardConfig::path_in(app_dir);
    if path.exists() && !args.force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    std::fs::create_dir_all(app_dir)
        .with_context(|| format!("Failed to create {}", app_dir.display()))?;
    std::fs::write(&path, default_config_yaml())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{} {}", "Created".green().bold(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_parseable_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        run(dir.path(), InitArgs { force: false }).unwrap();

        let config = DashboardConfig::load(dir.path()).unwrap();
        assert_eq!(config.env.name, "conda_env");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let dir = tempfile::TempDir::new().unwrap();
        run(dir.path(), InitArgs { force: false }).unwrap();
        assert!(run(dir.path(), InitArgs { force: false }).is_err());
        assert!(run(dir.path(), InitArgs { force: true }).is_ok());
    }
}
