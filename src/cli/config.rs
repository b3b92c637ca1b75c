//! Configuration file commands

use colored::Colorize;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::output::print_json;

/// Print the effective configuration (file values over defaults)
pub fn show(opts: &GlobalOptions) -> Result<()> {
    let config = Config::load_at(opts.config_ref())?;

    match opts.format {
        OutputFormat::Json => print_json(&config)?,
        _ => {
            let yaml = serde_yaml::to_string(&config).map_err(ConfigError::from)?;
            print!("{}", yaml);
        }
    }

    Ok(())
}

/// Print the config file path
pub fn path(opts: &GlobalOptions) -> Result<()> {
    let path = Config::resolve_path(opts.config_ref())?;
    println!("{}", path.display());
    Ok(())
}

/// Write a config file populated with defaults
pub fn init(opts: &GlobalOptions, force: bool) -> Result<()> {
    let path = Config::resolve_path(opts.config_ref())?;

    if path.exists() && !force {
        return Err(ConfigError::Invalid(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ))
        .into());
    }

    Config::default().save_to(&path)?;
    println!(
        "{} Wrote default configuration to {}",
        "✓".green(),
        path.display().to_string().cyan()
    );
    Ok(())
}
