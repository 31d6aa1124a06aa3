//! Configuration file commands

use colored::Colorize;

use tunnelsync::config::Config;
use tunnelsync::error::ConfigError;
use tunnelsync::{Error, Result};

use crate::cli::{GlobalOptions, OutputFormat};
use crate::output::json;

/// Run the config init command
pub fn init(opts: &GlobalOptions, binary_path: Option<String>, force: bool) -> Result<()> {
    let path = opts.config_path()?;
    if path.exists() && !force {
        return Err(Error::Other(format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        )));
    }

    let config = Config {
        binary_path,
        ..Config::default()
    };
    config.validate()?;
    config.save_to(&path)?;

    println!(
        "{} Configuration written to {}",
        "✓".green(),
        path.display().to_string().cyan()
    );
    Ok(())
}

/// Run the config show command
pub fn show(opts: &GlobalOptions) -> Result<()> {
    let path = opts.config_path()?;
    let (config, from_file) = match Config::load_from(&path) {
        Ok(config) => (config, true),
        Err(Error::Config(ConfigError::NotFound(_))) => (Config::default(), false),
        Err(e) => return Err(e),
    };

    match opts.format {
        OutputFormat::Table => {
            if from_file {
                println!("Config file: {}", path.display().to_string().cyan());
            } else {
                println!(
                    "Config file: {} {}",
                    path.display().to_string().cyan(),
                    "(not found, using defaults)".dimmed()
                );
            }
            println!();
            let yaml = serde_yaml::to_string(&config)
                .map_err(|e| ConfigError::SaveError(e.to_string()))?;
            print!("{}", yaml);
        }
        OutputFormat::Json => println!("{}", json::format_json(&config)?),
    }
    Ok(())
}
