use clap::Subcommand;
use tracing::debug;

use crate::config::{get_config_path, Config};
use crate::errors::CliError;

/// Subcommands for the `config` command.
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Create an initial configuration file.
    Init {
        /// Path to save the configuration file.
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Check configuration syntax.
    Validate {
        /// Path to the configuration file.
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Show the current configuration.
    Show {
        /// Path to the configuration file.
        #[arg(short, long)]
        path: Option<String>,
    },
}

/// Executes the `config` command.
pub async fn execute(cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Init { path } => init_config(path.as_deref()),
        ConfigCommands::Validate { path } => validate_config(path.as_deref()),
        ConfigCommands::Show { path } => show_config(path.as_deref()),
    }
}

/// Initializes a new configuration file with defaults.
fn init_config(path: Option<&str>) -> Result<(), CliError> {
    let config_path = get_config_path(path);
    debug!("Initializing configuration at {:?}", config_path);

    if config_path.exists() {
        return Err(CliError::ConfigError(format!(
            "Configuration file already exists at {:?}",
            config_path
        )));
    }

    Config::default().save(&config_path)?;

    println!("Configuration initialized at {:?}", config_path);
    Ok(())
}

/// Validates a configuration file parses and its census role is recognized.
fn validate_config(path: Option<&str>) -> Result<(), CliError> {
    let config_path = get_config_path(path);
    debug!("Validating configuration at {:?}", config_path);

    let config = Config::load(&config_path)?;
    config.census_role()?;

    println!("Configuration is valid");
    Ok(())
}

/// Prints the resolved configuration as TOML.
fn show_config(path: Option<&str>) -> Result<(), CliError> {
    let config_path = get_config_path(path);
    debug!("Showing configuration at {:?}", config_path);

    let config = Config::load(&config_path)?;
    let rendered = toml::to_string_pretty(&config)
        .map_err(|e| CliError::ConfigError(format!("Failed to serialize configuration: {}", e)))?;
    println!("{}", rendered);

    Ok(())
}
