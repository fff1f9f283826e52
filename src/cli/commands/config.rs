use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use std::path::Path;

use crate::cli::output::Output;
use crate::config::ExecutorConfig;
use crate::config::core::REPO_CONFIG;
use crate::suppressions::SuppressionFilter;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Create a parcheck.toml with the default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Display the merged configuration
    Show {
        /// Output format: toml, json
        #[arg(short, long, default_value = "toml")]
        format: String,
    },
    /// Load the configuration and run the same checks as `check`
    Validate,
}

pub fn execute(args: ConfigArgs, custom_config: Option<&str>) -> Result<()> {
    let output = Output::new(false, false);

    match args.command {
        ConfigCommand::Init { force } => {
            let path = Path::new(REPO_CONFIG);
            if path.exists() && !force {
                bail!("{REPO_CONFIG} already exists (use --force to overwrite)");
            }
            std::fs::write(path, toml::to_string_pretty(&ExecutorConfig::default())?)?;
            output.success(&format!("Created {REPO_CONFIG} with default settings"));
        }
        ConfigCommand::Show { format } => {
            let config = ExecutorConfig::load(custom_config, None::<()>)?;
            let rendered = match format.to_lowercase().as_str() {
                "toml" => toml::to_string_pretty(&config)?,
                "json" => serde_json::to_string_pretty(&config)?,
                _ => bail!("Unsupported format: {format}. Use toml or json"),
            };
            println!("{rendered}");
        }
        ConfigCommand::Validate => {
            let config = ExecutorConfig::load(custom_config, None::<()>)?;
            config.validate()?;
            SuppressionFilter::from_config(&config)?;
            output.success("Configuration is valid");
        }
    }
    Ok(())
}
