use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

pub mod check;
pub mod config;
pub mod worker;

#[derive(Parser)]
#[command(
    name = "parcheck",
    version = env!("CARGO_PKG_VERSION"),
    about = "Parallel static checks for C and C++ sources",
    long_about = "parcheck runs its checks on many files at once, each file in its own \
                  process, and merges the results into one deduplicated report."
)]
pub struct Cli {
    /// Run as if started in <DIR> instead of current working directory
    #[arg(short = 'C', long = "directory", global = true)]
    pub directory: Option<String>,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print diagnostics
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check files and directories
    Check(check::CheckArgs),
    /// Configuration management
    Config(config::ConfigArgs),
    /// Serve jobs over stdin/stdout (launched by `check`)
    #[command(hide = true)]
    Worker,
}

impl Cli {
    pub fn run(self) -> Result<ExitCode> {
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Worker => {
                // Frames own stdout; logs go to stderr at the default level
                setup_logging(0, false);
                worker::execute()?;
                Ok(ExitCode::SUCCESS)
            }
            Commands::Check(args) => {
                setup_logging(self.verbose, self.quiet);
                check::execute(args, self.verbose, self.quiet, self.config.as_deref())
            }
            Commands::Config(args) => {
                setup_logging(self.verbose, self.quiet);
                config::execute(args, self.config.as_deref())?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info,ignore=warn,globset=warn"),
            2 => tracing_subscriber::EnvFilter::new("debug,ignore=warn,globset=warn"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
