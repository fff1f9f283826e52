use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::smart_load;
use crate::model::ShowtimeMode;
use crate::reports::template::DEFAULT_TEMPLATE;

/// Upper bound on worker count; anything above is treated as a typo
pub const MAX_JOBS: usize = 1024;

/// Repository config file picked up from the working directory
pub const REPO_CONFIG: &str = "parcheck.toml";

/// Settings for one `check()` invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Number of worker contexts (1 = sequential, nothing spawned)
    pub jobs: usize,
    pub showtime: ShowtimeMode,
    /// Suppress "Checking ..." and progress lines
    pub quiet: bool,
    /// Write one plist report per analyzed file into this directory
    pub plist_output: Option<PathBuf>,
    /// Message template, or one of the presets `simple`, `gcc`, `vs`
    pub template: String,
    pub external_tool: ExternalToolConfig,
    /// Rules in `id[:file-glob[:line]]` form
    pub suppressions: Vec<String>,
    pub library: LibraryConfig,
    /// Honour `parcheck-suppress` comments in the sources
    pub inline_suppressions: bool,
    /// Report suppression rules that matched nothing
    pub report_unmatched_suppressions: bool,
    pub checks: CheckerConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            jobs: 1,
            showtime: ShowtimeMode::None,
            quiet: true,
            plist_output: None,
            template: DEFAULT_TEMPLATE.to_string(),
            external_tool: ExternalToolConfig::default(),
            suppressions: Vec::new(),
            library: LibraryConfig::default(),
            inline_suppressions: false,
            report_unmatched_suppressions: false,
            checks: CheckerConfig::default(),
        }
    }
}

/// clang-tidy style external linter run per file with settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExternalToolConfig {
    pub enabled: bool,
    pub executable: String,
    /// Appended after the generated compiler arguments
    pub extra_args: Vec<String>,
}

impl Default for ExternalToolConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            executable: if cfg!(windows) {
                "clang-tidy.exe".to_string()
            } else {
                "clang-tidy".to_string()
            },
            extra_args: Vec::new(),
        }
    }
}

/// Library-declared markers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LibraryConfig {
    pub markups: Vec<LibraryMarkup>,
}

/// Files with this extension are markup; `report_errors = false` drops
/// every diagnostic located in them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryMarkup {
    pub ext: String,
    #[serde(default = "default_report_errors")]
    pub report_errors: bool,
}

fn default_report_errors() -> bool {
    true
}

/// Rule groups of the built-in checker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CheckerConfig {
    pub null_pointer: bool,
    pub zero_division: bool,
    /// Token pattern validator
    pub internal: bool,
    /// Follow `#include "..."` into local headers
    pub follow_includes: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            null_pointer: true,
            zero_division: true,
            internal: false,
            follow_includes: true,
        }
    }
}

impl ExecutorConfig {
    /// Layered load: defaults, repo file, custom file, `PARCHECK_` env, CLI
    pub fn load<T: Serialize>(custom_config: Option<&str>, cli_overrides: Option<T>) -> Result<Self> {
        tracing::trace!("CONFIG LOAD: Starting");

        let mut figment = Figment::from(Serialized::defaults(ExecutorConfig::default()))
            .merge(smart_load::auto(REPO_CONFIG));

        if let Some(path) = custom_config {
            if !std::path::Path::new(path).is_file() {
                bail!("Config file not found: {path}");
            }
            figment = figment.merge(smart_load::auto(path));
        }

        figment = figment.merge(Env::prefixed("PARCHECK_").split("__"));

        if let Some(cli) = cli_overrides {
            tracing::trace!("CONFIG LOAD: Applying CLI overrides");
            figment = figment.merge(Serialized::defaults(cli));
        }

        let config: ExecutorConfig = figment
            .extract()
            .context("Failed to parse configuration")?;
        tracing::trace!("CONFIG LOAD: jobs = {}, showtime = {:?}", config.jobs, config.showtime);
        Ok(config)
    }

    /// Fail-fast checks run before any worker is spawned
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            bail!("Invalid job count 0: at least one job is required");
        }
        if self.jobs > MAX_JOBS {
            bail!("Invalid job count {}: the maximum is {MAX_JOBS}", self.jobs);
        }
        if let Some(dir) = &self.plist_output {
            if !dir.is_dir() {
                bail!(
                    "Plist output directory '{}' does not exist or is not a directory",
                    dir.display()
                );
            }
        }
        if self.template.trim().is_empty() {
            bail!("Message template must not be empty");
        }
        Ok(())
    }

    /// Worker count used when the caller asks for `auto`
    pub fn auto_jobs() -> usize {
        num_cpus::get().clamp(1, MAX_JOBS)
    }
}
