//! `parcheck check`: collect sources, build the executor and run it

use anyhow::{Context, Result, bail};
use clap::Args;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use crate::cli::output::Output;
use crate::config::{ExecutorConfig, load_compile_commands};
use crate::model::{ShowtimeMode, SourceFile};
use crate::parallel::Executor;

/// Extensions picked up when walking a directory; headers are only
/// analyzed through the files that include them
const SOURCE_EXTENSIONS: &[&str] = &["c", "cpp", "cxx", "cc", "c++", "tpp", "txx"];

#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Files or directories to check
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Number of workers, or `auto` for one per CPU
    #[arg(short, long, value_name = "N|auto", value_parser = parse_jobs)]
    pub jobs: Option<usize>,

    /// Timing report to print
    #[arg(long, value_enum)]
    pub showtime: Option<ShowtimeMode>,

    /// Diagnostic format, or one of the presets simple, gcc, vs
    #[arg(long)]
    pub template: Option<String>,

    /// Suppress diagnostics matching ID[:FILE-GLOB[:LINE]] (repeatable)
    #[arg(long = "suppress", value_name = "RULE")]
    pub suppress: Vec<String>,

    /// Read suppression rules from a file, one per line
    #[arg(long, value_name = "FILE")]
    pub suppressions_list: Option<PathBuf>,

    /// Honour `// parcheck-suppress <id>` comments in the sources
    #[arg(long = "inline-suppr")]
    pub inline_suppr: bool,

    /// Report suppressions that never matched
    #[arg(long)]
    pub report_unmatched_suppressions: bool,

    /// Write one plist report per file into DIR
    #[arg(long, value_name = "DIR")]
    pub plist_output: Option<PathBuf>,

    /// compile_commands.json to take files and compile settings from
    #[arg(long, value_name = "FILE")]
    pub project: Option<PathBuf>,

    /// Also run clang-tidy on files that have compile settings
    #[arg(long)]
    pub clang_tidy: bool,

    /// clang-tidy executable to run
    #[arg(long, value_name = "EXE")]
    pub clang_tidy_exe: Option<String>,

    /// Enable the token pattern validator
    #[arg(long)]
    pub enable_internal: bool,

    /// Skip paths matching these globs
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Exit code to use when any diagnostic or unmatched suppression is reported
    #[arg(long, default_value_t = 0)]
    pub error_exitcode: u8,
}

fn parse_jobs(value: &str) -> std::result::Result<usize, String> {
    if value.eq_ignore_ascii_case("auto") {
        return Ok(ExecutorConfig::auto_jobs());
    }
    value
        .parse()
        .map_err(|_| format!("'{value}' is not a number or 'auto'"))
}

impl CheckArgs {
    /// Config values given on the command line, in config-file shape
    fn overrides(&self, quiet: bool) -> Result<Value> {
        let mut map = Map::new();
        map.insert("quiet".into(), json!(quiet));
        if let Some(jobs) = self.jobs {
            map.insert("jobs".into(), json!(jobs));
        }
        if let Some(showtime) = self.showtime {
            map.insert("showtime".into(), serde_json::to_value(showtime)?);
        }
        if let Some(template) = &self.template {
            map.insert("template".into(), json!(template));
        }
        if let Some(dir) = &self.plist_output {
            map.insert("plist_output".into(), json!(dir));
        }
        if self.inline_suppr {
            map.insert("inline_suppressions".into(), json!(true));
        }
        if self.report_unmatched_suppressions {
            map.insert("report_unmatched_suppressions".into(), json!(true));
        }

        let mut tool = Map::new();
        if self.clang_tidy {
            tool.insert("enabled".into(), json!(true));
        }
        if let Some(exe) = &self.clang_tidy_exe {
            tool.insert("executable".into(), json!(exe));
        }
        if !tool.is_empty() {
            map.insert("external_tool".into(), Value::Object(tool));
        }
        if self.enable_internal {
            map.insert("checks".into(), json!({ "internal": true }));
        }
        Ok(Value::Object(map))
    }
}

pub fn execute(args: CheckArgs, verbose: u8, quiet: bool, config_path: Option<&str>) -> Result<ExitCode> {
    let output = Output::new(verbose > 0, quiet);
    let start_time = Instant::now();

    let mut config = ExecutorConfig::load(config_path, Some(args.overrides(quiet)?))?;
    config.suppressions.extend(args.suppress.iter().cloned());
    if let Some(list) = &args.suppressions_list {
        config.suppressions.extend(read_suppressions_list(list)?);
    }

    let file_settings = match &args.project {
        Some(project) => load_compile_commands(project)?,
        None => Vec::new(),
    };
    let files = collect_sources(&args.paths, &args.exclude)?;
    if files.is_empty() && file_settings.is_empty() {
        bail!("No C/C++ source files found in the given paths");
    }

    output.verbose(&format!(
        "Checking {} files with {} jobs",
        files.len() + file_settings.len(),
        config.jobs
    ));

    let result = Executor::new(config).check(&files, &file_settings)?;

    output.verbose(&format!(
        "{} diagnostics ({} distinct) in {:.2}s",
        result.total,
        result.printed.len(),
        start_time.elapsed().as_secs_f64()
    ));

    let reported = result.total > 0 || !result.unmatched.is_empty();
    if reported && args.error_exitcode != 0 {
        return Ok(ExitCode::from(args.error_exitcode));
    }
    Ok(ExitCode::SUCCESS)
}

/// One rule per line; blank lines and `#` comments are skipped
fn read_suppressions_list(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read suppressions list {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn build_exclude_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid exclude pattern '{pattern}'"))?);
        if !pattern.starts_with("**/") {
            builder.add(Glob::new(&format!("**/{pattern}"))?);
        }
    }
    Ok(builder.build()?)
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand the given paths into the files to check
///
/// Files named explicitly are always taken. Directories are walked with
/// gitignore rules and contribute only source extensions, in file-name
/// order.
pub fn collect_sources(paths: &[PathBuf], exclude: &[String]) -> Result<Vec<SourceFile>> {
    let excluded = build_exclude_set(exclude)?;
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for path in paths {
        if path.is_file() {
            if !excluded.is_match(path) && seen.insert(path.clone()) {
                sources.push(SourceFile::from_path(path));
            }
        } else if path.is_dir() {
            let mut builder = WalkBuilder::new(path);
            builder
                .git_ignore(true)
                .git_exclude(true)
                .sort_by_file_name(|a, b| a.cmp(b));

            for entry in builder.build() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::debug!("Error accessing path: {e}");
                        continue;
                    }
                };
                let file = entry.path();
                if !entry.file_type().is_some_and(|ft| ft.is_file())
                    || !has_source_extension(file)
                    || excluded.is_match(file)
                {
                    continue;
                }
                if seen.insert(file.to_path_buf()) {
                    sources.push(SourceFile::from_path(file));
                }
            }
        } else {
            bail!("Path not found: {}", path.display());
        }
    }

    tracing::debug!("Collected {} source files", sources.len());
    Ok(sources)
}
