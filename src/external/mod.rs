//! External linter step (clang-tidy style)
//!
//! Runs per job when enabled and the job carries compile settings. The
//! command launcher is injectable so runs can be tested without the binary.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::time::Instant;

use crate::config::ExternalToolConfig;
use crate::model::{Diagnostic, FileSettings, Job, Severity, TimingSample};

lazy_static! {
    static ref TOOL_LINE: Regex =
        Regex::new(r"^(.+?):(\d+):(\d+): (warning|error): (.*?) \[([\w.,-]+)\]\s*$").unwrap();
}

/// Launches one external command and captures its exit code and output
pub trait ExternalToolRunner: Send + Sync {
    fn run(&self, command: &str, args: &[String], cwd: &Path) -> Result<(i32, String)>;
}

/// Runs the command with `std::process::Command`, resolving it via `PATH`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessToolRunner;

impl ExternalToolRunner for ProcessToolRunner {
    fn run(&self, command: &str, args: &[String], cwd: &Path) -> Result<(i32, String)> {
        let program = which::which(command)
            .with_context(|| format!("'{command}' not found in PATH"))?;
        tracing::debug!("Running {} {}", program.display(), args.join(" "));

        let output = Command::new(&program)
            .args(args)
            .current_dir(cwd)
            .output()
            .with_context(|| format!("Failed to execute '{}'", program.display()))?;

        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        captured.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok((output.status.code().unwrap_or(-1), captured))
    }
}

/// One recorded call made to a `RecordingToolRunner`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

/// Test double: records every call and replays a canned result
#[derive(Debug, Default)]
pub struct RecordingToolRunner {
    calls: Mutex<Vec<ToolInvocation>>,
    exit_code: i32,
    output: String,
}

impl RecordingToolRunner {
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            exit_code,
            output: output.into(),
        }
    }

    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl ExternalToolRunner for RecordingToolRunner {
    fn run(&self, command: &str, args: &[String], cwd: &Path) -> Result<(i32, String)> {
        let invocation = ToolInvocation {
            command: command.to_string(),
            args: args.to_vec(),
            cwd: cwd.to_path_buf(),
        };
        match self.calls.lock() {
            Ok(mut calls) => calls.push(invocation),
            Err(poisoned) => poisoned.into_inner().push(invocation),
        }
        Ok((self.exit_code, self.output.clone()))
    }
}

/// Argument vector for one file
pub fn tool_args(settings: &FileSettings, extra_args: &[String]) -> Vec<String> {
    let mut args = vec![
        "-quiet".to_string(),
        "-checks=*,-clang-analyzer-*,-llvm*".to_string(),
        settings.file.display().to_string(),
        "--".to_string(),
    ];
    if let Some(standard) = &settings.standard {
        args.push(format!("-std={standard}"));
    }
    args.extend(settings.include_paths.iter().map(|inc| format!("-I{inc}")));
    args.extend(settings.defines.iter().map(|def| format!("-D{def}")));
    args.extend(extra_args.iter().cloned());
    args
}

/// Run the external tool for `job` if it applies; returns the parsed
/// diagnostics and one timing sample
pub fn run_for_job(
    runner: &dyn ExternalToolRunner,
    config: &ExternalToolConfig,
    job: &Job,
) -> (Vec<Diagnostic>, Option<TimingSample>) {
    if !config.enabled {
        return (Vec::new(), None);
    }
    let Some(settings) = &job.settings else {
        tracing::trace!("No settings for {}, skipping external tool", job.file.display());
        return (Vec::new(), None);
    };

    let args = tool_args(settings, &config.extra_args);
    let cwd = settings
        .directory
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    let start = Instant::now();
    let result = runner.run(&config.executable, &args, &cwd);
    let sample = TimingSample::new("externalTool", start.elapsed(), 0);

    let diagnostics = match result {
        Ok((exit_code, output)) => {
            if exit_code != 0 {
                tracing::debug!(
                    "{} exited with {exit_code} for {}",
                    config.executable,
                    job.file.display()
                );
            }
            parse_output(&output)
        }
        Err(e) => vec![Diagnostic::internal_error(
            &job.file,
            format!("Failed to execute '{}': {e:#}", config.executable),
        )],
    };
    (diagnostics, Some(sample))
}

/// Turn `file:line:col: warning|error: message [check]` lines into diagnostics
pub fn parse_output(output: &str) -> Vec<Diagnostic> {
    output
        .lines()
        .filter_map(|line| TOOL_LINE.captures(line))
        .filter_map(|caps| {
            let line = caps[2].parse().ok()?;
            let column = caps[3].parse().ok()?;
            let check = &caps[6];
            let severity = if &caps[4] == "error" {
                Severity::Error
            } else {
                severity_for_check(check)
            };
            Some(Diagnostic::new(
                &caps[1],
                line,
                column,
                severity,
                format!("clang-tidy-{check}"),
                &caps[5],
            ))
        })
        .collect()
}

fn severity_for_check(check: &str) -> Severity {
    if check.contains("performance") {
        Severity::Performance
    } else if check.contains("portability") {
        Severity::Portability
    } else if check.contains("cert") || check.contains("misc") || check.contains("unused") {
        Severity::Warning
    } else {
        Severity::Style
    }
}
