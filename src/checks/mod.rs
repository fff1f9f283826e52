//! Analysis run inside each worker
//!
//! `Checker` is the seam the executor drives; `BuiltinChecker` is the rule set
//! shipped with the crate.

use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::CheckerConfig;
use crate::model::{Diagnostic, Job, TimingSample};
use crate::suppressions::unmatched_notice;

pub mod internal;
pub mod rules;
pub mod source;

use source::SourceText;

/// Diagnostics and timing samples for one job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckReport {
    pub diagnostics: Vec<Diagnostic>,
    pub timings: Vec<TimingSample>,
}

/// Analysis routine run once per job
///
/// An `Err` (or a panic) is turned into an `internalError` diagnostic for the
/// job's file by the caller.
pub trait Checker: Send + Sync {
    fn run_checks(&self, job: &Job) -> Result<CheckReport>;
}

/// Built-in rule set: null dereference, division by zero and the token
/// pattern validator, following local includes
#[derive(Debug, Clone, Default)]
pub struct BuiltinChecker {
    config: CheckerConfig,
    inline_suppressions: bool,
    report_unmatched: bool,
}

impl BuiltinChecker {
    pub fn new(config: CheckerConfig, report_unmatched: bool) -> Self {
        Self {
            config,
            inline_suppressions: false,
            report_unmatched,
        }
    }

    /// Honour `parcheck-suppress` comments in the analyzed sources
    pub fn with_inline_suppressions(mut self, enabled: bool) -> Self {
        self.inline_suppressions = enabled;
        self
    }

    /// The job's file plus every reachable `#include "..."`, each once
    fn load_sources(&self, job: &Job) -> Result<Vec<SourceText>> {
        let mut sources = vec![SourceText::read(&job.file)?];
        if !self.config.follow_includes {
            return Ok(sources);
        }

        let search_paths: Vec<PathBuf> = job
            .settings
            .iter()
            .flat_map(|settings| {
                settings.include_paths.iter().map(|inc| match &settings.directory {
                    Some(dir) if Path::new(inc).is_relative() => dir.join(inc),
                    _ => PathBuf::from(inc),
                })
            })
            .collect();

        let mut visited: HashSet<PathBuf> = HashSet::new();
        visited.insert(canonical(&job.file));

        let mut next = 0;
        while next < sources.len() {
            let includes = sources[next].local_includes();
            let base = sources[next]
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            next += 1;

            for include in includes {
                let Some(path) = resolve_include(&include, &base, &search_paths) else {
                    tracing::debug!("Include \"{include}\" not found from {}", base.display());
                    continue;
                };
                if !visited.insert(canonical(&path)) {
                    continue;
                }
                match SourceText::read(&path) {
                    Ok(source) => sources.push(source),
                    Err(e) => tracing::debug!("Skipping include {}: {e:#}", path.display()),
                }
            }
        }
        Ok(sources)
    }

    /// Drop diagnostics covered by an inline comment, then add notices for
    /// comments that covered nothing
    fn apply_inline_suppressions(&self, sources: &[SourceText], diagnostics: &mut Vec<Diagnostic>) {
        let mut used = vec![Vec::new(); sources.len()];
        diagnostics.retain(|diag| {
            for (source, hits) in sources.iter().zip(used.iter_mut()) {
                if source.path != diag.file {
                    continue;
                }
                if let Some(pos) = source
                    .suppressions
                    .iter()
                    .position(|s| s.target_line == diag.line && (s.id == diag.id || s.id == "*"))
                {
                    hits.push(pos);
                    return false;
                }
            }
            true
        });

        if self.report_unmatched {
            for (source, hits) in sources.iter().zip(&used) {
                for (pos, suppression) in source.suppressions.iter().enumerate() {
                    if !hits.contains(&pos) {
                        diagnostics.push(unmatched_notice(
                            &source.path,
                            Some(suppression.comment_line),
                            &suppression.id,
                        ));
                    }
                }
            }
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn resolve_include(include: &str, base: &Path, search_paths: &[PathBuf]) -> Option<PathBuf> {
    std::iter::once(base)
        .chain(search_paths.iter().map(PathBuf::as_path))
        .map(|dir| {
            if dir.as_os_str().is_empty() {
                PathBuf::from(include)
            } else {
                dir.join(include)
            }
        })
        .find(|candidate| candidate.is_file())
}

fn timed<F>(scope: &str, timings: &mut Vec<TimingSample>, f: F) -> Vec<Diagnostic>
where
    F: FnOnce() -> Vec<Diagnostic>,
{
    let start = Instant::now();
    let found = f();
    timings.push(TimingSample::new(scope, start.elapsed(), 0));
    found
}

impl Checker for BuiltinChecker {
    fn run_checks(&self, job: &Job) -> Result<CheckReport> {
        let mut timings = Vec::new();

        let start = Instant::now();
        let sources = self.load_sources(job)?;
        timings.push(TimingSample::new("readSources", start.elapsed(), 0));

        let mut diagnostics = Vec::new();
        if self.config.null_pointer {
            diagnostics.extend(timed(rules::NULL_POINTER, &mut timings, || {
                sources.iter().flat_map(rules::null_pointer).collect()
            }));
        }
        if self.config.zero_division {
            diagnostics.extend(timed(rules::ZERO_DIVISION, &mut timings, || {
                sources.iter().flat_map(rules::zero_division).collect()
            }));
        }
        if self.config.internal {
            diagnostics.extend(timed("internal", &mut timings, || {
                sources.iter().flat_map(internal::check).collect()
            }));
        }

        if self.inline_suppressions {
            self.apply_inline_suppressions(&sources, &mut diagnostics);
        }

        Ok(CheckReport {
            diagnostics,
            timings,
        })
    }
}
