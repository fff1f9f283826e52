//! Suppression rules and library markups
//!
//! Applied by the coordinator to every diagnostic before it reaches either
//! aggregator, so suppressed findings are neither printed nor counted.

use anyhow::{Context, Result, bail};
use globset::{Glob, GlobMatcher};
use std::path::Path;

use crate::config::{ExecutorConfig, LibraryMarkup};
use crate::model::{Diagnostic, Severity, UNMATCHED_SUPPRESSION};

/// One `id[:file-glob[:line]]` rule
#[derive(Debug, Clone)]
pub struct SuppressionRule {
    /// `*` matches every rule id
    pub id: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    matcher: Option<GlobMatcher>,
}

impl SuppressionRule {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let mut parts = text.splitn(3, ':');
        let id = parts.next().unwrap_or_default().trim();
        if id.is_empty() {
            bail!("Unparsable suppression '{text}': missing rule id");
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '*') {
            bail!("Unparsable suppression '{text}': invalid rule id '{id}'");
        }

        let file = parts.next().map(str::trim).filter(|f| !f.is_empty());
        let line = match parts.next() {
            Some(line) => Some(line.trim().parse::<u32>().with_context(|| {
                format!("Unparsable suppression '{text}': line '{line}' is not a number")
            })?),
            None => None,
        };

        let matcher = match file {
            Some(pattern) => Some(
                Glob::new(pattern)
                    .with_context(|| format!("Unparsable suppression '{text}': bad file pattern"))?
                    .compile_matcher(),
            ),
            None => None,
        };

        Ok(Self {
            id: id.to_string(),
            file: file.map(str::to_string),
            line,
            matcher,
        })
    }

    pub fn matches(&self, diagnostic: &Diagnostic) -> bool {
        if self.id != "*" && self.id != diagnostic.id {
            return false;
        }
        if let Some(line) = self.line {
            if line != diagnostic.line {
                return false;
            }
        }
        match (&self.matcher, &self.file) {
            (Some(matcher), Some(pattern)) => {
                matcher.is_match(&diagnostic.file)
                    || (!pattern.contains('/')
                        && diagnostic
                            .file
                            .file_name()
                            .is_some_and(|name| matcher.is_match(Path::new(name))))
            }
            _ => true,
        }
    }
}

/// Removes suppressed diagnostics and remembers which rules fired
#[derive(Debug, Default)]
pub struct SuppressionFilter {
    rules: Vec<SuppressionRule>,
    matched: Vec<bool>,
    silent_extensions: Vec<String>,
}

impl SuppressionFilter {
    pub fn new(rules: Vec<SuppressionRule>, markups: &[LibraryMarkup]) -> Self {
        let silent_extensions = markups
            .iter()
            .filter(|m| !m.report_errors)
            .map(|m| normalize_ext(&m.ext))
            .collect();
        Self {
            matched: vec![false; rules.len()],
            rules,
            silent_extensions,
        }
    }

    /// Parse every configured rule; an unparsable one is a startup error
    pub fn from_config(config: &ExecutorConfig) -> Result<Self> {
        let rules = config
            .suppressions
            .iter()
            .map(|text| SuppressionRule::parse(text))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(rules, &config.library.markups))
    }

    /// True when `diagnostic` must be dropped
    pub fn is_suppressed(&mut self, diagnostic: &Diagnostic) -> bool {
        if self.is_library_markup(&diagnostic.file) {
            tracing::trace!("{} suppressed by library markup", diagnostic.callstack());
            return true;
        }

        let mut suppressed = false;
        for (rule, matched) in self.rules.iter().zip(self.matched.iter_mut()) {
            if rule.matches(diagnostic) {
                *matched = true;
                suppressed = true;
            }
        }
        suppressed
    }

    fn is_library_markup(&self, file: &Path) -> bool {
        if self.silent_extensions.is_empty() {
            return false;
        }
        file.extension()
            .and_then(|ext| ext.to_str())
            .map(normalize_ext)
            .is_some_and(|ext| self.silent_extensions.contains(&ext))
    }

    /// Notices for rules that never matched during the run
    pub fn unmatched(&self) -> Vec<Diagnostic> {
        self.rules
            .iter()
            .zip(&self.matched)
            .filter(|(rule, matched)| !**matched && rule.id != UNMATCHED_SUPPRESSION)
            .map(|(rule, _)| unmatched_notice(rule.file.as_deref().unwrap_or("*"), rule.line, &rule.id))
            .collect()
    }
}

/// `unmatchedSuppression` notice for a rule or inline comment that fired on nothing
pub fn unmatched_notice(file: impl AsRef<Path>, line: Option<u32>, id: &str) -> Diagnostic {
    Diagnostic::new(
        file.as_ref(),
        line.unwrap_or(0),
        0,
        Severity::Information,
        UNMATCHED_SUPPRESSION,
        format!("Unmatched suppression: {id}"),
    )
}

fn normalize_ext(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}
