//! Diagnostic value type shared by workers, the coordinator and reports

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Severity level of a reported finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Information,
    Portability,
    Performance,
    Style,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Information => "information",
            Severity::Portability => "portability",
            Severity::Performance => "performance",
            Severity::Style => "style",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule id for a checker that failed or panicked while analyzing a file
pub const INTERNAL_ERROR: &str = "internalError";
/// Rule id for a worker that died while a job was in flight
pub const WORKER_CRASH: &str = "workerCrash";
/// Rule id for suppression rules that never matched anything
pub const UNMATCHED_SUPPRESSION: &str = "unmatchedSuppression";

/// One reported finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: PathBuf,
    /// 1-indexed, 0 when the finding has no line
    pub line: u32,
    /// 1-indexed, 0 when the finding has no column
    pub column: u32,
    pub severity: Severity,
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub inconclusive: bool,
}

/// Identity used for dedup-for-display
///
/// Severity and the inconclusive flag are not part of it: the same location,
/// rule and text reported twice is one printed line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiagnosticKey {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
    pub id: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        file: impl Into<PathBuf>,
        line: u32,
        column: u32,
        severity: Severity,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            severity,
            id: id.into(),
            message: message.into(),
            inconclusive: false,
        }
    }

    /// Tool-error diagnostic for a checker that failed on `file`
    pub fn internal_error(file: &Path, reason: impl fmt::Display) -> Self {
        Self::new(
            file,
            0,
            0,
            Severity::Error,
            INTERNAL_ERROR,
            format!("Internal error: {reason}"),
        )
    }

    /// Tool-error diagnostic for a worker that died while analyzing `file`
    pub fn worker_crash(file: &Path, reason: impl fmt::Display) -> Self {
        Self::new(
            file,
            0,
            0,
            Severity::Error,
            WORKER_CRASH,
            format!("Internal error: worker {reason}"),
        )
    }

    pub fn inconclusive(mut self, inconclusive: bool) -> Self {
        self.inconclusive = inconclusive;
        self
    }

    pub fn key(&self) -> DiagnosticKey {
        DiagnosticKey {
            file: self.file.clone(),
            line: self.line,
            column: self.column,
            id: self.id.clone(),
            message: self.message.clone(),
        }
    }

    /// `[file:line:column]` location string
    pub fn callstack(&self) -> String {
        format!("[{}:{}:{}]", self.file.display(), self.line, self.column)
    }
}
