//! The single report writer shared by both aggregators

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

enum Target {
    Stdio,
    Capture { out: String, err: String },
}

/// Serialized writer for report output
///
/// Diagnostics go to the error stream, status and timing text to the output
/// stream. Clones share one lock, so lines from different producers never
/// interleave.
#[derive(Clone)]
pub struct ReportSink {
    target: Arc<Mutex<Target>>,
}

impl ReportSink {
    /// Write to the process's stdout/stderr
    pub fn stdio() -> Self {
        Self {
            target: Arc::new(Mutex::new(Target::Stdio)),
        }
    }

    /// Keep everything in memory, for tests and embedding
    pub fn capture() -> Self {
        Self {
            target: Arc::new(Mutex::new(Target::Capture {
                out: String::new(),
                err: String::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Target> {
        self.target.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Status and timing lines
    pub fn out(&self, line: &str) {
        match &mut *self.lock() {
            Target::Stdio => {
                let mut stdout = std::io::stdout().lock();
                let _ = writeln!(stdout, "{line}");
                let _ = stdout.flush();
            }
            Target::Capture { out, .. } => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    /// Diagnostic lines
    pub fn err(&self, line: &str) {
        match &mut *self.lock() {
            Target::Stdio => {
                let _ = writeln!(std::io::stderr().lock(), "{line}");
            }
            Target::Capture { err, .. } => {
                err.push_str(line);
                err.push('\n');
            }
        }
    }

    /// Everything written to the output stream so far (empty for stdio)
    pub fn captured_out(&self) -> String {
        match &*self.lock() {
            Target::Stdio => String::new(),
            Target::Capture { out, .. } => out.clone(),
        }
    }

    /// Everything written to the error stream so far (empty for stdio)
    pub fn captured_err(&self) -> String {
        match &*self.lock() {
            Target::Stdio => String::new(),
            Target::Capture { err, .. } => err.clone(),
        }
    }
}

impl Default for ReportSink {
    fn default() -> Self {
        Self::stdio()
    }
}
