//! The worker side: configure once, then analyze jobs until told to stop

use anyhow::{Result, bail};
use std::any::Any;
use std::io::{BufRead, Write};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use super::transport::{Request, Response, WorkerOptions, read_frame, write_frame};
use crate::checks::{BuiltinChecker, CheckReport, Checker};
use crate::external::{self, ExternalToolRunner};
use crate::model::{Diagnostic, Job};

/// Run one job: the checker under panic containment, then the external tool
pub fn analyze_job(
    checker: &dyn Checker,
    tool_runner: &dyn ExternalToolRunner,
    options: &WorkerOptions,
    job: &Job,
) -> CheckReport {
    let mut report = match catch_unwind(AssertUnwindSafe(|| checker.run_checks(job))) {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => {
            tracing::debug!("Checker failed on {}: {e:#}", job.file.display());
            CheckReport {
                diagnostics: vec![Diagnostic::internal_error(&job.file, format!("{e:#}"))],
                timings: Vec::new(),
            }
        }
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            tracing::warn!("Checker panicked on {}: {reason}", job.file.display());
            CheckReport {
                diagnostics: vec![Diagnostic::internal_error(
                    &job.file,
                    format!("checker panicked: {reason}"),
                )],
                timings: Vec::new(),
            }
        }
    };

    let (tool_diagnostics, tool_timing) =
        external::run_for_job(tool_runner, &options.external_tool, job);
    report.diagnostics.extend(tool_diagnostics);
    report.timings.extend(tool_timing);

    for sample in &mut report.timings {
        sample.worker_id = options.worker_id;
    }
    report
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Worker loop over a request stream and a response stream
///
/// `checker` overrides the built-in rule set; when `None` it is built from
/// the `Configure` frame.
pub fn serve<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    checker: Option<Arc<dyn Checker>>,
    tool_runner: Arc<dyn ExternalToolRunner>,
) -> Result<()> {
    let options = match read_frame::<_, Request>(&mut input)? {
        Some(Request::Configure(options)) => options,
        Some(other) => bail!("Expected a configure frame first, got {other:?}"),
        None => return Ok(()),
    };
    tracing::debug!("Worker {} configured", options.worker_id);

    let checker: Arc<dyn Checker> = checker.unwrap_or_else(|| {
        Arc::new(
            BuiltinChecker::new(options.checks.clone(), options.report_unmatched_suppressions)
                .with_inline_suppressions(options.inline_suppressions),
        )
    });

    while let Some(request) = read_frame::<_, Request>(&mut input)? {
        match request {
            Request::Analyze(job) => {
                tracing::trace!("Worker {} analyzing {}", options.worker_id, job.file.display());
                let report = analyze_job(checker.as_ref(), tool_runner.as_ref(), &options, &job);
                for diagnostic in report.diagnostics {
                    write_frame(&mut output, &Response::Diagnostic { job: job.index, diagnostic })?;
                }
                for sample in report.timings {
                    write_frame(&mut output, &Response::Timing { job: job.index, sample })?;
                }
                write_frame(&mut output, &Response::Finished { job: job.index })?;
            }
            Request::Stop => break,
            Request::Configure(_) => bail!("Worker {} configured twice", options.worker_id),
        }
    }

    tracing::debug!("Worker {} stopping", options.worker_id);
    Ok(())
}
