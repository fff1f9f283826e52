use anyhow::Result;
use crossbeam::channel::Select;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::distributor::WorkDistributor;
use super::launcher::{ProcessLauncher, WorkerEvent, WorkerHandle, WorkerLauncher};
use super::transport::{Request, Response, WorkerOptions};
use super::worker::analyze_job;
use crate::checks::{BuiltinChecker, CheckReport, Checker};
use crate::config::ExecutorConfig;
use crate::external::{ExternalToolRunner, ProcessToolRunner};
use crate::model::{Diagnostic, FileSettings, Job, SourceFile, UNMATCHED_SUPPRESSION};
use crate::reports::plist::write_plist;
use crate::reports::{MessageTemplate, ReportSink, ResultAggregator, TimingAggregator};
use crate::suppressions::SuppressionFilter;

/// Outcome of one `check()` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    /// Every post-suppression diagnostic, duplicates included
    pub total: usize,
    /// Lines printed to the error stream, one per distinct diagnostic
    pub printed: Vec<String>,
    /// Everything the showtime report wrote
    pub timing_report: String,
    /// Suppression notices, inline and global
    pub unmatched: Vec<Diagnostic>,
}

/// Parallel executor: fans jobs out to isolated workers and merges what
/// comes back
///
/// With `jobs == 1` everything runs inline and no worker is launched.
pub struct Executor {
    config: ExecutorConfig,
    sink: ReportSink,
    launcher: Arc<dyn WorkerLauncher>,
    checker: Option<Arc<dyn Checker>>,
    tool_runner: Arc<dyn ExternalToolRunner>,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            sink: ReportSink::stdio(),
            launcher: Arc::new(ProcessLauncher::own_binary()),
            checker: None,
            tool_runner: Arc::new(ProcessToolRunner),
        }
    }

    pub fn with_sink(mut self, sink: ReportSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn WorkerLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Checker for inline runs; workers build their own
    pub fn with_checker(mut self, checker: Arc<dyn Checker>) -> Self {
        self.checker = Some(checker);
        self
    }

    /// External tool runner for inline runs
    pub fn with_tool_runner(mut self, tool_runner: Arc<dyn ExternalToolRunner>) -> Self {
        self.tool_runner = tool_runner;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Analyze every file and settings entry once
    ///
    /// Fails only for problems found before any job is dispatched: bad
    /// configuration, unparsable suppressions, workers that cannot start.
    /// Anything that goes wrong afterwards becomes a diagnostic.
    pub fn check(&self, files: &[SourceFile], file_settings: &[FileSettings]) -> Result<ExecutionResult> {
        self.config.validate()?;
        let filter = SuppressionFilter::from_config(&self.config)?;

        let mut distributor = WorkDistributor::new(files, file_settings);
        let mut collector = Collector::new(&self.config, filter, self.sink.clone());

        if distributor.total() > 0 {
            if self.config.jobs == 1 {
                tracing::debug!("Checking {} files inline", distributor.total());
                self.run_inline(&mut collector, &mut distributor);
            } else {
                self.run_parallel(&mut collector, &mut distributor)?;
            }
        }

        Ok(collector.finish())
    }

    fn worker_options(&self, worker_id: usize) -> WorkerOptions {
        WorkerOptions {
            worker_id,
            external_tool: self.config.external_tool.clone(),
            checks: self.config.checks.clone(),
            inline_suppressions: self.config.inline_suppressions,
            report_unmatched_suppressions: self.config.report_unmatched_suppressions,
        }
    }

    fn run_inline(&self, collector: &mut Collector, distributor: &mut WorkDistributor) {
        let checker: Arc<dyn Checker> = match &self.checker {
            Some(checker) => checker.clone(),
            None => Arc::new(
                BuiltinChecker::new(
                    self.config.checks.clone(),
                    self.config.report_unmatched_suppressions,
                )
                .with_inline_suppressions(self.config.inline_suppressions),
            ),
        };
        let options = self.worker_options(0);

        while let Some(job) = distributor.assign(0) {
            collector.starting(&job);
            let report = analyze_job(checker.as_ref(), self.tool_runner.as_ref(), &options, &job);
            distributor.complete(0);
            collector.job_finished(&job, report, distributor);
        }
    }

    fn start_worker(&self, worker_id: usize) -> Result<LiveWorker> {
        let mut handle = self.launcher.launch(worker_id)?;
        handle.send(&Request::Configure(self.worker_options(worker_id)))?;
        Ok(LiveWorker {
            handle,
            buffer: CheckReport::default(),
            stopping: false,
        })
    }

    fn run_parallel(&self, collector: &mut Collector, distributor: &mut WorkDistributor) -> Result<()> {
        let count = self.config.jobs.min(distributor.total());
        tracing::debug!("Checking {} files with {count} workers", distributor.total());

        // All workers must be up before the first job goes out
        let mut workers = BTreeMap::new();
        for worker_id in 0..count {
            workers.insert(worker_id, self.start_worker(worker_id)?);
        }
        let mut next_id = count;

        for (&worker_id, worker) in workers.iter_mut() {
            dispatch(worker_id, worker, collector, distributor);
        }

        while !workers.is_empty() {
            let (worker_id, event) = {
                let ids: Vec<usize> = workers.keys().copied().collect();
                let mut select = Select::new();
                for id in &ids {
                    select.recv(workers[id].handle.events());
                }
                let oper = select.select();
                let worker_id = ids[oper.index()];
                let event = oper.recv(workers[&worker_id].handle.events());
                (worker_id, event)
            };

            let gone = match event {
                Ok(WorkerEvent::Frame(frame)) => {
                    if let Some(worker) = workers.get_mut(&worker_id) {
                        on_frame(worker_id, worker, frame, collector, distributor);
                    }
                    None
                }
                Ok(WorkerEvent::Lost(reason)) => Some(format!("sent an unreadable response ({reason})")),
                Ok(WorkerEvent::Exited(report)) => Some(report.description),
                Err(_) => Some("closed its event channel".to_string()),
            };
            let Some(reason) = gone else {
                continue;
            };
            let Some(worker) = workers.remove(&worker_id) else {
                continue;
            };

            if !self.worker_gone(worker_id, worker, &reason, collector, distributor) {
                continue;
            }

            // Keep the pool going while work remains
            let replacement_id = next_id;
            next_id += 1;
            match self.start_worker(replacement_id) {
                Ok(mut worker) => {
                    tracing::debug!("Worker {replacement_id} replaces worker {worker_id}");
                    dispatch(replacement_id, &mut worker, collector, distributor);
                    workers.insert(replacement_id, worker);
                }
                Err(e) => {
                    tracing::warn!("Could not start a replacement worker: {e:#}");
                    if workers.is_empty() {
                        fail_pending(replacement_id, &format!("could not be started: {e:#}"), collector, distributor);
                    }
                }
            }
        }
        Ok(())
    }

    /// Settle a worker that went away; returns whether a replacement is needed
    fn worker_gone(
        &self,
        worker_id: usize,
        mut worker: LiveWorker,
        reason: &str,
        collector: &mut Collector,
        distributor: &mut WorkDistributor,
    ) -> bool {
        let Some(job) = distributor.complete(worker_id) else {
            if worker.stopping {
                tracing::trace!("Worker {worker_id} {reason}");
            } else {
                tracing::warn!("Worker {worker_id} {reason} while idle");
            }
            return false;
        };

        tracing::warn!("Worker {worker_id} {reason} while checking {}", job.file.display());
        let mut report = std::mem::take(&mut worker.buffer);
        report.diagnostics.push(Diagnostic::worker_crash(&job.file, reason));
        collector.job_finished(&job, report, distributor);
        distributor.has_pending()
    }
}

/// Coordinator-side state of one worker
struct LiveWorker {
    handle: WorkerHandle,
    /// Results of the in-flight job, held until it finishes or the worker dies
    buffer: CheckReport,
    stopping: bool,
}

fn dispatch(
    worker_id: usize,
    worker: &mut LiveWorker,
    collector: &mut Collector,
    distributor: &mut WorkDistributor,
) {
    match distributor.assign(worker_id) {
        Some(job) => {
            collector.starting(&job);
            // A failed write means the worker is dying; its exit settles the job
            if let Err(e) = worker.handle.send(&Request::Analyze(job)) {
                tracing::debug!("{e:#}");
            }
        }
        None => {
            if let Err(e) = worker.handle.send(&Request::Stop) {
                tracing::debug!("{e:#}");
            }
            worker.handle.close_input();
            worker.stopping = true;
        }
    }
}

fn on_frame(
    worker_id: usize,
    worker: &mut LiveWorker,
    frame: Response,
    collector: &mut Collector,
    distributor: &mut WorkDistributor,
) {
    let current = distributor.in_flight(worker_id).map(|job| job.index);
    match frame {
        Response::Diagnostic { job, diagnostic } if current == Some(job) => {
            worker.buffer.diagnostics.push(diagnostic);
        }
        Response::Timing { job, sample } if current == Some(job) => {
            worker.buffer.timings.push(sample);
        }
        Response::Finished { job } if current == Some(job) => {
            if let Some(job) = distributor.complete(worker_id) {
                let report = std::mem::take(&mut worker.buffer);
                collector.job_finished(&job, report, distributor);
            }
            dispatch(worker_id, worker, collector, distributor);
        }
        other => tracing::warn!("Worker {worker_id} sent a frame for a job it does not hold: {other:?}"),
    }
}

/// No worker is left to run the remaining jobs
fn fail_pending(slot: usize, reason: &str, collector: &mut Collector, distributor: &mut WorkDistributor) {
    while let Some(job) = distributor.assign(slot) {
        distributor.complete(slot);
        let report = CheckReport {
            diagnostics: vec![Diagnostic::worker_crash(&job.file, reason)],
            timings: Vec::new(),
        };
        collector.job_finished(&job, report, distributor);
    }
}

/// Coordinator-side merge of finished jobs
struct Collector {
    filter: SuppressionFilter,
    results: ResultAggregator,
    timing: TimingAggregator,
    sink: ReportSink,
    quiet: bool,
    plist_output: Option<PathBuf>,
    report_unmatched: bool,
    unmatched: Vec<Diagnostic>,
}

impl Collector {
    fn new(config: &ExecutorConfig, filter: SuppressionFilter, sink: ReportSink) -> Self {
        Self {
            filter,
            results: ResultAggregator::new(MessageTemplate::new(&config.template), sink.clone()),
            timing: TimingAggregator::new(config.showtime, sink.clone()),
            sink,
            quiet: config.quiet,
            plist_output: config.plist_output.clone(),
            report_unmatched: config.report_unmatched_suppressions,
            unmatched: Vec::new(),
        }
    }

    fn starting(&self, job: &Job) {
        if !self.quiet {
            self.sink.out(&format!("Checking {} ...", job.file.display()));
        }
    }

    fn job_finished(&mut self, job: &Job, report: CheckReport, progress: &WorkDistributor) {
        let mut kept = Vec::with_capacity(report.diagnostics.len());
        for diagnostic in report.diagnostics {
            if self.filter.is_suppressed(&diagnostic) {
                continue;
            }
            if diagnostic.id == UNMATCHED_SUPPRESSION {
                self.results.notice(&diagnostic);
                self.unmatched.push(diagnostic);
                continue;
            }
            self.results.report(&diagnostic);
            kept.push(diagnostic);
        }

        if let Some(dir) = &self.plist_output
            && let Err(e) = write_plist(dir, &job.file, job.index, &kept)
        {
            tracing::warn!("{e:#}");
        }

        self.timing.file_finished(&job.file, &report.timings);

        if !self.quiet && progress.total() > 1 {
            self.sink.out(&format!(
                "{}/{} files checked {}% done",
                progress.done(),
                progress.total(),
                progress.percent_done()
            ));
        }
    }

    fn finish(mut self) -> ExecutionResult {
        if self.report_unmatched {
            for notice in self.filter.unmatched() {
                if self.filter.is_suppressed(&notice) {
                    continue;
                }
                self.results.notice(&notice);
                self.unmatched.push(notice);
            }
        }
        self.timing.finish();

        ExecutionResult {
            total: self.results.total(),
            timing_report: self.timing.rendered(),
            unmatched: self.unmatched,
            printed: self.results.into_printed(),
        }
    }
}
