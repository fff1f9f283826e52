//! Worker launchers
//!
//! A launched worker is a request stream the coordinator writes to plus a
//! bounded event channel fed by a reader thread. The reader forwards every
//! response frame and, once the stream closes, reports how the worker ended.

use anyhow::{Context, Result};
use crossbeam::channel::{Receiver, Sender, bounded};
use std::io::{BufReader, BufWriter, Read, Write};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;

use super::transport::{Request, Response, read_frame, write_frame};
use super::worker::{panic_message, serve};
use crate::checks::Checker;
use crate::external::{ExternalToolRunner, ProcessToolRunner};

/// Frames buffered per worker before its reader blocks
const EVENT_BUFFER: usize = 64;

/// How a worker went away
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    pub success: bool,
    pub description: String,
}

impl ExitReport {
    pub fn normal() -> Self {
        Self {
            success: true,
            description: "exited normally".to_string(),
        }
    }

    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            success: false,
            description: description.into(),
        }
    }

    fn from_status(status: std::io::Result<ExitStatus>) -> Self {
        let status = match status {
            Ok(status) => status,
            Err(e) => return Self::failed(format!("could not be waited on: {e}")),
        };
        if status.success() {
            return Self::normal();
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::failed(format!("was killed by signal {signal}"));
            }
        }
        match status.code() {
            Some(code) => Self::failed(format!("exited with code {code}")),
            None => Self::failed("exited abnormally"),
        }
    }
}

/// Something the coordinator hears from a worker
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Frame(Response),
    /// The response stream can no longer be trusted
    Lost(String),
    /// Always the last event of a worker
    Exited(ExitReport),
}

/// Coordinator-side handle of one running worker
pub struct WorkerHandle {
    pub id: usize,
    input: Option<Box<dyn Write + Send>>,
    events: Receiver<WorkerEvent>,
}

impl WorkerHandle {
    pub fn new(id: usize, input: Box<dyn Write + Send>, events: Receiver<WorkerEvent>) -> Self {
        Self {
            id,
            input: Some(input),
            events,
        }
    }

    pub fn send(&mut self, request: &Request) -> Result<()> {
        let input = self
            .input
            .as_mut()
            .with_context(|| format!("Worker {} input already closed", self.id))?;
        write_frame(input, request).with_context(|| format!("Failed to write to worker {}", self.id))
    }

    /// Drop the request stream; the worker sees end of input
    pub fn close_input(&mut self) {
        self.input = None;
    }

    pub fn events(&self) -> &Receiver<WorkerEvent> {
        &self.events
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("open", &self.input.is_some())
            .finish()
    }
}

/// Starts isolated worker contexts
pub trait WorkerLauncher: Send + Sync {
    fn launch(&self, worker_id: usize) -> Result<WorkerHandle>;
}

/// State moved into a reader thread
struct ReaderContext<R> {
    worker_id: usize,
    output: R,
    event_tx: Sender<WorkerEvent>,
}

/// Spawn the reader thread for one worker; `wait` runs after the response
/// stream closes and reports how the worker ended
fn spawn_reader<R, F>(worker_id: usize, output: R, wait: F) -> Result<Receiver<WorkerEvent>>
where
    R: Read + Send + 'static,
    F: FnOnce() -> ExitReport + Send + 'static,
{
    let (event_tx, event_rx) = bounded(EVENT_BUFFER);
    let ctx = ReaderContext {
        worker_id,
        output,
        event_tx,
    };
    thread::Builder::new()
        .name(format!("parcheck-reader-{worker_id}"))
        .spawn(move || read_events(ctx, wait))
        .context("Failed to spawn worker reader thread")?;
    Ok(event_rx)
}

fn read_events<R: Read, F: FnOnce() -> ExitReport>(ctx: ReaderContext<R>, wait: F) {
    let mut reader = BufReader::new(ctx.output);
    loop {
        match read_frame::<_, Response>(&mut reader) {
            Ok(Some(frame)) => {
                if ctx.event_tx.send(WorkerEvent::Frame(frame)).is_err() {
                    break; // Coordinator gone
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Worker {}: {e:#}", ctx.worker_id);
                let _ = ctx.event_tx.send(WorkerEvent::Lost(format!("{e:#}")));
                break;
            }
        }
    }
    // Closing our end unblocks a worker stuck writing
    drop(reader);
    let report = wait();
    tracing::debug!("Worker {} {}", ctx.worker_id, report.description);
    let _ = ctx.event_tx.send(WorkerEvent::Exited(report));
}

/// Workers as child processes speaking the frame protocol over stdio
///
/// By default the child is this binary's hidden `worker` subcommand.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    program: Option<PathBuf>,
    args: Vec<String>,
}

impl ProcessLauncher {
    /// Re-invoke the running executable as `<exe> worker`
    pub fn own_binary() -> Self {
        Self {
            program: None,
            args: vec!["worker".to_string()],
        }
    }

    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: Some(program.into()),
            args,
        }
    }

    fn program(&self) -> Result<PathBuf> {
        match &self.program {
            Some(program) => Ok(program.clone()),
            None => std::env::current_exe().context("Failed to locate the running executable"),
        }
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(&self, worker_id: usize) -> Result<WorkerHandle> {
        let program = self.program()?;
        let mut child = Command::new(&program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to launch worker '{}'", program.display()))?;
        tracing::debug!("Worker {worker_id} started as pid {}", child.id());

        let stdin = child.stdin.take().context("Worker stdin was not captured")?;
        let stdout = child.stdout.take().context("Worker stdout was not captured")?;
        let events = spawn_reader(worker_id, stdout, move || ExitReport::from_status(child.wait()))?;
        Ok(WorkerHandle::new(worker_id, Box::new(stdin), events))
    }
}

/// Workers as threads of this process, connected through OS pipes
///
/// Same protocol and failure handling as `ProcessLauncher` without the
/// process boundary; a worker that panics outside a job looks like a crash.
#[derive(Clone)]
pub struct ThreadLauncher {
    checker: Option<Arc<dyn Checker>>,
    tool_runner: Arc<dyn ExternalToolRunner>,
}

impl Default for ThreadLauncher {
    fn default() -> Self {
        Self {
            checker: None,
            tool_runner: Arc::new(ProcessToolRunner),
        }
    }
}

impl ThreadLauncher {
    pub fn new(checker: Option<Arc<dyn Checker>>, tool_runner: Arc<dyn ExternalToolRunner>) -> Self {
        Self {
            checker,
            tool_runner,
        }
    }
}

impl WorkerLauncher for ThreadLauncher {
    fn launch(&self, worker_id: usize) -> Result<WorkerHandle> {
        let (request_rx, request_tx) = std::io::pipe().context("Failed to create request pipe")?;
        let (response_rx, response_tx) = std::io::pipe().context("Failed to create response pipe")?;

        let checker = self.checker.clone();
        let tool_runner = self.tool_runner.clone();
        let worker = thread::Builder::new()
            .name(format!("parcheck-worker-{worker_id}"))
            .spawn(move || {
                catch_unwind(AssertUnwindSafe(|| {
                    serve(
                        BufReader::new(request_rx),
                        BufWriter::new(response_tx),
                        checker,
                        tool_runner,
                    )
                }))
            })
            .context("Failed to spawn worker thread")?;

        let events = spawn_reader(worker_id, response_rx, move || match worker.join() {
            Ok(Ok(Ok(()))) => ExitReport::normal(),
            Ok(Ok(Err(e))) => ExitReport::failed(format!("stopped with an error: {e:#}")),
            Ok(Err(panic)) | Err(panic) => {
                ExitReport::failed(format!("panicked: {}", panic_message(panic.as_ref())))
            }
        })?;
        Ok(WorkerHandle::new(worker_id, Box::new(request_tx), events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CheckerConfig, ExternalToolConfig};
    use crate::external::RecordingToolRunner;
    use crate::model::{Job, Language, SourceFile};
    use crate::parallel::transport::WorkerOptions;
    use std::time::Duration;

    fn configure(id: usize) -> Request {
        Request::Configure(WorkerOptions {
            worker_id: id,
            external_tool: ExternalToolConfig::default(),
            checks: CheckerConfig::default(),
            inline_suppressions: false,
            report_unmatched_suppressions: false,
        })
    }

    fn drain(handle: &WorkerHandle) -> Vec<WorkerEvent> {
        let mut events = Vec::new();
        loop {
            let event = handle.events().recv_timeout(Duration::from_secs(10)).unwrap();
            let done = matches!(event, WorkerEvent::Exited(_));
            events.push(event);
            if done {
                return events;
            }
        }
    }

    #[test]
    fn test_thread_worker_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.c");
        std::fs::write(&file, "int x = 1 / 0;\n").unwrap();

        let launcher = ThreadLauncher::new(None, Arc::new(RecordingToolRunner::default()));
        let mut handle = launcher.launch(1).unwrap();
        handle.send(&configure(1)).unwrap();
        let job = Job::from_source(0, SourceFile::new(&file, Language::C, 0));
        handle.send(&Request::Analyze(job)).unwrap();
        handle.send(&Request::Stop).unwrap();
        handle.close_input();

        let events = drain(&handle);
        assert!(events.iter().any(|e| matches!(
            e,
            WorkerEvent::Frame(Response::Diagnostic { job: 0, diagnostic }) if diagnostic.id == "zerodiv"
        )));
        assert!(events.contains(&WorkerEvent::Frame(Response::Finished { job: 0 })));
        assert_eq!(events.last(), Some(&WorkerEvent::Exited(ExitReport::normal())));
    }

    #[test]
    fn test_closed_input_ends_idle_worker() {
        let launcher = ThreadLauncher::new(None, Arc::new(RecordingToolRunner::default()));
        let mut handle = launcher.launch(0).unwrap();
        handle.send(&configure(0)).unwrap();
        handle.close_input();

        let events = drain(&handle);
        assert_eq!(events, vec![WorkerEvent::Exited(ExitReport::normal())]);
        assert!(handle.send(&Request::Stop).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_killed_process_is_reported() {
        let launcher = ProcessLauncher::new(
            "sh",
            vec!["-c".to_string(), "read line; kill -9 $$".to_string()],
        );
        let mut handle = launcher.launch(0).unwrap();
        handle.send(&configure(0)).unwrap();

        let events = drain(&handle);
        assert_eq!(
            events.last(),
            Some(&WorkerEvent::Exited(ExitReport::failed("was killed by signal 9")))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_garbage_output_is_lost() {
        let launcher = ProcessLauncher::new(
            "sh",
            vec!["-c".to_string(), "echo not-a-frame".to_string()],
        );
        let handle = launcher.launch(0).unwrap();
        let events = drain(&handle);
        assert!(matches!(events[0], WorkerEvent::Lost(_)));
        assert!(matches!(events.last(), Some(WorkerEvent::Exited(_))));
    }

    #[test]
    fn test_missing_program_fails_to_launch() {
        let launcher = ProcessLauncher::new("/no/such/parcheck-worker", Vec::new());
        assert!(launcher.launch(0).is_err());
    }
}
