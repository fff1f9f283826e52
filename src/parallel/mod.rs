//! Parallel check execution
//!
//! The coordinator splits the input into jobs and runs them on isolated
//! workers, one job per worker at a time. A worker that dies takes only its
//! in-flight job with it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  Configure / Analyze / Stop   ┌─────────────────┐
//! │   Coordinator    │──────────────────────────────▶│   Worker N      │
//! │                  │                               │                 │
//! │ • distributor    │◀──────────────────────────────│ • checker       │
//! │ • suppressions   │  Diagnostic / Timing /        │ • external tool │
//! │ • aggregators    │  Finished (NDJSON frames)     │                 │
//! └──────────────────┘                               └─────────────────┘
//!          ▲
//!          │ bounded channel per worker (reader thread)
//! ```
//!
//! - **Launchers**: `ProcessLauncher` re-invokes this binary as `worker`;
//!   `ThreadLauncher` runs the same loop on a thread behind OS pipes.
//! - **Distribution**: jobs go out in submission order to whichever worker
//!   becomes idle; the coordinator waits on every worker's channel at once.
//! - **Failure**: a dead worker's in-flight job gets a `workerCrash`
//!   diagnostic and a replacement is launched while jobs remain.
//! - **Sequential**: `jobs == 1` runs inline with nothing launched.
//!
//! ```rust,no_run
//! use parcheck::config::ExecutorConfig;
//! use parcheck::model::SourceFile;
//! use parcheck::parallel::Executor;
//!
//! let config = ExecutorConfig { jobs: 4, ..ExecutorConfig::default() };
//! let files = vec![SourceFile::from_path("src/main.c")];
//! let result = Executor::new(config).check(&files, &[])?;
//! println!("{} diagnostics", result.total);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod core;
pub mod distributor;
pub mod launcher;
pub mod transport;
pub mod worker;

pub use self::core::{ExecutionResult, Executor};
pub use distributor::WorkDistributor;
pub use launcher::{ExitReport, ProcessLauncher, ThreadLauncher, WorkerEvent, WorkerHandle, WorkerLauncher};
pub use worker::{analyze_job, serve};
