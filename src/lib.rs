//! # parcheck - parallel static checks for C and C++
//!
//! Runs a static-analysis pass over many source files at once. Each file is
//! analyzed in an isolated worker; results stream back to a single
//! coordinator that filters, deduplicates and reports them.
//!
//! ## Features
//!
//! - **Process isolation**: a crashing worker costs one file, not the run
//! - **Deadlock-free draining**: workers may emit any amount of output
//! - **Deterministic reports**: the same total and printed set at any job count
//! - **Suppressions**: global rules, library markups and inline comments
//! - **Timing reports**: per-file and run-wide `--showtime` modes
//! - **External linter**: optional clang-tidy pass for files with settings
//!
//! ## Quick Start
//!
//! ```bash
//! parcheck check -j auto src/
//! parcheck check --project build/compile_commands.json --clang-tidy
//! ```

pub mod checks;
pub mod cli;
pub mod config;
pub mod external;
pub mod model;
pub mod parallel;
pub mod reports;
pub mod suppressions;

pub use cli::{Cli, Output};
pub use config::ExecutorConfig;
pub use parallel::{ExecutionResult, Executor};

/// Result type alias for parcheck operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
