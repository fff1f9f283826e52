//! Configuration for the executor
//!
//! `ExecutorConfig` is layered with figment (defaults, `parcheck.toml`,
//! a custom file, `PARCHECK_*` environment, CLI flags) and validated before
//! any worker is spawned. `project` loads compile databases into per-file
//! settings.

pub mod core;
pub mod project;
mod smart_load;

pub use self::core::{
    CheckerConfig, ExecutorConfig, ExternalToolConfig, LibraryConfig, LibraryMarkup, MAX_JOBS,
};
pub use project::load_compile_commands;
