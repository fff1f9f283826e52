//! Value types flowing between the coordinator, workers and reports

mod diagnostic;
mod job;
mod timing;

pub use diagnostic::{
    Diagnostic, DiagnosticKey, INTERNAL_ERROR, Severity, UNMATCHED_SUPPRESSION, WORKER_CRASH,
};
pub use job::{FileSettings, Job, Language, SourceFile};
pub use timing::{ShowtimeMode, TimingSample};
