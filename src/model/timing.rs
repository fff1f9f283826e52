//! Timing samples and the showtime mode selector

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One measured scope (a named check or phase) on one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSample {
    pub scope: String,
    #[serde(with = "duration_nanos")]
    pub elapsed: Duration,
    pub worker_id: usize,
}

impl TimingSample {
    pub fn new(scope: impl Into<String>, elapsed: Duration, worker_id: usize) -> Self {
        Self {
            scope: scope.into(),
            elapsed,
            worker_id,
        }
    }
}

/// Which timing report to print
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ShowtimeMode {
    /// No timing output
    #[default]
    None,
    /// Every scope per file, after the file finishes
    File,
    /// One total per file
    FileTotal,
    /// Every scope aggregated over the run, printed once
    Summary,
    /// Five slowest scopes per file
    Top5File,
    /// Five slowest scopes over the run, printed once
    Top5Summary,
}

impl ShowtimeMode {
    pub fn is_enabled(&self) -> bool {
        *self != ShowtimeMode::None
    }

    /// Modes that print once at the end of the run
    pub fn is_summary(&self) -> bool {
        matches!(self, ShowtimeMode::Summary | ShowtimeMode::Top5Summary)
    }
}

mod duration_nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_nanos().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_nanos(u64::deserialize(d)?))
    }
}
