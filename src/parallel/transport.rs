//! Wire format between the coordinator and a worker
//!
//! One JSON object per line in each direction. Requests flow to the worker
//! over its stdin (or request pipe); responses flow back over stdout.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

use crate::config::{CheckerConfig, ExternalToolConfig};
use crate::model::{Diagnostic, Job, TimingSample};

/// Everything a worker needs to know before its first job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerOptions {
    pub worker_id: usize,
    pub external_tool: ExternalToolConfig,
    pub checks: CheckerConfig,
    pub inline_suppressions: bool,
    pub report_unmatched_suppressions: bool,
}

/// Coordinator to worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Configure(WorkerOptions),
    Analyze(Job),
    Stop,
}

/// Worker to coordinator; every frame names the job it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Diagnostic { job: usize, diagnostic: Diagnostic },
    Timing { job: usize, sample: TimingSample },
    Finished { job: usize },
}

pub fn write_frame<W: Write + ?Sized, T: Serialize>(writer: &mut W, frame: &T) -> Result<()> {
    let mut line = serde_json::to_vec(frame).context("Failed to encode frame")?;
    line.push(b'\n');
    writer.write_all(&line)?;
    writer.flush()?;
    Ok(())
}

/// Next frame, or `None` at end of stream. Blank lines are skipped.
pub fn read_frame<R: BufRead, T: DeserializeOwned>(reader: &mut R) -> Result<Option<T>> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let frame = serde_json::from_str(trimmed)
            .with_context(|| format!("Malformed frame: {}", truncate(trimmed, 120)))?;
        return Ok(Some(frame));
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
