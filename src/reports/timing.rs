use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use super::sink::ReportSink;
use crate::model::{ShowtimeMode, TimingSample};

#[derive(Debug, Clone, Copy, Default)]
struct ScopeStats {
    total: Duration,
    results: usize,
}

impl ScopeStats {
    fn add(&mut self, elapsed: Duration) {
        self.total += elapsed;
        self.results += 1;
    }

    fn average(&self) -> Duration {
        match u32::try_from(self.results) {
            Ok(0) | Err(_) => self.total,
            Ok(n) => self.total / n,
        }
    }
}

/// Accumulates timing samples and renders the selected showtime report
///
/// Per-file modes print as each file finishes; summary modes print once from
/// `finish()`. Everything goes through the shared `ReportSink`.
pub struct TimingAggregator {
    mode: ShowtimeMode,
    sink: ReportSink,
    run: HashMap<String, ScopeStats>,
    rendered: Vec<String>,
    finished: bool,
}

impl TimingAggregator {
    pub fn new(mode: ShowtimeMode, sink: ReportSink) -> Self {
        Self {
            mode,
            sink,
            run: HashMap::new(),
            rendered: Vec::new(),
            finished: false,
        }
    }

    /// Fold in the samples of one finished file
    pub fn file_finished(&mut self, file: &Path, samples: &[TimingSample]) {
        if !self.mode.is_enabled() {
            return;
        }

        let mut per_file: HashMap<String, ScopeStats> = HashMap::new();
        for sample in samples {
            per_file
                .entry(sample.scope.clone())
                .or_default()
                .add(sample.elapsed);
            self.run
                .entry(sample.scope.clone())
                .or_default()
                .add(sample.elapsed);
        }

        match self.mode {
            ShowtimeMode::File => {
                let lines = scope_report(&per_file, None);
                self.emit(lines);
            }
            ShowtimeMode::Top5File => {
                let mut lines = scope_report(&per_file, Some(5));
                lines.push(String::new());
                self.emit(lines);
            }
            ShowtimeMode::FileTotal => {
                let total: Duration = per_file.values().map(|s| s.total).sum();
                self.emit(vec![format!(
                    "Check time: {}: {}s",
                    file.display(),
                    format_secs(total)
                )]);
            }
            ShowtimeMode::None | ShowtimeMode::Summary | ShowtimeMode::Top5Summary => {}
        }
    }

    /// Print the run-wide summary, once
    pub fn finish(&mut self) {
        if self.finished || !self.mode.is_summary() {
            return;
        }
        self.finished = true;

        let mut lines = match self.mode {
            ShowtimeMode::Top5Summary => scope_report(&self.run, Some(5)),
            _ => scope_report(&self.run, None),
        };
        if self.mode == ShowtimeMode::Top5Summary {
            lines.push(String::new());
        }
        self.emit(lines);
    }

    fn emit(&mut self, lines: Vec<String>) {
        for line in lines {
            self.sink.out(&line);
            self.rendered.push(line);
        }
    }

    /// Everything printed so far, one entry per line
    pub fn rendered(&self) -> String {
        let mut out = String::new();
        for line in &self.rendered {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Scope lines sorted slowest first, then the overall line
fn scope_report(scopes: &HashMap<String, ScopeStats>, limit: Option<usize>) -> Vec<String> {
    let mut sorted: Vec<(&String, &ScopeStats)> = scopes.iter().collect();
    sorted.sort_by(|a, b| b.1.total.cmp(&a.1.total).then_with(|| a.0.cmp(b.0)));

    let overall: Duration = scopes.values().map(|s| s.total).sum();
    let mut lines: Vec<String> = sorted
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|(scope, stats)| {
            format!(
                "{}: {}s (avg. {}s - {} result(s))",
                scope,
                format_secs(stats.total),
                format_secs(stats.average()),
                stats.results
            )
        })
        .collect();
    lines.push(format!("Overall time: {}s", format_secs(overall)));
    lines
}

fn format_secs(d: Duration) -> String {
    format!("{:.6}", d.as_secs_f64())
}
