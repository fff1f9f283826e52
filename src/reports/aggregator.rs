use std::collections::HashSet;

use super::sink::ReportSink;
use super::template::MessageTemplate;
use crate::model::{Diagnostic, DiagnosticKey};

/// Merges post-suppression diagnostics from every job
///
/// Every diagnostic counts; only the first occurrence of an identity is
/// printed. The merge is commutative: the final count and the printed set
/// do not depend on which worker delivered first.
pub struct ResultAggregator {
    template: MessageTemplate,
    sink: ReportSink,
    seen: HashSet<DiagnosticKey>,
    total: usize,
    printed: Vec<String>,
}

impl ResultAggregator {
    pub fn new(template: MessageTemplate, sink: ReportSink) -> Self {
        Self {
            template,
            sink,
            seen: HashSet::new(),
            total: 0,
            printed: Vec::new(),
        }
    }

    /// Count `diagnostic` and print it unless its identity was already shown.
    /// Returns whether it was printed.
    pub fn report(&mut self, diagnostic: &Diagnostic) -> bool {
        self.total += 1;
        self.print_once(diagnostic)
    }

    /// Print without counting, for notices outside the total
    pub fn notice(&mut self, diagnostic: &Diagnostic) -> bool {
        self.print_once(diagnostic)
    }

    fn print_once(&mut self, diagnostic: &Diagnostic) -> bool {
        if !self.seen.insert(diagnostic.key()) {
            tracing::trace!("Duplicate {} at {} not printed", diagnostic.id, diagnostic.callstack());
            return false;
        }
        let line = self.template.render(diagnostic);
        self.sink.err(&line);
        self.printed.push(line);
        true
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn into_printed(self) -> Vec<String> {
        self.printed
    }
}
