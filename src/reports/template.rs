//! Message templates for printed diagnostics

use crate::model::Diagnostic;

/// Template used when none is configured
pub const DEFAULT_TEMPLATE: &str =
    "{callstack}: ({severity}) {inconclusive:inconclusive: }{message} [{id}]";

/// Resolve a configured template, expanding the named presets
pub fn resolve_preset(template: &str) -> &str {
    match template {
        "simple" => "{file}:{line}:{column}: {severity}:{inconclusive:inconclusive:} {message} [{id}]",
        "gcc" => "{file}:{line}:{column}: warning:{inconclusive:inconclusive:} {message} [{id}]",
        "vs" => "{file}({line}): {severity}:{inconclusive:inconclusive:} {message}",
        other => other,
    }
}

/// A parsed message template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    format: String,
}

impl MessageTemplate {
    pub fn new(template: &str) -> Self {
        let format = resolve_preset(template)
            .replace("\\n", "\n")
            .replace("\\t", "\t");
        Self { format }
    }

    /// Render one diagnostic
    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let mut out = String::with_capacity(self.format.len() + diagnostic.message.len());
        let mut rest = self.format.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return out;
            };
            let placeholder = &after[..end];
            match self.expand(placeholder, diagnostic) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('{');
                    out.push_str(placeholder);
                    out.push('}');
                }
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }

    fn expand(&self, placeholder: &str, diagnostic: &Diagnostic) -> Option<String> {
        if let Some(text) = placeholder.strip_prefix("inconclusive:") {
            return Some(if diagnostic.inconclusive {
                text.to_string()
            } else {
                String::new()
            });
        }
        let value = match placeholder {
            "file" => diagnostic.file.display().to_string(),
            "line" => diagnostic.line.to_string(),
            "column" => diagnostic.column.to_string(),
            "severity" => diagnostic.severity.to_string(),
            "id" => diagnostic.id.clone(),
            "message" => diagnostic.message.clone(),
            "callstack" => diagnostic.callstack(),
            _ => return None,
        };
        Some(value)
    }
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}
