//! Per-file plist reports

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::model::Diagnostic;

/// `<dir>/<file-name>_<job-index>.plist`, with the name cut at its first dot
pub fn plist_path(dir: &Path, source: &Path, job_index: usize) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.split('.').next().unwrap_or_default();
    dir.join(format!("{stem}_{job_index}.plist"))
}

/// Write one job's diagnostics as a plist report
pub fn write_plist(
    dir: &Path,
    source: &Path,
    job_index: usize,
    diagnostics: &[Diagnostic],
) -> Result<PathBuf> {
    let path = plist_path(dir, source, job_index);
    std::fs::write(&path, render(source, diagnostics))
        .with_context(|| format!("Failed to write plist report {}", path.display()))?;
    tracing::trace!("Wrote plist {}", path.display());
    Ok(path)
}

fn render(source: &Path, diagnostics: &[Diagnostic]) -> String {
    let mut files: Vec<&Path> = vec![source];
    for diagnostic in diagnostics {
        if !files.contains(&diagnostic.file.as_path()) {
            files.push(&diagnostic.file);
        }
    }

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<!DOCTYPE plist PUBLIC \"-//Apple Computer//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n");
    out.push_str("<plist version=\"1.0\">\n<dict>\n");
    let _ = writeln!(
        out,
        " <key>clang_version</key>\n<string>parcheck version {}</string>",
        crate::VERSION
    );
    out.push_str(" <key>files</key>\n <array>\n");
    for file in &files {
        let _ = writeln!(out, "  <string>{}</string>", escape(&file.display().to_string()));
    }
    out.push_str(" </array>\n <key>diagnostics</key>\n <array>\n");
    for diagnostic in diagnostics {
        let file_index = files
            .iter()
            .position(|f| *f == diagnostic.file.as_path())
            .unwrap_or(0);
        let message = escape(&diagnostic.message);
        out.push_str("  <dict>\n");
        let _ = writeln!(out, "   <key>description</key>\n   <string>{message}</string>");
        let _ = writeln!(
            out,
            "   <key>category</key>\n   <string>{}</string>",
            diagnostic.severity
        );
        let _ = writeln!(out, "   <key>type</key>\n   <string>{message}</string>");
        let _ = writeln!(
            out,
            "   <key>check_name</key>\n   <string>{}</string>",
            escape(&diagnostic.id)
        );
        out.push_str("   <key>location</key>\n   <dict>\n");
        let _ = writeln!(out, "    <key>line</key><integer>{}</integer>", diagnostic.line);
        let _ = writeln!(out, "    <key>col</key><integer>{}</integer>", diagnostic.column);
        let _ = writeln!(out, "    <key>file</key><integer>{file_index}</integer>");
        out.push_str("   </dict>\n  </dict>\n");
    }
    out.push_str(" </array>\n</dict>\n</plist>\n");
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
