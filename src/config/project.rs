//! Compile database loader
//!
//! Turns a `compile_commands.json` into per-file settings the executor can
//! hand to workers (and to the external tool step).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::model::{FileSettings, Language};

#[derive(Debug, Deserialize)]
struct CompileCommand {
    directory: PathBuf,
    file: PathBuf,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    arguments: Option<Vec<String>>,
}

/// Load every entry of a compile database as `FileSettings`
pub fn load_compile_commands(path: &Path) -> Result<Vec<FileSettings>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read compile database {}", path.display()))?;
    parse_compile_commands(&content)
        .with_context(|| format!("Failed to parse compile database {}", path.display()))
}

pub fn parse_compile_commands(content: &str) -> Result<Vec<FileSettings>> {
    let entries: Vec<CompileCommand> = serde_json::from_str(content)?;
    let mut settings = Vec::with_capacity(entries.len());

    for entry in entries {
        let file = if entry.file.is_absolute() {
            entry.file.clone()
        } else {
            entry.directory.join(&entry.file)
        };
        let args = match (&entry.arguments, &entry.command) {
            (Some(args), _) => args.clone(),
            (None, Some(command)) => split_command(command),
            (None, None) => Vec::new(),
        };

        let mut fs = FileSettings::new(
            &file,
            Language::from_path(&file).unwrap_or_default(),
            std::fs::metadata(&file).map(|m| m.len()).unwrap_or(0),
        );
        fs.directory = Some(entry.directory);
        apply_compiler_args(&mut fs, &args);
        settings.push(fs);
    }

    tracing::debug!("Loaded {} compile database entries", settings.len());
    Ok(settings)
}

fn apply_compiler_args(settings: &mut FileSettings, args: &[String]) {
    let mut iter = args.iter().peekable();
    while let Some(arg) = iter.next() {
        if let Some(define) = arg.strip_prefix("-D") {
            if define.is_empty() {
                if let Some(next) = iter.next() {
                    settings.defines.push(next.clone());
                }
            } else {
                settings.defines.push(define.to_string());
            }
        } else if let Some(include) = arg.strip_prefix("-I") {
            if include.is_empty() {
                if let Some(next) = iter.next() {
                    settings.include_paths.push(next.clone());
                }
            } else {
                settings.include_paths.push(include.to_string());
            }
        } else if let Some(std) = arg.strip_prefix("-std=") {
            settings.standard = Some(std.to_string());
        }
    }
}

/// Split a shell-style command line, honouring double and single quotes
fn split_command(command: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut has_token = false;

    for c in command.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"') | (None, '\'') => {
                quote = Some(c);
                has_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if has_token || !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            (None, c) => current.push(c),
        }
    }
    if has_token || !current.is_empty() {
        args.push(current);
    }
    args
}
