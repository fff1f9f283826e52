//! Source text as the built-in rules see it
//!
//! Each line is kept raw and as "code": comments blanked out and string or
//! character literal contents replaced with spaces, so column positions stay
//! valid while rules never fire inside literals or comments.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref INCLUDE: Regex = Regex::new(r#"^\s*#\s*include\s*"([^"]+)""#).unwrap();
    static ref INLINE_SUPPRESS: Regex =
        Regex::new(r"^\s*parcheck-suppress\s+([A-Za-z0-9_*-]+)").unwrap();
}

/// `// parcheck-suppress <id>` found in a comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSuppression {
    pub id: String,
    /// Line the comment sits on
    pub comment_line: u32,
    /// Line whose diagnostics it silences
    pub target_line: u32,
}

#[derive(Debug, Clone)]
pub struct SourceText {
    pub path: PathBuf,
    pub raw: Vec<String>,
    pub code: Vec<String>,
    pub suppressions: Vec<InlineSuppression>,
}

impl SourceText {
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::parse(path, &String::from_utf8_lossy(&bytes)))
    }

    pub fn parse(path: &Path, content: &str) -> Self {
        let raw: Vec<String> = content.lines().map(str::to_string).collect();
        let mut code = Vec::with_capacity(raw.len());
        let mut suppressions = Vec::new();
        let mut in_block_comment = false;

        for (idx, line) in raw.iter().enumerate() {
            let (masked, comment) = mask_line(line, &mut in_block_comment);
            let line_no = idx as u32 + 1;
            if let Some(caps) = comment.as_deref().and_then(|c| INLINE_SUPPRESS.captures(c)) {
                let own_line = masked.trim().is_empty();
                suppressions.push(InlineSuppression {
                    id: caps[1].to_string(),
                    comment_line: line_no,
                    target_line: if own_line { line_no + 1 } else { line_no },
                });
            }
            code.push(masked);
        }

        Self {
            path: path.to_path_buf(),
            raw,
            code,
            suppressions,
        }
    }

    /// Targets of `#include "..."` directives, in order
    pub fn local_includes(&self) -> Vec<String> {
        self.raw
            .iter()
            .zip(&self.code)
            .filter(|(_, code)| code.trim_start().starts_with('#'))
            .filter_map(|(raw, _)| INCLUDE.captures(raw).map(|c| c[1].to_string()))
            .collect()
    }
}

/// Blank comments and literal contents; returns the masked line and the text
/// of a trailing `//` comment, if any
fn mask_line(line: &str, in_block_comment: &mut bool) -> (String, Option<String>) {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if *in_block_comment {
            if c == '*' && next == Some('/') {
                *in_block_comment = false;
                out.push_str("  ");
                i += 2;
            } else {
                out.push(' ');
                i += 1;
            }
            continue;
        }

        match (c, next) {
            ('/', Some('/')) => {
                let comment: String = chars[i + 2..].iter().collect();
                out.extend(std::iter::repeat_n(' ', chars.len() - i));
                return (out, Some(comment));
            }
            ('/', Some('*')) => {
                *in_block_comment = true;
                out.push_str("  ");
                i += 2;
            }
            ('"', _) | ('\'', _) => {
                out.push(c);
                i += 1;
                while i < chars.len() {
                    match chars[i] {
                        '\\' => {
                            out.push(' ');
                            if i + 1 < chars.len() {
                                out.push(' ');
                            }
                            i += 2;
                        }
                        q if q == c => {
                            out.push(q);
                            i += 1;
                            break;
                        }
                        _ => {
                            out.push(' ');
                            i += 1;
                        }
                    }
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    (out, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_keeps_columns() {
        let src = SourceText::parse(
            Path::new("a.c"),
            "int x = 1 / 0; // 1 / 0\nchar *s = \"a / 0\";\n/* *((int*)0) */ int y;",
        );
        assert_eq!(src.code[0].len(), src.raw[0].len());
        assert_eq!(src.code[0].trim_end(), "int x = 1 / 0;");
        assert_eq!(src.code[1], "char *s = \"     \";");
        assert_eq!(src.code[2].trim(), "int y;");
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let src = SourceText::parse(Path::new("a.c"), "a /* start\n 1/0 \n end */ b");
        assert_eq!(src.code[0].trim(), "a");
        assert!(src.code[1].trim().is_empty());
        assert_eq!(src.code[2].trim(), "b");
    }

    #[test]
    fn test_local_includes() {
        let src = SourceText::parse(
            Path::new("a.c"),
            "#include <stdio.h>\n#include \"inc.h\"\n  # include \"sub/x.h\"\n// #include \"no.h\"",
        );
        assert_eq!(src.local_includes(), vec!["inc.h", "sub/x.h"]);
    }

    #[test]
    fn test_inline_suppressions() {
        let src = SourceText::parse(
            Path::new("a.c"),
            "// parcheck-suppress nullPointer\nint i = *((int*)0);\nint j = 1/0; // parcheck-suppress zerodiv",
        );
        assert_eq!(
            src.suppressions,
            vec![
                InlineSuppression {
                    id: "nullPointer".to_string(),
                    comment_line: 1,
                    target_line: 2,
                },
                InlineSuppression {
                    id: "zerodiv".to_string(),
                    comment_line: 3,
                    target_line: 3,
                },
            ]
        );
    }
}
