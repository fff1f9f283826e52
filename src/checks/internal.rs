//! Validator for token-pattern strings and token navigation chains
//!
//! Looks at string literals handed to `Token::Match`, `Token::findmatch`,
//! `Token::simpleMatch` and `Token::findsimplematch`, and at chained
//! `next()`/`previous()`/`tokAt()` calls.

use lazy_static::lazy_static;
use regex::Regex;

use super::rules::column_of;
use super::source::SourceText;
use crate::model::{Diagnostic, Severity};

lazy_static! {
    static ref MATCH_CALL: Regex = Regex::new(
        r#"Token\s*::\s*(Match|findmatch|simpleMatch|findsimplematch)\s*\(\s*([^,;]*?)\s*,\s*"((?:[^"\\]|\\.)*)""#
    )
    .unwrap();
    static ref NAVIGATION: Regex = Regex::new(
        r"\b(previous|next)\s*\(\s*\)\s*->\s*(previous|next|tokAt|strAt|strValue|linkAt|link|str)\s*\(|\btokAt\s*\([^()]*\)\s*->\s*(previous|next|tokAt|strAt|strValue|linkAt|link|str)\s*\("
    )
    .unwrap();
    static ref GUARD_AND: Regex = Regex::new(
        r"(?:^|[(&|\s])([A-Za-z_]\w*(?:\s*->\s*\w+\s*\(\s*\))*)\s*&&\s*Token\s*::\s*(?:Match|findmatch|simpleMatch|findsimplematch)\s*\(\s*([^,;]*?)\s*,"
    )
    .unwrap();
    static ref GUARD_OR: Regex = Regex::new(
        r"!\s*([A-Za-z_]\w*(?:\s*->\s*\w+\s*\(\s*\))*)\s*\|\|\s*!\s*Token\s*::\s*(?:Match|findmatch|simpleMatch|findsimplematch)\s*\(\s*([^,;]*?)\s*,"
    )
    .unwrap();
    static ref BLANKS: Regex = Regex::new(r"\s+").unwrap();
}

const KNOWN_PATTERNS: &[&str] = &[
    "%any%", "%assign%", "%bool%", "%char%", "%comp%", "%num%", "%op%", "%cop%", "%or%",
    "%oror%", "%str%", "%type%", "%name%", "%var%", "%varid%",
];

/// A pattern literal passed to one of the match functions
struct PatternCall<'a> {
    function: &'a str,
    pattern: &'a str,
    line: u32,
    column: u32,
}

impl PatternCall<'_> {
    fn is_complex_matcher(&self) -> bool {
        matches!(self.function, "Match" | "findmatch")
    }

    fn diagnostic(&self, file: &SourceText, severity: Severity, id: &str, message: String) -> Diagnostic {
        Diagnostic::new(&file.path, self.line, self.column, severity, id, message)
    }
}

/// Run every pattern and navigation rule over `source`
pub fn check(source: &SourceText) -> Vec<Diagnostic> {
    let mut calls = Vec::new();
    for (idx, line) in source.raw.iter().enumerate() {
        if source.code[idx].trim().is_empty() {
            continue;
        }
        for caps in MATCH_CALL.captures_iter(line) {
            let (Some(function), Some(pattern)) = (caps.get(1), caps.get(3)) else {
                continue;
            };
            calls.push(PatternCall {
                function: function.as_str(),
                pattern: pattern.as_str(),
                line: idx as u32 + 1,
                column: column_of(line, pattern.start() - 1),
            });
        }
    }

    let mut found = Vec::new();
    for call in &calls {
        if call.is_complex_matcher() {
            or_in_complex_pattern(source, call, &mut found);
            simple_pattern_in_match(source, call, &mut found);
        } else {
            complex_pattern_in_simple_match(source, call, &mut found);
        }
    }
    for call in calls.iter().filter(|c| c.is_complex_matcher()) {
        missing_percent_character(source, call, &mut found);
    }
    for call in calls.iter().filter(|c| c.is_complex_matcher()) {
        unknown_pattern(source, call, &mut found);
    }
    redundant_next_previous(source, &mut found);
    for call in &calls {
        extra_whitespace(source, call, &mut found);
    }
    redundant_tok_check(source, &mut found);
    found
}

fn or_in_complex_pattern(source: &SourceText, call: &PatternCall, found: &mut Vec<Diagnostic>) {
    let p = call.pattern;
    if p.contains("||") || p.contains(" | ") || p.starts_with('|') || p.ends_with(" |") {
        found.push(call.diagnostic(
            source,
            Severity::Error,
            "orInComplexPattern",
            format!(
                "Token::{}() pattern \"{p}\" contains \"||\" or \"|\". Replace it by \"%oror%\" or \"%or%\".",
                call.function
            ),
        ));
    }
}

fn simple_pattern_in_match(source: &SourceText, call: &PatternCall, found: &mut Vec<Diagnostic>) {
    let p = call.pattern;
    if p.contains(['[', '|']) || p.contains("!!") {
        return;
    }

    // Only `%or%`/`%oror%` placeholders leave a pattern simple
    let bytes = p.as_bytes();
    let mut complex = false;
    let mut index = p.find('%');
    while let Some(i) = index {
        if bytes.len() <= i + 2 {
            complex = true;
            break;
        }
        if &bytes[i + 1..i + 3] != b"or" {
            complex = true;
            break;
        }
        let next = match p[i + 1..].find('%') {
            Some(close) => i + 1 + close,
            None => break,
        };
        index = p[next + 1..].find('%').map(|off| next + 1 + off);
    }

    if !complex {
        found.push(call.diagnostic(
            source,
            Severity::Warning,
            "simplePatternInTokenMatch",
            format!("Found simple pattern inside Token::{}() call: \"{p}\"", call.function),
        ));
    }
}

fn complex_pattern_in_simple_match(
    source: &SourceText,
    call: &PatternCall,
    found: &mut Vec<Diagnostic>,
) {
    let p = call.pattern;
    let mut complex = false;

    // `[abc]` or `a|b` within one token; a standalone `[`, `]` or `|` is fine
    let mut char_count = 0usize;
    for c in p.chars() {
        match c {
            ' ' => char_count = 0,
            ']' | '|' => {
                if char_count > 0 {
                    complex = true;
                    break;
                }
            }
            _ => char_count += 1,
        }
    }

    if !complex {
        let bytes = p.as_bytes();
        complex = bytes
            .iter()
            .enumerate()
            .any(|(i, b)| *b == b'%' && bytes.get(i + 1).is_some_and(|n| *n != b' '));
    }
    if !complex {
        complex = p.contains("!!");
    }

    if complex {
        found.push(call.diagnostic(
            source,
            Severity::Error,
            "complexPatternInTokenSimpleMatch",
            format!("Found complex pattern inside Token::{}() call: \"{p}\"", call.function),
        ));
    }
}

fn missing_percent_character(source: &SourceText, call: &PatternCall, found: &mut Vec<Diagnostic>) {
    let p = call.pattern;
    for known in KNOWN_PATTERNS {
        let broken = &known[..known.len() - 1];
        let whitelisted = match broken {
            "%var" => Some("%varid%"),
            "%or" => Some("%oror%"),
            _ => None,
        };

        let mut search = 0;
        while let Some(off) = p[search..].find(broken) {
            let pos = search + off;
            let rest = &p[pos..];
            let intact = rest.starts_with(known) || whitelisted.is_some_and(|w| rest.starts_with(w));
            if !intact {
                found.push(call.diagnostic(
                    source,
                    Severity::Error,
                    "missingPercentCharacter",
                    format!("Missing percent end character in Token::Match() pattern: \"{p}\""),
                ));
                return;
            }
            search = pos + 1;
        }
    }
}

fn unknown_pattern(source: &SourceText, call: &PatternCall, found: &mut Vec<Diagnostic>) {
    let p = call.pattern;
    let bytes = p.as_bytes();
    let mut in_brackets = false;
    let mut j = 0;

    while j + 1 < bytes.len() {
        let c = bytes[j];
        if c == b'[' && (j == 0 || bytes[j - 1] == b' ') {
            in_brackets = true;
        } else if c == b']' {
            in_brackets = false;
        } else if c == b'%' && bytes[j + 1] != b' ' && bytes[j + 1] != b'|' && !in_brackets {
            if let Some(off) = p[j + 1..].find('%') {
                let end = j + 1 + off;
                let candidate = &p[j..=end];
                if !KNOWN_PATTERNS.contains(&candidate) {
                    found.push(call.diagnostic(
                        source,
                        Severity::Error,
                        "unknownPattern",
                        format!("Unknown pattern used: \"{candidate}\""),
                    ));
                }
                j = end;
            }
        }
        j += 1;
    }
}

fn extra_whitespace(source: &SourceText, call: &PatternCall, found: &mut Vec<Diagnostic>) {
    let p = call.pattern;
    if !p.is_empty() && (p.starts_with(' ') || p.ends_with(' ') || p.contains("  ")) {
        found.push(call.diagnostic(
            source,
            Severity::Warning,
            "extraWhitespaceError",
            format!("Found extra whitespace inside Token::{}() call: \"{p}\"", call.function),
        ));
    }
}

/// `tok->next()->previous()` and friends; overlapping chains each report
fn redundant_next_previous(source: &SourceText, found: &mut Vec<Diagnostic>) {
    for (idx, line) in source.code.iter().enumerate() {
        let mut start = 0;
        while let Some(caps) = NAVIGATION.captures_at(line, start) {
            let Some(whole) = caps.get(0) else { break };
            let (first, second) = match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(f1), Some(f2), _) => (f1.as_str(), f2),
                (None, None, Some(f2)) => ("tokAt", f2),
                _ => break,
            };
            start = second.start();

            if matches!(second.as_str(), "previous" | "next" | "str" | "link")
                && !line[whole.end()..].trim_start().starts_with(')')
            {
                continue;
            }
            found.push(Diagnostic::new(
                &source.path,
                idx as u32 + 1,
                column_of(line, whole.start()),
                Severity::Style,
                "redundantNextPrevious",
                format!(
                    "Call to 'Token::{first}()' followed by 'Token::{}()' can be simplified.",
                    second.as_str()
                ),
            ));
        }
    }
}

/// `tok && Token::Match(tok, ...)` and `!tok || !Token::Match(tok, ...)`
fn redundant_tok_check(source: &SourceText, found: &mut Vec<Diagnostic>) {
    for (idx, line) in source.raw.iter().enumerate() {
        if source.code[idx].trim().is_empty() {
            continue;
        }
        for regex in [&*GUARD_AND, &*GUARD_OR] {
            for caps in regex.captures_iter(line) {
                let (Some(guard), Some(arg)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                let guard_text = BLANKS.replace_all(guard.as_str(), "");
                if guard_text != BLANKS.replace_all(arg.as_str(), "") {
                    continue;
                }
                found.push(Diagnostic::new(
                    &source.path,
                    idx as u32 + 1,
                    column_of(line, guard.start()),
                    Severity::Style,
                    "redundantTokCheck",
                    format!(
                        "Unnecessary check of \"{guard_text}\", match-function already checks if it is null."
                    ),
                ));
            }
        }
    }
}
