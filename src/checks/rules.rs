//! Null pointer and division rules

use lazy_static::lazy_static;
use regex::Regex;

use super::source::SourceText;
use crate::model::{Diagnostic, Severity};

pub const NULL_POINTER: &str = "nullPointer";
pub const ZERO_DIVISION: &str = "zerodiv";

lazy_static! {
    // `*((T*)0)`; group 1 is the cast expression starting at its inner paren
    static ref NULL_DEREF: Regex =
        Regex::new(r"\*\s*\(\s*(\(\s*[A-Za-z_][\w:]*(?:\s+[A-Za-z_][\w:]*)*\s*\*+\s*\)\s*0)\s*\)").unwrap();
    static ref PUNCT_SPACING: Regex = Regex::new(r"\s*([()*])\s*").unwrap();
    static ref SPACING: Regex = Regex::new(r"\s+").unwrap();
    // `/ 0`, `% 0`, `/= 0`; group 1 is the operator
    static ref DIV_ZERO: Regex = Regex::new(r"([/%]=?)\s*0+(?:[uUlL]*)(?:[^\w.]|$)").unwrap();
}

/// 1-based column of byte offset `byte` in `line`
pub(crate) fn column_of(line: &str, byte: usize) -> u32 {
    line[..byte].chars().count() as u32 + 1
}

/// Explicit dereference of a casted null constant
pub fn null_pointer(source: &SourceText) -> Vec<Diagnostic> {
    let mut found = Vec::new();
    for (idx, line) in source.code.iter().enumerate() {
        for caps in NULL_DEREF.captures_iter(line) {
            let Some(cast) = caps.get(1) else { continue };
            let tight = PUNCT_SPACING.replace_all(cast.as_str(), "$1");
            let expression = SPACING.replace_all(&tight, " ");
            found.push(Diagnostic::new(
                &source.path,
                idx as u32 + 1,
                column_of(line, cast.start()),
                Severity::Error,
                NULL_POINTER,
                format!("Null pointer dereference: {expression}"),
            ));
        }
    }
    found
}

/// Division or modulo by a literal zero
pub fn zero_division(source: &SourceText) -> Vec<Diagnostic> {
    let mut found = Vec::new();
    for (idx, line) in source.code.iter().enumerate() {
        for caps in DIV_ZERO.captures_iter(line) {
            let Some(op) = caps.get(1) else { continue };
            if op.start() > 0 && line.as_bytes()[op.start() - 1] == b'/' {
                continue;
            }
            found.push(Diagnostic::new(
                &source.path,
                idx as u32 + 1,
                column_of(line, op.start()),
                Severity::Error,
                ZERO_DIVISION,
                "Division by zero.",
            ));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn source(content: &str) -> SourceText {
        SourceText::parse(Path::new("process_1.cpp"), content)
    }

    #[test]
    fn test_null_pointer_in_block() {
        let diags = null_pointer(&source(
            "int main()\n{\n  {int i = *((int*)0);}\n  return 0;\n}\n",
        ));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, 3);
        assert_eq!(diags[0].column, 14);
        assert_eq!(diags[0].message, "Null pointer dereference: (int*)0");
        assert_eq!(diags[0].id, NULL_POINTER);
    }

    #[test]
    fn test_null_pointer_void_cast() {
        let diags = null_pointer(&source("inline void f()\n{\n  (void)*((int*)0);\n}"));
        assert_eq!(diags.len(), 1);
        assert_eq!((diags[0].line, diags[0].column), (3, 11));
    }

    #[test]
    fn test_null_pointer_normalizes_spacing() {
        let diags = null_pointer(&source("x = * ( ( unsigned int * ) 0 );"));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Null pointer dereference: (unsigned int*)0");
        assert_eq!(diags[0].column, 9);

        let diags = null_pointer(&source("y = *(\t(char*)0);"));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].column, 8);
    }

    #[test]
    fn test_null_pointer_ignores_comments_and_strings() {
        assert!(null_pointer(&source("// *((int*)0)\nputs(\"*((int*)0)\");")).is_empty());
        assert!(null_pointer(&source("int *p = (int*)0;")).is_empty());
    }

    #[test]
    fn test_zero_division() {
        let diags = zero_division(&source("int a = 10 / 0;\nint b = a % 0;\nb /= 0;"));
        assert_eq!(diags.len(), 3);
        assert_eq!((diags[0].line, diags[0].column), (1, 12));
        assert_eq!(diags[0].message, "Division by zero.");
        assert_eq!(diags[2].column, 3);
    }

    #[test]
    fn test_zero_division_negatives() {
        assert!(zero_division(&source("int a = 10 / 05.0;")).is_empty());
        assert!(zero_division(&source("int a = 10 / 0.5;")).is_empty());
        assert!(zero_division(&source("int a = 10 / 100;")).is_empty());
        assert!(zero_division(&source("int a = 10; // / 0")).is_empty());
        assert!(zero_division(&source("int a = 10 / 0x10;")).is_empty());
    }
}
