//! End-to-end checks of the per-kind heuristics through the scanner.

use std::sync::Arc;

use tracelink_core::source::SourceOrigin;
use tracelink_core::{JavaSourceIndex, ResolutionCache, StackTraceScanner};

const SAMPLE: &str = r#"package com.example;

class Sample {
    String trim(String text) {
        return text.trim();
    }
    int length(int[] arr) {
        return arr.length;
    }
    int read(int[] data) {
        return data[5];
    }
    int constant(int[] data) {
        final int i = 2;
        return data[i];
    }
    int mean(int total, int count) {
        return total / count;
    }
    String cast(Object raw) {
        return (String) raw;
    }
    void check(boolean ok) {
        assert ok;
    }
    int[] allocate(int n) {
        return new int[n];
    }
    void fail() {
        throw new IllegalStateException("boom");
    }
}
"#;

fn scanner() -> StackTraceScanner {
    let index = JavaSourceIndex::new();
    index
        .add_source("src/com/example/Sample.java", SAMPLE, SourceOrigin::Project)
        .unwrap();
    StackTraceScanner::new(Arc::new(ResolutionCache::new(Arc::new(index))))
}

/// Anchor text the frame `Sample.<method>(Sample.java:<line>)` gets under `header`.
fn anchor(header: &str, method: &str, line: u32) -> Option<String> {
    let mut scanner = scanner();
    let trace = format!("{header}\n\tat com.example.Sample.{method}(Sample.java:{line})\n");
    let results = scanner.scan_text(&trace);
    assert_eq!(results.len(), 1);

    let item = results[0].items.last().expect("frame resolves");
    assert_eq!(item.targets.len(), 1);
    let target = &item.targets[0];
    assert_eq!(target.line, line);
    target.anchor.map(|range| range.substring(SAMPLE).to_string())
}

#[test]
fn test_null_pointer_without_message() {
    assert_eq!(
        anchor("java.lang.NullPointerException", "trim", 5),
        Some("text".into())
    );
}

#[test]
fn test_null_pointer_structured() {
    let header =
        r#"java.lang.NullPointerException: Cannot read the array length because "arr" is null"#;
    assert_eq!(anchor(header, "length", 8), Some("arr".into()));

    // classes compiled without -g name locals by slot
    let header = r#"java.lang.NullPointerException: Cannot read the array length because "<local1>" is null"#;
    assert_eq!(anchor(header, "length", 8), Some("arr".into()));

    let header =
        r#"java.lang.NullPointerException: Cannot read the array length because "other" is null"#;
    assert_eq!(anchor(header, "length", 8), None);
}

#[test]
fn test_index_out_of_bounds() {
    let header = "java.lang.ArrayIndexOutOfBoundsException: Index 5 out of bounds for length 3";
    assert_eq!(anchor(header, "read", 11), Some("5".into()));
    // the final local evaluates to 2
    assert_eq!(anchor(header, "constant", 15), None);
}

#[test]
fn test_division_by_zero() {
    assert_eq!(
        anchor("java.lang.ArithmeticException: / by zero", "mean", 18),
        Some("/".into())
    );
}

#[test]
fn test_class_cast() {
    let header = "java.lang.ClassCastException: class java.lang.Integer cannot be cast to class java.lang.String (java.lang.Integer and java.lang.String are in module java.base of loader 'bootstrap')";
    assert_eq!(anchor(header, "cast", 21), Some("String".into()));
}

#[test]
fn test_assertion() {
    assert_eq!(
        anchor("java.lang.AssertionError", "check", 24),
        Some("assert ok;".into())
    );
}

#[test]
fn test_negative_array_size() {
    assert_eq!(
        anchor("java.lang.NegativeArraySizeException: -1", "allocate", 27),
        Some("n".into())
    );
}

#[test]
fn test_throw_site() {
    assert_eq!(
        anchor("java.lang.IllegalStateException: boom", "fail", 30),
        Some("IllegalStateException".into())
    );
    assert_eq!(anchor("java.lang.IllegalArgumentException: boom", "fail", 30), None);
}
