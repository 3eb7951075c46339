use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracelink_core::config::IndexConfig;
use tracelink_core::source::SourceOrigin;
use tracelink_core::{JavaSourceIndex, ResolutionCache, ScanResult, SourceQuery, StackTraceScanner};

const COPIER: &str = "package com.example;

class Copier {
    void copy(int[] src, int start, int[] dest, int len) {
        System.arraycopy(src, start, dest, 0, len);
    }
}
";

const MAIN: &str = "package com.example;

class Main {
    public static void main(String[] args) {
        int[] a = new int[3];
        int[] b = new int[3];
        new Copier().copy(a, -1, b, 2);
    }
}
";

const SAMPLE: &str = "package com.example;

class Sample {
    String trim(String text) {
        return text.trim();
    }
}
";

const CHECK_FAILED: &str = "package com.example;

public class CheckFailed extends RuntimeException {
}
";

fn index(files: &[(&str, &str, SourceOrigin)]) -> Arc<JavaSourceIndex> {
    let index = JavaSourceIndex::new();
    for (path, content, origin) in files {
        index.add_source(*path, *content, *origin).unwrap();
    }
    Arc::new(index)
}

fn scanner(index: Arc<JavaSourceIndex>) -> StackTraceScanner {
    StackTraceScanner::new(Arc::new(ResolutionCache::new(index)))
}

fn anchor_text(index: &JavaSourceIndex, result: &ScanResult) -> Option<String> {
    let target = &result.items.last()?.targets[0];
    let range = target.anchor?;
    let file = index.source_file(&target.file)?;
    Some(range.substring(file.text()).to_string())
}

#[test]
fn test_arraycopy_then_call_site() {
    let index = index(&[
        ("src/com/example/Copier.java", COPIER, SourceOrigin::Project),
        ("src/com/example/Main.java", MAIN, SourceOrigin::Project),
    ]);
    let mut scanner = scanner(Arc::clone(&index));

    let results = scanner.scan_text(
        "java.lang.ArrayIndexOutOfBoundsException: arraycopy: source index -1 out of bounds for int[3]\n\
         \tat java.base/java.lang.System.arraycopy(Native Method)\n\
         \tat com.example.Copier.copy(Copier.java:5)\n\
         \tat com.example.Main.main(Main.java:7)\n",
    );
    assert_eq!(results.len(), 3);

    // the JDK frame has no source
    assert!(results[0].is_empty());
    assert_eq!(anchor_text(&index, &results[1]).as_deref(), Some("start"));
    assert_eq!(anchor_text(&index, &results[2]).as_deref(), Some("copy"));
}

#[test]
fn test_caused_by_reseeds_chase() {
    let index = index(&[
        ("src/com/example/Sample.java", SAMPLE, SourceOrigin::Project),
        ("src/com/example/Main.java", MAIN, SourceOrigin::Project),
    ]);
    let mut scanner = scanner(Arc::clone(&index));

    let results = scanner.scan_text(
        "java.lang.IllegalStateException: wrapped\n\
         \tat com.example.Main.main(Main.java:7)\n\
         Caused by: java.lang.NullPointerException\n\
         \tat com.example.Sample.trim(Sample.java:5)\n\
         \t... 1 more\n",
    );
    assert_eq!(results.len(), 2);
    assert_eq!(anchor_text(&index, &results[1]).as_deref(), Some("text"));
    assert!(scanner.refiner().is_none());
}

#[test]
fn test_library_sources_are_greyed_out() {
    let index = index(&[("lib/com/example/Sample.java", SAMPLE, SourceOrigin::Library)]);
    let mut scanner = scanner(index);

    let line = "\tat com.example.Sample.trim(Sample.java:5)\n";
    let result = scanner.apply_line(line, line.len()).unwrap();
    assert_eq!(result.items.len(), 1);
    assert!(result.items[0].greyed_out);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["items"][0]["greyed_out"], true);
    assert_eq!(json["items"][0]["targets"][0]["line"], 5);
}

#[test]
fn test_exception_class_name_is_highlighted() {
    let index = index(&[
        ("src/com/example/Sample.java", SAMPLE, SourceOrigin::Project),
        ("src/com/example/CheckFailed.java", CHECK_FAILED, SourceOrigin::Project),
    ]);
    let mut scanner = scanner(index);

    let header = "com.example.CheckFailed: bad input\n";
    let frame = "\tat com.example.Sample.trim(Sample.java:5)\n";
    assert!(scanner.apply_line(header, header.len()).is_none());
    let result = scanner
        .apply_line(frame, header.len() + frame.len())
        .unwrap();

    assert_eq!(result.items.len(), 2);
    let class_item = &result.items[0];
    assert_eq!(class_item.start_offset, 0);
    assert_eq!(class_item.end_offset, "com.example.CheckFailed".len());
    assert_eq!(class_item.targets[0].line, 3);
    assert_eq!(
        class_item.targets[0].file,
        PathBuf::from("src/com/example/CheckFailed.java")
    );

    let frame_item = &result.items[1];
    let file_line = header.len() + frame.find("Sample.java:5").unwrap();
    assert_eq!(frame_item.start_offset, file_line);
    assert_eq!(frame_item.end_offset, file_line + "Sample.java:5".len());
}

#[test]
fn test_unknown_class_falls_back_to_file_name() {
    let index = index(&[("src/com/example/Sample.java", SAMPLE, SourceOrigin::Project)]);
    let mut scanner = scanner(index);

    let line = "\tat com.example.Renamed.trim(Sample.java:5)";
    let result = scanner.apply_line(line, line.len()).unwrap();
    let target = &result.items[0].targets[0];
    assert_eq!(target.file, PathBuf::from("src/com/example/Sample.java"));
    assert_eq!(target.line, 5);
    assert_eq!(target.anchor, None);
}

#[test]
fn test_unresolved_frame_is_empty() {
    let mut scanner = scanner(index(&[]));
    let line = "\tat com.example.Missing.run(Missing.java:1)";
    assert_eq!(scanner.apply_line(line, line.len()), Some(ScanResult::default()));
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_index_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "app/com/example/Sample.java", SAMPLE);
    write(root, "app/target/com/example/Stale.java", "package com.example;\nclass Stale {}\n");
    write(root, "libs/com/example/CheckFailed.java", CHECK_FAILED);

    let config = IndexConfig {
        source_roots: vec![root.join("app")],
        library_roots: vec![root.join("libs")],
        ..IndexConfig::default()
    };
    let index = Arc::new(JavaSourceIndex::from_config(&config).unwrap());
    assert!(index.is_ready());
    assert_eq!(index.file_count(), 2);

    let cache = ResolutionCache::new(index);
    assert!(!cache.resolve_class("com.example.Sample").in_library);
    assert!(cache.resolve_class("com.example.CheckFailed").in_library);
    assert!(cache.resolve_class("com.example.Stale").is_empty());
}
