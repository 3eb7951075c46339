//! Grammars for the frame shapes, tried in priority order.

use tracing::trace;

use super::{ParsedFrame, NO_LINE};
use crate::text::TextRange;

const AT_PREFIX: &str = "at ";
const NATIVE_METHOD: &str = "Native Method";
const UNKNOWN_SOURCE: &str = "Unknown Source";
const LINE_PREFIX: &str = "line=";
const DASH_PREFIX: &str = "- ";
const HIDDEN_CLASS_SUFFIX: &str = "0x";

/// Recognize `line` as a stack frame.
///
/// Returns `None` for anything that is not a frame; that is the normal
/// outcome for exception headers, `... 5 more` lines and arbitrary log text.
pub fn parse_line(line: &str) -> Option<ParsedFrame> {
    let frame = parse_standard_line(line)
        .or_else(|| parse_profiler_line(line))
        .or_else(|| parse_structured_line(line))
        .or_else(|| parse_prefixed_line(line));
    if let Some(frame) = &frame {
        trace!(class = frame.class_name(line), line_number = frame.line_number, "frame line");
    }
    frame
}

/// `at [module/]pkg.Class.method(File.java:42)`
fn parse_standard_line(line: &str) -> Option<ParsedFrame> {
    parse_at_line(line, false)
}

/// Tool output such as `| at pkg.Class.method(File.java:42)`; the closing
/// parenthesis is searched from the `at` marker so text before it can't
/// confuse the scan.
fn parse_prefixed_line(line: &str) -> Option<ParsedFrame> {
    if !line.starts_with('|') {
        return None;
    }
    parse_at_line(line, true)
}

fn parse_at_line(line: &str, search_from_marker: bool) -> Option<ParsedFrame> {
    let marker = find_at_marker(line)?;
    let rparen = find_closing_paren(line, if search_from_marker { marker } else { 0 })?;
    if rparen < marker {
        return None;
    }
    let name_start = marker + AT_PREFIX.len();
    let method = method_name_before(line, name_start, rparen)?;
    let dot = method.start - 1;

    let mut class_start = skip_whitespace(line, name_start);
    if let Some(slash) = line[class_start..dot].find('/') {
        let slash = class_start + slash;
        let rest = &line[slash + 1..];
        if rest.starts_with('/') {
            // `app//com.foo.Bar`: named class loader, unnamed module
            class_start = slash + 2;
        } else if !rest.starts_with(HIDDEN_CLASS_SUFFIX) {
            class_start = slash + 1;
        }
    }
    if class_start > dot {
        return None;
    }

    let class_name = TextRange::new(class_start, dot).trimmed(line);
    from_file_and_line(line, class_name, method.trimmed(line), method.end + 1, rparen)
}

/// Profiler frame: `pkg.Class.method(Args) File.java:42`.
fn parse_profiler_line(line: &str) -> Option<ParsedFrame> {
    let body = line.strip_suffix('\n').unwrap_or(line);
    if !body.ends_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let space = body.rfind(' ')?;
    let rparen = body.rfind(')')?;
    if space != rparen + 1 {
        return None;
    }
    let method = method_name_before(body, 0, rparen)?;
    let class_name = TextRange::new(0, method.start - 1).trimmed(body);
    from_file_and_line(body, class_name, method.trimmed(body), space + 1, body.len())
}

/// `jstack -F` frame: `- pkg.Class.method() @bci=12, line=42 (Compiled frame)`.
fn parse_structured_line(line: &str) -> Option<ParsedFrame> {
    if !line.trim_start().starts_with(DASH_PREFIX) {
        return None;
    }
    let number_start = line.find(LINE_PREFIX)?;
    let digits_start = number_start + LINE_PREFIX.len();
    let number_end = digits_start + line[digits_start..].find(' ')?;
    let method = method_name_before(line, 0, number_start)?;
    let line_number = parse_line_number(&line[digits_start..number_end])?;

    let class_start = line.find(DASH_PREFIX)? + DASH_PREFIX.len();
    if class_start >= method.start {
        return None;
    }
    let class_name = TextRange::new(class_start, method.start - 1).trimmed(line);
    let method_name = method.trimmed(line);
    if class_name.is_empty() || method_name.is_empty() {
        return None;
    }

    Some(ParsedFrame {
        class_name_range: class_name,
        method_name_range: method_name,
        file_line_range: TextRange::new(number_start, number_end),
        file_name: None,
        line_number,
    })
}

/// Build a frame from the text between the parentheses.
fn from_file_and_line(
    line: &str,
    class_name: TextRange,
    method_name: TextRange,
    file_line_start: usize,
    file_line_end: usize,
) -> Option<ParsedFrame> {
    if class_name.is_empty() || method_name.is_empty() {
        return None;
    }
    let file_line_range = TextRange::new(file_line_start, file_line_end);
    let content = file_line_range.substring(line);

    if content == NATIVE_METHOD || content == UNKNOWN_SOURCE {
        return Some(ParsedFrame {
            class_name_range: class_name,
            method_name_range: method_name,
            file_line_range,
            file_name: None,
            line_number: NO_LINE,
        });
    }

    let colon = content.rfind(':')?;
    let line_number = parse_line_number(content[colon + 1..].trim())?;
    let file_name = content[..colon].trim();

    Some(ParsedFrame {
        class_name_range: class_name,
        method_name_range: method_name,
        file_line_range,
        file_name: Some(file_name.to_string()),
        line_number,
    })
}

fn parse_line_number(digits: &str) -> Option<i32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// `at ` at the start of the line or right after whitespace.
fn find_at_marker(line: &str) -> Option<usize> {
    if line.starts_with(AT_PREFIX) {
        return Some(0);
    }
    let bytes = line.as_bytes();
    line.match_indices(AT_PREFIX)
        .map(|(idx, _)| idx)
        .find(|&idx| idx > 0 && matches!(bytes[idx - 1], b' ' | b'\t'))
}

/// First `)` preceded by a digit. A `)` without a digit before it is only
/// accepted when it is the single one on the line.
fn find_closing_paren(line: &str, from: usize) -> Option<usize> {
    let bytes = line.as_bytes();
    let found = line[from..]
        .match_indices(')')
        .map(|(idx, _)| from + idx)
        .find(|&idx| idx > 0 && bytes[idx - 1].is_ascii_digit());
    if found.is_some() {
        return found;
    }

    let mut parens = line.match_indices(')').map(|(idx, _)| idx);
    match (parens.next(), parens.next()) {
        (Some(idx), None) if idx >= from => Some(idx),
        _ => None,
    }
}

/// Method-name token ending at the last `(` before `end`: the text between
/// that parenthesis and the nearest preceding `.`, which must not lie before
/// `start`.
fn method_name_before(line: &str, start: usize, end: usize) -> Option<TextRange> {
    let lparen = line[..end].rfind('(')?;
    let dot = line[..lparen].rfind('.')?;
    if dot < start {
        return None;
    }
    Some(TextRange::new(dot + 1, lparen))
}

fn skip_whitespace(line: &str, from: usize) -> usize {
    line[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(idx, _)| from + idx)
        .unwrap_or(line.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> (String, String, Option<String>, i32) {
        let frame = parse_line(line).unwrap_or_else(|| panic!("not a frame: {line:?}"));
        (
            frame.class_name(line).to_string(),
            frame.method_name(line).to_string(),
            frame.file_name.clone(),
            frame.line_number,
        )
    }

    #[test]
    fn test_standard_frame() {
        let (class, method, file, line) = parse("\tat com.example.Service.handle(Service.java:42)");
        assert_eq!(class, "com.example.Service");
        assert_eq!(method, "handle");
        assert_eq!(file.as_deref(), Some("Service.java"));
        assert_eq!(line, 42);
    }

    #[test]
    fn test_module_prefix() {
        let (class, method, _, line) =
            parse("\tat java.base/java.lang.Thread.run(Thread.java:829)");
        assert_eq!(class, "java.lang.Thread");
        assert_eq!(method, "run");
        assert_eq!(line, 829);
    }

    #[test]
    fn test_class_loader_with_unnamed_module() {
        let (class, _, _, _) = parse("\tat app//com.example.Main.main(Main.java:7)");
        assert_eq!(class, "com.example.Main");
    }

    #[test]
    fn test_hidden_class_slash_is_not_a_module() {
        let line = "\tat com.example.Main$$Lambda$14/0x0000000800066840.run(Unknown Source)";
        let (class, method, file, number) = parse(line);
        assert_eq!(class, "com.example.Main$$Lambda$14/0x0000000800066840");
        assert_eq!(method, "run");
        assert_eq!(file, None);
        assert_eq!(number, NO_LINE);
    }

    #[test]
    fn test_native_method() {
        let (class, method, file, line) =
            parse("\tat java.base/java.lang.System.arraycopy(Native Method)");
        assert_eq!(class, "java.lang.System");
        assert_eq!(method, "arraycopy");
        assert_eq!(file, None);
        assert_eq!(line, NO_LINE);
    }

    #[test]
    fn test_constructor_frame() {
        let (class, method, _, _) = parse("\tat com.example.Box.<init>(Box.java:12)");
        assert_eq!(class, "com.example.Box");
        assert_eq!(method, "<init>");
    }

    #[test]
    fn test_trailing_logback_suffix() {
        let (class, _, file, line) =
            parse("\tat com.example.Api.call(Api.kt:31) ~[classes/:na]");
        assert_eq!(class, "com.example.Api");
        assert_eq!(file.as_deref(), Some("Api.kt"));
        assert_eq!(line, 31);
    }

    #[test]
    fn test_marker_inside_line() {
        let (class, _, _, line) = parse("12:00:01 ERROR  at com.example.Job.run(Job.java:5)");
        assert_eq!(class, "com.example.Job");
        assert_eq!(line, 5);
    }

    #[test]
    fn test_ambiguous_parens_without_digits() {
        assert!(parse_line("\tat com.example.Foo.bar(Native Method) (extra)").is_none());
    }

    #[test]
    fn test_bad_paren_content() {
        assert!(parse_line("\tat com.example.Foo.bar(Foo.java)").is_none());
        assert!(parse_line("\tat com.example.Foo.bar(Foo.java:x1)").is_none());
    }

    #[test]
    fn test_no_paren_never_matches() {
        assert!(parse_line("\tat com.example.Foo.bar Foo.java:12").is_none());
        assert!(parse_line("java.lang.NullPointerException").is_none());
        assert!(parse_line("\t... 12 more").is_none());
    }

    #[test]
    fn test_profiler_frame() {
        let line = "com.example.Cache.load(String) Cache.java:88\n";
        let (class, method, file, number) = parse(line);
        assert_eq!(class, "com.example.Cache");
        assert_eq!(method, "load");
        assert_eq!(file.as_deref(), Some("Cache.java"));
        assert_eq!(number, 88);
    }

    #[test]
    fn test_structured_frame() {
        let line = "\t - com.example.Worker.poll() @bci=17, line=203 (Compiled frame)";
        let frame = parse_line(line).unwrap();
        assert_eq!(frame.class_name(line), "com.example.Worker");
        assert_eq!(frame.method_name(line), "poll");
        assert_eq!(frame.file_name, None);
        assert_eq!(frame.line_number, 203);
        assert_eq!(frame.file_line_range.substring(line), "line=203");
    }

    #[test]
    fn test_structured_frame_requires_space_after_number() {
        assert!(parse_line(" - com.example.Worker.poll() @bci=17, line=203").is_none());
    }

    #[test]
    fn test_prefixed_frame() {
        let line = "| step(1) done | at com.example.Step.run(Step.java:9)";
        let (class, method, _, number) = parse(line);
        assert_eq!(class, "com.example.Step");
        assert_eq!(method, "run");
        assert_eq!(number, 9);
        // Without the pipe the earlier "(1)" wins and the line is rejected.
        assert!(parse_line("step(1) done | at com.example.Step.run(Step.java:9)").is_none());
    }

    #[test]
    fn test_ranges_are_ordered() {
        let line = "\tat a.b.C.d(C.java:1)";
        let frame = parse_line(line).unwrap();
        assert!(frame.class_name_range.end <= frame.method_name_range.start);
        assert!(frame.method_name_range.end <= frame.file_line_range.start);
    }
}
