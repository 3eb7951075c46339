//! Header-line grammar: where the exception class name sits and what follows it.

use crate::text::TextRange;

/// Longest class name accepted from a header line.
pub const MAX_CLASS_NAME_LENGTH: usize = 200;

const CAUSED_BY: &str = "Caused by: ";
const SUPPRESSED: &str = "Suppressed: ";
const EXCEPTION_IN_THREAD: &str = "Exception in thread \"";

/// Class-name position and message text of a header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHeader {
    pub class_name_range: TextRange,
    pub message: String,
}

impl ExceptionHeader {
    pub fn class_name<'a>(&self, line: &'a str) -> &'a str {
        self.class_name_range.substring(line)
    }
}

/// Split a header line into class name and message.
///
/// Accepted shapes:
/// - `pkg.SomeException`
/// - `pkg.SomeException: message`
/// - `Caused by: pkg.SomeException[: message]` (optionally indented)
/// - `Suppressed: pkg.SomeException[: message]` (optionally indented)
/// - `Exception in thread "main" pkg.SomeException[: message]`
/// - `[tag]: pkg.SomeException: message`
///
/// The class name must pass [`is_valid_class_name`].
pub fn split_header(line: &str) -> Option<ExceptionHeader> {
    let line = line.trim_end_matches(['\r', '\n']);
    let body_start = line.len() - line.trim_start().len();
    let body = &line[body_start..];

    let class_start = if let Some(rest) = body.strip_prefix(CAUSED_BY) {
        line.len() - rest.len()
    } else if let Some(rest) = body.strip_prefix(SUPPRESSED) {
        line.len() - rest.len()
    } else if let Some(rest) = line.strip_prefix(EXCEPTION_IN_THREAD) {
        let quote = rest.find("\" ")?;
        EXCEPTION_IN_THREAD.len() + quote + 2
    } else {
        match line.find(' ') {
            None => 0,
            Some(space) => {
                let bytes = line.as_bytes();
                if space == 0 || bytes[space - 1] != b':' {
                    return None;
                }
                if bytes[0] == b'[' && space >= 2 && bytes[space - 2] == b']' {
                    space + 1
                } else {
                    0
                }
            }
        }
    };

    let class_end = line[class_start..]
        .find(|c: char| c == ':' || c.is_whitespace())
        .map(|idx| class_start + idx)
        .unwrap_or(line.len());
    let class_name_range = TextRange::new(class_start, class_end);
    if !is_valid_class_name(class_name_range.substring(line)) {
        return None;
    }

    let rest = &line[class_end..];
    let message = rest.strip_prefix(':').unwrap_or(rest).trim();
    Some(ExceptionHeader {
        class_name_range,
        message: message.to_string(),
    })
}

/// Whether `name` looks like a fully qualified JVM class name.
///
/// At most [`MAX_CLASS_NAME_LENGTH`] characters, at least one `.`, no leading
/// `.`, no `$` before the first `.`, and only identifier characters, `.` and
/// `$` otherwise.
pub fn is_valid_class_name(name: &str) -> bool {
    if name.is_empty() || name.chars().count() > MAX_CLASS_NAME_LENGTH {
        return false;
    }
    let Some(first_dot) = name.find('.') else {
        return false;
    };
    if first_dot == 0 || name[..first_dot].contains('$') {
        return false;
    }
    name.chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(line: &str) -> (String, String) {
        let header = split_header(line).unwrap_or_else(|| panic!("not a header: {line:?}"));
        (header.class_name(line).to_string(), header.message)
    }

    #[test]
    fn test_bare_class_name() {
        assert_eq!(
            split("java.lang.NullPointerException"),
            ("java.lang.NullPointerException".into(), String::new())
        );
        assert_eq!(
            split("java.lang.NullPointerException\r\n").0,
            "java.lang.NullPointerException"
        );
    }

    #[test]
    fn test_class_with_message() {
        let (class, message) = split("java.lang.IllegalStateException: bad state: retry");
        assert_eq!(class, "java.lang.IllegalStateException");
        assert_eq!(message, "bad state: retry");
    }

    #[test]
    fn test_caused_by() {
        let line = "Caused by: java.io.IOException: disk full";
        let header = split_header(line).unwrap();
        assert_eq!(header.class_name_range.start, CAUSED_BY.len());
        assert_eq!(header.class_name(line), "java.io.IOException");
        assert_eq!(header.message, "disk full");
        assert_eq!(split("Caused by: java.io.IOException").1, "");
    }

    #[test]
    fn test_indented_suppressed_and_caused_by() {
        assert_eq!(
            split("\tSuppressed: java.lang.RuntimeException: close failed").0,
            "java.lang.RuntimeException"
        );
        assert_eq!(
            split("\t\tCaused by: java.lang.Error").0,
            "java.lang.Error"
        );
    }

    #[test]
    fn test_exception_in_thread() {
        let line = "Exception in thread \"main worker\" java.lang.ArithmeticException: / by zero";
        let (class, message) = split(line);
        assert_eq!(class, "java.lang.ArithmeticException");
        assert_eq!(message, "/ by zero");
    }

    #[test]
    fn test_tagged() {
        let (class, message) = split("[ERROR]: com.example.AppException: boom");
        assert_eq!(class, "com.example.AppException");
        assert_eq!(message, "boom");
    }

    #[test]
    fn test_plain_text_rejected() {
        assert!(split_header("Started application in 3.2 seconds").is_none());
        assert!(split_header("INFO: server started").is_none());
        assert!(split_header("\tat com.foo.Bar.baz(Bar.java:1)").is_none());
        assert!(split_header("").is_none());
    }

    #[test]
    fn test_class_name_rules() {
        assert!(is_valid_class_name("a.B"));
        assert!(is_valid_class_name("com.foo.Outer$Inner"));
        assert!(!is_valid_class_name("NoDots"));
        assert!(!is_valid_class_name(".leading.Dot"));
        assert!(!is_valid_class_name("Out$er.Inner"));
        assert!(!is_valid_class_name("com.foo-bar.Baz"));
    }

    #[test]
    fn test_class_name_length_boundary() {
        let accepted = format!("a.{}", "B".repeat(MAX_CLASS_NAME_LENGTH - 2));
        assert_eq!(accepted.len(), MAX_CLASS_NAME_LENGTH);
        assert!(is_valid_class_name(&accepted));

        let rejected = format!("a.{}", "B".repeat(MAX_CLASS_NAME_LENGTH - 1));
        assert!(!is_valid_class_name(&rejected));
    }
}
