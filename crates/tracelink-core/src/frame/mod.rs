//! Stack-frame line recognition.
//!
//! A JVM stack trace interleaves exception headers with frame lines. This
//! module only deals with the frame lines; headers are handled by
//! [`crate::exception`].
//!
//! ## Supported shapes
//!
//! - `\tat com.foo.Bar.baz(Bar.java:42)` including module and class loader
//!   prefixes (`java.base/`, `app//`)
//! - profiler dumps: `com.foo.Bar.baz(String) Bar.java:42`
//! - `jstack -F` frames: `- com.foo.Bar.baz() @bci=3, line=42 (Compiled frame)`
//! - tool output prefixed with `|`

mod grammar;

pub use grammar::parse_line;

use serde::Serialize;

use crate::text::TextRange;

/// Line number used for `Native Method` and `Unknown Source` frames.
pub const NO_LINE: i32 = -1;

/// One recognized stack-frame line.
///
/// Ranges are byte offsets into the parsed line. They are ordered and never
/// overlap: class name, then method name, then the file/line part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedFrame {
    pub class_name_range: TextRange,
    pub method_name_range: TextRange,
    pub file_line_range: TextRange,
    pub file_name: Option<String>,
    pub line_number: i32,
}

impl ParsedFrame {
    /// Fully qualified (binary) class name of the frame.
    pub fn class_name<'a>(&self, line: &'a str) -> &'a str {
        self.class_name_range.substring(line)
    }

    pub fn method_name<'a>(&self, line: &'a str) -> &'a str {
        self.method_name_range.substring(line)
    }

    /// Whether the frame points at a concrete source line.
    pub fn has_source_line(&self) -> bool {
        self.line_number > 0
    }
}
