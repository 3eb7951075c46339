//! Exception header lines and per-kind message grammars.
//!
//! A header such as `Caused by: java.lang.NullPointerException: Cannot invoke
//! "String.trim()" because "text" is null` is split into the class name and
//! the message; the [`ExceptionKindRegistry`] then turns the message into an
//! [`ExceptionKind`] carrying the fields the source heuristics need.

mod kinds;
mod message;
mod registry;

pub use kinds::{
    ArrayCopyArgument, ArrayCopyDetail, BoundsMessage, CastDetail, ExceptionKind, NullAction,
    NullPointerDetail, UNBOXING_METHODS,
};
pub use message::{is_valid_class_name, split_header, ExceptionHeader, MAX_CLASS_NAME_LENGTH};
pub use registry::{parse_message, ExceptionKindRegistry, KindConstructor};

use serde::Serialize;

/// A recognized exception header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionRecord {
    class_name_offset: usize,
    class_name: String,
    message: String,
    kind: ExceptionKind,
}

impl ExceptionRecord {
    pub fn new(
        class_name_offset: usize,
        class_name: impl Into<String>,
        message: impl Into<String>,
        kind: ExceptionKind,
    ) -> Self {
        Self {
            class_name_offset,
            class_name: class_name.into(),
            message: message.into(),
            kind,
        }
    }

    /// Offset of the class name, relative to the parsed line until
    /// [`shifted`](Self::shifted) rebases it.
    pub fn class_name_offset(&self) -> usize {
        self.class_name_offset
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ExceptionKind {
        &self.kind
    }

    /// Unqualified class name, after the last `.` or `$`.
    pub fn simple_class_name(&self) -> &str {
        simple_name(&self.class_name)
    }

    pub fn class_name_end(&self) -> usize {
        self.class_name_offset + self.class_name.len()
    }

    /// Copy with the class-name offset moved `delta` bytes to the right.
    pub fn shifted(&self, delta: usize) -> Self {
        Self {
            class_name_offset: self.class_name_offset + delta,
            ..self.clone()
        }
    }

    /// Copy with a different kind, offsets untouched.
    pub fn with_kind(&self, kind: ExceptionKind) -> Self {
        Self {
            kind,
            ..self.clone()
        }
    }
}

/// Last segment of a binary or qualified class name.
pub fn simple_name(name: &str) -> &str {
    match name.rfind(['.', '$']) {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}
