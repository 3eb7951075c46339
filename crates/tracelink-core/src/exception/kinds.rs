//! Exception kinds and the fields their messages carry.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// What an exception's message tells us about the failing expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExceptionKind {
    /// No heuristic beyond the throw site.
    Generic,
    NullPointer(NullPointerDetail),
    ArrayIndexOutOfBounds(BoundsMessage),
    /// Bounds failure inside `System.arraycopy`, promoted from
    /// [`ExceptionKind::ArrayIndexOutOfBounds`] once the next frame confirms it.
    ArrayCopy(ArrayCopyDetail),
    ArrayStore,
    ClassCast(Option<CastDetail>),
    Arithmetic { by_zero: bool },
    Assertion,
    NegativeArraySize { size: Option<i64> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPointerDetail {
    /// Pre-JDK 14 style or `-XX:-ShowCodeDetailsInExceptionMessages`.
    NoMessage,
    /// Helpful NPE message naming the failed operation.
    Structured {
        action: NullAction,
        /// Identifier from a `because "name" is null` clause.
        culprit: Option<String>,
    },
    /// Some other message, usually from an explicit `throw` or `requireNonNull`.
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NullAction {
    Invoke { class_name: String, method_name: String },
    AssignField { field: String },
    ReadField { field: String },
    StoreToArray { element: String },
    LoadFromArray { element: String },
    ArrayLength,
    EnterMonitor,
    Throw,
}

impl NullAction {
    /// Field or array writes, which only happen on the left of `=`.
    pub fn is_store(&self) -> bool {
        matches!(self, NullAction::AssignField { .. } | NullAction::StoreToArray { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsMessage {
    Empty,
    Index { index: i64, length: Option<i64> },
    ArrayCopy(ArrayCopyDetail),
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArrayCopyDetail {
    pub argument: ArrayCopyArgument,
    pub value: i64,
}

/// Which `System.arraycopy(src, srcPos, dest, destPos, length)` argument a
/// message blames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayCopyArgument {
    SourceIndex,
    DestinationIndex,
    Length,
}

impl ArrayCopyArgument {
    /// Zero-based argument position.
    pub fn position(self) -> usize {
        match self {
            ArrayCopyArgument::SourceIndex => 1,
            ArrayCopyArgument::DestinationIndex => 3,
            ArrayCopyArgument::Length => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CastDetail {
    /// Runtime class of the value, in JVM binary or descriptor form.
    pub actual: String,
    /// Class the value was cast to.
    pub target: String,
}

/// Unboxing methods the compiler inserts for boxed values in primitive context.
pub const UNBOXING_METHODS: &[&str] = &[
    "booleanValue",
    "byteValue",
    "charValue",
    "shortValue",
    "intValue",
    "longValue",
    "floatValue",
    "doubleValue",
];

fn null_pointer_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^Cannot (?:invoke "(?P<invoke>[^"]*)"|assign field "(?P<assign>[^"]*)"|read field "(?P<read>[^"]*)"|store to (?P<store>\S+) array|load from (?P<load>\S+) array|(?P<length>read the array length)|(?P<monitor>enter synchronized block)|(?P<throw>throw exception))(?: because (?P<because>.*))?$"#,
        )
        .expect("null_pointer_pattern: pattern is valid and should always compile")
    })
}

fn because_null_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^"([\p{Alphabetic}_$][\p{Alphabetic}\p{Nd}_$]*)" is null$"#)
            .expect("because_null_pattern: pattern is valid and should always compile")
    })
}

fn bounds_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:Index )?(-?\d+)(?: out of bounds for length (\d+))?$")
            .expect("bounds_pattern: pattern is valid and should always compile")
    })
}

fn arraycopy_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^arraycopy: (source index|destination index|length) (-?\d+) ")
            .expect("arraycopy_pattern: pattern is valid and should always compile")
    })
}

fn class_cast_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:class )?(\S+) cannot be cast to (?:class )?(\S+?)(?: \(.*\))?$")
            .expect("class_cast_pattern: pattern is valid and should always compile")
    })
}

impl ExceptionKind {
    pub fn generic(_message: &str) -> Self {
        ExceptionKind::Generic
    }

    pub fn null_pointer(message: &str) -> Self {
        if message.is_empty() {
            return ExceptionKind::NullPointer(NullPointerDetail::NoMessage);
        }
        let Some(caps) = null_pointer_pattern().captures(message) else {
            return ExceptionKind::NullPointer(NullPointerDetail::Custom);
        };

        let action = if let Some(invoke) = caps.name("invoke") {
            let signature = invoke.as_str();
            let qualified = signature.split('(').next().unwrap_or(signature);
            let (class_name, method_name) = match qualified.rfind('.') {
                Some(dot) => (&qualified[..dot], &qualified[dot + 1..]),
                None => ("", qualified),
            };
            NullAction::Invoke {
                class_name: class_name.to_string(),
                method_name: method_name.to_string(),
            }
        } else if let Some(field) = caps.name("assign") {
            NullAction::AssignField {
                field: field.as_str().to_string(),
            }
        } else if let Some(field) = caps.name("read") {
            NullAction::ReadField {
                field: field.as_str().to_string(),
            }
        } else if let Some(element) = caps.name("store") {
            NullAction::StoreToArray {
                element: element.as_str().to_string(),
            }
        } else if let Some(element) = caps.name("load") {
            NullAction::LoadFromArray {
                element: element.as_str().to_string(),
            }
        } else if caps.name("length").is_some() {
            NullAction::ArrayLength
        } else if caps.name("monitor").is_some() {
            NullAction::EnterMonitor
        } else {
            NullAction::Throw
        };

        let culprit = caps
            .name("because")
            .and_then(|because| because_null_pattern().captures(because.as_str()))
            .map(|c| c[1].to_string());

        ExceptionKind::NullPointer(NullPointerDetail::Structured { action, culprit })
    }

    pub fn array_index_out_of_bounds(message: &str) -> Self {
        ExceptionKind::ArrayIndexOutOfBounds(parse_bounds_message(message))
    }

    pub fn array_store(_message: &str) -> Self {
        ExceptionKind::ArrayStore
    }

    pub fn class_cast(message: &str) -> Self {
        let detail = class_cast_pattern().captures(message).map(|caps| CastDetail {
            actual: caps[1].to_string(),
            target: caps[2].to_string(),
        });
        ExceptionKind::ClassCast(detail)
    }

    pub fn arithmetic(message: &str) -> Self {
        ExceptionKind::Arithmetic {
            by_zero: message.is_empty() || message == "/ by zero",
        }
    }

    pub fn assertion(_message: &str) -> Self {
        ExceptionKind::Assertion
    }

    pub fn negative_array_size(message: &str) -> Self {
        ExceptionKind::NegativeArraySize {
            size: message.trim().parse().ok(),
        }
    }

    /// ArrayCopy promotion for an AIOOBE whose message came from `arraycopy`.
    pub fn promote_to_array_copy(&self) -> Option<Self> {
        match self {
            ExceptionKind::ArrayIndexOutOfBounds(BoundsMessage::ArrayCopy(detail)) => {
                Some(ExceptionKind::ArrayCopy(*detail))
            }
            _ => None,
        }
    }

    /// Short label used in logs and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            ExceptionKind::Generic => "generic",
            ExceptionKind::NullPointer(_) => "null_pointer",
            ExceptionKind::ArrayIndexOutOfBounds(_) => "array_index_out_of_bounds",
            ExceptionKind::ArrayCopy(_) => "array_copy",
            ExceptionKind::ArrayStore => "array_store",
            ExceptionKind::ClassCast(_) => "class_cast",
            ExceptionKind::Arithmetic { .. } => "arithmetic",
            ExceptionKind::Assertion => "assertion",
            ExceptionKind::NegativeArraySize { .. } => "negative_array_size",
        }
    }
}

fn parse_bounds_message(message: &str) -> BoundsMessage {
    if message.is_empty() {
        return BoundsMessage::Empty;
    }
    if let Some(caps) = bounds_pattern().captures(message) {
        let Ok(index) = caps[1].parse() else {
            return BoundsMessage::Unrecognized;
        };
        let length = caps.get(2).and_then(|m| m.as_str().parse().ok());
        return BoundsMessage::Index { index, length };
    }
    if let Some(caps) = arraycopy_pattern().captures(message) {
        let argument = match &caps[1] {
            "source index" => ArrayCopyArgument::SourceIndex,
            "destination index" => ArrayCopyArgument::DestinationIndex,
            _ => ArrayCopyArgument::Length,
        };
        if let Ok(value) = caps[2].parse() {
            return BoundsMessage::ArrayCopy(ArrayCopyDetail { argument, value });
        }
    }
    BoundsMessage::Unrecognized
}
