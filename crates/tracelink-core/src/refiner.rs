//! Chasing a throw site or call site from one stack line to the next.

use serde::Serialize;
use tracing::debug;

use crate::exception::{simple_name, ExceptionRecord};
use crate::matcher::{match_kind, MatchContext};
use crate::source::{NodeId, SourceFile};
use crate::text::TextRange;

/// Marker a stack line carries when the frame is the `System.arraycopy` native.
const ARRAYCOPY_FRAME: &str = "java.lang.System.arraycopy";

/// What the next frame line is expected to point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "refiner", rename_all = "snake_case")]
pub enum Refiner {
    /// The throw site of an exception whose header was just seen.
    Exception(ExceptionRecord),
    /// The call of the previous frame's method.
    CallSite {
        class_name: String,
        method_name: String,
    },
}

/// A heuristic hit on a source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefinerMatch {
    /// Leaf on the line that triggered the match.
    pub from: NodeId,
    /// Node the heuristic blames.
    pub reason: NodeId,
    /// Highlighted file range: the part of `reason` on the line of `from`.
    pub anchor: TextRange,
}

impl Refiner {
    pub fn call_site(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Refiner::CallSite {
            class_name: class_name.into(),
            method_name: method_name.into(),
        }
    }

    /// The record being chased, for exception refiners.
    pub fn exception(&self) -> Option<&ExceptionRecord> {
        match self {
            Refiner::Exception(record) => Some(record),
            Refiner::CallSite { .. } => None,
        }
    }

    /// Node blamed when `leaf` is the token this refiner is looking for.
    pub fn match_element(&self, ctx: &MatchContext<'_>, leaf: NodeId) -> Option<NodeId> {
        match self {
            Refiner::Exception(record) => {
                throw_site(ctx, record.class_name(), leaf).or_else(|| match_kind(ctx, record.kind(), leaf))
            }
            Refiner::CallSite {
                class_name,
                method_name,
            } => call_site(ctx, class_name, method_name, leaf),
        }
    }

    /// The single match on the 1-based `line`, if the line has exactly one
    /// distinct anchor.
    pub fn find_in_line(&self, ctx: &MatchContext<'_>, line: u32) -> Option<RefinerMatch> {
        let file = ctx.file;
        let mut found: Option<RefinerMatch> = None;
        for &leaf in file.leaves_on_line(line) {
            let Some(reason) = self.match_element(ctx, leaf) else {
                continue;
            };
            let anchor = anchor_on_line(file, leaf, reason);
            match &found {
                None => {
                    found = Some(RefinerMatch {
                        from: leaf,
                        reason,
                        anchor,
                    })
                }
                Some(previous) if previous.anchor == anchor => {}
                Some(previous) => {
                    debug!(
                        line,
                        first = file.text_of(previous.reason),
                        second = file.text_of(reason),
                        "ambiguous match, no anchor"
                    );
                    return None;
                }
            }
        }
        found
    }

    /// Refiner to use for the next line, when `text` continues the chase.
    pub fn consume_next_line(&self, text: &str) -> Option<Refiner> {
        let record = self.exception()?;
        if !text.contains(ARRAYCOPY_FRAME) {
            return None;
        }
        let promoted = record.kind().promote_to_array_copy()?;
        debug!(class = record.class_name(), "arraycopy frame, blaming the copy arguments");
        Some(Refiner::Exception(record.with_kind(promoted)))
    }
}

/// `new <Exception>(...)`, or `throw` directly followed by one.
fn throw_site(ctx: &MatchContext<'_>, class_name: &str, leaf: NodeId) -> Option<NodeId> {
    let file = ctx.file;
    let creation_type = |new_leaf: NodeId| -> Option<NodeId> {
        if file.kind(new_leaf) != "new" {
            return None;
        }
        let creation = file
            .parent(new_leaf)
            .filter(|p| file.kind(*p) == "object_creation_expression")?;
        let ty = file.child_by_field(creation, "type")?;
        names_class(file, ty, class_name).then_some(ty)
    };
    match file.kind(leaf) {
        "new" => creation_type(leaf),
        "throw" => creation_type(file.next_leaf(leaf)?),
        _ => None,
    }
}

/// Whether the type node written in source names the binary `class_name`.
fn names_class(file: &SourceFile, ty: NodeId, class_name: &str) -> bool {
    let written: String = file
        .text_of(ty)
        .split('<')
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .collect();
    if written.contains('.') {
        return written == class_name.replace('$', ".");
    }
    written == simple_name(class_name)
}

fn call_site(ctx: &MatchContext<'_>, class_name: &str, method_name: &str, leaf: NodeId) -> Option<NodeId> {
    let file = ctx.file;
    if method_name.starts_with("lambda$") || method_name.starts_with("access$") || method_name == "<clinit>" {
        return None;
    }
    let parent = file.parent(leaf)?;
    if method_name == "<init>" {
        return match (file.kind(leaf), file.kind(parent)) {
            ("new", "object_creation_expression") => {
                let ty = file.child_by_field(parent, "type")?;
                names_class(file, ty, class_name).then_some(ty)
            }
            ("this" | "super", "explicit_constructor_invocation") => Some(leaf),
            _ => None,
        };
    }
    let is_call_name = file.kind(leaf) == "identifier"
        && file.kind(parent) == "method_invocation"
        && file.child_by_field(parent, "name") == Some(leaf);
    (is_call_name && file.text_of(leaf) == method_name).then_some(leaf)
}

/// Part of `reason` on the line of `from`; the range of `from` when `reason`
/// has no leaf there.
fn anchor_on_line(file: &SourceFile, from: NodeId, reason: NodeId) -> TextRange {
    let line = file.start_line(from);
    let leaves = file.leaves_of(reason);
    let first = leaves.iter().find(|l| file.start_line(**l) == line);
    let last = leaves.iter().rev().find(|l| file.start_line(**l) == line);
    match (first, last) {
        (Some(first), Some(last)) => TextRange::new(file.range(*first).start, file.range(*last).end),
        _ => file.range(from),
    }
}
