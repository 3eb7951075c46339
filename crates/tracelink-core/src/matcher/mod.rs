//! Per-kind element matchers.
//!
//! A matcher looks at one leaf of the frame's source line and, when the leaf
//! is the token that identifies a failing construct, returns the node to
//! blame. Matchers never fail; an unsupported shape is simply no match.

mod arithmetic;
mod bounds;
mod cast;
mod constant;
mod npe;

pub use cast::cast_class_matches;
pub use constant::integral_constant;

use tracing::trace;

use crate::exception::ExceptionKind;
use crate::source::{NodeId, SourceFile, SourceQuery};

/// What a matcher can see: the query capability and the frame's file.
#[derive(Clone, Copy)]
pub struct MatchContext<'a> {
    pub query: &'a dyn SourceQuery,
    pub file: &'a SourceFile,
}

impl<'a> MatchContext<'a> {
    pub fn new(query: &'a dyn SourceQuery, file: &'a SourceFile) -> Self {
        Self { query, file }
    }

    fn kind(&self, node: NodeId) -> &'static str {
        self.file.kind(node)
    }

    fn text(&self, node: NodeId) -> &'a str {
        self.file.text_of(node)
    }

    /// Parent of a token, when it has the given kind.
    fn parent_if(&self, node: NodeId, kind: &str) -> Option<NodeId> {
        self.file.parent(node).filter(|p| self.kind(*p) == kind)
    }
}

/// Node the kind's heuristic blames for `leaf`, if any.
pub fn match_kind(ctx: &MatchContext<'_>, kind: &ExceptionKind, leaf: NodeId) -> Option<NodeId> {
    let reason = match kind {
        ExceptionKind::Generic => None,
        ExceptionKind::NullPointer(detail) => npe::match_null_pointer(ctx, detail, leaf),
        ExceptionKind::ArrayIndexOutOfBounds(message) => bounds::match_index(ctx, message, leaf),
        ExceptionKind::ArrayCopy(detail) => bounds::match_array_copy(ctx, detail, leaf),
        ExceptionKind::ArrayStore => bounds::match_array_store(ctx, leaf),
        ExceptionKind::ClassCast(detail) => cast::match_cast(ctx, detail.as_ref(), leaf),
        ExceptionKind::Arithmetic { by_zero } => {
            arithmetic::match_division(ctx, *by_zero, leaf)
        }
        ExceptionKind::Assertion => match_assert(ctx, leaf),
        ExceptionKind::NegativeArraySize { size } => bounds::match_negative_size(ctx, *size, leaf),
    };
    if let Some(reason) = reason {
        trace!(kind = kind.name(), leaf = ctx.text(leaf), reason = ctx.text(reason), "element match");
    }
    reason
}

/// `assert` keyword: blame the whole statement.
fn match_assert(ctx: &MatchContext<'_>, leaf: NodeId) -> Option<NodeId> {
    if ctx.kind(leaf) != "assert" {
        return None;
    }
    ctx.parent_if(leaf, "assert_statement")
}

/// Inner expression of any number of parentheses.
pub(crate) fn unparenthesize(file: &SourceFile, mut node: NodeId) -> NodeId {
    while file.kind(node) == "parenthesized_expression" {
        match file.named_children(node).next() {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Outermost parenthesized expression wrapping `node`.
pub(crate) fn parenthesized_outer(file: &SourceFile, mut node: NodeId) -> NodeId {
    while let Some(parent) = file.parent(node) {
        if file.kind(parent) != "parenthesized_expression" {
            break;
        }
        node = parent;
    }
    node
}

/// Whether `node` is the target of a plain `=` assignment.
pub(crate) fn is_plain_assignment_target(file: &SourceFile, node: NodeId) -> bool {
    let outer = parenthesized_outer(file, node);
    let Some(parent) = file.parent(outer) else {
        return false;
    };
    file.kind(parent) == "assignment_expression"
        && file.child_by_field(parent, "left") == Some(outer)
        && file
            .child_by_field(parent, "operator")
            .map(|op| file.text_of(op) == "=")
            .unwrap_or(false)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::sync::Arc;

    use crate::source::{JavaSourceIndex, NodeId, SourceFile, SourceOrigin, SourceQuery};

    pub const PATH: &str = "src/com/example/Sample.java";

    /// Index holding one file whose class body is `body`.
    pub fn index_with(body: &str) -> (JavaSourceIndex, Arc<SourceFile>) {
        let source = format!("package com.example;\n\nclass Sample {{\n{body}\n}}\n");
        let index = JavaSourceIndex::new();
        index.add_source(PATH, source, SourceOrigin::Project).unwrap();
        let file = index.source_file(Path::new(PATH)).unwrap();
        (index, file)
    }

    /// 1-based line containing `needle`.
    pub fn line_of(file: &SourceFile, needle: &str) -> u32 {
        let offset = file.text().find(needle).unwrap();
        file.text()[..offset].matches('\n').count() as u32 + 1
    }

    /// The n-th leaf with the given text on the line containing `needle`.
    pub fn leaf(file: &SourceFile, needle: &str, token: &str, nth: usize) -> NodeId {
        let line = line_of(file, needle);
        file.leaves_on_line(line)
            .iter()
            .copied()
            .filter(|l| file.text_of(*l) == token)
            .nth(nth)
            .unwrap_or_else(|| panic!("no {token:?} #{nth} on line {line}"))
    }
}
