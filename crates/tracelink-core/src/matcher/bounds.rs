//! Array index, `System.arraycopy`, array store and array size failures.

use super::{integral_constant, unparenthesize, MatchContext};
use crate::exception::{ArrayCopyDetail, BoundsMessage};
use crate::source::NodeId;

/// `[` of an array access: blame the index expression.
pub(super) fn match_index(
    ctx: &MatchContext<'_>,
    message: &BoundsMessage,
    leaf: NodeId,
) -> Option<NodeId> {
    let expected = match message {
        BoundsMessage::Empty => None,
        BoundsMessage::Index { index, .. } => Some(*index),
        BoundsMessage::ArrayCopy(_) | BoundsMessage::Unrecognized => return None,
    };
    if ctx.kind(leaf) != "[" {
        return None;
    }
    let access = ctx.parent_if(leaf, "array_access")?;
    let index = ctx.file.child_by_field(access, "index")?;
    if let (Some(expected), Some(actual)) = (expected, integral_constant(ctx, index)) {
        if expected != actual {
            return None;
        }
    }
    Some(index)
}

/// `arraycopy` of a five-argument `System.arraycopy` call: blame the argument
/// the message names.
pub(super) fn match_array_copy(
    ctx: &MatchContext<'_>,
    detail: &ArrayCopyDetail,
    leaf: NodeId,
) -> Option<NodeId> {
    let file = ctx.file;
    if ctx.kind(leaf) != "identifier" || ctx.text(leaf) != "arraycopy" {
        return None;
    }
    let call = ctx.parent_if(leaf, "method_invocation")?;
    if file.child_by_field(call, "name") != Some(leaf) {
        return None;
    }
    if let Some(object) = file.child_by_field(call, "object") {
        let qualifier: String = ctx.text(object).split_whitespace().collect();
        if qualifier != "System" && qualifier != "java.lang.System" {
            return None;
        }
    }
    let arguments: Vec<NodeId> = file
        .named_children(file.child_by_field(call, "arguments")?)
        .collect();
    if arguments.len() != 5 {
        return None;
    }
    arguments.get(detail.argument.position()).copied()
}

/// `=` storing into an array element: blame the target access.
pub(super) fn match_array_store(ctx: &MatchContext<'_>, leaf: NodeId) -> Option<NodeId> {
    if ctx.kind(leaf) != "=" {
        return None;
    }
    let assignment = ctx.parent_if(leaf, "assignment_expression")?;
    let target = unparenthesize(ctx.file, ctx.file.child_by_field(assignment, "left")?);
    (ctx.kind(target) == "array_access").then_some(target)
}

/// `new` of an array creation with exactly one dimension that may be negative.
pub(super) fn match_negative_size(
    ctx: &MatchContext<'_>,
    size: Option<i64>,
    leaf: NodeId,
) -> Option<NodeId> {
    let file = ctx.file;
    if ctx.kind(leaf) != "new" {
        return None;
    }
    let creation = ctx.parent_if(leaf, "array_creation_expression")?;
    let mut ambiguous = file
        .children_by_field(creation, "dimensions")
        .filter(|dim| file.kind(*dim) == "dimensions_expr")
        .filter_map(|dim| file.named_children(dim).next())
        .filter(|dim| may_be_negative(ctx, *dim, size));
    let first = ambiguous.next()?;
    ambiguous.next().is_none().then_some(first)
}

fn may_be_negative(ctx: &MatchContext<'_>, dimension: NodeId, size: Option<i64>) -> bool {
    let file = ctx.file;
    let dimension = unparenthesize(file, dimension);
    if let Some(value) = integral_constant(ctx, dimension) {
        return match size {
            Some(size) => value == size,
            None => value < 0,
        };
    }
    match ctx.kind(dimension) {
        "character_literal" => false,
        "field_access" => file
            .child_by_field(dimension, "field")
            .map(|f| ctx.text(f) != "length")
            .unwrap_or(true),
        "method_invocation" => {
            let name = file.child_by_field(dimension, "name").map(|n| ctx.text(n));
            let no_args = file
                .child_by_field(dimension, "arguments")
                .map(|args| file.named_children(args).next().is_none())
                .unwrap_or(false);
            !(no_args && matches!(name, Some("size") | Some("length")))
        }
        _ => true,
    }
}
