//! ArithmeticException: integer division or remainder by zero.

use super::{integral_constant, unparenthesize, MatchContext};
use crate::source::NodeId;

/// `/`, `%`, `/=` or `%=` whose divisor may be zero: blame the operator.
pub(super) fn match_division(ctx: &MatchContext<'_>, by_zero: bool, leaf: NodeId) -> Option<NodeId> {
    if !by_zero || !matches!(ctx.kind(leaf), "/" | "%" | "/=" | "%=") {
        return None;
    }
    let file = ctx.file;
    let operation = file
        .parent(leaf)
        .filter(|p| matches!(ctx.kind(*p), "binary_expression" | "assignment_expression"))?;
    if file.child_by_field(operation, "operator") != Some(leaf) {
        return None;
    }
    let left = file.child_by_field(operation, "left")?;
    let right = file.child_by_field(operation, "right")?;

    // Floating point division yields infinity or NaN instead.
    let floating = [left, right].into_iter().any(|operand| {
        ctx.query
            .type_of(file, operand)
            .and_then(|ty| ty.numeric())
            .map(|p| p.is_floating())
            .unwrap_or(false)
    });
    if floating {
        return None;
    }

    let mut divisor = unparenthesize(file, right);
    if ctx.kind(divisor) == "unary_expression"
        && file.child_by_field(divisor, "operator").map(|op| ctx.text(op)) == Some("-")
    {
        if let Some(operand) = file.child_by_field(divisor, "operand") {
            divisor = unparenthesize(file, operand);
        }
    }
    match integral_constant(ctx, divisor) {
        Some(value) if value != 0 => None,
        _ => Some(leaf),
    }
}
