//! Compile-time evaluation of integral expressions.

use super::{unparenthesize, MatchContext};
use crate::source::{NodeId, PrimitiveType, TypeDesc};

const MAX_DEPTH: u32 = 16;

/// An evaluated constant; `int` values are kept wrapped to 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Constant {
    value: i64,
    long: bool,
}

impl Constant {
    fn int(value: i64) -> Self {
        Self {
            value: value as i32 as i64,
            long: false,
        }
    }

    fn long(value: i64) -> Self {
        Self { value, long: true }
    }

    fn of(long: bool, value: i64) -> Self {
        if long {
            Self::long(value)
        } else {
            Self::int(value)
        }
    }
}

/// Value of an integral constant expression, following `final` variables
/// with initializers.
pub fn integral_constant(ctx: &MatchContext<'_>, expr: NodeId) -> Option<i64> {
    evaluate(ctx, expr, 0).map(|constant| constant.value)
}

fn evaluate(ctx: &MatchContext<'_>, expr: NodeId, depth: u32) -> Option<Constant> {
    if depth > MAX_DEPTH {
        return None;
    }
    let file = ctx.file;
    let expr = unparenthesize(file, expr);
    let text = file.text_of(expr);
    match file.kind(expr) {
        "decimal_integer_literal" => parse_digits(text, 10),
        "hex_integer_literal" => parse_digits(strip_radix(text, "0x")?, 16),
        "binary_integer_literal" => parse_digits(strip_radix(text, "0b")?, 2),
        "octal_integer_literal" => parse_digits(text.get(1..)?, 8),
        "character_literal" => char_value(text).map(Constant::int),
        "unary_expression" => {
            let operand = evaluate(ctx, file.child_by_field(expr, "operand")?, depth + 1)?;
            let value = match file.text_of(file.child_by_field(expr, "operator")?) {
                "-" => operand.value.wrapping_neg(),
                "+" => operand.value,
                "~" => !operand.value,
                _ => return None,
            };
            Some(Constant::of(operand.long, value))
        }
        "binary_expression" => {
            let left = evaluate(ctx, file.child_by_field(expr, "left")?, depth + 1)?;
            let right = evaluate(ctx, file.child_by_field(expr, "right")?, depth + 1)?;
            binary(file.text_of(file.child_by_field(expr, "operator")?), left, right)
        }
        "cast_expression" => {
            let ty = file.child_by_field(expr, "type")?;
            let value = evaluate(ctx, file.child_by_field(expr, "value")?, depth + 1)?;
            narrow(PrimitiveType::from_keyword(file.text_of(ty))?, value.value)
        }
        "identifier" | "field_access" => {
            let decl = ctx.query.resolve_reference(file, expr)?;
            if !decl.is_final {
                return None;
            }
            let initializer = decl.initializer?;
            let value = if decl.file == file.path() {
                evaluate(ctx, initializer, depth + 1)?
            } else {
                let other = ctx.query.source_file(&decl.file)?;
                evaluate(&MatchContext::new(ctx.query, &other), initializer, depth + 1)?
            };
            match decl.declared_type {
                Some(TypeDesc::Primitive { primitive }) => narrow(primitive, value.value),
                _ => Some(value),
            }
        }
        _ => None,
    }
}

fn strip_radix<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    text.get(..2)
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &text[2..])
}

fn parse_digits(text: &str, radix: u32) -> Option<Constant> {
    let long = text.ends_with(['l', 'L']);
    let digits: String = text
        .trim_end_matches(['l', 'L'])
        .chars()
        .filter(|c| *c != '_')
        .collect();
    if digits.is_empty() {
        return Some(Constant::of(long, 0));
    }
    // `int` literals may use the sign bit; 2147483648 only appears negated.
    u64::from_str_radix(&digits, radix)
        .ok()
        .map(|v| if long { Constant::long(v as i64) } else { Constant::int(v as u32 as i64) })
}

fn char_value(text: &str) -> Option<i64> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars();
    let value = match chars.next()? {
        '\\' => match chars.next()? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            '0' => '\0',
            's' => ' ',
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'u' => {
                let hex: String = chars.by_ref().skip_while(|c| *c == 'u').collect();
                return u32::from_str_radix(&hex, 16).ok().map(i64::from);
            }
            _ => return None,
        },
        c => c,
    };
    chars.next().is_none().then_some(value as i64)
}

/// Binary numeric promotion: `long` when either operand is, `int` otherwise.
fn binary(operator: &str, left: Constant, right: Constant) -> Option<Constant> {
    if matches!(operator, "<<" | ">>" | ">>>") {
        return Some(shift(operator, left, right.value));
    }
    let (l, r) = (left.value, right.value);
    let value = match operator {
        "+" => l.wrapping_add(r),
        "-" => l.wrapping_sub(r),
        "*" => l.wrapping_mul(r),
        "/" | "%" if r == 0 => return None,
        "/" => l.wrapping_div(r),
        "%" => l.wrapping_rem(r),
        "&" => l & r,
        "|" => l | r,
        "^" => l ^ r,
        _ => return None,
    };
    Some(Constant::of(left.long || right.long, value))
}

/// Shifts keep the left operand's type and mask the count to its width.
fn shift(operator: &str, left: Constant, count: i64) -> Constant {
    if left.long {
        let count = (count & 0x3f) as u32;
        let value = match operator {
            "<<" => left.value.wrapping_shl(count),
            ">>" => left.value.wrapping_shr(count),
            _ => ((left.value as u64) >> count) as i64,
        };
        Constant::long(value)
    } else {
        let v = left.value as i32;
        let count = (count & 0x1f) as u32;
        let value = match operator {
            "<<" => v.wrapping_shl(count),
            ">>" => v.wrapping_shr(count),
            _ => ((v as u32) >> count) as i32,
        };
        Constant::int(value as i64)
    }
}

fn narrow(target: PrimitiveType, value: i64) -> Option<Constant> {
    match target {
        PrimitiveType::Byte => Some(Constant::int(value as i8 as i64)),
        PrimitiveType::Short => Some(Constant::int(value as i16 as i64)),
        PrimitiveType::Char => Some(Constant::int(value as u16 as i64)),
        PrimitiveType::Int => Some(Constant::int(value)),
        PrimitiveType::Long => Some(Constant::long(value)),
        _ => None,
    }
}
