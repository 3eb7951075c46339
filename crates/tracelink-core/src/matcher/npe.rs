//! NullPointerException: find the dereferenced expression.

use super::{is_plain_assignment_target, parenthesized_outer, unparenthesize, MatchContext};
use crate::exception::{NullAction, NullPointerDetail, UNBOXING_METHODS};
use crate::source::{DeclarationKind, NodeId, PrimitiveType, TypeDesc};

pub(super) fn match_null_pointer(
    ctx: &MatchContext<'_>,
    detail: &NullPointerDetail,
    leaf: NodeId,
) -> Option<NodeId> {
    match detail {
        NullPointerDetail::Custom => None,
        NullPointerDetail::NoMessage => any_dereference(ctx, leaf),
        NullPointerDetail::Structured { action, culprit } => {
            let reason = match_action(ctx, action, leaf)?;
            match culprit {
                Some(name) => {
                    let qualifier = unparenthesize(ctx.file, reason);
                    (ctx.kind(qualifier) == "identifier" && ctx.text(qualifier) == name)
                        .then_some(reason)
                }
                None => Some(reason),
            }
        }
    }
}

/// Every construct that can throw an NPE without a helpful message.
fn any_dereference(ctx: &MatchContext<'_>, leaf: NodeId) -> Option<NodeId> {
    throw_target(ctx, leaf)
        .or_else(|| monitor_lock(ctx, leaf))
        .or_else(|| method_ref_qualifier(ctx, leaf))
        .or_else(|| switch_selector(ctx, leaf))
        .or_else(|| qualified_new_outer(ctx, leaf))
        .or_else(|| for_each_source(ctx, leaf))
        .or_else(|| unboxed_operand(ctx, leaf, None, true))
        .or_else(|| dereference_qualifier(ctx, leaf))
}

fn match_action(ctx: &MatchContext<'_>, action: &NullAction, leaf: NodeId) -> Option<NodeId> {
    match action {
        NullAction::Invoke {
            class_name,
            method_name,
        } => {
            if UNBOXING_METHODS.contains(&method_name.as_str()) {
                let expected = PrimitiveType::from_boxed_name(class_name);
                if let Some(operand) = unboxed_operand(ctx, leaf, expected, false) {
                    return Some(operand);
                }
            }
            match method_name.as_str() {
                "iterator" => {
                    if let Some(source) = for_each_source(ctx, leaf) {
                        return Some(source);
                    }
                }
                "hashCode" | "ordinal" => {
                    if let Some(selector) = switch_selector(ctx, leaf) {
                        return Some(selector);
                    }
                }
                _ => {}
            }
            invoked_qualifier(ctx, leaf, method_name)
        }
        NullAction::AssignField { field } => field_qualifier(ctx, leaf, field, true),
        NullAction::ReadField { field } => field_qualifier(ctx, leaf, field, false),
        NullAction::StoreToArray { element } => array_qualifier(ctx, leaf, element, true),
        NullAction::LoadFromArray { element } => array_qualifier(ctx, leaf, element, false),
        NullAction::ArrayLength => array_length_qualifier(ctx, leaf),
        NullAction::EnterMonitor => monitor_lock(ctx, leaf),
        NullAction::Throw => throw_target(ctx, leaf),
    }
}

// ----------------------------------------------------------------------
// Statement-level dereferences
// ----------------------------------------------------------------------

fn throw_target(ctx: &MatchContext<'_>, leaf: NodeId) -> Option<NodeId> {
    if ctx.kind(leaf) != "throw" {
        return None;
    }
    let statement = ctx.parent_if(leaf, "throw_statement")?;
    let target = ctx.file.named_children(statement).next()?;
    is_nullable(ctx, target).then_some(target)
}

fn monitor_lock(ctx: &MatchContext<'_>, leaf: NodeId) -> Option<NodeId> {
    if ctx.kind(leaf) != "synchronized" {
        return None;
    }
    let statement = ctx.parent_if(leaf, "synchronized_statement")?;
    let lock = ctx.file.child_of_kind(statement, "parenthesized_expression")?;
    let lock = unparenthesize(ctx.file, lock);
    is_nullable(ctx, lock).then_some(lock)
}

fn method_ref_qualifier(ctx: &MatchContext<'_>, leaf: NodeId) -> Option<NodeId> {
    if ctx.kind(leaf) != "::" {
        return None;
    }
    let reference = ctx.parent_if(leaf, "method_reference")?;
    let qualifier = *ctx.file.children(reference).first()?;
    is_nullable(ctx, qualifier).then_some(qualifier)
}

fn switch_selector(ctx: &MatchContext<'_>, leaf: NodeId) -> Option<NodeId> {
    if ctx.kind(leaf) != "switch" {
        return None;
    }
    let switch = ctx
        .file
        .parent(leaf)
        .filter(|p| matches!(ctx.kind(*p), "switch_expression" | "switch_statement"))?;
    let selector = unparenthesize(ctx.file, ctx.file.child_by_field(switch, "condition")?);
    if let Some(ty) = ctx.query.type_of(ctx.file, selector) {
        if ty.is_primitive() {
            return None;
        }
    }
    is_nullable(ctx, selector).then_some(selector)
}

/// `outer.new Inner()` dereferences `outer`.
fn qualified_new_outer(ctx: &MatchContext<'_>, leaf: NodeId) -> Option<NodeId> {
    if ctx.kind(leaf) != "." {
        return None;
    }
    let creation = ctx.parent_if(leaf, "object_creation_expression")?;
    let outer = *ctx.file.children(creation).first()?;
    (outer != leaf && is_nullable(ctx, outer)).then_some(outer)
}

/// `for (x : source)` calls `source.iterator()` or reads the array length.
fn for_each_source(ctx: &MatchContext<'_>, leaf: NodeId) -> Option<NodeId> {
    if ctx.kind(leaf) != ":" {
        return None;
    }
    let statement = ctx.parent_if(leaf, "enhanced_for_statement")?;
    let source = ctx.file.child_by_field(statement, "value")?;
    is_nullable(ctx, source).then_some(source)
}

// ----------------------------------------------------------------------
// Member and element access
// ----------------------------------------------------------------------

/// Qualifier of the member access or array access `leaf` introduces.
fn dereference_qualifier(ctx: &MatchContext<'_>, leaf: NodeId) -> Option<NodeId> {
    let file = ctx.file;
    let parent = file.parent(leaf)?;
    let qualifier = match (ctx.kind(leaf), ctx.kind(parent)) {
        (".", "field_access") | (".", "method_invocation") => {
            file.child_by_field(parent, "object")?
        }
        (".", "explicit_constructor_invocation") => file.child_by_field(parent, "object")?,
        ("[", "array_access") => file.child_by_field(parent, "array")?,
        _ => return None,
    };
    if file.range(qualifier).start >= file.range(leaf).start {
        return None;
    }
    is_nullable(ctx, qualifier).then_some(qualifier)
}

fn invoked_qualifier(ctx: &MatchContext<'_>, leaf: NodeId, method_name: &str) -> Option<NodeId> {
    if ctx.kind(leaf) != "." {
        return None;
    }
    let call = ctx.parent_if(leaf, "method_invocation")?;
    let name = ctx.file.child_by_field(call, "name")?;
    if ctx.text(name) != method_name {
        return None;
    }
    dereference_qualifier(ctx, leaf)
}

fn field_qualifier(ctx: &MatchContext<'_>, leaf: NodeId, field: &str, store: bool) -> Option<NodeId> {
    if ctx.kind(leaf) != "." {
        return None;
    }
    let access = ctx.parent_if(leaf, "field_access")?;
    let name = ctx.file.child_by_field(access, "field")?;
    if ctx.text(name) != field || is_plain_assignment_target(ctx.file, access) != store {
        return None;
    }
    dereference_qualifier(ctx, leaf)
}

fn array_length_qualifier(ctx: &MatchContext<'_>, leaf: NodeId) -> Option<NodeId> {
    let qualifier = field_qualifier(ctx, leaf, "length", false).or_else(|| for_each_source(ctx, leaf))?;
    match ctx.query.type_of(ctx.file, qualifier) {
        Some(ty) if ty.array_element().is_none() => None,
        _ => Some(qualifier),
    }
}

fn array_qualifier(ctx: &MatchContext<'_>, leaf: NodeId, element: &str, store: bool) -> Option<NodeId> {
    if ctx.kind(leaf) != "[" {
        return None;
    }
    let access = ctx.parent_if(leaf, "array_access")?;
    if is_plain_assignment_target(ctx.file, access) != store {
        return None;
    }
    let array = dereference_qualifier(ctx, leaf)?;
    match ctx.query.type_of(ctx.file, array) {
        Some(TypeDesc::Array { element: actual }) => {
            element_matches(&actual, element).then_some(array)
        }
        _ => Some(array),
    }
}

/// `element` as the JVM prints it: `object`, `int`, `byte/boolean`.
fn element_matches(actual: &TypeDesc, element: &str) -> bool {
    match actual.as_primitive() {
        None => element == "object",
        Some(primitive) => element
            .split('/')
            .any(|keyword| keyword == primitive.keyword()),
    }
}

// ----------------------------------------------------------------------
// Unboxing
// ----------------------------------------------------------------------

/// Boxed expression starting at `leaf` that is used as a primitive.
///
/// With `require_known` the expression must have a resolvable wrapper type;
/// otherwise an unknown type is accepted.
fn unboxed_operand(
    ctx: &MatchContext<'_>,
    leaf: NodeId,
    expected: Option<PrimitiveType>,
    require_known: bool,
) -> Option<NodeId> {
    let file = ctx.file;
    let candidates = std::iter::once(leaf)
        .chain(file.ancestors(leaf))
        .take_while(|node| file.first_leaf(*node) == Some(leaf));
    for expr in candidates {
        if !is_nullable(ctx, expr) || !in_primitive_context(ctx, expr) {
            continue;
        }
        match ctx.query.type_of(file, expr) {
            Some(ty) => match ty.unboxed() {
                Some(primitive) if expected.map_or(true, |e| e == primitive) => return Some(expr),
                _ => {}
            },
            None if !require_known => return Some(expr),
            None => {}
        }
    }
    None
}

fn in_primitive_context(ctx: &MatchContext<'_>, expr: NodeId) -> bool {
    let file = ctx.file;
    let outer = parenthesized_outer(file, expr);
    let Some(parent) = file.parent(outer) else {
        return false;
    };
    let field = file.node(outer).field;
    let is_primitive_type = |node: Option<NodeId>| {
        node.and_then(|n| PrimitiveType::from_keyword(file.text_of(n)))
            .is_some()
    };
    match ctx.kind(parent) {
        "variable_declarator" if field == Some("value") => {
            is_primitive_type(file.parent(parent).and_then(|d| file.child_by_field(d, "type")))
        }
        "assignment_expression" if field == Some("right") => file
            .child_by_field(parent, "left")
            .and_then(|left| ctx.query.type_of(file, left))
            .map(|ty| ty.is_primitive())
            .unwrap_or(false),
        "binary_expression" => {
            let operator = file
                .child_by_field(parent, "operator")
                .map(|op| file.text_of(op))
                .unwrap_or_default();
            let other = file
                .named_children(parent)
                .find(|n| *n != outer)
                .and_then(|n| ctx.query.type_of(file, n));
            match operator {
                "==" | "!=" => other.map(|ty| ty.is_primitive()).unwrap_or(false),
                "+" => !other.map(|ty| ty.is_string()).unwrap_or(false),
                _ => true,
            }
        }
        "unary_expression" | "update_expression" | "dimensions_expr" => true,
        "array_access" => field == Some("index"),
        "if_statement" | "while_statement" | "do_statement" | "for_statement"
        | "ternary_expression" => field == Some("condition"),
        "assert_statement" => file.named_children(parent).next() == Some(outer),
        "cast_expression" if field == Some("value") => {
            is_primitive_type(file.child_by_field(parent, "type"))
        }
        "return_statement" => {
            let method = file.parent_of_kind(parent, &["method_declaration", "lambda_expression"]);
            method
                .filter(|m| ctx.kind(*m) == "method_declaration")
                .map(|m| is_primitive_type(file.child_by_field(m, "type")))
                .unwrap_or(false)
        }
        "argument_list" => primitive_parameter(ctx, parent, outer),
        _ => false,
    }
}

/// Whether the parameter receiving `argument` is declared primitive.
fn primitive_parameter(ctx: &MatchContext<'_>, arguments: NodeId, argument: NodeId) -> bool {
    let file = ctx.file;
    let Some(position) = file.named_children(arguments).position(|a| a == argument) else {
        return false;
    };
    let Some(call) = file.parent(arguments) else {
        return false;
    };
    let Some(decl) = ctx.query.resolve_reference(file, call) else {
        return false;
    };
    if decl.kind != DeclarationKind::Method {
        return false;
    }
    let Some(method_file) = ctx.query.source_file(&decl.file) else {
        return false;
    };
    method_file
        .child_by_field(decl.node, "parameters")
        .and_then(|params| {
            method_file
                .named_children(params)
                .filter(|p| method_file.kind(*p) == "formal_parameter")
                .nth(position)
        })
        .and_then(|param| method_file.child_by_field(param, "type"))
        .map(|ty| PrimitiveType::from_keyword(method_file.text_of(ty)).is_some())
        .unwrap_or(false)
}

// ----------------------------------------------------------------------
// Nullability
// ----------------------------------------------------------------------

/// Whether evaluating `expr` can produce `null`.
///
/// Literals, `this`, creations and type names never do. Unresolved
/// capitalized names are taken as types and unresolved lowercase
/// qualifiers of a further member as package segments.
fn is_nullable(ctx: &MatchContext<'_>, expr: NodeId) -> bool {
    let file = ctx.file;
    let expr = unparenthesize(file, expr);
    match ctx.kind(expr) {
        "identifier" => match ctx.query.resolve_reference(file, expr) {
            Some(decl) => decl.kind != DeclarationKind::Class,
            None => {
                let package_segment = file
                    .parent(expr)
                    .map(|p| {
                        ctx.kind(p) == "field_access"
                            && file.child_by_field(p, "object") == Some(expr)
                    })
                    .unwrap_or(false);
                !starts_uppercase(ctx.text(expr)) && !package_segment
            }
        },
        "field_access" => {
            if let Some(decl) = ctx.query.resolve_reference(file, expr) {
                return decl.kind != DeclarationKind::Class;
            }
            !names_type_or_package(ctx, expr)
        }
        "method_invocation" | "array_access" | "cast_expression" | "ternary_expression"
        | "assignment_expression" | "switch_expression" => true,
        _ => false,
    }
}

/// Unresolved `a.b.C` chain that reads as a type or package name.
fn names_type_or_package(ctx: &MatchContext<'_>, access: NodeId) -> bool {
    let file = ctx.file;
    let last_is_type = file
        .child_by_field(access, "field")
        .map(|f| starts_uppercase(ctx.text(f)))
        .unwrap_or(false);
    if last_is_type {
        return true;
    }
    let mut head = access;
    while ctx.kind(head) == "field_access" {
        match file.child_by_field(head, "object") {
            Some(object) => head = object,
            None => return false,
        }
    }
    ctx.kind(head) == "identifier"
        && ctx.query.resolve_reference(file, head).is_none()
        && !starts_uppercase(ctx.text(head))
}

fn starts_uppercase(text: &str) -> bool {
    text.chars().next().map(char::is_uppercase).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::super::match_kind;
    use super::super::test_support::{index_with, leaf};
    use super::*;
    use crate::exception::ExceptionKind;

    const BODY: &str = r#"
static final Object LOCK = new Object();
int[] counts;

String run(String text, int[] arr, Integer boxed, RuntimeException error) {
    String trimmed = text.trim();
    int n = arr.length;
    int x = boxed;
    double d = Math.abs(n);
    synchronized (LOCK) { n++; }
    arr[0] = 1;
    if (n > 2) throw error;
    throw new IllegalStateException(trimmed);
}
"#;

    fn blame(message: &str, needle: &str, token: &str, nth: usize) -> Option<String> {
        let (index, file) = index_with(BODY);
        let ctx = MatchContext::new(&index, &file);
        let kind = ExceptionKind::null_pointer(message);
        let leaf = leaf(&file, needle, token, nth);
        match_kind(&ctx, &kind, leaf).map(|n| file.text_of(n).to_string())
    }

    #[test]
    fn test_structured_invoke() {
        let message = r#"Cannot invoke "String.trim()" because "text" is null"#;
        assert_eq!(blame(message, "text.trim()", ".", 0), Some("text".into()));

        let wrong = r#"Cannot invoke "String.trim()" because "other" is null"#;
        assert_eq!(blame(wrong, "text.trim()", ".", 0), None);

        let wrong_method = r#"Cannot invoke "String.strip()""#;
        assert_eq!(blame(wrong_method, "text.trim()", ".", 0), None);
    }

    #[test]
    fn test_array_length() {
        let message = r#"Cannot read the array length because "arr" is null"#;
        assert_eq!(blame(message, "arr.length", ".", 0), Some("arr".into()));
    }

    #[test]
    fn test_unboxing() {
        assert_eq!(blame("", "int x = boxed", "boxed", 0), Some("boxed".into()));

        let message = r#"Cannot invoke "java.lang.Integer.intValue()" because "boxed" is null"#;
        assert_eq!(blame(message, "int x = boxed", "boxed", 0), Some("boxed".into()));

        let message = r#"Cannot invoke "java.lang.Long.longValue()" because "boxed" is null"#;
        assert_eq!(blame(message, "int x = boxed", "boxed", 0), None);
    }

    #[test]
    fn test_class_qualifier_is_not_null() {
        assert_eq!(blame("", "Math.abs", ".", 0), None);
    }

    #[test]
    fn test_monitor_and_throw() {
        assert_eq!(blame("", "synchronized (LOCK)", "synchronized", 0), Some("LOCK".into()));
        assert_eq!(
            blame("Cannot throw exception", "throw error", "throw", 0),
            Some("error".into())
        );
        assert_eq!(blame("", "throw new", "throw", 0), None);
    }

    #[test]
    fn test_array_store_and_load() {
        let store = r#"Cannot store to int array because "arr" is null"#;
        assert_eq!(blame(store, "arr[0] = 1", "[", 0), Some("arr".into()));

        let load = r#"Cannot load from int array because "arr" is null"#;
        assert_eq!(blame(load, "arr[0] = 1", "[", 0), None);

        let wrong_element = r#"Cannot store to object array"#;
        assert_eq!(blame(wrong_element, "arr[0] = 1", "[", 0), None);
    }

    #[test]
    fn test_custom_message_disables_matching() {
        assert_eq!(blame("text must not be null", "text.trim()", ".", 0), None);
    }
}
