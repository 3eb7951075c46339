//! ClassCastException: explicit casts and casts the compiler inserts after
//! generic erasure.

use std::collections::HashSet;

use super::MatchContext;
use crate::exception::CastDetail;
use crate::source::{NodeId, PrimitiveType, TypeDesc, TypeParamRef};

pub(super) fn match_cast(
    ctx: &MatchContext<'_>,
    detail: Option<&CastDetail>,
    leaf: NodeId,
) -> Option<NodeId> {
    explicit_cast(ctx, detail, leaf).or_else(|| erased_member(ctx, detail, leaf))
}

/// `(` of a cast expression whose type agrees with the message target.
fn explicit_cast(ctx: &MatchContext<'_>, detail: Option<&CastDetail>, leaf: NodeId) -> Option<NodeId> {
    if ctx.kind(leaf) != "(" {
        return None;
    }
    let cast = ctx.parent_if(leaf, "cast_expression")?;
    let type_node = ctx.file.child_by_field(cast, "type")?;
    let Some(detail) = detail else {
        return Some(type_node);
    };
    match ctx.query.type_of(ctx.file, cast) {
        Some(ty) if !cast_class_matches(ctx, &ty, &detail.target) => None,
        _ => Some(type_node),
    }
}

/// Name of a call or field whose declared type is a type parameter: the
/// value is checked against the substituted type at the use site.
fn erased_member(ctx: &MatchContext<'_>, detail: Option<&CastDetail>, leaf: NodeId) -> Option<NodeId> {
    let file = ctx.file;
    if ctx.kind(leaf) != "identifier" {
        return None;
    }
    let parent = file.parent(leaf)?;
    let is_member_name = match (ctx.kind(parent), file.node(leaf).field) {
        ("method_invocation", Some("name")) | ("field_access", Some("field")) => true,
        _ => false,
    };
    if !is_member_name {
        return None;
    }
    let decl = ctx.query.resolve_reference(file, parent)?;
    if !matches!(decl.declared_type, Some(TypeDesc::TypeParam(_))) {
        return None;
    }
    let apparent = ctx.query.type_of(file, parent)?;
    if matches!(apparent, TypeDesc::TypeParam(_)) {
        return None;
    }
    match detail {
        Some(detail) if !cast_class_matches(ctx, &apparent, &detail.target) => None,
        _ => Some(parent),
    }
}

/// Whether a cast to `ty` is a check against the JVM class `jvm_name`
/// (`java.lang.String`, `com.foo.Outer$Inner`, `[I`, `[Ljava.lang.Object;`).
///
/// Types that cannot be resolved match any class with the same simple name.
pub fn cast_class_matches(ctx: &MatchContext<'_>, ty: &TypeDesc, jvm_name: &str) -> bool {
    class_matches(ctx, ty, jvm_name, &mut HashSet::new())
}

fn class_matches(
    ctx: &MatchContext<'_>,
    ty: &TypeDesc,
    jvm_name: &str,
    visited: &mut HashSet<TypeParamRef>,
) -> bool {
    match ty {
        TypeDesc::Primitive { primitive } => primitive.boxed_name() == jvm_name,
        TypeDesc::Class(class) => {
            if jvm_name.starts_with('[') {
                return false;
            }
            let simple = jvm_name.rsplit(['.', '$']).next().unwrap_or(jvm_name);
            if simple != class.simple_name() {
                return false;
            }
            !class.resolved || class.name == jvm_name.replace('$', ".")
        }
        TypeDesc::TypeParam(param) => {
            if !visited.insert(param.clone()) {
                return false;
            }
            ctx.query
                .type_param_bounds(param)
                .iter()
                .any(|bound| class_matches(ctx, bound, jvm_name, visited))
        }
        TypeDesc::Array { element } => match jvm_name.strip_prefix('[') {
            Some(component) => component_matches(ctx, element, component, visited),
            None => false,
        },
        TypeDesc::Intersection { bounds } => bounds
            .iter()
            .any(|bound| class_matches(ctx, bound, jvm_name, visited)),
        TypeDesc::Null => false,
    }
}

/// Array component descriptor: `I`, `Ljava.lang.String;` or a nested `[...`.
fn component_matches(
    ctx: &MatchContext<'_>,
    element: &TypeDesc,
    component: &str,
    visited: &mut HashSet<TypeParamRef>,
) -> bool {
    if component.starts_with('[') {
        return class_matches(ctx, element, component, visited);
    }
    if let Some(class_name) = component.strip_prefix('L').and_then(|c| c.strip_suffix(';')) {
        return !element.is_primitive() && class_matches(ctx, element, class_name, visited);
    }
    let mut chars = component.chars();
    match (chars.next().and_then(PrimitiveType::from_descriptor), chars.next()) {
        (Some(primitive), None) => element.as_primitive() == Some(primitive),
        _ => false,
    }
}
