//! Name and type resolution over indexed Java syntax trees.
//!
//! This is deliberately shallow: scopes are walked syntactically, overloads
//! are picked by arity, and only the receiver's own type arguments are
//! substituted. It covers what the exception heuristics ask for.

use std::cell::Cell;
use std::path::Path;
use std::sync::Arc;

use super::java::IndexState;
use super::tree::{NodeId, SourceFile};
use super::types::{ClassType, PrimitiveType, TypeDesc, TypeParamRef};
use super::{Declaration, DeclarationKind};

pub(crate) const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

const TYPE_BODIES: &[&str] = &[
    "class_body",
    "interface_body",
    "enum_body",
    "enum_body_declarations",
    "annotation_type_body",
];

const GENERIC_OWNERS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "record_declaration",
    "method_declaration",
    "constructor_declaration",
];

/// `java.lang` types resolvable without their sources being indexed.
const JAVA_LANG: &[&str] = &[
    "Object", "String", "CharSequence", "StringBuilder", "StringBuffer", "Boolean", "Byte",
    "Character", "Short", "Integer", "Long", "Float", "Double", "Number", "Void", "Math",
    "System", "Class", "Enum", "Record", "Iterable", "Comparable", "Runnable", "Thread",
    "Throwable", "Exception", "RuntimeException", "Error", "AssertionError",
    "NullPointerException", "ClassCastException", "ArithmeticException",
    "ArrayIndexOutOfBoundsException", "ArrayStoreException", "NegativeArraySizeException",
    "IllegalArgumentException", "IllegalStateException", "IndexOutOfBoundsException",
    "UnsupportedOperationException", "Cloneable", "AutoCloseable", "Override", "Deprecated",
];

const MAX_DEPTH: u32 = 32;

/// A type declaration inside an indexed file.
#[derive(Clone)]
pub(crate) struct ClassRef {
    pub file: Arc<SourceFile>,
    pub node: NodeId,
}

pub(crate) struct Resolver<'a> {
    state: &'a IndexState,
    depth: Cell<u32>,
}

impl<'a> Resolver<'a> {
    pub fn new(state: &'a IndexState) -> Self {
        Self {
            state,
            depth: Cell::new(0),
        }
    }

    fn file(&self, path: &Path) -> Option<Arc<SourceFile>> {
        self.state.files.get(path).cloned()
    }

    /// Run `f` one level deeper, giving up past [`MAX_DEPTH`].
    fn nested<T>(&self, f: impl FnOnce() -> Option<T>) -> Option<T> {
        let depth = self.depth.get();
        if depth >= MAX_DEPTH {
            return None;
        }
        self.depth.set(depth + 1);
        let result = f();
        self.depth.set(depth);
        result
    }

    pub fn class_by_name(&self, qualified: &str) -> Option<ClassRef> {
        let entry = self.state.classes.get(qualified)?.first()?;
        Some(ClassRef {
            file: self.file(&entry.file)?,
            node: entry.node,
        })
    }

    // ------------------------------------------------------------------
    // Declarations and names
    // ------------------------------------------------------------------

    pub fn declared_name<'f>(file: &'f SourceFile, node: NodeId) -> Option<&'f str> {
        file.child_by_field(node, "name").map(|n| file.text_of(n))
    }

    /// Canonical name of a member or top-level type; `None` for local classes.
    pub fn qualified_name_of(file: &SourceFile, class_node: NodeId) -> Option<String> {
        let mut names = vec![Self::declared_name(file, class_node)?];
        for ancestor in file.ancestors(class_node) {
            let kind = file.kind(ancestor);
            if TYPE_DECLARATIONS.contains(&kind) {
                names.push(Self::declared_name(file, ancestor)?);
            } else if kind == "program" {
                break;
            } else if !TYPE_BODIES.contains(&kind) {
                return None;
            }
        }
        names.reverse();
        let simple = names.join(".");
        match package_of(file) {
            Some(package) => Some(format!("{package}.{simple}")),
            None => Some(simple),
        }
    }

    fn class_declaration(&self, class: &ClassRef) -> Option<Declaration> {
        let qualified = Self::qualified_name_of(&class.file, class.node)?;
        Some(Declaration {
            kind: DeclarationKind::Class,
            name: Self::declared_name(&class.file, class.node)?.to_string(),
            file: class.file.path().to_path_buf(),
            node: class.node,
            declared_type: Some(TypeDesc::class(qualified)),
            is_final: true,
            initializer: None,
        })
    }

    /// Resolve a type name as written at `at`.
    pub fn resolve_type_name(&self, file: &SourceFile, at: NodeId, name: &str) -> Option<TypeDesc> {
        if let Some((head, rest)) = name.split_once('.') {
            if self.class_by_name(name).is_some() {
                return Some(TypeDesc::class(name));
            }
            if let Some(TypeDesc::Class(outer)) = self.resolve_type_name(file, at, head) {
                let nested = format!("{}.{}", outer.name, rest);
                if self.class_by_name(&nested).is_some() {
                    return Some(TypeDesc::class(nested));
                }
            }
            // Fully qualified in source: trust it even if it isn't indexed.
            if head.starts_with(|c: char| c.is_lowercase()) {
                return Some(TypeDesc::class(name));
            }
            return None;
        }

        for owner in file.ancestors(at) {
            if !GENERIC_OWNERS.contains(&file.kind(owner)) {
                continue;
            }
            if let Some(param) = type_parameter_named(file, owner, name) {
                return Some(TypeDesc::TypeParam(TypeParamRef {
                    file: file.path().to_path_buf(),
                    node: param,
                    name: name.to_string(),
                }));
            }
        }

        if let Some(qualified) = file
            .descendants(file.root())
            .filter(|n| TYPE_DECLARATIONS.contains(&file.kind(*n)))
            .filter(|n| Self::declared_name(file, *n) == Some(name))
            .find_map(|n| Self::qualified_name_of(file, n))
        {
            return Some(TypeDesc::class(qualified));
        }

        let imports = imports_of(file);
        for import in imports.iter().filter(|i| !i.on_demand && !i.is_static) {
            if import.path.rsplit('.').next() == Some(name) {
                return Some(TypeDesc::class(import.path.clone()));
            }
        }

        let same_package = match package_of(file) {
            Some(package) => format!("{package}.{name}"),
            None => name.to_string(),
        };
        if self.class_by_name(&same_package).is_some() {
            return Some(TypeDesc::class(same_package));
        }

        for import in imports.iter().filter(|i| i.on_demand && !i.is_static) {
            let candidate = format!("{}.{}", import.path, name);
            if self.class_by_name(&candidate).is_some() {
                return Some(TypeDesc::class(candidate));
            }
        }

        let lang = format!("java.lang.{name}");
        if JAVA_LANG.contains(&name) || self.class_by_name(&lang).is_some() {
            return Some(TypeDesc::class(lang));
        }
        None
    }

    /// Static type named by a type node.
    pub fn type_from_node(&self, file: &SourceFile, node: NodeId) -> Option<TypeDesc> {
        let text = file.text_of(node);
        match file.kind(node) {
            "integral_type" | "floating_point_type" | "boolean_type" => {
                PrimitiveType::from_keyword(text).map(TypeDesc::primitive)
            }
            "void_type" => None,
            "type_identifier" | "scoped_type_identifier" | "identifier" | "scoped_identifier" => {
                let name: String = text.chars().filter(|c| !c.is_whitespace()).collect();
                Some(
                    self.resolve_type_name(file, node, &name)
                        .unwrap_or_else(|| unresolved(&name)),
                )
            }
            "generic_type" => {
                let base = file.named_children(node).next()?;
                let mut ty = self.type_from_node(file, base)?;
                if let TypeDesc::Class(class) = &mut ty {
                    if let Some(args) = file.child_of_kind(node, "type_arguments") {
                        class.args = file
                            .named_children(args)
                            .map(|arg| {
                                self.type_from_node(file, arg)
                                    .unwrap_or_else(|| TypeDesc::class("java.lang.Object"))
                            })
                            .collect();
                    }
                }
                Some(ty)
            }
            "array_type" => {
                let element = self.type_from_node(file, file.child_by_field(node, "element")?)?;
                let dims = file
                    .child_by_field(node, "dimensions")
                    .map(|d| dimension_count(file, d))
                    .unwrap_or(1);
                Some(wrap_array(element, dims))
            }
            "annotated_type" => {
                let inner = file.named_children(node).last()?;
                self.type_from_node(file, inner)
            }
            "wildcard" => {
                let bound = file
                    .children(node)
                    .iter()
                    .any(|c| file.kind(*c) == "extends")
                    .then(|| file.named_children(node).last())
                    .flatten();
                match bound {
                    Some(bound) => self.type_from_node(file, bound),
                    None => Some(TypeDesc::class("java.lang.Object")),
                }
            }
            _ => None,
        }
    }

    fn variable_declaration(
        &self,
        file: &Arc<SourceFile>,
        kind: DeclarationKind,
        declarator: NodeId,
        owner: NodeId,
    ) -> Option<Declaration> {
        let name = Self::declared_name(file, declarator)?;
        let type_node = file.child_by_field(owner, "type").or_else(|| {
            file.child_of_kind(owner, "catch_type")
                .and_then(|c| file.named_children(c).next())
        });
        let initializer = match file.kind(declarator) {
            "enhanced_for_statement" => None,
            _ => file.child_by_field(declarator, "value"),
        };

        let base_type = match type_node {
            Some(t) if file.text_of(t) == "var" => {
                initializer.and_then(|init| self.type_of(file, init))
            }
            Some(t) => self.type_from_node(file, t),
            None => None,
        };
        let declared_type = match file.child_by_field(declarator, "dimensions") {
            Some(dims) => base_type.map(|ty| wrap_array(ty, dimension_count(file, dims))),
            None => base_type,
        };

        let interface_constant = kind == DeclarationKind::Field
            && file
                .parent(owner)
                .is_some_and(|body| file.kind(body) == "interface_body");

        Some(Declaration {
            kind,
            name: name.to_string(),
            file: file.path().to_path_buf(),
            node: declarator,
            declared_type,
            is_final: has_modifier(file, owner, "final") || interface_constant,
            initializer,
        })
    }

    /// Declaration an identifier in expression position refers to.
    pub fn resolve_identifier(&self, file: &Arc<SourceFile>, ident: NodeId) -> Option<Declaration> {
        let name = file.text_of(ident);
        let position = file.range(ident).start;
        let mut child = ident;

        for scope in file.ancestors(ident) {
            let found = match file.kind(scope) {
                "block" | "constructor_body" | "switch_block_statement_group" | "switch_rule" => {
                    file.children(scope)
                        .iter()
                        .copied()
                        .filter(|stmt| file.range(*stmt).start < position)
                        .filter(|stmt| file.kind(*stmt) == "local_variable_declaration")
                        .find_map(|stmt| self.local_in(file, stmt, name))
                }
                "for_statement" => file
                    .children_by_field(scope, "init")
                    .filter(|init| file.kind(*init) == "local_variable_declaration")
                    .find_map(|init| self.local_in(file, init, name)),
                "enhanced_for_statement"
                    if file.node(child).field == Some("body")
                        && Self::declared_name(file, scope) == Some(name) =>
                {
                    self.variable_declaration(file, DeclarationKind::Local, scope, scope)
                }
                "catch_clause" => file
                    .child_of_kind(scope, "catch_formal_parameter")
                    .filter(|p| Self::declared_name(file, *p) == Some(name))
                    .and_then(|p| self.variable_declaration(file, DeclarationKind::Local, p, p)),
                "try_with_resources_statement" => file
                    .child_by_field(scope, "resources")
                    .into_iter()
                    .flat_map(|spec| file.named_children(spec).collect::<Vec<_>>())
                    .filter(|r| file.range(*r).start < position)
                    .find(|r| Self::declared_name(file, *r) == Some(name))
                    .and_then(|r| self.variable_declaration(file, DeclarationKind::Local, r, r)),
                "lambda_expression" => self.lambda_parameter(file, scope, name),
                "method_declaration" | "constructor_declaration" => {
                    self.parameter_in(file, scope, name)
                }
                kind if TYPE_DECLARATIONS.contains(&kind) => {
                    let class = ClassRef {
                        file: Arc::clone(file),
                        node: scope,
                    };
                    self.find_field(&class, name)
                }
                _ => None,
            };
            if found.is_some() {
                return found;
            }
            child = scope;
        }

        let ty = self.resolve_type_name(file, ident, name)?;
        match ty {
            TypeDesc::Class(class) => {
                let class = self.class_by_name(&class.name)?;
                self.class_declaration(&class)
            }
            _ => None,
        }
    }

    fn local_in(&self, file: &Arc<SourceFile>, declaration: NodeId, name: &str) -> Option<Declaration> {
        file.children_by_field(declaration, "declarator")
            .find(|d| Self::declared_name(file, *d) == Some(name))
            .and_then(|d| self.variable_declaration(file, DeclarationKind::Local, d, declaration))
    }

    fn parameter_in(&self, file: &Arc<SourceFile>, method: NodeId, name: &str) -> Option<Declaration> {
        let params = file.child_by_field(method, "parameters")?;
        for param in file.named_children(params) {
            match file.kind(param) {
                "formal_parameter" if Self::declared_name(file, param) == Some(name) => {
                    return self.variable_declaration(file, DeclarationKind::Parameter, param, param);
                }
                "spread_parameter" => {
                    let declarator = file.child_of_kind(param, "variable_declarator")?;
                    if Self::declared_name(file, declarator) == Some(name) {
                        let mut decl = self.variable_declaration(
                            file,
                            DeclarationKind::Parameter,
                            declarator,
                            param,
                        )?;
                        decl.declared_type = file
                            .named_children(param)
                            .find(|c| file.kind(*c) != "modifiers" && *c != declarator)
                            .and_then(|t| self.type_from_node(file, t))
                            .map(wrap_array_once);
                        return Some(decl);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn lambda_parameter(&self, file: &Arc<SourceFile>, lambda: NodeId, name: &str) -> Option<Declaration> {
        let params = file.child_by_field(lambda, "parameters")?;
        let untyped = |node: NodeId| Declaration {
            kind: DeclarationKind::Parameter,
            name: name.to_string(),
            file: file.path().to_path_buf(),
            node,
            declared_type: None,
            is_final: false,
            initializer: None,
        };
        match file.kind(params) {
            "identifier" if file.text_of(params) == name => Some(untyped(params)),
            "inferred_parameters" => file
                .named_children(params)
                .find(|p| file.text_of(*p) == name)
                .map(untyped),
            "formal_parameters" => self.parameter_in(file, lambda, name),
            _ => None,
        }
    }

    /// Field, enum constant or record component named `name` in `class` or
    /// its indexed supertypes.
    pub fn find_field(&self, class: &ClassRef, name: &str) -> Option<Declaration> {
        self.nested(|| {
            let file = &class.file;
            if file.kind(class.node) == "record_declaration" {
                if let Some(params) = file.child_by_field(class.node, "parameters") {
                    if let Some(component) = file
                        .named_children(params)
                        .find(|p| Self::declared_name(file, *p) == Some(name))
                    {
                        let mut decl = self.variable_declaration(
                            file,
                            DeclarationKind::Field,
                            component,
                            component,
                        )?;
                        decl.is_final = true;
                        return Some(decl);
                    }
                }
            }

            for member in members(file, class.node) {
                match file.kind(member) {
                    "field_declaration" | "constant_declaration" => {
                        if let Some(declarator) = file
                            .children_by_field(member, "declarator")
                            .find(|d| Self::declared_name(file, *d) == Some(name))
                        {
                            let mut decl = self.variable_declaration(
                                file,
                                DeclarationKind::Field,
                                declarator,
                                member,
                            )?;
                            decl.is_final |= file.kind(member) == "constant_declaration";
                            return Some(decl);
                        }
                    }
                    "enum_constant" if Self::declared_name(file, member) == Some(name) => {
                        return Some(Declaration {
                            kind: DeclarationKind::Field,
                            name: name.to_string(),
                            file: file.path().to_path_buf(),
                            node: member,
                            declared_type: Self::qualified_name_of(file, class.node)
                                .map(TypeDesc::class),
                            is_final: true,
                            initializer: None,
                        });
                    }
                    _ => {}
                }
            }

            self.supertypes(class)
                .iter()
                .find_map(|sup| self.find_field(sup, name))
        })
    }

    /// Method named `name` in `class` or its indexed supertypes, preferring
    /// one with `arity` parameters.
    pub fn find_method(&self, class: &ClassRef, name: &str, arity: usize) -> Option<Declaration> {
        self.nested(|| {
            let file = &class.file;
            let candidates: Vec<NodeId> = members(file, class.node)
                .into_iter()
                .filter(|m| file.kind(*m) == "method_declaration")
                .filter(|m| Self::declared_name(file, *m) == Some(name))
                .collect();
            let chosen = candidates
                .iter()
                .copied()
                .find(|m| parameter_count(file, *m) == Some(arity))
                .or_else(|| candidates.first().copied());

            if let Some(method) = chosen {
                let mut declared_type = file
                    .child_by_field(method, "type")
                    .and_then(|t| self.type_from_node(file, t));
                if let (Some(ty), Some(dims)) = (declared_type.clone(), file.child_by_field(method, "dimensions")) {
                    declared_type = Some(wrap_array(ty, dimension_count(file, dims)));
                }
                return Some(Declaration {
                    kind: DeclarationKind::Method,
                    name: name.to_string(),
                    file: file.path().to_path_buf(),
                    node: method,
                    declared_type,
                    is_final: has_modifier(file, method, "final"),
                    initializer: None,
                });
            }

            self.supertypes(class)
                .iter()
                .find_map(|sup| self.find_method(sup, name, arity))
        })
    }

    fn supertypes(&self, class: &ClassRef) -> Vec<ClassRef> {
        let file = &class.file;
        let mut types = Vec::new();
        if let Some(superclass) = file.child_by_field(class.node, "superclass") {
            types.extend(file.named_children(superclass));
        }
        if let Some(node) = file.child_by_field(class.node, "interfaces") {
            types.extend(type_list(file, node));
        }
        if let Some(node) = file.child_of_kind(class.node, "extends_interfaces") {
            types.extend(type_list(file, node));
        }
        types
            .into_iter()
            .filter_map(|t| self.type_from_node(file, t))
            .filter_map(|ty| self.class_of_type(&ty))
            .collect()
    }

    /// Indexed declaration of a class type, through type-parameter bounds.
    pub fn class_of_type(&self, ty: &TypeDesc) -> Option<ClassRef> {
        match ty {
            TypeDesc::Class(class) if class.resolved => self.class_by_name(&class.name),
            TypeDesc::TypeParam(param) => self.nested(|| {
                self.type_param_bounds(param)
                    .iter()
                    .find_map(|b| self.class_of_type(b))
            }),
            TypeDesc::Intersection { bounds } => bounds.iter().find_map(|b| self.class_of_type(b)),
            _ => None,
        }
    }

    pub fn type_param_bounds(&self, param: &TypeParamRef) -> Vec<TypeDesc> {
        let Some(file) = self.file(&param.file) else {
            return Vec::new();
        };
        if param.node.index() >= file.node_count() {
            return Vec::new();
        }
        let bounds: Vec<TypeDesc> = file
            .child_of_kind(param.node, "type_bound")
            .map(|bound| {
                file.named_children(bound)
                    .filter_map(|t| self.type_from_node(&file, t))
                    .collect()
            })
            .unwrap_or_default();
        if bounds.is_empty() {
            vec![TypeDesc::class("java.lang.Object")]
        } else {
            bounds
        }
    }

    // ------------------------------------------------------------------
    // References and expression types
    // ------------------------------------------------------------------

    pub fn resolve_reference(&self, file: &Arc<SourceFile>, node: NodeId) -> Option<Declaration> {
        match file.kind(node) {
            "identifier" => {
                let parent = file.parent(node)?;
                match (file.kind(parent), file.node(node).field) {
                    ("method_invocation", Some("name")) => self.resolve_method_call(file, parent),
                    ("field_access", Some("field")) => self.resolve_field_access(file, parent),
                    _ => self.resolve_identifier(file, node),
                }
            }
            "method_invocation" => self.resolve_method_call(file, node),
            "field_access" => self.resolve_field_access(file, node),
            "parenthesized_expression" => {
                let inner = file.named_children(node).next()?;
                self.resolve_reference(file, inner)
            }
            "type_identifier" | "scoped_type_identifier" => {
                let name = file.text_of(node).to_string();
                match self.resolve_type_name(file, node, &name)? {
                    TypeDesc::Class(class) => {
                        let class = self.class_by_name(&class.name)?;
                        self.class_declaration(&class)
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Class a qualifier expression names, for static member access.
    fn static_qualifier(&self, file: &Arc<SourceFile>, object: NodeId) -> Option<ClassRef> {
        match file.kind(object) {
            "identifier" => match self.resolve_identifier(file, object)? {
                decl if decl.kind == DeclarationKind::Class => Some(ClassRef {
                    file: self.file(&decl.file)?,
                    node: decl.node,
                }),
                _ => None,
            },
            "field_access" => {
                let text: String = file
                    .text_of(object)
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                match self.resolve_type_name(file, object, &text)? {
                    TypeDesc::Class(class) => self.class_by_name(&class.name),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Receiver class plus the type arguments to substitute into members.
    fn receiver(&self, file: &Arc<SourceFile>, object: NodeId) -> Option<(ClassRef, Vec<TypeDesc>)> {
        if let Some(ty) = self.type_of(file, object) {
            let args = match &ty {
                TypeDesc::Class(class) => class.args.clone(),
                _ => Vec::new(),
            };
            if let Some(class) = self.class_of_type(&ty) {
                return Some((class, args));
            }
        }
        self.static_qualifier(file, object).map(|c| (c, Vec::new()))
    }

    fn enclosing_classes(&self, file: &Arc<SourceFile>, node: NodeId) -> Vec<ClassRef> {
        file.ancestors(node)
            .filter(|n| TYPE_DECLARATIONS.contains(&file.kind(*n)))
            .map(|n| ClassRef {
                file: Arc::clone(file),
                node: n,
            })
            .collect()
    }

    pub fn resolve_method_call(&self, file: &Arc<SourceFile>, call: NodeId) -> Option<Declaration> {
        let name = file.text_of(file.child_by_field(call, "name")?);
        let arity = file
            .child_by_field(call, "arguments")
            .map(|args| file.named_children(args).count())
            .unwrap_or(0);
        match file.child_by_field(call, "object") {
            Some(object) => {
                let (class, _) = self.receiver(file, object)?;
                self.find_method(&class, name, arity)
            }
            None => self
                .enclosing_classes(file, call)
                .iter()
                .find_map(|class| self.find_method(class, name, arity)),
        }
    }

    fn resolve_field_access(&self, file: &Arc<SourceFile>, access: NodeId) -> Option<Declaration> {
        let name = file.text_of(file.child_by_field(access, "field")?);
        let object = file.child_by_field(access, "object")?;
        let (class, _) = self.receiver(file, object)?;
        self.find_field(&class, name)
    }

    pub fn type_of(&self, file: &Arc<SourceFile>, expr: NodeId) -> Option<TypeDesc> {
        self.nested(|| self.compute_type(file, expr))
    }

    fn compute_type(&self, file: &Arc<SourceFile>, expr: NodeId) -> Option<TypeDesc> {
        let text = file.text_of(expr);
        match file.kind(expr) {
            "decimal_integer_literal" | "hex_integer_literal" | "octal_integer_literal"
            | "binary_integer_literal" => Some(TypeDesc::primitive(
                if text.ends_with(['l', 'L']) {
                    PrimitiveType::Long
                } else {
                    PrimitiveType::Int
                },
            )),
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                Some(TypeDesc::primitive(if text.ends_with(['f', 'F']) {
                    PrimitiveType::Float
                } else {
                    PrimitiveType::Double
                }))
            }
            "true" | "false" => Some(TypeDesc::primitive(PrimitiveType::Boolean)),
            "character_literal" => Some(TypeDesc::primitive(PrimitiveType::Char)),
            "string_literal" | "text_block" => Some(TypeDesc::string()),
            "null_literal" => Some(TypeDesc::Null),
            "class_literal" => Some(TypeDesc::class("java.lang.Class")),
            "this" => {
                let class = file.parent_of_kind(expr, TYPE_DECLARATIONS)?;
                Self::qualified_name_of(file, class).map(TypeDesc::class)
            }
            "identifier" => {
                let decl = self.resolve_identifier(file, expr)?;
                match decl.kind {
                    DeclarationKind::Class | DeclarationKind::Method => None,
                    _ => decl.declared_type,
                }
            }
            "parenthesized_expression" => {
                let inner = file.named_children(expr).next()?;
                self.type_of(file, inner)
            }
            "field_access" => {
                let object = file.child_by_field(expr, "object")?;
                let field = file.text_of(file.child_by_field(expr, "field")?);
                if field == "length" {
                    if let Some(TypeDesc::Array { .. }) = self.type_of(file, object) {
                        return Some(TypeDesc::primitive(PrimitiveType::Int));
                    }
                }
                let (class, args) = self.receiver(file, object)?;
                let decl = self.find_field(&class, field)?;
                decl.declared_type
                    .clone()
                    .map(|ty| self.substitute(ty, &decl, &args))
            }
            "method_invocation" => {
                let decl = self.resolve_method_call(file, expr)?;
                let args = match file.child_by_field(expr, "object") {
                    Some(object) => match self.type_of(file, object) {
                        Some(TypeDesc::Class(class)) => class.args,
                        _ => Vec::new(),
                    },
                    None => Vec::new(),
                };
                decl.declared_type
                    .clone()
                    .map(|ty| self.substitute(ty, &decl, &args))
            }
            "array_access" => {
                let array = self.type_of(file, file.child_by_field(expr, "array")?)?;
                array.array_element().cloned()
            }
            "cast_expression" => {
                let types: Vec<TypeDesc> = file
                    .children_by_field(expr, "type")
                    .filter_map(|t| self.type_from_node(file, t))
                    .collect();
                match types.len() {
                    0 => None,
                    1 => types.into_iter().next(),
                    _ => Some(TypeDesc::Intersection { bounds: types }),
                }
            }
            "object_creation_expression" => {
                self.type_from_node(file, file.child_by_field(expr, "type")?)
            }
            "array_creation_expression" => {
                let element = self.type_from_node(file, file.child_by_field(expr, "type")?)?;
                let dims: usize = file
                    .children_by_field(expr, "dimensions")
                    .map(|d| match file.kind(d) {
                        "dimensions_expr" => 1,
                        _ => dimension_count(file, d),
                    })
                    .sum();
                Some(wrap_array(element, dims.max(1)))
            }
            "binary_expression" => {
                let operator = file.text_of(file.child_by_field(expr, "operator")?);
                let left = self.type_of(file, file.child_by_field(expr, "left")?);
                let right = self.type_of(file, file.child_by_field(expr, "right")?);
                binary_result(operator, left, right)
            }
            "unary_expression" => {
                let operator = file.text_of(file.child_by_field(expr, "operator")?);
                if operator == "!" {
                    return Some(TypeDesc::primitive(PrimitiveType::Boolean));
                }
                let operand = self.type_of(file, file.child_by_field(expr, "operand")?)?;
                let primitive = operand.numeric()?;
                Some(TypeDesc::primitive(primitive.promote(PrimitiveType::Int)))
            }
            "update_expression" => {
                let operand = file.named_children(expr).next()?;
                self.type_of(file, operand)
            }
            "ternary_expression" => {
                let consequence = self.type_of(file, file.child_by_field(expr, "consequence")?);
                match consequence {
                    Some(TypeDesc::Null) | None => {
                        self.type_of(file, file.child_by_field(expr, "alternative")?)
                    }
                    ty => ty,
                }
            }
            "assignment_expression" => self.type_of(file, file.child_by_field(expr, "left")?),
            "instanceof_expression" => Some(TypeDesc::primitive(PrimitiveType::Boolean)),
            _ => None,
        }
    }

    /// Replace the member owner's type parameters with the receiver's arguments.
    fn substitute(&self, ty: TypeDesc, member: &Declaration, args: &[TypeDesc]) -> TypeDesc {
        if args.is_empty() {
            return ty;
        }
        let Some(file) = self.file(&member.file) else {
            return ty;
        };
        let Some(owner) = file.parent_of_kind(member.node, TYPE_DECLARATIONS) else {
            return ty;
        };
        let params: Vec<NodeId> = file
            .child_by_field(owner, "type_parameters")
            .map(|tp| {
                file.named_children(tp)
                    .filter(|p| file.kind(*p) == "type_parameter")
                    .collect()
            })
            .unwrap_or_default();
        substitute_params(ty, file.path(), &params, args)
    }
}

fn substitute_params(ty: TypeDesc, path: &Path, params: &[NodeId], args: &[TypeDesc]) -> TypeDesc {
    match ty {
        TypeDesc::TypeParam(param) if param.file == path => {
            match params.iter().position(|p| *p == param.node) {
                Some(idx) if idx < args.len() => args[idx].clone(),
                _ => TypeDesc::TypeParam(param),
            }
        }
        TypeDesc::Array { element } => {
            TypeDesc::array_of(substitute_params(*element, path, params, args))
        }
        TypeDesc::Class(class) => TypeDesc::Class(ClassType {
            args: class
                .args
                .into_iter()
                .map(|a| substitute_params(a, path, params, args))
                .collect(),
            ..class
        }),
        other => other,
    }
}

fn binary_result(operator: &str, left: Option<TypeDesc>, right: Option<TypeDesc>) -> Option<TypeDesc> {
    match operator {
        "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" => {
            Some(TypeDesc::primitive(PrimitiveType::Boolean))
        }
        "+" if left.as_ref().is_some_and(TypeDesc::is_string)
            || right.as_ref().is_some_and(TypeDesc::is_string) =>
        {
            Some(TypeDesc::string())
        }
        "<<" | ">>" | ">>>" => {
            let left = left?.numeric()?;
            Some(TypeDesc::primitive(left.promote(PrimitiveType::Int)))
        }
        _ => {
            let left = left?.numeric()?;
            let right = right?.numeric()?;
            if left == PrimitiveType::Boolean && right == PrimitiveType::Boolean {
                return Some(TypeDesc::primitive(PrimitiveType::Boolean));
            }
            Some(TypeDesc::primitive(left.promote(right)))
        }
    }
}

fn unresolved(name: &str) -> TypeDesc {
    TypeDesc::Class(ClassType {
        name: name.to_string(),
        resolved: false,
        args: Vec::new(),
    })
}

fn wrap_array(mut ty: TypeDesc, dims: usize) -> TypeDesc {
    for _ in 0..dims {
        ty = TypeDesc::array_of(ty);
    }
    ty
}

fn wrap_array_once(ty: TypeDesc) -> TypeDesc {
    TypeDesc::array_of(ty)
}

fn dimension_count(file: &SourceFile, dims: NodeId) -> usize {
    file.leaves_of(dims)
        .iter()
        .filter(|l| file.text_of(**l) == "[")
        .count()
}

fn type_parameter_named(file: &SourceFile, owner: NodeId, name: &str) -> Option<NodeId> {
    let params = file.child_by_field(owner, "type_parameters")?;
    file.named_children(params)
        .filter(|p| file.kind(*p) == "type_parameter")
        .find(|p| {
            file.named_children(*p)
                .find(|c| matches!(file.kind(*c), "type_identifier" | "identifier"))
                .map(|c| file.text_of(c))
                == Some(name)
        })
}

fn type_list(file: &SourceFile, holder: NodeId) -> Vec<NodeId> {
    match file.child_of_kind(holder, "type_list") {
        Some(list) => file.named_children(list).collect(),
        None => file.named_children(holder).collect(),
    }
}

/// Direct members of a type declaration's body.
fn members(file: &SourceFile, class: NodeId) -> Vec<NodeId> {
    let Some(body) = file.child_by_field(class, "body") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for member in file.named_children(body) {
        if file.kind(member) == "enum_body_declarations" {
            out.extend(file.named_children(member));
        } else {
            out.push(member);
        }
    }
    out
}

fn parameter_count(file: &SourceFile, method: NodeId) -> Option<usize> {
    let params = file.child_by_field(method, "parameters")?;
    Some(
        file.named_children(params)
            .filter(|p| matches!(file.kind(*p), "formal_parameter" | "spread_parameter"))
            .count(),
    )
}

pub(crate) fn has_modifier(file: &SourceFile, owner: NodeId, modifier: &str) -> bool {
    file.child_of_kind(owner, "modifiers")
        .map(|m| file.leaves_of(m).iter().any(|l| file.text_of(*l) == modifier))
        .unwrap_or(false)
}

pub(crate) fn package_of(file: &SourceFile) -> Option<String> {
    let package = file.child_of_kind(file.root(), "package_declaration")?;
    let name = file
        .named_children(package)
        .find(|n| matches!(file.kind(*n), "scoped_identifier" | "identifier"))?;
    Some(
        file.text_of(name)
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect(),
    )
}

pub(crate) struct Import {
    pub path: String,
    pub on_demand: bool,
    pub is_static: bool,
}

pub(crate) fn imports_of(file: &SourceFile) -> Vec<Import> {
    file.children(file.root())
        .iter()
        .copied()
        .filter(|n| file.kind(*n) == "import_declaration")
        .filter_map(|import| {
            let name = file
                .named_children(import)
                .find(|n| matches!(file.kind(*n), "scoped_identifier" | "identifier"))?;
            Some(Import {
                path: file
                    .text_of(name)
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect(),
                on_demand: file.child_of_kind(import, "asterisk").is_some(),
                is_static: file.children(import).iter().any(|c| file.kind(*c) == "static"),
            })
        })
        .collect()
}
