//! Source structure queries.
//!
//! The heuristics never parse Java themselves. They ask a [`SourceQuery`]
//! for candidate declarations, syntax trees and static types. The crate ships
//! [`JavaSourceIndex`], a tree-sitter backed implementation; hosts with
//! their own symbol index implement the trait instead.

mod java;
mod resolve;
mod tree;
mod treesitter;
mod types;

pub use java::JavaSourceIndex;
pub use tree::{NodeId, SourceFile, SyntaxNode};
pub use treesitter::{fingerprint, JavaParser};
pub use types::{ClassType, PrimitiveType, TypeDesc, TypeParamRef};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::error::SourceError;

/// Whether a file belongs to the scanned project or to a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrigin {
    Project,
    Library,
}

/// A place a class name or file name resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    /// 1-based line of the declaration (1 for plain file hits).
    pub line: u32,
    pub class_name: Option<String>,
    pub origin: SourceOrigin,
}

impl SourceLocation {
    pub fn in_library(&self) -> bool {
        self.origin == SourceOrigin::Library
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Local,
    Parameter,
    Field,
    Method,
    Class,
}

/// What a reference resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    pub file: PathBuf,
    /// Declaring node: a declarator, parameter, method or type declaration.
    pub node: NodeId,
    /// Declared type without substitution; the return type for methods.
    pub declared_type: Option<TypeDesc>,
    pub is_final: bool,
    /// Initializer expression, in `file`.
    pub initializer: Option<NodeId>,
}

/// Read access to an indexed code base.
///
/// Lookups that need a finished index return [`SourceError::NotReady`] while
/// it is being built; everything else answers from what is indexed so far.
pub trait SourceQuery: Send + Sync {
    /// Declarations of a JVM binary class name (`com.foo.Outer$Inner`).
    fn resolve_class_candidates(&self, class_name: &str)
        -> Result<Vec<SourceLocation>, SourceError>;

    /// Files with the given name (`Outer.java`).
    fn files_by_name(&self, file_name: &str) -> Result<Vec<SourceLocation>, SourceError>;

    fn source_file(&self, path: &Path) -> Option<Arc<SourceFile>>;

    /// Static type of an expression node.
    fn type_of(&self, file: &SourceFile, expr: NodeId) -> Option<TypeDesc>;

    /// Declaration referenced by an identifier, field access or call.
    fn resolve_reference(&self, file: &SourceFile, node: NodeId) -> Option<Declaration>;

    /// Upper bounds of a type parameter; `java.lang.Object` when unbounded.
    fn type_param_bounds(&self, param: &TypeParamRef) -> Vec<TypeDesc>;

    /// Changes whenever indexed declarations change.
    fn generation(&self) -> u64;
}
