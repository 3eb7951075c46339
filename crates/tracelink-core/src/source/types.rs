//! Static types as seen by the heuristics.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use super::tree::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 8] = [
        PrimitiveType::Boolean,
        PrimitiveType::Byte,
        PrimitiveType::Char,
        PrimitiveType::Short,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.keyword() == keyword)
    }

    /// Primitive for a JVM descriptor character (`I`, `J`, `Z`, ...).
    pub fn from_descriptor(descriptor: char) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.descriptor() == descriptor)
    }

    /// Primitive whose wrapper has the given qualified or simple name.
    pub fn from_boxed_name(name: &str) -> Option<Self> {
        let simple = name.strip_prefix("java.lang.").unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|p| p.boxed_name().strip_prefix("java.lang.") == Some(simple))
    }

    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Char => "char",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    pub fn boxed_name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "java.lang.Boolean",
            PrimitiveType::Byte => "java.lang.Byte",
            PrimitiveType::Char => "java.lang.Character",
            PrimitiveType::Short => "java.lang.Short",
            PrimitiveType::Int => "java.lang.Integer",
            PrimitiveType::Long => "java.lang.Long",
            PrimitiveType::Float => "java.lang.Float",
            PrimitiveType::Double => "java.lang.Double",
        }
    }

    pub fn descriptor(self) -> char {
        match self {
            PrimitiveType::Boolean => 'Z',
            PrimitiveType::Byte => 'B',
            PrimitiveType::Char => 'C',
            PrimitiveType::Short => 'S',
            PrimitiveType::Int => 'I',
            PrimitiveType::Long => 'J',
            PrimitiveType::Float => 'F',
            PrimitiveType::Double => 'D',
        }
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveType::Byte
                | PrimitiveType::Char
                | PrimitiveType::Short
                | PrimitiveType::Int
                | PrimitiveType::Long
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }

    /// Result of binary numeric promotion.
    pub fn promote(self, other: PrimitiveType) -> PrimitiveType {
        use PrimitiveType::*;
        if self == Double || other == Double {
            Double
        } else if self == Float || other == Float {
            Float
        } else if self == Long || other == Long {
            Long
        } else {
            Int
        }
    }
}

/// A type parameter declaration (`T` in `class Box<T>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TypeParamRef {
    pub file: PathBuf,
    /// The `type_parameter` node.
    pub node: NodeId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassType {
    /// Qualified name with `.` separators when resolved, the source text otherwise.
    pub name: String,
    pub resolved: bool,
    pub args: Vec<TypeDesc>,
}

impl ClassType {
    pub fn resolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolved: true,
            args: Vec::new(),
        }
    }

    pub fn simple_name(&self) -> &str {
        let name = self.name.as_str();
        match name.rfind(['.', '$']) {
            Some(idx) => &name[idx + 1..],
            None => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypeDesc {
    Primitive { primitive: PrimitiveType },
    Class(ClassType),
    TypeParam(TypeParamRef),
    Array { element: Box<TypeDesc> },
    Intersection { bounds: Vec<TypeDesc> },
    Null,
}

impl TypeDesc {
    pub fn primitive(primitive: PrimitiveType) -> Self {
        TypeDesc::Primitive { primitive }
    }

    pub fn class(name: impl Into<String>) -> Self {
        TypeDesc::Class(ClassType::resolved(name))
    }

    pub fn string() -> Self {
        Self::class("java.lang.String")
    }

    pub fn array_of(element: TypeDesc) -> Self {
        TypeDesc::Array {
            element: Box::new(element),
        }
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            TypeDesc::Primitive { primitive } => Some(*primitive),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.as_primitive().is_some()
    }

    /// Primitive this type unboxes to, for the `java.lang` wrappers.
    pub fn unboxed(&self) -> Option<PrimitiveType> {
        match self {
            TypeDesc::Class(class) => PrimitiveType::from_boxed_name(&class.name),
            _ => None,
        }
    }

    /// Primitive value in numeric or boolean context, unboxing wrappers.
    pub fn numeric(&self) -> Option<PrimitiveType> {
        self.as_primitive().or_else(|| self.unboxed())
    }

    pub fn array_element(&self) -> Option<&TypeDesc> {
        match self {
            TypeDesc::Array { element } => Some(element),
            _ => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, TypeDesc::Class(class) if class.name == "java.lang.String" || (!class.resolved && class.name == "String"))
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Primitive { primitive } => f.write_str(primitive.keyword()),
            TypeDesc::Class(class) => {
                f.write_str(&class.name)?;
                if !class.args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in class.args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeDesc::TypeParam(param) => f.write_str(&param.name),
            TypeDesc::Array { element } => write!(f, "{element}[]"),
            TypeDesc::Intersection { bounds } => {
                for (i, bound) in bounds.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" & ")?;
                    }
                    write!(f, "{bound}")?;
                }
                Ok(())
            }
            TypeDesc::Null => f.write_str("null"),
        }
    }
}
