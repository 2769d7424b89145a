//! Syntax tree produced by [`super::parse`].
use super::Position;

/// A whole IDL document, definitions kept in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub structs: Vec<StructDef>,
    pub services: Vec<ServiceDef>,
}

/// A name together with where it was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub position: Position,
}

/// `struct Name { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: Ident,
    pub fields: Vec<FieldDef>,
}

/// `service Name { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDef {
    pub name: Ident,
    pub functions: Vec<FunctionDef>,
}

/// A method declaration inside a service block.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Ident,
    pub oneway: bool,
    pub returns: TypeRef,
    pub args: Vec<FieldDef>,
    pub throws: Vec<FieldDef>,
}

/// `tag: [required|optional] type name`
///
/// The tag is kept as written; range checks happen during validation.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub tag: i64,
    pub ty: TypeRef,
    pub name: Ident,
}

/// A type as written in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Void,
    Base(BaseType),
    /// A reference to a user-defined type, resolved during validation.
    Named(Ident),
}

/// The built-in scalar types the gateway knows how to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    String,
    Bool,
    I8,
    I16,
    I32,
    I64,
    Double,
}

impl BaseType {
    pub(crate) fn from_keyword(word: &str) -> Option<Self> {
        let ty = match word {
            "string" => Self::String,
            "bool" => Self::Bool,
            "byte" | "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "double" => Self::Double,
            _ => return None,
        };
        Some(ty)
    }
}
