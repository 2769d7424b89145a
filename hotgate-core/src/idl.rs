//! # IDL Parser
//!
//! This module turns the text of an interface definition document into an [`ast::Document`].
//! The accepted language is the subset of Thrift needed to describe RPC services whose
//! methods take and return scalar fields:
//!
//! ```text
//! document   = header* definition*
//! header     = "namespace" scope ident | "include" literal
//! definition = struct | service
//! struct     = "struct" ident "{" field* "}"
//! service    = "service" ident "{" function* "}"
//! function   = "oneway"? type ident "(" field* ")" throws? sep?
//! throws     = "throws" "(" field* ")"
//! field      = int ":" ("required" | "optional")? type ident sep?
//! type       = "void" | "string" | "bool" | "byte" | "i8" | "i16" | "i32"
//!            | "i64" | "double" | ident
//! sep        = "," | ";"
//! ```
//!
//! Comments (`//`, `#` and `/* */`) are skipped. `include` is rejected: the gateway only
//! loads self-contained documents. `namespace` headers are accepted and ignored.
//!
//! The parser only checks the grammar. Semantic checks (duplicate names, unknown types,
//! tag ranges) happen when the document is turned into descriptors, see [`crate::schema`].
pub mod ast;
mod lexer;
mod parser;

use std::fmt;

pub use parser::parse;

/// A line/column position inside an IDL document, both starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A grammar violation found while reading an IDL document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {position}: {message}")]
pub struct ParseError {
    /// Human-readable description of the violation.
    pub message: String,
    /// Where in the document the violation was found.
    pub position: Position,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}
