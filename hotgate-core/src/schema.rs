//! # Schema Descriptors
//!
//! This module turns a parsed IDL [`Document`](crate::idl::ast::Document) into the immutable
//! descriptors the gateway dispatches against.
//!
//! A [`Snapshot`] is the complete set of services known at one point in time. It is built
//! fully off to the side by [`Snapshot::load`] and, once handed to the
//! [`SchemaRegistry`](crate::registry::SchemaRegistry), is never modified again.
//!
//! ## Method fields
//!
//! Each method argument of a scalar type becomes one [`FieldDescriptor`]. An argument whose
//! type names a struct is expanded into that struct's fields, in declaration order, so
//! `void methodA(1: Request req)` carries the fields of `Request`.
//!
//! Results follow the same idea: a struct return type yields that struct's fields, while
//! `void` and scalar return types yield a single field named [`DEFAULT_RESULT_FIELD`].
//!
//! ## Wire descriptors
//!
//! Every snapshot also owns a `prost_reflect::DescriptorPool` mirroring its services, so that
//! payloads can be encoded generically. See the `wire` submodule for the mapping.
mod wire;

use crate::{
    dispatch::RoutingError,
    idl::{
        self, ParseError,
        ast::{BaseType, Document, FieldDef, FunctionDef, StructDef, TypeRef},
    },
};
use prost_reflect::{DescriptorError, DescriptorPool};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
};

/// Name of the single result field produced by `void` and scalar return types.
pub const DEFAULT_RESULT_FIELD: &str = "message";

/// Failures while turning IDL text into a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to parse IDL: {0}")]
    Parse(#[from] ParseError),
    #[error("Invalid IDL: {0}")]
    Validation(#[from] ValidationError),
    #[error("Failed to read IDL document '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A document that parses but does not describe a consistent set of services.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("service '{0}' is declared more than once")]
    DuplicateService(String),
    #[error("struct '{0}' is declared more than once")]
    DuplicateStruct(String),
    #[error("'{0}' is declared both as a service and as a struct")]
    NameCollision(String),
    #[error("method '{method}' is declared more than once in service '{service}'")]
    DuplicateMethod { service: String, method: String },
    #[error("{location}: tag {tag} is used more than once")]
    DuplicateTag { location: String, tag: u32 },
    #[error("{location}: field '{field}' is declared more than once")]
    DuplicateField { location: String, field: String },
    #[error("{location}: tag {tag} is out of range, expected 1..=32767")]
    InvalidTag { location: String, tag: i64 },
    #[error("{location}: tag {tag} falls in the reserved range 19000..=19999")]
    ReservedTag { location: String, tag: u32 },
    #[error("service name '{0}' is reserved")]
    ReservedName(String),
    #[error("{location}: unknown type '{name}'")]
    UnknownType { location: String, name: String },
    #[error("{location}: field '{field}' has struct type '{name}', nested structs are not supported")]
    NestedStruct {
        location: String,
        field: String,
        name: String,
    },
    #[error("Invalid wire descriptor: {0}")]
    Wire(#[from] DescriptorError),
    #[error("Wire descriptor for '{0}' is missing")]
    MissingWire(String),
}

/// The scalar types a field can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Bool,
    I8,
    I16,
    I32,
    I64,
    Double,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::I8 => "byte",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Double => "double",
        };
        f.write_str(name)
    }
}

impl From<BaseType> for FieldType {
    fn from(value: BaseType) -> Self {
        match value {
            BaseType::String => Self::String,
            BaseType::Bool => Self::Bool,
            BaseType::I8 => Self::I8,
            BaseType::I16 => Self::I16,
            BaseType::I32 => Self::I32,
            BaseType::I64 => Self::I64,
            BaseType::Double => Self::Double,
        }
    }
}

/// A named, tagged field of a method request or result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    tag: u32,
    ty: FieldType,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, tag: u32, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            tag,
            ty,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> u32 {
        self.tag
    }

    pub fn field_type(&self) -> FieldType {
        self.ty
    }
}

/// A method of a service, with its fields in declaration order.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    service: String,
    name: String,
    fields: Vec<FieldDescriptor>,
    results: Vec<FieldDescriptor>,
    wire: prost_reflect::MethodDescriptor,
}

impl MethodDescriptor {
    /// Name of the service declaring this method.
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request fields, in the order they were declared.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Result fields, in the order they were declared.
    pub fn results(&self) -> &[FieldDescriptor] {
        &self.results
    }

    /// The protobuf view of this method, from the same snapshot.
    pub fn wire(&self) -> &prost_reflect::MethodDescriptor {
        &self.wire
    }
}

/// A named service and its methods.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    name: String,
    methods: BTreeMap<String, MethodDescriptor>,
}

impl ServiceDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.get(name)
    }
}

/// The complete, immutable set of descriptors built from one IDL document.
#[derive(Debug, Clone)]
pub struct Snapshot {
    generation: u64,
    services: BTreeMap<String, ServiceDescriptor>,
    pool: DescriptorPool,
}

impl Snapshot {
    /// Parses and validates an IDL document.
    ///
    /// The returned snapshot has generation `0`; the registry assigns the real generation
    /// when it publishes the snapshot.
    ///
    /// # Errors
    ///
    /// * [`SchemaError::Parse`] on grammar violations.
    /// * [`SchemaError::Validation`] when names or tags clash, a type is unknown, or the wire
    ///   descriptors cannot be built.
    pub fn load(source: &str) -> Result<Self, SchemaError> {
        let document = idl::parse(source)?;
        Ok(build(&document)?)
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Sequence number of this snapshot, starting at 1 for the first published one.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolves a method by service and method name.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnknownService`] when no service of that name exists, and
    /// [`RoutingError::UnknownMethod`] when the service exists but the method does not.
    pub fn lookup(&self, service: &str, method: &str) -> Result<&MethodDescriptor, RoutingError> {
        self.services
            .get(service)
            .ok_or_else(|| RoutingError::UnknownService(service.to_string()))?
            .method(method)
            .ok_or_else(|| RoutingError::UnknownMethod {
                service: service.to_string(),
                method: method.to_string(),
            })
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.services.values()
    }

    /// The protobuf descriptors backing this snapshot.
    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }
}

/// Descriptors of one service before the wire pool exists.
struct ServiceDraft {
    name: String,
    methods: Vec<MethodDraft>,
}

struct MethodDraft {
    name: String,
    fields: Vec<FieldDescriptor>,
    results: Vec<FieldDescriptor>,
}

fn build(document: &Document) -> Result<Snapshot, ValidationError> {
    let structs = index_structs(&document.structs)?;

    let mut drafts = Vec::with_capacity(document.services.len());
    let mut seen = HashSet::new();
    for service in &document.services {
        let name = &service.name.name;
        if !seen.insert(name.as_str()) {
            return Err(ValidationError::DuplicateService(name.clone()));
        }
        if structs.contains_key(name.as_str()) {
            return Err(ValidationError::NameCollision(name.clone()));
        }
        if name == wire::WIRE_PACKAGE {
            return Err(ValidationError::ReservedName(name.clone()));
        }

        let mut methods = Vec::with_capacity(service.functions.len());
        let mut method_names = HashSet::new();
        for function in &service.functions {
            if !method_names.insert(function.name.name.as_str()) {
                return Err(ValidationError::DuplicateMethod {
                    service: name.clone(),
                    method: function.name.name.clone(),
                });
            }
            methods.push(method_draft(name, function, &structs)?);
        }

        drafts.push(ServiceDraft {
            name: name.clone(),
            methods,
        });
    }

    let pool = wire::build_pool(&drafts)?;

    let mut services = BTreeMap::new();
    for draft in drafts {
        let wire_service = pool
            .get_service_by_name(&draft.name)
            .ok_or_else(|| ValidationError::MissingWire(draft.name.clone()))?;

        let mut methods = BTreeMap::new();
        for method in draft.methods {
            let wire = wire_service
                .methods()
                .find(|m| m.name() == method.name)
                .ok_or_else(|| ValidationError::MissingWire(format!("{}.{}", draft.name, method.name)))?;

            methods.insert(
                method.name.clone(),
                MethodDescriptor {
                    service: draft.name.clone(),
                    name: method.name,
                    fields: method.fields,
                    results: method.results,
                    wire,
                },
            );
        }

        services.insert(
            draft.name.clone(),
            ServiceDescriptor {
                name: draft.name,
                methods,
            },
        );
    }

    Ok(Snapshot {
        generation: 0,
        services,
        pool,
    })
}

/// Indexes structs by name and checks that each only holds scalar fields.
fn index_structs(defs: &[StructDef]) -> Result<HashMap<&str, Vec<FieldDescriptor>>, ValidationError> {
    let mut structs = HashMap::with_capacity(defs.len());
    for def in defs {
        let location = format!("struct {}", def.name.name);
        let mut fields = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            let ty = match &field.ty {
                TypeRef::Base(base) => FieldType::from(*base),
                TypeRef::Named(ident) => {
                    return Err(ValidationError::NestedStruct {
                        location,
                        field: field.name.name.clone(),
                        name: ident.name.clone(),
                    });
                }
                // The parser never produces void fields.
                TypeRef::Void => continue,
            };
            fields.push(FieldDescriptor::new(
                field.name.name.clone(),
                checked_tag(field.tag, &location)?,
                ty,
            ));
        }
        check_unique(&fields, &location)?;

        if structs.insert(def.name.name.as_str(), fields).is_some() {
            return Err(ValidationError::DuplicateStruct(def.name.name.clone()));
        }
    }
    Ok(structs)
}

fn method_draft(
    service: &str,
    function: &FunctionDef,
    structs: &HashMap<&str, Vec<FieldDescriptor>>,
) -> Result<MethodDraft, ValidationError> {
    let location = format!("{service}.{}", function.name.name);

    let mut fields = Vec::new();
    for arg in &function.args {
        fields.extend(expand(arg, structs, &location)?);
    }
    check_unique(&fields, &location)?;

    let results = match &function.returns {
        TypeRef::Void => vec![FieldDescriptor::new(
            DEFAULT_RESULT_FIELD,
            1,
            FieldType::String,
        )],
        TypeRef::Base(base) => vec![FieldDescriptor::new(
            DEFAULT_RESULT_FIELD,
            1,
            FieldType::from(*base),
        )],
        TypeRef::Named(ident) => structs
            .get(ident.name.as_str())
            .cloned()
            .ok_or_else(|| ValidationError::UnknownType {
                location: location.clone(),
                name: ident.name.clone(),
            })?,
    };

    Ok(MethodDraft {
        name: function.name.name.clone(),
        fields,
        results,
    })
}

/// A scalar argument becomes one field; a struct argument becomes all of its fields.
fn expand(
    arg: &FieldDef,
    structs: &HashMap<&str, Vec<FieldDescriptor>>,
    location: &str,
) -> Result<Vec<FieldDescriptor>, ValidationError> {
    match &arg.ty {
        TypeRef::Base(base) => Ok(vec![FieldDescriptor::new(
            arg.name.name.clone(),
            checked_tag(arg.tag, location)?,
            FieldType::from(*base),
        )]),
        TypeRef::Named(ident) => {
            checked_tag(arg.tag, location)?;
            structs
                .get(ident.name.as_str())
                .cloned()
                .ok_or_else(|| ValidationError::UnknownType {
                    location: location.to_string(),
                    name: ident.name.clone(),
                })
        }
        TypeRef::Void => Ok(Vec::new()),
    }
}

fn checked_tag(tag: i64, location: &str) -> Result<u32, ValidationError> {
    match u32::try_from(tag) {
        Ok(tag) if wire::RESERVED_TAGS.contains(&tag) => Err(ValidationError::ReservedTag {
            location: location.to_string(),
            tag,
        }),
        Ok(tag @ 1..=32767) => Ok(tag),
        _ => Err(ValidationError::InvalidTag {
            location: location.to_string(),
            tag,
        }),
    }
}

fn check_unique(fields: &[FieldDescriptor], location: &str) -> Result<(), ValidationError> {
    let mut tags = HashSet::new();
    let mut names = HashSet::new();
    for field in fields {
        if !tags.insert(field.tag) {
            return Err(ValidationError::DuplicateTag {
                location: location.to_string(),
                tag: field.tag,
            });
        }
        if !names.insert(field.name.as_str()) {
            return Err(ValidationError::DuplicateField {
                location: location.to_string(),
                field: field.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
        struct Request {
            1: string userId
            2: string message
        }

        struct Response {
            1: string message
        }

        service ServiceA {
            Response methodA(1: Request req)
            void methodB(1: string name, 2: i32 count)
        }

        service ServiceB {
            i64 methodA(1: Request req)
        }
    "#;

    fn names(fields: &[FieldDescriptor]) -> Vec<&str> {
        fields.iter().map(FieldDescriptor::name).collect()
    }

    #[test]
    fn struct_arguments_expand_in_declaration_order() {
        let snapshot = Snapshot::load(DOC).unwrap();
        let method = snapshot.lookup("ServiceA", "methodA").unwrap();

        assert_eq!(method.service(), "ServiceA");
        assert_eq!(names(method.fields()), ["userId", "message"]);
        assert_eq!(method.fields()[1].tag(), 2);
        assert_eq!(names(method.results()), ["message"]);
    }

    #[test]
    fn scalar_arguments_map_one_to_one() {
        let snapshot = Snapshot::load(DOC).unwrap();
        let method = snapshot.lookup("ServiceA", "methodB").unwrap();

        assert_eq!(
            method.fields(),
            [
                FieldDescriptor::new("name", 1, FieldType::String),
                FieldDescriptor::new("count", 2, FieldType::I32),
            ]
        );
        assert_eq!(
            method.results(),
            [FieldDescriptor::new(DEFAULT_RESULT_FIELD, 1, FieldType::String)]
        );
    }

    #[test]
    fn scalar_return_types_keep_their_type() {
        let snapshot = Snapshot::load(DOC).unwrap();
        let method = snapshot.lookup("ServiceB", "methodA").unwrap();
        assert_eq!(method.results()[0].field_type(), FieldType::I64);
    }

    #[test]
    fn wire_descriptors_mirror_the_fields() {
        let snapshot = Snapshot::load(DOC).unwrap();
        let method = snapshot.lookup("ServiceA", "methodA").unwrap();

        let wire = method.wire();
        assert_eq!(wire.parent_service().name(), "ServiceA");
        assert_eq!(wire.name(), "methodA");
        assert_eq!(wire.input().full_name(), "hotgate.ServiceA.methodA_args");
        assert_eq!(wire.output().full_name(), "hotgate.ServiceA.methodA_result");

        let input: Vec<_> = wire.input().fields().map(|f| (f.name().to_string(), f.number())).collect();
        assert_eq!(input, [("userId".to_string(), 1), ("message".to_string(), 2)]);
    }

    #[test]
    fn lookup_distinguishes_service_and_method() {
        let snapshot = Snapshot::load(DOC).unwrap();

        assert!(matches!(
            snapshot.lookup("ServiceC", "methodA"),
            Err(RoutingError::UnknownService(s)) if s == "ServiceC"
        ));
        assert!(matches!(
            snapshot.lookup("ServiceA", "methodZ"),
            Err(RoutingError::UnknownMethod { method, .. }) if method == "methodZ"
        ));
    }

    #[test]
    fn rejects_duplicate_methods() {
        let err = Snapshot::load("service S { void m() void m() }").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::Validation(ValidationError::DuplicateMethod { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_tags() {
        let err = Snapshot::load("service S { void m(1: string a, 1: string b) }").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::Validation(ValidationError::DuplicateTag { tag: 1, .. })
        ));
    }

    #[test]
    fn rejects_duplicate_tags_after_expansion() {
        let source = "struct R { 1: string a } service S { void m(1: R r, 1: string b) }";
        let err = Snapshot::load(source).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::Validation(ValidationError::DuplicateTag { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_services() {
        let err = Snapshot::load("service S { } service S { }").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::Validation(ValidationError::DuplicateService(name)) if name == "S"
        ));
    }

    #[test]
    fn rejects_service_struct_collisions() {
        let err = Snapshot::load("struct S { } service S { }").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::Validation(ValidationError::NameCollision(_))
        ));
    }

    #[test]
    fn rejects_unknown_types() {
        let err = Snapshot::load("service S { void m(1: Missing r) }").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid IDL: S.m: unknown type 'Missing'"
        );
    }

    #[test]
    fn rejects_out_of_range_tags() {
        for tag in ["0", "-1", "40000"] {
            let source = format!("service S {{ void m({tag}: string a) }}");
            let err = Snapshot::load(&source).unwrap_err();
            assert!(
                matches!(err, SchemaError::Validation(ValidationError::InvalidTag { .. })),
                "tag {tag} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_tags_reserved_by_protobuf() {
        let err = Snapshot::load("service S { void m(19000: string a) }").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid IDL: S.m: tag 19000 falls in the reserved range 19000..=19999"
        );
        assert!(Snapshot::load("service S { void m(18999: string a, 20000: string b) }").is_ok());
    }

    #[test]
    fn rejects_the_wire_package_as_service_name() {
        let err = Snapshot::load("service hotgate { void m() }").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::Validation(ValidationError::ReservedName(name)) if name == "hotgate"
        ));
    }

    #[test]
    fn field_names_differing_only_in_case_style_coexist() {
        let snapshot =
            Snapshot::load("service S { void m(1: string user_id, 2: string userId) }").unwrap();
        let input = snapshot.lookup("S", "m").unwrap().wire().input();

        let json: Vec<_> = input.fields().map(|f| f.json_name().to_string()).collect();
        assert_eq!(json, ["user_id", "userId"]);
    }

    #[test]
    fn generated_message_names_never_collide() {
        for source in [
            "service A_b { void c() } service A { void b_c() }",
            "service S { void m() } service S_m_args { void x() }",
            "service S { void m_args() void m() }",
        ] {
            let snapshot = Snapshot::load(source);
            assert!(snapshot.is_ok(), "{source}: {:?}", snapshot.err());
        }
    }

    #[test]
    fn rejects_nested_structs() {
        let source = "struct A { 1: string x } struct B { 1: A a }";
        let err = Snapshot::load(source).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::Validation(ValidationError::NestedStruct { .. })
        ));
    }

    #[test]
    fn surfaces_parse_errors() {
        let err = Snapshot::load("service S {").unwrap_err();
        assert!(matches!(err, SchemaError::Parse(_)));
    }
}
