//! Protobuf mirror of a snapshot.
//!
//! Each IDL service `S` becomes a protobuf service `S` in a package-less file, so gRPC paths
//! read `/S/m`. Request and response messages live in a second file under the
//! [`WIRE_PACKAGE`] package, nested in one container message per service:
//! `rpc m(hotgate.S.m_args) returns (hotgate.S.m_result)`. Service names are unique and method
//! names are unique within a service, so these names never collide.
//!
//! Every field keeps its name (also used as JSON name), its tag as field number, and the
//! closest protobuf scalar type. Both files are `proto2` with optional fields.
use super::{FieldDescriptor, FieldType, ServiceDraft};
use prost_reflect::{DescriptorError, DescriptorPool};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MethodDescriptorProto, ServiceDescriptorProto,
    field_descriptor_proto::{Label, Type},
};
use std::ops::RangeInclusive;

/// Package of the generated messages. No service may share its name.
pub(super) const WIRE_PACKAGE: &str = "hotgate";

/// Field numbers protobuf keeps for its own implementation.
pub(super) const RESERVED_TAGS: RangeInclusive<u32> = 19000..=19999;

const SERVICES_FILE: &str = "hotgate/idl.proto";
const MESSAGES_FILE: &str = "hotgate/messages.proto";
const SYNTAX: &str = "proto2";

pub(super) fn build_pool(services: &[ServiceDraft]) -> Result<DescriptorPool, DescriptorError> {
    let mut containers = Vec::with_capacity(services.len());
    let mut protos = Vec::with_capacity(services.len());

    for service in services {
        let mut nested = Vec::with_capacity(service.methods.len() * 2);
        let mut methods = Vec::with_capacity(service.methods.len());
        for method in &service.methods {
            let args = format!("{}_args", method.name);
            let result = format!("{}_result", method.name);

            methods.push(MethodDescriptorProto {
                name: Some(method.name.clone()),
                input_type: Some(format!(".{WIRE_PACKAGE}.{}.{args}", service.name)),
                output_type: Some(format!(".{WIRE_PACKAGE}.{}.{result}", service.name)),
                ..Default::default()
            });

            nested.push(message(args, &method.fields));
            nested.push(message(result, &method.results));
        }

        containers.push(DescriptorProto {
            name: Some(service.name.clone()),
            nested_type: nested,
            ..Default::default()
        });
        protos.push(ServiceDescriptorProto {
            name: Some(service.name.clone()),
            method: methods,
            ..Default::default()
        });
    }

    let messages = FileDescriptorProto {
        name: Some(MESSAGES_FILE.to_string()),
        package: Some(WIRE_PACKAGE.to_string()),
        syntax: Some(SYNTAX.to_string()),
        message_type: containers,
        ..Default::default()
    };
    let services = FileDescriptorProto {
        name: Some(SERVICES_FILE.to_string()),
        syntax: Some(SYNTAX.to_string()),
        dependency: vec![MESSAGES_FILE.to_string()],
        service: protos,
        ..Default::default()
    };

    DescriptorPool::from_file_descriptor_set(FileDescriptorSet {
        file: vec![messages, services],
    })
}

fn message(name: String, fields: &[FieldDescriptor]) -> DescriptorProto {
    DescriptorProto {
        name: Some(name),
        field: fields.iter().map(field).collect(),
        ..Default::default()
    }
}

fn field(field: &FieldDescriptor) -> FieldDescriptorProto {
    let ty = match field.ty {
        FieldType::String => Type::String,
        FieldType::Bool => Type::Bool,
        FieldType::I8 | FieldType::I16 | FieldType::I32 => Type::Int32,
        FieldType::I64 => Type::Int64,
        FieldType::Double => Type::Double,
    };

    FieldDescriptorProto {
        name: Some(field.name.clone()),
        number: i32::try_from(field.tag).ok(),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        json_name: Some(field.name.clone()),
        ..Default::default()
    }
}
