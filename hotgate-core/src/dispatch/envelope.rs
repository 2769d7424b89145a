use super::{MappingError, Value};
use crate::{
    decode::FlatPayload,
    schema::{FieldDescriptor, MethodDescriptor},
};
use prost_reflect::{DynamicMessage, SetFieldError};

/// A resolved call: the method to invoke and one value per declared field.
#[derive(Debug, Clone)]
pub struct RpcEnvelope {
    method: MethodDescriptor,
    values: Vec<Value>,
}

impl RpcEnvelope {
    /// Projects a payload onto the method's fields, in declaration order.
    ///
    /// # Errors
    ///
    /// [`MappingError::InvalidValue`] when a present value does not parse as its field type.
    pub fn build(method: &MethodDescriptor, payload: &FlatPayload) -> Result<Self, MappingError> {
        let values = method
            .fields()
            .iter()
            .map(|field| match payload.get(field.name()) {
                None => Ok(Value::empty(field.field_type())),
                Some(raw) => Value::parse(field.field_type(), raw).ok_or_else(|| {
                    MappingError::InvalidValue {
                        field: field.name().to_string(),
                        expected: field.field_type(),
                        value: raw.to_string(),
                    }
                }),
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            method: method.clone(),
            values,
        })
    }

    pub fn service(&self) -> &str {
        self.method.service()
    }

    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    /// Field values, aligned with `self.method().fields()`.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Each field paired with its value.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &Value)> {
        self.method.fields().iter().zip(&self.values)
    }

    /// Encodes the values as the method's wire input message.
    pub fn to_message(&self) -> Result<DynamicMessage, SetFieldError> {
        let mut message = DynamicMessage::new(self.method.wire().input());
        for (field, value) in self.fields() {
            message.try_set_field_by_number(field.tag(), value.clone().into())?;
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Snapshot;

    #[test]
    fn encodes_values_by_tag() {
        let snapshot =
            Snapshot::load("service S { void m(3: string name, 7: i64 count) }").unwrap();
        let method = snapshot.lookup("S", "m").unwrap();
        let payload = FlatPayload::from_iter([("name", "ada"), ("count", "9")]);

        let message = RpcEnvelope::build(method, &payload)
            .unwrap()
            .to_message()
            .unwrap();

        assert_eq!(
            message.get_field_by_number(3).unwrap().as_str(),
            Some("ada")
        );
        assert_eq!(message.get_field_by_number(7).unwrap().as_i64(), Some(9));
    }
}
