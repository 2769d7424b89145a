use crate::schema::FieldType;

/// A field value, interpreted against the type its descriptor declares.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Bool(bool),
    /// Also carries `byte` and `i16` fields, range-checked on parse.
    I32(i32),
    I64(i64),
    Double(f64),
}

impl Value {
    /// The value an absent field takes.
    pub fn empty(ty: FieldType) -> Self {
        match ty {
            FieldType::String => Self::String(String::new()),
            FieldType::Bool => Self::Bool(false),
            FieldType::I8 | FieldType::I16 | FieldType::I32 => Self::I32(0),
            FieldType::I64 => Self::I64(0),
            FieldType::Double => Self::Double(0.0),
        }
    }

    /// Interprets a payload string as a value of `ty`.
    ///
    /// Returns `None` when the text is not a valid literal for that type.
    pub fn parse(ty: FieldType, raw: &str) -> Option<Self> {
        let value = match ty {
            FieldType::String => Self::String(raw.to_string()),
            FieldType::Bool => Self::Bool(raw.parse().ok()?),
            FieldType::I8 => Self::I32(raw.parse::<i8>().ok()?.into()),
            FieldType::I16 => Self::I32(raw.parse::<i16>().ok()?.into()),
            FieldType::I32 => Self::I32(raw.parse().ok()?),
            FieldType::I64 => Self::I64(raw.parse().ok()?),
            FieldType::Double => Self::Double(raw.parse().ok()?),
        };
        Some(value)
    }
}

impl From<Value> for prost_reflect::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::String(s),
            Value::Bool(b) => Self::Bool(b),
            Value::I32(n) => Self::I32(n),
            Value::I64(n) => Self::I64(n),
            Value::Double(n) => Self::F64(n),
        }
    }
}
