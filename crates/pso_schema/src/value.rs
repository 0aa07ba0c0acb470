//! Runtime values of structure members.

use std::ptr;

use derive_more::Display;

use crate::error::{Error, Result};
use crate::schema::{FieldKind, StructSchema};

/// A 32-bit offset of another structure inside a container. `0` is NULL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("{_0:#x}")]
pub struct Ptr32(pub u32);

impl Ptr32 {
    /// The NULL pointer
    pub const NULL: Ptr32 = Ptr32(0);

    /// Pointer to an offset of the container
    pub fn new(offset: usize) -> Result<Self> {
        u32::try_from(offset)
            .map(Ptr32)
            .map_err(|_| Error::OffsetOverflow(offset))
    }

    /// Offset the pointer designates
    pub fn offset(self) -> usize {
        self.0 as usize
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Ptr32 {
    fn from(value: u32) -> Self {
        Ptr32(value)
    }
}

/// Value of a single structure member
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    I8(i8),
    I16(i16),
    I32(i32),
    F32(f32),
    /// Loosely typed integer, range checked against the declared type when packed
    Int(i64),
    Bytes(Vec<u8>),
    Struct(Record),
    List(Vec<Value>),
    Ptr(Ptr32),
}

impl Value {
    /// Zero value of a field kind
    pub fn default_for(kind: &FieldKind) -> Value {
        match kind {
            FieldKind::U8 => Value::U8(0),
            FieldKind::U16 => Value::U16(0),
            FieldKind::U32 => Value::U32(0),
            FieldKind::I8 => Value::I8(0),
            FieldKind::I16 => Value::I16(0),
            FieldKind::I32 => Value::I32(0),
            FieldKind::F32 => Value::F32(0.0),
            FieldKind::Bytes(length) => Value::Bytes(vec![0; *length]),
            FieldKind::Struct(schema) => Value::Struct(Record::new(schema)),
            FieldKind::List { .. } => Value::List(Vec::new()),
            FieldKind::Ptr32 => Value::Ptr(Ptr32::NULL),
        }
    }

    /// Integer contents of the value, regardless of its width
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::U8(v) => Some((*v).into()),
            Value::U16(v) => Some((*v).into()),
            Value::U32(v) => Some((*v).into()),
            Value::I8(v) => Some((*v).into()),
            Value::I16(v) => Some((*v).into()),
            Value::I32(v) => Some((*v).into()),
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_ptr(&self) -> Option<Ptr32> {
        match self {
            Value::Ptr(ptr) => Some(*ptr),
            _ => None,
        }
    }
}

/// Field values of one structure instance, in the declaration order of its schema
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: &'static StructSchema,
    values: Vec<Value>,
}

impl Record {
    /// Instance with every member set to its zero value
    pub fn new(schema: &'static StructSchema) -> Self {
        Record {
            schema,
            values: schema
                .fields()
                .iter()
                .map(|f| Value::default_for(&f.kind))
                .collect(),
        }
    }

    /// Instance built from values given in declaration order.
    ///
    /// The number of values is checked when the record is serialized.
    pub fn from_values(schema: &'static StructSchema, values: Vec<Value>) -> Self {
        Record { schema, values }
    }

    pub fn schema(&self) -> &'static StructSchema {
        self.schema
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Whether the record was built for the given schema
    pub fn is_a(&self, schema: &StructSchema) -> bool {
        ptr::eq(self.schema, schema) || self.schema == schema
    }

    /// Value of the named member
    pub fn get(&self, field: &str) -> Result<&Value> {
        let index = self.index_of(field)?;
        self.values
            .get(index)
            .ok_or_else(|| self.unknown_field(field))
    }

    /// Replace the value of the named member
    pub fn set(&mut self, field: &str, value: Value) -> Result<()> {
        let index = self.index_of(field)?;
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(self.unknown_field(field)),
        }
    }

    /// Builder flavour of [`Record::set`]
    pub fn with(mut self, field: &str, value: Value) -> Result<Self> {
        self.set(field, value)?;
        Ok(self)
    }

    pub(crate) fn values_mut(&mut self) -> &mut [Value] {
        &mut self.values
    }

    fn index_of(&self, field: &str) -> Result<usize> {
        self.schema
            .index_of(field)
            .ok_or_else(|| self.unknown_field(field))
    }

    fn unknown_field(&self, field: &str) -> Error {
        Error::UnknownField {
            schema: self.schema.name().to_string(),
            field: field.to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::error::{Error, Result};
    use crate::schema::{FieldKind, StructSchema};
    use crate::value::{Ptr32, Record, Value};

    #[test]
    fn new_record_is_zeroed() -> Result<()> {
        let schema = StructSchema::new("Header")
            .field("magic", FieldKind::Bytes(4))
            .field("count", FieldKind::U16)
            .field("next", FieldKind::Ptr32)
            .leak();

        let record = Record::new(schema);
        assert_eq!(record.get("magic")?, &Value::Bytes(vec![0; 4]));
        assert_eq!(record.get("count")?, &Value::U16(0));
        assert_eq!(record.get("next")?.as_ptr(), Some(Ptr32::NULL));

        Ok(())
    }

    #[test]
    fn set_unknown_field() {
        let schema = StructSchema::new("Empty").leak();
        let mut record = Record::new(schema);

        assert!(matches!(
            record.set("missing", Value::U8(1)),
            Err(Error::UnknownField { .. })
        ));
    }

    #[test]
    fn ptr_from_offset() -> Result<()> {
        assert_eq!(Ptr32::new(0x40)?, Ptr32(0x40));
        assert!(Ptr32::NULL.is_null());
        assert_eq!(Ptr32(0x1C).to_string(), "0x1c");
        assert!(matches!(
            Ptr32::new(usize::MAX),
            Err(Error::OffsetOverflow(_))
        ));

        Ok(())
    }
}
