//! Statically typed structures on top of the schema engine.
//!
//! Structures are declared with [`serializable!`](crate::serializable), which builds the field
//! table once and converts between the Rust struct and a [`Record`].
//!
//! ```
//! use pso_schema::{serializable, Buffer, Ptr32, Serializable};
//! use binrw::Endian;
//!
//! serializable! {
//!     #[derive(Debug, Clone, Default, PartialEq)]
//!     pub struct Chain {
//!         pub id: u32,
//!         pub next: Ptr32,
//!         pub weights: Vec<u16> [count = weight_count],
//!         pub weight_count: u16,
//!     }
//! }
//!
//! let chain = Chain { id: 7, next: Ptr32::NULL, weights: vec![1, 2], weight_count: 2 };
//!
//! let mut buf = Buffer::new(Endian::Little);
//! let offset = chain.serialize_into(&mut buf, Some(4))?;
//! assert_eq!(Chain::type_size(), 10);
//! assert_eq!(buf.len(), 16);
//!
//! let (read, _) = Chain::deserialize_from(&buf, offset)?;
//! assert_eq!(read, chain);
//! # Ok::<(), pso_schema::error::Error>(())
//! ```

use crate::buffer::Buffer;
use crate::engine;
use crate::error::{Error, Result};
use crate::schema::{FieldKind, ListLength, StructSchema};
use crate::value::{Ptr32, Record, Value};

/// A Rust type with a fixed on-disk layout
pub trait Serializable: Sized {
    /// Field table, in on-disk order
    fn schema() -> &'static StructSchema;

    fn to_record(&self) -> Record;

    fn from_record(record: &Record) -> Result<Self>;

    /// Size of the fixed portion of the structure
    fn type_size() -> usize {
        Self::schema().type_size()
    }

    /// See [`engine::serialize`]
    fn serialize_into(&self, buf: &mut Buffer, alignment: Option<usize>) -> Result<usize> {
        engine::serialize(&self.to_record(), buf, alignment)
    }

    /// See [`engine::nonnull_pointer_offsets`]
    fn nonnull_pointer_offsets(&self) -> Result<Vec<usize>> {
        engine::nonnull_pointer_offsets(&self.to_record())
    }

    /// See [`engine::instance_size`]
    fn instance_size(&self) -> Result<usize> {
        engine::instance_size(&self.to_record())
    }

    /// See [`engine::deserialize`]
    fn deserialize_from(buf: &Buffer, offset: usize) -> Result<(Self, usize)> {
        let (record, after) = engine::deserialize(Self::schema(), buf, offset)?;
        Ok((Self::from_record(&record)?, after))
    }

    /// See [`engine::read_sequence`]
    fn read_sequence(buf: &Buffer, offset: usize, count: usize) -> Result<Vec<Self>> {
        engine::read_sequence(Self::schema(), buf, offset, count)?
            .iter()
            .map(Self::from_record)
            .collect()
    }
}

/// A Rust type usable as a member of a [`serializable!`](crate::serializable) structure
pub trait FieldType: Sized {
    fn kind() -> FieldKind;

    fn to_value(&self) -> Value;

    /// `None` when the value does not hold this type
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! integer_field {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FieldType for $ty {
                fn kind() -> FieldKind {
                    FieldKind::$variant
                }

                fn to_value(&self) -> Value {
                    Value::$variant(*self)
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(*v),
                        Value::Int(v) => <$ty>::try_from(*v).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

integer_field! {
    u8 => U8,
    u16 => U16,
    u32 => U32,
    i8 => I8,
    i16 => I16,
    i32 => I32,
}

impl FieldType for f32 {
    fn kind() -> FieldKind {
        FieldKind::F32
    }

    fn to_value(&self) -> Value {
        Value::F32(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }
}

impl FieldType for Ptr32 {
    fn kind() -> FieldKind {
        FieldKind::Ptr32
    }

    fn to_value(&self) -> Value {
        Value::Ptr(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Ptr(ptr) => Some(*ptr),
            Value::Int(v) => u32::try_from(*v).ok().map(Ptr32),
            _ => None,
        }
    }
}

impl<const N: usize> FieldType for [u8; N] {
    fn kind() -> FieldKind {
        FieldKind::Bytes(N)
    }

    fn to_value(&self) -> Value {
        Value::Bytes(self.to_vec())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bytes(bytes) => bytes.as_slice().try_into().ok(),
            _ => None,
        }
    }
}

/// Lists default to [`ListLength::Trailing`]
impl<T: FieldType> FieldType for Vec<T> {
    fn kind() -> FieldKind {
        FieldKind::List {
            element: Box::new(T::kind()),
            length: ListLength::Trailing,
        }
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(T::to_value).collect())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

#[doc(hidden)]
pub fn __field_from_record<T: FieldType>(record: &Record, field: &'static str) -> Result<T> {
    let value = record.get(field)?;
    T::from_value(value).ok_or_else(|| Error::SchemaMismatch {
        field: field.to_string(),
        value: format!("{value:?}"),
        kind: T::kind().to_string(),
    })
}

#[doc(hidden)]
#[macro_export]
macro_rules! __list_length {
    ($kind:expr) => {
        $kind
    };
    ($kind:expr, count = $field:ident) => {
        $kind.with_length($crate::schema::ListLength::Field(stringify!($field)))
    };
    ($kind:expr, detached) => {
        $kind.with_length($crate::schema::ListLength::Detached)
    };
}

/// Declare a struct together with its [`Serializable`] and [`FieldType`] implementations.
///
/// Fields are laid out in declaration order. A `Vec` field is a list placed after the fixed
/// portion; annotate it with `[count = other_field]` to have it counted by another member, or
/// with `[detached]` when the caller places the elements itself.
#[macro_export]
macro_rules! serializable {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $fty:ty $([$($length:tt)+])?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $fty,
            )*
        }

        impl $crate::Serializable for $name {
            fn schema() -> &'static $crate::schema::StructSchema {
                static SCHEMA: ::std::sync::OnceLock<$crate::schema::StructSchema> =
                    ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    $crate::schema::StructSchema::new(stringify!($name))
                        $(
                            .field(
                                stringify!($field),
                                $crate::__list_length!(
                                    <$fty as $crate::FieldType>::kind() $(, $($length)+)?
                                ),
                            )
                        )*
                })
            }

            fn to_record(&self) -> $crate::Record {
                $crate::Record::from_values(
                    <Self as $crate::Serializable>::schema(),
                    ::std::vec![$($crate::FieldType::to_value(&self.$field)),*],
                )
            }

            fn from_record(record: &$crate::Record) -> $crate::error::Result<Self> {
                Ok($name {
                    $($field: $crate::typed::__field_from_record(record, stringify!($field))?,)*
                })
            }
        }

        impl $crate::FieldType for $name {
            fn kind() -> $crate::schema::FieldKind {
                $crate::schema::FieldKind::Struct(<Self as $crate::Serializable>::schema())
            }

            fn to_value(&self) -> $crate::Value {
                $crate::Value::Struct($crate::Serializable::to_record(self))
            }

            fn from_value(value: &$crate::Value) -> Option<Self> {
                match value {
                    $crate::Value::Struct(record)
                        if record.is_a(<Self as $crate::Serializable>::schema()) =>
                    {
                        <Self as $crate::Serializable>::from_record(record).ok()
                    }
                    _ => None,
                }
            }
        }
    };
}

#[cfg(test)]
mod test {
    use binrw::Endian;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::buffer::Buffer;
    use crate::error::{Error, Result};
    use crate::schema::{FieldKind, ListLength};
    use crate::value::{Ptr32, Record, Value};
    use crate::{serializable, FieldType, Serializable};

    serializable! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Vertex {
            position: [u8; 3],
            weight: i8,
        }
    }

    serializable! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Strip {
            flags: u16,
            vertex_count: u16,
            child: Ptr32,
            vertices: Vec<Vertex> [count = vertex_count],
            extra: Vec<u32> [detached],
            scale: f32,
        }
    }

    #[test]
    fn schema_from_declaration() {
        let schema = Strip::schema();

        assert_eq!(schema.name(), "Strip");
        assert_eq!(Strip::type_size(), 12);
        assert_eq!(schema.offset_of("child"), Some(4));
        assert_eq!(schema.offset_of("scale"), Some(8));
        assert_eq!(
            schema.fields()[3].kind,
            FieldKind::List {
                element: Box::new(FieldKind::Struct(Vertex::schema())),
                length: ListLength::Field("vertex_count"),
            }
        );
        assert_eq!(
            schema.fields()[4].kind,
            FieldKind::List {
                element: Box::new(FieldKind::U32),
                length: ListLength::Detached,
            }
        );
    }

    #[test]
    #[traced_test]
    fn typed_round_trip() -> Result<()> {
        let strip = Strip {
            flags: 3,
            vertex_count: 2,
            child: Ptr32(0x20),
            vertices: vec![
                Vertex { position: [1, 2, 3], weight: -1 },
                Vertex { position: [4, 5, 6], weight: 1 },
            ],
            extra: vec![],
            scale: 1.5,
        };

        let mut buf = Buffer::new(Endian::Little);
        buf.append(&[0xEE; 2]);
        let offset = strip.serialize_into(&mut buf, None)?;

        assert_eq!(offset, 2);
        assert_eq!(strip.instance_size()?, 20);
        assert_eq!(strip.nonnull_pointer_offsets()?, vec![4]);
        assert_eq!(buf.bytes_at(14, 4)?, &[1, 2, 3, 0xFF]);

        let (read, after) = Strip::deserialize_from(&buf, offset)?;
        assert_eq!(read, strip);
        assert_eq!(after, 22);

        Ok(())
    }

    #[test]
    fn detached_lists_are_not_written() -> Result<()> {
        let strip = Strip {
            extra: vec![1, 2, 3],
            ..Default::default()
        };

        assert_eq!(strip.instance_size()?, 12);
        assert_eq!(strip.nonnull_pointer_offsets()?, Vec::<usize>::new());

        Ok(())
    }

    #[test]
    fn sequence_of_structures() -> Result<()> {
        let mut buf = Buffer::new(Endian::Big);
        for weight in 0..3 {
            Vertex { position: [weight as u8; 3], weight }.serialize_into(&mut buf, None)?;
        }

        let read = Vertex::read_sequence(&buf, 4, 2)?;
        assert_eq!(read[0], Vertex { position: [1; 3], weight: 1 });
        assert_eq!(read[1], Vertex { position: [2; 3], weight: 2 });

        Ok(())
    }

    #[test]
    fn record_of_wrong_shape() {
        let record = Record::new(Vertex::schema())
            .with("weight", Value::F32(1.0))
            .unwrap();

        assert!(matches!(
            Vertex::from_record(&record),
            Err(Error::SchemaMismatch { field, .. }) if field == "weight"
        ));
        assert_eq!(Vertex::from_value(&Value::U8(0)), None);
    }
}
