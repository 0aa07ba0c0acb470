//! Generic serialization of [`Record`]s against their [`StructSchema`].
//!
//! A structure is laid out as its fixed portion, walked depth first through nested structures,
//! followed by the elements of every inline list in the order the lists were encountered. Each
//! list element is itself laid out completely (fixed portion then its own lists) before the next
//! one. Detached lists are skipped entirely.

use binrw::Endian;
use tracing::{instrument, trace};

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::schema::{FieldKind, ListLength, StructSchema};
use crate::value::{Ptr32, Record, Value};

/// Bytes and pointer locations of one laid out record, not yet placed in a buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    /// Offsets of the non-null pointer fields, relative to the first byte
    pub pointers: Vec<usize>,
}

type PendingList<'r> = (&'static str, &'static FieldKind, &'r [Value]);

struct Encoder {
    buf: Buffer,
    pointers: Vec<usize>,
}

macro_rules! pack_integer {
    ($self:ident, $field:expr, $kind:expr, $value:expr, $ty:ty, $variant:ident) => {
        match $value {
            Value::$variant(v) => $self.buf.pack(*v).map(|_| ()),
            Value::Int(v) => {
                let v = <$ty>::try_from(*v).map_err(|_| mismatch($field, $value, $kind))?;
                $self.buf.pack(v).map(|_| ())
            }
            _ => Err(mismatch($field, $value, $kind)),
        }
    };
}

impl Encoder {
    fn encode(record: &Record, endian: Endian) -> Result<Encoded> {
        let mut encoder = Encoder {
            buf: Buffer::new(endian),
            pointers: Vec::new(),
        };
        encoder.record(record)?;
        Ok(Encoded {
            bytes: encoder.buf.into_inner(),
            pointers: encoder.pointers,
        })
    }

    fn record(&mut self, record: &Record) -> Result<()> {
        let mut pending = Vec::new();
        self.fixed(record, &mut pending)?;
        for (field, element, items) in pending {
            for item in items {
                self.element(field, element, item)?;
            }
        }
        Ok(())
    }

    fn fixed<'r>(&mut self, record: &'r Record, pending: &mut Vec<PendingList<'r>>) -> Result<()> {
        let schema = record.schema();
        check_arity(record)?;

        for (field, value) in schema.fields().iter().zip(record.values()) {
            match &field.kind {
                FieldKind::Struct(inner) => {
                    let nested = nested_record(field.name, &field.kind, inner, value)?;
                    self.fixed(nested, pending)?;
                }
                FieldKind::List { element, length } => {
                    let Value::List(items) = value else {
                        return Err(mismatch(field.name, value, &field.kind));
                    };
                    match length {
                        ListLength::Field(count_field) => {
                            let count = record.get(count_field)?;
                            if count.as_integer() != Some(items.len() as i64) {
                                return Err(Error::SchemaMismatch {
                                    field: field.name.to_string(),
                                    value: format!("{} elements", items.len()),
                                    kind: format!("{} counted by `{count_field}` = {count:?}", field.kind),
                                });
                            }
                            pending.push((field.name, &**element, items.as_slice()));
                        }
                        ListLength::Trailing => {
                            pending.push((field.name, &**element, items.as_slice()))
                        }
                        ListLength::Detached => {}
                    }
                }
                kind => self.scalar(field.name, kind, value)?,
            }
        }
        Ok(())
    }

    fn element(&mut self, field: &str, kind: &FieldKind, value: &Value) -> Result<()> {
        match kind {
            FieldKind::Struct(schema) => {
                let nested = nested_record(field, kind, schema, value)?;
                self.record(nested)
            }
            FieldKind::List { element, .. } => match value {
                Value::List(items) => items
                    .iter()
                    .try_for_each(|item| self.element(field, element, item)),
                _ => Err(mismatch(field, value, kind)),
            },
            _ => self.scalar(field, kind, value),
        }
    }

    fn scalar(&mut self, field: &str, kind: &FieldKind, value: &Value) -> Result<()> {
        match kind {
            FieldKind::U8 => pack_integer!(self, field, kind, value, u8, U8),
            FieldKind::U16 => pack_integer!(self, field, kind, value, u16, U16),
            FieldKind::U32 => pack_integer!(self, field, kind, value, u32, U32),
            FieldKind::I8 => pack_integer!(self, field, kind, value, i8, I8),
            FieldKind::I16 => pack_integer!(self, field, kind, value, i16, I16),
            FieldKind::I32 => pack_integer!(self, field, kind, value, i32, I32),
            FieldKind::F32 => match value {
                Value::F32(v) => self.buf.pack(*v).map(|_| ()),
                _ => Err(mismatch(field, value, kind)),
            },
            FieldKind::Bytes(length) => match value {
                Value::Bytes(bytes) if bytes.len() <= *length => {
                    self.buf.append(bytes);
                    self.buf.append(&vec![0; length - bytes.len()]);
                    Ok(())
                }
                _ => Err(mismatch(field, value, kind)),
            },
            FieldKind::Ptr32 => {
                let ptr = match value {
                    Value::Ptr(ptr) => *ptr,
                    Value::Int(v) => u32::try_from(*v)
                        .map(Ptr32)
                        .map_err(|_| mismatch(field, value, kind))?,
                    _ => return Err(mismatch(field, value, kind)),
                };
                let offset = self.buf.pack(ptr.0)?;
                if !ptr.is_null() {
                    self.pointers.push(offset);
                }
                Ok(())
            }
            FieldKind::Struct(_) | FieldKind::List { .. } => Err(mismatch(field, value, kind)),
        }
    }
}

fn mismatch(field: &str, value: &Value, kind: &FieldKind) -> Error {
    Error::SchemaMismatch {
        field: field.to_string(),
        value: format!("{value:?}"),
        kind: kind.to_string(),
    }
}

fn check_arity(record: &Record) -> Result<()> {
    let schema = record.schema();
    if record.values().len() != schema.fields().len() {
        return Err(Error::SchemaMismatch {
            field: schema.name().to_string(),
            value: format!("{} values", record.values().len()),
            kind: format!("{} fields", schema.fields().len()),
        });
    }
    Ok(())
}

fn nested_record<'r>(
    field: &str,
    kind: &FieldKind,
    schema: &StructSchema,
    value: &'r Value,
) -> Result<&'r Record> {
    match value {
        Value::Struct(record) if record.is_a(schema) => Ok(record),
        _ => Err(mismatch(field, value, kind)),
    }
}

/// Write a record at the cursor of `buf`.
///
/// When `alignment` is given, zero bytes are appended so that the cursor ends on a multiple of
/// it. Returns the offset of the first byte written.
pub fn serialize(record: &Record, buf: &mut Buffer, alignment: Option<usize>) -> Result<usize> {
    serialize_with_pointers(record, buf, alignment).map(|(offset, _)| offset)
}

/// [`serialize`], also returning the offsets of the non-null pointer fields relative to the start
/// of the record
#[instrument(level = "trace", skip_all, fields(schema = record.schema().name()))]
pub fn serialize_with_pointers(
    record: &Record,
    buf: &mut Buffer,
    alignment: Option<usize>,
) -> Result<(usize, Vec<usize>)> {
    let encoded = encode(record, buf.endian())?;
    let offset = place(&encoded, buf, alignment);
    Ok((offset, encoded.pointers))
}

/// Lay out a record without writing it anywhere.
///
/// Every failure of [`serialize`] happens here, so a caller can inspect the result before
/// committing it with [`place`].
pub fn encode(record: &Record, endian: Endian) -> Result<Encoded> {
    let encoded = Encoder::encode(record, endian)?;
    if encoded.bytes.is_empty() {
        return Err(Error::EmptyRecord(record.schema().name().to_string()));
    }
    Ok(encoded)
}

/// Append an encoded record at the cursor of `buf`, padded to `alignment`.
///
/// Returns the offset of the first byte written.
pub fn place(encoded: &Encoded, buf: &mut Buffer, alignment: Option<usize>) -> usize {
    let padding = match alignment {
        Some(alignment) if alignment > 1 => {
            let end = buf.offset() + encoded.bytes.len();
            (alignment - end % alignment) % alignment
        }
        _ => 0,
    };

    let offset = buf.append(&encoded.bytes);
    if padding > 0 {
        buf.append(&vec![0; padding]);
    }

    trace!(offset, size = encoded.bytes.len(), padding, "wrote record");
    offset
}

/// Offsets of the non-null pointer fields of a record, relative to its first byte
pub fn nonnull_pointer_offsets(record: &Record) -> Result<Vec<usize>> {
    Ok(Encoder::encode(record, Endian::Little)?.pointers)
}

/// Number of bytes the record occupies once written, inline list contents included
pub fn instance_size(record: &Record) -> Result<usize> {
    Ok(Encoder::encode(record, Endian::Little)?.bytes.len())
}

/// List waiting for its elements, `path` holds the field indices leading to it
struct PendingRead {
    path: Vec<usize>,
    element: &'static FieldKind,
    count: usize,
}

struct Decoder<'b> {
    buf: &'b Buffer,
    cursor: usize,
}

impl Decoder<'_> {
    fn record(&mut self, schema: &'static StructSchema) -> Result<Record> {
        let mut pending = Vec::new();
        let mut record = self.fixed(schema, &mut Vec::new(), &mut pending)?;

        for list in pending {
            let mut items = Vec::with_capacity(list.count);
            for _ in 0..list.count {
                items.push(self.element(list.element)?);
            }
            *slot(&mut record, &list.path)? = Value::List(items);
        }
        Ok(record)
    }

    fn fixed(
        &mut self,
        schema: &'static StructSchema,
        path: &mut Vec<usize>,
        pending: &mut Vec<PendingRead>,
    ) -> Result<Record> {
        let mut values = Vec::with_capacity(schema.fields().len());
        let mut counted = Vec::new();

        for (index, field) in schema.fields().iter().enumerate() {
            let value = match &field.kind {
                FieldKind::Struct(inner) => {
                    path.push(index);
                    let nested = self.fixed(*inner, path, pending);
                    path.pop();
                    Value::Struct(nested?)
                }
                FieldKind::List { element, length } => {
                    if let ListLength::Field(count_field) = length {
                        counted.push((index, &**element, *count_field));
                    }
                    Value::List(Vec::new())
                }
                kind => self.scalar(kind)?,
            };
            values.push(value);
        }

        let record = Record::from_values(schema, values);
        for (index, element, count_field) in counted {
            let count = record.get(count_field)?;
            let count = count
                .as_integer()
                .and_then(|c| usize::try_from(c).ok())
                .ok_or_else(|| mismatch(count_field, count, &FieldKind::U32))?;

            let mut list_path = path.clone();
            list_path.push(index);
            pending.push(PendingRead {
                path: list_path,
                element,
                count,
            });
        }
        Ok(record)
    }

    fn element(&mut self, kind: &'static FieldKind) -> Result<Value> {
        match kind {
            FieldKind::Struct(schema) => self.record(*schema).map(Value::Struct),
            FieldKind::List { .. } => Ok(Value::List(Vec::new())),
            _ => self.scalar(kind),
        }
    }

    fn scalar(&mut self, kind: &FieldKind) -> Result<Value> {
        let offset = self.cursor;
        let value = match kind {
            FieldKind::U8 => Value::U8(self.buf.unpack(offset)?),
            FieldKind::U16 => Value::U16(self.buf.unpack(offset)?),
            FieldKind::U32 => Value::U32(self.buf.unpack(offset)?),
            FieldKind::I8 => Value::I8(self.buf.unpack(offset)?),
            FieldKind::I16 => Value::I16(self.buf.unpack(offset)?),
            FieldKind::I32 => Value::I32(self.buf.unpack(offset)?),
            FieldKind::F32 => Value::F32(self.buf.unpack(offset)?),
            FieldKind::Ptr32 => Value::Ptr(Ptr32(self.buf.unpack(offset)?)),
            FieldKind::Bytes(length) => Value::Bytes(self.buf.bytes_at(offset, *length)?.to_vec()),
            FieldKind::Struct(_) | FieldKind::List { .. } => Value::List(Vec::new()),
        };
        self.cursor += kind.fixed_size();
        Ok(value)
    }
}

fn slot<'r>(record: &'r mut Record, path: &[usize]) -> Result<&'r mut Value> {
    let schema = record.schema();
    let missing = || Error::UnknownField {
        schema: schema.name().to_string(),
        field: format!("{path:?}"),
    };

    let (last, parents) = path.split_last().ok_or_else(missing)?;
    let mut current = record;
    for index in parents {
        current = match current.values_mut().get_mut(*index) {
            Some(Value::Struct(nested)) => nested,
            _ => return Err(missing()),
        };
    }
    current.values_mut().get_mut(*last).ok_or_else(missing)
}

/// Read a record of `schema` at `offset`.
///
/// Pointer fields are returned as stored and never followed. Counted lists are read back with
/// their elements, trailing and detached lists come back empty. Returns the record and the
/// offset just after it.
#[instrument(level = "trace", skip(schema, buf), fields(schema = schema.name()))]
pub fn deserialize(
    schema: &'static StructSchema,
    buf: &Buffer,
    offset: usize,
) -> Result<(Record, usize)> {
    let mut decoder = Decoder {
        buf,
        cursor: offset,
    };
    let record = decoder.record(schema)?;
    Ok((record, decoder.cursor))
}

/// Read `count` consecutive records of `schema` starting at `offset`
pub fn read_sequence(
    schema: &'static StructSchema,
    buf: &Buffer,
    offset: usize,
    count: usize,
) -> Result<Vec<Record>> {
    let mut records = Vec::with_capacity(count);
    let mut cursor = offset;
    for _ in 0..count {
        let (record, after) = deserialize(schema, buf, cursor)?;
        records.push(record);
        cursor = after;
    }
    Ok(records)
}
