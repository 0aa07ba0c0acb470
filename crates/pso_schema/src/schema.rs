//! Field descriptor tables describing the on-disk layout of a structure.

use std::fmt;

/// How the elements of a list field are counted and placed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListLength {
    /// Placed after the fixed portion of the structure, the element count is held by the named
    /// integer field of the same structure
    Field(&'static str),

    /// Placed after the fixed portion of the structure. The count is not stored, so the list is
    /// left empty when the structure is read back.
    Trailing,

    /// Never placed by the structure itself, the caller writes the elements elsewhere
    Detached,
}

/// Semantic type of a structure member
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    F32,
    /// Fixed length byte array
    Bytes(usize),
    /// Nested structure stored inline
    Struct(&'static StructSchema),
    /// Variable length list of elements
    List {
        element: Box<FieldKind>,
        length: ListLength,
    },
    /// 32-bit offset of another structure, `0` being NULL
    Ptr32,
}

impl FieldKind {
    /// Size of the field inside the fixed portion of its structure. Lists take no space.
    pub fn fixed_size(&self) -> usize {
        match self {
            FieldKind::U8 | FieldKind::I8 => 1,
            FieldKind::U16 | FieldKind::I16 => 2,
            FieldKind::U32 | FieldKind::I32 | FieldKind::F32 | FieldKind::Ptr32 => 4,
            FieldKind::Bytes(length) => *length,
            FieldKind::Struct(schema) => schema.type_size(),
            FieldKind::List { .. } => 0,
        }
    }

    /// Replace how a list is counted. Other kinds are returned unchanged.
    pub fn with_length(self, length: ListLength) -> Self {
        match self {
            FieldKind::List { element, .. } => FieldKind::List { element, length },
            other => {
                debug_assert!(false, "list length applied to {other}");
                other
            }
        }
    }

    /// Whether this is an integer kind usable as a list count
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldKind::U8
                | FieldKind::U16
                | FieldKind::U32
                | FieldKind::I8
                | FieldKind::I16
                | FieldKind::I32
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::U8 => f.write_str("U8"),
            FieldKind::U16 => f.write_str("U16"),
            FieldKind::U32 => f.write_str("U32"),
            FieldKind::I8 => f.write_str("I8"),
            FieldKind::I16 => f.write_str("I16"),
            FieldKind::I32 => f.write_str("I32"),
            FieldKind::F32 => f.write_str("F32"),
            FieldKind::Bytes(length) => write!(f, "FixedArray(U8, {length})"),
            FieldKind::Struct(schema) => f.write_str(schema.name()),
            FieldKind::List { element, .. } => write!(f, "list[{element}]"),
            FieldKind::Ptr32 => f.write_str("Ptr32"),
        }
    }
}

/// A named member of a structure
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Ordered field table of a structure.
///
/// Declaration order is the on-disk order. The type size is the sum of the fixed widths, list
/// contents are not part of it.
///
/// ```
/// use pso_schema::schema::{FieldKind, StructSchema};
///
/// let header = StructSchema::new("IffHeader")
///     .field("type_name", FieldKind::Bytes(4))
///     .field("body_size", FieldKind::U32);
///
/// assert_eq!(header.type_size(), 8);
/// assert_eq!(header.offset_of("body_size"), Some(4));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StructSchema {
    name: &'static str,
    fields: Vec<FieldDescriptor>,
    type_size: usize,
}

impl StructSchema {
    /// Start an empty schema
    pub fn new(name: &'static str) -> Self {
        StructSchema {
            name,
            fields: Vec::new(),
            type_size: 0,
        }
    }

    /// Append a field
    pub fn field(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.type_size += kind.fixed_size();
        self.fields.push(FieldDescriptor { name, kind });
        self
    }

    /// Move the schema into static storage, for schemas assembled at runtime
    pub fn leak(self) -> &'static StructSchema {
        Box::leak(Box::new(self))
    }

    /// Name of the structure
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Size of the fixed portion, similar to `sizeof()`
    pub fn type_size(&self) -> usize {
        self.type_size
    }

    /// Position of a field in the declaration order
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Byte offset of a field from the start of the structure
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        let mut offset = 0;
        for field in &self.fields {
            if field.name == name {
                return Some(offset);
            }
            offset += field.kind.fixed_size();
        }
        None
    }
}
