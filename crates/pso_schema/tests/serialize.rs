use binrw::Endian;
use pretty_assertions::assert_eq;
use pso_schema::engine::{self, deserialize, serialize};
use pso_schema::error::{Error, Result};
use pso_schema::schema::{FieldKind, ListLength, StructSchema};
use pso_schema::{serializable, Archive, Buffer, Ptr32, Record, RelocatableBuffer, Serializable, Value};
use tracing_test::traced_test;

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Color {
        pub b: u8,
        pub g: u8,
        pub r: u8,
        pub a: u8,
    }
}

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Material {
        pub name: [u8; 8],
        pub diffuse: Color,
        pub texture: Ptr32,
        pub blend: i16,
        pub unk: u16,
        pub uv_scale: f32,
    }
}

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct MaterialList {
        pub materials: Vec<Material> [count = material_count],
        pub material_count: u32,
        pub next: Ptr32,
    }
}

#[test]
#[traced_test]
fn round_trip_nested_structures() -> Result<()> {
    let list = MaterialList {
        materials: vec![
            Material {
                name: *b"ground\0\0",
                diffuse: Color { b: 1, g: 2, r: 3, a: 255 },
                texture: Ptr32(0x30),
                blend: -2,
                unk: 0,
                uv_scale: 0.25,
            },
            Material {
                name: *b"wall\0\0\0\0",
                texture: Ptr32::NULL,
                ..Default::default()
            },
        ],
        material_count: 2,
        next: Ptr32(0x04),
    };

    for endian in [Endian::Little, Endian::Big] {
        let mut buf = Buffer::new(endian);
        let offset = list.serialize_into(&mut buf, Some(4))?;

        assert_eq!(list.instance_size()?, 8 + 2 * 24);
        assert_eq!(list.nonnull_pointer_offsets()?, vec![4, 8 + 12]);

        let (read, after) = MaterialList::deserialize_from(&buf, offset)?;
        assert_eq!(read, list);
        assert_eq!(after, buf.len());
    }

    Ok(())
}

#[test]
fn big_endian_layout() -> Result<()> {
    let color = Color { b: 0x10, g: 0x20, r: 0x30, a: 0x40 };
    let material = Material {
        name: *b"abc\0\0\0\0\0",
        diffuse: color,
        texture: Ptr32(0x0102),
        blend: 1,
        unk: 0xFFFF,
        uv_scale: 2.0,
    };

    let mut buf = Buffer::new(Endian::Big);
    material.serialize_into(&mut buf, None)?;

    #[rustfmt::skip]
    assert_eq!(buf.as_slice(), &[
        b'a', b'b', b'c', 0, 0, 0, 0, 0,
        0x10, 0x20, 0x30, 0x40,
        0x00, 0x00, 0x01, 0x02,
        0x00, 0x01, 0xFF, 0xFF,
        0x40, 0x00, 0x00, 0x00,
    ]);

    Ok(())
}

#[test]
fn runtime_schema_round_trip() -> Result<()> {
    let header = StructSchema::new("Header")
        .field("magic", FieldKind::Bytes(4))
        .field("count", FieldKind::U8)
        .field("pad", FieldKind::Bytes(3))
        .field("offsets", FieldKind::List {
            element: Box::new(FieldKind::U32),
            length: ListLength::Field("count"),
        })
        .leak();

    let record = Record::new(header)
        .with("magic", Value::Bytes(b"POF0".to_vec()))?
        .with("count", Value::Int(2))?
        .with("offsets", Value::List(vec![Value::U32(8), Value::U32(16)]))?;

    let mut buf = Buffer::new(Endian::Little);
    serialize(&record, &mut buf, None)?;
    assert_eq!(buf.len(), 16);

    let (read, _) = deserialize(header, &buf, 0)?;
    assert_eq!(read.get("count")?, &Value::U8(2));
    assert_eq!(read.get("offsets")?, record.get("offsets")?);

    let records = engine::read_sequence(header, &buf, 0, 1)?;
    assert_eq!(records.len(), 1);

    Ok(())
}

#[test]
fn wrong_nested_schema_is_rejected() {
    let record = Record::new(Material::schema())
        .with("diffuse", Value::Struct(Record::new(MaterialList::schema())))
        .unwrap();
    let mut buf = Buffer::new(Endian::Little);

    let err = serialize(&record, &mut buf, None).unwrap_err();
    assert!(matches!(&err, Error::SchemaMismatch { field, kind, .. } if field == "diffuse" && kind == "Color"));
    assert!(err.to_string().contains("member `diffuse`"));
}

#[test]
#[traced_test]
fn archive_records_every_pointer() -> Result<()> {
    let mut sentinel = Buffer::new(Endian::Little);
    sentinel.pack(0u32)?;
    let mut archive = RelocatableBuffer::new(sentinel, 0);

    let material = archive.write(&Material::default())?;
    let list = archive.write(&MaterialList {
        materials: vec![Material { texture: material, ..Default::default() }],
        material_count: 1,
        next: material,
    })?;

    assert_eq!(material, Ptr32(4));
    assert_eq!(list, Ptr32(28));

    let (_, relocations) = archive.into_parts();
    assert_eq!(*relocations, vec![32, 36 + 12]);
    assert!(relocations.iter().all(|location| location % 4 == 0 && *location != 0));

    Ok(())
}
