use pretty_assertions::assert_eq;
use pso_rel::error::Result;
use pso_rel::{RelArchive, RelWriter};
use pso_schema::schema::{FieldKind, StructSchema};
use pso_schema::{serializable, Archive, Ptr32, Value};
use tracing_test::traced_test;

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Item {
        pub kind: u16,
        pub count: u16,
        pub next: Ptr32,
    }
}

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Inventory {
        pub owner: [u8; 12],
        pub items: Ptr32,
        pub item_count: u32,
        pub favourite: Ptr32,
    }
}

#[test]
#[traced_test]
fn relocations_survive_finish_and_parse() -> Result<()> {
    let mut rel = RelWriter::new();

    let mut next = Ptr32::NULL;
    for kind in (0..5).rev() {
        next = rel.write(&Item {
            kind,
            count: kind * 10,
            next,
        })?;
    }
    let inventory = Inventory {
        owner: *b"HUmar\0\0\0\0\0\0\0",
        items: next,
        item_count: 5,
        favourite: next,
    };
    let root = rel.write_aligned(&inventory)?;

    let written: Vec<u32> = rel.relocations().iter().copied().collect();
    let archive = RelArchive::new(rel.finish(root)?)?;

    let mut sorted = written.clone();
    sorted.sort();
    assert_eq!(archive.pointer_offsets(), sorted);
    assert!(!archive.pointer_offsets().contains(&0));
    assert!(archive.pointer_offsets().iter().all(|p| p % 4 == 0));

    let read: Inventory = archive.read_root()?;
    assert_eq!(read, inventory);

    let items: Vec<Item> = archive.chain(read.items, "next")?;
    assert_eq!(
        items.iter().map(|item| item.kind).collect::<Vec<_>>(),
        vec![0, 1, 2, 3, 4]
    );

    Ok(())
}

#[test]
fn runtime_schema_through_rel() -> Result<()> {
    let schema = StructSchema::new("Door")
        .field("switch_id", FieldKind::U16)
        .field("flags", FieldKind::U16)
        .field("target", FieldKind::Ptr32)
        .leak();

    let mut rel = RelWriter::new();
    let first = rel.write(&Item::default())?;
    let record = pso_schema::Record::new(schema)
        .with("switch_id", Value::Int(3))?
        .with("target", Value::Ptr(first))?;
    let door = rel.write_record(&record, true)?;

    let archive = RelArchive::new(rel.finish(door)?)?;
    let read = archive.read_record(schema, archive.payload().offset())?;
    assert_eq!(read.get("switch_id")?, &Value::U16(3));
    assert_eq!(archive.follow(door.offset() + 4)?, first);

    Ok(())
}
