use std::io::{Cursor, Write};

use pretty_assertions::assert_eq;
use pso_bml::write::BmlWriterOptions;
use pso_bml::{BmlArchive, BmlWriter, CompressionMethod};
use pso_iff::types::ChunkKind;
use pso_iff::ChunkWriter;
use pso_ninja::nj::{read_index_list, write_index_list, write_vertex_list};
use pso_ninja::njcm::read_tree;
use pso_ninja::njtl::{read_texture_list, write_texture_list};
use pso_ninja::{Mesh, MeshTreeNode, Vertex};
use pso_schema::{Archive, Buffer, Ptr32, Serializable};
use tracing_test::traced_test;

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Chunk stream of a single triangle model and its texture list, with the offset of the list
fn triangle(texture: &str) -> TestResult<(Vec<u8>, Ptr32)> {
    let mut model = ChunkWriter::new(ChunkKind::Model);
    let root = model.write_aligned(&MeshTreeNode::identity(Ptr32::NULL))?;
    let vertex_list = write_vertex_list(
        &mut model,
        vec![
            Vertex::at(0.0, 0.0, 0.0),
            Vertex::at(0.0, 1.0, 0.0),
            Vertex::at(1.0, 0.0, 0.0),
        ],
    )?;
    let index_list = write_index_list(&mut model, vec![vec![0, 1, 2]])?;
    let mesh = model.write_aligned(&Mesh {
        vertex_list,
        index_list,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    })?;
    let mesh_field = MeshTreeNode::schema().offset_of("mesh").unwrap_or_default();
    model.patch_pointer(root.offset() + mesh_field, mesh)?;

    let mut textures = ChunkWriter::new(ChunkKind::TextureList);
    textures.write(&MeshTreeNode::default())?;
    let list = write_texture_list(&mut textures, &[texture])?;

    let mut stream = model.finish()?;
    stream.extend(textures.finish()?);
    Ok((stream, list))
}

#[test]
#[traced_test]
fn models_survive_a_prs_archive() -> TestResult {
    let mut writer = BmlWriter::new(
        Cursor::new(Vec::new()),
        BmlWriterOptions::builder()
            .compression(CompressionMethod::Prs)
            .build(),
    );
    let mut lists = Vec::new();
    for (name, texture) in [("rock.nj", "rock_tex"), ("tree.nj", "bark_tex")] {
        let (stream, list) = triangle(texture)?;
        writer.start_file(name)?;
        writer.write_all(&stream)?;
        lists.push(list);
    }
    writer.set_texture_archive(&[0xAB; 0x100])?;
    let bml = writer.finish()?.into_inner();

    let archive = BmlArchive::new(Cursor::new(bml))?;
    assert_eq!(archive.len(), 2);
    assert!(archive.header().has_textures);

    for ((file, texture), list) in archive.files().zip(["rock_tex", "bark_tex"]).zip(lists) {
        assert!(file.stream().warnings().is_empty());

        let (chunk, body) = file.models().next().ok_or("no model")?;
        assert!(!chunk.pointers.is_empty());
        let body = Buffer::from_bytes(body.to_vec(), file.stream().endian());

        let tree = read_tree(&body, 0)?;
        let mesh = tree.root().and_then(|node| node.mesh.as_ref()).ok_or("no mesh")?;
        assert_eq!(chunk.pointer_at(4), Some(tree.nodes()[0].node.mesh));
        let strips = read_index_list(&body, mesh.index_list.offset())?;
        assert_eq!(strips[0].strips[0].indices, vec![0, 1, 2]);

        let (list_chunk, _) = file.texture_list().ok_or("no texture list")?;
        let names = read_texture_list(&file.stream().body_buffer(list_chunk), list.offset())?;
        assert_eq!(names, vec![texture]);
    }

    let tree = archive.by_name("tree.nj")?;
    assert_eq!(tree.texture_archive(), Some(&[0xAB; 0x100][..]));
    assert!(archive.by_name("rock.nj")?.texture_archive().is_none());

    Ok(())
}
