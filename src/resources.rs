//! Asset provider: turns a mesh description into [`MeshData`].

use std::{
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    error::AssetError,
    model::{MeshData, ModelVertex, Submesh},
    primitives::sphere::generate_sphere,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeshSource {
    Sphere {
        radius: f32,
        sectors: u32,
        stacks: u32,
    },
    /// OBJ file, resolved against the copied `assets` folder unless absolute
    Obj { file: PathBuf },
}

impl Default for MeshSource {
    fn default() -> Self {
        MeshSource::Sphere {
            radius: 1.0,
            sectors: 32,
            stacks: 16,
        }
    }
}

/// Directory `build.rs` copied the assets into.
pub fn asset_dir() -> PathBuf {
    Path::new(env!("OUT_DIR")).join("assets")
}

pub fn load_mesh(source: &MeshSource) -> Result<MeshData, AssetError> {
    match source {
        MeshSource::Sphere {
            radius,
            sectors,
            stacks,
        } => {
            if *sectors < 3 || *stacks < 2 {
                return Err(AssetError::SphereResolution {
                    sectors: *sectors,
                    stacks: *stacks,
                });
            }
            Ok(generate_sphere(*radius, *sectors, *stacks))
        }
        MeshSource::Obj { file } => {
            let path = if file.is_absolute() {
                file.clone()
            } else {
                asset_dir().join(file)
            };
            load_obj(&path)
        }
    }
}

pub fn load_obj(path: &Path) -> Result<MeshData, AssetError> {
    log::info!("loading mesh {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "obj".to_string());
    parse_obj(&name, &text)
}

/// Parses OBJ text, merging every object into one mesh with one submesh each.
///
/// Objects without normals get radial normals (normalized positions).
pub fn parse_obj(name: &str, text: &str) -> Result<MeshData, AssetError> {
    let mut reader = BufReader::new(Cursor::new(text.as_bytes()));
    let (models, _materials) = tobj::load_obj_buf(
        &mut reader,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
        // Materials are not used; colors come from the scene
        |_| Ok(Default::default()),
    )?;

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    let mut submeshes = Vec::new();

    for model in &models {
        let mesh = &model.mesh;
        let base = vertices.len() as u32;
        let has_normals = mesh.normals.len() == mesh.positions.len();

        for (i, position) in mesh.positions.chunks_exact(3).enumerate() {
            let position = [position[0], position[1], position[2]];
            let normal = if has_normals {
                [
                    mesh.normals[i * 3],
                    mesh.normals[i * 3 + 1],
                    mesh.normals[i * 3 + 2],
                ]
            } else {
                radial_normal(position)
            };
            vertices.push(ModelVertex { position, normal });
        }

        let index_start = indices.len() as u32;
        indices.extend(mesh.indices.iter().map(|index| base + index));
        submeshes.push(Submesh {
            index_start,
            index_count: mesh.indices.len() as u32,
        });
    }

    let data = MeshData {
        name: name.to_string(),
        vertices,
        indices,
        submeshes,
    };
    if data.is_empty() {
        return Err(AssetError::Empty(name.to_string()));
    }
    Ok(data)
}

fn radial_normal([x, y, z]: [f32; 3]) -> [f32; 3] {
    let length = (x * x + y * y + z * z).sqrt();
    if length <= f32::EPSILON {
        [0.0, 0.0, 1.0]
    } else {
        [x / length, y / length, z / length]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_TRIANGLES: &str = "\
o first
v 1.0 0.0 0.0
v 0.0 1.0 0.0
v 0.0 0.0 1.0
f 1 2 3
o second
v 2.0 0.0 0.0
v 0.0 2.0 0.0
v 0.0 0.0 2.0
f 4 5 6
";

    #[test]
    fn obj_objects_become_submeshes() {
        let mesh = parse_obj("pair", TWO_TRIANGLES).unwrap();
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.submeshes.len(), 2);
        assert_eq!(mesh.submeshes[1].index_start, 3);
        assert_eq!(mesh.submeshes[1].index_count, 3);
        // Second object's indices are rebased past the first object's vertices
        assert!(mesh.indices[3..].iter().all(|&index| index >= 3));
        assert_eq!(mesh.vertices[0].normal, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn empty_obj_is_rejected() {
        assert!(matches!(
            parse_obj("nothing", "# just a comment\n"),
            Err(AssetError::Empty(_))
        ));
    }

    #[test]
    fn bundled_octahedron_loads() {
        let source = MeshSource::Obj {
            file: PathBuf::from("octahedron.obj"),
        };
        let mesh = load_mesh(&source).unwrap();
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.indices.len(), 24);
    }

    #[test]
    fn sphere_source_validates_resolution() {
        let bad = MeshSource::Sphere {
            radius: 1.0,
            sectors: 2,
            stacks: 8,
        };
        assert!(matches!(
            load_mesh(&bad),
            Err(AssetError::SphereResolution { .. })
        ));
        assert!(load_mesh(&MeshSource::default()).is_ok());
    }
}
