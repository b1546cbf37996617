//! Wavefront OBJ format support
//!
//! Reading goes through the `obj` crate; every object and group of the file
//! lands in one scene mesh since OBJ shares a single position pool.
//! Writing emits plain text with 1-based indices.

use crate::error::{IoError, IoResult};
use crate::registry::{SceneReader, SceneWriter};
use meshtrim_core::{Point3f, Scene, SceneMesh, Vector3f};
use ::obj::ObjData;
use std::fmt::Write as _;

const FORMAT: &str = "OBJ";

/// OBJ reader and writer
pub struct ObjFormat;

impl SceneReader for ObjFormat {
    fn read_scene(&self, bytes: &[u8]) -> IoResult<Scene> {
        let data = ObjData::load_buf(bytes).map_err(|e| IoError::parse(FORMAT, e.to_string()))?;

        let mut mesh = SceneMesh::new(
            data.objects
                .first()
                .map(|o| o.name.clone())
                .unwrap_or_default(),
        );
        mesh.vertices = data
            .position
            .iter()
            .map(|p| Point3f::new(p[0], p[1], p[2]))
            .collect();
        mesh.faces = data
            .objects
            .iter()
            .flat_map(|o| o.groups.iter())
            .flat_map(|g| g.polys.iter())
            .map(|poly| poly.0.iter().map(|t| t.0).collect())
            .collect();

        log::debug!(
            "parsed OBJ: {} objects, {} vertices, {} faces",
            data.objects.len(),
            mesh.vertex_count(),
            mesh.face_count()
        );
        Ok(Scene::from_mesh(mesh))
    }

    fn format_name(&self) -> &'static str {
        "obj"
    }
}

impl SceneWriter for ObjFormat {
    fn write_scene(&self, scene: &Scene) -> IoResult<Vec<u8>> {
        let mut out = String::new();
        let fail = |e: std::fmt::Error| IoError::WriteError {
            message: e.to_string(),
        };
        writeln!(out, "# meshtrim").map_err(fail)?;

        let mut offset = 0usize;
        for mesh in &scene.meshes {
            if !mesh.name.is_empty() {
                writeln!(out, "o {}", mesh.name).map_err(fail)?;
            }
            for v in &mesh.vertices {
                writeln!(out, "v {} {} {}", v.x, v.y, v.z).map_err(fail)?;
            }
            let normals: Option<&[Vector3f]> = mesh
                .normals
                .as_deref()
                .filter(|n| n.len() == mesh.vertices.len());
            if let Some(normals) = normals {
                for n in normals {
                    writeln!(out, "vn {} {} {}", n.x, n.y, n.z).map_err(fail)?;
                }
            }
            for face in &mesh.faces {
                out.push('f');
                for &i in face {
                    let index = offset + i + 1;
                    if normals.is_some() {
                        write!(out, " {}//{}", index, index).map_err(fail)?;
                    } else {
                        write!(out, " {}", index).map_err(fail)?;
                    }
                }
                out.push('\n');
            }
            offset += mesh.vertices.len();
        }

        Ok(out.into_bytes())
    }

    fn format_name(&self) -> &'static str {
        "obj"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = "\
# unit square split in two
o square
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3
f 1 3 4
";

    #[test]
    fn test_read_obj() {
        let scene = ObjFormat.read_scene(SQUARE.as_bytes()).unwrap();
        assert_eq!(scene.meshes.len(), 1);
        let mesh = &scene.meshes[0];
        assert_eq!(mesh.name, "square");
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.vertices[2], Point3f::new(1.0, 1.0, 0.0));
        assert_eq!(mesh.faces, vec![vec![0, 1, 2], vec![0, 2, 3]]);
        assert!(mesh.normals.is_none());
    }

    #[test]
    fn test_read_polygon_faces() {
        let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let scene = ObjFormat.read_scene(text.as_bytes()).unwrap();
        assert_eq!(scene.meshes[0].faces, vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn test_write_obj() {
        let mesh = SceneMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2]],
        );
        let bytes = ObjFormat.write_scene(&Scene::from_mesh(mesh)).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("v 1 0 0\n"));
        assert!(text.contains("f 1 2 3\n"));
        assert!(!text.contains("vn "));
    }

    #[test]
    fn test_write_multiple_meshes_offsets_indices() {
        let tri = || {
            SceneMesh::from_vertices_and_faces(
                vec![
                    Point3f::new(0.0, 0.0, 0.0),
                    Point3f::new(1.0, 0.0, 0.0),
                    Point3f::new(0.0, 1.0, 0.0),
                ],
                vec![vec![0, 1, 2]],
            )
        };
        let mut scene = Scene::from_mesh(tri());
        scene.meshes.push(tri());
        let text = String::from_utf8(ObjFormat.write_scene(&scene).unwrap()).unwrap();
        assert!(text.contains("f 4 5 6\n"));
    }

    #[test]
    fn test_write_normals() {
        let mut mesh = SceneMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2]],
        );
        mesh.set_normals(vec![Vector3f::z(); 3]);
        let text = String::from_utf8(ObjFormat.write_scene(&Scene::from_mesh(mesh)).unwrap()).unwrap();
        assert_eq!(text.matches("vn 0 0 1\n").count(), 3);
        assert!(text.contains("f 1//1 2//2 3//3\n"));
    }

    #[test]
    fn test_round_trip() {
        let scene = ObjFormat.read_scene(SQUARE.as_bytes()).unwrap();
        let bytes = ObjFormat.write_scene(&scene).unwrap();
        let back = ObjFormat.read_scene(&bytes).unwrap();
        assert_eq!(back.meshes[0].vertices, scene.meshes[0].vertices);
        assert_eq!(back.meshes[0].faces, scene.meshes[0].faces);
    }
}
