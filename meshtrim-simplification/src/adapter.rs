//! Conversion between indexed scenes and half-edge meshes

use crate::halfedge::{HalfEdgeMesh, VertexHandle};
use meshtrim_core::{
    to_point3d, to_point3f, Error, Result, Scene, SceneMesh, Vector3d, Vector3f,
};
use serde::{Deserialize, Serialize};

/// Name of the single mesh in exported scenes
pub const EXPORT_MESH_NAME: &str = "decimated";

/// Import behaviour
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Drop faces the half-edge mesh cannot represent instead of failing
    pub skip_non_manifold_faces: bool,
}

impl ImportOptions {
    pub fn with_skip_non_manifold_faces(mut self, skip: bool) -> Self {
        self.skip_non_manifold_faces = skip;
        self
    }
}

/// Export behaviour
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Emit area-weighted vertex normals
    pub compute_normals: bool,
}

impl ExportOptions {
    pub fn with_compute_normals(mut self, compute: bool) -> Self {
        self.compute_normals = compute;
        self
    }
}

/// Build a half-edge mesh from every mesh of a scene.
pub fn from_scene(scene: &Scene) -> Result<HalfEdgeMesh> {
    from_scene_with_options(scene, &ImportOptions::default())
}

/// Build a half-edge mesh from every mesh of a scene.
///
/// Vertices are added in array order, so the n-th vertex of the first mesh
/// gets handle index n. A face with fewer than three indices or an index past
/// the end of its mesh fails the whole import with [`Error::MalformedFace`].
pub fn from_scene_with_options(scene: &Scene, options: &ImportOptions) -> Result<HalfEdgeMesh> {
    let mut mesh = HalfEdgeMesh::with_capacity(scene.vertex_count(), scene.face_count());
    let mut skipped = 0usize;

    for (mesh_index, source) in scene.meshes.iter().enumerate() {
        let handles: Vec<VertexHandle> = source
            .vertices
            .iter()
            .map(|p| mesh.add_vertex(to_point3d(p)))
            .collect();

        for (face_index, face) in source.faces.iter().enumerate() {
            let malformed = |reason: String| Error::MalformedFace {
                mesh: mesh_index,
                face: face_index,
                reason,
            };
            if face.len() < 3 {
                return Err(malformed(format!(
                    "face has {} indices, at least 3 are required",
                    face.len()
                )));
            }
            let corners = face
                .iter()
                .map(|&i| {
                    handles.get(i).copied().ok_or_else(|| {
                        malformed(format!(
                            "vertex index {} out of range ({} vertices)",
                            i,
                            handles.len()
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            match mesh.add_face(&corners) {
                Ok(_) => {}
                Err(Error::InvalidTopology(reason)) if options.skip_non_manifold_faces => {
                    log::debug!("skipping face {} of mesh {}: {}", face_index, mesh_index, reason);
                    skipped += 1;
                }
                Err(Error::InvalidTopology(reason)) => return Err(malformed(reason)),
                Err(e) => return Err(e),
            }
        }
    }

    if skipped > 0 {
        log::warn!("skipped {} faces that the half-edge mesh cannot represent", skipped);
    }
    log::debug!(
        "imported {} meshes: {} vertices, {} faces",
        scene.meshes.len(),
        mesh.n_vertices(),
        mesh.n_faces()
    );
    Ok(mesh)
}

/// Export a half-edge mesh as a single-mesh scene.
pub fn to_scene(mesh: &HalfEdgeMesh) -> Scene {
    to_scene_with_options(mesh, &ExportOptions::default())
}

/// Export a half-edge mesh as a single-mesh scene.
///
/// Vertices are written in ascending handle order and faces keep their
/// native winding. The scene gets one default material and a root node
/// referencing the mesh.
pub fn to_scene_with_options(mesh: &HalfEdgeMesh, options: &ExportOptions) -> Scene {
    let handles: Vec<VertexHandle> = mesh.vertices().collect();
    let slots = handles.last().map_or(0, |v| v.index() + 1);
    let mut export_index = vec![usize::MAX; slots];
    for (i, v) in handles.iter().enumerate() {
        export_index[v.index()] = i;
    }

    let mut out = SceneMesh::new(EXPORT_MESH_NAME);
    out.vertices = handles.iter().map(|&v| to_point3f(&mesh.position(v))).collect();
    out.faces = mesh
        .faces()
        .map(|f| {
            mesh.face_vertices(f)
                .into_iter()
                .map(|v| export_index[v.index()])
                .collect()
        })
        .collect();

    if options.compute_normals {
        out.set_normals(vertex_normals(mesh, &handles, &export_index));
    }

    log::debug!(
        "exported {} vertices, {} faces",
        out.vertex_count(),
        out.face_count()
    );
    Scene::from_mesh(out)
}

fn vertex_normals(mesh: &HalfEdgeMesh, handles: &[VertexHandle], export_index: &[usize]) -> Vec<Vector3f> {
    let mut sums = vec![Vector3d::zeros(); handles.len()];
    for f in mesh.faces() {
        // Newell vector: length proportional to area
        let weighted = mesh.face_area_vector(f);
        for v in mesh.face_vertices(f) {
            sums[export_index[v.index()]] += weighted;
        }
    }
    sums.into_iter()
        .map(|n| {
            let n = n.try_normalize(f64::EPSILON).unwrap_or_else(Vector3d::zeros);
            Vector3f::new(n.x as f32, n.y as f32, n.z as f32)
        })
        .collect()
}
