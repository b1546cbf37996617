//! Indexed scene representation exchanged with file formats

use crate::point::*;
use serde::{Deserialize, Serialize};

/// Name given to the material created for exported scenes
pub const DEFAULT_MATERIAL_NAME: &str = "DefaultMaterial";

/// An indexed polygon mesh with flat vertex and face arrays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMesh {
    pub name: String,
    pub vertices: Vec<Point3f>,
    /// Polygon loops, counter-clockwise, indexing into `vertices`
    pub faces: Vec<Vec<usize>>,
    pub normals: Option<Vec<Vector3f>>,
    pub material_index: usize,
}

/// A surface material; only its name survives the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
}

/// A node of the scene graph referencing meshes by index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub meshes: Vec<usize>,
    pub children: Vec<Node>,
}

/// A scene: meshes, materials and the node graph tying them together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub meshes: Vec<SceneMesh>,
    pub materials: Vec<Material>,
    pub root: Node,
}

impl SceneMesh {
    /// Create a new empty mesh
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
            material_index: 0,
        }
    }

    /// Create a mesh from vertices and polygon faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<Vec<usize>>) -> Self {
        Self {
            name: String::new(),
            vertices,
            faces,
            normals: None,
            material_index: 0,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Set vertex normals; ignored unless there is one per vertex
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(DEFAULT_MATERIAL_NAME)
    }
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }
}

impl Scene {
    /// Create a new empty scene with an empty root node
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            materials: Vec::new(),
            root: Node::new("root"),
        }
    }

    /// Wrap a single mesh: one default material and a root node referencing it
    pub fn from_mesh(mut mesh: SceneMesh) -> Self {
        mesh.material_index = 0;
        let mut root = Node::new("root");
        root.meshes.push(0);
        Self {
            meshes: vec![mesh],
            materials: vec![Material::default()],
            root,
        }
    }

    /// Check whether the scene holds at least one mesh
    pub fn has_meshes(&self) -> bool {
        !self.meshes.is_empty()
    }

    /// Total vertex count over all meshes
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(SceneMesh::vertex_count).sum()
    }

    /// Total face count over all meshes
    pub fn face_count(&self) -> usize {
        self.meshes.iter().map(SceneMesh::face_count).sum()
    }

    /// Axis-aligned bounds over every vertex of every mesh
    pub fn bounding_box(&self) -> Option<(Point3f, Point3f)> {
        let mut points = self.meshes.iter().flat_map(|m| m.vertices.iter());
        let first = *points.next()?;
        let (mut min, mut max) = (first, first);
        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Some((min, max))
    }

    /// Length of the bounding box diagonal, zero for an empty scene
    pub fn bounding_diagonal(&self) -> f32 {
        self.bounding_box()
            .map(|(min, max)| (max - min).norm())
            .unwrap_or(0.0)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> SceneMesh {
        SceneMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2, 3]],
        )
    }

    #[test]
    fn test_from_mesh_builds_graph() {
        let scene = Scene::from_mesh(unit_square());
        assert!(scene.has_meshes());
        assert_eq!(scene.materials.len(), 1);
        assert_eq!(scene.materials[0].name, DEFAULT_MATERIAL_NAME);
        assert_eq!(scene.root.meshes, vec![0]);
        assert_eq!(scene.vertex_count(), 4);
        assert_eq!(scene.face_count(), 1);
    }

    #[test]
    fn test_set_normals_requires_matching_length() {
        let mut mesh = unit_square();
        mesh.set_normals(vec![Vector3f::z(); 3]);
        assert!(mesh.normals.is_none());
        mesh.set_normals(vec![Vector3f::z(); 4]);
        assert!(mesh.normals.is_some());
    }

    #[test]
    fn test_bounding_box() {
        let scene = Scene::from_mesh(unit_square());
        let (min, max) = scene.bounding_box().unwrap();
        assert_eq!(min, Point3f::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3f::new(1.0, 1.0, 0.0));
        assert_relative_eq!(scene.bounding_diagonal(), 2.0f32.sqrt());
        assert!(Scene::new().bounding_box().is_none());
    }
}
